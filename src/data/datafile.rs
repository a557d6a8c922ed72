use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use super::loader;
use super::model::{ImportanceSamples, Prediction, SampleTable};
use crate::registry::{Registries, RegistryError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataFileError {
    #[error("Data file '{}' does not exist", path.display())]
    MissingSource { path: PathBuf },

    #[error("Data file '{}' has an unsupported format", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Data file '{}' could not be opened", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Data file '{}': cannot determine absolute path", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data file '{}' has no variable '{name}'", path.display())]
    UnknownVariable { path: PathBuf, name: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// Kind and Store
// ---------------------------------------------------------------------------

/// The two recognized data-file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Samples,
    Prediction,
}

impl Kind {
    /// Classify by the final path segment: exactly `samples`, or a `pred-` prefix.
    pub fn from_file_name(name: &str) -> Option<Kind> {
        if name == "samples" {
            Some(Kind::Samples)
        } else if name.starts_with("pred-") {
            Some(Kind::Prediction)
        } else {
            None
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Samples => write!(f, "samples"),
            Kind::Prediction => write!(f, "prediction"),
        }
    }
}

/// An opened backing store.
#[derive(Debug, Clone)]
pub enum Store {
    Samples(ImportanceSamples),
    Prediction(Prediction),
}

impl Store {
    pub fn kind(&self) -> Kind {
        match self {
            Store::Samples(_) => Kind::Samples,
            Store::Prediction(_) => Kind::Prediction,
        }
    }

    pub fn table(&self) -> &SampleTable {
        match self {
            Store::Samples(s) => s.table(),
            Store::Prediction(p) => p.table(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store opening
// ---------------------------------------------------------------------------

/// Filesystem access needed to resolve a [`DataFile`].
pub trait StoreOpener {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open_samples(&self, path: &Path) -> anyhow::Result<ImportanceSamples>;

    fn open_prediction(&self, path: &Path) -> anyhow::Result<Prediction>;
}

impl<T: StoreOpener + ?Sized> StoreOpener for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn open_samples(&self, path: &Path) -> anyhow::Result<ImportanceSamples> {
        (**self).open_samples(path)
    }

    fn open_prediction(&self, path: &Path) -> anyhow::Result<Prediction> {
        (**self).open_prediction(path)
    }
}

/// Reads stores with [`loader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStoreOpener;

impl StoreOpener for FsStoreOpener {
    fn open_samples(&self, path: &Path) -> anyhow::Result<ImportanceSamples> {
        loader::open_importance_samples(path)
    }

    fn open_prediction(&self, path: &Path) -> anyhow::Result<Prediction> {
        loader::open_prediction(path)
    }
}

// ---------------------------------------------------------------------------
// DataFile
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Resolved {
    store: Store,
    /// Key set of the store's lookup table at the time of opening.
    variables: BTreeSet<String>,
}

/// A data file shown in a figure: where it lives, its legend title and colour.
///
/// The backing store is opened on first use and kept for the lifetime of the
/// descriptor. A failed resolution is not remembered; the next call retries.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "O: Default"))]
pub struct DataFile<O = FsStoreOpener> {
    /// Either an importance-samples directory or a prediction directory.
    path: PathBuf,
    /// Title in the figure's legend.
    label: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(skip)]
    opener: O,
    #[serde(skip)]
    resolved: OnceCell<Resolved>,
}

impl DataFile {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        DataFile::with_opener(path, label, FsStoreOpener)
    }
}

impl<O: StoreOpener> DataFile<O> {
    pub fn with_opener(path: impl Into<PathBuf>, label: impl Into<String>, opener: O) -> Self {
        DataFile {
            path: path.into(),
            label: label.into(),
            color: None,
            opener,
            resolved: OnceCell::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Kind of the backing store, or `None` before resolution.
    pub fn kind(&self) -> Option<Kind> {
        self.resolved.get().map(|r| r.store.kind())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Open the backing store if this has not happened yet.
    pub fn resolve(&self) -> Result<&Store, DataFileError> {
        Ok(&self.resolved()?.store)
    }

    /// Alias of [`resolve`](Self::resolve).
    pub fn store(&self) -> Result<&Store, DataFileError> {
        self.resolve()
    }

    /// Variable identifiers provided by the data file.
    pub fn variables(&self) -> Result<&BTreeSet<String>, DataFileError> {
        Ok(&self.resolved()?.variables)
    }

    /// Legend labels for `variables`, in the same order.
    ///
    /// Parameters are labelled with their LaTeX name as is; observables are
    /// wrapped in `$...$`.
    pub fn labels<S: AsRef<str>>(
        &self,
        variables: &[S],
        registries: &Registries<'_>,
    ) -> Result<Vec<String>, DataFileError> {
        let store = self.resolve()?;

        let labels: Result<Vec<String>, RegistryError> = match store {
            Store::Samples(_) => variables
                .iter()
                .map(|v| {
                    registries
                        .parameters
                        .parameter(v.as_ref())
                        .map(|p| p.latex().to_string())
                })
                .collect(),
            Store::Prediction(_) => variables
                .iter()
                .map(|v| {
                    registries
                        .observables
                        .observable(v.as_ref())
                        .map(|o| format!("${}$", o.latex()))
                })
                .collect(),
        };

        labels.map_err(|e| {
            log::error!("Data file '{}': {e}", self.path.display());
            DataFileError::Registry(e)
        })
    }

    /// Samples of one variable.
    pub fn samples(&self, variable: &str) -> Result<&[f64], DataFileError> {
        self.resolve()?.table().column(variable).ok_or_else(|| {
            log::error!("Data file '{}' has no variable '{variable}'", self.path.display());
            DataFileError::UnknownVariable {
                path: self.path.clone(),
                name: variable.to_string(),
            }
        })
    }

    /// Importance weights of the samples; all ones if the file carries none.
    pub fn weights(&self) -> Result<&[f64], DataFileError> {
        Ok(self.resolve()?.table().weights())
    }

    fn resolved(&self) -> Result<&Resolved, DataFileError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let resolved = self.open().inspect_err(|e| log::error!("{e}"))?;
        Ok(self.resolved.get_or_init(|| resolved))
    }

    fn open(&self) -> Result<Resolved, DataFileError> {
        log::debug!("resolving data file '{}'", self.path.display());

        if !self.opener.exists(&self.path) {
            return Err(DataFileError::MissingSource {
                path: self.path.clone(),
            });
        }

        let abspath = absolute(&self.path).map_err(|source| DataFileError::Io {
            path: self.path.clone(),
            source,
        })?;

        let kind = abspath
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(Kind::from_file_name)
            .ok_or_else(|| DataFileError::UnsupportedFormat {
                path: self.path.clone(),
            })?;

        let store = match kind {
            Kind::Samples => self.opener.open_samples(&abspath).map(Store::Samples),
            Kind::Prediction => self.opener.open_prediction(&abspath).map(Store::Prediction),
        }
        .map_err(|source| DataFileError::Open {
            path: self.path.clone(),
            source,
        })?;

        let variables: BTreeSet<String> = store.table().lookup_table().keys().cloned().collect();
        log::info!(
            "opened {kind} data file '{}' with {} variables",
            abspath.display(),
            variables.len()
        );

        Ok(Resolved { store, variables })
    }
}

/// Absolute form of `path` with `.` and `..` removed lexically.
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    let abs = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in abs.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}
