//! Parameter and observable registries used to build legend labels.
//!
//! Registries are passed explicitly to [`DataFile::labels`](crate::DataFile::labels);
//! [`Catalog`] is a JSON-backed implementation of both.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// A failed registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("unknown observable '{0}'")]
    UnknownObservable(String),
}

/// Display metadata of a parameter or observable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    latex: String,
}

impl Entry {
    pub fn new(latex: impl Into<String>) -> Self {
        Entry { latex: latex.into() }
    }

    /// LaTeX formatted display name, without math-mode delimiters.
    pub fn latex(&self) -> &str {
        &self.latex
    }
}

pub trait ParameterRegistry {
    fn parameter(&self, name: &str) -> Result<&Entry, RegistryError>;
}

pub trait ObservableRegistry {
    fn observable(&self, name: &str) -> Result<&Entry, RegistryError>;
}

/// The pair of registries consulted when labelling variables.
#[derive(Clone, Copy)]
pub struct Registries<'a> {
    pub parameters: &'a dyn ParameterRegistry,
    pub observables: &'a dyn ObservableRegistry,
}

impl<'a> From<&'a Catalog> for Registries<'a> {
    fn from(catalog: &'a Catalog) -> Self {
        Registries {
            parameters: catalog,
            observables: catalog,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Parameters and observables with their display names.
///
/// ```json
/// {
///   "parameters":  { "mu":     { "latex": "\\mu" } },
///   "observables": { "Re{C9}": { "latex": "\\mathrm{Re}\\, C_9" } }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    parameters: BTreeMap<String, Entry>,
    #[serde(default)]
    observables: BTreeMap<String, Entry>,
}

impl Catalog {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("parsing catalog")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading catalog {}", path.display()))
    }

    pub fn insert_parameter(&mut self, name: impl Into<String>, latex: impl Into<String>) {
        self.parameters.insert(name.into(), Entry::new(latex));
    }

    pub fn insert_observable(&mut self, name: impl Into<String>, latex: impl Into<String>) {
        self.observables.insert(name.into(), Entry::new(latex));
    }
}

impl ParameterRegistry for Catalog {
    fn parameter(&self, name: &str) -> Result<&Entry, RegistryError> {
        self.parameters
            .get(name)
            .ok_or_else(|| RegistryError::UnknownParameter(name.to_string()))
    }
}

impl ObservableRegistry for Catalog {
    fn observable(&self, name: &str) -> Result<&Entry, RegistryError> {
        self.observables
            .get(name)
            .ok_or_else(|| RegistryError::UnknownObservable(name.to_string()))
    }
}
