use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{Float32Array, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use eos_datafile::{Catalog, DataFile, DataFileError, Kind, Registries, RegistryError};
use parquet::arrow::ArrowWriter;

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("eos-datafile-it-{}-{test}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn catalog() -> Catalog {
    Catalog::from_json(
        r#"{
            "parameters": {
                "mu": {"latex": "$\\mu$"},
                "sigma": {"latex": "$\\sigma$"}
            },
            "observables": {
                "Re{C9}": {"latex": "\\mathrm{Re}\\, C_9"},
                "B->Kll::BR": {"latex": "\\mathcal{B}"}
            }
        }"#,
    )
    .unwrap()
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn samples_directory_from_csv() {
    let root = scratch_dir("samples-csv");
    let dir = root.join("samples");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("samples.csv"), "mu,sigma,weight\n4.1,0.8,0.5\n4.3,0.7,1.5\n").unwrap();

    let file = DataFile::new(&dir, "posterior").with_color("C1");
    let catalog = catalog();

    assert_eq!(file.variables().unwrap(), &set(&["mu", "sigma"]));
    assert_eq!(file.kind(), Some(Kind::Samples));
    assert_eq!(
        file.labels(&["mu", "sigma"], &Registries::from(&catalog)).unwrap(),
        ["$\\mu$", "$\\sigma$"]
    );
    assert_eq!(file.samples("mu").unwrap(), &[4.1, 4.3]);
    assert_eq!(file.weights().unwrap(), &[0.5, 1.5]);
}

#[test]
fn prediction_directory_from_csv() {
    let root = scratch_dir("pred-csv");
    let dir = root.join("pred-BtoKll");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("description.json"),
        r#"{"observables": [{"name": "Re{C9}"}, {"name": "B->Kll::BR", "kinematics": {"q2_min": 1.1, "q2_max": 6.0}}]}"#,
    )
    .unwrap();
    std::fs::write(dir.join("samples.csv"), "c9,br\n4.2,1.1e-7\n4.0,1.3e-7\n").unwrap();

    let file = DataFile::new(&dir, "SM");
    let catalog = catalog();

    assert_eq!(file.variables().unwrap(), &set(&["Re{C9}", "B->Kll::BR"]));
    assert_eq!(file.kind(), Some(Kind::Prediction));
    assert_eq!(
        file.labels(&["Re{C9}"], &Registries::from(&catalog)).unwrap(),
        ["$\\mathrm{Re}\\, C_9$"]
    );
    assert_eq!(file.samples("B->Kll::BR").unwrap(), &[1.1e-7, 1.3e-7]);
}

#[test]
fn samples_directory_from_parquet() {
    let root = scratch_dir("samples-parquet");
    let dir = root.join("samples");
    std::fs::create_dir_all(&dir).unwrap();

    let schema = Arc::new(Schema::new(vec![
        Field::new("mu", DataType::Float64, true),
        Field::new("sigma", DataType::Float32, false),
        Field::new("n", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(vec![Some(1.0), None])),
            Arc::new(Float32Array::from(vec![0.5, 0.25])),
            Arc::new(Int64Array::from(vec![3, 4])),
        ],
    )
    .unwrap();
    let out = std::fs::File::create(dir.join("samples.parquet")).unwrap();
    let mut writer = ArrowWriter::try_new(out, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let file = DataFile::new(&dir, "posterior");
    assert_eq!(file.variables().unwrap(), &set(&["mu", "n", "sigma"]));
    assert_eq!(file.samples("sigma").unwrap(), &[0.5, 0.25]);
    assert_eq!(file.samples("n").unwrap(), &[3.0, 4.0]);
    assert!(file.samples("mu").unwrap()[1].is_nan());
    assert_eq!(file.weights().unwrap(), &[1.0, 1.0]);
}

#[test]
fn resolution_is_a_snapshot() {
    let root = scratch_dir("snapshot");
    let dir = root.join("samples");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("samples.csv"), "mu\n1.0\n").unwrap();

    let file = DataFile::new(&dir, "posterior");
    assert_eq!(file.variables().unwrap(), &set(&["mu"]));

    std::fs::write(dir.join("samples.csv"), "mu,sigma\n1.0,2.0\n").unwrap();
    assert_eq!(file.variables().unwrap(), &set(&["mu"]));

    std::fs::remove_dir_all(&root).unwrap();
    assert_eq!(file.variables().unwrap(), &set(&["mu"]));
}

#[test]
fn nonexistent_path_is_missing_source() {
    let root = scratch_dir("missing");
    let file = DataFile::new(root.join("samples"), "posterior");

    assert!(matches!(file.variables(), Err(DataFileError::MissingSource { .. })));
    assert_eq!(file.kind(), None);
}

#[test]
fn unrecognized_name_is_unsupported() {
    let root = scratch_dir("unsupported");
    let path = root.join("notes.txt");
    std::fs::write(&path, "not a data file").unwrap();

    let file = DataFile::new(&path, "notes");
    assert!(matches!(file.variables(), Err(DataFileError::UnsupportedFormat { .. })));
    assert!(!file.is_resolved());
}

#[test]
fn failed_resolution_is_retried() {
    let root = scratch_dir("retry");
    let dir = root.join("samples");
    let file = DataFile::new(&dir, "posterior");

    assert!(matches!(file.variables(), Err(DataFileError::MissingSource { .. })));

    std::fs::create_dir_all(&dir).unwrap();
    assert!(matches!(file.variables(), Err(DataFileError::Open { .. })));

    std::fs::write(dir.join("samples.csv"), "mu\n1.0\n").unwrap();
    assert_eq!(file.variables().unwrap(), &set(&["mu"]));
}

#[test]
fn unknown_label_propagates_registry_error() {
    let root = scratch_dir("unknown-label");
    let dir = root.join("samples");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("samples.csv"), "mu,tau\n1.0,2.0\n").unwrap();

    let file = DataFile::new(&dir, "posterior");
    let catalog = catalog();
    let err = file.labels(&["tau"], &Registries::from(&catalog)).unwrap_err();

    assert!(matches!(
        err,
        DataFileError::Registry(RegistryError::UnknownParameter(ref name)) if name == "tau"
    ));
}

#[test]
fn catalog_loads_from_file() {
    let root = scratch_dir("catalog");
    let path = root.join("catalog.json");
    std::fs::write(&path, r#"{"parameters": {"mu": {"latex": "\\mu"}}}"#).unwrap();

    let catalog = Catalog::load(&path).unwrap();
    let registries = Registries::from(&catalog);
    assert_eq!(registries.parameters.parameter("mu").unwrap().latex(), "\\mu");
    assert!(registries.observables.observable("mu").is_err());
}
