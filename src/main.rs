use std::path::Path;

use anyhow::{Context, Result, bail};
use eos_datafile::{Catalog, DataFile, Registries};

/// Usage: `eos-datafile <path> [catalog.json]`
///
/// Prints the kind and variables of a data file; with a catalog, also the
/// legend label of each variable.
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (path, catalog) = match args.as_slice() {
        [path] => (path, None),
        [path, catalog] => (path, Some(Catalog::load(Path::new(catalog))?)),
        _ => bail!("usage: eos-datafile <path> [catalog.json]"),
    };

    let file = DataFile::new(path, path.as_str());
    let variables = file.variables()?;
    let kind = file.kind().context("data file not resolved")?;

    println!("{}: {kind}, {} variables", file.path().display(), variables.len());

    match catalog {
        Some(catalog) => {
            let names: Vec<&str> = variables.iter().map(String::as_str).collect();
            let labels = file.labels(&names, &Registries::from(&catalog))?;
            for (name, label) in names.iter().zip(labels) {
                println!("  {name} -> {label}");
            }
        }
        None => {
            for name in variables {
                println!("  {name}");
            }
        }
    }

    Ok(())
}
