pub mod data;
pub mod registry;

pub use data::datafile::{DataFile, DataFileError, FsStoreOpener, Kind, Store, StoreOpener};
pub use registry::{Catalog, Registries, RegistryError};
