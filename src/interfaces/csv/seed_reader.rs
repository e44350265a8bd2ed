use crate::domain::catalog::CatalogItem;
use crate::domain::customer::Customer;
use crate::error::{KioskError, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads catalog or member seed rows from a CSV source.
///
/// This reader wraps `csv::Reader`, trimming whitespace and tolerating
/// rows with trailing optional columns left out.
pub struct SeedReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SeedReader<R> {
    /// Creates a new `SeedReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows.
    pub fn records<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(KioskError::from))
    }
}

pub fn read_items(path: &Path) -> Result<Vec<CatalogItem>> {
    SeedReader::new(File::open(path)?).records().collect()
}

pub fn read_customers(path: &Path) -> Result<Vec<Customer>> {
    SeedReader::new(File::open(path)?).records().collect()
}
