use std::io::Read;

use super::rows::RawRow;
use super::tags::TagMapping;
use super::IngestError;

/// CSV contents after tag mapping, still as strings
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    /// Canonical headers, in file order, without dropped columns
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl CsvTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a telemetry CSV, renaming columns through `tags`
///
/// Short records are accepted; their trailing columns are simply absent
/// from the row. Extra trailing cells are ignored.
pub fn read_csv<R: Read>(reader: R, tags: &TagMapping) -> Result<CsvTable, IngestError> {
    let mut csv_reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(::csv::Trim::Headers)
        .from_reader(reader);

    let raw_headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mapped = tags.apply(&raw_headers)?;

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut row = RawRow::with_capacity(mapped.len());
        for (name, cell) in mapped.iter().zip(record.iter()) {
            if let Some(name) = name {
                row.insert(name.clone(), cell.to_string());
            }
        }
        rows.push(row);
    }

    let headers = mapped.into_iter().flatten().collect();
    tracing::debug!("Read {} CSV rows", rows.len());

    Ok(CsvTable { headers, rows })
}
