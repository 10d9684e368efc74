// src/sink/files.rs
use super::{RecordSink, Row, SCHEMA};
use crate::config::ScrapeConfig;
use crate::errors::ScraperError;
use crate::scraper::models::ListingRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// CSV store written two ways (appended per record, rewritten per snapshot)
/// plus a JSON mirror written on snapshot. Both are UTF-8.
pub struct FileSink {
    csv_path: PathBuf,
    json_path: PathBuf,
}

impl FileSink {
    pub fn new(csv_path: impl Into<PathBuf>, json_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            json_path: json_path.into(),
        }
    }

    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(config.csv_path(), config.json_path())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    /// Rows already in the CSV store, e.g. appended by a run that crashed
    /// before its snapshot. Unreadable rows are logged and skipped.
    pub fn load_existing(&self) -> Result<Vec<ListingRecord>, ScraperError> {
        if !self.csv_path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.csv_path)?;
        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<ListingRecord>().enumerate() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unreadable row {} in {}: {e}",
                    line + 2,
                    self.csv_path.display()
                ),
            }
        }

        info!(
            "Loaded {} existing records from {}",
            records.len(),
            self.csv_path.display()
        );
        Ok(records)
    }

    fn write_csv(path: &Path, rows: &[Row]) -> Result<(), ScraperError> {
        let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
        writer.write_record(SCHEMA)?;
        for row in rows {
            writer.write_record(row.values())?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_json(path: &Path, rows: &[Row]) -> Result<(), ScraperError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, rows)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Writes through a sibling temp file and renames it into place, so readers
/// see either the old store or the new one.
fn replace_atomically<F>(path: &Path, write: F) -> Result<(), ScraperError>
where
    F: FnOnce(&Path) -> Result<(), ScraperError>,
{
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

impl RecordSink for FileSink {
    fn append(&mut self, record: &ListingRecord) -> Result<(), ScraperError> {
        let needs_header = fs::metadata(&self.csv_path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(SCHEMA)?;
        }
        writer.write_record(Row::from_record(record).values())?;
        writer.flush()?;

        debug!("Saved progress to {}", self.csv_path.display());
        Ok(())
    }

    fn snapshot(&mut self, records: &[ListingRecord]) -> Result<(), ScraperError> {
        let rows: Vec<Row> = records.iter().map(Row::from_record).collect();

        replace_atomically(&self.csv_path, |tmp| Self::write_csv(tmp, &rows))?;
        replace_atomically(&self.json_path, |tmp| Self::write_json(tmp, &rows))?;

        info!(
            "Saved all data to {} and {}",
            self.csv_path.display(),
            self.json_path.display()
        );
        Ok(())
    }
}
