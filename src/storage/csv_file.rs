//! Delimited flat-file destination
//!
//! Records are stored one per row with a header line. A file cut short by a killed
//! process is truncated back to its last complete row before the next append, so a
//! torn row (even one stopped inside a quoted field) never absorbs later rows.

use crate::record::Record;
use crate::storage::traits::{Destination, StoreError, StoreResult};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Rows of a flat file and the length of its intact prefix
struct Scan {
    records: Vec<Record>,
    skipped: usize,
    clean_len: u64,
    file_len: u64,
}

/// CSV file destination
pub struct CsvDestination {
    path: PathBuf,
    /// Intact prefix length found by the last scan, while a torn tail is pending repair
    torn_at: Option<u64>,
    scanned: bool,
}

impl CsvDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            torn_at: None,
            scanned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Contents of the file, or `None` if it does not exist
    fn read_existing(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Parses every row and locates the end of the last complete one
    fn scan(&mut self) -> StoreResult<Scan> {
        let bytes = self.read_existing()?.unwrap_or_default();
        let file_len = bytes.len() as u64;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());
        let headers = reader.byte_headers().map_err(|e| self.csv_error(e))?.clone();

        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut row = csv::ByteRecord::new();
        let mut last_start = 0u64;
        let mut last_parsed: Option<bool> = None;
        let mut unreadable_from: Option<u64> = None;

        loop {
            let start = reader.position().byte();
            match reader.read_byte_record(&mut row) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    tracing::debug!("Stopped reading {} at byte {}: {}", self.path.display(), start, e);
                    unreadable_from = Some(start);
                    break;
                }
            }
            last_start = start;
            match row.deserialize::<Record>(Some(&headers)) {
                Ok(record) => {
                    records.push(record);
                    last_parsed = Some(true);
                }
                Err(e) => {
                    skipped += 1;
                    last_parsed = Some(false);
                    tracing::debug!("Skipping malformed row in {}: {}", self.path.display(), e);
                }
            }
        }

        // Only the final row can be torn; with no rows, the header itself is checked
        let tail_start = if last_parsed.is_some() { last_start } else { 0 };
        let mut clean_len = file_len;
        if let Some(start) = unreadable_from {
            clean_len = skip_line_breaks(&bytes, start);
        } else if is_torn(&bytes[tail_start as usize..]) {
            clean_len = skip_line_breaks(&bytes, tail_start);
            match last_parsed {
                Some(true) => {
                    records.pop();
                }
                Some(false) => skipped -= 1,
                None => {}
            }
        }

        self.scanned = true;
        self.torn_at = (clean_len < file_len).then_some(clean_len);

        Ok(Scan {
            records,
            skipped,
            clean_len,
            file_len,
        })
    }

    /// Cuts a torn final row off the file
    fn truncate_torn_tail(&mut self) -> StoreResult<()> {
        if !self.scanned {
            self.scan()?;
        }
        let Some(clean_len) = self.torn_at.take() else {
            return Ok(());
        };

        tracing::warn!(
            "{} ends with a partial row, truncating it to {} bytes before appending",
            self.path.display(),
            clean_len
        );
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.set_len(clean_len).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// True when a trailing row lacks its terminator or stops inside a quoted field
fn is_torn(tail: &[u8]) -> bool {
    if tail.is_empty() {
        return false;
    }
    let quotes = tail.iter().filter(|&&b| b == b'"').count();
    !tail.ends_with(b"\n") || quotes % 2 == 1
}

/// Moves an offset past line breaks so the kept prefix ends with its terminator
fn skip_line_breaks(bytes: &[u8], mut offset: u64) -> u64 {
    while let Some(b'\r' | b'\n') = bytes.get(offset as usize) {
        offset += 1;
    }
    offset
}

impl Destination for CsvDestination {
    fn load(&mut self) -> StoreResult<Vec<Record>> {
        let scan = self.scan()?;

        if scan.skipped > 0 {
            tracing::warn!(
                "Skipped {} malformed rows while loading {}",
                scan.skipped,
                self.path.display()
            );
        }
        if scan.clean_len < scan.file_len {
            tracing::warn!(
                "Ignoring a partial final row in {} ({} trailing bytes)",
                self.path.display(),
                scan.file_len - scan.clean_len
            );
        }

        Ok(scan.records)
    }

    fn append(&mut self, records: &[Record]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        self.truncate_torn_tail()?;

        let is_new = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(self.io_error(e)),
        };

        if is_new {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        for record in records {
            writer.serialize(record).map_err(|e| self.csv_error(e))?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
