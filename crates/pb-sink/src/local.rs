use std::fs::{self, OpenOptions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use pb_core::eval::{ResponseRecord, ResponseSink, SinkError, RESPONSE_COLUMNS};

// ---------------------------------------------------------------------------
// CsvSink — append-or-create a flat local file
// ---------------------------------------------------------------------------

/// Appends responses to a local CSV file, creating it (and its parent
/// directories) on first use. The header row is written only when the file
/// is created.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_rows(&self, rows: &[ResponseRecord]) -> Result<usize, SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if write_header {
            writer.write_record(RESPONSE_COLUMNS).map_err(csv_error)?;
        }
        for row in rows {
            writer.write_record(row.to_row()).map_err(csv_error)?;
        }
        writer.flush().map_err(io_error)?;

        Ok(rows.len())
    }
}

impl ResponseSink for CsvSink {
    fn append<'a>(
        &'a self,
        rows: &'a [ResponseRecord],
    ) -> Pin<Box<dyn Future<Output = Result<usize, SinkError>> + Send + 'a>> {
        Box::pin(async move {
            let written = self.append_rows(rows)?;
            tracing::info!(rows = written, path = %self.path.display(), "appended responses to csv");
            Ok(written)
        })
    }
}

fn io_error(err: std::io::Error) -> SinkError {
    SinkError::Io(err.to_string())
}

fn csv_error(err: csv::Error) -> SinkError {
    SinkError::Io(err.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
