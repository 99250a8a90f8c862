//! Incremental CSV export with a growing header
//!
//! [`StreamingTableWriter`] accepts records one at a time and never holds
//! more than the current record in memory. The column set is derived from the
//! records seen so far; when a record brings new field paths the schema grows
//! and only the header line of the file is rewritten, then the row is
//! appended with the grown schema.
//!
//! Known limitations:
//! - Rows written before a field appeared are not padded afterwards, so they
//!   can be narrower than the final header (`TableSummary::ragged_rows`).
//! - Rewriting the header and appending the row are two separate steps; a
//!   crash between them leaves a header that does not match the last row.

use crate::model::TabularRecord;
use crate::output::tabular::{
    flatten_record, format_header, format_row, FieldSchema, TableSummary,
};
use crate::output::{OutputError, OutputResult};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stateful CSV writer for an unbounded stream of records
pub struct StreamingTableWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    schema: FieldSchema,
    /// Byte length of the header line on disk, terminator included
    header_len: u64,
    /// Rows written, keyed by the schema width they were written with
    rows_by_width: BTreeMap<usize, usize>,
}

impl StreamingTableWriter {
    /// Prepares a writer for `path`; nothing touches the disk before the first record
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            schema: FieldSchema::new(),
            header_len: 0,
            rows_by_width: BTreeMap::new(),
        }
    }

    /// Target file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current column set
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Number of rows written so far
    pub fn rows(&self) -> usize {
        self.rows_by_width.values().sum()
    }

    /// Writes one record
    ///
    /// The first record creates the file and its header. A later record with
    /// unseen field paths grows the schema and rewrites the header first.
    pub fn observe(&mut self, record: &TabularRecord) -> OutputResult<()> {
        let flat = flatten_record(record);

        if self.file.is_none() {
            self.schema.extend(flat.keys().cloned());
            self.start_file()?;
        } else {
            let before = self.schema.len();
            self.schema.extend(flat.keys().cloned());
            if self.schema.len() > before {
                tracing::debug!(
                    "Schema of {} grew from {} to {} columns",
                    self.path.display(),
                    before,
                    self.schema.len()
                );
                self.rewrite_header()?;
            }
        }

        let row = format_row(&self.schema, &flat);
        let file = self.open_file()?;
        writeln!(file, "{}", row)?;

        *self.rows_by_width.entry(self.schema.len()).or_insert(0) += 1;
        Ok(())
    }

    /// Flushes the file and reports what was written
    ///
    /// When no record was observed no file exists and the summary is empty.
    pub fn finalize(mut self) -> OutputResult<TableSummary> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        let columns = self.schema.len();
        let ragged_rows = self
            .rows_by_width
            .range(..columns)
            .map(|(_, count)| *count)
            .sum();

        if ragged_rows > 0 {
            tracing::warn!(
                "{}: {} row(s) are narrower than the final {}-column header",
                self.path.display(),
                ragged_rows,
                columns
            );
        }

        Ok(TableSummary {
            rows: self.rows(),
            columns,
            ragged_rows,
        })
    }

    fn start_file(&mut self) -> OutputResult<()> {
        let mut file = BufWriter::new(File::create(&self.path)?);
        let header = format!("{}\n", format_header(&self.schema));
        file.write_all(header.as_bytes())?;
        self.header_len = header.len() as u64;
        self.file = Some(file);
        Ok(())
    }

    fn open_file(&mut self) -> OutputResult<&mut BufWriter<File>> {
        if self.file.is_none() {
            let file = OpenOptions::new().append(true).open(&self.path)?;
            self.file = Some(BufWriter::new(file));
        }
        // Populated just above when it was missing
        self.file
            .as_mut()
            .ok_or_else(|| OutputError::Io(io::Error::other("table file is not open")))
    }

    /// Replaces the header line, streaming the existing rows through a staged copy
    fn rewrite_header(&mut self) -> OutputResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut staged = NamedTempFile::new_in(&dir)?;
        let header = format!("{}\n", format_header(&self.schema));

        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            writer.write_all(header.as_bytes())?;

            let mut existing = File::open(&self.path)?;
            existing.seek(SeekFrom::Start(self.header_len))?;
            io::copy(&mut BufReader::new(existing), &mut writer)?;
            writer.flush()?;
        }

        // The staged file is created private; the table keeps its own mode
        let permissions = fs::metadata(&self.path)?.permissions();
        staged.as_file().set_permissions(permissions)?;

        staged
            .persist(&self.path)
            .map_err(|e| OutputError::Persist {
                path: self.path.display().to_string(),
                source: e.error,
            })?;

        self.header_len = header.len() as u64;
        Ok(())
    }
}
