// ============================================================
// Layer 6 — Loss Log
// ============================================================
// Records every training step's three head losses to a CSV file.
//
// Output file: <checkpoint_dir>/loss_log.csv
//
// Example CSV output:
//   corner_loss,icon_loss,room_loss
//   0.693147,0.693147,0.693147
//   0.684210,0.690011,0.688803
//   ...
//
// A fresh run truncates the file; a resumed run appends to it so
// the log covers the whole history. Each row is flushed before
// `log` returns, so the file can be tailed while training runs.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::error::{OrchestratorError, OrchestratorResult};
use crate::domain::loss_record::LossRecord;

const HEADER: &str = "corner_loss,icon_loss,room_loss";

/// How to treat an existing log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Truncate,
    Append,
}

pub struct LossLog {
    csv_path: PathBuf,
    writer:   BufWriter<File>,
}

impl LossLog {
    pub fn open(dir: impl AsRef<Path>, mode: LogMode) -> OrchestratorResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| OrchestratorError::io(dir, e))?;
        let csv_path = dir.join("loss_log.csv");

        // header only when the file starts empty
        let needs_header = mode == LogMode::Truncate
            || fs::metadata(&csv_path).map(|m| m.len() == 0).unwrap_or(true);

        let file = match mode {
            LogMode::Truncate => File::create(&csv_path),
            LogMode::Append   => OpenOptions::new().create(true).append(true).open(&csv_path),
        }
        .map_err(|e| OrchestratorError::io(&csv_path, e))?;

        let mut log = Self { csv_path, writer: BufWriter::new(file) };
        if needs_header {
            log.write_line(HEADER)?;
            tracing::debug!("Created loss log: '{}'", log.csv_path.display());
        }
        Ok(log)
    }

    /// Append one step's losses.
    pub fn log(&mut self, record: &LossRecord) -> OrchestratorResult<()> {
        let row = format!("{:.6},{:.6},{:.6}", record.corner, record.icon, record.room);
        self.write_line(&row)
    }

    fn write_line(&mut self, line: &str) -> OrchestratorResult<()> {
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| OrchestratorError::io(&self.csv_path, e))
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_rows_are_visible_before_close() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = LossLog::open(tmp.path(), LogMode::Truncate).unwrap();
        log.log(&LossRecord::new(0.5, 0.25, 0.125)).unwrap();

        // still open
        let rows = lines(log.csv_path());
        assert_eq!(rows, vec![HEADER.to_string(), "0.500000,0.250000,0.125000".to_string()]);
    }

    #[test]
    fn test_truncate_then_append() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut log = LossLog::open(tmp.path(), LogMode::Truncate).unwrap();
            log.log(&LossRecord::new(1.0, 1.0, 1.0)).unwrap();
            log.log(&LossRecord::new(2.0, 2.0, 2.0)).unwrap();
        }
        {
            let mut log = LossLog::open(tmp.path(), LogMode::Append).unwrap();
            log.log(&LossRecord::new(3.0, 3.0, 3.0)).unwrap();
        }
        let path = tmp.path().join("loss_log.csv");
        assert_eq!(lines(&path).len(), 4);

        LossLog::open(tmp.path(), LogMode::Truncate).unwrap();
        assert_eq!(lines(&path), vec![HEADER.to_string()]);
    }

    #[test]
    fn test_append_to_missing_file_writes_header() {
        let tmp = tempfile::tempdir().unwrap();
        let log = LossLog::open(tmp.path().join("nested"), LogMode::Append).unwrap();
        assert_eq!(lines(log.csv_path()), vec![HEADER.to_string()]);
    }
}
