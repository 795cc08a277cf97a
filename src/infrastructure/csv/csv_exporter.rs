// ============================================================
// CSV EXPORTER
// ============================================================
// Verdict tables as UTF-8 CSV with a BOM so spreadsheet tools pick up the
// encoding of Thai labels.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::path::{Path, PathBuf};

use crate::domain::analysis::AnalysisResult;
use crate::domain::error::{AppError, Result};
use crate::domain::locale::Labels;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct CsvExporter<'a> {
    labels: &'a Labels,
}

impl<'a> CsvExporter<'a> {
    pub fn new(labels: &'a Labels) -> Self {
        Self { labels }
    }

    /// Header plus one row per result, every field quoted.
    pub fn to_bytes<'r, I>(&self, rows: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = &'r AnalysisResult>,
    {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(UTF8_BOM.to_vec());

        writer
            .write_record(self.labels.columns)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;

        for result in rows {
            let record = [
                result.condition.clone(),
                result.calculation.clone(),
                result.actual_result.to_string(),
                result.expected_value.to_string(),
                self.labels.status_token(result.status).to_string(),
                result.reason().unwrap_or("").to_string(),
            ];
            writer
                .write_record(&record)
                .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))
    }

    /// Writes `bytes` as `file_name` inside `dir` and returns the full path.
    pub fn write_file(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| {
            AppError::IoError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}
