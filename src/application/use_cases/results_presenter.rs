use chrono::{NaiveDate, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::domain::analysis::{AnalysisResult, Verdict};
use crate::domain::error::{AppError, Result};
use crate::domain::locale::Labels;
use crate::infrastructure::csv::CsvExporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Condition,
    Calculation,
    ActualResult,
    ExpectedValue,
    Status,
    Reason,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "condition" => Ok(SortKey::Condition),
            "calculation" => Ok(SortKey::Calculation),
            "actualResult" | "actual" => Ok(SortKey::ActualResult),
            "expectedValue" | "expected" => Ok(SortKey::ExpectedValue),
            "status" => Ok(SortKey::Status),
            "reason" => Ok(SortKey::Reason),
            other => Err(AppError::ValidationError(format!(
                "Unknown sort column: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Indicator shown next to a column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    None,
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: Option<SortKey>,
    pub direction: Option<SortDirection>,
}

/// Table view state: the active sort and whether the table is collapsed.
/// Neither ever changes the result data itself.
#[derive(Debug, Clone, Default)]
pub struct ResultsPresenter {
    sort: SortConfig,
    collapsed: bool,
}

impl ResultsPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same key toggles the direction; a new key starts ascending.
    pub fn request_sort(&mut self, key: SortKey) {
        let direction = match (self.sort.key, self.sort.direction) {
            (Some(current), Some(SortDirection::Ascending)) if current == key => {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        };
        self.sort = SortConfig {
            key: Some(key),
            direction: Some(direction),
        };
    }

    pub fn indicator(&self, key: SortKey) -> SortIndicator {
        match (self.sort.key, self.sort.direction) {
            (Some(current), Some(SortDirection::Ascending)) if current == key => SortIndicator::Asc,
            (Some(current), Some(SortDirection::Descending)) if current == key => {
                SortIndicator::Desc
            }
            _ => SortIndicator::None,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
    }

    /// Rows in display order. The input slice is left as it is.
    pub fn sorted<'a>(&self, results: &'a [AnalysisResult]) -> Vec<&'a AnalysisResult> {
        let mut rows: Vec<&AnalysisResult> = results.iter().collect();
        if let (Some(key), Some(direction)) = (self.sort.key, self.sort.direction) {
            rows.sort_by(|a, b| compare_rows(a, b, key, direction));
        }
        rows
    }

    pub fn export_csv(&self, results: &[AnalysisResult], labels: &Labels) -> Result<Vec<u8>> {
        CsvExporter::new(labels).to_bytes(self.sorted(results))
    }

    /// Plain-text rendering for the print path. Non-printable elements are
    /// left out, and a collapsed table prints only its title.
    pub fn render_for_print(&self, results: &[AnalysisResult], labels: &Labels) -> String {
        self.render(results, labels, false)
    }

    /// Full on-screen rendering including interactive hints.
    pub fn render_for_screen(&self, results: &[AnalysisResult], labels: &Labels) -> String {
        self.render(results, labels, true)
    }

    fn render(&self, results: &[AnalysisResult], labels: &Labels, interactive: bool) -> String {
        let mut blocks: Vec<Block> = vec![Block::printable(vec![labels.results_title.to_string()])];
        blocks.push(Block::screen_only(vec![format!(
            "[save] [export csv|print] [{}]",
            if self.collapsed { "expand" } else { "collapse" }
        )]));

        if !self.collapsed {
            blocks.push(Block::printable(self.table_lines(results, labels)));
            blocks.push(Block::screen_only(vec![labels.double_check_notice.to_string()]));
        }

        blocks
            .into_iter()
            .filter(|block| interactive || block.printable)
            .flat_map(|block| block.lines)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn table_lines(&self, results: &[AnalysisResult], labels: &Labels) -> Vec<String> {
        let keys = [
            SortKey::Condition,
            SortKey::Calculation,
            SortKey::ActualResult,
            SortKey::ExpectedValue,
            SortKey::Status,
        ];
        let header: Vec<String> = keys
            .iter()
            .zip(labels.columns.iter())
            .map(|(key, label)| match self.indicator(*key) {
                SortIndicator::Asc => format!("{} ^", label),
                SortIndicator::Desc => format!("{} v", label),
                SortIndicator::None => label.to_string(),
            })
            .collect();

        let mut rows = vec![header];
        for result in self.sorted(results) {
            let token = labels.status_token(result.status);
            let status = match (result.verdict(), result.reason()) {
                (Verdict::Unreadable, Some(reason)) => format!("{} ({})", token, reason),
                _ => token.to_string(),
            };
            rows.push(vec![
                result.condition.clone(),
                result.calculation.clone(),
                result.actual_result.to_string(),
                result.expected_value.to_string(),
                status,
            ]);
        }

        let widths: Vec<usize> = (0..keys.len())
            .map(|col| {
                rows.iter()
                    .map(|row| row[col].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(widths.iter())
                    .map(|(cell, width)| {
                        let pad = width.saturating_sub(cell.chars().count());
                        format!("{}{}", cell, " ".repeat(pad))
                    })
                    .collect::<Vec<_>>()
                    .join(" | ")
                    .trim_end()
                    .to_string()
            })
            .collect()
    }
}

struct Block {
    printable: bool,
    lines: Vec<String>,
}

impl Block {
    fn printable(lines: Vec<String>) -> Self {
        Self {
            printable: true,
            lines,
        }
    }

    fn screen_only(lines: Vec<String>) -> Self {
        Self {
            printable: false,
            lines,
        }
    }
}

fn compare_rows(
    a: &AnalysisResult,
    b: &AnalysisResult,
    key: SortKey,
    direction: SortDirection,
) -> Ordering {
    let ordering = match key {
        SortKey::Condition => a.condition.cmp(&b.condition),
        SortKey::Calculation => a.calculation.cmp(&b.calculation),
        SortKey::ActualResult => a.actual_result.natural_cmp(&b.actual_result),
        SortKey::ExpectedValue => a.expected_value.natural_cmp(&b.expected_value),
        SortKey::Status => a.status.cmp(&b.status),
        SortKey::Reason => {
            // Absent values sort last in either direction.
            return match (a.reason(), b.reason()) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => apply_direction(x.cmp(y), direction),
            };
        }
    };
    apply_direction(ordering, direction)
}

fn apply_direction(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// `analysis-results-YYYY-MM-DD` for the given day.
pub fn default_export_name(date: NaiveDate) -> String {
    format!("analysis-results-{}", date.format("%Y-%m-%d"))
}

pub fn default_export_name_today() -> String {
    default_export_name(Utc::now().date_naive())
}

/// Confirms a user-entered export name: trimmed, non-empty, `.csv` appended.
pub fn confirm_export_file_name(input: &str) -> Option<String> {
    let name = input.trim();
    if name.is_empty() {
        return None;
    }
    if name.to_ascii_lowercase().ends_with(".csv") {
        Some(name.to_string())
    } else {
        Some(format!("{}.csv", name))
    }
}
