use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A value read from or computed over the meter table. The model is asked for
/// strings but numbers are accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    /// The numeric reading of the cell. Text counts when it parses as a
    /// finite number.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(n) => n.as_f64(),
            CellValue::Text(t) => t.trim().parse::<f64>().ok(),
        };
        value.filter(|v| v.is_finite())
    }

    /// Total order over cells: numeric cells first by value, whichever JSON
    /// type carries them, then non-numeric text lexicographically. Ties fall
    /// back to the rendered text.
    pub fn natural_cmp(&self, other: &CellValue) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a
                .total_cmp(&b)
                .then_with(|| self.to_string().cmp(&other.to_string())),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value.into())
    }
}

/// Outcome of one rule check, telling a wrong value apart from an unreadable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Mismatch,
    Unreadable,
}

/// One row of the verdict table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub condition: String,
    pub calculation: String,
    pub actual_result: CellValue,
    pub expected_value: CellValue,
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AnalysisResult {
    pub fn verdict(&self) -> Verdict {
        if self.status {
            Verdict::Pass
        } else if self.reason().is_some() {
            Verdict::Unreadable
        } else {
            Verdict::Mismatch
        }
    }

    /// The reason text, if any, with blank strings treated as absent.
    pub fn reason(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
    }

    /// Applies the post-processing every model row goes through: the
    /// calculation loses any `= result` suffix and `reason` is cleared on
    /// passing rows.
    pub fn normalized(mut self) -> Self {
        self.calculation = strip_calculation_result(&self.calculation);
        self.reason = if self.status {
            None
        } else {
            self.reason().map(str::to_string)
        };
        self
    }
}

/// Keeps only the left-hand side of the first `=`, trimmed.
pub fn strip_calculation_result(calculation: &str) -> String {
    match calculation.split_once('=') {
        Some((lhs, _)) => lhs.trim().to_string(),
        None => calculation.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: bool, reason: Option<&str>) -> AnalysisResult {
        AnalysisResult {
            condition: "007+008+009 = 006".to_string(),
            calculation: "402+396+559 = 1357".to_string(),
            actual_result: CellValue::from(1357),
            expected_value: CellValue::from("1357"),
            status,
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_strip_calculation_result() {
        assert_eq!(strip_calculation_result("402+396+559 = 1357"), "402+396+559");
        assert_eq!(strip_calculation_result("  12-3  "), "12-3");
        assert_eq!(strip_calculation_result("1+1=2=2"), "1+1");
    }

    #[test]
    fn test_normalized_clears_reason_on_pass() {
        let normalized = row(true, Some("ไม่สามารถอ่านค่าได้")).normalized();
        assert_eq!(normalized.reason, None);
        assert_eq!(normalized.calculation, "402+396+559");
        assert_eq!(normalized.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_verdict_distinguishes_mismatch_from_unreadable() {
        assert_eq!(row(false, Some("")).normalized().verdict(), Verdict::Mismatch);
        assert_eq!(row(false, None).verdict(), Verdict::Mismatch);
        assert_eq!(
            row(false, Some("ไม่สามารถอ่านค่าได้")).normalized().verdict(),
            Verdict::Unreadable
        );
    }

    #[test]
    fn test_blank_reason_becomes_absent() {
        let normalized = row(false, Some("   ")).normalized();
        assert_eq!(normalized.reason, None);
    }

    #[test]
    fn test_deserialize_accepts_numbers_and_strings() {
        let json = r#"{"condition":"c","calculation":"1+2","actualResult":3,"expectedValue":"3","status":true}"#;
        let parsed: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.actual_result, CellValue::from(3));
        assert_eq!(parsed.expected_value, CellValue::from("3"));
        assert_eq!(parsed.reason, None);
    }

    #[test]
    fn test_deserialize_rejects_missing_status() {
        let json = r#"{"condition":"c","calculation":"1+2","actualResult":"3","expectedValue":"3"}"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(CellValue::from(9).natural_cmp(&CellValue::from(10)), Ordering::Less);
        assert_eq!(CellValue::from("b").natural_cmp(&CellValue::from("a")), Ordering::Greater);
        assert_eq!(CellValue::from(20).natural_cmp(&CellValue::from("3")), Ordering::Greater);
        assert_eq!(CellValue::from(5).natural_cmp(&CellValue::from("n/a")), Ordering::Less);
        assert_eq!(CellValue::from("9").natural_cmp(&CellValue::from("10")), Ordering::Less);
        assert_eq!(CellValue::from(9).natural_cmp(&CellValue::from("9")), Ordering::Equal);
    }

    #[test]
    fn test_natural_cmp_order_does_not_depend_on_input_order() {
        let sort = |cells: Vec<CellValue>| -> Vec<String> {
            let mut cells = cells;
            cells.sort_by(|a, b| a.natural_cmp(b));
            cells.iter().map(CellValue::to_string).collect()
        };

        let forward = sort(vec![
            CellValue::from("10"),
            CellValue::from(9),
            CellValue::from("9"),
            CellValue::from("?"),
        ]);
        let backward = sort(vec![
            CellValue::from("?"),
            CellValue::from("9"),
            CellValue::from(9),
            CellValue::from("10"),
        ]);
        assert_eq!(forward, vec!["9", "9", "10", "?"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_as_f64_reads_numeric_text() {
        assert_eq!(CellValue::from(" 12.5 ").as_f64(), Some(12.5));
        assert_eq!(CellValue::from(7).as_f64(), Some(7.0));
        assert_eq!(CellValue::from("NaN").as_f64(), None);
        assert_eq!(CellValue::from("?").as_f64(), None);
    }

    #[test]
    fn test_display_renders_raw_value() {
        assert_eq!(CellValue::from(1357).to_string(), "1357");
        assert_eq!(CellValue::from("0.5").to_string(), "0.5");
    }
}
