use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Locale {
    #[default]
    #[serde(rename = "th")]
    Thai,
    #[serde(rename = "en")]
    English,
}

/// User-facing strings for one locale.
#[derive(Debug, Clone, Copy)]
pub struct Labels {
    pub columns: [&'static str; 6],
    pub pass: &'static str,
    pub fail: &'static str,
    pub results_title: &'static str,
    pub sessions_title: &'static str,
    pub no_sessions: &'static str,
    pub select_image_first: &'static str,
    pub analysis_in_progress: &'static str,
    pub analysis_failed: &'static str,
    pub storage_failed: &'static str,
    pub credential_failed: &'static str,
    pub unexpected_error: &'static str,
    pub export_prompt: &'static str,
    pub rename_prompt: &'static str,
    pub save_prompt: &'static str,
    pub delete_confirm: &'static str,
    pub double_check_notice: &'static str,
}

const THAI: Labels = Labels {
    columns: [
        "เงื่อนไขตรวจสอบ",
        "สมการที่คำนวณ",
        "ผลลัพธ์ที่ได้",
        "ค่าที่ควรเป็น",
        "สถานะ",
        "เหตุผล",
    ],
    pass: "ผ่าน",
    fail: "ไม่ผ่าน",
    results_title: "ผลการตรวจสอบ",
    sessions_title: "ประวัติการวิเคราะห์ที่บันทึกไว้",
    no_sessions: "ยังไม่มีข้อมูลที่บันทึกไว้",
    select_image_first: "กรุณาเลือกรูปภาพก่อนทำการวิเคราะห์",
    analysis_in_progress: "กำลังวิเคราะห์...",
    analysis_failed: "เกิดข้อผิดพลาดในการวิเคราะห์รูปภาพ",
    storage_failed: "เกิดข้อผิดพลาดในการบันทึกข้อมูล",
    credential_failed: "เกิดข้อผิดพลาดในการจัดการคีย์ API",
    unexpected_error: "เกิดข้อผิดพลาดที่ไม่คาดคิด",
    export_prompt: "ตั้งชื่อไฟล์สำหรับดาวน์โหลด",
    rename_prompt: "แก้ไขชื่อ",
    save_prompt: "ตั้งชื่อผลการวิเคราะห์",
    delete_confirm: "คุณแน่ใจหรือไม่ว่าต้องการลบ",
    double_check_notice: "ผลลัพธ์จาก AI อาจคลาดเคลื่อน โปรดตรวจสอบอีกครั้ง",
};

const ENGLISH: Labels = Labels {
    columns: [
        "Condition",
        "Calculation",
        "Actual Result",
        "Expected Value",
        "Status",
        "Reason",
    ],
    pass: "Pass",
    fail: "Fail",
    results_title: "Verification Results",
    sessions_title: "Saved Analyses",
    no_sessions: "No saved analyses yet",
    select_image_first: "Please select an image before analyzing",
    analysis_in_progress: "Analyzing...",
    analysis_failed: "Image analysis failed",
    storage_failed: "Saving data failed",
    credential_failed: "API key storage failed",
    unexpected_error: "An unexpected error occurred",
    export_prompt: "File name for download",
    rename_prompt: "Rename",
    save_prompt: "Name this analysis",
    delete_confirm: "Are you sure you want to delete",
    double_check_notice: "AI output may be inaccurate, please double check the results",
};

impl Locale {
    pub fn labels(self) -> &'static Labels {
        match self {
            Locale::Thai => &THAI,
            Locale::English => &ENGLISH,
        }
    }
}

impl Labels {
    pub fn status_token(&self, status: bool) -> &'static str {
        if status {
            self.pass
        } else {
            self.fail
        }
    }

    /// Banner text for an error shown inline by the shell.
    pub fn banner(&self, err: &AppError) -> String {
        let prefix = match err.kind() {
            ErrorKind::UserInput => return err.detail().to_string(),
            ErrorKind::Internal => return self.unexpected_error.to_string(),
            ErrorKind::Storage => self.storage_failed,
            ErrorKind::Credential => self.credential_failed,
            ErrorKind::Configuration
            | ErrorKind::Transport
            | ErrorKind::ContractViolation
            | ErrorKind::Image => self.analysis_failed,
        };
        format!("{}: {}", prefix, err.detail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tokens() {
        assert_eq!(Locale::Thai.labels().status_token(true), "ผ่าน");
        assert_eq!(Locale::English.labels().status_token(false), "Fail");
    }

    #[test]
    fn test_banner_wraps_analysis_failures() {
        let labels = Locale::English.labels();
        let err = AppError::TransportError("connection reset".to_string());
        assert_eq!(labels.banner(&err), "Image analysis failed: connection reset");

        let input = AppError::ValidationError(labels.select_image_first.to_string());
        assert_eq!(labels.banner(&input), labels.select_image_first);
    }

    #[test]
    fn test_banner_per_error_kind() {
        let labels = Locale::English.labels();
        let cases = [
            (AppError::NotFound("Session 42".to_string()), "Session 42"),
            (AppError::Internal("boom".to_string()), "An unexpected error occurred"),
            (
                AppError::ConfigError("API key not found".to_string()),
                "Image analysis failed: API key not found",
            ),
            (
                AppError::ContractError("expected array".to_string()),
                "Image analysis failed: expected array",
            ),
            (
                AppError::ImageDecodeError("bad png".to_string()),
                "Image analysis failed: bad png",
            ),
            (
                AppError::IoError("Failed to write /x/out.csv".to_string()),
                "Saving data failed: Failed to write /x/out.csv",
            ),
            (
                AppError::SecurityError("locked".to_string()),
                "API key storage failed: locked",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(labels.banner(&err), expected, "{:?}", err.kind());
        }
    }

    #[test]
    fn test_thai_storage_banner() {
        let labels = Locale::Thai.labels();
        let err = AppError::IoError("disk full".to_string());
        assert_eq!(labels.banner(&err), "เกิดข้อผิดพลาดในการบันทึกข้อมูล: disk full");
    }

    #[test]
    fn test_locale_serde_codes() {
        assert_eq!(serde_json::to_string(&Locale::Thai).unwrap(), "\"th\"");
        let parsed: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(parsed, Locale::English);
    }
}
