use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::analysis::AnalysisResult;

/// One saved, named snapshot of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
}

impl SavedSession {
    pub fn new(
        id: String,
        name: String,
        timestamp: DateTime<Utc>,
        results: Vec<AnalysisResult>,
        image_data_url: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            timestamp,
            results,
            image_data_url,
        }
    }

    pub fn local_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|result| result.status).count()
    }
}
