use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::analysis::AnalysisResult;
use crate::domain::error::{AppError, Result};
use crate::domain::session::SavedSession;
use crate::infrastructure::storage::KeyValueStorage;

pub const DEFAULT_STORAGE_KEY: &str = "meterAnalysisSessions";

/// Owns the saved sessions, newest first, and writes the whole collection
/// through to storage on every mutation. Single writer only: two stores over
/// the same key will overwrite each other.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage + Send + Sync>,
    key: String,
    sessions: Vec<SavedSession>,
}

impl SessionStore {
    /// Never fails: unreadable or corrupt data is logged and dropped.
    pub fn load_all(storage: Arc<dyn KeyValueStorage + Send + Sync>, key: &str) -> Self {
        let sessions = match storage.read(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SavedSession>>(&raw) {
                Ok(sessions) => sessions,
                Err(err) => {
                    warn!(key, error = %err, "Discarding corrupted session data");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(key, error = %err, "Failed to read session data, starting empty");
                Vec::new()
            }
        };

        info!(key, count = sessions.len(), "Loaded saved sessions");
        Self {
            storage,
            key: key.to_string(),
            sessions,
        }
    }

    pub fn sessions(&self) -> &[SavedSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&SavedSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    pub fn save(
        &mut self,
        name: &str,
        results: Vec<AnalysisResult>,
        image_data_url: Option<String>,
    ) -> Result<SavedSession> {
        self.save_at(Utc::now(), name, results, image_data_url)
    }

    fn save_at(
        &mut self,
        now: DateTime<Utc>,
        name: &str,
        results: Vec<AnalysisResult>,
        image_data_url: Option<String>,
    ) -> Result<SavedSession> {
        let name = validate_name(name)?;
        let session = SavedSession::new(
            self.next_id(now),
            name,
            now,
            results,
            image_data_url,
        );

        let mut next = Vec::with_capacity(self.sessions.len() + 1);
        next.push(session.clone());
        next.extend(self.sessions.iter().cloned());
        self.commit(next)?;

        info!(id = %session.id, name = %session.name, rows = session.results.len(), "Saved session");
        Ok(session)
    }

    /// Returns `false` without touching storage when `id` is unknown.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<bool> {
        let new_name = validate_name(new_name)?;
        let Some(index) = self.sessions.iter().position(|session| session.id == id) else {
            return Ok(false);
        };

        let mut next = self.sessions.clone();
        next[index].name = new_name;
        self.commit(next)?;
        info!(id, "Renamed session");
        Ok(true)
    }

    /// Returns `false` without touching storage when `id` is unknown.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        if self.find(id).is_none() {
            return Ok(false);
        }

        let next = self
            .sessions
            .iter()
            .filter(|session| session.id != id)
            .cloned()
            .collect();
        self.commit(next)?;
        info!(id, "Deleted session");
        Ok(true)
    }

    // Persist first so memory and storage never diverge on a failed write.
    fn commit(&mut self, next: Vec<SavedSession>) -> Result<()> {
        let serialized = serde_json::to_string(&next)
            .map_err(|e| AppError::Internal(format!("Failed to serialize sessions: {}", e)))?;
        self.storage.write(&self.key, &serialized)?;
        self.sessions = next;
        Ok(())
    }

    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut candidate = now.timestamp_millis();
        while self.find(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate.to_string()
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            "Session name must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
