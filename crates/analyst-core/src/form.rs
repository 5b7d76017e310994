//! Form hand-off between the intake form and the session controller
//!
//! The intake form writes its fields once, as a single JSON blob, to a
//! well-known location. The controller reads it once at startup and sends
//! it verbatim as `form_data`. Reading is best-effort: a missing or
//! malformed blob becomes `form_data: null`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Fields of the analysis request, keyed the way the agent expects them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub question: String,
    /// Location the analysis is about
    pub city: String,
    pub purpose: String,
    pub rooms: u32,
    /// Property type
    #[serde(rename = "type")]
    pub property_type: String,
    /// Budget range, free text
    pub budget: String,
    /// Number of results to return
    #[serde(rename = "topN")]
    pub top_n: u32,
    /// Timeline in years
    pub investment_timeline: u32,
    /// How the analysis should be approached
    pub method: String,
    pub additional_info: String,
    #[serde(default)]
    pub skip_define_objective_step: bool,
    #[serde(default)]
    pub use_human_in_the_loop: bool,
    /// Name of the uploaded data file
    #[serde(
        rename = "data_file_path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub uploaded_file: Option<String>,
}

/// File-backed store for the hand-off blob
#[derive(Debug, Clone)]
pub struct HandoffStore {
    path: PathBuf,
}

impl HandoffStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the blob, replacing any previous submission
    pub fn save(&self, request: &AnalysisRequest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let blob = serde_json::to_string(request)?;
        std::fs::write(&self.path, blob)?;
        info!("Saved analysis request to {:?}", self.path);
        Ok(())
    }

    /// Read the raw blob to send as `form_data`
    ///
    /// Returns `None` when the blob is absent, unreadable or not JSON. The
    /// shape of the JSON is not checked.
    pub fn load_payload(&self) -> Option<String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No form hand-off at {:?}: {}", self.path, e);
                return None;
            }
        };

        let blob = content.trim();
        if blob.is_empty() {
            return None;
        }
        match serde_json::from_str::<serde_json::Value>(blob) {
            Ok(_) => Some(blob.to_string()),
            Err(e) => {
                warn!("Ignoring malformed form hand-off at {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Parse the blob into typed fields, if it matches the request shape
    pub fn load_request(&self) -> Option<AnalysisRequest> {
        self.load_payload()
            .and_then(|blob| serde_json::from_str(&blob).ok())
    }
}
