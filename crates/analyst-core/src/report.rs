//! Downloadable Markdown report

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::session::{Message, Session};

/// The finalized report, ready to be written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub file_name: String,
    pub contents: String,
}

impl ReportArtifact {
    /// Build the artifact for `date`, or `None` if the session has no report yet
    pub fn from_session(session: &Session, date: NaiveDate) -> Option<Self> {
        session.report().map(|report| Self {
            file_name: file_name_for(date),
            contents: report.to_string(),
        })
    }

    /// Build the artifact for a completed session that never got a report
    ///
    /// The agent's normal completion frame carries the report as the
    /// `content` of its detailed message rather than as `final_report`.
    pub fn from_completion(session: &Session, date: NaiveDate) -> Option<Self> {
        if !session.completed() {
            return None;
        }
        match session.messages().last() {
            Some(Message::Detailed { content, .. }) if !content.trim().is_empty() => Some(Self {
                file_name: file_name_for(date),
                contents: content.clone(),
            }),
            _ => None,
        }
    }

    /// Build the artifact dated today (local time), preferring the report
    pub fn today(session: &Session) -> Option<Self> {
        let date = chrono::Local::now().date_naive();
        Self::from_session(session, date).or_else(|| Self::from_completion(session, date))
    }

    /// Write the report into `dir` and return the file path
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.contents.as_bytes())?;
        info!("Wrote report to {:?}", path);
        Ok(path)
    }
}

fn file_name_for(date: NaiveDate) -> String {
    format!("analysis-report-{}.md", date.format("%Y-%m-%d"))
}
