//! Per-file upload state.

use crate::{
    client::error::UploadError,
    services::file_validation::{ValidationError, validate_file},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub type TaskId = u64;

/// A file selected for upload, held in memory.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Type allow-list, size ceiling and file name rules.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_file(&self.name, &self.content_type, self.size())
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub key: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Uploading,
    Completed,
    Error,
}

#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: TaskId,
    pub file: LocalFile,
    pub state: UploadState,
    pub bytes_sent: u64,
    pub outcome: Option<UploadOutcome>,
    pub error: Option<UploadError>,
}

impl UploadTask {
    pub fn new(id: TaskId, file: LocalFile) -> Self {
        Self {
            id,
            file,
            state: UploadState::Pending,
            bytes_sent: 0,
            outcome: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.state = UploadState::Uploading;
        self.bytes_sent = 0;
        self.error = None;
    }

    /// Record bytes handed to the transport, clamped to the file size.
    pub fn set_progress(&mut self, sent: u64) {
        self.bytes_sent = sent.min(self.file.size());
    }

    /// Fraction in `[0, 1]`; an empty file counts as done once completed.
    pub fn progress(&self) -> f64 {
        match self.file.size() {
            0 if self.state == UploadState::Completed => 1.0,
            0 => 0.0,
            total => self.bytes_sent as f64 / total as f64,
        }
    }

    pub fn complete(&mut self, outcome: UploadOutcome) {
        self.state = UploadState::Completed;
        self.bytes_sent = self.file.size();
        self.outcome = Some(outcome);
        self.error = None;
    }

    pub fn fail(&mut self, error: UploadError) {
        self.state = UploadState::Error;
        self.error = Some(error);
    }

    /// `error -> pending`. Any other state is left alone and `false` returned.
    pub fn retry(&mut self) -> bool {
        if self.state != UploadState::Error {
            return false;
        }
        self.state = UploadState::Pending;
        self.bytes_sent = 0;
        self.error = None;
        true
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, UploadState::Completed | UploadState::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(len: usize) -> LocalFile {
        LocalFile::new("notes.pdf", "application/pdf", vec![7u8; len])
    }

    #[test]
    fn lifecycle_and_retry() {
        let mut task = UploadTask::new(1, pdf(100));
        assert!(!task.retry());

        task.start();
        task.set_progress(40);
        assert_eq!(task.progress(), 0.4);
        task.set_progress(500);
        assert_eq!(task.bytes_sent, 100);

        task.fail(UploadError::Network("reset".into()));
        assert_eq!(task.state, UploadState::Error);
        assert!(task.retry());
        assert_eq!(task.state, UploadState::Pending);
        assert_eq!(task.bytes_sent, 0);
        assert!(task.error.is_none());

        task.start();
        task.complete(UploadOutcome { key: "k".into(), public_url: "u/k".into() });
        assert!(task.is_finished());
        assert!(!task.retry());
    }

    #[test]
    fn validation_uses_type_ceiling() {
        assert!(pdf(10).validate().is_ok());
        let big = LocalFile::new("scan.png", "image/png", vec![0u8; 10 * 1024 * 1024 + 1]);
        assert!(matches!(big.validate(), Err(ValidationError::TooLarge { .. })));
    }
}
