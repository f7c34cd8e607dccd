//! Mock platform implementation for testing
//!
//! [`MockTimeline`] plays the account's remote timeline and survives across
//! sessions, so tests can simulate a process restart (fresh local state) and
//! check that the remote timeline still prevents a duplicate post.
//! [`MockConnector`] hands out [`MockPublisher`] sessions on that timeline.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{CredentialError, PlatformError, Result};
use crate::platforms::{Connector, Publisher};
use crate::types::PublishedStatus;

/// A media upload seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub path: PathBuf,
    pub alt_text: String,
    /// Whether the file existed when the upload was attempted
    pub file_existed: bool,
}

/// A published status seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub text: String,
    pub media_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct TimelineState {
    statuses: Vec<String>,
    uploads: Vec<UploadRecord>,
    posts: Vec<PostRecord>,
    verify_calls: usize,
    fail_verify: bool,
    fail_upload: Option<String>,
    fail_post: Option<String>,
    fail_timeline: Option<String>,
}

/// Shared, inspectable stand-in for the account's timeline
#[derive(Debug, Clone, Default)]
pub struct MockTimeline {
    state: Arc<Mutex<TimelineState>>,
}

impl MockTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline whose most recent status is `text`
    pub fn with_latest(text: &str) -> Self {
        let timeline = Self::new();
        timeline.state.lock().unwrap().statuses.push(text.to_string());
        timeline
    }

    pub fn set_fail_verify(&self, fail: bool) {
        self.state.lock().unwrap().fail_verify = fail;
    }

    pub fn set_fail_upload(&self, error: Option<&str>) {
        self.state.lock().unwrap().fail_upload = error.map(str::to_string);
    }

    pub fn set_fail_post(&self, error: Option<&str>) {
        self.state.lock().unwrap().fail_post = error.map(str::to_string);
    }

    pub fn set_fail_timeline(&self, error: Option<&str>) {
        self.state.lock().unwrap().fail_timeline = error.map(str::to_string);
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn post_count(&self) -> usize {
        self.state.lock().unwrap().posts.len()
    }

    pub fn verify_calls(&self) -> usize {
        self.state.lock().unwrap().verify_calls
    }
}

/// Session on a [`MockTimeline`]
pub struct MockPublisher {
    timeline: MockTimeline,
}

impl MockPublisher {
    pub fn new(timeline: MockTimeline) -> Self {
        Self { timeline }
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn verify(&self) -> Result<()> {
        let mut state = self.timeline.state.lock().unwrap();
        state.verify_calls += 1;
        if state.fail_verify {
            return Err(PlatformError::Authentication("Mock session expired".to_string()).into());
        }
        Ok(())
    }

    async fn latest_status_text(&self) -> Result<Option<String>> {
        let state = self.timeline.state.lock().unwrap();
        if let Some(error) = &state.fail_timeline {
            return Err(PlatformError::Network(error.clone()).into());
        }
        Ok(state.statuses.last().cloned())
    }

    async fn upload_media(&self, path: &Path, alt_text: &str) -> Result<String> {
        let mut state = self.timeline.state.lock().unwrap();
        state.uploads.push(UploadRecord {
            path: path.to_path_buf(),
            alt_text: alt_text.to_string(),
            file_existed: path.exists(),
        });

        if let Some(error) = &state.fail_upload {
            return Err(PlatformError::Upload(error.clone()).into());
        }
        Ok(format!("media-{}", state.uploads.len()))
    }

    async fn post_status(&self, text: &str, media_ids: &[String]) -> Result<PublishedStatus> {
        let mut state = self.timeline.state.lock().unwrap();
        if let Some(error) = &state.fail_post {
            return Err(PlatformError::Posting(error.clone()).into());
        }

        state.posts.push(PostRecord {
            text: text.to_string(),
            media_ids: media_ids.to_vec(),
        });
        state.statuses.push(text.to_string());

        let id = uuid::Uuid::new_v4().to_string();
        Ok(PublishedStatus {
            url: Some(format!("https://mock.example/@biketag/{}", id)),
            id,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Connector handing out sessions on a shared [`MockTimeline`]
#[derive(Debug, Clone)]
pub struct MockConnector {
    timeline: MockTimeline,
    connects: Arc<Mutex<usize>>,
    reject: Arc<Mutex<Option<String>>>,
}

impl MockConnector {
    pub fn new(timeline: MockTimeline) -> Self {
        Self {
            timeline,
            connects: Arc::new(Mutex::new(0)),
            reject: Arc::new(Mutex::new(None)),
        }
    }

    /// Connector whose credential exchange always fails
    pub fn rejecting(timeline: MockTimeline, reason: &str) -> Self {
        let connector = Self::new(timeline);
        connector.set_reject(Some(reason));
        connector
    }

    pub fn set_reject(&self, reason: Option<&str>) {
        *self.reject.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Publisher>> {
        let mut connects = self.connects.lock().unwrap();
        *connects += 1;

        if let Some(reason) = self.reject.lock().unwrap().clone() {
            return Err(CredentialError::Rejected(reason).into());
        }

        Ok(Box::new(MockPublisher::new(self.timeline.clone())))
    }
}
