//! Mock adapter for testing
//!
//! A configurable adapter that can succeed, fail, or stall, and records every
//! call it receives. Used by dispatch and scheduler tests to exercise fan-out
//! logic without credentials or network access.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::AdapterError;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

/// What a mock adapter does when called
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Succeed,
    Fail(AdapterError),
}

/// Configuration for mock adapter behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Registry id (e.g., "mock-a")
    pub name: String,
    pub behavior: MockBehavior,
    /// Delay before completing (simulates network latency)
    pub delay: Duration,
    /// Texts received, in call order (shared across clones)
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Media URLs received, in call order
    pub media: Arc<Mutex<Vec<Option<String>>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            behavior: MockBehavior::Succeed,
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            media: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock adapter for testing
#[derive(Debug, Clone)]
pub struct MockAdapter {
    config: MockConfig,
}

impl MockAdapter {
    pub const NOTE: &'static str = "Mock adapter for tests";

    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock adapter that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock adapter that always fails with an upstream error
    pub fn failure(name: &str, message: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            behavior: MockBehavior::Fail(AdapterError::upstream(name, Some(500), message)),
            ..Default::default()
        })
    }

    /// Create a mock adapter that fails with the given error
    pub fn failing_with(name: &str, error: AdapterError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            behavior: MockBehavior::Fail(error),
            ..Default::default()
        })
    }

    /// Create a mock adapter that succeeds after a delay
    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    /// Number of times publish was called
    pub fn call_count(&self) -> usize {
        self.config.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Texts received by publish, in call order
    pub fn calls(&self) -> Vec<String> {
        self.config
            .calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Media URLs received by publish, in call order
    pub fn media(&self) -> Vec<Option<String>> {
        self.config
            .media
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn id(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: true,
            media: true,
            analytics: false,
            note: Self::NOTE,
        }
    }

    async fn publish(&self, post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        if let Ok(mut calls) = self.config.calls.lock() {
            calls.push(post.text.clone());
        }
        if let Ok(mut media) = self.config.media.lock() {
            media.push(post.media_url.clone());
        }

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        match &self.config.behavior {
            MockBehavior::Succeed => Ok(PublishReceipt::Id(format!(
                "{}:mock-{}",
                self.config.name,
                uuid::Uuid::new_v4()
            ))),
            MockBehavior::Fail(error) => Err(error.clone()),
        }
    }
}
