//! Omnicast - publish one post to many social and messaging networks
//!
//! A normalized post goes through an adapter per platform, optionally behind a
//! human approval step and a time-based scheduler. All state is in memory and
//! lives as long as the process.

pub mod alerts;
pub mod approval;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod platforms;
pub mod scheduler;
pub mod scheduling;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AdapterError, ErrorBody, OmnicastError, Result};
pub use jobs::{JobRequest, JobStatus, PublishJob};
pub use service::OmnicastService;
pub use types::{AdapterInfo, Capabilities, NormalizedPost, PlatformResult, PublishReceipt};
