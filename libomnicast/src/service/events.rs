//! Event bus for job and approval lifecycle notifications
//!
//! Uses `tokio::sync::broadcast`, so any number of subscribers (a CLI progress
//! line, a log forwarder) can listen without slowing emitters down. With no
//! subscribers events are simply dropped; lagging subscribers lose the oldest
//! events first.
//!
//! # Example
//!
//! ```no_run
//! use libomnicast::service::events::{Event, EventBus};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::JobQueued {
//!     job_id: "abc123".to_string(),
//!     platforms: vec!["telegram".to_string()],
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::approval::{ApprovalStatus, Decision};
use crate::types::PlatformResult;

pub type EventReceiver = broadcast::Receiver<Event>;

/// Default per-subscriber buffer
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is the number of events buffered per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send to every current subscriber; never blocks
    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    JobQueued {
        job_id: String,
        platforms: Vec<String>,
    },

    /// A tick claimed the job; platform calls follow
    JobPosting {
        job_id: String,
        platforms: Vec<String>,
    },

    JobPosted {
        job_id: String,
        results: Vec<PlatformResult>,
    },

    JobFailed {
        job_id: String,
        /// First failure, same as the job's `error`
        error: String,
        results: Vec<PlatformResult>,
    },

    ApprovalSubmitted {
        approval_id: String,
        items: usize,
    },

    ApprovalDecided {
        approval_id: String,
        index: usize,
        decision: Decision,
        status: ApprovalStatus,
    },
}

impl Event {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Event::JobQueued { job_id, .. }
            | Event::JobPosting { job_id, .. }
            | Event::JobPosted { job_id, .. }
            | Event::JobFailed { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}
