//! Platforms without a usable public posting API
//!
//! They stay in the registry so capability listings are complete, but every
//! publish fails with `not_supported` and never touches the network.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::platforms::Adapter;
use crate::types::{Capabilities, NormalizedPost, PublishReceipt};

#[derive(Debug, Clone, Copy)]
pub struct UnsupportedAdapter {
    id: &'static str,
    reason: &'static str,
    analytics: bool,
    note: &'static str,
}

impl UnsupportedAdapter {
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

pub fn youtube() -> UnsupportedAdapter {
    UnsupportedAdapter {
        id: "youtube",
        reason: "video_upload_required",
        analytics: true,
        note: "Posting requires a resumable video upload",
    }
}

pub fn tiktok() -> UnsupportedAdapter {
    UnsupportedAdapter {
        id: "tiktok",
        reason: "partner_only",
        analytics: false,
        note: "Content posting API is limited to approved partners",
    }
}

pub fn snapchat() -> UnsupportedAdapter {
    UnsupportedAdapter {
        id: "snapchat",
        reason: "no_public_api",
        analytics: false,
        note: "No public posting API",
    }
}

pub fn all() -> Vec<UnsupportedAdapter> {
    vec![youtube(), tiktok(), snapchat()]
}

#[async_trait]
impl Adapter for UnsupportedAdapter {
    fn id(&self) -> &str {
        self.id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            post: false,
            media: false,
            analytics: self.analytics,
            note: self.note,
        }
    }

    async fn publish(&self, _post: &NormalizedPost) -> Result<PublishReceipt, AdapterError> {
        Err(AdapterError::not_supported(self.id, self.reason))
    }
}
