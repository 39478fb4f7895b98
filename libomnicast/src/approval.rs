//! Approval workflow
//!
//! An approval record holds a batch of proposed posts and one independent
//! decision slot per item. The record is `DECIDED` once every slot is filled
//! and `PENDING` until then. Deciding an index again overwrites the earlier
//! decision.
//!
//! Approval is bookkeeping only; it does not gate the scheduler.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OmnicastError, Result};

/// One proposed post awaiting review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalItem {
    pub platform: String,
    /// Free-form post kind (e.g. "post", "story", "article")
    pub kind: String,
    pub text: String,
    #[serde(default, alias = "mediaUrls")]
    pub media_urls: Vec<String>,
}

impl ApprovalItem {
    pub fn new(platform: &str, kind: &str, text: &str) -> Self {
        Self {
            platform: platform.to_string(),
            kind: kind.to_string(),
            text: text.to_string(),
            media_urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved => write!(f, "APPROVED"),
            Decision::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl FromStr for Decision {
    type Err = OmnicastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVED" | "APPROVE" => Ok(Decision::Approved),
            "REJECTED" | "REJECT" => Ok(Decision::Rejected),
            _ => Err(OmnicastError::Validation(format!(
                "Invalid decision '{}'. Expected APPROVED or REJECTED",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Decided,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDecision {
    pub decision: Decision,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: String,
    pub status: ApprovalStatus,
    pub policy: String,
    pub items: Vec<ApprovalItem>,
    /// Same length as `items`; `None` until that index is decided
    pub decisions: Vec<Option<ItemDecision>>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord {
    fn recompute_status(&mut self) {
        self.status = if self.decisions.iter().all(Option::is_some) {
            ApprovalStatus::Decided
        } else {
            ApprovalStatus::Pending
        };
    }

    pub fn decided_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_some()).count()
    }
}

/// In-memory approval records, one lock per record
#[derive(Default)]
pub struct ApprovalStore {
    records: RwLock<HashMap<String, Arc<Mutex<ApprovalRecord>>>>,
}

impl ApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `PENDING` record for `items`
    ///
    /// # Errors
    ///
    /// `Validation` if `items` is empty or any item has empty text.
    pub fn submit(&self, items: Vec<ApprovalItem>, policy: &str) -> Result<ApprovalRecord> {
        if items.is_empty() {
            return Err(OmnicastError::Validation(
                "Approval needs at least one item".to_string(),
            ));
        }
        if let Some(index) = items.iter().position(|item| item.text.trim().is_empty()) {
            return Err(OmnicastError::Validation(format!(
                "Item {} has empty text",
                index
            )));
        }

        let record = ApprovalRecord {
            id: Uuid::new_v4().to_string(),
            status: ApprovalStatus::Pending,
            policy: policy.to_string(),
            decisions: vec![None; items.len()],
            items,
            created_at: Utc::now(),
        };

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(record.id.clone(), Arc::new(Mutex::new(record.clone())));

        tracing::info!(
            approval_id = %record.id,
            items = record.items.len(),
            policy = %record.policy,
            "Approval submitted"
        );
        Ok(record)
    }

    fn entry(&self, id: &str) -> Result<Arc<Mutex<ApprovalRecord>>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records
            .get(id)
            .cloned()
            .ok_or_else(|| OmnicastError::NotFound(format!("approval {}", id)))
    }

    pub fn get(&self, id: &str) -> Result<ApprovalRecord> {
        let entry = self.entry(id)?;
        let record = entry.lock().unwrap_or_else(|e| e.into_inner());
        Ok(record.clone())
    }

    /// Record a decision for one item and return the updated record
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record has this id
    /// - `IndexOutOfRange` if `index >= items.len()`
    pub fn decide(
        &self,
        id: &str,
        index: usize,
        decision: Decision,
        note: Option<String>,
    ) -> Result<ApprovalRecord> {
        let entry = self.entry(id)?;
        let mut record = entry.lock().unwrap_or_else(|e| e.into_inner());

        let len = record.items.len();
        let slot = record
            .decisions
            .get_mut(index)
            .ok_or(OmnicastError::IndexOutOfRange { index, len })?;
        *slot = Some(ItemDecision {
            decision,
            note,
            at: Utc::now(),
        });
        record.recompute_status();

        tracing::info!(
            approval_id = %id,
            index,
            %decision,
            status = ?record.status,
            "Approval item decided"
        );
        Ok(record.clone())
    }

    pub fn list(&self) -> Vec<ApprovalRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<ApprovalRecord> = records
            .values()
            .map(|entry| entry.lock().unwrap_or_else(|e| e.into_inner()).clone())
            .collect();
        all.sort_by_key(|r| r.created_at);
        all
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record
    pub fn dispose(&self) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
