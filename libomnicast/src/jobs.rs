//! Job store for scheduled fan-out publishing
//!
//! A job is one text/media payload sent to several platforms at a scheduled
//! time. Jobs move `QUEUED -> POSTING -> POSTED | FAILED`; the terminal states
//! are never left and nothing is retried automatically.
//!
//! Each job sits behind its own mutex. The `QUEUED -> POSTING` transition is a
//! compare-and-set under that mutex, so two overlapping ticks can never both
//! claim the same job.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OmnicastError, Result};
use crate::platforms::normalize_id;
use crate::scheduling::parse_when;
use crate::types::PlatformResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Posting,
    Posted,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Posted | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishJob {
    pub id: String,
    /// Target platforms, in fan-out order
    pub platforms: Vec<String>,
    pub text: String,
    /// Only the first URL is sent to each platform
    pub media_urls: Vec<String>,
    /// Scheduled time; `None` means due immediately
    pub when: Option<DateTime<Utc>>,
    pub status: JobStatus,
    /// Message of the first failed platform call
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    /// One entry per attempted platform, in `platforms` order
    #[serde(default)]
    pub results: Vec<PlatformResult>,
}

impl PublishJob {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Queued && self.when.map_or(true, |when| when <= now)
    }
}

/// Caller input for one job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub platforms: Vec<String>,
    pub text: String,
    /// Schedule string, see [`crate::scheduling::parse_when`]
    #[serde(default, alias = "whenISO", alias = "when_iso")]
    pub when: Option<String>,
    #[serde(default, alias = "mediaUrls")]
    pub media_urls: Vec<String>,
}

impl JobRequest {
    pub fn new(platforms: &[&str], text: &str) -> Self {
        Self {
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn at(mut self, when: impl Into<String>) -> Self {
        self.when = Some(when.into());
        self
    }

    pub fn with_media(mut self, url: impl Into<String>) -> Self {
        self.media_urls.push(url.into());
        self
    }
}

#[derive(Default)]
struct JobTable {
    /// Insertion order, used for listing and tick order
    order: Vec<String>,
    jobs: HashMap<String, Arc<Mutex<PublishJob>>>,
}

/// In-memory job records
#[derive(Default)]
pub struct JobStore {
    table: RwLock<JobTable>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(request: JobRequest, last_scheduled: Option<DateTime<Utc>>) -> Result<PublishJob> {
        // Platforms are a set; keep the first occurrence of each id
        let mut seen = HashSet::new();
        let platforms: Vec<String> = request
            .platforms
            .iter()
            .map(|p| normalize_id(p))
            .filter(|p| !p.is_empty() && seen.insert(p.clone()))
            .collect();
        if platforms.is_empty() {
            return Err(OmnicastError::Validation(
                "Job needs at least one platform".to_string(),
            ));
        }

        let when = request
            .when
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .map(|w| parse_when(w, last_scheduled))
            .transpose()?;

        Ok(PublishJob {
            id: Uuid::new_v4().to_string(),
            platforms,
            text: request.text,
            media_urls: request.media_urls,
            when,
            status: JobStatus::Queued,
            error: None,
            created_at: Utc::now(),
            posted_at: None,
            results: Vec::new(),
        })
    }

    fn insert(&self, jobs: &[PublishJob]) {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        for job in jobs {
            table.order.push(job.id.clone());
            table
                .jobs
                .insert(job.id.clone(), Arc::new(Mutex::new(job.clone())));
        }
    }

    /// Add one `QUEUED` job
    ///
    /// # Errors
    ///
    /// `Validation` if there are no platforms or `when` cannot be parsed.
    pub fn enqueue(&self, request: JobRequest) -> Result<PublishJob> {
        let job = Self::build(request, None)?;
        self.insert(std::slice::from_ref(&job));
        tracing::info!(job_id = %job.id, platforms = ?job.platforms, when = ?job.when, "Job queued");
        Ok(job)
    }

    /// Add several jobs, all or nothing
    ///
    /// A `random:` schedule counts from the previous item's time, so a bulk
    /// import spreads posts out instead of bunching them.
    pub fn enqueue_bulk(&self, requests: Vec<JobRequest>) -> Result<Vec<PublishJob>> {
        let mut jobs = Vec::with_capacity(requests.len());
        let mut last_scheduled = None;
        for (index, request) in requests.into_iter().enumerate() {
            let job = Self::build(request, last_scheduled).map_err(|e| match e {
                OmnicastError::Validation(msg) => {
                    OmnicastError::Validation(format!("item {}: {}", index, msg))
                }
                other => other,
            })?;
            last_scheduled = job.when.or(last_scheduled);
            jobs.push(job);
        }

        self.insert(&jobs);
        tracing::info!(count = jobs.len(), "Jobs queued in bulk");
        Ok(jobs)
    }

    fn entry(&self, id: &str) -> Result<Arc<Mutex<PublishJob>>> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        table
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| OmnicastError::NotFound(format!("job {}", id)))
    }

    pub fn get(&self, id: &str) -> Result<PublishJob> {
        let entry = self.entry(id)?;
        let job = entry.lock().unwrap_or_else(|e| e.into_inner());
        Ok(job.clone())
    }

    /// Snapshot of every job in enqueue order
    pub fn list(&self) -> Vec<PublishJob> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        table
            .order
            .iter()
            .filter_map(|id| table.jobs.get(id))
            .map(|entry| entry.lock().unwrap_or_else(|e| e.into_inner()).clone())
            .collect()
    }

    /// Ids of jobs that are `QUEUED` and due at `now`, in enqueue order
    pub fn due_ids(&self, now: DateTime<Utc>) -> Vec<String> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        table
            .order
            .iter()
            .filter(|id| {
                table
                    .jobs
                    .get(*id)
                    .map(|entry| entry.lock().unwrap_or_else(|e| e.into_inner()).is_due(now))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Claim a job for posting
    ///
    /// Atomically moves `QUEUED` to `POSTING` and returns the claimed job.
    /// Returns `None` if the job is in any other state, which means another
    /// tick already has it.
    pub fn begin_posting(&self, id: &str) -> Result<Option<PublishJob>> {
        let entry = self.entry(id)?;
        let mut job = entry.lock().unwrap_or_else(|e| e.into_inner());
        if job.status != JobStatus::Queued {
            return Ok(None);
        }
        job.status = JobStatus::Posting;
        Ok(Some(job.clone()))
    }

    /// Store the outcome of a `POSTING` job
    ///
    /// `POSTED` with `posted_at = now` when every result succeeded; otherwise
    /// `FAILED` with the first failed result's message.
    pub fn finish(
        &self,
        id: &str,
        results: Vec<PlatformResult>,
        now: DateTime<Utc>,
    ) -> Result<PublishJob> {
        let entry = self.entry(id)?;
        let mut job = entry.lock().unwrap_or_else(|e| e.into_inner());
        if job.status != JobStatus::Posting {
            return Err(OmnicastError::Validation(format!(
                "job {} is {:?}, not POSTING",
                id, job.status
            )));
        }

        let first_failure = results
            .iter()
            .find(|r| !r.success)
            .map(|r| match &r.error {
                Some(body) => body.message.clone(),
                None => format!("{} failed", r.platform),
            });

        match first_failure {
            Some(message) => {
                job.status = JobStatus::Failed;
                job.error = Some(message);
            }
            None => {
                job.status = JobStatus::Posted;
                job.posted_at = Some(now);
            }
        }
        job.results = results;
        Ok(job.clone())
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every job
    pub fn dispose(&self) {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        table.order.clear();
        table.jobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::types::PublishReceipt;
    use chrono::Duration;

    #[test]
    fn test_enqueue_defaults() {
        let store = JobStore::new();
        let job = store
            .enqueue(JobRequest::new(&["Telegram", " x "], "hello"))
            .unwrap();

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.platforms, vec!["telegram", "x"]);
        assert!(job.when.is_none());
        assert_eq!(store.get(&job.id).unwrap(), job);
    }

    #[test]
    fn test_duplicate_platforms_collapse_in_order() {
        let store = JobStore::new();
        let job = store
            .enqueue(JobRequest::new(
                &["telegram", "X", "Telegram", " telegram ", "x", "slack"],
                "once each",
            ))
            .unwrap();

        assert_eq!(job.platforms, vec!["telegram", "x", "slack"]);
        assert_eq!(store.get(&job.id).unwrap().platforms, job.platforms);
    }

    #[test]
    fn test_enqueue_validation() {
        let store = JobStore::new();

        let err = store.enqueue(JobRequest::new(&[], "hello")).unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = store
            .enqueue(JobRequest::new(&["x"], "hello").at("not a time"))
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(store.is_empty());
    }

    #[test]
    fn test_due_past_and_future() {
        let store = JobStore::new();
        let now = Utc::now();
        let past = store
            .enqueue(JobRequest::new(&["x"], "past").at("2020-01-01T00:00:00Z"))
            .unwrap();
        let unscheduled = store.enqueue(JobRequest::new(&["x"], "now")).unwrap();
        let future = store
            .enqueue(JobRequest::new(&["x"], "later").at((now + Duration::hours(1)).to_rfc3339()))
            .unwrap();

        let due = store.due_ids(now);
        assert_eq!(due, vec![past.id.clone(), unscheduled.id.clone()]);
        assert!(!due.contains(&future.id));
        assert!(store.due_ids(now + Duration::hours(2)).contains(&future.id));
    }

    #[test]
    fn test_begin_posting_is_compare_and_set() {
        let store = JobStore::new();
        let job = store.enqueue(JobRequest::new(&["x"], "once")).unwrap();

        let claimed = store.begin_posting(&job.id).unwrap();
        assert_eq!(claimed.unwrap().status, JobStatus::Posting);
        assert!(store.begin_posting(&job.id).unwrap().is_none());
        assert!(store.due_ids(Utc::now()).is_empty());
    }

    #[test]
    fn test_finish_posted_and_failed() {
        let store = JobStore::new();
        let now = Utc::now();

        let ok = store.enqueue(JobRequest::new(&["a"], "ok")).unwrap();
        store.begin_posting(&ok.id).unwrap();
        let done = store
            .finish(
                &ok.id,
                vec![PlatformResult::ok("a", PublishReceipt::Id("1".into()))],
                now,
            )
            .unwrap();
        assert_eq!(done.status, JobStatus::Posted);
        assert_eq!(done.posted_at, Some(now));

        let bad = store.enqueue(JobRequest::new(&["a", "b"], "bad")).unwrap();
        store.begin_posting(&bad.id).unwrap();
        let failed = store
            .finish(
                &bad.id,
                vec![
                    PlatformResult::failed(
                        "a",
                        AdapterError::upstream("a", Some(500), "boom").to_body(),
                    ),
                    PlatformResult::failed(
                        "b",
                        AdapterError::MissingCredential("k".into()).to_body(),
                    ),
                ],
                now,
            )
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("a request failed: boom"));
        assert!(failed.posted_at.is_none());
        assert_eq!(failed.results.len(), 2);
    }

    #[test]
    fn test_finish_requires_posting() {
        let store = JobStore::new();
        let job = store.enqueue(JobRequest::new(&["a"], "x")).unwrap();
        assert!(store.finish(&job.id, vec![], Utc::now()).is_err());
    }

    #[test]
    fn test_bulk_is_all_or_nothing() {
        let store = JobStore::new();
        let err = store
            .enqueue_bulk(vec![
                JobRequest::new(&["x"], "fine"),
                JobRequest::new(&["x"], "broken").at("whenever"),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("item 1"));
        assert!(store.is_empty());

        let jobs = store
            .enqueue_bulk(vec![
                JobRequest::new(&["x"], "one").at("2030-01-01T00:00:00Z"),
                JobRequest::new(&["x"], "two").at("random:10m-20m"),
            ])
            .unwrap();
        assert_eq!(store.list().len(), 2);
        let gap = jobs[1].when.unwrap() - jobs[0].when.unwrap();
        assert!(gap >= Duration::minutes(10) && gap <= Duration::minutes(20));
    }

    #[test]
    fn test_request_accepts_when_iso_alias() {
        let request: JobRequest = serde_json::from_value(serde_json::json!({
            "platforms": ["telegram"],
            "text": "hi",
            "whenISO": "2020-01-01T00:00:00Z",
            "mediaUrls": ["https://cdn.example.com/a.png"]
        }))
        .unwrap();
        assert_eq!(request.when.as_deref(), Some("2020-01-01T00:00:00Z"));
        assert_eq!(request.media_urls.len(), 1);
    }
}
