//! Scheduler: periodic tick that publishes due jobs
//!
//! Each tick takes a snapshot of due job ids, claims each job with a
//! compare-and-set (`QUEUED -> POSTING`) and fans it out to its platforms
//! through the [`Dispatcher`]. A failing platform never stops the others, and
//! a failing job never stops the tick.
//!
//! # Fan-out
//!
//! - `sequential` (default): platforms are called one after another, in order
//! - `parallel`: all platforms are called at once; results keep platform order
//!
//! Either way every platform is attempted and the job's `error` is the first
//! failure by platform index.
//!
//! # Example
//!
//! ```no_run
//! use libomnicast::service::OmnicastService;
//!
//! # async fn example() -> libomnicast::Result<()> {
//! let service = OmnicastService::from_config(libomnicast::Config::default())?;
//! let handle = service.start_scheduler();
//! // ... later
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::alerts::{AlertLevel, AlertStore};
use crate::config::{FanOut, SchedulerConfig};
use crate::credentials::CredentialProvider;
use crate::dispatch::Dispatcher;
use crate::error::AdapterError;
use crate::jobs::{JobStatus, JobStore, PublishJob};
use crate::service::events::{Event, EventBus};
use crate::types::{NormalizedPost, PlatformResult};

const ALERT_SOURCE: &str = "scheduler";

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Jobs that looked due when the tick started
    pub due: usize,
    pub posted: Vec<String>,
    pub failed: Vec<String>,
    /// Due jobs another tick claimed first
    pub skipped: usize,
}

pub struct Scheduler {
    jobs: Arc<JobStore>,
    dispatcher: Dispatcher,
    credentials: Arc<dyn CredentialProvider>,
    alerts: Arc<AlertStore>,
    events: EventBus,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        jobs: Arc<JobStore>,
        dispatcher: Dispatcher,
        credentials: Arc<dyn CredentialProvider>,
        alerts: Arc<AlertStore>,
        events: EventBus,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            jobs,
            dispatcher,
            credentials,
            alerts,
            events,
            config,
        }
    }

    pub async fn tick(&self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// Run one tick treating `now` as the current time for due checks
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let due = self.jobs.due_ids(now);
        let mut report = TickReport {
            due: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            debug!("No jobs due");
            return report;
        }

        info!(count = due.len(), "Processing due jobs");

        for id in due {
            let job = match self.jobs.begin_posting(&id) {
                Ok(Some(job)) => job,
                Ok(None) => {
                    debug!(job_id = %id, "Job already claimed, skipping");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(job_id = %id, error = %e, "Job disappeared before posting");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.run_job(job).await {
                Some(finished) if finished.status == JobStatus::Posted => {
                    report.posted.push(finished.id)
                }
                Some(finished) => report.failed.push(finished.id),
                None => report.skipped += 1,
            }
        }

        info!(
            posted = report.posted.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "Tick complete"
        );
        report
    }

    async fn run_job(&self, job: PublishJob) -> Option<PublishJob> {
        self.events.emit(Event::JobPosting {
            job_id: job.id.clone(),
            platforms: job.platforms.clone(),
        });

        let results = match self.config.fan_out {
            FanOut::Sequential => {
                let mut results = Vec::with_capacity(job.platforms.len());
                for platform in &job.platforms {
                    results.push(self.publish_one(platform, &job).await);
                }
                results
            }
            FanOut::Parallel => {
                join_all(
                    job.platforms
                        .iter()
                        .map(|platform| self.publish_one(platform, &job)),
                )
                .await
            }
        };

        let finished = match self.jobs.finish(&job.id, results, Utc::now()) {
            Ok(finished) => finished,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Could not record job outcome");
                return None;
            }
        };

        match finished.status {
            JobStatus::Posted => {
                info!(job_id = %finished.id, "Job posted");
                self.events.emit(Event::JobPosted {
                    job_id: finished.id.clone(),
                    results: finished.results.clone(),
                });
            }
            _ => {
                let message = finished.error.clone().unwrap_or_default();
                warn!(job_id = %finished.id, error = %message, "Job failed");
                self.alerts.raise(
                    AlertLevel::Error,
                    ALERT_SOURCE,
                    format!("Job {} failed: {}", finished.id, message),
                );
                self.events.emit(Event::JobFailed {
                    job_id: finished.id.clone(),
                    error: message,
                    results: finished.results.clone(),
                });
            }
        }

        Some(finished)
    }

    async fn publish_one(&self, platform: &str, job: &PublishJob) -> PlatformResult {
        let mut post = NormalizedPost::new(job.text.clone());
        post.media_url = job.media_urls.first().cloned();
        let post = self.credentials.credentials_for(platform).apply(post);

        let limit = Duration::from_secs(self.config.call_timeout);
        match timeout(limit, self.dispatcher.publish(platform, &post)).await {
            Ok(Ok(receipt)) => PlatformResult::ok(platform, receipt),
            Ok(Err(e)) => PlatformResult::failed(platform, e.to_body()),
            Err(_) => {
                let e = AdapterError::upstream(
                    platform,
                    Some(504),
                    format!("Timed out after {}s", self.config.call_timeout),
                );
                warn!(job_id = %job.id, platform, "Platform call timed out");
                PlatformResult::failed(platform, e.to_body())
            }
        }
    }

    /// Run the tick loop on the current runtime until shut down
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = Duration::from_secs(self.config.tick_interval.max(1));

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = period.as_secs(), "Scheduler started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Scheduler stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running scheduler task
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop; a tick already in progress finishes first
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::NoCredentials;
    use crate::jobs::JobRequest;
    use crate::platforms::mock::{MockAdapter, MockBehavior, MockConfig};
    use crate::platforms::AdapterRegistry;
    use chrono::Duration as ChronoDuration;

    struct Fixture {
        jobs: Arc<JobStore>,
        alerts: Arc<AlertStore>,
        events: EventBus,
        scheduler: Arc<Scheduler>,
    }

    fn fixture(adapters: Vec<MockAdapter>, config: SchedulerConfig) -> Fixture {
        let mut registry = AdapterRegistry::new();
        for adapter in adapters {
            registry.register(Arc::new(adapter));
        }
        let jobs = Arc::new(JobStore::new());
        let alerts = Arc::new(AlertStore::new(10));
        let events = EventBus::new(32);
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&jobs),
            Dispatcher::new(Arc::new(registry)),
            Arc::new(NoCredentials),
            Arc::clone(&alerts),
            events.clone(),
            config,
        ));
        Fixture {
            jobs,
            alerts,
            events,
            scheduler,
        }
    }

    #[tokio::test]
    async fn test_past_job_posts_future_job_waits() {
        let a = MockAdapter::success("a");
        let f = fixture(vec![a.clone()], SchedulerConfig::default());
        let now = Utc::now();

        let past = f
            .jobs
            .enqueue(JobRequest::new(&["a"], "past").at("2020-01-01T00:00:00Z"))
            .unwrap();
        let future = f
            .jobs
            .enqueue(
                JobRequest::new(&["a"], "future").at((now + ChronoDuration::hours(1)).to_rfc3339()),
            )
            .unwrap();

        let report = f.scheduler.tick_at(now).await;
        assert_eq!(report.posted, vec![past.id.clone()]);

        let posted = f.jobs.get(&past.id).unwrap();
        assert_eq!(posted.status, JobStatus::Posted);
        assert!(posted.posted_at.is_some());
        assert!(posted.error.is_none());
        assert_eq!(f.jobs.get(&future.id).unwrap().status, JobStatus::Queued);
        assert_eq!(a.calls(), vec!["past"]);
    }

    #[tokio::test]
    async fn test_first_failure_wins_and_later_platforms_still_attempted() {
        let a = MockAdapter::failure("a", "A is down");
        let b = MockAdapter::success("b");
        let c = MockAdapter::failure("c", "C is down");
        let f = fixture(
            vec![a.clone(), b.clone(), c.clone()],
            SchedulerConfig::default(),
        );

        let job = f
            .jobs
            .enqueue(JobRequest::new(&["a", "b", "c"], "fan out"))
            .unwrap();
        let report = f.scheduler.tick().await;

        assert_eq!(report.failed, vec![job.id.clone()]);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 1);

        let failed = f.jobs.get(&job.id).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("a request failed: A is down"));
        let outcome: Vec<bool> = failed.results.iter().map(|r| r.success).collect();
        assert_eq!(outcome, vec![false, true, false]);
        assert_eq!(f.alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_platform_fails_job_without_stopping_tick() {
        let a = MockAdapter::success("a");
        let f = fixture(vec![a.clone()], SchedulerConfig::default());

        let bad = f.jobs.enqueue(JobRequest::new(&["myspace"], "x")).unwrap();
        let good = f.jobs.enqueue(JobRequest::new(&["a"], "y")).unwrap();
        f.scheduler.tick().await;

        let bad = f.jobs.get(&bad.id).unwrap();
        assert_eq!(bad.status, JobStatus::Failed);
        assert_eq!(
            bad.results[0].error.as_ref().unwrap().code,
            "unsupported_platform"
        );
        assert_eq!(f.jobs.get(&good.id).unwrap().status, JobStatus::Posted);
    }

    #[tokio::test]
    async fn test_only_first_media_url_is_sent() {
        let a = MockAdapter::success("a");
        let f = fixture(vec![a.clone()], SchedulerConfig::default());

        f.jobs
            .enqueue(
                JobRequest::new(&["a"], "pics")
                    .with_media("https://cdn.example.com/1.png")
                    .with_media("https://cdn.example.com/2.png"),
            )
            .unwrap();
        f.scheduler.tick().await;

        assert_eq!(
            a.media(),
            vec![Some("https://cdn.example.com/1.png".to_string())]
        );
    }

    #[tokio::test]
    async fn test_concurrent_ticks_publish_once() {
        let a = MockAdapter::with_delay("a", std::time::Duration::from_millis(50));
        let f = fixture(vec![a.clone()], SchedulerConfig::default());
        let job = f.jobs.enqueue(JobRequest::new(&["a"], "once")).unwrap();

        let (r1, r2) = tokio::join!(f.scheduler.tick(), f.scheduler.tick());

        assert_eq!(a.call_count(), 1);
        assert_eq!(r1.posted.len() + r2.posted.len(), 1);
        assert_eq!(f.jobs.get(&job.id).unwrap().status, JobStatus::Posted);
    }

    #[tokio::test]
    async fn test_repeated_platform_is_called_once() {
        let telegram = MockAdapter::success("telegram");
        let f = fixture(vec![telegram.clone()], SchedulerConfig::default());

        let job = f
            .jobs
            .enqueue(JobRequest::new(
                &["telegram", "Telegram", " telegram "],
                "no echo",
            ))
            .unwrap();
        f.scheduler.tick().await;

        assert_eq!(telegram.call_count(), 1);
        let posted = f.jobs.get(&job.id).unwrap();
        assert_eq!(posted.status, JobStatus::Posted);
        assert_eq!(posted.results.len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_not_retried() {
        let a = MockAdapter::failure("a", "nope");
        let f = fixture(vec![a.clone()], SchedulerConfig::default());
        f.jobs.enqueue(JobRequest::new(&["a"], "x")).unwrap();

        f.scheduler.tick().await;
        let second = f.scheduler.tick().await;

        assert_eq!(second.due, 0);
        assert_eq!(a.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_becomes_504() {
        let slow = MockAdapter::with_delay("slow", std::time::Duration::from_secs(60));
        let config = SchedulerConfig {
            call_timeout: 2,
            ..Default::default()
        };
        let f = fixture(vec![slow], config);
        let job = f.jobs.enqueue(JobRequest::new(&["slow"], "x")).unwrap();

        f.scheduler.tick().await;

        let failed = f.jobs.get(&job.id).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        let body = failed.results[0].error.as_ref().unwrap();
        assert_eq!(body.status, 504);
        assert_eq!(body.code, "upstream_failure");
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_fan_out_keeps_platform_order() {
        let slow_fail = MockAdapter::new(MockConfig {
            name: "slow".to_string(),
            behavior: MockBehavior::Fail(AdapterError::upstream("slow", Some(500), "slow broke")),
            delay: std::time::Duration::from_secs(5),
            ..Default::default()
        });
        let fast_fail = MockAdapter::failure("fast", "fast broke");
        let config = SchedulerConfig {
            fan_out: FanOut::Parallel,
            ..Default::default()
        };
        let f = fixture(vec![slow_fail, fast_fail], config);
        let job = f
            .jobs
            .enqueue(JobRequest::new(&["slow", "fast"], "x"))
            .unwrap();

        f.scheduler.tick().await;

        let failed = f.jobs.get(&job.id).unwrap();
        assert_eq!(failed.results[0].platform, "slow");
        assert_eq!(failed.error.as_deref(), Some("slow request failed: slow broke"));
    }

    #[tokio::test]
    async fn test_events_emitted_in_order() {
        let a = MockAdapter::success("a");
        let f = fixture(vec![a], SchedulerConfig::default());
        let mut events = f.events.subscribe();
        let job = f.jobs.enqueue(JobRequest::new(&["a"], "x")).unwrap();

        f.scheduler.tick().await;

        assert!(matches!(events.recv().await.unwrap(), Event::JobPosting { .. }));
        match events.recv().await.unwrap() {
            Event::JobPosted { job_id, results } => {
                assert_eq!(job_id, job.id);
                assert!(results[0].success);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_ticks_and_shuts_down() {
        let a = MockAdapter::success("a");
        let config = SchedulerConfig {
            tick_interval: 5,
            ..Default::default()
        };
        let f = fixture(vec![a.clone()], config);
        f.jobs.enqueue(JobRequest::new(&["a"], "x")).unwrap();

        let handle = Arc::clone(&f.scheduler).spawn();
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(a.call_count(), 1);

        handle.shutdown().await;
    }
}
