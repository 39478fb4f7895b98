//! Service layer for Omnicast
//!
//! `OmnicastService` is the single entry point binaries and embedders use. It
//! owns the in-memory stores, the adapter registry and the scheduler, and
//! exposes the inbound operations:
//!
//! - approvals: `submit_approval`, `decide_approval`, `get_approval`
//! - jobs: `enqueue_job`, `enqueue_bulk`, `list_jobs`, `get_job`
//! - publishing: `list_adapters`, `publish_now`
//! - monitoring: `alerts`, `raise_alert`, `subscribe`
//!
//! # Example
//!
//! ```no_run
//! use libomnicast::jobs::JobRequest;
//! use libomnicast::service::OmnicastService;
//!
//! # async fn example() -> libomnicast::Result<()> {
//! let service = OmnicastService::new()?;
//!
//! let job = service.enqueue_job(
//!     JobRequest::new(&["telegram", "mastodon"], "Doors open at 9").at("2030-01-01T09:00:00Z"),
//! )?;
//! println!("Queued {}", job.id);
//!
//! let handle = service.start_scheduler();
//! # handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod events;

use std::sync::Arc;

use crate::alerts::{Alert, AlertLevel, AlertStore};
use crate::approval::{ApprovalItem, ApprovalRecord, ApprovalStatus, ApprovalStore, Decision};
use crate::config::Config;
use crate::credentials::{ConfigCredentials, CredentialProvider};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::http;
use crate::jobs::{JobRequest, JobStore, PublishJob};
use crate::platforms::AdapterRegistry;
use crate::scheduler::{Scheduler, SchedulerHandle, TickReport};
use crate::types::{AdapterInfo, NormalizedPost, PublishReceipt};

use self::events::{Event, EventBus, EventReceiver};

pub struct OmnicastService {
    config: Arc<Config>,
    dispatcher: Dispatcher,
    approvals: Arc<ApprovalStore>,
    jobs: Arc<JobStore>,
    alerts: Arc<AlertStore>,
    event_bus: EventBus,
    scheduler: Arc<Scheduler>,
}

impl OmnicastService {
    /// Create a service from the default config location
    ///
    /// A missing config file means defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or the HTTP
    /// client cannot be built.
    pub fn new() -> Result<Self> {
        let config = Config::load_or_default()?;
        Self::from_config(config)
    }

    /// Create a service with every built-in adapter and config-sourced
    /// credentials
    pub fn from_config(config: Config) -> Result<Self> {
        let client = http::build_client(&config.http)?;
        let registry = AdapterRegistry::with_defaults(client);
        let credentials = Arc::new(ConfigCredentials::new(&config));
        Ok(Self::with_registry(config, registry, credentials))
    }

    /// Create a service around a caller-built registry
    ///
    /// Tests use this to plug in mock adapters or adapters pointed at a local
    /// server.
    pub fn with_registry(
        config: Config,
        registry: AdapterRegistry,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new(Arc::new(registry));
        let approvals = Arc::new(ApprovalStore::new());
        let jobs = Arc::new(JobStore::new());
        let alerts = Arc::new(AlertStore::new(config.alerts.capacity));
        let event_bus = EventBus::default();

        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&jobs),
            dispatcher.clone(),
            credentials,
            Arc::clone(&alerts),
            event_bus.clone(),
            config.scheduler.clone(),
        ));

        Self {
            config,
            dispatcher,
            approvals,
            jobs,
            alerts,
            event_bus,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Approvals

    pub fn submit_approval(
        &self,
        items: Vec<ApprovalItem>,
        policy: &str,
    ) -> Result<ApprovalRecord> {
        let record = self.approvals.submit(items, policy)?;
        self.event_bus.emit(Event::ApprovalSubmitted {
            approval_id: record.id.clone(),
            items: record.items.len(),
        });
        Ok(record)
    }

    /// Decide one item and return the record's status afterwards
    pub fn decide_approval(
        &self,
        id: &str,
        index: usize,
        decision: Decision,
        note: Option<String>,
    ) -> Result<ApprovalStatus> {
        let record = self.approvals.decide(id, index, decision, note)?;
        self.event_bus.emit(Event::ApprovalDecided {
            approval_id: record.id,
            index,
            decision,
            status: record.status,
        });
        Ok(record.status)
    }

    pub fn get_approval(&self, id: &str) -> Result<ApprovalRecord> {
        self.approvals.get(id)
    }

    pub fn list_approvals(&self) -> Vec<ApprovalRecord> {
        self.approvals.list()
    }

    // Jobs

    pub fn enqueue_job(&self, request: JobRequest) -> Result<PublishJob> {
        let job = self.jobs.enqueue(request)?;
        self.emit_queued(&job);
        Ok(job)
    }

    /// Enqueue several jobs; if any item is invalid none are added
    pub fn enqueue_bulk(&self, requests: Vec<JobRequest>) -> Result<Vec<PublishJob>> {
        let jobs = self.jobs.enqueue_bulk(requests)?;
        for job in &jobs {
            self.emit_queued(job);
        }
        Ok(jobs)
    }

    fn emit_queued(&self, job: &PublishJob) {
        self.event_bus.emit(Event::JobQueued {
            job_id: job.id.clone(),
            platforms: job.platforms.clone(),
        });
    }

    pub fn list_jobs(&self) -> Vec<PublishJob> {
        self.jobs.list()
    }

    pub fn get_job(&self, id: &str) -> Result<PublishJob> {
        self.jobs.get(id)
    }

    // Publishing

    /// Capability table for every registered platform, sorted by id
    pub fn list_adapters(&self) -> Vec<AdapterInfo> {
        self.dispatcher.registry().list()
    }

    /// Publish immediately, bypassing approvals and the job store
    ///
    /// `post` is passed to the adapter as given, credentials included.
    pub async fn publish_now(
        &self,
        platform: &str,
        post: &NormalizedPost,
    ) -> Result<PublishReceipt> {
        self.dispatcher.publish(platform, post).await
    }

    // Scheduling

    /// Run one scheduler tick now
    pub async fn tick(&self) -> TickReport {
        self.scheduler.tick().await
    }

    /// Start the periodic scheduler on the current tokio runtime
    pub fn start_scheduler(&self) -> SchedulerHandle {
        Arc::clone(&self.scheduler).spawn()
    }

    // Monitoring

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.list()
    }

    pub fn raise_alert(&self, level: AlertLevel, source: &str, message: &str) -> Alert {
        self.alerts.raise(level, source, message)
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    /// Drop all jobs, approvals and alerts
    pub fn dispose(&self) {
        self.jobs.dispose();
        self.approvals.dispose();
        self.alerts.dispose();
    }
}
