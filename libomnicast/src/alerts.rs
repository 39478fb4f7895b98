//! Monitoring alerts sink
//!
//! A bounded in-memory ring of alerts. The scheduler raises one for every
//! failed job; callers may raise their own. When full, the oldest alert is
//! dropped.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    /// Component or caller that raised the alert (e.g. "scheduler")
    pub source: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

pub struct AlertStore {
    capacity: usize,
    alerts: Mutex<VecDeque<Alert>>,
}

impl AlertStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            alerts: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Record an alert, evicting the oldest one if the ring is full
    pub fn raise(&self, level: AlertLevel, source: &str, message: impl Into<String>) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            level,
            source: source.to_string(),
            message: message.into(),
            at: Utc::now(),
        };

        match level {
            AlertLevel::Error => tracing::error!(source, message = %alert.message, "Alert raised"),
            AlertLevel::Warning => tracing::warn!(source, message = %alert.message, "Alert raised"),
            AlertLevel::Info => tracing::info!(source, message = %alert.message, "Alert raised"),
        }

        let mut alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        while alerts.len() >= self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(alert.clone());
        alert
    }

    /// All retained alerts, oldest first
    pub fn list(&self) -> Vec<Alert> {
        let alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        alerts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every retained alert
    pub fn dispose(&self) {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(crate::config::AlertsConfig::default().capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_and_list_in_order() {
        let store = AlertStore::new(10);
        store.raise(AlertLevel::Warning, "scheduler", "first");
        store.raise(AlertLevel::Error, "api", "second");

        let messages: Vec<String> = store.list().into_iter().map(|a| a.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let store = AlertStore::new(3);
        for i in 0..5 {
            store.raise(AlertLevel::Info, "test", format!("alert {}", i));
        }

        let alerts = store.list();
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].message, "alert 2");
        assert_eq!(alerts[2].message, "alert 4");
    }

    #[test]
    fn test_dispose_clears() {
        let store = AlertStore::new(3);
        store.raise(AlertLevel::Info, "test", "x");
        store.dispose();
        assert!(store.is_empty());
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_value(AlertLevel::Warning).unwrap();
        assert_eq!(json, "warning");
    }
}
