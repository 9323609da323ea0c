//! DAO counters
//!
//! - Counters only, monotonic
//! - Reset only when the DAO is rebuilt
//! - Relaxed atomics; readers may observe counters mid-update

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by a DAO and its statement compiler
#[derive(Debug, Default)]
pub struct DaoMetrics {
    /// Statements prepared by the driver, static and dynamic
    statements_prepared: AtomicU64,
    /// Predicate lookups served from the statement cache
    dynamic_cache_hits: AtomicU64,
    /// Predicate lookups that prepared a new statement
    dynamic_cache_misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    finds: AtomicU64,
    /// UNIQUE or FOREIGN KEY rejections
    constraint_violations: AtomicU64,
    validation_failures: AtomicU64,
    driver_failures: AtomicU64,
}

impl DaoMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_statements_prepared(&self) {
        self.statements_prepared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dynamic_cache_hits(&self) {
        self.dynamic_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dynamic_cache_misses(&self) {
        self.dynamic_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_inserts(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_finds(&self) {
        self.finds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_constraint_violations(&self) {
        self.constraint_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_driver_failures(&self) {
        self.driver_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn statements_prepared(&self) -> u64 {
        self.statements_prepared.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            statements_prepared: self.statements_prepared.load(Ordering::Relaxed),
            dynamic_cache_hits: self.dynamic_cache_hits.load(Ordering::Relaxed),
            dynamic_cache_misses: self.dynamic_cache_misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            finds: self.finds.load(Ordering::Relaxed),
            constraint_violations: self.constraint_violations.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            driver_failures: self.driver_failures.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub statements_prepared: u64,
    pub dynamic_cache_hits: u64,
    pub dynamic_cache_misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub finds: u64,
    pub constraint_violations: u64,
    pub validation_failures: u64,
    pub driver_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        assert_eq!(DaoMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let metrics = DaoMetrics::new();
        metrics.increment_statements_prepared();
        metrics.increment_statements_prepared();
        metrics.increment_dynamic_cache_misses();
        metrics.increment_dynamic_cache_hits();
        metrics.increment_inserts();
        metrics.increment_constraint_violations();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.statements_prepared, 2);
        assert_eq!(snapshot.dynamic_cache_hits, 1);
        assert_eq!(snapshot.dynamic_cache_misses, 1);
        assert_eq!(snapshot.inserts, 1);
        assert_eq!(snapshot.constraint_violations, 1);
        assert_eq!(snapshot.updates, 0);
    }

    #[test]
    fn test_to_json() {
        let metrics = DaoMetrics::new();
        metrics.increment_deletes();
        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["deletes"], 1);
        assert_eq!(parsed["inserts"], 0);
    }
}
