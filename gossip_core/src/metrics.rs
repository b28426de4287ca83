//! Process-wide simulation counters.
//!
//! Every actor and delivery task holds an `Arc<Metrics>` and mutates it only
//! through atomic read-modify-write operations; nothing takes a lock. The
//! harness reads from outside at a low rate, resetting the churn counters
//! each sampling window.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Names a single counter or gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Membership grants received (windowed)
    Grants,
    /// Membership revokes received (windowed)
    Revokes,
    /// Actor event loops started
    ActorsStarted,
    /// Rumor events processed by non-crashed nodes
    MessagesProcessed,
    /// Nodes that entered the crashed state
    Crashes,
    /// Nodes that received the rumor for the first time
    FirstReceipts,
    /// Membership events scheduled or queued but not yet handled
    PendingMembership,
    /// Rumor fan-outs and rumor events scheduled or queued but not yet handled
    PendingRumors,
}

impl Counter {
    /// All counters, in report order.
    pub const ALL: [Counter; 8] = [
        Counter::Grants,
        Counter::Revokes,
        Counter::ActorsStarted,
        Counter::MessagesProcessed,
        Counter::Crashes,
        Counter::FirstReceipts,
        Counter::PendingMembership,
        Counter::PendingRumors,
    ];
}

/// Shared atomic counters for the whole simulation.
#[derive(Debug, Default)]
pub struct Metrics {
    grants: AtomicU64,
    revokes: AtomicU64,
    actors_started: AtomicU64,
    messages_processed: AtomicU64,
    crashes: AtomicU64,
    first_receipts: AtomicU64,
    pending_membership: AtomicU64,
    pending_rumors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn cell(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Grants => &self.grants,
            Counter::Revokes => &self.revokes,
            Counter::ActorsStarted => &self.actors_started,
            Counter::MessagesProcessed => &self.messages_processed,
            Counter::Crashes => &self.crashes,
            Counter::FirstReceipts => &self.first_receipts,
            Counter::PendingMembership => &self.pending_membership,
            Counter::PendingRumors => &self.pending_rumors,
        }
    }

    /// Atomically adds one.
    pub fn increment(&self, counter: Counter) {
        self.cell(counter).fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically subtracts one. Only meaningful for the pending gauges.
    ///
    /// Release pairs with the acquire in [`Metrics::load`]: a reader that
    /// sees a gauge reach zero also sees every counter bumped by the
    /// handlers that drained it.
    pub fn decrement(&self, counter: Counter) {
        self.cell(counter).fetch_sub(1, Ordering::Release);
    }

    /// Atomically reads the current value.
    pub fn load(&self, counter: Counter) -> u64 {
        self.cell(counter).load(Ordering::Acquire)
    }

    /// Atomically reads the current value and resets it to zero.
    pub fn take(&self, counter: Counter) -> u64 {
        self.cell(counter).swap(0, Ordering::Relaxed)
    }

    pub fn record_grant(&self) {
        self.increment(Counter::Grants);
    }

    pub fn record_revoke(&self) {
        self.increment(Counter::Revokes);
    }

    pub fn record_actor_started(&self) {
        self.increment(Counter::ActorsStarted);
    }

    pub fn record_message(&self) {
        self.increment(Counter::MessagesProcessed);
    }

    pub fn record_crash(&self) {
        self.increment(Counter::Crashes);
    }

    pub fn record_first_receipt(&self) {
        self.increment(Counter::FirstReceipts);
    }

    /// Reads the churn counters for the window that just ended and opens a
    /// new one.
    pub fn take_churn_window(&self) -> ChurnWindow {
        ChurnWindow {
            grants: self.take(Counter::Grants),
            revokes: self.take(Counter::Revokes),
        }
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            grants: self.load(Counter::Grants),
            revokes: self.load(Counter::Revokes),
            actors_started: self.load(Counter::ActorsStarted),
            messages_processed: self.load(Counter::MessagesProcessed),
            crashes: self.load(Counter::Crashes),
            first_receipts: self.load(Counter::FirstReceipts),
            pending_membership: self.load(Counter::PendingMembership),
            pending_rumors: self.load(Counter::PendingRumors),
        }
    }
}

/// Grant and revoke counts observed during one sampling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnWindow {
    pub grants: u64,
    pub revokes: u64,
}

impl ChurnWindow {
    /// True when no membership event was handled in the window.
    pub fn is_quiet(&self) -> bool {
        self.grants == 0 && self.revokes == 0
    }
}

/// Point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub grants: u64,
    pub revokes: u64,
    pub actors_started: u64,
    pub messages_processed: u64,
    pub crashes: u64,
    pub first_receipts: u64,
    pub pending_membership: u64,
    pub pending_rumors: u64,
}
