//! Slot-bounded bus arbiter.
//!
//! The arbiter owns two collections of requests, an active set bounded by
//! the slot capacity and an unbounded priority-ordered pending queue, plus
//! the aggregate request counters. All of it sits behind one mutex: each
//! logical operation takes the lock once, so concurrent callers observe
//! every operation as atomic. Coarse-grained on purpose; the state is tiny
//! and contention is dominated by the simulated transfers, not the lock.
//!
//! `request` never blocks waiting for a slot. A caller that gets `Queued`
//! polls or re-requests; the only promotion triggers are the admission
//! pass after each `request`/`arbitrate` and the single-head promotion on
//! each `release`. There is no timeout for pending requests: they stay
//! queued until granted or until `reset_statistics` clears them.

use std::sync::{Mutex, MutexGuard};

use super::{
    arbitration_order, BusError, BusPriority, BusRequest, RequesterId, NUM_PRIORITY_LEVELS,
};

/// Outcome of a bus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDecision {
    /// A slot was free; the request is active immediately
    Granted,
    /// All slots busy; the request waits in the pending queue
    Queued,
}

impl GrantDecision {
    /// Check whether the request was admitted immediately.
    pub fn is_granted(self) -> bool {
        self == GrantDecision::Granted
    }
}

/// Point-in-time snapshot of the arbiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusStatus {
    /// Requests currently holding a slot
    pub active_count: usize,
    /// Requests waiting in the pending queue
    pub pending_count: usize,
    /// Fraction of slots in use, 0.0 to 1.0
    pub utilization: f64,
    /// Requests accepted since the last statistics reset
    pub total_requests: u64,
    /// Requests granted (immediately or by promotion) since the last reset
    pub granted_requests: u64,
    /// granted / total, or 0.0 before any request
    pub success_rate: f64,
}

/// Pending-queue census grouped by priority.
///
/// Every level is always present, defaulting to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityDistribution {
    counts: [u64; NUM_PRIORITY_LEVELS],
}

impl PriorityDistribution {
    /// Number of pending requests at the given level.
    pub fn count(&self, priority: BusPriority) -> u64 {
        self.counts[priority as usize]
    }

    /// Iterate over all levels, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = (BusPriority, u64)> + '_ {
        BusPriority::LEVELS.iter().map(move |&p| (p, self.count(p)))
    }

    fn record(&mut self, priority: BusPriority) {
        self.counts[priority as usize] += 1;
    }
}

/// Everything the lock protects.
#[derive(Debug, Default)]
struct ArbiterInner {
    /// Requests holding a slot; length never exceeds capacity
    active: Vec<BusRequest>,
    /// Waiting requests, kept in arbitration order
    pending: Vec<BusRequest>,
    /// Requests accepted since the last reset
    total_requests: u64,
    /// Requests granted since the last reset
    granted_requests: u64,
}

/// Bus arbiter with priority-ordered admission control.
///
/// Methods take `&self`, so one arbiter wrapped in an `Arc` serves any
/// number of concurrently running requesters.
#[derive(Debug)]
pub struct BusArbiter {
    /// Maximum concurrent transfer slots
    capacity: usize,

    /// Mutable state, one lock per logical operation
    inner: Mutex<ArbiterInner>,
}

impl BusArbiter {
    /// Create an arbiter with the given number of concurrent slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bus capacity must be nonzero");
        log::debug!("BusArbiter::new capacity={}", capacity);
        Self {
            capacity,
            inner: Mutex::new(ArbiterInner::default()),
        }
    }

    /// Get the slot capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Request the bus.
    ///
    /// Always accepted: the request enters the pending queue and one
    /// admission pass runs. Returns [`GrantDecision::Granted`] only if
    /// that pass admitted this very request; otherwise the caller polls
    /// or re-requests after a later release.
    pub fn request(
        &self,
        requester: RequesterId,
        priority: BusPriority,
        size: u64,
    ) -> GrantDecision {
        let mut inner = self.lock_inner();

        let request = BusRequest::new(requester, priority, size);
        let seq = request.seq;
        inner.pending.push(request);
        inner.total_requests += 1;

        match self.admit_head(&mut inner) {
            Some(granted_seq) if granted_seq == seq => {
                log::debug!("bus: requester {} granted immediately ({})", requester, priority);
                GrantDecision::Granted
            }
            _ => {
                log::debug!("bus: requester {} queued ({})", requester, priority);
                GrantDecision::Queued
            }
        }
    }

    /// Queue a request without running an admission pass.
    ///
    /// Lets a caller stage a batch of same-instant requests and admit them
    /// in one [`BusArbiter::arbitrate`] round, so grants follow the
    /// arbitration order alone rather than arrival interleaving.
    pub fn enqueue(&self, requester: RequesterId, priority: BusPriority, size: u64) {
        let mut inner = self.lock_inner();
        inner.pending.push(BusRequest::new(requester, priority, size));
        inner.total_requests += 1;
    }

    /// Run admission passes until no slot is free or nothing is pending.
    ///
    /// Returns the admitted requesters in grant order.
    pub fn arbitrate(&self) -> Vec<RequesterId> {
        let mut inner = self.lock_inner();
        let mut granted = Vec::new();

        while self.admit_head(&mut inner).is_some() {
            // admit_head pushed onto the active set; report its owner
            let last = inner
                .active
                .last()
                .expect("BUG: admission reported success with empty active set");
            granted.push(last.requester);
        }

        granted
    }

    /// Release the bus after a transfer.
    ///
    /// Fails with [`BusError::NotActive`] if the requester holds no active
    /// grant. On success the freed slot is immediately offered to the head
    /// of the pending queue.
    pub fn release(&self, requester: RequesterId) -> Result<(), BusError> {
        let mut inner = self.lock_inner();

        let position = inner
            .active
            .iter()
            .position(|r| r.requester == requester)
            .ok_or(BusError::NotActive(requester))?;
        inner.active.remove(position);
        log::debug!("bus: requester {} released", requester);

        // Promote exactly one pending request, if any
        self.admit_head(&mut inner);

        Ok(())
    }

    /// Get a point-in-time snapshot of counts and rates. Pure read.
    pub fn status(&self) -> BusStatus {
        let inner = self.lock_inner();

        let success_rate = if inner.total_requests > 0 {
            inner.granted_requests as f64 / inner.total_requests as f64
        } else {
            0.0
        };

        BusStatus {
            active_count: inner.active.len(),
            pending_count: inner.pending.len(),
            utilization: inner.active.len() as f64 / self.capacity as f64,
            total_requests: inner.total_requests,
            granted_requests: inner.granted_requests,
            success_rate,
        }
    }

    /// Check whether a requester currently holds a slot.
    pub fn is_active(&self, requester: RequesterId) -> bool {
        self.lock_inner()
            .active
            .iter()
            .any(|r| r.requester == requester)
    }

    /// Get the requesters currently holding slots.
    pub fn active_requesters(&self) -> Vec<RequesterId> {
        self.lock_inner()
            .active
            .iter()
            .map(|r| r.requester)
            .collect()
    }

    /// Clone the pending queue in arbitration order.
    ///
    /// Useful as the candidate set for the selection strategies in
    /// [`crate::bus::strategy`].
    pub fn pending_snapshot(&self) -> Vec<BusRequest> {
        let mut inner = self.lock_inner();
        inner.pending.sort_by(arbitration_order);
        inner.pending.clone()
    }

    /// Zero the counters and clear both the active and pending sets.
    ///
    /// In-flight state is dropped: callers must not expect a request that
    /// was active or pending before the reset to still exist afterwards.
    pub fn reset_statistics(&self) {
        let mut inner = self.lock_inner();
        inner.total_requests = 0;
        inner.granted_requests = 0;
        inner.active.clear();
        inner.pending.clear();
        log::debug!("bus: statistics reset");
    }

    /// Count pending requests grouped by priority.
    pub fn priority_distribution(&self) -> PriorityDistribution {
        let inner = self.lock_inner();
        let mut distribution = PriorityDistribution::default();
        for request in &inner.pending {
            distribution.record(request.priority);
        }
        distribution
    }

    /// One admission pass: move the head of the pending order into the
    /// active set if a slot is free. Returns the sequence number of the
    /// admitted request, if any.
    fn admit_head(&self, inner: &mut ArbiterInner) -> Option<u64> {
        if inner.active.len() >= self.capacity {
            return None;
        }

        // Stable sort: requests with identical keys keep arrival order
        inner.pending.sort_by(arbitration_order);
        if inner.pending.is_empty() {
            return None;
        }

        let mut request = inner.pending.remove(0);
        request.granted = true;
        let seq = request.seq;
        log::debug!(
            "bus: slot {} of {} granted to requester {} ({})",
            inner.active.len() + 1,
            self.capacity,
            request.requester,
            request.priority
        );
        inner.active.push(request);
        inner.granted_requests += 1;

        Some(seq)
    }

    fn lock_inner(&self) -> MutexGuard<'_, ArbiterInner> {
        self.inner.lock().expect("BUG: arbiter mutex poisoned")
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new(super::DEFAULT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_arbiter_initialization() {
        let arbiter = BusArbiter::new(2);
        assert_eq!(arbiter.capacity(), 2);

        let status = arbiter.status();
        assert_eq!(status.active_count, 0);
        assert_eq!(status.pending_count, 0);
        assert_eq!(status.total_requests, 0);
        assert_eq!(status.success_rate, 0.0);
    }

    #[test]
    #[should_panic(expected = "bus capacity must be nonzero")]
    fn test_zero_capacity_rejected() {
        let _ = BusArbiter::new(0);
    }

    #[test]
    fn test_request_granted_when_slot_free() {
        let arbiter = BusArbiter::new(2);
        let decision = arbiter.request(0, BusPriority::High, 1024);

        assert!(decision.is_granted());
        let status = arbiter.status();
        assert_eq!(status.total_requests, 1);
        assert_eq!(status.granted_requests, 1);
        assert_eq!(status.active_count, 1);
    }

    #[test]
    fn test_request_queued_when_full_then_promoted_on_release() {
        // Scenario: capacity 1, a high request holds the slot, a medium
        // request waits, the release hands the slot over automatically.
        let arbiter = BusArbiter::new(1);

        assert_eq!(
            arbiter.request(0, BusPriority::High, 1024),
            GrantDecision::Granted
        );
        assert_eq!(
            arbiter.request(1, BusPriority::Medium, 512),
            GrantDecision::Queued
        );
        assert_eq!(arbiter.status().pending_count, 1);

        arbiter.release(0).unwrap();

        assert!(arbiter.is_active(1));
        assert_eq!(arbiter.status().pending_count, 0);
        assert_eq!(arbiter.status().granted_requests, 2);
    }

    #[test]
    fn test_release_without_grant() {
        let arbiter = BusArbiter::new(2);
        assert_eq!(arbiter.release(7), Err(BusError::NotActive(7)));

        // Pending requesters have no grant to release either
        arbiter.request(0, BusPriority::Low, 64);
        arbiter.request(1, BusPriority::Low, 64);
        arbiter.request(2, BusPriority::Low, 64);
        assert_eq!(arbiter.release(2), Err(BusError::NotActive(2)));
    }

    #[test]
    fn test_priority_order_on_promotion() {
        let arbiter = BusArbiter::new(1);

        assert!(arbiter.request(0, BusPriority::High, 64).is_granted());
        arbiter.request(1, BusPriority::Medium, 64);
        arbiter.request(2, BusPriority::Critical, 64);
        arbiter.request(3, BusPriority::Medium, 64);

        // Critical outranks both mediums regardless of arrival order
        arbiter.release(0).unwrap();
        assert!(arbiter.is_active(2));

        // Equal priorities promote in arrival order
        arbiter.release(2).unwrap();
        assert!(arbiter.is_active(1));

        arbiter.release(1).unwrap();
        assert!(arbiter.is_active(3));
    }

    #[test]
    fn test_batched_arbitration_follows_priority() {
        // Scenario: three requests staged in arrival order low, critical,
        // medium; with two slots the arbitration round admits critical
        // first and medium second, leaving low pending.
        let arbiter = BusArbiter::new(2);
        arbiter.enqueue(0, BusPriority::Low, 256);
        arbiter.enqueue(1, BusPriority::Critical, 1024);
        arbiter.enqueue(2, BusPriority::Medium, 512);

        let granted = arbiter.arbitrate();
        assert_eq!(granted, vec![1, 2]);
        assert_eq!(arbiter.active_requesters(), vec![1, 2]);

        let status = arbiter.status();
        assert_eq!(status.active_count, 2);
        assert_eq!(status.pending_count, 1);
        assert_eq!(arbiter.priority_distribution().count(BusPriority::Low), 1);
    }

    #[test]
    fn test_status_fields_and_idempotence() {
        let arbiter = BusArbiter::new(2);
        arbiter.request(0, BusPriority::High, 1024);
        arbiter.request(1, BusPriority::Low, 64);
        arbiter.request(2, BusPriority::Low, 64);

        let status = arbiter.status();
        assert_eq!(status.active_count, 2);
        assert_eq!(status.pending_count, 1);
        assert_eq!(status.utilization, 1.0);
        assert_eq!(status.total_requests, 3);
        assert_eq!(status.granted_requests, 2);
        assert!((status.success_rate - 2.0 / 3.0).abs() < 1e-9);

        // Reads do not mutate
        assert_eq!(arbiter.status(), status);
        assert_eq!(arbiter.status(), status);
    }

    #[test]
    fn test_utilization_partial() {
        let arbiter = BusArbiter::new(2);
        arbiter.request(0, BusPriority::Medium, 128);
        assert_eq!(arbiter.status().utilization, 0.5);
    }

    #[test]
    fn test_reset_statistics_drops_in_flight_state() {
        let arbiter = BusArbiter::new(1);
        arbiter.request(0, BusPriority::High, 1024);
        arbiter.request(1, BusPriority::Low, 64);

        arbiter.reset_statistics();

        let status = arbiter.status();
        assert_eq!(status.total_requests, 0);
        assert_eq!(status.granted_requests, 0);
        assert_eq!(status.active_count, 0);
        assert_eq!(status.pending_count, 0);

        // The former holder's grant is gone with the reset
        assert_eq!(arbiter.release(0), Err(BusError::NotActive(0)));
    }

    #[test]
    fn test_priority_distribution_counts_pending_only() {
        // Scenario: one granted request plus three pending lows; the
        // census reports the lows and zeroes for every other level.
        let arbiter = BusArbiter::new(1);
        arbiter.request(0, BusPriority::Critical, 1024);
        arbiter.request(1, BusPriority::Low, 64);
        arbiter.request(2, BusPriority::Low, 64);
        arbiter.request(3, BusPriority::Low, 64);

        let distribution = arbiter.priority_distribution();
        assert_eq!(distribution.count(BusPriority::Low), 3);
        assert_eq!(distribution.count(BusPriority::Medium), 0);
        assert_eq!(distribution.count(BusPriority::High), 0);
        assert_eq!(distribution.count(BusPriority::Critical), 0);

        let total: u64 = distribution.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_pending_snapshot_in_arbitration_order() {
        let arbiter = BusArbiter::new(1);
        arbiter.request(0, BusPriority::Low, 64); // takes the slot
        arbiter.request(1, BusPriority::Medium, 64);
        arbiter.request(2, BusPriority::Critical, 64);
        arbiter.request(3, BusPriority::Medium, 64);

        let pending: Vec<RequesterId> = arbiter
            .pending_snapshot()
            .iter()
            .map(|r| r.requester)
            .collect();
        assert_eq!(pending, vec![2, 1, 3]);
    }

    #[test]
    fn test_capacity_invariant_under_concurrent_load() {
        let arbiter = Arc::new(BusArbiter::new(2));
        let mut handles = Vec::new();

        for t in 0..4u32 {
            let arbiter = Arc::clone(&arbiter);
            handles.push(thread::spawn(move || {
                for i in 0..50u32 {
                    let id = t * 100 + i;
                    if arbiter.request(id, BusPriority::Medium, 64).is_granted() {
                        assert!(arbiter.status().active_count <= arbiter.capacity());
                        arbiter.release(id).unwrap();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let status = arbiter.status();
        assert!(status.active_count <= 2);
        assert_eq!(status.total_requests, 200);
    }
}
