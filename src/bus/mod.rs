//! Shared-bus arbitration subsystem.
//!
//! This module models admission control for a bus with a bounded number of
//! concurrent transfer slots:
//! - Priority-ordered pending queue with FIFO tie-break
//! - Slot-bounded active set, never exceeding capacity
//! - Alternate selection strategies over a caller-supplied candidate set
//!
//! # Arbitration Model
//!
//! ```text
//!            request / enqueue              admission pass
//! requester ──────────────────► [pending] ────────────────► [active]
//!                                   ▲                           │
//!                                   │ promote head              │ release
//!                                   └───────────────────────────┘
//! ```
//!
//! Requests are ordered by priority (descending) and submission time
//! (ascending). An admission pass runs after every `request` and every
//! `release`; once granted, a request is never revoked before an explicit
//! release. The arbiter operates on abstract requests and has no knowledge
//! of DMA semantics.
//!
//! # Usage
//!
//! ```ignore
//! use dmasim::bus::{BusArbiter, BusPriority};
//!
//! let arbiter = BusArbiter::new(2);
//! if arbiter.request(0, BusPriority::High, 1024).is_granted() {
//!     // ... perform the transfer ...
//!     arbiter.release(0)?;
//! }
//! ```

pub mod arbiter;
pub mod strategy;

pub use arbiter::{BusArbiter, BusStatus, GrantDecision, PriorityDistribution};
pub use strategy::ArbitrationStrategy;

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Instant;

use thiserror::Error;

/// Requester identity. The arbiter treats this as an opaque key; in
/// practice it maps 1:1 to a DMA channel id.
pub type RequesterId = u32;

/// Concurrent transfer slots an arbiter has unless configured otherwise.
pub const DEFAULT_BUS_CAPACITY: usize = 2;

/// Number of distinct priority levels.
pub const NUM_PRIORITY_LEVELS: usize = 4;

/// Bus request priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BusPriority {
    /// Background traffic
    Low = 0,
    /// Default level
    Medium = 1,
    /// Latency-sensitive traffic
    High = 2,
    /// Must-run traffic (e.g. refresh)
    Critical = 3,
}

impl BusPriority {
    /// All levels, lowest first.
    pub const LEVELS: [BusPriority; NUM_PRIORITY_LEVELS] = [
        BusPriority::Low,
        BusPriority::Medium,
        BusPriority::High,
        BusPriority::Critical,
    ];

    /// Numeric weight of this level (0 for `Low` up to 3 for `Critical`).
    pub fn weight(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for BusPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Bus arbitration error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// Release attempted by a requester holding no active grant
    #[error("requester {0} has no active bus grant")]
    NotActive(RequesterId),
}

/// Sequence source for request identity. Monotonic across the process so
/// two requests submitted within clock granularity still order
/// deterministically.
static NEXT_REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

/// One pending or active bus claim.
///
/// Owned by the arbiter; lives in exactly one of the pending or active
/// sets until released.
#[derive(Debug, Clone)]
pub struct BusRequest {
    /// Requester identity (opaque to the arbiter)
    pub requester: RequesterId,

    /// Priority level used for queue placement
    pub priority: BusPriority,

    /// Payload size in bytes. Informational only: admission decisions
    /// never look at it.
    pub size: u64,

    /// Monotonic submission timestamp
    pub submitted_at: Instant,

    /// Process-wide submission sequence number
    pub seq: u64,

    /// Set once an admission pass moves this request to the active set
    pub granted: bool,
}

impl BusRequest {
    /// Create a request stamped with the current time.
    pub fn new(requester: RequesterId, priority: BusPriority, size: u64) -> Self {
        Self {
            requester,
            priority,
            size,
            submitted_at: Instant::now(),
            seq: NEXT_REQUEST_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            granted: false,
        }
    }

    /// Seconds this request has been waiting since submission.
    pub fn wait_seconds(&self) -> f64 {
        self.submitted_at.elapsed().as_secs_f64()
    }
}

/// Total order for queue placement: priority descending, submission time
/// ascending, then sequence number ascending.
///
/// Every sort and selection routine in the arbiter goes through this one
/// function; container ordering is never relied on.
pub fn arbitration_order(a: &BusRequest, b: &BusRequest) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        .then_with(|| a.seq.cmp(&b.seq))
}
