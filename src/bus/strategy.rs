//! Alternate selection policies over a candidate set.
//!
//! The arbiter's built-in admission order is strictly lexicographic:
//! priority first, arrival time second. The strategies here are for
//! callers that want to pick a winner from a candidate list themselves,
//! e.g. a snapshot of the pending queue. Only one policy should drive a
//! given bus at a time; mixing the fair-queuing score with the built-in
//! admission order produces grant sequences that are hard to reason about.

use super::BusRequest;

/// Weight multiplier applied to the priority level in the fair-queuing
/// score. Ten seconds of waiting outweigh one priority level.
const PRIORITY_WEIGHT_FACTOR: f64 = 10.0;

/// Selection policy for choosing among candidate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArbitrationStrategy {
    /// Take the head of the candidate list.
    ///
    /// Known limitation: this is a placeholder, not true rotation. A
    /// rotating policy would carry a cursor across calls; this one keeps
    /// no state and always answers with the first element.
    RoundRobin,

    /// Take the head of an already priority-sorted candidate list.
    ///
    /// Equivalent to the arbiter's built-in admission rule when fed a
    /// pending-queue snapshot.
    #[default]
    Priority,

    /// Score every candidate and take the argmax.
    ///
    /// The score blends priority with time spent waiting, so a starved
    /// low-priority request eventually overtakes fresh high-priority
    /// traffic. Distinct from the strict lexicographic admission order.
    FairQueuing,
}

impl ArbitrationStrategy {
    /// Pick a winner from `candidates`, or `None` if the list is empty.
    pub fn select<'a>(&self, candidates: &'a [BusRequest]) -> Option<&'a BusRequest> {
        match self {
            Self::RoundRobin | Self::Priority => candidates.first(),
            Self::FairQueuing => fair_queuing_select(candidates),
        }
    }
}

/// Fair-queuing score: `weight * 10 + seconds waited`.
fn fair_queuing_score(request: &BusRequest) -> f64 {
    f64::from(request.priority.weight()) * PRIORITY_WEIGHT_FACTOR + request.wait_seconds()
}

fn fair_queuing_select(candidates: &[BusRequest]) -> Option<&BusRequest> {
    let mut best: Option<(&BusRequest, f64)> = None;

    for request in candidates {
        let score = fair_queuing_score(request);
        match best {
            // Strictly greater: the first of equally scored candidates wins
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((request, score)),
        }
    }

    best.map(|(request, _)| request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusPriority;
    use std::time::{Duration, Instant};

    fn request(requester: u32, priority: BusPriority) -> BusRequest {
        BusRequest::new(requester, priority, 64)
    }

    fn aged(mut request: BusRequest, age: Duration) -> BusRequest {
        request.submitted_at = Instant::now() - age;
        request
    }

    #[test]
    fn test_empty_candidates() {
        let none: [BusRequest; 0] = [];
        assert!(ArbitrationStrategy::RoundRobin.select(&none).is_none());
        assert!(ArbitrationStrategy::Priority.select(&none).is_none());
        assert!(ArbitrationStrategy::FairQueuing.select(&none).is_none());
    }

    #[test]
    fn test_round_robin_takes_head() {
        let candidates = [request(0, BusPriority::Low), request(1, BusPriority::High)];
        // Placeholder behavior: the head wins even if outranked
        let winner = ArbitrationStrategy::RoundRobin.select(&candidates).unwrap();
        assert_eq!(winner.requester, 0);
    }

    #[test]
    fn test_priority_takes_head_of_sorted_list() {
        let mut candidates = vec![
            request(0, BusPriority::Low),
            request(1, BusPriority::Critical),
            request(2, BusPriority::Medium),
        ];
        candidates.sort_by(crate::bus::arbitration_order);

        let winner = ArbitrationStrategy::Priority.select(&candidates).unwrap();
        assert_eq!(winner.requester, 1);
    }

    #[test]
    fn test_fair_queuing_prefers_higher_priority_when_fresh() {
        let candidates = [request(0, BusPriority::Medium), request(1, BusPriority::High)];
        let winner = ArbitrationStrategy::FairQueuing.select(&candidates).unwrap();
        assert_eq!(winner.requester, 1);
    }

    #[test]
    fn test_fair_queuing_rescues_starved_request() {
        // A low request that has waited a minute scores 0*10 + 60 = 60,
        // beating a fresh critical at 3*10 + 0 = 30.
        let candidates = [
            aged(request(0, BusPriority::Low), Duration::from_secs(60)),
            request(1, BusPriority::Critical),
        ];

        let winner = ArbitrationStrategy::FairQueuing.select(&candidates).unwrap();
        assert_eq!(winner.requester, 0);
    }

    #[test]
    fn test_fair_queuing_keeps_first_on_equal_scores() {
        let a = aged(request(0, BusPriority::Medium), Duration::from_secs(5));
        let b = aged(request(1, BusPriority::Medium), Duration::from_secs(5));

        // Scores are effectively equal; the earlier list entry is kept
        let candidates = [a, b];
        let winner = ArbitrationStrategy::FairQueuing.select(&candidates).unwrap();
        assert_eq!(winner.requester, 0);
    }
}
