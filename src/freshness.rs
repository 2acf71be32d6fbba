//! Request tickets for discarding stale responses.
//!
//! Each fetch takes a ticket for the resource it loads. Tickets increase
//! monotonically; when a response arrives, only the holder of the newest
//! ticket for that resource may apply it. Earlier responses are dropped
//! even if they arrive last.

use std::collections::HashMap;

/// Independently refreshed pieces of dashboard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    TodayMedications,
    WeeklyAdherence,
    DoctorMedications,
    AdminPatients,
    AdminStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    resource: Resource,
    seq: u64,
}

impl Ticket {
    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Default)]
pub struct RequestTracker {
    next_seq: u64,
    latest: HashMap<Resource, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `resource`; supersedes any earlier ticket for it.
    pub fn issue(&mut self, resource: Resource) -> Ticket {
        self.next_seq += 1;
        self.latest.insert(resource, self.next_seq);
        Ticket {
            resource,
            seq: self.next_seq,
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get(&ticket.resource) == Some(&ticket.seq)
    }

    /// Whether any request for `resource` is newer than `ticket`.
    pub fn is_superseded(&self, ticket: Ticket) -> bool {
        self.latest
            .get(&ticket.resource)
            .is_some_and(|&latest| latest > ticket.seq)
    }

    /// Pass `value` through only for the newest ticket.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(
                resource = ?ticket.resource,
                seq = ticket.seq,
                "Dropping stale response"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_ticket_wins() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue(Resource::TodayMedications);
        let second = tracker.issue(Resource::TodayMedications);

        assert!(second.seq() > first.seq());
        assert!(!tracker.is_current(first));
        assert!(tracker.is_superseded(first));
        assert!(tracker.is_current(second));

        // first response arrives last: dropped
        assert_eq!(tracker.accept(second, "fresh"), Some("fresh"));
        assert_eq!(tracker.accept(first, "stale"), None);
    }

    #[test]
    fn resources_are_tracked_independently() {
        let mut tracker = RequestTracker::new();
        let today = tracker.issue(Resource::TodayMedications);
        let weekly = tracker.issue(Resource::WeeklyAdherence);

        assert!(tracker.is_current(today));
        assert!(tracker.is_current(weekly));
        assert_eq!(today.resource(), Resource::TodayMedications);
    }

    #[test]
    fn fresh_tracker_knows_no_tickets() {
        let mut other = RequestTracker::new();
        let foreign = other.issue(Resource::AdminPatients);
        let tracker = RequestTracker::new();
        assert!(!tracker.is_current(foreign));
        assert!(!tracker.is_superseded(foreign));
    }
}
