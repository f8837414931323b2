//! Safety-history reconciliation.
//!
//! Last-writer-wins over reports made strictly after the event. Reports at or
//! before the event time are not evidence of post-event safety.

use chrono::{DateTime, Utc};

use crate::model::{HistoryState, SafetyRecord, SafetyStatus};

/// Evaluation result, borrowing the record that decided it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryVerdict<'a> {
    pub state: HistoryState,
    /// Latest post-event report, `None` when `state` is `Unreported`.
    pub deciding: Option<&'a SafetyRecord>,
    /// The supplied order disagreed with timestamp order.
    pub out_of_order: bool,
}

impl<'a> HistoryVerdict<'a> {
    /// Reported location of the deciding record, if it carried one.
    pub fn reported_location(&self) -> Option<&'a str> {
        self.deciding
            .and_then(|record| record.location.as_deref())
            .map(str::trim)
            .filter(|location| !location.is_empty())
    }
}

/// Pure function over an account's history.
pub struct SafetyHistoryEvaluator;

impl SafetyHistoryEvaluator {
    /// `evaluate(event.occurred_at, safety_history)`.
    pub fn evaluate(occurred_at: DateTime<Utc>, history: &[SafetyRecord]) -> HistoryVerdict<'_> {
        let out_of_order = history
            .windows(2)
            .any(|pair| pair[0].timestamp > pair[1].timestamp);

        let mut ordered: Vec<&SafetyRecord> = history.iter().collect();
        // Stable: equal timestamps keep their supplied order.
        ordered.sort_by_key(|record| record.timestamp);

        let deciding = ordered
            .into_iter()
            .rev()
            .find(|record| record.timestamp > occurred_at);

        let state = match deciding.map(|record| record.status) {
            None => HistoryState::Unreported,
            Some(SafetyStatus::Safe) => HistoryState::Cleared,
            Some(SafetyStatus::Danger) => HistoryState::DangerReported,
        };

        HistoryVerdict {
            state,
            deciding,
            out_of_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn event_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 3, 11, 5, 46, 23)
            .single()
            .expect("valid time")
    }

    fn record(offset_minutes: i64, status: SafetyStatus, location: Option<&str>) -> SafetyRecord {
        SafetyRecord {
            timestamp: event_time() + Duration::minutes(offset_minutes),
            status,
            location: location.map(str::to_string),
        }
    }

    #[test]
    fn empty_history_is_unreported() {
        let verdict = SafetyHistoryEvaluator::evaluate(event_time(), &[]);
        assert_eq!(verdict.state, HistoryState::Unreported);
        assert_eq!(verdict.deciding, None);
    }

    #[test]
    fn pre_event_safe_report_does_not_clear() {
        let history = [record(-24 * 60, SafetyStatus::Safe, None)];
        let verdict = SafetyHistoryEvaluator::evaluate(event_time(), &history);
        assert_eq!(verdict.state, HistoryState::Unreported);
    }

    #[test]
    fn report_at_event_time_does_not_count() {
        let history = [record(0, SafetyStatus::Safe, None)];
        let verdict = SafetyHistoryEvaluator::evaluate(event_time(), &history);
        assert_eq!(verdict.state, HistoryState::Unreported);
    }

    #[test]
    fn latest_post_event_report_wins() {
        let history = [
            record(5, SafetyStatus::Danger, Some("宮城県石巻市")),
            record(40, SafetyStatus::Safe, Some("宮城県仙台市")),
        ];
        let verdict = SafetyHistoryEvaluator::evaluate(event_time(), &history);
        assert_eq!(verdict.state, HistoryState::Cleared);
        assert_eq!(verdict.reported_location(), Some("宮城県仙台市"));
        assert!(!verdict.out_of_order);
    }

    #[test]
    fn timestamp_order_beats_supplied_order() {
        // Stored with the later SAFE first; the DANGER report is older.
        let history = [
            record(30, SafetyStatus::Safe, None),
            record(10, SafetyStatus::Danger, None),
        ];
        let verdict = SafetyHistoryEvaluator::evaluate(event_time(), &history);
        assert_eq!(verdict.state, HistoryState::Cleared);
        assert!(verdict.out_of_order);

        // And the reverse: a later DANGER supersedes an earlier SAFE.
        let history = [
            record(30, SafetyStatus::Danger, Some("福島県福島市")),
            record(10, SafetyStatus::Safe, None),
        ];
        let verdict = SafetyHistoryEvaluator::evaluate(event_time(), &history);
        assert_eq!(verdict.state, HistoryState::DangerReported);
        assert_eq!(verdict.reported_location(), Some("福島県福島市"));
    }

    #[test]
    fn blank_location_is_treated_as_absent() {
        let history = [record(10, SafetyStatus::Danger, Some("  "))];
        let verdict = SafetyHistoryEvaluator::evaluate(event_time(), &history);
        assert_eq!(verdict.state, HistoryState::DangerReported);
        assert_eq!(verdict.reported_location(), None);
    }
}
