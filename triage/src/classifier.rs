//! Risk classification.
//!
//! Deterministic rule table mapping (history state, local intensity) to a
//! 1-5 risk level. No scoring, no model calls: the first matching rule wins.
//! The table sits behind the [`Classifier`] trait so an alternative table can
//! be swapped in.

use crate::intensity::Intensity;
use crate::model::{HistoryState, RiskLevel};

/// Everything the classifier looks at for one account.
///
/// The engine only estimates the location that will be used, so either
/// intensity may be missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifierInput {
    /// Estimated intensity at the registered address.
    pub address_intensity: Option<Intensity>,
    /// Estimated intensity at the latest reported location.
    pub last_location_intensity: Option<Intensity>,
    pub state: HistoryState,
}

impl ClassifierInput {
    /// Reported location when the account has post-event reports, otherwise
    /// the registered address.
    pub fn effective_intensity(&self) -> Option<Intensity> {
        match (self.state, self.last_location_intensity) {
            (HistoryState::Unreported, _) | (_, None) => self.address_intensity,
            (_, Some(reported)) => Some(reported),
        }
    }
}

/// A computed level and the rule that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub level: RiskLevel,
    pub rule: &'static str,
}

/// Classification capability.
pub trait Classifier: Send + Sync {
    /// Level for an intensity/state pair, including level 1. `None` means the
    /// account is excluded outright.
    fn rate(&self, intensity: Intensity, state: HistoryState) -> Option<Classification>;

    /// Surfaced level (2-5) for an account, or `None`.
    fn classify(&self, input: &ClassifierInput) -> Option<RiskLevel> {
        self.rate(input.effective_intensity()?, input.state)
            .map(|c| c.level)
            .filter(|level| level.is_surfaced())
    }
}

struct Rule {
    state: HistoryState,
    min: Intensity,
    max: Intensity,
    level: RiskLevel,
    label: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        state: HistoryState::Unreported,
        min: Intensity::Zero,
        max: Intensity::Three,
        level: RiskLevel::Minor,
        label: "unreported:intensity<=3",
    },
    Rule {
        state: HistoryState::Unreported,
        min: Intensity::Four,
        max: Intensity::Four,
        level: RiskLevel::Caution,
        label: "unreported:intensity=4",
    },
    Rule {
        state: HistoryState::Unreported,
        min: Intensity::FiveLower,
        max: Intensity::FiveUpper,
        level: RiskLevel::Confirm,
        label: "unreported:intensity=5",
    },
    Rule {
        state: HistoryState::Unreported,
        min: Intensity::SixLower,
        max: Intensity::SixUpper,
        level: RiskLevel::High,
        label: "unreported:intensity=6",
    },
    Rule {
        state: HistoryState::Unreported,
        min: Intensity::Seven,
        max: Intensity::Seven,
        level: RiskLevel::Critical,
        label: "unreported:intensity=7",
    },
    Rule {
        state: HistoryState::DangerReported,
        min: Intensity::Three,
        max: Intensity::Four,
        level: RiskLevel::Confirm,
        label: "danger:intensity=3-4",
    },
    Rule {
        state: HistoryState::DangerReported,
        min: Intensity::FiveLower,
        max: Intensity::FiveUpper,
        level: RiskLevel::High,
        label: "danger:intensity=5",
    },
    Rule {
        state: HistoryState::DangerReported,
        min: Intensity::SixLower,
        max: Intensity::Seven,
        level: RiskLevel::Critical,
        label: "danger:intensity>=6-",
    },
    Rule {
        state: HistoryState::DangerReported,
        min: Intensity::Zero,
        max: Intensity::Two,
        level: RiskLevel::Minor,
        label: "danger:intensity<=2",
    },
];

/// The standard five-level table.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleTableClassifier;

impl Classifier for RuleTableClassifier {
    fn rate(&self, intensity: Intensity, state: HistoryState) -> Option<Classification> {
        if state == HistoryState::Cleared {
            return None;
        }
        RULES
            .iter()
            .find(|rule| rule.state == state && (rule.min..=rule.max).contains(&intensity))
            .map(|rule| Classification {
                level: rule.level,
                rule: rule.label,
            })
    }
}
