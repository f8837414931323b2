//! Domain types for a triage run.
//!
//! These are the validated shapes the engine works on. Loosely-typed wire
//! records live in [`crate::input`] and are converted per account so that a
//! single malformed account never rejects the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TriageError};
use crate::intensity::Intensity;

/// Self-reported safety status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    Safe,
    Danger,
}

impl SafetyStatus {
    /// Parse from string (case-insensitive, accepts `安全` / `危険`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "safe" | "ok" | "安全" => Some(Self::Safe),
            "danger" | "unsafe" | "危険" => Some(Self::Danger),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Danger => "DANGER",
        }
    }
}

/// One entry of an account's safety history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyRecord {
    pub timestamp: DateTime<Utc>,
    pub status: SafetyStatus,
    /// Where the account was when reporting. `None` means the registered
    /// address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A registered account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub address: String,
    /// Supplied order is not trusted; the evaluator sorts by timestamp.
    #[serde(default)]
    pub safety_history: Vec<SafetyRecord>,
}

/// The earthquake being triaged. Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub epicenter: String,
    pub max_intensity: Intensity,
    pub magnitude: f64,
}

impl EarthquakeEvent {
    /// Build a validated event.
    ///
    /// # Errors
    ///
    /// `InvalidMagnitude` for negative or non-finite magnitudes,
    /// `InvalidEpicenter` for a blank epicenter.
    pub fn new(
        occurred_at: DateTime<Utc>,
        epicenter: impl Into<String>,
        max_intensity: Intensity,
        magnitude: f64,
    ) -> Result<Self> {
        let event = Self {
            id: None,
            occurred_at,
            epicenter: epicenter.into(),
            max_intensity,
            magnitude,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Re-check invariants on an event that may have been deserialized
    /// directly.
    pub fn validate(&self) -> Result<()> {
        if !self.magnitude.is_finite() || self.magnitude < 0.0 {
            return Err(TriageError::InvalidMagnitude {
                value: self.magnitude,
            });
        }
        if self.epicenter.trim().is_empty() {
            return Err(TriageError::InvalidEpicenter);
        }
        Ok(())
    }
}

/// Coarse distance bucket between the epicenter and a location.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceClass {
    /// Same prefecture and same municipality
    SameArea,
    /// Within 50 km
    Near50,
    /// Within 100 km
    Near100,
    /// Within 200 km
    Near200,
    /// Beyond 200 km, or unresolvable
    Far,
}

impl DistanceClass {
    /// Bucket a great-circle distance. Upper bounds are inclusive.
    pub fn from_km(km: f64) -> Self {
        if km <= 50.0 {
            Self::Near50
        } else if km <= 100.0 {
            Self::Near100
        } else if km <= 200.0 {
            Self::Near200
        } else {
            Self::Far
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SameArea => "SAME_AREA",
            Self::Near50 => "NEAR_50",
            Self::Near100 => "NEAR_100",
            Self::Near200 => "NEAR_200",
            Self::Far => "FAR",
        }
    }
}

impl fmt::Display for DistanceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciled outcome of an account's post-event reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryState {
    /// Latest post-event report is SAFE
    Cleared,
    /// No report after the event
    Unreported,
    /// Latest post-event report is DANGER
    DangerReported,
}

impl HistoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cleared => "CLEARED",
            Self::Unreported => "UNREPORTED",
            Self::DangerReported => "DANGER_REPORTED",
        }
    }
}

impl fmt::Display for HistoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk level 1-5. Level 1 is computed but never surfaced.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RiskLevel {
    /// Minor concern
    Minor,
    /// Caution
    Caution,
    /// Needs confirmation
    Confirm,
    /// High risk
    High,
    /// Highest priority
    Critical,
}

impl RiskLevel {
    pub fn value(self) -> u8 {
        match self {
            Self::Minor => 1,
            Self::Caution => 2,
            Self::Confirm => 3,
            Self::High => 4,
            Self::Critical => 5,
        }
    }

    /// Whether this level is emitted in triage output.
    pub fn is_surfaced(self) -> bool {
        self != Self::Minor
    }
}

impl From<RiskLevel> for u8 {
    fn from(level: RiskLevel) -> Self {
        level.value()
    }
}

impl TryFrom<u8> for RiskLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Minor),
            2 => Ok(Self::Caution),
            3 => Ok(Self::Confirm),
            4 => Ok(Self::High),
            5 => Ok(Self::Critical),
            other => Err(format!("risk level must be 1-5, got {other}")),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// One entry of the triage output: `{"account_id": "...", "level": 3}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub account_id: String,
    pub level: RiskLevel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn distance_buckets_use_inclusive_upper_bounds() {
        assert_eq!(DistanceClass::from_km(0.0), DistanceClass::Near50);
        assert_eq!(DistanceClass::from_km(50.0), DistanceClass::Near50);
        assert_eq!(DistanceClass::from_km(50.1), DistanceClass::Near100);
        assert_eq!(DistanceClass::from_km(100.0), DistanceClass::Near100);
        assert_eq!(DistanceClass::from_km(199.9), DistanceClass::Near200);
        assert_eq!(DistanceClass::from_km(200.0), DistanceClass::Near200);
        assert_eq!(DistanceClass::from_km(300.0), DistanceClass::Far);
    }

    #[test]
    fn status_parsing_accepts_japanese() {
        assert_eq!(SafetyStatus::parse("安全"), Some(SafetyStatus::Safe));
        assert_eq!(SafetyStatus::parse("危険"), Some(SafetyStatus::Danger));
        assert_eq!(SafetyStatus::parse("Danger"), Some(SafetyStatus::Danger));
        assert_eq!(SafetyStatus::parse("unknown"), None);
    }

    #[test]
    fn assessment_serializes_level_as_integer() {
        let assessment = RiskAssessment {
            account_id: "u-1".into(),
            level: RiskLevel::High,
        };
        let json = serde_json::to_string(&assessment).expect("serialize");
        assert_eq!(json, r#"{"account_id":"u-1","level":4}"#);

        let parsed: RiskAssessment = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, assessment);
        assert!(serde_json::from_str::<RiskAssessment>(r#"{"account_id":"x","level":6}"#).is_err());
    }

    #[test]
    fn event_rejects_bad_magnitude() {
        let at = Utc.with_ymd_and_hms(2011, 3, 11, 5, 46, 23).single().expect("valid time");
        let err = EarthquakeEvent::new(at, "宮城県牡鹿郡沖", Intensity::Seven, -0.5).unwrap_err();
        assert!(matches!(err, TriageError::InvalidMagnitude { .. }));

        let err = EarthquakeEvent::new(at, "宮城県牡鹿郡沖", Intensity::Seven, f64::NAN).unwrap_err();
        assert!(matches!(err, TriageError::InvalidMagnitude { .. }));

        let err = EarthquakeEvent::new(at, "  ", Intensity::Seven, 9.0).unwrap_err();
        assert!(matches!(err, TriageError::InvalidEpicenter));

        assert!(EarthquakeEvent::new(at, "宮城県牡鹿郡沖", Intensity::Seven, 0.0).is_ok());
    }

    #[test]
    fn only_level_one_is_hidden() {
        assert!(!RiskLevel::Minor.is_surfaced());
        for level in [
            RiskLevel::Caution,
            RiskLevel::Confirm,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            assert!(level.is_surfaced());
        }
    }
}
