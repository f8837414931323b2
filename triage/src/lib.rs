//! Post-earthquake risk triage
//!
//! Given an earthquake (epicenter, magnitude, maximum intensity) and a batch
//! of accounts with their self-reported safety histories, decide which
//! accounts are plausibly in danger and assign each a 1-5 risk level.
//!
//! The decision is deterministic: a distance bucket picks an attenuation
//! step, the latest post-event report picks a history state, and a fixed rule
//! table maps (intensity, state) to a level. Level 1 and cleared accounts are
//! never emitted.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod attenuation;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod history;
pub mod input;
pub mod intensity;
pub mod model;
pub mod timing;

pub use attenuation::{AttenuationPolicy, IntensityAttenuator, StepRange};
pub use classifier::{Classification, Classifier, ClassifierInput, RuleTableClassifier};
pub use config::{ConfigError, ConfigLoader, TriageConfig};
pub use engine::{AccountWarning, TriageEngine, TriageEngineBuilder, TriageReport, TriageStats};
pub use error::{AccountIssue, ErrorCategory, LookupFailure, Result, TriageError};
pub use geo::{
    AddressParts, Gazetteer, GeoDistanceEstimator, GeoPoint, Located, LocationResolver, Precision,
};
pub use history::{HistoryVerdict, SafetyHistoryEvaluator};
pub use input::{AccountRecord, EarthquakeEventRecord, SafetyLogEntry};
pub use intensity::Intensity;
pub use model::{
    Account, DistanceClass, EarthquakeEvent, HistoryState, RiskAssessment, RiskLevel,
    SafetyRecord, SafetyStatus,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
