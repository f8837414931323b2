//! Batch orchestration.
//!
//! Each account is evaluated on its own tokio task against a shared,
//! immutable run context. Results are re-sorted after collection so the
//! output never depends on task completion order.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::attenuation::IntensityAttenuator;
use crate::classifier::{Classifier, ClassifierInput, RuleTableClassifier};
use crate::config::{GazetteerConfig, TriageConfig};
use crate::error::{AccountIssue, Result, TriageError};
use crate::geo::{Epicenter, Gazetteer, GeoDistanceEstimator, LocationResolver};
use crate::history::SafetyHistoryEvaluator;
use crate::input::AccountRecord;
use crate::intensity::Intensity;
use crate::model::{
    Account, DistanceClass, EarthquakeEvent, HistoryState, RiskAssessment, RiskLevel,
};

/// A per-account problem surfaced alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountWarning {
    pub account_id: String,
    /// `MALFORMED_INPUT` or `LOOKUP_FAILURE`
    pub code: String,
    pub message: String,
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageStats {
    pub total: usize,
    /// Accounts emitted with a level of 2 or more
    pub assessed: usize,
    pub cleared: usize,
    /// Rated level 1 and dropped
    pub suppressed: usize,
    /// Malformed accounts
    pub skipped: usize,
    /// Accounts with at least one location degraded to FAR
    pub lookup_failures: usize,
}

/// Full output of [`TriageEngine::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub assessments: Vec<RiskAssessment>,
    pub warnings: Vec<AccountWarning>,
    pub stats: TriageStats,
}

/// What happened to one account.
#[derive(Debug)]
struct AccountOutcome {
    index: usize,
    account_id: String,
    state: Option<HistoryState>,
    level: Option<RiskLevel>,
    issues: Vec<AccountIssue>,
}

/// Immutable state shared by every account task of one run.
struct RunContext {
    event: EarthquakeEvent,
    epicenter: Epicenter,
    estimator: GeoDistanceEstimator,
    attenuator: IntensityAttenuator,
    classifier: Arc<dyn Classifier>,
    utc_offset: FixedOffset,
}

impl RunContext {
    async fn evaluate(&self, index: usize, record: &AccountRecord) -> AccountOutcome {
        let account = match record.to_account(self.utc_offset) {
            Ok(account) => account,
            Err(issue) => {
                return AccountOutcome {
                    index,
                    account_id: display_id(index, record),
                    state: None,
                    level: None,
                    issues: vec![issue],
                };
            }
        };
        self.evaluate_account(index, &account).await
    }

    async fn evaluate_account(&self, index: usize, account: &Account) -> AccountOutcome {
        let verdict =
            SafetyHistoryEvaluator::evaluate(self.event.occurred_at, &account.safety_history);
        if verdict.out_of_order {
            tracing::debug!(
                account_id = %account.id,
                "Safety history supplied out of timestamp order"
            );
        }

        let mut outcome = AccountOutcome {
            index,
            account_id: account.id.clone(),
            state: Some(verdict.state),
            level: None,
            issues: Vec::new(),
        };
        if verdict.state == HistoryState::Cleared {
            return outcome;
        }

        // Only the location that decides the intensity is looked up.
        let reported = match verdict.state {
            HistoryState::Unreported => None,
            _ => verdict.reported_location(),
        };
        let input = match reported {
            Some(location) => ClassifierInput {
                address_intensity: None,
                last_location_intensity: Some(
                    self.intensity_at(&account.id, location, &mut outcome.issues)
                        .await,
                ),
                state: verdict.state,
            },
            None => ClassifierInput {
                address_intensity: Some(
                    self.intensity_at(&account.id, &account.address, &mut outcome.issues)
                        .await,
                ),
                last_location_intensity: None,
                state: verdict.state,
            },
        };
        outcome.level = self.classifier.classify(&input);

        tracing::debug!(
            account_id = %account.id,
            state = %verdict.state,
            intensity = ?input.effective_intensity(),
            level = outcome.level.map(RiskLevel::value),
            "Account classified"
        );
        outcome
    }

    async fn intensity_at(
        &self,
        account_id: &str,
        location: &str,
        issues: &mut Vec<AccountIssue>,
    ) -> Intensity {
        let estimate = self.estimator.estimate_from(&self.epicenter, location).await;
        tracing::debug!(
            account_id,
            location,
            class = ?estimate.class,
            distance_km = estimate.distance_km,
            "Location estimated"
        );
        issues.extend(estimate.issue.map(AccountIssue::from));
        self.local_intensity(estimate.class)
    }

    fn local_intensity(&self, class: DistanceClass) -> Intensity {
        self.attenuator
            .attenuate(self.event.max_intensity, self.event.magnitude, class)
    }
}

fn display_id(index: usize, record: &AccountRecord) -> String {
    let id = record.id.trim();
    if id.is_empty() {
        format!("#{index}")
    } else {
        id.to_string()
    }
}

/// Builder for [`TriageEngine`].
pub struct TriageEngineBuilder {
    config: TriageConfig,
    resolver: Option<Arc<dyn LocationResolver>>,
    classifier: Option<Arc<dyn Classifier>>,
}

impl TriageEngineBuilder {
    /// Replace the gazetteer configured in `gazetteer.*`.
    pub fn resolver(mut self, resolver: Arc<dyn LocationResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the standard rule table.
    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn build(self) -> Result<TriageEngine> {
        let Self {
            config,
            resolver,
            classifier,
        } = self;
        let utc_offset = config.engine.utc_offset()?;
        let resolver: Arc<dyn LocationResolver> = match resolver {
            Some(resolver) => resolver,
            None => Arc::new(load_gazetteer(&config.gazetteer)?),
        };

        Ok(TriageEngine {
            estimator: GeoDistanceEstimator::new(resolver, config.engine.lookup_timeout()),
            attenuator: IntensityAttenuator::new(config.attenuation),
            classifier: classifier
                .unwrap_or_else(|| Arc::new(RuleTableClassifier) as Arc<dyn Classifier>),
            max_concurrency: config.engine.max_concurrency.max(1),
            utc_offset,
        })
    }
}

fn load_gazetteer(config: &GazetteerConfig) -> Result<Gazetteer> {
    let gazetteer = if config.include_builtin {
        Gazetteer::builtin()
    } else {
        Gazetteer::new()
    };
    let Some(path) = &config.path else {
        return Ok(gazetteer);
    };
    let entries = crate::measure_time!("gazetteer_load", { Gazetteer::load_entries(path) })?;
    Ok(gazetteer.with_entries(entries))
}

/// Runs triage over a batch of accounts for one event.
pub struct TriageEngine {
    estimator: GeoDistanceEstimator,
    attenuator: IntensityAttenuator,
    classifier: Arc<dyn Classifier>,
    max_concurrency: usize,
    utc_offset: FixedOffset,
}

impl TriageEngine {
    /// Engine with the configured gazetteer and the standard rule table.
    pub fn new(config: &TriageConfig) -> Result<Self> {
        Self::builder(config.clone()).build()
    }

    pub fn builder(config: TriageConfig) -> TriageEngineBuilder {
        TriageEngineBuilder {
            config,
            resolver: None,
            classifier: None,
        }
    }

    /// Offset used for zone-less timestamps in account records.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// `triage(event, accounts)`: ordered assessments only.
    pub async fn triage(
        &self,
        event: &EarthquakeEvent,
        accounts: &[AccountRecord],
    ) -> Result<Vec<RiskAssessment>> {
        Ok(self.run(event, accounts).await?.assessments)
    }

    /// Triage already-typed accounts.
    pub async fn triage_accounts(
        &self,
        event: &EarthquakeEvent,
        accounts: &[Account],
    ) -> Result<Vec<RiskAssessment>> {
        let records: Vec<AccountRecord> = accounts.iter().map(AccountRecord::from).collect();
        self.triage(event, &records).await
    }

    /// Assessments plus warnings and counts.
    pub async fn run(
        &self,
        event: &EarthquakeEvent,
        accounts: &[AccountRecord],
    ) -> Result<TriageReport> {
        self.run_with_cancel(event, accounts, &CancellationToken::new())
            .await
    }

    /// Like [`Self::run`], abandoning all in-flight work once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Event validation errors, `Cancelled`, or `Internal` when an account
    /// task panics. Per-account problems never fail the call.
    pub async fn run_with_cancel(
        &self,
        event: &EarthquakeEvent,
        accounts: &[AccountRecord],
        cancel: &CancellationToken,
    ) -> Result<TriageReport> {
        event.validate()?;

        tracing::info!(
            event_id = event.id.as_deref().unwrap_or("-"),
            epicenter = %event.epicenter,
            max_intensity = %event.max_intensity,
            magnitude = event.magnitude,
            accounts = accounts.len(),
            "Triage run started"
        );

        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("Triage run cancelled");
                return Err(TriageError::Cancelled);
            }
            report = async {
                crate::measure_time_async!("triage_run", self.run_batch(event, accounts))
            } => report?,
        };

        let stats = &report.stats;
        tracing::info!(
            total = stats.total,
            assessed = stats.assessed,
            cleared = stats.cleared,
            suppressed = stats.suppressed,
            skipped = stats.skipped,
            lookup_failures = stats.lookup_failures,
            "Triage run finished"
        );
        Ok(report)
    }

    async fn run_batch(
        &self,
        event: &EarthquakeEvent,
        accounts: &[AccountRecord],
    ) -> Result<TriageReport> {
        let epicenter = self.estimator.prepare_epicenter(&event.epicenter).await;
        let context = Arc::new(RunContext {
            event: event.clone(),
            epicenter,
            estimator: self.estimator.clone(),
            attenuator: self.attenuator.clone(),
            classifier: Arc::clone(&self.classifier),
            utc_offset: self.utc_offset,
        });

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        // Dropping the set aborts every task still running.
        let mut tasks = JoinSet::new();
        for (index, record) in accounts.iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|err| TriageError::Internal(err.to_string()))?;
            let context = Arc::clone(&context);
            let record = record.clone();
            tasks.spawn(async move {
                let outcome = context.evaluate(index, &record).await;
                drop(permit);
                outcome
            });
        }

        let mut outcomes = Vec::with_capacity(accounts.len());
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined.map_err(|err| TriageError::Internal(err.to_string()))?);
        }
        outcomes.sort_by_key(|outcome| outcome.index);

        Ok(build_report(event.id.clone(), outcomes))
    }
}

fn build_report(event_id: Option<String>, outcomes: Vec<AccountOutcome>) -> TriageReport {
    let mut stats = TriageStats {
        total: outcomes.len(),
        ..Default::default()
    };
    let mut assessments = Vec::new();
    let mut warnings = Vec::new();

    for outcome in outcomes {
        for issue in &outcome.issues {
            tracing::warn!(
                account_id = %outcome.account_id,
                code = issue.code(),
                %issue,
                "Account degraded"
            );
            warnings.push(AccountWarning {
                account_id: outcome.account_id.clone(),
                code: issue.code().to_string(),
                message: issue.to_string(),
            });
        }
        if outcome.issues.iter().any(AccountIssue::skips_account) {
            stats.skipped += 1;
            continue;
        }
        if !outcome.issues.is_empty() {
            stats.lookup_failures += 1;
        }

        match (outcome.state, outcome.level) {
            (Some(HistoryState::Cleared), _) => stats.cleared += 1,
            (_, Some(level)) => {
                stats.assessed += 1;
                assessments.push((
                    outcome.index,
                    RiskAssessment {
                        account_id: outcome.account_id,
                        level,
                    },
                ));
            }
            (_, None) => stats.suppressed += 1,
        }
    }

    // Highest level first; ties keep input order.
    assessments.sort_by_key(|(index, assessment)| (Reverse(assessment.level), *index));

    TriageReport {
        event_id,
        assessments: assessments.into_iter().map(|(_, a)| a).collect(),
        warnings,
        stats,
    }
}
