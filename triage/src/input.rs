//! Wire records and file loading.
//!
//! Inputs arrive as loosely-typed JSON: free-text timestamps, Japanese status
//! labels, intensity as either a string or an integer. Event records convert
//! eagerly (a bad event is fatal), account records convert one at a time so a
//! malformed account only skips itself.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AccountIssue, Result, TriageError};
use crate::intensity::Intensity;
use crate::model::{Account, EarthquakeEvent, SafetyRecord, SafetyStatus};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Parse a timestamp. RFC 3339 keeps its own zone; the zone-less formats are
/// read in `offset`.
pub fn parse_timestamp(
    raw: &str,
    offset: FixedOffset,
) -> std::result::Result<DateTime<Utc>, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err("empty timestamp".to_string());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("unrecognized timestamp format '{text}'"))
}

/// An earthquake as stored in the event catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeEventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub time: String,
    pub epicenter: String,
    /// `"震度7"`, `"6+"`, `5`, ...
    pub intensity: Value,
    pub magnitude: f64,
}

impl EarthquakeEventRecord {
    /// Convert into a validated [`EarthquakeEvent`].
    pub fn to_event(&self, offset: FixedOffset) -> Result<EarthquakeEvent> {
        let occurred_at =
            parse_timestamp(&self.time, offset).map_err(|reason| TriageError::InvalidEventTime {
                value: self.time.clone(),
                reason,
            })?;

        let max_intensity = match &self.intensity {
            Value::String(label) => Intensity::parse(label),
            Value::Number(number) => Intensity::parse(&number.to_string()),
            _ => None,
        }
        .ok_or_else(|| TriageError::InvalidIntensity {
            value: match &self.intensity {
                Value::String(label) => label.clone(),
                other => other.to_string(),
            },
        })?;

        let event = EarthquakeEvent::new(
            occurred_at,
            self.epicenter.trim(),
            max_intensity,
            self.magnitude,
        )?;
        Ok(match &self.id {
            Some(id) => event.with_id(id.clone()),
            None => event,
        })
    }
}

/// One safety report as supplied on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRecordInput {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl SafetyRecordInput {
    fn to_record(&self, offset: FixedOffset) -> std::result::Result<SafetyRecord, String> {
        let raw_timestamp = self.timestamp.as_deref().ok_or("missing timestamp")?;
        let timestamp = parse_timestamp(raw_timestamp, offset)?;

        let raw_status = self.status.as_deref().ok_or("missing status")?;
        let status = SafetyStatus::parse(raw_status)
            .ok_or_else(|| format!("unknown status '{raw_status}'"))?;

        Ok(SafetyRecord {
            timestamp,
            status,
            location: self
                .location
                .as_deref()
                .map(str::trim)
                .filter(|location| !location.is_empty())
                .map(str::to_string),
        })
    }
}

/// A registered account as supplied on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default, alias = "user_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub safety_history: Vec<SafetyRecordInput>,
    /// Why the wire record could not be decoded, for placeholders produced by
    /// [`load_accounts`].
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl AccountRecord {
    /// Convert into an [`Account`], rejecting the whole account on the first
    /// unusable field.
    pub fn to_account(&self, offset: FixedOffset) -> std::result::Result<Account, AccountIssue> {
        if let Some(err) = &self.decode_error {
            return Err(AccountIssue::malformed(format!("undecodable record: {err}")));
        }

        let id = self.id.trim();
        if id.is_empty() {
            return Err(AccountIssue::malformed("missing id"));
        }

        let address = self
            .address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .ok_or_else(|| AccountIssue::malformed("missing address"))?;

        let safety_history = self
            .safety_history
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record.to_record(offset).map_err(|reason| {
                    AccountIssue::malformed(format!("safety record {index}: {reason}"))
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Account {
            id: id.to_string(),
            address: address.to_string(),
            safety_history,
        })
    }
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: None,
            address: Some(account.address.clone()),
            safety_history: account
                .safety_history
                .iter()
                .map(|record| SafetyRecordInput {
                    timestamp: Some(record.timestamp.to_rfc3339()),
                    status: Some(record.status.as_str().to_string()),
                    location: record.location.clone(),
                })
                .collect(),
            decode_error: None,
        }
    }
}

/// An entry of the standalone safety-response log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyLogEntry {
    pub user_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Counts from [`merge_safety_log`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub merged: usize,
    /// Ids in the log with no matching account, in log order.
    pub unmatched: Vec<String>,
}

/// Append each log entry to its account's history. Entries are appended as
/// they are; validation happens when the account is converted.
pub fn merge_safety_log(accounts: &mut [AccountRecord], log: Vec<SafetyLogEntry>) -> MergeSummary {
    let mut by_id: HashMap<String, usize> = HashMap::new();
    for (index, account) in accounts.iter().enumerate() {
        by_id.entry(account.id.trim().to_string()).or_insert(index);
    }

    let mut summary = MergeSummary::default();
    for entry in log {
        let Some(&index) = by_id.get(entry.user_id.trim()) else {
            summary.unmatched.push(entry.user_id);
            continue;
        };
        accounts[index].safety_history.push(SafetyRecordInput {
            timestamp: entry.timestamp,
            status: entry.status,
            location: entry.location,
        });
        summary.merged += 1;
    }

    if !summary.unmatched.is_empty() {
        tracing::warn!(
            unmatched = summary.unmatched.len(),
            "Safety log entries reference unknown accounts"
        );
    }
    summary
}

/// Pick the event to triage: by id when given, otherwise the latest by time.
pub fn select_event(
    events: &[EarthquakeEventRecord],
    id: Option<&str>,
    offset: FixedOffset,
) -> Result<EarthquakeEvent> {
    if let Some(id) = id {
        return events
            .iter()
            .find(|record| record.id.as_deref() == Some(id))
            .ok_or_else(|| TriageError::EventNotFound {
                id: Some(id.to_string()),
            })?
            .to_event(offset);
    }

    // Only the chosen record is validated; a broken historic entry does not
    // block the latest one.
    let latest = events
        .iter()
        .filter_map(|record| match parse_timestamp(&record.time, offset) {
            Ok(occurred_at) => Some((occurred_at, record)),
            Err(reason) => {
                tracing::warn!(
                    event_id = record.id.as_deref().unwrap_or("-"),
                    %reason,
                    "Skipping catalogue entry with an unusable time"
                );
                None
            }
        })
        .max_by_key(|(occurred_at, _)| *occurred_at)
        .map(|(_, record)| record);

    match latest.or_else(|| events.first()) {
        Some(record) => record.to_event(offset),
        None => Err(TriageError::EventNotFound { id: None }),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|source| TriageError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| TriageError::JsonDeserialize {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an event catalogue holding a single event or an array.
pub fn load_events(path: &Path) -> Result<Vec<EarthquakeEventRecord>> {
    Ok(match read_json::<OneOrMany<EarthquakeEventRecord>>(path)? {
        OneOrMany::Many(events) => events,
        OneOrMany::One(event) => vec![event],
    })
}

/// Load an accounts array. Elements are decoded one at a time: an
/// undecodable element becomes a placeholder that the engine reports as
/// malformed, keyed by its id when one can be read.
pub fn load_accounts(path: &Path) -> Result<Vec<AccountRecord>> {
    let values: Vec<Value> = read_json(path)?;
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(index, value)| decode_account(index, value))
        .collect())
}

fn decode_account(index: usize, value: Value) -> AccountRecord {
    let id = ["id", "user_id"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    match serde_json::from_value(value) {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(index, account_id = %id, %err, "Account record could not be decoded");
            AccountRecord {
                id,
                decode_error: Some(err.to_string()),
                ..Default::default()
            }
        }
    }
}

/// Load a safety-response log array, dropping entries that cannot be decoded.
pub fn load_safety_log(path: &Path) -> Result<Vec<SafetyLogEntry>> {
    let values: Vec<Value> = read_json(path)?;
    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(index, %err, "Dropping undecodable safety log entry");
                None
            }
        })
        .collect())
}
