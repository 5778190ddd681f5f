//! Typed request bodies and their conversion into domain inputs.
//!
//! Field limits mirror `limits.rs`; the derive needs literals.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::clock::LocalZone;
use crate::error::{Error, Result};
use crate::expiry::ExpiryOverride;
use crate::lifecycle::{Actor, StateType};
use crate::limits::{EPN_PATTERN, EXPIRY_DATETIME_FORMATS, EXPIRY_DAY_FORMAT};
use crate::policy::{Policy, PolicyUpdate};
use crate::search::DatasetFilter;
use crate::storage::StorageEvent;

static EPN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EPN_PATTERN).expect("invalid EPN pattern"));

fn validate_epn(epn: &str) -> std::result::Result<(), ValidationError> {
    if EPN_REGEX.is_match(epn) {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_epn");
    err.message = Some(
        "EPN must be 1-64 alphanumerics, '_' or '-', starting with an alphanumeric".into(),
    );
    Err(err)
}

fn validate_expiry_date(value: &str) -> std::result::Result<(), ValidationError> {
    if parse_expiry_date(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_expiry_date");
    err.message =
        Some("expected YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or an RFC 3339 timestamp".into());
    Err(err)
}

/// An expiry date as written by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpiryDate {
    /// Carried its own offset
    Absolute(DateTime<Utc>),
    /// Wall time in the configured zone
    Local(NaiveDateTime),
}

fn parse_expiry_date(value: &str) -> Option<ExpiryDate> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ExpiryDate::Absolute(ts.with_timezone(&Utc)));
    }
    if let Some(local) = EXPIRY_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(ExpiryDate::Local(local));
    }
    NaiveDate::parse_from_str(value, EXPIRY_DAY_FORMAT)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(ExpiryDate::Local)
}

/// Checks an EPN taken from a URL path.
pub fn check_epn(epn: &str) -> Result<()> {
    validate_epn(epn).map_err(|_| Error::validation(format!("invalid EPN '{}'", epn)))
}

/// Flattens validator output into `field: message` lines.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();
    messages
}

/// POST /dataset
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDatasetRequest {
    #[validate(custom(function = "validate_epn"))]
    pub epn: String,
}

/// POST /dataset/:epn/lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenewRequest {
    /// Days to add to the current expiry
    #[validate(range(max = 36500))]
    pub days: Option<u32>,
    /// Absolute expiry, wins over `days`. A date or naive time is local
    #[validate(custom(function = "validate_expiry_date"))]
    pub expiry_date: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 200))]
    pub user_name: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub notes: String,
}

impl RenewRequest {
    pub fn actor(&self) -> Actor {
        Actor::new(&self.user_id, &self.user_name, &self.notes)
    }

    /// Resolves the overrides, reading a local `expiry_date` in `zone`.
    pub fn overrides(&self, zone: &LocalZone) -> Result<ExpiryOverride> {
        let date = match self.expiry_date.as_deref() {
            Some(raw) => match parse_expiry_date(raw) {
                Some(ExpiryDate::Absolute(ts)) => Some(ts),
                Some(ExpiryDate::Local(local)) => Some(zone.to_utc(local)?),
                None => {
                    return Err(Error::validation(format!(
                        "expiry_date: cannot parse '{}'",
                        raw
                    )))
                }
            },
            None => None,
        };
        Ok(ExpiryOverride {
            days: self.days,
            date,
        })
    }
}

/// DELETE /dataset/:epn/lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DropRequest {
    /// Data already removed: mark DELETED instead of DROPPED
    #[serde(default)]
    pub removed: bool,
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 200))]
    pub user_name: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub notes: String,
}

impl DropRequest {
    pub fn actor(&self) -> Actor {
        Actor::new(&self.user_id, &self.user_name, &self.notes)
    }
}

/// POST /dataset/:epn/storage
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageEventRequest {
    /// Storage item name
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub host: String,
    #[validate(length(min = 1, max = 4096))]
    pub path: String,
    pub size: Option<u64>,
    pub count: Option<u64>,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub error: String,
}

impl StorageEventRequest {
    /// Splits into item name and a timestamped event.
    pub fn into_event(self, now: DateTime<Utc>) -> (String, StorageEvent) {
        let event = StorageEvent {
            created_at: now,
            host: self.host,
            path: self.path,
            size: self.size,
            count: self.count,
            error: self.error,
        };
        (self.name, event)
    }
}

/// POST /policy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePolicyRequest {
    #[validate(length(min = 1, max = 64))]
    pub beamline: String,
    #[validate(range(max = 36500))]
    pub retention: u32,
    pub quota: u64,
    #[serde(default)]
    pub exclude_type: BTreeSet<i64>,
    #[serde(default)]
    pub exclude_org: BTreeSet<i64>,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub notes: String,
}

impl CreatePolicyRequest {
    pub fn into_policy(self) -> Policy {
        Policy::new(self.beamline, self.retention, self.quota)
            .with_excluded_types(self.exclude_type)
            .with_excluded_orgs(self.exclude_org)
            .with_notes(self.notes)
    }
}

/// PUT /policy/:beamline
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePolicyRequest {
    #[validate(range(max = 36500))]
    pub retention: Option<u32>,
    pub quota: Option<u64>,
    pub exclude_type: Option<BTreeSet<i64>>,
    pub exclude_org: Option<BTreeSet<i64>>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

impl From<UpdatePolicyRequest> for PolicyUpdate {
    fn from(req: UpdatePolicyRequest) -> Self {
        Self {
            retention: req.retention,
            quota: req.quota,
            exclude_type: req.exclude_type,
            exclude_org: req.exclude_org,
            notes: req.notes,
        }
    }
}

/// GET /dataset query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub epn: Option<String>,
    pub beamline: Option<String>,
    pub pi_name: Option<String>,
    pub pi_email: Option<String>,
    pub pi_org: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub visit_type: Option<String>,
    pub excluded: Option<String>,
}

impl SearchQuery {
    pub fn into_filter(self) -> Result<DatasetFilter> {
        let status = self.status.as_deref().map(parse_status).transpose()?;
        let excluded = self.excluded.as_deref().map(parse_flag).transpose()?;

        Ok(DatasetFilter {
            epn: self.epn,
            beamline: self.beamline,
            pi_name: self.pi_name,
            pi_email: self.pi_email,
            pi_org: self.pi_org,
            status,
            visit_type: self.visit_type,
            excluded,
        })
    }
}

fn parse_status(raw: &str) -> Result<StateType> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "NORMAL" => Ok(StateType::Normal),
        "EXPIRED" => Ok(StateType::Expired),
        "RENEWED" => Ok(StateType::Renewed),
        "DROPPED" => Ok(StateType::Dropped),
        "DELETED" => Ok(StateType::Deleted),
        _ => Err(Error::validation(format!("unknown status '{}'", raw))),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        _ => Err(Error::validation(format!("invalid boolean '{}'", raw))),
    }
}
