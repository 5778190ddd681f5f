//! Visit metadata as resolved from the User Portal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Organisation a principal investigator belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: i64,
    pub name_short: String,
    pub name_long: String,
}

/// Principal investigator of a visit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalInvestigator {
    pub id: i64,
    pub first_names: String,
    pub last_name: String,
    pub email: String,
    pub org: Organisation,
}

impl PrincipalInvestigator {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_name)
            .trim()
            .to_string()
    }
}

/// Experiment (proposal) type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitType {
    pub id: i64,
    pub name_short: String,
    pub name_long: String,
}

/// An experiment run at a beamline.
///
/// Replaced wholesale on refresh, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub title: String,
    pub beamline: String,
    #[serde(rename = "type")]
    pub visit_type: VisitType,
    pub pi: PrincipalInvestigator,
}
