//! Test fixtures and request bodies.

use chrono::{DateTime, TimeZone, Utc};
use retention_core::{Organisation, Policy, PrincipalInvestigator, Visit, VisitType};

/// Visit type excluded from expiry by the fixture policies.
pub const COMMISSIONING_TYPE: i64 = 4;

/// Organisation excluded from expiry on I03.
pub const EXCLUDED_ORG: i64 = 77;

pub fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Visit starting 2024-01-01 on `beamline`.
pub fn visit(beamline: &str) -> Visit {
    Visit {
        id: 4242,
        start_date: ts(2024, 1, 1),
        end_date: ts(2024, 1, 3),
        title: "Lysozyme soak".into(),
        beamline: beamline.into(),
        visit_type: VisitType {
            id: 1,
            name_short: "MX".into(),
            name_long: "Macromolecular Crystallography".into(),
        },
        pi: PrincipalInvestigator {
            id: 5,
            first_names: "Rosalind".into(),
            last_name: "Franklin".into(),
            email: "rf@example.org".into(),
            org: Organisation {
                id: 9,
                name_short: "KCL".into(),
                name_long: "King's College London".into(),
            },
        },
    }
}

pub fn commissioning_visit(beamline: &str) -> Visit {
    let mut visit = visit(beamline);
    visit.visit_type = VisitType {
        id: COMMISSIONING_TYPE,
        name_short: "COM".into(),
        name_long: "Commissioning".into(),
    };
    visit
}

/// I03: 60 day retention.
pub fn i03_policy() -> Policy {
    Policy::new("I03", 60, 2_000_000)
        .with_excluded_types([COMMISSIONING_TYPE])
        .with_excluded_orgs([EXCLUDED_ORG])
        .with_notes("MX beamline")
}

pub fn create_body(epn: &str) -> serde_json::Value {
    serde_json::json!({ "epn": epn })
}

pub fn renew_body(days: Option<u32>) -> serde_json::Value {
    serde_json::json!({
        "days": days,
        "user_id": "u42",
        "user_name": "Rosalind",
        "notes": "still processing"
    })
}

pub fn renew_until_body(expiry_date: &str) -> serde_json::Value {
    serde_json::json!({
        "expiry_date": expiry_date,
        "user_id": "u42",
        "user_name": "Rosalind"
    })
}

pub fn drop_body(removed: bool) -> serde_json::Value {
    serde_json::json!({
        "removed": removed,
        "user_id": "u42",
        "user_name": "Rosalind"
    })
}

pub fn storage_body(name: &str, size: Option<u64>, error: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "host": "store01",
        "path": format!("/data/{}", name),
        "size": size,
        "count": size.map(|_| 3),
        "error": error
    })
}

pub fn policy_body(beamline: &str, retention: u32) -> serde_json::Value {
    serde_json::json!({
        "beamline": beamline,
        "retention": retention,
        "quota": 1000,
        "exclude_type": [COMMISSIONING_TYPE],
        "notes": ""
    })
}
