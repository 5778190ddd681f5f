//! HTTP client for the User Portal.
//!
//! Logs in with the configured API client credentials, caches the token,
//! then resolves an EPN to its visit and the visit's equipment (beamline).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::StatusCode;
use retention_core::{
    Organisation, PrincipalInvestigator, Result, Visit, VisitProvider, VisitType,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use telemetry::{health, metrics};
use tracing::{debug, warn};
use url::Url;

use crate::config::PortalConfig;
use crate::error::PortalError;

/// Portal API client with a login token cache.
#[derive(Clone)]
pub struct PortalClient {
    base_url: Url,
    client_name: String,
    password: String,
    http: reqwest::Client,
    /// Client name -> bearer token
    tokens: Cache<String, String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    client_name: &'a str,
    client_password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: i64,
    pub name_short: String,
    pub name_long: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub title: String,
    #[serde(rename = "type")]
    pub proposal_type: NamedRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScientistRecord {
    pub id: i64,
    pub first_names: String,
    pub last_name: String,
    pub email: String,
    pub organisation: NamedRecord,
}

/// Visit as returned by `GET /api/visits/epn/{epn}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub equipment_id: i64,
    pub proposal: ProposalRecord,
    pub principal_scientist: ScientistRecord,
}

impl VisitRecord {
    /// Combines the visit with its equipment into the domain visit.
    pub fn into_visit(self, equipment: NamedRecord) -> Visit {
        let ps = self.principal_scientist;
        let org = ps.organisation;
        let kind = self.proposal.proposal_type;
        Visit {
            id: self.id,
            start_date: self.start_time,
            end_date: self.end_time,
            title: self.proposal.title,
            beamline: equipment.name_short,
            visit_type: VisitType {
                id: kind.id,
                name_short: kind.name_short,
                name_long: kind.name_long,
            },
            pi: PrincipalInvestigator {
                id: ps.id,
                first_names: ps.first_names,
                last_name: ps.last_name,
                email: ps.email,
                org: Organisation {
                    id: org.id,
                    name_short: org.name_short,
                    name_long: org.name_long,
                },
            },
        }
    }
}

impl PortalClient {
    pub fn new(config: &PortalConfig) -> std::result::Result<Self, PortalError> {
        let mut raw = config.url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url =
            Url::parse(&raw).map_err(|e| PortalError::Config(format!("url '{}': {}", raw, e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify)
            .build()
            .map_err(|e| PortalError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            client_name: config.client.clone(),
            password: config.password.clone(),
            http,
            tokens: Cache::builder()
                .max_capacity(16)
                .time_to_live(Duration::from_secs(config.token_ttl_secs.max(1)))
                .build(),
        })
    }

    /// Resolves `epn` to a visit.
    pub async fn fetch_visit(&self, epn: &str) -> std::result::Result<Visit, PortalError> {
        let token = self.token().await?;

        let record: VisitRecord = self
            .get_json(&token, &format!("api/visits/epn/{}", epn))
            .await?
            .ok_or_else(|| PortalError::UnknownVisit(epn.to_string()))?;

        let equipment: NamedRecord = self
            .get_json(&token, &format!("api/equipment/{}", record.equipment_id))
            .await?
            .ok_or_else(|| {
                PortalError::Request(format!("unknown equipment {}", record.equipment_id))
            })?;

        debug!(epn = %epn, beamline = %equipment.name_short, "Resolved visit");
        Ok(record.into_visit(equipment))
    }

    async fn token(&self) -> std::result::Result<String, PortalError> {
        self.tokens
            .try_get_with(self.client_name.clone(), self.login())
            .await
            .map_err(|e| (*e).clone())
    }

    async fn login(&self) -> std::result::Result<String, PortalError> {
        let url = self.endpoint("api/auth/login")?;
        debug!(url = %url, client = %self.client_name, "Logging in to user portal");

        let response = self
            .http
            .post(url)
            .json(&LoginRequest {
                client_name: &self.client_name,
                client_password: &self.password,
            })
            .send()
            .await
            .map_err(|e| PortalError::Authentication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortalError::Authentication(format!("{}: {}", status, body)));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| PortalError::Authentication(format!("invalid login response: {}", e)))?;
        Ok(login.token)
    }

    /// GETs `path`; `None` when the portal answers 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
    ) -> std::result::Result<Option<T>, PortalError> {
        let url = self.endpoint(path)?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            // Token revoked or expired early; log in again on the next call.
            self.tokens.invalidate(&self.client_name).await;
            return Err(PortalError::Authentication(format!("{} on {}", status, path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortalError::Request(format!(
                "{} on {}: {}",
                status.as_u16(),
                path,
                body
            )));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| PortalError::Request(format!("invalid response from {}: {}", path, e)))
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, PortalError> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::Config(format!("path '{}': {}", path, e)))
    }
}

#[async_trait]
impl VisitProvider for PortalClient {
    async fn resolve(&self, epn: &str) -> Result<Visit> {
        match self.fetch_visit(epn).await {
            Ok(visit) => {
                health().portal.set_healthy();
                Ok(visit)
            }
            Err(e) => {
                if !e.is_caller_error() {
                    health().portal.set_unhealthy(e.to_string());
                }
                metrics().portal_failures.inc();
                warn!(epn = %epn, error = %e, "User portal lookup failed");
                Err(e.into())
            }
        }
    }
}
