//! GraphQL client for the remote directory API.
//!
//! All list operations are cursor-paginated connections; the export operation
//! returns the file payload inline (plain text for csv, base64 for xlsx).
//! Every request carries the current access credential and participates in
//! the refresh-and-retry protocol: one refresh cycle, one retry, then the
//! failure is final for that request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::companies::{CompanyDetail, CompanyStats, CompanySummary};
use crate::config::ApiConfig;
use crate::errors::{DirectoryError, DirectoryResult};
use crate::export::{ExportFormat, ExportPayload};
use crate::filters::FilterSet;
use crate::logger::{self, LogTag};
use crate::persistence::UserIdentity;
use crate::query::Connection;
use crate::subscription::{PlanTier, SubscriptionState};

use super::client::{HttpClient, RateLimiter};
use super::session::{AuthProvider, SessionManager, TokenPair};
use super::ListScope;

const COMPANIES_QUERY: &str = "query companies($filters: CompanyFilters, $after: String, $first: Int!) { companies(filters: $filters, after: $after, first: $first) { edges { node { cui name judet city categoryCode employees revenue registeredOn } cursor } pageInfo { hasNextPage endCursor } totalCount } }";

const LATEST_COMPANIES_QUERY: &str = "query latestCompanies($filters: CompanyFilters, $after: String, $first: Int!) { latestCompanies(filters: $filters, after: $after, first: $first) { edges { node { cui name judet city categoryCode employees revenue registeredOn } cursor } pageInfo { hasNextPage endCursor } totalCount } }";

const COMPANY_QUERY: &str = "query company($cui: ID!) { company(cui: $cui) { cui name judet city categoryCode categoryLabel status address phone email website registeredOn balanceYears { year revenue profit employees } } }";

const COMPANY_STATS_QUERY: &str = "query companyStats($filters: CompanyFilters) { companyStats(filters: $filters) { totalCompanies activeCompanies newThisMonth topCounties { judet count } } }";

const EXPORT_COMPANIES_QUERY: &str = "query exportCompanies($filters: CompanyFilters, $format: ExportFormat!) { exportCompanies(filters: $filters, format: $format) { fileName content mimeType } }";

const SUBSCRIPTION_STATUS_QUERY: &str = "query subscriptionStatus { subscriptionStatus { plan renewsOn monthlyExportQuota exportsUsed } }";

const UPDATE_PROFILE_MUTATION: &str = "mutation updateProfile($profile: ProfileInput!) { updateProfile(profile: $profile) { userId email displayName } }";

const CHANGE_PLAN_MUTATION: &str = "mutation changePlan($plan: PlanTier!) { changePlan(plan: $plan) { plan renewsOn monthlyExportQuota exportsUsed } }";

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    #[serde(rename = "operationName")]
    operation_name: &'a str,
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct CompaniesData {
    companies: Connection<CompanySummary>,
}

#[derive(Deserialize)]
struct LatestCompaniesData {
    #[serde(rename = "latestCompanies")]
    latest_companies: Connection<CompanySummary>,
}

#[derive(Deserialize)]
struct CompanyData {
    company: CompanyDetail,
}

#[derive(Deserialize)]
struct CompanyStatsData {
    #[serde(rename = "companyStats")]
    company_stats: CompanyStats,
}

#[derive(Deserialize)]
struct ExportCompaniesData {
    #[serde(rename = "exportCompanies")]
    export_companies: ExportPayload,
}

#[derive(Deserialize)]
struct SubscriptionStatusData {
    #[serde(rename = "subscriptionStatus")]
    subscription_status: SubscriptionState,
}

#[derive(Deserialize)]
struct UpdateProfileData {
    #[serde(rename = "updateProfile")]
    update_profile: UserIdentity,
}

#[derive(Deserialize)]
struct ChangePlanData {
    #[serde(rename = "changePlan")]
    change_plan: SubscriptionState,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

pub struct DirectoryApi {
    http: HttpClient,
    limiter: RateLimiter,
    session: Arc<SessionManager>,
    graphql_url: Url,
    export_timeout: Duration,
}

impl DirectoryApi {
    pub fn new(config: &ApiConfig, session: Arc<SessionManager>) -> DirectoryResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|err| DirectoryError::Network(format!("invalid base url: {}", err)))?;
        let graphql_url = base
            .join(&config.graphql_path)
            .map_err(|err| DirectoryError::Network(format!("invalid graphql path: {}", err)))?;

        Ok(Self {
            http: HttpClient::new(config.request_timeout_secs)?,
            limiter: RateLimiter::new(config.rate_limit_per_minute),
            session,
            graphql_url,
            export_timeout: Duration::from_secs(config.export_timeout_secs),
        })
    }

    pub async fn companies(
        &self,
        scope: ListScope,
        filters: &FilterSet,
        after: Option<String>,
        first: usize,
    ) -> DirectoryResult<Connection<CompanySummary>> {
        let variables = json!({
            "filters": filters.to_variables(),
            "after": after,
            "first": first,
        });
        match scope {
            ListScope::All => {
                let data: CompaniesData = self
                    .execute("companies", COMPANIES_QUERY, variables, self.http.timeout())
                    .await?;
                Ok(data.companies)
            }
            ListScope::Latest => {
                let data: LatestCompaniesData = self
                    .execute(
                        "latestCompanies",
                        LATEST_COMPANIES_QUERY,
                        variables,
                        self.http.timeout(),
                    )
                    .await?;
                Ok(data.latest_companies)
            }
        }
    }

    pub async fn company(&self, cui: &str) -> DirectoryResult<CompanyDetail> {
        let data: CompanyData = self
            .execute(
                "company",
                COMPANY_QUERY,
                json!({ "cui": cui }),
                self.http.timeout(),
            )
            .await?;
        Ok(data.company)
    }

    pub async fn company_stats(&self, filters: &FilterSet) -> DirectoryResult<CompanyStats> {
        let data: CompanyStatsData = self
            .execute(
                "companyStats",
                COMPANY_STATS_QUERY,
                json!({ "filters": filters.to_variables() }),
                self.http.timeout(),
            )
            .await?;
        Ok(data.company_stats)
    }

    /// Full-result-set export; runs against the long export timeout.
    pub async fn export_companies(
        &self,
        filters: &FilterSet,
        format: ExportFormat,
    ) -> DirectoryResult<ExportPayload> {
        let data: ExportCompaniesData = self
            .execute(
                "exportCompanies",
                EXPORT_COMPANIES_QUERY,
                json!({
                    "filters": filters.to_variables(),
                    "format": format.as_str(),
                }),
                self.export_timeout,
            )
            .await?;
        Ok(data.export_companies)
    }

    pub async fn subscription_status(&self) -> DirectoryResult<SubscriptionState> {
        let data: SubscriptionStatusData = self
            .execute(
                "subscriptionStatus",
                SUBSCRIPTION_STATUS_QUERY,
                json!({}),
                self.http.timeout(),
            )
            .await?;
        Ok(data.subscription_status)
    }

    pub async fn update_profile(&self, profile: &ProfileUpdate) -> DirectoryResult<UserIdentity> {
        let data: UpdateProfileData = self
            .execute(
                "updateProfile",
                UPDATE_PROFILE_MUTATION,
                json!({ "profile": profile }),
                self.http.timeout(),
            )
            .await?;
        Ok(data.update_profile)
    }

    pub async fn change_plan(&self, plan: PlanTier) -> DirectoryResult<SubscriptionState> {
        let data: ChangePlanData = self
            .execute(
                "changePlan",
                CHANGE_PLAN_MUTATION,
                json!({ "plan": plan.as_str() }),
                self.http.timeout(),
            )
            .await?;
        Ok(data.change_plan)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &'static str,
        variables: Value,
        timeout: Duration,
    ) -> DirectoryResult<T> {
        let request_id = Uuid::new_v4();
        let mut access_token = self.session.credential().map(|c| c.access_token);
        let seen_version = self.session.credential().map(|c| c.version).unwrap_or(0);
        let mut retried = false;

        loop {
            let _guard = self.limiter.acquire().await?;

            let mut builder = self
                .http
                .client()
                .post(self.graphql_url.clone())
                .timeout(timeout)
                .json(&GraphqlRequest {
                    operation_name: operation,
                    query,
                    variables: variables.clone(),
                });
            if let Some(token) = &access_token {
                builder = builder.bearer_auth(token);
            }

            logger::debug(
                LogTag::Api,
                &format!("{} request {}", operation, request_id),
            );

            let response = builder
                .send()
                .await
                .map_err(|err| HttpClient::classify(err, timeout))?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                if retried {
                    return Err(DirectoryError::Unauthorized(
                        "credential rejected after refresh".to_string(),
                    ));
                }
                retried = true;
                access_token = Some(self.session.refresh_after(seen_version).await?);
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(DirectoryError::Network(format!(
                    "HTTP {}: {}",
                    status, body
                )));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DirectoryError::Server(format!("HTTP {}: {}", status, body)));
            }

            let envelope: GraphqlResponse<T> = response
                .json()
                .await
                .map_err(|err| DirectoryError::Serialization(err.to_string()))?;

            if !envelope.errors.is_empty() {
                let joined = envelope
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(DirectoryError::Server(joined));
            }

            return envelope
                .data
                .ok_or_else(|| DirectoryError::Server("response missing data".to_string()));
        }
    }
}

/// Refresh-endpoint implementation of [`AuthProvider`].
pub struct HttpAuthProvider {
    http: HttpClient,
    refresh_url: Url,
}

impl HttpAuthProvider {
    pub fn new(config: &ApiConfig) -> DirectoryResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|err| DirectoryError::Network(format!("invalid base url: {}", err)))?;
        let refresh_url = base
            .join(&config.refresh_path)
            .map_err(|err| DirectoryError::Network(format!("invalid refresh path: {}", err)))?;

        Ok(Self {
            http: HttpClient::new(config.request_timeout_secs)?,
            refresh_url,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn refresh(&self, refresh_token: &str) -> DirectoryResult<TokenPair> {
        let timeout = self.http.timeout();
        let response = self
            .http
            .client()
            .post(self.refresh_url.clone())
            .timeout(timeout)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|err| HttpClient::classify(err, timeout))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DirectoryError::Unauthorized(
                "refresh token rejected".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Network(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|err| DirectoryError::Serialization(err.to_string()))
    }
}
