//! Client for the SGIS OpenAPI3 boundary service (통계지리정보서비스).
//!
//! Every call needs an access token from the authentication endpoint. Tokens
//! and boundary responses are cached for the lifetime of the client.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use geojson::{FeatureCollection, GeoJson, JsonValue};
use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;

use crate::boundary::{features_from_collection, BoundaryError, BoundaryFeature};
use crate::getter::BoundarySource;

pub const DEFAULT_BASE_URL: &str = "https://sgisapi.kostat.go.kr";
pub const DEFAULT_YEAR: &str = "2022";
/// `low_search=2` returns the 행정동 two levels below the requested code.
pub const DEFAULT_LOW_SEARCH: &str = "2";

const AUTH_PATH: &str = "/OpenAPI3/auth/authentication.json";
const BOUNDARY_PATH: &str = "/OpenAPI3/boundary/hadmarea.geojson";

#[derive(Debug, Error)]
pub enum SgisError {
    #[error("SGIS request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SGIS returned error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("SGIS response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SGIS response has no access token")]
    MissingToken,
    #[error("SGIS response is not a feature collection: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
    /// A failure handed to every caller waiting on the same fetch.
    #[error(transparent)]
    Shared(#[from] Arc<SgisError>),
}

impl SgisError {
    /// The underlying error, past any sharing between waiting callers.
    pub fn root(&self) -> &SgisError {
        match self {
            SgisError::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

/// Service key pair issued by SGIS.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl Credentials {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }
}

// Keep the secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "errCd", default)]
    err_cd: i64,
    #[serde(rename = "errMsg", default)]
    err_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResult {
    access_token: String,
}

fn check_status(code: i64, message: &str) -> Result<(), SgisError> {
    if code != 0 {
        return Err(SgisError::Api {
            code,
            message: message.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn parse_token(body: &str) -> Result<String, SgisError> {
    let envelope: Envelope<AuthResult> = serde_json::from_str(body)?;
    check_status(envelope.err_cd, &envelope.err_msg)?;
    envelope
        .result
        .map(|r| r.access_token)
        .filter(|token| !token.is_empty())
        .ok_or(SgisError::MissingToken)
}

/// Errors come back as a plain JSON envelope instead of a collection.
pub(crate) fn parse_boundaries(body: &str) -> Result<Vec<BoundaryFeature>, SgisError> {
    let value: JsonValue = serde_json::from_str(body)?;
    if let Some(code) = value.get("errCd").and_then(JsonValue::as_i64) {
        let message = value
            .get("errMsg")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        check_status(code, message)?;
    }
    let collection = FeatureCollection::try_from(GeoJson::from_json_value(value)?)?;
    Ok(features_from_collection(collection)?)
}

type BoundaryKey = (String, String, String);

/// Concurrent calls for the same key share one request; failures are not
/// kept, so the next call retries.
pub struct SgisClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    year: String,
    low_search: String,
    tokens: Cache<String, String>,
    boundaries: Cache<BoundaryKey, Vec<BoundaryFeature>>,
}

impl fmt::Debug for SgisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SgisClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("year", &self.year)
            .field("low_search", &self.low_search)
            .field("cached_regions", &self.boundaries.entry_count())
            .finish()
    }
}

impl SgisClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
            year: DEFAULT_YEAR.to_string(),
            low_search: DEFAULT_LOW_SEARCH.to_string(),
            tokens: Cache::builder().build(),
            boundaries: Cache::builder().build(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Boundary vintage, e.g. `"2022"`.
    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }

    pub fn low_search(mut self, low_search: impl Into<String>) -> Self {
        self.low_search = low_search.into();
        self
    }

    pub async fn authenticate(&self) -> Result<String, SgisError> {
        let token = self
            .tokens
            .try_get_with(self.credentials.consumer_key.clone(), self.request_token())
            .await?;
        Ok(token)
    }

    async fn request_token(&self) -> Result<String, SgisError> {
        tracing::debug!("requesting SGIS access token");
        let body = self
            .http
            .get(format!("{}{AUTH_PATH}", self.base_url))
            .query(&[
                ("consumer_key", self.credentials.consumer_key.as_str()),
                ("consumer_secret", self.credentials.consumer_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_token(&body)
    }

    pub async fn fetch_boundaries(
        &self,
        region_code: &str,
    ) -> Result<Vec<BoundaryFeature>, SgisError> {
        let key = (
            region_code.to_string(),
            self.low_search.clone(),
            self.year.clone(),
        );
        let features = self
            .boundaries
            .try_get_with(key, self.request_boundaries(region_code))
            .await?;
        Ok(features)
    }

    async fn request_boundaries(
        &self,
        region_code: &str,
    ) -> Result<Vec<BoundaryFeature>, SgisError> {
        let token = self.authenticate().await?;
        tracing::info!(
            region_code,
            year = %self.year,
            low_search = %self.low_search,
            "fetching SGIS boundaries"
        );
        let body = self
            .http
            .get(format!("{}{BOUNDARY_PATH}", self.base_url))
            .query(&[
                ("accessToken", token.as_str()),
                ("adm_cd", region_code),
                ("low_search", self.low_search.as_str()),
                ("year", self.year.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let features = parse_boundaries(&body)?;
        tracing::debug!(region_code, count = features.len(), "parsed boundaries");
        Ok(features)
    }
}

#[async_trait]
impl BoundarySource for SgisClient {
    async fn boundaries(&self, region_code: &str) -> anyhow::Result<Vec<BoundaryFeature>> {
        self.fetch_boundaries(region_code)
            .await
            .with_context(|| format!("fetching boundaries for region {region_code}"))
    }
}
