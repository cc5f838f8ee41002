//! Upstream element set feeds
//!
//! | Source | Format | Auth |
//! |--------|--------|------|
//! | CelesTrak | three-line text | None |
//! | Space-Track | `tle_latest` JSON | form login, session cookie |

use crate::{IngestError, RawElementSet, Result, SourceTag};
use async_trait::async_trait;
use orbital_mechanics::tle::parse_three_line;
use reqwest::header::{COOKIE, SET_COOKIE};
use std::time::Duration;
use tracing::{debug, info};

pub const CELESTRAK_ACTIVE_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=tle";
pub const SPACE_TRACK_BASE: &str = "https://www.space-track.org";

const SPACE_TRACK_LOGIN_PATH: &str = "/ajaxauth/login";
const SPACE_TRACK_QUERY_PATH: &str =
    "/basicspacedata/query/class/tle_latest/ORDINAL/1/FORMAT/json";

/// A feed of raw element sets. Network and auth failures surface as
/// [`IngestError::SourceUnavailable`].
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn tag(&self) -> SourceTag;
    async fn fetch(&self) -> Result<Vec<RawElementSet>>;
}

/// Client with the per-source network timeout applied
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| IngestError::Parse(format!("failed to build HTTP client: {}", e)))
}

pub struct CelesTrakSource {
    client: reqwest::Client,
    url: String,
}

impl CelesTrakSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for CelesTrakSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Celestrak
    }

    async fn fetch(&self) -> Result<Vec<RawElementSet>> {
        info!("Fetching element sets from CelesTrak");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| IngestError::unavailable(self.tag(), e))?;

        if !response.status().is_success() {
            return Err(IngestError::unavailable(
                self.tag(),
                format!("CelesTrak returned status: {}", response.status()),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| IngestError::unavailable(self.tag(), e))?;

        let records = parse_three_line(&text);
        debug!("CelesTrak payload held {} three-line records", records.len());

        Ok(records.into_iter().map(RawElementSet::from).collect())
    }
}

#[derive(Debug, Clone)]
pub struct SpaceTrackCredentials {
    pub identity: String,
    pub password: String,
}

pub struct SpaceTrackSource {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<SpaceTrackCredentials>,
}

impl SpaceTrackSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Option<SpaceTrackCredentials>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Logs in and returns the session cookies as a `Cookie` header value
    async fn login(&self, credentials: &SpaceTrackCredentials) -> Result<String> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, SPACE_TRACK_LOGIN_PATH))
            .form(&[
                ("identity", credentials.identity.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| IngestError::unavailable(self.tag(), e))?;

        if !response.status().is_success() {
            return Err(IngestError::unavailable(
                self.tag(),
                format!("Space-Track auth failed: {}", response.status()),
            ));
        }

        let cookie = session_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );

        cookie.ok_or_else(|| IngestError::unavailable(self.tag(), "Space-Track login failed"))
    }
}

/// `name=value` pairs of every `Set-Cookie`, joined for replay
fn session_cookie<'a>(set_cookies: impl Iterator<Item = &'a str>) -> Option<String> {
    let pairs: Vec<&str> = set_cookies
        .filter_map(|c| c.split(';').next())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

#[async_trait]
impl CatalogSource for SpaceTrackSource {
    fn tag(&self) -> SourceTag {
        SourceTag::SpaceTrack
    }

    async fn fetch(&self) -> Result<Vec<RawElementSet>> {
        let Some(credentials) = &self.credentials else {
            return Err(IngestError::unavailable(
                self.tag(),
                "Space-Track credentials missing",
            ));
        };

        let cookie = self.login(credentials).await?;
        info!("Authenticated with Space-Track");

        let response = self
            .client
            .get(format!("{}{}", self.base_url, SPACE_TRACK_QUERY_PATH))
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| IngestError::unavailable(self.tag(), e))?;

        if !response.status().is_success() {
            return Err(IngestError::unavailable(
                self.tag(),
                format!("Space-Track query failed: {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| IngestError::unavailable(self.tag(), e))?;

        serde_json::from_str::<Vec<RawElementSet>>(&body)
            .map_err(|e| IngestError::Parse(format!("Space-Track payload: {}", e)))
    }
}
