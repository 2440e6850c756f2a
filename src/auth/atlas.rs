//! Atlas management-plane authentication (OAuth2 client credentials + HTTP Digest)
//!
//! Both schemes authenticate requests to the Atlas Administration API, not the
//! data-plane driver. OAuth tokens are cached in the credential cache and
//! reused until expiry; digest requests perform the standard 401
//! challenge-response with a fresh cnonce per request.

use crate::config::ConnectSettings;
use crate::credentials::{AtlasDigestCredentials, AtlasOAuthCredentials, CredentialCache};
use crate::error::{DocDbError, Result};
use base64::Engine;
use rand::Rng;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Atlas OAuth token endpoint
pub const ATLAS_OAUTH_TOKEN_URL: &str = "https://cloud.mongodb.com/api/oauth/token";

/// Atlas Administration API base
pub const ATLAS_API_BASE_URL: &str = "https://cloud.mongodb.com/api/atlas/v2";

/// Versioned media type date carried in the Accept header
pub const ATLAS_API_VERSION: &str = "2025-03-12";

/// Response body of the client-credentials exchange
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: String,
}

/// Authenticates Atlas Administration API requests for cached clusters
pub struct AtlasAuthManager {
    client: reqwest::Client,
    credentials: Arc<CredentialCache>,
    token_url: Url,
}

impl AtlasAuthManager {
    /// Create a manager sharing the process-wide credential cache
    pub fn new(credentials: Arc<CredentialCache>, settings: &ConnectSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| DocDbError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            token_url: settings.atlas_token_url.clone(),
        })
    }

    /// Accept header value for versioned Atlas API requests
    pub fn accept_header() -> String {
        format!("application/vnd.atlas.{ATLAS_API_VERSION}+json")
    }

    /// `Bearer` authorization header for the cluster's OAuth service account.
    ///
    /// Reuses a cached, still-valid token without a network call; otherwise
    /// performs one client-credentials exchange and caches the result.
    pub async fn authorization_header(&self, cluster_id: &str) -> Result<String> {
        let record = self
            .credentials
            .get_credentials(cluster_id)
            .await
            .ok_or_else(|| {
                DocDbError::credentials(format!(
                    "No Atlas credentials cached for cluster {cluster_id}"
                ))
            })?;

        let oauth = record
            .atlas
            .as_ref()
            .and_then(|atlas| atlas.oauth.as_ref())
            .ok_or_else(|| {
                DocDbError::config(format!(
                    "Cluster {cluster_id} has no Atlas OAuth credentials"
                ))
            })?;

        if self.credentials.is_atlas_oauth_token_valid(cluster_id).await {
            if let Some(token) = &oauth.access_token {
                debug!("Reusing cached Atlas OAuth token for cluster {cluster_id}");
                return Ok(format!("Bearer {token}"));
            }
        }

        let token = self.exchange_client_credentials(oauth).await?;
        self.credentials
            .update_atlas_oauth_token(cluster_id, &token.access_token, token.expires_in)
            .await;
        Ok(format!("Bearer {}", token.access_token))
    }

    async fn exchange_client_credentials(
        &self,
        oauth: &AtlasOAuthCredentials,
    ) -> Result<TokenResponse> {
        debug!("Exchanging Atlas client credentials at {}", self.token_url);

        let basic = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", oauth.client_id, oauth.client_secret));

        let response = self
            .client
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .header(AUTHORIZATION, format!("Basic {basic}"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Atlas token endpoint rejected the exchange: {status}");
            return Err(DocDbError::authentication(format!(
                "Atlas token endpoint returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Send a request authenticated with the cluster's digest API keys.
    ///
    /// Issues an unauthenticated probe first; on a 401 digest challenge the
    /// request is retried once with the computed `Authorization` header. A
    /// response without a digest challenge passes through unchanged.
    pub async fn send_with_digest(
        &self,
        cluster_id: &str,
        method: Method,
        url: &str,
    ) -> Result<reqwest::Response> {
        let record = self
            .credentials
            .get_credentials(cluster_id)
            .await
            .ok_or_else(|| {
                DocDbError::credentials(format!(
                    "No Atlas credentials cached for cluster {cluster_id}"
                ))
            })?;

        let digest = record
            .atlas
            .as_ref()
            .and_then(|atlas| atlas.digest.as_ref())
            .ok_or_else(|| {
                DocDbError::config(format!(
                    "Cluster {cluster_id} has no Atlas digest credentials"
                ))
            })?;

        let accept = Self::accept_header();
        let first = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, &accept)
            .send()
            .await?;

        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        let challenge = first
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_digest_challenge);

        let Some(challenge) = challenge else {
            // 401 without a digest challenge: surface the original response
            return Ok(first);
        };

        let request_uri = request_uri(url)?;
        let authorization =
            build_digest_authorization(digest, &method, &request_uri, &challenge, &fresh_cnonce());

        debug!("Retrying Atlas request with digest authorization for cluster {cluster_id}");
        let retry = self
            .client
            .request(method, url)
            .header(ACCEPT, &accept)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;
        Ok(retry)
    }
}

/// Parsed `WWW-Authenticate: Digest …` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DigestChallenge {
    realm: String,
    nonce: String,
    qop: Option<String>,
    opaque: Option<String>,
    algorithm: Option<String>,
}

impl DigestChallenge {
    fn uses_auth_qop(&self) -> bool {
        self.qop
            .as_deref()
            .map(|qop| qop.split(',').any(|q| q.trim() == "auth"))
            .unwrap_or(false)
    }
}

fn parse_digest_challenge(header: &str) -> Option<DigestChallenge> {
    let trimmed = header.trim();
    if trimmed.len() < 6 || !trimmed[..6].eq_ignore_ascii_case("digest") {
        return None;
    }

    let mut realm = None;
    let mut nonce = None;
    let mut qop = None;
    let mut opaque = None;
    let mut algorithm = None;

    for part in trimmed[6..].split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "realm" => realm = Some(value),
            "nonce" => nonce = Some(value),
            "qop" => qop = Some(value),
            "opaque" => opaque = Some(value),
            "algorithm" => algorithm = Some(value),
            _ => {}
        }
    }

    Some(DigestChallenge {
        realm: realm?,
        nonce: nonce?,
        qop,
        opaque,
        algorithm,
    })
}

// Every request is treated as a fresh challenge: nc stays at 1 and a new
// cnonce is drawn instead of incrementing a persistent nonce count.
const NONCE_COUNT: &str = "00000001";

fn fresh_cnonce() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// RFC 2617 digest response: qop-aware when the challenge offers `auth`,
/// the simple form otherwise
fn digest_response(
    username: &str,
    password: &str,
    method: &Method,
    request_uri: &str,
    challenge: &DigestChallenge,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{}:{password}", challenge.realm));
    let ha2 = md5_hex(&format!("{}:{request_uri}", method.as_str()));

    if challenge.uses_auth_qop() {
        md5_hex(&format!(
            "{ha1}:{}:{NONCE_COUNT}:{cnonce}:auth:{ha2}",
            challenge.nonce
        ))
    } else {
        md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce))
    }
}

fn build_digest_authorization(
    keys: &AtlasDigestCredentials,
    method: &Method,
    request_uri: &str,
    challenge: &DigestChallenge,
    cnonce: &str,
) -> String {
    let response = digest_response(
        &keys.public_key,
        &keys.private_key,
        method,
        request_uri,
        challenge,
        cnonce,
    );

    let mut header = format!(
        "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{request_uri}\", response=\"{response}\"",
        keys.public_key, challenge.realm, challenge.nonce
    );

    if challenge.uses_auth_qop() {
        header.push_str(&format!(", qop=auth, nc={NONCE_COUNT}, cnonce=\"{cnonce}\""));
    }
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    if let Some(algorithm) = &challenge.algorithm {
        header.push_str(&format!(", algorithm={algorithm}"));
    }

    header
}

fn request_uri(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|e| DocDbError::invalid_input(format!("Invalid request URL {url}: {e}")))?;
    Ok(match parsed.query() {
        Some(query) => format!("{}?{query}", parsed.path()),
        None => parsed.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(public_key: &str, private_key: &str) -> AtlasDigestCredentials {
        AtlasDigestCredentials {
            public_key: public_key.to_string(),
            private_key: private_key.to_string(),
        }
    }

    #[test]
    fn parses_digest_challenge() {
        let challenge = parse_digest_challenge(
            r#"Digest realm="atlas", nonce="abc123", qop="auth", opaque="xyz""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "atlas");
        assert_eq!(challenge.nonce, "abc123");
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(challenge.opaque.as_deref(), Some("xyz"));
        assert!(challenge.uses_auth_qop());
    }

    #[test]
    fn ignores_non_digest_challenges() {
        assert_eq!(parse_digest_challenge(r#"Bearer realm="atlas""#), None);
        assert_eq!(parse_digest_challenge("Digest nonce=\"abc\""), None);
    }

    #[test]
    fn computes_rfc2617_reference_response() {
        // Reference vector from RFC 2617 section 3.5
        let challenge = DigestChallenge {
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            qop: Some("auth".to_string()),
            opaque: None,
            algorithm: None,
        };
        let response = digest_response(
            "Mufasa",
            "Circle Of Life",
            &Method::GET,
            "/dir/index.html",
            &challenge,
            "0a4f113b",
        );
        assert_eq!(response, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn builds_qop_aware_authorization_header() {
        let challenge =
            parse_digest_challenge(r#"Digest realm="atlas", nonce="abc123", qop="auth""#).unwrap();
        let header = build_digest_authorization(
            &keys("pubkey", "privkey"),
            &Method::GET,
            "/api/atlas/v2/groups",
            &challenge,
            "0123456789abcdef",
        );

        assert!(header.starts_with("Digest username=\"pubkey\", realm=\"atlas\", nonce=\"abc123\", uri=\"/api/atlas/v2/groups\", response=\""));
        assert!(header.contains(", qop=auth, nc=00000001, cnonce=\"0123456789abcdef\""));
    }

    #[test]
    fn simple_digest_omits_qop_fields() {
        let challenge =
            parse_digest_challenge(r#"Digest realm="atlas", nonce="abc123""#).unwrap();
        let header = build_digest_authorization(
            &keys("pubkey", "privkey"),
            &Method::GET,
            "/api/atlas/v2/groups",
            &challenge,
            "0123456789abcdef",
        );
        assert!(!header.contains("qop="));
        assert!(!header.contains("cnonce"));
    }

    #[test]
    fn cnonce_is_sixteen_hex_chars() {
        let cnonce = fresh_cnonce();
        assert_eq!(cnonce.len(), 16);
        assert!(cnonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn request_uri_keeps_query() {
        assert_eq!(
            request_uri("https://cloud.mongodb.com/api/atlas/v2/groups?pretty=true").unwrap(),
            "/api/atlas/v2/groups?pretty=true"
        );
        assert_eq!(
            request_uri("https://cloud.mongodb.com/api/atlas/v2/groups").unwrap(),
            "/api/atlas/v2/groups"
        );
    }
}
