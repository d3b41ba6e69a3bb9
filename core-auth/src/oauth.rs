//! OAuth2 URL construction and redirect parsing
//!
//! Two authorization paths are supported:
//!
//! - **Browser**: the OAuth2 implicit grant. The authorize page redirects to
//!   `<prefix>-<key>://2/token#access_token=...&uid=...` (or
//!   `#error=...&error_description=...`).
//! - **Native handoff**: an installed companion app is opened through
//!   `<scheme>://1/connect?k=<key>&s=&state=oauth2%3A<nonce>` and answers
//!   with `<prefix>-<key>://1/connect?oauth_token_secret=...&uid=...&state=...`.
//!
//! `<prefix>-<key>://2/cancel` reports that the user backed out.
//!
//! Query strings and fragments are decoded the same way on both paths
//! (percent-decoding, `+` as space). Duplicate keys and pairs without `=`
//! are rejected.
//!
//! # Security
//!
//! The nonce is 16 random bytes from the thread RNG, URL-safe base64
//! encoded. It is never logged.

use crate::error::{AuthError, Result};
use crate::types::{AuthorizationOutcome, Credential, OAuth2ErrorKind};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use url::{form_urlencoded, Url};

/// Message of the failure reported when a handoff redirect cannot be
/// matched to the pending attempt.
pub const UNVERIFIED_LINK_MESSAGE: &str = "Unable to verify link request";

const STATE_PREFIX: &str = "oauth2";

/// Single-use value tying a native handoff redirect to the launch that
/// produced it.
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh nonce from 16 random bytes.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn matches(&self, candidate: &str) -> bool {
        // Length is public; compare contents without early exit
        self.0.len() == candidate.len()
            && self
                .0
                .bytes()
                .zip(candidate.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Nonce([REDACTED])")
    }
}

/// The three redirect shapes the application scheme receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `2/token`, implicit grant result in the fragment
    BrowserToken,
    /// `1/connect`, native handoff result in the query
    NativeConnect,
    /// `2/cancel`
    Cancel,
}

/// Builds outbound authorization URLs and recognizes inbound redirects for
/// one application key.
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    app_key: String,
    redirect_scheme: String,
    web_host: String,
}

impl OAuthEndpoints {
    pub fn new(
        app_key: impl Into<String>,
        scheme_prefix: &str,
        web_host: impl Into<String>,
    ) -> Self {
        let app_key = app_key.into();
        Self {
            redirect_scheme: format!("{}-{}", scheme_prefix, app_key),
            app_key,
            web_host: web_host.into(),
        }
    }

    /// Scheme the host must declare, `<prefix>-<app key>`.
    pub fn redirect_scheme(&self) -> &str {
        &self.redirect_scheme
    }

    /// Redirect URI registered for the implicit grant.
    pub fn redirect_uri(&self) -> String {
        format!("{}://2/token", self.redirect_scheme)
    }

    /// URL of the web authorization page.
    pub fn authorize_url(&self) -> Result<String> {
        let query = serde_urlencoded::to_string(&[
            ("response_type", "token"),
            ("client_id", self.app_key.as_str()),
            ("redirect_uri", self.redirect_uri().as_str()),
            ("disable_signup", "true"),
        ])
        .map_err(|e| AuthError::Configuration(format!("Cannot encode authorize URL: {}", e)))?;

        Ok(format!(
            "https://{}/1/oauth2/authorize?{}",
            self.web_host, query
        ))
    }

    /// URL opening the companion app registered for `scheme`.
    pub fn handoff_url(&self, scheme: &str, nonce: &Nonce) -> Result<String> {
        let state = format!("{}:{}", STATE_PREFIX, nonce.as_str());
        let query = serde_urlencoded::to_string(&[
            ("k", self.app_key.as_str()),
            ("s", ""),
            ("state", state.as_str()),
        ])
        .map_err(|e| AuthError::Configuration(format!("Cannot encode handoff URL: {}", e)))?;

        Ok(format!("{}://1/connect?{}", scheme, query))
    }

    /// Recognize `url` as one of the redirect shapes for this app.
    pub fn match_redirect(&self, url: &str) -> Option<(RedirectKind, Url)> {
        let parsed = Url::parse(url).ok()?;
        if !parsed.scheme().eq_ignore_ascii_case(&self.redirect_scheme) {
            return None;
        }

        let kind = match (parsed.host_str(), parsed.path()) {
            (Some("2"), "/token") => RedirectKind::BrowserToken,
            (Some("1"), "/connect") => RedirectKind::NativeConnect,
            (Some("2"), "/cancel") => RedirectKind::Cancel,
            _ => return None,
        };
        Some((kind, parsed))
    }

    /// Whether a browser navigation to `url` carries an authorization result.
    ///
    /// Every redirect shape, the cancel form included, is handed back to the
    /// manager instead of being loaded by the presenter.
    pub fn is_intercepted(&self, url: &str) -> bool {
        self.match_redirect(url).is_some()
    }
}

/// Decode `a=1&b=2` into a map.
///
/// Empty segments are skipped. A segment without `=` or a repeated key makes
/// the whole input malformed.
pub fn parse_params(input: &str) -> Result<HashMap<String, String>> {
    let mut params = HashMap::new();

    for segment in input.split('&').filter(|s| !s.is_empty()) {
        if !segment.contains('=') {
            return Err(AuthError::MalformedRedirect(format!(
                "parameter without value: '{}'",
                segment
            )));
        }

        // A single segment yields exactly one decoded pair
        if let Some((key, value)) = form_urlencoded::parse(segment.as_bytes()).next() {
            let key = key.into_owned();
            if params.contains_key(&key) {
                return Err(AuthError::MalformedRedirect(format!(
                    "duplicate parameter '{}'",
                    key
                )));
            }
            params.insert(key, value.into_owned());
        }
    }

    Ok(params)
}

fn required(params: &HashMap<String, String>, field: &str) -> Result<String> {
    params
        .get(field)
        .cloned()
        .ok_or_else(|| AuthError::MalformedRedirect(format!("missing field '{}'", field)))
}

/// Interpret the fragment of an implicit-grant redirect.
pub fn browser_outcome(fragment: &str) -> Result<AuthorizationOutcome> {
    let params = parse_params(fragment)?;

    if let Some(code) = params.get("error") {
        let message = params
            .get("error_description")
            .cloned()
            .unwrap_or_else(|| code.clone());
        return Ok(AuthorizationOutcome::failure(
            OAuth2ErrorKind::from_code(code),
            message,
        ));
    }

    let token = required(&params, "access_token")?;
    let subject_id = required(&params, "uid")?;
    Ok(AuthorizationOutcome::Success(Credential::new(
        token, subject_id,
    )))
}

/// Whether the `state` of a handoff redirect names the pending nonce.
///
/// The decoded state must split on `:` into exactly `oauth2` and the nonce.
pub fn state_matches(params: &HashMap<String, String>, pending: Option<&Nonce>) -> bool {
    let (Some(state), Some(pending)) = (params.get("state"), pending) else {
        return false;
    };

    let parts: Vec<&str> = state.split(':').collect();
    parts.len() == 2 && parts[0] == STATE_PREFIX && pending.matches(parts[1])
}

/// Extract the credential from a verified handoff redirect.
pub fn native_credential(params: &HashMap<String, String>) -> Result<Credential> {
    let token = required(params, "oauth_token_secret")?;
    let subject_id = required(params, "uid")?;
    Ok(Credential::new(token, subject_id))
}
