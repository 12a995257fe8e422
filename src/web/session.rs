//! Cookies
//!
//! The `session` cookie carries a session token with an HMAC-SHA256
//! signature appended (`<token>.<hex mac>`), so a forged or tampered value is
//! rejected before it reaches the database. The `flash` cookie carries
//! one-shot messages across a redirect.

use anyhow::Result;
use axum::http::{header, HeaderMap, Response};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

/// Seconds a flash message survives if never displayed
const FLASH_MAX_AGE: i64 = 60;

/// Signs and verifies cookie values with a server-side secret
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Invalid cookie secret: {}", e))?;
        Ok(Self { mac })
    }

    /// `value` followed by `.` and its hex signature
    pub fn sign(&self, value: &str) -> String {
        let signature = self.mac.clone().chain_update(value.as_bytes()).finalize();
        format!("{}.{}", value, HEXLOWER.encode(&signature.into_bytes()))
    }

    /// The original value if the signature matches
    pub fn verify(&self, signed: &str) -> Option<String> {
        let (value, signature) = signed.rsplit_once('.')?;
        let signature = HEXLOWER.decode(signature.as_bytes()).ok()?;

        self.mac
            .clone()
            .chain_update(value.as_bytes())
            .verify_slice(&signature)
            .ok()?;
        Some(value.to_string())
    }
}

/// Find a cookie by name in the request headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub fn session_cookie(signed_token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, signed_token, max_age_secs
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Cookie holding `messages`, one per line, URL-encoded
pub fn flash_cookie(messages: &[&str]) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        FLASH_COOKIE,
        urlencoding::encode(&messages.join("\n")),
        FLASH_MAX_AGE
    )
}

pub fn clear_flash_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", FLASH_COOKIE)
}

/// Pending flash messages sent by the browser
pub fn read_flashes(headers: &HeaderMap) -> Vec<String> {
    cookie_value(headers, FLASH_COOKIE)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| urlencoding::decode(raw).ok())
        .map(|decoded| {
            decoded
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Whether a response already sets the named cookie
pub fn sets_cookie<B>(response: &Response<B>, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split_once('=').is_some_and(|(key, _)| key == name))
}
