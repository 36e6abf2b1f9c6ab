//! Signed refresh-token cookie.
//!
//! The cookie value is `{jwt}.{signature}` where the signature is the unpadded url-safe base64
//! HMAC-SHA256 of the JWT under `secrets.cookie_secret`. A value whose signature does not match
//! is rejected before the JWT is ever looked at.

use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::Config;
use crate::errors::Error;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str) -> Result<HmacSha256, Error> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| Error::Internal {
        operation: format!("initialise cookie HMAC: {e}"),
    })
}

fn cookie_secret(config: &Config) -> Result<&str, Error> {
    config.secrets.cookie_secret.as_deref().ok_or_else(|| Error::Internal {
        operation: "sign cookie: cookie_secret is not configured".to_string(),
    })
}

/// Append an HMAC signature to `value`.
pub fn sign_value(value: &str, secret: &str) -> Result<String, Error> {
    let mut mac = mac(secret)?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{value}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Check the signature on a signed value and return the inner value.
///
/// Returns `None` for anything that is not a correctly signed value.
pub fn verify_signed_value<'a>(signed: &'a str, secret: &str) -> Option<&'a str> {
    let (value, signature) = signed.rsplit_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

    let mut mac = mac(secret).ok()?;
    mac.update(value.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(value)
}

/// `Set-Cookie` value carrying a signed refresh token.
pub fn refresh_cookie(refresh_token: &str, config: &Config) -> Result<String, Error> {
    let cookie = &config.auth.refresh_cookie;
    let signed = sign_value(refresh_token, cookie_secret(config)?)?;
    let max_age = config.auth.tokens.refresh_token_expiry.as_secs();

    Ok(format!(
        "{}={}; Path=/; HttpOnly;{} SameSite={}; Max-Age={}",
        cookie.cookie_name,
        signed,
        if cookie.cookie_secure { " Secure;" } else { "" },
        same_site(&cookie.cookie_same_site),
        max_age
    ))
}

/// `Set-Cookie` value that expires the refresh cookie.
pub fn clear_refresh_cookie(config: &Config) -> String {
    let cookie = &config.auth.refresh_cookie;
    format!(
        "{}=; Path=/; HttpOnly;{} SameSite={}; Max-Age=0",
        cookie.cookie_name,
        if cookie.cookie_secure { " Secure;" } else { "" },
        same_site(&cookie.cookie_same_site),
    )
}

fn same_site(configured: &str) -> &'static str {
    match configured.to_ascii_lowercase().as_str() {
        "lax" => "Lax",
        "none" => "None",
        _ => "Strict",
    }
}

/// Find a cookie by name across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Read the refresh cookie and strip its signature.
pub fn read_refresh_token(headers: &HeaderMap, config: &Config) -> Result<SignedCookie, Error> {
    let Some(raw) = read_cookie(headers, &config.auth.refresh_cookie.cookie_name) else {
        return Ok(SignedCookie::Missing);
    };

    match verify_signed_value(&raw, cookie_secret(config)?) {
        Some(token) => Ok(SignedCookie::Valid(token.to_string())),
        None => Ok(SignedCookie::Tampered),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedCookie {
    Missing,
    Tampered,
    Valid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;
    use axum::http::HeaderValue;

    #[test]
    fn test_sign_and_verify() {
        let signed = sign_value("header.payload.sig", "secret").unwrap();
        assert!(signed.starts_with("header.payload.sig."));
        assert_eq!(verify_signed_value(&signed, "secret"), Some("header.payload.sig"));
    }

    #[test]
    fn test_verify_rejects_wrong_secret_and_tampering() {
        let signed = sign_value("value", "secret").unwrap();
        assert_eq!(verify_signed_value(&signed, "other"), None);

        let tampered = signed.replacen("value", "valve", 1);
        assert_eq!(verify_signed_value(&tampered, "secret"), None);

        assert_eq!(verify_signed_value("no-signature", "secret"), None);
        assert_eq!(verify_signed_value("value.!!!", "secret"), None);
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let mut config = create_test_config();
        config.auth.refresh_cookie.cookie_secure = true;

        let cookie = refresh_cookie("token", &config).unwrap();
        assert!(cookie.starts_with("refreshToken=token."));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains(&format!("Max-Age={}", 2 * 24 * 60 * 60)));

        let cleared = clear_refresh_cookie(&config);
        assert!(cleared.starts_with("refreshToken=;"));
        assert!(cleared.ends_with("Max-Age=0"));
    }

    #[test]
    fn test_read_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; refreshToken=abc.def"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));

        assert_eq!(read_cookie(&headers, "refreshToken").as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "other").as_deref(), Some("1"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_refresh_token_states() {
        let config = create_test_config();
        let mut headers = HeaderMap::new();
        assert_eq!(read_refresh_token(&headers, &config).unwrap(), SignedCookie::Missing);

        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken=forged.value"));
        assert_eq!(read_refresh_token(&headers, &config).unwrap(), SignedCookie::Tampered);

        let signed = sign_value("jwt", config.secrets.cookie_secret.as_deref().unwrap()).unwrap();
        headers.insert(header::COOKIE, HeaderValue::from_str(&format!("refreshToken={signed}")).unwrap());
        assert_eq!(read_refresh_token(&headers, &config).unwrap(), SignedCookie::Valid("jwt".to_string()));
    }
}
