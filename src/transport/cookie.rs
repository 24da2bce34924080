//! Refresh-cookie transport.
//!
//! One cookie binds the client to its login: in session mode it carries an
//! opaque session id, in legacy deployments the refresh token itself.
//! Attributes are a pure function of deployment environment and request
//! origin; `HttpOnly` and `Path=/` are unconditional and not representable
//! as options, so no caller can downgrade them.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Response};

use crate::config::Environment;

/// Single auth cookie, named for its content rather than its mechanism.
pub const REFRESH_COOKIE_NAME: &str = "campus_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieAttributes {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieAttributes {
    /// Total derivation: every (environment, origin) combination yields a
    /// valid attribute set. Cross-site callers need `SameSite=None`, which
    /// in turn requires `Secure`; first-party traffic keeps `Lax`.
    pub fn derive(
        environment: Environment,
        origin: Option<&str>,
        first_party_origins: &[String],
    ) -> Self {
        let cross_site = match origin {
            Some(o) => !first_party_origins.iter().any(|f| f == o),
            None => false,
        };

        if cross_site {
            return Self {
                secure: true,
                same_site: SameSite::None,
            };
        }

        Self {
            secure: environment != Environment::Development,
            same_site: SameSite::Lax,
        }
    }
}

fn format_set_cookie(value: &str, max_age_secs: u64, attrs: CookieAttributes) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; Max-Age={}; SameSite={}",
        REFRESH_COOKIE_NAME,
        value,
        max_age_secs,
        attrs.same_site.as_str()
    );
    if attrs.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Attach the refresh cookie to an outgoing response.
pub fn set_refresh_cookie<B>(
    response: &mut Response<B>,
    value: &str,
    max_age_secs: u64,
    attrs: CookieAttributes,
) {
    if let Ok(header) = HeaderValue::from_str(&format_set_cookie(value, max_age_secs, attrs)) {
        response.headers_mut().append(SET_COOKIE, header);
    }
}

/// Expire the refresh cookie so the client stops replaying a dead
/// reference.
pub fn clear_refresh_cookie<B>(response: &mut Response<B>, attrs: CookieAttributes) {
    if let Ok(header) = HeaderValue::from_str(&format_set_cookie("", 0, attrs)) {
        response.headers_mut().append(SET_COOKIE, header);
    }
}

/// Read the cookie value from an inbound request, if present.
pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        if name == REFRESH_COOKIE_NAME && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_party() -> Vec<String> {
        vec!["https://app.example.com".to_string()]
    }

    #[test]
    fn every_derivation_is_http_only() {
        // HttpOnly is structural: assert the serialized form for a spread
        // of inputs.
        for (env, origin) in [
            (Environment::Development, None),
            (Environment::Development, Some("https://evil.example")),
            (Environment::Production, None),
            (Environment::Production, Some("https://app.example.com")),
        ] {
            let attrs = CookieAttributes::derive(env, origin, &first_party());
            let cookie = format_set_cookie("abc", 60, attrs);
            assert!(cookie.contains("HttpOnly"), "missing HttpOnly: {}", cookie);
            assert!(cookie.contains("Path=/"));
        }
    }

    #[test]
    fn cross_site_origin_forces_secure_none() {
        let attrs = CookieAttributes::derive(
            Environment::Development,
            Some("https://other.example"),
            &first_party(),
        );
        assert_eq!(attrs.same_site, SameSite::None);
        assert!(attrs.secure);
    }

    #[test]
    fn first_party_production_is_secure_lax() {
        let attrs = CookieAttributes::derive(
            Environment::Production,
            Some("https://app.example.com"),
            &first_party(),
        );
        assert_eq!(attrs.same_site, SameSite::Lax);
        assert!(attrs.secure);
    }

    #[test]
    fn development_same_site_skips_secure_for_plain_http() {
        let attrs = CookieAttributes::derive(Environment::Development, None, &first_party());
        assert_eq!(attrs.same_site, SameSite::Lax);
        assert!(!attrs.secure);
    }

    #[test]
    fn read_back_round_trip() {
        let mut response: Response<()> = Response::new(());
        let attrs = CookieAttributes::derive(Environment::Development, None, &first_party());
        set_refresh_cookie(&mut response, "sid-12345", 3600, attrs);

        let set_value = response
            .headers()
            .get(SET_COOKIE)
            .expect("set-cookie")
            .to_str()
            .expect("ascii");
        let pair = set_value.split(';').next().expect("pair");

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(pair).expect("value"));
        assert_eq!(read_refresh_cookie(&headers).as_deref(), Some("sid-12345"));
    }

    #[test]
    fn clearing_sets_zero_max_age_and_empty_value() {
        let mut response: Response<()> = Response::new(());
        let attrs = CookieAttributes::derive(Environment::Production, None, &first_party());
        clear_refresh_cookie(&mut response, attrs);

        let set_value = response
            .headers()
            .get(SET_COOKIE)
            .expect("set-cookie")
            .to_str()
            .expect("ascii");
        assert!(set_value.starts_with("campus_session=;"));
        assert!(set_value.contains("Max-Age=0"));
    }

    #[test]
    fn read_ignores_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; campus_session=sid-9; lang=en"),
        );
        assert_eq!(read_refresh_cookie(&headers).as_deref(), Some("sid-9"));

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(read_refresh_cookie(&headers), None);
    }
}
