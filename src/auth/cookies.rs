use axum::http::{header, HeaderMap, HeaderValue};
use cookie::Cookie;

pub const SESSION_COOKIE: &str = "lawdesk_session";

/// Set-Cookie value carrying the session token.
pub fn session_cookie(token: &str, max_age_hours: u64, secure: bool) -> Option<HeaderValue> {
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::hours(max_age_hours as i64))
        .secure(secure)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// Set-Cookie value that expires the session cookie.
pub fn clear_session_cookie() -> Option<HeaderValue> {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::ZERO)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// Session token from the cookie, falling back to a Bearer header for API clients.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, SESSION_COOKIE) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header_value in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = header_value.to_str() else {
            continue;
        };
        for piece in cookie_str.split(';') {
            if let Ok(c) = Cookie::parse(piece.trim().to_string()) {
                if c.name() == name && !c.value().is_empty() {
                    return Some(c.value().to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; lawdesk_session=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn cleared_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("lawdesk_session="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let value = session_cookie("tok", 2, true).unwrap();
        let text = value.to_str().unwrap();
        assert!(text.starts_with("lawdesk_session=tok"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("SameSite=Lax"));
        assert!(text.contains("Secure"));
        assert!(text.contains("Max-Age=7200"));

        let cleared = clear_session_cookie().unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }
}
