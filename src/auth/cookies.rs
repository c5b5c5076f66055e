use axum::http::{header, HeaderMap};
use url::form_urlencoded;

/// Value of the named cookie, searching every `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty()).then_some(token)
}

pub fn session_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}")
}

pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Remembers where to send the user after login.
pub fn return_url_cookie(name: &str, path_and_query: &str, max_age_secs: u64) -> String {
    let encoded: String = form_urlencoded::byte_serialize(path_and_query.as_bytes()).collect();
    format!("{name}={encoded}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}")
}

/// Decodes a stored return URL. Only same-site paths are accepted.
pub fn decode_return_url(raw: &str) -> Option<String> {
    let (decoded, _) = form_urlencoded::parse(raw.as_bytes()).next()?;
    let decoded = decoded.into_owned();
    if decoded.starts_with('/') && !decoded.starts_with("//") && !decoded.contains('\\') {
        Some(decoded)
    } else {
        None
    }
}
