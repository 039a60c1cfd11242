use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::envelope::ApiError;

/// Require `Authorization: Bearer <token>` matching the configured admin
/// token. With no token configured every protected action is refused.
pub fn authorize(headers: &HeaderMap, token: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = token.filter(|t| !t.is_empty()) else {
        return Err(ApiError::Unauthorized("Admin API is not configured"));
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    match presented {
        Some(p) if constant_time_compare(p.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(ApiError::Unauthorized("Unauthorized")),
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        headers
    }

    #[test]
    fn matching_token_passes() {
        assert!(authorize(&bearer("s3cret"), Some("s3cret")).is_ok());
    }

    #[test]
    fn wrong_or_missing_token_fails() {
        let err = authorize(&bearer("guess"), Some("s3cret")).unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
        assert!(authorize(&HeaderMap::new(), Some("s3cret")).is_err());
        assert!(authorize(&bearer("s3cret0"), Some("s3cret")).is_err());
    }

    #[test]
    fn unconfigured_token_disables_access() {
        let err = authorize(&bearer(""), None).unwrap_err();
        assert_eq!(err.to_string(), "Admin API is not configured");
        assert!(authorize(&bearer(""), Some("")).is_err());
    }

    #[test]
    fn compare() {
        assert!(constant_time_compare(b"abc", b"abc"));
        assert!(!constant_time_compare(b"abc", b"abd"));
        assert!(!constant_time_compare(b"abc", b"ab"));
    }
}
