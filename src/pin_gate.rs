//! Cosmetic PIN gate for the dashboard routes.
//!
//! When `DASHBOARD_PIN` is configured every gated request must carry it in
//! the `X-Dashboard-Pin` header. This keeps casual visitors out of a
//! single-user admin panel; it is not authentication.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::errors::AppError;
use crate::handlers::AppState;

pub const PIN_HEADER: &str = "x-dashboard-pin";

pub async fn require_pin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_pin(state.config.dashboard_pin.as_deref(), request.headers())?;
    Ok(next.run(request).await)
}

fn check_pin(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let supplied = headers
        .get(PIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Dashboard-Pin header".to_string()))?;

    if !constant_time_compare(supplied.trim(), expected) {
        return Err(AppError::Unauthorized("Invalid dashboard PIN".to_string()));
    }
    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_no_pin_configured_allows_all() {
        assert!(check_pin(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_pin_checked() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            check_pin(Some("4821"), &headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(PIN_HEADER, HeaderValue::from_static("0000"));
        assert!(check_pin(Some("4821"), &headers).is_err());

        headers.insert(PIN_HEADER, HeaderValue::from_static("4821"));
        assert!(check_pin(Some("4821"), &headers).is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
