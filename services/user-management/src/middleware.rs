use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use campusmentor_common::{AppError, RedisKeys};

use crate::services::AppState;

/// Client identity used for anonymous rate limiting.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

// Fixed-window limit on sign-in and sign-up attempts. Skipped without Redis.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(redis) = &state.redis_service {
        let key = RedisKeys::rate_limit(&client_key(&headers), request.uri().path());
        let allowed = match redis
            .check_rate_limit(&key, state.config.auth_rate_limit_per_minute, 60)
            .await
        {
            Ok(allowed) => allowed,
            Err(err) => {
                // Allow on Redis error
                tracing::warn!("Rate limit check failed: {}", err);
                true
            }
        };

        if !allowed {
            return Err(AppError::RateLimited("Too many attempts, try again in a minute".to_string()));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_key_prefers_the_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_key(&headers), "10.0.0.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&headers), "203.0.113.7");
    }
}
