use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use axum_extra::extract::cookie::CookieJar;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

pub const SESSION_COOKIE: &str = "session";

/// Authenticates the request from a bearer token or the session cookie.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = match request.headers().get("Authorization") {
        Some(auth_header) => {
            let auth_value = auth_header
                .to_str()
                .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

            auth_value
                .strip_prefix("Bearer ")
                .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?
                .to_string()
        }
        None => CookieJar::from_headers(request.headers())
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?,
    };

    let user = validate_token(&token, &config.session_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Rejects the caller with 403 unless their role is listed.
pub fn require_role(user: &User, allowed: &[Role]) -> Result<Role, AppError> {
    match user.role() {
        Some(role) if allowed.contains(&role) => Ok(role),
        _ => {
            tracing::warn!("User {} with role {:?} denied access", user.id, user.role);
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(role: &str) -> User {
        User {
            id: "u".to_string(),
            email: None,
            role: Some(role.to_string()),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn test_require_role() {
        assert_eq!(require_role(&user("doctor"), &[Role::Doctor]).unwrap(), Role::Doctor);
        assert_matches!(
            require_role(&user("nurse"), &[Role::Doctor]),
            Err(AppError::Forbidden(_))
        );
        assert!(require_role(&user("unknown"), &Role::all()).is_err());
    }
}
