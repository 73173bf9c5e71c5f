use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use employee_cell::{EmployeeService, PasswordService};
use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::SESSION_COOKIE;
use shared_utils::jwt::{issue_token, validate_token as decode_session};

use crate::models::{sections_for, LoginRequest, LoginResponse};

// Bearer header first, session cookie second
fn extract_session_token(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(auth_header) = headers.get("Authorization") {
        let auth_value = auth_header
            .to_str()
            .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

        return auth_value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()));
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub async fn login(
    State(config): State<Arc<AppConfig>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    debug!("Login attempt for {}", request.login);

    let invalid = || AppError::Auth("Invalid login or password".to_string());

    let service = EmployeeService::new(&config);
    let employee = service.find_by_login(&request.login).await?.ok_or_else(|| {
        warn!("Login attempt for unknown login {}", request.login);
        invalid()
    })?;

    let matches = PasswordService::verify_password(&request.password, &employee.password)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
    if !matches {
        warn!("Wrong password for employee {}", employee.id);
        return Err(invalid());
    }

    let token = issue_token(
        &employee.id.to_string(),
        Some(&employee.email),
        employee.role.as_str(),
        &config.session_jwt_secret,
        config.session_ttl_hours,
    )
    .map_err(AppError::Internal)?;

    info!("Employee {} logged in as {}", employee.id, employee.role);

    let response = LoginResponse {
        token: token.clone(),
        token_type: "Bearer",
        expires_in: config.session_ttl_hours * 3600,
        employee_id: employee.id.to_string(),
        role: employee.role,
        full_name: employee.full_name(),
    };

    Ok((jar.add(session_cookie(token)), Json(response)))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    // Emit an expired cookie even when the request carried none
    let mut removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    removal.make_removal();
    (jar.add(removal), Json(json!({ "logged_out": true })))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_session_token(&headers)?;
    let user = decode_session(&token, &config.session_jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_session_token(&headers)?;
    let valid = decode_session(&token, &config.session_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = EmployeeService::new(&config);
    let employee = service.get(user.employee_id()?).await?;

    Ok(Json(json!(employee)))
}

pub async fn dashboard(Extension(user): Extension<User>) -> Result<Json<Value>, AppError> {
    let role = user
        .role()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    Ok(Json(json!({
        "role": role,
        "role_label": role.label(),
        "sections": sections_for(role)
    })))
}
