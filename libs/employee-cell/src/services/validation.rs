// Field rules for employee forms. Every rule reports into a list so the
// caller sees all problems at once.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CreateEmployeeRequest, UpdateEmployeeRequest};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s,'-]+$").expect("valid name regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("valid phone regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

pub fn validate_name(field: &str, value: &str, errors: &mut Vec<String>) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(format!("{} is required", field));
    } else if trimmed.chars().count() > 100 {
        errors.push(format!("{} must be at most 100 characters", field));
    } else if !NAME_RE.is_match(trimmed) {
        errors.push(format!(
            "{} may only contain letters, spaces, apostrophes, hyphens and commas",
            field
        ));
    }
}

pub fn validate_phone(phone: &str, errors: &mut Vec<String>) {
    if !PHONE_RE.is_match(phone.trim()) {
        errors.push("Phone number must look like '+999999999' (9 to 15 digits)".to_string());
    }
}

pub fn validate_email(email: &str, allowed_domain: Option<&str>, errors: &mut Vec<String>) {
    let email = email.trim();
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        errors.push("Email address is not valid".to_string());
        return;
    }

    if let Some(domain) = allowed_domain {
        let actual = email.rsplit('@').next().unwrap_or_default();
        if !actual.eq_ignore_ascii_case(domain) {
            errors.push(format!("Email domain must be {}", domain));
        }
    }
}

pub fn validate_login(login: &str, errors: &mut Vec<String>) {
    let login = login.trim();
    if login.is_empty() {
        errors.push("Login is required".to_string());
    } else if login.len() > 50 {
        errors.push("Login must be at most 50 characters".to_string());
    }
}

pub fn validate_create(
    request: &CreateEmployeeRequest,
    allowed_domain: Option<&str>,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    validate_name("Last name", &request.last_name, &mut errors);
    validate_name("First name", &request.first_name, &mut errors);
    validate_login(&request.login, &mut errors);
    validate_email(&request.email, allowed_domain, &mut errors);

    if let Some(phone) = request.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_phone(phone, &mut errors);
    }

    if request.service.trim().is_empty() {
        errors.push("Service is required".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_update(
    request: &UpdateEmployeeRequest,
    allowed_domain: Option<&str>,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(last_name) = &request.last_name {
        validate_name("Last name", last_name, &mut errors);
    }
    if let Some(first_name) = &request.first_name {
        validate_name("First name", first_name, &mut errors);
    }
    if let Some(login) = &request.login {
        validate_login(login, &mut errors);
    }
    if let Some(email) = &request.email {
        validate_email(email, allowed_domain, &mut errors);
    }
    if let Some(phone) = request.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_phone(phone, &mut errors);
    }
    if let Some(service) = &request.service {
        if service.trim().is_empty() {
            errors.push("Service is required".to_string());
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
