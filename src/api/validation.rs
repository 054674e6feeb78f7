//! Presence and format checks for request bodies.
//!
//! Field errors are collected with `ValidationErrorBuilder` and reported
//! together as one 400 response.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{CreateBookingRequest, LoginRequest, RegisterRequest, Role, UpdateProfileRequest};

lazy_static! {
    /// Something before and after a single `@`, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap();
}

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_TEXT_LENGTH: usize = 200;

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!(
            "Email is too long (max {} characters)",
            MAX_EMAIL_LENGTH
        ));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Email must contain a single '@'".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    Ok(())
}

fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.len() > MAX_TEXT_LENGTH {
        return Err(format!(
            "{} is too long (max {} characters)",
            label, MAX_TEXT_LENGTH
        ));
    }
    Ok(())
}

fn validate_optional(value: &str, label: &str) -> Result<(), String> {
    if value.len() > MAX_TEXT_LENGTH {
        return Err(format!(
            "{} is too long (max {} characters)",
            label, MAX_TEXT_LENGTH
        ));
    }
    Ok(())
}

/// Validate a registration and return the requested role
pub fn validate_register(req: &RegisterRequest) -> Result<Role, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&req.password) {
        errors.add("password", e);
    }
    let role = match req.role.parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            errors.add("role", "Role must be one of: client, therapist, admin");
            None
        }
    };

    errors.finish()?;
    role.ok_or_else(|| ApiError::validation_field("role", "Role is required"))
}

pub fn validate_login(req: &LoginRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if req.email.is_empty() {
        errors.add("email", "Email is required");
    }
    if let Err(e) = validate_password(&req.password) {
        errors.add("password", e);
    }
    errors.finish()
}

pub fn validate_booking(req: &CreateBookingRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_required(&req.date, "Date") {
        errors.add("date", e);
    }
    if let Err(e) = validate_required(&req.time, "Time") {
        errors.add("time", e);
    }
    errors.finish()
}

pub fn validate_profile_update(req: &UpdateProfileRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_required(&req.name, "Name") {
        errors.add("name", e);
    }
    for (field, value, label) in [
        ("specialty", &req.specialty, "Specialty"),
        ("seguro", &req.seguro, "Seguro"),
        ("price", &req.price, "Price"),
    ] {
        if let Err(e) = validate_optional(value, label) {
            errors.add(field, e);
        }
    }
    errors.finish()
}
