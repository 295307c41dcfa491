//! Request payloads and their validation rules.
//!
//! Payloads are normalized (trimmed, emails lower-cased) before `validate()`
//! runs, so the rules see exactly what will be stored.

use serde::Deserialize;
use validator::Validate;

/// Trim surrounding whitespace and lower-case.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "email must be valid"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

impl SignupRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email must be valid"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

impl LoginRequest {
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "email must be valid"))]
    pub email: String,
}

impl UpdateUserRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    pub description: String,
    pub address: Option<String>,
}

impl CreatePostRequest {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            address: self.address,
        }
    }
}
