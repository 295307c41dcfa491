/// User handlers - HTTP endpoints for accounts and sessions
use super::multipart::{read_form, store_image};
use super::AppState;
use crate::error::Result;
use crate::models::{User, UserView};
use crate::validators::{LoginRequest, SignupRequest, UpdateUserRequest};
use actix_middleware::AuthenticatedUser;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    pub token: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

impl SessionResponse {
    fn new(message: &'static str, user: User, token: String) -> Self {
        Self {
            message,
            user_id: user.id,
            token,
            email: user.email,
            name: user.name,
            image: user.image,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub message: &'static str,
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: UserView,
}

/// List every user without credentials
pub async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse> {
    let users = state.users.list_users().await?;
    Ok(HttpResponse::Ok().json(UserListResponse {
        message: "Returned list of users",
        users,
    }))
}

/// Register an account from a multipart form (name, email, password, image?)
pub async fn signup(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    let form = read_form(payload, state.max_upload_bytes).await?;
    let req = SignupRequest {
        name: form.text("name"),
        email: form.text("email"),
        password: form.text("password"),
    }
    .normalized();
    req.validate()?;

    let image = store_image(state.files.as_ref(), form.image).await?;
    let session = state
        .users
        .signup(req.name, req.email, req.password, image)
        .await?;

    Ok(HttpResponse::Created().json(SessionResponse::new(
        "User signed up.",
        session.user,
        session.token,
    )))
}

pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner().normalized();
    req.validate()?;

    let session = state.users.login(&req.email, req.password).await?;
    Ok(HttpResponse::Ok().json(SessionResponse::new(
        "User logged in.",
        session.user,
        session.token,
    )))
}

/// Update the authenticated user's own name and email
pub async fn update_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner().normalized();
    req.validate()?;

    let updated = state
        .users
        .update_user_info(user.user_id, user.user_id, &req.name, &req.email)
        .await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        message: "Information updated successfully.",
        user: updated.view(),
    }))
}
