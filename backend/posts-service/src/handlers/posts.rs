/// Post handlers - HTTP endpoints for post operations
use super::multipart::{read_form, store_image};
use super::AppState;
use crate::error::Result;
use crate::models::{NewPost, Post, PostUpdate};
use crate::validators::CreatePostRequest;
use actix_middleware::UserId;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: Post,
}

#[derive(Debug, Serialize)]
pub struct UserPostsResponse {
    pub user_posts: Vec<Post>,
}

/// Get a post by ID
pub async fn get_post(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = state.posts.get_post(*post_id).await?;
    Ok(HttpResponse::Ok().json(PostResponse { post }))
}

/// Get every post owned by a user
pub async fn get_user_posts(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_posts = state.posts.get_posts_by_user(*user_id).await?;
    Ok(HttpResponse::Ok().json(UserPostsResponse { user_posts }))
}

/// Create a post from a multipart form (title, description, address?, image?)
pub async fn create_post(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_form(payload, state.max_upload_bytes).await?;
    let req = CreatePostRequest {
        title: form.text("title"),
        description: form.text("description"),
        address: form.optional_text("address"),
    }
    .normalized();
    req.validate()?;

    let image = store_image(state.files.as_ref(), form.image).await?;
    let post = state
        .posts
        .create_post(
            user_id.0,
            NewPost {
                title: req.title,
                description: req.description,
                address: req.address,
                image,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(PostResponse { post }))
}

pub async fn update_post(
    state: web::Data<AppState>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
    req: web::Json<PostUpdate>,
) -> Result<HttpResponse> {
    let post = state
        .posts
        .update_post(*post_id, user_id.0, req.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(PostResponse { post }))
}

pub async fn delete_post(
    state: web::Data<AppState>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.posts.delete_post(*post_id, user_id.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Post deleted." })))
}
