/// HTTP handlers for posts-service
///
/// - users: listing, signup, login and profile updates
/// - posts: post reads and owner-only mutations
///
/// Mutating routes sit behind `JwtAuthMiddleware`; reads, signup and login
/// are public.
pub mod multipart;
pub mod posts;
pub mod users;

use crate::db::Store;
use crate::error::AppError;
use crate::services::{FileStorage, Geocoder, PostCoordinator, UserDirectory};
use actix_middleware::JwtAuthMiddleware;
use actix_web::{guard, web, HttpResponse};
use crypto_core::JwtKeys;
use std::sync::Arc;
use std::time::Duration;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub posts: PostCoordinator,
    pub users: UserDirectory,
    pub files: Arc<dyn FileStorage>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        geocoder: Arc<dyn Geocoder>,
        files: Arc<dyn FileStorage>,
        keys: Arc<JwtKeys>,
        tx_timeout: Duration,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            posts: PostCoordinator::new(store.clone(), geocoder, files.clone(), tx_timeout),
            users: UserDirectory::new(store.clone(), keys, files.clone()),
            store,
            files,
            max_upload_bytes,
        }
    }
}

/// Store liveness, used by load balancers.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.store.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "unavailable" }))
        }
    }
}

/// Register the `/api` routes. The gate wraps only the protected resources.
pub fn configure(keys: Arc<JwtKeys>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(
            web::JsonConfig::default().error_handler(|err, _req| AppError::from(err).into()),
        )
        .app_data(
            web::PathConfig::default().error_handler(|err, _req| AppError::from(err).into()),
        )
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health))
                .service(
                    web::scope("/users")
                        .service(
                            web::resource("")
                                .guard(guard::Patch())
                                .wrap(JwtAuthMiddleware::new(keys.clone()))
                                .route(web::patch().to(users::update_user)),
                        )
                        .route("", web::get().to(users::list_users))
                        .route("/signup", web::post().to(users::signup))
                        .route("/login", web::post().to(users::login)),
                )
                .service(
                    web::scope("/posts")
                        .route("/user/{user_id}", web::get().to(posts::get_user_posts))
                        .service(
                            web::resource("")
                                .guard(guard::Post())
                                .wrap(JwtAuthMiddleware::new(keys.clone()))
                                .route(web::post().to(posts::create_post)),
                        )
                        .service(
                            web::resource("/{post_id}")
                                .guard(guard::Any(guard::Patch()).or(guard::Delete()))
                                .wrap(JwtAuthMiddleware::new(keys))
                                .route(web::patch().to(posts::update_post))
                                .route(web::delete().to(posts::delete_post)),
                        )
                        .route("/{post_id}", web::get().to(posts::get_post)),
                ),
        );
    }
}
