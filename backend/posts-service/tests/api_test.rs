/// HTTP surface tests
/// Routes, status codes and the authorization gate, over the in-memory store.
mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::{multipart_body, Harness, BAKER_ST};
use posts_service::handlers;
use serde_json::{json, Value};

macro_rules! app {
    ($harness:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($harness.app_state()))
                .configure(handlers::configure($harness.keys.clone())),
        )
        .await
    };
}

macro_rules! signup {
    ($app:expr, $name:expr, $email:expr) => {{
        let (content_type, body) = multipart_body(
            &[("name", $name), ("email", $email), ("password", "secret1")],
            None,
        );
        let req = test::TestRequest::post()
            .uri("/api/users/signup")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }};
}

macro_rules! create_post {
    ($app:expr, $token:expr, $fields:expr) => {{
        let (content_type, body) = multipart_body($fields, None);
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("content-type", content_type))
            .insert_header(("Authorization", format!("Bearer {}", $token)))
            .set_payload(body)
            .to_request();
        test::call_service(&$app, req).await
    }};
}

#[actix_web::test]
async fn test_signup_login_and_list() {
    let harness = Harness::new();
    let app = app!(harness);
    let (user_id, _) = signup!(app, "Ann", " Ann@X.com ");

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": "ann@x.com", "password": "secret1" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user_id"], user_id);
    assert_eq!(body["email"], "ann@x.com");
    assert!(body["token"].as_str().is_some());

    let req = test::TestRequest::get().uri("/api/users").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert!(body["users"][0].get("password_hash").is_none());
}

#[actix_web::test]
async fn test_signup_validation_and_conflict() {
    let harness = Harness::new();
    let app = app!(harness);
    signup!(app, "Ann", "ann@x.com");

    let (content_type, body) = multipart_body(
        &[("name", "Ann"), ("email", "ann@x.com"), ("password", "secret1")],
        None,
    );
    let req = test::TestRequest::post()
        .uri("/api/users/signup")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let (content_type, body) = multipart_body(
        &[("name", "Bob"), ("email", "bob@x.com"), ("password", "123")],
        None,
    );
    let req = test::TestRequest::post()
        .uri("/api/users/signup")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 422);
}

#[actix_web::test]
async fn test_wrong_password_is_forbidden() {
    let harness = Harness::new();
    let app = app!(harness);
    signup!(app, "Ann", "ann@x.com");

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": "ann@x.com", "password": "wrong-pass" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": "nobody@x.com", "password": "secret1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_protected_routes_require_token() {
    let harness = Harness::new();
    let app = app!(harness);
    let (user_id, token) = signup!(app, "Ann", "ann@x.com");

    let resp = create_post!(app, "not-a-token", &[("title", "t"), ("description", "d")]);
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri("/api/users")
        .set_json(json!({ "name": "Annie", "email": "ann@x.com" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri("/api/users")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "name": "Annie", "email": "ann@x.com" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["id"], user_id);
    assert_eq!(body["user"]["name"], "Annie");
}

#[actix_web::test]
async fn test_post_lifecycle_over_http() {
    let harness = Harness::new();
    let app = app!(harness);
    let (ann_id, ann_token) = signup!(app, "Ann", "ann@x.com");
    let (_, bob_token) = signup!(app, "Bob", "bob@x.com");

    let resp = create_post!(
        app,
        ann_token,
        &[("title", "Home"), ("description", "Flat"), ("address", BAKER_ST)]
    );
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let post_id = body["post"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["post"]["owner_id"], ann_id);
    assert_eq!(body["post"]["location"]["lat"], 51.5237);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/user/{}", ann_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user_posts"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(("Authorization", format!("Bearer {}", bob_token)))
        .set_json(json!({ "title": "Mine now" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(("Authorization", format!("Bearer {}", ann_token)))
        .set_json(json!({ "title": "Home sweet home", "description": "Flat" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["post"]["title"], "Home sweet home");
    assert!(body["post"]["location"].is_null());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(("Authorization", format!("Bearer {}", ann_token)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}", post_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/user/{}", ann_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_create_with_image_and_rejects_other_types() {
    let harness = Harness::new();
    let app = app!(harness);
    let (_, token) = signup!(app, "Ann", "ann@x.com");

    let (content_type, body) = multipart_body(
        &[("title", "Pic"), ("description", "d")],
        Some(("image", "image/png", &b"\x89PNG"[..])),
    );
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("content-type", content_type))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["post"]["image"].as_str().unwrap().ends_with(".png"));
    assert_eq!(harness.stored_files(), 1);

    let (content_type, body) = multipart_body(
        &[("title", "Gif"), ("description", "d")],
        Some(("image", "image/gif", &b"GIF89a"[..])),
    );
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("content-type", content_type))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_payload(body)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(harness.stored_files(), 1);
}

#[actix_web::test]
async fn test_health_and_malformed_json() {
    let harness = Harness::new();
    let app = app!(harness);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}
