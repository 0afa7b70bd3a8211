use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::HEALTH).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(&routes::coupons(1)).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let app = TestApp::spawn().await;
    let forged = keepsake_server::utils::jwt::sign(
        "mallory",
        "not-the-server-secret",
        chrono::Duration::hours(1),
    )
    .unwrap();

    let res = app
        .post_with_token(routes::CONFIGS, &json!({ "title": "Ours" }), &forged)
        .await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn other_subjects_cannot_touch_a_configuration() {
    let app = TestApp::spawn().await;
    let owner = app.token_for("alex");
    let stranger = app.token_for("mallory");
    let id = app.create_config(&owner, "Alex & Sam").await;

    let read = app.get_with_token(&routes::config(id), &stranger).await;
    assert_eq!(read.status, 403);
    assert_eq!(read.body["code"], "PERMISSION_DENIED");

    let write = app
        .put_with_token(
            &routes::coupons(id),
            &json!({ "items": [] }),
            &stranger,
        )
        .await;
    assert_eq!(write.status, 403);
}
