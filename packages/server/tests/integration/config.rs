use ::common::storage::BlobKey;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use keepsake_server::entity::{coupon, gallery_item};

use crate::common::{TestApp, ids, routes};

#[tokio::test]
async fn create_then_view_an_empty_configuration() {
    let app = TestApp::spawn().await;
    let token = app.token_for("alex");

    let res = app
        .post_with_token(routes::CONFIGS, &json!({ "title": "  Alex & Sam  " }), &token)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["title"], "Alex & Sam");

    let view = app.get_with_token(&routes::config(res.id()), &token).await;
    assert_eq!(view.status, 200);
    assert_eq!(view.body["id"], res.id());
    assert_eq!(view.body["coupons"], json!([]));
    assert_eq!(view.body["gallery"], json!([]));
    assert_eq!(view.body["timeline"], json!([]));
}

#[tokio::test]
async fn blank_titles_are_rejected() {
    let app = TestApp::spawn().await;
    let token = app.token_for("alex");

    let res = app
        .post_with_token(routes::CONFIGS, &json!({ "title": "   " }), &token)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn update_reconciles_only_the_collections_present() {
    let app = TestApp::spawn().await;
    let token = app.token_for("alex");
    let id = app.create_config(&token, "Draft").await;
    app.reconcile(
        &routes::timeline(id),
        json!([{ "title": "First date", "occurred_on": "2019-06-14" }]),
        &token,
    )
    .await;

    let res = app
        .put_with_token(
            &routes::config(id),
            &json!({
                "title": "Final",
                "coupons": [{ "title": "Dinner out" }],
                "gallery": [{ "url": "/media/1.jpg" }],
            }),
            &token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["config"]["title"], "Final");
    let results = res.body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["collection"], "coupons");
    assert_eq!(results[1]["collection"], "gallery");
    assert_eq!(ids(&results[1]["created"]).len(), 1);

    let view = app.get_with_token(&routes::config(id), &token).await;
    assert_eq!(view.body["coupons"].as_array().unwrap().len(), 1);
    assert_eq!(view.body["gallery"].as_array().unwrap().len(), 1);
    assert_eq!(view.body["timeline"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_rows_and_unshared_blobs() {
    let app = TestApp::spawn().await;
    let token = app.token_for("alex");
    let doomed = app.create_config(&token, "Old").await;
    let kept = app.create_config(&token, "New").await;
    app.upload_blob("gallery/solo.jpg").await;
    app.upload_blob("gallery/shared.jpg").await;

    app.reconcile(
        &routes::gallery(doomed),
        json!([
            { "url": "/media/solo.jpg", "blob_key": "gallery/solo.jpg" },
            { "url": "/media/shared.jpg", "blob_key": "gallery/shared.jpg" },
        ]),
        &token,
    )
    .await;
    app.reconcile(
        &routes::coupons(doomed),
        json!([{ "title": "Dinner out" }]),
        &token,
    )
    .await;
    app.reconcile(
        &routes::gallery(kept),
        json!([{ "url": "/media/shared.jpg", "blob_key": "gallery/shared.jpg" }]),
        &token,
    )
    .await;

    let res = app.delete_with_token(&routes::config(doomed), &token).await;
    assert_eq!(res.status, 204, "{}", res.text);

    assert!(!app.blob_exists("gallery/solo.jpg").await);
    assert!(app.blob_exists("gallery/shared.jpg").await);
    assert_eq!(coupon::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(gallery_item::Entity::find().count(&app.db).await.unwrap(), 1);

    let gone = app.get_with_token(&routes::config(doomed), &token).await;
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn only_the_owner_can_delete() {
    let app = TestApp::spawn().await;
    let owner = app.token_for("alex");
    let id = app.create_config(&owner, "Ours").await;
    app.upload_blob("gallery/keep.jpg").await;
    app.reconcile(
        &routes::gallery(id),
        json!([{ "url": "/media/keep.jpg", "blob_key": "gallery/keep.jpg" }]),
        &owner,
    )
    .await;

    let res = app
        .delete_with_token(&routes::config(id), &app.token_for("mallory"))
        .await;

    assert_eq!(res.status, 403);
    assert!(
        app.blobs
            .exists(&BlobKey::parse("gallery/keep.jpg").unwrap())
            .await
            .unwrap()
    );
    let view = app.get_with_token(&routes::config(id), &owner).await;
    assert_eq!(view.status, 200);
}
