//! Upload, listing, visibility and delete flows over HTTP.

mod common;

use common::*;
use serde_json::{json, Value};

use coinfile::db::{RecordStore, UsedPayment};

fn small_quota(config: &mut coinfile::config::AppConfig) {
    config.tiers.free.total_bytes = 1_000;
    config.tiers.free.per_file_bytes = 600;
    config.tiers.holder.total_bytes = 10_000;
    config.tiers.holder.per_file_bytes = 6_000;
    config.files.onchain_max_file_bytes = 100;
}

#[tokio::test]
async fn test_anonymous_upload_is_served_and_shareable() {
    let app = spawn_app(small_quota, None).await;

    let res = upload(&app, "notes.txt", 32, &[]).await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["storageType"], "cloud");
    let short_id = body["shortId"].as_str().unwrap().to_string();
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with(&format!("{}/blobs/anonymous/", app.base_url)));
    assert!(url.ends_with(".txt"));

    let blob = app.http.get(&url).send().await.unwrap();
    assert_eq!(blob.status(), 200);
    assert_eq!(blob.bytes().await.unwrap().len(), 32);

    let shared: Value = app
        .http
        .get(app.api(&format!("/f/{short_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(shared["owner_wallet"], "anonymous");
    assert_eq!(shared["original_filename"], "notes.txt");

    let explorer: Value = app
        .http
        .get(app.api("/explorer"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(explorer["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_over_cap_writes_nothing() {
    let app = spawn_app(small_quota, None).await;
    let wallet = address(9);

    let res = upload(&app, "big.bin", 601, &[("wallet", wallet.as_str())]).await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("File too large"));

    assert!(app.store.list_files_by_owner(&wallet).await.unwrap().is_empty());
    let user = app.store.get_user(&wallet).await.unwrap().unwrap();
    assert_eq!(user.total_storage_used, 0);
}

#[tokio::test]
async fn test_missing_file_part_is_rejected() {
    let app = spawn_app(small_quota, None).await;
    let form = reqwest::multipart::Form::new().text("wallet", address(9));
    let res = app
        .http
        .post(app.api("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_quota_counts_previous_uploads() {
    let app = spawn_app(small_quota, None).await;
    let wallet = address(9);

    for _ in 0..2 {
        let res = upload(&app, "a.txt", 500, &[("wallet", wallet.as_str())]).await;
        assert_eq!(res.status(), 200);
    }
    let res = upload(&app, "a.txt", 1, &[("wallet", wallet.as_str())]).await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Storage quota exceeded");

    let listing: Value = app
        .http
        .get(app.api(&format!("/files?wallet={wallet}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["files"].as_array().unwrap().len(), 2);
    assert_eq!(listing["storageUsed"], 1_000);
    assert_eq!(listing["storageLimit"], 1_000);
    assert_eq!(listing["tier"], "free");
}

#[tokio::test]
async fn test_token_holder_gets_larger_quota() {
    let app = spawn_app(
        |config| {
            small_quota(config);
            config.tiers.token_mint = address(50);
        },
        None,
    )
    .await;
    app.chain.lock().unwrap().token_balance = 1_500.0;
    let wallet = address(9);

    let res = upload(&app, "big.bin", 2_000, &[("wallet", wallet.as_str())]).await;
    assert_eq!(res.status(), 200);

    let listing: Value = app
        .http
        .get(app.api(&format!("/files?wallet={wallet}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["tier"], "holder");
    assert_eq!(listing["storageLimit"], 10_000);
    assert_eq!(listing["storageUsed"], 2_000);
}

#[tokio::test]
async fn test_listing_requires_wallet() {
    let app = spawn_app(small_quota, None).await;
    let res = app.http.get(app.api("/files")).send().await.unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Wallet address required");
}

#[tokio::test]
async fn test_onchain_upload_needs_claimed_payment() {
    let app = spawn_app(small_quota, None).await;
    let wallet = address(9);

    let res = upload(&app, "a.txt", 10, &[("wallet", wallet.as_str()), ("storageType", "onchain")]).await;
    assert_eq!(res.status(), 400);

    let res = upload(
        &app,
        "a.txt",
        10,
        &[("wallet", wallet.as_str()), ("storageType", "onchain"), ("txSignature", "unclaimed")],
    )
    .await;
    assert_eq!(res.status(), 402);

    app.store
        .claim_payment(UsedPayment::new("paid-sig", 0.05))
        .await
        .unwrap();
    let res = upload(
        &app,
        "a.txt",
        10,
        &[("wallet", wallet.as_str()), ("storageType", "onchain"), ("txSignature", "paid-sig")],
    )
    .await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["storageType"], "onchain");
    assert_eq!(body["txSignature"], "paid-sig");

    let res = upload(
        &app,
        "big.txt",
        101,
        &[("wallet", wallet.as_str()), ("storageType", "onchain"), ("txSignature", "paid-sig")],
    )
    .await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_payment_signature_redeems_once() {
    let app = spawn_app(small_quota, None).await;
    app.store
        .claim_payment(UsedPayment::new("one-fee", 0.01))
        .await
        .unwrap();

    let first = address(9);
    let res = upload(
        &app,
        "a.txt",
        10,
        &[("wallet", first.as_str()), ("storageType", "onchain"), ("txSignature", "one-fee")],
    )
    .await;
    assert_eq!(res.status(), 200);

    for wallet in [first, address(8)] {
        let res = upload(
            &app,
            "b.txt",
            10,
            &[("wallet", wallet.as_str()), ("storageType", "onchain"), ("txSignature", "one-fee")],
        )
        .await;
        assert_eq!(res.status(), 402);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Payment already used");
    }

    let listed: Value = app
        .http
        .get(app.api("/files"))
        .query(&[("wallet", address(8).as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed["files"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_underpaid_signature_rejected_for_onchain_upload() {
    let app = spawn_app(small_quota, None).await;
    app.store
        .claim_payment(UsedPayment::new("dust", 0.000000001))
        .await
        .unwrap();

    let wallet = address(9);
    let res = upload(
        &app,
        "a.txt",
        10,
        &[("wallet", wallet.as_str()), ("storageType", "onchain"), ("txSignature", "dust")],
    )
    .await;
    assert_eq!(res.status(), 402);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("below the 0.01 SOL fee"));
}

#[tokio::test]
async fn test_malformed_wallet_rejected() {
    let app = spawn_app(small_quota, None).await;

    for wallet in ["a/../b", "metadata"] {
        let res = upload(&app, "a.txt", 10, &[("wallet", wallet)]).await;
        assert_eq!(res.status(), 400, "upload as {wallet}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Invalid wallet address");

        let res = app
            .http
            .get(app.api("/files"))
            .query(&[("wallet", wallet)])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400, "listing for {wallet}");
    }
    assert!(std::fs::read_dir(&app.blob_root)
        .map(|entries| entries.count() == 0)
        .unwrap_or(true));
}

#[tokio::test]
async fn test_only_owner_changes_visibility() {
    let app = spawn_app(small_quota, None).await;
    let owner = address(9);
    let body: Value = upload(&app, "a.txt", 10, &[("wallet", owner.as_str())])
        .await
        .json()
        .await
        .unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    let res = app
        .http
        .post(app.api("/update-public"))
        .json(&json!({ "fileId": id, "walletAddress": address(8), "isPublic": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = app
        .http
        .post(app.api("/update-public"))
        .json(&json!({ "fileId": id, "walletAddress": owner }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "Missing required fields");

    let res = app
        .http
        .post(app.api("/update-public"))
        .json(&json!({ "fileId": id, "walletAddress": owner, "isPublic": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let explorer: Value = app
        .http
        .get(app.api("/explorer"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(explorer["files"].as_array().unwrap().is_empty());

    let direct = app.http.get(app.api(&format!("/file/{id}"))).send().await.unwrap();
    assert_eq!(direct.status(), 200);
}

#[tokio::test]
async fn test_only_owner_deletes() {
    let app = spawn_app(small_quota, None).await;
    let owner = address(9);
    let body: Value = upload(&app, "a.txt", 10, &[("wallet", owner.as_str())])
        .await
        .json()
        .await
        .unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    let res = app
        .http
        .delete(app.api(&format!("/file/{id}?wallet={}", address(8))))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = app
        .http
        .delete(app.api(&format!("/file/{id}?wallet={owner}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "File deleted successfully");

    let res = app.http.get(app.api(&format!("/file/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let user = app.store.get_user(&owner).await.unwrap().unwrap();
    assert_eq!(user.total_storage_used, 0);
}

#[tokio::test]
async fn test_anonymous_uploads_cannot_be_deleted() {
    let app = spawn_app(small_quota, None).await;
    let body: Value = upload(&app, "a.txt", 10, &[]).await.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    let res = app
        .http
        .delete(app.api(&format!("/file/{id}?wallet=anonymous")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
async fn test_health_reports_rpc_state() {
    let app = spawn_app(small_quota, None).await;
    let body: Value = app
        .http
        .get(format!("{}/health", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rpc"], "ok");

    app.chain.lock().unwrap().failing = true;
    let body: Value = app
        .http
        .get(format!("{}/health", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rpc"], "unreachable");
}
