//! Web API file endpoint tests.

mod common;

use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;

use common::{create_test_server, create_test_server_with, issue_key};
use filedepot::config::Config;

fn file_part(name: &str, content: &[u8], mime: &str) -> Part {
    Part::bytes(content.to_vec())
        .file_name(name.to_string())
        .mime_type(mime)
}

async fn upload_one(
    ctx: &common::TestContext,
    key: &str,
    name: &str,
    content: &[u8],
) -> Value {
    let form = MultipartForm::new().add_part("file", file_part(name, content, "text/plain"));

    let response = ctx
        .server
        .post("/api/files/upload")
        .add_header("X-API-Key", key)
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    body["files"][0].clone()
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = create_test_server().await;

    let response = ctx.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_files_require_api_key() {
    let ctx = create_test_server().await;

    let response = ctx.server.get("/api/files").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_invalid_api_key_rejected() {
    let ctx = create_test_server().await;

    let response = ctx
        .server
        .get("/api/files")
        .add_header("X-API-Key", "fd_made_up")
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let response = ctx
        .server
        .get("/api/files")
        .add_header("Authorization", format!("Bearer {key}"))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_upload_and_get() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let uploaded = upload_one(&ctx, &key, "notes.txt", b"hello world").await;

    assert_eq!(uploaded["name"], "notes.txt");
    assert_eq!(uploaded["originalName"], "notes.txt");
    assert_eq!(uploaded["mimeType"], "text/plain");
    assert_eq!(uploaded["size"], 11);
    assert_eq!(uploaded["userId"], "acct");
    assert!(uploaded["hash"].as_str().unwrap().len() == 64);

    let id = uploaded["id"].as_str().unwrap();
    let response = ctx
        .server
        .get(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["id"], *id);
}

#[tokio::test]
async fn test_upload_with_shared_fields() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    // Create a target folder first
    let folder_response = ctx
        .server
        .post("/api/folders")
        .add_header("X-API-Key", &key)
        .json(&serde_json::json!({"name": "Uploads"}))
        .await;
    let folder_id = folder_response.json::<Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let form = MultipartForm::new()
        .add_part("file", file_part("a.txt", b"aaa", "text/plain"))
        .add_part("file", file_part("b.txt", b"bbb", "text/plain"))
        .add_text("tags", r#"["work","batch"]"#)
        .add_text("description", "shared description")
        .add_text("folderId", folder_id.clone());

    let response = ctx
        .server
        .post("/api/files/upload")
        .add_header("X-API-Key", &key)
        .multipart(form)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    for file in files {
        assert_eq!(file["tags"], serde_json::json!(["work", "batch"]));
        assert_eq!(file["description"], "shared description");
        assert_eq!(file["folderId"], folder_id);
    }
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let form = MultipartForm::new().add_text("description", "no file here");

    let response = ctx
        .server
        .post("/api/files/upload")
        .add_header("X-API-Key", &key)
        .multipart(form)
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_upload_oversized_file_fails_independently() {
    let mut config = Config::default();
    config.storage.max_upload_size_mb = 1;
    let ctx = create_test_server_with(config).await;
    let key = issue_key(&ctx, "acct").await;

    // One file within the ceiling, one over it
    let small = vec![1u8; 1024];
    let large = vec![2u8; 2 * 1024 * 1024];

    let form = MultipartForm::new()
        .add_part("file", file_part("small.bin", &small, "application/octet-stream"))
        .add_part("file", file_part("large.bin", &large, "application/octet-stream"));

    let response = ctx
        .server
        .post("/api/files/upload")
        .add_header("X-API-Key", &key)
        .multipart(form)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    assert_eq!(body["files"][0]["name"], "small.bin");
    assert_eq!(body["failed"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"][0]["name"], "large.bin");
    assert!(body["failed"][0]["error"]
        .as_str()
        .unwrap()
        .contains("maximum size"));
}

#[tokio::test]
async fn test_batch_all_failed_is_unprocessable() {
    let mut config = Config::default();
    config.storage.max_upload_size_mb = 1;
    let ctx = create_test_server_with(config).await;
    let key = issue_key(&ctx, "acct").await;

    let large = vec![2u8; 2 * 1024 * 1024];
    let form = MultipartForm::new().add_part(
        "file",
        file_part("large.bin", &large, "application/octet-stream"),
    );

    let response = ctx
        .server
        .post("/api/files/upload")
        .add_header("X-API-Key", &key)
        .multipart(form)
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert!(body["files"].as_array().unwrap().is_empty());
    assert_eq!(body["failed"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_content_shares_storage() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let a = upload_one(&ctx, &key, "first.txt", b"same bytes").await;
    let b = upload_one(&ctx, &key, "second.txt", b"same bytes").await;

    assert_ne!(a["id"], b["id"]);
    assert_eq!(a["hash"], b["hash"]);
    assert_eq!(a["storagePath"], b["storagePath"]);

    // Deleting one leaves the other downloadable
    let a_id = a["id"].as_str().unwrap();
    let b_id = b["id"].as_str().unwrap();

    ctx.server
        .delete(&format!("/api/files/{a_id}"))
        .add_header("X-API-Key", &key)
        .await
        .assert_status_ok();

    let download = ctx
        .server
        .get(&format!("/api/files/{b_id}/download"))
        .add_header("X-API-Key", &key)
        .await;
    download.assert_status_ok();
    assert_eq!(download.as_bytes().as_ref(), b"same bytes");
}

#[tokio::test]
async fn test_download_headers() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let uploaded = upload_one(&ctx, &key, "report.txt", b"content").await;
    let id = uploaded["id"].as_str().unwrap();

    let response = ctx
        .server
        .get(&format!("/api/files/{id}/download"))
        .add_header("X-API-Key", &key)
        .await;
    response.assert_status_ok();

    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/plain");
    let disposition = headers["content-disposition"].to_str().unwrap();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("report.txt"));
    assert_eq!(response.as_bytes().as_ref(), b"content");
}

#[tokio::test]
async fn test_image_upload_serves_thumbnail() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    // Render a real PNG in memory
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        400,
        300,
        image::Rgb([255, 0, 0]),
    ));
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();

    let form = MultipartForm::new().add_part(
        "file",
        file_part("red.png", &png.into_inner(), "image/png"),
    );

    let response = ctx
        .server
        .post("/api/files/upload")
        .add_header("X-API-Key", &key)
        .multipart(form)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let file = &body["files"][0];
    assert_eq!(file["width"], 400);
    assert_eq!(file["height"], 300);
    assert!(file["thumbnailPath"].is_string());

    let id = file["id"].as_str().unwrap();
    let thumb = ctx
        .server
        .get(&format!("/api/files/{id}/thumbnail"))
        .add_header("X-API-Key", &key)
        .await;
    thumb.assert_status_ok();
    assert_eq!(thumb.headers()["content-type"], "image/png");
}

#[tokio::test]
async fn test_thumbnail_missing_is_not_found() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let uploaded = upload_one(&ctx, &key, "plain.txt", b"not an image").await;
    let id = uploaded["id"].as_str().unwrap();

    let response = ctx
        .server
        .get(&format!("/api/files/{id}/thumbnail"))
        .add_header("X-API-Key", &key)
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_pagination_metadata() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    for i in 0..7 {
        upload_one(&ctx, &key, &format!("file{i}.txt"), format!("c{i}").as_bytes()).await;
    }

    let response = ctx
        .server
        .get("/api/files")
        .add_query_param("page", "2")
        .add_query_param("limit", "3")
        .add_header("X-API-Key", &key)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["files"].as_array().unwrap().len(), 3);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["pagination"]["limit"], 3);
    assert_eq!(body["pagination"]["total"], 7);
    // ceil(7/3)
    assert_eq!(body["pagination"]["totalPages"], 3);
}

#[tokio::test]
async fn test_list_page_beyond_end_is_empty_not_error() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    upload_one(&ctx, &key, "only.txt", b"x").await;

    let response = ctx
        .server
        .get("/api/files")
        .add_query_param("page", "50")
        .add_header("X-API-Key", &key)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert!(body["files"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_list_rejects_page_zero() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let response = ctx
        .server
        .get("/api/files")
        .add_query_param("page", "0")
        .add_header("X-API-Key", &key)
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_filters() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let form = MultipartForm::new()
        .add_part("file", file_part("tagged.txt", b"t", "text/plain"))
        .add_text("tags", r#"["alpha","beta"]"#);
    ctx.server
        .post("/api/files/upload")
        .add_header("X-API-Key", &key)
        .multipart(form)
        .await
        .assert_status_ok();

    upload_one(&ctx, &key, "vacation-photo.txt", b"p").await;

    // Search
    let response = ctx
        .server
        .get("/api/files")
        .add_query_param("search", "VACATION")
        .add_header("X-API-Key", &key)
        .await;
    let body: Value = response.json();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["files"][0]["name"], "vacation-photo.txt");

    // Tag intersection
    let response = ctx
        .server
        .get("/api/files")
        .add_query_param("tags", "alpha,beta")
        .add_header("X-API-Key", &key)
        .await;
    let body: Value = response.json();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["files"][0]["name"], "tagged.txt");

    // Mime filter
    let response = ctx
        .server
        .get("/api/files")
        .add_query_param("mimeType", "application/json")
        .add_header("X-API-Key", &key)
        .await;
    let body: Value = response.json();
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_account_isolation() {
    let ctx = create_test_server().await;
    let key_a = issue_key(&ctx, "acct-a").await;
    let key_b = issue_key(&ctx, "acct-b").await;

    let uploaded = upload_one(&ctx, &key_a, "private.txt", b"secret").await;
    let id = uploaded["id"].as_str().unwrap();

    // Account B cannot see, download, or delete it
    ctx.server
        .get(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key_b)
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);

    ctx.server
        .get(&format!("/api/files/{id}/download"))
        .add_header("X-API-Key", &key_b)
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);

    ctx.server
        .delete(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key_b)
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);

    let list = ctx
        .server
        .get("/api/files")
        .add_header("X-API-Key", &key_b)
        .await;
    let body: Value = list.json();
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_partial_update_via_put_and_patch() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let uploaded = upload_one(&ctx, &key, "old.txt", b"data").await;
    let id = uploaded["id"].as_str().unwrap();

    // PUT carries partial semantics too
    let response = ctx
        .server
        .put(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key)
        .json(&serde_json::json!({"name": "renamed.txt"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "renamed.txt");

    // PATCH with tags only; name untouched
    let response = ctx
        .server
        .patch(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key)
        .json(&serde_json::json!({"tags": ["x"]}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "renamed.txt");
    assert_eq!(body["tags"], serde_json::json!(["x"]));
}

#[tokio::test]
async fn test_update_folder_null_moves_to_root() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let folder = ctx
        .server
        .post("/api/folders")
        .add_header("X-API-Key", &key)
        .json(&serde_json::json!({"name": "Box"}))
        .await
        .json::<Value>();
    let folder_id = folder["id"].as_str().unwrap();

    let uploaded = upload_one(&ctx, &key, "f.txt", b"x").await;
    let id = uploaded["id"].as_str().unwrap();

    // Into the folder
    let body: Value = ctx
        .server
        .patch(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key)
        .json(&serde_json::json!({"folderId": folder_id}))
        .await
        .json();
    assert_eq!(body["folderId"], *folder_id);

    // Explicit null moves back to the root
    let body: Value = ctx
        .server
        .patch(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key)
        .json(&serde_json::json!({"folderId": null}))
        .await
        .json();
    assert!(body.get("folderId").is_none());
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let ctx = create_test_server().await;
    let key = issue_key(&ctx, "acct").await;

    let uploaded = upload_one(&ctx, &key, "gone.txt", b"x").await;
    let id = uploaded["id"].as_str().unwrap();

    let response = ctx
        .server
        .delete(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    // Deleting again reports not-found, not a crash
    ctx.server
        .delete(&format!("/api/files/{id}"))
        .add_header("X-API-Key", &key)
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}
