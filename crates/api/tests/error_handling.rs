//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly; no server is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use refly_api::error::AppError;
use refly_core::error::CoreError;
use validator::Validate;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let (status, json) = error_to_response(CoreError::not_found("Canvas", "c-1").into()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Canvas not found: c-1");
}

#[tokio::test]
async fn quota_exceeded_returns_403() {
    let err = CoreError::StorageQuotaExceeded {
        needed: 3,
        available: 1,
    };
    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "STORAGE_QUOTA_EXCEEDED");
    assert!(json["error"].as_str().unwrap().contains("3 object(s) needed"));
}

#[tokio::test]
async fn duplication_not_allowed_returns_403() {
    let err = CoreError::DuplicationNotAllowed {
        share_id: "can-1".into(),
    };
    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "DUPLICATION_NOT_ALLOWED");
}

#[tokio::test]
async fn params_error_returns_400() {
    let err = CoreError::Params("unsupported share type: board".into());
    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "PARAMS_ERROR");
    assert_eq!(json["error"], "unsupported share type: board");
}

#[tokio::test]
async fn conflict_error_returns_409() {
    let (status, json) = error_to_response(CoreError::Conflict("share exists".into()).into()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn request_validation_failure_returns_400() {
    #[derive(Validate)]
    struct Body {
        #[validate(length(min = 1))]
        share_id: String,
    }

    let errors = Body {
        share_id: String::new(),
    }
    .validate()
    .unwrap_err();
    let (status, json) = error_to_response(AppError::Validation(errors)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("share_id"));
}

#[tokio::test]
async fn storage_error_returns_500_and_sanitizes_message() {
    let err = CoreError::Storage("s3://internal-bucket/secret-key unreachable".into());
    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn internal_error_is_sanitized() {
    let (status, json) =
        error_to_response(AppError::InternalError("pool exhausted at 10.0.0.4".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}
