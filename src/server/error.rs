//! HTTP error responses
//!
//! Every failure renders as `{error, errorCode, message}` with the status
//! that belongs to its [`ErrorCode`].

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::types::{EchoError, ErrorCode, ValidationError};

#[derive(Debug)]
pub struct ApiError(pub EchoError);

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    error_code: &'static str,
    message: &'static str,
}

impl From<EchoError> for ApiError {
    fn from(err: EchoError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(EchoError::InvalidInput(rejection.body_text()))
    }
}

/// Message shown to end users
fn user_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::ValidationError => "请求格式不正确",
        ErrorCode::InvalidInput => "输入内容无效",
        ErrorCode::Unauthorized => "未授权访问",
        ErrorCode::Forbidden => "没有访问权限",
        ErrorCode::NotFound => "未找到请求的内容",
        ErrorCode::RateLimitExceeded => "请求过于频繁，请稍后再试",
        ErrorCode::ApiError => "AI 服务暂时不可用，请稍后再试",
        ErrorCode::GenerationFailed => "生成失败，请稍后再试",
        ErrorCode::NetworkError => "网络连接失败，请检查网络",
        ErrorCode::Timeout => "请求超时，请稍后再试",
        ErrorCode::InternalError => "服务器内部错误",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.error_code();
        let status =
            StatusCode::from_u16(code.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error_code = %code, error = %self.0, "Request failed");
        } else {
            warn!(error_code = %code, error = %self.0, "Request rejected");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            error_code: code.as_str(),
            message: user_message(code),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProviderFailure, ErrorCategory};

    #[test]
    fn test_status_follows_error_code() {
        let cases = [
            (EchoError::validation("answers empty"), 400),
            (EchoError::NotFound("echo".into()), 404),
            (
                EchoError::AllProvidersFailed {
                    operation: "generate-images".into(),
                    failures: vec![ProviderFailure {
                        provider: "replicate-sdxl".into(),
                        category: ErrorCategory::Transient,
                        message: "503".into(),
                        attempts: 3,
                    }],
                },
                503,
            ),
            (EchoError::Config("bad".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status().as_u16(), status);
        }
    }
}
