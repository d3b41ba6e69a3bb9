//! Response classification
//!
//! Maps a failed call onto exactly one [`ClassifiedError`] variant:
//!
//! | Status | Classification |
//! |---|---|
//! | 500–599 | `InternalServerError` with the body text |
//! | 400 | `BadInput` with the body text |
//! | 401 | `AuthFailed` with the `error` field of the JSON body |
//! | 403, 404, 409 | `RouteError` with the `error` field decoded as the route's error type |
//! | 429 | `RateLimited` with the `error` field |
//! | 200 | `TransportFailure`, the call failed after a successful status |
//! | other | `HttpError` |
//! | no response | `TransportFailure` |
//!
//! A JSON-carrying status whose body is not an object with a decodable
//! `error` field breaks the wire contract. It is logged and reported as
//! `TransportFailure(MalformedBody)`.

use crate::error::{AuthErrorPayload, ClassifiedError, RateLimitError, TransportCause};
use bridge_traits::http::HttpResponse;
use serde::de::DeserializeOwned;
use tracing::error;

pub const REQUEST_ID_HEADER: &str = "X-Dropbox-Request-Id";

/// Classify a failed call. `cause` is reported when no status-based
/// classification applies.
pub fn classify_response_error<E: DeserializeOwned>(
    response: Option<&HttpResponse>,
    cause: TransportCause,
) -> ClassifiedError<E> {
    let Some(response) = response else {
        return ClassifiedError::transport(cause);
    };

    let status = response.status;
    let request_id = response.header(REQUEST_ID_HEADER).map(str::to_string);

    match status {
        500..=599 => ClassifiedError::InternalServerError {
            status,
            message: body_text(response),
            request_id,
        },
        400 => ClassifiedError::BadInput {
            message: body_text(response),
            request_id,
        },
        401 => match error_field::<AuthErrorPayload>(response) {
            Ok(error) => ClassifiedError::AuthFailed { error, request_id },
            Err(cause) => ClassifiedError::transport(cause),
        },
        403 | 404 | 409 => match error_field::<E>(response) {
            Ok(error) => ClassifiedError::RouteError { error, request_id },
            Err(cause) => ClassifiedError::transport(cause),
        },
        429 => match error_field::<RateLimitError>(response) {
            Ok(error) => ClassifiedError::RateLimited { error, request_id },
            Err(cause) => ClassifiedError::transport(cause),
        },
        200 => ClassifiedError::transport(cause),
        _ => ClassifiedError::HttpError {
            status,
            message: "HTTP error".to_string(),
            request_id,
        },
    }
}

fn body_text(response: &HttpResponse) -> String {
    String::from_utf8_lossy(&response.body).into_owned()
}

/// Decode the `error` field of a JSON error body.
fn error_field<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, TransportCause> {
    let malformed = |reason: String| {
        error!(
            status = response.status,
            request_id = ?response.header(REQUEST_ID_HEADER),
            reason = %reason,
            "Error response does not follow the wire contract"
        );
        TransportCause::MalformedBody {
            status: response.status,
            reason,
        }
    };

    let mut body: serde_json::Value = serde_json::from_slice(&response.body)
        .map_err(|e| malformed(format!("body is not JSON: {}", e)))?;

    let error = body
        .as_object_mut()
        .and_then(|object| object.remove("error"))
        .ok_or_else(|| malformed("body has no 'error' field".to_string()))?;

    serde_json::from_value(error).map_err(|e| malformed(format!("undecodable 'error' field: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RateLimitReason;
    use crate::route::Void;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(tag = ".tag", rename_all = "snake_case")]
    enum LookupError {
        NotFound,
        NotFile,
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status)
            .with_header("x-dropbox-request-id", "req-1")
            .with_body(body.to_string())
    }

    #[test]
    fn test_server_error_keeps_body_text() {
        let classified: ClassifiedError<Void> = classify_response_error(
            Some(&response(500, "boom")),
            TransportCause::UnexpectedStatus(500),
        );
        match classified {
            ClassifiedError::InternalServerError {
                status,
                message,
                request_id,
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
                assert_eq!(request_id.as_deref(), Some("req-1"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_bad_input() {
        let classified: ClassifiedError<Void> = classify_response_error(
            Some(&response(400, "Error in call to API function")),
            TransportCause::UnexpectedStatus(400),
        );
        assert!(matches!(
            classified,
            ClassifiedError::BadInput { ref message, .. } if message == "Error in call to API function"
        ));
    }

    #[test]
    fn test_route_error_is_typed() {
        let body = r#"{"error_summary": "path/not_found/..", "error": {".tag": "not_found"}}"#;
        for status in [403, 404, 409] {
            let classified: ClassifiedError<LookupError> = classify_response_error(
                Some(&response(status, body)),
                TransportCause::UnexpectedStatus(status),
            );
            match classified {
                ClassifiedError::RouteError { error, request_id } => {
                    assert_eq!(error, LookupError::NotFound);
                    assert_eq!(request_id.as_deref(), Some("req-1"));
                }
                other => panic!("unexpected classification: {:?}", other),
            }
        }
    }

    #[test]
    fn test_auth_failed() {
        let classified: ClassifiedError<Void> = classify_response_error(
            Some(&response(401, r#"{"error": {".tag": "invalid_access_token"}}"#)),
            TransportCause::UnexpectedStatus(401),
        );
        assert!(matches!(
            classified,
            ClassifiedError::AuthFailed {
                error: AuthErrorPayload::InvalidAccessToken,
                ..
            }
        ));
    }

    #[test]
    fn test_rate_limited() {
        let classified: ClassifiedError<Void> = classify_response_error(
            Some(&response(
                429,
                r#"{"error": {"reason": {".tag": "too_many_requests"}, "retry_after": 30}}"#,
            )),
            TransportCause::UnexpectedStatus(429),
        );
        match classified {
            ClassifiedError::RateLimited { error, .. } => {
                assert_eq!(error.reason, RateLimitReason::TooManyRequests);
                assert_eq!(error.retry_after, 30);
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_body_is_transport_failure() {
        for body in ["not json", r#"["error"]"#, r#"{"error_summary": "x"}"#] {
            let classified: ClassifiedError<LookupError> = classify_response_error(
                Some(&response(409, body)),
                TransportCause::UnexpectedStatus(409),
            );
            assert!(matches!(
                classified,
                ClassifiedError::TransportFailure {
                    cause: TransportCause::MalformedBody { status: 409, .. }
                }
            ));
        }
    }

    #[test]
    fn test_unknown_route_error_tag_is_malformed() {
        let classified: ClassifiedError<LookupError> = classify_response_error(
            Some(&response(409, r#"{"error": {".tag": "brand_new"}}"#)),
            TransportCause::UnexpectedStatus(409),
        );
        assert!(matches!(
            classified,
            ClassifiedError::TransportFailure {
                cause: TransportCause::MalformedBody { .. }
            }
        ));
    }

    #[test]
    fn test_ok_status_reports_underlying_cause() {
        let classified: ClassifiedError<Void> = classify_response_error(
            Some(&response(200, "")),
            TransportCause::Serialization("bad result".to_string()),
        );
        assert!(matches!(
            classified,
            ClassifiedError::TransportFailure {
                cause: TransportCause::Serialization(_)
            }
        ));
    }

    #[test]
    fn test_other_status_is_http_error() {
        let classified: ClassifiedError<Void> = classify_response_error(
            Some(&response(302, "")),
            TransportCause::UnexpectedStatus(302),
        );
        match classified {
            ClassifiedError::HttpError {
                status, message, ..
            } => {
                assert_eq!(status, 302);
                assert_eq!(message, "HTTP error");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_no_response() {
        let classified: ClassifiedError<Void> =
            classify_response_error(None, TransportCause::Cancelled);
        assert!(classified.is_cancelled());
    }
}
