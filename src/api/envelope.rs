//! Response envelope decoding.
//!
//! The backend wraps payloads as `{success, data, message}`. Each endpoint
//! names the payload type it expects and decoding fails with
//! [`ApiError::Contract`] when the shape drifts. A missing list is an error,
//! never an empty list.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use super::error::ApiError;
use super::transport::ApiResponse;

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

/// Just the `message`, for reading error bodies of any shape.
#[derive(Deserialize)]
struct MessageOnly {
    #[serde(default)]
    message: Option<String>,
}

/// Acknowledgement of a mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub message: String,
}

/// The `message` field of any JSON body, empty when absent.
pub fn server_message(body: &str) -> String {
    serde_json::from_str::<MessageOnly>(body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_default()
}

/// Map a non-2xx status onto the error taxonomy.
pub fn check_status(endpoint: &'static str, response: &ApiResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }

    let message = server_message(&response.body);
    tracing::warn!(endpoint, status = response.status, %message, "Request failed");
    Err(match response.status {
        401 => ApiError::Unauthorized,
        403 => ApiError::Forbidden(message),
        404 => ApiError::NotFound(message),
        status => ApiError::Server { status, message },
    })
}

fn parse<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<Envelope<T>, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Contract {
        endpoint,
        detail: e.to_string(),
    })
}

/// Decode `{success: true, data: T}`.
pub fn decode_data<T: DeserializeOwned>(endpoint: &'static str, response: &ApiResponse) -> Result<T, ApiError> {
    check_status(endpoint, response)?;
    let envelope: Envelope<T> = parse(endpoint, &response.body)?;

    if !envelope.success {
        return Err(ApiError::Rejected(envelope.message.unwrap_or_default()));
    }
    envelope.data.ok_or_else(|| ApiError::Contract {
        endpoint,
        detail: "missing data".into(),
    })
}

/// Decode `{success: true, message}`; any `data` is ignored.
pub fn decode_ack(endpoint: &'static str, response: &ApiResponse) -> Result<Ack, ApiError> {
    check_status(endpoint, response)?;
    let envelope: Envelope<IgnoredAny> = parse(endpoint, &response.body)?;

    if !envelope.success {
        return Err(ApiError::Rejected(envelope.message.unwrap_or_default()));
    }
    Ok(Ack {
        message: envelope.message.unwrap_or_default(),
    })
}

/// Decode a bare JSON body (endpoints that don't use the envelope).
pub fn decode_plain<T: DeserializeOwned>(endpoint: &'static str, response: &ApiResponse) -> Result<T, ApiError> {
    check_status(endpoint, response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Contract {
        endpoint,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: serde_json::Value) -> ApiResponse {
        ApiResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn decodes_data() {
        let r = response(200, json!({"success": true, "data": [1, 2, 3]}));
        let data: Vec<u32> = decode_data("test", &r).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn missing_data_is_contract_error() {
        let r = response(200, json!({"success": true}));
        let err = decode_data::<Vec<u32>>("test", &r).unwrap_err();
        assert!(matches!(err, ApiError::Contract { endpoint: "test", .. }));
    }

    #[test]
    fn wrong_shape_is_contract_error() {
        // bare array where an envelope is expected
        let r = response(200, json!([1, 2, 3]));
        assert!(matches!(
            decode_data::<Vec<u32>>("test", &r),
            Err(ApiError::Contract { .. })
        ));

        let r = response(200, json!({"success": true, "data": {"patients": "nope"}}));
        assert!(matches!(
            decode_data::<Vec<u32>>("test", &r),
            Err(ApiError::Contract { .. })
        ));
    }

    #[test]
    fn success_false_is_rejected() {
        let r = response(200, json!({"success": false, "message": "Reason required"}));
        match decode_ack("test", &r) {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Reason required"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        let msg = json!({"success": false, "message": "Medication not found"});
        assert!(matches!(
            decode_ack("t", &response(401, json!({}))),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            decode_ack("t", &response(403, msg.clone())),
            Err(ApiError::Forbidden(_))
        ));
        match decode_ack("t", &response(404, msg)) {
            Err(ApiError::NotFound(m)) => assert_eq!(m, "Medication not found"),
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(matches!(
            decode_ack("t", &ApiResponse { status: 502, body: "<html>".into() }),
            Err(ApiError::Server { status: 502, .. })
        ));
    }

    #[test]
    fn ack_ignores_payload() {
        let r = response(200, json!({"success": true, "message": "Medication marked as taken", "data": {"_id": "1"}}));
        assert_eq!(decode_ack("t", &r).unwrap().message, "Medication marked as taken");
    }
}
