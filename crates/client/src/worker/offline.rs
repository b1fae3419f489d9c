//! Synthetic response served when an API request has neither network nor cache.

use serde::Serialize;
use wallai_core::{Error, Response};

pub const OFFLINE_MESSAGE: &str = "No internet connection";
pub const OFFLINE_STATUS: u16 = 503;

#[derive(Debug, Serialize)]
struct OfflineBody {
    success: bool,
    error: OfflineDetail,
}

#[derive(Debug, Serialize)]
struct OfflineDetail {
    message: &'static str,
    code: &'static str,
}

/// Build the structured offline error:
/// `{"success":false,"error":{"message":"No internet connection","code":"OFFLINE_ERROR"}}`, status 503.
pub fn offline_response() -> Result<Response, Error> {
    let cause = Error::Offline(OFFLINE_MESSAGE.into());
    let body = OfflineBody { success: false, error: OfflineDetail { message: OFFLINE_MESSAGE, code: cause.code() } };
    Response::json(OFFLINE_STATUS, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_response_shape() {
        let resp = offline_response().unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.status_text, "Service Unavailable");
        assert_eq!(resp.header("Content-Type"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["error"]["code"], Error::Offline(String::new()).code());
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": { "message": "No internet connection", "code": "OFFLINE_ERROR" }
            })
        );
    }

    #[test]
    fn test_offline_body_field_order() {
        let resp = offline_response().unwrap();
        assert_eq!(
            resp.text(),
            r#"{"success":false,"error":{"message":"No internet connection","code":"OFFLINE_ERROR"}}"#
        );
    }
}
