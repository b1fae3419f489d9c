//! Budget delete/undo endpoints.
//!
//! - `DELETE /budgets/api/delete/{id}/` with `{budget_id, confirmation, audit_data}`
//! - `POST /budgets/api/undo-delete/` with `{undo_data}`
//!
//! Both answer `{success, error?}`; the server owns the exact field set, so
//! `undo_data` is carried as opaque JSON.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;
use wallai_core::Error;

const DELETE_FALLBACK_ERROR: &str = "Error desconocido al eliminar el presupuesto";
const UNDO_FALLBACK_ERROR: &str = "Error al restaurar el presupuesto";

/// Audit trail attached to every deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditData {
    pub ip: String,
    /// RFC 3339 client timestamp.
    pub timestamp: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub budget_id: u64,
    pub confirmation: String,
    pub audit_data: AuditData,
}

/// Totals recomputed by the server after a deletion.
///
/// Amounts may arrive as numbers or as decimal strings (`"120.50"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatedTotals {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_budgeted: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub remaining: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub spent_percentage: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

/// Number, numeric string, or null. Unparseable strings read as absent.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Amount>::deserialize(deserializer)? {
        Some(Amount::Number(n)) => Some(n),
        Some(Amount::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        None => None,
    })
}

/// Successful deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct Deleted {
    pub undo_data: Value,
    pub updated_totals: Option<UpdatedTotals>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    undo_data: Option<Value>,
    #[serde(default)]
    updated_totals: Option<Value>,
}

/// Server error message: a string `error`, or `error.message` when structured.
fn error_message(error: Option<&Value>) -> Option<String> {
    match error? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn status_message(status: StatusCode) -> String {
    format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or_default())
}

/// Interpret a delete response. Non-2xx prefers the body's error message.
pub fn parse_delete_response(status: StatusCode, body: &[u8]) -> Result<Deleted, Error> {
    let envelope: Option<ApiEnvelope> = serde_json::from_slice(body).ok();

    if !status.is_success() {
        let message = envelope
            .as_ref()
            .and_then(|e| error_message(e.error.as_ref()))
            .unwrap_or_else(|| status_message(status));
        return Err(Error::HttpError(message));
    }

    let envelope = envelope.ok_or_else(|| Error::Parse("delete response is not JSON".into()))?;
    if !envelope.success {
        let message = error_message(envelope.error.as_ref()).unwrap_or_else(|| DELETE_FALLBACK_ERROR.into());
        return Err(Error::HttpError(message));
    }

    let updated_totals = envelope.updated_totals.filter(|v| !v.is_null()).and_then(|v| {
        serde_json::from_value::<UpdatedTotals>(v)
            .map_err(|e| tracing::warn!(error = %e, "ignoring malformed updated_totals"))
            .ok()
    });
    Ok(Deleted { undo_data: envelope.undo_data.unwrap_or(Value::Null), updated_totals })
}

/// Interpret an undo response. Non-2xx reports only the status.
pub fn parse_undo_response(status: StatusCode, body: &[u8]) -> Result<(), Error> {
    if !status.is_success() {
        return Err(Error::HttpError(status_message(status)));
    }

    let envelope: ApiEnvelope = serde_json::from_slice(body)?;
    if !envelope.success {
        let message = error_message(envelope.error.as_ref()).unwrap_or_else(|| UNDO_FALLBACK_ERROR.into());
        return Err(Error::HttpError(message));
    }
    Ok(())
}

/// Server operations used by the delete flow.
#[async_trait]
pub trait BudgetApi: Send + Sync {
    async fn delete_budget(&self, request: &DeleteRequest) -> Result<Deleted, Error>;

    async fn undo_delete(&self, undo_data: &Value) -> Result<(), Error>;

    /// Best-effort public IP for the audit trail.
    async fn client_ip(&self) -> String;
}

/// reqwest-backed [`BudgetApi`].
#[derive(Debug, Clone)]
pub struct HttpBudgetApi {
    http: Client,
    origin: Url,
    csrf_token: Option<String>,
    ip_lookup_url: String,
}

#[derive(Debug, Deserialize)]
struct IpLookup {
    ip: String,
}

impl HttpBudgetApi {
    pub fn new(http: Client, origin: Url, csrf_token: Option<String>, ip_lookup_url: impl Into<String>) -> Self {
        Self { http, origin, csrf_token, ip_lookup_url: ip_lookup_url.into() }
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.origin
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    fn csrf(&self) -> Result<&str, Error> {
        self.csrf_token.as_deref().ok_or(Error::CsrfMissing)
    }
}

#[async_trait]
impl BudgetApi for HttpBudgetApi {
    async fn delete_budget(&self, request: &DeleteRequest) -> Result<Deleted, Error> {
        let csrf = self.csrf()?;
        let url = self.endpoint(&format!("/budgets/api/delete/{}/", request.budget_id))?;

        let response = self
            .http
            .delete(url)
            .header("X-CSRFToken", csrf)
            .header("X-Requested-With", "XMLHttpRequest")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;
        parse_delete_response(status, &body)
    }

    async fn undo_delete(&self, undo_data: &Value) -> Result<(), Error> {
        let csrf = self.csrf()?;
        let url = self.endpoint("/budgets/api/undo-delete/")?;

        let response = self
            .http
            .post(url)
            .header("X-CSRFToken", csrf)
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&serde_json::json!({ "undo_data": undo_data }))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;
        parse_undo_response(status, &body)
    }

    async fn client_ip(&self) -> String {
        let lookup = async {
            self.http
                .get(&self.ip_lookup_url)
                .send()
                .await?
                .json::<IpLookup>()
                .await
        };
        match lookup.await {
            Ok(found) => found.ip,
            Err(e) => {
                tracing::debug!(error = %e, "client IP lookup failed");
                "Unknown".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_request_shape() {
        let req = DeleteRequest {
            budget_id: 7,
            confirmation: "ELIMINAR".into(),
            audit_data: AuditData {
                ip: "203.0.113.9".into(),
                timestamp: "2026-01-01T00:00:00+00:00".into(),
                user_agent: "wallai-sw/0.1".into(),
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["budget_id"], 7);
        assert_eq!(json["confirmation"], "ELIMINAR");
        assert_eq!(json["audit_data"]["ip"], "203.0.113.9");
        assert!(json["audit_data"].get("user_agent").is_some());
    }

    #[test]
    fn test_parse_delete_success() {
        let body = br#"{"success":true,"undo_data":{"token":"abc"},"updated_totals":{"total_budgeted":120.5,"remaining":20,"spent_percentage":83}}"#;
        let deleted = parse_delete_response(StatusCode::OK, body).unwrap();
        assert_eq!(deleted.undo_data["token"], "abc");
        let totals = deleted.updated_totals.unwrap();
        assert_eq!(totals.total_budgeted, Some(120.5));
        assert_eq!(totals.spent_percentage, Some(83.0));
    }

    #[test]
    fn test_parse_delete_decimal_string_totals() {
        let body = br#"{"success":true,"undo_data":{"token":"abc"},"updated_totals":{"total_budgeted":"120.50","remaining":"20.00","spent_percentage":83.4}}"#;
        let deleted = parse_delete_response(StatusCode::OK, body).unwrap();
        assert_eq!(deleted.undo_data["token"], "abc");
        let totals = deleted.updated_totals.unwrap();
        assert_eq!(totals.total_budgeted, Some(120.5));
        assert_eq!(totals.remaining, Some(20.0));
        assert_eq!(totals.spent_percentage, Some(83.4));
    }

    #[test]
    fn test_parse_delete_unreadable_totals_keep_deletion() {
        let body = br#"{"success":true,"undo_data":{"token":"abc"},"updated_totals":{"total_budgeted":"n/a","remaining":null,"spent_percentage":[1]}}"#;
        let deleted = parse_delete_response(StatusCode::OK, body).unwrap();
        assert_eq!(deleted.undo_data["token"], "abc");
        assert!(deleted.updated_totals.is_none());

        let body = br#"{"success":true,"undo_data":1,"updated_totals":{"total_budgeted":"n/a","remaining":null}}"#;
        let totals = parse_delete_response(StatusCode::OK, body).unwrap().updated_totals.unwrap();
        assert_eq!(totals, UpdatedTotals::default());
    }

    #[test]
    fn test_parse_delete_success_without_totals() {
        let deleted = parse_delete_response(StatusCode::OK, br#"{"success":true,"undo_data":1}"#).unwrap();
        assert!(deleted.updated_totals.is_none());
    }

    #[test]
    fn test_parse_delete_http_error_uses_body_message() {
        let err = parse_delete_response(StatusCode::FORBIDDEN, br#"{"success":false,"error":"Sin permisos"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP_ERROR: Sin permisos");
    }

    #[test]
    fn test_parse_delete_http_error_without_body() {
        let err = parse_delete_response(StatusCode::INTERNAL_SERVER_ERROR, b"<html>").unwrap_err();
        assert_eq!(err.to_string(), "HTTP_ERROR: HTTP 500: Internal Server Error");
    }

    #[test]
    fn test_parse_delete_success_false() {
        let err = parse_delete_response(StatusCode::OK, br#"{"success":false}"#).unwrap_err();
        assert!(err.to_string().contains(DELETE_FALLBACK_ERROR));

        let err = parse_delete_response(
            StatusCode::OK,
            br#"{"success":false,"error":{"message":"Presupuesto bloqueado","code":"LOCKED"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Presupuesto bloqueado"));
    }

    #[test]
    fn test_parse_undo() {
        assert!(parse_undo_response(StatusCode::OK, br#"{"success":true}"#).is_ok());

        let err = parse_undo_response(StatusCode::OK, br#"{"success":false}"#).unwrap_err();
        assert!(err.to_string().contains(UNDO_FALLBACK_ERROR));

        let err = parse_undo_response(StatusCode::GONE, br#"{"error":"expired"}"#).unwrap_err();
        assert_eq!(err.to_string(), "HTTP_ERROR: HTTP 410: Gone");
    }

    #[test]
    fn test_parse_delete_success_status_with_non_json_body() {
        let err = parse_delete_response(StatusCode::OK, b"<html>login</html>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    fn unreachable_api(csrf_token: Option<String>) -> HttpBudgetApi {
        let http = Client::builder().timeout(std::time::Duration::from_secs(2)).build().unwrap();
        HttpBudgetApi::new(http, Url::parse("http://127.0.0.1:9").unwrap(), csrf_token, "http://127.0.0.1:9/ip")
    }

    #[tokio::test]
    async fn test_delete_without_csrf_fails_before_sending() {
        let request = DeleteRequest {
            budget_id: 3,
            confirmation: "ELIMINAR".into(),
            audit_data: AuditData { ip: "Unknown".into(), timestamp: String::new(), user_agent: String::new() },
        };
        let err = unreachable_api(None).delete_budget(&request).await.unwrap_err();
        assert!(matches!(err, Error::CsrfMissing));
    }

    #[tokio::test]
    async fn test_client_ip_falls_back_to_unknown() {
        assert_eq!(unreachable_api(Some("t".into())).client_ip().await, "Unknown");
    }

    #[tokio::test]
    async fn test_undo_without_csrf_fails_before_sending() {
        let err = unreachable_api(None).undo_delete(&Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::CsrfMissing));
    }
}
