use tracing::{debug, info};

use crate::errors::{BackendError, MonitorError};

use super::config::OrderClientConfig;

const CREATE_ORDER_ENDPOINT: &str = "createOrder";

/// Submits orders to the order service.
pub struct OrderClient {
    client: reqwest::Client,
    config: OrderClientConfig,
}

impl OrderClient {
    pub fn new(config: OrderClientConfig) -> Result<Self, MonitorError> {
        if config.api_key.trim().is_empty() {
            return Err(MonitorError::Config("order client api_key must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to build order client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, MonitorError> {
        Self::new(OrderClientConfig::from_env()?)
    }

    /// Creates an order and returns its id.
    pub async fn create_order(&self, order: &serde_json::Value) -> Result<String, BackendError> {
        debug!(url = %self.config.create_order_url(), "submitting order");
        let response = self
            .client
            .post(self.config.create_order_url())
            .header("X-Api-Key", &self.config.api_key)
            .json(order)
            .send()
            .await
            .map_err(|e| {
                BackendError::transport(CREATE_ORDER_ENDPOINT, format!("order request failed: {e}"))
            })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            BackendError::transport(CREATE_ORDER_ENDPOINT, format!("order response unreadable: {e}"))
        })?;
        let order_id = parse_order_response(status.as_u16(), &text)?;
        info!(order_id = %order_id, "order created");
        Ok(order_id)
    }
}

/// Prompt that starts the pipeline for an order.
pub fn order_prompt(order_id: &str) -> String {
    format!("Order ID: {order_id}")
}

pub(crate) fn parse_order_response(status: u16, body: &str) -> Result<String, BackendError> {
    let value: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error_message = value.as_ref().and_then(|v| {
        ["error", "message"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            .map(ToOwned::to_owned)
    });

    if !(200..300).contains(&status) {
        let message = error_message.unwrap_or_else(|| format!("status {status}: {body}"));
        return Err(BackendError::http(CREATE_ORDER_ENDPOINT, message, Some(status)));
    }

    let Some(value) = value else {
        return Err(BackendError::protocol(
            CREATE_ORDER_ENDPOINT,
            "order response is not JSON",
        ));
    };
    let order_id = ["orderId", "id"].iter().find_map(|key| match value.get(*key) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });
    match (order_id, error_message) {
        (Some(id), _) => Ok(id),
        (None, Some(message)) => Err(BackendError::http(CREATE_ORDER_ENDPOINT, message, Some(status))),
        (None, None) => Err(BackendError::protocol(
            CREATE_ORDER_ENDPOINT,
            "order response has no orderId",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_order_id_or_id() {
        assert_eq!(parse_order_response(200, r#"{"orderId":"ord_1"}"#), Ok("ord_1".into()));
        assert_eq!(parse_order_response(201, r#"{"id":77}"#), Ok("77".into()));
    }

    #[test]
    fn error_field_becomes_message() {
        let err = parse_order_response(400, r#"{"error":"missing customer email"}"#)
            .expect_err("should fail");
        assert_eq!(err.message(), "missing customer email");
        assert!(matches!(err, BackendError::Http { status_code: Some(400), .. }));

        let err = parse_order_response(200, r#"{"message":"quota exceeded"}"#).expect_err("fail");
        assert_eq!(err.message(), "quota exceeded");
    }

    #[test]
    fn non_json_failure_keeps_body() {
        let err = parse_order_response(502, "Bad Gateway").expect_err("should fail");
        assert!(err.message().contains("502"));
        assert!(err.message().contains("Bad Gateway"));
    }

    #[test]
    fn success_without_id_is_protocol_error() {
        assert!(matches!(
            parse_order_response(200, "{}"),
            Err(BackendError::Protocol { .. })
        ));
    }

    #[test]
    fn prompt_names_the_order() {
        assert_eq!(order_prompt("ord_1"), "Order ID: ord_1");
    }

    #[test]
    fn url_and_empty_key() {
        let config = OrderClientConfig::new("https://orders.example/", "k");
        assert_eq!(config.create_order_url(), "https://orders.example/createOrder");
        assert!(OrderClient::new(OrderClientConfig::new("https://orders.example", " ")).is_err());
    }
}
