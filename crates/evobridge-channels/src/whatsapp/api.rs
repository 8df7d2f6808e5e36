use std::time::Duration;

use evobridge_config::{EvolutionConfig, SendFormat};
use evobridge_security::normalize_phone;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Events the bot subscribes to when registering its webhook.
pub const WEBHOOK_EVENTS: [&str; 4] = [
    "APPLICATION_STARTUP",
    "MESSAGES_UPSERT",
    "CONNECTION_UPDATE",
    "QRCODE_UPDATED",
];

/// Failure talking to the Evolution API.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("evolution API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("evolution request failed: {0}")]
    Transport(String),
}

impl DispatchError {
    /// HTTP status returned by the gateway, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            DispatchError::Transport(_) => None,
        }
    }
}

impl From<DispatchError> for evobridge_common::Error {
    fn from(e: DispatchError) -> Self {
        evobridge_common::Error::Channel(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOptions {
    pub delay: u64,
    pub presence: String,
    #[serde(rename = "linkPreview")]
    pub link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            delay: 1000,
            presence: "composing".to_string(),
            link_preview: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMessage {
    pub text: String,
}

/// Body of `POST /message/sendText/{instance}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "textMessage", skip_serializing_if = "Option::is_none")]
    pub text_message: Option<TextMessage>,
    pub options: SendOptions,
}

impl OutboundMessage {
    pub fn new(to: &str, text: &str, format: SendFormat) -> Self {
        let (text, text_message) = match format {
            SendFormat::Text => (Some(text.to_string()), None),
            SendFormat::Legacy => (
                None,
                Some(TextMessage {
                    text: text.to_string(),
                }),
            ),
        };
        Self {
            number: normalize_phone(to),
            text,
            text_message,
            options: SendOptions::default(),
        }
    }
}

/// Raw status and body from a diagnostic call, whatever the status code.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub url: String,
    pub status: u16,
    pub body: serde_json::Value,
}

impl GatewayReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for one Evolution API instance.
#[derive(Clone)]
pub struct EvolutionClient {
    client: Client,
    base_url: String,
    api_key: String,
    instance: String,
    send_format: SendFormat,
}

impl EvolutionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        instance: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        Self::build(base_url.into(), api_key.into(), instance.into(), true)
    }

    pub fn from_config(config: &EvolutionConfig) -> Result<Self, DispatchError> {
        let client = Self::build(
            config.base_url.clone(),
            config.api_key.clone().unwrap_or_default(),
            config.instance_name.clone(),
            config.ssl_verify,
        )?;
        Ok(client.with_send_format(config.send_format))
    }

    fn build(
        base_url: String,
        api_key: String,
        instance: String,
        ssl_verify: bool,
    ) -> Result<Self, DispatchError> {
        if !ssl_verify {
            warn!("whatsapp: TLS certificate verification is disabled for the Evolution API");
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(!ssl_verify)
            .build()
            .map_err(|e| DispatchError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            instance,
            send_format: SendFormat::default(),
        })
    }

    pub fn with_send_format(mut self, format: SendFormat) -> Self {
        self.send_format = format;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .timeout(timeout)
    }

    /// Send a text message. `to` may be a bare number or a JID.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<serde_json::Value, DispatchError> {
        let url = self.url(&format!("/message/sendText/{}", self.instance));
        let msg = OutboundMessage::new(to, text, self.send_format);

        info!(
            "whatsapp: sending {} chars to {}",
            text.chars().count(),
            msg.number
        );

        let resp = self
            .request(Method::POST, &url, SEND_TIMEOUT)
            .json(&msg)
            .send()
            .await
            .map_err(|e| {
                error!("whatsapp: failed to send message: {e}");
                DispatchError::Transport(e.to_string())
            })?;

        let result = expect_success(resp).await;
        match &result {
            Ok(_) => info!("whatsapp: message sent successfully"),
            Err(e) => error!("whatsapp: failed to send message: {e}"),
        }
        result
    }

    /// `GET /instance/connectionState/{instance}`, failing on non-2xx.
    pub async fn connection_state(&self) -> Result<serde_json::Value, DispatchError> {
        let url = self.url(&format!("/instance/connectionState/{}", self.instance));
        let resp = self.send_status_request(Method::GET, &url).await?;
        expect_success(resp).await
    }

    /// Same call as [`connection_state`](Self::connection_state) but reports
    /// any status code instead of failing.
    pub async fn probe_connection_state(&self) -> Result<GatewayReply, DispatchError> {
        let url = self.url(&format!("/instance/connectionState/{}", self.instance));
        self.probe(&url).await
    }

    /// `GET /instance/fetchInstances`; useful for checking the API key.
    pub async fn fetch_instances(&self) -> Result<GatewayReply, DispatchError> {
        let url = self.url("/instance/fetchInstances");
        self.probe(&url).await
    }

    /// Point the instance's webhook at `webhook_url`.
    pub async fn set_webhook(
        &self,
        webhook_url: &str,
        events: &[&str],
    ) -> Result<serde_json::Value, DispatchError> {
        let url = self.url(&format!("/webhook/set/{}", self.instance));
        let payload = serde_json::json!({
            "url": webhook_url,
            "webhook_by_events": true,
            "webhook_base64": false,
            "events": events,
        });

        info!("whatsapp: registering webhook {webhook_url} on {}", self.instance);
        let resp = self
            .request(Method::POST, &url, STATUS_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        expect_success(resp).await
    }

    pub async fn find_webhook(&self) -> Result<serde_json::Value, DispatchError> {
        let url = self.url(&format!("/webhook/find/{}", self.instance));
        let resp = self.send_status_request(Method::GET, &url).await?;
        expect_success(resp).await
    }

    pub async fn delete_webhook(&self) -> Result<serde_json::Value, DispatchError> {
        let url = self.url(&format!("/webhook/delete/{}", self.instance));
        let resp = self.send_status_request(Method::DELETE, &url).await?;
        expect_success(resp).await
    }

    async fn send_status_request(&self, method: Method, url: &str) -> Result<Response, DispatchError> {
        self.request(method, url, STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }

    /// `GET /instance/fetchInstances` authenticated through `header_name`
    /// instead of the usual `apikey` header.
    pub async fn fetch_instances_with_header(
        &self,
        header_name: &str,
        header_value: &str,
    ) -> Result<GatewayReply, DispatchError> {
        let url = self.url("/instance/fetchInstances");
        let resp = self
            .client
            .get(&url)
            .header(header_name, header_value)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(into_reply(&url, resp).await)
    }

    async fn probe(&self, url: &str) -> Result<GatewayReply, DispatchError> {
        let resp = self.send_status_request(Method::GET, url).await?;
        Ok(into_reply(url, resp).await)
    }
}

async fn into_reply(url: &str, resp: Response) -> GatewayReply {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    GatewayReply {
        url: url.to_string(),
        status,
        body: parse_body(&text),
    }
}

async fn expect_success(resp: Response) -> Result<serde_json::Value, DispatchError> {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(DispatchError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(parse_body(&text))
}

/// JSON if the body parses, otherwise the raw text.
fn parse_body(text: &str) -> serde_json::Value {
    if text.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> EvolutionClient {
        EvolutionClient::new(format!("{}/", server.uri()), "evo-key", "evolution_api")
            .expect("client builds")
    }

    #[test]
    fn outbound_message_uses_top_level_text() {
        let msg = OutboundMessage::new("+962787499976@s.whatsapp.net", "hi", SendFormat::Text);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "number": "962787499976",
                "text": "hi",
                "options": {"delay": 1000, "presence": "composing", "linkPreview": false}
            })
        );
    }

    #[test]
    fn legacy_format_nests_text_message() {
        let msg = OutboundMessage::new("962787499976", "hi", SendFormat::Legacy);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["textMessage"]["text"], "hi");
        assert!(value.get("text").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = EvolutionClient::new("https://evo.example.com/", "k", "bot").unwrap();
        assert_eq!(client.base_url(), "https://evo.example.com");
        assert_eq!(
            client.url("/message/sendText/bot"),
            "https://evo.example.com/message/sendText/bot"
        );
    }

    #[test]
    fn parse_body_falls_back_to_text() {
        assert_eq!(parse_body(""), serde_json::Value::Null);
        assert_eq!(parse_body("{\"ok\":true}"), json!({"ok": true}));
        assert_eq!(parse_body("plain"), json!("plain"));
    }

    #[tokio::test]
    async fn send_text_posts_normalized_number_with_apikey() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendText/evolution_api"))
            .and(header("apikey", "evo-key"))
            .and(body_json(json!({
                "number": "962787499976",
                "text": "Hello there",
                "options": {"delay": 1000, "presence": "composing", "linkPreview": false}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "key": {"id": "BAE5"}, "status": "PENDING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .send_text("962787499976@s.whatsapp.net", "Hello there")
            .await
            .expect("send succeeds");
        assert_eq!(result["status"], "PENDING");
    }

    #[tokio::test]
    async fn send_text_reports_status_and_body_on_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendText/evolution_api"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).send_text("1", "x").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        match err {
            DispatchError::Status { body, .. } => assert_eq!(body, "boom"),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_text_transport_error_has_no_status() {
        // Nothing listens on port 9 of localhost.
        let client = EvolutionClient::new("http://127.0.0.1:9", "k", "i").unwrap();
        let err = client.send_text("1", "x").await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn set_webhook_sends_registration_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/webhook/set/evolution_api"))
            .and(header("apikey", "evo-key"))
            .and(body_json(json!({
                "url": "http://bot:8000/webhook",
                "webhook_by_events": true,
                "webhook_base64": false,
                "events": WEBHOOK_EVENTS,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"enabled": true})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .set_webhook("http://bot:8000/webhook", &WEBHOOK_EVENTS)
            .await
            .expect("registration succeeds");
        assert_eq!(result["enabled"], true);
    }

    #[tokio::test]
    async fn delete_webhook_uses_delete_method() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/webhook/delete/evolution_api"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).delete_webhook().await.expect("delete succeeds");
        assert_eq!(result, serde_json::Value::Null);
    }

    #[tokio::test]
    async fn fetch_instances_with_header_uses_only_that_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instance/fetchInstances"))
            .and(header("authorization", "Bearer evo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server)
            .fetch_instances_with_header("Authorization", "Bearer evo-key")
            .await
            .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.body, json!([]));

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("apikey"));
    }

    #[tokio::test]
    async fn probe_reports_non_success_without_failing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instance/fetchInstances"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
            .mount(&server)
            .await;

        let reply = client(&server).fetch_instances().await.expect("transport ok");
        assert_eq!(reply.status, 401);
        assert!(!reply.is_success());
        assert_eq!(reply.body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn connection_state_fails_on_non_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instance/connectionState/evolution_api"))
            .respond_with(ResponseTemplate::new(404).set_body_string("instance not found"))
            .mount(&server)
            .await;

        let err = client(&server).connection_state().await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
