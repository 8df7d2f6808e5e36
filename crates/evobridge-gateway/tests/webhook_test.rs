use std::net::TcpListener;
use std::time::Duration;

use evobridge_agents::FALLBACK_REPLY;
use evobridge_config::AppConfig;
use evobridge_gateway::GatewayServer;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: &str = "+962787499976";
const OWNER_JID: &str = "962787499976@s.whatsapp.net";

/// Pick a random available port.
fn random_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to random port");
    listener.local_addr().unwrap().port()
}

struct Harness {
    base_url: String,
    evolution: MockServer,
    llm: MockServer,
    client: reqwest::Client,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let evolution = MockServer::start().await;
        let llm = MockServer::start().await;
        let port = random_port();

        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.owner.phone_number = OWNER.to_string();
        config.evolution.base_url = evolution.uri();
        config.evolution.api_key = Some("evo-key".to_string());
        config.llm.api_key = Some("gsk-test".to_string());
        config.llm.base_url = llm.uri();
        config.llm.timeout_secs = 1;
        tweak(&mut config);

        tokio::spawn(async move {
            let server = GatewayServer::new(config);
            let _ = server.run().await;
        });

        let base_url = format!("http://127.0.0.1:{port}");
        let client = reqwest::Client::new();
        for _ in 0..100 {
            let ready = client
                .get(format!("{base_url}/"))
                .send()
                .await
                .map(|resp| resp.status().is_success())
                .unwrap_or(false);
            if ready {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Self {
            base_url,
            evolution,
            llm,
            client,
        }
    }

    async fn post_webhook(&self, body: impl Into<reqwest::Body>) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}/webhook/messages-upsert", self.base_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("webhook request");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("json response"))
    }

    async fn mock_completion(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
                "model": "llama-3.3-70b-versatile"
            })))
            .mount(&self.llm)
            .await;
    }
}

fn upsert(sender: &str, text: &str) -> String {
    json!({
        "event": "messages.upsert",
        "instance": "evolution_api",
        "data": {
            "key": {"remoteJid": sender, "fromMe": false, "id": "3EB0C0"},
            "pushName": "Owner",
            "message": {"conversation": text}
        }
    })
    .to_string()
}

#[tokio::test]
async fn owner_message_gets_sanitized_reply() {
    let h = Harness::start().await;
    h.mock_completion("<think>the user greets me</think>\n\nHello there").await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/evolution_api"))
        .and(header("apikey", "evo-key"))
        .and(body_partial_json(json!({
            "number": "962787499976",
            "text": "Hello there",
            "options": {"delay": 1000, "presence": "composing", "linkPreview": false}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "PENDING"})))
        .expect(1)
        .mount(&h.evolution)
        .await;

    let (status, body) = h.post_webhook(upsert(OWNER_JID, "hi")).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Webhook processed");
    assert_eq!(body["your_number"], OWNER);
}

#[tokio::test]
async fn stranger_message_is_ignored() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/message/sendText/evolution_api"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&h.evolution)
        .await;

    let (status, body) = h
        .post_webhook(upsert("15550001111@s.whatsapp.net", "hi"))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn malformed_json_is_acknowledged_with_error_status() {
    let h = Harness::start().await;

    let (status, body) = h.post_webhook("{\"event\": ").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Invalid JSON");
}

#[tokio::test]
async fn provider_timeout_sends_fallback_text() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [], "model": "m"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&h.llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/message/sendText/evolution_api"))
        .and(body_partial_json(json!({"text": FALLBACK_REPLY})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "PENDING"})))
        .expect(1)
        .mount(&h.evolution)
        .await;

    let (status, body) = h.post_webhook(upsert(OWNER_JID, "hi")).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn gateway_error_on_send_still_reports_success() {
    let h = Harness::start().await;
    h.mock_completion("Hi!").await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/evolution_api"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&h.evolution)
        .await;

    let (status, body) = h.post_webhook(upsert(OWNER_JID, "hi")).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn legacy_send_format_nests_text() {
    let h = Harness::start_with(|c| {
        c.evolution.send_format = evobridge_config::SendFormat::Legacy;
    })
    .await;
    h.mock_completion("Hi!").await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/evolution_api"))
        .and(body_partial_json(json!({"textMessage": {"text": "Hi!"}})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&h.evolution)
        .await;

    let (_, body) = h.post_webhook(upsert(OWNER_JID, "hi")).await;
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn health_reports_connection_state() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/instance/connectionState/evolution_api"))
        .and(header("apikey", "evo-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instance": {"instanceName": "evolution_api", "state": "open"}
        })))
        .mount(&h.evolution)
        .await;

    let body: Value = h
        .client
        .get(format!("{}/health", h.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["bot"], "running");
    assert_eq!(body["your_number"], OWNER);
    assert_eq!(body["evolution_api"]["connected"], true);
    assert_eq!(body["evolution_api"]["state"], "open");
}

#[tokio::test]
async fn health_degrades_when_gateway_unreachable() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/instance/connectionState/evolution_api"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.evolution)
        .await;

    let resp = h
        .client
        .get(format!("{}/health", h.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["status"], "partially_healthy");
    assert_eq!(body["evolution_api"]["connected"], false);
}

#[tokio::test]
async fn send_endpoint_forwards_to_gateway() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/evolution_api"))
        .and(body_partial_json(json!({"number": "15550001111", "text": "ping"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "PENDING"})))
        .expect(1)
        .mount(&h.evolution)
        .await;

    let resp = h
        .client
        .post(format!(
            "{}/messages/send?number=%2B15550001111&message=ping",
            h.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["response"]["status"], "PENDING");
}

#[tokio::test]
async fn test_message_failure_is_a_server_error() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/message/sendText/evolution_api"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&h.evolution)
        .await;

    let resp = h
        .client
        .post(format!("{}/messages/test", h.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn header_variants_report_which_one_the_gateway_accepts() {
    let h = Harness::start_with(|c| c.server.debug_routes = true).await;

    Mock::given(method("GET"))
        .and(path("/instance/fetchInstances"))
        .and(header("authorization", "Bearer evo-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&h.evolution)
        .await;
    Mock::given(method("GET"))
        .and(path("/instance/fetchInstances"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
        .mount(&h.evolution)
        .await;

    let body: Value = h
        .client
        .get(format!("{}/debug/test-headers", h.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let tests = body["tests"].as_array().unwrap();
    assert_eq!(tests.len(), 5);
    assert_eq!(tests[0]["header_name"], "apikey");
    assert_eq!(tests[0]["status_code"], 401);
    assert_eq!(tests[0]["success"], false);
    assert_eq!(tests[4]["header_name"], "Authorization");
    assert_eq!(tests[4]["success"], true);
    assert_eq!(tests[4]["response"], "Success!");
}
