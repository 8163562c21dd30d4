//! Integration tests for the Telegram client
//!
//! Verifies endpoint paths, payload shape and error reporting, including
//! that the bot token never leaks into error messages.

use market_digest::error::DeliveryError;
use market_digest::telegram::{Messenger, ParseMode, TelegramClient};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123456:secret-token";

fn client(uri: &str) -> TelegramClient {
    TelegramClient::new(TOKEN, "-1001", uri, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_send_markdown_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_json(json!({
            "chat_id": "-1001",
            "text": "*hello*",
            "parse_mode": "Markdown",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server.uri())
        .send_message("*hello*", ParseMode::Markdown)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_plain_message_omits_parse_mode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_json(json!({
            "chat_id": "-1001",
            "text": "plain",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server.uri())
        .send_message("plain", ParseMode::Plain)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_photo() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendPhoto")))
        .and(body_json(json!({
            "chat_id": "-1001",
            "photo": "https://x/chart.png",
            "caption": "📊 Market Chart 1",
            "parse_mode": "Markdown"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server.uri())
        .send_photo("https://x/chart.png", "📊 Market Chart 1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_error_carries_description() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities"
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .send_message("*broken", ParseMode::Markdown)
        .await
        .unwrap_err();

    match err {
        DeliveryError::Api {
            status,
            description,
        } => {
            assert_eq!(status, 400);
            assert!(description.contains("can't parse entities"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_ok_false_is_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendPhoto")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "description": "wrong file identifier"})),
        )
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .send_photo("https://x/missing.png", "caption")
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Api { status: 200, .. }));
}

#[tokio::test]
async fn test_network_error_does_not_leak_token() {
    let err = client("http://127.0.0.1:9")
        .send_message("hi", ParseMode::Plain)
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::RequestFailed(_)));
    assert!(!err.to_string().contains("secret-token"));
}
