use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::NotifyError;

/// Outbound channel for a rendered payload.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, payload: &serde_json::Value) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

/// Lark answers 200 even for rejected messages and reports the failure in
/// `code` (older bots use `StatusCode`).
#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(alias = "StatusCode")]
    code: Option<i64>,
    #[serde(alias = "StatusMessage")]
    msg: Option<String>,
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        if let Ok(reply) = serde_json::from_str::<WebhookResponse>(&text) {
            if let Some(code) = reply.code.filter(|code| *code != 0) {
                return Err(NotifyError::Rejected {
                    code,
                    message: reply.msg.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves one request with the given status line and body, then closes.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/open-apis/bot/v2/hook/test")
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + length
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5)).unwrap()
    }

    fn payload() -> serde_json::Value {
        json!({"msg_type": "text", "content": {"text": "hello"}})
    }

    #[tokio::test]
    async fn zero_code_is_success() {
        let url = serve_once("200 OK", r#"{"code":0,"msg":"success"}"#).await;
        transport().post_json(&url, &payload()).await.unwrap();
    }

    #[tokio::test]
    async fn non_json_success_body_is_accepted() {
        let url = serve_once("200 OK", "ok").await;
        transport().post_json(&url, &payload()).await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_code_is_rejected() {
        let url = serve_once("200 OK", r#"{"code":19021,"msg":"sign match fail"}"#).await;
        let err = transport().post_json(&url, &payload()).await.unwrap_err();
        match err {
            NotifyError::Rejected { code, message } => {
                assert_eq!(code, 19021);
                assert_eq!(message, "sign match fail");
            }
            other => panic!("expected rejection, got {other}"),
        }
    }

    #[tokio::test]
    async fn legacy_status_code_is_rejected() {
        let url = serve_once("200 OK", r#"{"StatusCode":9499,"StatusMessage":"bad"}"#).await;
        let err = transport().post_json(&url, &payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { code: 9499, .. }));
    }

    #[tokio::test]
    async fn server_error_is_http_failure() {
        let url = serve_once("500 Internal Server Error", r#"{"code":0}"#).await;
        let err = transport().post_json(&url, &payload()).await.unwrap_err();
        match err {
            NotifyError::Http(err) => {
                assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("expected http failure, got {other}"),
        }
    }
}
