use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// One outbound call, fully resolved.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of an upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, req: UpstreamRequest) -> AppResult<UpstreamResponse>;
}

/// reqwest-backed transport. No timeout is configured beyond the client's
/// defaults.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("circle-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, req: UpstreamRequest) -> AppResult<UpstreamResponse> {
        let mut headers = HeaderMap::new();
        for (name, value) in &req.headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Configuration(format!("bad {name} header value: {e}")))?;
            headers.insert(HeaderName::from_static(*name), value);
        }

        let mut builder = self
            .client
            .request(req.method.clone(), &req.url)
            .headers(headers);
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let res = builder.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        debug!(method = %req.method, url = %req.url, status, "upstream call");
        Ok(UpstreamResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Serves one canned HTTP response on a local port.
    async fn serve_once(raw: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(raw.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/x")
    }

    fn transport() -> ReqwestTransport {
        ReqwestTransport::from_client(Client::builder().no_proxy().build().unwrap())
    }

    fn get(url: String) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::GET,
            url,
            headers: vec![("accept", "application/json".into())],
            body: None,
        }
    }

    #[tokio::test]
    async fn returns_status_and_body() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmissing").await;
        let res = transport().send(get(url)).await.unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(res.body, "missing");
        assert!(!res.is_success());
    }

    #[tokio::test]
    async fn truncated_body_is_a_transport_error() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"partial\"").await;
        let err = transport().send(get(url)).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)), "{err:?}");
    }
}
