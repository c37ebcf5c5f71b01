use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;

use crate::client::status::TransportStatus;
use crate::errors::{FeedHubError, Result};

/// 一次 GET 请求的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    // 这些查询参数的值不会出现在日志中
    secret_keys: Vec<String>,
}

impl Request {
    pub fn get(endpoint: &str, path: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            secret_keys: Vec::new(),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// 与 `query` 相同，但日志中以 `{API key}` 代替
    pub fn secret_query(mut self, key: &str, value: &str) -> Self {
        self.secret_keys.push(key.to_string());
        self.query(key, value)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.endpoint, self.path)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// 可安全打印的完整 URL
    pub fn redacted(&self) -> String {
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| {
                if self.secret_keys.contains(k) {
                    format!("{}={{API key}}", k)
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect();
        if query.is_empty() {
            self.url()
        } else {
            format!("{}?{}", self.url(), query.join("&"))
        }
    }
}

/// 传输层返回的响应：状态码与响应体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    // 响应体超过上限时为 true，此时 body 为空
    pub oversized: bool,
}

impl Response {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            oversized: false,
        }
    }

    pub fn oversized(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            oversized: true,
        }
    }
}

/// Performs one GET attempt. Implementations must not reuse connections
/// across attempts.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &Request) -> std::result::Result<Response, TransportStatus>;
}

/// 基于 reqwest 的传输层，每次尝试新建客户端
///
/// 响应体按块读取，超过 `max_body_bytes` 立即停止读取。
pub struct HttpTransport {
    connect_timeout: Duration,
    response_timeout: Duration,
    max_body_bytes: usize,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration, response_timeout: Duration, max_body_bytes: usize) -> Self {
        Self {
            connect_timeout,
            response_timeout,
            max_body_bytes,
            user_agent: format!("feedhub/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    fn build_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.connect_timeout + self.response_timeout)
            .pool_max_idle_per_host(0)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(FeedHubError::RequestError)
    }
}

fn classify(err: &reqwest::Error) -> TransportStatus {
    if err.is_timeout() {
        TransportStatus::ReadTimeout
    } else if err.is_connect() {
        TransportStatus::ConnectionRefused
    } else if err.is_body() || err.is_decode() || err.is_request() {
        TransportStatus::ConnectionLost
    } else {
        TransportStatus::Other
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &Request) -> std::result::Result<Response, TransportStatus> {
        let client = self.build_client().map_err(|e| {
            debug!("Failed to build HTTP client: {}", e);
            TransportStatus::Other
        })?;

        let mut builder = client.get(request.url()).query(&request.query);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let mut response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        // 非 200 的响应体不需要
        if status != 200 {
            return Ok(Response::new(status, Vec::new()));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_body_bytes as u64 {
                warn!(
                    "{} declares {} bytes, limit is {}",
                    request.url(),
                    declared,
                    self.max_body_bytes
                );
                return Ok(Response::oversized(status));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify(&e))? {
            if body.len() + chunk.len() > self.max_body_bytes {
                warn!(
                    "{} body exceeds {} bytes, abandoning",
                    request.url(),
                    self.max_body_bytes
                );
                return Ok(Response::oversized(status));
            }
            body.extend_from_slice(&chunk);
        }
        debug!("Received {} bytes from {}", body.len(), request.url());

        Ok(Response::new(status, body))
    }
}
