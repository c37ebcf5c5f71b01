//! 带重试的抓取客户端
//!
//! 每次尝试独立建立连接；请求与解析作为一个整体重试，链路断开时立即返回。

pub mod link;
pub mod status;
pub mod transport;

use log::{debug, info, warn};
use std::sync::Arc;

use crate::errors::ParseError;

pub use link::{AlwaysConnected, LinkMonitor, LinkState, SharedLinkState};
pub use status::{FetchStatus, TransportStatus};
pub use transport::{HttpTransport, Request, Response, Transport};

#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    link: Arc<dyn LinkMonitor>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, link: Arc<dyn LinkMonitor>) -> Self {
        Self { transport, link }
    }

    /// 执行一次带重试的抓取
    ///
    /// `attempts` 是该数据源的尝试次数上限；只有拿到 200 且解析成功才停止重试。
    /// 返回最后一次尝试的结果。
    pub async fn fetch<F>(&self, request: &Request, attempts: u32, mut normalize: F) -> FetchStatus
    where
        F: FnMut(&[u8]) -> Result<(), ParseError> + Send,
    {
        info!("Attempting HTTP request: {}", request.redacted());

        let mut status = FetchStatus::Transport(TransportStatus::Other);
        for attempt in 1..=attempts.max(1) {
            // 链路断开时重试没有意义，不消耗重试次数
            let link = self.link.state();
            if link != LinkState::Connected {
                warn!("Link down ({}), skipping {}", link, request.url());
                return FetchStatus::LinkDown(link);
            }

            status = match self.transport.get(request).await {
                Ok(response) if response.status == 200 && response.oversized => {
                    FetchStatus::ParseFailed(ParseError::TooLarge)
                }
                Ok(response) if response.status == 200 => match normalize(&response.body) {
                    Ok(()) => FetchStatus::OK,
                    Err(err) => FetchStatus::ParseFailed(err),
                },
                Ok(response) => FetchStatus::Transport(TransportStatus::Http(response.status)),
                Err(err) => FetchStatus::Transport(err),
            };

            debug!("  attempt {}/{}: {}", attempt, attempts, status);
            if status.is_ok() {
                break;
            }
            warn!("{} attempt {}/{} failed: {}", request.url(), attempt, attempts, status);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<std::result::Result<Response, TransportStatus>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(mut replies: Vec<std::result::Result<Response, TransportStatus>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn get(&self, _: &Request) -> std::result::Result<Response, TransportStatus> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(TransportStatus::ConnectionRefused))
        }
    }

    fn ok(body: &str) -> std::result::Result<Response, TransportStatus> {
        Ok(Response::new(200, body.as_bytes().to_vec()))
    }

    fn parse_digit(body: &[u8]) -> Result<(), ParseError> {
        if body == b"1" {
            Ok(())
        } else {
            Err(ParseError::InvalidInput)
        }
    }

    fn request() -> Request {
        Request::get("https://example.invalid", "/x")
    }

    #[tokio::test]
    async fn test_retries_until_parse_succeeds() {
        let transport = Arc::new(Scripted::new(vec![
            Err(TransportStatus::ReadTimeout),
            ok("garbage"),
            ok("1"),
        ]));
        let client = FetchClient::new(transport.clone(), Arc::new(AlwaysConnected));
        let status = client.fetch(&request(), 3, parse_digit).await;
        assert_eq!(status, FetchStatus::OK);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_last_outcome() {
        let transport = Arc::new(Scripted::new(vec![
            Ok(Response::new(503, Vec::new())),
            ok("garbage"),
            ok("1"),
        ]));
        let client = FetchClient::new(transport.clone(), Arc::new(AlwaysConnected));
        let status = client.fetch(&request(), 2, parse_digit).await;
        assert_eq!(status, FetchStatus::ParseFailed(ParseError::InvalidInput));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_http_error_surfaced() {
        let transport = Arc::new(Scripted::new(vec![
            Ok(Response::new(429, Vec::new())),
            Ok(Response::new(404, Vec::new())),
        ]));
        let client = FetchClient::new(transport.clone(), Arc::new(AlwaysConnected));
        let status = client.fetch(&request(), 2, parse_digit).await;
        assert_eq!(status, FetchStatus::Transport(TransportStatus::Http(404)));
    }

    #[tokio::test]
    async fn test_oversized_body_is_retried_parse_failure() {
        let transport = Arc::new(Scripted::new(vec![
            Ok(Response::oversized(200)),
            Ok(Response::oversized(200)),
            ok("1"),
        ]));
        let client = FetchClient::new(transport.clone(), Arc::new(AlwaysConnected));
        let mut parsed = 0;
        let status = client
            .fetch(&request(), 2, |body| {
                parsed += 1;
                parse_digit(body)
            })
            .await;
        assert_eq!(status, FetchStatus::ParseFailed(ParseError::TooLarge));
        assert_eq!(transport.calls(), 2);
        // 超限的响应体不交给解析器
        assert_eq!(parsed, 0);

        let status = client.fetch(&request(), 2, parse_digit).await;
        assert!(status.is_ok());
    }

    #[tokio::test]
    async fn test_link_down_fails_fast() {
        let transport = Arc::new(Scripted::new(vec![ok("1")]));
        let link = Arc::new(SharedLinkState::new(LinkState::Disconnected));
        let client = FetchClient::new(transport.clone(), link);
        let status = client.fetch(&request(), 3, parse_digit).await;
        assert_eq!(status, FetchStatus::LinkDown(LinkState::Disconnected));
        assert_eq!(transport.calls(), 0);
    }
}
