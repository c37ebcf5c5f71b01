use std::fmt;

use crate::client::link::LinkState;
use crate::errors::ParseError;

/// 解析失败码的偏移，与 HTTP 客户端错误区分
pub const PARSE_ERROR_OFFSET: i32 = -256;
/// 链路断开码的偏移
pub const LINK_DOWN_OFFSET: i32 = -512;

/// 传输层结果：HTTP 状态码或客户端侧失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Http(u16),
    ConnectionRefused,
    ConnectionLost,
    ReadTimeout,
    Other,
}

impl TransportStatus {
    /// 客户端侧失败使用负数编码
    pub fn code(self) -> i32 {
        match self {
            TransportStatus::Http(status) => status as i32,
            TransportStatus::ConnectionRefused => -1,
            TransportStatus::ConnectionLost => -5,
            TransportStatus::Other => -6,
            TransportStatus::ReadTimeout => -11,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            TransportStatus::Http(status) => http_reason(status),
            TransportStatus::ConnectionRefused => "Connection Refused",
            TransportStatus::ConnectionLost => "Connection Lost",
            TransportStatus::ReadTimeout => "Read Timeout",
            TransportStatus::Other => "Transport Error",
        }
    }
}

fn http_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// 一次抓取（含重试）的最终结果
///
/// 三个互不重叠的失败域：传输层、链路断开、解析失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Transport(TransportStatus),
    LinkDown(LinkState),
    ParseFailed(ParseError),
}

impl FetchStatus {
    pub const OK: FetchStatus = FetchStatus::Transport(TransportStatus::Http(200));

    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }

    /// 单一整数视图，便于显示诊断信息
    pub fn code(&self) -> i32 {
        match self {
            FetchStatus::Transport(status) => status.code(),
            FetchStatus::ParseFailed(err) => PARSE_ERROR_OFFSET - err.code(),
            FetchStatus::LinkDown(state) => LINK_DOWN_OFFSET - state.code(),
        }
    }

    pub fn phrase(&self) -> String {
        match self {
            FetchStatus::Transport(status) => status.phrase().to_string(),
            FetchStatus::ParseFailed(err) => err.to_string(),
            FetchStatus::LinkDown(state) => state.to_string(),
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.phrase())
    }
}
