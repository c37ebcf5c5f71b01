use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 链路层状态，编号沿用 Wi-Fi 驱动的状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    NoSsidAvailable,
    ScanCompleted,
    Connected,
    ConnectFailed,
    ConnectionLost,
    Disconnected,
}

impl LinkState {
    pub fn code(self) -> i32 {
        match self {
            LinkState::Idle => 0,
            LinkState::NoSsidAvailable => 1,
            LinkState::ScanCompleted => 2,
            LinkState::Connected => 3,
            LinkState::ConnectFailed => 4,
            LinkState::ConnectionLost => 5,
            LinkState::Disconnected => 6,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => LinkState::Idle,
            1 => LinkState::NoSsidAvailable,
            2 => LinkState::ScanCompleted,
            3 => LinkState::Connected,
            4 => LinkState::ConnectFailed,
            5 => LinkState::ConnectionLost,
            _ => LinkState::Disconnected,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LinkState::Idle => "Link Idle",
            LinkState::NoSsidAvailable => "No SSID Available",
            LinkState::ScanCompleted => "Scan Completed",
            LinkState::Connected => "Connected",
            LinkState::ConnectFailed => "Connect Failed",
            LinkState::ConnectionLost => "Connection Lost",
            LinkState::Disconnected => "Disconnected",
        };
        f.write_str(text)
    }
}

/// Reports the current link-layer state before each request attempt.
pub trait LinkMonitor: Send + Sync {
    fn state(&self) -> LinkState;
}

/// 主机网络由操作系统管理，视为始终在线
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConnected;

impl LinkMonitor for AlwaysConnected {
    fn state(&self) -> LinkState {
        LinkState::Connected
    }
}

/// 可由外部更新的链路状态，供平台层或测试注入
#[derive(Debug)]
pub struct SharedLinkState {
    state: AtomicU8,
}

impl SharedLinkState {
    pub fn new(state: LinkState) -> Self {
        Self {
            state: AtomicU8::new(state.code() as u8),
        }
    }

    pub fn set(&self, state: LinkState) {
        self.state.store(state.code() as u8, Ordering::SeqCst);
    }
}

impl LinkMonitor for SharedLinkState {
    fn state(&self) -> LinkState {
        LinkState::from_code(self.state.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_state_round_trips_codes() {
        let link = SharedLinkState::new(LinkState::Connected);
        assert_eq!(link.state(), LinkState::Connected);
        link.set(LinkState::ConnectionLost);
        assert_eq!(link.state(), LinkState::ConnectionLost);
        assert_eq!(link.state().to_string(), "Connection Lost");
    }
}
