use chrono::{DateTime, Utc};
use log::debug;

/// 时间来源，测试中可固定时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// 按字符截断，保证不切断多字节字符
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// 百分比变化，基准不为正时返回 None
pub fn percent_change(from: f32, to: f32) -> Option<f32> {
    if from > 0.0 {
        Some((to - from) / from * 100.0)
    } else {
        None
    }
}

// 由日涨跌幅反推前收盘价
pub fn previous_close_from_change(price: f32, change_day_pct: f32) -> f32 {
    price / (1.0 + change_day_pct / 100.0)
}

/// 覆盖最近 `hours` 小时的 [start, end] 时间窗（Unix 秒）
///
/// start 减一秒是为了不多取一小时的历史。
pub fn history_window(now: DateTime<Utc>, hours: usize) -> (i64, i64) {
    let end = now.timestamp();
    let start = end - (3600 * hours as i64 - 1);
    (start, end)
}

// 行情代码中的保留字符（如 ^、=）需要百分号编码
pub fn encode_symbol(symbol: &str) -> String {
    let encoded = urlencoding::encode(symbol).into_owned();
    if encoded != symbol {
        debug!("Encoded symbol {} as {}", symbol, encoded);
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("Bitcoin", 3), "Bit");
        assert_eq!(truncate_chars("上证指数", 2), "上证");
        assert_eq!(truncate_chars("ETH", 16), "ETH");
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(100.0, 110.0), Some(10.0));
        assert_eq!(percent_change(0.0, 110.0), None);
    }

    #[test]
    fn test_history_window_covers_exact_hours() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let (start, end) = history_window(now, 24);
        assert_eq!(end, 1_700_000_000);
        assert_eq!(end - start, 24 * 3600 - 1);
    }

    #[test]
    fn test_encode_symbol() {
        assert_eq!(encode_symbol("^GSPC"), "%5EGSPC");
        assert_eq!(encode_symbol("USDCAD=X"), "USDCAD%3DX");
        assert_eq!(encode_symbol("GC=F"), "GC%3DF");
        assert_eq!(encode_symbol("AAPL"), "AAPL");
    }
}
