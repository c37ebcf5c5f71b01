use std::env;
use std::time::Duration;

use crate::errors::{FeedHubError, Result};
use crate::models::capacity::ASSETS_PER_PAGE;
use crate::models::{AssetSpec, PageKind};

/// 各数据源的尝试次数上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudgets {
    pub weather: u32,
    pub air_quality: u32,
    pub crypto: u32,
    pub chart: u32,
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self {
            weather: 3,
            air_quality: 3,
            crypto: 3,
            chart: 2,
        }
    }
}

pub struct Config {
    pub owm_api_key: String,
    pub owm_endpoint: String,
    pub onecall_version: String,
    pub lat: f64,
    pub lon: f64,
    pub lang: String,
    pub display_alerts: bool,

    pub coingecko_api_key: Option<String>,
    pub coingecko_endpoint: String,
    pub vs_currency: String,

    pub yahoo_endpoint: String,
    pub chart_range: String,
    pub chart_interval: String,

    pub crypto: Vec<AssetSpec>,
    pub indices: Vec<AssetSpec>,
    pub commodities: Vec<AssetSpec>,
    pub forex: Vec<AssetSpec>,

    pub retry: RetryBudgets,
    pub chart_max_concurrency: usize,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    // 单个响应体的字节上限
    pub max_body_bytes: usize,
    pub task_timeout: Duration,
    pub batch_cooldown: Duration,
    // 没有实时汇率时使用的 USD→CAD 汇率
    pub fallback_rate: f32,
}

fn specs(list: &[(&str, &str, &str)]) -> Vec<AssetSpec> {
    list.iter()
        .map(|(symbol, display, name)| AssetSpec::new(symbol, display, name))
        .collect()
}

impl Config {
    pub fn new() -> Self {
        Self {
            owm_api_key: String::new(),
            owm_endpoint: "https://api.openweathermap.org".to_string(),
            onecall_version: "3.0".to_string(),
            lat: 43.6532,
            lon: -79.3832,
            lang: "en".to_string(),
            display_alerts: false,

            coingecko_api_key: None,
            coingecko_endpoint: "https://api.coingecko.com".to_string(),
            vs_currency: "usd".to_string(),

            yahoo_endpoint: "https://query1.finance.yahoo.com".to_string(),
            chart_range: "1mo".to_string(),
            chart_interval: "1d".to_string(),

            crypto: specs(&[
                ("bitcoin", "BTC", "Bitcoin"),
                ("ethereum", "ETH", "Ethereum"),
                ("solana", "SOL", "Solana"),
                ("ripple", "XRP", "XRP"),
            ]),
            indices: specs(&[
                ("^GSPC", "SPX", "S&P 500"),
                ("^DJI", "DJI", "Dow Jones"),
                ("^IXIC", "IXIC", "Nasdaq"),
                ("^GSPTSE", "TSX", "S&P/TSX"),
            ]),
            commodities: specs(&[
                ("GC=F", "GOLD", "Gold"),
                ("SI=F", "SILVER", "Silver"),
                ("CL=F", "WTI", "Crude Oil"),
                ("NG=F", "NATGAS", "Natural Gas"),
            ]),
            // 第一个外汇品种作为加密货币的换算汇率
            forex: specs(&[
                ("USDCAD=X", "USD/CAD", "US Dollar / Canadian Dollar"),
                ("EURUSD=X", "EUR/USD", "Euro / US Dollar"),
                ("GBPUSD=X", "GBP/USD", "British Pound / US Dollar"),
                ("USDJPY=X", "USD/JPY", "US Dollar / Japanese Yen"),
            ]),

            retry: RetryBudgets::default(),
            chart_max_concurrency: 2,
            connect_timeout: Duration::from_millis(5000),
            response_timeout: Duration::from_millis(5000),
            max_body_bytes: 1024 * 1024,
            task_timeout: Duration::from_secs(15),
            batch_cooldown: Duration::from_millis(100),
            fallback_rate: 1.36,
        }
    }

    /// 用 `FEEDHUB_*` 环境变量覆盖默认值
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Ok(key) = env::var("FEEDHUB_OWM_API_KEY") {
            config.owm_api_key = key;
        }
        if let Ok(key) = env::var("FEEDHUB_COINGECKO_API_KEY") {
            if !key.is_empty() {
                config.coingecko_api_key = Some(key);
            }
        }
        if let Ok(lat) = env::var("FEEDHUB_LAT") {
            config.lat = lat.trim().parse()?;
        }
        if let Ok(lon) = env::var("FEEDHUB_LON") {
            config.lon = lon.trim().parse()?;
        }
        if let Ok(lang) = env::var("FEEDHUB_LANG") {
            config.lang = lang;
        }
        if let Ok(cap) = env::var("FEEDHUB_MAX_CONCURRENCY") {
            config.chart_max_concurrency = cap.trim().parse()?;
        }
        if let Ok(alerts) = env::var("FEEDHUB_ALERTS") {
            config.display_alerts = matches!(alerts.as_str(), "1" | "true" | "yes");
        }
        Ok(config)
    }

    pub fn with_owm_api_key(mut self, key: &str) -> Self {
        self.owm_api_key = key.to_string();
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }

    pub fn with_alerts(mut self, display_alerts: bool) -> Self {
        self.display_alerts = display_alerts;
        self
    }

    pub fn with_coingecko_api_key(mut self, key: &str) -> Self {
        self.coingecko_api_key = if key.is_empty() { None } else { Some(key.to_string()) };
        self
    }

    pub fn with_endpoints(mut self, owm: &str, coingecko: &str, yahoo: &str) -> Self {
        self.owm_endpoint = owm.to_string();
        self.coingecko_endpoint = coingecko.to_string();
        self.yahoo_endpoint = yahoo.to_string();
        self
    }

    pub fn with_assets(mut self, kind: PageKind, assets: Vec<AssetSpec>) -> Self {
        match kind {
            PageKind::Crypto => self.crypto = assets,
            PageKind::Indices => self.indices = assets,
            PageKind::Commodities => self.commodities = assets,
            PageKind::Forex => self.forex = assets,
        }
        self
    }

    pub fn with_retry_budgets(mut self, retry: RetryBudgets) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chart_max_concurrency(mut self, cap: usize) -> Self {
        self.chart_max_concurrency = cap;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_batch_cooldown(mut self, cooldown: Duration) -> Self {
        self.batch_cooldown = cooldown;
        self
    }

    pub fn with_http_timeouts(mut self, connect: Duration, response: Duration) -> Self {
        self.connect_timeout = connect;
        self.response_timeout = response;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_fallback_rate(mut self, rate: f32) -> Self {
        self.fallback_rate = rate;
        self
    }

    pub fn assets(&self, kind: PageKind) -> &[AssetSpec] {
        match kind {
            PageKind::Crypto => &self.crypto,
            PageKind::Indices => &self.indices,
            PageKind::Commodities => &self.commodities,
            PageKind::Forex => &self.forex,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for kind in [PageKind::Crypto, PageKind::Indices, PageKind::Commodities, PageKind::Forex] {
            let n = self.assets(kind).len();
            if n != ASSETS_PER_PAGE {
                return Err(FeedHubError::ConfigError(format!(
                    "{} page needs exactly {} assets, got {}",
                    kind.label(),
                    ASSETS_PER_PAGE,
                    n
                )));
            }
        }
        if self.chart_max_concurrency == 0 {
            return Err(FeedHubError::ConfigError("chart_max_concurrency must be at least 1".into()));
        }
        let r = self.retry;
        if r.weather == 0 || r.air_quality == 0 || r.crypto == 0 || r.chart == 0 {
            return Err(FeedHubError::ConfigError("retry budgets must be at least 1".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(FeedHubError::ConfigError("max_body_bytes must be at least 1".into()));
        }
        if !(self.fallback_rate > 0.0) {
            return Err(FeedHubError::ConfigError("fallback_rate must be positive".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
