//! 多数据源聚合服务
//!
//! 天气、空气质量与加密货币是单次请求；指数、商品、外汇按代码逐个抓取，交给调度器。
//! 抓取失败不会以错误返回，只体现在状态与 `valid` 标志上。

use chrono::{DateTime, Utc};
use futures::FutureExt;
use log::{info, warn};
use std::sync::Arc;

use crate::client::{AlwaysConnected, FetchClient, FetchStatus, HttpTransport, LinkMonitor, Request, Transport};
use crate::config::Config;
use crate::errors::Result;
use crate::models::capacity::AQ_MAX;
use crate::models::{AirQualitySample, AssetPage, AssetQuote, PageKind, WeatherSnapshot};
use crate::normalize::air_quality::normalize_air_quality;
use crate::normalize::chart::normalize_chart;
use crate::normalize::crypto::normalize_crypto;
use crate::normalize::weather::normalize_weather;
use crate::normalize::{Projection, WeatherProjection};
use crate::services::scheduler::{BatchReport, BoundedScheduler, FetchTask, FetchUnit, Spawner};
use crate::util::{encode_symbol, history_window, Clock, SystemClock};

const ACCEPT_JSON: &str = "application/json";

/// 单页的抓取结果
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub kind: PageKind,
    pub valid: bool,
    pub valid_assets: usize,
    /// 批量请求的状态，只有加密货币页有
    pub status: Option<FetchStatus>,
    /// 调度器统计，按代码抓取的页才有
    pub batch: Option<BatchReport>,
}

/// 一轮抓取的汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub weather: Option<FetchStatus>,
    pub air_quality: Option<FetchStatus>,
    pub pages: Vec<PageReport>,
    pub conversion_rate: Option<f32>,
}

impl CycleReport {
    pub fn page(&self, kind: PageKind) -> Option<&PageReport> {
        self.pages.iter().find(|p| p.kind == kind)
    }
}

pub struct FeedService {
    config: Config,
    client: FetchClient,
    scheduler: BoundedScheduler,
    clock: Arc<dyn Clock>,

    weather: WeatherSnapshot,
    weather_updated: Option<DateTime<Utc>>,
    air_quality: AirQualitySample,
    air_quality_updated: Option<DateTime<Utc>>,

    crypto: AssetPage,
    indices: AssetPage,
    commodities: AssetPage,
    forex: AssetPage,
}

impl FeedService {
    /// 使用 reqwest 传输层，链路视为始终可用
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(
            config.connect_timeout,
            config.response_timeout,
            config.max_body_bytes,
        ));
        Self::with_transport(config, transport, Arc::new(AlwaysConnected))
    }

    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        link: Arc<dyn LinkMonitor>,
    ) -> Result<Self> {
        config.validate()?;

        let scheduler = BoundedScheduler::new(
            config.chart_max_concurrency,
            config.task_timeout,
            config.batch_cooldown,
        );
        // 页面与显示信息在第一次抓取前就准备好
        let crypto = AssetPage::new(PageKind::Crypto, &config.crypto);
        let indices = AssetPage::new(PageKind::Indices, &config.indices);
        let commodities = AssetPage::new(PageKind::Commodities, &config.commodities);
        let forex = AssetPage::new(PageKind::Forex, &config.forex);

        Ok(Self {
            client: FetchClient::new(transport, link),
            scheduler,
            clock: Arc::new(SystemClock),
            weather: WeatherSnapshot::default(),
            weather_updated: None,
            air_quality: AirQualitySample::default(),
            air_quality_updated: None,
            crypto,
            indices,
            commodities,
            forex,
            config,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.scheduler = BoundedScheduler::new(
            self.config.chart_max_concurrency,
            self.config.task_timeout,
            self.config.batch_cooldown,
        )
        .with_spawner(spawner);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn weather(&self) -> &WeatherSnapshot {
        &self.weather
    }

    pub fn weather_updated(&self) -> Option<DateTime<Utc>> {
        self.weather_updated
    }

    pub fn air_quality(&self) -> &AirQualitySample {
        &self.air_quality
    }

    pub fn air_quality_updated(&self) -> Option<DateTime<Utc>> {
        self.air_quality_updated
    }

    pub fn page(&self, kind: PageKind) -> &AssetPage {
        match kind {
            PageKind::Crypto => &self.crypto,
            PageKind::Indices => &self.indices,
            PageKind::Commodities => &self.commodities,
            PageKind::Forex => &self.forex,
        }
    }

    pub fn pages(&self) -> [&AssetPage; 4] {
        [&self.crypto, &self.indices, &self.commodities, &self.forex]
    }

    fn page_mut(&mut self, kind: PageKind) -> &mut AssetPage {
        match kind {
            PageKind::Crypto => &mut self.crypto,
            PageKind::Indices => &mut self.indices,
            PageKind::Commodities => &mut self.commodities,
            PageKind::Forex => &mut self.forex,
        }
    }

    fn weather_request(&self, projection: &Projection) -> Request {
        let path = format!("/data/{}/onecall", self.config.onecall_version);
        Request::get(&self.config.owm_endpoint, &path)
            .query("lat", self.config.lat)
            .query("lon", self.config.lon)
            .query("lang", &self.config.lang)
            .query("units", "standard")
            .query("exclude", projection.excluded().join(","))
            .secret_query("appid", &self.config.owm_api_key)
    }

    fn air_quality_request(&self, now: DateTime<Utc>) -> Request {
        let (start, end) = history_window(now, AQ_MAX);
        Request::get(&self.config.owm_endpoint, "/data/2.5/air_pollution/history")
            .query("lat", self.config.lat)
            .query("lon", self.config.lon)
            .query("start", start)
            .query("end", end)
            .secret_query("appid", &self.config.owm_api_key)
    }

    fn crypto_request(&self, ids: &[String]) -> Request {
        let request = Request::get(&self.config.coingecko_endpoint, "/api/v3/coins/markets")
            .query("vs_currency", &self.config.vs_currency)
            .query("ids", ids.join(","))
            .query("sparkline", "true")
            .query("price_change_percentage", "24h,7d,30d,1y")
            .header("Accept", ACCEPT_JSON);
        match &self.config.coingecko_api_key {
            Some(key) => request.secret_query("x_cg_demo_api_key", key),
            None => request,
        }
    }

    /// 获取天气，成功时替换当前快照；失败时保留上一次成功的数据
    pub async fn fetch_weather(&mut self) -> FetchStatus {
        info!("Fetching weather for {:.4},{:.4}", self.config.lat, self.config.lon);
        let projection = WeatherProjection {
            alerts: self.config.display_alerts,
        }
        .build();
        let request = self.weather_request(&projection);

        let mut scratch = WeatherSnapshot::default();
        let status = self
            .client
            .fetch(&request, self.config.retry.weather, |body| {
                normalize_weather(body, &projection, &mut scratch)
            })
            .await;

        if status.is_ok() {
            self.weather = scratch;
            self.weather_updated = Some(self.clock.now());
        } else {
            warn!("Weather fetch failed: {}", status);
        }
        status
    }

    /// 获取最近 AQ_MAX 小时的空气质量历史
    pub async fn fetch_air_quality(&mut self) -> FetchStatus {
        info!("Fetching air quality for {:.4},{:.4}", self.config.lat, self.config.lon);
        let request = self.air_quality_request(self.clock.now());

        let mut scratch = AirQualitySample::default();
        let status = self
            .client
            .fetch(&request, self.config.retry.air_quality, |body| {
                normalize_air_quality(body, &mut scratch)
            })
            .await;

        if status.is_ok() {
            self.air_quality = scratch;
            self.air_quality_updated = Some(self.clock.now());
        } else {
            warn!("Air quality fetch failed: {}", status);
        }
        status
    }

    async fn fetch_crypto_page(&mut self) -> PageReport {
        let specs = self.config.crypto.clone();
        let ids: Vec<String> = specs.iter().map(|s| s.symbol.clone()).collect();
        let request = self.crypto_request(&ids);
        info!("Fetching {} coins from CoinGecko", ids.len());

        self.crypto.reset(&specs);
        let page = &mut self.crypto;
        let status = self
            .client
            .fetch(&request, self.config.retry.crypto, |body| {
                page.reset(&specs);
                normalize_crypto(body, &ids, &mut page.assets).map(|_| ())
            })
            .await;

        if !status.is_ok() {
            warn!("Crypto fetch failed: {}", status);
            self.crypto.reset(&specs);
        }
        self.crypto.refresh_valid();
        self.crypto.last_updated = Some(self.clock.now());

        PageReport {
            kind: PageKind::Crypto,
            valid: self.crypto.valid,
            valid_assets: self.crypto.valid_count(),
            status: Some(status),
            batch: None,
        }
    }

    fn chart_unit(&self) -> FetchUnit {
        let client = self.client.clone();
        let endpoint = self.config.yahoo_endpoint.clone();
        let range = self.config.chart_range.clone();
        let interval = self.config.chart_interval.clone();
        let attempts = self.config.retry.chart;

        Arc::new(move |task: FetchTask| {
            let client = client.clone();
            let path = format!("/v8/finance/chart/{}", encode_symbol(&task.symbol));
            let request = Request::get(&endpoint, &path)
                .query("range", &range)
                .query("interval", &interval)
                .header("Accept", ACCEPT_JSON);

            async move {
                let placeholder = task.quote;
                let mut quote = placeholder.clone();
                let status = client
                    .fetch(&request, attempts, |body| {
                        // 每次尝试都从干净的槽位开始
                        quote = placeholder.clone();
                        normalize_chart(body, &mut quote)
                    })
                    .await;

                if !status.is_ok() {
                    warn!("Chart fetch for {} failed: {}", task.symbol, status);
                    quote = placeholder;
                }
                (quote, status.is_ok())
            }
            .boxed()
        })
    }

    async fn fetch_chart_page(&mut self, kind: PageKind) -> PageReport {
        let specs = self.config.assets(kind).to_vec();
        info!("Fetching {} page ({} symbols)", kind.label(), specs.len());
        self.page_mut(kind).reset(&specs);

        let tasks: Vec<FetchTask> = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| FetchTask {
                index,
                symbol: spec.symbol.clone(),
                quote: AssetQuote::placeholder(spec),
            })
            .collect();
        let (outcomes, batch) = self.scheduler.run(tasks, self.chart_unit()).await;

        let now = self.clock.now();
        let page = self.page_mut(kind);
        for outcome in outcomes {
            if let (Some(quote), Some(slot)) = (outcome.quote, page.assets.get_mut(outcome.index)) {
                *slot = quote;
            }
        }
        page.refresh_valid();
        page.last_updated = Some(now);

        PageReport {
            kind,
            valid: page.valid,
            valid_assets: page.valid_count(),
            status: None,
            batch: Some(batch),
        }
    }

    /// 用外汇页第一个品种的价格换算加密货币价格，不可用时使用备用汇率
    fn apply_conversion(&mut self) -> f32 {
        let reference = &self.forex.assets[0];
        let rate = if self.forex.valid && reference.valid {
            reference.price
        } else {
            warn!(
                "No live rate for {}, using fallback {}",
                reference.symbol, self.config.fallback_rate
            );
            self.config.fallback_rate
        };

        for quote in self.crypto.assets.iter_mut() {
            quote.price_secondary = if quote.valid { quote.price * rate } else { 0.0 };
        }
        rate
    }

    /// 抓取全部四个行情页，最后做货币换算
    pub async fn fetch_financial(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        report.pages.push(self.fetch_crypto_page().await);
        for kind in [PageKind::Indices, PageKind::Commodities, PageKind::Forex] {
            report.pages.push(self.fetch_chart_page(kind).await);
        }
        report.conversion_rate = Some(self.apply_conversion());

        let valid_pages = report.pages.iter().filter(|p| p.valid).count();
        info!("Financial update complete: {}/{} pages valid", valid_pages, report.pages.len());
        report
    }

    pub async fn fetch_all(&mut self) -> CycleReport {
        let weather = self.fetch_weather().await;
        let air_quality = self.fetch_air_quality().await;
        let mut report = self.fetch_financial().await;
        report.weather = Some(weather);
        report.air_quality = Some(air_quality);
        report
    }
}
