// 公开导出的模块，供外部使用
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod services;
pub mod util;

// 重新导出常用类型，方便使用
pub use client::{FetchClient, FetchStatus, LinkMonitor, LinkState, Request, Response, Transport, TransportStatus};
pub use config::{Config, RetryBudgets};
pub use errors::{FeedHubError, ParseError, Result};
pub use models::{AirQualitySample, AssetPage, AssetQuote, AssetSpec, PageKind, WeatherSnapshot};
pub use services::{CycleReport, FeedService};
pub use util::{Clock, SystemClock};
