pub mod air_quality;
pub mod asset;
pub mod fixed;
pub mod weather;

/// 编译期容量常量
pub mod capacity {
    pub const H_MAX: usize = 48;
    pub const D_MAX: usize = 8;
    pub const A_MAX: usize = 8;
    pub const AQ_MAX: usize = 24;
    pub const C_MAX: usize = 24;
    pub const ASSETS_PER_PAGE: usize = 4;

    // 原始序列上限，超出部分直接丢弃
    pub const SPARK_MAX: usize = 512;
    pub const SERIES_MAX: usize = 512;

    // 文本字段字符数上限
    pub const SYMBOL_LEN: usize = 16;
    pub const DISPLAY_LEN: usize = 16;
    pub const NAME_LEN: usize = 32;
    pub const LABEL_LEN: usize = 32;
    pub const DESCRIPTION_LEN: usize = 64;
    pub const EVENT_LEN: usize = 64;
    pub const TAG_LEN: usize = 32;
    pub const TIMEZONE_LEN: usize = 64;
    pub const ICON_LEN: usize = 8;
}

pub use air_quality::{AirQualityReading, AirQualitySample};
pub use asset::{AssetPage, AssetQuote, AssetSpec, Candle, PageKind};
pub use fixed::FixedVec;
pub use weather::{
    CurrentConditions, DailyConditions, DailyFeelsLike, DailyTemperature, HourlyConditions,
    WeatherAlert, WeatherCondition, WeatherSnapshot,
};
