use serde::Serialize;
use crate::models::capacity::{A_MAX, D_MAX, H_MAX};
use crate::models::fixed::FixedVec;

/// 天气现象，只取源数组的第一个元素
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherCondition {
    pub id: i32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub temp: f32,
    pub feels_like: f32,
    pub pressure: i32,
    pub humidity: i32,
    pub dew_point: f32,
    pub clouds: i32,
    pub uvi: f32,
    pub visibility: i32,
    pub wind_speed: f32,
    pub wind_gust: f32,
    pub wind_deg: i32,
    pub rain_1h: f32,
    pub snow_1h: f32,
    pub weather: WeatherCondition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlyConditions {
    pub dt: i64,
    pub temp: f32,
    pub feels_like: f32,
    pub pressure: i32,
    pub humidity: i32,
    pub dew_point: f32,
    pub clouds: i32,
    pub uvi: f32,
    pub visibility: i32,
    pub wind_speed: f32,
    pub wind_gust: f32,
    pub wind_deg: i32,
    pub pop: f32,
    pub rain_1h: f32,
    pub snow_1h: f32,
    pub weather: WeatherCondition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyTemperature {
    pub morn: f32,
    pub day: f32,
    pub eve: f32,
    pub night: f32,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyFeelsLike {
    pub morn: f32,
    pub day: f32,
    pub eve: f32,
    pub night: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyConditions {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub moonrise: i64,
    pub moonset: i64,
    pub moon_phase: f32,
    pub temp: DailyTemperature,
    pub feels_like: DailyFeelsLike,
    pub pressure: i32,
    pub humidity: i32,
    pub dew_point: f32,
    pub clouds: i32,
    pub uvi: f32,
    pub visibility: i32,
    pub wind_speed: f32,
    pub wind_gust: f32,
    pub wind_deg: i32,
    pub pop: f32,
    pub rain: f32,
    pub snow: f32,
    pub weather: WeatherCondition,
}

/// 天气预警，不保留发布者和长描述
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherAlert {
    pub event: String,
    pub start: i64,
    pub end: i64,
    pub tags: String,
}

/// One Call 接口的完整快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub lat: f32,
    pub lon: f32,
    pub timezone: String,
    pub timezone_offset: i32,
    pub current: CurrentConditions,
    pub hourly: FixedVec<HourlyConditions, H_MAX>,
    pub daily: FixedVec<DailyConditions, D_MAX>,
    pub alerts: FixedVec<WeatherAlert, A_MAX>,
}
