use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use log::debug;

use crate::errors::ParseError;
use crate::models::capacity::{
    A_MAX, D_MAX, DESCRIPTION_LEN, EVENT_LEN, H_MAX, ICON_LEN, LABEL_LEN, TAG_LEN, TIMEZONE_LEN,
};
use crate::models::{
    CurrentConditions, DailyConditions, DailyFeelsLike, DailyTemperature, FixedVec,
    HourlyConditions, WeatherAlert, WeatherCondition, WeatherSnapshot,
};
use crate::normalize::lenient::{Num, Obj, Text};
use crate::normalize::{ensure_body, Projection};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCondition {
    id: Num,
    main: Text<LABEL_LEN>,
    description: Text<DESCRIPTION_LEN>,
    icon: Text<ICON_LEN>,
}

impl From<RawCondition> for WeatherCondition {
    fn from(raw: RawCondition) -> Self {
        Self {
            id: raw.id.i32(),
            main: raw.main.into_string(),
            description: raw.description.into_string(),
            icon: raw.icon.into_string(),
        }
    }
}

// 只保留第一个天气现象
fn first_condition(list: FixedVec<Obj<RawCondition>, 1>) -> WeatherCondition {
    list.into_iter().next().map(|c| c.0.into()).unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OneHour {
    #[serde(rename = "1h")]
    one_hour: Num,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCurrent {
    dt: Num,
    sunrise: Num,
    sunset: Num,
    temp: Num,
    feels_like: Num,
    pressure: Num,
    humidity: Num,
    dew_point: Num,
    clouds: Num,
    uvi: Num,
    visibility: Num,
    wind_speed: Num,
    wind_gust: Num,
    wind_deg: Num,
    rain: Obj<OneHour>,
    snow: Obj<OneHour>,
    weather: FixedVec<Obj<RawCondition>, 1>,
}

impl From<RawCurrent> for CurrentConditions {
    fn from(raw: RawCurrent) -> Self {
        Self {
            dt: raw.dt.i64(),
            sunrise: raw.sunrise.i64(),
            sunset: raw.sunset.i64(),
            temp: raw.temp.f32(),
            feels_like: raw.feels_like.f32(),
            pressure: raw.pressure.i32(),
            humidity: raw.humidity.i32(),
            dew_point: raw.dew_point.f32(),
            clouds: raw.clouds.i32(),
            uvi: raw.uvi.f32(),
            visibility: raw.visibility.i32(),
            wind_speed: raw.wind_speed.f32(),
            wind_gust: raw.wind_gust.f32(),
            wind_deg: raw.wind_deg.i32(),
            rain_1h: raw.rain.0.one_hour.f32(),
            snow_1h: raw.snow.0.one_hour.f32(),
            weather: first_condition(raw.weather),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHourly {
    dt: Num,
    temp: Num,
    feels_like: Num,
    pressure: Num,
    humidity: Num,
    dew_point: Num,
    clouds: Num,
    uvi: Num,
    visibility: Num,
    wind_speed: Num,
    wind_gust: Num,
    wind_deg: Num,
    pop: Num,
    rain: Obj<OneHour>,
    snow: Obj<OneHour>,
    weather: FixedVec<Obj<RawCondition>, 1>,
}

impl From<RawHourly> for HourlyConditions {
    fn from(raw: RawHourly) -> Self {
        Self {
            dt: raw.dt.i64(),
            temp: raw.temp.f32(),
            feels_like: raw.feels_like.f32(),
            pressure: raw.pressure.i32(),
            humidity: raw.humidity.i32(),
            dew_point: raw.dew_point.f32(),
            clouds: raw.clouds.i32(),
            uvi: raw.uvi.f32(),
            visibility: raw.visibility.i32(),
            wind_speed: raw.wind_speed.f32(),
            wind_gust: raw.wind_gust.f32(),
            wind_deg: raw.wind_deg.i32(),
            pop: raw.pop.f32(),
            rain_1h: raw.rain.0.one_hour.f32(),
            snow_1h: raw.snow.0.one_hour.f32(),
            weather: first_condition(raw.weather),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDailyTemp {
    morn: Num,
    day: Num,
    eve: Num,
    night: Num,
    min: Num,
    max: Num,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDaily {
    dt: Num,
    sunrise: Num,
    sunset: Num,
    moonrise: Num,
    moonset: Num,
    moon_phase: Num,
    temp: Obj<RawDailyTemp>,
    feels_like: Obj<RawDailyTemp>,
    pressure: Num,
    humidity: Num,
    dew_point: Num,
    clouds: Num,
    uvi: Num,
    visibility: Num,
    wind_speed: Num,
    wind_gust: Num,
    wind_deg: Num,
    pop: Num,
    rain: Num,
    snow: Num,
    weather: FixedVec<Obj<RawCondition>, 1>,
}

impl From<RawDaily> for DailyConditions {
    fn from(raw: RawDaily) -> Self {
        let t = raw.temp.0;
        let f = raw.feels_like.0;
        Self {
            dt: raw.dt.i64(),
            sunrise: raw.sunrise.i64(),
            sunset: raw.sunset.i64(),
            moonrise: raw.moonrise.i64(),
            moonset: raw.moonset.i64(),
            moon_phase: raw.moon_phase.f32(),
            temp: DailyTemperature {
                morn: t.morn.f32(),
                day: t.day.f32(),
                eve: t.eve.f32(),
                night: t.night.f32(),
                min: t.min.f32(),
                max: t.max.f32(),
            },
            feels_like: DailyFeelsLike {
                morn: f.morn.f32(),
                day: f.day.f32(),
                eve: f.eve.f32(),
                night: f.night.f32(),
            },
            pressure: raw.pressure.i32(),
            humidity: raw.humidity.i32(),
            dew_point: raw.dew_point.f32(),
            clouds: raw.clouds.i32(),
            uvi: raw.uvi.f32(),
            visibility: raw.visibility.i32(),
            wind_speed: raw.wind_speed.f32(),
            wind_gust: raw.wind_gust.f32(),
            wind_deg: raw.wind_deg.i32(),
            pop: raw.pop.f32(),
            rain: raw.rain.f32(),
            snow: raw.snow.f32(),
            weather: first_condition(raw.weather),
        }
    }
}

// sender_name 与 description 不在字段列表中，解析时被跳过
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAlert {
    event: Text<EVENT_LEN>,
    start: Num,
    end: Num,
    tags: FixedVec<Text<TAG_LEN>, 1>,
}

impl From<RawAlert> for WeatherAlert {
    fn from(raw: RawAlert) -> Self {
        Self {
            event: raw.event.into_string(),
            start: raw.start.i64(),
            end: raw.end.i64(),
            tags: raw.tags.first().map(|t| t.as_str().to_string()).unwrap_or_default(),
        }
    }
}

/// 按投影逐个处理顶层字段，直接写入快照
struct OneCallSeed<'a> {
    projection: &'a Projection,
    out: &'a mut WeatherSnapshot,
}

impl<'de, 'a> DeserializeSeed<'de> for OneCallSeed<'a> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, 'a> Visitor<'de> for OneCallSeed<'a> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a One Call response object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<Text<32>>()? {
            let key = key.as_str();
            if !self.projection.retains(key) {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            match key {
                "lat" => self.out.lat = map.next_value::<Num>()?.f32(),
                "lon" => self.out.lon = map.next_value::<Num>()?.f32(),
                "timezone" => {
                    self.out.timezone = map.next_value::<Text<TIMEZONE_LEN>>()?.into_string()
                }
                "timezone_offset" => self.out.timezone_offset = map.next_value::<Num>()?.i32(),
                "current" => self.out.current = map.next_value::<Obj<RawCurrent>>()?.0.into(),
                "hourly" => {
                    let raw = map.next_value::<FixedVec<Obj<RawHourly>, H_MAX>>()?;
                    self.out.hourly = raw.into_iter().map(|h| h.0.into()).collect();
                }
                "daily" => {
                    let raw = map.next_value::<FixedVec<Obj<RawDaily>, D_MAX>>()?;
                    self.out.daily = raw.into_iter().map(|d| d.0.into()).collect();
                }
                "alerts" => {
                    let raw = map.next_value::<FixedVec<Obj<RawAlert>, A_MAX>>()?;
                    self.out.alerts = raw.into_iter().map(|a| a.0.into()).collect();
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

/// 解析 One Call 响应
///
/// `out` 先被重置为默认值；结构解析失败时返回 `ParseError`，此时 `out` 的内容不可信。
pub fn normalize_weather(
    body: &[u8],
    projection: &Projection,
    out: &mut WeatherSnapshot,
) -> Result<(), ParseError> {
    ensure_body(body)?;
    *out = WeatherSnapshot::default();

    let mut de = serde_json::Deserializer::from_slice(body);
    OneCallSeed { projection, out: &mut *out }
        .deserialize(&mut de)
        .map_err(|e| ParseError::from_json(&e))?;
    de.end().map_err(|e| ParseError::from_json(&e))?;

    debug!(
        "Parsed One Call: {} hourly, {} daily, {} alerts",
        out.hourly.len(),
        out.daily.len(),
        out.alerts.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::WeatherProjection;

    fn hourly_entry(i: usize) -> String {
        format!(
            r#"{{"dt": {}, "temp": {}, "humidity": 50, "pop": 0.2,
                "rain": {{"1h": 0.5}},
                "weather": [{{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}},
                            {{"id": 701, "main": "Mist", "description": "mist", "icon": "50d"}}]}}"#,
            1_700_000_000 + i * 3600,
            280.0 + i as f64
        )
    }

    fn one_call(hourly: usize, daily: usize, alerts: usize) -> String {
        let hourly: Vec<String> = (0..hourly).map(hourly_entry).collect();
        let daily: Vec<String> = (0..daily)
            .map(|i| {
                format!(
                    r#"{{"dt": {}, "temp": {{"min": 270.1, "max": 290.2, "day": 285}},
                        "feels_like": {{"morn": 268}}, "rain": 3.5, "pop": 1,
                        "weather": [{{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}}]}}"#,
                    1_700_000_000 + i * 86400
                )
            })
            .collect();
        let alerts: Vec<String> = (0..alerts)
            .map(|i| {
                format!(
                    r#"{{"sender_name": "NWS", "event": "Wind Advisory {}", "start": 1, "end": 2,
                        "description": "{}", "tags": ["Wind", "Other"]}}"#,
                    i,
                    "x".repeat(4096)
                )
            })
            .collect();
        format!(
            r#"{{"lat": 43.65, "lon": -79.38, "timezone": "America/Toronto", "timezone_offset": -18000,
                "current": {{"dt": 1700000000, "sunrise": 1699990000, "sunset": 1700030000,
                             "temp": 279.3, "pressure": 1015, "humidity": 81, "wind_speed": 4.1,
                             "snow": {{"1h": 1.25}},
                             "weather": [{{"id": 601, "main": "Snow", "description": "snow", "icon": "13n"}}]}},
                "minutely": [{{"dt": 1, "precipitation": 0}}],
                "hourly": [{}], "daily": [{}], "alerts": [{}]}}"#,
            hourly.join(","),
            daily.join(","),
            alerts.join(",")
        )
    }

    #[test]
    fn test_copies_fields_and_takes_first_condition() {
        let body = one_call(3, 2, 0);
        let mut out = WeatherSnapshot::default();
        normalize_weather(body.as_bytes(), &WeatherProjection::default().build(), &mut out).unwrap();

        assert_eq!(out.timezone, "America/Toronto");
        assert_eq!(out.timezone_offset, -18000);
        assert_eq!(out.current.pressure, 1015);
        assert_eq!(out.current.snow_1h, 1.25);
        assert_eq!(out.current.rain_1h, 0.0);
        assert_eq!(out.current.weather.main, "Snow");

        assert_eq!(out.hourly.len(), 3);
        assert_eq!(out.hourly[2].temp, 282.0);
        assert_eq!(out.hourly[0].rain_1h, 0.5);
        assert_eq!(out.hourly[0].weather.id, 500);
        assert_eq!(out.hourly[0].weather.description, "light rain");

        assert_eq!(out.daily.len(), 2);
        assert_eq!(out.daily[0].temp.max, 290.2);
        assert_eq!(out.daily[0].feels_like.morn, 268.0);
        assert_eq!(out.daily[1].rain, 3.5);
        assert_eq!(out.daily[1].pop, 1.0);
    }

    #[test]
    fn test_sequences_truncate_at_capacity() {
        let body = one_call(H_MAX + 5, D_MAX + 2, 0);
        let mut out = WeatherSnapshot::default();
        normalize_weather(body.as_bytes(), &WeatherProjection::default().build(), &mut out).unwrap();
        assert_eq!(out.hourly.len(), H_MAX);
        assert_eq!(out.daily.len(), D_MAX);
        assert_eq!(out.hourly[H_MAX - 1].dt, 1_700_000_000 + (H_MAX as i64 - 1) * 3600);
    }

    #[test]
    fn test_alerts_only_when_projected() {
        let body = one_call(1, 1, A_MAX + 3);

        let mut out = WeatherSnapshot::default();
        normalize_weather(body.as_bytes(), &WeatherProjection { alerts: false }.build(), &mut out)
            .unwrap();
        assert!(out.alerts.is_empty());

        normalize_weather(body.as_bytes(), &WeatherProjection { alerts: true }.build(), &mut out)
            .unwrap();
        assert_eq!(out.alerts.len(), A_MAX);
        assert_eq!(out.alerts[0].event, "Wind Advisory 0");
        assert_eq!(out.alerts[0].tags, "Wind");
        assert_eq!(out.alerts[0].end, 2);
    }

    #[test]
    fn test_missing_sections_default() {
        let mut out = WeatherSnapshot::default();
        normalize_weather(br#"{"lat": 1.5}"#, &WeatherProjection::default().build(), &mut out)
            .unwrap();
        assert_eq!(out.lat, 1.5);
        assert!(out.hourly.is_empty());
        assert_eq!(out.current, CurrentConditions::default());
    }

    #[test]
    fn test_structural_failures() {
        let projection = WeatherProjection::default().build();
        let mut out = WeatherSnapshot::default();
        assert_eq!(
            normalize_weather(b"", &projection, &mut out),
            Err(ParseError::EmptyInput)
        );
        assert_eq!(
            normalize_weather(br#"{"hourly": [{"dt": 1}"#, &projection, &mut out),
            Err(ParseError::IncompleteInput)
        );
        assert_eq!(
            normalize_weather(br#"[1, 2]"#, &projection, &mut out),
            Err(ParseError::InvalidInput)
        );
        assert_eq!(
            normalize_weather(br#"{"lat": 1} trailing"#, &projection, &mut out),
            Err(ParseError::InvalidInput)
        );
    }
}
