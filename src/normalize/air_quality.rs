use serde::Deserialize;

use crate::errors::ParseError;
use crate::models::capacity::AQ_MAX;
use crate::models::{AirQualityReading, AirQualitySample, FixedVec};
use crate::normalize::ensure_body;
use crate::normalize::lenient::{Num, Obj};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCoord {
    lat: Num,
    lon: Num,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMain {
    aqi: Num,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComponents {
    co: Num,
    no: Num,
    no2: Num,
    o3: Num,
    so2: Num,
    pm2_5: Num,
    pm10: Num,
    nh3: Num,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    main: Obj<RawMain>,
    components: Obj<RawComponents>,
    dt: Num,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAirPollution {
    coord: Obj<RawCoord>,
    list: FixedVec<Obj<RawEntry>, AQ_MAX>,
}

/// 解析空气质量历史，各并行序列按源数组顺序同步写入
pub fn normalize_air_quality(body: &[u8], out: &mut AirQualitySample) -> Result<(), ParseError> {
    ensure_body(body)?;
    let raw: RawAirPollution = serde_json::from_slice(body)?;

    *out = AirQualitySample::default();
    out.lat = raw.coord.0.lat.f32();
    out.lon = raw.coord.0.lon.f32();

    for entry in raw.list {
        let entry = entry.0;
        let c = entry.components.0;
        out.push(AirQualityReading {
            aqi: entry.main.0.aqi.i32(),
            co: c.co.f32(),
            no: c.no.f32(),
            no2: c.no2.f32(),
            o3: c.o3.f32(),
            so2: c.so2.f32(),
            pm2_5: c.pm2_5.f32(),
            pm10: c.pm10.f32(),
            nh3: c.nh3.f32(),
            dt: entry.dt.i64(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> String {
        let list: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"main": {{"aqi": {}}}, "components": {{"co": 201.94, "no": 0.0,
                        "no2": 0.77, "o3": 68.66, "so2": 0.64, "pm2_5": {}, "pm10": 0.54,
                        "nh3": 0.12}}, "dt": {}}}"#,
                    i % 5 + 1,
                    i as f64 + 0.5,
                    1_605_182_400 + i * 3600
                )
            })
            .collect();
        format!(r#"{{"coord": {{"lon": 50.0, "lat": 50.0}}, "list": [{}]}}"#, list.join(","))
    }

    #[test]
    fn test_parallel_sequences_filled_positionally() {
        let mut out = AirQualitySample::default();
        normalize_air_quality(history(3).as_bytes(), &mut out).unwrap();
        assert_eq!(out.lat, 50.0);
        assert_eq!(out.len(), 3);
        let second = out.reading(1).unwrap();
        assert_eq!(second.aqi, 2);
        assert_eq!(second.pm2_5, 1.5);
        assert_eq!(second.dt, 1_605_182_400 + 3600);
        assert_eq!(second.co, 201.94);
    }

    #[test]
    fn test_history_truncates_at_capacity() {
        let mut out = AirQualitySample::default();
        normalize_air_quality(history(AQ_MAX + 6).as_bytes(), &mut out).unwrap();
        assert_eq!(out.len(), AQ_MAX);
        assert_eq!(out.pm2_5.len(), AQ_MAX);
        assert_eq!(out.dt[AQ_MAX - 1], 1_605_182_400 + (AQ_MAX as i64 - 1) * 3600);
    }

    #[test]
    fn test_missing_components_default_to_zero() {
        let mut out = AirQualitySample::default();
        normalize_air_quality(br#"{"list": [{"dt": 5}]}"#, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.reading(0).unwrap().pm10, 0.0);
        assert_eq!(out.lat, 0.0);
    }

    #[test]
    fn test_malformed_body() {
        let mut out = AirQualitySample::default();
        assert_eq!(
            normalize_air_quality(br#"{"list": ["#, &mut out),
            Err(ParseError::IncompleteInput)
        );
    }
}
