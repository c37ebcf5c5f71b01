//! 响应归一化：把四种 JSON 结构写入固定容量的领域记录
//!
//! 每次解析都带字段投影，只有后续会用到的字段被保留，
//! 其余字段由反序列化器直接跳过，峰值内存与响应的冗长程度无关。

pub mod air_quality;
pub mod chart;
pub mod crypto;
pub mod downsample;
pub mod lenient;
pub mod weather;

use crate::errors::ParseError;

/// 顶层字段投影
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    retained: Vec<&'static str>,
    excluded: Vec<&'static str>,
}

impl Projection {
    pub fn new(retained: &[&'static str], excluded: &[&'static str]) -> Self {
        Self {
            retained: retained.to_vec(),
            excluded: excluded.to_vec(),
        }
    }

    pub fn retains(&self, field: &str) -> bool {
        self.retained.iter().any(|f| *f == field)
    }

    /// 明确排除的字段，同时用作请求的 exclude 参数
    pub fn excluded(&self) -> &[&'static str] {
        &self.excluded
    }
}

/// 天气投影的运行时开关
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeatherProjection {
    pub alerts: bool,
}

impl WeatherProjection {
    pub fn build(self) -> Projection {
        let mut retained = vec!["lat", "lon", "timezone", "timezone_offset", "current", "hourly", "daily"];
        let mut excluded = vec!["minutely"];
        if self.alerts {
            retained.push("alerts");
        } else {
            excluded.push("alerts");
        }
        Projection::new(&retained, &excluded)
    }
}

/// 空响应直接判定失败，不交给 JSON 解析器
pub(crate) fn ensure_body(body: &[u8]) -> Result<(), ParseError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ParseError::EmptyInput);
    }
    Ok(())
}
