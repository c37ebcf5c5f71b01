use serde::Serialize;
use crate::models::capacity::AQ_MAX;
use crate::models::fixed::FixedVec;

/// 空气质量历史，所有序列按下标一一对应同一次观测
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirQualitySample {
    pub lat: f32,
    pub lon: f32,
    pub aqi: FixedVec<i32, AQ_MAX>,
    pub co: FixedVec<f32, AQ_MAX>,
    pub no: FixedVec<f32, AQ_MAX>,
    pub no2: FixedVec<f32, AQ_MAX>,
    pub o3: FixedVec<f32, AQ_MAX>,
    pub so2: FixedVec<f32, AQ_MAX>,
    pub pm2_5: FixedVec<f32, AQ_MAX>,
    pub pm10: FixedVec<f32, AQ_MAX>,
    pub nh3: FixedVec<f32, AQ_MAX>,
    pub dt: FixedVec<i64, AQ_MAX>,
}

/// 单次观测，用于按下标成组写入
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AirQualityReading {
    pub aqi: i32,
    pub co: f32,
    pub no: f32,
    pub no2: f32,
    pub o3: f32,
    pub so2: f32,
    pub pm2_5: f32,
    pub pm10: f32,
    pub nh3: f32,
    pub dt: i64,
}

impl AirQualitySample {
    pub fn len(&self) -> usize {
        self.dt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dt.is_empty()
    }

    /// 同步写入所有并行序列；已满时返回 false
    pub fn push(&mut self, r: AirQualityReading) -> bool {
        if self.dt.is_full() {
            return false;
        }
        self.aqi.push(r.aqi);
        self.co.push(r.co);
        self.no.push(r.no);
        self.no2.push(r.no2);
        self.o3.push(r.o3);
        self.so2.push(r.so2);
        self.pm2_5.push(r.pm2_5);
        self.pm10.push(r.pm10);
        self.nh3.push(r.nh3);
        self.dt.push(r.dt);
        true
    }

    /// 取第 i 次观测
    pub fn reading(&self, i: usize) -> Option<AirQualityReading> {
        if i >= self.len() {
            return None;
        }
        Some(AirQualityReading {
            aqi: self.aqi[i],
            co: self.co[i],
            no: self.no[i],
            no2: self.no2[i],
            o3: self.o3[i],
            so2: self.so2[i],
            pm2_5: self.pm2_5[i],
            pm10: self.pm10[i],
            nh3: self.nh3[i],
            dt: self.dt[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_sequences_in_lock_step() {
        let mut sample = AirQualitySample::default();
        for i in 0..(AQ_MAX + 3) {
            let accepted = sample.push(AirQualityReading {
                aqi: (i % 5) as i32 + 1,
                pm10: i as f32,
                dt: 1_700_000_000 + 3600 * i as i64,
                ..Default::default()
            });
            assert_eq!(accepted, i < AQ_MAX);
        }
        assert_eq!(sample.len(), AQ_MAX);
        assert_eq!(sample.aqi.len(), AQ_MAX);
        assert_eq!(sample.nh3.len(), AQ_MAX);

        let last = sample.reading(AQ_MAX - 1).unwrap();
        assert_eq!(last.pm10, (AQ_MAX - 1) as f32);
        assert!(sample.reading(AQ_MAX).is_none());
    }
}
