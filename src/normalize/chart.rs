use serde::Deserialize;
use log::debug;

use crate::errors::ParseError;
use crate::models::capacity::SERIES_MAX;
use crate::models::{AssetQuote, FixedVec};
use crate::normalize::downsample::{close_offset_from_end, downsample_stride};
use crate::normalize::ensure_body;
use crate::normalize::lenient::{Num, Obj, Tail, Text};
use crate::util::percent_change;

/// 周涨跌幅回看的K线根数（约一周交易日）
pub const WEEK_OFFSET: usize = 5;
/// 月涨跌幅回看的K线根数（约一月交易日）
pub const MONTH_OFFSET: usize = 22;

// 序列超长时保留最近的点，最新收盘价总在末尾
type Series = Tail<Num, SERIES_MAX>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMeta {
    regular_market_price: Num,
    chart_previous_close: Num,
    currency: Text<8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuoteSeries {
    open: Series,
    high: Series,
    low: Series,
    close: Series,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIndicators {
    quote: FixedVec<Obj<RawQuoteSeries>, 1>,
}

// timestamp、tradingPeriods、volume 等不在投影内
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawResult {
    meta: Obj<RawMeta>,
    indicators: Obj<RawIndicators>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChart {
    result: FixedVec<Option<RawResult>, 1>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChartResponse {
    chart: Obj<RawChart>,
}

fn to_f32(series: &Series) -> Vec<f32> {
    series.iter().map(|v| v.f32()).collect()
}

/// 解析 Yahoo Finance v8 chart 响应，写入单个资产
///
/// 缺少 `chart.result[0]` 视为 `NoResult`；价格不为正视为 `NoUsableData`，
/// 以便上层重试。
pub fn normalize_chart(body: &[u8], quote: &mut AssetQuote) -> Result<(), ParseError> {
    ensure_body(body)?;
    let raw: RawChartResponse = serde_json::from_slice(body)?;

    let result = match raw.chart.0.result.into_iter().next().flatten() {
        Some(result) => result,
        None => {
            debug!("No chart result for {}", quote.symbol);
            return Err(ParseError::NoResult);
        }
    };

    let meta = result.meta.0;
    quote.price = meta.regular_market_price.f32();
    quote.previous_close = meta.chart_previous_close.f32();

    let series = result.indicators.0.quote.into_iter().next().map(|q| q.0).unwrap_or_default();
    let opens = to_f32(&series.open);
    let highs = to_f32(&series.high);
    let lows = to_f32(&series.low);
    let closes = to_f32(&series.close);

    // 正向找第一个有效收盘价，反向找最近两个有效收盘价
    let first_close = closes.iter().copied().find(|c| *c > 0.0);
    let mut recent = closes.iter().rev().copied().filter(|c| *c > 0.0);
    let latest_close = recent.next();
    let prev_close = recent.next();

    if let (Some(latest), Some(prev)) = (latest_close, prev_close) {
        if let Some(change) = percent_change(prev, latest) {
            quote.change_day = change;
        }
    }
    if let (Some(first), Some(latest)) = (first_close, latest_close) {
        if let Some(change) = percent_change(first, latest) {
            quote.change_year = change;
        }
    }

    downsample_stride(&opens, &highs, &lows, &closes, &mut quote.candles);

    if quote.candles.len() >= 2 {
        let newest = quote.candles[quote.candles.len() - 1].close;
        if let Some(change) = close_offset_from_end(&quote.candles, WEEK_OFFSET)
            .and_then(|base| percent_change(base, newest))
        {
            quote.change_week = change;
        }
        if let Some(change) = close_offset_from_end(&quote.candles, MONTH_OFFSET)
            .and_then(|base| percent_change(base, newest))
        {
            quote.change_month = change;
        }
    }

    quote.valid = quote.price > 0.0;
    debug!(
        "Parsed {} {} price={:.4} candles={}",
        quote.symbol,
        meta.currency.as_str(),
        quote.price,
        quote.candles.len()
    );
    if !quote.valid {
        return Err(ParseError::NoUsableData);
    }
    Ok(())
}
