use crate::models::{Candle, FixedVec};

/// 将纯价格序列分组压缩为K线
///
/// 每组 `max(1, total / N)` 个点，最后一根K线吸收余下的点。
/// 开/收为组内首/末点，高/低为组内极值。
pub fn downsample_groups<const N: usize>(points: &[f32], out: &mut FixedVec<Candle, N>) {
    out.clear();
    let total = points.len();
    if total == 0 || N == 0 {
        return;
    }

    let group = (total / N).max(1);
    let mut start = 0;
    while start < total && !out.is_full() {
        let end = if out.len() == N - 1 {
            total
        } else {
            (start + group).min(total)
        };
        let chunk = &points[start..end];

        let open = chunk[0];
        let close = chunk[chunk.len() - 1];
        let (low, high) = chunk
            .iter()
            .fold((open, open), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        out.push(Candle::new(open, high, low, close));

        start = end;
    }
}

/// 按固定步长抽样OHLC序列，无效点沿用上一根有效K线
///
/// 步长为 `max(1, total / N)`；一旦出现过有效K线，就不会再输出全零K线。
pub fn downsample_stride<const N: usize>(
    opens: &[f32],
    highs: &[f32],
    lows: &[f32],
    closes: &[f32],
    out: &mut FixedVec<Candle, N>,
) {
    out.clear();
    let total = closes.len();
    if total == 0 {
        return;
    }

    let at = |series: &[f32], i: usize| series.get(i).copied().unwrap_or(0.0);
    let stride = (total / N.max(1)).max(1);
    let mut last_valid = Candle::default();

    let mut i = 0;
    while i < total && !out.is_full() {
        let sample = Candle::new(at(opens, i), at(highs, i), at(lows, i), at(closes, i));
        if sample.is_positive() {
            last_valid = sample;
        }
        out.push(last_valid);
        i += stride;
    }
}

/// 从K线序列末尾往回数 `offset` 根作为基准，序列太短时取第一根
pub fn close_offset_from_end(candles: &[Candle], offset: usize) -> Option<f32> {
    if candles.is_empty() {
        return None;
    }
    let idx = candles.len().saturating_sub(offset);
    Some(candles[idx].close)
}
