use serde::Deserialize;
use log::{debug, info};

use crate::errors::ParseError;
use crate::models::capacity::{NAME_LEN, SPARK_MAX};
use crate::models::{AssetQuote, FixedVec};
use crate::normalize::downsample::downsample_groups;
use crate::normalize::ensure_body;
use crate::normalize::lenient::{Num, Obj, Text};
use crate::util::previous_close_from_change;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSparkline {
    price: FixedVec<Num, SPARK_MAX>,
}

// 字段列表即投影：市值、成交量、图片链接等全部跳过；
// 交易代码也不取，槽位的 symbol 始终是配置的 id
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCoin {
    id: Text<64>,
    name: Text<NAME_LEN>,
    current_price: Num,
    price_change_percentage_24h: Num,
    price_change_percentage_7d_in_currency: Num,
    price_change_percentage_30d_in_currency: Num,
    price_change_percentage_1y_in_currency: Num,
    sparkline_in_7d: Obj<RawSparkline>,
}

/// 解析 CoinGecko /coins/markets 批量响应
///
/// 响应顺序不固定，按 `id` 匹配到配置的槽位；未匹配的元素跳过，
/// 缺席的槽位保持原样。至少找到一个币种才算成功。
pub fn normalize_crypto(
    body: &[u8],
    expected_ids: &[String],
    slots: &mut [AssetQuote],
) -> Result<usize, ParseError> {
    ensure_body(body)?;
    let coins: FixedVec<Obj<RawCoin>, 64> = serde_json::from_slice(body)?;

    let mut found = 0;
    for coin in coins {
        let coin = coin.0;
        let idx = match expected_ids.iter().position(|id| id == coin.id.as_str()) {
            Some(idx) if idx < slots.len() => idx,
            _ => {
                debug!("Skipping unexpected coin {}", coin.id.as_str());
                continue;
            }
        };
        apply_coin(coin, &mut slots[idx]);
        found += 1;
    }

    info!("Parsed {} of {} coins", found, expected_ids.len());
    if found == 0 {
        return Err(ParseError::NoUsableData);
    }
    Ok(found)
}

fn apply_coin(coin: RawCoin, quote: &mut AssetQuote) {
    quote.name = coin.name.into_string();
    quote.price = coin.current_price.f32();
    quote.change_day = coin.price_change_percentage_24h.f32();
    quote.change_week = coin.price_change_percentage_7d_in_currency.f32();
    quote.change_month = coin.price_change_percentage_30d_in_currency.f32();
    quote.change_year = coin.price_change_percentage_1y_in_currency.f32();
    quote.previous_close = previous_close_from_change(quote.price, quote.change_day);

    let points: Vec<f32> = coin.sparkline_in_7d.0.price.iter().map(|p| p.f32()).collect();
    downsample_groups(&points, &mut quote.candles);

    quote.valid = quote.price > 0.0;
    debug!("Parsed {} ${:.2}", quote.name, quote.price);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetSpec;

    fn ids() -> Vec<String> {
        ["bitcoin", "ethereum", "solana", "ripple"].iter().map(|s| s.to_string()).collect()
    }

    fn slots() -> Vec<AssetQuote> {
        vec![
            AssetQuote::placeholder(&AssetSpec::new("bitcoin", "BTC", "Bitcoin")),
            AssetQuote::placeholder(&AssetSpec::new("ethereum", "ETH", "Ethereum")),
            AssetQuote::placeholder(&AssetSpec::new("solana", "SOL", "Solana")),
            AssetQuote::placeholder(&AssetSpec::new("ripple", "XRP", "XRP")),
        ]
    }

    fn coin(id: &str, price: f64, change: f64) -> String {
        let spark: Vec<String> = (0..168).map(|i| format!("{}", price + (i % 7) as f64)).collect();
        format!(
            r#"{{"id": "{id}", "symbol": "{sym}", "name": "{id} coin", "image": "https://example.invalid/{id}.png",
                "current_price": {price}, "market_cap": 123456789,
                "price_change_percentage_24h": {change},
                "price_change_percentage_7d_in_currency": 1.5,
                "price_change_percentage_30d_in_currency": -3.25,
                "price_change_percentage_1y_in_currency": 80.0,
                "sparkline_in_7d": {{"price": [{spark}]}}}}"#,
            id = id,
            sym = &id[..3],
            price = price,
            change = change,
            spark = spark.join(",")
        )
    }

    fn body(coins: &[String]) -> String {
        format!("[{}]", coins.join(","))
    }

    #[test]
    fn test_symbol_keeps_configured_identity() {
        let mut s = slots();
        normalize_crypto(body(&[coin("bitcoin", 64000.0, 2.0)]).as_bytes(), &ids(), &mut s).unwrap();
        assert_eq!(s[0].symbol, "bitcoin");
        assert_eq!(s[0].display_symbol, "BTC");
        assert_eq!(s[0].name, "bitcoin coin");
    }

    #[test]
    fn test_matches_by_identity_not_position() {
        let forward = body(&[
            coin("bitcoin", 64000.0, 2.0),
            coin("ethereum", 3100.0, -1.0),
            coin("solana", 150.0, 4.0),
            coin("ripple", 0.5, 0.0),
        ]);
        let reversed = body(&[
            coin("ripple", 0.5, 0.0),
            coin("solana", 150.0, 4.0),
            coin("ethereum", 3100.0, -1.0),
            coin("bitcoin", 64000.0, 2.0),
        ]);

        let mut a = slots();
        let mut b = slots();
        assert_eq!(normalize_crypto(forward.as_bytes(), &ids(), &mut a), Ok(4));
        assert_eq!(normalize_crypto(reversed.as_bytes(), &ids(), &mut b), Ok(4));
        assert_eq!(a, b);
        assert_eq!(a[0].price, 64000.0);
        assert_eq!(a[3].price, 0.5);
        assert!(a.iter().all(|q| q.valid));
    }

    #[test]
    fn test_missing_identity_leaves_slot_unpopulated() {
        let full = body(&[
            coin("bitcoin", 64000.0, 2.0),
            coin("ethereum", 3100.0, -1.0),
            coin("solana", 150.0, 4.0),
            coin("ripple", 0.5, 0.0),
        ]);
        let partial = body(&[
            coin("solana", 150.0, 4.0),
            coin("dogecoin", 0.1, 1.0),
            coin("bitcoin", 64000.0, 2.0),
            coin("ripple", 0.5, 0.0),
        ]);

        let mut a = slots();
        let mut b = slots();
        normalize_crypto(full.as_bytes(), &ids(), &mut a).unwrap();
        assert_eq!(normalize_crypto(partial.as_bytes(), &ids(), &mut b), Ok(3));

        assert_eq!(a[0], b[0]);
        assert_eq!(a[2], b[2]);
        assert_eq!(a[3], b[3]);
        assert!(!b[1].valid);
        assert_eq!(b[1].display_symbol, "ETH");
        assert_eq!(b[1].price, 0.0);
    }

    #[test]
    fn test_previous_close_back_derived() {
        let mut s = slots();
        normalize_crypto(body(&[coin("bitcoin", 64000.0, 2.5)]).as_bytes(), &ids(), &mut s).unwrap();
        let q = &s[0];
        let expected = q.price / (1.0 + q.change_day / 100.0);
        assert!((q.previous_close - expected).abs() < 1e-3);
        assert!((q.previous_close * 1.025 - 64000.0).abs() < 0.1);
    }

    #[test]
    fn test_sparkline_downsampled() {
        let mut s = slots();
        normalize_crypto(body(&[coin("solana", 150.0, 4.0)]).as_bytes(), &ids(), &mut s).unwrap();
        let q = &s[2];
        // 168 个点，每组 7 个
        assert_eq!(q.candles.len(), 24);
        assert_eq!(q.candles[0].open, 150.0);
        assert_eq!(q.candles[0].close, 156.0);
        assert_eq!(q.candles[0].high, 156.0);
        assert_eq!(q.candles[0].low, 150.0);
    }

    #[test]
    fn test_no_expected_coin_is_failure() {
        let mut s = slots();
        let result = normalize_crypto(body(&[coin("dogecoin", 0.1, 1.0)]).as_bytes(), &ids(), &mut s);
        assert_eq!(result, Err(ParseError::NoUsableData));

        let result = normalize_crypto(br#"{"status": {"error_code": 429}}"#, &ids(), &mut s);
        assert_eq!(result, Err(ParseError::NoUsableData));
    }

    #[test]
    fn test_non_positive_price_not_valid() {
        let mut s = slots();
        normalize_crypto(body(&[coin("bitcoin", 0.0, 0.0)]).as_bytes(), &ids(), &mut s).unwrap();
        assert!(!s[0].valid);
    }
}
