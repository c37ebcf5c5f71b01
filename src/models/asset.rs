use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::models::capacity::{ASSETS_PER_PAGE, C_MAX, DISPLAY_LEN, NAME_LEN, SYMBOL_LEN};
use crate::models::fixed::FixedVec;
use crate::util::truncate_chars;

/// K线数据结构
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Candle {
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
}

impl Candle {
    pub fn new(open: f32, high: f32, low: f32, close: f32) -> Self {
        Self { open, high, low, close }
    }

    /// 四个价格均为正数
    pub fn is_positive(&self) -> bool {
        self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0
    }
}

/// 资产的配置身份：数据源代码、显示代码、名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub symbol: String,
    pub display_symbol: String,
    pub name: String,
}

impl AssetSpec {
    pub fn new(symbol: &str, display_symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            display_symbol: display_symbol.to_string(),
            name: name.to_string(),
        }
    }
}

/// 单个资产的行情
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetQuote {
    pub symbol: String,
    pub display_symbol: String,
    pub name: String,
    pub price: f32,
    pub previous_close: f32,
    pub change_day: f32,
    pub change_week: f32,
    pub change_month: f32,
    pub change_year: f32,
    pub candles: FixedVec<Candle, C_MAX>,
    pub price_secondary: f32,
    pub valid: bool,
}

impl AssetQuote {
    /// 只带显示信息的空行情，抓取失败时界面仍能显示名称
    pub fn placeholder(spec: &AssetSpec) -> Self {
        let mut quote = Self::default();
        quote.reset(spec);
        quote
    }

    /// 原地重置，保留K线缓冲区的空间
    pub fn reset(&mut self, spec: &AssetSpec) {
        self.symbol = truncate_chars(&spec.symbol, SYMBOL_LEN);
        self.display_symbol = truncate_chars(&spec.display_symbol, DISPLAY_LEN);
        self.name = truncate_chars(&spec.name, NAME_LEN);
        self.price = 0.0;
        self.previous_close = 0.0;
        self.change_day = 0.0;
        self.change_week = 0.0;
        self.change_month = 0.0;
        self.change_year = 0.0;
        self.candles.clear();
        self.price_secondary = 0.0;
        self.valid = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageKind {
    Crypto,
    Indices,
    Commodities,
    Forex,
}

impl PageKind {
    pub fn label(self) -> &'static str {
        match self {
            PageKind::Crypto => "crypto",
            PageKind::Indices => "indices",
            PageKind::Commodities => "commodities",
            PageKind::Forex => "forex",
        }
    }
}

/// 一页固定四个资产
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetPage {
    pub kind: PageKind,
    pub assets: [AssetQuote; ASSETS_PER_PAGE],
    pub last_updated: Option<DateTime<Utc>>,
    pub valid: bool,
}

impl AssetPage {
    pub fn new(kind: PageKind, specs: &[AssetSpec]) -> Self {
        let mut page = Self {
            kind,
            assets: Default::default(),
            last_updated: None,
            valid: false,
        };
        page.reset(specs);
        page
    }

    /// 每轮抓取开始时原地重置所有槽位
    pub fn reset(&mut self, specs: &[AssetSpec]) {
        for (slot, spec) in self.assets.iter_mut().zip(specs) {
            slot.reset(spec);
        }
        self.valid = false;
    }

    /// 至少一个资产有效则整页有效
    pub fn refresh_valid(&mut self) -> bool {
        self.valid = self.assets.iter().any(|a| a.valid);
        self.valid
    }

    pub fn valid_count(&self) -> usize {
        self.assets.iter().filter(|a| a.valid).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<AssetSpec> {
        vec![
            AssetSpec::new("^GSPC", "SPX", "S&P 500"),
            AssetSpec::new("^DJI", "DJI", "Dow Jones"),
            AssetSpec::new("^IXIC", "IXIC", "Nasdaq Composite"),
            AssetSpec::new("^GSPTSE", "TSX", "S&P/TSX Composite Index Long Name Overflow"),
        ]
    }

    #[test]
    fn test_page_starts_with_display_metadata() {
        let page = AssetPage::new(PageKind::Indices, &specs());
        assert!(!page.valid);
        assert_eq!(page.assets[0].display_symbol, "SPX");
        assert_eq!(page.assets[1].name, "Dow Jones");
        assert!(page.assets.iter().all(|a| !a.valid));
        // 名称超长被截断
        assert_eq!(page.assets[3].name.chars().count(), NAME_LEN);
    }

    #[test]
    fn test_reset_clears_previous_cycle() {
        let mut page = AssetPage::new(PageKind::Indices, &specs());
        page.assets[2].price = 18000.0;
        page.assets[2].valid = true;
        page.assets[2].candles.push(Candle::new(1.0, 2.0, 0.5, 1.5));
        assert!(page.refresh_valid());

        page.reset(&specs());
        assert!(!page.valid);
        assert_eq!(page.assets[2].price, 0.0);
        assert!(page.assets[2].candles.is_empty());
        assert_eq!(page.assets[2].symbol, "^IXIC");
    }
}
