use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedHubError {
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Parse int error: {0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("Parse float error: {0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),
}

pub type Result<T> = std::result::Result<T, FeedHubError>;

/// 响应解析失败的结构化原因
///
/// 只有结构层面的失败才会产生该错误；业务字段缺失一律回落为默认值。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("EmptyInput")]
    EmptyInput,

    #[error("IncompleteInput")]
    IncompleteInput,

    #[error("InvalidInput")]
    InvalidInput,

    #[error("TooDeep")]
    TooDeep,

    #[error("NoResult")]
    NoResult,

    #[error("NoUsableData")]
    NoUsableData,

    // 响应体超过上限，未读完即放弃
    #[error("TooLarge")]
    TooLarge,
}

impl ParseError {
    /// 稳定的数字编码，用于标量状态视图
    pub fn code(self) -> i32 {
        match self {
            ParseError::EmptyInput => 0,
            ParseError::IncompleteInput => 1,
            ParseError::InvalidInput => 2,
            ParseError::TooDeep => 3,
            ParseError::NoResult => 4,
            ParseError::NoUsableData => 5,
            ParseError::TooLarge => 6,
        }
    }

    /// 将 serde_json 的错误归类
    pub fn from_json(err: &serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Eof => ParseError::IncompleteInput,
            Category::Io => ParseError::IncompleteInput,
            Category::Syntax if err.to_string().starts_with("recursion limit") => ParseError::TooDeep,
            Category::Syntax | Category::Data => ParseError::InvalidInput,
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::from_json(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_classification() {
        let eof = serde_json::from_str::<serde_json::Value>("{\"a\": [1, 2").unwrap_err();
        assert_eq!(ParseError::from(eof), ParseError::IncompleteInput);

        let syntax = serde_json::from_str::<serde_json::Value>("{\"a\": tru}").unwrap_err();
        assert_eq!(ParseError::from(syntax), ParseError::InvalidInput);

        let deep = "[".repeat(200) + &"]".repeat(200);
        let too_deep = serde_json::from_str::<serde_json::Value>(&deep).unwrap_err();
        assert_eq!(ParseError::from(too_deep), ParseError::TooDeep);
    }

    #[test]
    fn test_parse_error_codes_are_distinct() {
        let all = [
            ParseError::EmptyInput,
            ParseError::IncompleteInput,
            ParseError::InvalidInput,
            ParseError::TooDeep,
            ParseError::NoResult,
            ParseError::NoUsableData,
            ParseError::TooLarge,
        ];
        let mut codes: Vec<i32> = all.iter().map(|e| e.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
