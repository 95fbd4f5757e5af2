// ==========================================
// 贷款管理平台 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 金额清洗 / 日期多格式解析
// 用途: RowNormalizer 的单元格级工具
// ==========================================

use chrono::{DateTime, Duration, NaiveDate};

/// 默认接受的日期格式（按顺序尝试，取第一个成功的）
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%Y%m%d",
];

/// 金额中可能出现的币种符号/代码（前缀或后缀）
const CURRENCY_MARKERS: &[&str] = &["ZMW", "USD", "EUR", "GBP", "ZK", "K", "$", "€", "£", "%"];

pub struct DataCleaner {
    date_formats: Vec<String>,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect())
    }
}

impl DataCleaner {
    pub fn new(date_formats: Vec<String>) -> Self {
        Self { date_formats }
    }

    pub fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    /// 空白字符串视为缺失
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 去掉币种符号、千分位与内部空白
    ///
    /// "K 1,500.00" → "1500.00"，"12.5%" → "12.5"
    pub fn strip_numeric_noise(&self, value: &str) -> String {
        let mut s = value.trim().to_uppercase();

        loop {
            let before = s.len();
            for marker in CURRENCY_MARKERS {
                if let Some(rest) = s.strip_prefix(marker) {
                    s = rest.trim_start().to_string();
                }
                if let Some(rest) = s.strip_suffix(marker) {
                    s = rest.trim_end().to_string();
                }
            }
            if s.len() == before {
                break;
            }
        }

        s.chars()
            .filter(|c| !matches!(c, ',' | '_' | ' ' | '\u{a0}' | '\''))
            .collect()
    }

    pub fn parse_number(&self, value: &str) -> Option<f64> {
        let cleaned = self.strip_numeric_noise(value);
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
    }

    /// 整数（允许 "12.0" 这类整值小数）
    pub fn parse_integer(&self, value: &str) -> Option<i64> {
        let n = self.parse_number(value)?;
        if n.fract() == 0.0 && n.abs() < 9.0e15 {
            Some(n as i64)
        } else {
            None
        }
    }

    /// 按顺序尝试日期格式；兼容 RFC 3339 与电子表格日期序列号
    pub fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        let value = value.trim();

        for format in &self.date_formats {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return Some(date);
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.date_naive());
        }

        // 电子表格日期序列号（1900 日期系统，起点 1899-12-30）
        if let Ok(serial) = value.parse::<f64>() {
            if (1.0..=2_958_465.0).contains(&serial) {
                let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
                return base.checked_add_signed(Duration::days(serial.trunc() as i64));
            }
        }

        None
    }

    /// 手机号标准化: 保留前导 '+' 与数字
    pub fn normalize_phone(&self, value: &str) -> String {
        let trimmed = value.trim();
        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if trimmed.starts_with('+') {
            format!("+{}", digits)
        } else {
            digits
        }
    }

    pub fn is_valid_email(&self, value: &str) -> bool {
        let mut parts = value.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => {
                !local.is_empty()
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && domain.contains('.')
                    && !value.chars().any(char::is_whitespace)
            }
            _ => false,
        }
    }
}
