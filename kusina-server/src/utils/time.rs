//! 时间工具函数: 业务时区转换
//!
//! 日期字符串在 API handler 层解析，存储层只接收 `i64` Unix millis。

use chrono::NaiveDate;
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 今天 (业务时区)
pub fn today(tz: Tz) -> NaiveDate {
    shared::util::local_date(shared::util::now_millis(), tz)
}

/// 收据号日期部分 (业务时区), 例如 `20261018`
pub fn receipt_date(millis: i64, tz: Tz) -> String {
    shared::util::local_date(millis, tz)
        .format("%Y%m%d")
        .to_string()
}
