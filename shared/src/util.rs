use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Calendar date of a Unix-millis timestamp in the business timezone.
///
/// Out-of-range timestamps fall back to the Unix epoch date.
pub fn local_date(millis: i64, tz: Tz) -> NaiveDate {
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// First millisecond of `date` in `tz` (00:00:00.000 local)
///
/// When a DST change skips local midnight the day starts at the first
/// local minute that exists.
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..MINUTES_PER_DAY)
        .map(|m| midnight + Duration::minutes(m))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| midnight.and_utc().timestamp_millis())
}

/// Last millisecond of `date` in `tz` (23:59:59.999 local)
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    match date.succ_opt() {
        Some(next) => day_start_millis(next, tz) - 1,
        None => i64::MAX,
    }
}
