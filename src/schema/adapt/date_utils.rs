//! Module for handling date parsing.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, StringArray};
use arrow::compute::kernels::cast;
use arrow::datatypes::DataType;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::schema::adapt::types::{AdapterError, DateFormatConfig, Result};

/// Days between 0001-01-01 (CE) and the Unix epoch
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days since the Unix epoch, the `Date32` storage value
#[must_use]
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

/// Inverse of [`date_to_days`]
#[must_use]
pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

/// Compile the clock-time pattern of a date config
pub fn time_regex(config: &DateFormatConfig) -> Result<Regex> {
    Regex::new(&config.time_pattern).map_err(|e| {
        AdapterError::DateParsingError(format!("invalid time pattern '{}': {e}", config.time_pattern))
    })
}

/// Remove clock-time fragments such as `10:00:00 AM` and trim the rest
#[must_use]
pub fn strip_clock_time(s: &str, time_re: &Regex) -> String {
    time_re.replace_all(s, "").trim().to_string()
}

/// Parse a date string with multiple format attempts
#[must_use]
pub fn parse_date_string(s: &str, config: &DateFormatConfig) -> Option<NaiveDate> {
    for format in &config.date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    // ISO timestamps as written by other exporters
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }

    if config.enable_format_detection {
        if let Some(detected_format) = detect_date_format(s) {
            if let Ok(date) = NaiveDate::parse_from_str(s, &detected_format) {
                return Some(date);
            }
        }
    }

    None
}

/// Try to detect the date format based on string patterns
#[must_use]
pub fn detect_date_format(s: &str) -> Option<String> {
    if s.contains('/') {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() == 3 {
            if parts[0].len() == 4 {
                return Some("%Y/%m/%d".to_string());
            } else if parts[2].len() == 4 {
                if let Ok(first_num) = parts[0].parse::<u8>() {
                    // Month-first unless the first part cannot be a month
                    if first_num > 12 {
                        return Some("%d/%m/%Y".to_string());
                    }
                    return Some("%m/%d/%Y".to_string());
                }
            } else if parts[2].len() == 2 {
                return Some("%m/%d/%y".to_string());
            }
        }
    }

    if s.contains('.') {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() == 3 && parts[2].len() == 4 {
            return Some("%d.%m.%Y".to_string());
        }
    }

    None
}

/// Parse any column into `Date32`, removing clock-time fragments first.
///
/// Values that cannot be parsed become null.
pub fn parse_date_column(array: &ArrayRef, config: &DateFormatConfig) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Date32 => return Ok(array.clone()),
        DataType::Date64 | DataType::Timestamp(_, _) => {
            return cast::cast(array, &DataType::Date32).map_err(AdapterError::ArrowError);
        }
        _ => {}
    }

    let as_text = cast::cast(array, &DataType::Utf8)?;
    let strings = as_text
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AdapterError::ValidationError("Expected StringArray".to_string()))?;
    let time_re = time_regex(config)?;

    let mut failures = 0usize;
    let dates: Date32Array = strings
        .iter()
        .map(|value| {
            let value = value?;
            let cleaned = strip_clock_time(value, &time_re);
            if cleaned.is_empty() {
                return None;
            }
            let parsed = parse_date_string(&cleaned, config).map(date_to_days);
            if parsed.is_none() {
                failures += 1;
            }
            parsed
        })
        .collect();

    if failures > 0 {
        log::warn!("{failures} date values could not be parsed and were set to null");
    }

    Ok(Arc::new(dates) as ArrayRef)
}
