// ==========================================
// 内容管理平台 - 字段值校验与规范化
// ==========================================
// 职责: 按输入类型校验单元格值，并输出规范化后的存储值
// 规则:
//   - 不可导入类型: 一律拒绝
//   - checkbox: true/false 或 0/1 → "1"/"0"
//   - numeric-input: 空 → "0"；逗号可作小数点；按任意精度十进制解析，输出不带千分位
//   - date-time picker: 空值透传；按子类型（date/time/datetime）重新格式化
//   - 其他: 原样透传
// ==========================================

use crate::domain::field::FieldDefinition;
use crate::domain::types::{DateTimeKind, InputType};
use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

// ==========================================
// FieldRejection - 拒绝原因
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRejection {
    NotImportable,
    InvalidCheckbox,
    InvalidNumber,
    InvalidDateTime,
}

impl FieldRejection {
    /// 对应的消息键
    pub fn message_key(&self) -> &'static str {
        match self {
            FieldRejection::NotImportable => "field.not_importable",
            FieldRejection::InvalidCheckbox => "field.invalid_checkbox",
            FieldRejection::InvalidNumber => "field.invalid_number",
            FieldRejection::InvalidDateTime => "field.invalid_datetime",
        }
    }
}

/// 校验并规范化字段值
///
/// # 返回
/// - Ok(String): 规范化后的值（应写入记录）
/// - Err(FieldRejection): 字段被拒绝（不写入记录）
pub fn validate(field: &FieldDefinition, raw: &str) -> Result<String, FieldRejection> {
    if field.input_type.is_rejected_on_import() {
        return Err(FieldRejection::NotImportable);
    }

    match field.input_type {
        InputType::Checkbox => normalize_checkbox(raw),
        InputType::NumericInput => normalize_number(raw),
        InputType::DateTimePicker => normalize_datetime(raw, field.datetime_kind()),
        _ => Ok(raw.to_string()),
    }
}

// ===== checkbox =====

fn normalize_checkbox(raw: &str) -> Result<String, FieldRejection> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok("0".to_string());
    }
    if value.eq_ignore_ascii_case("true") {
        return Ok("1".to_string());
    }
    if value.eq_ignore_ascii_case("false") {
        return Ok("0".to_string());
    }

    match value.parse::<i64>() {
        Ok(0) => Ok("0".to_string()),
        Ok(1) => Ok("1".to_string()),
        _ => Err(FieldRejection::InvalidCheckbox),
    }
}

// ===== numeric-input =====

fn normalize_number(raw: &str) -> Result<String, FieldRejection> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok("0".to_string());
    }

    let parsed = BigDecimal::from_str(&normalize_decimal_separators(value))
        .map_err(|_| FieldRejection::InvalidNumber)?;

    render_decimal(&parsed)
}

/// 指数记法允许的最大位移（防止 "1e999999999" 展开成超长文本）
const MAX_DECIMAL_SCALE: i64 = 1_000;

/// 以普通十进制文本输出（不用科学记数法，去掉小数部分末尾的 0）
fn render_decimal(value: &BigDecimal) -> Result<String, FieldRejection> {
    let (digits, scale) = value.as_bigint_and_exponent();
    if scale.abs() > MAX_DECIMAL_SCALE {
        return Err(FieldRejection::InvalidNumber);
    }

    let text = digits.to_string();
    let (negative, magnitude) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };

    let plain = if scale <= 0 {
        let mut integer = magnitude.to_string();
        integer.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
        integer
    } else {
        let scale = scale as usize;
        let padded = format!("{:0>width$}", magnitude, width = scale + 1);
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            integer.to_string()
        } else {
            format!("{}.{}", integer, fraction)
        }
    };

    if plain.chars().all(|c| c == '0') {
        Ok("0".to_string())
    } else if negative {
        Ok(format!("-{}", plain))
    } else {
        Ok(plain)
    }
}

/// 统一小数点：同时出现 '.' 与 ',' 时，靠后的为小数点，另一种视为千分位
fn normalize_decimal_separators(value: &str) -> String {
    let last_dot = value.rfind('.');
    let last_comma = value.rfind(',');

    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => value.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => value.replace(',', ""),
        (None, Some(_)) => value.replace(',', "."),
        _ => value.to_string(),
    }
}

// ===== date-time picker =====

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Excel 日期序列号的纪元（1900 闰年缺陷已折算）
fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParsedMoment {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

fn parse_moment(value: &str) -> Option<ParsedMoment> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(ParsedMoment::DateTime(dt.naive_local()));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ParsedMoment::DateTime(dt));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return Some(ParsedMoment::Date(d));
        }
    }
    for format in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(value, format) {
            return Some(ParsedMoment::Time(t));
        }
    }

    // 电子表格单元格中的日期序列号
    let serial = value.parse::<f64>().ok().filter(|s| *s > 0.0 && *s < 2_958_466.0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let moment = excel_epoch()? + Duration::milliseconds(millis);
    if serial.fract() == 0.0 {
        Some(ParsedMoment::Date(moment.date()))
    } else {
        Some(ParsedMoment::DateTime(moment))
    }
}

fn normalize_datetime(raw: &str, kind: DateTimeKind) -> Result<String, FieldRejection> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(raw.to_string());
    }

    let moment = parse_moment(value).ok_or(FieldRejection::InvalidDateTime)?;
    let format = kind.output_format();

    let rendered = match (kind, moment) {
        // 只有时间的值无法作为日期
        (DateTimeKind::Date | DateTimeKind::DateTime, ParsedMoment::Time(_)) => {
            return Err(FieldRejection::InvalidDateTime)
        }
        (_, ParsedMoment::DateTime(dt)) => dt.format(format).to_string(),
        (_, ParsedMoment::Date(d)) => d
            .and_hms_opt(0, 0, 0)
            .ok_or(FieldRejection::InvalidDateTime)?
            .format(format)
            .to_string(),
        (DateTimeKind::Time, ParsedMoment::Time(t)) => t.format(format).to_string(),
    };

    Ok(rendered)
}
