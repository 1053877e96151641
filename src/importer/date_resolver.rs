// ==========================================
// 服装生产数据接入平台 - 多层日期解析器
// ==========================================
// 层级顺序: native → format → excel_serial → heuristic
// 契约:
// - 空白输入 → (None, tier=None)，不尝试任何层级
// - 显式格式串优先于序列号解释（format 层命中即返回）
// - 全部层级失败 → (None, tier=failed)
// 纯函数，无状态
// ==========================================

use crate::domain::import::CellValue;
use crate::domain::types::DateTier;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// 电子表格序列号基准日（1900 纪元，含历史闰年兼容处理）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// 序列号合理范围上限（9999-12-31）
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// 解析结果（诊断模式：层级随值一并返回）
#[derive(Debug, Clone, PartialEq)]
pub struct DateResolution {
    pub value: Option<NaiveDateTime>,
    pub tier: Option<DateTier>,
}

impl DateResolution {
    fn hit(value: NaiveDateTime, tier: DateTier) -> Self {
        Self {
            value: Some(value),
            tier: Some(tier),
        }
    }

    fn blank() -> Self {
        Self {
            value: None,
            tier: None,
        }
    }

    fn failed() -> Self {
        Self {
            value: None,
            tier: Some(DateTier::Failed),
        }
    }
}

/// 多层日期解析入口
///
/// # 参数
/// - value: 单元格值
/// - format_hint: 显式格式串（如 "YYYY-MM-DD"、"MM/DD/YYYY"、"MM-DD"）
/// - assume_year: 格式串/启发式缺少年份时的补充年份
/// - day_first: 两段数字歧义（01/02/2024）时是否日在前
pub fn resolve(
    value: &CellValue,
    format_hint: Option<&str>,
    assume_year: Option<i32>,
    day_first: bool,
) -> DateResolution {
    // 空白输入不进入任何层级
    if value.is_blank() {
        return DateResolution::blank();
    }

    // 第 1 层: native（已是时间类型，原样返回）
    if let CellValue::DateTime(dt) = value {
        return DateResolution::hit(*dt, DateTier::Native);
    }

    // 第 2 层: format（显式格式串严格解析，命中即优先于序列号）
    if let Some(pattern) = format_hint {
        if let Some(dt) = try_format(value, pattern, assume_year) {
            return DateResolution::hit(dt, DateTier::Format);
        }
    }

    // 第 3 层: excel_serial（数值或数值串按 1900 纪元天数解释）
    if let Some(dt) = try_excel_serial(value) {
        return DateResolution::hit(dt, DateTier::ExcelSerial);
    }

    // 第 4 层: heuristic（自由文本，最后手段）
    if let CellValue::Text(s) = value {
        if let Some(dt) = try_heuristic(s, assume_year, day_first) {
            return DateResolution::hit(dt, DateTier::Heuristic);
        }
    }

    DateResolution::failed()
}

// ==========================================
// 第 2 层: 显式格式串
// ==========================================

/// 格式 token → chrono 占位符（长 token 先行，避免 YYYY 被 YY 吞掉）
fn translate_pattern(pattern: &str) -> (String, bool) {
    let mut has_year = false;
    let mut out = String::new();
    let mut rest = pattern;
    while !rest.is_empty() {
        if rest.starts_with("YYYY") {
            out.push_str("%Y");
            has_year = true;
            rest = &rest[4..];
        } else if rest.starts_with("YY") {
            out.push_str("%y");
            has_year = true;
            rest = &rest[2..];
        } else if rest.starts_with("MM") {
            out.push_str("%m");
            rest = &rest[2..];
        } else if rest.starts_with("DD") {
            out.push_str("%d");
            rest = &rest[2..];
        } else if rest.starts_with("HH") {
            out.push_str("%H");
            rest = &rest[2..];
        } else if rest.starts_with("mm") {
            out.push_str("%M");
            rest = &rest[2..];
        } else if rest.starts_with("SS") {
            out.push_str("%S");
            rest = &rest[2..];
        } else {
            let c = rest.chars().next().unwrap();
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    (out, has_year)
}

fn try_format(value: &CellValue, pattern: &str, assume_year: Option<i32>) -> Option<NaiveDateTime> {
    let text = match value {
        CellValue::Text(s) => s.trim().to_string(),
        // 数值列配合 "YYYYMMDD" 一类纯数字格式串也可解析
        CellValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        _ => return None,
    };

    let (chrono_fmt, has_year) = translate_pattern(pattern);

    if has_year {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&text, &chrono_fmt) {
            return Some(dt);
        }
        return NaiveDate::parse_from_str(&text, &chrono_fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    // 无年份 token 的格式（如 MM-DD）需要补充年份
    let year = assume_year?;
    let full = format!("{} {}", year, text);
    let full_fmt = format!("%Y {}", chrono_fmt);
    NaiveDate::parse_from_str(&full, &full_fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ==========================================
// 第 3 层: 电子表格序列号
// ==========================================

fn try_excel_serial(value: &CellValue) -> Option<NaiveDateTime> {
    let serial = match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    excel_serial_to_datetime(serial)
}

/// 序列号 → 日期时间
///
/// 1900 纪元兼容性：
/// - 序列号 61 起以 1899-12-30 为基准（吸收 Lotus 的假闰日 1900-02-29）
/// - 序列号 1..=59 以 1899-12-31 为基准（1 → 1900-01-01）
/// - 序列号 60 对应不存在的 1900-02-29，按惯例落到 1900-02-28
/// 小数部分为一天内的时间
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) || serial.is_nan() {
        return None;
    }

    let days = serial.trunc() as i64;
    let frac = serial.fract();

    let date = if days >= 61 {
        let base = NaiveDate::from_ymd_opt(EXCEL_EPOCH.0, EXCEL_EPOCH.1, EXCEL_EPOCH.2)?;
        base.checked_add_signed(Duration::days(days))?
    } else if days == 60 {
        NaiveDate::from_ymd_opt(1900, 2, 28)?
    } else {
        let base = NaiveDate::from_ymd_opt(1899, 12, 31)?;
        base.checked_add_signed(Duration::days(days))?
    };

    let secs = (frac * 86_400.0).round() as i64;
    let dt = date.and_hms_opt(0, 0, 0)?;
    dt.checked_add_signed(Duration::seconds(secs))
}

// ==========================================
// 第 4 层: 自由文本启发式
// ==========================================

/// 常见完整格式（无歧义，直接尝试）
const KNOWN_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y年%m月%d日",
];

fn try_heuristic(text: &str, assume_year: Option<i32>, day_first: bool) -> Option<NaiveDateTime> {
    let t = text.trim();

    for fmt in KNOWN_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt);
        }
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // 数字分段解析（歧义用 day_first 裁决）
    let parts: Vec<&str> = t
        .split(|c: char| c == '/' || c == '-' || c == '.' || c == ' ')
        .filter(|p| !p.is_empty())
        .collect();
    let nums: Vec<i64> = parts
        .iter()
        .map(|p| p.parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    match nums.len() {
        3 => {
            let (y, a, b) = if parts[0].len() == 4 {
                // 年在前: Y-M-D
                (nums[0] as i32, nums[1] as u32, nums[2] as u32)
            } else {
                // 年在后（4 位或 2 位）
                let mut year = nums[2] as i32;
                if parts[2].len() <= 2 {
                    year += 2000;
                }
                (year, nums[0] as u32, nums[1] as u32)
            };

            if parts[0].len() == 4 {
                // 年在前时始终按 月-日 顺序
                return make_date(y, a, b);
            }
            let (day, month) = if day_first { (a, b) } else { (b, a) };
            make_date(y, month, day)
                // 无效时尝试另一种解释（如 13 不可能是月份）
                .or_else(|| make_date(y, day, month))
        }
        2 => {
            let year = assume_year?;
            let (a, b) = (nums[0] as u32, nums[1] as u32);
            let (day, month) = if day_first { (a, b) } else { (b, a) };
            make_date(year, month, day).or_else(|| make_date(year, day, month))
        }
        _ => None,
    }
}

fn make_date(year: i32, month: u32, day: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_blank_input_no_tier() {
        let r = resolve(&CellValue::Empty, None, None, true);
        assert_eq!(r.value, None);
        assert_eq!(r.tier, None);

        let r = resolve(&text("   "), None, None, true);
        assert_eq!(r.tier, None);
    }

    #[test]
    fn test_native_roundtrip() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let r = resolve(&CellValue::DateTime(dt), None, None, true);
        assert_eq!(r.value, Some(dt));
        assert_eq!(r.tier, Some(DateTier::Native));
    }

    #[test]
    fn test_format_hint_wins_over_serial() {
        // "20240105" 同时是合法序列号数字，格式串必须优先
        let r = resolve(&text("20240105"), Some("YYYYMMDD"), None, true);
        assert_eq!(r.tier, Some(DateTier::Format));
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_format_mm_dd_with_assumed_year() {
        let r = resolve(&text("03-15"), Some("MM-DD"), Some(2024), true);
        assert_eq!(r.tier, Some(DateTier::Format));
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_format_hint_failure_falls_through() {
        // 格式串不匹配时退到序列号层
        let r = resolve(&CellValue::Number(45000.0), Some("YYYY-MM-DD"), None, true);
        assert_eq!(r.tier, Some(DateTier::ExcelSerial));
    }

    #[test]
    fn test_excel_serial_typical() {
        // 45292 = 2024-01-01
        let r = resolve(&CellValue::Number(45292.0), None, None, true);
        assert_eq!(r.tier, Some(DateTier::ExcelSerial));
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_excel_serial_fraction_is_time() {
        // 0.5 = 正午
        let dt = excel_serial_to_datetime(45292.5).unwrap();
        assert_eq!(dt.time(), chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_excel_serial_pre_march_1900_quirk() {
        // 序列号 1 = 1900-01-01；59 = 1900-02-28；60 落到 1900-02-28（假闰日）；61 = 1900-03-01
        assert_eq!(
            excel_serial_to_datetime(1.0).unwrap().date(),
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
        );
        assert_eq!(
            excel_serial_to_datetime(59.0).unwrap().date(),
            NaiveDate::from_ymd_opt(1900, 2, 28).unwrap()
        );
        assert_eq!(
            excel_serial_to_datetime(60.0).unwrap().date(),
            NaiveDate::from_ymd_opt(1900, 2, 28).unwrap()
        );
        assert_eq!(
            excel_serial_to_datetime(61.0).unwrap().date(),
            NaiveDate::from_ymd_opt(1900, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_excel_serial_string_form() {
        let r = resolve(&text("45292"), None, None, true);
        assert_eq!(r.tier, Some(DateTier::ExcelSerial));
    }

    #[test]
    fn test_heuristic_day_first_ambiguity() {
        let r = resolve(&text("01/02/2024"), None, None, true);
        assert_eq!(r.tier, Some(DateTier::Heuristic));
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );

        let r = resolve(&text("01/02/2024"), None, None, false);
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_heuristic_unambiguous_overrides_flag() {
        // 13 不可能是月份，day_first=false 也应解析为 12月13日
        let r = resolve(&text("13/12/2024"), None, None, false);
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 12, 13).unwrap()
        );
    }

    #[test]
    fn test_heuristic_iso_text() {
        let r = resolve(&text("2024-01-15"), None, None, true);
        assert_eq!(r.tier, Some(DateTier::Heuristic));
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_heuristic_chinese_date() {
        let r = resolve(&text("2024年1月5日"), None, None, true);
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_two_part_needs_assume_year() {
        let r = resolve(&text("05/03"), None, Some(2024), true);
        assert_eq!(
            r.value.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );

        let r = resolve(&text("05/03"), None, None, true);
        assert_eq!(r.tier, Some(DateTier::Failed));
    }

    #[test]
    fn test_all_tiers_fail() {
        let r = resolve(&text("not a date"), None, None, true);
        assert_eq!(r.value, None);
        assert_eq!(r.tier, Some(DateTier::Failed));
    }
}
