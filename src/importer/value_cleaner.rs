// ==========================================
// 服装生产数据接入平台 - 数值清洗
// ==========================================
// 职责: 把带百分号/千分位等装饰的字符串强制为标准数值类型
// 口径: 百分比字段统一为百分比数值（85% → 85.0，0.90 → 90.0）
// ==========================================

use crate::domain::import::CellValue;
use crate::domain::types::CanonicalType;

/// 文本清洗（TRIM，空串归一为 None）
pub fn clean_text(value: &CellValue) -> Option<String> {
    if value.is_blank() {
        return None;
    }
    let s = value.display_string();
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 数值清洗（千分位/空格容忍）
///
/// # 返回
/// - Ok(None): 空白
/// - Ok(Some(f64)): 清洗成功
/// - Err(原始值): 无法解析
pub fn clean_numeric(value: &CellValue) -> Result<Option<f64>, String> {
    match value {
        CellValue::Empty => Ok(None),
        CellValue::Number(n) => Ok(Some(*n)),
        CellValue::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        CellValue::DateTime(_) => Err(value.display_string()),
        CellValue::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            let normalized: String = t.chars().filter(|c| *c != ',' && *c != ' ').collect();
            normalized
                .parse::<f64>()
                .map(Some)
                .map_err(|_| s.clone())
        }
    }
}

/// 百分比清洗，统一为百分比口径
///
/// 规则:
/// - 带 '%' 后缀: 去掉后缀按数值解析（"85%" → 85.0）
/// - 无后缀且 0 < v <= 1: 视为小数占比（0.90 → 90.0）
/// - 无后缀且 v > 1: 已是百分比口径，原样返回
pub fn clean_percentage(value: &CellValue) -> Result<Option<f64>, String> {
    match value {
        CellValue::Empty => Ok(None),
        CellValue::Number(n) => Ok(Some(normalize_fraction(*n))),
        CellValue::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            if let Some(stripped) = t.strip_suffix('%') {
                let cleaned: String = stripped
                    .chars()
                    .filter(|c| *c != ',' && *c != ' ')
                    .collect();
                return cleaned.parse::<f64>().map(Some).map_err(|_| s.clone());
            }
            let cleaned: String = t.chars().filter(|c| *c != ',' && *c != ' ').collect();
            cleaned
                .parse::<f64>()
                .map(|v| Some(normalize_fraction(v)))
                .map_err(|_| s.clone())
        }
        _ => Err(value.display_string()),
    }
}

fn normalize_fraction(v: f64) -> f64 {
    if v > 0.0 && v <= 1.0 {
        v * 100.0
    } else {
        v
    }
}

/// 按标准字段类型分派清洗
pub fn coerce(value: &CellValue, typ: CanonicalType) -> Result<CleanedValue, String> {
    match typ {
        CanonicalType::Text | CanonicalType::Date => Ok(CleanedValue::Text(clean_text(value))),
        CanonicalType::Numeric => clean_numeric(value).map(CleanedValue::Numeric),
        CanonicalType::Percentage => clean_percentage(value).map(CleanedValue::Numeric),
    }
}

/// 清洗结果（日期列不在此处理，见 date_resolver）
#[derive(Debug, Clone, PartialEq)]
pub enum CleanedValue {
    Text(Option<String>),
    Numeric(Option<f64>),
}
