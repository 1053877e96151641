// ==========================================
// 服装生产数据接入平台 - 表头行启发式判定
// ==========================================
// 职责: 在前若干行中为每行打“表头相似度”分，取最高者为表头行
// 规则: 短文本、非数值、标题样 token 加分；数值与空白减分
// ==========================================

use crate::domain::import::CellValue;

/// 参与打分的最大候选行数
const MAX_CANDIDATE_ROWS: usize = 10;

/// 判定表头行下标（相同分数取更靠前的行）
pub fn detect_header_row(rows: &[Vec<CellValue>]) -> usize {
    let candidates = rows.len().min(MAX_CANDIDATE_ROWS);
    let mut best_index = 0;
    let mut best_score = f64::MIN;

    for (idx, row) in rows.iter().take(candidates).enumerate() {
        let score = header_likeness(row);
        if score > best_score {
            best_score = score;
            best_index = idx;
        }
    }
    best_index
}

/// 单行的表头相似度
///
/// 每个非空单元格：
/// - 含字母/汉字且不可解析为数值 → +2
/// - 长度 <= 32 → +0.5（表头通常是短标签）
/// - 首字母大写或含下划线的标签样式 → +0.5
/// - 可解析为数值 → -1（数据行特征）
/// 空白单元格 → -0.5，最后按列数归一化
pub fn header_likeness(row: &[CellValue]) -> f64 {
    if row.is_empty() {
        return f64::MIN;
    }

    let mut score = 0.0;
    for cell in row {
        match cell {
            CellValue::Empty => score -= 0.5,
            CellValue::Number(_) | CellValue::DateTime(_) | CellValue::Bool(_) => score -= 1.0,
            CellValue::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    score -= 0.5;
                    continue;
                }
                if t.replace(',', "").parse::<f64>().is_ok() {
                    score -= 1.0;
                    continue;
                }
                score += 2.0;
                if t.chars().count() <= 32 {
                    score += 0.5;
                }
                if looks_like_label(t) {
                    score += 0.5;
                }
            }
        }
    }
    score / row.len() as f64
}

/// 标签样式: 首字符大写，或使用下划线/全中文的列名习惯
fn looks_like_label(s: &str) -> bool {
    if s.contains('_') {
        return true;
    }
    match s.chars().next() {
        Some(c) if c.is_uppercase() => true,
        Some(c) if !c.is_ascii() => true, // 中文等非 ASCII 列名
        _ => false,
    }
}
