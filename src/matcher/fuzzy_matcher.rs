// ==========================================
// 服装生产数据接入平台 - 模糊匹配层 (tier: fuzzy)
// ==========================================
// 职责: 规范化表头与全部标准字段变体的相似度打分
// 度量: token 排序比 与 局部子串比 取较优（strsim jaro-winkler 基础）
// 保护: 短标准名（如 "sam"）要求精确命中或近满分，防止巧合子串误匹配
// ==========================================

use crate::config::MatcherConfig;
use crate::matcher::registry;
use strsim::jaro_winkler;

#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub field: String,
    pub score: f64,
}

pub struct FuzzyMatcher {
    config: MatcherConfig,
}

impl FuzzyMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// 在全部变体中取最高分；低于置信度下限返回 None
    pub fn match_header(&self, normalized: &str) -> Option<FuzzyMatch> {
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<FuzzyMatch> = None;
        for (variation, field) in registry::all_variations() {
            let score = self.score_with_protection(normalized, &variation);
            if score <= 0.0 {
                continue;
            }
            match &best {
                Some(b) if b.score >= score => {}
                _ => {
                    best = Some(FuzzyMatch {
                        field: field.name.to_string(),
                        score,
                    })
                }
            }
        }

        best.filter(|m| m.score >= self.config.fuzzy_floor)
    }

    /// 单个变体打分，含短名保护
    fn score_with_protection(&self, header: &str, variation: &str) -> f64 {
        if variation.is_empty() {
            return 0.0;
        }

        if header == variation {
            return 1.0;
        }

        let score = similarity(header, variation);

        // 短名保护: 变体长度低于阈值时，非精确命中必须达到近满分
        if variation.chars().count() < self.config.short_name_len
            && score < self.config.short_name_bar
        {
            return 0.0;
        }
        score
    }
}

/// 相似度: max(token 排序比, 局部子串比)，范围 [0,1]
///
/// 局部子串比仅在两串确有词面交集（共享完整 token 或整串包含）时参与，
/// 任意无关表头不得靠窗口巧合越过下限
pub fn similarity(a: &str, b: &str) -> f64 {
    let token_sort = token_sort_ratio(a, b);
    if !has_lexical_overlap(a, b) {
        return token_sort;
    }
    token_sort.max(partial_ratio(a, b))
}

/// 词面交集: 一方整串包含另一方，或共享至少一个完整 token
fn has_lexical_overlap(a: &str, b: &str) -> bool {
    if a.contains(b) || b.contains(a) {
        return true;
    }
    let a_tokens: Vec<&str> = a.split('_').filter(|t| !t.is_empty()).collect();
    b.split('_')
        .filter(|t| !t.is_empty())
        .any(|t| a_tokens.contains(&t))
}

/// token 排序后整串比较（容忍词序颠倒: "qty output" ≈ "output qty"）
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    jaro_winkler(&sort_tokens(a), &sort_tokens(b))
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split('_').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// 局部子串比: 短串对长串所有等长窗口取最优（容忍前后缀噪音）
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long): (Vec<char>, Vec<char>) = if a.chars().count() <= b.chars().count() {
        (a.chars().collect(), b.chars().collect())
    } else {
        (b.chars().collect(), a.chars().collect())
    };

    if short.is_empty() {
        return 0.0;
    }
    if short.len() == long.len() {
        return jaro_winkler(
            &short.iter().collect::<String>(),
            &long.iter().collect::<String>(),
        );
    }

    let short_str: String = short.iter().collect();
    let mut best: f64 = 0.0;
    for window in long.windows(short.len()) {
        let w: String = window.iter().collect();
        best = best.max(jaro_winkler(&short_str, &w));
        if best >= 1.0 {
            break;
        }
    }
    // 窗口命中只说明包含关系，按长度占比折减避免短片段满分
    let len_ratio = short.len() as f64 / long.len() as f64;
    best * (0.6 + 0.4 * len_ratio)
}
