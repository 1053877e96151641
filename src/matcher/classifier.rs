// ==========================================
// 服装生产数据接入平台 - 语义分类器接口 (tier: llm)
// ==========================================
// 职责: 定义外部语义分类器契约（不包含真实实现）
// 红线: 实现由启动配置显式注入（依赖注入），禁止隐式回退；
//       编排器调用必须受超时约束，失败一律降级为 unmatched
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ==========================================
// 分类器错误
// ==========================================
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("分类器调用超时")]
    Timeout,

    #[error("分类器不可用: {0}")]
    Unavailable(String),

    #[error("分类器响应格式错误: {0}")]
    MalformedResponse(String),
}

// ==========================================
// 结构化推断结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInference {
    pub header_row: usize,
    pub detected_headers: Vec<String>,
    /// 源表头 → 标准字段（None 表示明确“无匹配”）
    pub column_mappings: HashMap<String, Option<String>>,
    pub confidence_scores: HashMap<String, f64>,
    pub recommendations: Vec<String>,
    pub suggested_widgets: Vec<String>,
    pub raw_response: Option<String>,
}

/// 单列猜测
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnGuess {
    pub field: String,
    pub confidence: f64,
    pub reasoning: String,
}

// ==========================================
// SchemaClassifier Trait
// ==========================================
// 实现者: 生产环境的 LLM 客户端（私有，不在本仓库）/ NoopClassifier
#[async_trait]
pub trait SchemaClassifier: Send + Sync {
    /// 整表推断：样本行（含表头候选）+ 文件名提示
    async fn infer_schema(
        &self,
        sample_rows: &[Vec<String>],
        filename: &str,
        type_hint: Option<&str>,
    ) -> Result<SchemaInference, ClassifierError>;

    /// 单列推断：确定性层级全部未命中后的最后手段
    ///
    /// # 返回
    /// - Ok(Some(guess)): 带置信度的猜测
    /// - Ok(None): 明确判定无匹配
    async fn classify_column(
        &self,
        header: &str,
        samples: &[String],
    ) -> Result<Option<ColumnGuess>, ClassifierError>;
}

// ==========================================
// NoopClassifier - 确定性桩实现
// ==========================================
// 用途: 无分类器环境下保持契约可用，恒定返回“无匹配”，
//       证明编排器在分类器缺席时优雅降级
pub struct NoopClassifier;

#[async_trait]
impl SchemaClassifier for NoopClassifier {
    async fn infer_schema(
        &self,
        sample_rows: &[Vec<String>],
        _filename: &str,
        _type_hint: Option<&str>,
    ) -> Result<SchemaInference, ClassifierError> {
        let detected_headers = sample_rows.first().cloned().unwrap_or_default();
        let column_mappings = detected_headers
            .iter()
            .map(|h| (h.clone(), None))
            .collect();
        Ok(SchemaInference {
            header_row: 0,
            detected_headers,
            column_mappings,
            confidence_scores: HashMap::new(),
            recommendations: Vec::new(),
            suggested_widgets: Vec::new(),
            raw_response: None,
        })
    }

    async fn classify_column(
        &self,
        _header: &str,
        _samples: &[String],
    ) -> Result<Option<ColumnGuess>, ClassifierError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_classifier_always_no_match() {
        let classifier = NoopClassifier;
        let guess = classifier
            .classify_column("mystery_column", &["1".to_string()])
            .await
            .unwrap();
        assert!(guess.is_none());

        let inference = classifier
            .infer_schema(&[vec!["a".to_string(), "b".to_string()]], "file.csv", None)
            .await
            .unwrap();
        assert_eq!(inference.detected_headers.len(), 2);
        assert!(inference.column_mappings.values().all(|v| v.is_none()));
    }
}
