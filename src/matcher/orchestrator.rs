// ==========================================
// 服装生产数据接入平台 - 匹配编排器
// ==========================================
// 瀑布顺序: hash → fuzzy → llm → unmatched，首个命中即止
// 分档: >=0.9 auto_mapped / 0.6~0.9 needs_review / 其余 needs_attention
// 纯度: 除读取学习别名库（含使用计数）外不改动任何状态
// ==========================================

use crate::config::MatcherConfig;
use crate::domain::import::ColumnMappingResult;
use crate::domain::mapping::ScopeChain;
use crate::domain::types::{MappingStatus, MatchTier};
use crate::matcher::classifier::SchemaClassifier;
use crate::matcher::fuzzy_matcher::FuzzyMatcher;
use crate::matcher::hash_matcher::HashMatcher;
use crate::matcher::registry::normalize_header;
use crate::repository::alias_repo::AliasRepository;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type OrchestratorResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub struct MatchingOrchestrator {
    hash: HashMatcher,
    fuzzy: FuzzyMatcher,
    classifier: Option<Arc<dyn SchemaClassifier>>,
    config: MatcherConfig,
}

impl MatchingOrchestrator {
    /// # 参数
    /// - classifier: 显式注入的语义分类器；None 表示未启用
    pub fn new(
        alias_repo: Arc<AliasRepository>,
        classifier: Option<Arc<dyn SchemaClassifier>>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            hash: HashMatcher::new(alias_repo),
            fuzzy: FuzzyMatcher::new(config.clone()),
            classifier,
            config,
        }
    }

    /// 对全部表头逐列执行瀑布匹配
    ///
    /// # 参数
    /// - headers: 表头字符串（原样，内部做规范化）
    /// - samples: 每列的样本值（前几个非空观测值）
    /// - scope: 学习别名查找的作用域链
    pub async fn match_columns(
        &self,
        headers: &[String],
        samples: &[Vec<String>],
        scope: &ScopeChain,
    ) -> OrchestratorResult<Vec<ColumnMappingResult>> {
        let mut results = Vec::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let column_samples = samples.get(idx).cloned().unwrap_or_default();
            let result = self.match_single(header, &column_samples, scope).await?;
            results.push(result);
        }
        Ok(results)
    }

    /// 单列瀑布匹配
    async fn match_single(
        &self,
        header: &str,
        samples: &[String],
        scope: &ScopeChain,
    ) -> OrchestratorResult<ColumnMappingResult> {
        let normalized = normalize_header(header);

        // 第 1 层: hash（命中置信度恒为 1.0）
        if let Some(hit) = self.hash.match_header(&normalized, scope)? {
            debug!(header, field = %hit.field, "hash 层命中");
            return Ok(ColumnMappingResult::new(
                header,
                Some(hit.field),
                1.0,
                MatchTier::Hash,
                None,
                None,
                samples.to_vec(),
                MappingStatus::AutoMapped,
            )?);
        }

        // 第 2 层: fuzzy
        if let Some(hit) = self.fuzzy.match_header(&normalized) {
            debug!(header, field = %hit.field, score = hit.score, "fuzzy 层命中");
            let status = self.band(hit.score);
            return Ok(ColumnMappingResult::new(
                header,
                Some(hit.field),
                hit.score,
                MatchTier::Fuzzy,
                Some(hit.score),
                None,
                samples.to_vec(),
                status,
            )?);
        }

        // 第 3 层: llm（仅确定性层全部未命中且已启用时）
        if self.config.classifier_enabled {
            if let Some(classifier) = &self.classifier {
                match tokio::time::timeout(
                    Duration::from_millis(self.config.classifier_timeout_ms),
                    classifier.classify_column(header, samples),
                )
                .await
                {
                    Ok(Ok(Some(guess))) => {
                        let confidence = guess.confidence.clamp(0.0, 1.0);
                        let status = self.band(confidence);
                        return Ok(ColumnMappingResult::new(
                            header,
                            Some(guess.field),
                            confidence,
                            MatchTier::Llm,
                            None,
                            Some(guess.reasoning),
                            samples.to_vec(),
                            status,
                        )?);
                    }
                    Ok(Ok(None)) => {
                        debug!(header, "分类器明确判定无匹配");
                    }
                    Ok(Err(e)) => {
                        // 分类器失败降级为未命中，绝不向上抛出
                        warn!(header, error = %e, "分类器调用失败，降级为 unmatched");
                    }
                    Err(_) => {
                        warn!(
                            header,
                            timeout_ms = self.config.classifier_timeout_ms,
                            "分类器调用超时，降级为 unmatched"
                        );
                    }
                }
            }
        }

        // 终态: unmatched（需用户指定，不是错误）
        Ok(ColumnMappingResult::new(
            header,
            None,
            0.0,
            MatchTier::Unmatched,
            None,
            None,
            samples.to_vec(),
            MappingStatus::NeedsAttention,
        )?)
    }

    /// 置信度分档
    fn band(&self, confidence: f64) -> MappingStatus {
        if confidence >= self.config.auto_map_confidence {
            MappingStatus::AutoMapped
        } else if confidence >= self.config.review_confidence {
            MappingStatus::NeedsReview
        } else {
            MappingStatus::NeedsAttention
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::classifier::{ClassifierError, ColumnGuess, SchemaInference};
    use crate::repository::init_schema;
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> Arc<AliasRepository> {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        Arc::new(AliasRepository::new(Arc::new(Mutex::new(conn))))
    }

    fn scope() -> ScopeChain {
        ScopeChain {
            factory_id: "F-01".to_string(),
            organization_id: "ORG-01".to_string(),
        }
    }

    #[tokio::test]
    async fn test_waterfall_stops_at_hash() {
        let orch = MatchingOrchestrator::new(setup(), None, MatcherConfig::default());
        let results = orch
            .match_columns(&["Output".to_string()], &[vec![]], &scope())
            .await
            .unwrap();
        assert_eq!(results[0].tier, MatchTier::Hash);
        assert_eq!(results[0].target_field.as_deref(), Some("actual_qty"));
        assert!((results[0].confidence() - 1.0).abs() < 1e-9);
        assert_eq!(results[0].status, MappingStatus::AutoMapped);
    }

    #[tokio::test]
    async fn test_fuzzy_fallback() {
        let orch = MatchingOrchestrator::new(setup(), None, MatcherConfig::default());
        let results = orch
            .match_columns(&["Actual Outputs".to_string()], &[vec![]], &scope())
            .await
            .unwrap();
        assert_eq!(results[0].tier, MatchTier::Fuzzy);
        assert_eq!(results[0].target_field.as_deref(), Some("actual_qty"));
    }

    #[tokio::test]
    async fn test_unmatched_terminal() {
        let orch = MatchingOrchestrator::new(setup(), None, MatcherConfig::default());
        let results = orch
            .match_columns(&["审批人签字栏".to_string()], &[vec![]], &scope())
            .await
            .unwrap();
        assert_eq!(results[0].tier, MatchTier::Unmatched);
        assert_eq!(results[0].status, MappingStatus::NeedsAttention);
    }

    /// 恒定失败的分类器（验证降级路径）
    struct FailingClassifier;

    #[async_trait]
    impl SchemaClassifier for FailingClassifier {
        async fn infer_schema(
            &self,
            _sample_rows: &[Vec<String>],
            _filename: &str,
            _type_hint: Option<&str>,
        ) -> Result<SchemaInference, ClassifierError> {
            Err(ClassifierError::Unavailable("下线维护".to_string()))
        }

        async fn classify_column(
            &self,
            _header: &str,
            _samples: &[String],
        ) -> Result<Option<ColumnGuess>, ClassifierError> {
            Err(ClassifierError::Unavailable("下线维护".to_string()))
        }
    }

    #[tokio::test]
    async fn test_classifier_failure_degrades_to_unmatched() {
        let config = MatcherConfig {
            classifier_enabled: true,
            ..MatcherConfig::default()
        };
        let orch =
            MatchingOrchestrator::new(setup(), Some(Arc::new(FailingClassifier)), config);
        let results = orch
            .match_columns(&["审批人签字栏".to_string()], &[vec![]], &scope())
            .await
            .unwrap();
        assert_eq!(results[0].tier, MatchTier::Unmatched);
    }

    /// 慢分类器（验证超时降级）
    struct SlowClassifier;

    #[async_trait]
    impl SchemaClassifier for SlowClassifier {
        async fn infer_schema(
            &self,
            _sample_rows: &[Vec<String>],
            _filename: &str,
            _type_hint: Option<&str>,
        ) -> Result<SchemaInference, ClassifierError> {
            Err(ClassifierError::Timeout)
        }

        async fn classify_column(
            &self,
            _header: &str,
            _samples: &[String],
        ) -> Result<Option<ColumnGuess>, ClassifierError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_timeout_degrades_to_unmatched() {
        let config = MatcherConfig {
            classifier_enabled: true,
            classifier_timeout_ms: 100,
            ..MatcherConfig::default()
        };
        let orch = MatchingOrchestrator::new(setup(), Some(Arc::new(SlowClassifier)), config);
        let results = orch
            .match_columns(&["审批人签字栏".to_string()], &[vec![]], &scope())
            .await
            .unwrap();
        assert_eq!(results[0].tier, MatchTier::Unmatched);
    }

    /// 高置信度猜测的分类器
    struct ConfidentClassifier;

    #[async_trait]
    impl SchemaClassifier for ConfidentClassifier {
        async fn infer_schema(
            &self,
            _sample_rows: &[Vec<String>],
            _filename: &str,
            _type_hint: Option<&str>,
        ) -> Result<SchemaInference, ClassifierError> {
            Err(ClassifierError::Unavailable("未实现".to_string()))
        }

        async fn classify_column(
            &self,
            _header: &str,
            _samples: &[String],
        ) -> Result<Option<ColumnGuess>, ClassifierError> {
            Ok(Some(ColumnGuess {
                field: "dhu".to_string(),
                confidence: 0.75,
                reasoning: "样本分布与百件疵点一致".to_string(),
            }))
        }
    }

    #[tokio::test]
    async fn test_classifier_guess_banded_needs_review() {
        let config = MatcherConfig {
            classifier_enabled: true,
            ..MatcherConfig::default()
        };
        let orch =
            MatchingOrchestrator::new(setup(), Some(Arc::new(ConfidentClassifier)), config);
        let results = orch
            .match_columns(&["质量指标甲".to_string()], &[vec![]], &scope())
            .await
            .unwrap();
        assert_eq!(results[0].tier, MatchTier::Llm);
        assert_eq!(results[0].status, MappingStatus::NeedsReview);
        assert!(results[0].reasoning.is_some());
    }
}
