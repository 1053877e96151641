// ==========================================
// 服装生产数据接入平台 - 别名学习环
// ==========================================
// 职责: 确认映射时比对编排器提案与用户终稿，把纠正沉淀为学习别名
// 作用域: 纠正默认落在最窄作用域（factory）
// ==========================================

use crate::domain::import::MatchReport;
use crate::domain::mapping::ScopeChain;
use crate::domain::types::{AliasScope, MatchTier};
use crate::matcher::registry::normalize_header;
use crate::repository::alias_repo::{AliasRepository, LearnOutcome};
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct AliasLearner {
    alias_repo: Arc<AliasRepository>,
}

/// 一次确认动作产生的学习汇总
#[derive(Debug, Default, Clone)]
pub struct LearnSummary {
    pub learned: usize,
    pub reaffirmed: usize,
    pub corrected: usize,
    pub disabled: usize,
}

impl AliasLearner {
    pub fn new(alias_repo: Arc<AliasRepository>) -> Self {
        Self { alias_repo }
    }

    /// 处理用户确认
    ///
    /// 对每列比较编排器提案与用户终稿：
    /// - 终稿与提案不同（用户纠正）→ 在 factory 作用域学习该别名
    /// - 终稿为忽略（None）→ 不学习
    /// - 提案本就来自学习别名且再次被改 → learn() 内部累计纠正并按阈值停用
    pub fn process_confirmation(
        &self,
        proposal: &MatchReport,
        final_mapping: &HashMap<String, Option<String>>,
        scope: &ScopeChain,
    ) -> RepositoryResult<LearnSummary> {
        let mut summary = LearnSummary::default();

        for col in &proposal.columns {
            let final_field = match final_mapping.get(&col.source_header) {
                Some(Some(field)) => field,
                // 用户忽略或未提交该列
                _ => continue,
            };

            let proposed = col.target_field.as_deref();
            if proposed == Some(final_field.as_str()) && col.tier != MatchTier::Unmatched {
                continue; // 提案即终稿，无需学习
            }

            let alias = normalize_header(&col.source_header);
            if alias.is_empty() {
                continue;
            }

            let outcome =
                self.alias_repo
                    .learn(AliasScope::Factory, &scope.factory_id, &alias, final_field)?;
            match outcome {
                LearnOutcome::Inserted => summary.learned += 1,
                LearnOutcome::Reaffirmed => summary.reaffirmed += 1,
                LearnOutcome::Corrected => summary.corrected += 1,
                LearnOutcome::Disabled => summary.disabled += 1,
            }
            info!(
                header = %col.source_header,
                alias = %alias,
                field = %final_field,
                outcome = ?outcome,
                "别名学习"
            );
        }

        Ok(summary)
    }
}
