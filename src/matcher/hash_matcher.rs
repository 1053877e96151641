// ==========================================
// 服装生产数据接入平台 - 精确/别名匹配层 (tier: hash)
// ==========================================
// 职责: 规范化表头在静态别名表与学习别名库中的 O(1) 查找
// 契约: 命中置信度恒为 1.0；未命中返回 None（不是错误）
// ==========================================

use crate::domain::mapping::ScopeChain;
use crate::matcher::registry;
use crate::repository::alias_repo::AliasRepository;
use crate::repository::error::RepositoryResult;
use std::sync::Arc;

/// hash 层命中来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashSource {
    /// 静态注册表别名
    Static,
    /// 学习别名（含别名记录 id）
    Learned { alias_id: String },
}

#[derive(Debug, Clone)]
pub struct HashMatch {
    pub field: String,
    pub source: HashSource,
}

pub struct HashMatcher {
    alias_repo: Arc<AliasRepository>,
}

impl HashMatcher {
    pub fn new(alias_repo: Arc<AliasRepository>) -> Self {
        Self { alias_repo }
    }

    /// 查找规范化表头
    ///
    /// 顺序: 静态别名表 → 学习别名库（factory > organization > global）
    /// 学习别名命中时记一次使用
    pub fn match_header(
        &self,
        normalized: &str,
        scope: &ScopeChain,
    ) -> RepositoryResult<Option<HashMatch>> {
        if normalized.is_empty() {
            return Ok(None);
        }

        if let Some(field) = registry::find_by_alias(normalized) {
            return Ok(Some(HashMatch {
                field: field.name.to_string(),
                source: HashSource::Static,
            }));
        }

        if let Some(alias) = self.alias_repo.find_for_scope_chain(
            normalized,
            &scope.factory_id,
            &scope.organization_id,
        )? {
            self.alias_repo.record_usage(&alias.id)?;
            return Ok(Some(HashMatch {
                field: alias.canonical_field,
                source: HashSource::Learned { alias_id: alias.id },
            }));
        }

        Ok(None)
    }
}
