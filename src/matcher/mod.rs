// ==========================================
// 服装生产数据接入平台 - 匹配层
// ==========================================
// 职责: 表头 → 标准字段的瀑布式匹配
// 层级: hash（精确/别名）→ fuzzy（相似度）→ llm（语义分类器）
// ==========================================

pub mod classifier;
pub mod fuzzy_matcher;
pub mod hash_matcher;
pub mod orchestrator;
pub mod registry;

pub use classifier::{
    ClassifierError, ColumnGuess, NoopClassifier, SchemaClassifier, SchemaInference,
};
pub use fuzzy_matcher::{FuzzyMatch, FuzzyMatcher};
pub use hash_matcher::{HashMatch, HashMatcher, HashSource};
pub use orchestrator::MatchingOrchestrator;
pub use registry::{
    all_variations, find_by_alias, find_field, normalize_header, FieldDef, CANONICAL_FIELDS,
};
