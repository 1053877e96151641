// ==========================================
// 服装生产数据接入平台 - 领域层
// ==========================================
// 职责: 实体与类型定义（无业务逻辑）
// ==========================================

pub mod import;
pub mod mapping;
pub mod production;
pub mod types;

// 重导出常用实体
pub use import::{
    CellValue, ColumnMappingResult, DataQualityIssue, MatchReport, MatchStats, RawImport,
    StagingRecord,
};
pub use mapping::{
    AliasMapping, ColumnMapEntry, ExtractionRules, SchemaMapping, ScopeChain,
    ALIAS_CORRECTION_DISABLE_THRESHOLD,
};
pub use production::ProductionRecord;
