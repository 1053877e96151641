// ==========================================
// 服装生产数据接入平台 - 核心库
// ==========================================
// 系统定位: 服装工厂生产报表的接入核心（解析 → 匹配 → 确认 → 晋升）
// 技术栈: Rust + SQLite
// 原则: 人工最终控制权（自动匹配只产生提案，入库前必须人工确认）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 匹配层 - 表头 → 标准字段
pub mod matcher;

// 导入层 - 文件解析与清洗
pub mod importer;

// 引擎层 - 导入生命周期
pub mod engine;

// 配置层 - 可调阈值
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 对外门面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AliasScope, CanonicalType, DateTier, ImportStatus, IssueSeverity, MappingStatus, MatchTier,
};

// 领域实体
pub use domain::{
    AliasMapping, CellValue, ColumnMappingResult, DataQualityIssue, MatchReport, ProductionRecord,
    RawImport, SchemaMapping, ScopeChain, StagingRecord,
};

// 引擎与 API 门面
pub use api::{ApiError, ApiResult, ImportApi};
pub use engine::{EngineError, EngineResult, ImportLifecycleManager};

// 配置
pub use config::{ConfigManager, MatcherConfig, ValidatorConfig};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用名称
pub const APP_NAME: &str = "apparel-ingest";
