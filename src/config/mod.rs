// ==========================================
// 服装生产数据接入平台 - 配置层
// ==========================================
// 职责: 可调阈值的加载与快照
// ==========================================

pub mod config_manager;

pub use config_manager::{ConfigManager, MatcherConfig, ValidatorConfig};
