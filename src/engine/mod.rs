// ==========================================
// 服装生产数据接入平台 - 引擎层
// ==========================================
// 职责: 导入生命周期编排（上传/解析/预览/确认/晋升/清除）
// ==========================================

pub mod alias_learning;
pub mod error;
pub mod lifecycle;
pub mod promoter;

pub use alias_learning::{AliasLearner, LearnSummary};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{
    ImportLifecycleManager, PreviewOutcome, PromoteSummary, UploadOutcome,
};
pub use promoter::{ProductionPromoter, PromotionBuild, RowError};
