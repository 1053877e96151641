// ==========================================
// 服装生产数据接入平台 - 引擎层错误类型
// ==========================================
// 职责: 导入生命周期的业务错误，聚合仓储/导入层错误
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 生命周期错误 =====
    #[error("导入记录不存在: {0}")]
    ImportNotFound(String),

    #[error("导入已晋升，拒绝重复晋升: {0}")]
    AlreadyPromoted(String),

    #[error("导入状态不允许该操作: import_id={import_id}, status={status}, operation={operation}")]
    InvalidLifecycleState {
        import_id: String,
        status: String,
        operation: String,
    },

    #[error("数据源缺少激活的映射版本: {0}")]
    NoActiveMapping(String),

    #[error("目标字段未注册: {0}")]
    UnknownTargetField(String),

    // ===== 上传错误 =====
    #[error("MIME 类型不支持: {0}")]
    UnsupportedMimeType(String),

    #[error("上传文件为空")]
    EmptyUpload,

    // ===== 聚合下层错误 =====
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

// 实现 From<std::io::Error>（上传文件落盘）
impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Import(ImportError::FileReadError(err.to_string()))
    }
}

// 实现 From<serde_json::Error>（匹配报告快照编解码）
impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InternalError(format!("JSON 编解码失败: {}", err))
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
