// ==========================================
// 服装生产数据接入平台 - API层错误类型
// ==========================================
// 职责: 把引擎/仓储层错误转换为带稳定错误码的外层错误
// 说明: code() 是对外契约，新增错误必须落在既有码或显式扩码
// ==========================================

use crate::engine::error::EngineError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("状态冲突: {0}")]
    Conflict(String),

    #[error("导入已晋升，拒绝重复晋升: {0}")]
    AlreadyPromoted(String),

    #[error("不支持的文件类型: {0}")]
    UnsupportedMediaType(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 稳定错误码（对外契约，前端按码分支）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::AlreadyPromoted(_) => "already_promoted",
            ApiError::UnsupportedMediaType(_) => "unsupported_media_type",
            ApiError::InternalError(_) => "internal_error",
        }
    }
}

// ==========================================
// 从 EngineError 转换
// 目的: 引擎层业务错误归并到稳定错误码
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ImportNotFound(id) => ApiError::NotFound(format!("导入记录 {}", id)),
            EngineError::AlreadyPromoted(id) => ApiError::AlreadyPromoted(id),
            EngineError::InvalidLifecycleState {
                import_id,
                status,
                operation,
            } => ApiError::Conflict(format!(
                "导入 {} 处于 {} 状态，不允许 {}",
                import_id, status, operation
            )),
            EngineError::NoActiveMapping(ds) => {
                ApiError::Conflict(format!("数据源 {} 缺少激活的映射版本", ds))
            }
            EngineError::UnknownTargetField(field) => {
                ApiError::InvalidInput(format!("目标字段 {} 未注册", field))
            }
            EngineError::UnsupportedMimeType(mime) => ApiError::UnsupportedMediaType(mime),
            EngineError::EmptyUpload => ApiError::InvalidInput("上传文件为空".to_string()),
            EngineError::Import(e) => match e {
                ImportError::FileNotFound(p) => ApiError::NotFound(format!("文件 {}", p)),
                ImportError::UnsupportedFormat(ext) => ApiError::UnsupportedMediaType(ext),
                ImportError::EmptyFile => ApiError::InvalidInput("文件内容为空".to_string()),
                ImportError::CsvParseError(msg) | ImportError::ExcelParseError(msg) => {
                    ApiError::InvalidInput(format!("文件解析失败: {}", msg))
                }
                other => ApiError::InternalError(other.to_string()),
            },
            EngineError::Repository(e) => e.into(),
            EngineError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::Conflict(format!("状态迁移不允许: {} → {}", from, to))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
