// ==========================================
// 服装生产数据接入平台 - API层
// ==========================================
// 职责: 对外门面（DTO 转换 + 稳定错误码）
// ==========================================

pub mod error;
pub mod import_api;

pub use error::{ApiError, ApiResult};
pub use import_api::{
    ConfirmRequest, ConfirmResponse, ImportApi, ImportView, PreviewResponse, ProcessResponse,
    PromoteResponse, UploadRequest, UploadResponse,
};
