// ==========================================
// 服装生产数据接入平台 - 导入 API
// ==========================================
// 职责: 封装导入生命周期引擎，暴露可序列化的请求/响应 DTO
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::import::{DataQualityIssue, MatchStats, RawImport};
use crate::domain::mapping::ScopeChain;
use crate::domain::production::ProductionRecord;
use crate::engine::lifecycle::ImportLifecycleManager;
use crate::matcher::classifier::SchemaClassifier;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 上传请求
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub factory_id: String,
    pub line_id: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(default)]
    pub content: Vec<u8>,
}

/// 上传响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub import_id: String,
    pub status: String,
    /// 同产线同内容已存在时为 true（复用既有导入）
    pub deduplicated: bool,
}

/// 单列匹配视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMappingView {
    pub source_header: String,
    pub target_field: Option<String>,
    pub confidence: f64,
    pub tier: String,
    pub status: String,
    pub reasoning: Option<String>,
    pub sample_values: Vec<String>,
}

/// 解析响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub import_id: String,
    pub header_row: usize,
    pub columns: Vec<ColumnMappingView>,
    pub stats: MatchStats,
}

/// 预览行（原值与清洗后记录并排，供用户对照判断映射是否正确）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRow {
    pub row_index: usize,
    /// 源表头 → 原始单元格串
    pub raw: HashMap<String, String>,
    pub record: ProductionRecord,
    pub issues: Vec<DataQualityIssue>,
}

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub import_id: String,
    pub from_active_mapping: bool,
    pub scanned_rows: usize,
    pub rows: Vec<PreviewRow>,
    pub rejected: Vec<RejectedRow>,
}

/// 确认请求
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmRequest {
    /// 源表头 → 最终字段；None 表示忽略该列；缺席表头沿用提案
    pub mapping: HashMap<String, Option<String>>,
    /// 时间列显式格式串（如 "YYYY-MM-DD"）
    pub time_format: Option<String>,
}

/// 确认响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub import_id: String,
    pub mapping_id: String,
    pub version_no: i32,
    pub aliases_learned: usize,
    pub aliases_corrected: usize,
    pub aliases_disabled: usize,
}

/// 被剔除行视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRow {
    pub row_index: usize,
    pub reason: String,
}

/// 晋升响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteResponse {
    pub import_id: String,
    pub scanned_rows: usize,
    pub promoted: usize,
    pub rejected: Vec<RejectedRow>,
}

/// 导入详情视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportView {
    pub import_id: String,
    pub factory_id: String,
    pub line_id: String,
    pub original_filename: String,
    pub status: String,
    pub file_size: u64,
    pub failure_reason: Option<String>,
}

impl From<&RawImport> for ImportView {
    fn from(i: &RawImport) -> Self {
        Self {
            import_id: i.id.clone(),
            factory_id: i.factory_id.clone(),
            line_id: i.line_id.clone(),
            original_filename: i.original_filename.clone(),
            status: i.status.to_string(),
            file_size: i.file_size,
            failure_reason: i.failure_reason.clone(),
        }
    }
}

// ==========================================
// ImportApi - 导入门面
// ==========================================

/// 导入API
///
/// 职责：
/// 1. 生命周期操作的对外入口（上传/解析/预览/确认/晋升/清除）
/// 2. 领域对象 ↔ DTO 转换
/// 3. 错误码归并（见 api::error）
pub struct ImportApi {
    manager: ImportLifecycleManager,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    ///
    /// # 参数
    /// - conn: 共享数据库连接
    /// - classifier: 语义分类器（显式注入，None 表示未启用）
    /// - upload_dir: 上传文件落盘目录
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        classifier: Option<Arc<dyn SchemaClassifier>>,
        upload_dir: PathBuf,
    ) -> ApiResult<Self> {
        let manager = ImportLifecycleManager::new(conn, classifier, upload_dir)?;
        Ok(Self { manager })
    }

    /// 上传文件
    pub fn upload(&self, req: &UploadRequest) -> ApiResult<UploadResponse> {
        if req.factory_id.trim().is_empty() || req.line_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "factory_id 与 line_id 不能为空".to_string(),
            ));
        }
        let outcome = self.manager.upload(
            &req.factory_id,
            &req.line_id,
            &req.filename,
            &req.mime_type,
            &req.content,
        )?;
        Ok(UploadResponse {
            import_id: outcome.import.id,
            status: outcome.import.status.to_string(),
            deduplicated: outcome.deduplicated,
        })
    }

    /// 解析文件并执行列匹配
    pub async fn process(&self, import_id: &str, scope: &ScopeChain) -> ApiResult<ProcessResponse> {
        let report = self.manager.process(import_id, scope).await?;
        Ok(ProcessResponse {
            import_id: import_id.to_string(),
            header_row: report.header_row_index,
            columns: report
                .columns
                .iter()
                .map(|c| ColumnMappingView {
                    source_header: c.source_header.clone(),
                    target_field: c.target_field.clone(),
                    confidence: c.confidence(),
                    tier: c.tier.to_string(),
                    status: c.status.to_string(),
                    reasoning: c.reasoning.clone(),
                    sample_values: c.sample_values.clone(),
                })
                .collect(),
            stats: report.stats,
        })
    }

    /// 干跑预览（不产生任何写入）
    pub fn preview(&self, import_id: &str, limit: usize) -> ApiResult<PreviewResponse> {
        let outcome = self.manager.preview(import_id, limit)?;
        let mut raw_rows = outcome.raw_rows;
        Ok(PreviewResponse {
            import_id: import_id.to_string(),
            from_active_mapping: outcome.from_active_mapping,
            scanned_rows: outcome.build.scanned_rows,
            rows: outcome
                .build
                .records
                .into_iter()
                .map(|(record, issues)| PreviewRow {
                    row_index: record.source_row_index,
                    raw: raw_rows
                        .remove(&record.source_row_index)
                        .unwrap_or_default(),
                    record,
                    issues,
                })
                .collect(),
            rejected: outcome
                .build
                .row_errors
                .into_iter()
                .map(|e| RejectedRow {
                    row_index: e.row_index,
                    reason: e.reason,
                })
                .collect(),
        })
    }

    /// 确认列映射（落新版本 + 学习纠正）
    pub fn confirm(
        &self,
        import_id: &str,
        req: &ConfirmRequest,
        scope: &ScopeChain,
    ) -> ApiResult<ConfirmResponse> {
        let (mapping, summary) =
            self.manager
                .confirm(import_id, &req.mapping, req.time_format.clone(), scope)?;
        Ok(ConfirmResponse {
            import_id: import_id.to_string(),
            mapping_id: mapping.id,
            version_no: mapping.version_no,
            aliases_learned: summary.learned,
            aliases_corrected: summary.corrected,
            aliases_disabled: summary.disabled,
        })
    }

    /// 晋升为正式生产记录
    pub fn promote(&self, import_id: &str) -> ApiResult<PromoteResponse> {
        let summary = self.manager.promote(import_id)?;
        Ok(PromoteResponse {
            import_id: import_id.to_string(),
            scanned_rows: summary.scanned_rows,
            promoted: summary.promoted,
            rejected: summary
                .rejected
                .into_iter()
                .map(|e| RejectedRow {
                    row_index: e.row_index,
                    reason: e.reason,
                })
                .collect(),
        })
    }

    /// 清除导入（暂存行与落盘文件一并删除）
    pub fn purge(&self, import_id: &str) -> ApiResult<()> {
        Ok(self.manager.purge(import_id)?)
    }

    /// 查询导入详情
    pub fn get_import(&self, import_id: &str) -> ApiResult<ImportView> {
        let import = self
            .manager
            .find_import(import_id)?
            .ok_or_else(|| ApiError::NotFound(format!("导入记录 {}", import_id)))?;
        Ok(ImportView::from(&import))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::init_schema;
    use tempfile::TempDir;

    fn setup() -> (ImportApi, TempDir) {
        let dir = TempDir::new().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let api = ImportApi::new(
            Arc::new(Mutex::new(conn)),
            None,
            dir.path().join("uploads"),
        )
        .unwrap();
        (api, dir)
    }

    fn scope() -> ScopeChain {
        ScopeChain {
            factory_id: "F-01".to_string(),
            organization_id: "ORG-01".to_string(),
        }
    }

    fn upload_request() -> UploadRequest {
        UploadRequest {
            factory_id: "F-01".to_string(),
            line_id: "LINE-01".to_string(),
            filename: "daily.csv".to_string(),
            mime_type: "text/csv".to_string(),
            content: b"Date,Output\n2024-01-05,500\n".to_vec(),
        }
    }

    #[test]
    fn test_upload_validates_identifiers() {
        let (api, _dir) = setup();
        let mut req = upload_request();
        req.factory_id = " ".to_string();
        let err = api.upload(&req).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[tokio::test]
    async fn test_upload_process_roundtrip() {
        let (api, _dir) = setup();
        let uploaded = api.upload(&upload_request()).unwrap();
        assert_eq!(uploaded.status, "uploaded");

        let processed = api.process(&uploaded.import_id, &scope()).await.unwrap();
        assert_eq!(processed.columns.len(), 2);
        assert!(processed.stats.auto_mapped >= 1);

        let view = api.get_import(&uploaded.import_id).unwrap();
        assert_eq!(view.status, "processed");
    }

    #[test]
    fn test_unknown_import_is_not_found() {
        let (api, _dir) = setup();
        let err = api.get_import("no-such-id").unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
