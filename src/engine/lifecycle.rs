// ==========================================
// 服装生产数据接入平台 - 导入生命周期管理器
// ==========================================
// 状态机: uploaded → processed → confirmed → promoted（failed 任意可达）
// 职责: 上传去重 / 解析匹配 / 预览 / 确认学习 / 单事务晋升 / 清除
// ==========================================

use crate::config::ConfigManager;
use crate::domain::import::{MatchReport, RawImport, StagingRecord};
use crate::domain::mapping::{ColumnMapEntry, ExtractionRules, SchemaMapping, ScopeChain};
use crate::domain::types::{ImportStatus, MatchTier};
use crate::engine::alias_learning::{AliasLearner, LearnSummary};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::promoter::{ProductionPromoter, PromotionBuild, RowError};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::header_detector::detect_header_row;
use crate::matcher::classifier::SchemaClassifier;
use crate::matcher::orchestrator::MatchingOrchestrator;
use crate::matcher::registry;
use crate::repository::{
    AliasRepository, ProductionRepository, RawImportRepository, RepositoryError,
    SchemaMappingRepository, StagingRepository,
};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 可接受的上传 MIME 类型
const ALLOWED_MIME_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// 上传结果
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub import: RawImport,
    /// 同产线同内容已存在，复用既有导入
    pub deduplicated: bool,
}

/// 预览结果（只读，不产生任何写入）
#[derive(Debug)]
pub struct PreviewOutcome {
    /// 使用的是确认过的激活映射，还是解析阶段的提案
    pub from_active_mapping: bool,
    /// 行号 → (源表头 → 原始单元格串)，供与清洗后记录并排对照
    pub raw_rows: HashMap<usize, HashMap<String, String>>,
    pub build: PromotionBuild,
}

/// 晋升汇总
#[derive(Debug, Clone)]
pub struct PromoteSummary {
    pub scanned_rows: usize,
    pub promoted: usize,
    pub rejected: Vec<RowError>,
}

pub struct ImportLifecycleManager {
    conn: Arc<Mutex<Connection>>,
    raw_imports: RawImportRepository,
    staging: StagingRepository,
    mappings: SchemaMappingRepository,
    alias_repo: Arc<AliasRepository>,
    learner: AliasLearner,
    config: ConfigManager,
    classifier: Option<Arc<dyn SchemaClassifier>>,
    upload_dir: PathBuf,
}

impl ImportLifecycleManager {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        classifier: Option<Arc<dyn SchemaClassifier>>,
        upload_dir: PathBuf,
    ) -> EngineResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| EngineError::InternalError(e.to_string()))?;
        let alias_repo = Arc::new(AliasRepository::new(conn.clone()));
        std::fs::create_dir_all(&upload_dir)?;
        Ok(Self {
            raw_imports: RawImportRepository::new(conn.clone()),
            staging: StagingRepository::new(conn.clone()),
            mappings: SchemaMappingRepository::new(conn.clone()),
            learner: AliasLearner::new(alias_repo.clone()),
            alias_repo,
            config,
            classifier,
            upload_dir,
            conn,
        })
    }

    // ==========================================
    // 上传
    // ==========================================

    /// 接收上传文件：MIME 白名单 + 内容哈希去重 + 内容寻址落盘
    pub fn upload(
        &self,
        factory_id: &str,
        line_id: &str,
        filename: &str,
        mime_type: &str,
        content: &[u8],
    ) -> EngineResult<UploadOutcome> {
        if content.is_empty() {
            return Err(EngineError::EmptyUpload);
        }
        if !ALLOWED_MIME_TYPES.contains(&mime_type) {
            return Err(EngineError::UnsupportedMimeType(mime_type.to_string()));
        }

        let mut hasher = Sha256::new();
        hasher.update(content);
        let content_hash = format!("{:x}", hasher.finalize());

        // 同产线同内容去重：复用既有导入而不重复落盘
        if let Some(existing) = self
            .raw_imports
            .find_by_hash_and_line(&content_hash, line_id)?
        {
            info!(import_id = %existing.id, line_id, "上传内容重复，复用既有导入");
            return Ok(UploadOutcome {
                import: existing,
                deduplicated: true,
            });
        }

        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_lowercase();
        let stored_path = self.upload_dir.join(format!("{}.{}", content_hash, ext));
        std::fs::write(&stored_path, content)?;

        let import = RawImport::new(
            factory_id,
            line_id,
            &stored_path.to_string_lossy(),
            &content_hash,
            filename,
            content.len() as u64,
            mime_type,
        );
        self.raw_imports.create(&import)?;
        info!(import_id = %import.id, line_id, size = content.len(), "上传完成");

        Ok(UploadOutcome {
            import,
            deduplicated: false,
        })
    }

    // ==========================================
    // 解析 + 列匹配
    // ==========================================

    /// 解析文件、检测表头、执行瀑布匹配并落暂存行
    ///
    /// 可重复调用（幂等替换暂存行与匹配报告）；解析失败标记 failed
    pub async fn process(&self, import_id: &str, scope: &ScopeChain) -> EngineResult<MatchReport> {
        let import = self.require_import(import_id)?;
        if !matches!(
            import.status,
            ImportStatus::Uploaded | ImportStatus::Processed
        ) {
            return Err(self.bad_state(&import, "process"));
        }

        let parsed = match UniversalFileParser.parse(&import.file_path) {
            Ok(p) => p,
            Err(e) => {
                // 不可解析即终态失败，保留原因供排查
                warn!(import_id, error = %e, "文件解析失败");
                self.raw_imports.mark_failed(import_id, &e.to_string())?;
                return Err(e.into());
            }
        };

        let matcher_config = self
            .config
            .matcher_config()
            .map_err(|e| EngineError::InternalError(e.to_string()))?;

        let header_row = detect_header_row(&parsed.rows);
        let headers: Vec<String> = parsed.rows[header_row]
            .iter()
            .map(|c| c.display_string().trim().to_string())
            .collect();

        // 每列采集前 N 个非空样本值（供模糊/语义层参考）
        let samples: Vec<Vec<String>> = (0..headers.len())
            .map(|col| {
                parsed.rows[header_row + 1..]
                    .iter()
                    .filter_map(|row| row.get(col))
                    .filter(|c| !c.is_blank())
                    .take(matcher_config.sample_size)
                    .map(|c| c.display_string())
                    .collect()
            })
            .collect();

        let orchestrator = MatchingOrchestrator::new(
            self.alias_repo.clone(),
            self.classifier.clone(),
            matcher_config,
        );
        let columns = orchestrator
            .match_columns(&headers, &samples, scope)
            .await
            .map_err(|e| EngineError::InternalError(e.to_string()))?;
        let report = MatchReport::new(header_row, columns);

        let sheet_count = parsed.sheet_count as i32;
        let staging_rows: Vec<(usize, Vec<_>)> =
            parsed.rows.into_iter().enumerate().collect();
        self.staging.replace_for_import(import_id, &staging_rows)?;

        self.raw_imports.save_process_result(
            import_id,
            sheet_count,
            &serde_json::to_string(&report)?,
        )?;
        self.raw_imports
            .transition_status(import_id, import.status, ImportStatus::Processed)?;

        info!(
            import_id,
            rows = staging_rows.len(),
            auto_mapped = report.stats.auto_mapped,
            unmatched = report.stats.unmatched,
            "解析与列匹配完成"
        );
        Ok(report)
    }

    // ==========================================
    // 预览
    // ==========================================

    /// 干跑预览：用激活映射（或解析提案）构建记录但不写入
    pub fn preview(&self, import_id: &str, limit: usize) -> EngineResult<PreviewOutcome> {
        let import = self.require_import(import_id)?;
        if !matches!(
            import.status,
            ImportStatus::Processed | ImportStatus::Confirmed
        ) {
            return Err(self.bad_state(&import, "preview"));
        }

        let (mapping, from_active) = match self.mappings.find_active(&import.line_id)? {
            Some(m) => (m, true),
            None => (self.proposal_mapping(&import)?, false),
        };

        let staging = self.staging.find_for_import(import_id, 0)?;
        let promoter = ProductionPromoter::new(
            self.config
                .validator_config()
                .map_err(|e| EngineError::InternalError(e.to_string()))?,
        );
        let mut build = promoter.build(&import, &mapping, &staging);
        if limit > 0 && build.records.len() > limit {
            build.records.truncate(limit);
        }
        let raw_rows = raw_rows_for(mapping.extraction_rules.header_row, &staging, &build);

        Ok(PreviewOutcome {
            from_active_mapping: from_active,
            raw_rows,
            build,
        })
    }

    // ==========================================
    // 确认
    // ==========================================

    /// 确认列映射：落新映射版本 + 学习用户纠正
    ///
    /// # 参数
    /// - final_mapping: 源表头 → 最终字段（None 表示忽略该列；缺席表头沿用提案）
    /// - time_format: 时间列显式格式串（如 "YYYY-MM-DD"）
    pub fn confirm(
        &self,
        import_id: &str,
        final_mapping: &HashMap<String, Option<String>>,
        time_format: Option<String>,
        scope: &ScopeChain,
    ) -> EngineResult<(SchemaMapping, LearnSummary)> {
        let import = self.require_import(import_id)?;
        if !matches!(
            import.status,
            ImportStatus::Processed | ImportStatus::Confirmed
        ) {
            return Err(self.bad_state(&import, "confirm"));
        }

        // 用户覆写的目标字段必须在注册表内，拒绝把拼写错误固化进映射与别名库
        for target in final_mapping.values().flatten() {
            if registry::find_field(target).is_none() {
                return Err(EngineError::UnknownTargetField(target.clone()));
            }
        }

        let report: MatchReport = match &import.match_report_json {
            Some(json) => serde_json::from_str(json)?,
            None => return Err(self.bad_state(&import, "confirm")),
        };

        // 终稿列表：用户覆写优先，未提及的列沿用提案
        let columns: Vec<ColumnMapEntry> = report
            .columns
            .iter()
            .map(|col| {
                let (target, tier, confidence) = match final_mapping.get(&col.source_header) {
                    Some(decision) => {
                        if decision.as_deref() == col.target_field.as_deref() {
                            (decision.clone(), col.tier, col.confidence())
                        } else {
                            // 用户改判即人工指定，置信度满格
                            (decision.clone(), MatchTier::Manual, 1.0)
                        }
                    }
                    None => (col.target_field.clone(), col.tier, col.confidence()),
                };
                ColumnMapEntry {
                    source_header: col.source_header.clone(),
                    target_field: target,
                    tier,
                    confidence,
                }
            })
            .collect();

        let time_column = columns
            .iter()
            .find(|c| c.target_field.as_deref() == Some("production_date"))
            .map(|c| c.source_header.clone());
        let rules = ExtractionRules {
            header_row: report.header_row_index,
            skip_rows: Vec::new(),
            time_column,
            time_format,
        };

        let learn_summary = self
            .learner
            .process_confirmation(&report, final_mapping, scope)?;

        let mut mapping = SchemaMapping::new(&import.line_id, columns, rules, true);
        self.mappings.create_next_version(&mut mapping)?;
        self.raw_imports
            .transition_status(import_id, import.status, ImportStatus::Confirmed)?;

        info!(
            import_id,
            mapping_id = %mapping.id,
            version = mapping.version_no,
            learned = learn_summary.learned,
            corrected = learn_summary.corrected,
            "映射已确认"
        );
        Ok((mapping, learn_summary))
    }

    // ==========================================
    // 晋升
    // ==========================================

    /// 把暂存行物化为正式生产记录（单事务，部分成功）
    ///
    /// 行级硬失败仅剔除该行；已晋升的导入拒绝重复晋升
    pub fn promote(&self, import_id: &str) -> EngineResult<PromoteSummary> {
        let import = self.require_import(import_id)?;
        if import.status == ImportStatus::Promoted {
            return Err(EngineError::AlreadyPromoted(import_id.to_string()));
        }
        if import.status != ImportStatus::Confirmed {
            return Err(self.bad_state(&import, "promote"));
        }

        let mapping = self
            .mappings
            .find_active(&import.line_id)?
            .ok_or_else(|| EngineError::NoActiveMapping(import.line_id.clone()))?;

        let staging = self.staging.find_for_import(import_id, 0)?;
        let promoter = ProductionPromoter::new(
            self.config
                .validator_config()
                .map_err(|e| EngineError::InternalError(e.to_string()))?,
        );
        let build = promoter.build(&import, &mapping, &staging);

        // 全部写入收拢在单事务内，要么整批可见要么整批不可见
        {
            let mut conn = self
                .conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            let tx = conn
                .transaction()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            for (record, _) in &build.records {
                ProductionRepository::upsert_tx(&tx, record)?;
            }
            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        }

        self.raw_imports
            .transition_status(import_id, ImportStatus::Confirmed, ImportStatus::Promoted)?;

        let summary = PromoteSummary {
            scanned_rows: build.scanned_rows,
            promoted: build.records.len(),
            rejected: build.row_errors,
        };
        info!(
            import_id,
            promoted = summary.promoted,
            rejected = summary.rejected.len(),
            "晋升完成"
        );
        Ok(summary)
    }

    // ==========================================
    // 清除
    // ==========================================

    /// 删除导入及其暂存行与落盘文件（已晋升记录不受影响）
    pub fn purge(&self, import_id: &str) -> EngineResult<()> {
        let import = self.require_import(import_id)?;
        match std::fs::remove_file(&import.file_path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.raw_imports.delete(import_id)?;
        info!(import_id, "导入已清除");
        Ok(())
    }

    // ==========================================
    // 内部工具
    // ==========================================

    pub fn find_import(&self, import_id: &str) -> EngineResult<Option<RawImport>> {
        Ok(self.raw_imports.find_by_id(import_id)?)
    }

    fn require_import(&self, import_id: &str) -> EngineResult<RawImport> {
        self.raw_imports
            .find_by_id(import_id)?
            .ok_or_else(|| EngineError::ImportNotFound(import_id.to_string()))
    }

    fn bad_state(&self, import: &RawImport, operation: &str) -> EngineError {
        EngineError::InvalidLifecycleState {
            import_id: import.id.clone(),
            status: import.status.to_string(),
            operation: operation.to_string(),
        }
    }

    /// 从解析提案构造未持久化的临时映射（预览用）
    fn proposal_mapping(&self, import: &RawImport) -> EngineResult<SchemaMapping> {
        let report: MatchReport = match &import.match_report_json {
            Some(json) => serde_json::from_str(json)?,
            None => return Err(self.bad_state(import, "preview")),
        };
        let columns = report
            .columns
            .iter()
            .map(|c| ColumnMapEntry {
                source_header: c.source_header.clone(),
                target_field: c.target_field.clone(),
                tier: c.tier,
                confidence: c.confidence(),
            })
            .collect();
        let rules = ExtractionRules {
            header_row: report.header_row_index,
            ..ExtractionRules::default()
        };
        Ok(SchemaMapping::new(&import.line_id, columns, rules, false))
    }
}

/// 预览用原值对照：只收集成功构建记录对应的暂存行，按源表头键控
fn raw_rows_for(
    header_row: usize,
    staging: &[StagingRecord],
    build: &PromotionBuild,
) -> HashMap<usize, HashMap<String, String>> {
    let headers: Vec<String> = match staging.iter().find(|r| r.row_index == header_row) {
        Some(row) => row
            .cells
            .iter()
            .map(|c| c.display_string().trim().to_string())
            .collect(),
        None => return HashMap::new(),
    };

    let wanted: HashSet<usize> = build
        .records
        .iter()
        .map(|(r, _)| r.source_row_index)
        .collect();

    let mut raw_rows = HashMap::new();
    for row in staging {
        if !wanted.contains(&row.row_index) {
            continue;
        }
        let mut raw = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            if let Some(cell) = row.cells.get(idx) {
                if !cell.is_blank() {
                    raw.insert(header.clone(), cell.display_string());
                }
            }
        }
        raw_rows.insert(row.row_index, raw);
    }
    raw_rows
}
