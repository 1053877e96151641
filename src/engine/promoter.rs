// ==========================================
// 服装生产数据接入平台 - 晋升构建器
// ==========================================
// 职责: 暂存行 + 激活映射 → 标准化生产记录（含清洗/日期解析/合理性校验）
// 部分成功: 行级硬失败仅剔除该行并记录原因，不放弃整批
// ==========================================

use crate::config::ValidatorConfig;
use crate::domain::import::{CellValue, DataQualityIssue, RawImport, StagingRecord};
use crate::domain::mapping::SchemaMapping;
use crate::domain::production::ProductionRecord;
use crate::domain::types::IssueSeverity;
use crate::importer::date_resolver::{self, DateResolution};
use crate::importer::validator::PlausibilityValidator;
use crate::importer::value_cleaner::{coerce, CleanedValue};
use crate::matcher::registry::find_field;
use std::collections::HashMap;
use tracing::debug;

/// 被剔除行的结构化原因
#[derive(Debug, Clone)]
pub struct RowError {
    pub row_index: usize,
    pub reason: String,
}

/// 一次构建的全量产物（preview 与 promote 共用）
#[derive(Debug, Default)]
pub struct PromotionBuild {
    /// 可入库的记录及其非硬性问题
    pub records: Vec<(ProductionRecord, Vec<DataQualityIssue>)>,
    /// 被剔除的行
    pub row_errors: Vec<RowError>,
    /// 扫描的数据行总数（不含表头/跳过行/空白行）
    pub scanned_rows: usize,
}

pub struct ProductionPromoter {
    validator: PlausibilityValidator,
    day_first: bool,
}

impl ProductionPromoter {
    pub fn new(config: ValidatorConfig) -> Self {
        let day_first = config.day_first_default;
        Self {
            validator: PlausibilityValidator::new(config),
            day_first,
        }
    }

    /// 按激活映射把暂存行构建为生产记录
    ///
    /// 不做任何写入，调用方决定落库与否（preview 直接展示，promote 单事务写入）
    pub fn build(
        &self,
        import: &RawImport,
        mapping: &SchemaMapping,
        staging: &[StagingRecord],
    ) -> PromotionBuild {
        let mut build = PromotionBuild::default();

        let header_row = mapping.extraction_rules.header_row;
        let headers: Vec<String> = match staging.iter().find(|r| r.row_index == header_row) {
            Some(row) => row
                .cells
                .iter()
                .map(|c| c.display_string().trim().to_string())
                .collect(),
            None => {
                build.row_errors.push(RowError {
                    row_index: header_row,
                    reason: "表头行缺失，无法按映射取列".to_string(),
                });
                return build;
            }
        };

        let lookup = mapping.field_lookup();
        // 列序号 → 标准字段
        let column_fields: HashMap<usize, &str> = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| lookup.get(h).map(|f| (idx, f.as_str())))
            .collect();

        let date_column = column_fields
            .iter()
            .find(|(_, f)| **f == "production_date")
            .map(|(idx, _)| *idx);
        let time_format = mapping.extraction_rules.time_format.as_deref();

        for row in staging {
            if row.row_index <= header_row
                || mapping.extraction_rules.skip_rows.contains(&row.row_index)
            {
                continue;
            }
            if row.cells.iter().all(|c| c.is_blank()) {
                continue;
            }
            build.scanned_rows += 1;
            self.build_row(import, row, &column_fields, date_column, time_format, &mut build);
        }

        debug!(
            import_id = %import.id,
            scanned = build.scanned_rows,
            built = build.records.len(),
            rejected = build.row_errors.len(),
            "晋升构建完成"
        );
        build
    }

    fn build_row(
        &self,
        import: &RawImport,
        row: &StagingRecord,
        column_fields: &HashMap<usize, &str>,
        date_column: Option<usize>,
        time_format: Option<&str>,
        build: &mut PromotionBuild,
    ) {
        // 生产日期是记录的时间轴锚点，解析失败即剔除该行
        let date_cell = match date_column {
            Some(idx) => row.cells.get(idx).cloned().unwrap_or(CellValue::Empty),
            None => CellValue::Empty,
        };
        let DateResolution { value, .. } =
            date_resolver::resolve(&date_cell, time_format, None, self.day_first);
        let production_date = match value {
            Some(dt) => dt,
            None => {
                build.row_errors.push(RowError {
                    row_index: row.row_index,
                    reason: format!("生产日期无法解析: {:?}", date_cell.display_string()),
                });
                return;
            }
        };

        let mut record = ProductionRecord::new(
            &import.line_id,
            &import.factory_id,
            production_date,
            &import.id,
            row.row_index,
        );
        let mut issues: Vec<DataQualityIssue> = Vec::new();

        for (col_idx, field) in column_fields {
            if *field == "production_date" {
                continue;
            }
            let cell = match row.cells.get(*col_idx) {
                Some(c) if !c.is_blank() => c,
                _ => continue,
            };
            let def = match find_field(field) {
                Some(d) => d,
                None => continue, // 映射里出现了未注册字段，忽略
            };
            match coerce(cell, def.value_type) {
                Ok(cleaned) => assign_field(&mut record, field, cleaned),
                Err(raw) => issues.push(DataQualityIssue {
                    row_index: row.row_index,
                    field: field.to_string(),
                    severity: IssueSeverity::Warning,
                    message: format!("值无法按 {:?} 类型清洗，已置空", def.value_type),
                    raw_value: Some(raw),
                }),
            }
        }

        issues.extend(self.validator.validate(&record, row.row_index));

        if PlausibilityValidator::has_hard_failure(&issues) {
            let reasons: Vec<String> = issues
                .iter()
                .filter(|i| i.severity >= IssueSeverity::Error)
                .map(|i| format!("{}: {}", i.field, i.message))
                .collect();
            build.row_errors.push(RowError {
                row_index: row.row_index,
                reason: reasons.join("; "),
            });
            return;
        }

        build.records.push((record, issues));
    }
}

/// 按标准字段名把清洗值写入记录槽位
fn assign_field(record: &mut ProductionRecord, field: &str, cleaned: CleanedValue) {
    match (field, cleaned) {
        ("style_number", CleanedValue::Text(v)) => record.style_number = v,
        ("po_number", CleanedValue::Text(v)) => record.po_number = v,
        ("line_number", CleanedValue::Text(v)) => record.line_number = v,
        ("remarks", CleanedValue::Text(v)) => record.remarks = v,
        ("shift", CleanedValue::Text(Some(v))) => record.shift = v,
        ("order_qty", CleanedValue::Numeric(v)) => record.order_qty = v,
        ("target_qty", CleanedValue::Numeric(v)) => record.target_qty = v,
        ("actual_qty", CleanedValue::Numeric(v)) => record.actual_qty = v,
        ("defect_qty", CleanedValue::Numeric(v)) => record.defect_qty = v,
        ("rework_qty", CleanedValue::Numeric(v)) => record.rework_qty = v,
        ("efficiency_pct", CleanedValue::Numeric(v)) => record.efficiency_pct = v,
        ("dhu", CleanedValue::Numeric(v)) => record.dhu = v,
        ("operator_count", CleanedValue::Numeric(v)) => record.operator_count = v,
        ("working_hours", CleanedValue::Numeric(v)) => record.working_hours = v,
        ("sam", CleanedValue::Numeric(_)) => {
            // sam 是款式级工时指标，当前记录模型不持久化，仅参与匹配
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapping::{ColumnMapEntry, ExtractionRules, SchemaMapping};
    use crate::domain::types::MatchTier;
    use chrono::NaiveDate;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn entry(header: &str, field: &str) -> ColumnMapEntry {
        ColumnMapEntry {
            source_header: header.to_string(),
            target_field: Some(field.to_string()),
            tier: MatchTier::Hash,
            confidence: 1.0,
        }
    }

    fn staging_row(idx: usize, cells: Vec<CellValue>) -> StagingRecord {
        StagingRecord {
            id: idx as i64,
            raw_import_id: "imp-1".to_string(),
            row_index: idx,
            cells,
        }
    }

    fn import() -> RawImport {
        RawImport::new(
            "F-01",
            "LINE-01",
            "/tmp/x.csv",
            "hash",
            "x.csv",
            10,
            "text/csv",
        )
    }

    fn mapping() -> SchemaMapping {
        SchemaMapping::new(
            "LINE-01",
            vec![
                entry("Date", "production_date"),
                entry("Item_No", "style_number"),
                entry("Output", "actual_qty"),
                entry("Eff", "efficiency_pct"),
            ],
            ExtractionRules::default(),
            true,
        )
    }

    #[test]
    fn test_build_cleans_and_normalizes() {
        let promoter = ProductionPromoter::new(ValidatorConfig::default());
        let staging = vec![
            staging_row(
                0,
                vec![text("Date"), text("Item_No"), text("Output"), text("Eff")],
            ),
            staging_row(
                1,
                vec![text("2024-01-05"), text("ST-001"), text("1,200"), text("85%")],
            ),
            staging_row(
                2,
                vec![text("2024-01-06"), text("ST-002"), text("500"), text("0.90")],
            ),
        ];

        let build = promoter.build(&import(), &mapping(), &staging);
        assert_eq!(build.records.len(), 2);
        assert!(build.row_errors.is_empty());

        let (r1, issues1) = &build.records[0];
        assert_eq!(r1.style_number.as_deref(), Some("ST-001"));
        assert_eq!(r1.actual_qty, Some(1200.0));
        assert_eq!(r1.efficiency_pct, Some(85.0));
        assert_eq!(
            r1.production_date.date(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert!(issues1.is_empty());

        let (r2, _) = &build.records[1];
        assert_eq!(r2.efficiency_pct, Some(90.0));
    }

    #[test]
    fn test_unparseable_date_rejects_row() {
        let promoter = ProductionPromoter::new(ValidatorConfig::default());
        let staging = vec![
            staging_row(
                0,
                vec![text("Date"), text("Item_No"), text("Output"), text("Eff")],
            ),
            staging_row(
                1,
                vec![text("待定"), text("ST-001"), text("100"), text("85%")],
            ),
        ];

        let build = promoter.build(&import(), &mapping(), &staging);
        assert!(build.records.is_empty());
        assert_eq!(build.row_errors.len(), 1);
        assert_eq!(build.row_errors[0].row_index, 1);
    }

    #[test]
    fn test_negative_quantity_excluded_others_survive() {
        let promoter = ProductionPromoter::new(ValidatorConfig::default());
        let staging = vec![
            staging_row(
                0,
                vec![text("Date"), text("Item_No"), text("Output"), text("Eff")],
            ),
            staging_row(
                1,
                vec![text("2024-01-05"), text("ST-001"), text("-5"), text("85%")],
            ),
            staging_row(
                2,
                vec![text("2024-01-06"), text("ST-002"), text("500"), text("92%")],
            ),
        ];

        let build = promoter.build(&import(), &mapping(), &staging);
        assert_eq!(build.records.len(), 1);
        assert_eq!(build.row_errors.len(), 1);
        assert_eq!(build.records[0].0.actual_qty, Some(500.0));
    }

    #[test]
    fn test_suspect_efficiency_kept_with_warning() {
        let promoter = ProductionPromoter::new(ValidatorConfig::default());
        let staging = vec![
            staging_row(
                0,
                vec![text("Date"), text("Item_No"), text("Output"), text("Eff")],
            ),
            staging_row(
                1,
                vec![text("2024-01-05"), text("ST-001"), text("500"), text("8500")],
            ),
        ];

        let build = promoter.build(&import(), &mapping(), &staging);
        assert_eq!(build.records.len(), 1);
        let (record, issues) = &build.records[0];
        assert_eq!(record.efficiency_pct, Some(8500.0));
        assert!(issues
            .iter()
            .any(|i| i.field == "efficiency_pct" && i.severity == IssueSeverity::Warning));
    }

    #[test]
    fn test_blank_and_skip_rows_ignored() {
        let promoter = ProductionPromoter::new(ValidatorConfig::default());
        let mut m = mapping();
        m.extraction_rules.skip_rows = vec![2];
        let staging = vec![
            staging_row(
                0,
                vec![text("Date"), text("Item_No"), text("Output"), text("Eff")],
            ),
            staging_row(1, vec![CellValue::Empty, text(""), CellValue::Empty]),
            staging_row(
                2,
                vec![text("2024-01-05"), text("合计"), text("9999"), text("")],
            ),
            staging_row(
                3,
                vec![text("2024-01-07"), text("ST-003"), text("250"), text("90%")],
            ),
        ];

        let build = promoter.build(&import(), &m, &staging);
        assert_eq!(build.scanned_rows, 1);
        assert_eq!(build.records.len(), 1);
        assert_eq!(build.records[0].0.actual_qty, Some(250.0));
    }
}
