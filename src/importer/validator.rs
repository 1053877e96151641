// ==========================================
// 服装生产数据接入平台 - 物理合理性校验
// ==========================================
// 职责: 对清洗后的生产记录做合理性检查，产出结构化数据质量问题
// 原则: 除存储约束（负数量等）外，问题仅报告、不硬失败
// ==========================================

use crate::config::ValidatorConfig;
use crate::domain::import::DataQualityIssue;
use crate::domain::production::ProductionRecord;
use crate::domain::types::IssueSeverity;

pub struct PlausibilityValidator {
    config: ValidatorConfig,
}

impl PlausibilityValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// 校验单条记录，返回数据质量问题列表
    ///
    /// severity 约定:
    /// - Warning: 可入库，但提示用户核对（效率超上限、DHU 异常）
    /// - Error/Critical: 违反存储约束，该行硬失败
    pub fn validate(&self, record: &ProductionRecord, row_index: usize) -> Vec<DataQualityIssue> {
        let mut issues = Vec::new();

        // 效率超出合理上限：大概率是单位错误（0.85 录成 8500 一类）
        if let Some(eff) = record.efficiency_pct {
            if eff > self.config.efficiency_max_pct {
                issues.push(DataQualityIssue {
                    row_index,
                    field: "efficiency_pct".to_string(),
                    severity: IssueSeverity::Warning,
                    message: format!(
                        "效率异常 ({:.1}% > {:.1}%)，疑似单位错误",
                        eff, self.config.efficiency_max_pct
                    ),
                    raw_value: Some(format!("{}", eff)),
                });
            } else if eff < 0.0 {
                issues.push(DataQualityIssue {
                    row_index,
                    field: "efficiency_pct".to_string(),
                    severity: IssueSeverity::Warning,
                    message: format!("效率为负数: {:.1}", eff),
                    raw_value: Some(format!("{}", eff)),
                });
            }
        }

        // 负数量：违反存储非负约束，行级硬失败
        for (field, value) in [
            ("actual_qty", record.actual_qty),
            ("defect_qty", record.defect_qty),
        ] {
            if let Some(v) = value {
                if v < 0.0 {
                    issues.push(DataQualityIssue {
                        row_index,
                        field: field.to_string(),
                        severity: IssueSeverity::Error,
                        message: format!("数量为负数: {}", v),
                        raw_value: Some(format!("{}", v)),
                    });
                }
            }
        }

        // 订单量/目标量为负仅提示
        for (field, value) in [
            ("order_qty", record.order_qty),
            ("target_qty", record.target_qty),
            ("rework_qty", record.rework_qty),
        ] {
            if let Some(v) = value {
                if v < 0.0 {
                    issues.push(DataQualityIssue {
                        row_index,
                        field: field.to_string(),
                        severity: IssueSeverity::Warning,
                        message: format!("数量为负数: {}", v),
                        raw_value: Some(format!("{}", v)),
                    });
                }
            }
        }

        // DHU 异常高
        if let Some(dhu) = record.dhu {
            if dhu < 0.0 || dhu > 100.0 {
                issues.push(DataQualityIssue {
                    row_index,
                    field: "dhu".to_string(),
                    severity: IssueSeverity::Warning,
                    message: format!("DHU 超出常规范围 [0, 100]: {}", dhu),
                    raw_value: Some(format!("{}", dhu)),
                });
            }
        }

        // 产量超出订单量：信息级提示
        if let (Some(actual), Some(order)) = (record.actual_qty, record.order_qty) {
            if order > 0.0 && actual > order * 2.0 {
                issues.push(DataQualityIssue {
                    row_index,
                    field: "actual_qty".to_string(),
                    severity: IssueSeverity::Info,
                    message: format!("产量 {} 超过订单量 {} 的两倍", actual, order),
                    raw_value: None,
                });
            }
        }

        issues
    }

    /// 是否存在行级硬失败（Error 及以上）
    pub fn has_hard_failure(issues: &[DataQualityIssue]) -> bool {
        issues
            .iter()
            .any(|i| i.severity >= IssueSeverity::Error)
    }
}
