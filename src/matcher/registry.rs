// ==========================================
// 服装生产数据接入平台 - 标准字段注册表
// ==========================================
// 职责: 目标字段全集、静态别名表、表头规范化
// 说明: 别名覆盖常见中英文报表列名；学习别名另存数据库
// ==========================================

use crate::domain::types::CanonicalType;

// ==========================================
// FieldDef - 标准字段定义
// ==========================================
#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub value_type: CanonicalType,
    pub aliases: &'static [&'static str],
}

/// 标准字段全集
pub const CANONICAL_FIELDS: &[FieldDef] = &[
    FieldDef {
        name: "production_date",
        value_type: CanonicalType::Date,
        aliases: &[
            "date",
            "prod date",
            "production date",
            "report date",
            "日期",
            "生产日期",
        ],
    },
    FieldDef {
        name: "line_number",
        value_type: CanonicalType::Text,
        aliases: &["line", "line no", "line number", "sewing line", "产线", "线号"],
    },
    FieldDef {
        name: "style_number",
        value_type: CanonicalType::Text,
        aliases: &[
            "style",
            "style no",
            "style number",
            "item no",
            "item number",
            "款号",
            "款式编号",
        ],
    },
    FieldDef {
        name: "po_number",
        value_type: CanonicalType::Text,
        aliases: &["po", "po no", "po number", "order no", "order number", "订单号"],
    },
    FieldDef {
        name: "order_qty",
        value_type: CanonicalType::Numeric,
        aliases: &["order qty", "order quantity", "po qty", "订单数量"],
    },
    FieldDef {
        name: "target_qty",
        value_type: CanonicalType::Numeric,
        aliases: &["target", "target qty", "plan qty", "planned output", "目标产量", "计划产量"],
    },
    FieldDef {
        name: "actual_qty",
        value_type: CanonicalType::Numeric,
        aliases: &[
            "output",
            "qty",
            "quantity",
            "actual qty",
            "actual output",
            "production qty",
            "产量",
            "实际产量",
        ],
    },
    FieldDef {
        name: "defect_qty",
        value_type: CanonicalType::Numeric,
        aliases: &["defects", "defect qty", "reject qty", "疵品数", "次品数"],
    },
    FieldDef {
        name: "rework_qty",
        value_type: CanonicalType::Numeric,
        aliases: &["rework", "rework qty", "repair qty", "返工数"],
    },
    FieldDef {
        name: "efficiency_pct",
        value_type: CanonicalType::Percentage,
        aliases: &["eff", "efficiency", "line efficiency", "效率", "生产效率"],
    },
    FieldDef {
        name: "dhu",
        value_type: CanonicalType::Numeric,
        aliases: &["dhu", "defects per hundred units", "百件疵点"],
    },
    FieldDef {
        name: "sam",
        value_type: CanonicalType::Numeric,
        aliases: &["sam", "standard allowed minutes", "标准工时"],
    },
    FieldDef {
        name: "operator_count",
        value_type: CanonicalType::Numeric,
        aliases: &["operators", "operator count", "manpower", "人数", "操作工人数"],
    },
    FieldDef {
        name: "working_hours",
        value_type: CanonicalType::Numeric,
        aliases: &["hours", "work hours", "working hours", "工时"],
    },
    FieldDef {
        name: "shift",
        value_type: CanonicalType::Text,
        aliases: &["shift", "shift name", "班次"],
    },
    FieldDef {
        name: "remarks",
        value_type: CanonicalType::Text,
        aliases: &["remarks", "remark", "notes", "comment", "备注"],
    },
];

/// 表头规范化: 小写、TRIM、空白与标点折叠为下划线
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_underscore = true; // 抑制前导下划线
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// 按字段名查找定义
pub fn find_field(name: &str) -> Option<&'static FieldDef> {
    CANONICAL_FIELDS.iter().find(|f| f.name == name)
}

/// 静态别名精确命中（输入须已规范化）
pub fn find_by_alias(normalized: &str) -> Option<&'static FieldDef> {
    CANONICAL_FIELDS.iter().find(|f| {
        f.name == normalized
            || f.aliases
                .iter()
                .any(|a| normalize_header(a) == normalized)
    })
}

/// 全部 (规范化变体, 字段) 对，供模糊层遍历
pub fn all_variations() -> Vec<(String, &'static FieldDef)> {
    let mut variations = Vec::new();
    for field in CANONICAL_FIELDS {
        variations.push((field.name.to_string(), field));
        for alias in field.aliases {
            variations.push((normalize_header(alias), field));
        }
    }
    variations
}
