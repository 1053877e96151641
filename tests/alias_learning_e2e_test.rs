// ==========================================
// 别名学习环端到端测试
// ==========================================
// 测试目标: 确认纠正 → 学习别名 → 后续导入 hash 命中 → 反复纠正自动停用
// ==========================================

mod test_helpers;

use apparel_ingest::domain::types::{AliasScope, MatchTier};
use apparel_ingest::engine::ImportLifecycleManager;
use apparel_ingest::logging;
use apparel_ingest::matcher::normalize_header;
use apparel_ingest::repository::AliasRepository;
use std::collections::HashMap;

/// 生成带指定产量的报表内容（变化产量避免内容哈希去重）
fn csv_with(output: u32) -> String {
    format!(
        "Date,审批人签字栏,Output\n2024-01-05,{},{}\n",
        output * 7,
        output
    )
}

fn setup() -> (
    ImportLifecycleManager,
    AliasRepository,
    tempfile::NamedTempFile,
    tempfile::TempDir,
) {
    logging::init_test();
    let (db_file, conn) = test_helpers::create_test_db().expect("测试数据库创建失败");
    let (upload_tmp, upload_dir) = test_helpers::create_upload_dir().expect("上传目录创建失败");
    let manager =
        ImportLifecycleManager::new(conn.clone(), None, upload_dir).expect("生命周期管理器创建失败");
    (manager, AliasRepository::new(conn), db_file, upload_tmp)
}

async fn process_new_import(
    manager: &ImportLifecycleManager,
    output: u32,
) -> (String, Option<String>, MatchTier) {
    let scope = test_helpers::test_scope();
    let up = manager
        .upload("F-01", "LINE-01", "daily.csv", "text/csv", csv_with(output).as_bytes())
        .unwrap();
    let report = manager.process(&up.import.id, &scope).await.unwrap();
    let col = report
        .columns
        .iter()
        .find(|c| c.source_header == "审批人签字栏")
        .expect("目标列缺失");
    (up.import.id, col.target_field.clone(), col.tier)
}

fn confirm_as(manager: &ImportLifecycleManager, import_id: &str, field: &str) {
    let mut mapping = HashMap::new();
    mapping.insert("审批人签字栏".to_string(), Some(field.to_string()));
    manager
        .confirm(import_id, &mapping, None, &test_helpers::test_scope())
        .unwrap();
}

#[tokio::test]
async fn test_correction_learns_then_repeated_corrections_disable() {
    let (manager, _aliases, _db, _dir) = setup();

    // 首次导入：陌生表头全层未命中
    let (import_a, field, tier) = process_new_import(&manager, 100).await;
    assert_eq!(tier, MatchTier::Unmatched);
    assert!(field.is_none());

    // 用户确认指定 → 学习为工厂作用域别名
    confirm_as(&manager, &import_a, "actual_qty");

    // 第二次导入：学习别名在 hash 层命中，置信度满格
    let (import_b, field, tier) = process_new_import(&manager, 101).await;
    assert_eq!(tier, MatchTier::Hash);
    assert_eq!(field.as_deref(), Some("actual_qty"));

    // 连续三次改判不同字段 → 纠正计数达到阈值，别名停用
    confirm_as(&manager, &import_b, "order_qty");
    confirm_as(&manager, &import_b, "target_qty");
    confirm_as(&manager, &import_b, "defect_qty");

    // 停用后的导入回到未命中
    let (_import_c, field, tier) = process_new_import(&manager, 102).await;
    assert_eq!(tier, MatchTier::Unmatched);
    assert!(field.is_none());
}

#[tokio::test]
async fn test_reaffirmed_alias_stays_active_and_counts_usage() {
    let (manager, aliases, _db, _dir) = setup();

    let (import_a, _, _) = process_new_import(&manager, 200).await;
    confirm_as(&manager, &import_a, "actual_qty");

    // 刚学习尚未命中过：使用计数从 0 起
    let stats = aliases.usage_stats(AliasScope::Factory, "F-01").unwrap();
    assert_eq!(stats[0].usage_count, 0);

    // 多次导入 + 相同确认：复用而非纠正
    for output in 201..204 {
        let (import_id, field, tier) = process_new_import(&manager, output).await;
        assert_eq!(tier, MatchTier::Hash);
        assert_eq!(field.as_deref(), Some("actual_qty"));
        confirm_as(&manager, &import_id, "actual_qty");
    }

    // 依然命中
    let (_, field, tier) = process_new_import(&manager, 299).await;
    assert_eq!(tier, MatchTier::Hash);
    assert_eq!(field.as_deref(), Some("actual_qty"));

    // 每次 hash 命中累计使用计数
    let stats = aliases.usage_stats(AliasScope::Factory, "F-01").unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].alias, normalize_header("审批人签字栏"));
    assert_eq!(stats[0].usage_count, 4);
    assert!(stats[0].active);
}
