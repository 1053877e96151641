// ==========================================
// 导入层集成测试
// ==========================================
// 测试目标: 真实报表形态（横幅行/序列号日期/歧义日期）走通全链路
// ==========================================

mod test_helpers;

use apparel_ingest::config::ConfigManager;
use apparel_ingest::engine::ImportLifecycleManager;
use apparel_ingest::logging;
use apparel_ingest::repository::ProductionRepository;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct Ctx {
    manager: ImportLifecycleManager,
    production: ProductionRepository,
    conn: Arc<Mutex<Connection>>,
    _db: tempfile::NamedTempFile,
    _dir: tempfile::TempDir,
}

fn setup() -> Ctx {
    logging::init_test();
    let (db_file, conn) = test_helpers::create_test_db().expect("测试数据库创建失败");
    let (upload_tmp, upload_dir) = test_helpers::create_upload_dir().expect("上传目录创建失败");
    let manager =
        ImportLifecycleManager::new(conn.clone(), None, upload_dir).expect("管理器创建失败");
    let production = ProductionRepository::new(conn.clone());
    Ctx {
        manager,
        production,
        conn,
        _db: db_file,
        _dir: upload_tmp,
    }
}

async fn run_to_promotion(ctx: &Ctx, line_id: &str, csv: &str, time_format: Option<String>) {
    let scope = test_helpers::test_scope();
    let up = ctx
        .manager
        .upload("F-01", line_id, "daily.csv", "text/csv", csv.as_bytes())
        .unwrap();
    ctx.manager.process(&up.import.id, &scope).await.unwrap();
    ctx.manager
        .confirm(&up.import.id, &HashMap::new(), time_format, &scope)
        .unwrap();
    ctx.manager.promote(&up.import.id).unwrap();
}

// ==========================================
// 横幅标题行 + 序列号日期
// ==========================================

#[tokio::test]
async fn test_banner_row_skipped_and_serial_dates_resolved() {
    let ctx = setup();
    // 首行是车间横幅标题，真实表头在第二行；日期为电子表格序列号
    let csv = "三厂一车间生产日报,,,\n\
               Date,Style No,Output,Eff\n\
               45292,ST-001,500,85%\n\
               45293,ST-002,250,90%\n";

    let scope = test_helpers::test_scope();
    let up = ctx
        .manager
        .upload("F-01", "LINE-01", "daily.csv", "text/csv", csv.as_bytes())
        .unwrap();
    let report = ctx.manager.process(&up.import.id, &scope).await.unwrap();
    assert_eq!(report.header_row_index, 1, "应跳过横幅行定位真实表头");

    ctx.manager
        .confirm(&up.import.id, &HashMap::new(), None, &scope)
        .unwrap();
    let summary = ctx.manager.promote(&up.import.id).unwrap();
    assert_eq!(summary.promoted, 2);

    let records = ctx.production.find_by_data_source("LINE-01").unwrap();
    assert_eq!(
        records[0].production_date.date(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "序列号 45292 应解析为 2024-01-01"
    );
    assert_eq!(records[0].style_number.as_deref(), Some("ST-001"));
}

// ==========================================
// 歧义日期与 day_first 配置
// ==========================================

#[tokio::test]
async fn test_ambiguous_date_follows_day_first_config() {
    let ctx = setup();
    let csv = "Date,Output\n01/02/2024,500\n";

    // 默认 day_first=true → 2月1日
    run_to_promotion(&ctx, "LINE-01", csv, None).await;
    let records = ctx.production.find_by_data_source("LINE-01").unwrap();
    assert_eq!(
        records[0].production_date.date(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    );

    // 切换为月在前 → 1月2日
    let config = ConfigManager::from_connection(ctx.conn.clone()).unwrap();
    config
        .set_config_value("dates/day_first_default", "false")
        .unwrap();
    run_to_promotion(&ctx, "LINE-02", csv, None).await;
    let records = ctx.production.find_by_data_source("LINE-02").unwrap();
    assert_eq!(
        records[0].production_date.date(),
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    );
}

// ==========================================
// 显式格式串优先于启发式
// ==========================================

#[tokio::test]
async fn test_explicit_time_format_overrides_heuristic() {
    let ctx = setup();
    // day_first 缺省为 true，启发式会把 01-05-2024 读成 5月1日；
    // 显式格式串 MM-DD-YYYY 应强制为 1月5日
    let csv = "Date,Output\n01-05-2024,500\n";
    run_to_promotion(&ctx, "LINE-01", csv, Some("MM-DD-YYYY".to_string())).await;

    let records = ctx.production.find_by_data_source("LINE-01").unwrap();
    assert_eq!(
        records[0].production_date.date(),
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    );
}

// ==========================================
// 坏行部分成功
// ==========================================

#[tokio::test]
async fn test_partial_success_reports_rejected_rows() {
    let ctx = setup();
    let csv = "Date,Output\n\
               2024-01-05,500\n\
               没有日期,300\n\
               2024-01-07,-10\n\
               2024-01-08,250\n";

    let scope = test_helpers::test_scope();
    let up = ctx
        .manager
        .upload("F-01", "LINE-01", "daily.csv", "text/csv", csv.as_bytes())
        .unwrap();
    ctx.manager.process(&up.import.id, &scope).await.unwrap();
    ctx.manager
        .confirm(&up.import.id, &HashMap::new(), None, &scope)
        .unwrap();
    let summary = ctx.manager.promote(&up.import.id).unwrap();

    // 日期坏行与负数量行被剔除，其余入库
    assert_eq!(summary.scanned_rows, 4);
    assert_eq!(summary.promoted, 2);
    assert_eq!(summary.rejected.len(), 2);
    assert_eq!(ctx.production.count_by_data_source("LINE-01").unwrap(), 2);
}
