// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、共享连接、CSV 测试文件生成
// ==========================================

use apparel_ingest::domain::mapping::ScopeChain;
use apparel_ingest::repository::init_schema;
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<Mutex<Connection>>: 共享连接
pub fn create_test_db() -> Result<(NamedTempFile, Arc<Mutex<Connection>>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let conn = Connection::open(temp_file.path())?;
    init_schema(&conn)?;
    Ok((temp_file, Arc::new(Mutex::new(conn))))
}

/// 测试用上传目录
pub fn create_upload_dir() -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("uploads");
    Ok((dir, path))
}

/// 默认测试作用域链
pub fn test_scope() -> ScopeChain {
    ScopeChain {
        factory_id: "F-01".to_string(),
        organization_id: "ORG-01".to_string(),
    }
}
