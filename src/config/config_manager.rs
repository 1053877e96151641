// ==========================================
// 服装生产数据接入平台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 说明: 阈值类配置均为“可调参数”，编译期默认值仅作兜底
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键与默认值
// ==========================================
pub const KEY_FUZZY_FLOOR: &str = "matcher/fuzzy_floor";
pub const KEY_SHORT_NAME_LEN: &str = "matcher/short_name_len";
pub const KEY_SHORT_NAME_BAR: &str = "matcher/short_name_bar";
pub const KEY_AUTO_MAP_CONFIDENCE: &str = "matcher/auto_map_confidence";
pub const KEY_REVIEW_CONFIDENCE: &str = "matcher/review_confidence";
pub const KEY_SAMPLE_SIZE: &str = "matcher/sample_size";
pub const KEY_CLASSIFIER_ENABLED: &str = "classifier/enabled";
pub const KEY_CLASSIFIER_TIMEOUT_MS: &str = "classifier/timeout_ms";
pub const KEY_EFFICIENCY_MAX_PCT: &str = "validator/efficiency_max_pct";
pub const KEY_DAY_FIRST_DEFAULT: &str = "dates/day_first_default";

// ==========================================
// 匹配器配置快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// 模糊匹配置信度下限
    pub fuzzy_floor: f64,
    /// 短名保护：标准名长度低于该值时适用严格规则
    pub short_name_len: usize,
    /// 短名保护：非精确命中所需的近满分分数
    pub short_name_bar: f64,
    /// auto_mapped 分档下限
    pub auto_map_confidence: f64,
    /// needs_review 分档下限
    pub review_confidence: f64,
    /// 每列采集的样本值数量
    pub sample_size: usize,
    /// 语义分类器开关
    pub classifier_enabled: bool,
    /// 语义分类器超时（毫秒）
    pub classifier_timeout_ms: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_floor: 0.6,
            short_name_len: 4,
            short_name_bar: 0.95,
            auto_map_confidence: 0.9,
            review_confidence: 0.6,
            sample_size: 5,
            classifier_enabled: false,
            classifier_timeout_ms: 3_000,
        }
    }
}

// ==========================================
// 校验器配置快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// 效率合理性上限（百分比口径），超出视为疑似单位错误
    pub efficiency_max_pct: f64,
    /// 两段数字日期歧义时的 day-first 缺省
    pub day_first_default: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            efficiency_max_pct: 150.0,
            day_first_default: true,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值（scope_id='global'，存在即覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
               ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value,
               updated_at = datetime('now')"#,
            params![key, value],
        )?;
        Ok(())
    }

    fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(v) => Ok(v.trim().parse::<f64>()?),
            None => Ok(default),
        }
    }

    fn get_usize_or(&self, key: &str, default: usize) -> Result<usize, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(v) => Ok(v.trim().parse::<usize>()?),
            None => Ok(default),
        }
    }

    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(v) => Ok(matches!(v.trim(), "1" | "true" | "TRUE" | "True")),
            None => Ok(default),
        }
    }

    /// 读取匹配器配置快照
    pub fn matcher_config(&self) -> Result<MatcherConfig, Box<dyn Error>> {
        let d = MatcherConfig::default();
        Ok(MatcherConfig {
            fuzzy_floor: self.get_f64_or(KEY_FUZZY_FLOOR, d.fuzzy_floor)?,
            short_name_len: self.get_usize_or(KEY_SHORT_NAME_LEN, d.short_name_len)?,
            short_name_bar: self.get_f64_or(KEY_SHORT_NAME_BAR, d.short_name_bar)?,
            auto_map_confidence: self.get_f64_or(KEY_AUTO_MAP_CONFIDENCE, d.auto_map_confidence)?,
            review_confidence: self.get_f64_or(KEY_REVIEW_CONFIDENCE, d.review_confidence)?,
            sample_size: self.get_usize_or(KEY_SAMPLE_SIZE, d.sample_size)?,
            classifier_enabled: self.get_bool_or(KEY_CLASSIFIER_ENABLED, d.classifier_enabled)?,
            classifier_timeout_ms: self
                .get_usize_or(KEY_CLASSIFIER_TIMEOUT_MS, d.classifier_timeout_ms as usize)?
                as u64,
        })
    }

    /// 读取校验器配置快照
    pub fn validator_config(&self) -> Result<ValidatorConfig, Box<dyn Error>> {
        let d = ValidatorConfig::default();
        Ok(ValidatorConfig {
            efficiency_max_pct: self.get_f64_or(KEY_EFFICIENCY_MAX_PCT, d.efficiency_max_pct)?,
            day_first_default: self.get_bool_or(KEY_DAY_FIRST_DEFAULT, d.day_first_default)?,
        })
    }
}
