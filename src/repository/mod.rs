// ==========================================
// 服装生产数据接入平台 - 数据仓储层
// ==========================================
// 职责: SQLite 数据访问（实体读写、事务与约束处理）
// ==========================================

pub mod alias_repo;
pub mod error;
pub mod production_repo;
pub mod raw_import_repo;
pub mod schema;
pub mod schema_mapping_repo;
pub mod staging_repo;

pub use alias_repo::{AliasRepository, LearnOutcome};
pub use error::{RepositoryError, RepositoryResult};
pub use production_repo::ProductionRepository;
pub use raw_import_repo::RawImportRepository;
pub use schema::init_schema;
pub use schema_mapping_repo::SchemaMappingRepository;
pub use staging_repo::StagingRepository;
