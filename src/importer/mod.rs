// ==========================================
// 服装生产数据接入平台 - 导入层
// ==========================================
// 职责: 文件解析、表头判定、日期解析、数值清洗、合理性校验
// 支持: Excel, CSV
// ==========================================

pub mod date_resolver;
pub mod error;
pub mod file_parser;
pub mod header_detector;
pub mod validator;
pub mod value_cleaner;

pub use date_resolver::{excel_serial_to_datetime, resolve, DateResolution};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, ParsedSheet, UniversalFileParser};
pub use header_detector::detect_header_row;
pub use validator::PlausibilityValidator;
pub use value_cleaner::{clean_numeric, clean_percentage, clean_text, coerce, CleanedValue};
