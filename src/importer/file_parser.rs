// ==========================================
// 服装生产数据接入平台 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 说明: 表头行位置未知，所有行按“列序单元格”原样返回，
//       由 header_detector 在下游判定表头行
// ==========================================

use crate::domain::import::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 解析结果：按行序的单元格矩阵 + sheet 数
#[derive(Debug)]
pub struct ParsedSheet {
    pub rows: Vec<Vec<CellValue>>,
    pub sheet_count: usize,
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    pub fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头行由下游启发式判定
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells: Vec<CellValue> = record
                .iter()
                .map(|v| {
                    let trimmed = v.trim();
                    if trimmed.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(trimmed.to_string())
                    }
                })
                .collect();

            // 跳过完全空白的行
            if cells.iter().all(|c| c.is_blank()) {
                continue;
            }
            rows.push(cells);
        }

        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        Ok(ParsedSheet {
            rows,
            sheet_count: 1,
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    pub fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(file_path)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let sheet_names = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        }

        // 读取第一个 sheet
        let range = workbook
            .worksheet_range(&sheet_names[0])
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut rows = Vec::new();
        for data_row in range.rows() {
            let cells: Vec<CellValue> = data_row.iter().map(convert_cell).collect();
            if cells.iter().all(|c| c.is_blank()) {
                continue;
            }
            rows.push(cells);
        }

        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        Ok(ParsedSheet {
            rows,
            sheet_count: sheet_names.len(),
        })
    }
}

/// calamine 单元格 → CellValue（保留原生日期类型供解析第一层使用）
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::DateTime(naive),
            // 无法转换时退回序列号，交由日期解析器处理
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("{:?}", e)),
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ParsedSheet> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse(path),
            "xlsx" | "xls" => ExcelParser.parse(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_parser_positional_rows() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "款号,订单号,产量").unwrap();
        writeln!(temp_file, "ST-001,PO-100,500").unwrap();
        writeln!(temp_file, "ST-002,PO-101,250").unwrap();

        let sheet = CsvParser.parse(temp_file.path()).unwrap();
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0][0], CellValue::Text("款号".to_string()));
        assert_eq!(sheet.rows[1][2], CellValue::Text("500".to_string()));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "a,b").unwrap();
        writeln!(temp_file, ",").unwrap();
        writeln!(temp_file, "1,2").unwrap();

        let sheet = CsvParser.parse(temp_file.path()).unwrap();
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_unsupported_extension() {
        let result = UniversalFileParser.parse(Path::new("report.pdf"));
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
