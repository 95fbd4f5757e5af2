// ==========================================
// 贷款管理平台 - 文件解析器实现
// ==========================================
// 阶段 0: 上传文件 → 表头 + 原始行
// 支持: CSV (.csv) / 电子表格 (.xlsx/.xls/.ods，仅第一个工作表)
// 红线: 纯函数，不做 Schema 相关处理
// ==========================================

use crate::domain::import_run::RawRow;
use crate::importer::error::ParseError;
use crate::importer::import_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// 解析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl ParsedFile {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// 由记录序列构造解析结果
///
/// - 第一条记录为表头，全空视为缺失表头
/// - 数据行按物理位置编号（1-based），空白行跳过但占用行号
/// - 行尾空白行自然被丢弃，不计数
fn build_parsed_file<I>(mut records: I) -> Result<ParsedFile, ParseError>
where
    I: Iterator<Item = Result<Vec<String>, ParseError>>,
{
    let header_record = match records.next() {
        Some(record) => record?,
        None => return Err(ParseError::EmptyFile),
    };

    let headers: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::MissingHeader);
    }

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record?;
        let cells: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let value = record.get(col).cloned().unwrap_or_default();
                (header.clone(), value)
            })
            .collect();

        let row = RawRow {
            row_index: idx + 1,
            cells,
        };

        // 跳过完全空白的行
        if row.is_blank() {
            continue;
        }
        rows.push(row);
    }

    Ok(ParsedFile { headers, rows })
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedFile, ParseError> {
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let text = std::str::from_utf8(content).map_err(|e| ParseError::Encoding(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(text.as_bytes());

        // csv 读取器会跳过完全为空的物理行，这里补回占位，保证行号与文件位置一致
        let mut records: Vec<Vec<String>> = Vec::new();
        let mut prev_start: Option<usize> = None;
        for result in reader.records() {
            let record = result?;
            let start = record.position().map_or(0, |p| p.byte() as usize);
            if let Some(prev) = prev_start {
                let skipped = skipped_empty_lines(text.get(prev..start).unwrap_or_default());
                records.extend(std::iter::repeat_with(Vec::new).take(skipped));
            }
            prev_start = Some(start);
            records.push(record.iter().map(|v| v.to_string()).collect());
        }

        build_parsed_file(records.into_iter().map(Ok))
    }
}

/// 两条记录起点之间被跳过的空行数
///
/// 片段末尾的连续换行中，第一个是上一条记录的行结束符，其余每个都是一行空行。
fn skipped_empty_lines(span: &str) -> usize {
    let bytes = span.as_bytes();
    let run_start = bytes
        .iter()
        .rposition(|b| *b != b'\n' && *b != b'\r')
        .map_or(0, |i| i + 1);

    let mut terminators: usize = 0;
    let mut i = run_start;
    while i < bytes.len() {
        // \r\n 计为一个行结束符
        if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
            i += 2;
        } else {
            i += 1;
        }
        terminators += 1;
    }
    terminators.saturating_sub(1)
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    // 整数型浮点不带小数位，避免证件号/手机号出现 ".0"
    fn float_to_string(f: f64) -> String {
        if f.fract() == 0.0 && f.abs() < 1e15 {
            format!("{}", f as i64)
        } else {
            f.to_string()
        }
    }

    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) => Self::float_to_string(*f),
            // 日期单元格输出为序列号，由标准化阶段按日期字段解析
            Data::DateTime(dt) => Self::float_to_string(dt.as_f64()),
            other => other.to_string(),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedFile, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        // 读取第一个 sheet
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ParseError::Spreadsheet("workbook has no sheets".to_string()))??;

        if range.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let records = range.rows().map(|row| {
            Ok(row
                .iter()
                .map(Self::cell_to_string)
                .collect::<Vec<_>>())
        });

        build_parsed_file(records)
    }
}

// ==========================================
// 通用文件解析器（魔数优先，其次扩展名）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn detect_format(file_name: &str, bytes: &[u8]) -> Result<FileFormat, ParseError> {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE2_MAGIC) {
            return Ok(FileFormat::Spreadsheet);
        }

        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" | "" => Ok(FileFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileFormat::Spreadsheet),
            _ => Err(ParseError::UnsupportedFormat(ext)),
        }
    }

    pub fn parse(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedFile, ParseError> {
        match Self::detect_format(file_name, bytes)? {
            FileFormat::Csv => CsvParser.parse_bytes(bytes),
            FileFormat::Spreadsheet => ExcelParser.parse_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parser_valid_file() {
        let data = b"Full Name,Phone,NRC\nJane Doe,+260970000000,123456/78/9\nJohn Banda,+260972222222,345678/90/1\n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        assert_eq!(parsed.headers, vec!["Full Name", "Phone", "NRC"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].row_index, 1);
        assert_eq!(parsed.rows[0].get("Full Name"), Some("Jane Doe"));
        assert_eq!(parsed.rows[1].row_index, 2);
    }

    #[test]
    fn test_csv_parser_strips_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"Full Name,Phone\nJane,0970\n");

        let parsed = CsvParser.parse_bytes(&data).unwrap();

        assert_eq!(parsed.headers[0], "Full Name");
    }

    #[test]
    fn test_csv_parser_quoted_delimiters() {
        let data = b"Full Name,Address\n\"Doe, Jane\",\"Plot 12, Cairo Road\"\n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        assert_eq!(parsed.rows[0].get("Full Name"), Some("Doe, Jane"));
        assert_eq!(parsed.rows[0].get("Address"), Some("Plot 12, Cairo Road"));
    }

    #[test]
    fn test_csv_parser_trailing_blank_rows_dropped() {
        let data = b"Full Name,Phone\nJane,0970\nJohn,0971\n,\n , \n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        assert_eq!(parsed.row_count(), 2);
    }

    #[test]
    fn test_csv_parser_interior_blank_row_keeps_numbering() {
        let data = b"Full Name,Phone\nJane,0970\n,\nJohn,0971\n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        assert_eq!(parsed.row_count(), 2);
        assert_eq!(parsed.rows[1].row_index, 3);
    }

    #[test]
    fn test_csv_parser_empty_line_keeps_numbering() {
        let data = b"Full Name,Phone\nJane,0970\n\nJohn,0971\n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        let indexes: Vec<usize> = parsed.rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, vec![1, 3]);
    }

    #[test]
    fn test_csv_parser_empty_lines_with_crlf() {
        let data = b"Full Name,Phone\r\n\r\nJane,0970\r\n\r\n\r\nJohn,0971\r\n\r\n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        let indexes: Vec<usize> = parsed.rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, vec![2, 5]);
    }

    #[test]
    fn test_csv_parser_multiline_quoted_cell_is_one_row() {
        let data = b"Full Name,Address\nJane,\"Plot 12\nCairo Road\n\"\n\nJohn,Lusaka\n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        let indexes: Vec<usize> = parsed.rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, vec![1, 3]);
        assert_eq!(parsed.rows[0].get("Address"), Some("Plot 12\nCairo Road\n"));
    }

    #[test]
    fn test_skipped_empty_lines() {
        assert_eq!(skipped_empty_lines("Jane,0970\n"), 0);
        assert_eq!(skipped_empty_lines("Jane,0970\n\n\n"), 2);
        assert_eq!(skipped_empty_lines("Jane,0970\r\n\r\n"), 1);
        assert_eq!(skipped_empty_lines(""), 0);
    }

    #[test]
    fn test_csv_parser_short_rows_padded() {
        let data = b"Full Name,Phone,NRC\nJane\n";

        let parsed = CsvParser.parse_bytes(data).unwrap();

        assert_eq!(parsed.rows[0].get("NRC"), Some(""));
    }

    #[test]
    fn test_csv_parser_empty_file() {
        assert_eq!(CsvParser.parse_bytes(b""), Err(ParseError::EmptyFile));
        assert_eq!(CsvParser.parse_bytes(b"  \n\n"), Err(ParseError::EmptyFile));
        assert_eq!(CsvParser.parse_bytes(UTF8_BOM), Err(ParseError::EmptyFile));
    }

    #[test]
    fn test_csv_parser_missing_header() {
        assert_eq!(
            CsvParser.parse_bytes(b",,\nJane,0970,123\n"),
            Err(ParseError::MissingHeader)
        );
    }

    #[test]
    fn test_csv_parser_rejects_invalid_utf8() {
        let result = CsvParser.parse_bytes(&[0x46, 0x75, 0xFF, 0xFE, 0x0A]);
        assert!(matches!(result, Err(ParseError::Encoding(_))));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            UniversalFileParser::detect_format("customers.CSV", b"a,b"),
            Ok(FileFormat::Csv)
        );
        assert_eq!(
            UniversalFileParser::detect_format("customers.csv", b"PK\x03\x04rest"),
            Ok(FileFormat::Spreadsheet)
        );
        assert_eq!(
            UniversalFileParser::detect_format("loans.xlsx", b"a,b"),
            Ok(FileFormat::Spreadsheet)
        );
        assert!(matches!(
            UniversalFileParser::detect_format("loans.pdf", b"%PDF"),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_corrupt_spreadsheet_is_parse_error() {
        let result = UniversalFileParser.parse("loans.xlsx", b"PK\x03\x04garbage");
        assert!(matches!(result, Err(ParseError::Spreadsheet(_))));
    }
}
