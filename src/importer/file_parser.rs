// ==========================================
// 内容管理平台 - 文件解析器实现
// ==========================================
// 职责: 原始字节 → 表头 + 惰性数据行序列
// 支持: Excel (.xlsx/.xls) / 分号分隔文本 (.csv)
// 红线: 表头必须包含 "id" 列（大小写不敏感），否则一行都不处理
// ==========================================

use crate::importer::error::{ImportError, ImporterResult};
use calamine::{Data, Range, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// UTF-8 字节序标记
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 主键列名
pub const ID_COLUMN: &str = "id";

/// 一行原始单元格（按表头列序）
pub type RawRow = Vec<String>;

/// 惰性数据行序列
pub type RowIter = Box<dyn Iterator<Item = ImporterResult<RawRow>> + Send>;

// ==========================================
// SourceTable - 解析后的表格
// ==========================================
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: RowIter,
}

impl SourceTable {
    /// 定位 id 列（大小写不敏感）
    pub fn id_column(&self) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(ID_COLUMN))
    }

    /// 按列名精确查找列序号（区分大小写）
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }
}

impl std::fmt::Debug for SourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTable")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 打开文件并读取表头
    ///
    /// # 返回
    /// - Ok(SourceTable): 表头 + 尚未读取的数据行
    /// - Err: 文件无法读取或格式错误
    fn open(&self, file_path: &Path) -> ImporterResult<SourceTable>;
}

/// 读取文件字节并去除 BOM
fn read_without_bom(file_path: &Path) -> ImporterResult<Vec<u8>> {
    let mut bytes = std::fs::read(file_path)?;
    if bytes.starts_with(UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    Ok(bytes)
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 分隔符 ';'，双引号包围字段，首行为表头
pub struct CsvParser;

impl CsvParser {
    /// 从内存字节解析（已去除 BOM）
    pub fn parse_bytes(&self, bytes: Vec<u8>) -> ImporterResult<SourceTable> {
        let text = String::from_utf8(bytes)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .quote(b'"')
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(Cursor::new(text.into_bytes()));

        let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

        let rows = reader.into_records().map(|result| {
            result
                .map(|record| record.iter().map(|v| v.to_string()).collect())
                .map_err(ImportError::from)
        });

        Ok(SourceTable {
            headers,
            rows: Box::new(rows),
        })
    }
}

impl FileParser for CsvParser {
    fn open(&self, file_path: &Path) -> ImporterResult<SourceTable> {
        let bytes = read_without_bom(file_path)?;
        self.parse_bytes(bytes)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 只读取第一个工作表
pub struct ExcelParser;

impl ExcelParser {
    fn first_sheet<R>(workbook: &mut R) -> ImporterResult<Range<Data>>
    where
        R: Reader<Cursor<Vec<u8>>>,
        ImportError: From<R::Error>,
    {
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        Ok(workbook.worksheet_range(&sheet_name)?)
    }

    /// 从内存字节解析
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - legacy: true = .xls（BIFF），false = .xlsx
    pub fn parse_bytes(&self, bytes: Vec<u8>, legacy: bool) -> ImporterResult<SourceTable> {
        let range = if legacy {
            let mut workbook = Xls::new(Cursor::new(bytes))?;
            Self::first_sheet(&mut workbook)?
        } else {
            let mut workbook = Xlsx::new(Cursor::new(bytes))?;
            Self::first_sheet(&mut workbook)?
        };

        let (height, width) = range.get_size();
        debug!(height, width, "工作表读取完成");

        let cell_text = |range: &Range<Data>, row: usize, col: usize| {
            range
                .get((row, col))
                .map(|cell| cell.to_string())
                .unwrap_or_default()
        };

        let headers: Vec<String> = if height == 0 {
            Vec::new()
        } else {
            (0..width).map(|c| clean_header(&cell_text(&range, 0, c))).collect()
        };

        let rows = (1..height).map(move |r| {
            Ok((0..width).map(|c| cell_text(&range, r, c)).collect())
        });

        Ok(SourceTable {
            headers,
            rows: Box::new(rows),
        })
    }
}

impl FileParser for ExcelParser {
    fn open(&self, file_path: &Path) -> ImporterResult<SourceTable> {
        let legacy = file_extension(file_path) == "xls";
        let bytes = read_without_bom(file_path)?;
        self.parse_bytes(bytes, legacy)
    }
}

/// 小写扩展名（无扩展名时为空字符串）
pub fn file_extension(file_path: &Path) -> String {
    file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn open(&self, file_path: &Path) -> ImporterResult<SourceTable> {
        match file_extension(file_path).as_str() {
            "csv" => CsvParser.open(file_path),
            "xlsx" | "xls" => ExcelParser.open(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
