// ==========================================
// 内容管理平台 - 通用参数化查询接口
// ==========================================
// 职责: 执行参数化 SQL，返回表格结果（列名 → 文本值）
// 约束: 参数一律使用占位符；id 列表只允许内联无符号整数
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// 表格结果的一行（NULL → 空字符串）
pub type TabularRow = HashMap<String, String>;

// ==========================================
// QueryExecutor Trait
// ==========================================
// 实现者: SqliteStore
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// 执行查询
    ///
    /// # 参数
    /// - sql: SQL 语句（位置占位符 ?1, ?2 ...）
    /// - params: 位置参数
    async fn query(&self, sql: &str, params: &[String]) -> RepositoryResult<Vec<TabularRow>>;
}

/// 将 id 集合内联为 IN 列表内容（如 "1,2,3"）
///
/// 说明: 超大文件会生成很长的 SQL，属于已知的规模上限
pub fn inline_id_list<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a u64>,
{
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// 读取行中的无符号整数列
pub fn row_u64(row: &TabularRow, column: &str) -> Option<u64> {
    row.get(column).and_then(|v| v.trim().parse::<u64>().ok())
}
