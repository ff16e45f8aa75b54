// ==========================================
// 内容管理平台 - 导入结果与任务持久化模型
// ==========================================
// 职责: ImportResult（贯穿整个管道的可变结果对象）
//       ImportJob（任务行）、ImportLog（审计日志行）
// 红线: ImportResult 无论成功失败都返回给调用方
// ==========================================

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ImportResult - 导入结果
// ==========================================
// errors 与 user_friendly_errors 一一对应（技术信息 / 本地化信息）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub items_total: usize,
    pub items_created: usize,
    pub items_updated: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub user_friendly_errors: Vec<String>,
    /// 已创建的任务 id（仅在任务行写入成功后设置）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,
}

impl ImportResult {
    /// 记录一个阻断错误（失败计数 +1）
    pub fn add_failure(&mut self, technical: String, localized: String) {
        self.failed += 1;
        self.errors.push(technical);
        self.user_friendly_errors.push(localized);
    }

    /// 是否存在阻断错误
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// 拼接后的技术错误日志（写入审计日志）
    pub fn error_log(&self) -> String {
        self.errors.join("\n")
    }
}

// ==========================================
// ImportJob - 导入任务行
// ==========================================
// 对齐: import_job 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub name: String,
    pub start_on: DateTime<Utc>,
    pub added_by: String,
    pub user_id: u64,
    pub tenant_id: i32,
    pub data: String, // 序列化后的 ImportRecord 列表
}

// ==========================================
// ImportLog - 导入审计日志
// ==========================================
// 对齐: import_log 表
// 红线: 每次执行都写入（成功或失败）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLog {
    pub run_id: String,
    pub job_id: Option<u64>,
    pub entity_type: String,
    pub items_total: usize,
    pub items_created: usize,
    pub items_updated: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: String,
    pub added_by: String,
    pub added_on: NaiveDateTime,
}

impl ImportLog {
    pub fn from_result(
        run_id: &str,
        entity_type: &str,
        added_by: &str,
        result: &ImportResult,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            job_id: result.job_id,
            entity_type: entity_type.to_string(),
            items_total: result.items_total,
            items_created: result.items_created,
            items_updated: result.items_updated,
            successful: result.successful,
            failed: result.failed,
            errors: result.error_log(),
            added_by: added_by.to_string(),
            added_on: Utc::now().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_failure_keeps_lists_parallel() {
        let mut result = ImportResult::default();
        result.add_failure("technical 1".to_string(), "lokaal 1".to_string());
        result.add_failure("technical 2".to_string(), "lokaal 2".to_string());

        assert_eq!(result.failed, 2);
        assert_eq!(result.errors.len(), result.user_friendly_errors.len());
        assert_eq!(result.error_log(), "technical 1\ntechnical 2");
        assert!(result.has_failures());
    }

    #[test]
    fn test_log_copies_counters() {
        let mut result = ImportResult {
            items_total: 3,
            items_created: 2,
            items_updated: 1,
            successful: 3,
            ..Default::default()
        };
        result.job_id = Some(12);

        let log = ImportLog::from_result("run-1", "product", "tester", &result);
        assert_eq!(log.items_total, 3);
        assert_eq!(log.job_id, Some(12));
        assert_eq!(log.failed, 0);
        assert_eq!(log.errors, "");
    }
}
