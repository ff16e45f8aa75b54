// ==========================================
// 内容管理平台 - 领域模型层
// ==========================================
// 职责: 定义导入请求、字段定义、导入记录、导入结果
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod field;
pub mod import_job;
pub mod import_record;
pub mod import_result;
pub mod types;

// 重导出核心类型
pub use field::{
    ComboBoxDefinition, ComboBoxLiteral, ComboBoxOptions, ComboBoxSource, FieldDefinition,
    FieldTable, LinkTypeRule,
};
pub use import_job::{FieldMapping, ImportActor, ImportJobRequest, LinkDetailMapping, LinkMapping};
pub use import_record::{
    FileAttachment, ImportRecord, Item, ItemDetail, ItemLink, PendingAttachment,
};
pub use import_result::{ImportJob, ImportLog, ImportResult};
pub use types::{DateTimeKind, FieldScope, InputType};
