// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（技术信息，默认）和荷兰文（用户信息）
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// 红线: 不读写全局 locale，语言始终由调用方显式传入
// ==========================================

/// 技术错误信息固定使用的语言
pub const TECHNICAL_LOCALE: &str = "en";

/// 按指定语言翻译消息（带参数，不修改全局语言）
///
/// 导入管道并发执行时每个任务可使用不同语言，因此不依赖全局 locale
///
/// # 参数
/// - key: 翻译键
/// - locale: 语言代码（"en" 或 "nl"，未知语言回退到 "en"）
/// - args: 占位符参数，替换模板中的 `%{name}`
///
/// # 示例
/// ```no_run
/// use cms_bulk_import::i18n::t_locale_with_args;
/// let msg = t_locale_with_args("import.invalid_id", "nl", &[("row", "2"), ("value", "abc")]);
/// ```
pub fn t_locale_with_args(key: &str, locale: &str, args: &[(&str, &str)]) -> String {
    fill_placeholders(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn fill_placeholders(mut result: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
