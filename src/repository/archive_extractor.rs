// ==========================================
// 内容管理平台 - 附件文件包解压
// ==========================================
// 职责: 将随导入上传的 zip 文件包解压到任务专属目录
// 红线: 拒绝解压到目标目录之外的条目（../ 等）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

// ==========================================
// ArchiveExtractor Trait
// ==========================================
// 实现者: ZipArchiveExtractor
pub trait ArchiveExtractor: Send + Sync {
    /// 解压文件包
    ///
    /// # 参数
    /// - archive: 文件包路径
    /// - target_dir: 目标目录（不存在时创建）
    ///
    /// # 返回
    /// - Ok(usize): 解压出的文件数
    fn extract(&self, archive: &Path, target_dir: &Path) -> RepositoryResult<usize>;
}

// ==========================================
// ZipArchiveExtractor
// ==========================================
pub struct ZipArchiveExtractor;

impl ArchiveExtractor for ZipArchiveExtractor {
    fn extract(&self, archive: &Path, target_dir: &Path) -> RepositoryResult<usize> {
        if !archive.exists() {
            return Err(RepositoryError::ArchiveError(format!(
                "文件包不存在: {}",
                archive.display()
            )));
        }

        let file = File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        fs::create_dir_all(target_dir)?;

        let mut extracted = 0;
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;

            let relative = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    warn!(entry = %entry.name(), "跳过越界条目");
                    continue;
                }
            };
            let out_path = target_dir.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = File::create(&out_path)?;
            io::copy(&mut entry, &mut out_file)?;
            extracted += 1;
        }

        debug!(archive = %archive.display(), files = extracted, "文件包解压完成");
        Ok(extracted)
    }
}
