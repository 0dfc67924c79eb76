//! 本地文件存储

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use webfarm_core::{traits::FileStore, SchedulerError, SchedulerResult};

/// 以根目录为界的本地文件存储
///
/// 所有路径都相对于根目录解析，拒绝绝对路径和 `..`。
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative_path: &Path) -> SchedulerResult<PathBuf> {
        let escapes = relative_path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative_path.as_os_str().is_empty() {
            return Err(SchedulerError::InvalidTaskParams(format!(
                "非法的文件路径: {}",
                relative_path.display()
            )));
        }
        Ok(self.root.join(relative_path))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn write_file(&self, relative_path: &Path, data: &[u8]) -> SchedulerResult<()> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        debug!("写入文件 {} ({} 字节)", path.display(), data.len());
        Ok(())
    }

    async fn delete_file(&self, relative_path: &Path) -> SchedulerResult<bool> {
        let path = self.resolve(relative_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("删除文件 {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, relative_path: &Path) -> SchedulerResult<bool> {
        let path = self.resolve(relative_path)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let path = Path::new("avatars/user.png");

        store.write_file(path, b"png").await.unwrap();
        assert!(store.exists(path).await.unwrap());
        assert_eq!(std::fs::read(dir.path().join(path)).unwrap(), b"png");

        assert!(store.delete_file(path).await.unwrap());
        assert!(!store.delete_file(path).await.unwrap());
        assert!(!store.exists(path).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        assert!(store
            .write_file(Path::new("../outside.txt"), b"x")
            .await
            .is_err());
        assert!(store.delete_file(Path::new("/etc/passwd")).await.is_err());
    }
}
