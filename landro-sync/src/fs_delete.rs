//! Deleting folder content on the local filesystem

use async_trait::async_trait;
use landro_index::{FileInfo, IgnoreMatcher};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};

use crate::delete_queue::DeleteHandler;
use crate::errors::{Result, SyncError};
use crate::scan_relay::ScanSender;

/// Parent of a folder-relative name, `None` at the folder root
fn parent_name(name: &str) -> Option<&str> {
    name.rsplit_once('/').map(|(parent, _)| parent)
}

/// Removal of files and directories below a folder root
#[derive(Debug, Clone)]
pub struct FolderFs {
    root: PathBuf,
}

impl FolderFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a folder-relative name, refusing anything outside the root
    pub fn native_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(SyncError::InvalidPath(name.to_string()));
        }
        Ok(name.split('/').fold(self.root.clone(), |path, part| path.join(part)))
    }

    /// Fail if any directory above `name` is a symlink
    ///
    /// Removal below a link would act on whatever the link points at, which
    /// may be outside the folder. A missing ancestor means nothing below it
    /// exists either.
    async fn check_ancestors(&self, name: &str) -> Result<()> {
        let mut path = self.root.clone();
        let mut parts = name.split('/').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                break;
            }
            path.push(part);
            match fs::symlink_metadata(&path).await {
                Ok(meta) if meta.file_type().is_symlink() => {
                    debug!("Refusing to delete {} below symlink {}", name, path.display());
                    return Err(SyncError::InvalidPath(name.to_string()));
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn remove_any(path: &Path) -> std::io::Result<()> {
        let meta = fs::symlink_metadata(path).await?;
        if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        }
    }
}

#[async_trait]
impl DeleteHandler for FolderFs {
    async fn delete_file(&self, file: &FileInfo, scan: &ScanSender) -> Result<()> {
        let path = self.native_path(&file.name)?;
        self.check_ancestors(&file.name).await?;

        match fs::symlink_metadata(&path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} already gone", file.name);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
            Ok(meta) if meta.is_dir() => {
                // Indexed as a file but a directory now; let the scanner sort it out
                scan.notify(file.name.clone());
                return Err(SyncError::TypeMismatch(file.name.clone()));
            }
            Ok(_) => {}
        }

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        trace!("Deleted file {}", file.name);

        if let Some(parent) = parent_name(&file.name) {
            scan.notify(parent);
        }
        Ok(())
    }

    async fn delete_dir(
        &self,
        name: &str,
        ignores: &IgnoreMatcher,
        scan: &ScanSender,
    ) -> Result<()> {
        let path = self.native_path(name)?;
        self.check_ancestors(name).await?;

        match fs::symlink_metadata(&path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Directory {} already gone", name);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
            Ok(meta) if !meta.is_dir() => {
                // Never list through a link; the scanner records what is there now
                scan.notify(name);
                return Err(SyncError::TypeMismatch(name.to_string()));
            }
            Ok(_) => {}
        }

        let mut entries = fs::read_dir(&path).await?;

        let mut deletable = Vec::new();
        let mut blocked = false;
        while let Some(entry) = entries.next_entry().await? {
            let child = format!("{}/{}", name, entry.file_name().to_string_lossy());
            let ignored = ignores.match_path(&child);
            if ignored.is_deletable() {
                deletable.push(entry.path());
            } else if ignored.is_ignored() {
                trace!("Directory {} keeps ignored {}", name, child);
                blocked = true;
            } else {
                // Content we were not asked to remove; the index may not know it yet
                scan.notify(child);
                blocked = true;
            }
        }

        if blocked {
            return Err(SyncError::NotEmpty(name.to_string()));
        }

        for child in deletable {
            Self::remove_any(&child).await?;
        }

        match fs::remove_dir(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        trace!("Deleted directory {}", name);

        if let Some(parent) = parent_name(name) {
            scan.notify(parent);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landro_index::FileType;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FolderFs) {
        let dir = TempDir::new().unwrap();
        let folder = FolderFs::new(dir.path());
        (dir, folder)
    }

    #[test]
    fn test_native_path_rejects_escapes() {
        let folder = FolderFs::new("/data/folder");
        assert!(folder.native_path("a/b.txt").is_ok());
        assert!(folder.native_path("../etc/passwd").is_err());
        assert!(folder.native_path("/etc/passwd").is_err());
        assert!(folder.native_path("").is_err());
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (dir, folder) = setup();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/a.txt"), b"hello").unwrap();

        let file = FileInfo::new("sub/a.txt", FileType::File);
        folder.delete_file(&file, &ScanSender::detached()).await.unwrap();

        assert!(!dir.path().join("sub/a.txt").exists());
        assert!(dir.path().join("sub").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_succeeds() {
        let (_dir, folder) = setup();
        let file = FileInfo::new("never-existed", FileType::File);
        assert!(folder.delete_file(&file, &ScanSender::detached()).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_file_that_became_directory() {
        let (dir, folder) = setup();
        std::fs::create_dir(dir.path().join("thing")).unwrap();

        let file = FileInfo::new("thing", FileType::File);
        let err = folder
            .delete_file(&file, &ScanSender::detached())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::TypeMismatch(_)));
        assert!(dir.path().join("thing").exists());
    }

    #[tokio::test]
    async fn test_delete_dir_removes_deletable_ignored_content() {
        let (dir, folder) = setup();
        std::fs::create_dir_all(dir.path().join("d/.cache")).unwrap();
        std::fs::write(dir.path().join("d/.DS_Store"), b"").unwrap();
        std::fs::write(dir.path().join("d/.cache/blob"), b"").unwrap();

        let ignores = IgnoreMatcher::new(["(?d).DS_Store", "(?d).cache"]).unwrap();
        folder
            .delete_dir("d", &ignores, &ScanSender::detached())
            .await
            .unwrap();

        assert!(!dir.path().join("d").exists());
    }

    #[tokio::test]
    async fn test_delete_dir_keeps_non_deletable_content() {
        let (dir, folder) = setup();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        std::fs::write(dir.path().join("d/notes.keep"), b"").unwrap();

        let ignores = IgnoreMatcher::new(["*.keep"]).unwrap();
        let err = folder
            .delete_dir("d", &ignores, &ScanSender::detached())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NotEmpty(ref d) if d == "d"));
        assert!(dir.path().join("d/notes.keep").exists());
    }

    #[tokio::test]
    async fn test_delete_dir_with_unknown_content_is_relayed() {
        let (dir, folder) = setup();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        std::fs::write(dir.path().join("d/new.txt"), b"").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let scan = ScanSender::from_channel(tx);
        let result = folder.delete_dir("d", &IgnoreMatcher::empty(), &scan).await;

        assert!(matches!(result, Err(SyncError::NotEmpty(_))));
        assert_eq!(rx.recv().await.as_deref(), Some("d/new.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_delete_dir_does_not_follow_symlink() {
        let (dir, folder) = setup();
        let outside = TempDir::new().unwrap();
        std::fs::create_dir(outside.path().join(".cache")).unwrap();
        std::fs::write(outside.path().join(".cache/blob"), b"").unwrap();
        std::fs::write(outside.path().join(".DS_Store"), b"").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("d")).unwrap();

        let ignores = IgnoreMatcher::new(["(?d).DS_Store", "(?d).cache"]).unwrap();
        let err = folder
            .delete_dir("d", &ignores, &ScanSender::detached())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::TypeMismatch(ref d) if d == "d"));
        assert!(outside.path().join(".DS_Store").exists());
        assert!(outside.path().join(".cache/blob").exists());
        assert!(std::fs::symlink_metadata(dir.path().join("d")).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_delete_below_symlinked_directory_is_refused() {
        let (dir, folder) = setup();
        let outside = TempDir::new().unwrap();
        std::fs::create_dir(outside.path().join("sub")).unwrap();
        std::fs::write(outside.path().join("x.txt"), b"precious").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let file = FileInfo::new("link/x.txt", FileType::File);
        let err = folder
            .delete_file(&file, &ScanSender::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPath(_)));
        assert!(outside.path().join("x.txt").exists());

        let err = folder
            .delete_dir("link/sub", &IgnoreMatcher::empty(), &ScanSender::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPath(_)));
        assert!(outside.path().join("sub").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_delete_file_removes_the_link_not_its_target() {
        let (dir, folder) = setup();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("target.txt"), b"precious").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("target.txt"),
            dir.path().join("shortcut"),
        )
        .unwrap();

        let link = FileInfo::new("shortcut", FileType::Symlink);
        folder.delete_file(&link, &ScanSender::detached()).await.unwrap();

        assert!(std::fs::symlink_metadata(dir.path().join("shortcut")).is_err());
        assert!(outside.path().join("target.txt").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_dir_succeeds() {
        let (_dir, folder) = setup();
        assert!(folder
            .delete_dir("gone", &IgnoreMatcher::empty(), &ScanSender::detached())
            .await
            .is_ok());
    }
}
