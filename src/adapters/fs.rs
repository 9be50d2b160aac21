use crate::domain::ports::ArtifactStore;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// 從本機模型目錄讀取模型檔
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    base_path: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn exists(&self, name: &str) -> bool {
        self.full_path(name).is_file()
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(name))?;
        Ok(data)
    }

    fn location(&self, name: &str) -> String {
        self.full_path(name).display().to_string()
    }
}
