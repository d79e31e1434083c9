use std::io;
use std::path::{Path, PathBuf};

/// Owns the mirror root directory and performs every page/resource write.
#[derive(Debug, Clone)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    /// Creates the root directory if needed. Runs before any async work so
    /// later reads never race the bootstrap.
    pub fn new(base_dir: &Path) -> io::Result<Self> {
        let base_dir = base_dir.to_path_buf();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Writes `content` to `path`, creating missing parent directories.
    /// An existing file is overwritten.
    pub async fn save_file(&self, path: &Path, content: &[u8]) -> io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;

        Ok(path.to_path_buf())
    }

    /// Like [`save_file`](Self::save_file) but goes through a temporary
    /// sibling and a rename, so readers never see a half-written file.
    pub async fn save_file_atomic(&self, path: &Path, content: &[u8]) -> io::Result<PathBuf> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        self.save_file(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;

        Ok(path.to_path_buf())
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}
