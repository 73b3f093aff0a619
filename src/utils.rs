use log::info;
use std::io;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "airgrid";

/// Per-user default data root, e.g. `~/.local/share/airgrid` on Linux.
pub fn get_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join(DATA_DIR_NAME))
}

pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::other(format!(
                    "Data path exists but is not a directory: {}",
                    path.display()
                )));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating data directory: {}", path.display());
            std::fs::create_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_exists_creates_and_rejects_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a").join("b");
        ensure_dir_exists(&nested)?;
        assert!(nested.is_dir());
        ensure_dir_exists(&nested)?;

        let file = dir.path().join("file");
        std::fs::write(&file, "x")?;
        assert!(ensure_dir_exists(&file).is_err());
        Ok(())
    }
}
