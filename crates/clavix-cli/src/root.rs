use clavix_core::paths::CLAVIX_DIR;
use std::path::{Path, PathBuf};

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `CLAVIX_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of the cwd containing `.clavix/`
/// 3. Nearest ancestor of the cwd containing `.git/`
/// 4. The cwd itself
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&cwd)
}

fn resolve_from(cwd: &Path) -> PathBuf {
    find_upward(cwd, CLAVIX_DIR)
        .or_else(|| find_upward(cwd, ".git"))
        .unwrap_or_else(|| cwd.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(dir.path())), dir.path());
    }

    #[test]
    fn finds_clavix_dir_above_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".clavix")).unwrap();
        let deep = dir.path().join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(resolve_from(&deep), dir.path());
    }

    #[test]
    fn clavix_beats_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let inner = dir.path().join("app");
        std::fs::create_dir_all(inner.join(".clavix")).unwrap();
        assert_eq!(resolve_from(&inner), inner);
    }

    #[test]
    fn falls_back_to_cwd() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        // A .git or .clavix further up the real filesystem would win, so only
        // check that something at or above `nested` is returned.
        assert!(nested.starts_with(resolve_from(&nested)));
    }
}
