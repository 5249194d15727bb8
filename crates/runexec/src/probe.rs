use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// 檢查工具是否存在於執行路徑。 / Answers whether a program can be found on the search path.
pub trait ToolProbe: Send + Sync {
    fn is_available(&self, program: &str) -> bool;
}

/// 以 `PATH` 搜尋可執行檔。 / Looks programs up in the `PATH` directories, without spawning anything.
#[derive(Debug, Clone, Default)]
pub struct PathProbe {
    path: Option<OsString>,
}

impl PathProbe {
    /// 每次查詢時讀取目前的 `PATH`。 / Reads `PATH` from the environment on every lookup.
    pub fn from_env() -> Self {
        Self { path: None }
    }

    /// 使用固定的搜尋路徑（測試用）。 / Uses a fixed search path instead of the environment.
    pub fn with_path(path: impl Into<OsString>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// 回傳找到的完整路徑。 / Returns the full path of the first match.
    pub fn find(&self, program: &str) -> Option<PathBuf> {
        let direct = Path::new(program);
        if direct.components().count() > 1 {
            return is_executable(direct).then(|| direct.to_path_buf());
        }
        let search = self.path.clone().or_else(|| env::var_os("PATH"))?;
        env::split_paths(&search)
            .flat_map(|dir| candidates(&dir, program))
            .find(|candidate| is_executable(candidate))
    }
}

impl ToolProbe for PathProbe {
    fn is_available(&self, program: &str) -> bool {
        let found = self.find(program);
        tracing::trace!(program, found = ?found, "PATH probe");
        found.is_some()
    }
}

#[cfg(windows)]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    let extensions = env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT;.COM".to_string());
    std::iter::once(dir.join(program))
        .chain(
            extensions
                .split(';')
                .filter(|ext| !ext.is_empty())
                .map(|ext| dir.join(format!("{program}{}", ext.to_ascii_lowercase()))),
        )
        .collect()
}

#[cfg(not(windows))]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
