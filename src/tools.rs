use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Resolve `name` against `PATH`, accepting only executable regular files.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let candidate = PathBuf::from(name);
        return is_executable(&candidate).then_some(candidate);
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

pub fn is_available(name: &str) -> bool {
    find_in_path(name).is_some()
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Which of the two interchangeable directory brute-forcers to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirTool {
    Gobuster,
    Dirb,
}

/// Presence snapshot of the external scanners, taken once before any stage
/// runs so a missing tool aborts the pipeline early.
#[derive(Debug, Clone, Copy)]
pub struct Toolchain {
    pub nmap: bool,
    pub gobuster: bool,
    pub dirb: bool,
    pub nikto: bool,
    pub sqlmap: bool,
}

impl Toolchain {
    pub fn probe() -> Self {
        let toolchain = Self {
            nmap: is_available("nmap"),
            gobuster: is_available("gobuster"),
            dirb: is_available("dirb"),
            nikto: is_available("nikto"),
            sqlmap: is_available("sqlmap"),
        };
        debug!(?toolchain, "Probed external tools");
        toolchain
    }

    pub fn dir_tool(&self) -> Option<DirTool> {
        if self.gobuster {
            Some(DirTool::Gobuster)
        } else if self.dirb {
            Some(DirTool::Dirb)
        } else {
            None
        }
    }

    pub fn statuses(&self) -> [(&'static str, bool); 5] {
        [
            ("nmap", self.nmap),
            ("gobuster", self.gobuster),
            ("dirb", self.dirb),
            ("nikto", self.nikto),
            ("sqlmap", self.sqlmap),
        ]
    }
}
