use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use sha2::{Digest, Sha256};

/// Directory stamp shared by the run directory and every report filename,
/// e.g. `20260830_142530`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Create `powertest_reports_{host}_{stamp}` under `base` and return it.
pub fn create_run_dir(base: &Path, host: &str, stamp: &str) -> Result<PathBuf> {
    let dir = base.join(format!("powertest_reports_{host}_{stamp}"));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn report_path(dir: &Path, tool: &str, host: &str, stamp: &str) -> PathBuf {
    dir.join(format!("{tool}_{host}_{stamp}.txt"))
}

/// Seed a report file with its title header. Truncates: this runs once per
/// stage before the runner starts appending.
pub fn write_title(path: &Path, title: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    write!(file, "{}\nCreated: {}\n\n", title, Local::now().to_rfc3339())
        .with_context(|| format!("Failed to write report title: {}", path.display()))?;
    Ok(())
}

/// Compute the SHA256 digest of the file at `path` and return it as a hex string.
pub fn compute_sha256(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Write a `<report>.sha256` sidecar recording the report's digest, so a
/// finding can later be tied to the exact bytes captured during the run.
pub fn write_digest(report: &Path) -> Result<String> {
    let digest = compute_sha256(report)?;
    let sidecar = sidecar_path(report);
    let mut file = File::create(&sidecar)
        .with_context(|| format!("Failed to create digest file: {}", sidecar.display()))?;
    writeln!(file, "{}  {}", digest, report.display())
        .with_context(|| format!("Failed to write digest file: {}", sidecar.display()))?;
    Ok(digest)
}

pub fn sidecar_path(report: &Path) -> PathBuf {
    let mut name = report.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Sorted listing of the run directory for the end-of-run summary.
pub fn list_reports(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read report directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn compute_sha256_is_stable() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("digest.bin");
        fs::write(&file_path, b"powertest").unwrap();

        let first = compute_sha256(&file_path).unwrap();
        let second = compute_sha256(&file_path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn digest_sidecar_sits_next_to_report() {
        let temp = tempdir().unwrap();
        let report = temp.path().join("nmap_host_stamp.txt");
        fs::write(&report, b"scan output").unwrap();

        let digest = write_digest(&report).unwrap();
        let sidecar = sidecar_path(&report);
        assert!(sidecar.is_file());
        let content = fs::read_to_string(&sidecar).unwrap();
        assert!(content.starts_with(&digest));
    }

    #[test]
    fn title_header_truncates_and_stamps() {
        let temp = tempdir().unwrap();
        let report = temp.path().join("report.txt");
        fs::write(&report, b"stale").unwrap();

        write_title(&report, "Nmap scan report for host").unwrap();
        let content = fs::read_to_string(&report).unwrap();
        assert!(content.starts_with("Nmap scan report for host\nCreated: "));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn run_dir_embeds_host_and_stamp() {
        let temp = tempdir().unwrap();
        let dir = create_run_dir(temp.path(), "example.com", "20260830_120000").unwrap();
        assert!(dir.is_dir());
        assert!(
            dir.file_name()
                .unwrap()
                .to_string_lossy()
                .contains("example.com")
        );
    }
}
