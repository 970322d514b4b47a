//! Argument-list builders for the wrapped scanners. Pure and stateless; the
//! runner executes whatever these produce without further interpretation.

use std::path::Path;

use crate::target::Target;

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| (*part).to_string()).collect()
}

/// Full-range SYN scan with service/OS detection and the default+vuln script
/// sets. Root privileges are required for `-sS`/`-O`, hence the sudo prefix.
pub fn nmap(host: &str) -> Vec<String> {
    let mut argv = strings(&[
        "sudo",
        "nmap",
        "-sS",
        "-p-",
        "-T4",
        "--open",
        "-v",
        "-sV",
        "-O",
        "--script",
        "default,vuln",
        "--reason",
        "--max-retries",
        "3",
        "--host-timeout",
        "1m",
    ]);
    argv.push(host.to_string());
    argv
}

pub fn gobuster(base_url: &str, wordlist: &Path, extensions: &str, threads: u32) -> Vec<String> {
    strings(&[
        "gobuster",
        "dir",
        "-u",
        base_url,
        "-w",
        &wordlist.to_string_lossy(),
        "-x",
        &normalize_extensions(extensions),
        "-t",
        &threads.to_string(),
        "-k",
    ])
}

/// dirb wants each extension dot-prefixed, unlike gobuster.
pub fn dirb(base_url: &str, wordlist: &Path, extensions: &str) -> Vec<String> {
    let dotted = normalize_extensions(extensions)
        .split(',')
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");
    strings(&["dirb", base_url, &wordlist.to_string_lossy(), "-X", &dotted])
}

/// nikto also writes its own copy into the report; the runner streams the
/// console output into the same file on top of it.
pub fn nikto(base_url: &str, report: &Path) -> Vec<String> {
    strings(&[
        "nikto",
        "-h",
        base_url,
        "-output",
        &report.to_string_lossy(),
    ])
}

/// Query-bearing targets get a direct level-3/risk-2 scan of the exact URL
/// the operator typed; bare hosts get a shallow crawl at reduced intensity.
pub fn sqlmap(target: &Target, threads: u32) -> Vec<String> {
    let threads = threads.to_string();
    if target.has_query() {
        let url = if target.raw.starts_with("http") {
            target.raw.clone()
        } else {
            target.base_url.clone()
        };
        strings(&[
            "sqlmap",
            "--batch",
            "--random-agent",
            "-u",
            &url,
            "--threads",
            &threads,
            "--level",
            "3",
            "--risk",
            "2",
        ])
    } else {
        strings(&[
            "sqlmap",
            "--batch",
            "--random-agent",
            "-u",
            &target.base_url,
            "--crawl",
            "1",
            "--threads",
            &threads,
            "--level",
            "2",
            "--risk",
            "1",
        ])
    }
}

fn normalize_extensions(extensions: &str) -> String {
    extensions.replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::normalize;
    use std::path::PathBuf;

    #[test]
    fn nmap_targets_the_host_last() {
        let argv = nmap("example.com");
        assert_eq!(argv[0], "sudo");
        assert_eq!(argv[1], "nmap");
        assert_eq!(argv.last().map(String::as_str), Some("example.com"));
        assert!(argv.contains(&"--script".to_string()));
    }

    #[test]
    fn gobuster_strips_spaces_from_extensions() {
        let argv = gobuster(
            "http://example.com",
            &PathBuf::from("/tmp/words.txt"),
            "php, html, txt",
            50,
        );
        let x_index = argv.iter().position(|arg| arg == "-x").unwrap();
        assert_eq!(argv[x_index + 1], "php,html,txt");
    }

    #[test]
    fn dirb_dots_every_extension() {
        let argv = dirb("http://example.com", &PathBuf::from("/tmp/w.txt"), "php,txt");
        assert_eq!(argv.last().map(String::as_str), Some(".php,.txt"));
    }

    #[test]
    fn sqlmap_uses_direct_scan_for_query_targets() {
        let target = normalize("http://example.com/item.php?id=1", "http").unwrap();
        let argv = sqlmap(&target, 5);
        assert!(argv.contains(&"http://example.com/item.php?id=1".to_string()));
        assert!(argv.contains(&"3".to_string()));
        assert!(!argv.contains(&"--crawl".to_string()));
    }

    #[test]
    fn sqlmap_crawls_bare_hosts() {
        let target = normalize("example.com", "http").unwrap();
        let argv = sqlmap(&target, 5);
        assert!(argv.contains(&"--crawl".to_string()));
        assert!(argv.contains(&"http://example.com".to_string()));
    }
}
