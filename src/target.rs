use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("no target provided")]
    Empty,
    #[error("target '{0}' has no hostname")]
    MissingHost(String),
    #[error("failed to parse target URL: {0}")]
    Parse(#[from] url::ParseError),
}

/// Canonical view of the operator-supplied target. `host` feeds nmap and the
/// report directory name, `base_url` feeds the web-facing tools, and `raw` is
/// kept so sqlmap can attack the exact URL (query string included) that the
/// operator typed.
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub base_url: String,
    pub raw: String,
}

impl Target {
    /// Query-bearing targets get the aggressive direct sqlmap scan instead of
    /// the crawl variant.
    pub fn has_query(&self) -> bool {
        self.raw.contains('?') || self.raw.contains('=')
    }
}

/// Normalize raw operator input (bare host, host:port, or full URL with an
/// optional query string) into a hostname plus a base URL, applying
/// `scheme_hint` when the input carries no scheme.
pub fn normalize(raw: &str, scheme_hint: &str) -> Result<Target, TargetError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TargetError::Empty);
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return from_url(raw, raw);
    }

    if raw.contains('?') || raw.contains('=') {
        let with_scheme = format!("{scheme_hint}://{raw}");
        return from_url(&with_scheme, raw);
    }

    Ok(Target {
        host: raw.to_string(),
        base_url: format!("{scheme_hint}://{raw}"),
        raw: raw.to_string(),
    })
}

fn from_url(url_text: &str, raw: &str) -> Result<Target, TargetError> {
    let parsed = Url::parse(url_text)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| TargetError::MissingHost(raw.to_string()))?
        .to_string();
    Ok(Target {
        host,
        base_url: url_text.trim_end_matches('/').to_string(),
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_scheme_hint() {
        let target = normalize("example.com", "http").unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.base_url, "http://example.com");
        assert!(!target.has_query());
    }

    #[test]
    fn full_url_keeps_scheme_and_strips_trailing_slash() {
        let target = normalize("https://example.com/app/", "http").unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.base_url, "https://example.com/app");
    }

    #[test]
    fn query_string_without_scheme_is_prefixed() {
        let target = normalize("example.com/item.php?id=1", "https").unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.base_url, "https://example.com/item.php?id=1");
        assert!(target.has_query());
    }

    #[test]
    fn whitespace_only_input_is_rejected() {
        assert!(matches!(normalize("   ", "http"), Err(TargetError::Empty)));
    }

    #[test]
    fn ip_target_passes_through() {
        let target = normalize("10.0.0.5", "http").unwrap();
        assert_eq!(target.host, "10.0.0.5");
        assert_eq!(target.base_url, "http://10.0.0.5");
    }
}
