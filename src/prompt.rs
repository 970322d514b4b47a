use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Print `question` (with its default, if any) and read one trimmed line.
/// Empty input, including EOF on a piped stdin, yields the default.
pub fn ask(question: &str, default: &str) -> io::Result<String> {
    if default.is_empty() {
        print!("{question}: ");
    } else {
        print!("{question} [{default}]: ");
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// The between-stage human gate. Anything but `q` continues.
pub fn confirm_continue() -> io::Result<bool> {
    print!("Continue to next step? (Enter to continue, 'q' then Enter to stop) [Enter]: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(!line.trim().eq_ignore_ascii_case("q"))
}

/// `0`, negative, or unparseable input means unbounded.
pub fn parse_timeout_seconds(answer: &str) -> Option<Duration> {
    match answer.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Some(Duration::from_secs(seconds)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_zero_means_unbounded() {
        assert_eq!(parse_timeout_seconds("0"), None);
        assert_eq!(parse_timeout_seconds(""), None);
        assert_eq!(parse_timeout_seconds("abc"), None);
        assert_eq!(parse_timeout_seconds("-5"), None);
    }

    #[test]
    fn positive_timeout_parses() {
        assert_eq!(parse_timeout_seconds("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_timeout_seconds(" 7 "), Some(Duration::from_secs(7)));
    }
}
