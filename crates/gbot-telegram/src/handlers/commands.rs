/// Lowercase command name of `/cmd@botname args`; arguments are ignored.
///
/// Telegram may send `/cmd@botname arg1 ...` in groups.
pub fn parse_command(text: &str) -> String {
    let first = text.split_whitespace().next().unwrap_or("");

    first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

pub fn is_command(text: &str) -> bool {
    let t = text.trim_start();
    t.len() > 1 && t.starts_with('/')
}
