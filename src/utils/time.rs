//! YouTube `t=` time strings

use regex::Regex;
use std::sync::LazyLock;

static TIME_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s?)?$").expect("Invalid regex")
});

/// Parse a YouTube time string ("75", "75s", "1h2m3s") into seconds
pub fn parse_time_string(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let captures = TIME_STRING.captures(value)?;
    let part = |i: usize| -> f64 {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    Some(part(1) * 3600.0 + part(2) * 60.0 + part(3))
}
