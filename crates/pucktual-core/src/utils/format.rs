/// Format a mass in grams with one decimal, e.g. `18.2g`
pub fn format_grams(grams: f64) -> String {
    format!("{:.1}g", grams)
}

/// Format a shot time, e.g. `28s` or `1m 05s` for long shots
pub fn format_seconds(seconds: u32) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
