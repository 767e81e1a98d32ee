//! Small stateless helpers shared by the formatter, the subscriber and
//! step scripts.

use crate::Result;
use chrono::Datelike;
use serde::Serialize;

/// Current local time as `Mon Oct 19 2026 3:04:05 PM`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%a %b %d %Y %-I:%M:%S %p").to_string()
}

/// Serialize `value` as JSON indented with four spaces.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Trim `input`, drop its first embedded newline and collapse every run of
/// two or more whitespace characters into a single space.
pub fn trim(input: &str) -> String {
    let trimmed = input.trim().replacen('\n', "", 1);

    let mut out = String::with_capacity(trimmed.len());
    let mut run = String::new();
    for c in trimmed.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_whitespace(&mut out, &mut run);
        out.push(c);
    }
    flush_whitespace(&mut out, &mut run);
    out
}

fn flush_whitespace(out: &mut String, run: &mut String) {
    match run.chars().count() {
        0 => {}
        1 => out.push_str(run),
        _ => out.push(' '),
    }
    run.clear();
}

/// Format a date as `YYYY-MM-DD`.
pub fn parse_date<D: Datelike>(date: &D) -> String {
    format!("{}-{:02}-{:02}", date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_render_json_uses_four_space_indent() {
        let rendered = render_json(&serde_json::json!({ "url": "https://example.com" })).unwrap();
        assert_eq!(rendered, "{\n    \"url\": \"https://example.com\"\n}");
    }

    #[test]
    fn test_trim_collapses_whitespace() {
        assert_eq!(trim("  hello   world  "), "hello world");
        assert_eq!(trim("a\tb"), "a\tb");
        assert_eq!(trim("line one\nline two"), "line oneline two");
    }

    #[test]
    fn test_trim_only_drops_first_newline() {
        assert_eq!(trim("a\nb\nc"), "ab\nc");
    }

    #[test]
    fn test_parse_date_pads() {
        let date = NaiveDate::from_ymd_opt(2015, 3, 7).unwrap();
        assert_eq!(parse_date(&date), "2015-03-07");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert!(ts.ends_with("AM") || ts.ends_with("PM"));
        assert_eq!(ts.split_whitespace().count(), 6);
    }
}
