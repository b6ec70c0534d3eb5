use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

// ── Numeric parsers ───────────────────────────────────────────────────────────

/// Parse a locale-formatted decimal: strip thousands separators, parse.
/// "1,234.56" → 1234.56 | "0" → 0.0 | "" / "abc" → None
///
/// A failed parse is None, never zero; zero is a real price.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', "");
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

/// Parse an amount with optional K/M/B shorthand.
/// "10.5K" → 10_500 | "1.2M" → 1_200_000 | "25.3K" → 25_300 | "1.2345" → 1.2345
pub fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', "");
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(p) = s.strip_suffix('B') {
        (p, 1e9)
    } else if let Some(p) = s.strip_suffix('M') {
        (p, 1e6)
    } else if let Some(p) = s.strip_suffix('K') {
        (p, 1e3)
    } else {
        (s.as_str(), 1.0)
    };

    let num: f64 = num_str.trim().parse().ok()?;
    Some(num * multiplier)
}

/// Parse a percent string keeping the sign. "+12.34%" → 12.34 | "-5%" → -5.0
pub fn parse_pct(s: &str) -> Option<f64> {
    let s = s.trim().replace('%', "").replace(',', "");
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

// ── Timestamps ────────────────────────────────────────────────────────────────

/// The listing cards render schedule timestamps as "2024-03-15 10:00:00".
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S").ok()
}

// ── Display names ─────────────────────────────────────────────────────────────

static NAME_JUNK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-&]").expect("name junk regex"));
static WS_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Tidy a candidate display name: punctuation (other than `-`/`&`) becomes
/// spaces, whitespace runs collapse. Single characters are not names.
pub fn tidy_name(s: &str) -> Option<String> {
    let cleaned = NAME_JUNK.replace_all(s, " ");
    let cleaned = WS_RUN.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();
    if cleaned.chars().count() > 1 {
        Some(cleaned.to_string())
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
