//! Structural reference extraction (`Article 4.3.2(a)`, `§ 12`, bare `4.3.2`).

use once_cell::sync::Lazy;
use regex::Regex;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\b(article|section|paragraph|regulation|rule|art\.|sec\.|para\.|reg\.)|(§))\s*(\d+(?:\.\d+)*)((?:\([a-z0-9]+\))*)",
    )
    .expect("invalid regex")
});

static DOTTED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)+\b").expect("invalid regex"));

static SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([a-z0-9]+)\)").expect("invalid regex"));

/// Tokens pulled out of the text plus the text with those spans blanked.
#[derive(Debug, Default)]
pub struct Extracted {
    pub tokens: Vec<String>,
    pub remainder: String,
}

fn normalize_type(raw: &str) -> &'static str {
    match raw.trim_end_matches('.').to_lowercase().as_str() {
        "art" | "article" => "article",
        "sec" | "section" | "§" => "section",
        "para" | "paragraph" => "paragraph",
        "reg" | "regulation" => "regulation",
        _ => "rule",
    }
}

/// `4.3.2` + `(a)(ii)` -> `4.3.2.a.ii`
fn normalize_number(number: &str, suffix: &str) -> String {
    let mut normalized = number.to_lowercase();
    for cap in SUFFIX.captures_iter(&suffix.to_lowercase()) {
        normalized.push('.');
        normalized.push_str(&cap[1]);
    }
    normalized
}

/// Extract references from already lowercased text. Each typed reference
/// yields `{type}_{number}` followed by `{number}`; remaining dotted numbers
/// yield themselves.
pub fn extract(text: &str) -> Extracted {
    let mut tokens = Vec::new();
    let mut remainder = blank_spans(text, REFERENCE.captures_iter(text).filter_map(|cap| {
        let whole = cap.get(0)?;
        let kind = cap.get(1).or_else(|| cap.get(2))?.as_str();
        let number = normalize_number(&cap[3], cap.get(4).map_or("", |m| m.as_str()));
        tokens.push(format!("{}_{}", normalize_type(kind), number));
        tokens.push(number);
        Some((whole.start(), whole.end()))
    }));

    let dotted: Vec<(usize, usize)> = DOTTED_NUMBER
        .find_iter(&remainder)
        .map(|m| {
            tokens.push(m.as_str().to_string());
            (m.start(), m.end())
        })
        .collect();
    remainder = blank_spans(&remainder, dotted.into_iter());

    Extracted { tokens, remainder }
}

fn blank_spans(text: &str, spans: impl Iterator<Item = (usize, usize)>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in spans {
        out.push_str(&text[last..start]);
        out.push(' ');
        last = end;
    }
    out.push_str(&text[last..]);
    out
}
