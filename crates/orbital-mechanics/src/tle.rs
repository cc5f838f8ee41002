//! Three-line element text parsing (name line + two element lines)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeLineRecord {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

fn is_line(line: &str, number: char) -> bool {
    let mut chars = line.chars();
    chars.next() == Some(number) && chars.next() == Some(' ')
}

/// Parse a CelesTrak-style `FORMAT=tle` payload. Name lines are optional;
/// anything that does not pair into `1 ...` / `2 ...` is skipped.
pub fn parse_three_line(text: &str) -> Vec<ThreeLineRecord> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut records = Vec::new();
    let mut pending_name: Option<&str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if is_line(line, '1') && i + 1 < lines.len() && is_line(lines[i + 1], '2') {
            records.push(ThreeLineRecord {
                name: pending_name.take().map(|n| n.trim_start_matches("0 ").to_string()),
                line1: line.to_string(),
                line2: lines[i + 1].to_string(),
            });
            i += 2;
        } else {
            pending_name = Some(line);
            i += 1;
        }
    }

    records
}
