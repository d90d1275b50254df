//! Parsing of sub-topic classifications.
//!
//! The analysis model answers with one `name, status` pair per line.
//! Lines that do not follow that shape are skipped.

use crate::conversation::sub_topic::SubTopicStatus;

/// Result of one discourse analysis: classified sub-topics plus the
/// regenerated running summary. Applied all together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscourseUpdate {
    pub statuses: Vec<(String, SubTopicStatus)>,
    pub summary: String,
}

/// Parse `name, status` lines, tolerating list bullets and numbering.
pub fn parse_sub_topic_lines(text: &str) -> Vec<(String, SubTopicStatus)> {
    text.lines()
        .filter_map(|line| {
            let (name, status) = strip_list_marker(line).rsplit_once(',')?;
            let name = name.trim().trim_matches('"');
            if name.is_empty() {
                return None;
            }
            let status = status.parse().ok()?;
            Some((name.to_string(), status))
        })
        .collect()
}

/// Drop a leading `-`, `*`, `•` or `1.` / `1)` list marker.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim().trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && matches!(line[digits..].chars().next(), Some('.' | ')')) {
        return line[digits + 1..].trim_start();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_lines() {
        let parsed = parse_sub_topic_lines("healthcare, Being Discussed\npolitics, Not Discussed\n");
        assert_eq!(
            parsed,
            vec![
                ("healthcare".to_string(), SubTopicStatus::BeingDiscussed),
                ("politics".to_string(), SubTopicStatus::NotDiscussed),
            ]
        );
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let text = "Here are the topics:\n- taxes, Well Discussed\n1. \"ai\", being discussed\nnonsense, maybe\n, Being Discussed";
        let parsed = parse_sub_topic_lines(text);
        assert_eq!(
            parsed,
            vec![
                ("taxes".to_string(), SubTopicStatus::WellDiscussed),
                ("ai".to_string(), SubTopicStatus::BeingDiscussed),
            ]
        );
    }

    #[test]
    fn test_parse_keeps_leading_numbers_in_names() {
        let parsed = parse_sub_topic_lines("2024 election, Well Discussed");
        assert_eq!(parsed, vec![("2024 election".to_string(), SubTopicStatus::WellDiscussed)]);
    }
}
