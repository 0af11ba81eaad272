//! Tag sequences: storage codec, request parsing, and popularity ranking.
//!
//! Tags are persisted as a JSON array of strings in a single text column. The
//! read path never fails on bad data: anything that is not an array of strings
//! decodes to an empty sequence.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

/// Serialize a tag sequence for storage.
pub fn encode(tags: &[String]) -> String {
    serde_json::Value::from(tags.to_vec()).to_string()
}

/// Decode a stored tag sequence, degrading corrupt input to no tags.
pub fn decode(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(tags) => tags,
        Err(err) => {
            debug!(
                target: "postline::domain::tags",
                error = %err,
                "stored tag data is not a JSON string array; treating as empty"
            );
            Vec::new()
        }
    }
}

/// Trim, drop empties, and de-duplicate while keeping first-seen order.
pub fn normalize<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for tag in tags {
        let trimmed = tag.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            result.push(trimmed.to_string());
        }
    }
    result
}

/// Split a comma-separated filter value (`"rust, web,,api"`) into tags.
pub fn parse_list(raw: &str) -> Vec<String> {
    normalize(raw.split(','))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Count tag occurrences across every sequence and keep the top `limit`,
/// highest count first, ties ordered by tag ascending.
pub fn rank<I>(sequences: I, limit: usize) -> Vec<TagCount>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for tags in sequences {
        for tag in tags {
            *counts.entry(tag).or_default() += 1;
        }
    }

    let mut ranked: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_json_arrays() {
        assert_eq!(
            decode(Some(r#"["python","api"]"#)),
            vec!["python".to_string(), "api".to_string()]
        );
    }

    #[test]
    fn decode_degrades_corrupt_input() {
        assert!(decode(Some("not json")).is_empty());
        assert!(decode(Some(r#"{"a":1}"#)).is_empty());
        assert!(decode(Some(r#"["ok", 3]"#)).is_empty());
        assert!(decode(Some("")).is_empty());
        assert!(decode(None).is_empty());
    }

    #[test]
    fn encode_output_decodes_back() {
        let tags = vec!["say \"hi\"".to_string(), "ünïcode".to_string()];
        assert_eq!(decode(Some(&encode(&tags))), tags);
    }

    #[test]
    fn parse_list_trims_and_skips_empty_tokens() {
        assert_eq!(
            parse_list(" rust, web,,api ,rust"),
            vec!["rust".to_string(), "web".to_string(), "api".to_string()]
        );
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn rank_orders_by_count_then_name() {
        let sequences = vec![
            vec!["b".to_string(), "a".to_string()],
            vec!["b".to_string(), "c".to_string()],
            vec!["a".to_string()],
            vec!["d".to_string()],
        ];

        let ranked = rank(sequences, 3);
        let names: Vec<&str> = ranked.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(ranked[0].count, 2);
        assert_eq!(ranked[2].count, 1);
    }
}
