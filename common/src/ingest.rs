//! Best-effort ingestion of pasted judge exports.
//!
//! Judges hand results to the admin by copying their serialized submission
//! list and pasting it next to everyone else's, so the input is typically
//! several JSON arrays run together with no separator, sometimes with one
//! fragment mangled in transit. Ingestion cuts the blob apart at object
//! boundaries, keeps every record it can make sense of, and drops the rest
//! without failing the batch.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;

use crate::{CandidateSubmission, Submission};

/// Split a pasted blob into JSON object fragments.
///
/// Adjacent array boundaries (a `]` followed by a `[`) are joined into one
/// comma-separated stream, one outer bracket pair is stripped, and the
/// stream is cut at each seam between object literals. The seam characters
/// are consumed, so fragments come back missing their outer braces; those
/// are restored here before parsing.
fn split_fragments(raw: &str) -> Vec<String> {
    let mut stream = join_array_boundaries(raw.trim());
    if let Some(rest) = stream.strip_prefix('[') {
        stream = rest.to_string();
    }
    if let Some(rest) = stream.strip_suffix(']') {
        stream = rest.to_string();
    }

    let mut fragments = Vec::new();
    for piece in split_object_seams(&stream) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let mut fragment = String::with_capacity(piece.len() + 2);
        if !piece.starts_with('{') {
            fragment.push('{');
        }
        fragment.push_str(piece);
        if !piece.ends_with('}') {
            fragment.push('}');
        }
        fragments.push(fragment);
    }
    fragments
}

/// Replace every `]` that is followed (ignoring whitespace) by a `[` with a
/// single comma, turning two pastes into one stream.
fn join_array_boundaries(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ']' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && chars[j] == '[' {
                out.push(',');
                i = j + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Cut the stream wherever a `}` is followed (ignoring whitespace) by a `,`
/// and then a `{`. The matched seam characters are dropped.
fn split_object_seams(stream: &str) -> Vec<String> {
    let chars: Vec<char> = stream.chars().collect();
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '}' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && chars[j] == ',' {
                let mut k = j + 1;
                while k < chars.len() && chars[k].is_whitespace() {
                    k += 1;
                }
                if k < chars.len() && chars[k] == '{' {
                    pieces.push(std::mem::take(&mut current));
                    i = k + 1;
                    continue;
                }
            }
        }
        current.push(chars[i]);
        i += 1;
    }
    pieces.push(current);
    pieces
}

/// Parse an arbitrary block of pasted or stored text into every submission
/// record it contains.
///
/// A fragment that fails to parse is skipped and never aborts the rest. A
/// fragment may hold one record or an array of records. Candidates missing a
/// contestant reference, a judge name, or a total score are discarded. Empty
/// output is not an error.
pub fn parse_submissions(raw: &str) -> Vec<Submission> {
    let mut out = Vec::new();
    for fragment in split_fragments(raw) {
        let value: Value = match serde_json::from_str(&fragment) {
            Ok(value) => value,
            Err(err) => {
                debug!("skipping unparseable fragment ({err})");
                continue;
            }
        };
        let candidates = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        for item in candidates {
            match candidate_from_value(&item).validate() {
                Some(submission) => out.push(submission),
                None => debug!("discarding candidate missing judge, contestant, or total"),
            }
        }
    }
    out
}

/// Pull whatever fields are recognizable out of one parsed JSON value.
fn candidate_from_value(value: &Value) -> CandidateSubmission {
    CandidateSubmission {
        submission_id: value.get("submissionId").and_then(lenient_i64),
        judge_name: lenient_string(value.get("judgeName")),
        contestant_id: lenient_string(value.get("contestantId")),
        timestamp: value.get("timestamp").and_then(lenient_timestamp),
        total_score: value.get("totalScore").and_then(lenient_i64),
        criteria_scores: value.get("criteriaScores").and_then(|scores| {
            let object = scores.as_object()?;
            Some(
                object
                    .iter()
                    .filter_map(|(name, score)| lenient_i64(score).map(|s| (name.clone(), s)))
                    .collect(),
            )
        }),
    }
}

fn lenient_string(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(|s| s.trim().to_string())
}

/// Accept integers, floats that happen to hold integers, and numeric
/// strings. Anything else counts as undefined.
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Timestamps arrive either as RFC 3339 strings or as epoch milliseconds,
/// depending on which sheet variant exported them.
fn lenient_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => text.parse::<DateTime<Utc>>().ok(),
        Value::Number(_) => lenient_i64(value).and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Collapse repeated submissions caused by the same blob being pasted more
/// than once.
///
/// Identity is the (judge, contestant, total) triple, deliberately not the
/// submission id or timestamp. The first occurrence in processing order
/// wins. Known limitation of the coarse key: two genuinely different scoring
/// events by the same judge for the same contestant that land on the same
/// total are indistinguishable from a duplicate and collapse together.
pub fn dedup_submissions(submissions: Vec<Submission>) -> Vec<Submission> {
    let mut seen: HashSet<(String, String, i64)> = HashSet::new();
    let mut out = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let key = (
            submission.judge_name.clone(),
            submission.contestant_id.clone(),
            submission.total_score,
        );
        if seen.insert(key) {
            out.push(submission);
        } else {
            debug!(
                "dropping duplicate submission: judge={} contestant={} total={}",
                submission.judge_name, submission.contestant_id, submission.total_score
            );
        }
    }
    out
}

/// The full admin-side ingestion pipeline: parse, then dedup. Idempotent
/// over repeated pastes of the same text.
pub fn ingest(raw: &str) -> Vec<Submission> {
    dedup_submissions(parse_submissions(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_submission(judge: &str, contestant: &str, total: i64) -> Submission {
        let mut criteria_scores = BTreeMap::new();
        criteria_scores.insert("Talent & Skill".to_string(), total.min(25));
        Submission {
            submission_id: 1700000000000,
            judge_name: judge.to_string(),
            contestant_id: contestant.to_string(),
            timestamp: DateTime::UNIX_EPOCH,
            total_score: total,
            criteria_scores,
        }
    }

    fn export_blob(submissions: &[Submission]) -> String {
        serde_json::to_string(submissions).unwrap()
    }

    #[test_log::test]
    fn test_parse_single_export() {
        let blob = export_blob(&[
            create_test_submission("Judge A", "G01", 80),
            create_test_submission("Judge A", "G02", 90),
        ]);
        let parsed = parse_submissions(&blob);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].contestant_id, "G01");
        assert_eq!(parsed[1].total_score, 90);
    }

    #[test_log::test]
    fn test_parse_concatenated_exports_yields_union() {
        let first = export_blob(&[create_test_submission("Judge A", "G01", 80)]);
        let second = export_blob(&[
            create_test_submission("Judge B", "G01", 85),
            create_test_submission("Judge B", "G02", 70),
        ]);
        // two complete arrays back to back with no separator at all
        let pasted = format!("{first}{second}");
        let parsed = parse_submissions(&pasted);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].judge_name, "Judge B");
    }

    #[test_log::test]
    fn test_parse_concatenated_exports_with_whitespace() {
        let first = export_blob(&[create_test_submission("Judge A", "G01", 80)]);
        let second = export_blob(&[create_test_submission("Judge B", "G02", 70)]);
        let pasted = format!("{first}\n\n  {second}");
        assert_eq!(parse_submissions(&pasted).len(), 2);
    }

    #[test_log::test]
    fn test_parse_skips_mangled_fragment() {
        let good = create_test_submission("Judge A", "G01", 80);
        let pasted = format!(
            "[{},{{\"judgeName\":\"Judge B\",\"contestantId\":]}}][{}]",
            serde_json::to_string(&good).unwrap(),
            serde_json::to_string(&create_test_submission("Judge C", "G02", 75)).unwrap()
        );
        let parsed = parse_submissions(&pasted);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].judge_name, "Judge A");
        assert_eq!(parsed[1].judge_name, "Judge C");
    }

    #[test_log::test]
    fn test_parse_single_object_without_array() {
        let single = serde_json::to_string(&create_test_submission("Judge A", "G03", 65)).unwrap();
        let parsed = parse_submissions(&single);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].contestant_id, "G03");
    }

    #[test_log::test]
    fn test_parse_discards_incomplete_candidates() {
        let pasted = r#"[
            {"judgeName":"Judge A","totalScore":80},
            {"judgeName":"","contestantId":"G01","totalScore":80},
            {"judgeName":"Judge A","contestantId":"G01"},
            {"judgeName":"Judge A","contestantId":"G01","totalScore":80}
        ]"#;
        let parsed = parse_submissions(pasted);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].judge_name, "Judge A");
    }

    #[test_log::test]
    fn test_parse_accepts_loose_field_types() {
        // epoch-millisecond timestamps and stringified ids from the older sheet
        let pasted = r#"[{
            "submissionId": "1700000000123",
            "judgeName": "Judge A",
            "contestantId": "G01",
            "timestamp": 1700000000123,
            "totalScore": "85",
            "criteriaScores": {"Talent & Skill": 20}
        }]"#;
        let parsed = parse_submissions(pasted);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].submission_id, 1700000000123);
        assert_eq!(parsed[0].total_score, 85);
        assert_eq!(parsed[0].timestamp.timestamp_millis(), 1700000000123);
    }

    #[test_log::test]
    fn test_parse_empty_input() {
        assert!(parse_submissions("").is_empty());
        assert!(parse_submissions("   \n ").is_empty());
        assert!(parse_submissions("[]").is_empty());
    }

    #[test_log::test]
    fn test_dedup_first_occurrence_wins() {
        let mut first = create_test_submission("Judge A", "G01", 80);
        first.submission_id = 1;
        let mut second = create_test_submission("Judge A", "G01", 80);
        second.submission_id = 2;
        let deduped = dedup_submissions(vec![first, second]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].submission_id, 1);
    }

    #[test_log::test]
    fn test_dedup_keeps_distinct_totals() {
        let deduped = dedup_submissions(vec![
            create_test_submission("Judge A", "G01", 80),
            create_test_submission("Judge A", "G01", 81),
            create_test_submission("Judge B", "G01", 80),
        ]);
        assert_eq!(deduped.len(), 3);
    }

    #[test_log::test]
    fn test_ingest_same_paste_twice_is_idempotent() {
        let blob = export_blob(&[
            create_test_submission("Judge A", "G01", 80),
            create_test_submission("Judge B", "G02", 70),
        ]);
        let once = ingest(&blob);
        let twice = ingest(&format!("{blob}{blob}"));
        assert_eq!(once, twice);
    }
}
