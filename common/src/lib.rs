//! A library with common types and scoring logic for the tally judging toolkit.

pub mod config;
pub mod ingest;
pub mod leaderboard;
pub mod score_sheet;
pub mod store;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scoring dimension with a maximum point value and optionally a fixed
/// set of selectable point values.
///
/// `options = None` means free numeric entry clamped to `max`; `Some(points)`
/// means the judge picks exactly one of the listed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub max: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<i64>>,
}

/// An entrant identified by a unique id and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contestant {
    pub id: String,
    pub name: String,
}

/// One judge's completed scoring event for one contestant.
///
/// This is the record judges persist locally and hand to the admin as pasted
/// text, so the wire format keeps the camelCase field names the browser
/// sheets exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Time-based id: epoch milliseconds at creation.
    pub submission_id: i64,
    pub judge_name: String,
    /// Soft reference to a [`Contestant`] id. Not enforced at parse time.
    pub contestant_id: String,
    pub timestamp: DateTime<Utc>,
    /// Sum of `criteria_scores`.
    pub total_score: i64,
    #[serde(default)]
    pub criteria_scores: BTreeMap<String, i64>,
}

/// A submission as it looks mid-paste: every field optional. Candidates are
/// promoted to [`Submission`] only when the required fields are present.
#[derive(Debug, Clone, Default)]
pub struct CandidateSubmission {
    pub submission_id: Option<i64>,
    pub judge_name: Option<String>,
    pub contestant_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub total_score: Option<i64>,
    pub criteria_scores: Option<BTreeMap<String, i64>>,
}

impl CandidateSubmission {
    /// Keep only candidates with a non-empty contestant reference, a
    /// non-empty judge name, and a defined total score. Everything else gets
    /// a best-effort default.
    pub fn validate(self) -> Option<Submission> {
        let contestant_id = self.contestant_id.filter(|id| !id.is_empty())?;
        let judge_name = self.judge_name.filter(|name| !name.is_empty())?;
        let total_score = self.total_score?;
        Some(Submission {
            submission_id: self.submission_id.unwrap_or(0),
            judge_name,
            contestant_id,
            timestamp: self.timestamp.unwrap_or(DateTime::UNIX_EPOCH),
            total_score,
            criteria_scores: self.criteria_scores.unwrap_or_default(),
        })
    }
}

/// The derived, ranked, per-contestant aggregate. Recomputed fresh on every
/// aggregation pass and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    /// 1-based position in the sorted sequence. Always contiguous, never
    /// shared, even when two contestants are fully tied.
    pub rank: usize,
    pub contestant_id: String,
    pub name: String,
    pub sample_count: usize,
    pub average_total: f64,
    pub average_tie_break: f64,
}

/// Where the aggregator reads submissions from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum SubmissionSource {
    /// Raw text pasted together from one or more judge exports.
    Paste,
    /// The submission log a judge session wrote on this machine.
    Local,
}
