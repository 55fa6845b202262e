//! Rank contestants from a deduplicated submission set.

use itertools::Itertools;
use log::warn;

use crate::config::ScoringConfig;
use crate::{LeaderboardRow, Submission};

/// Round to two decimal places for display and comparison.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute per-contestant averages and produce the ranked leaderboard.
///
/// Contestants with no matching submissions are left out entirely rather
/// than shown with a zero average. Sorting is by rounded average total
/// descending, ties break by the average of the configured tie-break
/// criterion descending, and a full tie on both keys falls back to ascending
/// contestant id so the order stays deterministic. Ranks are the 1-based
/// positions in the sorted sequence, contiguous and never shared.
///
/// A submission whose tie-break criterion is missing contributes 0 to that
/// average's numerator; the divisor is always the contestant's sample count,
/// which is at least 1 for every included contestant, so there is no
/// division-by-zero path.
pub fn rank_contestants(submissions: &[Submission], config: &ScoringConfig) -> Vec<LeaderboardRow> {
    let grouped = submissions
        .iter()
        .map(|submission| (submission.contestant_id.as_str(), submission))
        .into_group_map();

    for id in grouped.keys() {
        if config.contestant(id).is_none() {
            warn!("ignoring submissions for unknown contestant id {id}");
        }
    }

    let tie_break = config.tie_break_criterion.as_str();
    let mut rows = Vec::new();
    for contestant in &config.contestants {
        let Some(matching) = grouped.get(contestant.id.as_str()) else {
            continue;
        };
        let sample_count = matching.len();
        let total_sum: i64 = matching.iter().map(|s| s.total_score).sum();
        let tie_break_sum: i64 = matching
            .iter()
            .map(|s| s.criteria_scores.get(tie_break).copied().unwrap_or(0))
            .sum();
        rows.push(LeaderboardRow {
            rank: 0,
            contestant_id: contestant.id.clone(),
            name: contestant.name.clone(),
            sample_count,
            average_total: round2(total_sum as f64 / sample_count as f64),
            average_tie_break: round2(tie_break_sum as f64 / sample_count as f64),
        });
    }

    rows.sort_by(|a, b| {
        b.average_total
            .total_cmp(&a.average_total)
            .then_with(|| b.average_tie_break.total_cmp(&a.average_tie_break))
            .then_with(|| a.contestant_id.cmp(&b.contestant_id))
    });
    for (position, row) in rows.iter_mut().enumerate() {
        row.rank = position + 1;
    }
    rows
}
