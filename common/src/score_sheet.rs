//! The collector-side scoring sheet: per-criterion entries and running
//! totals for one judge session.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::Utc;

use crate::config::ScoringConfig;
use crate::{Criterion, Submission};

/// Scores entered so far, keyed by contestant id and then criterion name.
/// This is the exact shape persisted under the judge's sheet storage key.
pub type SheetScores = BTreeMap<String, BTreeMap<String, i64>>;

/// One judge's in-progress scoring state.
#[derive(Debug, Clone, Default)]
pub struct ScoreSheet {
    pub scores: SheetScores,
}

impl ScoreSheet {
    pub fn from_scores(scores: SheetScores) -> Self {
        Self { scores }
    }

    /// Apply one entry and return the value actually stored.
    ///
    /// Numeric criteria accept anything: non-numeric input counts as 0 and a
    /// value above the criterion max is silently clamped to the max, so the
    /// stored (and redisplayed) value is always the corrected one. Option
    /// criteria only ever store one of their listed values; anything else is
    /// rejected so the sheet can tell the judge to pick again.
    pub fn apply_entry(
        &mut self,
        criterion: &Criterion,
        contestant_id: &str,
        raw: &str,
    ) -> Result<i64> {
        let stored = match &criterion.options {
            None => {
                let value = raw.trim().parse::<i64>().unwrap_or(0);
                value.min(criterion.max)
            }
            Some(options) => {
                let Ok(value) = raw.trim().parse::<i64>() else {
                    bail!(
                        "{} takes one of {:?}, not {raw:?}",
                        criterion.name,
                        options
                    );
                };
                if !options.contains(&value) {
                    bail!("{} takes one of {:?}, not {value}", criterion.name, options);
                }
                value
            }
        };
        self.scores
            .entry(contestant_id.to_string())
            .or_default()
            .insert(criterion.name.clone(), stored);
        Ok(stored)
    }

    pub fn entry(&self, contestant_id: &str, criterion: &str) -> Option<i64> {
        self.scores.get(contestant_id)?.get(criterion).copied()
    }

    /// The running total for one contestant: the sum across all criteria,
    /// recomputed from scratch on every call so it can never drift from the
    /// stored entries. Unscored criteria count as 0.
    pub fn total(&self, config: &ScoringConfig, contestant_id: &str) -> i64 {
        config
            .criteria
            .iter()
            .map(|criterion| self.entry(contestant_id, &criterion.name).unwrap_or(0))
            .sum()
    }

    /// Turn the current sheet for one contestant into a submission record
    /// with a time-based id.
    ///
    /// Blocked while any criterion is still unscored; the judge corrects the
    /// sheet and submits again.
    pub fn finalize_submission(
        &self,
        config: &ScoringConfig,
        judge_name: &str,
        contestant_id: &str,
    ) -> Result<Submission> {
        let entries = self.scores.get(contestant_id);
        let mut criteria_scores = BTreeMap::new();
        let mut unscored = Vec::new();
        for criterion in &config.criteria {
            match entries.and_then(|sheet| sheet.get(&criterion.name)) {
                Some(&value) => {
                    criteria_scores.insert(criterion.name.clone(), value);
                }
                None => unscored.push(criterion.name.as_str()),
            }
        }
        if !unscored.is_empty() {
            bail!(
                "no score selected for: {}. Score every criterion and submit again.",
                unscored.join(", ")
            );
        }

        let now = Utc::now();
        Ok(Submission {
            submission_id: now.timestamp_millis(),
            judge_name: judge_name.to_string(),
            contestant_id: contestant_id.to_string(),
            timestamp: now,
            total_score: criteria_scores.values().sum(),
            criteria_scores,
        })
    }
}
