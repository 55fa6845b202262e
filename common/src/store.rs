//! Local persistence: one JSON text blob per storage key.
//!
//! The browser sheets kept everything in `window.localStorage`. The CLI
//! analog is a directory of small JSON files, one per key: a scoring sheet
//! and an append-only submission log per judge, plus the admin's cache of
//! the last pasted aggregate text. Single writer, last writer wins, no
//! locking; concurrent sessions on the same data directory are out of scope.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::Submission;
use crate::score_sheet::SheetScores;

/// Default data directory, relative to wherever the session runs.
pub const DEFAULT_DATA_DIR: &str = ".tally";

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read one key's blob. An absent key is an empty value, not an error.
    fn read_key(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Ok(Some(contents))
    }

    fn write_key(&self, key: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("could not create data dir {}", self.dir.display()))?;
        let path = self.key_path(key);
        fs::write(&path, contents).with_context(|| format!("could not write {}", path.display()))?;
        debug!("saved {}", path.display());
        Ok(())
    }

    /// Load a judge's scoring sheet, empty if none has been saved yet.
    pub fn load_sheet(&self, judge: &str) -> Result<SheetScores> {
        match self.read_key(&sheet_key(judge))? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("scoring sheet for {judge} is not valid JSON")),
            None => Ok(SheetScores::new()),
        }
    }

    pub fn save_sheet(&self, judge: &str, scores: &SheetScores) -> Result<()> {
        self.write_key(&sheet_key(judge), &serde_json::to_string(scores)?)
    }

    /// Load a judge's submission log, empty if none has been saved yet.
    pub fn load_submissions(&self, judge: &str) -> Result<Vec<Submission>> {
        match self.read_key(&submissions_key(judge))? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("submission log for {judge} is not valid JSON")),
            None => Ok(Vec::new()),
        }
    }

    /// Append one submission to the judge's log.
    pub fn append_submission(&self, judge: &str, submission: &Submission) -> Result<()> {
        let mut log = self.load_submissions(judge)?;
        log.push(submission.clone());
        self.write_key(&submissions_key(judge), &serde_json::to_string(&log)?)
    }

    /// The exact serialized submission list, ready for the judge to copy to
    /// the admin. This text is the whole integration contract between the
    /// two sides.
    pub fn export_submissions(&self, judge: &str) -> Result<String> {
        let log = self.load_submissions(judge)?;
        Ok(serde_json::to_string(&log)?)
    }

    /// The admin's cache of the last pasted aggregate text.
    pub fn load_paste_cache(&self) -> Result<Option<String>> {
        self.read_key("paste-cache")
    }

    pub fn save_paste_cache(&self, raw: &str) -> Result<()> {
        self.write_key("paste-cache", raw)
    }
}

fn sheet_key(judge: &str) -> String {
    format!("sheet-{}", sanitize(judge))
}

fn submissions_key(judge: &str) -> String {
    format!("submissions-{}", sanitize(judge))
}

/// Judge names are free text; file names are not.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_submissions;
    use chrono::DateTime;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    static STORE_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn create_test_store() -> LocalStore {
        let unique = STORE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "tally_store_test_{}_{unique}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        LocalStore::new(dir)
    }

    fn create_test_submission(contestant: &str, total: i64) -> Submission {
        let mut criteria_scores = BTreeMap::new();
        criteria_scores.insert("Talent & Skill".to_string(), 20);
        Submission {
            submission_id: 1700000000000,
            judge_name: "Judge A".to_string(),
            contestant_id: contestant.to_string(),
            timestamp: DateTime::UNIX_EPOCH,
            total_score: total,
            criteria_scores,
        }
    }

    #[test]
    fn test_absent_keys_load_empty() {
        let store = create_test_store();
        assert!(store.load_sheet("Judge A").unwrap().is_empty());
        assert!(store.load_submissions("Judge A").unwrap().is_empty());
        assert!(store.load_paste_cache().unwrap().is_none());
    }

    #[test]
    fn test_sheet_round_trip() {
        let store = create_test_store();
        let mut sheet = SheetScores::new();
        sheet
            .entry("G01".to_string())
            .or_default()
            .insert("Talent & Skill".to_string(), 20);
        store.save_sheet("Judge A", &sheet).unwrap();
        assert_eq!(store.load_sheet("Judge A").unwrap(), sheet);
    }

    #[test]
    fn test_submission_log_appends_in_order() {
        let store = create_test_store();
        store
            .append_submission("Judge A", &create_test_submission("G01", 80))
            .unwrap();
        store
            .append_submission("Judge A", &create_test_submission("G02", 85))
            .unwrap();
        let log = store.load_submissions("Judge A").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].contestant_id, "G01");
        assert_eq!(log[1].contestant_id, "G02");
    }

    #[test]
    fn test_logs_are_separate_per_judge() {
        let store = create_test_store();
        store
            .append_submission("Judge A", &create_test_submission("G01", 80))
            .unwrap();
        assert!(store.load_submissions("Judge B").unwrap().is_empty());
    }

    #[test]
    fn test_export_text_ingests_back_to_the_same_records() {
        let store = create_test_store();
        let submission = create_test_submission("G01", 80);
        store.append_submission("Judge A", &submission).unwrap();
        let exported = store.export_submissions("Judge A").unwrap();
        assert_eq!(parse_submissions(&exported), vec![submission]);
    }

    #[test]
    fn test_paste_cache_round_trip() {
        let store = create_test_store();
        store.save_paste_cache("[{\"judgeName\":\"A\"}]").unwrap();
        assert_eq!(
            store.load_paste_cache().unwrap().as_deref(),
            Some("[{\"judgeName\":\"A\"}]")
        );
    }

    #[test]
    fn test_judge_names_sanitize_to_file_keys() {
        assert_eq!(sanitize("Judge A"), "judge-a");
        assert_eq!(sanitize("  "), "anonymous");
        assert_eq!(sanitize("../escape"), "---escape");
    }
}
