//! Event configuration: criteria, contestants, and aggregation settings.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{Contestant, Criterion};

/// Everything the collector and the aggregator need to know about one event.
///
/// The tie-break criterion is explicit configuration here rather than a name
/// assumed inside the ranker, and [`ScoringConfig::validate`] checks it
/// against the criteria list at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub criteria: Vec<Criterion>,
    pub contestants: Vec<Contestant>,
    /// Name of the criterion whose average resolves equal overall averages.
    pub tie_break_criterion: String,
    /// Shared string gating the admin leaderboard view. A casual deterrent
    /// against curious judges, not authentication.
    #[serde(default = "default_passcode")]
    pub admin_passcode: String,
}

fn default_passcode() -> String {
    "showtime".to_string()
}

impl Default for ScoringConfig {
    /// The built-in event: five option-restricted criteria totalling 100
    /// points and the eight competing teams.
    fn default() -> Self {
        let step_options = |max: i64| -> Vec<i64> { (1..=max / 5).map(|n| n * 5).collect() };
        Self {
            criteria: vec![
                Criterion {
                    name: "Creativity & Originality".to_string(),
                    max: 25,
                    options: Some(step_options(25)),
                },
                Criterion {
                    name: "Relevance to the Theme".to_string(),
                    max: 20,
                    options: Some(step_options(20)),
                },
                Criterion {
                    name: "Talent & Skill".to_string(),
                    max: 25,
                    options: Some(step_options(25)),
                },
                Criterion {
                    name: "Audience Impact".to_string(),
                    max: 15,
                    options: Some(step_options(15)),
                },
                Criterion {
                    name: "Production Value".to_string(),
                    max: 15,
                    options: Some(step_options(15)),
                },
            ],
            contestants: vec![
                contestant("G01", "TEAM BATANG TERRASOL"),
                contestant("G02", "TEAM SEC_SUNNIN_EM"),
                contestant("G03", "TEAM HMB_HMS R4S"),
                contestant("G04", "TEAM ITOS_ADMIN_SQPHHS"),
                contestant("G05", "TEAM LTD TECHNO MOVERS"),
                contestant("G06", "TEAM O-SIDE POMPSSS_BIG_OCS"),
                contestant("G07", "TEAM VEE_EFF-ES_BF3"),
                contestant("G08", "TEAM G-EO"),
            ],
            tie_break_criterion: "Talent & Skill".to_string(),
            admin_passcode: default_passcode(),
        }
    }
}

fn contestant(id: &str, name: &str) -> Contestant {
    Contestant {
        id: id.to_string(),
        name: name.to_string(),
    }
}

impl ScoringConfig {
    /// Load and validate a configuration file (JSON).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("could not parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file if a path was given, otherwise fall back to
    /// the built-in event. The built-in event is validated too.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Check the configuration before anything downstream assumes it.
    pub fn validate(&self) -> Result<()> {
        if self.criteria.is_empty() {
            bail!("configuration has no criteria");
        }
        if self.contestants.is_empty() {
            bail!("configuration has no contestants");
        }

        let mut criterion_names = HashSet::new();
        for criterion in &self.criteria {
            if criterion.name.is_empty() {
                bail!("criterion with an empty name");
            }
            if !criterion_names.insert(criterion.name.as_str()) {
                bail!("duplicate criterion name: {}", criterion.name);
            }
            if criterion.max <= 0 {
                bail!("criterion {} has a non-positive max", criterion.name);
            }
            if let Some(options) = &criterion.options {
                if options.is_empty() {
                    bail!("criterion {} has an empty option list", criterion.name);
                }
                if let Some(bad) = options.iter().find(|&&value| value > criterion.max) {
                    bail!(
                        "criterion {} offers option {} above its max {}",
                        criterion.name,
                        bad,
                        criterion.max
                    );
                }
            }
        }

        let mut contestant_ids = HashSet::new();
        for contestant in &self.contestants {
            if contestant.id.is_empty() {
                bail!("contestant with an empty id: {}", contestant.name);
            }
            if !contestant_ids.insert(contestant.id.as_str()) {
                bail!("duplicate contestant id: {}", contestant.id);
            }
        }

        if !criterion_names.contains(self.tie_break_criterion.as_str()) {
            bail!(
                "tie-break criterion {} does not match any configured criterion",
                self.tie_break_criterion
            );
        }
        Ok(())
    }

    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    pub fn contestant(&self, id: &str) -> Option<&Contestant> {
        self.contestants.iter().find(|c| c.id == id)
    }

    /// The maximum achievable total, which is also the chart axis ceiling.
    pub fn max_total_score(&self) -> i64 {
        self.criteria.iter().map(|c| c.max).sum()
    }
}
