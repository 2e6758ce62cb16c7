// Derived views over the trial collection

use crate::models::{Trial, TrialStatus};
use std::collections::HashMap;

/// Filter criteria for trial listings. Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct TrialFilter {
    pub status: Option<TrialStatus>,
    pub province: Option<String>,
    pub year: Option<i32>,
    /// Case-insensitive substring over id, locality, crop and responsible.
    pub search: Option<String>,
}

impl TrialFilter {
    pub fn matches(&self, trial: &Trial) -> bool {
        if let Some(status) = self.status {
            if trial.status != status {
                return false;
            }
        }
        if let Some(province) = &self.province {
            if &trial.province != province {
                return false;
            }
        }
        if let Some(year) = self.year {
            if trial.year != year {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = trial.id.to_lowercase().contains(&term)
                || trial.locality.to_lowercase().contains(&term)
                || trial.crop.to_lowercase().contains(&term)
                || trial.responsible.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Matching subset in original order.
pub fn apply<'a>(trials: &'a [Trial], filter: &TrialFilter) -> Vec<&'a Trial> {
    trials.iter().filter(|t| filter.matches(t)).collect()
}

/// Trial counts per status.
pub fn status_counts(trials: &[Trial]) -> HashMap<TrialStatus, usize> {
    let mut counts = HashMap::new();
    for trial in trials {
        *counts.entry(trial.status).or_insert(0) += 1;
    }
    counts
}

/// Trials still carrying local changes.
pub fn unsynced_count(trials: &[Trial]) -> usize {
    trials.iter().filter(|t| !t.synced).count()
}

/// Distinct years, newest first.
pub fn years(trials: &[Trial]) -> Vec<i32> {
    let mut years: Vec<i32> = trials.iter().map(|t| t.year).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// First `limit` trials currently in progress, in original order.
pub fn in_progress(trials: &[Trial], limit: usize) -> Vec<&Trial> {
    trials
        .iter()
        .filter(|t| t.status == TrialStatus::InProgress)
        .take(limit)
        .collect()
}
