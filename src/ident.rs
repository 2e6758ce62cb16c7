// Identifier assignment for trials and treatments

use crate::models::{Trial, now_ms};

/// Next sequence number for a (year, locality code, crop code) group:
/// 1 + the count of trials already in the group. Sequences are never reused
/// because records are never deleted, so each group forms a contiguous run
/// starting at 1 in insertion order.
pub fn next_sequence(trials: &[Trial], year: i32, locality_code: &str, crop_code: &str) -> u32 {
    let existing = trials
        .iter()
        .filter(|t| t.year == year && t.locality_code == locality_code && t.crop_code == crop_code)
        .count();
    existing as u32 + 1
}

/// `{year}-{locality_code}-{crop_code}-{sequence:03}`
pub fn trial_id(year: i32, locality_code: &str, crop_code: &str, sequence: u32) -> String {
    format!("{}-{}-{}-{:03}", year, locality_code, crop_code, sequence)
}

/// Treatment ids are clock-derived. Two appends within the same millisecond
/// would collide; with a single interactive writer this does not occur.
pub fn treatment_id() -> String {
    format!("T-{}", now_ms())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TrialKind, TrialStatus};

    fn trial(year: i32, locality_code: &str, crop_code: &str, sequence: u32) -> Trial {
        Trial {
            id: trial_id(year, locality_code, crop_code, sequence),
            year,
            locality: "Rojas".to_string(),
            crop: "Soja".to_string(),
            project: None,
            responsible: "Rocio Dominguez".to_string(),
            kind: TrialKind::Trial,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::Planned,
            sowing_date: None,
            harvest_date: None,
            contact: None,
            locality_code: locality_code.to_string(),
            crop_code: crop_code.to_string(),
            sequence,
            latitude: None,
            longitude: None,
            images: Vec::new(),
            synced: false,
        }
    }

    #[test]
    fn test_first_sequence_is_one() {
        assert_eq!(next_sequence(&[], 2024, "RO", "SJ"), 1);
    }

    #[test]
    fn test_sequence_counts_only_matching_group() {
        let trials = vec![
            trial(2024, "RO", "SJ", 1),
            trial(2024, "RO", "SJ", 2),
            trial(2024, "RO", "TR", 1),
            trial(2023, "RO", "SJ", 1),
        ];
        assert_eq!(next_sequence(&trials, 2024, "RO", "SJ"), 3);
        assert_eq!(next_sequence(&trials, 2024, "RO", "TR"), 2);
        assert_eq!(next_sequence(&trials, 2023, "RO", "SJ"), 2);
        assert_eq!(next_sequence(&trials, 2024, "BCE", "SJ"), 1);
    }

    #[test]
    fn test_trial_id_zero_padding() {
        assert_eq!(trial_id(2024, "RO", "SJ", 1), "2024-RO-SJ-001");
        assert_eq!(trial_id(2024, "RO", "SJ", 38), "2024-RO-SJ-038");
        assert_eq!(trial_id(2024, "BCE", "PP", 268), "2024-BCE-PP-268");
        assert_eq!(trial_id(2024, "OR", "CB", 1107), "2024-OR-CB-1107");
    }

    #[test]
    fn test_treatment_id_format() {
        let id = treatment_id();
        assert!(id.starts_with("T-"));
        assert!(id[2..].parse::<i64>().unwrap() > 1_600_000_000_000);
    }
}
