// Data models for agritrial

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One field-test record: a trial (or demo plot) of a crop at a locality.
///
/// The id encodes year, locality code, crop code and a per-group sequence:
/// `{year}-{locality_code}-{crop_code}-{sequence:03}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub id: String,
    pub year: i32,
    pub locality: String,
    pub crop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub responsible: String,
    pub kind: TrialKind,
    pub province: String,
    pub status: TrialStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sowing_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub locality_code: String,
    pub crop_code: String,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Attached photos as data-URIs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// False while the record carries local changes not yet uploaded.
    pub synced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Planned,
    InProgress,
    Harvested,
    Completed,
    Cancelled,
}

impl TrialStatus {
    pub const ALL: [TrialStatus; 5] = [
        TrialStatus::Planned,
        TrialStatus::InProgress,
        TrialStatus::Harvested,
        TrialStatus::Completed,
        TrialStatus::Cancelled,
    ];
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Original field-book labels, kept for CSV output and display.
        let label = match self {
            TrialStatus::Planned => "Planificado",
            TrialStatus::InProgress => "En Curso",
            TrialStatus::Harvested => "Cosechado",
            TrialStatus::Completed => "Completado",
            TrialStatus::Cancelled => "Cancelado",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for TrialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "planned" | "planificado" => Ok(TrialStatus::Planned),
            "inprogress" | "encurso" => Ok(TrialStatus::InProgress),
            "harvested" | "cosechado" => Ok(TrialStatus::Harvested),
            "completed" | "completado" => Ok(TrialStatus::Completed),
            "cancelled" | "cancelado" => Ok(TrialStatus::Cancelled),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialKind {
    Trial,
    Demo,
}

impl fmt::Display for TrialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrialKind::Trial => "Ensayo",
            TrialKind::Demo => "Demoplot",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for TrialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trial" | "ensayo" => Ok(TrialKind::Trial),
            "demo" | "demoplot" => Ok(TrialKind::Demo),
            other => Err(format!("unknown trial kind: {}", other)),
        }
    }
}

/// Input for creating a trial. Codes, sequence and id are derived by the
/// store; the record starts unsynced.
#[derive(Debug, Clone)]
pub struct NewTrial {
    pub year: i32,
    pub locality: String,
    pub crop: String,
    pub project: Option<String>,
    pub responsible: String,
    pub kind: TrialKind,
    pub province: String,
    pub status: TrialStatus,
    pub sowing_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub contact: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
}

/// Partial update for a trial. Absent fields are left untouched; the id and
/// its code/sequence components are fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct TrialPatch {
    pub project: Option<String>,
    pub responsible: Option<String>,
    pub kind: Option<TrialKind>,
    pub province: Option<String>,
    pub status: Option<TrialStatus>,
    pub sowing_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub contact: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Option<Vec<String>>,
}

impl TrialPatch {
    pub fn apply_to(&self, trial: &mut Trial) {
        if let Some(project) = &self.project {
            trial.project = Some(project.clone());
        }
        if let Some(responsible) = &self.responsible {
            trial.responsible = responsible.clone();
        }
        if let Some(kind) = self.kind {
            trial.kind = kind;
        }
        if let Some(province) = &self.province {
            trial.province = province.clone();
        }
        if let Some(status) = self.status {
            trial.status = status;
        }
        if let Some(date) = self.sowing_date {
            trial.sowing_date = Some(date);
        }
        if let Some(date) = self.harvest_date {
            trial.harvest_date = Some(date);
        }
        if let Some(contact) = &self.contact {
            trial.contact = Some(contact.clone());
        }
        if let Some(latitude) = self.latitude {
            trial.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            trial.longitude = Some(longitude);
        }
        if let Some(images) = &self.images {
            trial.images = images.clone();
        }
    }
}

/// Maximum product/dose pairs on a treatment.
pub const MAX_PRODUCTS: usize = 3;
/// Maximum variable/value pairs on a treatment.
pub const MAX_MEASUREMENTS: usize = 10;

/// One experimental intervention (or control) tied to a trial.
///
/// `trial_id` references a trial by convention; the store does not enforce
/// the link and nothing ever cascades because records are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    pub trial_id: String,
    pub kind: TreatmentKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductDose>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<Measurement>,
    pub synced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentKind {
    Control,
    Treated,
}

impl fmt::Display for TreatmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TreatmentKind::Control => "Testigo",
            TreatmentKind::Treated => "Tratado",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for TreatmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "control" | "testigo" => Ok(TreatmentKind::Control),
            "treated" | "tratado" => Ok(TreatmentKind::Treated),
            other => Err(format!("unknown treatment kind: {}", other)),
        }
    }
}

/// Product applied with an optional dose (kg/ha or l/ha, free convention).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDose {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<f64>,
}

/// Measured variable with its value (yield, protein, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Input for creating a treatment. The id is clock-derived by the store.
#[derive(Debug, Clone)]
pub struct NewTreatment {
    pub trial_id: String,
    pub kind: TreatmentKind,
    pub description: String,
    pub products: Vec<ProductDose>,
    pub measurements: Vec<Measurement>,
}

/// Partial update for a treatment.
#[derive(Debug, Clone, Default)]
pub struct TreatmentPatch {
    pub kind: Option<TreatmentKind>,
    pub description: Option<String>,
    pub products: Option<Vec<ProductDose>>,
    pub measurements: Option<Vec<Measurement>>,
}

impl TreatmentPatch {
    pub fn apply_to(&self, treatment: &mut Treatment) {
        if let Some(kind) = self.kind {
            treatment.kind = kind;
        }
        if let Some(description) = &self.description {
            treatment.description = description.clone();
        }
        if let Some(products) = &self.products {
            treatment.products = products.clone();
        }
        if let Some(measurements) = &self.measurements {
            treatment.measurements = measurements.clone();
        }
    }
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before Unix epoch")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms() {
        let ts = now_ms();
        assert!(ts > 0);
        // Should be reasonable timestamp (after year 2020)
        assert!(ts > 1_600_000_000_000);
    }

    #[test]
    fn test_status_serialization() {
        let status = TrialStatus::Planned;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"planned\"");

        let status = TrialStatus::InProgress;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"inprogress\"");
    }

    #[test]
    fn test_status_display_labels() {
        assert_eq!(TrialStatus::InProgress.to_string(), "En Curso");
        assert_eq!(TrialStatus::Cancelled.to_string(), "Cancelado");
        assert_eq!(TrialKind::Demo.to_string(), "Demoplot");
        assert_eq!(TreatmentKind::Control.to_string(), "Testigo");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("planned".parse::<TrialStatus>().unwrap(), TrialStatus::Planned);
        assert_eq!("En Curso".parse::<TrialStatus>().unwrap(), TrialStatus::InProgress);
        assert_eq!("in-progress".parse::<TrialStatus>().unwrap(), TrialStatus::InProgress);
        assert!("finished".parse::<TrialStatus>().is_err());

        assert_eq!("Demoplot".parse::<TrialKind>().unwrap(), TrialKind::Demo);
        assert_eq!("tratado".parse::<TreatmentKind>().unwrap(), TreatmentKind::Treated);
    }

    #[test]
    fn test_trial_serialization_roundtrip() {
        let trial = Trial {
            id: "2024-RO-SJ-001".to_string(),
            year: 2024,
            locality: "Rojas".to_string(),
            crop: "Soja".to_string(),
            project: None,
            responsible: "Rocio Dominguez".to_string(),
            kind: TrialKind::Trial,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::Planned,
            sowing_date: NaiveDate::from_ymd_opt(2024, 10, 1),
            harvest_date: None,
            contact: None,
            locality_code: "RO".to_string(),
            crop_code: "SJ".to_string(),
            sequence: 1,
            latitude: Some(-34.2),
            longitude: Some(-60.73),
            images: Vec::new(),
            synced: false,
        };

        let json = serde_json::to_string(&trial).unwrap();
        // Absent optionals stay off the wire
        assert!(!json.contains("harvest_date"));
        assert!(!json.contains("images"));

        let back: Trial = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, trial.id);
        assert_eq!(back.sowing_date, trial.sowing_date);
        assert_eq!(back.sequence, 1);
        assert!(!back.synced);
    }

    #[test]
    fn test_trial_patch_leaves_absent_fields() {
        let mut trial = Trial {
            id: "2024-RO-SJ-001".to_string(),
            year: 2024,
            locality: "Rojas".to_string(),
            crop: "Soja".to_string(),
            project: Some("Proyecto Norte".to_string()),
            responsible: "Rocio Dominguez".to_string(),
            kind: TrialKind::Trial,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::Planned,
            sowing_date: None,
            harvest_date: None,
            contact: None,
            locality_code: "RO".to_string(),
            crop_code: "SJ".to_string(),
            sequence: 1,
            latitude: None,
            longitude: None,
            images: Vec::new(),
            synced: true,
        };

        let patch = TrialPatch {
            status: Some(TrialStatus::InProgress),
            ..Default::default()
        };
        patch.apply_to(&mut trial);

        assert_eq!(trial.status, TrialStatus::InProgress);
        assert_eq!(trial.project.as_deref(), Some("Proyecto Norte"));
        assert_eq!(trial.responsible, "Rocio Dominguez");
    }
}
