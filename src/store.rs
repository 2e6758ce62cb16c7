// Record store: trials and treatments with write-through snapshots

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::ident;
use crate::models::{
    MAX_MEASUREMENTS, MAX_PRODUCTS, Measurement, NewTreatment, NewTrial, ProductDose, Treatment,
    TreatmentKind, TreatmentPatch, Trial, TrialKind, TrialPatch, TrialStatus,
};
use crate::storage::{Backend, FileBackend, TREATMENTS_KEY, TRIALS_KEY};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info, warn};

/// Owns both collections and is the only component that mutates them.
/// Every mutation is followed by a full-snapshot write-through; a failed
/// write is logged and the in-memory mutation stands.
pub struct Store {
    backend: Box<dyn Backend>,
    catalog: Catalog,
    trials: Vec<Trial>,
    treatments: Vec<Treatment>,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let backend = FileBackend::open(path)?;
        info!(path = %backend.base_path().display(), "opening store");
        Self::with_backend(Box::new(backend))
    }

    /// Build a store over any backend. Seeds the demo dataset when either
    /// collection key is absent or unreadable.
    pub fn with_backend(backend: Box<dyn Backend>) -> Result<Self> {
        let mut store = Self {
            backend,
            catalog: Catalog::new(),
            trials: Vec::new(),
            treatments: Vec::new(),
        };
        store.load();
        Ok(store)
    }

    // A key that cannot be read counts as absent; loading never fails, it
    // falls back to the demo dataset.
    fn read_key(&self, key: &'static str) -> Option<String> {
        match self.backend.read(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "failed to read stored collection");
                None
            }
        }
    }

    fn load(&mut self) {
        let stored = match (self.read_key(TRIALS_KEY), self.read_key(TREATMENTS_KEY)) {
            (Some(trials), Some(treatments)) => Some((trials, treatments)),
            _ => None,
        };

        let Some((trials_json, treatments_json)) = stored else {
            info!("no stored collections, seeding demo dataset");
            self.seed();
            self.persist();
            return;
        };

        let trials = serde_json::from_str::<Vec<Trial>>(&trials_json);
        let treatments = serde_json::from_str::<Vec<Treatment>>(&treatments_json);
        match (trials, treatments) {
            (Ok(trials), Ok(treatments)) => {
                self.trials = trials;
                self.treatments = treatments;
                debug!(
                    trials = self.trials.len(),
                    treatments = self.treatments.len(),
                    "loaded stored collections"
                );
            }
            (trials, treatments) => {
                if let Err(e) = trials {
                    warn!(key = TRIALS_KEY, error = %e, "stored collection unreadable, reseeding");
                }
                if let Err(e) = treatments {
                    warn!(key = TREATMENTS_KEY, error = %e, "stored collection unreadable, reseeding");
                }
                self.seed();
                self.persist();
            }
        }
    }

    // ========================================================================
    // Read operations
    // ========================================================================

    /// Current trial snapshot, in insertion order.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Current treatment snapshot, in insertion order.
    pub fn treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    /// Linear search by trial id.
    pub fn trial(&self, id: &str) -> Option<&Trial> {
        self.trials.iter().find(|t| t.id == id)
    }

    /// All treatments referencing the given trial, in insertion order.
    pub fn treatments_for(&self, trial_id: &str) -> Vec<&Treatment> {
        self.treatments.iter().filter(|t| t.trial_id == trial_id).collect()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a trial. Locality and crop names are resolved through the
    /// reference tables; an unknown name fails with `InvalidReference` and
    /// nothing is written.
    pub fn add_trial(&mut self, new: NewTrial) -> Result<&Trial> {
        let locality_code = self.catalog.locality_code(&new.locality).ok_or_else(|| {
            Error::InvalidReference {
                kind: "locality",
                name: new.locality.clone(),
            }
        })?;
        let crop_code = self.catalog.crop_code(&new.crop).ok_or_else(|| {
            Error::InvalidReference {
                kind: "crop",
                name: new.crop.clone(),
            }
        })?;

        let sequence = ident::next_sequence(&self.trials, new.year, locality_code, crop_code);
        let id = ident::trial_id(new.year, locality_code, crop_code, sequence);
        info!(id = %id, "trial added");

        self.trials.push(Trial {
            id,
            year: new.year,
            locality: new.locality,
            crop: new.crop,
            project: new.project,
            responsible: new.responsible,
            kind: new.kind,
            province: new.province,
            status: new.status,
            sowing_date: new.sowing_date,
            harvest_date: new.harvest_date,
            contact: new.contact,
            locality_code: locality_code.to_string(),
            crop_code: crop_code.to_string(),
            sequence,
            latitude: new.latitude,
            longitude: new.longitude,
            images: new.images,
            synced: false,
        });
        self.persist();

        let idx = self.trials.len() - 1;
        Ok(&self.trials[idx])
    }

    /// Merge a patch into an existing trial and mark it unsynced.
    /// An unknown id fails with `NotFound`.
    pub fn update_trial(&mut self, id: &str, patch: TrialPatch) -> Result<()> {
        let trial = self
            .trials
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        patch.apply_to(trial);
        trial.synced = false;
        debug!(id, "trial updated");
        self.persist();
        Ok(())
    }

    /// Record a treatment result. The trial link is the caller's
    /// responsibility; a dangling reference only logs a warning.
    pub fn add_treatment(&mut self, new: NewTreatment) -> Result<&Treatment> {
        if new.products.len() > MAX_PRODUCTS {
            return Err(Error::LimitExceeded {
                what: "product/dose pairs",
                max: MAX_PRODUCTS,
            });
        }
        if new.measurements.len() > MAX_MEASUREMENTS {
            return Err(Error::LimitExceeded {
                what: "measurements",
                max: MAX_MEASUREMENTS,
            });
        }
        if self.trial(&new.trial_id).is_none() {
            warn!(trial_id = %new.trial_id, "treatment references an unknown trial");
        }

        let id = ident::treatment_id();
        info!(id = %id, trial_id = %new.trial_id, "treatment added");

        self.treatments.push(Treatment {
            id,
            trial_id: new.trial_id,
            kind: new.kind,
            description: new.description,
            products: new.products,
            measurements: new.measurements,
            synced: false,
        });
        self.persist();

        let idx = self.treatments.len() - 1;
        Ok(&self.treatments[idx])
    }

    /// Merge a patch into an existing treatment and mark it unsynced.
    pub fn update_treatment(&mut self, id: &str, patch: TreatmentPatch) -> Result<()> {
        if let Some(products) = &patch.products {
            if products.len() > MAX_PRODUCTS {
                return Err(Error::LimitExceeded {
                    what: "product/dose pairs",
                    max: MAX_PRODUCTS,
                });
            }
        }
        if let Some(measurements) = &patch.measurements {
            if measurements.len() > MAX_MEASUREMENTS {
                return Err(Error::LimitExceeded {
                    what: "measurements",
                    max: MAX_MEASUREMENTS,
                });
            }
        }

        let treatment = self
            .treatments
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        patch.apply_to(treatment);
        treatment.synced = false;
        debug!(id, "treatment updated");
        self.persist();
        Ok(())
    }

    /// Mark every record in both collections as synchronized. Models a
    /// successful upload; no network transfer happens. Idempotent.
    pub fn synchronize_all(&mut self) {
        for trial in &mut self.trials {
            trial.synced = true;
        }
        for treatment in &mut self.treatments {
            treatment.synced = true;
        }
        info!(
            trials = self.trials.len(),
            treatments = self.treatments.len(),
            "all records marked synced"
        );
        self.persist();
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write-through snapshot of both collections. Best-effort: a failure is
    /// logged and the in-memory state is kept.
    fn persist(&mut self) {
        if let Err(e) = self.try_persist() {
            warn!(error = %e, "snapshot write failed, keeping in-memory state");
        }
    }

    fn try_persist(&mut self) -> Result<()> {
        let trials = serde_json::to_string(&self.trials)?;
        let treatments = serde_json::to_string(&self.treatments)?;
        self.backend.write(TRIALS_KEY, &trials)?;
        self.backend.write(TREATMENTS_KEY, &treatments)?;
        Ok(())
    }

    // ========================================================================
    // Demo dataset
    // ========================================================================

    fn seed(&mut self) {
        self.trials = demo_trials();
        self.treatments = demo_treatments();
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid literal date")
}

fn demo_trials() -> Vec<Trial> {
    vec![
        Trial {
            id: "2023-BCE-TR-038".to_string(),
            year: 2023,
            locality: "Balcarce".to_string(),
            crop: "Trigo".to_string(),
            project: None,
            responsible: "Agrar del Sur".to_string(),
            kind: TrialKind::Trial,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::Completed,
            sowing_date: Some(date(2023, 6, 28)),
            harvest_date: None,
            contact: None,
            locality_code: "BCE".to_string(),
            crop_code: "TR".to_string(),
            sequence: 38,
            latitude: None,
            longitude: None,
            images: Vec::new(),
            synced: true,
        },
        Trial {
            id: "2024-OR-CB-107".to_string(),
            year: 2024,
            locality: "Orense".to_string(),
            crop: "Cebada".to_string(),
            project: None,
            responsible: "Rocio Dominguez".to_string(),
            kind: TrialKind::Trial,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::InProgress,
            sowing_date: Some(date(2024, 7, 19)),
            harvest_date: None,
            contact: None,
            locality_code: "OR".to_string(),
            crop_code: "CB".to_string(),
            sequence: 107,
            latitude: None,
            longitude: None,
            images: Vec::new(),
            synced: true,
        },
        Trial {
            id: "2024-SL-TR-117".to_string(),
            year: 2024,
            locality: "Saladillo".to_string(),
            crop: "Trigo".to_string(),
            project: None,
            responsible: "Rocio Dominguez".to_string(),
            kind: TrialKind::Trial,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::InProgress,
            sowing_date: Some(date(2024, 6, 4)),
            harvest_date: None,
            contact: None,
            locality_code: "SL".to_string(),
            crop_code: "TR".to_string(),
            sequence: 117,
            latitude: None,
            longitude: None,
            images: Vec::new(),
            synced: false,
        },
        Trial {
            id: "2024-BCE-PP-268".to_string(),
            year: 2024,
            locality: "Balcarce".to_string(),
            crop: "Papa".to_string(),
            project: None,
            responsible: "Rocio Dominguez".to_string(),
            kind: TrialKind::Demo,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::Planned,
            sowing_date: Some(date(2024, 10, 10)),
            harvest_date: None,
            contact: None,
            locality_code: "BCE".to_string(),
            crop_code: "PP".to_string(),
            sequence: 268,
            latitude: None,
            longitude: None,
            images: Vec::new(),
            synced: true,
        },
    ]
}

fn demo_treatments() -> Vec<Treatment> {
    vec![
        Treatment {
            id: "T1".to_string(),
            trial_id: "2023-BCE-TR-038".to_string(),
            kind: TreatmentKind::Control,
            description: "Control sin aplicación".to_string(),
            products: Vec::new(),
            measurements: vec![Measurement {
                variable: Some("Rendimiento".to_string()),
                value: Some(6500.0),
            }],
            synced: true,
        },
        Treatment {
            id: "T2".to_string(),
            trial_id: "2023-BCE-TR-038".to_string(),
            kind: TreatmentKind::Treated,
            description: "Fungicida A + Fertilizante B".to_string(),
            products: Vec::new(),
            measurements: vec![Measurement {
                variable: Some("Rendimiento".to_string()),
                value: Some(7200.0),
            }],
            synced: true,
        },
        Treatment {
            id: "T3".to_string(),
            trial_id: "2024-OR-CB-107".to_string(),
            kind: TreatmentKind::Control,
            description: "Control sin aplicación".to_string(),
            products: Vec::new(),
            measurements: vec![Measurement {
                variable: Some("Proteína".to_string()),
                value: Some(10.5),
            }],
            synced: true,
        },
        Treatment {
            id: "T4".to_string(),
            trial_id: "2024-OR-CB-107".to_string(),
            kind: TreatmentKind::Treated,
            description: "Producto X 15kg/ha".to_string(),
            products: vec![ProductDose {
                product: Some("Producto X".to_string()),
                dose: Some(15.0),
            }],
            measurements: vec![Measurement {
                variable: Some("Proteína".to_string()),
                value: Some(11.2),
            }],
            synced: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use tempfile::TempDir;

    fn memory_store() -> Store {
        Store::with_backend(Box::new(MemoryBackend::default())).unwrap()
    }

    fn new_trial(year: i32, locality: &str, crop: &str) -> NewTrial {
        NewTrial {
            year,
            locality: locality.to_string(),
            crop: crop.to_string(),
            project: None,
            responsible: "Rocio Dominguez".to_string(),
            kind: TrialKind::Trial,
            province: "Buenos Aires".to_string(),
            status: TrialStatus::Planned,
            sowing_date: None,
            harvest_date: None,
            contact: None,
            latitude: None,
            longitude: None,
            images: Vec::new(),
        }
    }

    fn new_treatment(trial_id: &str) -> NewTreatment {
        NewTreatment {
            trial_id: trial_id.to_string(),
            kind: TreatmentKind::Control,
            description: "Control sin aplicación".to_string(),
            products: Vec::new(),
            measurements: Vec::new(),
        }
    }

    #[test]
    fn test_seeds_demo_dataset_when_empty() {
        let store = memory_store();
        assert_eq!(store.trials().len(), 4);
        assert_eq!(store.treatments().len(), 4);
        assert!(store.trial("2023-BCE-TR-038").is_some());
        assert_eq!(store.treatments_for("2024-OR-CB-107").len(), 2);
    }

    #[test]
    fn test_add_trial_assigns_id_and_sequence() {
        let mut store = memory_store();

        let first = store.add_trial(new_trial(2024, "Rojas", "Soja")).unwrap();
        assert_eq!(first.id, "2024-RO-SJ-001");
        assert_eq!(first.sequence, 1);
        assert!(!first.synced);

        let second = store.add_trial(new_trial(2024, "Rojas", "Soja")).unwrap();
        assert_eq!(second.id, "2024-RO-SJ-002");
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn test_sequences_form_contiguous_run() {
        let mut store = memory_store();
        for expected in 1..=5u32 {
            let trial = store.add_trial(new_trial(2025, "Tandil", "Maiz")).unwrap();
            assert_eq!(trial.sequence, expected);
        }
        // A different year restarts the group
        let other = store.add_trial(new_trial(2026, "Tandil", "Maiz")).unwrap();
        assert_eq!(other.id, "2026-TA-MZ-001");
    }

    #[test]
    fn test_get_trial_after_add() {
        let mut store = memory_store();
        let id = store.add_trial(new_trial(2024, "Rojas", "Soja")).unwrap().id.clone();

        let found = store.trial(&id).unwrap();
        assert_eq!(found.locality, "Rojas");
        assert_eq!(found.crop_code, "SJ");
        assert!(store.trial("2024-XX-XX-001").is_none());
    }

    #[test]
    fn test_add_trial_unknown_reference() {
        let mut store = memory_store();
        let before = store.trials().len();

        let err = store.add_trial(new_trial(2024, "Atlantis", "Soja")).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { kind: "locality", .. }));

        let err = store.add_trial(new_trial(2024, "Rojas", "Quinoa")).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { kind: "crop", .. }));

        // No partial write
        assert_eq!(store.trials().len(), before);
    }

    #[test]
    fn test_update_trial_marks_unsynced() {
        let mut store = memory_store();
        // Seeded record starts synced
        assert!(store.trial("2023-BCE-TR-038").unwrap().synced);

        let patch = TrialPatch {
            status: Some(TrialStatus::Harvested),
            ..Default::default()
        };
        store.update_trial("2023-BCE-TR-038", patch).unwrap();

        let trial = store.trial("2023-BCE-TR-038").unwrap();
        assert_eq!(trial.status, TrialStatus::Harvested);
        assert!(!trial.synced);
    }

    #[test]
    fn test_update_unknown_trial_fails() {
        let mut store = memory_store();
        let err = store
            .update_trial("2024-XX-XX-001", TrialPatch::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_add_treatment() {
        let mut store = memory_store();
        let id = store
            .add_treatment(new_treatment("2023-BCE-TR-038"))
            .unwrap()
            .id
            .clone();

        assert!(id.starts_with("T-"));
        let linked = store.treatments_for("2023-BCE-TR-038");
        assert_eq!(linked.len(), 3); // two seeded plus the new one
        assert!(!linked.last().unwrap().synced);
    }

    #[test]
    fn test_add_treatment_dangling_reference_is_allowed() {
        let mut store = memory_store();
        // Only warns; the link is the caller's responsibility
        store.add_treatment(new_treatment("2099-ZZ-ZZ-999")).unwrap();
        assert_eq!(store.treatments_for("2099-ZZ-ZZ-999").len(), 1);
    }

    #[test]
    fn test_treatment_limits() {
        let mut store = memory_store();

        let mut over_products = new_treatment("2023-BCE-TR-038");
        over_products.products = (0..4)
            .map(|i| ProductDose {
                product: Some(format!("P{}", i)),
                dose: None,
            })
            .collect();
        let err = store.add_treatment(over_products).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { max: 3, .. }));

        let mut over_measurements = new_treatment("2023-BCE-TR-038");
        over_measurements.measurements = (0..11)
            .map(|i| Measurement {
                variable: Some(format!("V{}", i)),
                value: None,
            })
            .collect();
        let err = store.add_treatment(over_measurements).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { max: 10, .. }));

        assert_eq!(store.treatments().len(), 4); // nothing appended
    }

    #[test]
    fn test_update_treatment_marks_unsynced() {
        let mut store = memory_store();
        let patch = TreatmentPatch {
            description: Some("Control ajustado".to_string()),
            ..Default::default()
        };
        store.update_treatment("T1", patch).unwrap();

        let t1 = store.treatments().iter().find(|t| t.id == "T1").unwrap();
        assert_eq!(t1.description, "Control ajustado");
        assert!(!t1.synced);

        let err = store
            .update_treatment("T-missing", TreatmentPatch::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_synchronize_all_is_idempotent() {
        let mut store = memory_store();
        store.add_trial(new_trial(2024, "Rojas", "Soja")).unwrap();
        store.add_treatment(new_treatment("2024-RO-SJ-001")).unwrap();

        store.synchronize_all();
        assert!(store.trials().iter().all(|t| t.synced));
        assert!(store.treatments().iter().all(|t| t.synced));

        store.synchronize_all();
        assert!(store.trials().iter().all(|t| t.synced));
        assert!(store.treatments().iter().all(|t| t.synced));
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();

        {
            let mut store = Store::open(temp.path()).unwrap();
            store.add_trial(new_trial(2024, "Rojas", "Soja")).unwrap();
            store.synchronize_all();
        }

        let store = Store::open(temp.path()).unwrap();
        assert_eq!(store.trials().len(), 5);
        let trial = store.trial("2024-RO-SJ-001").unwrap();
        assert_eq!(trial.locality, "Rojas");
        assert!(trial.synced);
    }

    #[test]
    fn test_unreadable_backend_falls_back_to_seed() {
        // Reads fail outright (think quota or permission trouble), which
        // counts the same as absent keys: the store still comes up seeded.
        struct UnreadableBackend;

        impl Backend for UnreadableBackend {
            fn read(&self, _key: &str) -> crate::error::Result<Option<String>> {
                Err(Error::Io(std::io::Error::other("disk on fire")))
            }

            fn write(&mut self, _key: &str, _value: &str) -> crate::error::Result<()> {
                Ok(())
            }

            fn remove(&mut self, _key: &str) -> crate::error::Result<()> {
                Ok(())
            }
        }

        let store = Store::with_backend(Box::new(UnreadableBackend)).unwrap();
        assert_eq!(store.trials().len(), 4);
        assert_eq!(store.treatments().len(), 4);
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_seed() {
        let temp = TempDir::new().unwrap();
        {
            let _ = Store::open(temp.path()).unwrap();
        }

        let trials_path = temp.path().join(".agritrial/ensayos.json");
        std::fs::write(&trials_path, "{not json").unwrap();

        let store = Store::open(temp.path()).unwrap();
        assert_eq!(store.trials().len(), 4);
        assert!(store.trial("2023-BCE-TR-038").is_some());

        // The reseed is written back out
        let raw = std::fs::read_to_string(&trials_path).unwrap();
        assert!(raw.starts_with('['));
    }
}
