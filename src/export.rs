// CSV serialization of trial subsets

use crate::error::{Error, Result};
use crate::models::Trial;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::info;

/// Fixed export header, matching the original field-book layout.
pub const CSV_HEADERS: [&str; 16] = [
    "ID_Ensayo",
    "Año",
    "Localidad",
    "Cultivo",
    "Proyecto",
    "Responsable",
    "Tipo",
    "Provincia",
    "Estado",
    "Fecha_Siembra",
    "Fecha_Cosecha",
    "Contacto",
    "Cod_localidad",
    "Cod_cultivo",
    "Cod_numero",
    "synced",
];

// Quoting is triggered by commas only; embedded newlines pass through
// unescaped (a known limitation of the original exporter, kept as-is).
fn escape(value: &str) -> String {
    if value.contains(',') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn row(trial: &Trial) -> String {
    let fields = [
        trial.id.clone(),
        trial.year.to_string(),
        trial.locality.clone(),
        trial.crop.clone(),
        trial.project.clone().unwrap_or_default(),
        trial.responsible.clone(),
        trial.kind.to_string(),
        trial.province.clone(),
        trial.status.to_string(),
        opt_date(trial.sowing_date),
        opt_date(trial.harvest_date),
        trial.contact.clone().unwrap_or_default(),
        trial.locality_code.clone(),
        trial.crop_code.clone(),
        trial.sequence.to_string(),
        trial.synced.to_string(),
    ];
    fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize a trial subset to CSV. An empty subset is refused so no file
/// is produced for it.
pub fn to_csv(trials: &[&Trial]) -> Result<String> {
    if trials.is_empty() {
        return Err(Error::EmptyExport);
    }
    let mut rows = Vec::with_capacity(trials.len() + 1);
    rows.push(CSV_HEADERS.join(","));
    rows.extend(trials.iter().map(|t| row(t)));
    Ok(rows.join("\n"))
}

/// `ensayos_{ISO-date}.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("ensayos_{}.csv", date.format("%Y-%m-%d"))
}

/// Serialize and write a trial subset to the given path.
pub fn write_csv<P: AsRef<Path>>(path: P, trials: &[&Trial]) -> Result<()> {
    let csv = to_csv(trials)?;
    fs::write(path.as_ref(), csv)?;
    info!(path = %path.as_ref().display(), rows = trials.len(), "exported trials");
    Ok(())
}
