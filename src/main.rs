use agritrial::models::{Measurement, ProductDose};
use agritrial::{
    Error, FileBackend, NewTreatment, NewTrial, SessionGate, Store, TreatmentKind, TrialFilter,
    TrialKind, TrialPatch, TrialStatus, export, filter,
};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agritrial")]
#[command(about = "Field-trial record management with local snapshot persistence")]
#[command(version)]
struct Cli {
    /// Path to the store directory (default: the platform data dir)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Filter by status (planned, in-progress, harvested, completed, cancelled)
    #[arg(long)]
    status: Option<TrialStatus>,

    /// Filter by province
    #[arg(long)]
    province: Option<String>,

    /// Filter by year
    #[arg(long)]
    year: Option<i32>,

    /// Case-insensitive search over id, locality, crop and responsible
    #[arg(long)]
    search: Option<String>,
}

impl From<FilterArgs> for TrialFilter {
    fn from(args: FilterArgs) -> Self {
        TrialFilter {
            status: args.status,
            province: args.province,
            year: args.year,
            search: args.search,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List trials, optionally filtered
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one trial with its treatments
    Show { id: String },

    /// Create a trial; the id is derived from year, codes and sequence
    AddTrial {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        locality: String,
        #[arg(long)]
        crop: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        responsible: String,
        #[arg(long, default_value = "trial")]
        kind: TrialKind,
        #[arg(long)]
        province: String,
        #[arg(long, default_value = "planned")]
        status: TrialStatus,
        #[arg(long)]
        sowing_date: Option<NaiveDate>,
        #[arg(long)]
        harvest_date: Option<NaiveDate>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        latitude: Option<f64>,
        #[arg(long)]
        longitude: Option<f64>,
    },

    /// Update fields on an existing trial
    UpdateTrial {
        id: String,
        #[arg(long)]
        status: Option<TrialStatus>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
        #[arg(long)]
        province: Option<String>,
        #[arg(long)]
        sowing_date: Option<NaiveDate>,
        #[arg(long)]
        harvest_date: Option<NaiveDate>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        latitude: Option<f64>,
        #[arg(long)]
        longitude: Option<f64>,
    },

    /// Record a treatment result for a trial
    AddTreatment {
        trial_id: String,
        #[arg(long, default_value = "control")]
        kind: TreatmentKind,
        #[arg(long)]
        description: String,
        /// "name:dose" pair, repeatable (dose optional, at most 3)
        #[arg(long = "product")]
        products: Vec<String>,
        /// "variable:value" pair, repeatable (value optional, at most 10)
        #[arg(long = "measure")]
        measurements: Vec<String>,
    },

    /// Export trials to CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (default: ensayos_{date}.csv in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Mark every record as synchronized
    Sync,

    /// Aggregate trial counts by status
    Stats,

    /// Log in with the demo credentials
    Login { username: String, password: String },

    /// Clear the stored session
    Logout,

    /// Show the logged-in user
    Whoami,
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("agritrial"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// "Producto X:15" -> name + dose; a pair without a numeric tail is all name.
fn parse_product(raw: &str) -> ProductDose {
    match raw.rsplit_once(':') {
        Some((name, dose)) => match dose.trim().parse::<f64>() {
            Ok(dose) => ProductDose {
                product: Some(name.trim().to_string()),
                dose: Some(dose),
            },
            Err(_) => ProductDose {
                product: Some(raw.trim().to_string()),
                dose: None,
            },
        },
        None => ProductDose {
            product: Some(raw.trim().to_string()),
            dose: None,
        },
    }
}

fn parse_measurement(raw: &str) -> Measurement {
    match raw.rsplit_once(':') {
        Some((variable, value)) => match value.trim().parse::<f64>() {
            Ok(value) => Measurement {
                variable: Some(variable.trim().to_string()),
                value: Some(value),
            },
            Err(_) => Measurement {
                variable: Some(raw.trim().to_string()),
                value: None,
            },
        },
        None => Measurement {
            variable: Some(raw.trim().to_string()),
            value: None,
        },
    }
}

fn status_label(status: TrialStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        TrialStatus::Planned => label.blue(),
        TrialStatus::InProgress => label.green(),
        TrialStatus::Harvested => label.yellow(),
        TrialStatus::Completed => label.normal(),
        TrialStatus::Cancelled => label.red(),
    }
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let store_path = cli.store_path.unwrap_or_else(default_store_path);
    let mut store = Store::open(&store_path)?;

    match cli.command {
        Commands::List { filter: args } => {
            let criteria = TrialFilter::from(args);
            let trials = filter::apply(store.trials(), &criteria);
            if trials.is_empty() {
                println!("No trials match.");
                return Ok(());
            }
            for trial in trials {
                let marker = if trial.synced { " ".normal() } else { "*".yellow() };
                println!(
                    "{} {:<16} {:<16} {:<10} {:<22} {}",
                    marker,
                    trial.id,
                    trial.locality,
                    trial.crop,
                    trial.responsible,
                    status_label(trial.status)
                );
            }
        }

        Commands::Show { id } => {
            let trial = store
                .trial(&id)
                .ok_or_else(|| Error::NotFound(id.clone()))?;
            println!("{} ({})", trial.id.bold(), trial.kind);
            println!("  {} - {}, {}", trial.crop, trial.locality, trial.province);
            println!("  Responsible: {}", trial.responsible);
            println!("  Status: {}", status_label(trial.status));
            if let Some(project) = &trial.project {
                println!("  Project: {}", project);
            }
            if let Some(date) = trial.sowing_date {
                println!("  Sown: {}", date);
            }
            if let Some(date) = trial.harvest_date {
                println!("  Harvested: {}", date);
            }
            if let Some(contact) = &trial.contact {
                println!("  Contact: {}", contact);
            }
            if let (Some(lat), Some(lon)) = (trial.latitude, trial.longitude) {
                println!("  Position: {}, {}", lat, lon);
            }
            println!("  Synced: {}", trial.synced);

            let treatments = store.treatments_for(&id);
            if treatments.is_empty() {
                println!("\nNo treatments recorded.");
            } else {
                println!("\nTreatments:");
                for treatment in treatments {
                    println!("  {} [{}] {}", treatment.id, treatment.kind, treatment.description);
                    for pair in &treatment.products {
                        println!(
                            "      product: {} {}",
                            pair.product.as_deref().unwrap_or("-"),
                            pair.dose.map(|d| d.to_string()).unwrap_or_default()
                        );
                    }
                    for measurement in &treatment.measurements {
                        println!(
                            "      {}: {}",
                            measurement.variable.as_deref().unwrap_or("-"),
                            measurement.value.map(|v| v.to_string()).unwrap_or_default()
                        );
                    }
                }
            }
        }

        Commands::AddTrial {
            year,
            locality,
            crop,
            project,
            responsible,
            kind,
            province,
            status,
            sowing_date,
            harvest_date,
            contact,
            latitude,
            longitude,
        } => {
            let trial = store.add_trial(NewTrial {
                year,
                locality,
                crop,
                project,
                responsible,
                kind,
                province,
                status,
                sowing_date,
                harvest_date,
                contact,
                latitude,
                longitude,
                images: Vec::new(),
            })?;
            println!("Created {}", trial.id.bold());
        }

        Commands::UpdateTrial {
            id,
            status,
            project,
            responsible,
            province,
            sowing_date,
            harvest_date,
            contact,
            latitude,
            longitude,
        } => {
            store.update_trial(
                &id,
                TrialPatch {
                    project,
                    responsible,
                    kind: None,
                    province,
                    status,
                    sowing_date,
                    harvest_date,
                    contact,
                    latitude,
                    longitude,
                    images: None,
                },
            )?;
            println!("Updated {}", id);
        }

        Commands::AddTreatment {
            trial_id,
            kind,
            description,
            products,
            measurements,
        } => {
            let treatment = store.add_treatment(NewTreatment {
                trial_id,
                kind,
                description,
                products: products.iter().map(|p| parse_product(p)).collect(),
                measurements: measurements.iter().map(|m| parse_measurement(m)).collect(),
            })?;
            println!("Created {}", treatment.id.bold());
        }

        Commands::Export { filter: args, output } => {
            let criteria = TrialFilter::from(args);
            let trials = filter::apply(store.trials(), &criteria);
            let path = output.unwrap_or_else(|| {
                PathBuf::from(export::export_filename(Local::now().date_naive()))
            });
            match export::write_csv(&path, &trials) {
                Ok(()) => println!("Exported {} trials to {}", trials.len(), path.display()),
                Err(Error::EmptyExport) => println!("No trials to export."),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Sync => {
            let pending = filter::unsynced_count(store.trials());
            store.synchronize_all();
            println!("Synchronized ({} trials were pending).", pending);
        }

        Commands::Stats => {
            let trials = store.trials();
            let counts = filter::status_counts(trials);
            println!("{} trials, {} treatments", trials.len(), store.treatments().len());
            for status in TrialStatus::ALL {
                let count = counts.get(&status).copied().unwrap_or(0);
                println!("  {:<12} {}", status_label(status), count);
            }
            let pending = filter::unsynced_count(trials);
            if pending > 0 {
                println!("  {} {}", "pending sync".yellow(), pending);
            }

            let active = filter::in_progress(trials, 5);
            if !active.is_empty() {
                println!("\nIn progress:");
                for trial in active {
                    println!("  {} {} ({})", trial.id, trial.crop, trial.locality);
                }
            }
        }

        Commands::Login { username, password } => {
            let mut gate = SessionGate::new(Box::new(FileBackend::open(&store_path)?));
            match gate.login(&username, &password).wait() {
                Ok(session) => println!("Logged in as {}", session.username.bold()),
                Err(Error::InvalidCredentials) => {
                    eprintln!("{}", "Invalid credentials".red());
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Logout => {
            let mut gate = SessionGate::new(Box::new(FileBackend::open(&store_path)?));
            gate.logout()?;
            println!("Logged out.");
        }

        Commands::Whoami => {
            let gate = SessionGate::new(Box::new(FileBackend::open(&store_path)?));
            match gate.current() {
                Some(session) => println!("{}", session.username),
                None => println!("Not logged in."),
            }
        }
    }

    Ok(())
}
