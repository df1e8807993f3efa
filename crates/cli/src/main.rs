use anyhow::Context;
use api_shared::{api_prefix_from_env_value, StatusRes, StatusService};
use clap::{Parser, Subcommand};
use nicu_core::config::{database_path_from_env_value, page_size_from_env_value};
use nicu_core::models::Choice;
use nicu_core::{
    CoreConfig, Database, Entry, EntryQuery, EntryService, PatientQuery, PatientRecord,
    PatientService,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Entry fields as shown by `patients show`, grouped the way clinicians chart them.
const ENTRY_SECTIONS: &[(&str, &[&str])] = &[
    ("Basic Information", &["date", "dol", "pma"]),
    (
        "Nutrition",
        &["kmc", "cal", "protein", "weight", "feeds", "type_of_milk", "hmf"],
    ),
    (
        "Supplements",
        &["calcium", "phosphorus", "vit_d", "iron", "zinc", "caffeine"],
    ),
    (
        "Clinical Status",
        &["resp_support", "desaturations", "acute_events", "piomi"],
    ),
    (
        "Other",
        &["tfr", "nns", "gain_loss", "early_intervention", "mode_of_feeding"],
    ),
];

#[derive(Parser)]
#[command(name = "nicu")]
#[command(about = "NICU patient tracker admin CLI")]
struct Cli {
    /// SQLite database file (default: $NICU_DATABASE_PATH or nicu.sqlite3)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its schema
    Init,
    /// Patient records
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Daily entries
    Entries {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Print the server status payload
    Status,
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List patients ordered by patient id
    List {
        /// Substring of patient id or name
        #[arg(long)]
        search: Option<String>,
        /// Male, Female or Ambiguous
        #[arg(long)]
        sex: Option<String>,
        /// AGA, SGA or LGA
        #[arg(long)]
        growth: Option<String>,
    },
    /// Show one patient with all of its entries
    Show {
        /// Internal patient id
        id: i64,
    },
}

#[derive(Subcommand)]
enum EntryCommands {
    /// List entries
    List {
        /// Internal id of the owning patient
        #[arg(long)]
        patient: Option<i64>,
        /// MOM, DHM, FF or MIXED
        #[arg(long)]
        milk: Option<String>,
        /// Mode of feeding, e.g. OG or BREAST
        #[arg(long)]
        mode: Option<String>,
        /// Substring of patient id, patient name, TFR or feeds
        #[arg(long)]
        search: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nicu_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'nicu --help' for commands");
        return Ok(());
    };

    match command {
        Commands::Init => {
            let (cfg, _db) = open_database(cli.database)?;
            println!("Database ready at {}", cfg.database_path().display());
        }
        Commands::Patients {
            command: PatientCommands::List {
                search,
                sex,
                growth,
            },
        } => {
            let (cfg, db) = open_database(cli.database)?;
            let service = PatientService::new(cfg, db);
            let query = PatientQuery {
                search,
                sex,
                aga_sga_lga: growth,
                ordering: Some("patient_id".into()),
                ..PatientQuery::default()
            };
            let patients = service.list(&query)?;
            if patients.records().is_empty() {
                println!("No patients found.");
            }
            for record in patients.records() {
                print_patient_line(record);
            }
        }
        Commands::Patients {
            command: PatientCommands::Show { id },
        } => {
            let (cfg, db) = open_database(cli.database)?;
            let record = PatientService::new(cfg, db).retrieve(id)?;
            print_patient_line(&record);
            if record.entries.is_empty() {
                println!("  No entries.");
            }
            for entry in &record.entries {
                print_entry_sections(entry)?;
            }
        }
        Commands::Entries {
            command:
                EntryCommands::List {
                    patient,
                    milk,
                    mode,
                    search,
                },
        } => {
            let (cfg, db) = open_database(cli.database)?;
            let service = EntryService::new(cfg, db);
            let query = EntryQuery {
                patient: patient.map(|id| id.to_string()),
                type_of_milk: milk,
                mode_of_feeding: mode,
                search,
                ..EntryQuery::default()
            };
            let entries = service.list(&query)?;
            if entries.records().is_empty() {
                println!("No entries found.");
            }
            for entry in entries.records() {
                let data = &entry.data;
                println!(
                    "Entry {}: patient {}, date {}, DOL {}, PMA {}, weight {}, milk {}",
                    entry.id,
                    data.patient,
                    data.date,
                    display_opt(data.dol),
                    display_opt(data.pma),
                    display_opt(data.weight),
                    display_opt(data.type_of_milk.map(Choice::as_str)),
                );
            }
        }
        Commands::Status => {
            let status = status_for(std::env::var("NICU_API_PREFIX").ok());
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

/// Resolve configuration the way the server does and open (creating if needed)
/// the database. `--database` wins over `NICU_DATABASE_PATH`.
fn open_database(database: Option<PathBuf>) -> anyhow::Result<(Arc<CoreConfig>, Database)> {
    let database_path = database
        .unwrap_or_else(|| database_path_from_env_value(std::env::var("NICU_DATABASE_PATH").ok()));
    let page_size = page_size_from_env_value(std::env::var("NICU_PAGE_SIZE").ok())?;
    let cfg = Arc::new(CoreConfig::new(database_path, page_size)?);
    let db = Database::open(cfg.database_path())
        .with_context(|| format!("opening {}", cfg.database_path().display()))?;
    Ok((cfg, db))
}

/// The status payload the server reports for the same `NICU_API_PREFIX`.
fn status_for(api_prefix: Option<String>) -> StatusRes {
    StatusService::new(api_prefix_from_env_value(api_prefix), env!("CARGO_PKG_VERSION"))
        .check_status()
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_patient_line(record: &PatientRecord) {
    let p = &record.patient;
    println!(
        "ID: {}, Patient ID: {}, Name: {}, GA: {}, Weight: {}, Growth: {}, Sex: {}, DOB: {}, TOB: {}, Entries: {}",
        p.id,
        p.data.patient_id,
        p.data.name,
        p.data.ga,
        p.data.weight,
        p.data.aga_sga_lga.as_str(),
        p.data.sex.as_str(),
        p.data.dob,
        display_opt(p.data.tob),
        record.entries.len(),
    );
}

fn print_entry_sections(entry: &Entry) -> anyhow::Result<()> {
    let fields = serde_json::to_value(entry)?;
    println!("  Entry {}", entry.id);
    for (section, names) in ENTRY_SECTIONS {
        let shown: Vec<String> = names
            .iter()
            .filter(|name| !fields[**name].is_null())
            .map(|name| format!("{}: {}", name, plain(fields[*name].clone())))
            .collect();
        if !shown.is_empty() {
            println!("    {}: {}", section, shown.join(", "));
        }
    }
    Ok(())
}

/// JSON value without the quotes serde puts around strings.
fn plain(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_prefix_matches_server_mount_point() {
        assert_eq!(status_for(None).api_docs, "/api/");
        assert_eq!(status_for(Some("api".into())).api_docs, "/api/");
        assert_eq!(status_for(Some("/records/".into())).api_docs, "/records/");
        assert_eq!(status_for(Some("".into())).api_docs, "/");
    }
}
