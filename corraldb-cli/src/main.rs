use clap::{Parser, Subcommand, ValueEnum};
use corraldb::{LogLevel, Store, StoreOptions, Value};
use std::path::PathBuf;
use std::process;

/// CorralDB CLI — inspect and maintain a CorralDB store from the command line
#[derive(Parser)]
#[command(name = "corraldb", version, about)]
struct Cli {
    /// Path to the store file (":memory:" for an ephemeral store)
    db_path: String,

    /// Open the store read-only
    #[arg(long)]
    read_only: bool,

    /// Console log level
    #[arg(long, default_value = "warn")]
    log_level: CliLogLevel,

    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<CliLogLevel> for LogLevel {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Off => LogLevel::Off,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a SQL statement and print any result rows
    Execute {
        /// The SQL statement
        sql: String,
    },

    /// List the store's collections
    Collections,

    /// List a collection's elements (id and label)
    Elements {
        /// Collection name
        collection: String,
    },

    /// Print the persisted store version
    Version,

    /// Apply pending migrations from a directory
    Migrate {
        /// Migration directory (<root>/<version>/*.sql)
        dir: PathBuf,
    },

    /// Shape-validate a schema DDL file without touching the store
    Validate {
        /// Path to the schema file
        schema: PathBuf,
    },

    /// Apply a schema DDL file to the store
    ApplySchema {
        /// Path to the schema file
        schema: PathBuf,
    },

    /// Compare this store against another, printing difference lines
    Compare {
        /// Path to the other store
        other: String,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(LogLevel::from(cli.log_level).to_filter())
        .init();

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> corraldb::Result<()> {
    let options = StoreOptions {
        read_only: cli.read_only,
        console_level: cli.log_level.into(),
    };

    // Validation needs no store at all.
    if let Command::Validate { schema } = &cli.command {
        let sql = std::fs::read_to_string(schema)?;
        corraldb::schema::parse_schema(&sql)?;
        println!("schema OK: {}", schema.display());
        return Ok(());
    }

    let store = Store::open(&cli.db_path, options)?;

    match cli.command {
        Command::Execute { sql } => {
            let rows = store.execute(&sql, &[])?;
            print_rows(&rows, &cli.format);
        }

        Command::Collections => {
            for collection in store.get_collections() {
                println!("{collection}");
            }
        }

        Command::Elements { collection } => {
            let labels = store.read_scalar(&collection, "label")?;
            let ids = store.get_element_ids(&collection)?;
            match cli.format {
                OutputFormat::Text => {
                    for (id, label) in ids.iter().zip(labels.iter()) {
                        println!("{id}\t{label}");
                    }
                }
                OutputFormat::Json => {
                    let items: Vec<serde_json::Value> = ids
                        .iter()
                        .zip(labels.iter())
                        .map(|(id, label)| {
                            serde_json::json!({ "id": id, "label": label.to_string() })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&items).unwrap());
                }
            }
        }

        Command::Version => {
            println!("{}", store.current_version()?);
        }

        Command::Migrate { dir } => {
            let before = store.current_version()?;
            store.migrate_up(&dir)?;
            let after = store.current_version()?;
            if before == after {
                println!("up to date at version {after}");
            } else {
                println!("migrated from version {before} to {after}");
            }
        }

        Command::ApplySchema { schema } => {
            store.apply_schema(&schema)?;
            println!("applied {}", schema.display());
        }

        Command::Compare { other } => {
            let other_store = Store::open(&other, StoreOptions::read_only())?;
            let diffs = store.compare_databases(&other_store)?;
            if diffs.is_empty() {
                println!("stores are identical");
            } else {
                for line in &diffs {
                    println!("{line}");
                }
                process::exit(1);
            }
        }

        Command::Validate { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn print_rows(rows: &corraldb::Rows, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            if rows.column_count() > 0 {
                println!("{}", rows.columns().join("\t"));
            }
            for row in rows.iter() {
                let cells: Vec<String> = row.iter().map(Value::to_string).collect();
                println!("{}", cells.join("\t"));
            }
        }
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    let mut map = serde_json::Map::new();
                    for (c, name) in rows.columns().iter().enumerate() {
                        map.insert(name.clone(), value_to_json(&row[c]));
                    }
                    serde_json::Value::Object(map)
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items).unwrap());
        }
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Real(r) => serde_json::Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => serde_json::Value::String(format!("<blob {} bytes>", b.len())),
        Value::IntArray(vs) => serde_json::Value::Array(
            vs.iter().map(|v| serde_json::Value::Number((*v).into())).collect(),
        ),
        Value::RealArray(vs) => serde_json::Value::Array(
            vs.iter()
                .map(|v| {
                    serde_json::Number::from_f64(*v)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                })
                .collect(),
        ),
        Value::TextArray(vs) => serde_json::Value::Array(
            vs.iter().map(|v| serde_json::Value::String(v.clone())).collect(),
        ),
    }
}
