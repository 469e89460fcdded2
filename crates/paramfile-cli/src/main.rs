use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use paramfile_core::paths::{config_path, data_path};
use paramfile_core::{
    process_config, BindConfig, ConfigField, ConfigOutcome, Mode, ParamStore, Slot, TracingLog,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

const KEY_ENV: &str = "PARAMFILE_KEY";

#[derive(Parser, Debug)]
#[command(name = "paramfile", author, version, about = "Flat-file parameter store", long_about = None)]
struct Cli {
    /// Parameter file (defaults to the config's StorePath)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Encoding mode: plain, compressed or encrypted
    #[arg(long, global = true)]
    mode: Option<Mode>,

    /// CLI config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the parameter file, or check an existing one
    Init,
    /// Print the value of a parameter
    Get { name: String },
    /// Store a parameter value
    Set { name: String, value: String },
    /// Remove a parameter
    Delete { name: String },
    /// Create or show the CLI config file
    Config,
}

/// Settings persisted in the CLI config file.
#[derive(Debug, Clone)]
struct CliSettings {
    config_path: PathBuf,
    store_path: String,
    mode: String,
    log_filter: String,
}

impl CliSettings {
    fn defaults(config_path: PathBuf) -> Self {
        Self {
            config_path,
            store_path: data_path().display().to_string(),
            mode: Mode::Plain.to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

impl BindConfig for CliSettings {
    fn config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    fn config_description(&self) -> String {
        "paramfile CLI configuration".to_string()
    }

    fn config_fields() -> Vec<ConfigField<Self>> {
        vec![
            ConfigField::new(
                "StorePath",
                "Parameter file used when --file is not given",
                Slot::Text(|s: &mut Self| &mut s.store_path),
            ),
            ConfigField::new(
                "Mode",
                "Encoding mode for new files: plain, compressed or encrypted",
                Slot::Text(|s: &mut Self| &mut s.mode),
            ),
            ConfigField::new(
                "LogFilter",
                "tracing filter used when RUST_LOG is unset",
                Slot::Text(|s: &mut Self| &mut s.log_filter),
            ),
        ]
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG, else "warn" until the config's LogFilter is known.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("warn")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings = CliSettings::defaults(cli.config.clone().unwrap_or_else(config_path));
    let outcome = process_config(&mut settings, Some(&TracingLog))
        .with_context(|| format!("load config {}", settings.config_path.display()))?;

    if !from_env {
        match EnvFilter::try_new(&settings.log_filter) {
            Ok(filter) => {
                if let Err(e) = filter_handle.reload(filter) {
                    warn!(error = %e, "cannot apply LogFilter");
                }
            }
            Err(e) => warn!(filter = %settings.log_filter, error = %e, "invalid LogFilter ignored"),
        }
    }
    debug!(?outcome, path = %settings.config_path.display(), "config processed");

    match cli.command {
        Commands::Config => config_command(&settings, outcome),
        Commands::Init => {
            let store = open_store(&cli, &settings)?;
            println!("{} ({})", store.path().display(), store.mode());
            Ok(())
        }
        Commands::Get { ref name } => {
            let store = open_store(&cli, &settings)?;
            let value = store.get(name).with_context(|| format!("get {name}"))?;
            println!("{value}");
            Ok(())
        }
        Commands::Set {
            ref name,
            ref value,
        } => {
            let store = open_store(&cli, &settings)?;
            store
                .set(name, value)
                .with_context(|| format!("set {name}"))?;
            info!(name = %name, "parameter stored");
            Ok(())
        }
        Commands::Delete { ref name } => {
            let store = open_store(&cli, &settings)?;
            store.delete(name).with_context(|| format!("delete {name}"))?;
            info!(name = %name, "parameter deleted");
            Ok(())
        }
    }
}

fn config_command(settings: &CliSettings, outcome: ConfigOutcome) -> Result<()> {
    match outcome {
        ConfigOutcome::Created => println!("created {}", settings.config_path.display()),
        ConfigOutcome::Loaded { applied, skipped } => println!(
            "loaded {} ({applied} applied, {skipped} skipped)",
            settings.config_path.display()
        ),
    }
    println!("StorePath = {}", settings.store_path);
    println!("Mode = {}", settings.mode);
    println!("LogFilter = {}", settings.log_filter);
    Ok(())
}

fn open_store(cli: &Cli, settings: &CliSettings) -> Result<ParamStore> {
    let path = cli
        .file
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.store_path));
    let mode = match cli.mode {
        Some(mode) => mode,
        None => settings
            .mode
            .parse::<Mode>()
            .with_context(|| format!("Mode in {}", settings.config_path.display()))?,
    };
    let passphrase = match mode {
        Mode::Encrypted => prompt_passphrase("Parameter file passphrase: ")?,
        _ => String::new(),
    };
    ParamStore::open(&path, mode, &passphrase)
        .with_context(|| format!("open parameter file {}", path.display()))
}

fn prompt_passphrase(prompt: &str) -> Result<String> {
    if let Ok(key) = std::env::var(KEY_ENV) {
        if !key.is_empty() {
            return Ok(key);
        }
    }
    let key = rpassword::prompt_password(prompt).map_err(|e| anyhow!("passphrase prompt: {e}"))?;
    if key.is_empty() {
        return Err(anyhow!("empty passphrase"));
    }
    Ok(key)
}
