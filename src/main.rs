use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datature_hub::{HubConfig, HubModel, ModelType};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "datature-hub")]
#[command(about = "Download and inspect models published on Datature Hub", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the registry endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Override the hub root directory
    #[arg(long, global = true)]
    hub_dir: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds (0 disables it)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download (or reuse) a model and print its cache directory
    Download {
        #[command(flatten)]
        model: ModelArgs,
        /// Download even if a cached copy exists
        #[arg(long)]
        force: bool,
        /// Artifact type to fetch
        #[arg(long, default_value = "TF")]
        model_type: String,
    },
    /// Print the label map of a downloaded model
    Labels {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print the input height and width of a downloaded model
    Dims {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print the path of a downloaded model's pipeline.config
    Path {
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ModelArgs {
    /// Model key generated by Nexus
    model_key: String,
    /// Project secret for private models
    #[arg(long, env = "DATATURE_PROJECT_SECRET", hide_env_values = true)]
    secret: Option<String>,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_env("HUB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_config(cli: &Cli) -> Result<HubConfig> {
    let mut config = HubConfig::load_from(cli.config.as_deref()).context("load config")?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(dir) = &cli.hub_dir {
        config.hub_dir = Some(dir.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if cli.quiet {
        config.progress = false;
    }
    Ok(config)
}

fn open(model: &ModelArgs, config: &HubConfig) -> Result<HubModel> {
    HubModel::new(&model.model_key, model.secret.as_deref(), config)
        .with_context(|| format!("resolve model {}", model.model_key))
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Download {
            model,
            force,
            model_type,
        } => {
            let model_type: ModelType = model_type.parse()?;
            let hub_model = open(model, &config)?;
            let dir = if *force {
                hub_model.download_model(model_type, config.progress)?
            } else {
                hub_model.ensure_downloaded(false, config.progress)?.dir
            };
            tracing::info!(model_key = %model.model_key, "model ready");
            println!("{}", dir.display());
        }
        Command::Labels { model } => {
            let labels = open(model, &config)?.load_label_map()?;
            for label in labels.values() {
                println!("{}\t{}", label.id, label.name);
            }
        }
        Command::Dims { model } => {
            let dims = open(model, &config)?.input_dimensions()?;
            println!("{} {}", dims.height, dims.width);
        }
        Command::Path { model } => {
            let path = open(model, &config)?.pipeline_config_path()?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
