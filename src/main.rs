use anyhow::Context;
use clap::{Parser, Subcommand};
use image_stitcher::config::{load_config_or_default, Config, ConfigFormat};
use image_stitcher::data::{load_image, save_panorama};
use image_stitcher::logging::{init_logging, new_correlation_id};
use image_stitcher::{server, StitchError, Stitcher};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stitch")]
#[command(about = "Stitch two overlapping photos into a panorama")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP stitching service
    Serve {
        /// Configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on, overriding the configuration
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Stitch two image files
    Stitch {
        /// Image warped into the second image's frame
        #[arg(short, long)]
        first: PathBuf,

        /// Base image of the panorama
        #[arg(short, long)]
        second: PathBuf,

        /// Output file; the extension selects the format
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON stitch report here
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Seed for the RANSAC sampler
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write the default configuration to a file
    Config {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => {
            let (mut config, load_error) = load_config_or_default(config.as_deref());
            if let Some(port) = port {
                config.server.port = port;
            }
            let _guard = init_cli_logging(&config, cli.verbose)?;
            warn_on_fallback(load_error);
            handle_serve(config)?;
        }
        Commands::Stitch {
            first,
            second,
            output,
            config,
            report,
            seed,
        } => {
            let (mut config, load_error) = load_config_or_default(config.as_deref());
            if seed.is_some() {
                config.stitch.ransac_seed = seed;
            }
            let _guard = init_cli_logging(&config, cli.verbose)?;
            warn_on_fallback(load_error);
            handle_stitch(&config, first, second, output, report)?;
        }
        Commands::Config { output, format } => {
            Config::default()
                .save_to_file(&output, format)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Default configuration written to {}", output.display());
        }
    }

    Ok(())
}

fn warn_on_fallback(load_error: Option<StitchError>) {
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
    }
}

fn init_cli_logging(
    config: &Config,
    verbose: u8,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    init_logging(&config.logging.clone().with_verbosity(verbose))
}

fn handle_serve(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server::run(config))
}

fn handle_stitch(
    config: &Config,
    first: PathBuf,
    second: PathBuf,
    output: PathBuf,
    report: Option<PathBuf>,
) -> anyhow::Result<()> {
    let correlation_id = new_correlation_id();
    tracing::info!(%correlation_id, first = %first.display(), second = %second.display(), "Stitching files");

    let first = load_image(&first).with_context(|| format!("loading {}", first.display()))?;
    let second = load_image(&second).with_context(|| format!("loading {}", second.display()))?;

    let stitcher = Stitcher::new(config.stitch.clone())?;
    let panorama = stitcher.stitch(first, second)?;

    save_panorama(&panorama.image, &output, config.server.jpeg_quality)
        .with_context(|| format!("writing {}", output.display()))?;

    let summary = &panorama.report;
    println!(
        "Panorama {}x{} written to {} ({} matches, {} inliers, {:.1} ms)",
        summary.canvas_width,
        summary.canvas_height,
        output.display(),
        summary.matches,
        summary.inliers,
        summary.total_ms
    );

    if let Some(report_path) = report {
        let json = serde_json::to_string_pretty(&panorama.report)?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("writing {}", report_path.display()))?;
    }

    Ok(())
}
