mod commands;

use charm_release_core::ReleaseRequest;
use charm_release_runtime::ToolConfig;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_USAGE};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "charm-release",
    version,
    about = "Pack a Kubernetes charm, upload its OCI image resources by digest, and release it"
)]
struct Cli {
    /// Path to the charm's metadata.yaml; the charm is packed from its directory.
    #[arg(long, value_name = "PATH")]
    charm_metadata: Option<PathBuf>,

    /// Path to an already packed .charm artifact; packing is skipped.
    #[arg(long, value_name = "PATH")]
    charm_path: Option<PathBuf>,

    /// Channel to release to, overriding the configured channel.
    #[arg(long)]
    channel: Option<String>,

    /// Path to a JSON tool configuration file.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that charmcraft and docker are available and the configuration is valid.
    Doctor {
        /// Also validate this metadata.yaml.
        #[arg(long, value_name = "PATH")]
        charm_metadata: Option<PathBuf>,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Generate man pages.
    ManPages {
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CHARM_RELEASE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Some(Commands::Doctor { charm_metadata }) => {
            commands::doctor::run(cli.config.as_deref(), charm_metadata.as_deref(), json_output)
        }
        Some(Commands::Completions { shell }) => commands::completions::run::<Cli>(shell),
        Some(Commands::ManPages { dir }) => commands::man_pages::run::<Cli>(&dir),
        None => {
            let Some(request) = release_request(cli.charm_metadata, cli.charm_path) else {
                eprintln!("error: one of --charm-metadata or --charm-path is required");
                eprintln!("run 'charm-release --help' for usage");
                return ExitCode::from(EXIT_USAGE);
            };
            let check_prereqs =
                std::env::var("CHARM_RELEASE_SKIP_PREREQS").as_deref() != Ok("1");
            release_config(cli.config.as_deref(), cli.channel.as_deref()).and_then(|config| {
                commands::release::run(&request, config, check_prereqs, json_output)
            })
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn release_request(
    charm_metadata: Option<PathBuf>,
    charm_path: Option<PathBuf>,
) -> Option<ReleaseRequest> {
    match (charm_path, charm_metadata) {
        (Some(artifact), Some(metadata)) => {
            Some(ReleaseRequest::from_artifact(artifact).with_metadata(metadata))
        }
        (Some(artifact), None) => Some(ReleaseRequest::from_artifact(artifact)),
        (None, Some(metadata)) => Some(ReleaseRequest::from_metadata(metadata)),
        (None, None) => None,
    }
}

fn release_config(path: Option<&Path>, channel: Option<&str>) -> Result<ToolConfig, String> {
    let config = commands::load_config(path)?;
    match channel {
        Some(ch) if ch.trim().is_empty() => Err("--channel must not be empty".to_owned()),
        Some(ch) => Ok(config.with_channel(ch.trim())),
        None => Ok(config),
    }
}
