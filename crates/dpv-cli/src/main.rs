mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{cloud, console, run};

#[derive(Parser)]
#[command(name = "dpv")]
#[command(about = "DataPoint upload verification harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> device -> scenario...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Parse a captured console log and print the records it announces
    Parse {
        /// Console capture file, `-` for stdin
        #[arg(long, default_value = "-")]
        input: String,

        /// Layered config paths (only console.marker is read)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Overrides console.marker
        #[arg(long)]
        marker: Option<String>,
    },

    /// Print the CRC-32 of a payload in both console renderings
    Checksum {
        /// Payload as base64 (the cloud's encoding of binary data)
        #[arg(long, conflicts_with_all = ["hex", "text"])]
        base64: Option<String>,

        /// Payload as hex bytes
        #[arg(long, conflicts_with_all = ["base64", "text"])]
        hex: Option<String>,

        /// Payload as UTF-8 text
        #[arg(long, conflicts_with_all = ["base64", "hex"])]
        text: Option<String>,
    },

    /// Reconcile a captured console batch against the cloud
    Verify {
        /// Console capture file, `-` for stdin
        #[arg(long, default_value = "-")]
        input: String,

        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Fail (instead of warn) on config keys this command does not read
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Print the most recent records of the configured stream
    Fetch {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Oldest first instead of newest first
        #[arg(long, default_value_t = false)]
        ascending: bool,

        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Delete the configured stream. Guardrail: requires --yes.
    DeleteStream {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Acknowledge that every stored record of the stream is removed.
        #[arg(long, default_value_t = false)]
        yes: bool,

        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Poll the device connection until it reaches the expected state
    Watch {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// connected | disconnected
        #[arg(long, default_value = "connected")]
        expect: String,

        /// Overrides monitor.connect_timeout_secs
        #[arg(long)]
        timeout_secs: Option<u64>,

        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Run the configured scenario against a live console
    Run {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Console source (capture file or serial device), `-` for stdin
        #[arg(long, default_value = "-")]
        console: String,

        /// Skip the wait for the device to be connected
        #[arg(long, default_value_t = false)]
        no_connect_wait: bool,

        /// Print the scenario report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    // Load .env.local (if present) before anything reads credentials.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = commands::load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Parse {
            input,
            config_paths,
            marker,
        } => console::parse(&input, &config_paths, marker)?,

        Commands::Checksum { base64, hex, text } => console::checksum(base64, hex, text)?,

        Commands::Verify {
            input,
            config_paths,
            strict,
        } => cloud::verify(&input, &config_paths, strict)?,

        Commands::Fetch {
            config_paths,
            count,
            ascending,
            strict,
        } => cloud::fetch(&config_paths, count, ascending, strict)?,

        Commands::DeleteStream {
            config_paths,
            yes,
            strict,
        } => cloud::delete_stream(&config_paths, yes, strict)?,

        Commands::Watch {
            config_paths,
            expect,
            timeout_secs,
            strict,
        } => cloud::watch(&config_paths, &expect, timeout_secs, strict)?,

        Commands::Run {
            config_paths,
            console,
            no_connect_wait,
            json,
            strict,
        } => run::run_scenario(&config_paths, &console, !no_connect_wait, json, strict)?,
    }

    Ok(())
}
