mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, run::RunArgs, run::RunExit};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "run-benchmarks",
    about = "Run benchmark scripts and append revision-stamped timings to their history",
    version,
    propagate_version = true,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Project root (default: auto-detect from benchmarks/, .jj/ or .git/)
    #[arg(long, global = true, env = "BENCHREC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered benchmarks and how many records each has
    List {
        /// Project root (overrides --root)
        dir: Option<PathBuf>,
    },

    /// Show the recorded history of one benchmark
    History {
        /// Benchmark name (script file stem)
        name: String,

        /// Only show the most recent N records
        #[arg(long, value_name = "N")]
        last: Option<usize>,
    },

    /// Inspect and validate benchrec.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        None => {
            let root = root::resolve_root(cli.run.dir.as_deref().or(cli.root.as_deref()));
            cmd::run::run(&root, cli.run, cli.json)
        }
        Some(Commands::List { dir }) => {
            let root = root::resolve_root(dir.as_deref().or(cli.root.as_deref()));
            cmd::list::run(&root, cli.json)
        }
        Some(Commands::History { name, last }) => {
            let root = root::resolve_root(cli.root.as_deref());
            cmd::history::run(&root, &name, last, cli.json)
        }
        Some(Commands::Config { subcommand }) => {
            let root = root::resolve_root(cli.root.as_deref());
            cmd::config::run(&root, subcommand, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let code = e
            .downcast_ref::<RunExit>()
            .map(RunExit::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
