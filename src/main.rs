//! kubesre - Kubernetes cluster diagnostics and remediation planning

use anyhow::Result;
use clap::Parser;
use kubesre::cli::{Cli, Command};
use kubesre::commands::{self, Runtime};
use kubesre::config::load_config;
use kubesre::web::{handlers::AppState, start_server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    setup_tracing(cli.verbose);

    // Handle color settings
    if cli.no_color {
        owo_colors::set_override(false);
    }

    // Completions need no cluster or config
    if let Command::Completions(ref args) = cli.command {
        generate_completions(args.shell);
        return Ok(());
    }

    let result = run(&cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: &Cli) -> kubesre::error::Result<()> {
    let config = load_config()?;

    if let Command::Contexts = cli.command {
        let output = cli.output.unwrap_or(config.default_output);
        return commands::handle_contexts(output);
    }

    let runtime = Runtime::from_cli(cli, config)?;

    match &cli.command {
        Command::Diagnose(args) => commands::run_diagnose(&runtime, args).await,
        Command::Health => commands::run_health(&runtime).await,
        Command::Plan(args) => commands::run_plan(&runtime, args).await,
        Command::Serve(args) => {
            let state = AppState::new(
                runtime.client.clone(),
                runtime.config.diagnostics_options(),
                runtime.config.scoring,
                runtime.config.cloud.clone(),
                runtime.namespace.clone(),
            );
            start_server(&args.address, args.port, state).await
        }
        Command::Contexts | Command::Completions(_) => Ok(()),
    }
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "kubesre", &mut std::io::stdout());
}
