use std::process::ExitCode;

use tracing::error;
use yamirrord::config::DaemonConfig;
use yamirrord::daemon::{DaemonRuntime, is_authorization_failure};
use yamirrord::logging;

const EXIT_AUTHORIZATION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    Once,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    for arg in args.into_iter().skip(1) {
        match arg.as_str() {
            "--once" => mode = CliMode::Once,
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

fn print_usage() {
    println!("Usage: yamirrord [--once]");
    println!("  --once   Run a single sync pass and exit");
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let mode = match parse_cli_mode(std::env::args()) {
        Ok(CliMode::Help) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("[yamirrord] {err}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let config = DaemonConfig::from_env();
    let log_dir = config.as_ref().ok().and_then(|config| config.log_dir.clone());
    let _log_guard = match logging::init(log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("[yamirrord] {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(mode, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_authorization_failure(&err) => {
            error!(error = %format!("{err:#}"), "token rejected, check YADISK_TOKEN");
            ExitCode::from(EXIT_AUTHORIZATION)
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "daemon stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(mode: CliMode, config: DaemonConfig) -> anyhow::Result<()> {
    let daemon = DaemonRuntime::bootstrap(config).await?;
    match mode {
        CliMode::Once => daemon.run_once().await.map(|_| ()),
        CliMode::Run | CliMode::Help => daemon.run().await,
    }
}
