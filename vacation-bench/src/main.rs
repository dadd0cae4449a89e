use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vacation_bench::{cli::Cli, exit_codes, execute, Config};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vacation_bench=info,vacation_order=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{:#}", err);
            return ExitCode::from(exit_codes::INVALID_CONFIG);
        }
    };

    match run(&cli, &config) {
        Ok(true) => ExitCode::from(exit_codes::OK),
        Ok(false) => ExitCode::from(exit_codes::CHECK_FAILED),
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::from(exit_codes::CHECK_FAILED)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = Config::load(&cli.overrides()).context("load configuration")?;
    config.workload.validate().context("validate workload")?;
    Ok(config)
}

fn run(cli: &Cli, config: &Config) -> anyhow::Result<bool> {
    let summary = execute(config, !cli.skip_teardown).context("populate tables")?;

    if cli.json {
        println!("{}", summary.to_json().context("serialize summary")?);
    } else {
        print!("{}", summary.render());
    }
    Ok(summary.passed())
}
