use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    anilytics::logging::init().context("init logging")?;

    let cli = anilytics::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        anilytics::cli::Command::Build(args) => {
            anilytics::build::run(args).await.context("build")?;
        }
        anilytics::cli::Command::Fetch(args) => {
            anilytics::fetch::run(args).await.context("fetch")?;
        }
        anilytics::cli::Command::Filter(args) => {
            anilytics::date_filter::run(args).context("filter")?;
        }
        anilytics::cli::Command::Enrich(args) => {
            anilytics::enrich::run(args).await.context("enrich")?;
        }
        anilytics::cli::Command::Stats(args) => {
            anilytics::report::run(args).context("stats")?;
        }
    }

    Ok(())
}
