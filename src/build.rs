use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::{BuildArgs, EnrichArgs, FetchArgs, FilterArgs, StatsArgs};

pub async fn run(args: BuildArgs) -> anyhow::Result<()> {
    let workspace_dir = PathBuf::from(&args.out);
    if workspace_dir.exists() {
        anyhow::bail!(
            "workspace output directory already exists: {}",
            workspace_dir.display()
        );
    }

    // Fail on a missing credential before anything touches the disk.
    crate::config::ApiConfig::resolve(&args.api)?
        .require_client_id()
        .context("check list API credential")?;

    std::fs::create_dir_all(&workspace_dir)
        .with_context(|| format!("create workspace dir: {}", workspace_dir.display()))?;

    let list_path = workspace_dir.join("list.jsonl");
    let filtered_path = workspace_dir.join("filtered.jsonl");
    let enriched_path = workspace_dir.join("enriched.jsonl");
    let failures_path = workspace_dir.join("failures.jsonl");
    let report_dir = workspace_dir.join("report");

    tracing::info!(user = %args.user, year = args.year, out = %workspace_dir.display(), "build: fetch");
    crate::fetch::run(FetchArgs {
        user: args.user.clone(),
        out: list_path.to_string_lossy().to_string(),
        nsfw: args.nsfw,
        force: false,
        api: args.api.clone(),
    })
    .await
    .context("fetch")?;

    tracing::info!("build: filter");
    crate::date_filter::run(FilterArgs {
        input: list_path.to_string_lossy().to_string(),
        out: filtered_path.to_string_lossy().to_string(),
        year: args.year,
        force: false,
    })
    .context("filter")?;

    tracing::info!("build: enrich");
    crate::enrich::run(EnrichArgs {
        input: filtered_path.to_string_lossy().to_string(),
        out: enriched_path.to_string_lossy().to_string(),
        failures: Some(failures_path.to_string_lossy().to_string()),
        delay_ms: args.delay_ms,
        force: false,
        api: args.api.clone(),
    })
    .await
    .context("enrich")?;

    tracing::info!("build: stats");
    crate::report::run(StatsArgs {
        input: enriched_path.to_string_lossy().to_string(),
        out: report_dir.to_string_lossy().to_string(),
        year: args.year,
        format: args.format,
        top: args.top,
        force: false,
    })
    .context("stats")?;

    Ok(())
}
