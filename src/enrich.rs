use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::cli::EnrichArgs;
use crate::config::ApiConfig;
use crate::formats::{
    DetailData, DetailResponse, EnrichedRecord, FailureRecord, ListEntry, NamedEntry, Popularity,
    Rank, UNKNOWN, WatchStatus,
};
use crate::rate_limit::RateLimiter;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("detail request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("detail API returned {0}")]
    Status(StatusCode),
    #[error("malformed detail response: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),
    #[error("unrecognized list status `{0}`")]
    UnknownStatus(String),
    #[error("invalid detail url: {0}")]
    InvalidUrl(String),
}

/// Per-title metadata lookup.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch_detail(&self, entity_id: u64) -> Result<DetailData, EnrichmentError>;
}

/// `GET {base}/anime/{id}` against the Jikan v4 API.
#[derive(Debug, Clone)]
pub struct JikanClient {
    client: reqwest::Client,
    base_url: String,
}

impl JikanClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> anyhow::Result<Self> {
        crate::http::join_segments(base_url, &["anime"]).context("check detail base url")?;
        Ok(Self {
            client,
            base_url: base_url.to_owned(),
        })
    }
}

#[async_trait]
impl DetailSource for JikanClient {
    async fn fetch_detail(&self, entity_id: u64) -> Result<DetailData, EnrichmentError> {
        let id = entity_id.to_string();
        let url = crate::http::join_segments(&self.base_url, &["anime", &id])
            .map_err(|err| EnrichmentError::InvalidUrl(format!("{err:#}")))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(EnrichmentError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status));
        }

        let raw = response.text().await.map_err(EnrichmentError::Transport)?;
        let parsed: DetailResponse =
            serde_json::from_str(&raw).map_err(EnrichmentError::Malformed)?;
        Ok(parsed.data)
    }
}

#[derive(Debug)]
pub struct EnrichmentFailure {
    pub entity_id: u64,
    pub error: EnrichmentError,
}

impl EnrichmentFailure {
    pub fn to_record(&self) -> FailureRecord {
        FailureRecord {
            entity_id: self.entity_id,
            error: self.error.to_string(),
        }
    }
}

/// Successes in input order, plus one diagnostic per skipped entity.
#[derive(Debug, Default)]
pub struct Enrichment {
    pub records: Vec<EnrichedRecord>,
    pub failures: Vec<EnrichmentFailure>,
}

pub struct DetailEnricher {
    source: Box<dyn DetailSource>,
    limiter: Box<dyn RateLimiter>,
}

impl DetailEnricher {
    pub fn new(source: Box<dyn DetailSource>, limiter: Box<dyn RateLimiter>) -> Self {
        Self { source, limiter }
    }

    /// Looks entries up one at a time, each call gated by the rate limiter.
    ///
    /// A failing entity is logged and skipped; it is not retried.
    pub async fn enrich(&self, entries: &[ListEntry]) -> Enrichment {
        let mut enrichment = Enrichment::default();

        for entry in entries {
            let entity_id = entry.entity_id();
            match self.enrich_one(entry).await {
                Ok(record) => {
                    tracing::debug!(entity_id, title = %record.title, "enriched");
                    enrichment.records.push(record);
                }
                Err(error) => {
                    tracing::warn!(entity_id, %error, "skipping entity: enrichment failed");
                    enrichment.failures.push(EnrichmentFailure { entity_id, error });
                }
            }
        }

        enrichment
    }

    pub async fn enrich_one(&self, entry: &ListEntry) -> Result<EnrichedRecord, EnrichmentError> {
        self.limiter.acquire().await;
        let detail = self.source.fetch_detail(entry.entity_id()).await?;
        build_record(entry, detail)
    }
}

/// Flattens a list entry and its detail payload into one record.
pub fn build_record(entry: &ListEntry, detail: DetailData) -> Result<EnrichedRecord, EnrichmentError> {
    let title = detail.title.trim().to_owned();
    if title.is_empty() {
        return Err(EnrichmentError::MissingField("title"));
    }

    let raw_status = entry
        .list_status
        .status
        .as_deref()
        .ok_or(EnrichmentError::MissingField("list_status.status"))?;
    let status = WatchStatus::parse(raw_status)
        .ok_or_else(|| EnrichmentError::UnknownStatus(raw_status.to_owned()))?;

    let start_date = entry
        .list_status
        .start_date
        .clone()
        .filter(|date| !date.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned());

    let studio = detail
        .studios
        .first()
        .map(|studio| studio.name.clone())
        .unwrap_or_else(|| UNKNOWN.to_owned());

    Ok(EnrichedRecord {
        entity_id: entry.entity_id(),
        title,
        score: entry.list_status.score,
        status,
        start_date,
        genres: names(detail.genres),
        themes: names(detail.themes),
        demographics: names(detail.demographics),
        studio,
        rating: detail.score,
        rank: detail.rank.map_or(Rank::Unranked, Rank::Ranked),
        popularity: detail.popularity.map_or(Popularity::Unknown, Popularity::Known),
        episodes_watched: entry.list_status.num_episodes_watched,
    })
}

fn names(entries: Vec<NamedEntry>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !out.contains(&entry.name) {
            out.push(entry.name);
        }
    }
    out
}

pub async fn run(args: EnrichArgs) -> anyhow::Result<()> {
    let input_path = PathBuf::from(&args.input);
    let out_path = PathBuf::from(&args.out);
    let failures_path = args.failures.as_ref().map(PathBuf::from);

    if out_path.exists() && !args.force {
        anyhow::bail!("enriched output already exists: {}", out_path.display());
    }

    let entries: Vec<ListEntry> =
        crate::jsonl::read_records(&input_path).context("read filtered list")?;

    let config = ApiConfig::resolve(&args.api)?;
    let client = crate::http::client(config.timeout)?;
    let source = JikanClient::new(client, &config.detail_base_url)?;
    let limiter = crate::rate_limit::from_delay(Duration::from_millis(args.delay_ms));
    let enricher = DetailEnricher::new(Box::new(source), limiter);

    tracing::info!(entries = entries.len(), delay_ms = args.delay_ms, "enrich: fetching details");
    let enrichment = enricher.enrich(&entries).await;

    crate::jsonl::write_records(&out_path, &enrichment.records, args.force)
        .context("write enriched records")?;
    if let Some(path) = failures_path {
        let failures: Vec<FailureRecord> = enrichment
            .failures
            .iter()
            .map(EnrichmentFailure::to_record)
            .collect();
        crate::jsonl::write_records(&path, &failures, args.force)
            .context("write enrichment failures")?;
    }

    tracing::info!(
        enriched = enrichment.records.len(),
        failed = enrichment.failures.len(),
        "enrich: done"
    );
    Ok(())
}
