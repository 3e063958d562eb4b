use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::chart::{ChartArtifact, ChartKind, ChartOptions, ChartSeries, render_series};
use crate::cli::{ReportFormat, StatsArgs};
use crate::formats::{EnrichedRecord, ScoreRatingPoint};
use crate::stats::{
    CategoryField, FrequencyTable, MonthlyTrend, StatsError, TREND_WINDOW, TrendPoint,
};

const CHARTS_DIR: &str = "charts";
const TOP_SCORE: u8 = 10;

/// Everything the presentation layer needs for one user and year.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub year: i32,
    /// Counted from the enriched records, never from the raw list.
    pub total_anime: usize,
    pub watch_hours: f64,
    pub average_score: f64,
    pub average_rating: f64,
    pub top_genres: FrequencyTable,
    pub top_themes: FrequencyTable,
    pub top_demographics: FrequencyTable,
    pub top_studios: FrequencyTable,
    pub score_vs_rating: Vec<ScoreRatingPoint>,
    pub monthly_trend: MonthlyTrend,
    pub monthly_trend_smoothed: Vec<TrendPoint>,
    pub least_popular: EnrichedRecord,
    pub top_titles: Vec<String>,
    /// Chart name to artifact path, relative to the report.
    pub charts: BTreeMap<String, String>,
    pub records: Vec<EnrichedRecord>,
}

pub fn build_report(records: Vec<EnrichedRecord>, year: i32, top: usize) -> Result<Report, StatsError> {
    let least_popular = crate::stats::least_popular_completed(&records)?.clone();
    let (average_score, average_rating) = crate::stats::average_score_and_rating(&records);
    let watch_minutes = crate::stats::total_watch_time_minutes(&records);

    let top_table = |field| crate::stats::top_n(&crate::stats::frequency(&records, field), top);

    let top_titles = crate::dedupe::dedupe_similar_titles(
        records
            .iter()
            .filter(|r| r.score == Some(TOP_SCORE))
            .map(|r| r.title.as_str()),
    );

    let monthly_trend = crate::stats::monthly_trend(&records);
    let monthly_trend_smoothed = crate::stats::rolling_mean(&monthly_trend, TREND_WINDOW);

    Ok(Report {
        year,
        total_anime: records.len(),
        watch_hours: crate::stats::round2(watch_minutes / 60.0),
        average_score,
        average_rating,
        top_genres: top_table(CategoryField::Genres),
        top_themes: top_table(CategoryField::Themes),
        top_demographics: top_table(CategoryField::Demographics),
        top_studios: top_table(CategoryField::Studio),
        score_vs_rating: crate::stats::score_rating_series(&records),
        monthly_trend,
        monthly_trend_smoothed,
        least_popular,
        top_titles,
        charts: BTreeMap::new(),
        records,
    })
}

/// Named chart artifacts for a report; frequency charts use the full tables.
pub fn render_charts(report: &Report) -> Vec<(&'static str, ChartArtifact)> {
    let year = report.year;
    let records = &report.records;

    let distributions = [
        ("genre_distribution", CategoryField::Genres, "Genre", "Genres"),
        ("theme_distribution", CategoryField::Themes, "Theme", "Themes"),
        ("demographic_distribution", CategoryField::Demographics, "Demographic", "Demographics"),
        ("studio_distribution", CategoryField::Studio, "Studio", "Studios"),
    ];

    let mut charts = Vec::new();
    for (name, field, noun, axis) in distributions {
        let table = crate::stats::frequency(records, field).sorted_desc();
        let options = ChartOptions::new(
            name,
            &format!("{noun} Distribution of Anime in {year}"),
            axis,
            "Number of Anime",
        );
        let series = ChartSeries::from_frequency(&table, "Number of Anime");
        charts.push((name, render_series(&series, ChartKind::Bar, &options)));
    }

    let options = ChartOptions::new(
        "score_vs_rating",
        "Area Chart of My Scores vs. Overall Ratings",
        "Titles",
        "Scores",
    );
    let series = ChartSeries::from_score_rating(&report.score_vs_rating);
    charts.push(("score_vs_rating", render_series(&series, ChartKind::Area, &options)));

    let options = ChartOptions::new(
        "anime_watching_trend",
        &format!("Anime Watching Trend ({year})"),
        "Month",
        "Anime Started",
    );
    let series = ChartSeries::from_trend(&report.monthly_trend_smoothed, "Monthly Watch Trend");
    charts.push(("anime_watching_trend", render_series(&series, ChartKind::Line, &options)));

    charts
}

pub fn run(args: StatsArgs) -> anyhow::Result<()> {
    let input_path = PathBuf::from(&args.input);
    let out_dir = PathBuf::from(&args.out);
    let report_path = out_dir.join(args.format.file_name());
    let charts_dir = out_dir.join(CHARTS_DIR);

    let records: Vec<EnrichedRecord> =
        crate::jsonl::read_records(&input_path).context("read enriched records")?;
    tracing::info!(records = records.len(), year = args.year, "stats: aggregate");

    let mut report = build_report(records, args.year, args.top).context("build report")?;
    let charts = render_charts(&report);

    // Charts are shared by every report format, so all outputs are checked
    // before the first write.
    if !args.force {
        let outputs = std::iter::once(report_path.clone())
            .chain(charts.iter().map(|(_, artifact)| charts_dir.join(&artifact.file_name)));
        for path in outputs {
            if path.exists() {
                anyhow::bail!(
                    "stats output already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
        }
    }

    std::fs::create_dir_all(&charts_dir)
        .with_context(|| format!("create charts dir: {}", charts_dir.display()))?;
    for (name, artifact) in charts {
        let path = charts_dir.join(&artifact.file_name);
        write_text(&path, &artifact.svg, args.force).context("write chart")?;
        report
            .charts
            .insert(name.to_owned(), format!("{CHARTS_DIR}/{}", artifact.file_name));
    }

    let text = serialize_report(&report, args.format)?;
    write_text(&report_path, &text, args.force).context("write report")?;

    tracing::info!(
        total_anime = report.total_anime,
        watch_hours = report.watch_hours,
        out = %report_path.display(),
        "stats: done"
    );
    Ok(())
}

pub fn serialize_report(report: &Report, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Json => {
            let mut text = serde_json::to_string_pretty(report).context("serialize report json")?;
            text.push('\n');
            Ok(text)
        }
        ReportFormat::Yaml => serde_yaml::to_string(report).context("serialize report yaml"),
    }
}

fn write_text(path: &Path, text: &str, force: bool) -> anyhow::Result<()> {
    let mut out = crate::jsonl::create_output(path, force)?;
    out.write_all(text.as_bytes())
        .with_context(|| format!("write: {}", path.display()))?;
    out.flush().with_context(|| format!("flush: {}", path.display()))
}
