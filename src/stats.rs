use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike as _, NaiveDate};
use serde::ser::SerializeMap as _;
use serde::{Serialize, Serializer};

use crate::formats::{EnrichedRecord, Popularity, ScoreRatingPoint, WatchStatus};

pub const MINUTES_PER_EPISODE: f64 = 24.0;
pub const TREND_WINDOW: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("no completed records to rank by popularity")]
    NoCompletedRecords,
    #[error("completed record `{title}` has no popularity value")]
    UnknownPopularity { title: String },
}

/// Which record field a [`FrequencyTable`] is folded over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    Genres,
    Themes,
    Demographics,
    Studio,
}

impl CategoryField {
    fn values(self, record: &EnrichedRecord) -> &[String] {
        match self {
            Self::Genres => &record.genres,
            Self::Themes => &record.themes,
            Self::Demographics => &record.demographics,
            Self::Studio => std::slice::from_ref(&record.studio),
        }
    }
}

/// Label counts that remember the order labels were first seen in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, label: &str) {
        self.add(label, 1);
    }

    fn add(&mut self, label: &str, count: u64) {
        match self.index.get(label) {
            Some(&idx) => self.entries[idx].1 += count,
            None => {
                self.index.insert(label.to_owned(), self.entries.len());
                self.entries.push((label.to_owned(), count));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.index.get(label).map(|&idx| self.entries[idx].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    /// Count descending; equal counts keep first-seen order.
    pub fn sorted_desc(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.into_iter().collect()
    }
}

impl FromIterator<(String, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (label, count) in iter {
            table.add(&label, count);
        }
        table
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Multi-valued fields count every value once per record; `Studio` counts once per record.
pub fn frequency(records: &[EnrichedRecord], field: CategoryField) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    for record in records {
        for value in field.values(record) {
            table.increment(value);
        }
    }
    table
}

pub fn top_n(table: &FrequencyTable, n: usize) -> FrequencyTable {
    table.sorted_desc().entries.into_iter().take(n).collect()
}

/// Records carrying both a personal score and a global rating, in input order.
pub fn score_rating_series(records: &[EnrichedRecord]) -> Vec<ScoreRatingPoint> {
    records
        .iter()
        .filter_map(|record| {
            Some(ScoreRatingPoint {
                title: record.title.clone(),
                my_score: record.score?,
                overall_rating: record.rating?,
            })
        })
        .collect()
}

/// The completed record with the largest popularity number (1 = most popular).
///
/// Ties resolve to the later record. Fails when nothing is completed or when a
/// completed record has no popularity number.
pub fn least_popular_completed(records: &[EnrichedRecord]) -> Result<&EnrichedRecord, StatsError> {
    let mut ranked = Vec::new();
    for record in records.iter().filter(|r| r.status == WatchStatus::Completed) {
        match record.popularity {
            Popularity::Known(popularity) => ranked.push((popularity, record)),
            Popularity::Unknown => {
                return Err(StatsError::UnknownPopularity {
                    title: record.title.clone(),
                });
            }
        }
    }

    ranked.sort_by_key(|(popularity, _)| *popularity);
    ranked
        .last()
        .map(|(_, record)| *record)
        .ok_or(StatsError::NoCompletedRecords)
}

/// Records without an episode count are left out of the sum.
pub fn total_watch_time_minutes(records: &[EnrichedRecord]) -> f64 {
    records
        .iter()
        .filter_map(|record| record.episodes_watched)
        .map(|episodes| f64::from(episodes) * MINUTES_PER_EPISODE)
        .sum()
}

/// Mean personal score and mean global rating over completed records, each
/// rounded to two decimals. Missing values are skipped; `(0, 0)` without
/// completed records.
pub fn average_score_and_rating(records: &[EnrichedRecord]) -> (f64, f64) {
    let completed: Vec<&EnrichedRecord> = records
        .iter()
        .filter(|r| r.status == WatchStatus::Completed)
        .collect();
    if completed.is_empty() {
        return (0.0, 0.0);
    }

    let scores = completed.iter().filter_map(|r| r.score.map(f64::from));
    let ratings = completed.iter().filter_map(|r| r.rating);
    (round2(mean(scores)), round2(mean(ratings)))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Month number (1-12) to the number of records started in that month.
pub type MonthlyTrend = BTreeMap<u32, u64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: u32,
    /// `None` until the window has enough preceding points.
    pub value: Option<f64>,
}

/// Records whose start date has no month (`"Unknown"`, bare years) are left out.
pub fn monthly_trend(records: &[EnrichedRecord]) -> MonthlyTrend {
    let mut trend = MonthlyTrend::new();
    for month in records.iter().filter_map(|r| start_month(&r.start_date)) {
        *trend.entry(month).or_insert(0) += 1;
    }
    trend
}

/// Trailing mean over the months present in `trend`, in month order.
///
/// The first `window - 1` points have no full window and are `None`.
pub fn rolling_mean(trend: &MonthlyTrend, window: usize) -> Vec<TrendPoint> {
    let window = window.max(1);
    let counts: Vec<(u32, u64)> = trend.iter().map(|(m, c)| (*m, *c)).collect();

    counts
        .iter()
        .enumerate()
        .map(|(idx, (month, _))| {
            let value = (idx + 1 >= window).then(|| {
                let slice = &counts[idx + 1 - window..=idx];
                slice.iter().map(|(_, c)| *c as f64).sum::<f64>() / window as f64
            });
            TrendPoint {
                month: *month,
                value,
            }
        })
        .collect()
}

/// Month of a `YYYY-MM` or `YYYY-MM-DD...` start date.
pub fn start_month(start_date: &str) -> Option<u32> {
    let start_date = start_date.trim();
    let full = match start_date.chars().count() {
        7 => format!("{start_date}-01"),
        n if n >= 10 => start_date.chars().take(10).collect(),
        _ => return None,
    };
    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .ok()
        .map(|date| date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{Rank, UNKNOWN};

    fn record(title: &str) -> EnrichedRecord {
        EnrichedRecord {
            entity_id: 0,
            title: title.to_owned(),
            score: None,
            status: WatchStatus::Completed,
            start_date: UNKNOWN.to_owned(),
            genres: Vec::new(),
            themes: Vec::new(),
            demographics: Vec::new(),
            studio: UNKNOWN.to_owned(),
            rating: None,
            rank: Rank::Unranked,
            popularity: Popularity::Known(100),
            episodes_watched: None,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn frequency_counts_every_value_of_multi_valued_fields() {
        let mut a = record("a");
        a.genres = strings(&["A", "B"]);
        let mut b = record("b");
        b.genres = strings(&["A"]);

        let table = frequency(&[a, b], CategoryField::Genres);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("A"), Some(2));
        assert_eq!(table.get("B"), Some(1));
    }

    #[test]
    fn frequency_counts_studio_once_per_record() {
        let mut a = record("a");
        a.studio = "MAPPA".to_owned();
        let mut b = record("b");
        b.studio = "MAPPA".to_owned();
        let c = record("c");

        let table = frequency(&[a, b, c], CategoryField::Studio);
        assert_eq!(table.get("MAPPA"), Some(2));
        assert_eq!(table.get(UNKNOWN), Some(1));
    }

    #[test]
    fn top_n_sorts_by_count_and_keeps_first_seen_order_on_ties() {
        let table: FrequencyTable = [("x", 1), ("y", 3), ("z", 1), ("w", 3), ("v", 2), ("u", 1)]
            .into_iter()
            .map(|(label, count)| (label.to_owned(), count))
            .collect();

        let top = top_n(&table, 5);
        let labels: Vec<&str> = top.iter().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["y", "w", "v", "x", "z"]);
        assert_eq!(top_n(&top, 5), top);
    }

    #[test]
    fn frequency_table_serializes_in_table_order() {
        let table = top_n(
            &[("b".to_owned(), 1), ("a".to_owned(), 2)].into_iter().collect(),
            5,
        );
        assert_eq!(serde_json::to_string(&table).expect("json"), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn score_rating_series_needs_both_values() {
        let mut a = record("a");
        a.score = Some(9);
        a.rating = Some(8.5);
        let mut b = record("b");
        b.score = Some(7);
        let mut c = record("c");
        c.rating = Some(6.0);
        let mut d = record("d");
        d.score = Some(0);
        d.rating = Some(7.1);

        let series = score_rating_series(&[a, b, c, d]);
        let titles: Vec<&str> = series.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "d"]);
        assert_eq!(series[0].my_score, 9);
        assert_eq!(series[0].overall_rating, 8.5);
    }

    #[test]
    fn least_popular_completed_takes_largest_popularity_number() {
        let mut a = record("a");
        a.popularity = Popularity::Known(50);
        let mut b = record("b");
        b.popularity = Popularity::Known(9000);
        let mut c = record("c");
        c.popularity = Popularity::Known(12000);
        c.status = WatchStatus::Dropped;
        let mut d = record("d");
        d.popularity = Popularity::Known(9000);

        let records = [a, b, c, d];
        let least = least_popular_completed(&records).expect("least popular");
        assert_eq!(least.title, "d");
    }

    #[test]
    fn least_popular_completed_fails_without_completed_records() {
        let mut a = record("a");
        a.status = WatchStatus::Watching;
        assert!(matches!(
            least_popular_completed(&[a]),
            Err(StatsError::NoCompletedRecords)
        ));
        assert!(matches!(
            least_popular_completed(&[]),
            Err(StatsError::NoCompletedRecords)
        ));
    }

    #[test]
    fn least_popular_completed_fails_on_unknown_popularity() {
        let mut a = record("a");
        a.popularity = Popularity::Unknown;
        let err = least_popular_completed(&[record("b"), a]).unwrap_err();
        assert!(matches!(err, StatsError::UnknownPopularity { ref title } if title == "a"));
    }

    #[test]
    fn total_watch_time_skips_missing_episode_counts() {
        let mut a = record("a");
        a.episodes_watched = Some(10);
        let b = record("b");
        assert_eq!(total_watch_time_minutes(&[a, b]), 240.0);
    }

    #[test]
    fn averages_cover_completed_records_only() {
        let mut a = record("a");
        a.score = Some(9);
        a.rating = Some(8.0);
        let mut b = record("b");
        b.score = Some(8);
        b.rating = Some(7.333);
        let mut c = record("c");
        c.score = Some(1);
        c.rating = Some(1.0);
        c.status = WatchStatus::Dropped;
        let mut d = record("d");
        d.score = Some(10);

        assert_eq!(average_score_and_rating(&[a, b, c, d]), (9.0, 7.67));
    }

    #[test]
    fn averages_default_to_zero_without_completed_records() {
        let mut a = record("a");
        a.status = WatchStatus::PlanToWatch;
        a.score = Some(10);
        assert_eq!(average_score_and_rating(&[a]), (0.0, 0.0));
        assert_eq!(average_score_and_rating(&[]), (0.0, 0.0));
    }

    #[test]
    fn monthly_trend_counts_parseable_months_only() {
        let dates = ["2024-01-10", "2024-01-28", "2024-03", "2024", UNKNOWN, "2024-03-02", "2024-13-01"];
        let records: Vec<EnrichedRecord> = dates
            .iter()
            .map(|date| {
                let mut r = record("r");
                r.start_date = (*date).to_owned();
                r
            })
            .collect();

        let trend = monthly_trend(&records);
        assert_eq!(trend, MonthlyTrend::from([(1, 2), (3, 2)]));
    }

    #[test]
    fn rolling_mean_leaves_first_point_empty() {
        let trend = MonthlyTrend::from([(1, 2), (3, 4), (4, 1)]);
        let smoothed = rolling_mean(&trend, TREND_WINDOW);
        assert_eq!(
            smoothed,
            vec![
                TrendPoint { month: 1, value: None },
                TrendPoint { month: 3, value: Some(3.0) },
                TrendPoint { month: 4, value: Some(2.5) },
            ]
        );
        assert!(rolling_mean(&MonthlyTrend::new(), TREND_WINDOW).is_empty());
    }
}
