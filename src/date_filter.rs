use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{Datelike as _, NaiveDate};

use crate::cli::FilterArgs;
use crate::formats::ListEntry;

pub fn run(args: FilterArgs) -> anyhow::Result<()> {
    let input_path = PathBuf::from(&args.input);
    let out_path = PathBuf::from(&args.out);

    let entries: Vec<ListEntry> =
        crate::jsonl::read_records(&input_path).context("read list entries")?;
    let total = entries.len();
    let kept = filter_by_year(entries, args.year);

    crate::jsonl::write_records(&out_path, &kept, args.force).context("write filtered list")?;
    tracing::info!(year = args.year, total, kept = kept.len(), "filter: done");
    Ok(())
}

/// Keeps entries whose start date parses to `target_year`, in input order.
///
/// Entries without a start date, or with one that does not parse, are dropped
/// silently.
pub fn filter_by_year(
    entries: impl IntoIterator<Item = ListEntry>,
    target_year: i32,
) -> Vec<ListEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            entry
                .list_status
                .start_date
                .as_deref()
                .and_then(start_year)
                == Some(target_year)
        })
        .collect()
}

/// Year of a `YYYY` or `YYYY-MM-DD...` start date.
pub fn start_year(start_date: &str) -> Option<i32> {
    if start_date.is_empty() {
        return None;
    }
    if start_date.chars().count() == 4 {
        return start_date.parse().ok();
    }

    let prefix: String = start_date.chars().take(10).collect();
    NaiveDate::parse_from_str(&prefix, "%Y-%m-%d")
        .ok()
        .map(|date| date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{ListNode, ListStatus};

    fn entry(id: u64, start_date: Option<&str>) -> ListEntry {
        ListEntry {
            node: ListNode { id, title: None },
            list_status: ListStatus {
                start_date: start_date.map(str::to_owned),
                ..ListStatus::default()
            },
        }
    }

    #[test]
    fn start_year_accepts_year_and_full_dates() {
        assert_eq!(start_year("2024"), Some(2024));
        assert_eq!(start_year("2024-03-15"), Some(2024));
        assert_eq!(start_year("2023-12-31T10:00:00+00:00"), Some(2023));
    }

    #[test]
    fn start_year_rejects_other_shapes() {
        for raw in ["", "24", "2024-03", "20x4", "2024-13-01", "March 2024", "Unknown"] {
            assert_eq!(start_year(raw), None, "raw={raw}");
        }
    }

    #[test]
    fn filter_keeps_only_target_year_in_order() {
        let entries = vec![
            entry(1, Some("2024-01-05")),
            entry(2, Some("2023-12-31")),
            entry(3, None),
            entry(4, Some("2024")),
            entry(5, Some("")),
            entry(6, Some("2024-02-30")),
            entry(7, Some("2024-11-20")),
        ];

        let ids: Vec<u64> = filter_by_year(entries, 2024)
            .iter()
            .map(ListEntry::entity_id)
            .collect();
        assert_eq!(ids, vec![1, 4, 7]);
    }

    #[test]
    fn filter_is_idempotent() {
        let entries = vec![
            entry(1, Some("2024-01-05")),
            entry(2, Some("2022")),
            entry(3, Some("2024")),
        ];
        let once = filter_by_year(entries, 2024);
        let twice = filter_by_year(once.clone(), 2024);
        assert_eq!(once, twice);
    }
}
