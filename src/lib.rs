#![forbid(unsafe_code)]

pub mod build;
pub mod chart;
pub mod cli;
pub mod config;
pub mod date_filter;
pub mod dedupe;
pub mod enrich;
pub mod fetch;
pub mod formats;
pub mod http;
pub mod jsonl;
pub mod logging;
pub mod rate_limit;
pub mod report;
pub mod stats;
