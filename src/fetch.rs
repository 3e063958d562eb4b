use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context as _;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::cli::FetchArgs;
use crate::config::ApiConfig;
use crate::formats::{ListEntry, ListPage};

pub const CLIENT_ID_HEADER: &str = "x-mal-client-id";
pub const LIST_FIELDS: &str = "list_status";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The credential was rejected. Never retried and never downgraded to a
    /// partial result.
    #[error("list API rejected the client credential ({status})")]
    Unauthorized { status: StatusCode },
}

pub async fn run(args: FetchArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    if out_path.exists() && !args.force {
        anyhow::bail!("list output already exists: {}", out_path.display());
    }

    let config = ApiConfig::resolve(&args.api)?;
    let url = animelist_url(&config.list_base_url, &args.user).context("build list url")?;
    let headers = list_headers(config.require_client_id()?)?;
    let client = crate::http::client(config.timeout)?;

    let nsfw = args.nsfw.to_string();
    let params = [("fields", LIST_FIELDS), ("nsfw", nsfw.as_str())];

    tracing::info!(user = %args.user, "fetch: anime list");
    let entries = fetch_all(&client, url.as_str(), &headers, &params)
        .await
        .context("fetch anime list")?;

    crate::jsonl::write_records(&out_path, &entries, args.force).context("write list")?;
    tracing::info!(entries = entries.len(), out = %out_path.display(), "fetch: done");
    Ok(())
}

pub fn animelist_url(list_base_url: &str, user: &str) -> anyhow::Result<url::Url> {
    if user.trim().is_empty() {
        anyhow::bail!("user name must not be empty");
    }
    crate::http::join_segments(list_base_url, &["users", user, "animelist"])
}

pub fn list_headers(client_id: &str) -> anyhow::Result<HeaderMap> {
    let mut value = HeaderValue::from_str(client_id).context("client id is not a valid header value")?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(CLIENT_ID_HEADER), value);
    Ok(headers)
}

/// Walks the paginated list starting at `base_url`.
///
/// `params` go on the first request only; continuation URLs already encode
/// them. A transport failure, a non-success status or an unreadable page stops
/// the walk and returns what was gathered so far. 401/403 is the exception and
/// fails the whole call. A single malformed entry is dropped on its own and
/// the walk goes on.
pub async fn fetch_all(
    client: &reqwest::Client,
    base_url: &str,
    headers: &HeaderMap,
    params: &[(&str, &str)],
) -> Result<Vec<ListEntry>, FetchError> {
    let mut entries = Vec::new();
    let mut visited = HashSet::new();
    let mut next_url = Some(base_url.to_owned());
    let mut first_page = true;

    while let Some(url) = next_url.take() {
        if !visited.insert(url.clone()) {
            tracing::warn!(%url, "list paging points back to a visited page; stopping");
            break;
        }

        let mut request = client.get(&url).headers(headers.clone());
        if first_page {
            request = request.query(params);
            first_page = false;
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%url, ?err, total = entries.len(), "list request failed; keeping partial list");
                break;
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized { status });
        }
        if !status.is_success() {
            tracing::warn!(%url, %status, total = entries.len(), "list page failed; keeping partial list");
            break;
        }

        let page: ListPage = match response.json().await {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(%url, ?err, total = entries.len(), "unreadable list page; keeping partial list");
                break;
            }
        };

        let items = page.data.len();
        entries.extend(page.data.into_iter().filter_map(parse_entry));
        tracing::info!(items, total = entries.len(), "fetched list page");

        next_url = page.paging.next.filter(|next| !next.trim().is_empty());
    }

    Ok(entries)
}

/// Entries that do not fit [`ListEntry`] are logged and skipped one at a time.
fn parse_entry(raw: serde_json::Value) -> Option<ListEntry> {
    let entity_id = raw.pointer("/node/id").and_then(serde_json::Value::as_u64);
    match serde_json::from_value::<ListEntry>(raw) {
        Ok(entry) => Some(entry),
        Err(err) => {
            tracing::warn!(?entity_id, %err, "skipping unreadable list entry");
            None
        }
    }
}
