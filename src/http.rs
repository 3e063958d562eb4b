use std::time::Duration;

use anyhow::Context as _;

const USER_AGENT: &str = concat!("anilytics/", env!("CARGO_PKG_VERSION"));

pub fn client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .build()
        .context("build http client")
}

/// Appends path segments to `base`, keeping whatever prefix it already has.
pub fn join_segments(base: &str, segments: &[&str]) -> anyhow::Result<url::Url> {
    let mut url = url::Url::parse(base).with_context(|| format!("parse base url: {base}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("base url must be http/https: {base}");
    }
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| anyhow::anyhow!("base url cannot carry a path: {base}"))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_segments_keeps_base_prefix() {
        let url = join_segments("https://api.example.test/v2/", &["users", "some user", "animelist"])
            .expect("join");
        assert_eq!(
            url.as_str(),
            "https://api.example.test/v2/users/some%20user/animelist"
        );
    }

    #[test]
    fn join_segments_rejects_non_http() {
        assert!(join_segments("ftp://example.test", &["x"]).is_err());
        assert!(join_segments("not a url", &["x"]).is_err());
    }
}
