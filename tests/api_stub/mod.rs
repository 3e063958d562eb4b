#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const CLIENT_ID: &str = "stub-client-id";

#[derive(Debug, Clone)]
pub enum DetailReply {
    Json(Value),
    Status(u16),
    Raw(&'static str),
}

/// Canned responses for the list API (`/v2/...`) and the detail API (`/v4/...`).
#[derive(Debug, Clone)]
pub struct ApiStubConfig {
    pub client_id: String,
    pub pages: Vec<Vec<Value>>,
    /// Page index to HTTP status returned instead of the page.
    pub page_status: HashMap<usize, u16>,
    pub details: HashMap<u64, DetailReply>,
}

impl Default for ApiStubConfig {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID.to_owned(),
            pages: Vec::new(),
            page_status: HashMap::new(),
            details: HashMap::new(),
        }
    }
}

pub struct ApiStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ApiStub {
    pub fn spawn(config: ApiStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start api stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let page_base = format!("{base_url}/v2/page");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                recorded.lock().expect("requests lock").push(url.clone());

                let (path, query) = match url.split_once('?') {
                    Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
                    None => (url.clone(), None),
                };

                let client_id = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("X-MAL-CLIENT-ID"))
                    .map(|h| h.value.as_str().to_owned());

                let (status, body) = if path.starts_with("/v2/") {
                    if client_id.as_deref() != Some(config.client_id.as_str()) {
                        (401, r#"{"error":"invalid_token"}"#.to_owned())
                    } else {
                        list_response(&config, &page_base, &path, query.as_deref())
                    }
                } else if let Some(id) = path.strip_prefix("/v4/anime/") {
                    detail_response(&config, id)
                } else {
                    (404, "not found".to_owned())
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn list_base_url(&self) -> String {
        format!("{}/v2", self.base_url)
    }

    pub fn detail_base_url(&self) -> String {
        format!("{}/v4", self.base_url)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for ApiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn list_response(
    config: &ApiStubConfig,
    page_base: &str,
    path: &str,
    query: Option<&str>,
) -> (u16, String) {
    let page_idx = if path.ends_with("/animelist") {
        let query = query.unwrap_or("");
        if !query.contains("fields=list_status") {
            return (400, "first page must request list_status".to_owned());
        }
        0
    } else if let Some(idx) = path.strip_prefix("/v2/page/") {
        if query.is_some() {
            return (400, "continuation urls must not carry extra params".to_owned());
        }
        match idx.parse::<usize>() {
            Ok(idx) => idx,
            Err(_) => return (404, "not found".to_owned()),
        }
    } else {
        return (404, "not found".to_owned());
    };

    if let Some(status) = config.page_status.get(&page_idx) {
        return (*status, r#"{"error":"stub failure"}"#.to_owned());
    }
    let Some(data) = config.pages.get(page_idx) else {
        return (404, "not found".to_owned());
    };

    let mut paging = serde_json::Map::new();
    if page_idx + 1 < config.pages.len() {
        paging.insert(
            "next".to_owned(),
            Value::String(format!("{page_base}/{}", page_idx + 1)),
        );
    }
    let body = serde_json::json!({ "data": data, "paging": paging });
    (200, body.to_string())
}

fn detail_response(config: &ApiStubConfig, id: &str) -> (u16, String) {
    let Ok(id) = id.parse::<u64>() else {
        return (404, "not found".to_owned());
    };
    match config.details.get(&id) {
        Some(DetailReply::Json(value)) => (200, value.to_string()),
        Some(DetailReply::Status(status)) => (*status, r#"{"error":"stub failure"}"#.to_owned()),
        Some(DetailReply::Raw(raw)) => (200, (*raw).to_owned()),
        None => (404, r#"{"status":404,"message":"Resource does not exist"}"#.to_owned()),
    }
}

pub fn list_entry(
    id: u64,
    status: &str,
    score: Option<u8>,
    start_date: Option<&str>,
    episodes: Option<u32>,
) -> Value {
    let mut list_status = serde_json::Map::new();
    list_status.insert("status".to_owned(), Value::from(status));
    if let Some(score) = score {
        list_status.insert("score".to_owned(), Value::from(score));
    }
    if let Some(start_date) = start_date {
        list_status.insert("start_date".to_owned(), Value::from(start_date));
    }
    if let Some(episodes) = episodes {
        list_status.insert("num_episodes_watched".to_owned(), Value::from(episodes));
    }
    list_status.insert("is_rewatching".to_owned(), Value::Bool(false));

    serde_json::json!({
        "node": { "id": id, "title": format!("list title {id}"), "main_picture": {} },
        "list_status": list_status,
    })
}

pub fn detail(title: &str, genres: &[&str], studio: Option<&str>, popularity: Option<u32>) -> DetailReply {
    let named = |names: &[&str]| {
        names
            .iter()
            .map(|name| serde_json::json!({ "mal_id": 1, "type": "anime", "name": name }))
            .collect::<Vec<_>>()
    };
    let studios = studio.map(|s| vec![s]).unwrap_or_default();

    DetailReply::Json(serde_json::json!({
        "data": {
            "mal_id": 1,
            "title": title,
            "score": 8.5,
            "genres": named(genres),
            "themes": named(&["School"]),
            "demographics": named(&["Shounen"]),
            "studios": named(&studios),
            "rank": popularity.map(|p| p * 2),
            "popularity": popularity,
            "episodes": 12,
        }
    }))
}
