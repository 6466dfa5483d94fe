#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geofill_core::runtime::PageMessage;
use geofill_core::{
    BridgeError, HttpResponse, HttpTransport, LocaleCatalog, NetError, PageBridge,
    ProfileService, Storage,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};

pub const CHAT_URL: &str = "https://llm.test/v1/chat/completions";

/// Canned responses keyed by URL prefix. Unrouted URLs fail as unavailable.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<(String, HttpResponse)>>,
    requests: Mutex<Vec<String>>,
    posted: Mutex<Vec<Value>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, prefix: &str, status: u16, content_type: &str, body: impl Into<String>) {
        self.routes.lock().unwrap().push((
            prefix.to_string(),
            HttpResponse {
                status,
                content_type: Some(content_type.to_string()),
                body: body.into(),
            },
        ));
    }

    pub fn route_json(&self, prefix: &str, body: Value) {
        self.route(prefix, 200, "application/json; charset=utf-8", body.to_string());
    }

    /// A chat completion whose first choice carries `content`.
    pub fn route_chat(&self, content: &str) {
        self.route_json(
            CHAT_URL,
            json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }),
        );
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn posted(&self) -> Vec<Value> {
        self.posted.lock().unwrap().clone()
    }

    fn respond(&self, url: &str) -> Result<HttpResponse, NetError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| NetError::Unavailable(format!("no route for {url}")))
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, NetError> {
        self.respond(url)
    }

    async fn post_json(
        &self,
        url: &str,
        _bearer: &str,
        body: &Value,
    ) -> Result<HttpResponse, NetError> {
        self.posted.lock().unwrap().push(body.clone());
        self.respond(url)
    }
}

/// Records every message. Scans answer with `scan`; everything else with `{}`.
#[derive(Default)]
pub struct FakeBridge {
    scan: Mutex<Value>,
    sent: Mutex<Vec<PageMessage>>,
}

impl FakeBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scan: Mutex::new(json!({ "fields": [], "pageContext": {} })),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn set_scan(&self, scan: Value) {
        *self.scan.lock().unwrap() = scan;
    }

    pub fn sent(&self) -> Vec<PageMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageBridge for FakeBridge {
    async fn send(&self, message: &PageMessage) -> Result<Value, BridgeError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(match message {
            PageMessage::ScanForm => self.scan.lock().unwrap().clone(),
            _ => json!({ "success": true }),
        })
    }
}

pub fn service_with(
    storage: Storage,
    transport: &Arc<FakeTransport>,
    bridge: &Arc<FakeBridge>,
    seed: u64,
) -> ProfileService<ChaCha8Rng> {
    ProfileService::new(
        LocaleCatalog::builtin(),
        storage,
        transport.clone(),
        bridge.clone(),
        ChaCha8Rng::seed_from_u64(seed),
    )
}

pub fn service(
    transport: &Arc<FakeTransport>,
    bridge: &Arc<FakeBridge>,
) -> ProfileService<ChaCha8Rng> {
    service_with(Storage::in_memory(), transport, bridge, 42)
}

/// Apply settings that route model calls to [`CHAT_URL`].
pub fn enable_ai(service: &mut ProfileService<ChaCha8Rng>) {
    for (key, value) in [
        ("enableAI", "on"),
        ("openaiBaseUrl", "https://llm.test/v1"),
        ("openaiKey", "sk-test"),
    ] {
        service
            .update_setting(key, value)
            .unwrap_or_else(|err| panic!("setting {key}: {err}"));
    }
    service.set_use_ai(true);
    assert!(service.ai_active());
}

pub fn temp_store(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "geofill-it-{}-{name}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}
