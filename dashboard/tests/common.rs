//! Shared test environment for dashboard API tests
//!
//! Builds a `DashboardManager` over an in-memory `MockChain` with a
//! temporary data directory and a settable clock.

#![allow(dead_code)]

use std::sync::Arc;

use ajo_piggybank::{Address, Config, FixedClock, MockChain};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use dashboard::api::server::build_router;
use dashboard::manager::DashboardManager;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const NOW: i64 = 1_700_000_000;
pub const UNLOCK: u64 = 1_700_000_000 + 3 * 86_400;

pub fn contract_address() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn owner() -> Address {
    Address::repeat_byte(0x0a)
}

pub fn user() -> Address {
    Address::repeat_byte(0x11)
}

/// Test environment with automatic cleanup
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub chain: MockChain,
    pub clock: FixedClock,
    pub manager: Arc<DashboardManager<MockChain>>,
    pub router: Router,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_contract(Some(&contract_address().to_string()))
    }

    pub fn with_contract(contract: Option<&str>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let temp_dir = TempDir::new().expect("temp dir");
        let data_dir = temp_dir.path().to_string_lossy().to_string();
        let contract = contract.map(str::to_string);
        let config = Config::from_lookup(|key: &str| match key {
            "REOWN_PROJECT_ID" => Some("test-project".to_string()),
            "PIGGYBANK_ADDRESS" => contract.clone(),
            "DATA_DIR" => Some(data_dir.clone()),
            _ => None,
        })
        .expect("config");

        let chain = MockChain::new(contract_address(), owner(), UNLOCK);
        chain.set_block_timestamp(NOW as u64);
        let clock = FixedClock::new(NOW);
        let manager = Arc::new(DashboardManager::new(
            config,
            Arc::new(chain.clone()),
            Arc::new(clock.clone()),
        ));
        let router = build_router(manager.clone());

        Self {
            temp_dir,
            chain,
            clock,
            manager,
            router,
        }
    }

    /// Send one request and decode the JSON body.
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn connect(&self, address: Address) -> (StatusCode, Value) {
        self.request(
            "POST",
            "/api/session/connect",
            Some(serde_json::json!({ "address": address.to_string() })),
        )
        .await
    }
}
