//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request};
use serde_json::{json, Value};

use platform_kernel::modules::{Module, ModuleCatalog, ModuleError, ModuleHealth};

/// What a scripted module does at each lifecycle step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Step {
    #[default]
    Succeed,
    Fail,
    Panic,
    Hang,
}

/// Shared record of lifecycle calls, in order.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, suffix: &str) -> usize {
        self.events().iter().filter(|e| e.ends_with(suffix)).count()
    }
}

/// A module whose initialize/destroy behavior is set per test.
pub struct ScriptedModule {
    name: String,
    init: Step,
    destroy: Step,
    log: EventLog,
}

async fn perform(step: Step, what: &str) -> Result<(), ModuleError> {
    match step {
        Step::Succeed => Ok(()),
        Step::Fail if what == "destroy" => Err(ModuleError::Destroy("destroy failed on purpose".into())),
        Step::Fail => Err(ModuleError::Initialization(format!("{what} failed on purpose"))),
        Step::Panic => panic!("{what} panicked on purpose"),
        Step::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
}

#[async_trait]
impl Module for ScriptedModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ModuleError> {
        self.log.push(format!("{}:initialize", self.name));
        perform(self.init, "initialize").await
    }

    async fn destroy(&self) -> Result<(), ModuleError> {
        self.log.push(format!("{}:destroy", self.name));
        perform(self.destroy, "destroy").await
    }

    fn status(&self) -> Value {
        json!({ "name": self.name, "scripted": true })
    }

    fn health(&self) -> ModuleHealth {
        ModuleHealth::healthy(json!({ "name": self.name }))
    }
}

/// Builds catalogs of scripted modules sharing one event log.
#[derive(Default)]
pub struct CatalogBuilder {
    catalog: ModuleCatalog,
    pub log: EventLog,
    constructions: Arc<AtomicUsize>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, name: &str, init: Step, destroy: Step) -> Self {
        let log = self.log.clone();
        let constructions = self.constructions.clone();
        let owned = name.to_string();
        self.catalog.register(name, move |_ctx| {
            constructions.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedModule {
                name: owned.clone(),
                init,
                destroy,
                log: log.clone(),
            }) as Arc<dyn Module>)
        });
        self
    }

    pub fn ok(self, name: &str) -> Self {
        self.module(name, Step::Succeed, Step::Succeed)
    }

    pub fn failing_constructor(mut self, name: &str) -> Self {
        self.catalog.register(name, |_ctx| {
            Err(ModuleError::Construction("constructor rejected settings".into()))
        });
        self
    }

    pub fn panicking_constructor(mut self, name: &str) -> Self {
        self.catalog.register(name, |_ctx| -> Result<Arc<dyn Module>, ModuleError> {
            panic!("constructor exploded")
        });
        self
    }

    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn build(self) -> (ModuleCatalog, EventLog) {
        (self.catalog, self.log)
    }
}

/// A request as the server would see it, with the peer address attached.
pub fn request(method: Method, uri: &str, from: SocketAddr) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(from))
}

pub fn get(uri: &str, from: SocketAddr) -> Request<Body> {
    request(Method::GET, uri, from).body(Body::empty()).unwrap()
}

pub fn json_post(uri: &str, from: SocketAddr) -> axum::http::request::Builder {
    request(Method::POST, uri, from).header("content-type", "application/json")
}

pub fn client(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([192, 168, 1, last_octet], 40_000))
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
