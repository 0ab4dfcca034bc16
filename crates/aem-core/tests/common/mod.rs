#![allow(dead_code)]

use aem_core::{AemError, Instance, InstanceSync, SyncRequest, SyncResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&Instance) -> Result<SyncResponse, AemError> + Send + Sync>;

/// Canal falso con respuestas guionizadas por endpoint; el resto devuelve 404.
#[derive(Default)]
pub struct ScriptedSync {
    handlers: HashMap<String, Handler>,
    pub calls: Mutex<Vec<(String, SyncRequest)>>,
}

impl ScriptedSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, endpoint: &str, f: F) -> Self
        where F: Fn(&Instance) -> Result<SyncResponse, AemError> + Send + Sync + 'static
    {
        self.handlers.insert(endpoint.to_string(), Box::new(f));
        self
    }

    pub fn json(self, endpoint: &str, body: serde_json::Value) -> Self {
        let text = body.to_string();
        self.on(endpoint, move |_| Ok(SyncResponse::new(200, text.clone())))
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, r)| r.endpoint == endpoint).count()
    }
}

#[async_trait]
impl InstanceSync for ScriptedSync {
    async fn call(&self, instance: &Instance, request: SyncRequest) -> Result<SyncResponse, AemError> {
        self.calls.lock().unwrap().push((instance.name.clone(), request.clone()));
        match self.handlers.get(&request.endpoint) {
            Some(h) => h(instance),
            None => Ok(SyncResponse::new(404, "")),
        }
    }
}

pub fn instance(name: &str) -> Instance {
    Instance::new(name, "http://localhost:4502")
}

pub fn stable_console() -> ScriptedSync {
    ScriptedSync::new().json("/system/console/bundles.json",
                              serde_json::json!({ "data": [ { "id": 0, "symbolicName": "org.apache.felix.framework", "state": "Active", "stateRaw": 32 } ] }))
                       .json("/system/console/events.json", serde_json::json!({ "data": [] }))
                       .json("/system/console/components.json",
                             serde_json::json!({ "data": [ { "name": "com.day.crx.packaging.impl.PackagingImpl", "state": "active" } ] }))
}
