use serde_json::{Map, Value};

use super::Repository;
use crate::errors::AemError;
use crate::sync::{SyncRequest, SyncResponse};

/// Divide un path absoluto en (padre, nombre).
pub fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((parent, name)) => (parent, name),
        None => ("/", trimmed),
    }
}

pub struct Node<'a> {
    repository: &'a Repository,
    path: String,
}

impl<'a> Node<'a> {
    pub(super) fn new(repository: &'a Repository, path: String) -> Self {
        Self { repository, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        split_path(&self.path).1
    }

    pub fn parent(&self) -> Node<'a> {
        Node::new(self.repository, split_path(&self.path).0.to_string())
    }

    pub fn child(&self, name: &str) -> Node<'a> {
        Node::new(self.repository, format!("{}/{}", self.path.trim_end_matches('/'), name))
    }

    async fn call(&self, request: SyncRequest) -> Result<SyncResponse, AemError> {
        self.repository.sync().call(self.repository.instance(), request).await
    }

    pub async fn exists(&self) -> Result<bool, AemError> {
        let endpoint = format!("{}.json", self.path);
        let response = self.call(SyncRequest::get(&endpoint)).await?;
        match response.status {
            404 => Ok(false),
            _ => response.ensure_success(self.repository.instance(), &endpoint).map(|_| true),
        }
    }

    /// Propiedades del nodo. `None` si no existe.
    pub async fn properties(&self) -> Result<Option<Map<String, Value>>, AemError> {
        self.tree(0).await
    }

    /// Propiedades con `depth` niveles de hijos anidados.
    pub async fn tree(&self, depth: u32) -> Result<Option<Map<String, Value>>, AemError> {
        let endpoint = format!("{}.{}.json", self.path, depth);
        let response = self.call(SyncRequest::get(&endpoint)).await?;
        if response.status == 404 {
            return Ok(None);
        }
        let instance = self.repository.instance();
        response.ensure_success(instance, &endpoint)?.json(instance, &endpoint).map(Some)
    }

    /// Crea o actualiza el nodo. Un valor `null` borra la propiedad.
    pub async fn save(&self, properties: &Map<String, Value>) -> Result<(), AemError> {
        let mut request = SyncRequest::post(&self.path);
        for (name, value) in properties {
            request = append_property(request, name, value);
        }
        self.post(request).await
    }

    pub async fn save_property(&self, name: &str, value: Value) -> Result<(), AemError> {
        let mut props = Map::new();
        props.insert(name.to_string(), value);
        self.save(&props).await
    }

    /// Copia el nodo `source` sobre este path.
    pub async fn copy_from(&self, source: &str) -> Result<(), AemError> {
        let request = SyncRequest::post(source).param(":operation", "copy")
                                               .param(":dest", &self.path)
                                               .param(":replace", "true");
        self.post(request).await
    }

    pub async fn delete(&self) -> Result<(), AemError> {
        self.post(SyncRequest::post(&self.path).param(":operation", "delete")).await
    }

    async fn post(&self, request: SyncRequest) -> Result<(), AemError> {
        let endpoint = request.endpoint.clone();
        self.call(request)
            .await?
            .ensure_success(self.repository.instance(), &endpoint)
            .map(|_| ())
    }
}

fn append_property(request: SyncRequest, name: &str, value: &Value) -> SyncRequest {
    match value {
        Value::Null => request.param(format!("{name}@Delete"), ""),
        Value::Bool(b) => request.param(name, b.to_string()).param(format!("{name}@TypeHint"), "Boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => request.param(name, n.to_string()).param(format!("{name}@TypeHint"), "Long"),
        Value::Number(n) => request.param(name, n.to_string()).param(format!("{name}@TypeHint"), "Double"),
        Value::String(s) => request.param(name, s),
        Value::Array(items) => {
            let request = items.iter().fold(request, |r, item| {
                                          let text = match item {
                                              Value::String(s) => s.clone(),
                                              other => other.to_string(),
                                          };
                                          r.param(name, text)
                                      });
            request.param(format!("{name}@TypeHint"), "String[]")
        }
        Value::Object(_) => request.param(name, value.to_string()),
    }
}
