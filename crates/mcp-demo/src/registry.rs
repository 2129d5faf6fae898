//! Capability registration and lookup.
//!
//! One insertion-ordered map per kind. Registration happens once at startup;
//! afterwards the registry is only read, so it can be shared behind an `Arc`
//! without locking.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::handler::CapabilityHandler;
use crate::schema::Schema;
use crate::types::{CapabilityError, CapabilityKind, CapabilityResult};

/// Where a resource lives and what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    pub uri: String,
    pub mime_type: Option<String>,
}

/// A registered capability.
pub struct CapabilityEntry {
    kind: CapabilityKind,
    name: String,
    description: String,
    schema: Option<Schema>,
    locator: Option<ResourceLocator>,
    handler: Arc<dyn CapabilityHandler>,
}

impl CapabilityEntry {
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Resource location; `None` for tools and prompts.
    pub fn locator(&self) -> Option<&ResourceLocator> {
        self.locator.as_ref()
    }

    /// Shared handle to the handler, cheap to move into a task.
    pub fn handler(&self) -> Arc<dyn CapabilityHandler> {
        self.handler.clone()
    }
}

impl std::fmt::Debug for CapabilityEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityEntry")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

/// Registry of tools, resources, and prompts.
#[derive(Default)]
pub struct CapabilityRegistry {
    tools: IndexMap<String, CapabilityEntry>,
    resources: IndexMap<String, CapabilityEntry>,
    prompts: IndexMap<String, CapabilityEntry>,
    resource_uris: HashMap<String, String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under `name`.
    ///
    /// Resources registered this way are addressed by their name; use
    /// [`register_resource`](Self::register_resource) to give them a URI.
    pub fn register<H>(
        &mut self,
        kind: CapabilityKind,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Option<Schema>,
        handler: H,
    ) -> CapabilityResult<()>
    where
        H: CapabilityHandler + 'static,
    {
        let name = name.into();
        let locator = (kind == CapabilityKind::Resource).then(|| ResourceLocator {
            uri: name.clone(),
            mime_type: None,
        });

        self.insert(CapabilityEntry {
            kind,
            name,
            description: description.into(),
            schema,
            locator,
            handler: Arc::new(handler),
        })
    }

    pub fn register_tool<H>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Option<Schema>,
        handler: H,
    ) -> CapabilityResult<()>
    where
        H: CapabilityHandler + 'static,
    {
        self.register(CapabilityKind::Tool, name, description, schema, handler)
    }

    pub fn register_prompt<H>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Option<Schema>,
        handler: H,
    ) -> CapabilityResult<()>
    where
        H: CapabilityHandler + 'static,
    {
        self.register(CapabilityKind::Prompt, name, description, schema, handler)
    }

    /// Register a resource readable at `uri`.
    pub fn register_resource<H>(
        &mut self,
        name: impl Into<String>,
        uri: impl Into<String>,
        description: impl Into<String>,
        mime_type: Option<String>,
        handler: H,
    ) -> CapabilityResult<()>
    where
        H: CapabilityHandler + 'static,
    {
        self.insert(CapabilityEntry {
            kind: CapabilityKind::Resource,
            name: name.into(),
            description: description.into(),
            schema: None,
            locator: Some(ResourceLocator {
                uri: uri.into(),
                mime_type,
            }),
            handler: Arc::new(handler),
        })
    }

    fn insert(&mut self, entry: CapabilityEntry) -> CapabilityResult<()> {
        let kind = entry.kind;
        if self.catalog(kind).contains_key(&entry.name) {
            return Err(CapabilityError::DuplicateName {
                kind,
                name: entry.name,
            });
        }

        if let Some(locator) = &entry.locator {
            if self.resource_uris.contains_key(&locator.uri) {
                return Err(CapabilityError::DuplicateUri(locator.uri.clone()));
            }
            self.resource_uris
                .insert(locator.uri.clone(), entry.name.clone());
        }

        tracing::debug!("Registered {kind} '{}'", entry.name);
        self.catalog_mut(kind).insert(entry.name.clone(), entry);
        Ok(())
    }

    /// `(name, description)` pairs in registration order.
    pub fn list_all(&self, kind: CapabilityKind) -> Vec<(&str, &str)> {
        self.entries(kind)
            .map(|e| (e.name.as_str(), e.description.as_str()))
            .collect()
    }

    /// Full entries in registration order.
    pub fn entries(&self, kind: CapabilityKind) -> impl Iterator<Item = &CapabilityEntry> {
        self.catalog(kind).values()
    }

    pub fn count(&self, kind: CapabilityKind) -> usize {
        self.catalog(kind).len()
    }

    pub fn resolve(&self, kind: CapabilityKind, name: &str) -> CapabilityResult<&CapabilityEntry> {
        self.catalog(kind)
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Look up a resource by its URI.
    pub fn resolve_uri(&self, uri: &str) -> CapabilityResult<&CapabilityEntry> {
        self.resource_uris
            .get(uri)
            .and_then(|name| self.resources.get(name))
            .ok_or_else(|| CapabilityError::NotFound {
                kind: CapabilityKind::Resource,
                name: uri.to_string(),
            })
    }

    fn catalog(&self, kind: CapabilityKind) -> &IndexMap<String, CapabilityEntry> {
        match kind {
            CapabilityKind::Tool => &self.tools,
            CapabilityKind::Resource => &self.resources,
            CapabilityKind::Prompt => &self.prompts,
        }
    }

    fn catalog_mut(&mut self, kind: CapabilityKind) -> &mut IndexMap<String, CapabilityEntry> {
        match kind {
            CapabilityKind::Tool => &mut self.tools,
            CapabilityKind::Resource => &mut self.resources,
            CapabilityKind::Prompt => &mut self.prompts,
        }
    }
}
