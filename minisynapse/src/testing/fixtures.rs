//! Test fixtures for sequence testing.

use crate::context::{Headers, MessageContext};
use std::path::{Path, PathBuf};

/// Builder for inbound message contexts.
#[derive(Debug, Clone)]
pub struct MessageContextBuilder {
    /// HTTP method.
    pub method: String,
    /// Path including the query string.
    pub path: String,
    /// Inbound headers.
    pub headers: Headers,
    /// Inbound body.
    pub body: Vec<u8>,
    /// Properties set before the run starts.
    pub properties: Vec<(String, serde_json::Value)>,
}

impl Default for MessageContextBuilder {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            headers: Headers::new(),
            body: Vec::new(),
            properties: Vec::new(),
        }
    }
}

impl MessageContextBuilder {
    /// Creates a builder for `GET /` with no headers or body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.push((key.into(), value));
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> MessageContext {
        let mut ctx = MessageContext::new(self.method, self.path, self.headers, self.body);
        for (key, value) in self.properties {
            ctx.set_property(key, value);
        }
        ctx
    }
}

/// Writes a definition file into `dir` and returns its path.
pub fn write_definition(dir: &Path, file_name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, contents)?;
    Ok(path)
}
