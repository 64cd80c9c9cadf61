//! The in-flight message.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Header mapping, keyed case-preserving as received.
pub type Headers = HashMap<String, String>;

/// One message's journey through the bus.
///
/// Inbound facts are fixed at construction. Mediators share derived data via
/// `properties` and shape the eventual reply through the outbound fields.
/// A context is owned by exactly one sequence run and handed to each mediator
/// as `&mut`, so mediators never observe each other concurrently.
#[derive(Debug, Clone)]
pub struct MessageContext {
    id: Uuid,
    received_at: DateTime<Utc>,

    method: String,
    path: String,
    headers: Headers,
    body: Vec<u8>,

    properties: HashMap<String, serde_json::Value>,

    response_status: u16,
    response_headers: Headers,
    response_body: Vec<u8>,
}

impl MessageContext {
    /// Creates a context from an inbound request.
    ///
    /// `path` includes the query string. Outbound fields start as
    /// status 200 with no headers and an empty body.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        headers: Headers,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            method: method.into(),
            path: path.into(),
            headers,
            body: body.into(),
            properties: HashMap::new(),
            response_status: 200,
            response_headers: Headers::new(),
            response_body: Vec::new(),
        }
    }

    /// Unique identifier of this message, used to correlate log lines.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// When the message entered the bus.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// The inbound request method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The inbound path, including the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The inbound headers as received.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Looks up an inbound header, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The inbound body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The inbound body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The scratch-pad shared by mediators within this run.
    #[must_use]
    pub const fn properties(&self) -> &HashMap<String, serde_json::Value> {
        &self.properties
    }

    /// Gets a property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Sets a property, returning the previous value.
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.properties.insert(key.into(), value)
    }

    /// Removes a property.
    pub fn remove_property(&mut self, key: &str) -> Option<serde_json::Value> {
        self.properties.remove(key)
    }

    /// The outbound status.
    #[must_use]
    pub const fn response_status(&self) -> u16 {
        self.response_status
    }

    /// The outbound headers.
    #[must_use]
    pub const fn response_headers(&self) -> &Headers {
        &self.response_headers
    }

    /// Looks up an outbound header, ignoring ASCII case.
    #[must_use]
    pub fn response_header(&self, name: &str) -> Option<&str> {
        find_header(&self.response_headers, name)
    }

    /// The outbound body.
    #[must_use]
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// Overwrites all three outbound fields.
    ///
    /// `None` headers leave the outbound headers empty. There is no
    /// status-only update: callers that want to keep the current body or
    /// headers read them first and pass them back in.
    pub fn set_response(
        &mut self,
        status: u16,
        body: impl Into<Vec<u8>>,
        headers: Option<Headers>,
    ) {
        self.response_status = status;
        self.response_body = body.into();
        self.response_headers = headers.unwrap_or_default();
    }

    /// Consumes the context, yielding the outbound status, headers and body.
    #[must_use]
    pub fn into_response(self) -> (u16, Headers, Vec<u8>) {
        (self.response_status, self.response_headers, self.response_body)
    }
}

fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
