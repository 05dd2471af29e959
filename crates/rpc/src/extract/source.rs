//! The transport-supplied places a query parameter can come from.

use crate::error::RpcError;
use crate::router::segment_hash;
use serde::Deserialize;
use serde_json::Value;

/// One kind of parameter source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// the URL query string
    Query,
    /// an `application/x-www-form-urlencoded` body
    Form,
    /// a JSON object body
    Json,
}

/// A raw, not yet typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Text(&'a str),
    Json(&'a Value),
}

#[derive(Debug, Default)]
struct Pairs {
    entries: Vec<(u64, String, String)>,
}

impl Pairs {
    fn decode(kind: &str, input: &[u8]) -> Result<Self, RpcError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(input)
            .map_err(|e| RpcError::invalid_state(format!("malformed {kind}: {e}")))?;
        let entries = pairs.into_iter().map(|(name, value)| (segment_hash(&name), name, value)).collect();
        Ok(Self { entries })
    }

    fn get(&self, hash: u64, name: &str) -> Option<&str> {
        self.entries.iter().find(|(h, n, _)| *h == hash && n == name).map(|(_, _, v)| v.as_str())
    }
}

/// Decoded query string, form body and JSON body of one request.
#[derive(Debug, Default)]
pub struct QuerySources {
    query: Option<Pairs>,
    form: Option<Pairs>,
    json: Option<serde_json::Map<String, Value>>,
}

impl QuerySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a URL query string (without the leading `?`).
    pub fn with_query(mut self, query: &str) -> Result<Self, RpcError> {
        self.query = Some(Pairs::decode("query string", query.as_bytes())?);
        Ok(self)
    }

    pub fn with_form(mut self, body: &[u8]) -> Result<Self, RpcError> {
        self.form = Some(Pairs::decode("form body", body)?);
        Ok(self)
    }

    /// Accepts a JSON object body; any other JSON value is rejected.
    pub fn with_json(mut self, body: Value) -> Result<Self, RpcError> {
        match body {
            Value::Object(map) => {
                self.json = Some(map);
                Ok(self)
            }
            other => Err(RpcError::invalid_state(format!("json body must be an object, got {other}"))),
        }
    }

    pub fn is_present(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Query => self.query.is_some(),
            SourceKind::Form => self.form.is_some(),
            SourceKind::Json => self.json.is_some(),
        }
    }

    /// Looks `name` up in a single source. A JSON `null` counts as absent.
    pub fn get(&self, kind: SourceKind, hash: u64, name: &str) -> Option<RawValue<'_>> {
        match kind {
            SourceKind::Query => self.query.as_ref()?.get(hash, name).map(RawValue::Text),
            SourceKind::Form => self.form.as_ref()?.get(hash, name).map(RawValue::Text),
            SourceKind::Json => self.json.as_ref()?.get(name).filter(|v| !v.is_null()).map(RawValue::Json),
        }
    }

    /// The first source in `order` that supplies `name` wins.
    pub fn lookup(&self, order: &[SourceKind], hash: u64, name: &str) -> Option<(SourceKind, RawValue<'_>)> {
        order.iter().find_map(|kind| self.get(*kind, hash, name).map(|raw| (*kind, raw)))
    }
}
