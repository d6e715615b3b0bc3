//! Decoded proxy messages and typed field access.
//!
//! A [`Message`] is a JSON object. Three top-level keys are reserved by the
//! proxy protocol: `@type` names the message kind, `@extra` carries the
//! correlation token echoed back by the proxy, and `@client_id` identifies the
//! session an inbound message belongs to.
//!
//! Nested fields are addressed with dotted paths such as `"user.status.kind"`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

use crate::token::CorrelationToken;

/// Reserved key naming the message kind.
pub const TYPE_FIELD: &str = "@type";
/// Reserved key carrying the correlation token.
pub const EXTRA_FIELD: &str = "@extra";
/// Reserved key carrying the session identity on inbound messages.
pub const CLIENT_ID_FIELD: &str = "@client_id";

/// Kind of the generic success reply.
const OK_KIND: &str = "ok";

/// Session identity assigned by the proxy to one logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(u32);

impl ClientId {
    /// Wraps a raw session identity.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw session identity.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

impl From<u32> for ClientId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Errors raised while resolving a dotted field path.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A path segment does not exist.
    #[error("key doesn't exist: {key}")]
    MissingKey {
        /// The missing segment.
        key: String,
    },
    /// An intermediate segment holds something other than an object.
    #[error("key value is not an object: {key}")]
    NotAnObject {
        /// The segment that could not be descended into.
        key: String,
    },
    /// The final value does not have the requested type.
    #[error("key value is not of required type: {path}: {source}")]
    WrongType {
        /// The full path that was requested.
        path: String,
        /// Conversion failure reported by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
}

/// A decoded JSON object exchanged with the proxy.
///
/// Inbound messages are shared with handlers behind an `Arc` and are never
/// mutated after decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    /// Builds a message from an existing JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds a message holding only a `@type` field.
    #[must_use]
    pub fn kind(kind: impl Into<String>) -> Self {
        Self::default().with(TYPE_FIELD, kind.into())
    }

    /// Builds a message from `fields`, forcing its `@type` to `kind`.
    #[must_use]
    pub fn with_kind(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self(fields).with(TYPE_FIELD, kind.into())
    }

    /// Decodes a message from a UTF-8 JSON payload.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the payload is not a JSON object.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Decodes a message from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the text is not a JSON object.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes the message as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialisation fails.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }

    /// Sets `field` to `value` and returns the message. `null` values are
    /// ignored and leave the message unchanged.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets `field` to `value` in place. `null` values are ignored.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let converted = value.into();
        if !converted.is_null() {
            self.0.insert(field.into(), converted);
        }
    }

    /// Attaches a correlation token as `@extra`.
    pub fn set_extra(&mut self, token: &CorrelationToken) {
        self.0
            .insert(EXTRA_FIELD.to_owned(), Value::from(token.as_str()));
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the message and returns the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// The `@type` of the message.
    #[must_use]
    pub fn message_kind(&self) -> Option<&str> {
        self.string(TYPE_FIELD)
    }

    /// Whether the message's `@type` equals `kind`.
    #[must_use]
    pub fn is_kind(&self, kind: &str) -> bool {
        self.message_kind() == Some(kind)
    }

    /// Whether the message is the proxy's generic `ok` reply.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.is_kind(OK_KIND)
    }

    /// The correlation token echoed by the proxy, if any.
    #[must_use]
    pub fn extra(&self) -> Option<&str> {
        self.string(EXTRA_FIELD)
    }

    /// The session identity the proxy stamped on the message, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<ClientId> {
        self.0
            .get(CLIENT_ID_FIELD)
            .and_then(Value::as_u64)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(ClientId::new)
    }

    /// Resolves a dotted path to the raw JSON value it names.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::MissingKey`] when a segment is absent and
    /// [`FieldError::NotAnObject`] when an intermediate segment is not an
    /// object.
    pub fn lookup(&self, path: &str) -> Result<&Value, FieldError> {
        let mut current = &self.0;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let value = current.get(segment).ok_or_else(|| FieldError::MissingKey {
                key: segment.to_owned(),
            })?;
            if segments.peek().is_none() {
                return Ok(value);
            }
            current = value.as_object().ok_or_else(|| FieldError::NotAnObject {
                key: segment.to_owned(),
            })?;
        }
        Err(FieldError::MissingKey {
            key: path.to_owned(),
        })
    }

    /// Resolves a dotted path and converts the value to `T`.
    ///
    /// # Errors
    ///
    /// Propagates [`Message::lookup`] failures and returns
    /// [`FieldError::WrongType`] when the value cannot be converted.
    pub fn field<'de, T>(&'de self, path: &str) -> Result<T, FieldError>
    where
        T: Deserialize<'de>,
    {
        let value = self.lookup(path)?;
        T::deserialize(value).map_err(|source| FieldError::WrongType {
            path: path.to_owned(),
            source,
        })
    }

    /// String at `path`, if present and a string.
    #[must_use]
    pub fn string(&self, path: &str) -> Option<&str> {
        self.lookup(path).ok().and_then(Value::as_str)
    }

    /// Number at `path` as `f64`, if present and numeric.
    #[must_use]
    pub fn number(&self, path: &str) -> Option<f64> {
        self.lookup(path).ok().and_then(Value::as_f64)
    }

    /// Integer at `path`, if present and representable as `i64`.
    #[must_use]
    pub fn integer(&self, path: &str) -> Option<i64> {
        self.lookup(path).ok().and_then(Value::as_i64)
    }

    /// Boolean at `path`, if present and boolean.
    #[must_use]
    pub fn boolean(&self, path: &str) -> Option<bool> {
        self.lookup(path).ok().and_then(Value::as_bool)
    }

    /// Array at `path`, if present and an array.
    #[must_use]
    pub fn array(&self, path: &str) -> Option<&[Value]> {
        self.lookup(path)
            .ok()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// Object at `path`, copied into its own message.
    #[must_use]
    pub fn object(&self, path: &str) -> Option<Self> {
        self.lookup(path)
            .ok()
            .and_then(Value::as_object)
            .map(|fields| Self(fields.clone()))
    }

    /// Unix timestamp (seconds) at `path` converted to a UTC date-time.
    #[must_use]
    pub fn timestamp(&self, path: &str) -> Option<OffsetDateTime> {
        self.integer(path)
            .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
    }
}

impl From<Map<String, Value>> for Message {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
