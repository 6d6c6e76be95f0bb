//! Connection identity and diagnostic context
//!
//! A [`ConnectionKey`] says *which* endpoint an operation talked to; a
//! [`ConnectionContext`] carries per-connection diagnostics (TLS state,
//! endpoint version, arbitrary key/value pairs) that loggers attach to
//! events. Contexts are owned by the connection, so loggers that keep a
//! record beyond the call use [`ConnectionContext::clone_box`] to copy it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONTEXT_KEY_ENDPOINT_VERSION, CONTEXT_KEY_IS_SSL, CONTEXT_KEY_SSL_SESSION_REUSED,
};

/// Identity of a physical connection endpoint
///
/// Two keys are equal only when host, port, database, user, password,
/// special tag and socket path all match. The password never appears in
/// `Debug`, `Display` or serialized output.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub special_tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unix_socket_path: String,
}

impl ConnectionKey {
    /// Create a TCP connection key
    pub fn new(
        host: impl Into<String>,
        port: u16,
        db_name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            db_name: db_name.into(),
            user: user.into(),
            password: password.into(),
            special_tag: String::new(),
            unix_socket_path: String::new(),
        }
    }

    /// Tag used to keep otherwise identical keys apart (e.g. per-tenant pools)
    pub fn with_special_tag(mut self, tag: impl Into<String>) -> Self {
        self.special_tag = tag.into();
        self
    }

    /// Connect through a unix socket instead of TCP
    pub fn with_unix_socket_path(mut self, path: impl Into<String>) -> Self {
        self.unix_socket_path = path.into();
        self
    }

    /// Password used to authenticate
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Equality ignoring the database name
    ///
    /// Used to decide whether a connection can be reused for another
    /// database on the same server.
    pub fn partial_eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.user == other.user
            && self.password == other.password
            && self.special_tag == other.special_tag
            && self.unix_socket_path == other.unix_socket_path
    }

    /// Human-readable form for logs: `user@host:port/db`
    pub fn display_string(&self) -> String {
        let endpoint = if self.unix_socket_path.is_empty() {
            format!("{}:{}", self.host, self.port)
        } else {
            self.unix_socket_path.clone()
        };
        if self.special_tag.is_empty() {
            format!("{}@{}/{}", self.user, endpoint, self.db_name)
        } else {
            format!("{}@{}/{} [{}]", self.user, endpoint, self.db_name, self.special_tag)
        }
    }
}

impl fmt::Debug for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionKey")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_name", &self.db_name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("special_tag", &self.special_tag)
            .field("unix_socket_path", &self.unix_socket_path)
            .finish()
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// Per-connection diagnostic values attached to logged events
pub trait ConnectionContext: Send + Sync + fmt::Debug {
    /// Visit every string-valued diagnostic
    fn collect_normal_values(&self, add: &mut dyn FnMut(&str, &str));

    /// Visit every integer-valued diagnostic
    fn collect_int_values(&self, _add: &mut dyn FnMut(&str, i64)) {}

    /// Look up one string-valued diagnostic without visiting the rest
    fn normal_value(&self, key: &str) -> Option<String>;

    /// Whether the connection is TLS-protected
    fn is_ssl_connection(&self) -> bool;

    /// Whether the TLS handshake resumed a cached session
    fn ssl_session_reused(&self) -> bool;

    /// Version string reported by the endpoint, empty when unknown
    fn endpoint_version(&self) -> &str;

    /// Copy this context so it can outlive the connection that owns it
    fn clone_box(&self) -> Box<dyn ConnectionContext>;
}

impl Clone for Box<dyn ConnectionContext> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Default connection context
///
/// Reports `is_ssl`, `is_ssl_session_reused` and, when known,
/// `endpoint_version`, followed by any extra values supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicConnectionContext {
    pub is_ssl_connection: bool,
    pub ssl_session_reused: bool,
    pub endpoint_version: String,
    extra_values: BTreeMap<String, String>,
    int_values: BTreeMap<String, i64>,
}

impl BasicConnectionContext {
    /// Empty context: plaintext, no session reuse, unknown version
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the connection as TLS-protected
    pub fn with_ssl(mut self, session_reused: bool) -> Self {
        self.is_ssl_connection = true;
        self.ssl_session_reused = session_reused;
        self
    }

    /// Record the endpoint's version string
    pub fn with_endpoint_version(mut self, version: impl Into<String>) -> Self {
        self.endpoint_version = version.into();
        self
    }

    /// Add a string-valued diagnostic
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_values.insert(key.into(), value.into());
        self
    }

    /// Add an integer-valued diagnostic
    pub fn with_int_value(mut self, key: impl Into<String>, value: i64) -> Self {
        self.int_values.insert(key.into(), value);
        self
    }
}

impl ConnectionContext for BasicConnectionContext {
    fn collect_normal_values(&self, add: &mut dyn FnMut(&str, &str)) {
        add(CONTEXT_KEY_IS_SSL, bool_str(self.is_ssl_connection));
        add(CONTEXT_KEY_SSL_SESSION_REUSED, bool_str(self.ssl_session_reused));
        if !self.endpoint_version.is_empty() {
            add(CONTEXT_KEY_ENDPOINT_VERSION, &self.endpoint_version);
        }
        for (key, value) in &self.extra_values {
            add(key, value);
        }
    }

    fn collect_int_values(&self, add: &mut dyn FnMut(&str, i64)) {
        for (key, value) in &self.int_values {
            add(key, *value);
        }
    }

    fn normal_value(&self, key: &str) -> Option<String> {
        match key {
            CONTEXT_KEY_IS_SSL => Some(bool_str(self.is_ssl_connection).to_string()),
            CONTEXT_KEY_SSL_SESSION_REUSED => Some(bool_str(self.ssl_session_reused).to_string()),
            CONTEXT_KEY_ENDPOINT_VERSION if !self.endpoint_version.is_empty() => {
                Some(self.endpoint_version.clone())
            }
            _ => self.extra_values.get(key).cloned(),
        }
    }

    fn is_ssl_connection(&self) -> bool {
        self.is_ssl_connection
    }

    fn ssl_session_reused(&self) -> bool {
        self.ssl_session_reused
    }

    fn endpoint_version(&self) -> &str {
        &self.endpoint_version
    }

    fn clone_box(&self) -> Box<dyn ConnectionContext> {
        Box::new(self.clone())
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Borrowed connection information handed to loggers with each event
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionInfo<'a> {
    pub key: Option<&'a ConnectionKey>,
    pub context: Option<&'a dyn ConnectionContext>,
}

impl<'a> ConnectionInfo<'a> {
    /// Information for a known endpoint with an optional context
    pub fn new(key: &'a ConnectionKey, context: Option<&'a dyn ConnectionContext>) -> Self {
        Self { key: Some(key), context }
    }

    /// No connection information at all
    pub const fn empty() -> Self {
        Self { key: None, context: None }
    }

    /// Whether the connection resumed a cached TLS session
    pub fn ssl_session_reused(&self) -> bool {
        self.context.is_some_and(|ctx| ctx.ssl_session_reused())
    }

    /// Display form of the endpoint, `"<unknown>"` when absent
    pub fn endpoint(&self) -> String {
        self.key.map_or_else(|| "<unknown>".to_string(), ConnectionKey::display_string)
    }
}

/// Owned copy of connection information, detached from the connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ConnectionKey>,
    pub is_ssl_connection: bool,
    pub ssl_session_reused: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint_version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub normal_values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub int_values: BTreeMap<String, i64>,
}

impl ConnectionSnapshot {
    /// Copy everything the borrowed information exposes
    pub fn capture(info: &ConnectionInfo<'_>) -> Self {
        let mut snapshot = Self { key: info.key.cloned(), ..Self::default() };
        if let Some(context) = info.context {
            snapshot.is_ssl_connection = context.is_ssl_connection();
            snapshot.ssl_session_reused = context.ssl_session_reused();
            snapshot.endpoint_version = context.endpoint_version().to_string();
            context.collect_normal_values(&mut |key, value| {
                snapshot.normal_values.insert(key.to_string(), value.to_string());
            });
            context.collect_int_values(&mut |key, value| {
                snapshot.int_values.insert(key.to_string(), value);
            });
        }
        snapshot
    }
}
