use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::{AdapterError, Result};
use crate::traits::ConnectTarget;

const HOST_KEYS: &[&str] = &["hostname", "host"];
const USER_KEYS: &[&str] = &["username", "user"];
const PASSWORD_KEYS: &[&str] = &["password", "passwd", "pw"];
const DATABASE_KEYS: &[&str] = &["database", "dbname", "db"];

/// Flat key/value connection settings.
///
/// Several spellings are accepted per setting; within a group the first
/// key listed in [`ConnectionParameters::target`] wins.
///
/// # Example
/// ```
/// use sqladapter::types::ConnectionParameters;
///
/// let params = ConnectionParameters::new()
///     .set("host", "db1")
///     .set("user", "u")
///     .set("password", "p")
///     .set("database", "orders");
/// let target = params.target().unwrap();
/// assert_eq!(target.dsn(), "db1:orders");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionParameters {
    values: BTreeMap<String, String>,
}

/// Accepts string, numeric and boolean values when deserializing.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawParameter {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl RawParameter {
    fn into_string(self) -> String {
        match self {
            RawParameter::Text(s) => s,
            RawParameter::Integer(i) => i.to_string(),
            RawParameter::Float(f) => f.to_string(),
            RawParameter::Bool(b) => b.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ConnectionParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawParameter>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|(k, v)| (k, v.into_string())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConnectionParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConnectionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value for the same key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First value present among `names`, in the order given.
    fn find(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.get(name)).map(str::to_string)
    }

    /// Resolves aliases into the settings handed to the native open call.
    ///
    /// Groups, first match wins:
    /// - host: `hostname`, `host`
    /// - user: `username`, `user`
    /// - password: `password`, `passwd`, `pw`
    /// - database: `database`, `dbname`, `db`
    ///
    /// `port` must parse as a u16.
    pub fn target(&self) -> Result<ConnectTarget> {
        let port = match self.get("port") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| {
                AdapterError::Usage(format!("port must be a number between 0 and 65535, got '{}'", raw))
            })?),
            None => None,
        };

        Ok(ConnectTarget {
            host: self.find(HOST_KEYS),
            database: self.find(DATABASE_KEYS),
            user: self.find(USER_KEYS),
            password: self.find(PASSWORD_KEYS),
            port,
            socket: self.find(&["socket"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[("host", "a")], Some("a"))]
    #[case(&[("hostname", "a"), ("host", "b")], Some("a"))]
    #[case(&[("user", "x")], None)]
    fn test_host_aliases(#[case] pairs: &[(&str, &str)], #[case] expected: Option<&str>) {
        let params: ConnectionParameters = pairs.iter().copied().collect();
        assert_eq!(params.target().unwrap().host.as_deref(), expected);
    }

    #[rstest]
    #[case(&[("pw", "c")], "c")]
    #[case(&[("passwd", "b"), ("pw", "c")], "b")]
    #[case(&[("password", "a"), ("passwd", "b"), ("pw", "c")], "a")]
    fn test_password_aliases(#[case] pairs: &[(&str, &str)], #[case] expected: &str) {
        let params: ConnectionParameters = pairs.iter().copied().collect();
        assert_eq!(params.target().unwrap().password.as_deref(), Some(expected));
    }

    #[rstest]
    #[case(&[("db", "c")], "c")]
    #[case(&[("dbname", "b"), ("db", "c")], "b")]
    #[case(&[("database", "a"), ("dbname", "b")], "a")]
    fn test_database_aliases(#[case] pairs: &[(&str, &str)], #[case] expected: &str) {
        let params: ConnectionParameters = pairs.iter().copied().collect();
        assert_eq!(params.target().unwrap().database.as_deref(), Some(expected));
    }

    #[rstest]
    fn test_username_wins_over_user() {
        let params = ConnectionParameters::new()
            .set("user", "second")
            .set("username", "first");
        assert_eq!(params.target().unwrap().user.as_deref(), Some("first"));
    }

    #[rstest]
    fn test_port_and_socket() {
        let params = ConnectionParameters::new()
            .set("port", "3050")
            .set("socket", "/tmp/fb.sock");
        let target = params.target().unwrap();
        assert_eq!(target.port, Some(3050));
        assert_eq!(target.socket.as_deref(), Some("/tmp/fb.sock"));
    }

    #[rstest]
    fn test_invalid_port_is_usage_error() {
        let params = ConnectionParameters::new().set("port", "fb");
        match params.target().unwrap_err() {
            AdapterError::Usage(message) => assert!(message.contains("'fb'")),
            other => panic!("Expected Usage error, got {:?}", other),
        }
    }

    #[rstest]
    fn test_deserialize_mixed_values() {
        let params: ConnectionParameters = serde_json::from_str(
            r#"{"host": "db1", "port": 3050, "user": "u", "pw": "p", "dbname": "orders"}"#,
        )
        .unwrap();
        let target = params.target().unwrap();
        assert_eq!(target.port, Some(3050));
        assert_eq!(target.password.as_deref(), Some("p"));
        assert_eq!(target.dsn(), "db1:orders");
    }
}
