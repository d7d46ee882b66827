//! Parameterized statements.
//!
//! A [`Statement`] is an unexecuted handle: SQL text plus bound parameter
//! values. Binding to a live connection happens at execution time, so a
//! prepared statement can be built without touching the backend.

use serde::{Deserialize, Serialize};

/// A parameter value bound to a [`Statement`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Text(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl SqlParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// An unexecuted statement handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    sql: String,
    #[serde(default)]
    params: Vec<SqlParam>,
}

impl Statement {
    /// Create a statement with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind the next positional parameter.
    pub fn bind(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_bind_order() {
        let stmt = Statement::new("INSERT INTO t (a, b) VALUES (?, ?)")
            .bind(7i64)
            .bind("seven");
        assert_eq!(stmt.sql(), "INSERT INTO t (a, b) VALUES (?, ?)");
        assert_eq!(stmt.params().len(), 2);
        assert!(matches!(stmt.params()[0], SqlParam::Int(7)));
        assert!(matches!(stmt.params()[1], SqlParam::Text(ref s) if s == "seven"));
    }

    #[test]
    fn test_param_type_names() {
        assert_eq!(SqlParam::Null.type_name(), "null");
        assert_eq!(SqlParam::Bool(true).type_name(), "bool");
        assert_eq!(SqlParam::Bytes(vec![1]).type_name(), "bytes");
        assert!(SqlParam::Null.is_null());
        assert!(!SqlParam::Int(0).is_null());
    }

    #[test]
    fn test_bytes_param_base64_round_trip() {
        let param = SqlParam::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&param).unwrap();
        assert_eq!(json, "\"3q2+7w==\"");
    }
}
