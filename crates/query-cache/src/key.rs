//! Cache keys built from query text and parameters

use serde_json::{Number, Value};
use std::fmt;

/// Key for cache lookups: the query text plus its parameter set.
///
/// Parameters are stored in a canonical JSON form (object members sorted by
/// name, integral floats written as integers), so two parameter sets that are
/// structurally equal produce equal keys regardless of member order or
/// number spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    sql: String,
    params: String,
}

impl CacheKey {
    /// Create a key from query text and parameters
    pub fn new(sql: impl Into<String>, params: &Value) -> Self {
        let mut canonical = String::new();
        write_canonical(params, &mut canonical);
        Self {
            sql: sql.into(),
            params: canonical,
        }
    }

    /// Create a key for a query without parameters
    pub fn from_sql(sql: impl Into<String>) -> Self {
        Self::new(sql, &empty_params())
    }

    /// The query text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The canonical JSON form of the parameters
    pub fn params(&self) -> &str {
        &self.params
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sql, self.params)
    }
}

/// The parameter set used when a caller passes none
pub fn empty_params() -> Value {
    Value::Array(Vec::new())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut members: Vec<_> = map.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, item)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Number(number) => write_number(number, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Largest magnitude below which every integer is exactly representable as f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// `1`, `1.0` and `-0.0` are the same parameter value
fn write_number(number: &Number, out: &mut String) {
    match number.as_f64() {
        Some(f) if number.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            out.push_str(&(f as i64).to_string())
        }
        _ => out.push_str(&number.to_string()),
    }
}
