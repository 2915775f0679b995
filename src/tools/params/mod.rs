use serde_json::Value;

use crate::errors::ToolError;
use crate::tools::base::ToolArgs;

/// Shared coercion for argument maps decoded from model JSON.
///
/// This module is the only place untyped access to argument values is
/// acceptable; every tool routes its extraction through here so the error
/// messages stay uniform.

pub fn require_str(args: &ToolArgs, key: &str) -> Result<String, ToolError> {
    match args.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ToolError::invalid_param(key, "must not be empty")),
        Some(other) => Err(ToolError::invalid_param(
            key,
            &format!("expected string, got {}", json_type_name(other)),
        )),
        None => Err(ToolError::missing_param(key)),
    }
}

pub fn optional_str(args: &ToolArgs, key: &str) -> Option<String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Optional bool with defaulting. Accepts natural string aliases
/// (`"true"/"1"/"yes"` and `"false"/"0"/"no"`, case-insensitive).
pub fn optional_bool(args: &ToolArgs, key: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ToolError::invalid_param(
                key,
                &format!("'{}' is not a boolean", s),
            )),
        },
        Some(other) => Err(ToolError::invalid_param(
            key,
            &format!("expected boolean, got {}", json_type_name(other)),
        )),
    }
}

/// Optional integer with defaulting. Accepts integer, integral float (JSON
/// decoders often produce `42.0`), and digit-only string forms.
pub fn optional_int(args: &ToolArgs, key: &str, default: i64) -> Result<i64, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => coerce_int(key, value),
    }
}

pub fn require_int(args: &ToolArgs, key: &str) -> Result<i64, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::missing_param(key)),
        Some(value) => coerce_int(key, value),
    }
}

fn coerce_int(key: &str, value: &Value) -> Result<i64, ToolError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                    Ok(f as i64)
                } else {
                    Err(ToolError::invalid_param(
                        key,
                        &format!("'{}' is not an integer", f),
                    ))
                }
            } else {
                Err(ToolError::invalid_param(key, "unrepresentable number"))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().map_err(|_| {
                ToolError::invalid_param(key, &format!("'{}' is not an integer", s))
            })
        }
        other => Err(ToolError::invalid_param(
            key,
            &format!("expected integer, got {}", json_type_name(other)),
        )),
    }
}

pub fn optional_uint(args: &ToolArgs, key: &str, default: u64) -> Result<u64, ToolError> {
    let value = optional_int(args, key, default as i64)?;
    u64::try_from(value)
        .map_err(|_| ToolError::invalid_param(key, &format!("{} must not be negative", key)))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Chunked-write fields extracted as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpec {
    pub session_id: String,
    pub chunk_index: u64,
    pub total_chunks: Option<u64>,
    pub is_last: bool,
}

impl ChunkSpec {
    /// The write becomes durable on this chunk.
    pub fn finalizes(&self) -> bool {
        self.is_last
            || self
                .total_chunks
                .is_some_and(|total| self.chunk_index + 1 == total)
    }
}

/// Cross-field validation for chunked writes.
///
/// A request is chunked iff any of the chunked keys is present. In chunked
/// mode `session_id` and a non-negative `chunk_index` are mandatory,
/// `chunk_index < total_chunks` when the total is given, and `append` is
/// forbidden.
pub fn chunk_spec(args: &ToolArgs) -> Result<Option<ChunkSpec>, ToolError> {
    let chunked = ["session_id", "chunk_index", "total_chunks", "is_last"]
        .iter()
        .any(|k| args.get(*k).is_some_and(|v| !v.is_null()));
    if !chunked {
        return Ok(None);
    }

    let session_id = require_str(args, "session_id")?;
    let chunk_index = match args.get("chunk_index") {
        None | Some(Value::Null) => return Err(ToolError::missing_param("chunk_index")),
        Some(v) => {
            let i = coerce_int("chunk_index", v)?;
            u64::try_from(i).map_err(|_| {
                ToolError::invalid_param("chunk_index", "must not be negative")
            })?
        }
    };
    let total_chunks = match args.get("total_chunks") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let i = coerce_int("total_chunks", v)?;
            let total = u64::try_from(i).map_err(|_| {
                ToolError::invalid_param("total_chunks", "must not be negative")
            })?;
            if total == 0 {
                return Err(ToolError::invalid_param("total_chunks", "must be at least 1"));
            }
            Some(total)
        }
    };
    let is_last = optional_bool(args, "is_last", false)?;

    if let Some(total) = total_chunks
        && chunk_index >= total
    {
        return Err(ToolError::invalid_param(
            "chunk_index",
            &format!("{} is out of range for {} chunks", chunk_index, total),
        ));
    }

    if optional_bool(args, "append", false)? {
        return Err(ToolError::Validation(
            "append is incompatible with chunked mode".to_string(),
        ));
    }

    Ok(Some(ChunkSpec {
        session_id,
        chunk_index,
        total_chunks,
        is_last,
    }))
}
