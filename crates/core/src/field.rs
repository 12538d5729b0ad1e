//! Interpolated field expressions
//!
//! A field is literal text with `${! function(args) }` interpolations that are
//! resolved per message. Fields are parsed once at construction; a bad
//! expression is a configuration error, never a per-message one.
//!
//! # Functions
//!
//! | Function | Result |
//! |----------|--------|
//! | `content()` | payload of the message as UTF-8 (lossy) |
//! | `meta("key")` | metadata value, empty when missing |
//! | `count("name")` | process-wide counter, incremented on every call |
//! | `timestamp_unix()` | seconds since the epoch |
//! | `timestamp_unix_nano()` | nanoseconds since the epoch |
//! | `batch_index()` | index of the message within its batch |
//! | `batch_size()` | number of messages in the batch |
//!
//! `$${!` escapes an interpolation and produces a literal `${!`.
//!
//! # Example
//!
//! ```
//! use ferry_core::{Batch, Field};
//!
//! let field: Field = "user-${! meta(\"id\") }".parse().unwrap();
//! let batch = Batch::single(ferry_core::Part::from("{}").with_metadata("id", "42"));
//! assert_eq!(field.string(0, &batch), "user-42");
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use thiserror::Error;

use crate::message::Batch;

static COUNTERS: LazyLock<Mutex<HashMap<String, u64>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Field expression parse errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    /// `${!` without a closing brace
    #[error("unterminated interpolation starting at char {0}")]
    Unterminated(usize),

    /// Function name not recognised
    #[error("unrecognised function '{0}'")]
    UnknownFunction(String),

    /// Wrong number or form of arguments
    #[error("function '{function}': {message}")]
    BadArguments {
        /// Function name
        function: String,
        /// What was wrong
        message: String,
    },

    /// Expression is not of the form `name(args)`
    #[error("expected function call, got '{0}'")]
    Syntax(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Function {
    Content,
    Meta(String),
    Count(String),
    TimestampUnix,
    TimestampUnixNano,
    BatchIndex,
    BatchSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Function(Function),
}

/// A parsed field expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    raw: String,
    segments: Vec<Segment>,
}

impl Field {
    /// Parse a field expression
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;
        let mut offset = 0;

        while let Some(start) = rest.find("${!") {
            // `$${!` is an escaped interpolation
            if start > 0 && rest.as_bytes()[start - 1] == b'$' {
                literal.push_str(&rest[..start - 1]);
                literal.push_str("${!");
                rest = &rest[start + 3..];
                offset += start + 3;
                continue;
            }

            literal.push_str(&rest[..start]);
            let body = &rest[start + 3..];
            let end = body
                .find('}')
                .ok_or(FieldError::Unterminated(offset + start))?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Function(parse_function(body[..end].trim())?));

            let consumed = start + 3 + end + 1;
            rest = &rest[consumed..];
            offset += consumed;
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The original expression text
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the field contains no interpolations
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Resolve the field for message `index` of `batch`
    pub fn string(&self, index: usize, batch: &Batch) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Function(f) => out.push_str(&evaluate(f, index, batch)),
            }
        }
        out
    }
}

impl FromStr for Field {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_function(expr: &str) -> Result<Function, FieldError> {
    let open = expr
        .find('(')
        .ok_or_else(|| FieldError::Syntax(expr.to_string()))?;
    if !expr.ends_with(')') {
        return Err(FieldError::Syntax(expr.to_string()));
    }

    let name = expr[..open].trim();
    let args = expr[open + 1..expr.len() - 1].trim();

    let no_args = |function: Function| {
        if args.is_empty() {
            Ok(function)
        } else {
            Err(FieldError::BadArguments {
                function: name.to_string(),
                message: "expected no arguments".into(),
            })
        }
    };

    match name {
        "content" => no_args(Function::Content),
        "timestamp_unix" => no_args(Function::TimestampUnix),
        "timestamp_unix_nano" => no_args(Function::TimestampUnixNano),
        "batch_index" => no_args(Function::BatchIndex),
        "batch_size" => no_args(Function::BatchSize),
        "meta" => Ok(Function::Meta(string_arg(name, args)?)),
        "count" => Ok(Function::Count(string_arg(name, args)?)),
        other => Err(FieldError::UnknownFunction(other.to_string())),
    }
}

fn string_arg(function: &str, args: &str) -> Result<String, FieldError> {
    let quoted = args.len() >= 2 && args.starts_with('"') && args.ends_with('"');
    if !quoted {
        return Err(FieldError::BadArguments {
            function: function.to_string(),
            message: "expected a single string argument".into(),
        });
    }
    Ok(args[1..args.len() - 1].to_string())
}

fn evaluate(function: &Function, index: usize, batch: &Batch) -> String {
    match function {
        Function::Content => batch
            .get(index)
            .map(|p| String::from_utf8_lossy(p.data()).into_owned())
            .unwrap_or_default(),
        Function::Meta(key) => batch
            .get(index)
            .and_then(|p| p.meta(key))
            .unwrap_or_default()
            .to_string(),
        Function::Count(name) => {
            let mut counters = COUNTERS.lock();
            let counter = counters.entry(name.clone()).or_insert(0);
            *counter += 1;
            counter.to_string()
        }
        Function::TimestampUnix => since_epoch().as_secs().to_string(),
        Function::TimestampUnixNano => since_epoch().as_nanos().to_string(),
        Function::BatchIndex => index.to_string(),
        Function::BatchSize => batch.len().to_string(),
    }
}

fn since_epoch() -> std::time::Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
