//! Text transformers available to project manifests by name

use crate::transform::{NamedTransform, Transform};
use async_trait::async_trait;
use serde_json::Value;
use spark_errors::TransformFailure;
use spark_types::Payload;
use std::sync::Arc;

/// Names accepted in a manifest's `[pipeline]` section
pub const BUILTIN_NAMES: &[&str] = &[
    "trim",
    "uppercase",
    "lowercase",
    "lines",
    "word-count",
    "reverse",
    "fail",
];

/// Look up a built-in transformer by name
#[must_use]
pub fn builtin(name: &str) -> Option<NamedTransform> {
    let transform: Arc<dyn Transform> = match name {
        "trim" => Arc::new(Trim),
        "uppercase" => Arc::new(Uppercase),
        "lowercase" => Arc::new(Lowercase),
        "lines" => Arc::new(Lines),
        "word-count" => Arc::new(WordCount),
        "reverse" => Arc::new(Reverse),
        "fail" => Arc::new(Fail),
        _ => return None,
    };
    Some(NamedTransform::new(name, transform))
}

fn expect_text<'a>(input: &'a Payload, stage: &str) -> Result<&'a str, TransformFailure> {
    input
        .as_str()
        .ok_or_else(|| TransformFailure::new(format!("{stage} expects text, got {input}")))
}

struct Trim;

#[async_trait]
impl Transform for Trim {
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
        Ok(Value::String(expect_text(input, "trim")?.trim().to_string()))
    }
}

struct Uppercase;

#[async_trait]
impl Transform for Uppercase {
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
        Ok(Value::String(expect_text(input, "uppercase")?.to_uppercase()))
    }
}

struct Lowercase;

#[async_trait]
impl Transform for Lowercase {
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
        Ok(Value::String(expect_text(input, "lowercase")?.to_lowercase()))
    }
}

/// Split text into an array of lines
struct Lines;

#[async_trait]
impl Transform for Lines {
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
        let lines = expect_text(input, "lines")?
            .lines()
            .map(|line| Value::String(line.to_string()))
            .collect();
        Ok(Value::Array(lines))
    }
}

/// Count whitespace-separated words in text or in an array of lines
struct WordCount;

#[async_trait]
impl Transform for WordCount {
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
        let count = match input {
            Value::String(text) => text.split_whitespace().count(),
            Value::Array(items) => items
                .iter()
                .map(|item| expect_text(item, "word-count").map(|t| t.split_whitespace().count()))
                .sum::<Result<usize, _>>()?,
            other => {
                return Err(TransformFailure::new(format!(
                    "word-count expects text or lines, got {other}"
                )))
            }
        };
        Ok(Value::from(count))
    }
}

/// Reverse characters of text or the order of an array
struct Reverse;

#[async_trait]
impl Transform for Reverse {
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
        match input {
            Value::String(text) => Ok(Value::String(text.chars().rev().collect())),
            Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
            other => Err(TransformFailure::new(format!(
                "reverse expects text or lines, got {other}"
            ))),
        }
    }
}

struct Fail;

#[async_trait]
impl Transform for Fail {
    async fn apply(&self, _input: &Payload) -> Result<Payload, TransformFailure> {
        Err(TransformFailure::new("fail always fails"))
    }
}
