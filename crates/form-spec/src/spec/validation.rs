use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// A validation predicate over the whole record.
///
/// The record passes when `condition` evaluates to true. On failure the
/// `message` is attached to every field named in `fields` — the fields the
/// user is expected to fix, which need not be every field the condition
/// reads (a password/confirm mismatch blames the confirmation field only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrossFieldRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
    pub fields: Vec<String>,
    pub condition: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
