//! # Query Builders
//!
//! Pure translation of field/value constraints into search query documents.
//! Every builder emits a single top-level `bool.must` conjunction with one
//! clause per constraint, in the constraint map's iteration order.

use serde_json::{json, Map, Value};

/// Build a filter query from field constraints, one clause per field.
///
/// The clause kind is chosen by the shape of the value alone:
///
/// - array            → `terms`    (matches any element)
/// - string with `*`  → `wildcard` (pattern match)
/// - anything else    → `term`     (exact match)
///
/// Clauses target the `<field>.keyword` subfield so exact and pattern
/// matching run against the unanalyzed value. Wildcard detection is purely
/// syntactic: a literal asterisk in a value is indistinguishable from an
/// intended pattern and always selects the `wildcard` clause.
///
/// An empty constraint map produces an empty `must` list, which the backend
/// treats as match-all. That is a documented edge case, not an error.
pub fn filter_query(constraints: &Map<String, Value>) -> Value {
    let mut must = Vec::with_capacity(constraints.len());
    for (field, value) in constraints {
        let kind = match value {
            Value::Array(_) => "terms",
            Value::String(s) if s.contains('*') => "wildcard",
            _ => "term",
        };
        let mut clause = Map::new();
        clause.insert(format!("{field}.keyword"), value.clone());
        must.push(json!({ kind: clause }));
    }
    json!({ "query": { "bool": { "must": must } } })
}

/// Build a match query from field constraints.
///
/// Array values emit `terms` clauses; everything else emits `match_phrase`
/// against the field as given (no `.keyword` suffix, no wildcard dispatch).
/// Used by update-by-query and delete-by-query.
pub fn match_query(constraints: &Map<String, Value>) -> Value {
    let mut must = Vec::with_capacity(constraints.len());
    for (field, value) in constraints {
        let kind = if value.is_array() { "terms" } else { "match_phrase" };
        let mut clause = Map::new();
        clause.insert(field.clone(), value.clone());
        must.push(json!({ kind: clause }));
    }
    json!({ "query": { "bool": { "must": must } } })
}

/// Build the painless update script for update-by-query: one
/// `ctx._source.<field>=params.<field>` statement per assignment.
pub fn inline_script(assignments: &Map<String, Value>) -> Value {
    let statements: Vec<String> = assignments
        .keys()
        .map(|field| format!("ctx._source.{field}=params.{field}"))
        .collect();
    json!({
        "script": {
            "inline": statements.join(";"),
            "lang": "painless",
            "params": assignments,
        }
    })
}
