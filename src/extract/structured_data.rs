//! JSON-LD, microdata and RDFa.
//!
//! Script bodies are parsed with `serde_json` and converted into [`LdValue`],
//! a tree capped at [`MAX_LD_DEPTH`] levels. `@graph` containers are flattened
//! recursively up to [`MAX_GRAPH_DEPTH`] levels, so hostile input cannot drive
//! unbounded recursion.

use std::collections::{BTreeMap, BTreeSet};

use scraper::Html;
use serde_json::{Map, Number, Value};

use super::{element_text, select_all};
use crate::report::{JsonLdItemReport, JsonLdSummary, JsonLdValidation, StructuredDataTypes};

pub const MAX_LD_DEPTH: usize = 32;
pub const MAX_GRAPH_DEPTH: usize = 8;

const REQUIRED_FIELDS: &[(&str, &[&str])] = &[
    ("Article", &["headline"]),
    ("BlogPosting", &["headline"]),
    ("NewsArticle", &["headline"]),
    ("Product", &["name"]),
    ("Event", &["name", "startDate"]),
    ("Organization", &["name"]),
    ("LocalBusiness", &["name", "address"]),
    ("FAQPage", &["mainEntity"]),
    ("HowTo", &["name", "step"]),
];

/// Required properties for a schema.org type; empty for unlisted types.
pub fn required_fields(local_type: &str) -> &'static [&'static str] {
    REQUIRED_FIELDS
        .iter()
        .find(|(name, _)| *name == local_type)
        .map(|(_, fields)| *fields)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq)]
pub enum LdValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<LdValue>),
    Object(BTreeMap<String, LdValue>),
}

impl LdValue {
    /// Convert, replacing anything nested deeper than [`MAX_LD_DEPTH`] with
    /// `Null`.
    pub fn from_json(value: &Value) -> Self {
        Self::convert(value, 0)
    }

    fn convert(value: &Value, depth: usize) -> Self {
        if depth >= MAX_LD_DEPTH {
            return LdValue::Null;
        }
        match value {
            Value::Null => LdValue::Null,
            Value::Bool(b) => LdValue::Bool(*b),
            Value::Number(n) => LdValue::Number(n.clone()),
            Value::String(s) => LdValue::String(s.clone()),
            Value::Array(items) => {
                LdValue::Array(items.iter().map(|v| Self::convert(v, depth + 1)).collect())
            }
            Value::Object(map) => LdValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::convert(v, depth + 1)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            LdValue::Null => Value::Null,
            LdValue::Bool(b) => Value::Bool(*b),
            LdValue::Number(n) => Value::Number(n.clone()),
            LdValue::String(s) => Value::String(s.clone()),
            LdValue::Array(items) => Value::Array(items.iter().map(LdValue::to_json).collect()),
            LdValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<&LdValue> {
        match self {
            LdValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LdValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn display(&self) -> String {
        match self {
            LdValue::String(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// Append the items held by one parsed script body to `out`. Objects carrying
/// an `@graph` array contribute their graph members instead of themselves.
pub fn flatten_json_ld(value: &LdValue, out: &mut Vec<LdValue>) {
    flatten_at(value, 0, out);
}

fn flatten_at(value: &LdValue, depth: usize, out: &mut Vec<LdValue>) {
    match value {
        LdValue::Object(_) => match value.get("@graph") {
            Some(LdValue::Array(graph)) if depth < MAX_GRAPH_DEPTH => {
                for member in graph {
                    flatten_at(member, depth + 1, out);
                }
            }
            _ => out.push(value.clone()),
        },
        LdValue::Array(items) if depth < MAX_GRAPH_DEPTH => {
            for item in items {
                flatten_at(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// Strip an IRI namespace: `http://schema.org/Article` -> `Article`.
pub fn local_type_name(raw: &str) -> Option<String> {
    let mut name = raw;
    if let Some((_, tail)) = name.rsplit_once('#') {
        name = tail;
    }
    if name.contains('/') {
        name = name.trim_end_matches('/');
        name = name.rsplit_once('/').map(|(_, tail)| tail).unwrap_or(name);
    }
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Distinct local `@type` names over the flattened item list.
pub fn structured_types(items: &[LdValue]) -> StructuredDataTypes {
    let mut types = BTreeSet::new();
    for item in items {
        match item.get("@type") {
            Some(LdValue::String(t)) => {
                types.insert(local_type_name(t).unwrap_or_else(|| t.clone()));
            }
            Some(LdValue::Array(list)) => {
                for t in list.iter().filter_map(LdValue::as_str) {
                    types.insert(local_type_name(t).unwrap_or_else(|| t.to_string()));
                }
            }
            _ => {}
        }
    }
    StructuredDataTypes {
        types: types.into_iter().collect(),
    }
}

/// Check each item against the required-field table. The first entry of a
/// `@type` array is the validated type; blank strings count as missing.
pub fn validate_json_ld(items: &[LdValue]) -> JsonLdValidation {
    let reports: Vec<JsonLdItemReport> = items
        .iter()
        .map(|item| {
            let item_type = match item.get("@type") {
                Some(LdValue::Array(list)) if !list.is_empty() => list[0].display(),
                Some(LdValue::Null) | Some(LdValue::Array(_)) | None => "Unknown".to_string(),
                Some(LdValue::String(s)) if s.is_empty() => "Unknown".to_string(),
                Some(other) => other.display(),
            };
            let lookup = local_type_name(&item_type).unwrap_or_else(|| item_type.clone());
            let missing: Vec<String> = required_fields(&lookup)
                .iter()
                .filter(|field| match item.get(field) {
                    None => true,
                    Some(LdValue::String(s)) => s.trim().is_empty(),
                    Some(_) => false,
                })
                .map(|field| field.to_string())
                .collect();
            JsonLdItemReport {
                item_type,
                ok: missing.is_empty(),
                missing,
            }
        })
        .collect();

    let ok_count = reports.iter().filter(|r| r.ok).count();
    JsonLdValidation {
        summary: JsonLdSummary {
            total_items: reports.len(),
            ok_count,
            has_errors: ok_count < reports.len(),
        },
        items: reports,
    }
}

#[derive(Debug, Default)]
pub(super) struct StructuredData {
    pub json_ld: Vec<Value>,
    pub microdata_count: usize,
    pub rdfa_count: usize,
    pub types: StructuredDataTypes,
    pub validation: JsonLdValidation,
}

pub(super) fn extract(doc: &Html) -> StructuredData {
    let mut items = Vec::new();
    for script in select_all(doc, "script[type]") {
        let is_ld = script
            .value()
            .attr("type")
            .is_some_and(|t| t.to_ascii_lowercase().contains("ld+json"));
        if !is_ld {
            continue;
        }
        let body: String = script.text().collect();
        let parsed = serde_json::from_str::<Value>(&body)
            .or_else(|_| serde_json::from_str::<Value>(&element_text(&script)));
        if let Ok(value) = parsed {
            flatten_json_ld(&LdValue::from_json(&value), &mut items);
        }
    }

    StructuredData {
        json_ld: items.iter().map(LdValue::to_json).collect(),
        microdata_count: select_all(doc, "[itemscope]").len(),
        rdfa_count: select_all(doc, "[vocab], [typeof], [property]").len(),
        types: structured_types(&items),
        validation: validate_json_ld(&items),
    }
}
