//! Translation of list query strings into a `DocumentQuery`.
//!
//! Lenient by contract: unknown keys, malformed numbers and unparsable filter
//! values are dropped instead of failing the request.

use std::collections::{BTreeMap, HashMap};

use crate::{
    content_types::{ContentTypeConfig, FilterKind},
    repository::{Condition, DocumentQuery, FilterValue, Op, Search, Sort},
    validation::{format_instant, parse_day_bounds},
};

/// Keys with a meaning of their own; never treated as filters.
const RESERVED_KEYS: &[&str] = &["page", "limit", "q", "search", "sort"];

/// ListRequest
///
/// The resolved list call: the store query plus what gets echoed back in `meta`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub query: DocumentQuery,
    pub page: u64,
    pub limit: u64,
    /// Raw `key=value` pairs that turned into conditions.
    pub applied_filters: BTreeMap<String, String>,
    pub search: Option<String>,
}

/// Resolves `page`/`limit`: page defaults to 1, limit to the type's default and
/// never exceeds its maximum. Page is capped so the row offset fits an `i64`.
pub fn pagination(params: &HashMap<String, String>, config: &ContentTypeConfig) -> (u64, u64) {
    let limit = params
        .get("limit")
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|limit| *limit >= 1)
        .unwrap_or(config.default_limit)
        .min(config.max_limit)
        .max(1);

    let page = params
        .get("page")
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
        .min(max_page(limit));

    (page, limit)
}

fn max_page(limit: u64) -> u64 {
    (i64::MAX as u64 / limit).max(1)
}

/// Splits `views[gte]` into (`views`, `Gte`). Plain keys are equality.
fn split_key(key: &str) -> Option<(&str, Op)> {
    let Some(open) = key.find('[') else {
        return Some((key, Op::Eq));
    };
    let field = &key[..open];
    let op = match &key[open..] {
        "[gt]" => Op::Gt,
        "[gte]" => Op::Gte,
        "[lt]" => Op::Lt,
        "[lte]" => Op::Lte,
        "[eq]" => Op::Eq,
        _ => return None,
    };
    Some((field, op))
}

/// Store conditions for one query key. A date filter compares UTC instants;
/// a plain day covers midnight through its last microsecond, so `lte` on a day
/// includes the whole day and `eq` becomes a range.
fn parse_conditions(kind: FilterKind, op: Op, raw: &str) -> Option<Vec<(Op, FilterValue)>> {
    if kind != FilterKind::DateRange {
        return parse_value(kind, op, raw).map(|value| vec![(op, value)]);
    }
    let (start, end) = parse_day_bounds(raw)?;
    let start = FilterValue::Date(format_instant(start));
    let end = FilterValue::Date(format_instant(end));
    Some(match op {
        Op::Eq if start == end => vec![(Op::Eq, start)],
        Op::Eq => vec![(Op::Gte, start), (Op::Lte, end)],
        Op::Gt => vec![(Op::Gt, end)],
        Op::Gte => vec![(Op::Gte, start)],
        Op::Lt => vec![(Op::Lt, start)],
        Op::Lte => vec![(Op::Lte, end)],
    })
}

fn parse_value(kind: FilterKind, op: Op, raw: &str) -> Option<FilterValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match kind {
        FilterKind::Text if op == Op::Eq => Some(FilterValue::Text(raw.to_string())),
        FilterKind::Text => None,
        FilterKind::Boolean if op == Op::Eq => match raw {
            "true" | "1" => Some(FilterValue::Bool(true)),
            "false" | "0" => Some(FilterValue::Bool(false)),
            _ => None,
        },
        FilterKind::Boolean => None,
        FilterKind::NumberRange => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(FilterValue::Number),
        FilterKind::DateRange => None,
    }
}

fn parse_sort(raw: Option<&String>, config: &ContentTypeConfig) -> Sort {
    let Some(raw) = raw.map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return Sort::default();
    };
    let (field, descending) = match raw.strip_prefix('-') {
        Some(field) => (field, true),
        None => (raw, false),
    };
    if config.is_sortable(field) {
        Sort {
            field: field.to_string(),
            descending,
        }
    } else {
        Sort::default()
    }
}

/// build_list_request
///
/// Only filters named in the type's allowed set survive; conditions are sorted
/// by key so the same query string always yields the same store query.
pub fn build_list_request(
    params: &HashMap<String, String>,
    config: &ContentTypeConfig,
) -> ListRequest {
    let (page, limit) = pagination(params, config);

    let mut applied_filters = BTreeMap::new();
    let mut conditions = Vec::new();

    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    for key in keys {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let Some((field, op)) = split_key(key) else {
            continue;
        };
        let Some(spec) = config.filter_spec(field) else {
            continue;
        };
        let raw = &params[key];
        let Some(parsed) = parse_conditions(spec.kind, op, raw) else {
            continue;
        };
        applied_filters.insert(key.clone(), raw.trim().to_string());
        conditions.extend(parsed.into_iter().map(|(op, value)| Condition {
            field: field.to_string(),
            op,
            value,
        }));
    }

    let search = params
        .get("q")
        .or_else(|| params.get("search"))
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty());

    let query = DocumentQuery {
        conditions,
        search: search.clone().map(|term| Search {
            term,
            fields: config.search_fields.iter().map(|f| f.to_string()).collect(),
        }),
        sort: parse_sort(params.get("sort"), config),
        skip: (page - 1).saturating_mul(limit),
        limit,
    };

    ListRequest {
        query,
        page,
        limit,
        applied_filters,
        search,
    }
}
