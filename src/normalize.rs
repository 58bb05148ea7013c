//! Reshapes upstream JSON into the canonical types.
//!
//! The upstream API answers the same logical request with several container layouts and
//! field spellings. Each logical field is resolved through an ordered lookup table; the
//! order is load-bearing, so the tables live here as data rather than as chained lookups.
//!
//! Everything in this module is pure and total. A body that does not match any known
//! layout yields the empty shape for its kind, which callers cannot tell apart from a
//! genuine "no results" answer.

use serde_json::{Map, Value};

use crate::types::{
    Canonical, DetailResult, MediaDetail, MediaKind, MediaSummary, OperationKind, SearchResult,
    Source, SourceList, SubjectSlot,
};

/// A path of object keys from the value being inspected. The empty path is the value itself.
type Path = &'static [&'static str];

/// When a candidate counts as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Anything but null.
    Defined,
    /// Not null, false, zero or the empty string.
    Truthy,
}

/// Ordered fallback table for one logical field.
struct Lookup {
    paths: &'static [Path],
    presence: Presence,
}

const SUMMARY_ID: Lookup = Lookup {
    paths: &[&["subjectId"], &["id"], &["subject_id"], &["subject"]],
    presence: Presence::Defined,
};

const DETAIL_ID: Lookup = Lookup {
    paths: &[&["subjectId"], &["id"], &["subject_id"]],
    presence: Presence::Defined,
};

const TITLE: Lookup = Lookup {
    paths: &[&["title"], &["name"]],
    presence: Presence::Defined,
};

const SUMMARY_POSTER: Lookup = Lookup {
    paths: &[
        &["poster"],
        &["thumbnail"],
        &["cover", "thumbnail"],
        &["cover", "url"],
        &["stills", "url"],
        &["image"],
    ],
    presence: Presence::Truthy,
};

const DETAIL_POSTER: Lookup = Lookup {
    paths: &[
        &["poster"],
        &["cover", "url"],
        &["thumbnail"],
        &["cover", "thumbnail"],
        &["stills", "url"],
    ],
    presence: Presence::Defined,
};

const DESCRIPTION: Lookup = Lookup {
    paths: &[&["description"], &["synopsis"]],
    presence: Presence::Defined,
};

const RATING: Lookup = Lookup {
    paths: &[&["imdbRatingValue"], &["rating"], &["imdbRating"]],
    presence: Presence::Defined,
};

const RELEASE_DATE: Lookup = Lookup { paths: &[&["releaseDate"]], presence: Presence::Truthy };
const YEAR: Lookup = Lookup { paths: &[&["year"]], presence: Presence::Truthy };
const RAW_TYPE: Lookup = Lookup { paths: &[&["type"]], presence: Presence::Truthy };

const SOURCE_URL: Lookup = Lookup {
    paths: &[&["url"], &["file"], &["stream"]],
    presence: Presence::Truthy,
};

const SOURCE_DOWNLOAD_URL: Lookup = Lookup {
    paths: &[&["download_url"], &["url"], &["file"], &["stream"]],
    presence: Presence::Truthy,
};

// Container tables.
const SEARCH_ITEMS: &[Path] = &[&["results", "items"], &["results"], &["data"], &["items"]];
const SEARCH_PAGER: &[Path] = &[&["results", "pager"], &["pager"]];
const DETAIL_SUBJECT: &[Path] = &[&["results", "subject"], &["subject"], &["results"], &[]];
const SOURCE_LIST: &[Path] = &[&["results"], &["sources"], &["data"], &[]];

const SUMMARY_KEYS: &[&str] = &["id", "title", "type", "poster", "thumbnail", "year"];
const DETAIL_KEYS: &[&str] = &["id", "title", "poster", "description", "year", "rating", "raw"];
const SOURCE_KEYS: &[&str] = &["url", "download_url"];

fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.as_object()?.get(*key))
}

fn is_present(value: &Value, presence: Presence) -> bool {
    match (presence, value) {
        (_, Value::Null) => false,
        (Presence::Defined, _) => true,
        (Presence::Truthy, Value::Bool(b)) => *b,
        (Presence::Truthy, Value::String(s)) => !s.is_empty(),
        (Presence::Truthy, Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        (Presence::Truthy, _) => true,
    }
}

/// Scalar rendering used for every string-typed canonical field.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First candidate in table order that is present and renders as text.
fn resolve(value: &Value, lookup: &Lookup) -> Option<String> {
    lookup
        .paths
        .iter()
        .filter_map(|path| at(value, path))
        .filter(|v| is_present(v, lookup.presence))
        .find_map(as_text)
}

fn first_array<'a>(value: &'a Value, paths: &[Path]) -> Option<&'a Vec<Value>> {
    paths.iter().filter_map(|p| at(value, p)).find_map(Value::as_array)
}

fn first_object<'a>(value: &'a Value, paths: &[Path]) -> Option<&'a Value> {
    paths.iter().filter_map(|p| at(value, p)).find(|v| v.is_object())
}

/// Shallow copy of the upstream object minus the keys the canonical type owns.
fn passthrough(value: &Value, owned: &[&str]) -> Map<String, Value> {
    let mut map = value.as_object().cloned().unwrap_or_default();
    for key in owned {
        map.remove(*key);
    }
    map
}

fn year_of(value: &Value) -> String {
    if let Some(date) = resolve(value, &RELEASE_DATE) {
        return date.chars().take(4).collect();
    }
    resolve(value, &YEAR).unwrap_or_default()
}

/// `subjectType` codes: numbers compare by value, strings only match the exact digit.
fn kind_of(item: &Value) -> MediaKind {
    let code = match item.get("subjectType") {
        Some(Value::Number(n)) => n.as_f64().filter(|c| *c == 1.0 || *c == 2.0).map(|c| c as u8),
        Some(Value::String(s)) if s == "1" => Some(1),
        Some(Value::String(s)) if s == "2" => Some(2),
        _ => None,
    };
    match code {
        Some(2) => MediaKind::Series,
        Some(1) => MediaKind::Movie,
        _ => resolve(item, &RAW_TYPE)
            .map(|t| MediaKind::from(t.as_str()))
            .unwrap_or(MediaKind::Unknown),
    }
}

/// Map one raw search item. Non-object items resolve as if they were empty objects.
pub fn summary_from_item(item: &Value) -> MediaSummary {
    let poster = resolve(item, &SUMMARY_POSTER).unwrap_or_default();
    MediaSummary {
        id: resolve(item, &SUMMARY_ID),
        title: resolve(item, &TITLE).unwrap_or_default(),
        kind: kind_of(item),
        thumbnail: poster.clone(),
        poster,
        year: year_of(item),
        extra: passthrough(item, SUMMARY_KEYS),
    }
}

pub fn detail_from_subject(subject: &Value) -> MediaDetail {
    MediaDetail {
        id: resolve(subject, &DETAIL_ID),
        title: resolve(subject, &TITLE).unwrap_or_default(),
        poster: resolve(subject, &DETAIL_POSTER).unwrap_or_default(),
        description: resolve(subject, &DESCRIPTION).unwrap_or_default(),
        year: year_of(subject),
        rating: resolve(subject, &RATING).unwrap_or_default(),
        raw: subject.clone(),
        extra: passthrough(subject, DETAIL_KEYS),
    }
}

pub fn source_from_entry(entry: &Value) -> Source {
    Source {
        url: resolve(entry, &SOURCE_URL).unwrap_or_default(),
        download_url: resolve(entry, &SOURCE_DOWNLOAD_URL).unwrap_or_default(),
        extra: passthrough(entry, SOURCE_KEYS),
    }
}

pub fn normalize_search(raw: &Value) -> SearchResult {
    let results = first_array(raw, SEARCH_ITEMS)
        .map(|items| items.iter().map(summary_from_item).collect())
        .unwrap_or_default();
    let pager = SEARCH_PAGER
        .iter()
        .filter_map(|p| at(raw, p))
        .find(|v| !v.is_null())
        .cloned();
    SearchResult { results, pager }
}

pub fn normalize_detail(raw: &Value) -> DetailResult {
    DetailResult {
        results: SubjectSlot { subject: first_object(raw, DETAIL_SUBJECT).map(detail_from_subject) },
    }
}

pub fn normalize_sources(raw: &Value) -> SourceList {
    SourceList {
        results: first_array(raw, SOURCE_LIST)
            .map(|list| list.iter().map(source_from_entry).collect())
            .unwrap_or_default(),
    }
}

/// Canonical shape for `raw` answering a `kind` request. Never fails.
pub fn normalize(kind: OperationKind, raw: &Value) -> Canonical {
    match kind {
        OperationKind::Search => Canonical::Search(normalize_search(raw)),
        OperationKind::Detail => Canonical::Detail(normalize_detail(raw)),
        OperationKind::Sources => Canonical::Sources(normalize_sources(raw)),
    }
}
