use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Which logical request a body answers. Decides the normalization path and the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Search,
    Detail,
    Sources,
}

impl OperationKind {
    /// Classify an endpoint path by substring, the same way the upstream routes are laid out.
    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        if endpoint.contains("/search") {
            Some(Self::Search)
        } else if endpoint.contains("/info") {
            Some(Self::Detail)
        } else if endpoint.contains("/sources") {
            Some(Self::Sources)
        } else {
            None
        }
    }

    pub fn fixture_name(self) -> &'static str {
        match self {
            Self::Search => "search.json",
            Self::Detail => "info.json",
            Self::Sources => "sources.json",
        }
    }
}

/// Media type as shown to the user. Upstream `type` strings that are neither movie nor
/// series are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MediaKind {
    Movie,
    Series,
    #[default]
    Unknown,
    Other(String),
}

impl MediaKind {
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
            MediaKind::Unknown => "unknown",
            MediaKind::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for MediaKind {
    fn from(s: &str) -> Self {
        match s {
            "movie" => MediaKind::Movie,
            "series" => MediaKind::Series,
            "unknown" | "" => MediaKind::Unknown,
            other => MediaKind::Other(other.to_string()),
        }
    }
}

impl Serialize for MediaKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MediaKind::from(s.as_str()))
    }
}

/// One search hit. Every upstream field not overridden here survives in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: Option<String>,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub poster: String,
    pub thumbnail: String,
    pub year: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaDetail {
    pub id: Option<String>,
    pub title: String,
    pub poster: String,
    pub description: String,
    pub year: String,
    pub rating: String,
    /// The subject object exactly as upstream sent it.
    pub raw: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub download_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub results: Vec<MediaSummary>,
    /// Opaque pagination metadata, passed through untouched.
    pub pager: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubjectSlot {
    pub subject: Option<MediaDetail>,
}

/// `{ "results": { "subject": ... } }`; a `None` subject means "not found".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetailResult {
    pub results: SubjectSlot,
}

impl DetailResult {
    pub fn subject(&self) -> Option<&MediaDetail> {
        self.results.subject.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceList {
    pub results: Vec<Source>,
}

/// Any of the three canonical shapes, as stored in the response cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Canonical {
    Search(SearchResult),
    Detail(DetailResult),
    Sources(SourceList),
}

impl Canonical {
    /// The empty-but-valid shape for a kind; what every degraded path returns.
    pub fn empty(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Search => Canonical::Search(SearchResult::default()),
            OperationKind::Detail => Canonical::Detail(DetailResult::default()),
            OperationKind::Sources => Canonical::Sources(SourceList::default()),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Canonical::Search(_) => OperationKind::Search,
            Canonical::Detail(_) => OperationKind::Detail,
            Canonical::Sources(_) => OperationKind::Sources,
        }
    }

    pub fn into_search(self) -> Option<SearchResult> {
        match self { Canonical::Search(r) => Some(r), _ => None }
    }

    pub fn into_detail(self) -> Option<DetailResult> {
        match self { Canonical::Detail(r) => Some(r), _ => None }
    }

    pub fn into_sources(self) -> Option<SourceList> {
        match self { Canonical::Sources(r) => Some(r), _ => None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_classification_by_substring() {
        assert_eq!(OperationKind::from_endpoint("/search/dune?page=1&type=movie"), Some(OperationKind::Search));
        assert_eq!(OperationKind::from_endpoint("/info/42"), Some(OperationKind::Detail));
        assert_eq!(OperationKind::from_endpoint("/sources/42?season=1&episode=2"), Some(OperationKind::Sources));
        assert_eq!(OperationKind::from_endpoint("/trending"), None);
    }

    #[test]
    fn media_kind_round_trips_unknown_strings() {
        assert_eq!(MediaKind::from("anime"), MediaKind::Other("anime".into()));
        assert_eq!(serde_json::to_value(MediaKind::Series).unwrap(), json!("series"));
        let kind: MediaKind = serde_json::from_value(json!("movie")).unwrap();
        assert_eq!(kind, MediaKind::Movie);
    }

    #[test]
    fn empty_shapes_serialize_like_the_upstream_envelopes() {
        assert_eq!(
            serde_json::to_value(Canonical::empty(OperationKind::Search)).unwrap(),
            json!({ "results": [], "pager": null })
        );
        assert_eq!(
            serde_json::to_value(Canonical::empty(OperationKind::Detail)).unwrap(),
            json!({ "results": { "subject": null } })
        );
        assert_eq!(
            serde_json::to_value(Canonical::empty(OperationKind::Sources)).unwrap(),
            json!({ "results": [] })
        );
        for kind in [OperationKind::Search, OperationKind::Detail, OperationKind::Sources] {
            assert_eq!(Canonical::empty(kind).kind(), kind);
        }
    }

    #[test]
    fn summary_serializes_passthrough_fields_flat() {
        let mut extra = Map::new();
        extra.insert("subjectId".into(), json!("7"));
        let s = MediaSummary {
            id: Some("7".into()),
            title: "Heat".into(),
            kind: MediaKind::Movie,
            poster: String::new(),
            thumbnail: String::new(),
            year: "1995".into(),
            extra,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["subjectId"], json!("7"));
        assert_eq!(v["type"], json!("movie"));
    }
}
