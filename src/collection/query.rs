//! Equality queries, sorting, and pagination
//!
//! A query maps field paths to expected values; a record matches when
//! every path resolves to a value equal to the expected one. An empty
//! query matches everything.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{get_path, Record};

/// Field path -> expected value
pub type Query = Map<String, Value>;

/// Whether `record` satisfies every condition in `query`.
pub fn matches(record: &Record, query: &Query) -> bool {
    query
        .iter()
        .all(|(path, expected)| get_path(record, path) == Some(expected))
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDir::Asc),
            "desc" | "descending" => Ok(SortDir::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDir::Asc => write!(f, "asc"),
            SortDir::Desc => write!(f, "desc"),
        }
    }
}

/// Sorting and paging for `find_many`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_dir: SortDir,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn sort_dir(mut self, dir: SortDir) -> Self {
        self.sort_dir = dir;
        self
    }

    pub fn desc(self) -> Self {
        self.sort_dir(SortDir::Desc)
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Records in this page
    pub records: Vec<Record>,
    /// Number of matches before paging
    pub total: usize,
    /// Effective offset
    pub offset: usize,
    /// Effective limit (`None` = unbounded)
    pub limit: Option<usize>,
}

/// Sort matches in place and cut out the requested page.
///
/// `matches` must be in insertion order; equal sort keys keep that order.
pub fn paginate(mut matches: Vec<&Record>, options: &FindOptions) -> Page {
    let total = matches.len();

    if let Some(field) = &options.sort_by {
        matches.sort_by(|a, b| {
            let cmp = compare_values(get_path(a, field), get_path(b, field));
            match options.sort_dir {
                SortDir::Asc => cmp,
                SortDir::Desc => cmp.reverse(),
            }
        });
    }

    let records = matches
        .into_iter()
        .skip(options.offset)
        .take(options.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    Page {
        records,
        total,
        offset: options.offset,
        limit: options.limit,
    }
}

/// Total order over optional JSON values.
///
/// Missing sorts before present. Across types:
/// null < bool < number < string < array < object.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_json(a, b),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a.cmp(&b)
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a.cmp(&b)
            } else {
                let a = a.as_f64().unwrap_or(0.0);
                let b = b.as_f64().unwrap_or(0.0);
                a.total_cmp(&b)
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| compare_json(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        crate::record::from_value(value).unwrap()
    }

    fn query(value: Value) -> Query {
        crate::record::from_value(value).unwrap()
    }

    #[test]
    fn test_matches_every_field() {
        let r = rec(json!({"title": "t1", "meta": {"tag": "x"}, "n": 2}));
        assert!(matches(&r, &query(json!({}))));
        assert!(matches(&r, &query(json!({"title": "t1", "meta.tag": "x"}))));
        assert!(!matches(&r, &query(json!({"title": "t1", "n": 3}))));
        assert!(!matches(&r, &query(json!({"missing": null}))));
    }

    #[test]
    fn test_missing_sorts_first() {
        assert_eq!(compare_values(None, Some(&json!(null))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(0)), None), Ordering::Greater);
    }

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(compare_json(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_json(&json!(-1), &json!(0.5)), Ordering::Less);
        assert_eq!(compare_json(&json!(u64::MAX), &json!(1)), Ordering::Greater);
    }

    #[test]
    fn test_cross_type_ordering() {
        assert_eq!(compare_json(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(compare_json(&json!(99), &json!("a")), Ordering::Less);
        assert_eq!(compare_json(&json!("z"), &json!([])), Ordering::Less);
    }

    #[test]
    fn test_sort_desc_with_limit() {
        let a = rec(json!({"title": "t1"}));
        let b = rec(json!({"title": "t2"}));
        let page = paginate(vec![&a, &b], &FindOptions::new().sort_by("title").desc().limit(1));

        assert_eq!(page.total, 2);
        assert_eq!(page.records, vec![b.clone()]);
        assert_eq!(page.limit, Some(1));
    }

    #[test]
    fn test_sort_is_stable() {
        let a = rec(json!({"id": "a", "rank": 1}));
        let b = rec(json!({"id": "b", "rank": 0}));
        let c = rec(json!({"id": "c", "rank": 1}));
        let d = rec(json!({"id": "d"}));

        let asc = paginate(vec![&a, &b, &c, &d], &FindOptions::new().sort_by("rank"));
        let ids: Vec<_> = asc.records.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("d"), json!("b"), json!("a"), json!("c")]);

        let desc = paginate(vec![&a, &b, &c, &d], &FindOptions::new().sort_by("rank").desc());
        let ids: Vec<_> = desc.records.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("c"), json!("b"), json!("d")]);
    }

    #[test]
    fn test_offset_past_end() {
        let a = rec(json!({"id": "a"}));
        let page = paginate(vec![&a], &FindOptions::new().offset(5));
        assert!(page.records.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.offset, 5);
    }

    #[test]
    fn test_sort_dir_parse() {
        assert_eq!("DESC".parse::<SortDir>().unwrap(), SortDir::Desc);
        assert_eq!("ascending".parse::<SortDir>().unwrap(), SortDir::Asc);
        assert!("sideways".parse::<SortDir>().is_err());
    }

    #[test]
    fn test_find_options_deserialize() {
        let options: FindOptions =
            serde_json::from_value(json!({"sortBy": "title", "sortDir": "desc", "limit": 1})).unwrap();
        assert_eq!(options, FindOptions::new().sort_by("title").desc().limit(1));
    }
}
