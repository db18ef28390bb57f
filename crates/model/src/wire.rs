//! Decoding of API documents into the internal record shapes.
//!
//! The REST API returns `{"results": [...], "next": ...}` or a bare array
//! with snake_case fields; the GraphQL endpoint returns
//! `{"data": {"<field>": [...]}}` with camelCase fields. Both are accepted
//! here so the rest of the pipeline only sees [`AscentRecord`] and
//! [`ProblemRecord`].

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{AreaRef, AscentRecord, ProblemRecord, ProblemRef, Reference};

/// Errors from decoding a whole document.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unrecognized document shape: {0}")]
    Shape(String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),
}

/// Records decoded from one document, plus how many were unusable.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> Decoded<T> {
    /// Append another page of records.
    pub fn extend(&mut self, other: Decoded<T>) {
        self.records.extend(other.records);
        self.skipped += other.skipped;
    }
}

pub fn decode_ticks(text: &str) -> Result<Decoded<AscentRecord>, DecodeError> {
    decode_ticks_value(serde_json::from_str(text)?)
}

pub fn decode_problems(text: &str) -> Result<Decoded<ProblemRecord>, DecodeError> {
    decode_problems_value(serde_json::from_str(text)?)
}

/// GraphQL fields that hold tick lists (`problem.ticks`, `myTicks`).
pub const TICK_FIELDS: &[&str] = &["ticks", "myTicks"];

/// GraphQL fields that hold problem lists.
pub const PROBLEM_FIELDS: &[&str] = &["problems"];

pub fn decode_ticks_value(document: Value) -> Result<Decoded<AscentRecord>, DecodeError> {
    Ok(decode_each(records_of(document, TICK_FIELDS)?, parse_tick))
}

pub fn decode_problems_value(document: Value) -> Result<Decoded<ProblemRecord>, DecodeError> {
    Ok(decode_each(records_of(document, PROBLEM_FIELDS)?, parse_problem))
}

fn decode_each<T>(items: Vec<Value>, parse: fn(&Value) -> Option<T>) -> Decoded<T> {
    let mut decoded = Decoded::default();
    for item in &items {
        match parse(item) {
            Some(record) => decoded.records.push(record),
            None => decoded.skipped += 1,
        }
    }
    decoded
}

/// Extract the record array from any of the accepted envelopes.
///
/// Under a GraphQL `data` object the array is looked up by name, nearest
/// level first, among `fields`. When none of them is present, a single
/// array anywhere below `data` is accepted; several are ambiguous.
pub fn records_of(document: Value, fields: &[&str]) -> Result<Vec<Value>, DecodeError> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => {
            if let Some(Value::Array(items)) = object.remove("results") {
                return Ok(items);
            }
            match object.remove("data") {
                Some(data @ Value::Object(_)) => graphql_records(data, fields),
                _ => match object.get("errors").and_then(Value::as_array) {
                    Some(errors) => Err(DecodeError::GraphQl(graphql_messages(errors))),
                    None => Err(DecodeError::Shape(
                        "expected an array, results or data".to_string(),
                    )),
                },
            }
        }
        other => Err(DecodeError::Shape(format!("unexpected {}", kind_of(&other)))),
    }
}

/// URL of the next page of a paginated REST response.
pub fn next_page(document: &Value) -> Option<String> {
    document
        .get("next")
        .and_then(Value::as_str)
        .filter(|next| !next.is_empty())
        .map(str::to_string)
}

const GRAPHQL_DEPTH: usize = 3;

fn graphql_records(data: Value, fields: &[&str]) -> Result<Vec<Value>, DecodeError> {
    if let Some(items) = find_named(&data, fields) {
        return Ok(items.to_vec());
    }

    let mut arrays = Vec::new();
    collect_arrays(data, GRAPHQL_DEPTH, &mut arrays);
    match arrays.len() {
        1 => Ok(arrays.remove(0)),
        0 => Err(DecodeError::Shape("no record array under data".to_string())),
        n => Err(DecodeError::Shape(format!(
            "{} arrays under data and none named {}",
            n,
            fields.join(" or ")
        ))),
    }
}

/// Breadth-first, so `data.ticks` wins over `data.problem.ticks`.
fn find_named<'a>(data: &'a Value, fields: &[&str]) -> Option<&'a [Value]> {
    let mut level = vec![data];
    for _ in 0..GRAPHQL_DEPTH {
        let mut next = Vec::new();
        for value in level {
            let Some(object) = value.as_object() else {
                continue;
            };
            for field in fields {
                if let Some(Value::Array(items)) = object.get(*field) {
                    return Some(items);
                }
            }
            next.extend(object.values().filter(|v| v.is_object()));
        }
        level = next;
    }
    None
}

fn collect_arrays(value: Value, depth: usize, arrays: &mut Vec<Vec<Value>>) {
    match value {
        Value::Array(items) => arrays.push(items),
        Value::Object(object) if depth > 0 => {
            for (_, child) in object {
                collect_arrays(child, depth - 1, arrays);
            }
        }
        _ => {}
    }
}

fn graphql_messages(errors: &[Value]) -> String {
    errors
        .iter()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("; ")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_tick(value: &Value) -> Option<AscentRecord> {
    let object = value.as_object()?;
    let id = id_of(object.get("id")?)?;
    let problem = problem_ref(object)?;

    Some(AscentRecord {
        id,
        problem,
        tick_grade: text(object, &["tick_grade", "tickGrade"]),
        suggested_grade: text(object, &["suggested_grade", "suggestedGrade"]),
        date: field(object, &["date"]).and_then(parse_date),
        rating: field(object, &["rating"]).and_then(parse_rating),
        notes: text(object, &["notes"]).unwrap_or_default(),
        climber_height: climber_height(object),
    })
}

fn problem_ref(tick: &Map<String, Value>) -> Option<ProblemRef> {
    let nested = field(tick, &["problem_detail", "problemDetail"])
        .filter(|v| v.is_object())
        .or_else(|| field(tick, &["problem"]));

    match nested? {
        Value::Object(problem) => {
            let record = problem_fields(problem)?;
            Some(ProblemRef {
                id: record.id,
                name: record.name,
                grade: record.grade,
                area: record.area,
                area_name: record.area_name,
                sector_name: record.sector_name,
                wall_name: record.wall_name,
            })
        }
        bare => Some(ProblemRef::new(id_of(bare)?, "")),
    }
}

fn parse_problem(value: &Value) -> Option<ProblemRecord> {
    problem_fields(value.as_object()?)
}

fn problem_fields(object: &Map<String, Value>) -> Option<ProblemRecord> {
    let id = id_of(object.get("id")?)?;

    // Tick-derived average wins over the problem's own rating
    let rating = field(object, &["average_rating", "averageRating", "avgRating"])
        .and_then(parse_rating)
        .or_else(|| field(object, &["rating"]).and_then(parse_rating));

    let tick_count = field(object, &["tick_count", "tickCount"])
        .and_then(number)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u32);

    Some(ProblemRecord {
        id,
        name: text(object, &["name"]).unwrap_or_default(),
        grade: text(object, &["grade"]),
        rating,
        tick_count,
        area: area_ref(object),
        area_name: text(object, &["area_name", "areaName"])
            .or_else(|| nested_name(object, &["area_detail", "areaDetail", "area"])),
        sector_name: text(object, &["sector_name", "sectorName"])
            .or_else(|| nested_name(object, &["sector_detail", "sectorDetail", "sector"])),
        wall_name: text(object, &["wall_name", "wallName", "crag_name", "cragName"])
            .or_else(|| nested_name(object, &["wall_detail", "wallDetail", "wall"])),
        image_count: field(object, &["images"])
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
    })
}

/// Area reference: the expanded detail object if present, else a bare id.
fn area_ref(problem: &Map<String, Value>) -> Option<Reference<AreaRef>> {
    let detail = field(problem, &["area_detail", "areaDetail"])
        .filter(|v| v.is_object())
        .or_else(|| field(problem, &["area"]).filter(|v| v.is_object()));

    if let Some(Value::Object(area)) = detail {
        if let Some(id) = area.get("id").and_then(id_of) {
            return Some(Reference::Detailed(AreaRef {
                id,
                name: text(area, &["name"]).unwrap_or_default(),
                city_id: city_id(area),
                city_name: text(area, &["city_name", "cityName"])
                    .or_else(|| nested_name(area, &["city_detail", "cityDetail", "city"])),
            }));
        }
    }

    field(problem, &["area"])
        .filter(|v| !v.is_object())
        .and_then(id_of)
        .map(Reference::Id)
}

fn city_id(area: &Map<String, Value>) -> Option<String> {
    match field(area, &["city_detail", "cityDetail"]).or_else(|| field(area, &["city"]))? {
        Value::Object(city) => city.get("id").and_then(id_of),
        bare => id_of(bare),
    }
}

fn climber_height(tick: &Map<String, Value>) -> Option<String> {
    text(tick, &["climber_height", "climberHeight"]).or_else(|| {
        let user = tick.get("user")?.as_object()?;
        text(user, &["height"]).or_else(|| text(user.get("profile")?.as_object()?, &["height"]))
    })
}

/// First non-null value among the candidate keys.
fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Non-empty trimmed string value among the candidate keys.
fn text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(object, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn nested_name(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_object)
        .find_map(|nested| text(nested, &["name"]))
}

/// Ids arrive as numbers from REST and as strings from GraphQL.
fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ratings outside 1..=5 are treated as absent.
pub fn parse_rating(value: &Value) -> Option<f32> {
    number(value)
        .filter(|r| r.is_finite() && (1.0..=5.0).contains(r))
        .map(|r| r as f32)
}

/// Accepts `YYYY-MM-DD` and ISO timestamps; anything else is absent.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_rest_envelope() {
        let doc = json!({
            "count": 1,
            "next": "http://api/ticks/?page=2",
            "results": [{
                "id": 7,
                "date": "2023-05-01",
                "notes": "style: flash",
                "suggested_grade": "7A+",
                "problem": {
                    "id": 3,
                    "name": "Dívčí válka",
                    "grade": "7A",
                    "area": 2,
                    "area_detail": {"id": 2, "name": "Holštejn", "city": 9, "city_name": "Brno"},
                    "sector_detail": {"id": 4, "name": "Main wall"}
                }
            }]
        });
        assert_eq!(next_page(&doc).as_deref(), Some("http://api/ticks/?page=2"));

        let decoded = decode_ticks_value(doc).unwrap();
        assert_eq!(decoded.skipped, 0);
        let tick = &decoded.records[0];
        assert_eq!(tick.id, "7");
        assert_eq!(tick.date, NaiveDate::from_ymd_opt(2023, 5, 1));
        assert_eq!(tick.effective_grade(), Some("7A"));
        assert_eq!(tick.suggested_grade.as_deref(), Some("7A+"));
        assert_eq!(tick.problem.sector_name.as_deref(), Some("Main wall"));

        let area = tick.problem.area.as_ref().and_then(Reference::detail).unwrap();
        assert_eq!(area.city_id.as_deref(), Some("9"));
        assert_eq!(area.city_name.as_deref(), Some("Brno"));
    }

    #[test]
    fn test_graphql_envelope_camel_case() {
        let doc = json!({
            "data": {"me": {"ticks": [{
                "id": "t1",
                "tickGrade": "6C+",
                "date": "2021-09-12T10:00:00Z",
                "rating": "4.5",
                "user": {"profile": {"height": "175-180"}},
                "problem": {"id": "p1", "name": "Roof", "grade": "6C", "area": {"id": "a1", "name": "Sloup"}}
            }]}}
        });
        let decoded = decode_ticks_value(doc).unwrap();
        let tick = &decoded.records[0];
        assert_eq!(tick.effective_grade(), Some("6C+"));
        assert_eq!(tick.rating, Some(4.5));
        assert_eq!(tick.date, NaiveDate::from_ymd_opt(2021, 9, 12));
        assert_eq!(tick.climber_height.as_deref(), Some("175-180"));
        assert!(matches!(tick.problem.area, Some(Reference::Detailed(_))));
    }

    #[test]
    fn test_bare_array_and_bare_ids() {
        let doc = json!([
            {"id": 1, "problem": 5, "date": "not a date", "rating": 9},
            {"problem": 6},
            {"id": 2, "problem": {"id": 6, "name": "Arete", "area": 3}}
        ]);
        let decoded = decode_ticks_value(doc).unwrap();
        assert_eq!(decoded.skipped, 1);
        assert_eq!(decoded.records.len(), 2);

        let first = &decoded.records[0];
        assert_eq!(first.problem.id, "5");
        assert_eq!(first.date, None);
        assert_eq!(first.rating, None);

        let second = &decoded.records[1];
        assert_eq!(second.problem.area, Some(Reference::Id("3".to_string())));
    }

    #[test]
    fn test_problem_rating_fallback() {
        let doc = json!({"results": [
            {"id": 1, "name": "A", "grade": "7B", "rating": 3, "average_rating": 4.25, "tick_count": 12, "images": [{}, {}]},
            {"id": 2, "name": "B", "rating": 2},
            {"id": 3, "name": "C", "averageRating": null, "tickCount": "4"}
        ]});
        let decoded = decode_problems_value(doc).unwrap();
        let ratings: Vec<_> = decoded.records.iter().map(|p| p.rating).collect();
        assert_eq!(ratings, vec![Some(4.25), Some(2.0), None]);
        assert_eq!(decoded.records[0].tick_count, Some(12));
        assert_eq!(decoded.records[0].image_count, 2);
        assert_eq!(decoded.records[2].tick_count, Some(4));
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert!(matches!(records_of(json!("nope"), TICK_FIELDS), Err(DecodeError::Shape(_))));
        assert!(matches!(records_of(json!({"foo": 1}), TICK_FIELDS), Err(DecodeError::Shape(_))));
        assert!(matches!(
            records_of(json!({"errors": [{"message": "Not authenticated"}]}), TICK_FIELDS),
            Err(DecodeError::GraphQl(msg)) if msg == "Not authenticated"
        ));
        assert!(matches!(decode_ticks("{"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_graphql_picks_named_list() {
        let doc = json!({"data": {"problem": {
            "id": "p1",
            "comments": [{"id": "c1", "text": "Great line"}],
            "images": [{"id": "img1"}],
            "ticks": [
                {"id": "t1", "suggestedGrade": "7A", "problem": {"id": "p1", "name": "Roof"}},
                {"id": "t2", "suggestedGrade": "7A+", "problem": {"id": "p1", "name": "Roof"}}
            ]
        }}});
        let decoded = decode_ticks_value(doc).unwrap();
        assert_eq!(decoded.skipped, 0);
        let ids: Vec<_> = decoded.records.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);

        let doc = json!({"data": {
            "areas": [{"id": 1, "name": "Sloup"}],
            "problems": [{"id": "p1", "name": "Roof", "grade": "6C"}]
        }});
        let decoded = decode_problems_value(doc).unwrap();
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].name, "Roof");
    }

    #[test]
    fn test_graphql_unnamed_lists() {
        let single = json!({"data": {"results": {"edges": [{"id": "p1", "name": "Roof"}]}}});
        assert_eq!(decode_problems_value(single).unwrap().records.len(), 1);

        let ambiguous = json!({"data": {"problem": {
            "comments": [{"id": "c1"}],
            "images": [{"id": "img1"}]
        }}});
        assert!(matches!(decode_ticks_value(ambiguous), Err(DecodeError::Shape(_))));
    }
}
