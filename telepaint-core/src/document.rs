//! Drawing frame model and its plaintext JSON form.
//!
//! Wire shape:
//! `{"session":..,"user":..,"ts":N,"strokes":[{"id":..,"color":..,"width":N,"points":[[x,y,t],..]}]}`
//!
//! Parsing is lenient below the top level. A peer running an older client
//! may write `[x,y]` points or omit `width`; a single broken point should
//! not make the whole remote frame disappear. Everything dropped is
//! counted in [`ParsedDocument`].

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Stroke width used when a stroke omits `width`
pub const DEFAULT_STROKE_WIDTH: i32 = 3;

/// A single sample of a stroke, in viewport-normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    /// Capture time in seconds
    pub t: u64,
}

impl Point {
    /// Build a point, clamping coordinates into `[0, 1]`.
    pub fn new(x: f32, y: f32, t: u64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            t,
        }
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.x)?;
        tuple.serialize_element(&self.y)?;
        tuple.serialize_element(&self.t)?;
        tuple.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub id: String,
    pub color: String,
    #[serde(rename = "width")]
    pub stroke_width: i32,
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn new(id: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            points: Vec::new(),
        }
    }
}

/// One frame: everything a peer has drawn in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub session: String,
    #[serde(rename = "user")]
    pub author: String,
    #[serde(rename = "ts")]
    pub timestamp: u64,
    pub strokes: Vec<Stroke>,
}

impl Document {
    pub fn new(session: impl Into<String>, author: impl Into<String>, timestamp: u64) -> Self {
        Self {
            session: session.into(),
            author: author.into(),
            timestamp,
            strokes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(|s| s.points.len()).sum()
    }

    /// Plaintext wire form. Every point is written as `[x,y,t]`.
    pub fn to_json(&self) -> Vec<u8> {
        // Only strings, integers and finite floats; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Why a body could not be read as a document at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Document is not a JSON object")]
    NotAnObject,

    #[error("Missing strokes array")]
    MissingStrokes,
}

/// A parsed document plus what the lenient parser had to drop.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub document: Document,
    /// Points that were not arrays, had fewer than two elements, or had
    /// non-numeric coordinates
    pub skipped_points: usize,
    /// Entries of `strokes` that were not objects
    pub skipped_strokes: usize,
}

impl ParsedDocument {
    pub fn is_clean(&self) -> bool {
        self.skipped_points == 0 && self.skipped_strokes == 0
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn unsigned(value: Option<&Value>) -> u64 {
    match value {
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        None => 0,
    }
}

fn parse_point(value: &Value) -> Option<Point> {
    let items = value.as_array()?;
    if items.len() < 2 {
        return None;
    }
    let x = items[0].as_f64()?;
    let y = items[1].as_f64()?;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some(Point::new(x as f32, y as f32, unsigned(items.get(2))))
}

/// Parse a plaintext document body.
///
/// Hard failures: invalid JSON, a non-object top level, a missing or
/// non-array `strokes`. Everything below that degrades gracefully:
/// missing fields take their defaults and malformed points are skipped.
pub fn parse_document(bytes: &[u8]) -> Result<ParsedDocument, ParseError> {
    let root: Value =
        serde_json::from_slice(bytes).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let obj = root.as_object().ok_or(ParseError::NotAnObject)?;

    let raw_strokes = obj
        .get("strokes")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingStrokes)?;

    let mut document = Document::new(text(obj, "session"), text(obj, "user"), unsigned(obj.get("ts")));
    let mut skipped_points = 0;
    let mut skipped_strokes = 0;

    for raw in raw_strokes {
        let Some(stroke_obj) = raw.as_object() else {
            skipped_strokes += 1;
            continue;
        };

        let mut stroke = Stroke::new(text(stroke_obj, "id"), text(stroke_obj, "color"));
        if let Some(width) = stroke_obj
            .get("width")
            .and_then(Value::as_i64)
            .and_then(|w| i32::try_from(w).ok())
        {
            stroke.stroke_width = width;
        }

        if let Some(points) = stroke_obj.get("points").and_then(Value::as_array) {
            stroke.points.reserve(points.len());
            for raw_point in points {
                match parse_point(raw_point) {
                    Some(point) => stroke.points.push(point),
                    None => skipped_points += 1,
                }
            }
        }

        document.strokes.push(stroke);
    }

    Ok(ParsedDocument {
        document,
        skipped_points,
        skipped_strokes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new("s1", "alice", 1000);
        let mut stroke = Stroke::new("1", "#111111");
        stroke.points.push(Point::new(0.25, 0.5, 10));
        stroke.points.push(Point::new(0.75, 0.125, 11));
        doc.strokes.push(stroke);

        let mut thick = Stroke::new("2", "#d22");
        thick.stroke_width = 7;
        thick.points.push(Point::new(0.1, 0.9, 12));
        doc.strokes.push(thick);
        doc
    }

    #[test]
    fn roundtrip_preserves_document() {
        let doc = sample();
        let parsed = parse_document(&doc.to_json()).unwrap();
        assert!(parsed.is_clean());
        assert_eq!(parsed.document, doc);
    }

    #[test]
    fn roundtrip_keeps_awkward_floats() {
        let mut doc = Document::new("s", "u", 1);
        let mut stroke = Stroke::new("a", "#000");
        stroke.points.push(Point::new(0.1, 1.0 / 3.0, 0));
        stroke.points.push(Point::new(0.0, 1.0, u64::MAX));
        doc.strokes.push(stroke);

        let parsed = parse_document(&doc.to_json()).unwrap();
        assert_eq!(parsed.document, doc);
    }

    #[test]
    fn wire_uses_short_keys() {
        let json: Value = serde_json::from_slice(&sample().to_json()).unwrap();
        assert_eq!(json["user"], "alice");
        assert_eq!(json["ts"], 1000);
        assert_eq!(json["strokes"][1]["width"], 7);
        assert_eq!(json["strokes"][0]["points"][0], serde_json::json!([0.25, 0.5, 10]));
    }

    #[test]
    fn defaults_for_missing_fields() {
        let body = br#"{"strokes":[{"points":[[0.5,0.5]]}]}"#;
        let parsed = parse_document(body).unwrap();
        let doc = parsed.document;

        assert_eq!(doc.session, "");
        assert_eq!(doc.author, "");
        assert_eq!(doc.timestamp, 0);
        assert_eq!(doc.strokes[0].stroke_width, DEFAULT_STROKE_WIDTH);
        assert_eq!(doc.strokes[0].points[0], Point::new(0.5, 0.5, 0));
    }

    #[test]
    fn two_element_points_parse_like_three_with_zero_time() {
        let short = br##"{"strokes":[{"id":"1","color":"#111","width":3,"points":[[0.5,0.25]]}]}"##;
        let long = br##"{"strokes":[{"id":"1","color":"#111","width":3,"points":[[0.5,0.25,0]]}]}"##;
        assert_eq!(
            parse_document(short).unwrap().document,
            parse_document(long).unwrap().document
        );
    }

    #[test]
    fn malformed_point_is_skipped() {
        let body = br##"{"session":"s1","user":"bob","ts":5,"strokes":[
            {"id":"1","color":"#111","width":3,"points":[[0.1,0.2,1],[0.5],[0.3,0.4,2]]}
        ]}"##;
        let parsed = parse_document(body).unwrap();

        assert_eq!(parsed.skipped_points, 1);
        assert_eq!(parsed.skipped_strokes, 0);
        let points = &parsed.document.strokes[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point::new(0.1, 0.2, 1));
        assert_eq!(points[1], Point::new(0.3, 0.4, 2));
    }

    #[test]
    fn non_array_and_non_numeric_points_are_skipped() {
        let body = br#"{"strokes":[{"points":[{"x":1},"p",["a","b"],[0.2,0.2]]}]}"#;
        let parsed = parse_document(body).unwrap();
        assert_eq!(parsed.skipped_points, 3);
        assert_eq!(parsed.document.point_count(), 1);
    }

    #[test]
    fn non_object_stroke_is_skipped() {
        let body = br#"{"strokes":[42,{"id":"ok","points":[]}]}"#;
        let parsed = parse_document(body).unwrap();
        assert_eq!(parsed.skipped_strokes, 1);
        assert_eq!(parsed.document.strokes.len(), 1);
        assert_eq!(parsed.document.strokes[0].id, "ok");
    }

    #[test]
    fn missing_strokes_is_an_error() {
        assert_eq!(
            parse_document(br#"{"session":"s1"}"#),
            Err(ParseError::MissingStrokes)
        );
        assert_eq!(
            parse_document(br#"{"strokes":"nope"}"#),
            Err(ParseError::MissingStrokes)
        );
    }

    #[test]
    fn invalid_top_level_is_an_error() {
        assert_eq!(parse_document(b"[]"), Err(ParseError::NotAnObject));
        assert!(matches!(
            parse_document(b"not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn coordinates_are_clamped() {
        let body = br#"{"strokes":[{"points":[[-0.5,1.5,3]]}]}"#;
        let parsed = parse_document(body).unwrap();
        assert_eq!(parsed.document.strokes[0].points[0], Point::new(0.0, 1.0, 3));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        // Multiples of 1/1024 survive the f32 -> JSON -> f64 -> f32 trip exactly
        fn coordinate() -> impl Strategy<Value = f32> {
            (0u32..=1024).prop_map(|n| n as f32 / 1024.0)
        }

        fn point() -> impl Strategy<Value = Point> {
            (coordinate(), coordinate(), any::<u64>()).prop_map(|(x, y, t)| Point::new(x, y, t))
        }

        fn stroke() -> impl Strategy<Value = Stroke> {
            (
                ".{0,12}",
                "#[0-9a-f]{6}",
                any::<i32>(),
                prop::collection::vec(point(), 0..16),
            )
                .prop_map(|(id, color, width, points)| Stroke {
                    id,
                    color,
                    stroke_width: width,
                    points,
                })
        }

        fn document() -> impl Strategy<Value = Document> {
            (".{0,12}", ".{0,12}", any::<u64>(), prop::collection::vec(stroke(), 0..8)).prop_map(
                |(session, author, timestamp, strokes)| Document {
                    session,
                    author,
                    timestamp,
                    strokes,
                },
            )
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn serialized_documents_parse_back_unchanged(doc in document()) {
                let parsed = parse_document(&doc.to_json()).unwrap();
                prop_assert!(parsed.is_clean());
                prop_assert_eq!(parsed.document, doc);
            }

            #[test]
            fn parsed_coordinates_stay_in_unit_square(x in -10.0f64..10.0, y in -10.0f64..10.0) {
                let body = format!(r#"{{"strokes":[{{"points":[[{},{},1]]}}]}}"#, x, y);
                let parsed = parse_document(body.as_bytes()).unwrap();
                let point = parsed.document.strokes[0].points[0];
                prop_assert!((0.0..=1.0).contains(&point.x));
                prop_assert!((0.0..=1.0).contains(&point.y));
            }
        }
    }
}
