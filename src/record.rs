//! Conversion between wire records and `SubmissionRecord`.
//!
//! The feedback store has been seen returning two layouts: canonical fields
//! at the top level, or the same fields nested under `answers` (sometimes
//! with `answers` stored as a JSON string). Both are resolved here so that
//! nothing downstream looks at the wire format.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::MalformedRecord;
use crate::models::{
    CustomAnswers, FeedbackPayload, Recommend, RecordKind, SubmissionRecord, FIELD_LABELS_KEY,
};

const ID_ALIASES: [&str; 3] = ["id", "_id", "key"];

/// Layout used when writing a record back to wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    Flat,
    Nested,
}

/// Layout detected on an incoming record.
#[derive(Debug)]
enum RawShape<'a> {
    Flat(&'a Map<String, Value>),
    Nested {
        top: &'a Map<String, Value>,
        answers: Map<String, Value>,
    },
    Custom {
        top: &'a Map<String, Value>,
        answers: Map<String, Value>,
    },
}

impl<'a> RawShape<'a> {
    /// An explicit `isCustom` decides; without one, `__field_labels` marks a custom record.
    fn detect(top: &'a Map<String, Value>) -> Result<Self, MalformedRecord> {
        let answers = decode_answers(top)?;
        let custom = custom_flag(top.get("isCustom")).unwrap_or_else(|| {
            answers
                .as_ref()
                .is_some_and(|answers| answers.contains_key(FIELD_LABELS_KEY))
        });

        Ok(match (custom, answers) {
            (true, answers) => RawShape::Custom {
                top,
                answers: answers.unwrap_or_default(),
            },
            (false, Some(answers)) => RawShape::Nested { top, answers },
            (false, None) => RawShape::Flat(top),
        })
    }

    /// Top-level value first, then the nested one for the nested layout.
    fn field(&self, name: &str) -> Option<&Value> {
        let (top, nested) = match self {
            RawShape::Flat(top) => (*top, None),
            RawShape::Nested { top, answers } => (*top, Some(answers)),
            RawShape::Custom { top, .. } => (*top, None),
        };
        present(top.get(name)).or_else(|| nested.and_then(|answers| present(answers.get(name))))
    }
}

pub fn normalize(raw: &Value) -> Result<SubmissionRecord, MalformedRecord> {
    let top = raw
        .as_object()
        .ok_or_else(|| MalformedRecord::new("record is not an object", raw.to_string()))?;

    let id = resolve_id(top).map_err(|reason| MalformedRecord::new(reason, raw.to_string()))?;
    let shape = RawShape::detect(top)?;

    let kind = match &shape {
        RawShape::Custom { answers, .. } => RecordKind::Custom(custom_answers(answers)),
        _ => RecordKind::Standard,
    };

    Ok(SubmissionRecord {
        topic: text(shape.field("topic")).filter(|topic| !topic.trim().is_empty()),
        name: text(shape.field("name")).unwrap_or_default(),
        email: text(shape.field("email")).unwrap_or_default(),
        course_name: text(shape.field("courseName")).unwrap_or_default(),
        rating: rating(&id, shape.field("rating")),
        comments: text(shape.field("comments")).unwrap_or_default(),
        recommend: recommend(&id, shape.field("recommend")),
        kind,
        id,
    })
}

pub fn denormalize(record: &SubmissionRecord, shape: WireShape) -> Value {
    let mut fields = Map::new();
    if let Some(topic) = &record.topic {
        fields.insert("topic".into(), json!(topic));
    }
    fields.insert("name".into(), json!(record.name));
    fields.insert("email".into(), json!(record.email));
    fields.insert("courseName".into(), json!(record.course_name));
    if let Some(rating) = record.rating {
        fields.insert("rating".into(), json!(rating));
    }
    fields.insert("comments".into(), json!(record.comments));
    fields.insert("recommend".into(), json!(record.recommend.as_str()));

    let mut top = Map::new();
    top.insert("id".into(), json!(record.id));

    if let RecordKind::Custom(answers) = &record.kind {
        // Custom answers always occupy `answers`, so canonical fields stay on top.
        top.extend(fields);
        top.insert("isCustom".into(), json!(true));
        let answers = custom_answers_wire(&answers.values, &answers.labels);
        top.insert("answers".into(), answers);
        return Value::Object(top);
    }

    match shape {
        WireShape::Flat => top.extend(fields),
        WireShape::Nested => {
            top.insert("answers".into(), Value::Object(fields));
        }
    }
    Value::Object(top)
}

/// JSON body for `POST /api/feedback`.
pub fn payload_to_wire(payload: &FeedbackPayload) -> Value {
    match payload {
        FeedbackPayload::Standard(submission) => json!({
            "topic": submission.topic,
            "name": submission.name,
            "email": submission.email,
            "courseName": submission.course_name,
            "rating": submission.rating,
            "comments": submission.comments,
            "recommend": submission.recommend.as_str(),
        }),
        FeedbackPayload::Custom(submission) => {
            let values: IndexMap<String, Value> = submission
                .values
                .iter()
                .map(|(key, value)| (key.clone(), json!(value)))
                .collect();
            let labels: IndexMap<String, String> = submission
                .fields
                .iter()
                .map(|field| (field.key(), field.label.clone()))
                .collect();
            json!({
                "topic": submission.topic,
                "isCustom": true,
                "answers": custom_answers_wire(&values, &labels),
            })
        }
    }
}

fn resolve_id(top: &Map<String, Value>) -> Result<String, String> {
    let value = ID_ALIASES
        .iter()
        .find_map(|alias| present(top.get(*alias)))
        .ok_or_else(|| "record has no id, _id or key".to_string())?;

    match value {
        Value::String(id) if !id.is_empty() => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        Value::Object(inner) => match inner.get("$oid") {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            _ => Err(format!("unsupported id value {value}")),
        },
        _ => Err(format!("unsupported id value {value}")),
    }
}

fn decode_answers(top: &Map<String, Value>) -> Result<Option<Map<String, Value>>, MalformedRecord> {
    match present(top.get("answers")) {
        None => Ok(None),
        Some(Value::Object(answers)) => Ok(Some(answers.clone())),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(answers)) => Ok(Some(answers)),
            Ok(Value::Null) => Ok(None),
            Ok(_) => Err(MalformedRecord::new(
                "encoded answers is not an object",
                encoded.clone(),
            )),
            Err(err) => Err(MalformedRecord::new(
                format!("answers is not valid JSON: {err}"),
                encoded.clone(),
            )),
        },
        Some(other) => Err(MalformedRecord::new(
            "answers must be an object or an encoded object",
            other.to_string(),
        )),
    }
}

fn custom_answers(answers: &Map<String, Value>) -> CustomAnswers {
    let labels = match answers.get(FIELD_LABELS_KEY) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                let id = entry.get("id")?.as_str()?;
                let label = entry.get("label")?.as_str()?;
                Some((id.to_string(), label.to_string()))
            })
            .collect(),
        Some(Value::Object(entries)) => entries
            .iter()
            .filter_map(|(key, label)| Some((key.clone(), label.as_str()?.to_string())))
            .collect(),
        _ => IndexMap::new(),
    };

    let values = answers
        .iter()
        .filter(|(key, _)| key.as_str() != FIELD_LABELS_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    CustomAnswers { values, labels }
}

fn custom_answers_wire(values: &IndexMap<String, Value>, labels: &IndexMap<String, String>) -> Value {
    let mut answers: Map<String, Value> = values
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let labels: Vec<Value> = labels
        .iter()
        .map(|(id, label)| json!({ "id": id, "label": label }))
        .collect();
    answers.insert(FIELD_LABELS_KEY.into(), Value::Array(labels));
    Value::Object(answers)
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

fn custom_flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(flag) => Some(*flag),
        Value::String(flag) if flag.eq_ignore_ascii_case("true") => Some(true),
        Value::String(flag) if flag.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn rating(id: &str, value: Option<&Value>) -> Option<u8> {
    let value = value?;
    let parsed = match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        // Zero is the form's "nothing selected" value.
        Some(0) => None,
        Some(rating @ 1..=5) => Some(rating as u8),
        _ => {
            warn!(record_id = id, rating = %value, "ignoring rating outside 1..=5");
            None
        }
    }
}

/// Only a missing or blank value defaults to Yes. Anything else that is
/// not yes/no counts as not recommending.
fn recommend(id: &str, value: Option<&Value>) -> Recommend {
    match value {
        None => Recommend::default(),
        Some(Value::String(text)) if text.trim().is_empty() => Recommend::default(),
        Some(Value::Bool(true)) => Recommend::Yes,
        Some(Value::Bool(false)) => Recommend::No,
        Some(Value::String(text)) => Recommend::parse(text).unwrap_or_else(|| {
            warn!(record_id = id, recommend = %text, "unknown recommend value, treating as No");
            Recommend::No
        }),
        Some(other) => {
            warn!(record_id = id, recommend = %other, "unknown recommend value, treating as No");
            Recommend::No
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomSubmission, FieldDescriptor, FieldKind, StandardSubmission};

    fn canonical() -> SubmissionRecord {
        SubmissionRecord {
            id: "abc".to_string(),
            topic: Some("Course Feedback Form".to_string()),
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            course_name: "CS 101".to_string(),
            rating: Some(4),
            comments: "Clear lectures".to_string(),
            recommend: Recommend::No,
            kind: RecordKind::Standard,
        }
    }

    fn custom() -> SubmissionRecord {
        let mut answers = CustomAnswers::default();
        answers.values.insert("field_1".into(), json!("Avery"));
        answers.values.insert("field_3".into(), json!("9"));
        answers.labels.insert("field_1".into(), "Your Name (Required)".into());
        answers.labels.insert("field_3".into(), "Likelihood".into());
        SubmissionRecord {
            id: "c-1".to_string(),
            topic: Some("Custom Feedback Form: Q&A".to_string()),
            name: String::new(),
            email: String::new(),
            course_name: String::new(),
            rating: None,
            comments: String::new(),
            recommend: Recommend::Yes,
            kind: RecordKind::Custom(answers),
        }
    }

    fn bare_custom() -> SubmissionRecord {
        SubmissionRecord {
            id: "c-2".to_string(),
            topic: Some("Custom Feedback Form: Empty".to_string()),
            kind: RecordKind::Custom(CustomAnswers::default()),
            ..canonical()
        }
    }

    #[test]
    fn flat_and_nested_shapes_normalize_identically() {
        let flat = json!({
            "id": "abc", "topic": "Course Feedback Form", "name": "Jane Doe",
            "email": "jane@example.com", "courseName": "CS 101", "rating": 4,
            "comments": "Clear lectures", "recommend": "No"
        });
        let nested = json!({
            "_id": "abc",
            "answers": {
                "topic": "Course Feedback Form", "name": "Jane Doe",
                "email": "jane@example.com", "courseName": "CS 101", "rating": 4,
                "comments": "Clear lectures", "recommend": "No"
            }
        });
        assert_eq!(normalize(&flat).unwrap(), canonical());
        assert_eq!(normalize(&nested).unwrap(), canonical());
    }

    #[test]
    fn round_trips_through_every_wire_shape() {
        for record in [canonical(), custom(), bare_custom()] {
            for shape in [WireShape::Flat, WireShape::Nested] {
                let wire = denormalize(&record, shape);
                assert_eq!(normalize(&wire).unwrap(), record, "{shape:?}");

                // Same layout with `answers` stored as a string.
                let mut encoded = wire.clone();
                if let Some(answers) = wire.get("answers") {
                    encoded["answers"] = Value::String(answers.to_string());
                }
                assert_eq!(normalize(&encoded).unwrap(), record, "encoded {shape:?}");
            }
        }
    }

    #[test]
    fn encoded_answers_are_decoded_with_defaults() {
        let raw = json!({ "key": 7, "answers": "{\"rating\":5,\"topic\":\"X\"}" });
        let record = normalize(&raw).unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.rating, Some(5));
        assert_eq!(record.topic.as_deref(), Some("X"));
        assert_eq!(record.recommend, Recommend::Yes);
        assert_eq!(record.course_name, "");
        assert!(!record.is_custom());
    }

    #[test]
    fn undecodable_answers_keep_raw_text() {
        let raw = json!({ "id": "x", "answers": "{rating: 5" });
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.raw, "{rating: 5");
        assert!(err.reason.contains("not valid JSON"));
    }

    #[test]
    fn id_aliases_resolve_in_priority_order() {
        let raw = json!({ "id": null, "_id": "mongo", "key": "fallback" });
        assert_eq!(normalize(&raw).unwrap().id, "mongo");

        let raw = json!({ "_id": { "$oid": "65f0" } });
        assert_eq!(normalize(&raw).unwrap().id, "65f0");

        let err = normalize(&json!({ "topic": "A" })).unwrap_err();
        assert!(err.reason.contains("no id"));
    }

    #[test]
    fn top_level_fields_win_over_nested_ones() {
        let raw = json!({
            "id": "1", "topic": "Top", "rating": 2,
            "answers": { "topic": "Nested", "rating": 5, "comments": "from answers" }
        });
        let record = normalize(&raw).unwrap();
        assert_eq!(record.topic.as_deref(), Some("Top"));
        assert_eq!(record.rating, Some(2));
        assert_eq!(record.comments, "from answers");
    }

    #[test]
    fn missing_required_fields_stay_absent() {
        let record = normalize(&json!({ "id": "1", "rating": 0, "topic": "  " })).unwrap();
        assert_eq!(record.topic, None);
        assert_eq!(record.rating, None);

        let record = normalize(&json!({ "id": "2", "rating": 9 })).unwrap();
        assert_eq!(record.rating, None);

        let record = normalize(&json!({ "id": "3", "rating": "3" })).unwrap();
        assert_eq!(record.rating, Some(3));
    }

    #[test]
    fn custom_labels_accept_list_or_mapping() {
        let listed = json!({
            "id": "c", "topic": "Q&A", "isCustom": true,
            "answers": { "field_1": "Avery", "__field_labels": [{ "id": "field_1", "label": "Name" }] }
        });
        let mapped = json!({
            "id": "c", "topic": "Q&A",
            "answers": "{\"field_1\":\"Avery\",\"__field_labels\":{\"field_1\":\"Name\"}}"
        });
        let a = normalize(&listed).unwrap();
        let b = normalize(&mapped).unwrap();
        assert_eq!(a, b);
        assert!(a.is_custom());
        assert_eq!(a.custom_answers().unwrap().label_for("field_1"), "Name");
    }

    #[test]
    fn explicit_custom_flag_decides_record_kind() {
        let flagged = normalize(&json!({ "id": "c", "topic": "Q&A", "isCustom": true })).unwrap();
        assert_eq!(flagged.kind, RecordKind::Custom(CustomAnswers::default()));

        let flagged = normalize(&json!({ "id": "c", "isCustom": "TRUE", "answers": { "field_1": "Avery" } }))
            .unwrap();
        assert_eq!(flagged.custom_answers().unwrap().values["field_1"], "Avery");

        let unflagged = normalize(&json!({
            "id": "s", "isCustom": false,
            "answers": { "rating": 4, "__field_labels": [] }
        }))
        .unwrap();
        assert_eq!(unflagged.kind, RecordKind::Standard);
        assert_eq!(unflagged.rating, Some(4));
    }

    #[test]
    fn unrecognised_recommend_values_count_as_no() {
        let recommend_of = |value: Value| normalize(&json!({ "id": "r", "recommend": value })).unwrap().recommend;
        assert_eq!(recommend_of(json!("Maybe")), Recommend::No);
        assert_eq!(recommend_of(json!(3)), Recommend::No);
        assert_eq!(recommend_of(json!(false)), Recommend::No);
        assert_eq!(recommend_of(json!("  ")), Recommend::Yes);
        assert_eq!(recommend_of(json!("yes")), Recommend::Yes);
        assert_eq!(recommend_of(Value::Null), Recommend::Yes);
    }

    #[test]
    fn non_object_records_are_malformed() {
        assert!(normalize(&json!("oops")).is_err());
        assert!(normalize(&json!({ "id": "1", "answers": 12 })).is_err());
        assert!(normalize(&json!({ "id": "1", "answers": "[1,2]" })).is_err());
    }

    #[test]
    fn payloads_use_wire_field_names() {
        let standard = FeedbackPayload::Standard(StandardSubmission {
            topic: "Game Feedback".into(),
            name: "Sam".into(),
            email: "sam@example.com".into(),
            course_name: "Level 3".into(),
            rating: 5,
            comments: "Fun".into(),
            recommend: Recommend::Yes,
        });
        let wire = payload_to_wire(&standard);
        assert_eq!(wire["courseName"], "Level 3");
        assert_eq!(wire["recommend"], "Yes");

        let mut values = IndexMap::new();
        values.insert("field_1".to_string(), "Avery".to_string());
        let custom = FeedbackPayload::Custom(CustomSubmission {
            topic: "Q&A".into(),
            fields: vec![FieldDescriptor::new(1, FieldKind::Text, "Name", true)],
            values,
        });
        let wire = payload_to_wire(&custom);
        assert_eq!(wire["isCustom"], true);
        assert_eq!(wire["answers"]["field_1"], "Avery");
        assert_eq!(wire["answers"]["__field_labels"][0]["label"], "Name");
    }
}
