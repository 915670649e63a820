use indexmap::IndexMap;
use serde_json::Value;

pub const UNKNOWN_TOPIC: &str = "Unknown Topic";
pub const FIELD_LABELS_KEY: &str = "__field_labels";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recommend {
    #[default]
    Yes,
    No,
}

impl Recommend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommend::Yes => "Yes",
            Recommend::No => "No",
        }
    }

    /// Case-insensitive; anything other than yes/no is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Recommend::Yes),
            "no" => Some(Recommend::No),
            _ => None,
        }
    }
}

/// Values of a dynamic-schema submission, keyed `field_<id>`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAnswers {
    pub values: IndexMap<String, Value>,
    pub labels: IndexMap<String, String>,
}

impl CustomAnswers {
    pub fn label_for<'a>(&'a self, key: &'a str) -> &'a str {
        self.labels.get(key).map(String::as_str).unwrap_or(key)
    }

    /// (label, rendered value) pairs in submission order.
    pub fn labeled(&self) -> Vec<(&str, String)> {
        self.values
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(text) => text.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (self.label_for(key), rendered)
            })
            .collect()
    }
}

/// Which form produced a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecordKind {
    #[default]
    Standard,
    Custom(CustomAnswers),
}

/// One feedback entry after normalization. Absent topic and rating stay
/// absent so aggregation can exclude them.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub id: String,
    pub topic: Option<String>,
    pub name: String,
    pub email: String,
    pub course_name: String,
    pub rating: Option<u8>,
    pub comments: String,
    pub recommend: Recommend,
    pub kind: RecordKind,
}

impl SubmissionRecord {
    pub fn topic_or_unknown(&self) -> &str {
        self.topic.as_deref().unwrap_or(UNKNOWN_TOPIC)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, RecordKind::Custom(_))
    }

    pub fn custom_answers(&self) -> Option<&CustomAnswers> {
        match &self.kind {
            RecordKind::Custom(answers) => Some(answers),
            RecordKind::Standard => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: u32,
    pub kind: FieldKind,
    pub label: String,
    pub required: bool,
}

impl FieldDescriptor {
    pub fn new(id: u32, kind: FieldKind, label: &str, required: bool) -> Self {
        Self {
            id,
            kind,
            label: label.to_string(),
            required,
        }
    }

    pub fn key(&self) -> String {
        format!("field_{}", self.id)
    }
}

/// Body of a fixed-schema submission.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardSubmission {
    pub topic: String,
    pub name: String,
    pub email: String,
    pub course_name: String,
    pub rating: u8,
    pub comments: String,
    pub recommend: Recommend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomSubmission {
    pub topic: String,
    pub fields: Vec<FieldDescriptor>,
    pub values: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackPayload {
    Standard(StandardSubmission),
    Custom(CustomSubmission),
}

impl FeedbackPayload {
    pub fn topic(&self) -> &str {
        match self {
            FeedbackPayload::Standard(submission) => &submission.topic,
            FeedbackPayload::Custom(submission) => &submission.topic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statistics {
    pub total: usize,
    pub avg_rating: f64,
    pub recommend_rate: u32,
    /// First-appearance order; equality ignores order.
    pub topic_counts: IndexMap<String, usize>,
}
