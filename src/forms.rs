//! Survey forms: the built-in library, the fixed five-field form and
//! descriptor-driven custom forms.

use indexmap::IndexMap;

use crate::api::validate;
use crate::error::{FeedbackError, Result};
use crate::models::{
    CustomSubmission, FeedbackPayload, FieldDescriptor, FieldKind, Recommend, StandardSubmission,
};
use crate::router::survey_path;

/// Submitted values keyed by field name.
pub type FormInput = IndexMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltInForm {
    pub name: &'static str,
    pub description: &'static str,
}

pub const BUILT_IN_FORMS: [BuiltInForm; 13] = [
    BuiltInForm {
        name: "Course Feedback Form",
        description: "Detailed student reviews on a specific course's content and structure.",
    },
    BuiltInForm {
        name: "College Review and Suggestions",
        description: "Gather feedback on overall college facilities, administration, and campus life.",
    },
    BuiltInForm {
        name: "Lecturer/Teacher Feedback",
        description: "Evaluate the teaching style, clarity, and effectiveness of an instructor.",
    },
    BuiltInForm {
        name: "Semester Feedback Form",
        description: "Assess the entire semester experience, including workload, resources, and overall satisfaction.",
    },
    BuiltInForm {
        name: "Classroom Experience Feedback",
        description: "Review the physical environment, technology, and comfort of the learning space.",
    },
    BuiltInForm {
        name: "College Culturals Feedback Form",
        description: "Review cultural events, performances, organization, and participation experience.",
    },
    BuiltInForm {
        name: "Product Review",
        description: "Collect immediate impressions, feature ratings, and market reception for a new product.",
    },
    BuiltInForm {
        name: "Game Feedback",
        description: "Specific form for gathering bug reports, gameplay reviews, and feature requests from users.",
    },
    BuiltInForm {
        name: "Food Review Form",
        description: "Rate menu items, service quality, and ambiance for any dining experience.",
    },
    BuiltInForm {
        name: "Conference Feedback Form",
        description: "Evaluate sessions, speakers, networking opportunities, and overall event logistics.",
    },
    BuiltInForm {
        name: "Workshop Feedback Form",
        description: "Assess practical learning events, covering material relevance, instructor engagement, and exercises.",
    },
    BuiltInForm {
        name: "Your Shopping Experience",
        description: "Survey customer satisfaction regarding a recent store visit or online purchase.",
    },
    BuiltInForm {
        name: "Movie Feedback Form",
        description: "Collect ratings and comments on a film's plot, acting, visual effects, and sound.",
    },
];

impl BuiltInForm {
    pub fn survey_path(&self) -> String {
        survey_path(self.name)
    }
}

/// Label for the free-text identifier, chosen from keywords in the topic.
pub fn identifier_label(topic: &str) -> &'static str {
    if contains_any(topic, &["Course", "Semester", "Classroom", "Lecturer"]) {
        "Course/Module Identifier (e.g., CS 101, Fall 2025)"
    } else if contains_any(topic, &["Product", "Game", "Movie"]) {
        "Specific Product/Item Name"
    } else if contains_any(topic, &["Food", "Shopping"]) {
        "Item / Store Name"
    } else if contains_any(topic, &["Conference", "Workshop", "Culturals"]) {
        "Event Name / Session Title"
    } else {
        "Specific Identifier (Required)"
    }
}

/// Turns a free-form topic into a shareable survey path.
pub fn create_topic(topic: &str) -> Result<String> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(FeedbackError::validation(
            "Please enter a valid topic name before creating the form.",
        ));
    }
    Ok(survey_path(topic))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFormConfig {
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
}

pub const CUSTOM_FORM_IDS: [&str; 1] = ["custom-my-custom-feedback-form"];

pub fn custom_form(form_id: &str) -> Option<CustomFormConfig> {
    match form_id {
        "custom-my-custom-feedback-form" => Some(CustomFormConfig {
            title: "Custom Feedback Form: Q&A".to_string(),
            fields: vec![
                FieldDescriptor::new(1, FieldKind::Text, "Your Name (Required)", true),
                FieldDescriptor::new(2, FieldKind::Textarea, "Please describe the event details.", true),
                FieldDescriptor::new(
                    3,
                    FieldKind::Number,
                    "On a scale of 1-10, how likely are you to recommend us?",
                    true,
                ),
                FieldDescriptor::new(4, FieldKind::Text, "Email Address (Optional)", false),
            ],
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldView {
    fn new(key: &str, label: &str, kind: FieldKind, required: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            required,
        }
    }
}

pub trait FormRenderer {
    fn title(&self) -> &str;

    fn fields(&self) -> Vec<FieldView>;

    /// Builds and checks a payload; nothing is sent.
    fn build_payload(&self, input: &FormInput) -> Result<FeedbackPayload>;
}

pub struct FixedForm {
    topic: String,
}

impl FixedForm {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
        }
    }
}

impl FormRenderer for FixedForm {
    fn title(&self) -> &str {
        &self.topic
    }

    fn fields(&self) -> Vec<FieldView> {
        vec![
            FieldView::new("name", "Your Full Name", FieldKind::Text, true),
            FieldView::new("email", "Email Address", FieldKind::Email, true),
            FieldView::new("courseName", identifier_label(&self.topic), FieldKind::Text, true),
            FieldView::new("comments", "Detailed Comments", FieldKind::Textarea, true),
            FieldView::new("rating", "Star Rating (1-5)", FieldKind::Number, true),
            FieldView::new("recommend", "Would you recommend it? (Yes/No)", FieldKind::Text, false),
        ]
    }

    fn build_payload(&self, input: &FormInput) -> Result<FeedbackPayload> {
        reject_unknown_fields(input, &self.fields())?;
        let value = |key: &str| input.get(key).cloned().unwrap_or_default();

        let rating = match value("rating").trim() {
            "" => 0,
            text => text.parse::<u8>().map_err(|_| {
                FeedbackError::validation(format!("Rating must be a whole number from 1 to 5, got {text:?}"))
            })?,
        };
        let recommend = match value("recommend").trim() {
            "" => Recommend::default(),
            text => Recommend::parse(text).ok_or_else(|| {
                FeedbackError::validation(format!("Recommend must be Yes or No, got {text:?}"))
            })?,
        };

        let payload = FeedbackPayload::Standard(StandardSubmission {
            topic: self.topic.clone(),
            name: value("name"),
            email: value("email"),
            course_name: value("courseName"),
            rating,
            comments: value("comments"),
            recommend,
        });
        validate(&payload)?;
        Ok(payload)
    }
}

pub struct DynamicForm {
    config: CustomFormConfig,
}

impl DynamicForm {
    pub fn new(config: CustomFormConfig) -> Self {
        Self { config }
    }

    pub fn lookup(form_id: &str) -> Option<Self> {
        custom_form(form_id).map(Self::new)
    }
}

impl FormRenderer for DynamicForm {
    fn title(&self) -> &str {
        &self.config.title
    }

    fn fields(&self) -> Vec<FieldView> {
        self.config
            .fields
            .iter()
            .map(|field| FieldView::new(&field.key(), &field.label, field.kind, field.required))
            .collect()
    }

    fn build_payload(&self, input: &FormInput) -> Result<FeedbackPayload> {
        reject_unknown_fields(input, &self.fields())?;

        let mut values = IndexMap::new();
        for field in &self.config.fields {
            let key = field.key();
            let value = input.get(&key).cloned().unwrap_or_default();
            if field.kind == FieldKind::Number
                && !value.trim().is_empty()
                && value.trim().parse::<f64>().is_err()
            {
                return Err(FeedbackError::validation(format!(
                    "{} expects a number, got {value:?}",
                    field.label
                )));
            }
            values.insert(key, value);
        }

        let payload = FeedbackPayload::Custom(CustomSubmission {
            topic: self.config.title.clone(),
            fields: self.config.fields.clone(),
            values,
        });
        validate(&payload)?;
        Ok(payload)
    }
}

fn contains_any(topic: &str, words: &[&str]) -> bool {
    words.iter().any(|word| topic.contains(word))
}

fn reject_unknown_fields(input: &FormInput, fields: &[FieldView]) -> Result<()> {
    match input
        .keys()
        .find(|key| !fields.iter().any(|field| &field.key == *key))
    {
        Some(key) => Err(FeedbackError::validation(format!("unknown form field {key:?}"))),
        None => Ok(()),
    }
}
