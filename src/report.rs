use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::forms::{FormRenderer, BUILT_IN_FORMS};
use crate::models::{Statistics, SubmissionRecord};
use crate::stats;

pub fn stars(rating: Option<u8>) -> String {
    let filled = usize::from(rating.unwrap_or(0).min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

pub fn build_dashboard(
    records: &[SubmissionRecord],
    statistics: &Statistics,
    source: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Feedback Survey App - Admin Dashboard");
    let _ = writeln!(
        output,
        "Generated {} from {}",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        source
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total Reviews: {}", statistics.total);
    let _ = writeln!(output, "- Avg. Rating (5-star): {:.2}", statistics.avg_rating);
    let _ = writeln!(output, "- Recommendation Rate: {}%", statistics.recommend_rate);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Feedback Distribution by Topic");
    let topics = stats::sorted_topics(statistics);
    if topics.is_empty() {
        let _ = writeln!(output, "No topics recorded yet.");
    } else {
        for topic in &topics {
            let _ = writeln!(
                output,
                "- {}: {} ({:.1}%)",
                topic.topic,
                topic.count,
                stats::topic_share(topic.count, statistics.total)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Submissions ({})", records.len());
    if records.is_empty() {
        let _ = writeln!(output, "No feedback submissions found.");
    } else {
        for record in records {
            write_submission(&mut output, record);
        }
    }

    output
}

fn write_submission(output: &mut String, record: &SubmissionRecord) {
    let _ = write!(output, "- [{}] {}", record.id, record.topic_or_unknown());
    if !record.course_name.is_empty() {
        let _ = write!(output, " / {}", record.course_name);
    }

    match record.custom_answers() {
        Some(answers) => {
            let _ = writeln!(output, " (custom form)");
            for (label, value) in answers.labeled() {
                let _ = writeln!(output, "  - {label}: {value}");
            }
        }
        None => {
            let _ = writeln!(
                output,
                ": {} recommend {}",
                stars(record.rating),
                record.recommend.as_str()
            );
            if !record.comments.is_empty() {
                let _ = writeln!(output, "  > {}", record.comments);
            }
            let _ = writeln!(output, "  by {} <{}>", record.name, record.email);
        }
    }
}

pub fn build_library() -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Form Library");
    let _ = writeln!(output, "Select any built-in template to open its survey.");
    let _ = writeln!(output);
    for form in BUILT_IN_FORMS.iter() {
        let _ = writeln!(output, "- {}: {}", form.name, form.description);
        let _ = writeln!(output, "  {}", form.survey_path());
    }
    output
}

pub fn build_form(form: &dyn FormRenderer) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", form.title());
    for field in form.fields() {
        let marker = if field.required { " *" } else { "" };
        let _ = writeln!(
            output,
            "- {}{} [{}, {:?}]",
            field.label,
            marker,
            field.key,
            field.kind
        );
    }
    output
}
