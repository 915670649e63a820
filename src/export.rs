use std::io;

use serde::Serialize;

use crate::models::SubmissionRecord;

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    topic: &'a str,
    name: &'a str,
    email: &'a str,
    course_name: &'a str,
    rating: Option<u8>,
    comments: &'a str,
    recommend: &'a str,
    is_custom: bool,
    answers: String,
}

pub fn write_csv<W: io::Write>(records: &[SubmissionRecord], writer: W) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);

    for record in records {
        let answers = record
            .custom_answers()
            .map(|answers| {
                answers
                    .labeled()
                    .into_iter()
                    .map(|(label, value)| format!("{label}: {value}"))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();

        writer.serialize(CsvRow {
            id: &record.id,
            topic: record.topic_or_unknown(),
            name: &record.name,
            email: &record.email,
            course_name: &record.course_name,
            rating: record.rating,
            comments: &record.comments,
            recommend: record.recommend.as_str(),
            is_custom: record.is_custom(),
            answers,
        })?;
    }

    writer.flush()?;
    Ok(records.len())
}
