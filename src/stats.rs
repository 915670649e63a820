use indexmap::IndexMap;

use crate::models::{Recommend, Statistics, SubmissionRecord, TopicCount};

pub fn aggregate(records: &[SubmissionRecord]) -> Statistics {
    let total = records.len();
    if total == 0 {
        return Statistics::default();
    }

    let mut rating_sum = 0u64;
    let mut rated = 0u64;
    let mut recommended = 0usize;
    let mut topic_counts: IndexMap<String, usize> = IndexMap::new();

    for record in records {
        if let Some(rating) = record.rating {
            rating_sum += u64::from(rating);
            rated += 1;
        }
        if record.recommend == Recommend::Yes {
            recommended += 1;
        }
        *topic_counts
            .entry(record.topic_or_unknown().to_string())
            .or_insert(0) += 1;
    }

    Statistics {
        total,
        avg_rating: average_rating(rating_sum, rated),
        recommend_rate: recommend_rate(recommended, total),
        topic_counts,
    }
}

/// Mean of present ratings, rounded to two decimals.
pub fn average_rating(rating_sum: u64, rated: u64) -> f64 {
    if rated == 0 {
        return 0.0;
    }
    round_to(rating_sum as f64 / rated as f64, 2)
}

pub fn recommend_rate(recommended: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * recommended as f64 / total as f64).round() as u32
}

/// Topics by count descending. The sort is stable, so ties keep first-seen order.
pub fn sorted_topics(stats: &Statistics) -> Vec<TopicCount> {
    let mut topics: Vec<TopicCount> = stats
        .topic_counts
        .iter()
        .map(|(topic, count)| TopicCount {
            topic: topic.clone(),
            count: *count,
        })
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count));
    topics
}

/// Share of all submissions, as a percentage.
pub fn topic_share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordKind, UNKNOWN_TOPIC};
    use crate::record::normalize;
    use serde_json::json;

    fn record(topic: Option<&str>, rating: Option<u8>, recommend: Recommend) -> SubmissionRecord {
        SubmissionRecord {
            id: format!("{topic:?}-{rating:?}"),
            topic: topic.map(str::to_string),
            name: "Avery Lee".to_string(),
            email: "avery@example.com".to_string(),
            course_name: String::new(),
            rating,
            comments: "ok".to_string(),
            recommend,
            kind: RecordKind::Standard,
        }
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.avg_rating, 0.0);
        assert_eq!(stats.recommend_rate, 0);
        assert!(stats.topic_counts.is_empty());
    }

    #[test]
    fn three_record_scenario() {
        let records = vec![
            record(Some("A"), Some(5), Recommend::Yes),
            record(Some("A"), Some(3), Recommend::No),
            record(Some("B"), Some(4), Recommend::Yes),
        ];
        let stats = aggregate(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.avg_rating, 4.0);
        assert_eq!(stats.recommend_rate, 67);
        assert_eq!(stats.topic_counts.get("A"), Some(&2));
        assert_eq!(stats.topic_counts.get("B"), Some(&1));
    }

    #[test]
    fn average_is_rounded_and_skips_absent_ratings() {
        let records = vec![
            record(Some("A"), Some(5), Recommend::Yes),
            record(Some("A"), Some(4), Recommend::Yes),
            record(Some("A"), Some(4), Recommend::Yes),
            record(Some("A"), None, Recommend::Yes),
        ];
        let stats = aggregate(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.avg_rating, 4.33);
    }

    #[test]
    fn absent_topics_are_bucketed() {
        let records = vec![
            record(None, Some(2), Recommend::No),
            record(None, Some(2), Recommend::No),
        ];
        let stats = aggregate(&records);
        assert_eq!(stats.topic_counts.get(UNKNOWN_TOPIC), Some(&2));
        assert_eq!(stats.recommend_rate, 0);
    }

    #[test]
    fn unrecognised_recommend_answers_lower_the_rate() {
        let records: Vec<SubmissionRecord> = [
            json!({ "id": "1", "topic": "A", "rating": 4, "recommend": "Maybe" }),
            json!({ "id": "2", "topic": "A", "rating": 2, "recommend": "Nope" }),
        ]
        .iter()
        .map(|raw| normalize(raw).unwrap())
        .collect();
        assert_eq!(aggregate(&records).recommend_rate, 0);

        let missing = normalize(&json!({ "id": "3", "topic": "A" })).unwrap();
        assert_eq!(aggregate(&[missing]).recommend_rate, 100);
    }

    #[test]
    fn result_does_not_depend_on_input_order() {
        let mut records = vec![
            record(Some("A"), Some(1), Recommend::Yes),
            record(Some("B"), Some(2), Recommend::No),
            record(Some("C"), Some(5), Recommend::Yes),
        ];
        let forward = aggregate(&records);
        records.reverse();
        assert_eq!(aggregate(&records), forward);
    }

    #[test]
    fn recommend_rate_grows_with_yes_count() {
        let total = 7;
        let rates: Vec<u32> = (0..=total).map(|yes| recommend_rate(yes, total)).collect();
        assert!(rates.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(rates[0], 0);
        assert_eq!(rates[total], 100);
    }

    #[test]
    fn sorted_topics_keep_first_seen_order_on_ties() {
        let records = vec![
            record(Some("B"), Some(3), Recommend::Yes),
            record(Some("A"), Some(3), Recommend::Yes),
            record(Some("C"), Some(3), Recommend::Yes),
            record(Some("C"), Some(3), Recommend::Yes),
        ];
        let topics = sorted_topics(&aggregate(&records));
        let names: Vec<&str> = topics.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
        assert_eq!(topic_share(topics[0].count, 4), 50.0);
    }
}
