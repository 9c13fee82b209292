//! Mentor response-time analytics.
//!
//! A *response* is a message from a mentor paired with the nearest earlier
//! message from a non-mentor (including senders that no longer resolve).
//! Several mentor messages after one non-mentor message each produce a
//! sample against that same message.
//!
//! The input must already be ordered by `created_at` ascending. The scan is
//! a single forward pass that remembers the most recent non-mentor message.
//! Latencies that are not strictly positive are discarded.

use serde::Serialize;

use crate::models::Message;

/// One mentor reply and the message it answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSample<'a> {
    pub response_time_ms: i64,
    pub mentor_message: &'a Message,
    pub preceding_non_mentor_message: &'a Message,
}

/// Aggregate response-time statistics for a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeStats<'a> {
    /// Arithmetic mean of all sample latencies, in milliseconds.
    pub average_time_ms: f64,
    /// `average_time_ms` as zero-padded `HH:MM`.
    pub average_time_formatted: String,
    pub response_count: usize,
    /// Samples in the order their mentor messages appear.
    pub response_times: Vec<ResponseSample<'a>>,
}

/// Compute mentor response-time statistics.
///
/// Returns `None` when there is no qualifying response, which callers
/// should present as "insufficient data" rather than zero.
pub fn analyze(messages: &[Message]) -> Option<ResponseTimeStats<'_>> {
    let mut last_non_mentor: Option<&Message> = None;
    let mut samples: Vec<ResponseSample<'_>> = Vec::new();

    for message in messages {
        if !message.is_from_mentor() {
            last_non_mentor = Some(message);
            continue;
        }

        let preceding = match last_non_mentor {
            Some(p) => p,
            None => continue,
        };

        let latency = (message.created_at - preceding.created_at).num_milliseconds();
        if latency <= 0 {
            continue;
        }

        samples.push(ResponseSample {
            response_time_ms: latency,
            mentor_message: message,
            preceding_non_mentor_message: preceding,
        });
    }

    if samples.is_empty() {
        return None;
    }

    let total: i64 = samples.iter().map(|s| s.response_time_ms).sum();
    let average = total as f64 / samples.len() as f64;

    Some(ResponseTimeStats {
        average_time_ms: average,
        average_time_formatted: format_hh_mm(average),
        response_count: samples.len(),
        response_times: samples,
    })
}

/// Render a millisecond duration as `HH:MM`, truncating seconds.
///
/// Hours are not wrapped at 24.
pub fn format_hh_mm(ms: f64) -> String {
    let total_minutes = (ms.max(0.0) / 60_000.0).floor() as u64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn msg(uuid: &str, roles: Option<&[&str]>, at: DateTime<Utc>) -> Message {
        Message {
            uuid: uuid.to_string(),
            conversation_uuid: "conv".to_string(),
            sender_uuid: format!("sender-{}", uuid),
            text: String::new(),
            created_at: at,
            updated_at: at,
            reactions: Vec::new(),
            read_by: Vec::new(),
            read_by_all: false,
            sender: roles.map(|r| User {
                uuid: format!("sender-{}", uuid),
                roles: r.iter().map(|s| s.to_string()).collect(),
                full_name: None,
                email: None,
            }),
        }
    }

    const MENTOR: Option<&[&str]> = Some(&["mentor"]);
    const STUDENT: Option<&[&str]> = Some(&["student"]);

    #[test]
    fn test_single_response() {
        let messages = vec![
            msg("m1", STUDENT, t0()),
            msg("m2", MENTOR, t0() + Duration::milliseconds(600_000)),
        ];
        let stats = analyze(&messages).unwrap();
        assert_eq!(stats.response_count, 1);
        assert!((stats.average_time_ms - 600_000.0).abs() < 1e-9);
        assert_eq!(stats.average_time_formatted, "00:10");
        assert_eq!(stats.response_times[0].mentor_message.uuid, "m2");
        assert_eq!(stats.response_times[0].preceding_non_mentor_message.uuid, "m1");
    }

    #[test]
    fn test_empty_is_none() {
        assert!(analyze(&[]).is_none());
    }

    #[test]
    fn test_mentor_only_is_none() {
        let messages = vec![msg("m1", MENTOR, t0())];
        assert!(analyze(&messages).is_none());
    }

    #[test]
    fn test_no_mentor_is_none() {
        let messages = vec![
            msg("m1", STUDENT, t0()),
            msg("m2", STUDENT, t0() + Duration::minutes(5)),
        ];
        assert!(analyze(&messages).is_none());
    }

    #[test]
    fn test_negative_latency_discarded() {
        let messages = vec![
            msg("m1", STUDENT, t0()),
            msg("m2", MENTOR, t0() - Duration::milliseconds(1000)),
        ];
        assert!(analyze(&messages).is_none());
    }

    #[test]
    fn test_zero_latency_discarded() {
        let messages = vec![msg("m1", STUDENT, t0()), msg("m2", MENTOR, t0())];
        assert!(analyze(&messages).is_none());
    }

    #[test]
    fn test_consecutive_mentor_replies_share_preceding() {
        let messages = vec![
            msg("m1", STUDENT, t0()),
            msg("m2", MENTOR, t0() + Duration::milliseconds(60_000)),
            msg("m3", MENTOR, t0() + Duration::milliseconds(120_000)),
        ];
        let stats = analyze(&messages).unwrap();
        assert_eq!(stats.response_count, 2);
        assert!(std::ptr::eq(
            stats.response_times[0].preceding_non_mentor_message,
            stats.response_times[1].preceding_non_mentor_message
        ));
        assert!((stats.average_time_ms - 90_000.0).abs() < 1e-9);
        assert_eq!(stats.average_time_formatted, "00:01");
    }

    #[test]
    fn test_unknown_sender_counts_as_non_mentor() {
        let messages = vec![
            msg("m1", None, t0()),
            msg("m2", MENTOR, t0() + Duration::minutes(3)),
        ];
        let stats = analyze(&messages).unwrap();
        assert_eq!(stats.response_count, 1);
        assert_eq!(stats.response_times[0].preceding_non_mentor_message.uuid, "m1");
    }

    #[test]
    fn test_nearest_preceding_non_mentor_is_used() {
        let messages = vec![
            msg("m1", STUDENT, t0()),
            msg("m2", Some(&["guardian"][..]), t0() + Duration::minutes(10)),
            msg("m3", MENTOR, t0() + Duration::minutes(15)),
            msg("m4", STUDENT, t0() + Duration::minutes(20)),
            msg("m5", MENTOR, t0() + Duration::minutes(50)),
        ];
        let stats = analyze(&messages).unwrap();
        assert_eq!(stats.response_count, 2);
        assert_eq!(stats.response_times[0].preceding_non_mentor_message.uuid, "m2");
        assert_eq!(stats.response_times[0].response_time_ms, 5 * 60_000);
        assert_eq!(stats.response_times[1].preceding_non_mentor_message.uuid, "m4");
        assert_eq!(stats.response_times[1].response_time_ms, 30 * 60_000);
        assert_eq!(stats.average_time_formatted, "00:17");
    }

    #[test]
    fn test_mixed_roles_with_mentor_count_as_mentor() {
        let messages = vec![
            msg("m1", STUDENT, t0()),
            msg("m2", Some(&["student", "mentor"][..]), t0() + Duration::minutes(1)),
        ];
        let stats = analyze(&messages).unwrap();
        assert_eq!(stats.response_count, 1);
    }

    #[test]
    fn test_format_hours_not_wrapped() {
        assert_eq!(format_hh_mm(30.0 * 3_600_000.0), "30:00");
        assert_eq!(format_hh_mm(0.0), "00:00");
        assert_eq!(format_hh_mm(59_999.0), "00:00");
        assert_eq!(format_hh_mm(3_660_000.0), "01:01");
        assert_eq!(format_hh_mm(100.0 * 3_600_000.0 + 5.0 * 60_000.0), "100:05");
    }
}
