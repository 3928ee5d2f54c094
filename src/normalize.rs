use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::{AlertLevel, EngagementRecord, ImprovementTrend};
use crate::risk::{classify_alert_level, compute_activity_score, EngagementInputs};

pub const DEFAULT_DEPARTMENT: &str = "General";
pub const DEFAULT_GENDER: &str = "Unknown";
pub const DEFAULT_ACADEMIC_YEAR: &str = "2024";
pub const DEFAULT_SCHOLARSHIP_STATUS: &str = "No";
pub const DEFAULT_COURSE_ID: &str = "COURSE001";
pub const DEFAULT_TERM: &str = "Fall 2024";

/// An untrusted row from the table source: column name to a value of unknown
/// shape. Cells may be strings, numbers, null, or missing entirely.
#[derive(Debug, Clone, Default)]
pub struct RawRow(BTreeMap<String, Value>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

/// Turn one raw row into a fully-populated record. Total: every malformed or
/// missing field degrades to its default, so downstream consumers never see a
/// partial record. `index` only seeds the placeholder identity for rows that
/// arrive without one.
pub fn normalize(row: &RawRow, index: usize) -> EngagementRecord {
    let inputs = EngagementInputs {
        lms_logins: signal_field(row, "lms_logins"),
        assignments_submitted: signal_field(row, "assignments_submitted"),
        attendance_rate: signal_field(row, "attendance_rate"),
        events_attended: signal_field(row, "events_attended"),
        office_hours_visits: signal_field(row, "office_hours_visits"),
        discussion_posts: signal_field(row, "discussion_posts"),
        library_visits: signal_field(row, "library_visits"),
    };

    // A source-supplied score wins over the computed one, but the [0,100]
    // invariant holds either way. The alert override must match a tier token
    // exactly; anything else derives from the resolved score.
    let total_activity_score = match number_field(row, "total_activity_score") {
        Some(value) => value.clamp(0.0, 100.0),
        None => compute_activity_score(&inputs),
    };
    let alert_level = enum_field(row, "alert_level", AlertLevel::from_token)
        .unwrap_or_else(|| classify_alert_level(total_activity_score));
    let improvement_trend = enum_field(row, "improvement_trend", ImprovementTrend::from_token)
        .unwrap_or(ImprovementTrend::Stable);

    EngagementRecord {
        student_id: string_field(row, "student_id", &format!("STU{:04}", index + 1)),
        student_name: string_field(row, "student_name", &format!("Student {}", index + 1)),
        department: string_field(row, "department", DEFAULT_DEPARTMENT),
        gender: string_field(row, "gender", DEFAULT_GENDER),
        age: positive_int_field(row, "age", 20),
        academic_year: string_field(row, "academic_year", DEFAULT_ACADEMIC_YEAR),
        gpa: number_field(row, "gpa").unwrap_or(0.0).clamp(0.0, 4.0),
        scholarship_status: string_field(row, "scholarship_status", DEFAULT_SCHOLARSHIP_STATUS),
        course_id: string_field(row, "course_id", DEFAULT_COURSE_ID),
        credit_hours: positive_int_field(row, "credit_hours", 3),
        week_number: positive_int_field(row, "week_number", 1),
        lms_logins: inputs.lms_logins,
        assignments_submitted: inputs.assignments_submitted,
        attendance_rate: inputs.attendance_rate,
        events_attended: inputs.events_attended,
        office_hours_visits: inputs.office_hours_visits,
        discussion_posts: inputs.discussion_posts,
        library_visits: inputs.library_visits,
        total_activity_score,
        alert_level,
        improvement_trend,
        advisor_comments: string_field(row, "advisor_comments", ""),
        term: string_field(row, "term", DEFAULT_TERM),
        data_generated: timestamp_field(row, "data_generated").unwrap_or_else(Utc::now),
    }
}

fn string_field(row: &RawRow, column: &str, default: &str) -> String {
    match row.get(column) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => default.to_string(),
    }
}

fn number_field(row: &RawRow, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// Engagement signals must be non-negative for the score to stay bounded.
fn signal_field(row: &RawRow, column: &str) -> f64 {
    number_field(row, column).unwrap_or(0.0).max(0.0)
}

fn positive_int_field(row: &RawRow, column: &str, default: u32) -> u32 {
    number_field(row, column)
        .map(f64::trunc)
        .filter(|value| *value >= 1.0 && *value <= u32::MAX as f64)
        .map(|value| value as u32)
        .unwrap_or(default)
}

fn enum_field<T>(row: &RawRow, column: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    match row.get(column)? {
        Value::String(token) => parse(token),
        _ => None,
    }
}

fn timestamp_field(row: &RawRow, column: &str) -> Option<DateTime<Utc>> {
    match row.get(column)? {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        _ => None,
    }
}
