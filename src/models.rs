use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Three-tier risk classification derived from the composite activity score.
/// A source row may carry its own value, accepted only on an exact token match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertLevel {
    Green,
    Yellow,
    Red,
}

impl AlertLevel {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Green" => Some(AlertLevel::Green),
            "Yellow" => Some(AlertLevel::Yellow),
            "Red" => Some(AlertLevel::Red),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Green => "Green",
            AlertLevel::Yellow => "Yellow",
            AlertLevel::Red => "Red",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImprovementTrend {
    Improving,
    Declining,
    Stable,
}

impl ImprovementTrend {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Improving" => Some(ImprovementTrend::Improving),
            "Declining" => Some(ImprovementTrend::Declining),
            "Stable" => Some(ImprovementTrend::Stable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImprovementTrend::Improving => "Improving",
            ImprovementTrend::Declining => "Declining",
            ImprovementTrend::Stable => "Stable",
        }
    }
}

impl fmt::Display for ImprovementTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-student, per-week engagement row after normalization. Field order
/// here is the column order of CSV exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementRecord {
    pub student_id: String,
    pub student_name: String,
    pub department: String,
    pub gender: String,
    pub age: u32,
    pub academic_year: String,
    pub gpa: f64,
    pub scholarship_status: String,
    pub course_id: String,
    pub credit_hours: u32,
    pub week_number: u32,
    pub lms_logins: f64,
    pub assignments_submitted: f64,
    pub attendance_rate: f64,
    pub events_attended: f64,
    pub office_hours_visits: f64,
    pub discussion_posts: f64,
    pub library_visits: f64,
    pub total_activity_score: f64,
    pub alert_level: AlertLevel,
    pub improvement_trend: ImprovementTrend,
    pub advisor_comments: String,
    pub term: String,
    pub data_generated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DepartmentEngagement {
    pub department: String,
    pub avg_activity_score: f64,
    pub avg_gpa: f64,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct TermComparison {
    pub term: String,
    pub avg_activity_score: f64,
    pub avg_gpa: f64,
    pub avg_attendance: f64,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct WeeklyActivity {
    pub week_number: u32,
    pub avg_activity_score: f64,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct EngagementFactors {
    pub department: String,
    pub avg_assignments: f64,
    pub avg_lms_logins: f64,
    pub avg_attendance: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertDistribution {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

impl AlertDistribution {
    pub fn total(&self) -> usize {
        self.green + self.yellow + self.red
    }

    pub fn green_percent(&self) -> f64 {
        percent(self.green, self.total())
    }

    pub fn yellow_percent(&self) -> f64 {
        percent(self.yellow, self.total())
    }

    pub fn red_percent(&self) -> f64 {
        percent(self.red, self.total())
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendDistribution {
    pub improving: usize,
    pub declining: usize,
    pub stable: usize,
}

#[derive(Debug, Clone)]
pub struct CohortSummary {
    pub total_students: usize,
    pub avg_gpa: f64,
    pub avg_attendance: f64,
    pub avg_assignments: f64,
    pub alerts: AlertDistribution,
}

#[derive(Debug, Clone)]
pub struct DatasetOverview {
    pub total_records: usize,
    pub department_count: usize,
    pub term_count: usize,
    pub avg_credit_hours: f64,
    pub avg_attendance: f64,
    pub avg_assignments: f64,
    pub avg_library_visits: f64,
    pub avg_lms_logins: f64,
    pub avg_activity_score: f64,
}

/// Row shape for the advisor-comment export. The renamed headers are the
/// column titles advisors see in the downloaded file.
#[derive(Debug, Clone, Serialize)]
pub struct CommentExportRow {
    #[serde(rename = "Student ID")]
    pub student_id: String,
    #[serde(rename = "Student Name")]
    pub student_name: String,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
}
