use crate::models::AlertLevel;

/// The seven engagement signals feeding the composite score, already coerced
/// to non-negative floats.
#[derive(Debug, Clone, Default)]
pub struct EngagementInputs {
    pub lms_logins: f64,
    pub assignments_submitted: f64,
    pub attendance_rate: f64,
    pub events_attended: f64,
    pub office_hours_visits: f64,
    pub discussion_posts: f64,
    pub library_visits: f64,
}

/// Weighted composite of the engagement signals, each normalized against its
/// nominal weekly ceiling, expressed as a 0-100 percentage. Inputs past their
/// ceiling cannot push the result past 100.
pub fn compute_activity_score(inputs: &EngagementInputs) -> f64 {
    let weighted = 0.20 * (inputs.assignments_submitted / 5.0)
        + 0.20 * (inputs.attendance_rate / 100.0)
        + 0.15 * (inputs.lms_logins / 20.0)
        + 0.15 * (inputs.library_visits / 10.0)
        + 0.10 * (inputs.events_attended / 5.0)
        + 0.10 * (inputs.office_hours_visits / 5.0)
        + 0.10 * (inputs.discussion_posts / 10.0);

    (weighted * 100.0).clamp(0.0, 100.0)
}

pub fn classify_alert_level(score: f64) -> AlertLevel {
    if score >= 70.0 {
        AlertLevel::Green
    } else if score >= 40.0 {
        AlertLevel::Yellow
    } else {
        AlertLevel::Red
    }
}
