use chrono::Utc;
use rand::Rng;

use crate::models::{EngagementRecord, ImprovementTrend};
use crate::risk::{classify_alert_level, compute_activity_score, EngagementInputs};

const DEPARTMENTS: [&str; 5] = [
    "Computer Science",
    "Engineering",
    "Business",
    "Arts",
    "Science",
];
const GENDERS: [&str; 3] = ["Male", "Female", "Non-binary"];
const TRENDS: [ImprovementTrend; 3] = [
    ImprovementTrend::Improving,
    ImprovementTrend::Declining,
    ImprovementTrend::Stable,
];
const TERMS: [&str; 2] = ["Fall 2024", "Spring 2024"];
const CREDIT_HOURS: [u32; 3] = [3, 4, 5];

/// Generate a plausible sample dataset. Used as the loader fallback and by
/// the `generate` command.
pub fn generate_records(count: usize) -> Vec<EngagementRecord> {
    generate_with(&mut rand::thread_rng(), count)
}

pub fn generate_with<R: Rng>(rng: &mut R, count: usize) -> Vec<EngagementRecord> {
    (0..count)
        .map(|index| {
            let inputs = EngagementInputs {
                lms_logins: rng.gen_range(0..20) as f64,
                assignments_submitted: rng.gen_range(0..5) as f64,
                attendance_rate: rng.gen_range(0..100) as f64,
                events_attended: rng.gen_range(0..5) as f64,
                office_hours_visits: rng.gen_range(0..5) as f64,
                discussion_posts: rng.gen_range(0..10) as f64,
                library_visits: rng.gen_range(0..10) as f64,
            };
            let score = compute_activity_score(&inputs);

            EngagementRecord {
                student_id: format!("STU{:04}", index + 1),
                student_name: format!("Student {}", index + 1),
                department: DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())].to_string(),
                gender: GENDERS[rng.gen_range(0..GENDERS.len())].to_string(),
                age: rng.gen_range(18..26),
                academic_year: (2020 + rng.gen_range(0..4)).to_string(),
                gpa: rng.gen_range(200..=400) as f64 / 100.0,
                scholarship_status: if rng.gen_bool(0.5) { "Yes" } else { "No" }.to_string(),
                course_id: format!("COURSE{:03}", rng.gen_range(1..=10)),
                credit_hours: CREDIT_HOURS[rng.gen_range(0..CREDIT_HOURS.len())],
                week_number: rng.gen_range(1..=16),
                lms_logins: inputs.lms_logins,
                assignments_submitted: inputs.assignments_submitted,
                attendance_rate: inputs.attendance_rate,
                events_attended: inputs.events_attended,
                office_hours_visits: inputs.office_hours_visits,
                discussion_posts: inputs.discussion_posts,
                library_visits: inputs.library_visits,
                total_activity_score: score,
                alert_level: classify_alert_level(score),
                improvement_trend: TRENDS[rng.gen_range(0..TRENDS.len())],
                advisor_comments: String::new(),
                term: TERMS[rng.gen_range(0..TERMS.len())].to_string(),
                data_generated: Utc::now(),
            }
        })
        .collect()
}
