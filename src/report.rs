use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregate::{
    alert_distribution, cohort_summary, department_engagement, engagement_factors,
    term_comparison, top_at_risk, trend_distribution, weekly_activity_trend,
};
use crate::models::EngagementRecord;

pub fn build_report(records: &[EngagementRecord], generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Academic Engagement Report");
    let _ = writeln!(
        output,
        "Generated {} over {} engagement records",
        generated_on,
        records.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Summary");

    match cohort_summary(records) {
        Some(summary) => {
            let _ = writeln!(output, "- Students tracked: {}", summary.total_students);
            let _ = writeln!(output, "- Average GPA: {:.2}", summary.avg_gpa);
            let _ = writeln!(
                output,
                "- Average attendance: {:.1}%",
                summary.avg_attendance
            );
            let _ = writeln!(
                output,
                "- Average assignments per week: {:.1}",
                summary.avg_assignments
            );
        }
        None => {
            let _ = writeln!(output, "No records in this dataset.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alert Distribution");

    let alerts = alert_distribution(records);
    if alerts.total() == 0 {
        let _ = writeln!(output, "No records in this dataset.");
    } else {
        let _ = writeln!(
            output,
            "- Green (low risk): {:.1}% ({} records)",
            alerts.green_percent(),
            alerts.green
        );
        let _ = writeln!(
            output,
            "- Yellow (medium risk): {:.1}% ({} records)",
            alerts.yellow_percent(),
            alerts.yellow
        );
        let _ = writeln!(
            output,
            "- Red (high risk): {:.1}% ({} records)",
            alerts.red_percent(),
            alerts.red
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Department Engagement");

    let departments = department_engagement(records);
    if departments.is_empty() {
        let _ = writeln!(output, "No departments recorded.");
    } else {
        for bucket in departments.iter() {
            let _ = writeln!(
                output,
                "- {}: avg score {:.1}, avg GPA {:.2} ({} records)",
                bucket.department, bucket.avg_activity_score, bucket.avg_gpa, bucket.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Engagement Factors by Department");

    let factors = engagement_factors(records);
    if factors.is_empty() {
        let _ = writeln!(output, "No departments recorded.");
    } else {
        for bucket in factors.iter() {
            let _ = writeln!(
                output,
                "- {}: avg assignments {:.1}, avg LMS logins {:.1}, avg attendance {:.1}% ({} records)",
                bucket.department,
                bucket.avg_assignments,
                bucket.avg_lms_logins,
                bucket.avg_attendance,
                bucket.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Term Comparison");

    let terms = term_comparison(records);
    if terms.is_empty() {
        let _ = writeln!(output, "No terms recorded.");
    } else {
        for bucket in terms.iter() {
            let _ = writeln!(
                output,
                "- {}: avg score {:.1}, avg GPA {:.2}, avg attendance {:.1}% ({} records)",
                bucket.term,
                bucket.avg_activity_score,
                bucket.avg_gpa,
                bucket.avg_attendance,
                bucket.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Activity Trend");

    let weeks = weekly_activity_trend(records);
    if weeks.is_empty() {
        let _ = writeln!(output, "No weekly records.");
    } else {
        for week in weeks.iter() {
            let _ = writeln!(
                output,
                "- Week {}: avg score {:.1} ({} records)",
                week.week_number, week.avg_activity_score, week.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Improvement Trends");

    let trends = trend_distribution(records);
    if records.is_empty() {
        let _ = writeln!(output, "No records in this dataset.");
    } else {
        let _ = writeln!(output, "- Improving: {} students", trends.improving);
        let _ = writeln!(output, "- Declining: {} students", trends.declining);
        let _ = writeln!(output, "- Stable: {} students", trends.stable);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");

    let ranked = top_at_risk(records, 10);
    if ranked.is_empty() {
        let _ = writeln!(output, "No students in this dataset.");
    } else {
        for record in ranked.iter() {
            let _ = writeln!(
                output,
                "- {} ({}, {}) score {:.1} [{}]",
                record.student_name,
                record.student_id,
                record.department,
                record.total_activity_score,
                record.alert_level
            );
        }
    }

    output
}
