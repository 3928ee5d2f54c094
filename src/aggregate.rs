use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::models::{
    AlertDistribution, AlertLevel, CohortSummary, DatasetOverview, DepartmentEngagement,
    EngagementFactors, EngagementRecord, ImprovementTrend, TermComparison, TrendDistribution,
    WeeklyActivity,
};

/// Collapse weekly records down to one per student: the record with the
/// highest week number. Ties keep the first-seen record, and output order is
/// the order each student first appeared in the input.
pub fn reduce_to_latest_per_student(records: &[EngagementRecord]) -> Vec<EngagementRecord> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<EngagementRecord> = Vec::new();

    for record in records {
        match positions.get(record.student_id.as_str()) {
            Some(&position) => {
                if record.week_number > latest[position].week_number {
                    latest[position] = record.clone();
                }
            }
            None => {
                positions.insert(record.student_id.as_str(), latest.len());
                latest.push(record.clone());
            }
        }
    }

    latest
}

// Single-pass sum/count accumulation per key, keys emitted in first-seen
// order. Every emitted key has count >= 1, so the averages never divide by
// zero.
fn grouped_averages<K, F, const N: usize>(
    records: &[EngagementRecord],
    key_fn: F,
    value_fns: [fn(&EngagementRecord) -> f64; N],
) -> Vec<(K, [f64; N], usize)>
where
    K: Clone + Eq + Hash,
    F: Fn(&EngagementRecord) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut buckets: Vec<(K, [f64; N], usize)> = Vec::new();

    for record in records {
        let key = key_fn(record);
        let position = *index.entry(key.clone()).or_insert_with(|| {
            buckets.push((key.clone(), [0.0; N], 0));
            buckets.len() - 1
        });
        let (_, sums, count) = &mut buckets[position];
        for (sum, value_fn) in sums.iter_mut().zip(value_fns.iter()) {
            *sum += value_fn(record);
        }
        *count += 1;
    }

    buckets
        .into_iter()
        .map(|(key, sums, count)| (key, sums.map(|sum| sum / count as f64), count))
        .collect()
}

pub fn department_engagement(records: &[EngagementRecord]) -> Vec<DepartmentEngagement> {
    grouped_averages(
        records,
        |record| record.department.clone(),
        [
            |record: &EngagementRecord| record.total_activity_score,
            |record: &EngagementRecord| record.gpa,
        ],
    )
    .into_iter()
    .map(
        |(department, [avg_activity_score, avg_gpa], count)| DepartmentEngagement {
            department,
            avg_activity_score,
            avg_gpa,
            count,
        },
    )
    .collect()
}

pub fn term_comparison(records: &[EngagementRecord]) -> Vec<TermComparison> {
    let mut terms: Vec<TermComparison> = grouped_averages(
        records,
        |record| record.term.clone(),
        [
            |record: &EngagementRecord| record.total_activity_score,
            |record: &EngagementRecord| record.gpa,
            |record: &EngagementRecord| record.attendance_rate,
        ],
    )
    .into_iter()
    .map(
        |(term, [avg_activity_score, avg_gpa, avg_attendance], count)| TermComparison {
            term,
            avg_activity_score,
            avg_gpa,
            avg_attendance,
            count,
        },
    )
    .collect();

    terms.sort_by(|a, b| a.term.cmp(&b.term));
    terms
}

pub fn weekly_activity_trend(records: &[EngagementRecord]) -> Vec<WeeklyActivity> {
    let mut weeks: Vec<WeeklyActivity> = grouped_averages(
        records,
        |record| record.week_number,
        [|record: &EngagementRecord| record.total_activity_score],
    )
    .into_iter()
    .map(|(week_number, [avg_activity_score], count)| WeeklyActivity {
        week_number,
        avg_activity_score,
        count,
    })
    .collect();

    weeks.sort_by_key(|week| week.week_number);
    weeks
}

pub fn engagement_factors(records: &[EngagementRecord]) -> Vec<EngagementFactors> {
    grouped_averages(
        records,
        |record| record.department.clone(),
        [
            |record: &EngagementRecord| record.assignments_submitted,
            |record: &EngagementRecord| record.lms_logins,
            |record: &EngagementRecord| record.attendance_rate,
        ],
    )
    .into_iter()
    .map(
        |(department, [avg_assignments, avg_lms_logins, avg_attendance], count)| {
            EngagementFactors {
                department,
                avg_assignments,
                avg_lms_logins,
                avg_attendance,
                count,
            }
        },
    )
    .collect()
}

pub fn alert_distribution(records: &[EngagementRecord]) -> AlertDistribution {
    let mut distribution = AlertDistribution::default();
    for record in records {
        match record.alert_level {
            AlertLevel::Green => distribution.green += 1,
            AlertLevel::Yellow => distribution.yellow += 1,
            AlertLevel::Red => distribution.red += 1,
        }
    }
    distribution
}

pub fn trend_distribution(records: &[EngagementRecord]) -> TrendDistribution {
    let mut distribution = TrendDistribution::default();
    for record in records {
        match record.improvement_trend {
            ImprovementTrend::Improving => distribution.improving += 1,
            ImprovementTrend::Declining => distribution.declining += 1,
            ImprovementTrend::Stable => distribution.stable += 1,
        }
    }
    distribution
}

pub fn cohort_summary(records: &[EngagementRecord]) -> Option<CohortSummary> {
    if records.is_empty() {
        return None;
    }
    let total = records.len() as f64;
    let avg = |value_fn: fn(&EngagementRecord) -> f64| -> f64 {
        records.iter().map(value_fn).sum::<f64>() / total
    };

    Some(CohortSummary {
        total_students: records.len(),
        avg_gpa: avg(|record| record.gpa),
        avg_attendance: avg(|record| record.attendance_rate),
        avg_assignments: avg(|record| record.assignments_submitted),
        alerts: alert_distribution(records),
    })
}

pub fn dataset_overview(records: &[EngagementRecord]) -> Option<DatasetOverview> {
    if records.is_empty() {
        return None;
    }
    let total = records.len() as f64;
    let avg = |value_fn: fn(&EngagementRecord) -> f64| -> f64 {
        records.iter().map(value_fn).sum::<f64>() / total
    };
    let departments: HashSet<&str> = records
        .iter()
        .map(|record| record.department.as_str())
        .collect();
    let terms: HashSet<&str> = records.iter().map(|record| record.term.as_str()).collect();

    Some(DatasetOverview {
        total_records: records.len(),
        department_count: departments.len(),
        term_count: terms.len(),
        avg_credit_hours: avg(|record| record.credit_hours as f64),
        avg_attendance: avg(|record| record.attendance_rate),
        avg_assignments: avg(|record| record.assignments_submitted),
        avg_library_visits: avg(|record| record.library_visits),
        avg_lms_logins: avg(|record| record.lms_logins),
        avg_activity_score: avg(|record| record.total_activity_score),
    })
}

/// Students carrying the highest risk: lowest composite scores first. The
/// sort is stable, so equal scores keep input order.
pub fn top_at_risk(records: &[EngagementRecord], limit: usize) -> Vec<EngagementRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| {
        a.total_activity_score
            .partial_cmp(&b.total_activity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Case-insensitive match against student name or id.
    pub search: Option<String>,
    pub department: Option<String>,
    pub alert_level: Option<AlertLevel>,
    pub min_gpa: Option<f64>,
    /// Exclusive upper bound, so GPA bands compose without overlap.
    pub max_gpa: Option<f64>,
}

impl RecordFilter {
    fn matches(&self, record: &EngagementRecord) -> bool {
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            if !record.student_name.to_lowercase().contains(&needle)
                && !record.student_id.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if &record.department != department {
                return false;
            }
        }
        if let Some(alert_level) = self.alert_level {
            if record.alert_level != alert_level {
                return false;
            }
        }
        if let Some(min_gpa) = self.min_gpa {
            if record.gpa < min_gpa {
                return false;
            }
        }
        if let Some(max_gpa) = self.max_gpa {
            if record.gpa >= max_gpa {
                return false;
            }
        }
        true
    }
}

pub fn filter_records(records: &[EngagementRecord], filter: &RecordFilter) -> Vec<EngagementRecord> {
    records
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(id: &str, week: u32) -> EngagementRecord {
        EngagementRecord {
            student_id: id.to_string(),
            student_name: format!("Student {id}"),
            department: "General".to_string(),
            gender: "Unknown".to_string(),
            age: 20,
            academic_year: "2024".to_string(),
            gpa: 3.0,
            scholarship_status: "No".to_string(),
            course_id: "COURSE001".to_string(),
            credit_hours: 3,
            week_number: week,
            lms_logins: 0.0,
            assignments_submitted: 0.0,
            attendance_rate: 0.0,
            events_attended: 0.0,
            office_hours_visits: 0.0,
            discussion_posts: 0.0,
            library_visits: 0.0,
            total_activity_score: 50.0,
            alert_level: AlertLevel::Yellow,
            improvement_trend: ImprovementTrend::Stable,
            advisor_comments: String::new(),
            term: "Fall 2024".to_string(),
            data_generated: Utc::now(),
        }
    }

    #[test]
    fn reducer_keeps_the_highest_week_per_student() {
        let records = vec![sample("A", 1), sample("A", 3), sample("A", 2)];
        let latest = reduce_to_latest_per_student(&records);

        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].week_number, 3);
    }

    #[test]
    fn reducer_breaks_week_ties_toward_the_first_seen_record() {
        let mut first = sample("B", 2);
        first.student_name = "first".to_string();
        let mut second = sample("B", 2);
        second.student_name = "second".to_string();

        let latest = reduce_to_latest_per_student(&[first, second]);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].student_name, "first");
    }

    #[test]
    fn reducer_preserves_first_appearance_order() {
        let records = vec![sample("B", 1), sample("A", 5), sample("B", 9)];
        let latest = reduce_to_latest_per_student(&records);

        let ids: Vec<&str> = latest
            .iter()
            .map(|record| record.student_id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(latest[0].week_number, 9);
    }

    #[test]
    fn department_averages_follow_first_seen_order() {
        let mut a = sample("A", 1);
        a.department = "CS".to_string();
        a.total_activity_score = 80.0;
        let mut b = sample("B", 1);
        b.department = "CS".to_string();
        b.total_activity_score = 60.0;
        let mut c = sample("C", 1);
        c.department = "Arts".to_string();
        c.total_activity_score = 90.0;

        let buckets = department_engagement(&[a, b, c]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].department, "CS");
        assert_eq!(buckets[0].avg_activity_score, 70.0);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].department, "Arts");
        assert_eq!(buckets[1].avg_activity_score, 90.0);
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn term_comparison_is_lexicographically_sorted() {
        let mut spring = sample("A", 1);
        spring.term = "Spring 2024".to_string();
        spring.attendance_rate = 60.0;
        let mut fall = sample("B", 1);
        fall.term = "Fall 2024".to_string();
        fall.attendance_rate = 80.0;

        let terms = term_comparison(&[spring, fall]);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].term, "Fall 2024");
        assert_eq!(terms[0].avg_attendance, 80.0);
        assert_eq!(terms[1].term, "Spring 2024");
    }

    #[test]
    fn weekly_trend_sorts_weeks_numerically() {
        let mut late = sample("A", 12);
        late.total_activity_score = 40.0;
        let mut early = sample("B", 2);
        early.total_activity_score = 80.0;
        let mut also_late = sample("C", 12);
        also_late.total_activity_score = 60.0;

        let weeks = weekly_activity_trend(&[late, early, also_late]);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].week_number, 2);
        assert_eq!(weeks[0].avg_activity_score, 80.0);
        assert_eq!(weeks[1].week_number, 12);
        assert_eq!(weeks[1].avg_activity_score, 50.0);
        assert_eq!(weeks[1].count, 2);
    }

    #[test]
    fn engagement_factors_average_per_department() {
        let mut a = sample("A", 1);
        a.department = "CS".to_string();
        a.assignments_submitted = 4.0;
        a.lms_logins = 10.0;
        a.attendance_rate = 90.0;
        let mut b = sample("B", 1);
        b.department = "CS".to_string();
        b.assignments_submitted = 2.0;
        b.lms_logins = 20.0;
        b.attendance_rate = 70.0;

        let factors = engagement_factors(&[a, b]);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].avg_assignments, 3.0);
        assert_eq!(factors[0].avg_lms_logins, 15.0);
        assert_eq!(factors[0].avg_attendance, 80.0);
    }

    #[test]
    fn distributions_count_every_record() {
        let mut green = sample("A", 1);
        green.alert_level = AlertLevel::Green;
        green.improvement_trend = ImprovementTrend::Improving;
        let mut red = sample("B", 1);
        red.alert_level = AlertLevel::Red;
        red.improvement_trend = ImprovementTrend::Declining;
        let yellow = sample("C", 1);

        let records = vec![green, red, yellow];
        let alerts = alert_distribution(&records);
        assert_eq!(alerts.green, 1);
        assert_eq!(alerts.yellow, 1);
        assert_eq!(alerts.red, 1);
        assert!((alerts.green_percent() - 100.0 / 3.0).abs() < 1e-9);

        let trends = trend_distribution(&records);
        assert_eq!(trends.improving, 1);
        assert_eq!(trends.declining, 1);
        assert_eq!(trends.stable, 1);
    }

    #[test]
    fn cohort_summary_is_none_for_an_empty_dataset() {
        assert!(cohort_summary(&[]).is_none());
        assert!(dataset_overview(&[]).is_none());
    }

    #[test]
    fn cohort_summary_averages_the_whole_collection() {
        let mut a = sample("A", 1);
        a.gpa = 4.0;
        a.attendance_rate = 100.0;
        a.assignments_submitted = 5.0;
        let mut b = sample("B", 1);
        b.gpa = 2.0;
        b.attendance_rate = 50.0;
        b.assignments_submitted = 1.0;

        let summary = cohort_summary(&[a, b]).expect("summary");
        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.avg_gpa, 3.0);
        assert_eq!(summary.avg_attendance, 75.0);
        assert_eq!(summary.avg_assignments, 3.0);
    }

    #[test]
    fn dataset_overview_counts_distinct_dimensions() {
        let mut a = sample("A", 1);
        a.department = "CS".to_string();
        a.term = "Fall 2024".to_string();
        let mut b = sample("B", 1);
        b.department = "Arts".to_string();
        b.term = "Spring 2024".to_string();
        let mut c = sample("C", 1);
        c.department = "CS".to_string();
        c.term = "Fall 2024".to_string();

        let overview = dataset_overview(&[a, b, c]).expect("overview");
        assert_eq!(overview.total_records, 3);
        assert_eq!(overview.department_count, 2);
        assert_eq!(overview.term_count, 2);
    }

    #[test]
    fn top_at_risk_ranks_lowest_scores_first() {
        let mut a = sample("A", 1);
        a.total_activity_score = 80.0;
        let mut b = sample("B", 1);
        b.total_activity_score = 20.0;
        let mut c = sample("C", 1);
        c.total_activity_score = 55.0;

        let ranked = top_at_risk(&[a, b, c], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].student_id, "B");
        assert_eq!(ranked[1].student_id, "C");
    }

    #[test]
    fn filters_compose() {
        let mut match_all = sample("STU0001", 1);
        match_all.student_name = "Avery Lee".to_string();
        match_all.department = "CS".to_string();
        match_all.alert_level = AlertLevel::Red;
        match_all.gpa = 3.2;
        let mut wrong_department = match_all.clone();
        wrong_department.student_id = "STU0002".to_string();
        wrong_department.department = "Arts".to_string();
        let mut gpa_out_of_band = match_all.clone();
        gpa_out_of_band.student_id = "STU0003".to_string();
        gpa_out_of_band.gpa = 3.5;

        let records = vec![match_all, wrong_department, gpa_out_of_band];
        let filter = RecordFilter {
            search: Some("avery".to_string()),
            department: Some("CS".to_string()),
            alert_level: Some(AlertLevel::Red),
            min_gpa: Some(3.0),
            max_gpa: Some(3.5),
        };

        let matched = filter_records(&records, &filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].student_id, "STU0001");
    }
}
