//! Dashboard summaries over normalized collections.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Appointment, Entity, WellnessLogEntry};

/// Logs considered by the weekly summary.
const WEEK: usize = 7;
/// Longest streak we bother counting.
const MAX_STREAK_DAYS: u32 = 365;
/// Mood shown when no log has one.
const DEFAULT_MOOD: &str = "Good";

/// Aggregates over the most recent week of wellness logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessSummary {
    pub days_logged: usize,
    /// Average over days that logged any sleep
    pub avg_sleep: f64,
    pub total_steps: u64,
    /// Average over days that logged any water
    pub avg_water: f64,
    pub common_mood: String,
    pub exercise_days: usize,
}

/// Summarize the seven most recent logs by date.
pub fn weekly_summary(logs: &[WellnessLogEntry]) -> WellnessSummary {
    let mut recent: Vec<&WellnessLogEntry> = logs.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(WEEK);

    let sleep: Vec<f64> = recent.iter().map(|l| l.sleep).filter(|s| *s > 0.0).collect();
    let water: Vec<f64> = recent
        .iter()
        .map(|l| l.water_intake)
        .filter(|w| *w > 0.0)
        .collect();

    WellnessSummary {
        days_logged: recent.len(),
        avg_sleep: mean(&sleep),
        total_steps: recent.iter().map(|l| u64::from(l.steps)).sum(),
        avg_water: mean(&water),
        common_mood: common_mood(&recent),
        exercise_days: recent.iter().filter(|l| l.has_exercise()).count(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Most frequent logged mood; ties go to the mood seen first.
fn common_mood(logs: &[&WellnessLogEntry]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for log in logs.iter().filter(|l| l.has_mood()) {
        let count = counts.entry(log.mood.as_str()).or_insert(0);
        if *count == 0 {
            order.push(log.mood.as_str());
        }
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for mood in order {
        let count = counts.get(mood).copied().unwrap_or(0);
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((mood, count));
        }
    }
    best.map_or_else(|| DEFAULT_MOOD.to_string(), |(mood, _)| mood.to_string())
}

/// Consecutive logged days ending today, or yesterday if today has no log
/// yet.
pub fn logging_streak(logs: &[WellnessLogEntry], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = logs.iter().map(|l| l.date).collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while streak < MAX_STREAK_DAYS && days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentTiming {
    Today,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingAppointment {
    pub appointment: Appointment,
    pub timing: AppointmentTiming,
}

/// Open appointments from today on, soonest first.
pub fn upcoming_appointments(
    appointments: &[Appointment],
    today: NaiveDate,
) -> Vec<UpcomingAppointment> {
    let mut upcoming: Vec<UpcomingAppointment> = appointments
        .iter()
        .filter(|a| a.is_open() && a.date >= today)
        .map(|a| UpcomingAppointment {
            appointment: a.clone(),
            timing: if a.date == today {
                AppointmentTiming::Today
            } else {
                AppointmentTiming::Upcoming
            },
        })
        .collect();

    upcoming.sort_by(|a, b| {
        (a.appointment.date, &a.appointment.time).cmp(&(b.appointment.date, &b.appointment.time))
    });
    upcoming
}

/// The `limit` newest items by timestamp.
pub fn recently_added<T: Entity>(items: &[T], limit: usize) -> Vec<T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    sorted.into_iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medicine;
    use crate::normalizer::Normalizer;
    use serde_json::json;

    fn logs(values: serde_json::Value) -> Vec<WellnessLogEntry> {
        Normalizer::new().normalize_batch_as(&values)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    #[test]
    fn test_weekly_summary() {
        let logs = logs(json!([
            { "log_id": "1", "date": "2025-08-21", "sleep": 8, "steps": 10000, "water_intake": 8, "mood": "Great", "exercise": "Running" },
            { "log_id": "2", "date": "2025-08-20", "sleep": 6, "steps": 4000, "mood": "Good" },
            { "log_id": "3", "date": "2025-08-19", "steps": 2000, "mood": "Great", "water_intake": 6 }
        ]));
        let summary = weekly_summary(&logs);

        assert_eq!(summary.days_logged, 3);
        assert_eq!(summary.avg_sleep, 7.0);
        assert_eq!(summary.total_steps, 16000);
        assert_eq!(summary.avg_water, 7.0);
        assert_eq!(summary.common_mood, "Great");
        assert_eq!(summary.exercise_days, 1);
    }

    #[test]
    fn test_weekly_summary_uses_last_seven_days_only() {
        let values: Vec<_> = (1..=10)
            .map(|d| json!({ "log_id": d.to_string(), "date": format!("2025-08-{:02}", d), "steps": 100 }))
            .collect();
        let summary = weekly_summary(&logs(json!(values)));
        assert_eq!(summary.days_logged, 7);
        assert_eq!(summary.total_steps, 700);
        assert_eq!(summary.common_mood, "Good");
    }

    #[test]
    fn test_streak() {
        let logs = logs(json!([
            { "log_id": "a", "date": "2025-08-20" },
            { "log_id": "b", "date": "2025-08-19" },
            { "log_id": "c", "date": "2025-08-17" }
        ]));
        // Today not logged yet: count from yesterday
        assert_eq!(logging_streak(&logs, day(21)), 2);
        assert_eq!(logging_streak(&logs, day(20)), 2);
        assert_eq!(logging_streak(&logs, day(23)), 0);
    }

    #[test]
    fn test_upcoming_appointments() {
        let appointments: Vec<Appointment> = Normalizer::new().normalize_batch_as(&json!([
            { "appointment_id": "late", "date": "2025-08-25", "time": "09:00", "status": "confirmed" },
            { "appointment_id": "today-pm", "date": "2025-08-21", "time": "14:30" },
            { "appointment_id": "today-am", "date": "2025-08-21", "time": "09:00" },
            { "appointment_id": "past", "date": "2025-08-20", "time": "09:00" },
            { "appointment_id": "cancelled", "date": "2025-08-22", "status": "cancelled" }
        ]));
        let upcoming = upcoming_appointments(&appointments, day(21));
        let ids: Vec<_> = upcoming.iter().map(|u| u.appointment.id.as_str()).collect();

        assert_eq!(ids, vec!["today-am", "today-pm", "late"]);
        assert_eq!(upcoming[0].timing, AppointmentTiming::Today);
        assert_eq!(upcoming[2].timing, AppointmentTiming::Upcoming);
    }

    #[test]
    fn test_recently_added() {
        let medicines: Vec<Medicine> = Normalizer::new().normalize_batch_as(&json!([
            { "medicine_id": "old", "created_at": "2025-01-01T00:00:00Z" },
            { "medicine_id": "newest", "created_at": "2025-08-01T00:00:00Z" },
            { "medicine_id": "mid", "created_at": "2025-05-01T00:00:00Z" }
        ]));
        let recent = recently_added(&medicines, 2);
        let ids: Vec<_> = recent.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "mid"]);
    }
}
