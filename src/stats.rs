// src/stats.rs

//! Dashboard aggregation over stored session records.
//!
//! Everything here is pure: records in, report out. Empty or single-session
//! inputs produce defined defaults instead of dividing by zero.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    activities::{Activity, ScoreRange, Skill, catalog},
    models::session_record::SessionRecord,
};

/// Sessions compared at each end of the history for the progress rate.
const TREND_SAMPLE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "7d")]
    Last7,
    #[serde(rename = "30d")]
    Last30,
    #[serde(rename = "90d")]
    Last90,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl Window {
    pub fn days(self) -> Option<i64> {
        match self {
            Window::Last7 => Some(7),
            Window::Last30 => Some(30),
            Window::Last90 => Some(90),
            Window::All => None,
        }
    }

    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|d| now - Duration::days(d))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    High,
    Medium,
    Low,
    Insufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Excellent,
    Good,
    Regular,
    Irregular,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Steady,
    Declining,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub completed_at: DateTime<Utc>,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub activity: &'static str,
    pub title: &'static str,
    pub skill: Skill,
    pub sessions: usize,
    pub average_score: i64,
    pub best_score: i64,
    pub latest_score: Option<i64>,
    pub goal_percent: i64,
    /// Goal minus average. Zero or negative means the goal is met.
    pub distance_to_goal: i64,
    pub goal_met: bool,
    pub coefficient_of_variation: Option<f64>,
    pub consistency: Consistency,
    pub sessions_per_week: f64,
    pub max_gap_days: i64,
    pub frequency: Frequency,
    pub progress_rate: i64,
    pub trend: Trend,
    pub series: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub window: Window,
    pub generated_at: DateTime<Utc>,
    pub total_sessions: usize,
    pub active_days: usize,
    pub current_streak_days: u32,
    pub overall_average: i64,
    pub activities: Vec<ActivityStats>,
}

/// Rescales a raw score onto 0..=100, clamping values outside the range.
pub fn normalize(raw: i64, range: ScoreRange) -> i64 {
    if range.max <= range.min {
        return 0;
    }
    let ratio = (raw - range.min) as f64 / (range.max - range.min) as f64;
    (ratio * 100.0).clamp(0.0, 100.0).round() as i64
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

/// Population coefficient of variation in percent. `None` below two values.
pub fn coefficient_of_variation(values: &[i64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values);
    if avg == 0.0 {
        return Some(0.0);
    }
    let variance = values
        .iter()
        .map(|v| (*v as f64 - avg).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt() / avg * 100.0)
}

pub fn classify_consistency(cv: Option<f64>) -> Consistency {
    match cv {
        None => Consistency::Insufficient,
        Some(cv) if cv < 15.0 => Consistency::High,
        Some(cv) if cv < 30.0 => Consistency::Medium,
        Some(_) => Consistency::Low,
    }
}

pub fn classify_frequency(sessions: usize, per_week: f64) -> Frequency {
    if sessions < 2 {
        return Frequency::New;
    }
    if per_week >= 3.0 {
        Frequency::Excellent
    } else if per_week >= 2.0 {
        Frequency::Good
    } else if per_week >= 1.0 {
        Frequency::Regular
    } else {
        Frequency::Irregular
    }
}

/// `(sessions per week, longest gap in days)` for chronologically sorted dates.
///
/// The span counts calendar days inclusively, so two sessions on the same day
/// span one day.
pub fn practice_frequency(dates: &[NaiveDate]) -> (f64, i64) {
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return (0.0, 0);
    };
    let span_days = (*last - *first).num_days() + 1;
    let weeks = (span_days as f64 / 7.0).max(1.0);
    let max_gap = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .max()
        .unwrap_or(0);
    (dates.len() as f64 / weeks, max_gap)
}

/// Mean of the last sample minus mean of the first, or last minus first when
/// there are fewer sessions than a full sample.
pub fn progress_rate(scores: &[i64]) -> i64 {
    let n = scores.len();
    if n >= TREND_SAMPLE {
        (mean(&scores[n - TREND_SAMPLE..]) - mean(&scores[..TREND_SAMPLE])).round() as i64
    } else if n >= 2 {
        scores[n - 1] - scores[0]
    } else {
        0
    }
}

fn trend_of(rate: i64) -> Trend {
    match rate.signum() {
        1 => Trend::Improving,
        -1 => Trend::Declining,
        _ => Trend::Steady,
    }
}

fn activity_stats(activity: &'static Activity, sessions: &[&SessionRecord]) -> ActivityStats {
    let scores: Vec<i64> = sessions
        .iter()
        .map(|s| normalize(s.final_score, activity.score_range))
        .collect();
    let dates: Vec<NaiveDate> = sessions.iter().map(|s| s.completed_at.date_naive()).collect();

    let average_score = mean(&scores).round() as i64;
    let goal_percent = activity.goal_percent as i64;
    let distance_to_goal = goal_percent - average_score;
    let cv = coefficient_of_variation(&scores);
    let (per_week, max_gap_days) = practice_frequency(&dates);
    let rate = progress_rate(&scores);

    ActivityStats {
        activity: activity.key,
        title: activity.title,
        skill: activity.skill,
        sessions: sessions.len(),
        average_score,
        best_score: scores.iter().copied().max().unwrap_or(0),
        latest_score: scores.last().copied(),
        goal_percent,
        distance_to_goal,
        goal_met: !scores.is_empty() && distance_to_goal <= 0,
        coefficient_of_variation: cv.map(|v| (v * 10.0).round() / 10.0),
        consistency: classify_consistency(cv),
        sessions_per_week: (per_week * 100.0).round() / 100.0,
        max_gap_days,
        frequency: classify_frequency(sessions.len(), per_week),
        progress_rate: rate,
        trend: trend_of(rate),
        series: sessions
            .iter()
            .zip(&scores)
            .map(|(s, score)| ChartPoint {
                completed_at: s.completed_at,
                score: *score,
            })
            .collect(),
    }
}

/// Consecutive practice days ending today, or yesterday when today has no
/// session yet.
fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut day = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };
    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Builds the dashboard for one user's records. Records of activities that
/// are not in the catalog are skipped.
pub fn aggregate(records: &[SessionRecord], window: Window, now: DateTime<Utc>) -> DashboardReport {
    let since = window.since(now);
    let mut in_window: Vec<&SessionRecord> = records
        .iter()
        .filter(|r| since.is_none_or(|s| r.completed_at >= s))
        .collect();
    in_window.sort_by_key(|r| r.completed_at);

    let mut by_activity: HashMap<&str, Vec<&SessionRecord>> = HashMap::new();
    for record in &in_window {
        by_activity
            .entry(record.activity_name.as_str())
            .or_default()
            .push(record);
    }

    let activities: Vec<ActivityStats> = catalog()
        .iter()
        .map(|activity| {
            let sessions = by_activity
                .get(activity.key)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            activity_stats(activity, sessions)
        })
        .collect();

    let all_scores: Vec<i64> = activities
        .iter()
        .flat_map(|a| a.series.iter().map(|p| p.score))
        .collect();
    let days: BTreeSet<NaiveDate> = activities
        .iter()
        .flat_map(|a| a.series.iter().map(|p| p.completed_at.date_naive()))
        .collect();

    DashboardReport {
        window,
        generated_at: now,
        total_sessions: all_scores.len(),
        active_days: days.len(),
        current_streak_days: current_streak(&days, now.date_naive()),
        overall_average: mean(&all_scores).round() as i64,
        activities,
    }
}
