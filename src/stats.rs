use crate::leaderboard::{badges_for_total, next_badge};
use crate::models::{
    CommunityResponse, DailyPoint, Entry, EntryType, StatusResponse, SummaryResponse, User,
};
use crate::savings::equivalents;
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::{BTreeMap, HashSet};

const WINDOW_DAYS: i64 = 7;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn logged_on(entries: &[Entry], entry_type: EntryType, date: NaiveDate) -> bool {
    entries
        .iter()
        .any(|entry| entry.entry_type == entry_type && entry.date == date)
}

/// True when a weekly entry falls in the same ISO week as `date`.
pub fn logged_in_week(entries: &[Entry], date: NaiveDate) -> bool {
    let week = date.iso_week();
    entries
        .iter()
        .any(|entry| entry.entry_type == EntryType::Weekly && entry.date.iso_week() == week)
}

/// Whether a submission of `entry_type` dated `date` is already covered.
pub fn already_logged(entries: &[Entry], entry_type: EntryType, date: NaiveDate) -> bool {
    match entry_type {
        EntryType::Daily => logged_on(entries, EntryType::Daily, date),
        EntryType::Weekly => logged_in_week(entries, date),
    }
}

/// Consecutive days ending at `today` with at least one entry of any type.
pub fn streak_at(today: NaiveDate, entries: &[Entry]) -> u32 {
    let dates: HashSet<NaiveDate> = entries.iter().map(|entry| entry.date).collect();
    let mut streak = 0;
    let mut cursor = today;
    while dates.contains(&cursor) {
        streak += 1;
        cursor = cursor - Duration::days(1);
    }
    streak
}

pub fn build_status_at(today: NaiveDate, entries: &[Entry]) -> StatusResponse {
    StatusResponse {
        date: date_key(today),
        week: week_label(today),
        logged_today: logged_on(entries, EntryType::Daily, today),
        logged_this_week: logged_in_week(entries, today),
        streak: streak_at(today, entries),
    }
}

/// Savings dated within the last seven days, today included.
pub fn window_sum_at(today: NaiveDate, entries: &[Entry]) -> f64 {
    let start = window_start(today);
    entries
        .iter()
        .filter(|entry| entry.date >= start && entry.date <= today)
        .map(|entry| entry.co2_saved)
        .sum()
}

pub fn build_summary_at(today: NaiveDate, user: &User, entries: &[Entry]) -> SummaryResponse {
    let total: f64 = entries.iter().map(|entry| entry.co2_saved).sum();
    let weekly_sum = window_sum_at(today, entries);
    let progress = if user.weekly_goal > 0.0 {
        (weekly_sum / user.weekly_goal).min(1.0)
    } else {
        0.0
    };

    SummaryResponse {
        total_co2_saved: total,
        entry_count: entries.len(),
        weekly_sum,
        weekly_goal: user.weekly_goal,
        progress,
        streak: streak_at(today, entries),
        badges: badges_for_total(total),
        next_badge: next_badge(total),
        equivalents: equivalents(weekly_sum),
        last_7_days: daily_series(today, entries.iter()),
    }
}

/// Community totals over every user's log, guests included.
pub fn build_community_at(today: NaiveDate, logs: &[(User, Vec<Entry>)]) -> CommunityResponse {
    let contributors = logs.iter().filter(|(_, entries)| !entries.is_empty()).count();
    let all = logs.iter().flat_map(|(_, entries)| entries.iter());

    CommunityResponse {
        total_co2_saved: all.clone().map(|entry| entry.co2_saved).sum(),
        total_entries: all.clone().count(),
        contributors,
        last_7_days: daily_series(today, all),
    }
}

fn daily_series<'a>(today: NaiveDate, entries: impl Iterator<Item = &'a Entry>) -> Vec<DailyPoint> {
    let start = window_start(today);
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for offset in 0..WINDOW_DAYS {
        by_day.insert(start + Duration::days(offset), 0.0);
    }
    for entry in entries {
        if let Some(total) = by_day.get_mut(&entry.date) {
            *total += entry.co2_saved;
        }
    }

    by_day
        .into_iter()
        .map(|(date, co2_saved)| DailyPoint {
            date: date_key(date),
            co2_saved,
        })
        .collect()
}

pub(crate) fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(WINDOW_DAYS - 1)
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

#[cfg(test)]
pub(crate) fn entry_on(date: NaiveDate, entry_type: EntryType, co2_saved: f64) -> Entry {
    Entry {
        timestamp: format!("{date}T12:00:00+00:00"),
        date,
        entry_type,
        miles: 0.0,
        shower_minutes: 0.0,
        plastic_bottles: 0.0,
        takeout_meals: 0.0,
        laundry_loads: 0.0,
        co2_saved,
    }
}
