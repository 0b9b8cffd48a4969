use crate::models::{Badge, Entry, LeaderboardRow, NextBadge, Period, User};
use crate::stats::window_start;
use chrono::NaiveDate;
use std::cmp::Ordering;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Lifetime savings thresholds in lbs, ascending.
pub const BADGE_THRESHOLDS: [(&str, f64); 3] = [
    ("Green Starter", 50.0),
    ("Climate Champion", 200.0),
    ("Carbon Crusher", 500.0),
];

/// Ranks non-guest users by savings, highest first. Ties order by username.
pub fn rank_at(
    today: NaiveDate,
    logs: &[(User, Vec<Entry>)],
    period: Period,
    limit: Option<usize>,
) -> Vec<LeaderboardRow> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let start = window_start(today);

    let mut totals: Vec<(String, f64)> = logs
        .iter()
        .filter(|(user, _)| !user.is_guest)
        .map(|(user, entries)| {
            let total: f64 = entries
                .iter()
                .filter(|entry| match period {
                    Period::All => true,
                    Period::Week => entry.date >= start && entry.date <= today,
                })
                .map(|entry| entry.co2_saved)
                .sum();
            (user.username.clone(), total)
        })
        .collect();

    totals.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    totals
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (username, co2_saved))| LeaderboardRow {
            rank: index + 1,
            username,
            co2_saved,
        })
        .collect()
}

pub fn badges_for_total(total: f64) -> Vec<Badge> {
    BADGE_THRESHOLDS
        .iter()
        .filter(|(_, threshold)| total >= *threshold)
        .map(|(name, threshold)| Badge {
            name: (*name).to_string(),
            threshold: *threshold,
        })
        .collect()
}

pub fn next_badge(total: f64) -> Option<NextBadge> {
    BADGE_THRESHOLDS
        .iter()
        .find(|(_, threshold)| total < *threshold)
        .map(|(name, threshold)| NextBadge {
            name: (*name).to_string(),
            threshold: *threshold,
            remaining: threshold - total,
        })
}
