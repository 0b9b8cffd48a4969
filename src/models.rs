use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_WEEKLY_GOAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Baseline {
    pub miles: f64,
    pub shower_minutes: f64,
    pub plastic_bottles: f64,
    pub takeout_meals: f64,
    pub laundry_loads: f64,
}

impl Baseline {
    pub fn is_valid(&self) -> bool {
        habit_values_valid(&[
            self.miles,
            self.shower_minutes,
            self.plastic_bottles,
            self.takeout_meals,
            self.laundry_loads,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub baseline: Baseline,
    pub is_guest: bool,
    #[serde(default = "default_weekly_goal")]
    pub weekly_goal: f64,
}

fn default_weekly_goal() -> f64 {
    DEFAULT_WEEKLY_GOAL
}

/// The whole user store as it is written to `users.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserDb {
    pub users: BTreeMap<String, User>,
}

impl UserDb {
    /// Case-insensitive, so two accounts never map to the same entry file.
    pub fn is_taken(&self, username: &str) -> bool {
        self.users
            .keys()
            .any(|existing| existing.eq_ignore_ascii_case(username))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Daily,
    Weekly,
}

/// One row of a user's entry log. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub timestamp: String,
    pub date: NaiveDate,
    pub entry_type: EntryType,
    pub miles: f64,
    pub shower_minutes: f64,
    pub plastic_bottles: f64,
    pub takeout_meals: f64,
    pub laundry_loads: f64,
    pub co2_saved: f64,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub baseline: Option<Baseline>,
}

#[derive(Debug, Deserialize)]
pub struct GuestRequest {
    #[serde(default)]
    pub baseline: Baseline,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub is_guest: bool,
    pub migrated_entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub username: String,
    pub baseline: Baseline,
    pub is_guest: bool,
    pub weekly_goal: f64,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            baseline: user.baseline,
            is_guest: user.is_guest,
            weekly_goal: user.weekly_goal,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub weekly_goal: f64,
}

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub entry_type: EntryType,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub miles: f64,
    #[serde(default)]
    pub shower_minutes: f64,
    #[serde(default)]
    pub plastic_bottles: f64,
    #[serde(default)]
    pub takeout_meals: f64,
    #[serde(default)]
    pub laundry_loads: f64,
}

impl EntryRequest {
    pub fn is_valid(&self) -> bool {
        habit_values_valid(&[
            self.miles,
            self.shower_minutes,
            self.plastic_bottles,
            self.takeout_meals,
            self.laundry_loads,
        ])
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub date: String,
    pub week: String,
    pub logged_today: bool,
    pub logged_this_week: bool,
    pub streak: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Equivalents {
    pub trees: f64,
    pub car_miles: f64,
    pub plastic_bottles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    pub threshold: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NextBadge {
    pub name: String,
    pub threshold: f64,
    pub remaining: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: String,
    pub co2_saved: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub total_co2_saved: f64,
    pub entry_count: usize,
    pub weekly_sum: f64,
    pub weekly_goal: f64,
    pub progress: f64,
    pub streak: u32,
    pub badges: Vec<Badge>,
    pub next_badge: Option<NextBadge>,
    pub equivalents: Equivalents,
    pub last_7_days: Vec<DailyPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Week,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub period: Period,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub username: String,
    pub co2_saved: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommunityResponse {
    pub total_co2_saved: f64,
    pub total_entries: usize,
    pub contributors: usize,
    pub last_7_days: Vec<DailyPoint>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DemoResponse {
    pub users: Vec<String>,
    pub entries_added: usize,
}

fn habit_values_valid(values: &[f64]) -> bool {
    values.iter().all(|value| value.is_finite() && *value >= 0.0)
}
