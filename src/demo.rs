use crate::errors::AppError;
use crate::models::{Baseline, DemoResponse, Entry, EntryType, User, DEFAULT_WEEKLY_GOAL};
use crate::savings::{compute_savings, HabitValues};
use crate::stats::already_logged;
use crate::storage::{Store, StoreError};
use chrono::{Duration, NaiveDate};
use tracing::info;

pub const DEMO_USERS: [&str; 4] = ["Alex", "Sam", "Taylor", "Jess"];

const DEMO_BASELINE: Baseline = Baseline {
    miles: 10.0,
    shower_minutes: 10.0,
    plastic_bottles: 3.0,
    takeout_meals: 3.0,
    laundry_loads: 4.0,
};

/// Appends a week of sample entries for the demo users. Demo accounts carry no
/// password hash, so nobody can log in as them. A real account that happens to
/// share a demo name is left alone.
pub async fn seed_demo_at(
    store: &dyn Store,
    today: NaiveDate,
    timestamp: &str,
) -> Result<DemoResponse, AppError> {
    let start = today - Duration::days(6);
    let mut users = Vec::new();
    let mut entries_added = 0;

    for name in DEMO_USERS {
        let user = match store.get_user(name).await {
            Some(existing) if !existing.password_hash.is_empty() || existing.is_guest => continue,
            Some(existing) => existing,
            None => {
                let user = User {
                    username: name.to_string(),
                    password_hash: String::new(),
                    baseline: DEMO_BASELINE,
                    is_guest: false,
                    weekly_goal: DEFAULT_WEEKLY_GOAL,
                };
                match store.insert_user(user.clone()).await {
                    Ok(()) => user,
                    // A real account owns this name in another letter case.
                    Err(StoreError::UserExists(_)) => continue,
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let mut existing = store.load_entries(name).await;
        for offset in 0..7 {
            let date = start + Duration::days(offset);
            let values = demo_values(name, offset);
            for entry_type in [EntryType::Daily, EntryType::Weekly] {
                let due = entry_type == EntryType::Daily || date == today;
                if !due || already_logged(&existing, entry_type, date) {
                    continue;
                }
                let entry = Entry {
                    timestamp: timestamp.to_string(),
                    date,
                    entry_type,
                    miles: values.miles,
                    shower_minutes: values.shower_minutes,
                    plastic_bottles: values.plastic_bottles,
                    takeout_meals: values.takeout_meals,
                    laundry_loads: values.laundry_loads,
                    co2_saved: compute_savings(entry_type, &values, &user.baseline),
                };
                store.append_entry(name, entry.clone()).await?;
                existing.push(entry);
                entries_added += 1;
            }
        }
        users.push(name.to_string());
    }

    info!(users = users.len(), entries = entries_added, "seeded demo data");
    Ok(DemoResponse {
        users,
        entries_added,
    })
}

fn demo_values(name: &str, day: i64) -> HabitValues {
    let step = day as f64;
    let miles = if name == "Alex" {
        DEMO_BASELINE.miles - (step + 1.0) * 0.5
    } else {
        DEMO_BASELINE.miles - (day % 3) as f64 * 1.2
    };
    HabitValues {
        miles,
        shower_minutes: DEMO_BASELINE.shower_minutes - (day % 2) as f64 * 2.0,
        plastic_bottles: DEMO_BASELINE.plastic_bottles - ((day + 1) % 4) as f64,
        takeout_meals: if (day + 2) % 3 == 0 { 1.0 } else { 2.0 },
        laundry_loads: 3.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::storage::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 20).unwrap()
    }

    #[tokio::test]
    async fn seeds_each_demo_user_once() {
        let store = MemoryStore::new();
        let first = seed_demo_at(&store, today(), "t").await.unwrap();
        assert_eq!(first.users.len(), 4);
        // Seven daily entries and one weekly entry per user.
        assert_eq!(first.entries_added, 32);

        let second = seed_demo_at(&store, today(), "t").await.unwrap();
        assert_eq!(second.entries_added, 0);

        let alex = store.load_entries("Alex").await;
        assert_eq!(alex.len(), 8);
        assert!(alex.iter().all(|entry| entry.co2_saved >= 0.0));
        assert!(alex.iter().any(|entry| entry.co2_saved > 0.0));
    }

    #[tokio::test]
    async fn skips_real_accounts_with_demo_names() {
        let store = MemoryStore::new();
        store
            .insert_user(User {
                username: "Sam".to_string(),
                password_hash: hash_password("real-password"),
                baseline: Baseline::default(),
                is_guest: false,
                weekly_goal: DEFAULT_WEEKLY_GOAL,
            })
            .await
            .unwrap();

        let seeded = seed_demo_at(&store, today(), "t").await.unwrap();
        assert!(!seeded.users.contains(&"Sam".to_string()));
        assert!(store.load_entries("Sam").await.is_empty());
    }

    #[tokio::test]
    async fn demo_names_yield_to_accounts_differing_in_case() {
        let store = MemoryStore::new();
        store
            .insert_user(User {
                username: "alex".to_string(),
                password_hash: hash_password("real-password"),
                baseline: Baseline::default(),
                is_guest: false,
                weekly_goal: DEFAULT_WEEKLY_GOAL,
            })
            .await
            .unwrap();

        let seeded = seed_demo_at(&store, today(), "t").await.unwrap();
        assert!(!seeded.users.contains(&"Alex".to_string()));
        assert_eq!(seeded.users.len(), DEMO_USERS.len() - 1);
        assert!(store.get_user("Alex").await.is_none());
        assert!(store.load_entries("alex").await.is_empty());
    }
}
