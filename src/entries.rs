use crate::errors::AppError;
use crate::models::{Entry, EntryRequest, EntryType, User};
use crate::savings::{compute_savings, HabitValues};
use crate::stats::already_logged;
use crate::storage::Store;
use chrono::NaiveDate;
use tracing::info;

/// Validates a submission, prices it against the user's baseline and appends it.
///
/// Callers hold the state write lock so the duplicate check and the append
/// cannot interleave with another submission.
pub async fn submit_entry(
    store: &dyn Store,
    user: &User,
    request: EntryRequest,
    today: NaiveDate,
    timestamp: String,
) -> Result<Entry, AppError> {
    if !request.is_valid() {
        return Err(AppError::bad_request("habit values must be non-negative numbers"));
    }

    let date = request.date.unwrap_or(today);
    if date > today {
        return Err(AppError::bad_request("entries cannot be dated in the future"));
    }

    let existing = store.load_entries(&user.username).await;
    if already_logged(&existing, request.entry_type, date) {
        let message = match request.entry_type {
            EntryType::Daily => format!("a daily entry for {date} already exists"),
            EntryType::Weekly => "a weekly entry for that week already exists".to_string(),
        };
        return Err(AppError::conflict(message));
    }

    let values = HabitValues::from(&request);
    let entry = Entry {
        timestamp,
        date,
        entry_type: request.entry_type,
        miles: values.miles,
        shower_minutes: values.shower_minutes,
        plastic_bottles: values.plastic_bottles,
        takeout_meals: values.takeout_meals,
        laundry_loads: values.laundry_loads,
        co2_saved: compute_savings(request.entry_type, &values, &user.baseline),
    };

    store.append_entry(&user.username, entry.clone()).await?;
    info!(
        user = %user.username,
        date = %entry.date,
        kind = ?entry.entry_type,
        co2_saved = entry.co2_saved,
        "recorded entry"
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Baseline, DEFAULT_WEEKLY_GOAL};
    use crate::storage::MemoryStore;
    use axum::http::StatusCode;

    fn user() -> User {
        User {
            username: "dana".to_string(),
            password_hash: String::new(),
            baseline: Baseline {
                miles: 5.0,
                shower_minutes: 10.0,
                plastic_bottles: 2.0,
                takeout_meals: 3.0,
                laundry_loads: 2.0,
            },
            is_guest: false,
            weekly_goal: DEFAULT_WEEKLY_GOAL,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 13).unwrap()
    }

    fn daily(date: Option<NaiveDate>) -> EntryRequest {
        EntryRequest {
            entry_type: EntryType::Daily,
            date,
            miles: 2.0,
            shower_minutes: 8.0,
            plastic_bottles: 1.0,
            takeout_meals: 0.0,
            laundry_loads: 0.0,
        }
    }

    #[tokio::test]
    async fn daily_entry_is_priced_and_stored() {
        let store = MemoryStore::new();
        let entry = submit_entry(&store, &user(), daily(None), today(), "t".into())
            .await
            .unwrap();
        assert_eq!(entry.date, today());
        assert!((entry.co2_saved - 2.9).abs() < 1e-9);
        assert_eq!(store.load_entries("dana").await, vec![entry]);
    }

    #[tokio::test]
    async fn second_daily_entry_same_day_conflicts() {
        let store = MemoryStore::new();
        submit_entry(&store, &user(), daily(None), today(), "t".into())
            .await
            .unwrap();
        let err = submit_entry(&store, &user(), daily(Some(today())), today(), "t".into())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let yesterday = today().pred_opt().unwrap();
        submit_entry(&store, &user(), daily(Some(yesterday)), today(), "t".into())
            .await
            .unwrap();
        assert_eq!(store.load_entries("dana").await.len(), 2);
    }

    #[tokio::test]
    async fn weekly_entry_once_per_iso_week() {
        let store = MemoryStore::new();
        let mut weekly = daily(None);
        weekly.entry_type = EntryType::Weekly;
        weekly.takeout_meals = 1.0;
        submit_entry(&store, &user(), weekly, today(), "t".into())
            .await
            .unwrap();

        // 2026-05-11 is the Monday of the same ISO week.
        let mut again = daily(NaiveDate::from_ymd_opt(2026, 5, 11));
        again.entry_type = EntryType::Weekly;
        let err = submit_entry(&store, &user(), again, today(), "t".into())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        submit_entry(&store, &user(), daily(None), today(), "t".into())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_invalid_values_and_future_dates() {
        let store = MemoryStore::new();
        let mut negative = daily(None);
        negative.miles = -1.0;
        let err = submit_entry(&store, &user(), negative, today(), "t".into())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let tomorrow = today().succ_opt();
        let err = submit_entry(&store, &user(), daily(tomorrow), today(), "t".into())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(store.load_entries("dana").await.is_empty());
    }
}
