use crate::auth::{
    guest_username, hash_password, validate_password, validate_username, verify_password,
};
use crate::errors::AppError;
use crate::models::{Baseline, SignupRequest, User, DEFAULT_WEEKLY_GOAL};
use crate::storage::{Store, StoreError};
use tracing::{error, info};

const GUEST_NAME_ATTEMPTS: usize = 5;

/// A freshly created account, plus how many guest entries it took over.
#[derive(Debug)]
pub struct Signup {
    pub user: User,
    /// The guest profile that was folded into this account, if any.
    pub guest: Option<String>,
    pub migrated_entries: usize,
}

/// Creates a permanent account. When `guest` names a guest profile, its
/// baseline, goal and entry log are carried over and the guest is removed.
pub async fn signup(
    store: &dyn Store,
    request: SignupRequest,
    guest: Option<&str>,
) -> Result<Signup, AppError> {
    let username = validate_username(&request.username)?;
    validate_password(&request.password)?;

    let guest = match guest {
        Some(name) => store.get_user(name).await.filter(|user| user.is_guest),
        None => None,
    };

    let baseline = match (request.baseline, guest.as_ref()) {
        (Some(baseline), _) => baseline,
        (None, Some(guest)) => guest.baseline,
        (None, None) => Baseline::default(),
    };
    if !baseline.is_valid() {
        return Err(AppError::bad_request("baseline values must be non-negative numbers"));
    }

    let user = User {
        username: username.clone(),
        password_hash: hash_password(&request.password),
        baseline,
        is_guest: false,
        weekly_goal: guest.as_ref().map_or(DEFAULT_WEEKLY_GOAL, |g| g.weekly_goal),
    };
    store.insert_user(user.clone()).await?;

    let Some(guest) = guest else {
        info!(user = %username, "created account");
        return Ok(Signup {
            user,
            guest: None,
            migrated_entries: 0,
        });
    };

    let migrated_entries = match migrate_guest(store, &guest.username, &username).await {
        Ok(count) => count,
        Err(err) => {
            if let Err(undo) = store.delete_user(&username).await {
                error!(user = %username, error = %undo, "failed to roll back signup");
            }
            return Err(err.into());
        }
    };
    info!(
        guest = %guest.username,
        user = %username,
        entries = migrated_entries,
        "migrated guest profile"
    );

    Ok(Signup {
        user,
        guest: Some(guest.username),
        migrated_entries,
    })
}

/// Moves the guest's log onto `username` and removes the guest. On failure the
/// log is handed back so the guest profile stays whole.
async fn migrate_guest(store: &dyn Store, guest: &str, username: &str) -> Result<usize, StoreError> {
    let moved = store.move_entries(guest, username).await?;
    if let Err(err) = store.delete_user(guest).await {
        if let Err(undo) = store.move_entries(username, guest).await {
            error!(guest, user = username, error = %undo, "failed to restore guest entries");
        }
        return Err(err);
    }
    Ok(moved)
}

pub async fn create_guest(store: &dyn Store, baseline: Baseline) -> Result<User, AppError> {
    if !baseline.is_valid() {
        return Err(AppError::bad_request("baseline values must be non-negative numbers"));
    }

    for _ in 0..GUEST_NAME_ATTEMPTS {
        let user = User {
            username: guest_username(),
            password_hash: String::new(),
            baseline,
            is_guest: true,
            weekly_goal: DEFAULT_WEEKLY_GOAL,
        };
        match store.insert_user(user.clone()).await {
            Ok(()) => {
                info!(user = %user.username, "created guest profile");
                return Ok(user);
            }
            Err(StoreError::UserExists(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::conflict("could not allocate a guest name, try again"))
}

pub async fn login(store: &dyn Store, username: &str, password: &str) -> Result<User, AppError> {
    let invalid = || AppError::unauthorized("invalid username or password");
    let user = store.get_user(username.trim()).await.ok_or_else(invalid)?;
    if user.is_guest || !verify_password(password, &user.password_hash) {
        return Err(invalid());
    }
    Ok(user)
}

pub async fn require_user(store: &dyn Store, username: &str) -> Result<User, AppError> {
    store
        .get_user(username)
        .await
        .ok_or_else(|| AppError::not_found(format!("user '{username}' not found")))
}

pub async fn update_baseline(
    store: &dyn Store,
    username: &str,
    baseline: Baseline,
) -> Result<User, AppError> {
    if !baseline.is_valid() {
        return Err(AppError::bad_request("baseline values must be non-negative numbers"));
    }
    let mut user = require_user(store, username).await?;
    user.baseline = baseline;
    store.update_user(user.clone()).await?;
    Ok(user)
}

pub async fn update_goal(store: &dyn Store, username: &str, goal: f64) -> Result<User, AppError> {
    if !goal.is_finite() || goal <= 0.0 {
        return Err(AppError::bad_request("weekly goal must be a positive number"));
    }
    let mut user = require_user(store, username).await?;
    user.weekly_goal = goal;
    store.update_user(user.clone()).await?;
    Ok(user)
}

/// Removes a guest's profile and entry log. Permanent accounts are refused.
pub async fn delete_guest(store: &dyn Store, username: &str) -> Result<(), AppError> {
    let user = require_user(store, username).await?;
    if !user.is_guest {
        return Err(AppError::forbidden("only guest data can be deleted"));
    }
    store.delete_entries(username).await?;
    store.delete_user(username).await?;
    info!(user = %username, "deleted guest data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, EntryType};
    use crate::stats::entry_on;
    use crate::storage::MemoryStore;
    use axum::http::StatusCode;
    use chrono::NaiveDate;

    fn request(username: &str, baseline: Option<Baseline>) -> SignupRequest {
        SignupRequest {
            username: username.to_string(),
            password: "secret-pass".to_string(),
            baseline,
        }
    }

    fn baseline(miles: f64) -> Baseline {
        Baseline {
            miles,
            shower_minutes: 10.0,
            ..Baseline::default()
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let store = MemoryStore::new();
        let created = signup(&store, request("dana", Some(baseline(4.0))), None)
            .await
            .unwrap();
        assert_eq!(created.migrated_entries, 0);
        assert!(!created.user.is_guest);

        let user = login(&store, "dana", "secret-pass").await.unwrap();
        assert_eq!(user.baseline.miles, 4.0);

        let err = login(&store, "dana", "wrong-pass").await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        let err = login(&store, "nobody", "secret-pass").await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        signup(&store, request("dana", None), None).await.unwrap();
        let err = signup(&store, request("dana", None), None).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn guest_signup_migrates_entries_and_baseline() {
        let store = MemoryStore::new();
        let guest = create_guest(&store, baseline(7.0)).await.unwrap();
        update_goal(&store, &guest.username, 75.0).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        store
            .append_entry(&guest.username, entry_on(day, EntryType::Daily, 1.5))
            .await
            .unwrap();
        store
            .append_entry(&guest.username, entry_on(day, EntryType::Weekly, 3.0))
            .await
            .unwrap();

        let created = signup(&store, request("dana", None), Some(&guest.username))
            .await
            .unwrap();

        assert_eq!(created.migrated_entries, 2);
        assert_eq!(created.guest.as_deref(), Some(guest.username.as_str()));
        assert_eq!(created.user.baseline.miles, 7.0);
        assert_eq!(created.user.weekly_goal, 75.0);
        assert!(store.get_user(&guest.username).await.is_none());
        assert!(store.load_entries(&guest.username).await.is_empty());
        assert_eq!(store.load_entries("dana").await.len(), 2);
    }

    #[tokio::test]
    async fn failed_signup_leaves_guest_untouched() {
        let store = MemoryStore::new();
        signup(&store, request("dana", None), None).await.unwrap();
        let guest = create_guest(&store, baseline(1.0)).await.unwrap();

        let err = signup(&store, request("dana", None), Some(&guest.username))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(store.get_user(&guest.username).await.is_some());
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Breaks {
        MoveEntries,
        GuestDelete,
    }

    /// A memory store that fails one step of guest migration.
    struct Broken {
        inner: MemoryStore,
        breaks: Breaks,
    }

    fn broken_io() -> StoreError {
        StoreError::Io(std::io::Error::other("disk unavailable"))
    }

    #[async_trait::async_trait]
    impl Store for Broken {
        async fn get_user(&self, username: &str) -> Option<User> {
            self.inner.get_user(username).await
        }

        async fn list_users(&self) -> Vec<User> {
            self.inner.list_users().await
        }

        async fn insert_user(&self, user: User) -> Result<(), StoreError> {
            self.inner.insert_user(user).await
        }

        async fn update_user(&self, user: User) -> Result<(), StoreError> {
            self.inner.update_user(user).await
        }

        async fn delete_user(&self, username: &str) -> Result<Option<User>, StoreError> {
            if self.breaks == Breaks::GuestDelete && username.starts_with("guest-") {
                return Err(broken_io());
            }
            self.inner.delete_user(username).await
        }

        async fn load_entries(&self, username: &str) -> Vec<Entry> {
            self.inner.load_entries(username).await
        }

        async fn append_entry(&self, username: &str, entry: Entry) -> Result<(), StoreError> {
            self.inner.append_entry(username, entry).await
        }

        async fn move_entries(&self, from: &str, to: &str) -> Result<usize, StoreError> {
            if self.breaks == Breaks::MoveEntries {
                return Err(broken_io());
            }
            self.inner.move_entries(from, to).await
        }

        async fn delete_entries(&self, username: &str) -> Result<(), StoreError> {
            self.inner.delete_entries(username).await
        }
    }

    #[tokio::test]
    async fn interrupted_migration_rolls_back() {
        for breaks in [Breaks::MoveEntries, Breaks::GuestDelete] {
            let store = Broken {
                inner: MemoryStore::new(),
                breaks,
            };
            let guest = create_guest(&store, baseline(3.0)).await.unwrap();
            let day = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
            store
                .append_entry(&guest.username, entry_on(day, EntryType::Daily, 2.0))
                .await
                .unwrap();

            let err = signup(&store, request("dana", None), Some(&guest.username))
                .await
                .unwrap_err();
            assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

            assert!(store.get_user("dana").await.is_none());
            assert!(store.load_entries("dana").await.is_empty());
            assert!(store.get_user(&guest.username).await.is_some());
            assert_eq!(store.load_entries(&guest.username).await.len(), 1);

            // The name is free again once the failure clears.
            let created = signup(&store.inner, request("dana", None), Some(&guest.username))
                .await
                .unwrap();
            assert_eq!(created.migrated_entries, 1);
        }
    }

    #[tokio::test]
    async fn guests_cannot_log_in_and_can_be_deleted() {
        let store = MemoryStore::new();
        let guest = create_guest(&store, Baseline::default()).await.unwrap();
        assert!(login(&store, &guest.username, "").await.is_err());

        delete_guest(&store, &guest.username).await.unwrap();
        assert!(store.get_user(&guest.username).await.is_none());
    }

    #[tokio::test]
    async fn permanent_accounts_are_not_deletable() {
        let store = MemoryStore::new();
        signup(&store, request("dana", None), None).await.unwrap();
        let err = delete_guest(&store, "dana").await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn settings_validate_input() {
        let store = MemoryStore::new();
        signup(&store, request("dana", None), None).await.unwrap();

        assert!(update_goal(&store, "dana", 0.0).await.is_err());
        assert!(update_goal(&store, "dana", f64::NAN).await.is_err());
        assert!(update_baseline(&store, "dana", baseline(-1.0)).await.is_err());

        let user = update_baseline(&store, "dana", baseline(12.0)).await.unwrap();
        assert_eq!(user.baseline.miles, 12.0);
        assert_eq!(store.get_user("dana").await.unwrap().baseline.miles, 12.0);
    }
}
