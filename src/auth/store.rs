use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{NewUser, User};
use crate::error::AppError;

pub const DUPLICATE_USER: &str = "User with this email or username already exists.";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with the same email or username already exists.
    #[error("user with this email or username already exists")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::Conflict(DUPLICATE_USER.into()),
            StoreError::Backend(e) => AppError::internal(e),
        }
    }
}

/// Persistence for user records. Implementations must enforce uniqueness of
/// email and username on `create`, independent of any prior lookup.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> Result<std::sync::MutexGuard<'_, Vec<User>>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("user store lock poisoned")))
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Result<Option<User>, StoreError> {
        Ok(self.users()?.iter().find(|u| pred(u)).cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        self.find(|u| u.email == email || u.username == username)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find(|u| u.email == email)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.find(|u| u.id == id)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users()?;
        if users
            .iter()
            .any(|u| u.email == new.email || u.username == new.username)
        {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            is_email_verified: new.is_email_verified,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        users.push(user.clone());
        Ok(user)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::role::Role;
    use time::OffsetDateTime;

    fn new_user(username: &str, email: &str) -> NewUser {
        let now = OffsetDateTime::now_utc();
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: Role::Customer,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_finds_user() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("alice", "alice@example.com")).await.unwrap();

        let by_email = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_email_or_username_matches_either() {
        let store = InMemoryUserStore::new();
        store.create(new_user("alice", "alice@example.com")).await.unwrap();

        assert!(store
            .find_by_email_or_username("other@example.com", "alice")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_email_or_username("alice@example.com", "bob")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_email_or_username("bob@example.com", "bob")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = InMemoryUserStore::new();
        store.create(new_user("alice", "alice@example.com")).await.unwrap();

        let same_email = store.create(new_user("alice2", "alice@example.com")).await;
        assert!(matches!(same_email, Err(StoreError::Duplicate)));
        let same_name = store.create(new_user("alice", "alice2@example.com")).await;
        assert!(matches!(same_name, Err(StoreError::Duplicate)));
    }

    #[test]
    fn store_errors_map_to_app_errors() {
        match AppError::from(StoreError::Duplicate) {
            AppError::Conflict(details) => assert_eq!(details, DUPLICATE_USER),
            other => panic!("unexpected {other:?}"),
        }
        match AppError::from(StoreError::Backend(anyhow::anyhow!("disk full"))) {
            AppError::Internal(details) => assert_eq!(details, "disk full"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
