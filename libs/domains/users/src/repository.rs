use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{User, UserFilter};

/// Repository trait for User persistence.
///
/// Implementations are the final authority on the email-uniqueness and
/// existence constraints and report violations through the persistence
/// side of [`UserError`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: User) -> UserResult<User>;

    /// Get a user by ID
    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Get a user by email
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// List users with optional filters
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>>;

    /// Count users matching the filter (for pagination)
    async fn count(&self, filter: UserFilter) -> UserResult<usize>;

    /// Update an existing user
    async fn update(&self, user: User) -> UserResult<User>;

    /// Delete a user by ID
    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    /// Check if an email already exists
    async fn email_exists(&self, email: &str) -> UserResult<bool>;
}

fn matches_filter(user: &User, filter: &UserFilter) -> bool {
    if let Some(ref email) = filter.email {
        if !user.email.to_lowercase().contains(&email.to_lowercase()) {
            return false;
        }
    }
    if let Some(ref status) = filter.status {
        match &user.status {
            Some(s) if s.contains(status.as_str()) => {}
            _ => return false,
        }
    }
    true
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        // Check for duplicate email
        let email_exists = users
            .values()
            .any(|u| u.email.to_lowercase() == user.email.to_lowercase());

        if email_exists {
            return Err(UserError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, email = %user.email, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        let user = users
            .values()
            .find(|u| u.email.to_lowercase() == email.to_lowercase())
            .cloned();
        Ok(user)
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        let mut result: Vec<User> = users
            .values()
            .filter(|u| matches_filter(u, &filter))
            .cloned()
            .collect();

        // Sort by created_at descending (newest first)
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let result: Vec<User> = result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect();

        Ok(result)
    }

    async fn count(&self, filter: UserFilter) -> UserResult<usize> {
        let users = self.users.read().await;
        let count = users.values().filter(|u| matches_filter(u, &filter)).count();
        Ok(count)
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if !users.contains_key(&user.id) {
            return Err(UserError::NotFound(user.id));
        }

        // Check for duplicate email (excluding current user)
        let email_exists = users
            .values()
            .any(|u| u.id != user.id && u.email.to_lowercase() == user.email.to_lowercase());

        if email_exists {
            return Err(UserError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, "Updated user");
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let mut users = self.users.write().await;

        if users.remove(&id).is_some() {
            tracing::info!(user_id = %id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        let users = self.users.read().await;
        let exists = users
            .values()
            .any(|u| u.email.to_lowercase() == email.to_lowercase());
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(name: &str, email: &str) -> User {
        User::new(name.to_string(), email.to_string(), None, None)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = InMemoryUserRepository::new();

        let user = sample_user("Test User", "test@example.com");
        let created = repo.create(user).await.unwrap();
        assert_eq!(created.email, "test@example.com");

        let fetched = repo.get_by_id(created.id).await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_get_by_email_case_insensitive() {
        let repo = InMemoryUserRepository::new();

        repo.create(sample_user("Test User", "test@example.com"))
            .await
            .unwrap();

        let fetched = repo.get_by_email("test@example.com").await.unwrap();
        assert!(fetched.is_some());

        let fetched = repo.get_by_email("TEST@EXAMPLE.COM").await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_error() {
        let repo = InMemoryUserRepository::new();

        repo.create(sample_user("User 1", "test@example.com"))
            .await
            .unwrap();

        let result = repo.create(sample_user("User 2", "Test@Example.com")).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let repo = InMemoryUserRepository::new();

        let user = sample_user("Ghost", "ghost@example.com");
        let result = repo.update(user).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_email_taken_by_other_user() {
        let repo = InMemoryUserRepository::new();

        repo.create(sample_user("One", "one@example.com"))
            .await
            .unwrap();
        let two = repo
            .create(sample_user("Two", "two@example.com"))
            .await
            .unwrap();

        let mut moved = two.clone();
        moved.email = "one@example.com".to_string();
        let result = repo.update(moved).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_delete_returns_false_when_absent() {
        let repo = InMemoryUserRepository::new();

        let created = repo
            .create(sample_user("Gone Soon", "gone@example.com"))
            .await
            .unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let repo = InMemoryUserRepository::new();

        for i in 0..5 {
            let mut user = sample_user(&format!("User {}", i), &format!("user{}@example.com", i));
            user.status = (i % 2 == 0).then(|| "active".to_string());
            repo.create(user).await.unwrap();
        }

        let filter = UserFilter {
            status: Some("active".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.count(filter.clone()).await.unwrap(), 3);
        assert_eq!(repo.list(filter).await.unwrap().len(), 3);

        let filter = UserFilter {
            limit: 2,
            offset: 4,
            ..Default::default()
        };
        assert_eq!(repo.list(filter).await.unwrap().len(), 1);

        let filter = UserFilter {
            email: Some("user3@".to_string()),
            ..Default::default()
        };
        let matched = repo.list(filter).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].email, "user3@example.com");
    }
}
