use std::sync::Arc;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, Patch, UpdateUser, User, UserFilter};
use crate::repository::UserRepository;
use crate::storage::{BlobStore, USER_IMAGE_NAMESPACE};

/// Service layer owning the user lifecycle and its image side effects.
///
/// Every blob-store write for user images goes through this service; it
/// keeps the record's `image` field and the blob store from diverging.
/// Replacement blobs are uploaded before any record write, and a blob is
/// removed only once no persisted record references it.
#[derive(Clone)]
pub struct UserService<R: UserRepository, B: BlobStore> {
    repository: Arc<R>,
    storage: Arc<B>,
}

impl<R: UserRepository, B: BlobStore> UserService<R, B> {
    pub fn new(repository: R, storage: B) -> Self {
        Self {
            repository: Arc::new(repository),
            storage: Arc::new(storage),
        }
    }

    /// Create a new user, uploading the attached image first.
    ///
    /// A storage failure aborts before anything is persisted. If the
    /// repository rejects the record afterwards, the freshly uploaded
    /// blob is removed again so it cannot leak.
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        let image = match &input.image {
            Some(payload) if !payload.is_empty() => Some(
                self.storage
                    .put(payload.as_bytes(), USER_IMAGE_NAMESPACE)
                    .await?,
            ),
            _ => None,
        };

        let user = User::new(input.name, input.email, input.status, image.clone());

        match self.repository.create(user).await {
            Ok(created) => Ok(created),
            Err(err) => {
                if let Some(key) = image {
                    self.discard_blob(&key).await;
                }
                Err(err)
            }
        }
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// List users with filters, returning the page and the total count
    pub async fn list_users(&self, filter: UserFilter) -> UserResult<(Vec<User>, usize)> {
        let total = self.repository.count(filter.clone()).await?;
        let users = self.repository.list(filter).await?;
        Ok((users, total))
    }

    /// Apply a partial update, replacing or detaching the image as asked.
    ///
    /// Keys absent from `input` leave their fields untouched; explicit
    /// nulls clear `status`/`image`. The replacement blob is uploaded
    /// before the record is touched, and the previous blob is deleted only
    /// after the updated record has been persisted and re-read, so a
    /// storage failure leaves the user exactly as it was. Returns the
    /// canonical post-write state from the repository.
    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> UserResult<User> {
        let user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        if let Some(ref new_email) = input.email {
            if !new_email.eq_ignore_ascii_case(&user.email)
                && self.repository.email_exists(new_email).await?
            {
                return Err(UserError::DuplicateEmail(new_email.clone()));
            }
        }

        let new_image = match &input.image {
            Patch::Set(payload) if !payload.is_empty() => Some(
                self.storage
                    .put(payload.as_bytes(), USER_IMAGE_NAMESPACE)
                    .await?,
            ),
            _ => None,
        };

        let old_image = user.image.clone();
        let image_detached = new_image.is_none() && input.image.is_clear();

        let mut user = user;
        user.apply_update(input, new_image.clone());

        let updated = match self.repository.update(user).await {
            Ok(updated) => updated,
            Err(err) => {
                if let Some(key) = new_image {
                    self.discard_blob(&key).await;
                }
                return Err(err);
            }
        };

        // Canonical post-write state, picking up anything the repository
        // assigned or normalized during the write.
        let refreshed = self
            .repository
            .get_by_id(updated.id)
            .await?
            .ok_or(UserError::NotFound(updated.id))?;

        if new_image.is_some() || image_detached {
            if let Some(old_key) = old_image {
                self.discard_blob(&old_key).await;
            }
        }

        Ok(refreshed)
    }

    /// Delete a user and, if one is attached, its stored image.
    ///
    /// Destroying an already-deleted user fails with `NotFound` rather
    /// than silently succeeding.
    pub async fn destroy_user(&self, id: Uuid) -> UserResult<bool> {
        let user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        // Blob deletion is best-effort; a failure is logged and does not
        // block record deletion.
        if let Some(key) = &user.image {
            self.discard_blob(key).await;
        }

        let deleted = self.repository.delete(user.id).await?;
        if !deleted {
            return Err(UserError::NotFound(id));
        }

        Ok(true)
    }

    /// Best-effort blob removal; failures are logged, never propagated.
    async fn discard_blob(&self, key: &str) {
        match self.storage.delete(key).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(key = %key, "Blob already absent on delete"),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Failed to delete blob, leaving it orphaned")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImagePayload;
    use crate::repository::InMemoryUserRepository;
    use crate::storage::{InMemoryBlobStore, StorageError, StorageResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

    fn service() -> UserService<InMemoryUserRepository, InMemoryBlobStore> {
        UserService::new(InMemoryUserRepository::new(), InMemoryBlobStore::new())
    }

    fn create_input(name: &str, email: &str) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            status: None,
            image: None,
        }
    }

    /// Blob store wrapper whose `put` can be switched to fail, for
    /// exercising the storage-failure paths.
    struct FlakyBlobStore {
        inner: InMemoryBlobStore,
        fail_puts: AtomicBool,
        fail_deletes: AtomicBool,
    }

    impl FlakyBlobStore {
        fn new() -> Self {
            Self {
                inner: InMemoryBlobStore::new(),
                fail_puts: AtomicBool::new(false),
                fail_deletes: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl BlobStore for FlakyBlobStore {
        async fn put(&self, payload: &[u8], namespace: &str) -> StorageResult<String> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("put refused".to_string()));
            }
            self.inner.put(payload, namespace).await
        }

        async fn delete(&self, key: &str) -> StorageResult<bool> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("delete refused".to_string()));
            }
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key).await
        }
    }

    #[tokio::test]
    async fn test_create_without_image_writes_no_blob() {
        let service = service();

        let created = service
            .create_user(CreateUser {
                status: None,
                image: None,
                ..create_input("Ann", "ann@x.com")
            })
            .await
            .unwrap();

        assert_eq!(created.name, "Ann");
        assert_eq!(created.email, "ann@x.com");
        assert_eq!(created.status, None);
        assert_eq!(created.image, None);
        assert!(service.storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_with_image_stores_blob() {
        let service = service();

        let created = service
            .create_user(CreateUser {
                status: Some("active".to_string()),
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Bo", "bo@x.com")
            })
            .await
            .unwrap();

        let key = created.image.expect("image key should be set");
        assert!(key.starts_with("images/users/"));
        assert!(service.storage.exists(&key).await.unwrap());
        assert_eq!(created.status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn test_create_with_empty_image_treated_as_absent() {
        let service = service();

        let created = service
            .create_user(CreateUser {
                image: Some(ImagePayload::new(Vec::new())),
                ..create_input("Cal", "cal@x.com")
            })
            .await
            .unwrap();

        assert_eq!(created.image, None);
        assert!(service.storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_storage_failure_creates_no_record() {
        let store = FlakyBlobStore::new();
        store.fail_puts.store(true, Ordering::SeqCst);
        let service = UserService::new(InMemoryUserRepository::new(), store);

        let result = service
            .create_user(CreateUser {
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Dee", "dee@x.com")
            })
            .await;

        assert!(matches!(result, Err(UserError::Storage(_))));
        assert_eq!(
            service.repository.get_by_email("dee@x.com").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_create_duplicate_email_cleans_up_uploaded_blob() {
        let service = service();

        service
            .create_user(create_input("First", "same@x.com"))
            .await
            .unwrap();

        let result = service
            .create_user(CreateUser {
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Second", "same@x.com")
            })
            .await;

        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
        assert!(service.storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_replaces_image() {
        let service = service();

        let created = service
            .create_user(CreateUser {
                status: Some("around".to_string()),
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Eve", "eve@x.com")
            })
            .await
            .unwrap();
        let old_key = created.image.clone().unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    image: Patch::Set(ImagePayload::new(&b"\xFF\xD8\xFF\xE0new"[..])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let new_key = updated.image.clone().unwrap();
        assert_ne!(new_key, old_key);
        assert!(!service.storage.exists(&old_key).await.unwrap());
        assert!(service.storage.exists(&new_key).await.unwrap());
        // Untouched fields survive
        assert_eq!(updated.name, "Eve");
        assert_eq!(updated.status.as_deref(), Some("around"));
    }

    #[tokio::test]
    async fn test_update_explicit_null_clears_status() {
        let service = service();

        let created = service
            .create_user(CreateUser {
                status: Some("busy".to_string()),
                ..create_input("Fay", "fay@x.com")
            })
            .await
            .unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    status: Patch::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, None);

        // An absent key leaves the field alone
        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    name: Some("Fay B".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Fay B");
        assert_eq!(updated.status, None);
        assert_eq!(updated.email, "fay@x.com");
    }

    #[tokio::test]
    async fn test_update_explicit_null_detaches_image_and_deletes_blob() {
        let service = service();

        let created = service
            .create_user(CreateUser {
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Gil", "gil@x.com")
            })
            .await
            .unwrap();
        let old_key = created.image.clone().unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    image: Patch::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.image, None);
        assert!(!service.storage.exists(&old_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_upload_failure_leaves_user_untouched() {
        let store = FlakyBlobStore::new();
        let service = UserService::new(InMemoryUserRepository::new(), store);

        let created = service
            .create_user(CreateUser {
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Hal", "hal@x.com")
            })
            .await
            .unwrap();
        let old_key = created.image.clone().unwrap();

        service.storage.fail_puts.store(true, Ordering::SeqCst);

        let result = service
            .update_user(
                created.id,
                UpdateUser {
                    image: Patch::Set(ImagePayload::new(PNG)),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(UserError::Storage(_))));
        // The old blob and the record are both untouched
        assert!(service.storage.exists(&old_key).await.unwrap());
        let current = service.get_user(created.id).await.unwrap();
        assert_eq!(current.image.as_deref(), Some(old_key.as_str()));
    }

    #[tokio::test]
    async fn test_update_duplicate_email_rejected_before_side_effects() {
        let service = service();

        service
            .create_user(create_input("Ida", "ida@x.com"))
            .await
            .unwrap();
        let jon = service
            .create_user(create_input("Jon", "jon@x.com"))
            .await
            .unwrap();

        let result = service
            .update_user(
                jon.id,
                UpdateUser {
                    email: Some("ida@x.com".to_string()),
                    image: Patch::Set(ImagePayload::new(PNG)),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
        assert!(service.storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let service = service();

        let result = service
            .update_user(Uuid::now_v7(), UpdateUser::default())
            .await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_destroy_removes_blob_and_record() {
        let service = service();

        let created = service
            .create_user(CreateUser {
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Kim", "kim@x.com")
            })
            .await
            .unwrap();
        let key = created.image.clone().unwrap();

        assert!(service.destroy_user(created.id).await.unwrap());
        assert!(!service.storage.exists(&key).await.unwrap());
        assert_eq!(service.repository.get_by_id(created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_destroy_twice_fails_with_not_found() {
        let service = service();

        let created = service
            .create_user(create_input("Lee", "lee@x.com"))
            .await
            .unwrap();

        assert!(service.destroy_user(created.id).await.unwrap());

        let result = service.destroy_user(created.id).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_destroy_with_failing_blob_delete_still_deletes_record() {
        let store = FlakyBlobStore::new();
        let service = UserService::new(InMemoryUserRepository::new(), store);

        let created = service
            .create_user(CreateUser {
                image: Some(ImagePayload::new(PNG)),
                ..create_input("Mae", "mae@x.com")
            })
            .await
            .unwrap();

        service.storage.fail_deletes.store(true, Ordering::SeqCst);

        assert!(service.destroy_user(created.id).await.unwrap());
        assert_eq!(service.repository.get_by_id(created.id).await.unwrap(), None);
    }
}
