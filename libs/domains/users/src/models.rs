use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// URL prefix under which stored blobs are served to clients.
pub const STORAGE_PUBLIC_PREFIX: &str = "/storage";

/// Tri-state field for partial updates.
///
/// A PATCH body must distinguish a key that was not supplied (leave the
/// field unchanged) from one supplied as explicit `null` (clear it).
/// `Option<T>` cannot carry both meanings, so nullable fields use this
/// wrapper: with `#[serde(default)]` a missing key deserializes to `Keep`,
/// `null` to `Clear`, and a value to `Set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Patch::Clear)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

/// Raw image bytes supplied with a create or update request.
///
/// Travels as base64 text on the wire. Content-type validation is the
/// HTTP layer's job and has happened before the service sees the payload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload(Vec<u8>);

impl ImagePayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("len", &self.0.len())
            .finish()
    }
}

impl Serialize for ImagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for ImagePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email address (unique, case-insensitive)
    pub email: String,
    /// Optional free-text status line; `None` is distinct from ""
    pub status: Option<String>,
    /// Blob-store key of the attached image.
    ///
    /// Either `None` or a key that currently exists in the blob store.
    /// Only `UserService` writes this field.
    pub image: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user (the image key, if any, has already been
    /// resolved by uploading the payload).
    pub fn new(
        name: String,
        email: String,
        status: Option<String>,
        image: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            email,
            status,
            image,
            created_at: now,
            updated_at: now,
        }
    }

    /// Public URL under which the attached image is served.
    pub fn image_src(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(|key| format!("{}/{}", STORAGE_PUBLIC_PREFIX, key))
    }

    /// Apply a partial update. Fields absent from `update` stay untouched;
    /// explicit nulls clear. The replacement image key, if a payload was
    /// uploaded, arrives already resolved in `new_image`.
    pub fn apply_update(&mut self, update: UpdateUser, new_image: Option<String>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        match update.status {
            Patch::Set(status) => self.status = Some(status),
            Patch::Clear => self.status = None,
            Patch::Keep => {}
        }
        if let Some(key) = new_image {
            self.image = Some(key);
        } else if update.image.is_clear() {
            self.image = None;
        }
        self.updated_at = Utc::now();
    }
}

/// User resource DTO returned by the API.
///
/// `image` carries the public URL of the stored image, not the raw
/// blob-store key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let image = user.image_src();
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            status: user.status,
            image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for creating a new user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub status: Option<String>,
    /// Base64-encoded image bytes
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Byte)]
    pub image: Option<ImagePayload>,
}

/// DTO for partially updating an existing user.
///
/// Keys absent from the body leave the field unchanged; `status` and
/// `image` accept explicit `null` to clear.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub status: Patch<String>,
    /// Base64-encoded image bytes, or `null` to detach the current image
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Byte)]
    pub image: Patch<ImagePayload>,
}

/// Query filters for listing users
#[derive(Debug, Clone, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct UserFilter {
    pub email: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            email: None,
            status: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> usize {
    50
}
