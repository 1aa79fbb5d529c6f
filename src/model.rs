// Forum domain types as exchanged with the backend
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PostId = u64;

/// Nanoseconds since the Unix epoch, as stamped by the backend.
pub type Nanos = u64;

/// Opaque identifier of an authenticated actor, issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub created_by: Principal,
    pub created_at: Nanos,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl Post {
    pub fn is_answered(&self) -> bool {
        !self.responses.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub responder: Principal,
    pub content: String,
    pub created_at: Nanos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Patient,
    Professional,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "Patient"),
            Role::Professional => write!(f, "Professional"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialization {
    pub area: String,
    pub license_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Principal,
    pub username: String,
    pub role: Role,
    pub joined_at: Nanos,
    #[serde(default)]
    pub specialization: Vec<Specialization>,
}

impl UserProfile {
    /// Profile submitted on first sign-in: a patient named after the principal.
    pub fn default_for(principal: &Principal, joined_at: Nanos) -> Self {
        Self {
            id: principal.clone(),
            username: principal.to_string(),
            role: Role::Patient,
            joined_at,
            specialization: Vec::new(),
        }
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_nanos() -> Nanos {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n.max(0) as Nanos)
        .unwrap_or_default()
}

/// Serde helper for backend optionals encoded as zero-or-one-element arrays.
pub mod opt_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        let slice: &[T] = match value {
            Some(v) => std::slice::from_ref(v),
            None => &[],
        };
        slice.serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let mut items: Vec<T> = Vec::deserialize(deserializer)?;
        if items.len() > 1 {
            return Err(serde::de::Error::invalid_length(
                items.len(),
                &"zero or one element",
            ));
        }
        Ok(items.pop())
    }
}
