use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        UserId(uuid::Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

/// Unordered pair of users, normalised so that `min() <= max()`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UserPair(UserId, UserId);

impl UserPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a < b { Self(a, b) } else { Self(b, a) }
    }

    pub fn min(&self) -> UserId {
        self.0
    }

    pub fn max(&self) -> UserId {
        self.1
    }
}

impl fmt::Display for UserPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.0, self.1)
    }
}

impl std::str::FromStr for UserPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s.split_once('~').ok_or("invalid pair format")?;
        let a = a.parse::<UserId>().map_err(|e| e.to_string())?;
        let b = b.parse::<UserId>().map_err(|e| e.to_string())?;
        Ok(UserPair::new(a, b))
    }
}

/// Registration payload. Account creation belongs to the surrounding
/// application; the relationship manager never calls this.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub friends: Vec<UserId>,
    pub requests: Vec<UserId>,
}

impl User {
    pub fn new(id: UserId, new_user: NewUser) -> Self {
        User {
            id,
            email: new_user.email,
            name: new_user.name,
            friends: Vec::new(),
            requests: Vec::new(),
        }
    }

    pub fn has_friend(&self, other: UserId) -> bool {
        self.friends.contains(&other)
    }

    pub fn has_request_from(&self, other: UserId) -> bool {
        self.requests.contains(&other)
    }

    /// Case-sensitive substring match on email or name.
    pub fn matches(&self, term: &str) -> bool {
        self.email.contains(term) || self.name.contains(term)
    }
}
