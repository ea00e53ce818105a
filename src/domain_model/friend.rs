use crate::domain_model::{User, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListField {
    Friends,
    Requests,
}

impl ListField {
    pub fn column(&self) -> &'static str {
        match self {
            ListField::Friends => "friends",
            ListField::Requests => "requests",
        }
    }
}

/// One partial update against a single user document. A batch of these is
/// applied atomically by the store.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum UserUpdate {
    AddToSet(ListField, UserId),
    Pull(ListField, UserId),
    /// Keeps the first occurrence of the value and drops later copies.
    Dedup(ListField, UserId),
}

impl UserUpdate {
    /// Applies the update in place and reports whether the document changed.
    pub fn apply(&self, user: &mut User) -> bool {
        match *self {
            UserUpdate::AddToSet(field, id) => {
                let list = list_mut(user, field);
                if list.contains(&id) {
                    false
                } else {
                    list.push(id);
                    true
                }
            }
            UserUpdate::Pull(field, id) => {
                let list = list_mut(user, field);
                let before = list.len();
                list.retain(|x| *x != id);
                list.len() != before
            }
            UserUpdate::Dedup(field, id) => {
                let list = list_mut(user, field);
                let before = list.len();
                let mut seen = false;
                list.retain(|x| {
                    if *x != id {
                        return true;
                    }
                    !std::mem::replace(&mut seen, true)
                });
                list.len() != before
            }
        }
    }

    /// The update that undoes this one, given whether the value was present
    /// before it was applied. `None` when the update was a no-op or cannot be
    /// undone.
    pub fn inverse(&self, was_present: bool) -> Option<UserUpdate> {
        match *self {
            UserUpdate::AddToSet(field, id) if !was_present => Some(UserUpdate::Pull(field, id)),
            UserUpdate::Pull(field, id) if was_present => Some(UserUpdate::AddToSet(field, id)),
            _ => None,
        }
    }

    pub fn target(&self) -> (ListField, UserId) {
        match *self {
            UserUpdate::AddToSet(field, id)
            | UserUpdate::Pull(field, id)
            | UserUpdate::Dedup(field, id) => (field, id),
        }
    }
}

fn list_mut(user: &mut User, field: ListField) -> &mut Vec<UserId> {
    match field {
        ListField::Friends => &mut user.friends,
        ListField::Requests => &mut user.requests,
    }
}

pub fn list_of(user: &User, field: ListField) -> &[UserId] {
    match field {
        ListField::Friends => &user.friends,
        ListField::Requests => &user.requests,
    }
}

/// State of an ordered pair `(a, b)` as seen from both documents.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RelationState {
    Unrelated,
    Requested { by: UserId },
    Friends,
    /// Exactly one side records the friendship. Never the result of an
    /// operation that returned `Ok`.
    Broken,
}

impl RelationState {
    pub fn classify(a: &User, b: &User) -> Self {
        match (a.has_friend(b.id), b.has_friend(a.id)) {
            (true, true) => RelationState::Friends,
            (true, false) | (false, true) => RelationState::Broken,
            (false, false) => {
                if a.has_request_from(b.id) {
                    RelationState::Requested { by: b.id }
                } else if b.has_request_from(a.id) {
                    RelationState::Requested { by: a.id }
                } else {
                    RelationState::Unrelated
                }
            }
        }
    }
}

/// A user record whose `friends` have been dereferenced into full users.
#[derive(Debug, Clone, Serialize)]
pub struct FriendList {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub friends: Vec<User>,
    pub requests: Vec<UserId>,
}

impl FriendList {
    pub fn expand(user: User, friends: Vec<User>) -> Self {
        FriendList {
            id: user.id,
            email: user.email,
            name: user.name,
            friends,
            requests: user.requests,
        }
    }
}
