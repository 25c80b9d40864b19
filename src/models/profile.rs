use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// What the durable profile store holds per user. Persistence is the profile
/// store's concern; the coordinator only needs a synchronous lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Default)]
pub struct ProfileStore {
    profiles: DashMap<UserId, Profile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> Option<Profile> {
        self.profiles.get(&user).map(|p| p.value().clone())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn upsert(&self, user: UserId, name: String, phone: Option<String>) {
        self.profiles
            .entry(user)
            .and_modify(|profile| {
                profile.name = name.clone();
                if phone.is_some() {
                    profile.phone = phone.clone();
                }
            })
            .or_insert(Profile { name, phone });
    }

    /// A user may accept work only with a phone on file.
    pub fn phone_of(&self, user: UserId) -> Option<String> {
        self.profiles.get(&user).and_then(|p| p.phone.clone())
    }
}
