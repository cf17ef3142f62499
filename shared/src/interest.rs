use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::{LikedSet, ListingKey, RevealedContact, UserId};

/// Body of `POST /api/properties/{key}/like`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LikeRequest {
    pub property_id: String,
    pub telegram_id: i64,
}

impl LikeRequest {
    #[must_use]
    pub fn new(key: &ListingKey, user: UserId) -> Self {
        Self {
            property_id: key.as_str().to_string(),
            telegram_id: user.get(),
        }
    }
}

/// Body of `GET /api/properties/{key}/contact`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ContactRecord {
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeDecision {
    /// Record the like, then reveal the contact.
    Send,
    /// Already liked; only the contact reveal runs again.
    RevealOnly,
    /// A like for this listing is still in flight.
    InFlight,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterestTracker {
    liked: LikedSet,
    pending: HashSet<ListingKey>,
    contacts: HashMap<ListingKey, RevealedContact>,
    notice: Option<ListingKey>,
}

impl InterestTracker {
    #[must_use]
    pub const fn liked(&self) -> &LikedSet {
        &self.liked
    }

    #[must_use]
    pub fn is_liked(&self, key: &ListingKey) -> bool {
        self.liked.contains(key)
    }

    #[must_use]
    pub fn is_pending(&self, key: &ListingKey) -> bool {
        self.pending.contains(key)
    }

    #[must_use]
    pub fn contact_for(&self, key: &ListingKey) -> Option<&RevealedContact> {
        self.contacts.get(key)
    }

    /// The most recent reveal, until dismissed.
    #[must_use]
    pub fn notice(&self) -> Option<&RevealedContact> {
        self.notice.as_ref().and_then(|key| self.contacts.get(key))
    }

    /// Decides what a like tap should do and reserves the key when a like
    /// request is about to go out.
    pub fn request_like(&mut self, key: &ListingKey) -> LikeDecision {
        if self.pending.contains(key) {
            LikeDecision::InFlight
        } else if self.liked.contains(key) {
            LikeDecision::RevealOnly
        } else {
            self.pending.insert(key.clone());
            LikeDecision::Send
        }
    }

    pub fn like_succeeded(&mut self, key: &ListingKey) {
        self.pending.remove(key);
        self.liked.insert(key.clone());
    }

    pub fn like_failed(&mut self, key: &ListingKey) {
        self.pending.remove(key);
    }

    pub fn contact_revealed(&mut self, key: &ListingKey, record: ContactRecord) {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        self.contacts.insert(
            key.clone(),
            RevealedContact {
                listing_key: key.clone(),
                contact_info: non_blank(record.contact_info),
                source_url: non_blank(record.source_url),
            },
        );
        self.notice = Some(key.clone());
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}
