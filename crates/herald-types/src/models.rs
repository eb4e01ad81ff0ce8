use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account. Never carries the password hash or refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Channels --

/// The closed set of third-party platforms a user can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelName {
    Facebook,
    Twitter,
    Instagram,
    LinkedIn,
    YouTube,
}

impl ChannelName {
    pub const ALL: [ChannelName; 5] = [
        ChannelName::Facebook,
        ChannelName::Twitter,
        ChannelName::Instagram,
        ChannelName::LinkedIn,
        ChannelName::YouTube,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::Twitter => "Twitter",
            Self::Instagram => "Instagram",
            Self::LinkedIn => "LinkedIn",
            Self::YouTube => "YouTube",
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannelName(pub String);

impl fmt::Display for UnknownChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown channel name '{}'", self.0)
    }
}

impl std::error::Error for UnknownChannelName {}

/// Exact, case-sensitive match: "linkedin" is not "LinkedIn".
impl FromStr for ChannelName {
    type Err = UnknownChannelName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownChannelName(s.to_string()))
    }
}

/// One bound provider account with its credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    pub id: Uuid,
    pub channel_name: ChannelName,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Provider-side subject id.
    pub sub: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChannelEntry {
    pub fn channel_ref(&self) -> ChannelRef {
        ChannelRef {
            id: self.id,
            name: self.channel_name,
        }
    }
}

/// All channels bound by one user, at most one entry per name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSet {
    pub user_id: Uuid,
    pub channels: Vec<ChannelEntry>,
}

/// Non-owning reference from a post to a channel entry. The name is
/// denormalized for display; the id is what identity checks use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub id: Uuid,
    pub name: ChannelName,
}

// -- Scheduled posts --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPost {
    pub id: Uuid,
    pub channel: ChannelRef,
    pub content: String,
    pub media: Vec<MediaItem>,
    #[serde(rename = "scheduledAtUTC")]
    pub scheduled_at_utc: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The per-user aggregate. `posts` is kept in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPostCollection {
    pub user_id: Uuid,
    /// Bumped on every successful save; used to reject lost updates.
    pub revision: u32,
    pub posts: Vec<ScheduledPost>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledPostCollection {
    /// A fresh, unsaved aggregate. Revision 0 means "not persisted yet".
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            revision: 0,
            posts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.posts.iter().position(|post| post.id == id)
    }
}

// -- Published posts --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub channel: ChannelRef,
    /// Provider-side identifier of the published post.
    pub urn: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Ideas --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_parse_is_case_sensitive() {
        assert_eq!("LinkedIn".parse::<ChannelName>(), Ok(ChannelName::LinkedIn));
        assert!("linkedin".parse::<ChannelName>().is_err());
        assert!("Mastodon".parse::<ChannelName>().is_err());
    }

    #[test]
    fn channel_name_serializes_as_display_name() {
        let json = serde_json::to_string(&ChannelName::YouTube).unwrap();
        assert_eq!(json, "\"YouTube\"");
    }

    #[test]
    fn scheduled_post_uses_utc_suffix_in_json() {
        let now = Utc::now();
        let post = ScheduledPost {
            id: Uuid::new_v4(),
            channel: ChannelRef { id: Uuid::new_v4(), name: ChannelName::Twitter },
            content: "hi".into(),
            media: vec![MediaItem { url: "a.png".into(), alt_text: "a".into() }],
            scheduled_at_utc: now,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&post).unwrap();
        assert!(value.get("scheduledAtUTC").is_some());
        assert_eq!(value["media"][0]["altText"], "a");
    }
}
