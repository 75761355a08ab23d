use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AppearanceKind, Slug, Theme};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub theme: Theme,
}

/// One entry of a talk or workshop listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSummary {
    pub slug: Slug,
    pub title: String,
    pub abstract_html: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFeedItem {
    pub slug: Slug,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub place: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppearancesFeed {
    pub upcoming: Vec<EventFeedItem>,
    pub past: Vec<EventFeedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkPage {
    pub slug: Slug,
    pub title: String,
    pub abstract_html: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides: Option<String>,
    pub appearances: AppearancesFeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkshopPage {
    pub slug: Slug,
    pub title: String,
    pub abstract_html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides: Option<String>,
    pub appearances: AppearancesFeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearanceSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_html: Option<String>,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearanceCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AppearanceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<AppearanceSummary>,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_embed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub slug: Slug,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub place: String,
    pub appearances: Vec<AppearanceCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: Slug,
    pub title: String,
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<NaiveDate>,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverCredit {
    pub author: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCover {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<CoverCredit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPage {
    pub slug: Slug,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<PostCover>,
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomePage {
    pub posts: Vec<PostSummary>,
}
