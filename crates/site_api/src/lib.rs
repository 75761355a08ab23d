use std::sync::Arc;

use chrono::{DateTime, Utc};
use content::{ContentError, ContentLibrary, MarkdownRenderer, Post};
use newsletter::{NewsletterGateway, SubscribeData};
use shared::{
    domain::Slug,
    error::ApiError,
    protocol::{
        AppearancesFeed, ContentSummary, CoverCredit, EventPage, HomePage, PostCover, PostPage,
        PostSummary, SubscribeRequest, TalkPage, WorkshopPage,
    },
};
use storage::{ContentListing, Storage, StorageError};
use tracing::{error, info};

pub mod appearances;

pub use appearances::{
    appearance_card, appearances_feed, event_feed_item, partition_events, EventPartition,
};

pub const HOME_POST_COUNT: usize = 4;
pub const INVALID_SUBSCRIBE_MESSAGE: &str = "Invalid email";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub content: Arc<ContentLibrary>,
    pub newsletter: Arc<dyn NewsletterGateway>,
    pub markdown: MarkdownRenderer,
}

impl ApiContext {
    pub fn new(
        storage: Storage,
        content: ContentLibrary,
        newsletter: Arc<dyn NewsletterGateway>,
    ) -> Self {
        Self {
            storage,
            content: Arc::new(content),
            newsletter,
            markdown: MarkdownRenderer::default(),
        }
    }
}

pub async fn list_talks(ctx: &ApiContext) -> Result<Vec<ContentSummary>, ApiError> {
    let talks = ctx.storage.all_talks().await.map_err(storage_error)?;
    Ok(talks
        .into_iter()
        .map(|talk| content_summary(ctx, talk, "talks"))
        .collect())
}

pub async fn talk_page(
    ctx: &ApiContext,
    slug: &Slug,
    now: DateTime<Utc>,
) -> Result<TalkPage, ApiError> {
    let talk = ctx.storage.talk_by_slug(slug).await.map_err(storage_error)?;
    Ok(TalkPage {
        abstract_html: ctx.markdown.render(&talk.abstract_md),
        appearances: appearances_feed(talk.events, now),
        slug: talk.slug,
        title: talk.title,
        tags: talk.tags,
        slides: talk.slides,
    })
}

pub async fn list_workshops(ctx: &ApiContext) -> Result<Vec<ContentSummary>, ApiError> {
    let workshops = ctx.storage.all_workshops().await.map_err(storage_error)?;
    Ok(workshops
        .into_iter()
        .map(|workshop| content_summary(ctx, workshop, "workshops"))
        .collect())
}

pub async fn workshop_page(
    ctx: &ApiContext,
    slug: &Slug,
    now: DateTime<Utc>,
) -> Result<WorkshopPage, ApiError> {
    let workshop = ctx
        .storage
        .workshop_by_slug(slug)
        .await
        .map_err(storage_error)?;
    Ok(WorkshopPage {
        abstract_html: ctx.markdown.render(&workshop.abstract_md),
        appearances: appearances_feed(workshop.events, now),
        slug: workshop.slug,
        title: workshop.title,
        slides: workshop.slides,
    })
}

pub async fn all_appearances(
    ctx: &ApiContext,
    now: DateTime<Utc>,
) -> Result<AppearancesFeed, ApiError> {
    let events = ctx.storage.all_events().await.map_err(storage_error)?;
    Ok(appearances_feed(events, now))
}

pub async fn event_page(ctx: &ApiContext, slug: &Slug) -> Result<EventPage, ApiError> {
    let detail = ctx.storage.event_by_slug(slug).await.map_err(storage_error)?;
    Ok(EventPage {
        place: detail.event.location.place(),
        appearances: detail
            .appearances
            .iter()
            .map(|appearance| appearance_card(appearance, &ctx.markdown))
            .collect(),
        slug: detail.event.slug,
        name: detail.event.name,
        start_date: detail.event.start_date,
    })
}

pub fn list_posts(ctx: &ApiContext) -> Vec<PostSummary> {
    ctx.content.posts().iter().map(post_summary).collect()
}

pub fn home_page(ctx: &ApiContext) -> HomePage {
    HomePage {
        posts: ctx
            .content
            .latest_posts(HOME_POST_COUNT)
            .iter()
            .map(post_summary)
            .collect(),
    }
}

pub fn post_page(ctx: &ApiContext, slug: &str) -> Result<PostPage, ApiError> {
    let post = ctx.content.post(slug).map_err(content_error)?;
    Ok(PostPage {
        slug: Slug::new(post.slug.clone()),
        title: post.title.clone(),
        description: post.description.clone(),
        published_at: post.published_at,
        cover: post.cover.as_ref().map(|cover| PostCover {
            photo: cover.photo.clone(),
            credit: cover.credit.as_ref().map(|credit| CoverCredit {
                author: credit.author.clone(),
                url: credit.url.clone(),
            }),
        }),
        html: post.html.clone(),
    })
}

pub fn content_page(ctx: &ApiContext, slug: &str) -> Result<PostPage, ApiError> {
    let page = ctx.content.page(slug).map_err(content_error)?;
    Ok(PostPage {
        slug: Slug::new(page.slug.clone()),
        title: page.title.clone(),
        description: String::new(),
        published_at: None,
        cover: None,
        html: page.html.clone(),
    })
}

/// Validates a raw subscribe body and forwards it to the newsletter provider.
///
/// Only the payload shape is checked. A failing provider is logged and does
/// not fail the request.
pub async fn subscribe(ctx: &ApiContext, body: &[u8]) -> Result<(), ApiError> {
    let invalid = || ApiError::validation(INVALID_SUBSCRIBE_MESSAGE);
    // Derived `Deserialize` also reads structs from arrays; only objects count.
    let value = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        _ => return Err(invalid()),
    };
    let request: SubscribeRequest = serde_json::from_value(value).map_err(|_| invalid())?;
    let data = SubscribeData {
        email: request.email,
        theme: request.theme,
    };

    match ctx.newsletter.subscribe(&data).await {
        Ok(()) => info!(theme = ?data.theme, "newsletter subscription forwarded"),
        Err(err) => error!(theme = ?data.theme, error = %err, "newsletter subscription failed"),
    }
    Ok(())
}

fn content_summary(ctx: &ApiContext, listing: ContentListing, section: &str) -> ContentSummary {
    ContentSummary {
        link: format!("/{section}/{}", listing.slug),
        abstract_html: ctx.markdown.render(&listing.abstract_md),
        slug: listing.slug,
        title: listing.title,
    }
}

fn post_summary(post: &Post) -> PostSummary {
    PostSummary {
        slug: Slug::new(post.slug.clone()),
        title: post.title.clone(),
        excerpt: post.description.clone(),
        published_at: post.published_at,
        link: format!("/posts/{}", post.slug),
    }
}

fn storage_error(err: StorageError) -> ApiError {
    if err.is_not_found() {
        return ApiError::not_found(err.to_string());
    }
    error!(error = %err, "content query failed");
    ApiError::internal("content is temporarily unavailable")
}

fn content_error(err: ContentError) -> ApiError {
    if err.is_not_found() {
        return ApiError::not_found(err.to_string());
    }
    error!(error = %err, "content lookup failed");
    ApiError::internal("content is temporarily unavailable")
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
