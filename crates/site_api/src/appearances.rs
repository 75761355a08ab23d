use chrono::{DateTime, Utc};
use content::MarkdownRenderer;
use shared::{
    domain::AppearanceKind,
    protocol::{AppearanceCard, AppearanceSummary, AppearancesFeed, EventFeedItem},
};
use storage::{StoredAppearance, StoredEvent};

const YOUTUBE_SHORT_PREFIX: &str = "https://youtu.be/";

/// Events split around an instant, input order preserved on both sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPartition {
    pub upcoming: Vec<StoredEvent>,
    pub past: Vec<StoredEvent>,
}

/// `upcoming` holds events starting strictly after `now`; an event starting
/// exactly at `now` is already past.
pub fn partition_events(events: Vec<StoredEvent>, now: DateTime<Utc>) -> EventPartition {
    let (upcoming, past) = events
        .into_iter()
        .partition(|event| event.start_date > now);
    EventPartition { upcoming, past }
}

pub fn event_feed_item(event: &StoredEvent) -> EventFeedItem {
    EventFeedItem {
        slug: event.slug.clone(),
        name: event.name.clone(),
        start_date: event.start_date,
        place: event.location.place(),
        link: format!("/appearances/{}", event.slug),
    }
}

pub fn appearances_feed(events: Vec<StoredEvent>, now: DateTime<Utc>) -> AppearancesFeed {
    let partition = partition_events(events, now);
    AppearancesFeed {
        upcoming: partition.upcoming.iter().map(event_feed_item).collect(),
        past: partition.past.iter().map(event_feed_item).collect(),
    }
}

/// Card data for one appearance on an event page. Appearances with neither a
/// talk nor a workshop still get their date; everything derived from the
/// attached content is left out.
pub fn appearance_card(appearance: &StoredAppearance, renderer: &MarkdownRenderer) -> AppearanceCard {
    let talk = appearance.talk.as_ref();
    let workshop = appearance.workshop.as_ref();

    let kind = match (talk, workshop) {
        (Some(_), _) => Some(AppearanceKind::Talk),
        (None, Some(_)) => Some(AppearanceKind::Workshop),
        (None, None) => None,
    };
    let slug = talk
        .map(|talk| &talk.slug)
        .or_else(|| workshop.map(|workshop| &workshop.slug));
    let title = talk
        .map(|talk| talk.title.clone())
        .or_else(|| workshop.map(|workshop| workshop.title.clone()))
        .filter(|title| !title.is_empty());
    let abstract_md = talk
        .map(|talk| talk.abstract_md.as_str())
        .or_else(|| workshop.map(|workshop| workshop.abstract_md.as_str()))
        .filter(|text| !text.is_empty());
    let slides = talk
        .and_then(|talk| talk.slides.clone())
        .or_else(|| workshop.and_then(|workshop| workshop.slides.clone()));

    let summary = match (slug, kind) {
        (Some(slug), Some(kind)) if title.is_some() || abstract_md.is_some() => {
            Some(AppearanceSummary {
                title: title.clone(),
                abstract_html: abstract_md.map(|text| renderer.render(text)),
                link: detail_link(kind, slug.as_str()),
            })
        }
        _ => None,
    };

    let youtube_embed = appearance
        .recording
        .as_ref()
        .filter(|recording| title.is_some() && recording.starts_with(YOUTUBE_SHORT_PREFIX))
        .cloned();

    AppearanceCard {
        kind,
        summary,
        date: appearance.date,
        length_label: kind.map(|kind| {
            format!("{} {}", kind.length_label(appearance.length), kind.as_str())
        }),
        slides,
        recording: appearance.recording.clone(),
        tags: talk.map(|talk| talk.tags.clone()),
        youtube_embed,
    }
}

fn detail_link(kind: AppearanceKind, slug: &str) -> String {
    match kind {
        AppearanceKind::Talk => format!("/talks/{slug}"),
        AppearanceKind::Workshop => format!("/workshops/{slug}"),
    }
}

#[cfg(test)]
#[path = "tests/appearances_tests.rs"]
mod tests;
