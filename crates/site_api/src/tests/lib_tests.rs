use super::*;
use async_trait::async_trait;
use chrono::{Duration, TimeZone};
use newsletter::NewsletterError;
use shared::{
    domain::{AppearanceLength, Location, Theme},
    error::ErrorCode,
};
use std::sync::Mutex;
use storage::{AppearanceTarget, NewAppearance, NewEvent, NewTalk};

#[derive(Default)]
struct RecordingGateway {
    calls: Mutex<Vec<SubscribeData>>,
    fail: bool,
}

#[async_trait]
impl NewsletterGateway for RecordingGateway {
    async fn subscribe(&self, data: &SubscribeData) -> Result<(), NewsletterError> {
        self.calls.lock().expect("lock").push(data.clone());
        if self.fail {
            return Err(NewsletterError::Rejected {
                form_id: newsletter::form_id(data.theme),
                status: 503,
            });
        }
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("now")
}

async fn setup(gateway: Arc<RecordingGateway>) -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    ApiContext::new(storage, ContentLibrary::default(), gateway)
}

async fn seed_talk_with_events(ctx: &ApiContext) {
    ctx.storage
        .create_talk(&NewTalk {
            slug: Slug::from("zero-cost"),
            title: "Zero cost abstractions".into(),
            abstract_md: "See [docs](https://doc.rust-lang.org).".into(),
            tags: vec!["rust".into()],
            slides: None,
        })
        .await
        .expect("talk");
    for (slug, offset) in [("next-month", 30), ("last-year", -365)] {
        ctx.storage
            .create_event(&NewEvent {
                slug: Slug::from(slug),
                name: slug.to_string(),
                start_date: now() + Duration::days(offset),
                location: Location {
                    city: "Oslo".into(),
                    state: None,
                    country: "Norway".into(),
                },
            })
            .await
            .expect("event");
        ctx.storage
            .add_appearance(&NewAppearance {
                event: Slug::from(slug),
                target: Some(AppearanceTarget::Talk(Slug::from("zero-cost"))),
                date: now() + Duration::days(offset),
                length: AppearanceLength::Medium,
                recording: None,
            })
            .await
            .expect("appearance");
    }
}

#[tokio::test]
async fn talk_page_renders_abstract_and_splits_events() {
    let ctx = setup(Arc::default()).await;
    seed_talk_with_events(&ctx).await;

    let page = talk_page(&ctx, &Slug::from("zero-cost"), now())
        .await
        .expect("page");
    assert!(page.abstract_html.contains("target=\"_blank\""));
    assert_eq!(page.appearances.upcoming.len(), 1);
    assert_eq!(page.appearances.upcoming[0].slug.as_str(), "next-month");
    assert_eq!(page.appearances.past.len(), 1);
    assert_eq!(page.appearances.past[0].place, "Oslo, Norway");
}

#[tokio::test]
async fn listings_link_to_detail_pages() {
    let ctx = setup(Arc::default()).await;
    seed_talk_with_events(&ctx).await;

    let talks = list_talks(&ctx).await.expect("talks");
    assert_eq!(talks.len(), 1);
    assert_eq!(talks[0].link, "/talks/zero-cost");
    assert!(list_workshops(&ctx).await.expect("workshops").is_empty());

    let feed = all_appearances(&ctx, now()).await.expect("feed");
    assert_eq!(feed.upcoming.len(), 1);
    assert_eq!(feed.past.len(), 1);
}

#[tokio::test]
async fn missing_talk_is_not_found() {
    let ctx = setup(Arc::default()).await;
    let err = talk_page(&ctx, &Slug::from("nope"), now())
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = event_page(&ctx, &Slug::from("nope"))
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = post_page(&ctx, "nope").expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn event_page_builds_cards() {
    let ctx = setup(Arc::default()).await;
    seed_talk_with_events(&ctx).await;

    let page = event_page(&ctx, &Slug::from("last-year"))
        .await
        .expect("event");
    assert_eq!(page.appearances.len(), 1);
    assert_eq!(
        page.appearances[0].length_label.as_deref(),
        Some("Regular Talk")
    );
}

#[tokio::test]
async fn subscribe_defaults_to_light_theme() {
    let gateway = Arc::new(RecordingGateway::default());
    let ctx = setup(gateway.clone()).await;

    subscribe(&ctx, br#"{"email":"a@b.com"}"#)
        .await
        .expect("subscribe");

    let calls = gateway.calls.lock().expect("lock");
    assert_eq!(
        *calls,
        [SubscribeData {
            email: "a@b.com".into(),
            theme: Theme::Light,
        }]
    );
}

#[tokio::test]
async fn subscribe_rejects_bad_shapes_without_forwarding() {
    let gateway = Arc::new(RecordingGateway::default());
    let ctx = setup(gateway.clone()).await;

    for body in [
        &br#"{"theme":"dark"}"#[..],
        &br#"{"email":42}"#[..],
        &br#"{"email":"a@b.com","theme":"blue"}"#[..],
        &br#"{"email":"a@b.com","theme":null}"#[..],
        &b"not json"[..],
        &br#"["a@b.com"]"#[..],
        &br#"["a@b.com","dark"]"#[..],
        &br#""a@b.com""#[..],
    ] {
        let err = subscribe(&ctx, body).await.expect_err("invalid");
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, INVALID_SUBSCRIBE_MESSAGE);
    }
    assert!(gateway.calls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn subscribe_succeeds_when_provider_fails() {
    let gateway = Arc::new(RecordingGateway {
        fail: true,
        ..RecordingGateway::default()
    });
    let ctx = setup(gateway.clone()).await;

    subscribe(&ctx, br#"{"email":"a@b.com","theme":"dark"}"#)
        .await
        .expect("still ok");
    assert_eq!(gateway.calls.lock().expect("lock")[0].theme, Theme::Dark);
}

#[tokio::test]
async fn home_page_lists_latest_posts() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let posts = (1..=6)
        .map(|day| content::Post {
            slug: format!("post-{day}"),
            title: format!("Post {day}"),
            description: "d".into(),
            published_at: chrono::NaiveDate::from_ymd_opt(2024, 1, day),
            cover: None,
            html: String::new(),
        })
        .collect();
    let ctx = ApiContext::new(
        storage,
        ContentLibrary::from_parts(posts, Vec::new()),
        Arc::new(RecordingGateway::default()),
    );

    let home = home_page(&ctx);
    assert_eq!(home.posts.len(), HOME_POST_COUNT);
    assert_eq!(home.posts[0].slug.as_str(), "post-6");
    assert_eq!(home.posts[0].link, "/posts/post-6");
    assert_eq!(list_posts(&ctx).len(), 6);
}
