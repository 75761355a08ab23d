use chrono::{TimeZone, Utc};
use shared::domain::{AppearanceLength, Location, Slug};
use storage::{AppearanceTarget, NewAppearance, NewEvent, NewWorkshop, Storage};

#[tokio::test]
async fn file_backed_store_serves_events_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        dir.path().join("site.db").to_string_lossy().replace('\\', "/")
    );

    {
        let storage = Storage::new(&database_url).await.expect("db");
        for (slug, day) in [("spring", 4), ("autumn", 20)] {
            storage
                .create_event(&NewEvent {
                    slug: Slug::from(slug),
                    name: format!("{slug} summit"),
                    start_date: Utc
                        .with_ymd_and_hms(2023, 10, day, 8, 30, 0)
                        .single()
                        .expect("date"),
                    location: Location {
                        city: "Lisbon".into(),
                        state: None,
                        country: "Portugal".into(),
                    },
                })
                .await
                .expect("event");
        }
        storage
            .create_workshop(&NewWorkshop {
                slug: Slug::from("testing"),
                title: "Testing in practice".into(),
                abstract_md: "Write tests *first*.".into(),
                slides: None,
            })
            .await
            .expect("workshop");
        storage
            .add_appearance(&NewAppearance {
                event: Slug::from("spring"),
                target: Some(AppearanceTarget::Workshop(Slug::from("testing"))),
                date: Utc
                    .with_ymd_and_hms(2023, 10, 4, 9, 0, 0)
                    .single()
                    .expect("date"),
                length: AppearanceLength::Medium,
                recording: None,
            })
            .await
            .expect("appearance");
    }

    let storage = Storage::new(&database_url).await.expect("reopen");
    let events = storage.all_events().await.expect("events");
    let slugs: Vec<_> = events.iter().map(|event| event.slug.as_str()).collect();
    assert_eq!(slugs, ["autumn", "spring"]);
    assert_eq!(events[0].location.place(), "Lisbon, Portugal");

    let workshop = storage
        .workshop_by_slug(&Slug::from("testing"))
        .await
        .expect("workshop");
    assert_eq!(workshop.events.len(), 1);
    assert_eq!(workshop.events[0].slug.as_str(), "spring");
}
