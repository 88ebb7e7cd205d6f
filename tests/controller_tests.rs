use std::sync::Arc;

use chrono::Utc;
use revenue_portal::{
    controllers::{ListFilter, ResourceController},
    error::AppError,
    media::{GALLERY_CAP, MediaLimits, VIDEO_CAP},
    models::{
        NewsItem, NewsItemDraft, Profile, ProfileDraft, Resource, RevenueStatistic,
        RevenueStatisticDraft,
    },
    repository::{InMemoryRepository, Repository, RepositoryState, TableQuery},
};
use serde_json::json;
use uuid::Uuid;

fn setup() -> (Arc<InMemoryRepository>, RepositoryState) {
    let memory = Arc::new(InMemoryRepository::new());
    let repo: RepositoryState = memory.clone();
    (memory, repo)
}

fn news(title: &str) -> NewsItemDraft {
    NewsItemDraft {
        title: Some(title.to_string()),
        content: Some("Les services de la régie seront fermés lundi.".to_string()),
        category: Some("communique".to_string()),
        ..NewsItemDraft::default()
    }
}

fn field_errors(result: Result<impl std::fmt::Debug, AppError>) -> Vec<String> {
    match result {
        Err(AppError::Validation { fields, .. }) => fields.into_keys().collect(),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// --- Create ---

#[tokio::test]
async fn colliding_titles_get_numbered_slugs() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);

    let first = controller.create(news("Communiqué de presse"), None).await.unwrap();
    let second = controller.create(news("Communiqué de presse"), None).await.unwrap();
    let third = controller.create(news("COMMUNIQUE DE PRESSE!"), None).await.unwrap();

    assert_eq!(first.slug, "communique-de-presse");
    assert_eq!(second.slug, "communique-de-presse-2");
    assert_eq!(third.slug, "communique-de-presse-3");
    assert_eq!(controller.items().len(), 3);
}

#[tokio::test]
async fn missing_required_fields_write_nothing() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);

    let draft = NewsItemDraft {
        title: Some("Sans contenu".to_string()),
        content: Some("   ".to_string()),
        ..NewsItemDraft::default()
    };
    let fields = field_errors(controller.create(draft, None).await);

    assert_eq!(fields, vec!["categorie".to_string(), "contenu".to_string()]);
    assert!(memory.rows(NewsItem::TABLE).is_empty());
}

#[tokio::test]
async fn title_without_letters_cannot_produce_a_slug() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);

    let fields = field_errors(controller.create(news("!!!"), None).await);

    assert_eq!(fields, vec!["titre".to_string()]);
    assert!(memory.rows(NewsItem::TABLE).is_empty());
}

#[tokio::test]
async fn create_fills_author_and_publication_date() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let author = Uuid::new_v4();

    let draft = NewsItemDraft {
        published: Some(true),
        ..news("Nouvelle grille tarifaire")
    };
    let item = controller.create(draft, Some(author)).await.unwrap();

    assert_eq!(item.author_id, Some(author));
    assert!(item.published);
    assert!(item.published_at.is_some());
    assert_eq!(item.created_at, item.updated_at);
}

#[tokio::test]
async fn invalid_revenue_row_is_refused_before_the_write() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<RevenueStatistic>::new(repo);

    let draft = RevenueStatisticDraft {
        year: Some(2026),
        month: Some(14),
        revenue_type: Some("vignette".to_string()),
        amount: Some(120.5),
        currency: Some("cdf".to_string()),
    };
    let fields = field_errors(controller.create(draft, None).await);

    assert_eq!(fields, vec!["mois".to_string()]);
    assert!(memory.rows(RevenueStatistic::TABLE).is_empty());
}

// --- Update ---

#[tokio::test]
async fn slug_survives_a_title_change() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("Avis aux contribuables"), None).await.unwrap();

    let updated = controller
        .update(
            item.id,
            NewsItemDraft {
                title: Some("Avis important aux contribuables".to_string()),
                ..NewsItemDraft::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Avis important aux contribuables");
    assert_eq!(updated.slug, "avis-aux-contribuables");
    assert!(updated.updated_at >= item.updated_at);
}

#[tokio::test]
async fn explicit_slug_is_kept_unique() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    controller.create(news("Calendrier fiscal"), None).await.unwrap();
    let other = controller.create(news("Autre article"), None).await.unwrap();

    let updated = controller
        .update(
            other.id,
            NewsItemDraft {
                slug: Some("Calendrier Fiscal".to_string()),
                ..NewsItemDraft::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "calendrier-fiscal-2");

    // Re-saving its own slug is not a collision.
    let same = controller
        .update(
            other.id,
            NewsItemDraft {
                slug: Some("calendrier-fiscal-2".to_string()),
                ..NewsItemDraft::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.slug, "calendrier-fiscal-2");
}

#[tokio::test]
async fn update_cannot_blank_a_required_field() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("Titre"), None).await.unwrap();

    let fields = field_errors(
        controller
            .update(
                item.id,
                NewsItemDraft {
                    title: Some("".to_string()),
                    ..NewsItemDraft::default()
                },
            )
            .await,
    );
    assert_eq!(fields, vec!["titre".to_string()]);
    assert_eq!(controller.find(item.id).await.unwrap().title, "Titre");
}

#[tokio::test]
async fn updating_a_missing_row_is_not_found() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);

    let result = controller.update(Uuid::new_v4(), news("Fantôme")).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn blank_slug_is_refused_on_update() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("Titre"), None).await.unwrap();

    for blank in ["", "   "] {
        let draft = NewsItemDraft {
            slug: Some(blank.to_string()),
            ..NewsItemDraft::default()
        };
        let fields = field_errors(controller.update(item.id, draft).await);
        assert_eq!(fields, vec!["slug".to_string()]);
    }

    assert_eq!(memory.rows(NewsItem::TABLE)[0]["slug"], json!("titre"));
    assert_eq!(controller.items()[0].slug, "titre");
}

// --- Attached media ---

fn youtube_links(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("https://youtu.be/vid{i:08}")).collect()
}

fn gallery_urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://res.cloudinary.com/mock/image/upload/galerie/{i}.jpg"))
        .collect()
}

#[tokio::test]
async fn news_videos_must_be_distinct_youtube_links_within_the_cap() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);

    let with_videos = |videos: Vec<String>| NewsItemDraft {
        videos: Some(videos),
        ..news("Vidéos")
    };

    let not_links = (0..7).map(|i| format!("not-a-youtube-link-{i}")).collect();
    let over_cap = youtube_links(VIDEO_CAP + 1);
    let same_video = vec![
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        "https://youtu.be/dQw4w9WgXcQ".to_string(),
    ];
    for videos in [not_links, over_cap, same_video] {
        let fields = field_errors(controller.create(with_videos(videos), None).await);
        assert_eq!(fields, vec!["videos".to_string()]);
    }
    assert!(memory.rows(NewsItem::TABLE).is_empty());

    let item = controller
        .create(with_videos(youtube_links(VIDEO_CAP)), None)
        .await
        .unwrap();
    assert_eq!(item.videos.len(), VIDEO_CAP);
}

#[tokio::test]
async fn news_gallery_is_capped_and_without_repeats() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);

    let with_gallery = |gallery: Vec<String>| NewsItemDraft {
        gallery: Some(gallery),
        ..news("Galerie")
    };

    let mut repeated = gallery_urls(2);
    repeated.push(repeated[0].clone());
    for gallery in [gallery_urls(15), repeated] {
        let fields = field_errors(controller.create(with_gallery(gallery), None).await);
        assert_eq!(fields, vec!["galerie".to_string()]);
    }
    assert!(memory.rows(NewsItem::TABLE).is_empty());

    let item = controller
        .create(with_gallery(gallery_urls(GALLERY_CAP)), None)
        .await
        .unwrap();
    assert_eq!(item.gallery.len(), GALLERY_CAP);
}

#[tokio::test]
async fn updates_respect_the_configured_media_caps() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo).with_limits(MediaLimits {
        gallery_cap: 3,
        video_cap: 1,
    });
    let item = controller
        .create(
            NewsItemDraft {
                videos: Some(youtube_links(1)),
                ..news("Limites")
            },
            None,
        )
        .await
        .unwrap();

    let draft = NewsItemDraft {
        videos: Some(youtube_links(2)),
        gallery: Some(gallery_urls(4)),
        ..NewsItemDraft::default()
    };
    let fields = field_errors(controller.update(item.id, draft).await);

    assert_eq!(fields, vec!["galerie".to_string(), "videos".to_string()]);
    assert_eq!(memory.rows(NewsItem::TABLE)[0]["videos"], json!(youtube_links(1)));
}

// --- Delete ---

#[tokio::test]
async fn delete_requires_confirmation() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("À supprimer"), None).await.unwrap();

    let refused = controller.delete(item.id, false).await;
    assert!(matches!(refused, Err(AppError::ConfirmationRequired)));
    assert_eq!(memory.rows(NewsItem::TABLE).len(), 1);

    controller.delete(item.id, true).await.unwrap();
    assert!(memory.rows(NewsItem::TABLE).is_empty());
    assert!(controller.items().is_empty(), "the list drops the row without a refetch");
}

#[tokio::test]
async fn failed_delete_leaves_the_list_untouched() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("Résistant"), None).await.unwrap();

    memory.fail_on(NewsItem::TABLE);
    let result = controller.delete(item.id, true).await;

    assert!(matches!(result, Err(AppError::Repository(_))));
    assert_eq!(controller.items().len(), 1);
}

// --- Toggle ---

#[tokio::test]
async fn toggle_publishes_and_stamps_the_date() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("Brouillon"), None).await.unwrap();
    assert!(!item.published && item.published_at.is_none());

    let toggled = controller.toggle(item.id, "publie").await.unwrap();
    assert!(toggled.published);
    assert!(toggled.published_at.is_some());
    assert_eq!(controller.find(item.id).await.unwrap(), toggled);

    let back = controller.toggle(item.id, "publie").await.unwrap();
    assert!(!back.published);
}

#[tokio::test]
async fn failed_toggle_reverts_the_list_item() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("Réversible"), None).await.unwrap();

    memory.fail_on(NewsItem::TABLE);
    let result = controller.toggle(item.id, "en_vedette").await;
    assert!(matches!(result, Err(AppError::Repository(_))));
    assert_eq!(controller.items(), [item.clone()].as_slice());

    memory.recover(NewsItem::TABLE);
    assert_eq!(controller.find(item.id).await.unwrap(), item, "nothing reached the store");
}

#[tokio::test]
async fn only_declared_flags_can_be_toggled() {
    let (_, repo) = setup();
    let mut controller = ResourceController::<NewsItem>::new(repo);
    let item = controller.create(news("Drapeaux"), None).await.unwrap();

    let fields = field_errors(controller.toggle(item.id, "titre").await);
    assert_eq!(fields, vec!["titre".to_string()]);
}

// --- Load and filter ---

#[tokio::test]
async fn list_is_ordered_and_filtered_without_accents() {
    let (_, repo) = setup();
    let mut writer = ResourceController::<NewsItem>::new(repo.clone());
    writer
        .create(
            NewsItemDraft {
                category: Some("fiscalite".to_string()),
                ..news("Échéance de l'impôt foncier")
            },
            None,
        )
        .await
        .unwrap();
    let published = writer
        .create(
            NewsItemDraft {
                published: Some(true),
                ..news("Journée portes ouvertes")
            },
            None,
        )
        .await
        .unwrap();

    let mut reader = ResourceController::<NewsItem>::new(repo);
    let items = reader.load().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, published.id, "dated rows sort before undated ones");

    let by_search = reader.visible(&ListFilter {
        search: Some("ECHEANCE".to_string()),
        facet: None,
    });
    assert_eq!(by_search.len(), 1);
    assert_eq!(by_search[0].slug, "echeance-de-l-impot-foncier");

    let by_facet = reader.visible(&ListFilter {
        search: None,
        facet: Some("Communique".to_string()),
    });
    assert_eq!(by_facet.len(), 1);
    assert_eq!(by_facet[0].id, published.id);
}

#[tokio::test]
async fn profile_ids_mirror_the_auth_user() {
    let (memory, repo) = setup();
    let mut controller = ResourceController::<Profile>::new(repo);
    let auth_id = Uuid::new_v4();

    let profile = controller
        .create_with_id(
            auth_id,
            ProfileDraft {
                email: Some("  Agent@Regie.example ".to_string()),
                role: Some("editor".to_string()),
                ..ProfileDraft::default()
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(profile.id, auth_id);
    assert_eq!(profile.email, "agent@regie.example");
    let stored = memory
        .select(&TableQuery::new(Profile::TABLE).eq("id", auth_id.to_string()))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(profile.id(), auth_id);
}

#[tokio::test]
async fn insert_if_absent_never_overwrites_an_existing_profile() {
    let (memory, _) = setup();
    let id = Uuid::new_v4();
    let now = Utc::now();
    let profile = |role: &str| {
        json!({
            "id": id,
            "email": "agent@regie.example",
            "role": role,
            "created_at": now,
            "updated_at": now,
        })
    };

    let inserted = memory.insert_if_absent(Profile::TABLE, profile("editor")).await.unwrap();
    assert!(inserted.is_some());

    let second = memory.insert_if_absent(Profile::TABLE, profile("reader")).await.unwrap();
    assert!(second.is_none());

    let rows = memory.rows(Profile::TABLE);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["role"], json!("editor"));
}
