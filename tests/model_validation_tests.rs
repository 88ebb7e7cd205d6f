use chrono::{TimeZone, Utc};
use revenue_portal::{
    error::FieldErrors,
    media::MediaLimits,
    models::{ActivityAction, NewsItem, Profile, Resource, RevenueStatistic, Role},
    session::{Section, allowed, navigation_for, section_path},
    slug::{fold, slugify, with_suffix},
};
use serde_json::json;
use uuid::Uuid;

// --- Slugs ---

#[test]
fn slugify_strips_diacritics_and_punctuation() {
    assert_eq!(slugify("Communiqué de presse"), "communique-de-presse");
    assert_eq!(slugify("  Impôt foncier : échéance 2026 !  "), "impot-foncier-echeance-2026");
    assert_eq!(slugify("Cœur de l'Œuvre"), "coeur-de-l-oeuvre");
    assert_eq!(slugify("Straße"), "strasse");
}

#[test]
fn slugify_is_idempotent_and_ascii_only() {
    for title in ["Édit n°003/2026", "--Taxe -- sur les  véhicules--", "Ça déménage ✓"] {
        let once = slugify(title);
        assert_eq!(slugify(&once), once);
        assert!(!once.starts_with('-') && !once.ends_with('-'));
        assert!(!once.contains("--"));
        assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }
}

#[test]
fn slugify_of_symbols_only_is_empty() {
    assert_eq!(slugify("!!! ???"), "");
    assert_eq!(slugify(""), "");
}

#[test]
fn fold_keeps_spacing_and_lowercases() {
    assert_eq!(fold("Équipe Fiscalité"), "equipe fiscalite");
}

#[test]
fn suffixes_start_at_two() {
    assert_eq!(with_suffix("taxe", 1), "taxe");
    assert_eq!(with_suffix("taxe", 2), "taxe-2");
    assert_eq!(with_suffix("taxe", 11), "taxe-11");
}

// --- Roles and navigation ---

#[test]
fn role_parsing_is_strict() {
    assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
    assert_eq!("editor".parse::<Role>(), Ok(Role::Editor));
    assert!("Admin".parse::<Role>().is_err());
    assert!(" reader".parse::<Role>().is_err());
    assert!("superadmin".parse::<Role>().is_err());
}

#[test]
fn only_admins_see_users_and_activity() {
    let sections = |role| -> Vec<Section> {
        navigation_for(role).iter().map(|item| item.section).collect()
    };
    let admin = sections(Role::Admin);
    let editor = sections(Role::Editor);

    assert!(admin.contains(&Section::Users) && admin.contains(&Section::Activity));
    assert!(!editor.contains(&Section::Users) && !editor.contains(&Section::Activity));
    assert!(editor.contains(&Section::News));
    assert!(navigation_for(Role::Reader).is_empty());

    assert!(!allowed(Role::Editor, Section::Users));
    assert_eq!(section_path(Section::News), "/admin/actualites");
}

// --- Entity rules ---

fn revenue(month: Option<i32>, amount: f64, currency: &str) -> RevenueStatistic {
    let now = Utc::now();
    RevenueStatistic {
        id: Uuid::new_v4(),
        year: 2026,
        month,
        revenue_type: "impot_foncier".to_string(),
        amount,
        currency: currency.to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn errors_of<T: Resource>(item: &T) -> FieldErrors {
    let mut errors = FieldErrors::new();
    item.validate(&mut errors, &MediaLimits::default());
    errors
}

#[test]
fn revenue_rules() {
    assert!(errors_of(&revenue(Some(3), 1500.0, "CDF")).is_empty());

    let errors = errors_of(&revenue(Some(13), -1.0, "US"));
    assert!(errors.contains_key("mois"));
    assert!(errors.contains_key("montant"));
    assert!(errors.contains_key("devise"));
}

#[test]
fn revenue_currency_is_uppercased_before_validation() {
    let mut row = revenue(None, 10.0, " usd ");
    row.normalize(Utc::now());
    assert_eq!(row.currency, "USD");
    assert!(errors_of(&row).is_empty());
}

#[test]
fn profile_role_outside_the_set_is_rejected() {
    let now = Utc::now();
    let profile = Profile {
        id: Uuid::new_v4(),
        email: "agent@drc.example".to_string(),
        display_name: None,
        role: "superadmin".to_string(),
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };
    assert!(errors_of(&profile).contains_key("role"));
}

#[test]
fn publishing_stamps_the_publication_date_once() {
    let created = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
    let mut item: NewsItem = serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "titre": "Ouverture des guichets",
        "slug": "ouverture-des-guichets",
        "contenu": "Les guichets ouvrent lundi.",
        "categorie": "communique",
        "publie": true,
        "created_at": created,
        "updated_at": created,
    }))
    .unwrap();

    let now = Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap();
    item.normalize(now);
    assert_eq!(item.published_at, Some(now));

    item.normalize(Utc::now());
    assert_eq!(item.published_at, Some(now), "an existing date is kept");
}

#[test]
fn entity_rows_use_french_column_names() {
    let row = serde_json::to_value(revenue(Some(1), 1.0, "CDF")).unwrap();
    for column in ["annee", "mois", "type_recette", "montant", "devise"] {
        assert!(row.get(column).is_some(), "missing column {column}");
    }
    assert_eq!(serde_json::to_value(ActivityAction::Login).unwrap(), json!("LOGIN"));
}
