use std::{path::Path, sync::Arc};

use frontform::{
    EditSession, ErrorType, FieldPath, FormSchema, FsStorage, MemoryStorage, PersistCoordinator,
    PersistOptions, RestoreOutcome, SchemaError, Storage, Synthesizer, render::EditEvent,
    templates,
};
use serde_json::json;

const PAGE_SCHEMA: &str = r#"
title: Page
fields:
  - key: title
    kind: text
    label: Title
    required: true
  - key: date
    kind: date
  - key: layout
    kind: select
    options_from: templates
  - key: sections
    kind: sections_array
    position_key: weight
    fields:
      - key: heading
        kind: text
        required: true
      - key: weight
        kind: number
"#;

const ABOUT: &str = r#"---
title: About
date: 2024-05-01
layout: page.md
sections:
- heading: Team
  weight: 1
- heading: History
  weight: 2
---
# About

We write *markdown*.
"#;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn synthesizer() -> Synthesizer {
    Synthesizer::new().with_templates(templates::flatten(&json!({
        "layouts": [{"page.md": "layouts/page.md"}, {"post.md": "layouts/post.md"}]
    })))
}

fn sections() -> FieldPath {
    FieldPath::root().key("sections")
}

#[tokio::test]
async fn test_markdown_edit_keeps_body() {
    init_logger();
    let storage = Arc::new(MemoryStorage::new());
    storage.insert("content/about.md", ABOUT);
    storage.insert("content/about-schema.yaml", PAGE_SCHEMA);

    let schema = FormSchema::load(&*storage, Path::new("content/about-schema.yaml"))
        .await
        .unwrap();
    let mut session = EditSession::open(&*storage, "content/about.md", &schema, &synthesizer())
        .await
        .unwrap();

    let ids = session
        .form
        .get(&sections())
        .and_then(|n| n.as_array())
        .unwrap()
        .identities();
    session
        .apply(&EditEvent::MoveItem {
            path: sections(),
            identity: ids[1],
            to: 0,
        })
        .unwrap();

    let coordinator = PersistCoordinator::new(storage.clone());
    assert!(session.save(&coordinator).await.unwrap());

    let saved = storage.get("content/about.md").unwrap();
    assert!(saved.ends_with("---\n# About\n\nWe write *markdown*.\n"));
    let reopened =
        EditSession::from_text(&saved, "content/about.md", &schema, &synthesizer()).unwrap();
    assert_eq!(
        reopened.form.to_data()["sections"],
        json!([
            {"heading": "History", "weight": 1},
            {"heading": "Team", "weight": 2}
        ])
    );
    assert_eq!(storage.get("content/about.md.bak").unwrap(), ABOUT);

    // nothing left to save
    assert!(!session.save(&coordinator).await.unwrap());
}

#[tokio::test]
async fn test_validation_reports_every_field() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert("about.md", ABOUT);
    let schema = FormSchema::from_yaml(PAGE_SCHEMA).unwrap();
    let mut session = EditSession::open(&*storage, "about.md", &schema, &synthesizer())
        .await
        .unwrap();

    session
        .apply(&EditEvent::SetValue {
            path: FieldPath::root().key("title"),
            value: json!("  "),
        })
        .unwrap();
    session
        .apply(&EditEvent::SetValue {
            path: FieldPath::root().key("layout"),
            value: json!("missing.md"),
        })
        .unwrap();
    let added = session
        .apply(&EditEvent::AddItem { path: sections() })
        .unwrap()
        .unwrap();
    assert!(session.form.get(&sections().item(added)).is_some());

    let err = session
        .save(&PersistCoordinator::new(storage.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Validation);
    assert_eq!(err.fields(), vec!["title", "layout", "sections[2].heading"]);
    assert!(session.needs_save);
    assert_eq!(storage.get("about.md").unwrap(), ABOUT);
}

#[tokio::test]
async fn test_failed_write_restores_backup() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert("sections/hero.yaml", "title: Hero\n");
    storage.insert("sections/hero.yaml.bak", "title: Older hero\n");
    storage.fail_next_write("sections/hero.yaml");
    let schema = FormSchema::from_yaml("fields:\n  - key: title\n    kind: text\n").unwrap();

    let mut session =
        EditSession::open(&*storage, "sections/hero.yaml", &schema, &Synthesizer::new())
            .await
            .unwrap();
    session
        .apply(&EditEvent::SetValue {
            path: FieldPath::root().key("title"),
            value: json!("A much longer hero title"),
        })
        .unwrap();

    let coordinator = PersistCoordinator::new(storage.clone()).with_options(PersistOptions {
        create_backup: false,
        ..Default::default()
    });
    let err = session.save(&coordinator).await.unwrap_err();

    match &err {
        SchemaError::File { path, restore, .. } => {
            assert_eq!(path, Path::new("sections/hero.yaml"));
            assert!(restore.was_attempted());
            assert!(matches!(restore, RestoreOutcome::Restored { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(
        storage.get("sections/hero.yaml").unwrap(),
        storage.get("sections/hero.yaml.bak").unwrap()
    );
    assert!(session.needs_save);
}

#[tokio::test]
async fn test_temp_artifacts_removed_after_save() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert("uploads/.staging-1.png", "png");
    let schema = FormSchema::from_yaml("fields:\n  - key: image\n    kind: image\n").unwrap();
    let mut session = EditSession::open(&*storage, "post.md", &schema, &Synthesizer::new())
        .await
        .unwrap();
    assert_eq!(session.form.to_data(), json!({"image": ""}));

    session
        .apply(&EditEvent::SetValue {
            path: FieldPath::root().key("image"),
            value: json!("uploads/cover.png"),
        })
        .unwrap();
    session.track_temp_artifact("uploads/.staging-1.png");
    session.track_temp_artifact("uploads/.staging-2.png");

    assert!(session.save(&PersistCoordinator::new(storage.clone())).await.unwrap());
    assert!(session.temp_artifacts().is_empty());
    assert!(!storage.exists(Path::new("uploads/.staging-1.png")).await);
    assert_eq!(
        storage.get("post.md").unwrap(),
        "---\nimage: uploads/cover.png\n---\n"
    );
}

#[tokio::test]
async fn test_fs_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("hero.toml");
    std::fs::write(&doc, "title = \"Hero\"\ncustom = 3\n").unwrap();
    let schema = FormSchema::from_yaml(
        "fields:\n  - key: title\n    kind: text\n  - key: tags\n    kind: list\n",
    )
    .unwrap();

    let storage = Arc::new(FsStorage::new());
    let mut session = EditSession::open(&*storage, &doc, &schema, &Synthesizer::new())
        .await
        .unwrap();
    session
        .apply(&EditEvent::SetValue {
            path: FieldPath::root().key("tags"),
            value: json!(["a", "b"]),
        })
        .unwrap();
    session.save(&PersistCoordinator::new(storage)).await.unwrap();

    let text = std::fs::read_to_string(&doc).unwrap();
    let value: toml::Value = toml::from_str(&text).unwrap();
    assert_eq!(value["title"].as_str(), Some("Hero"));
    assert_eq!(value["custom"].as_integer(), Some(3));
    assert_eq!(value["tags"].as_array().map(|a| a.len()), Some(2));
    assert!(dir.path().join("hero.toml.bak").exists());
}

#[tokio::test]
async fn test_toml_datetimes_survive_save() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("event.toml");
    std::fs::write(
        &doc,
        "title = \"Launch\"\ndate = 2024-05-01\npublished = 2024-05-01T10:00:00Z\n",
    )
    .unwrap();
    let schema = FormSchema::from_yaml(
        "fields:\n  - key: title\n    kind: text\n  - key: date\n    kind: date\n",
    )
    .unwrap();

    let storage = Arc::new(FsStorage::new());
    let mut session = EditSession::open(&*storage, &doc, &schema, &Synthesizer::new())
        .await
        .unwrap();
    assert_eq!(
        session.form.to_data(),
        json!({"title": "Launch", "date": "2024-05-01", "published": "2024-05-01T10:00:00Z"})
    );
    session
        .apply(&EditEvent::SetValue {
            path: FieldPath::root().key("title"),
            value: json!("Launch day"),
        })
        .unwrap();
    assert!(session.save(&PersistCoordinator::new(storage)).await.unwrap());

    let text = std::fs::read_to_string(&doc).unwrap();
    let value: toml::Value = toml::from_str(&text).unwrap();
    assert_eq!(value["title"].as_str(), Some("Launch day"));
    assert_eq!(value["date"].as_str(), Some("2024-05-01"));
    assert_eq!(value["published"].as_str(), Some("2024-05-01T10:00:00Z"));
    assert!(!text.contains("toml_private"));
}
