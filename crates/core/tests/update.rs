mod common;

use common::Fixture;
use filemeta_core::{File, FileUpdate, NewFile, TagValue};
use std::collections::{BTreeMap, BTreeSet};

fn keys(file: &File) -> BTreeSet<String> {
    file.tags.iter().map(|t| t.key.clone()).collect()
}

fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

async fn seeded(fx: &Fixture) -> File {
    let path = fx.touch("a.txt");
    fx.store
        .add(NewFile::new(&path).tag("count", "5").tag("flag", "true"))
        .await
        .unwrap()
}

#[tokio::test]
async fn overwrite_replaces_the_whole_tag_set() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;

    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                overwrite_existing: true,
                tags_to_add_modify: raw(&[("status", "done")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(keys(&updated), set(&["status"]));
    assert_eq!(
        updated.tag("status").unwrap().typed_value(),
        TagValue::String("done".into())
    );
    assert_eq!(fx.tag_rows_for(file.id).await, 1);
}

#[tokio::test]
async fn overwrite_without_new_tags_clears_everything() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;
    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                overwrite_existing: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.tags.is_empty());
}

#[tokio::test]
async fn overwrite_with_remove_list_is_rejected_without_changes() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;

    let err = fx
        .store
        .update(
            file.id,
            FileUpdate {
                overwrite_existing: true,
                tags_to_remove: set(&["count"]),
                tags_to_add_modify: raw(&[("status", "done")]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_invalid_input(), "{err}");

    let after = fx.store.get(file.id).await.unwrap();
    assert_eq!(after.tags, file.tags);
    assert_eq!(after.updated_at, file.updated_at);
}

#[tokio::test]
async fn remove_deletes_listed_keys_and_ignores_absent_ones() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;

    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                tags_to_remove: set(&["count", "never-existed"]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(keys(&updated), set(&["flag"]));
}

#[tokio::test]
async fn add_modify_updates_in_place_without_duplicate_rows() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;

    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                tags_to_add_modify: raw(&[("count", "7.5"), ("owner_team", "infra")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(keys(&updated), set(&["count", "flag", "owner_team"]));
    assert_eq!(
        updated.tag("count").unwrap().typed_value(),
        TagValue::Float(7.5)
    );
    assert_eq!(fx.tag_rows_for(file.id).await, 3);

    let again = fx
        .store
        .update(
            file.id,
            FileUpdate {
                tags_to_add_modify: raw(&[("count", "none")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(again.tag("count").unwrap().typed_value(), TagValue::Null);
    assert_eq!(fx.tag_rows_for(file.id).await, 3);
}

#[tokio::test]
async fn removal_runs_before_add_in_the_same_request() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;

    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                tags_to_remove: set(&["count"]),
                tags_to_add_modify: raw(&[("count", "9")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        updated.tag("count").unwrap().typed_value(),
        TagValue::Integer(9)
    );
    assert_eq!(fx.tag_rows_for(file.id).await, 2);
}

#[tokio::test]
async fn tag_only_change_bumps_updated_at() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                tags_to_add_modify: raw(&[("flag", "false")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.updated_at > file.updated_at);
    assert_eq!(updated.created_at, file.created_at);
}

#[tokio::test]
async fn rename_moves_filepath_and_filename() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;
    let target = fx.touch("archive/b.log");

    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                new_filepath: Some(target.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.filepath, target);
    assert_eq!(updated.filename, "b.log");
    assert_eq!(updated.tags, file.tags);
    assert!(updated.updated_at >= file.updated_at);
}

#[tokio::test]
async fn rename_to_own_path_is_allowed() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;
    let updated = fx
        .store
        .update(
            file.id,
            FileUpdate {
                new_filepath: Some(file.filepath.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.filepath, file.filepath);
}

#[tokio::test]
async fn rename_to_missing_path_is_not_found_and_nothing_changes() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;

    let err = fx
        .store
        .update(
            file.id,
            FileUpdate {
                new_filepath: Some(fx.missing("ghost.txt")),
                tags_to_add_modify: raw(&[("status", "done")]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");

    let after = fx.store.get(file.id).await.unwrap();
    assert_eq!(after.filepath, file.filepath);
    assert_eq!(after.tags, file.tags);
}

#[tokio::test]
async fn rename_onto_another_files_path_conflicts() {
    let fx = Fixture::new().await;
    let first = seeded(&fx).await;
    let second_path = fx.touch("b.txt");
    let second = fx.store.add(NewFile::new(&second_path)).await.unwrap();

    let err = fx
        .store
        .update(
            first.id,
            FileUpdate {
                new_filepath: Some(second_path.clone()),
                overwrite_existing: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "{err}");

    let first_after = fx.store.get(first.id).await.unwrap();
    let second_after = fx.store.get(second.id).await.unwrap();
    assert_eq!(first_after.filepath, first.filepath);
    assert_eq!(first_after.tags, first.tags);
    assert_eq!(second_after.filepath, second_path);
}

#[tokio::test]
async fn empty_update_is_invalid_and_unknown_id_is_not_found() {
    let fx = Fixture::new().await;
    let file = seeded(&fx).await;

    let err = fx
        .store
        .update(file.id, FileUpdate::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_input(), "{err}");

    let err = fx
        .store
        .update(
            file.id + 1,
            FileUpdate {
                tags_to_add_modify: raw(&[("x", "1")]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");
}
