use std::{collections::BTreeSet, fs, path::Path};

use healer::{
    diagnosis::{DiagnosisErrorKind, HistoricalPatternPort, StaticHistory},
    types::Category,
};
use uuid::Uuid;

use super::resolved;

fn systems(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[tokio::test]
async fn given_history_when_looked_up_then_matches_category_and_systems_newest_first() {
    let history = StaticHistory::new(vec![
        resolved(Category::Disk, &["prod-db-01"], "old cause", 0.6, 20),
        resolved(Category::Disk, &["prod-db-01"], "new cause", 0.7, 2),
        resolved(Category::Disk, &["prod-web-09"], "other host", 0.9, 1),
        resolved(Category::Memory, &["prod-db-01"], "wrong category", 0.9, 1),
        resolved(Category::Disk, &[], "any host", 0.5, 40),
    ]);

    let matches = history
        .lookup(Category::Disk, &systems(&["prod-db-01"]))
        .await
        .expect("static lookup cannot fail");

    let causes = matches
        .iter()
        .map(|matched| matched.hypothesis.as_str())
        .collect::<Vec<_>>();
    assert_eq!(causes, vec!["new cause", "old cause", "any host"]);
}

#[tokio::test]
async fn given_demo_history_file_when_loaded_then_entries_are_served() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/history.json");
    let history = StaticHistory::load(&path).expect("demo history parses");
    assert_eq!(history.len(), 3);

    let matches = history
        .lookup(Category::DatabasePerformance, &systems(&["prod-db-01"]))
        .await
        .expect("static lookup cannot fail");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].actions[0], "kill_blocking_queries");
}

#[test]
fn given_missing_or_malformed_file_when_loaded_then_history_is_unavailable() {
    let dir = std::env::temp_dir().join(format!("healer-history-test-{}", Uuid::now_v7()));
    fs::create_dir_all(&dir).expect("temp dir should be created");

    let missing = StaticHistory::load(&dir.join("absent.json")).expect_err("missing file fails");
    assert_eq!(missing.kind, DiagnosisErrorKind::HistoryUnavailable);

    let malformed_path = dir.join("broken.json");
    fs::write(&malformed_path, "[{ category: 'disk', cause: ").expect("file written");
    let malformed = StaticHistory::load(&malformed_path).expect_err("malformed file fails");
    assert_eq!(malformed.kind, DiagnosisErrorKind::HistoryUnavailable);

    let _ = fs::remove_file(&malformed_path);
    let _ = fs::remove_dir(&dir);
}
