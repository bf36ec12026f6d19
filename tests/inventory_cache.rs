use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use taskmake::errors::{Result, TaskmakeError};
use taskmake::inventory::{
    BoxFuture, InventoryCache, Inventory, Producer, StaticTaskProvider, TaskProvider,
};
use taskmake::task::TaskSpec;
use taskmake_test_utils::builders::TaskSpecBuilder;
use taskmake_test_utils::with_timeout;

/// Provider that counts fetches and can be slowed down or made to fail.
#[derive(Default)]
struct CountingProvider {
    fetches: AtomicUsize,
    delay: Option<Duration>,
    failing: AtomicBool,
}

impl TaskProvider for CountingProvider {
    fn fetch_tasks(&self) -> BoxFuture<'_, Result<Vec<TaskSpec>>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(TaskmakeError::ConfigError("broken task file".to_string()));
            }
            Ok(vec![TaskSpecBuilder::new("a").command("a", &[]).build()])
        })
    }
}

#[tokio::test]
async fn snapshot_is_reused_within_ttl() {
    let provider = Arc::new(CountingProvider::default());
    let cache = InventoryCache::new(provider.clone(), Duration::from_secs(60));

    let first = cache.get().await.unwrap();
    let second = cache.get().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(cache.build_count(), 1);
}

#[tokio::test]
async fn expired_snapshot_is_rebuilt() {
    let provider = Arc::new(CountingProvider::default());
    let cache = InventoryCache::new(provider.clone(), Duration::from_millis(20));

    cache.get().await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    cache.get().await.unwrap();

    assert_eq!(provider.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_forces_a_rebuild() {
    let provider = Arc::new(StaticTaskProvider::new(vec![
        TaskSpecBuilder::new("old").command("x", &[]).build(),
    ]));
    let cache = InventoryCache::new(provider.clone(), Duration::from_secs(60));
    assert!(cache.get().await.unwrap().find("old").is_some());

    provider.replace(vec![TaskSpecBuilder::new("new").command("y", &[]).build()]);
    assert!(cache.get().await.unwrap().find("new").is_none());

    cache.invalidate();
    let inventory = cache.get().await.unwrap();
    assert!(inventory.find("new").is_some());
    assert!(inventory.find("old").is_none());
}

#[tokio::test]
async fn concurrent_callers_share_one_rebuild() {
    let provider = Arc::new(CountingProvider {
        delay: Some(Duration::from_millis(50)),
        ..CountingProvider::default()
    });
    let cache = Arc::new(InventoryCache::new(provider.clone(), Duration::from_secs(60)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move { cache.get().await.unwrap() }));
    }
    let mut snapshots = Vec::new();
    for handle in handles {
        snapshots.push(with_timeout(handle).await.unwrap());
    }

    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[tokio::test]
async fn failed_forced_rebuild_is_retried() {
    let provider = Arc::new(CountingProvider::default());
    let cache = InventoryCache::new(provider.clone(), Duration::from_secs(60));
    cache.get().await.unwrap();

    provider.failing.store(true, Ordering::SeqCst);
    cache.invalidate();
    assert!(cache.get().await.is_err());

    provider.failing.store(false, Ordering::SeqCst);
    cache.get().await.unwrap();
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 3);
}

#[test]
fn inventory_finds_tasks_by_id_then_label() {
    let inventory = Inventory::new(vec![
        TaskSpecBuilder::new("build").scope("lib").command("a", &[]).build(),
        TaskSpecBuilder::new("build").scope("app").command("b", &[]).build(),
        TaskSpecBuilder::new("test").command("c", &[]).build(),
    ]);

    assert_eq!(inventory.find("app:build").unwrap().id(), "app:build");
    assert_eq!(inventory.find("build").unwrap().id(), "lib:build");
    assert_eq!(inventory.find("test").unwrap().id(), "test");
    assert!(inventory.find("nope").is_none());
}

#[test]
fn producer_index_splits_exact_and_wildcard_outputs() {
    let inventory = Inventory::new(vec![
        TaskSpecBuilder::new("objects").command("cc", &[]).output("out/*.o").build(),
        TaskSpecBuilder::new("first").command("a", &[]).output("./out/app").build(),
        TaskSpecBuilder::new("second").command("b", &[]).output("out/app").build(),
    ]);
    let index = inventory.index();

    assert_eq!(index.wildcard_rules().len(), 1);
    // Last declaration of a literal output wins.
    assert_eq!(index.exact("out/app").unwrap().id(), "second");
    assert!(matches!(
        index.producer_for("out/./main.o"),
        Some(Producer::Wildcard(rule)) if rule.task.id() == "objects"
    ));
    assert!(matches!(
        index.producer_for("out/app"),
        Some(Producer::Exact(task)) if task.id() == "second"
    ));
    assert!(index.producer_for("src/main.c").is_none());
}
