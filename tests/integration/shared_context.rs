//! Integration tests for the pending change set shared across repositories

use crate::integration::test_utils::{
    memory_context, post, repository, user, CountingStore, Post, User,
};
use std::sync::Arc;
use stowage::{
    DatabaseContext, EntityRepository, Predicate, Repository, RepositoryError,
    StoreContext, StoreError,
};

#[tokio::test]
async fn test_mutation_flushes_changes_staged_elsewhere() {
    let context = memory_context();
    let users = repository::<User>(&context);
    let posts = repository::<Post>(&context);

    // Staged directly on the collection, not yet committed
    context.collection::<Post>().add(&post(1, 1, "drafted")).unwrap();
    assert!(posts.get_all(None).await.unwrap().is_empty());

    users.add(&user(1, "ada")).await.unwrap();

    assert_eq!(posts.get_all(None).await.unwrap().len(), 1);
    assert_eq!(context.pending_changes(), 0);
}

#[tokio::test]
async fn test_separate_contexts_are_isolated() {
    let store = Arc::new(CountingStore::new());
    let first = Arc::new(StoreContext::new(store.clone()));
    let second = Arc::new(StoreContext::new(store.clone()));

    first.collection::<Post>().add(&post(1, 1, "pending")).unwrap();
    EntityRepository::<User, _>::new(second)
        .add(&user(1, "ada"))
        .await
        .unwrap();

    assert_eq!(store.committed("post"), 0);
    assert_eq!(store.committed("user"), 1);
    assert_eq!(first.pending_changes(), 1);
}

#[tokio::test]
async fn test_add_range_commits_once() {
    let store = Arc::new(CountingStore::new());
    let context = Arc::new(StoreContext::new(store.clone()));
    let users: EntityRepository<User, _> = EntityRepository::new(context);

    users
        .add_range(&[user(1, "a"), user(2, "b"), user(3, "c")])
        .await
        .unwrap();

    assert_eq!(store.applies(), 1);
    assert_eq!(store.committed("user"), 3);
}

#[tokio::test]
async fn test_failed_commit_persists_nothing() {
    let store = Arc::new(CountingStore::new());
    let context = Arc::new(StoreContext::new(store.clone()));
    let users: EntityRepository<User, _> = EntityRepository::new(context.clone());

    store.set_failing(true);
    let err = users
        .add_range(&[user(1, "a"), user(2, "b")])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Store(StoreError::Backend(_))));
    assert_eq!(store.committed("user"), 0);
    assert_eq!(context.pending_changes(), 0);

    // After recovery the next mutation commits only its own change
    store.set_failing(false);
    users.add(&user(3, "c")).await.unwrap();
    assert_eq!(store.applies(), 2);
    assert_eq!(store.committed("user"), 1);
}

#[tokio::test]
async fn test_failed_commit_does_not_block_other_repositories() {
    let context = memory_context();
    let users = repository::<User>(&context);
    let posts = repository::<Post>(&context);
    users.add(&user(1, "ada")).await.unwrap();

    assert!(users.add(&user(1, "dup")).await.is_err());

    posts.add(&post(1, 1, "fine")).await.unwrap();
    assert_eq!(posts.get_all(None).await.unwrap().len(), 1);
    assert_eq!(users.get_all(None).await.unwrap()[0].name, "ada");
}

#[tokio::test]
async fn test_duplicate_in_batch_rejects_whole_batch() {
    let context = memory_context();
    let users = repository::<User>(&context);
    users.add(&user(1, "a")).await.unwrap();

    let err = users
        .add_range(&[user(2, "b"), user(1, "again")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Store(StoreError::DuplicateKey { .. })
    ));

    let found = users
        .get(Predicate::new(|u: &User| u.id == 2), None)
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_removal_on_empty_store_fails_cleanly() {
    let context = memory_context();
    let users = repository::<User>(&context);

    let err = users
        .remove_by_predicate(Predicate::always())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(context.pending_changes(), 0);
}
