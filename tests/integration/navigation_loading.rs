//! Integration tests for include directives and eager navigation loading

use crate::integration::test_utils::{memory_context, post, repository, user, Post, Profile, User};
use stowage::{Cancellation, Include, Predicate, Repository, RepositoryError, StoreError};

async fn seed() -> std::sync::Arc<stowage::StoreContext> {
    let context = memory_context();
    repository::<Profile>(&context)
        .add(&Profile {
            id: 10,
            bio: "writes about sled".to_string(),
        })
        .await
        .unwrap();

    let mut ada = user(1, "ada");
    ada.profile_id = Some(10);
    repository::<User>(&context)
        .add_range(&[ada, user(2, "brian")])
        .await
        .unwrap();

    repository::<Post>(&context)
        .add_range(&[
            post(100, 1, "Trees"),
            post(101, 2, "Logs"),
            post(102, 1, "Batches"),
        ])
        .await
        .unwrap();
    context
}

#[tokio::test]
async fn test_navigation_is_empty_without_include() {
    let context = seed().await;
    let posts = repository::<Post>(&context);

    let all = posts.get_all(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|p| p.author.is_none()));
}

#[tokio::test]
async fn test_include_loads_navigation() {
    let context = seed().await;
    let posts = repository::<Post>(&context);
    let include = Include::new().include("author").unwrap();

    let all = posts.get_all(Some(&include)).await.unwrap();
    for p in &all {
        let author = p.author.as_ref().expect("author loaded");
        assert_eq!(author.id, p.author_id);
    }
}

#[tokio::test]
async fn test_predicate_sees_included_data() {
    let context = seed().await;
    let posts = repository::<Post>(&context);
    let include = Include::new().include("author").unwrap();

    let by_ada = posts
        .get_all_where(
            Predicate::new(|p: &Post| p.author.as_ref().is_some_and(|a| a.name == "ada")),
            Some(&include),
        )
        .await
        .unwrap();

    let mut titles: Vec<&str> = by_ada.iter().map(|p| p.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Batches", "Trees"]);
}

#[tokio::test]
async fn test_nested_include_loads_through_related() {
    let context = seed().await;
    let posts = repository::<Post>(&context);
    let include = Include::new()
        .include("author")
        .unwrap()
        .then_include("profile")
        .unwrap();

    let trees = posts
        .get(Predicate::new(|p: &Post| p.id == 100), Some(&include))
        .await
        .unwrap()
        .unwrap();
    let profile = trees
        .author
        .and_then(|a| a.profile)
        .expect("nested profile loaded");
    assert_eq!(profile.bio, "writes about sled");
}

#[tokio::test]
async fn test_unknown_navigation_is_rejected() {
    let context = seed().await;
    let posts = repository::<Post>(&context);
    let include = Include::new().include("comments").unwrap();

    let err = posts.get_all(Some(&include)).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Store(StoreError::UnknownNavigation { .. })
    ));
}

#[tokio::test]
async fn test_unknown_nested_navigation_is_rejected() {
    let context = seed().await;
    let posts = repository::<Post>(&context);
    let include = Include::of(["author.friends"]).unwrap();

    let err = posts.get_all(Some(&include)).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Store(StoreError::UnknownNavigation { ref navigation, .. })
            if navigation == "friends"
    ));
}

#[tokio::test]
async fn test_queryable_composes_include_and_filters() {
    let context = seed().await;
    let posts = repository::<Post>(&context);
    let include = Include::of(["author"]).unwrap();

    let count = posts
        .queryable()
        .include(&include)
        .filter(Predicate::new(|p: &Post| p.author.is_some()))
        .filter(Predicate::new(|p: &Post| p.title.len() > 4))
        .count(&Cancellation::default())
        .await
        .unwrap();
    assert_eq!(count, 2);
}
