use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{Direction, Item, NewItem, QueueEntry, Tally, User, VoteResult};
use crate::queue::{extract_video_id, rank};
use crate::services::{
    resolve_or_placeholder, MetadataResolver, PlaceholderResolver, YoutubeResolver,
};

/// Submit, vote and list over one shared store.
///
/// Every operation takes the caller's identity explicitly; nothing is read
/// from ambient session state.
pub struct QueueService {
    repository: Repository,
    resolver: Arc<dyn MetadataResolver>,
}

impl QueueService {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;

        let resolver: Arc<dyn MetadataResolver> = if config.resolve_metadata {
            Arc::new(YoutubeResolver::new(
                config.oembed_endpoint.clone(),
                Duration::from_secs(config.resolver_timeout_secs),
            )?)
        } else {
            Arc::new(PlaceholderResolver)
        };

        Ok(Self::with_parts(repository, resolver))
    }

    pub fn with_parts(repository: Repository, resolver: Arc<dyn MetadataResolver>) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    /// Sign-in hook for the identity provider: one user per email.
    pub async fn register_user(&self, email: &str, provider: &str) -> Result<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }
        let user = self
            .repository
            .upsert_user(email.to_string(), provider.to_string())
            .await?;
        tracing::debug!("Signed in {} as {}", user.email, user.id);
        Ok(user)
    }

    /// Queue a YouTube link on `owner_id`'s stream.
    pub async fn submit(&self, owner_id: &str, url: &str) -> Result<Item> {
        if owner_id.trim().is_empty() {
            return Err(AppError::Validation("Creator ID is required".to_string()));
        }
        let extracted_id = extract_video_id(url)?;

        // Skip the metadata round-trip for links that are already queued;
        // the insert re-checks under its own transaction.
        if self
            .repository
            .content_queued(owner_id, &extracted_id)
            .await?
        {
            return Err(AppError::Duplicate(extracted_id));
        }

        let metadata = resolve_or_placeholder(self.resolver.as_ref(), &extracted_id).await;

        let item = self
            .repository
            .insert_item(NewItem {
                owner_id: owner_id.to_string(),
                url: url.trim().to_string(),
                extracted_id,
                metadata,
            })
            .await?;

        tracing::info!("Added \"{}\" to stream {}", item.title, owner_id);
        Ok(item)
    }

    pub async fn vote(
        &self,
        voter_id: &str,
        item_id: &str,
        direction: Direction,
    ) -> Result<VoteResult> {
        if voter_id.trim().is_empty() {
            return Err(AppError::Unauthenticated);
        }
        self.repository.cast_vote(voter_id, item_id, direction).await
    }

    pub async fn remove_vote(&self, voter_id: &str, item_id: &str) -> Result<VoteResult> {
        if voter_id.trim().is_empty() {
            return Err(AppError::Unauthenticated);
        }
        self.repository.remove_vote(voter_id, item_id).await
    }

    /// The ranked queue for one stream, annotated with the viewer's own votes.
    pub async fn list_queue(
        &self,
        collection_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<QueueEntry>> {
        let items = rank(self.repository.get_items_for_owner(collection_id).await?);

        let viewer_votes = match viewer_id.filter(|id| !id.trim().is_empty()) {
            Some(viewer) => {
                self.repository
                    .get_viewer_votes(viewer, collection_id)
                    .await?
            }
            None => Default::default(),
        };

        Ok(items
            .into_iter()
            .map(|item| {
                let viewer_direction = viewer_votes.get(&item.id).copied();
                QueueEntry {
                    item,
                    viewer_direction,
                }
            })
            .collect())
    }

    pub async fn list_own(&self, owner_id: &str) -> Result<Vec<QueueEntry>> {
        if self.repository.get_user(owner_id).await?.is_none() {
            return Err(AppError::Unauthenticated);
        }
        self.list_queue(owner_id, Some(owner_id)).await
    }

    /// Head of the ranked queue.
    pub async fn now_playing(&self, collection_id: &str) -> Result<Option<Item>> {
        Ok(rank(self.repository.get_items_for_owner(collection_id).await?)
            .into_iter()
            .next())
    }

    pub async fn recompute(&self, item_id: &str) -> Result<Tally> {
        self.repository.recompute_tally(item_id).await
    }

    /// Rebuild every cached tally in a stream from the ledger.
    pub async fn recompute_collection(&self, collection_id: &str) -> Result<usize> {
        let items = self.repository.get_items_for_owner(collection_id).await?;

        let repaired: Vec<Tally> = stream::iter(items)
            .map(|item| async move { self.recompute(&item.id).await })
            .buffer_unordered(4)
            .try_collect()
            .await?;

        tracing::info!("Recomputed {} tallies in stream {}", repaired.len(), collection_id);
        Ok(repaired.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::models::{VideoMetadata, VoteOutcome};

    struct StaticResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataResolver for StaticResolver {
        async fn resolve(&self, video_id: &str) -> Result<VideoMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(VideoMetadata {
                title: format!("Track {}", video_id),
                small_img: "small.jpg".to_string(),
                big_img: "big.jpg".to_string(),
            })
        }
    }

    struct BrokenResolver;

    #[async_trait]
    impl MetadataResolver for BrokenResolver {
        async fn resolve(&self, _video_id: &str) -> Result<VideoMetadata> {
            Err(AppError::Resolver("timed out".to_string()))
        }
    }

    async fn service_with(resolver: Arc<dyn MetadataResolver>) -> QueueService {
        let repository = Repository::in_memory().await.unwrap();
        QueueService::with_parts(repository, resolver)
    }

    async fn service() -> QueueService {
        service_with(Arc::new(StaticResolver {
            calls: AtomicUsize::new(0),
        }))
        .await
    }

    fn link(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }

    #[tokio::test]
    async fn duplicate_submission_is_scoped_per_owner() {
        let svc = service().await;
        let u1 = svc.register_user("u1@example.com", "google").await.unwrap();
        let u2 = svc.register_user("u2@example.com", "google").await.unwrap();

        assert_ok!(svc.submit(&u1.id, &link("abc123abc12")).await);
        let err = assert_err!(svc.submit(&u1.id, &link("abc123abc12")).await);
        assert!(matches!(err, AppError::Duplicate(_)));
        assert_ok!(svc.submit(&u2.id, &link("abc123abc12")).await);
    }

    #[tokio::test]
    async fn duplicate_skips_metadata_lookup() {
        let resolver = Arc::new(StaticResolver {
            calls: AtomicUsize::new(0),
        });
        let svc = service_with(resolver.clone()).await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();

        svc.submit(&owner.id, &link("dQw4w9WgXcQ")).await.unwrap();
        // Same video through a different link shape.
        let err = svc.submit(&owner.id, "https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(err.kind(), "duplicate");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_url_changes_nothing() {
        let svc = service().await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();

        let err = svc.submit(&owner.id, "https://vimeo.com/1234").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(svc.list_queue(&owner.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolver_failure_degrades_to_placeholder() {
        let svc = service_with(Arc::new(BrokenResolver)).await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();

        let item = svc.submit(&owner.id, &link("dQw4w9WgXcQ")).await.unwrap();
        assert_eq!(item.title, "Unknown Title");
        assert!(item.big_img.contains("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn concurrent_duplicate_submissions_race_safely() {
        let svc = Arc::new(service().await);
        let owner = svc.register_user("o@example.com", "google").await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                let owner_id = owner.id.clone();
                tokio::spawn(async move { svc.submit(&owner_id, &link("dQw4w9WgXcQ")).await })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::Duplicate(_)) => duplicates += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(svc.list_queue(&owner.id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_upvotes_are_all_counted() {
        const VOTERS: usize = 25;

        let svc = Arc::new(service().await);
        let owner = svc.register_user("o@example.com", "google").await.unwrap();
        let item = svc.submit(&owner.id, &link("dQw4w9WgXcQ")).await.unwrap();

        let mut voters = Vec::new();
        for i in 0..VOTERS {
            voters.push(svc.register_user(&format!("v{}@example.com", i), "google").await.unwrap());
        }

        let handles: Vec<_> = voters
            .into_iter()
            .map(|voter| {
                let svc = svc.clone();
                let item_id = item.id.clone();
                tokio::spawn(async move {
                    // Each voter double-submits, as a retried request would.
                    svc.vote(&voter.id, &item_id, Direction::Up).await?;
                    svc.vote(&voter.id, &item_id, Direction::Up).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let queue = svc.list_queue(&owner.id, None).await.unwrap();
        assert_eq!(queue[0].item.upvotes, VOTERS as i64);
        assert_eq!(queue[0].item.downvotes, 0);
        assert_eq!(svc.recompute(&item.id).await.unwrap().upvotes, VOTERS as i64);
    }

    #[tokio::test]
    async fn votes_reorder_the_queue() {
        let svc = service().await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();
        let alice = svc.register_user("alice@example.com", "google").await.unwrap();
        let bob = svc.register_user("bob@example.com", "google").await.unwrap();

        let first = svc.submit(&owner.id, &link("aaaaaaaaaaa")).await.unwrap();
        let second = svc.submit(&owner.id, &link("bbbbbbbbbbb")).await.unwrap();

        svc.vote(&alice.id, &second.id, Direction::Up).await.unwrap();
        svc.vote(&bob.id, &second.id, Direction::Up).await.unwrap();
        svc.vote(&bob.id, &first.id, Direction::Down).await.unwrap();

        let queue = svc.list_queue(&owner.id, None).await.unwrap();
        let order: Vec<_> = queue.iter().map(|e| e.item.id.clone()).collect();
        assert_eq!(order, vec![second.id.clone(), first.id.clone()]);
        assert_eq!(svc.now_playing(&owner.id).await.unwrap().unwrap().id, second.id);

        // Switching flips the ranking back.
        let flipped = svc.vote(&alice.id, &second.id, Direction::Down).await.unwrap();
        assert_eq!(flipped.outcome, VoteOutcome::Switched);
        svc.vote(&bob.id, &second.id, Direction::Down).await.unwrap();
        assert_eq!(svc.now_playing(&owner.id).await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn listing_reports_only_the_viewers_votes() {
        let svc = service().await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();
        let alice = svc.register_user("alice@example.com", "google").await.unwrap();
        let bob = svc.register_user("bob@example.com", "google").await.unwrap();

        let up = svc.submit(&owner.id, &link("aaaaaaaaaaa")).await.unwrap();
        let down = svc.submit(&owner.id, &link("bbbbbbbbbbb")).await.unwrap();
        svc.vote(&alice.id, &up.id, Direction::Up).await.unwrap();
        svc.vote(&alice.id, &down.id, Direction::Down).await.unwrap();
        svc.vote(&bob.id, &down.id, Direction::Up).await.unwrap();

        let for_alice = svc.list_queue(&owner.id, Some(&alice.id)).await.unwrap();
        let direction_of = |entries: &[QueueEntry], id: &str| {
            entries
                .iter()
                .find(|e| e.item.id == id)
                .and_then(|e| e.viewer_direction)
        };
        assert_eq!(direction_of(&for_alice, &up.id), Some(Direction::Up));
        assert_eq!(direction_of(&for_alice, &down.id), Some(Direction::Down));

        let for_bob = svc.list_queue(&owner.id, Some(&bob.id)).await.unwrap();
        assert_eq!(direction_of(&for_bob, &up.id), None);
        assert_eq!(direction_of(&for_bob, &down.id), Some(Direction::Up));

        let anonymous = svc.list_queue(&owner.id, None).await.unwrap();
        assert!(anonymous.iter().all(|e| e.viewer_direction.is_none()));
    }

    #[tokio::test]
    async fn remove_vote_returns_to_baseline() {
        let svc = service().await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();
        let voter = svc.register_user("v@example.com", "google").await.unwrap();
        let item = svc.submit(&owner.id, &link("dQw4w9WgXcQ")).await.unwrap();

        let before = item.tally();
        svc.vote(&voter.id, &item.id, Direction::Up).await.unwrap();
        let after = svc.remove_vote(&voter.id, &item.id).await.unwrap();
        assert_eq!(after.tally, before);
    }

    #[tokio::test]
    async fn missing_identity_is_rejected_before_the_ledger() {
        let svc = service().await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();
        let item = svc.submit(&owner.id, &link("dQw4w9WgXcQ")).await.unwrap();

        let err = svc.vote("", &item.id, Direction::Up).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        let err = svc.vote("not-a-user", &item.id, Direction::Up).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        let err = svc.vote(&owner.id, "no-such-item", Direction::Up).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_item");
        assert!(svc.register_user("  ", "google").await.is_err());
    }

    #[tokio::test]
    async fn own_listing_and_collection_repair() {
        let svc = service().await;
        let owner = svc.register_user("o@example.com", "google").await.unwrap();
        let first = svc.submit(&owner.id, &link("aaaaaaaaaaa")).await.unwrap();
        svc.submit(&owner.id, &link("bbbbbbbbbbb")).await.unwrap();
        svc.vote(&owner.id, &first.id, Direction::Up).await.unwrap();

        let own = svc.list_own(&owner.id).await.unwrap();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].item.id, first.id);
        assert_eq!(own[0].viewer_direction, Some(Direction::Up));

        assert!(matches!(svc.list_own("ghost").await, Err(AppError::Unauthenticated)));
        assert_eq!(svc.recompute_collection(&owner.id).await.unwrap(), 2);
        assert!(svc.list_queue("unknown-stream", None).await.unwrap().is_empty());
        assert!(svc.now_playing("unknown-stream").await.unwrap().is_none());
    }
}
