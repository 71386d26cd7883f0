//! Social feed, likes and comment threads.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::http::HttpClient;
use crate::api::notify::Notifier;
use crate::api::types::{Comment, EntityId, FeedQuery, LikeCount, ListPayload, NewPost, Post};
use crate::cache::{views, Entity, EntityCache, RelationIndex};
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, Operation, OperationStatus};

const FETCH_FEED: Operation = Operation::new("fetch_feed", "Failed to load feed");
const FETCH_POST: Operation = Operation::new("fetch_post", "Failed to load post details");
const CREATE_POST: Operation =
  Operation::new("create_post", "Failed to publish post").announce("Post published");
const UPDATE_POST: Operation =
  Operation::new("update_post", "Failed to update post").announce("Post updated");
const DELETE_POST: Operation =
  Operation::new("delete_post", "Failed to delete post").announce("Post deleted");
const TOGGLE_LIKE: Operation = Operation::new("toggle_like", "Operation failed");
const FETCH_COMMENTS: Operation = Operation::new("fetch_comments", "Failed to load comments");
const POST_COMMENT: Operation =
  Operation::new("post_comment", "Failed to post comment").announce("Comment posted");

pub struct SocialStore<H> {
  http: Arc<H>,
  feed: EntityCache<Post>,
  comments: RelationIndex<Comment>,
  lifecycle: Lifecycle,
}

impl<H: HttpClient> SocialStore<H> {
  pub fn new(http: Arc<H>, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      http,
      feed: EntityCache::new(),
      comments: RelationIndex::new(),
      lifecycle: Lifecycle::new("social", notifier),
    }
  }

  pub fn status(&self) -> OperationStatus {
    self.lifecycle.status()
  }

  pub fn feed(&self) -> Vec<Post> {
    self.feed.list()
  }

  pub fn current(&self) -> Option<Post> {
    self.feed.detail()
  }

  pub fn post(&self, id: EntityId) -> Option<Post> {
    views::find_by_id(&self.feed.list(), id)
      .cloned()
      .or_else(|| self.feed.detail().filter(|p| p.id == id))
  }

  /// Loaded comments of a post; empty until [`fetch_comments`](Self::fetch_comments) ran.
  pub fn comments_of(&self, post: EntityId) -> Vec<Comment> {
    self.comments.children_of(post)
  }

  pub fn comments_loaded(&self, post: EntityId) -> bool {
    self.comments.has_loaded(post)
  }

  pub async fn fetch_feed(&self, query: &FeedQuery) -> Result<Vec<Post>> {
    let call = self
      .http
      .get_with::<ListPayload<Post>, _>("/v1/social/feeds", query);
    self
      .lifecycle
      .run(FETCH_FEED, call, |payload| {
        let posts = payload.into_vec();
        self.feed.set_list(posts.clone());
        posts
      })
      .await
  }

  pub async fn fetch_post(&self, id: EntityId) -> Result<Post> {
    let path = format!("/v1/social/feeds/{}", id);
    self
      .lifecycle
      .run(FETCH_POST, self.http.get::<Post>(&path), |post| {
        self.feed.set_detail(post.clone());
        post
      })
      .await
  }

  /// Publish a post; it goes to the top of the feed.
  pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
    let call = self.http.post::<Post, _>("/v1/social/feeds", post);
    self
      .lifecycle
      .run(CREATE_POST, call, |created| {
        self.feed.prepend(created.clone());
        created
      })
      .await
  }

  pub async fn update_post<P>(&self, id: EntityId, patch: &P) -> Result<Post>
  where
    P: Serialize + ?Sized,
  {
    let path = format!("/v1/social/feeds/{}", id);
    self
      .lifecycle
      .run(UPDATE_POST, self.http.put::<Post, _>(&path, patch), |updated| {
        self.feed.upsert_in_list(updated.clone());
        updated
      })
      .await
  }

  pub async fn delete_post(&self, id: EntityId) -> Result<()> {
    let path = format!("/v1/social/feeds/{}", id);
    self
      .lifecycle
      .run(DELETE_POST, self.http.delete::<Value>(&path), |_| {
        self.feed.evict(id);
        self.comments.remove_parent(id);
      })
      .await
  }

  /// Like or unlike a post in the feed. Returns the new like state.
  ///
  /// The like count always comes from the server's answer.
  pub async fn toggle_like(&self, id: EntityId) -> Result<bool> {
    let Some(post) = self.feed.find(id) else {
      return Err(Error::NotCached {
        entity: Post::entity_type(),
        id,
      });
    };

    let liked = !post.is_liked;
    let path = format!("/v1/social/feeds/{}/like", id);
    let action = if liked { "like" } else { "unlike" };
    let body = json!({ "action": action });
    self
      .lifecycle
      .run(TOGGLE_LIKE, self.http.post::<LikeCount, _>(&path, &body), |count| {
        self.feed.update(id, |p| {
          p.is_liked = liked;
          p.likes = count.likes;
        });
        liked
      })
      .await
  }

  /// Load a post's comments. The post's comment count is resynchronised to
  /// the loaded sequence.
  pub async fn fetch_comments(&self, post: EntityId) -> Result<Vec<Comment>> {
    let path = format!("/v1/social/feeds/{}/comments", post);
    let call = self.http.get::<ListPayload<Comment>>(&path);
    self
      .lifecycle
      .run(FETCH_COMMENTS, call, |payload| {
        let comments = payload.into_vec();
        self.comments.load_children(&self.feed, post, comments.clone());
        comments
      })
      .await
  }

  pub async fn post_comment(&self, post: EntityId, content: &str) -> Result<Comment> {
    let content = content.trim();
    if content.is_empty() {
      return Err(Error::InvalidInput("comment cannot be empty".to_string()));
    }
    if self.post(post).is_none() {
      return Err(Error::NotCached {
        entity: Post::entity_type(),
        id: post,
      });
    }

    let path = format!("/v1/social/feeds/{}/comments", post);
    let body = json!({ "content": content });
    self
      .lifecycle
      .run(POST_COMMENT, self.http.post::<Comment, _>(&path, &body), |comment| {
        self.comments.add_child(&self.feed, post, comment.clone());
        comment
      })
      .await
  }

  pub fn reset(&self) {
    self.feed.clear();
    self.comments.clear();
    self.lifecycle.reset();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::http::Method;
  use crate::api::notify::NotifyKind;
  use crate::testing::{MockHttp, RecordingNotifier};

  fn store() -> (SocialStore<MockHttp>, Arc<MockHttp>, Arc<RecordingNotifier>) {
    let http = MockHttp::new();
    let notifier = Arc::new(RecordingNotifier::default());
    (SocialStore::new(http.clone(), notifier.clone()), http, notifier)
  }

  fn post_json(id: EntityId, likes: u64, comments: u64, liked: bool) -> Value {
    json!({
      "id": id,
      "userId": 1,
      "content": format!("post {}", id),
      "likes": likes,
      "commentCount": comments,
      "isLiked": liked,
      "createdAt": "2024-04-01T10:00:00Z"
    })
  }

  fn comment_json(id: EntityId, feed: EntityId) -> Value {
    json!({"id": id, "feedId": feed, "userId": 2, "content": "nice", "createdAt": "2024-04-01"})
  }

  async fn seeded() -> (SocialStore<MockHttp>, Arc<MockHttp>, Arc<RecordingNotifier>) {
    let (store, http, notifier) = store();
    http.reply(
      Method::Get,
      "/v1/social/feeds",
      json!([post_json(7, 3, 2, false), post_json(8, 0, 0, true)]),
    );
    store.fetch_feed(&FeedQuery::default()).await.unwrap();
    (store, http, notifier)
  }

  #[tokio::test]
  async fn test_like_uses_server_count() {
    let (store, http, _) = seeded().await;
    http.reply(Method::Post, "/v1/social/feeds/7/like", json!({"likes": 4}));

    assert!(store.toggle_like(7).await.unwrap());

    let post = store.post(7).unwrap();
    assert_eq!(post.likes, 4);
    assert!(post.is_liked);
    assert_eq!(http.last_call().unwrap().body, Some(json!({"action": "like"})));
  }

  #[tokio::test]
  async fn test_unlike_takes_count_even_if_it_drifted() {
    let (store, http, _) = seeded().await;
    http.reply(Method::Get, "/v1/social/feeds/8", post_json(8, 0, 0, true));
    store.fetch_post(8).await.unwrap();
    // Someone else liked it meanwhile; the server count wins over a local decrement.
    http.reply(Method::Post, "/v1/social/feeds/8/like", json!({"likes": 5}));

    assert!(!store.toggle_like(8).await.unwrap());

    assert_eq!(store.post(8).unwrap().likes, 5);
    assert_eq!(store.current().unwrap().likes, 5);
    assert!(!store.current().unwrap().is_liked);
    assert_eq!(http.last_call().unwrap().body, Some(json!({"action": "unlike"})));
  }

  #[tokio::test]
  async fn test_failed_like_changes_nothing() {
    let (store, http, notifier) = seeded().await;
    http.fail(
      Method::Post,
      "/v1/social/feeds/7/like",
      Error::from_status(500, "like service down"),
    );
    let before = store.feed();

    assert!(store.toggle_like(7).await.is_err());

    assert_eq!(store.feed(), before);
    assert_eq!(notifier.messages(NotifyKind::Error), vec!["like service down"]);
  }

  #[tokio::test]
  async fn test_like_requires_post_in_feed() {
    let (store, http, _) = seeded().await;
    let err = store.toggle_like(99).await.unwrap_err();
    assert!(matches!(err, Error::NotCached { entity: "post", id: 99 }));
    assert_eq!(http.call_count(Method::Post, "/v1/social/feeds/99/like"), 0);
  }

  #[tokio::test]
  async fn test_create_post_prepends() {
    let (store, http, notifier) = seeded().await;
    http.reply(Method::Post, "/v1/social/feeds", post_json(9, 0, 0, false));

    let draft = NewPost {
      content: "first class done".into(),
      ..Default::default()
    };
    store.create_post(&draft).await.unwrap();

    let ids: Vec<_> = store.feed().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![9, 7, 8]);
    assert_eq!(notifier.messages(NotifyKind::Success), vec!["Post published"]);
  }

  #[tokio::test]
  async fn test_fetch_comments_syncs_counter() {
    let (store, http, _) = seeded().await;
    assert!(!store.comments_loaded(7));
    http.reply(
      Method::Get,
      "/v1/social/feeds/7/comments",
      json!([comment_json(1, 7), comment_json(2, 7), comment_json(3, 7)]),
    );

    store.fetch_comments(7).await.unwrap();

    assert!(store.comments_loaded(7));
    assert_eq!(store.comments_of(7).len(), 3);
    assert_eq!(store.post(7).unwrap().comment_count, 3);
  }

  #[tokio::test]
  async fn test_post_comment_keeps_counter_in_step() {
    let (store, http, _) = seeded().await;
    http.reply(
      Method::Get,
      "/v1/social/feeds/7/comments",
      json!([comment_json(1, 7), comment_json(2, 7)]),
    );
    store.fetch_comments(7).await.unwrap();
    http.reply(Method::Post, "/v1/social/feeds/7/comments", comment_json(3, 7));

    store.post_comment(7, "  see you Friday ").await.unwrap();

    let post = store.post(7).unwrap();
    assert_eq!(post.comment_count, 3);
    assert_eq!(store.comments_of(7).len() as u64, post.comment_count);
    assert_eq!(
      http.last_call().unwrap().body,
      Some(json!({"content": "see you Friday"}))
    );
  }

  #[tokio::test]
  async fn test_post_comment_on_unloaded_thread_bumps_counter_only() {
    let (store, http, _) = seeded().await;
    http.reply(Method::Post, "/v1/social/feeds/7/comments", comment_json(5, 7));

    store.post_comment(7, "hello").await.unwrap();

    assert_eq!(store.post(7).unwrap().comment_count, 3);
    assert!(!store.comments_loaded(7));
  }

  #[tokio::test]
  async fn test_failed_comment_leaves_thread_and_counter() {
    let (store, http, _) = seeded().await;
    http.reply(Method::Get, "/v1/social/feeds/7/comments", json!([comment_json(1, 7)]));
    store.fetch_comments(7).await.unwrap();
    http.fail(
      Method::Post,
      "/v1/social/feeds/7/comments",
      Error::transport("timed out"),
    );

    assert!(store.post_comment(7, "hello").await.is_err());

    assert_eq!(store.comments_of(7).len(), 1);
    assert_eq!(store.post(7).unwrap().comment_count, 1);
  }

  #[tokio::test]
  async fn test_empty_comment_is_rejected_locally() {
    let (store, http, _) = seeded().await;
    let err = store.post_comment(7, "   ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(http.call_count(Method::Post, "/v1/social/feeds/7/comments"), 0);
  }

  #[tokio::test]
  async fn test_delete_post_drops_thread() {
    let (store, http, _) = seeded().await;
    http.reply(Method::Get, "/v1/social/feeds/7/comments", json!([comment_json(1, 7)]));
    store.fetch_comments(7).await.unwrap();
    http.reply(Method::Delete, "/v1/social/feeds/7", Value::Null);

    store.delete_post(7).await.unwrap();

    assert!(store.post(7).is_none());
    assert!(!store.comments_loaded(7));
  }

  #[tokio::test]
  async fn test_update_post_replaces_copy() {
    let (store, http, _) = seeded().await;
    let mut edited = post_json(8, 0, 0, true);
    edited["content"] = json!("edited");
    http.reply(Method::Put, "/v1/social/feeds/8", edited);

    store.update_post(8, &json!({"content": "edited"})).await.unwrap();

    assert_eq!(store.post(8).unwrap().content, "edited");
  }
}
