//! Service orchestration tests for the message store.
//!
//! Exercises `MessageService` over the in-memory repository with a
//! recording notifier, covering boundary validation and the post-commit
//! event contract: events fire exactly once per committed mutation and
//! never for a failed one.

use std::sync::{Arc, Mutex};

use crate::message::{
    adapters::memory::InMemoryMessageRepository,
    domain::{ChannelId, MessageId, MessageQuery, StampId, StoreEvent, UserId},
    error::{StoreError, ValidationError},
    ports::notifier::ChangeNotifier,
    services::MessageService,
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use uuid::Uuid;

// ============================================================================
// Fixtures
// ============================================================================

/// A notifier that records every published event for later assertions.
#[derive(Debug, Default)]
struct RecordingNotifier {
    events: Mutex<Vec<StoreEvent>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(StoreEvent::name).collect()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn publish(&self, event: StoreEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

type TestService = MessageService<InMemoryMessageRepository, RecordingNotifier, DefaultClock>;

struct Harness {
    repository: Arc<InMemoryMessageRepository>,
    notifier: Arc<RecordingNotifier>,
    service: TestService,
}

#[fixture]
fn harness() -> Harness {
    let repository = Arc::new(InMemoryMessageRepository::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = MessageService::new(
        Arc::clone(&repository),
        Arc::clone(&notifier),
        Arc::new(DefaultClock),
    );
    Harness {
        repository,
        notifier,
        service,
    }
}

fn citation_token(id: MessageId) -> String {
    format!(r#"!{{"type":"message","raw":"quote","id":"{id}"}}"#)
}

// ============================================================================
// Create
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_persists_and_publishes_created_event(harness: Harness) {
    let channel = ChannelId::new();
    let created = harness
        .service
        .create(UserId::new(), channel, "hello")
        .await
        .expect("create should succeed");

    let fetched = harness
        .service
        .get(created.id())
        .await
        .expect("get should succeed");
    assert_eq!(fetched, created);

    let pointer = harness
        .repository
        .latest_pointer(channel)
        .expect("pointer should exist");
    assert_eq!(pointer.message_id(), created.id());

    let events = harness.notifier.events();
    assert_eq!(events.len(), 1);
    let StoreEvent::MessageCreated { message, parsed } = &events[0] else {
        panic!("expected a created event, got {}", events[0].name());
    };
    assert_eq!(message.id(), created.id());
    assert_eq!(parsed.plain_text(), "hello");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_with_citation_publishes_cited_after_created(harness: Harness) {
    let cited = MessageId::new();
    let text = format!("quoting {}", citation_token(cited));
    harness
        .service
        .create(UserId::new(), ChannelId::new(), text)
        .await
        .expect("create should succeed");

    assert_eq!(
        harness.notifier.names(),
        vec!["message_created", "message_cited"],
    );
    let events = harness.notifier.events();
    let StoreEvent::MessageCited { cited: ids, .. } = &events[1] else {
        panic!("expected a cited event");
    };
    assert_eq!(ids, &vec![cited]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_rejects_nil_author_without_side_effects(harness: Harness) {
    let err = harness
        .service
        .create(UserId::nil(), ChannelId::new(), "hello")
        .await
        .expect_err("nil author should be rejected");
    assert!(matches!(
        err,
        StoreError::InvalidArgument(ValidationError::NilId { field: "author id" }),
    ));
    assert!(harness.repository.is_empty());
    assert!(harness.notifier.events().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_rejects_empty_text(harness: Harness) {
    let err = harness
        .service
        .create(UserId::new(), ChannelId::new(), "")
        .await
        .expect_err("empty text should be rejected");
    assert!(matches!(
        err,
        StoreError::InvalidArgument(ValidationError::EmptyText),
    ));
    assert!(harness.notifier.events().is_empty());
}

// ============================================================================
// Update
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_archives_once_and_publishes_both_snapshots(harness: Harness) {
    let created = harness
        .service
        .create(UserId::new(), ChannelId::new(), "draft")
        .await
        .expect("create should succeed");

    let updated = harness
        .service
        .update(created.id(), "final")
        .await
        .expect("update should succeed");
    assert_eq!(updated.text(), "final");
    assert_eq!(harness.repository.archive_count(created.id()), 1);

    let archives = harness
        .service
        .archives(created.id())
        .await
        .expect("archive read should succeed");
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].text(), "draft");

    let events = harness.notifier.events();
    let StoreEvent::MessageUpdated { old, new } = &events[1] else {
        panic!("expected an updated event, got {}", events[1].name());
    };
    assert_eq!(old.text(), "draft");
    assert_eq!(new.text(), "final");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_missing_message_publishes_nothing(harness: Harness) {
    let err = harness
        .service
        .update(MessageId::new(), "text")
        .await
        .expect_err("update of a missing message should fail");
    assert!(err.is_not_found());
    assert!(harness.notifier.events().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_rejects_nil_id_before_touching_storage(harness: Harness) {
    let err = harness
        .service
        .update(MessageId::nil(), "text")
        .await
        .expect_err("nil id should be rejected");
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    assert!(!err.is_not_found());
}

// ============================================================================
// Delete
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_cascades_and_publishes_cleared_markers(harness: Harness) {
    let reader = UserId::new();
    let created = harness
        .service
        .create(UserId::new(), ChannelId::new(), "doomed")
        .await
        .expect("create should succeed");
    harness
        .service
        .mark_unread(reader, created.id(), false)
        .await
        .expect("mark should succeed");

    harness
        .service
        .delete(created.id())
        .await
        .expect("delete should succeed");

    let err = harness
        .service
        .get(created.id())
        .await
        .expect_err("deleted message should not be readable");
    assert!(err.is_not_found());

    let events = harness.notifier.events();
    let StoreEvent::MessageDeleted {
        message,
        cleared_unreads,
    } = events.last().expect("delete should publish an event")
    else {
        panic!("expected a deleted event");
    };
    assert_eq!(message.id(), created.id());
    assert!(message.is_deleted());
    assert_eq!(cleared_unreads.len(), 1);
    assert_eq!(cleared_unreads[0].user_id(), reader);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_twice_fails_and_publishes_once(harness: Harness) {
    let created = harness
        .service
        .create(UserId::new(), ChannelId::new(), "once")
        .await
        .expect("create should succeed");
    harness
        .service
        .delete(created.id())
        .await
        .expect("first delete should succeed");

    let err = harness
        .service
        .delete(created.id())
        .await
        .expect_err("second delete should fail");
    assert!(err.is_not_found());

    let deletions = harness
        .notifier
        .names()
        .iter()
        .filter(|name| **name == "message_deleted")
        .count();
    assert_eq!(deletions, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn latest_pointer_stays_observable_after_delete(harness: Harness) {
    let channel = ChannelId::new();
    harness.repository.seed_public_channel(channel);
    let created = harness
        .service
        .create(UserId::new(), channel, "latest")
        .await
        .expect("create should succeed");
    harness
        .service
        .delete(created.id())
        .await
        .expect("delete should succeed");

    let latest = harness
        .service
        .latest_per_channel(UserId::new(), None, false)
        .await
        .expect("latest read should succeed");
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id(), created.id());
    assert!(latest[0].is_deleted());
}

// ============================================================================
// Reads
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn get_nil_id_is_not_found(harness: Harness) {
    let err = harness
        .service
        .get(MessageId::nil())
        .await
        .expect_err("nil id should read as absent");
    assert!(err.is_not_found());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_pages_with_look_ahead(harness: Harness) {
    let channel = ChannelId::new();
    let author = UserId::new();
    for _ in 0..3 {
        harness
            .service
            .create(author, channel, "entry")
            .await
            .expect("create should succeed");
    }

    let page = harness
        .service
        .list(&MessageQuery::new().in_channel(channel).with_limit(2))
        .await
        .expect("list should succeed");
    assert_eq!(page.items.len(), 2);
    assert!(page.has_more);
}

// ============================================================================
// Unreads
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mark_unread_publishes_only_on_first_insert(harness: Harness) {
    let reader = UserId::new();
    let created = harness
        .service
        .create(UserId::new(), ChannelId::new(), "news")
        .await
        .expect("create should succeed");

    harness
        .service
        .mark_unread(reader, created.id(), false)
        .await
        .expect("first mark should succeed");
    harness
        .service
        .mark_unread(reader, created.id(), true)
        .await
        .expect("repeat mark should succeed");

    let unread = harness
        .service
        .list_unread(reader)
        .await
        .expect("unread read should succeed");
    assert_eq!(unread.len(), 1);

    let marks = harness
        .notifier
        .names()
        .iter()
        .filter(|name| **name == "message_unread")
        .count();
    assert_eq!(marks, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clear_channel_unreads_publishes_the_removed_count(harness: Harness) {
    let reader = UserId::new();
    let channel = ChannelId::new();
    for _ in 0..2 {
        let created = harness
            .service
            .create(UserId::new(), channel, "unread")
            .await
            .expect("create should succeed");
        harness
            .service
            .mark_unread(reader, created.id(), false)
            .await
            .expect("mark should succeed");
    }

    let cleared = harness
        .service
        .clear_channel_unreads(channel, reader)
        .await
        .expect("clear should succeed");
    assert_eq!(cleared, 2);

    let events = harness.notifier.events();
    let StoreEvent::ChannelRead {
        channel_id,
        user_id,
        cleared: count,
    } = events.last().expect("clear should publish an event")
    else {
        panic!("expected a channel-read event");
    };
    assert_eq!(*channel_id, channel);
    assert_eq!(*user_id, reader);
    assert_eq!(*count, 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clear_with_nothing_unread_publishes_nothing(harness: Harness) {
    let cleared = harness
        .service
        .clear_channel_unreads(ChannelId::new(), UserId::new())
        .await
        .expect("clear should succeed");
    assert_eq!(cleared, 0);
    assert!(harness.notifier.events().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unread_summary_reflects_marks(harness: Harness) {
    let reader = UserId::new();
    let channel = ChannelId::new();
    let created = harness
        .service
        .create(UserId::new(), channel, "ping")
        .await
        .expect("create should succeed");
    harness
        .service
        .mark_unread(reader, created.id(), true)
        .await
        .expect("mark should succeed");

    let summary = harness
        .service
        .unread_summary(reader)
        .await
        .expect("summary should succeed");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].channel_id, channel);
    assert_eq!(summary[0].count, 1);
    assert!(summary[0].noticeable);
}

// ============================================================================
// Stamps
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn add_stamp_returns_authoritative_count_and_publishes(harness: Harness) {
    let created = harness
        .service
        .create(UserId::new(), ChannelId::new(), "nice")
        .await
        .expect("create should succeed");
    let stamp = StampId::new();
    let reactor = UserId::new();

    harness
        .service
        .add_stamp(created.id(), stamp, reactor, 1)
        .await
        .expect("first stamp should succeed");
    let row = harness
        .service
        .add_stamp(created.id(), stamp, reactor, 2)
        .await
        .expect("second stamp should succeed");
    assert_eq!(row.count(), 3);

    let additions = harness
        .notifier
        .names()
        .iter()
        .filter(|name| **name == "stamp_added")
        .count();
    assert_eq!(additions, 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn add_stamp_rejects_non_positive_delta(harness: Harness) {
    let err = harness
        .service
        .add_stamp(MessageId::new(), StampId::new(), UserId::new(), 0)
        .await
        .expect_err("zero delta should be rejected");
    assert!(matches!(
        err,
        StoreError::InvalidArgument(ValidationError::InvalidStampDelta(0)),
    ));
    assert!(harness.notifier.events().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remove_stamp_publishes_only_when_a_row_was_deleted(harness: Harness) {
    let created = harness
        .service
        .create(UserId::new(), ChannelId::new(), "nice")
        .await
        .expect("create should succeed");
    let stamp = StampId::new();
    let reactor = UserId::new();
    harness
        .service
        .add_stamp(created.id(), stamp, reactor, 1)
        .await
        .expect("stamp should succeed");

    harness
        .service
        .remove_stamp(created.id(), stamp, reactor)
        .await
        .expect("remove should succeed");
    harness
        .service
        .remove_stamp(created.id(), stamp, reactor)
        .await
        .expect("repeat remove should still succeed");

    let removals = harness
        .notifier
        .names()
        .iter()
        .filter(|name| **name == "stamp_removed")
        .count();
    assert_eq!(removals, 1);
}

// ============================================================================
// Validation coverage across operations
// ============================================================================

#[rstest]
#[case::nil_channel(Uuid::nil(), false)]
#[case::nil_user(Uuid::max(), true)]
#[tokio::test(flavor = "multi_thread")]
async fn clear_rejects_nil_identifiers(
    harness: Harness,
    #[case] channel: Uuid,
    #[case] nil_user: bool,
) {
    let channel = ChannelId::from_uuid(channel);
    let user = if nil_user {
        UserId::nil()
    } else {
        UserId::new()
    };

    let err = harness
        .service
        .clear_channel_unreads(channel, user)
        .await
        .expect_err("nil identifier should be rejected");
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}
