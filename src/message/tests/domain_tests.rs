//! Unit tests for domain types.

use crate::message::domain::{
    ArchivedMessage, ChannelId, Message, MessageId, MessageQuery, MessageStamp, Order, Page,
    ParsedContent, PersistedMessageData, StampId, StoreEvent, TimeBound, UnreadMarker, UserId,
};
use chrono::{DateTime, TimeZone, Utc};
use mockable::DefaultClock;
use rstest::rstest;
use uuid::Uuid;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .expect("valid timestamp")
}

fn message_at(
    channel: ChannelId,
    author: UserId,
    text: &str,
    created: DateTime<Utc>,
) -> Message {
    Message::from_persisted(PersistedMessageData {
        id: MessageId::new(),
        author_id: author,
        channel_id: channel,
        text: text.to_owned(),
        created_at: created,
        updated_at: created,
        deleted_at: None,
    })
}

// ============================================================================
// Identifier tests
// ============================================================================

#[rstest]
fn message_id_new_creates_non_nil() {
    assert!(!MessageId::new().is_nil());
}

#[rstest]
fn message_id_nil_is_nil() {
    assert!(MessageId::nil().is_nil());
}

#[rstest]
fn message_id_display_matches_inner_uuid() {
    let uuid = Uuid::new_v4();
    let id = MessageId::from_uuid(uuid);
    assert_eq!(id.to_string(), uuid.to_string());
    assert_eq!(id.into_inner(), uuid);
}

#[rstest]
fn distinct_ids_are_unequal() {
    assert_ne!(UserId::new(), UserId::new());
}

// ============================================================================
// Message tests
// ============================================================================

#[rstest]
fn new_message_is_live_with_equal_timestamps() {
    let message = Message::new(UserId::new(), ChannelId::new(), "hello", &DefaultClock);
    assert!(!message.is_deleted());
    assert_eq!(message.created_at(), message.updated_at());
}

#[rstest]
fn edited_replaces_text_and_refreshes_updated_at_only() {
    let original = message_at(ChannelId::new(), UserId::new(), "before", at(100));
    let edited = original.edited("after", at(200));

    assert_eq!(edited.id(), original.id());
    assert_eq!(edited.text(), "after");
    assert_eq!(edited.created_at(), at(100));
    assert_eq!(edited.updated_at(), at(200));
    assert!(!edited.is_deleted());
}

#[rstest]
fn soft_deleted_sets_deletion_timestamp_and_keeps_text() {
    let original = message_at(ChannelId::new(), UserId::new(), "body", at(100));
    let deleted = original.soft_deleted(at(300));

    assert!(deleted.is_deleted());
    assert_eq!(deleted.deleted_at(), Some(at(300)));
    assert_eq!(deleted.text(), "body");
}

#[rstest]
fn archive_capture_snapshots_pre_edit_state() {
    let message = message_at(ChannelId::new(), UserId::new(), "revision one", at(100));
    let archive = ArchivedMessage::capture(&message);

    assert_eq!(archive.message_id(), message.id());
    assert_eq!(archive.author_id(), message.author_id());
    assert_eq!(archive.text(), "revision one");
    assert_eq!(archive.as_of(), message.updated_at());
}

// ============================================================================
// ParsedContent tests
// ============================================================================

#[rstest]
fn parse_plain_text_passes_through() {
    let parsed = ParsedContent::parse("no tokens here");
    assert_eq!(parsed.plain_text(), "no tokens here");
    assert!(parsed.mentions().is_empty());
    assert!(parsed.channel_links().is_empty());
    assert!(!parsed.has_citations());
}

#[rstest]
fn parse_extracts_user_mention_and_renders_raw_form() {
    let id = Uuid::new_v4();
    let text = format!(r#"hi !{{"type":"user","raw":"@alice","id":"{id}"}}!"#);
    let parsed = ParsedContent::parse(&text);

    assert_eq!(parsed.plain_text(), "hi @alice!");
    assert_eq!(parsed.mentions(), &[UserId::from_uuid(id)]);
}

#[rstest]
fn parse_extracts_channel_link_and_citation() {
    let channel = Uuid::new_v4();
    let cited = Uuid::new_v4();
    let text = format!(
        r##"see !{{"type":"channel","raw":"#general","id":"{channel}"}} and !{{"type":"message","raw":"quote","id":"{cited}"}}"##,
    );
    let parsed = ParsedContent::parse(&text);

    assert_eq!(parsed.plain_text(), "see #general and quote");
    assert_eq!(parsed.channel_links(), &[ChannelId::from_uuid(channel)]);
    assert_eq!(parsed.citations(), &[MessageId::from_uuid(cited)]);
    assert!(parsed.has_citations());
}

#[rstest]
fn parse_deduplicates_repeated_references() {
    let id = Uuid::new_v4();
    let token = format!(r#"!{{"type":"user","raw":"@bob","id":"{id}"}}"#);
    let parsed = ParsedContent::parse(&format!("{token} {token}"));

    assert_eq!(parsed.plain_text(), "@bob @bob");
    assert_eq!(parsed.mentions().len(), 1);
}

#[rstest]
fn parse_unknown_token_type_renders_raw_without_reference() {
    let id = Uuid::new_v4();
    let text = format!(r#"!{{"type":"group","raw":"@staff","id":"{id}"}}"#);
    let parsed = ParsedContent::parse(&text);

    assert_eq!(parsed.plain_text(), "@staff");
    assert!(parsed.mentions().is_empty());
    assert!(parsed.channel_links().is_empty());
    assert!(parsed.citations().is_empty());
}

#[rstest]
#[case::unbalanced_braces("broken !{\"type\":\"user\"")]
#[case::not_json("look !{not json} here")]
#[case::missing_fields(r#"odd !{"type":"user"} token"#)]
fn parse_malformed_token_is_left_verbatim(#[case] text: &str) {
    let parsed = ParsedContent::parse(text);
    assert_eq!(parsed.plain_text(), text);
    assert!(parsed.mentions().is_empty());
}

#[rstest]
fn parse_token_with_escaped_quote_in_raw() {
    let id = Uuid::new_v4();
    let text = format!(r#"!{{"type":"user","raw":"say \"hi\"","id":"{id}"}}"#);
    let parsed = ParsedContent::parse(&text);

    assert_eq!(parsed.plain_text(), r#"say "hi""#);
    assert_eq!(parsed.mentions().len(), 1);
}

// ============================================================================
// MessageQuery tests
// ============================================================================

#[rstest]
fn query_matches_channel_and_author_scopes() {
    let channel = ChannelId::new();
    let author = UserId::new();
    let message = message_at(channel, author, "x", at(100));

    assert!(MessageQuery::new().in_channel(channel).matches(&message));
    assert!(!MessageQuery::new().in_channel(ChannelId::new()).matches(&message));
    assert!(MessageQuery::new().by_author(author).matches(&message));
    assert!(!MessageQuery::new().by_author(UserId::new()).matches(&message));
}

#[rstest]
#[case::inclusive_at_boundary(TimeBound::inclusive(at(100)), true)]
#[case::exclusive_at_boundary(TimeBound::exclusive(at(100)), false)]
#[case::inclusive_before(TimeBound::inclusive(at(101)), false)]
fn query_since_bound_honours_inclusivity(#[case] bound: TimeBound, #[case] included: bool) {
    let message = message_at(ChannelId::new(), UserId::new(), "x", at(100));
    assert_eq!(MessageQuery::new().since(bound).matches(&message), included);
}

#[rstest]
#[case::inclusive_at_boundary(TimeBound::inclusive(at(100)), true)]
#[case::exclusive_at_boundary(TimeBound::exclusive(at(100)), false)]
#[case::inclusive_after(TimeBound::inclusive(at(99)), false)]
fn query_until_bound_honours_inclusivity(#[case] bound: TimeBound, #[case] included: bool) {
    let message = message_at(ChannelId::new(), UserId::new(), "x", at(100));
    assert_eq!(MessageQuery::new().until(bound).matches(&message), included);
}

#[rstest]
fn query_default_order_is_descending() {
    assert_eq!(MessageQuery::new().order(), Order::Descending);
    assert_eq!(MessageQuery::new().ascending().order(), Order::Ascending);
}

#[rstest]
fn query_nil_scope_is_detected() {
    assert!(MessageQuery::new().in_channel(ChannelId::nil()).has_nil_scope());
    assert!(MessageQuery::new().by_author(UserId::nil()).has_nil_scope());
    assert!(MessageQuery::new().subscribed_by(UserId::nil()).has_nil_scope());
    assert!(!MessageQuery::new().in_channel(ChannelId::new()).has_nil_scope());
}

// ============================================================================
// Page tests
// ============================================================================

#[rstest]
fn page_look_ahead_trims_extra_row_and_flags_more() {
    let page = Page::from_look_ahead(vec![1, 2, 3], Some(2));
    assert_eq!(page.items, vec![1, 2]);
    assert!(page.has_more);
}

#[rstest]
fn page_look_ahead_exact_limit_has_no_more() {
    let page = Page::from_look_ahead(vec![1, 2], Some(2));
    assert_eq!(page.items, vec![1, 2]);
    assert!(!page.has_more);
}

#[rstest]
fn page_without_limit_keeps_everything() {
    let page = Page::from_look_ahead(vec![1, 2, 3], None);
    assert_eq!(page.items, vec![1, 2, 3]);
    assert!(!page.has_more);
}

// ============================================================================
// Unread marker and stamp tests
// ============================================================================

#[rstest]
fn unread_marker_with_noticeable_changes_only_the_flag() {
    let marker = UnreadMarker::new(UserId::new(), MessageId::new(), false, at(100));
    let updated = marker.clone().with_noticeable(true);

    assert!(updated.noticeable());
    assert_eq!(updated.user_id(), marker.user_id());
    assert_eq!(updated.message_id(), marker.message_id());
    assert_eq!(updated.marked_at(), marker.marked_at());
}

#[rstest]
fn stamp_incremented_raises_count_and_keeps_first_applied() {
    let stamp = MessageStamp::new(
        MessageId::new(),
        StampId::new(),
        UserId::new(),
        1,
        at(100),
        at(100),
    );
    let raised = stamp.incremented(3, at(200));

    assert_eq!(raised.count(), 4);
    assert_eq!(raised.first_applied_at(), at(100));
    assert_eq!(raised.updated_at(), at(200));
}

// ============================================================================
// Event tests
// ============================================================================

#[rstest]
fn event_names_are_stable() {
    let event = StoreEvent::MessageUnread {
        message_id: MessageId::new(),
        user_id: UserId::new(),
        noticeable: true,
    };
    assert_eq!(event.name(), "message_unread");

    let event = StoreEvent::StampRemoved {
        message_id: MessageId::new(),
        stamp_id: StampId::new(),
        user_id: UserId::new(),
    };
    assert_eq!(event.name(), "stamp_removed");
}
