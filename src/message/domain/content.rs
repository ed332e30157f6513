//! Embedded-entity parsing for message text.
//!
//! Message bodies may carry embedded entity tokens of the form
//! `!{"type":"user","raw":"@alice","id":"<uuid>"}`. Downstream consumers
//! (broadcast, bot dispatch, search) receive the parse result alongside
//! the created message rather than re-parsing the body themselves.
//!
//! Recognised token types are `user` (a mention), `channel` (a channel
//! link), and `message` (a citation of another message). Malformed tokens
//! are left in the text verbatim.

use super::{ChannelId, MessageId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The result of parsing a message body for embedded entities.
///
/// # Examples
///
/// ```
/// use palaver::message::domain::ParsedContent;
///
/// let parsed = ParsedContent::parse(
///     r#"hi !{"type":"user","raw":"@alice","id":"016b2b41-7a5b-4ad7-9e11-e9b54e4f7a31"}"#,
/// );
/// assert_eq!(parsed.plain_text(), "hi @alice");
/// assert_eq!(parsed.mentions().len(), 1);
/// assert!(!parsed.has_citations());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedContent {
    /// The body with each token replaced by its raw display form.
    plain_text: String,

    /// Users mentioned in the body, in order of first appearance.
    mentions: Vec<UserId>,

    /// Channels linked from the body, in order of first appearance.
    channel_links: Vec<ChannelId>,

    /// Messages cited by the body, in order of first appearance.
    citations: Vec<MessageId>,
}

/// One embedded token as encoded in the message body.
#[derive(Debug, Deserialize)]
struct EmbeddedToken {
    #[serde(rename = "type")]
    kind: String,
    raw: String,
    id: Uuid,
}

impl ParsedContent {
    /// Parses a message body, extracting mentions, channel links, and
    /// citations and producing the plain-text rendering.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parsed = Self {
            plain_text: String::with_capacity(text.len()),
            ..Self::default()
        };

        let mut rest = text;
        while let Some(start) = rest.find("!{") {
            let (head, tail) = rest.split_at(start);
            parsed.plain_text.push_str(head);

            let Some((token, consumed)) = scan_token(tail) else {
                // Not a well-formed token; emit the bang literally and
                // resume scanning at the brace.
                parsed.plain_text.push('!');
                rest = tail.get(1..).unwrap_or("");
                continue;
            };
            parsed.plain_text.push_str(&token.raw);
            parsed.record(&token);
            rest = tail.get(consumed..).unwrap_or("");
        }
        parsed.plain_text.push_str(rest);
        parsed
    }

    fn record(&mut self, token: &EmbeddedToken) {
        match token.kind.as_str() {
            "user" => {
                let id = UserId::from_uuid(token.id);
                if !self.mentions.contains(&id) {
                    self.mentions.push(id);
                }
            }
            "channel" => {
                let id = ChannelId::from_uuid(token.id);
                if !self.channel_links.contains(&id) {
                    self.channel_links.push(id);
                }
            }
            "message" => {
                let id = MessageId::from_uuid(token.id);
                if !self.citations.contains(&id) {
                    self.citations.push(id);
                }
            }
            // Unknown token types still render as their raw form but
            // contribute no entity reference.
            _ => {}
        }
    }

    /// Returns the plain-text rendering of the body.
    #[must_use]
    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    /// Returns the mentioned users.
    #[must_use]
    pub fn mentions(&self) -> &[UserId] {
        &self.mentions
    }

    /// Returns the linked channels.
    #[must_use]
    pub fn channel_links(&self) -> &[ChannelId] {
        &self.channel_links
    }

    /// Returns the cited messages.
    #[must_use]
    pub fn citations(&self) -> &[MessageId] {
        &self.citations
    }

    /// Returns `true` if the body cites at least one message.
    #[must_use]
    pub fn has_citations(&self) -> bool {
        !self.citations.is_empty()
    }
}

/// Attempts to decode an embedded token at the head of `s`.
///
/// `s` must begin with `!{`. Returns the decoded token and the number of
/// bytes consumed (including the leading bang), or `None` if the braces
/// never balance or the JSON does not describe a token.
fn scan_token(s: &str) -> Option<(EmbeddedToken, usize)> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices().skip(1) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = i + c.len_utf8();
                    let body = s.get(1..end)?;
                    let token = serde_json::from_str::<EmbeddedToken>(body).ok()?;
                    return Some((token, end));
                }
            }
            _ => {}
        }
    }
    None
}
