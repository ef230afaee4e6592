//! Message types: authorship, reply references, mention derivation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// Who produced a message.
///
/// Synthetic room events are tagged variants rather than a reserved
/// username, so a user literally named "System" cannot spoof them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum Author {
    /// An ordinary member.
    User(String),
    /// A room lifecycle event (join, leave, timeout, creation).
    System,
    /// A moderation action attributed to the acting admin.
    AdminAction(String),
}

impl Author {
    /// The username behind this author, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            Author::User(name) | Author::AdminAction(name) => Some(name),
            Author::System => None,
        }
    }

    /// Whether this message was written by the given user.
    pub fn is_user(&self, username: &str) -> bool {
        matches!(self, Author::User(name) if name == username)
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::User(name) | Author::AdminAction(name) => f.write_str(name),
            Author::System => f.write_str("System"),
        }
    }
}

/// Quoted context for a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub author: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A single chat message.
///
/// Mutated in place only by author edits and read-receipt
/// accumulation; otherwise append-only until ring-buffer eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author: Author,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
    #[serde(default)]
    pub is_announcement: bool,
    /// Usernames that have seen this message.
    #[serde(default)]
    pub read_by: BTreeSet<String>,
    /// Usernames referenced as `@name` in the text.
    #[serde(default)]
    pub mentions: Vec<String>,
}

impl Message {
    /// Create a user message, deriving mentions from the text.
    pub fn user(
        username: &str,
        text: &str,
        now: i64,
        reply_to: Option<ReplyRef>,
        is_announcement: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: Author::User(username.to_string()),
            text: text.to_string(),
            created_at: now,
            edited_at: None,
            reply_to,
            is_announcement,
            read_by: BTreeSet::new(),
            mentions: derive_mentions(text),
        }
    }

    /// Create a synthetic room event message.
    pub fn system(text: impl Into<String>, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: Author::System,
            text: text.into(),
            created_at: now,
            edited_at: None,
            reply_to: None,
            is_announcement: false,
            read_by: BTreeSet::new(),
            mentions: Vec::new(),
        }
    }

    /// Create a moderation event attributed to the acting admin.
    pub fn admin_action(admin: &str, text: impl Into<String>, now: i64) -> Self {
        Self {
            author: Author::AdminAction(admin.to_string()),
            ..Self::system(text, now)
        }
    }

    /// Whether this message belongs in a delta for `since`: new
    /// messages and edits both surface.
    pub fn changed_since(&self, since: i64) -> bool {
        self.created_at > since || self.edited_at.is_some_and(|t| t > since)
    }
}

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([A-Za-z0-9_-]+)").expect("mention regex compiles"))
}

/// Scan text for `@name` tokens. Duplicates collapse, order of first
/// appearance is kept.
pub fn derive_mentions(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut mentions = Vec::new();
    for cap in mention_re().captures_iter(text) {
        let name = &cap[1];
        if seen.insert(name.to_string()) {
            mentions.push(name.to_string());
        }
    }
    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_are_derived_and_deduplicated() {
        let mentions = derive_mentions("hey @alice and @bob-2, ping @alice again");
        assert_eq!(mentions, vec!["alice", "bob-2"]);
    }

    #[test]
    fn no_mentions_in_plain_text() {
        assert!(derive_mentions("nothing to see here").is_empty());
        assert!(derive_mentions("mail me at? @ alone does not count").is_empty());
    }

    #[test]
    fn user_message_carries_mentions() {
        let msg = Message::user("alice", "hi @bob", 1000, None, false);
        assert_eq!(msg.mentions, vec!["bob"]);
        assert!(msg.author.is_user("alice"));
        assert!(!msg.author.is_user("bob"));
    }

    #[test]
    fn system_author_is_not_a_user() {
        let msg = Message::system("Room created.", 1000);
        assert!(msg.author.username().is_none());
        assert!(!msg.author.is_user("System"));
        assert_eq!(msg.author.to_string(), "System");
    }

    #[test]
    fn admin_action_names_the_actor() {
        let msg = Message::admin_action("alice", "alice kicked mallory.", 1000);
        assert_eq!(msg.author.username(), Some("alice"));
        assert_eq!(msg.author, Author::AdminAction("alice".into()));
    }

    #[test]
    fn changed_since_covers_edits() {
        let mut msg = Message::user("alice", "hello", 1000, None, false);
        assert!(msg.changed_since(500));
        assert!(!msg.changed_since(1000));
        msg.edited_at = Some(2000);
        assert!(msg.changed_since(1000));
    }

    #[test]
    fn author_serde_is_tagged() {
        let user = serde_json::to_value(Author::User("alice".into())).unwrap();
        assert_eq!(user["kind"], "user");
        assert_eq!(user["name"], "alice");
        let system = serde_json::to_value(Author::System).unwrap();
        assert_eq!(system["kind"], "system");
        let round: Author = serde_json::from_value(system).unwrap();
        assert_eq!(round, Author::System);
    }
}
