//! The room aggregate: session lifecycle, presence, message log,
//! pin voting, and moderation.
//!
//! Every operation here runs under the room's exclusive lock and
//! checks its preconditions before touching state, so a returned
//! error implies no mutation happened.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::error::{RoomError, RoomResult};
use crate::state::member::Member;
use crate::state::message::{Message, ReplyRef};

/// Mint an opaque session token.
fn new_token() -> String {
    Uuid::new_v4().to_string()
}

/// One named, passkey-protected room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Sanitized id, `[A-Za-z0-9-]+`, immutable.
    pub id: String,
    /// Shared secret fixed at genesis.
    pub passkey: String,
    /// Current owner by username. Reassigned on succession; the true
    /// creator can always recover via `owner_token`.
    pub creator: String,
    /// Session token bound to the original creator. Survives
    /// eviction and is the proof for ownership recovery.
    pub owner_token: String,
    /// Optional room-wide secret enabling admin promotion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_code: Option<String>,
    /// Live sessions, in join order.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Bounded, timestamp-ordered log.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Copy of the pinned message; a copy, not an index, so log
    /// eviction and `clear` cannot dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_message: Option<Message>,
    /// Everyone currently co-signing the pin. Empty iff no pin.
    #[serde(default)]
    pub pinned_by: Vec<String>,
    #[serde(default)]
    pub banned_usernames: HashSet<String>,
    /// Set by deleteRoom; the room is purged once this instant passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_scheduled_at: Option<i64>,
    pub created_at: i64,
}

/// Everything a successful poll returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOutput {
    pub messages: Vec<Message>,
    pub users: Vec<String>,
    pub typing_users: Vec<String>,
    pub pinned_message: Option<Message>,
    pub pinned_by: Vec<String>,
    pub creator: String,
    pub admins: Vec<String>,
    /// Disclosed only to the creator and admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<RoomStats>,
}

/// Aggregate room statistics for admin eyes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    /// Messages in the retained log per author display name.
    pub message_counts: BTreeMap<String, u64>,
    /// Seconds since each current member joined.
    pub member_ages_secs: BTreeMap<String, i64>,
}

impl Room {
    /// Create a room at genesis. The caller becomes creator and
    /// admin, and the issued session token doubles as the room's
    /// owner token.
    pub fn genesis(
        id: &str,
        passkey: &str,
        username: &str,
        admin_code: &str,
        now: i64,
    ) -> (Self, String) {
        let owner_token = new_token();
        let mut room = Self {
            id: id.to_string(),
            passkey: passkey.to_string(),
            creator: username.to_string(),
            owner_token: owner_token.clone(),
            admin_code: Some(admin_code.to_string()),
            members: vec![Member::new(username, owner_token.clone(), true, now)],
            messages: Vec::new(),
            pinned_message: None,
            pinned_by: Vec::new(),
            banned_usernames: HashSet::new(),
            deletion_scheduled_at: None,
            created_at: now,
        };
        room.messages
            .push(Message::system(format!("Room '{id}' created."), now));
        room.messages
            .push(Message::system(format!("{username} has joined."), now));
        tracing::info!(room = %room.id, creator = %username, "Room created");
        (room, owner_token)
    }

    // ------------------------------------------------------------------
    // Identity & session
    // ------------------------------------------------------------------

    /// Join an existing room, returning the session token to use on
    /// subsequent requests.
    pub fn join(
        &mut self,
        limits: &LimitsConfig,
        now: i64,
        passkey: &str,
        username: &str,
        session_token: Option<&str>,
        admin_code: Option<&str>,
    ) -> RoomResult<String> {
        self.verify_passkey(passkey)?;
        if self.banned_usernames.contains(username) {
            return Err(RoomError::Banned(username.to_string()));
        }

        // Sweep first so a stale duplicate session cannot block the
        // same person from reclaiming their username.
        self.sweep_idle(limits, now);

        let admin_code_ok = matches!(
            (self.admin_code.as_deref(), admin_code),
            (Some(expected), Some(given)) if expected == given
        );
        let has_owner_token = session_token == Some(self.owner_token.as_str());

        // Entry gate: an orphaned room (no admin or creator present)
        // only admits callers who can prove they belong.
        let admin_present = self
            .members
            .iter()
            .any(|m| m.is_admin || m.username == self.creator);
        if !admin_present && username != self.creator && !admin_code_ok && !has_owner_token {
            return Err(RoomError::EntryRestricted);
        }

        if let Some(idx) = self.members.iter().position(|m| m.username == username) {
            let stored = self.members[idx].session_token.clone();
            if session_token == Some(stored.as_str()) {
                // Same client re-joining: just renew liveness.
                self.members[idx].last_seen_at = now;
                self.push_message(
                    limits,
                    Message::system(format!("{username} has reconnected."), now),
                );
                return Ok(stored);
            }
            if admin_code_ok {
                // Admin override: reclaim the identity without the
                // original token. Always rotates the token, which
                // locks out whichever client held the old one.
                let token = new_token();
                let member = &mut self.members[idx];
                member.session_token = token.clone();
                member.is_admin = true;
                member.last_seen_at = now;
                self.push_message(
                    limits,
                    Message::system(format!("{username} has reconnected."), now),
                );
                tracing::info!(room = %self.id, user = %username, "Session reclaimed via admin code");
                return Ok(token);
            }
            return Err(RoomError::SessionHeld(username.to_string()));
        }

        if has_owner_token {
            // Ownership succession recovery: the true creator is
            // back, whoever inherited the room in the meantime.
            self.creator = username.to_string();
            self.members
                .push(Member::new(username, self.owner_token.clone(), true, now));
            self.push_message(
                limits,
                Message::system(format!("{username} reclaimed ownership of the room."), now),
            );
            tracing::info!(room = %self.id, user = %username, "Ownership restored");
            return Ok(self.owner_token.clone());
        }

        let token = new_token();
        self.members
            .push(Member::new(username, token.clone(), admin_code_ok, now));
        self.push_message(
            limits,
            Message::system(format!("{username} has joined."), now),
        );
        Ok(token)
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    /// One poll cycle: authenticate, refresh presence, mark read
    /// receipts, sweep idle members, and return the message delta.
    #[allow(clippy::too_many_arguments)]
    pub fn poll(
        &mut self,
        limits: &LimitsConfig,
        now: i64,
        passkey: &str,
        username: &str,
        session_token: &str,
        since: i64,
        is_typing: bool,
    ) -> RoomResult<PollOutput> {
        self.verify_passkey(passkey)?;

        let idx = self
            .members
            .iter()
            .position(|m| m.username == username)
            .ok_or(RoomError::NotActive)?;
        if self.members[idx].session_token != session_token {
            return Err(RoomError::SessionConflict);
        }

        let member = &mut self.members[idx];
        member.last_seen_at = now;
        member.is_typing = is_typing;

        // Read receipts for everything new to this caller.
        for msg in self.messages.iter_mut().filter(|m| m.created_at > since) {
            msg.read_by.insert(username.to_string());
        }

        // Any member's poll sweeps the whole room; eviction is
        // traffic-driven rather than timer-driven.
        self.sweep_idle(limits, now);

        let messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.changed_since(since))
            .cloned()
            .collect();
        let users: Vec<String> = self.members.iter().map(|m| m.username.clone()).collect();
        let typing_users: Vec<String> = self
            .members
            .iter()
            .filter(|m| m.is_typing && m.username != username)
            .map(|m| m.username.clone())
            .collect();
        let admins: Vec<String> = self
            .members
            .iter()
            .filter(|m| m.is_admin)
            .map(|m| m.username.clone())
            .collect();

        let stats = self
            .is_admin_or_creator(username)
            .then(|| self.compute_stats(now));

        Ok(PollOutput {
            messages,
            users,
            typing_users,
            pinned_message: self.pinned_message.clone(),
            pinned_by: self.pinned_by.clone(),
            creator: self.creator.clone(),
            admins,
            stats,
        })
    }

    /// Evict every member idle past the threshold, announcing each
    /// eviction. Returns the number of members removed.
    pub fn sweep_idle(&mut self, limits: &LimitsConfig, now: i64) -> usize {
        let timeout_ms = limits.inactive_timeout_ms();
        let mut timed_out = Vec::new();
        self.members.retain(|m| {
            if m.is_idle(now, timeout_ms) {
                timed_out.push(m.username.clone());
                false
            } else {
                true
            }
        });
        for username in &timed_out {
            tracing::debug!(room = %self.id, user = %username, "Member timed out");
            self.push_message(
                limits,
                Message::system(format!("{username} has left (timed out)."), now),
            );
        }
        timed_out.len()
    }

    // ------------------------------------------------------------------
    // Message log
    // ------------------------------------------------------------------

    /// Append a user message, deriving mentions and refreshing the
    /// sender's presence.
    pub fn send(
        &mut self,
        limits: &LimitsConfig,
        now: i64,
        passkey: &str,
        username: &str,
        text: &str,
        reply_to: Option<ReplyRef>,
        is_announcement: bool,
    ) -> RoomResult<Message> {
        self.verify_passkey(passkey)?;
        if text.chars().count() > limits.max_message_len {
            return Err(RoomError::Validation("message is too long".into()));
        }

        if let Some(member) = self.members.iter_mut().find(|m| m.username == username) {
            member.last_seen_at = now;
            member.is_typing = false;
        }

        let message = Message::user(username, text, now, reply_to, is_announcement);
        self.push_message(limits, message.clone());
        Ok(message)
    }

    /// Edit a message in place. Author-only; read receipts survive so
    /// recipients see edits flagged rather than re-delivered.
    pub fn edit(
        &mut self,
        limits: &LimitsConfig,
        now: i64,
        passkey: &str,
        username: &str,
        message_id: &str,
        new_text: &str,
    ) -> RoomResult<()> {
        self.verify_passkey(passkey)?;
        if new_text.chars().count() > limits.max_message_len {
            return Err(RoomError::Validation("message is too long".into()));
        }

        let msg = self
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(RoomError::NotFound)?;
        if !msg.author.is_user(username) {
            return Err(RoomError::Forbidden(
                "you can only edit your own messages".into(),
            ));
        }
        msg.text = new_text.to_string();
        msg.edited_at = Some(now);
        msg.mentions = crate::state::message::derive_mentions(new_text);
        Ok(())
    }

    /// Remove a single message. Only announcements are removable, and
    /// only by the room owner.
    pub fn delete_message(
        &mut self,
        passkey: &str,
        username: &str,
        message_id: &str,
    ) -> RoomResult<()> {
        self.verify_passkey(passkey)?;
        let idx = self
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or(RoomError::NotFound)?;
        if !self.messages[idx].is_announcement {
            return Err(RoomError::Forbidden(
                "only announcement messages can be deleted".into(),
            ));
        }
        if username != self.creator {
            return Err(RoomError::Forbidden(
                "only the room owner can delete announcements".into(),
            ));
        }
        self.messages.remove(idx);
        Ok(())
    }

    /// Replace the whole log with a single synthetic notice. Pin
    /// state is deliberately untouched; the pin holds its own copy.
    pub fn clear(&mut self, now: i64, passkey: &str) -> RoomResult<Message> {
        self.verify_passkey(passkey)?;
        let notice = Message::system("Chat history cleared.", now);
        self.messages = vec![notice.clone()];
        Ok(notice)
    }

    // ------------------------------------------------------------------
    // Pin voting
    // ------------------------------------------------------------------

    /// Toggle/co-sign pin semantics. Pinning the already-pinned
    /// message toggles the caller's endorsement; pinning a different
    /// message replaces the pin outright.
    pub fn pin(
        &mut self,
        limits: &LimitsConfig,
        now: i64,
        passkey: &str,
        username: &str,
        message_id: &str,
    ) -> RoomResult<()> {
        self.verify_passkey(passkey)?;

        let same_target = self
            .pinned_message
            .as_ref()
            .is_some_and(|m| m.id == message_id);
        if same_target {
            if let Some(pos) = self.pinned_by.iter().position(|u| u == username) {
                self.pinned_by.remove(pos);
                if self.pinned_by.is_empty() {
                    self.pinned_message = None;
                }
                self.push_message(
                    limits,
                    Message::system(format!("{username} unpinned a message."), now),
                );
            } else {
                self.pinned_by.push(username.to_string());
                self.push_message(
                    limits,
                    Message::system(format!("{username} pinned a message."), now),
                );
            }
        } else {
            let target = self
                .messages
                .iter()
                .find(|m| m.id == message_id)
                .cloned()
                .ok_or(RoomError::NotFound)?;
            self.pinned_message = Some(target);
            self.pinned_by = vec![username.to_string()];
            self.push_message(
                limits,
                Message::system(format!("{username} pinned a message."), now),
            );
        }
        debug_assert_eq!(self.pinned_by.is_empty(), self.pinned_message.is_none());
        Ok(())
    }

    /// Withdraw only the caller's endorsement; the pin stays while
    /// other co-signers remain.
    pub fn unpin(
        &mut self,
        limits: &LimitsConfig,
        now: i64,
        passkey: &str,
        username: &str,
    ) -> RoomResult<()> {
        self.verify_passkey(passkey)?;
        let pos = self
            .pinned_by
            .iter()
            .position(|u| u == username)
            .ok_or_else(|| RoomError::Forbidden("you have not pinned the current message".into()))?;
        self.pinned_by.remove(pos);
        if self.pinned_by.is_empty() {
            self.pinned_message = None;
        }
        self.push_message(
            limits,
            Message::system(format!("{username} unpinned a message."), now),
        );
        debug_assert_eq!(self.pinned_by.is_empty(), self.pinned_message.is_none());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Moderation
    // ------------------------------------------------------------------

    /// Evict and ban a member. Admins and the owner cannot be kicked.
    pub fn kick(
        &mut self,
        limits: &LimitsConfig,
        now: i64,
        passkey: &str,
        admin_user: &str,
        target: &str,
    ) -> RoomResult<()> {
        self.verify_passkey(passkey)?;
        if !self.is_admin_or_creator(admin_user) {
            return Err(RoomError::Forbidden(
                "only the room owner or admins can kick users".into(),
            ));
        }
        if target == self.creator {
            return Err(RoomError::Forbidden("cannot kick the room owner".into()));
        }
        let Some(idx) = self.members.iter().position(|m| m.username == target) else {
            // Already gone; nothing to evict and no new ban entry.
            return Ok(());
        };
        if self.members[idx].is_admin {
            return Err(RoomError::Forbidden("cannot kick another admin".into()));
        }
        self.members.remove(idx);
        self.banned_usernames.insert(target.to_string());
        self.push_message(
            limits,
            Message::admin_action(
                admin_user,
                format!("{admin_user} kicked (and banned) {target}."),
                now,
            ),
        );
        tracing::info!(room = %self.id, admin = %admin_user, target = %target, "Member kicked and banned");
        Ok(())
    }

    /// Schedule the room for deletion and evict everyone now. Members
    /// get no further notice; their next poll sees 410 Gone.
    pub fn schedule_deletion(
        &mut self,
        now: i64,
        grace_ms: i64,
        passkey: &str,
        admin_user: &str,
    ) -> RoomResult<i64> {
        self.verify_passkey(passkey)?;
        if !self.is_admin_or_creator(admin_user) {
            return Err(RoomError::Forbidden(
                "only the room owner or admins can delete the room".into(),
            ));
        }
        let deadline = now + grace_ms;
        self.deletion_scheduled_at = Some(deadline);
        self.members.clear();
        tracing::info!(room = %self.id, admin = %admin_user, "Room deletion scheduled");
        Ok(deadline)
    }

    /// Voluntary departure. An explicit leave by the owner hands the
    /// room to the earliest-joined remaining member.
    pub fn leave(&mut self, limits: &LimitsConfig, now: i64, username: &str, explicit: bool) {
        let Some(idx) = self.members.iter().position(|m| m.username == username) else {
            return;
        };
        self.members.remove(idx);
        self.push_message(
            limits,
            Message::system(format!("{username} has left."), now),
        );

        if explicit && username == self.creator {
            if let Some(heir) = self.members.iter().min_by_key(|m| m.joined_at) {
                let heir_name = heir.username.clone();
                self.creator = heir_name.clone();
                self.push_message(
                    limits,
                    Message::system(format!("{heir_name} is now the room owner."), now),
                );
                tracing::info!(room = %self.id, new_owner = %heir_name, "Ownership succession");
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn verify_passkey(&self, passkey: &str) -> RoomResult<()> {
        if self.passkey != passkey {
            return Err(RoomError::AuthFailed);
        }
        Ok(())
    }

    /// Creator is owner by name; admins must currently be members.
    pub fn is_admin_or_creator(&self, username: &str) -> bool {
        username == self.creator
            || self
                .members
                .iter()
                .any(|m| m.username == username && m.is_admin)
    }

    /// Append to the log, evicting the oldest entries past the cap.
    fn push_message(&mut self, limits: &LimitsConfig, message: Message) {
        self.messages.push(message);
        if self.messages.len() > limits.message_cap {
            let excess = self.messages.len() - limits.message_cap;
            self.messages.drain(..excess);
        }
    }

    fn compute_stats(&self, now: i64) -> RoomStats {
        let mut message_counts: BTreeMap<String, u64> = BTreeMap::new();
        for msg in &self.messages {
            if let Some(name) = msg.author.username() {
                *message_counts.entry(name.to_string()).or_default() += 1;
            }
        }
        let member_ages_secs = self
            .members
            .iter()
            .map(|m| (m.username.clone(), (now - m.joined_at) / 1000))
            .collect();
        RoomStats {
            message_counts,
            member_ages_secs,
        }
    }
}
