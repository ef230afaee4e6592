//! In-memory room state: registry, rooms, members, messages.

pub mod member;
pub mod message;
pub mod registry;
pub mod room;

pub use member::Member;
pub use message::{Author, Message, ReplyRef};
pub use registry::{Registry, RoomHandle, RoomSummary};
pub use room::{PollOutput, Room, RoomStats};

/// Wall-clock milliseconds since the Unix epoch, the wire format for
/// every timestamp.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
