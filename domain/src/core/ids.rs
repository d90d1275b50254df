//! Identifiers for conversations, participants and messages.
//!
//! Identifiers are assigned by the Conversation Store; the domain only
//! compares and displays them.

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a conversation.
    ConversationId,
    "conversation#"
);
numeric_id!(
    /// Identifier of a participant (human or bot) within the store.
    ParticipantId,
    "participant#"
);
numeric_id!(
    /// Identifier of a message within the store.
    MessageId,
    "message#"
);
