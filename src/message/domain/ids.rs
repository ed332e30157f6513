//! Domain identifier newtypes for messages, users, channels, stamps, and
//! archived revisions.
//!
//! These types wrap UUIDs to prevent accidental mixing of different
//! identifier types. The all-zero (nil) UUID is never a valid reference;
//! every mutating operation rejects it at the service boundary via
//! [`is_nil`](MessageId::is_nil).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The nil (all-zero) identifier, never a valid reference.
            #[must_use]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Returns `true` if this is the nil identifier.
            #[must_use]
            pub const fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Returns the inner UUID value.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        /// Note: this generates a new random UUID on each call. Use
        /// `new()` where the intent to generate a random ID should be
        /// explicit.
        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a message.
    ///
    /// # Examples
    ///
    /// ```
    /// use palaver::message::domain::MessageId;
    ///
    /// let id = MessageId::new();
    /// assert!(!id.is_nil());
    /// ```
    MessageId
}

uuid_id! {
    /// Unique identifier for a user.
    UserId
}

uuid_id! {
    /// Unique identifier for a channel.
    ChannelId
}

uuid_id! {
    /// Unique identifier for a reaction stamp kind.
    StampId
}

uuid_id! {
    /// Unique identifier for an archived message revision.
    ArchiveId
}

uuid_id! {
    /// Unique identifier for a clip (bookmark) folder.
    ClipFolderId
}
