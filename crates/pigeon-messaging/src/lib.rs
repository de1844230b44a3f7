//! Friend-gated direct messaging.
//!
//! [`MessagingService`] owns the business rules: a message can only be sent
//! between two existing users who are friends, every mutation is scoped by
//! both message id and the acting username, and deletion is a per-party
//! visibility flag rather than a row removal. Storage and the user/friendship
//! lookups are injected through the traits in [`collaborators`].

pub mod collaborators;
pub mod error;
pub mod service;
mod store;

pub use collaborators::{FriendshipRegistry, MessageStore, UserDirectory};
pub use error::SendError;
pub use service::MessagingService;
