//! CRUD screens driven by URL state
//!
//! The modal hook opens and closes the create/edit/view editor through query
//! flags and runs mutations against a [`CrudModel`]. The table hook derives
//! pagination and sorting from the query and fetches pages.

pub mod memory;
pub mod modal;
pub mod model;
pub mod table;
pub mod view_state;

use thiserror::Error;

// Re-exports
pub use memory::{InMemoryModel, Record};
pub use modal::{CrudModal, MutationOutcome};
pub use model::{CrudModel, EntityId, FindManyArgs, Identified, Page};
pub use table::{CrudTable, TableChange};
pub use view_state::{CrudMode, CrudViewState, OrderBy, SortDirection, TableParams};

/// Error returned by a model call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.status, .messages))]
pub struct ApiError {
    /// HTTP-like status; 0 when the request never reached the backend
    pub status: u16,
    /// Messages from the error payload
    pub messages: Vec<String>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            messages: vec![message.into()],
        }
    }

    pub fn with_messages(status: u16, messages: Vec<String>) -> Self {
        Self { status, messages }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(404, format!("{what} not found"))
    }

    /// Text shown in the error notification
    pub fn user_message(&self) -> String {
        describe(&self.status, &self.messages)
    }
}

fn describe(status: &u16, messages: &[String]) -> String {
    let messages: Vec<&str> = messages
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();
    if messages.is_empty() {
        format!("Request failed with status {status}")
    } else {
        messages.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_joined() {
        let err = ApiError::with_messages(
            422,
            vec!["name is required".into(), "price must be positive".into()],
        );
        assert_eq!(err.user_message(), "name is required, price must be positive");
        assert_eq!(err.to_string(), err.user_message());
    }

    #[test]
    fn test_empty_payload_falls_back_to_status() {
        let err = ApiError::with_messages(500, vec![]);
        assert_eq!(err.user_message(), "Request failed with status 500");

        let blank = ApiError::new(502, "  ");
        assert_eq!(blank.user_message(), "Request failed with status 502");
    }
}
