//! Mutation errors.

use thiserror::Error;

use crate::models::EntityId;
use crate::service::ServiceError;

/// Why a mutation did not commit. Local state has already been rolled back
/// by the time one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mutation already in flight for {0}")]
    Busy(EntityId),

    #[error("Entity {0} has not been saved to the service yet")]
    Unsynced(EntityId),

    #[error("View was closed before the mutation settled")]
    Stale,
}

pub type MutationResult<T> = Result<T, MutationError>;

impl MutationError {
    /// Message fit to show the user.
    pub fn user_message(&self) -> String {
        match self {
            MutationError::Network(_) => {
                "Could not reach the server. Please check your connection and try again."
                    .to_string()
            }
            MutationError::Validation(message) if !message.trim().is_empty() => message.clone(),
            MutationError::Validation(_) => "The server rejected the change.".to_string(),
            MutationError::NotFound(_) => "This record no longer exists.".to_string(),
            MutationError::Busy(_) => "Please wait for the previous change to finish.".to_string(),
            MutationError::Unsynced(_) => {
                "This record is still being saved. Try again in a moment.".to_string()
            }
            MutationError::Stale => String::new(),
        }
    }

    /// Whether repeating the same mutation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MutationError::Network(_) | MutationError::Busy(_) | MutationError::Unsynced(_)
        )
    }
}

impl From<ServiceError> for MutationError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Network(message) => MutationError::Network(message),
            ServiceError::Validation(message) => MutationError::Validation(message),
            ServiceError::NotFound(message) => MutationError::NotFound(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_message_is_shown() {
        let e = MutationError::from(ServiceError::Validation("Dosage is required".into()));
        assert_eq!(e.user_message(), "Dosage is required");
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_network_is_retryable() {
        let e = MutationError::from(ServiceError::Network("timeout".into()));
        assert!(e.is_retryable());
        assert!(e.user_message().contains("try again"));
    }
}
