// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::ids::MailId;
use crate::state::AppCommand;

pub const NOT_FOUND_MESSAGE: &str = "Page not found.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Work the UI hands to the backend. The backend answers with an
/// [`AppCommand`]; [`BackendRequest::failed`] builds the failure case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    FetchTable,
    UpdateDue { id: MailId, due: String },
    DeleteMail { id: MailId },
}

impl BackendRequest {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FetchTable => "fetch table",
            Self::UpdateDue { .. } => "update due date",
            Self::DeleteMail { .. } => "delete mail",
        }
    }

    /// Completion command for a failed request.
    pub fn failed(self, failure: RequestFailure) -> AppCommand {
        match self {
            Self::FetchTable => AppCommand::TableFetched(Err(failure)),
            Self::UpdateDue { id, due } => AppCommand::DueUpdated {
                id,
                due,
                result: Err(failure),
            },
            Self::DeleteMail { id } => AppCommand::MailDeleted {
                id,
                result: Err(failure),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    #[error("server returned HTTP {status}")]
    Status { status: u16 },
    #[error("request failed: {message}")]
    Transport { message: String },
    #[error("unreadable response: {message}")]
    Decode { message: String },
}

impl RequestFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }

    /// Message shown to the user. Only a 404 is told apart.
    pub const fn notification_message(&self) -> &'static str {
        match self.status() {
            Some(404) => NOT_FOUND_MESSAGE,
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendRequest, GENERIC_FAILURE_MESSAGE, NOT_FOUND_MESSAGE, RequestFailure};
    use crate::{AppCommand, MailId};

    #[test]
    fn not_found_gets_its_own_message() {
        let failure = RequestFailure::Status { status: 404 };
        assert_eq!(failure.notification_message(), NOT_FOUND_MESSAGE);
    }

    #[test]
    fn every_other_failure_is_generic() {
        for failure in [
            RequestFailure::Status { status: 403 },
            RequestFailure::Status { status: 500 },
            RequestFailure::transport("connection refused"),
            RequestFailure::Decode {
                message: "bad markup".to_owned(),
            },
        ] {
            assert_eq!(failure.notification_message(), GENERIC_FAILURE_MESSAGE);
        }
    }

    #[test]
    fn failed_request_maps_to_its_completion_command() {
        let failure = RequestFailure::Status { status: 500 };
        let command = BackendRequest::UpdateDue {
            id: MailId::new(3),
            due: "2024-01-01".to_owned(),
        }
        .failed(failure.clone());

        assert_eq!(
            command,
            AppCommand::DueUpdated {
                id: MailId::new(3),
                due: "2024-01-01".to_owned(),
                result: Err(failure),
            }
        );
    }
}
