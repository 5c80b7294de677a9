//! Numeric status codes carried in the response envelope.
//!
//! Failures are reported in the payload, not through the HTTP status line:
//! every response is HTTP 200 except method-not-allowed.

use serde::{Serialize, Serializer};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Default,
    NotAuthenticated,
    AuthFailed,
    LogoutFailed,
    EncodeFailed,
    DecodeFailed,
    InvalidParams,
    MethodNotAllowed,
    PublishNoteFailed,
    ListNotesFailed,
    GetNoteFailed,
    UpdateNoteFailed,
    DeleteNoteFailed,
    ListTagsFailed,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Default => -1,
            Status::NotAuthenticated => -1000,
            Status::AuthFailed => -1001,
            Status::LogoutFailed => -1002,
            Status::EncodeFailed => -1003,
            Status::DecodeFailed => -1004,
            Status::InvalidParams => -1005,
            Status::MethodNotAllowed => -1006,
            Status::PublishNoteFailed => -2000,
            Status::ListNotesFailed => -2001,
            Status::GetNoteFailed => -2002,
            Status::UpdateNoteFailed => -2003,
            Status::DeleteNoteFailed => -2004,
            Status::ListTagsFailed => -2010,
        }
    }

    /// Status for a failed operation, given the operation's own failure
    /// status. Input-shape and session errors keep their dedicated codes.
    pub fn for_error(err: &Error, operation: Status) -> Status {
        match err {
            Error::Validation(_) => Status::InvalidParams,
            Error::Auth(_) if operation == Status::AuthFailed => Status::AuthFailed,
            Error::Auth(_) => Status::NotAuthenticated,
            _ => operation,
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::NotAuthenticated.code(), -1000);
        assert_eq!(Status::MethodNotAllowed.code(), -1006);
        assert_eq!(Status::PublishNoteFailed.code(), -2000);
        assert_eq!(Status::ListTagsFailed.code(), -2010);
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Status::DecodeFailed).unwrap(), "-1004");
    }

    #[test]
    fn test_for_error_mapping() {
        let validation = Error::Validation("title".into());
        assert_eq!(
            Status::for_error(&validation, Status::PublishNoteFailed),
            Status::InvalidParams
        );

        let missing = Error::NoteNotFound(3);
        assert_eq!(
            Status::for_error(&missing, Status::DeleteNoteFailed),
            Status::DeleteNoteFailed
        );

        let auth = Error::Auth("bad password".into());
        assert_eq!(Status::for_error(&auth, Status::AuthFailed), Status::AuthFailed);
        assert_eq!(
            Status::for_error(&auth, Status::LogoutFailed),
            Status::NotAuthenticated
        );
    }
}
