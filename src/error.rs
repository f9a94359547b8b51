use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::Debug;

// internal errors (1..=99) never expose their message
pub const ENV_VAR: i32 = 1;
pub const DATABASE: i32 = 2;
pub const SERIALIZATION: i32 = 3;
pub const AUTHORIZOR: i32 = 4;
pub const UNEXPECTED: i32 = 5;

// domain errors, reported to the caller verbatim
pub const INVALID_TRANSITION: i32 = 100;
pub const INVALID_INPUT: i32 = 101;
pub const NOT_FOUND: i32 = 102;
pub const FORBIDDEN: i32 = 103;
pub const IMMUTABLE_STATE: i32 = 104;
pub const BOOKING_NOT_BIDDABLE: i32 = 105;
pub const DUPLICATE_BID: i32 = 106;
pub const BID_NOT_PENDING: i32 = 107;
pub const INVALID_BID_AMOUNT: i32 = 108;
// contention is the only error a caller may retry without re-reading state
pub const CONTENTION: i32 = 109;

#[derive(Debug)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        // serialization_failure and deadlock_detected are retryable
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(code) = db_err.code() {
                if code == "40001" || code == "40P01" {
                    return contention_error();
                }
            }
        }

        database_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        serialization_error(err)
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        authorizor_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            NOT_FOUND => (StatusCode::NOT_FOUND, self.message.as_str()),
            FORBIDDEN => (StatusCode::FORBIDDEN, self.message.as_str()),
            CONTENTION => (StatusCode::CONFLICT, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_transition_error() -> Error {
    Error {
        code: INVALID_TRANSITION,
        message: "invalid transition".into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: INVALID_INPUT,
        message: "invalid input".into(),
    }
}

pub fn not_found_error() -> Error {
    Error {
        code: NOT_FOUND,
        message: "not found".into(),
    }
}

pub fn forbidden_error() -> Error {
    Error {
        code: FORBIDDEN,
        message: "forbidden".into(),
    }
}

pub fn immutable_state_error() -> Error {
    Error {
        code: IMMUTABLE_STATE,
        message: "booking is no longer editable".into(),
    }
}

pub fn booking_not_biddable_error() -> Error {
    Error {
        code: BOOKING_NOT_BIDDABLE,
        message: "booking is not open for bidding".into(),
    }
}

pub fn duplicate_bid_error() -> Error {
    Error {
        code: DUPLICATE_BID,
        message: "an active bid already exists for this organization".into(),
    }
}

pub fn bid_not_pending_error() -> Error {
    Error {
        code: BID_NOT_PENDING,
        message: "bid is not pending".into(),
    }
}

pub fn invalid_bid_amount_error() -> Error {
    Error {
        code: INVALID_BID_AMOUNT,
        message: "invalid bid amount".into(),
    }
}

pub fn contention_error() -> Error {
    Error {
        code: CONTENTION,
        message: "conflicting concurrent update, retry".into(),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: ENV_VAR,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(_: T) -> Error {
    Error {
        code: DATABASE,
        message: "database error".into(),
    }
}

pub fn serialization_error<T: Debug>(_: T) -> Error {
    Error {
        code: SERIALIZATION,
        message: "serialization error".into(),
    }
}

pub fn authorizor_error<T: Debug>(_: T) -> Error {
    Error {
        code: AUTHORIZOR,
        message: "authorizor error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: UNEXPECTED,
        message: "unexpected error".into(),
    }
}
