pub mod auth;

pub use auth::{make_span_with_user, require_user, USER_ID_HEADER};
