use std::future::{ready, Ready};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use crate::server::controller::error::CustomError;
use crate::server::model::order::UserId;

/// Set by the gateway once it has verified the caller
pub(crate) const USER_ID_HEADER: &str = "X-User-Id";

/// `Ok(None)` when the header is absent, an error when it is present but unreadable
fn user_from_header(req: &HttpRequest) -> Result<Option<UserId>, CustomError> {
    match req.headers().get(USER_ID_HEADER) {
        None => Ok(None),
        Some(v) => v
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .map(Some)
            .ok_or(CustomError::Unauthorized),
    }
}

/// Caller identity, required
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CurrentUser(pub UserId);

impl FromRequest for CurrentUser {
    type Error = CustomError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(user_from_header(req).and_then(|user| user.map(CurrentUser).ok_or(CustomError::Unauthorized)))
    }
}

/// Caller identity where staff may act without one. A malformed header is still rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Caller(pub Option<UserId>);

impl FromRequest for Caller {
    type Error = CustomError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(user_from_header(req).map(Caller))
    }
}
