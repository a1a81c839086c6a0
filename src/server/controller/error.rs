use actix_web::{error, HttpResponse};
use actix_web::http::StatusCode;
use derive_more::{Display, Error};
use log::{error, warn};
use serde::Serialize;
use crate::server::service::order::OrderError;

#[derive(Debug, Display, Error)]
pub(crate) enum CustomError {
    #[display("server is busy")]
    ServerIsBusy,
    #[display("{message}")]
    BadRequest { message: String },
    #[display("{message}")]
    NotFound { message: String },
    #[display("missing or invalid user identity")]
    Unauthorized,
    #[display("{message}")]
    Forbidden { message: String },
    #[display("database error")]
    DbError,
    #[display("timeout occurred")]
    Timeout,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl CustomError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        CustomError::BadRequest { message: message.into() }
    }
}

impl error::ResponseError for CustomError {
    fn status_code(&self) -> StatusCode {
        match *self {
            CustomError::ServerIsBusy => StatusCode::SERVICE_UNAVAILABLE,
            CustomError::DbError => StatusCode::INTERNAL_SERVER_ERROR,
            CustomError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            CustomError::NotFound { .. } => StatusCode::NOT_FOUND,
            CustomError::Unauthorized => StatusCode::UNAUTHORIZED,
            CustomError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CustomError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(ErrorBody { error: self.to_string() })
    }
}

impl From<OrderError> for CustomError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Validation { message } | OrderError::Rejected { message } => {
                warn!("order request rejected, {}", message);
                CustomError::BadRequest { message }
            }
            e @ OrderError::NotFound { .. } => CustomError::NotFound { message: e.to_string() },
            OrderError::Forbidden { message } => CustomError::Forbidden { message },
            OrderError::Store { source } => {
                error!("order store failed, {}", source);
                CustomError::DbError
            }
        }
    }
}

impl From<tokio_postgres::Error> for CustomError {
    fn from(e: tokio_postgres::Error) -> Self {
        error!("transaction failed, {}", e);
        CustomError::DbError
    }
}
