use std::convert::Infallible;

use serde::Serialize;
use warp::{
    filters::{body::BodyDeserializeError, cors::CorsForbidden},
    http::{Method, StatusCode},
    reject::{MethodNotAllowed, UnsupportedMediaType},
    reply::Response,
    Rejection, Reply,
};

use crate::{constants::APP_VERSION, error::ServiceError};

/// Envelope of every successful response carrying data.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub version: &'static str,
    pub method: String,
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

pub fn items<T: Serialize>(method: Method, status: StatusCode, items: Vec<T>) -> Response {
    let body = ApiResponse {
        version: APP_VERSION,
        method: method.as_str().to_owned(),
        items,
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

pub fn item<T: Serialize>(method: Method, status: StatusCode, item: T) -> Response {
    items(method, status, vec![item])
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub fn message(message: &str) -> Response {
    warp::reply::json(&serde_json::json!({ "message": message })).into_response()
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        code: status.as_u16(),
        message: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Turns every rejection into a `{code, message}` body.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(error(StatusCode::NOT_FOUND, "Not Found"));
    }

    if let Some(e) = err.find::<ServiceError>() {
        let status =
            StatusCode::from_u16(e.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Ok(error(status, e.message()));
    }

    if let Some(e) = err.find::<BodyDeserializeError>() {
        log::debug!("Rejected request body: {}", e);
        return Ok(error(StatusCode::BAD_REQUEST, format!("Invalid body; {e}")));
    }

    if err.find::<UnsupportedMediaType>().is_some() {
        return Ok(error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json",
        ));
    }

    if let Some(e) = err.find::<CorsForbidden>() {
        return Ok(error(StatusCode::FORBIDDEN, e.to_string()));
    }

    if err.find::<MethodNotAllowed>().is_some() {
        return Ok(error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"));
    }

    log::error!("Unhandled rejection: {:?}", err);
    Ok(error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
    ))
}
