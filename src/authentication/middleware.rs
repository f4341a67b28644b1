use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::config::AuthConfig;
use crate::error::ServiceError;

use super::jwt::{bearer_token, verify_jwt_session, SessionData};

/// Resolves the caller from the `Authorization` header, rejecting with
/// [`ServiceError::Unauthorized`] when the token is missing or invalid.
pub fn with_session(
    config: Arc<AuthConfig>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let config = config.clone();
        async move {
            let header = header.ok_or_else(|| {
                warp::reject::custom(ServiceError::Unauthorized(
                    "Missing authorization header".to_owned(),
                ))
            })?;

            bearer_token(&header)
                .and_then(|token| verify_jwt_session(token, &config))
                .map_err(|e| {
                    log::debug!("Rejected session: {}", e);
                    warp::reject::custom(e)
                })
        }
    })
}
