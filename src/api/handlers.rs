use std::sync::Arc;

use warp::{
    http::{Method, StatusCode},
    reply::Response,
    Rejection, Reply,
};

use crate::{
    actions,
    constants::{APP_NAME, APP_VERSION},
    error::ServiceError,
    jwt::SessionData,
    schema::{
        IngredientCreate, IngredientUpdate, ReceiptCreate, ReceiptUpdate, TagCreate, Uuid,
        WorkstepCreate, WorkstepUpdate,
    },
    store::EntityStore,
};

use super::reply::{item, items, message, no_content};

fn missing_receipt_id() -> Rejection {
    warp::reject::custom(ServiceError::Validation(
        "receiptId is required".to_owned(),
    ))
}

// System

pub async fn welcome() -> Result<Response, Rejection> {
    Ok(message(&format!("Welcome to Service: {APP_NAME}")))
}

pub async fn health() -> Result<Response, Rejection> {
    Ok(message("OK"))
}

pub async fn version() -> Result<Response, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({ "version": APP_VERSION })).into_response())
}

// Receipts

pub async fn create_receipt<S: EntityStore>(
    session: SessionData,
    body: ReceiptCreate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let receipt = actions::create_receipt(body, &session, store.as_ref()).await?;
    Ok(item(Method::POST, StatusCode::CREATED, receipt))
}

pub async fn list_receipts<S: EntityStore>(
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let receipts = actions::list_receipts(&session, store.as_ref()).await?;
    Ok(items(Method::GET, StatusCode::OK, receipts))
}

pub async fn get_receipt<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let receipt = actions::get_receipt(id, &session, store.as_ref()).await?;
    Ok(item(Method::GET, StatusCode::OK, receipt))
}

pub async fn update_receipt<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    body: ReceiptUpdate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let receipt = actions::update_receipt(id, body, &session, store.as_ref()).await?;
    Ok(item(Method::PATCH, StatusCode::OK, receipt))
}

pub async fn delete_receipt<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    actions::delete_receipt(id, &session, store.as_ref()).await?;
    Ok(no_content())
}

pub async fn export_receipt<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let aggregate = actions::assemble_receipt(id, &session, store.as_ref()).await?;
    Ok(item(Method::GET, StatusCode::OK, aggregate))
}

// Ingredients

pub async fn create_receipt_ingredient<S: EntityStore>(
    receipt_id: Uuid,
    session: SessionData,
    body: IngredientCreate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let ingredient =
        actions::create_ingredient(receipt_id, body, &session, store.as_ref()).await?;
    Ok(item(Method::POST, StatusCode::CREATED, ingredient))
}

pub async fn create_ingredient<S: EntityStore>(
    session: SessionData,
    body: IngredientCreate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let receipt_id = body.receipt_id.ok_or_else(missing_receipt_id)?;
    create_receipt_ingredient(receipt_id, session, body, store).await
}

pub async fn list_ingredients<S: EntityStore>(
    receipt_id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let ingredients = actions::list_ingredients(receipt_id, &session, store.as_ref()).await?;
    Ok(items(Method::GET, StatusCode::OK, ingredients))
}

pub async fn get_ingredient<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let ingredient = actions::get_ingredient(id, &session, store.as_ref()).await?;
    Ok(item(Method::GET, StatusCode::OK, ingredient))
}

pub async fn update_ingredient<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    body: IngredientUpdate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let ingredient = actions::update_ingredient(id, body, &session, store.as_ref()).await?;
    Ok(item(Method::PATCH, StatusCode::OK, ingredient))
}

pub async fn delete_ingredient<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    actions::delete_ingredient(id, &session, store.as_ref()).await?;
    Ok(no_content())
}

// Worksteps

pub async fn create_receipt_workstep<S: EntityStore>(
    receipt_id: Uuid,
    session: SessionData,
    body: WorkstepCreate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let workstep = actions::create_workstep(receipt_id, body, &session, store.as_ref()).await?;
    Ok(item(Method::POST, StatusCode::CREATED, workstep))
}

pub async fn create_workstep<S: EntityStore>(
    session: SessionData,
    body: WorkstepCreate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let receipt_id = body.receipt_id.ok_or_else(missing_receipt_id)?;
    create_receipt_workstep(receipt_id, session, body, store).await
}

pub async fn list_worksteps<S: EntityStore>(
    receipt_id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let worksteps = actions::list_worksteps(receipt_id, &session, store.as_ref()).await?;
    Ok(items(Method::GET, StatusCode::OK, worksteps))
}

pub async fn get_workstep<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let workstep = actions::get_workstep(id, &session, store.as_ref()).await?;
    Ok(item(Method::GET, StatusCode::OK, workstep))
}

pub async fn update_workstep<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    body: WorkstepUpdate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let workstep = actions::update_workstep(id, body, &session, store.as_ref()).await?;
    Ok(item(Method::PATCH, StatusCode::OK, workstep))
}

pub async fn delete_workstep<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    actions::delete_workstep(id, &session, store.as_ref()).await?;
    Ok(no_content())
}

// Tags

pub async fn create_tag<S: EntityStore>(
    _session: SessionData,
    body: TagCreate,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let (tag, created) = actions::create_tag(body, store.as_ref()).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(item(Method::POST, status, tag))
}

pub async fn list_tags<S: EntityStore>(
    _session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let tags = actions::list_tags(store.as_ref()).await?;
    Ok(items(Method::GET, StatusCode::OK, tags))
}

pub async fn get_tag<S: EntityStore>(
    id: Uuid,
    _session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let tag = actions::get_tag(id, store.as_ref()).await?;
    Ok(item(Method::GET, StatusCode::OK, tag))
}

pub async fn delete_tag<S: EntityStore>(
    id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    actions::delete_tag(id, &session, store.as_ref()).await?;
    log::info!("Tag {} deleted by user {}", id, session.user_id);
    Ok(no_content())
}

pub async fn link_tag<S: EntityStore>(
    receipt_id: Uuid,
    tag_id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let link = actions::link_tag(receipt_id, tag_id, &session, store.as_ref()).await?;
    Ok(item(Method::POST, StatusCode::CREATED, link))
}

pub async fn unlink_tag<S: EntityStore>(
    receipt_id: Uuid,
    tag_id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    actions::unlink_tag(receipt_id, tag_id, &session, store.as_ref()).await?;
    Ok(no_content())
}

pub async fn list_receipt_tags<S: EntityStore>(
    receipt_id: Uuid,
    session: SessionData,
    store: Arc<S>,
) -> Result<Response, Rejection> {
    let tags = actions::list_receipt_tags(receipt_id, &session, store.as_ref()).await?;
    Ok(items(Method::GET, StatusCode::OK, tags))
}
