use std::{convert::Infallible, sync::Arc};

use warp::{filters::BoxedFilter, http::Method, reply::Response, Filter, Reply};

use crate::{
    config::AuthConfig,
    middleware::with_session,
    schema::Uuid,
    store::EntityStore,
};

use super::{handlers, reply::handle_rejection};

fn with_store<S: EntityStore + 'static>(
    store: Arc<S>,
) -> impl Filter<Extract = (Arc<S>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

fn system() -> BoxedFilter<(Response,)> {
    let welcome = warp::path::end().and(warp::get()).and_then(handlers::welcome);
    let health = warp::path!("health").and(warp::get()).and_then(handlers::health);
    let version = warp::path!("version").and(warp::get()).and_then(handlers::version);

    welcome.or(health).unify().or(version).unify().boxed()
}

fn receipts<S: EntityStore + 'static>(
    store: Arc<S>,
    auth: Arc<AuthConfig>,
) -> BoxedFilter<(Response,)> {
    let session = with_session(auth);
    let store = with_store(store);

    let create = warp::path!("receipts")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::create_receipt::<S>);

    let list = warp::path!("receipts")
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::list_receipts::<S>);

    let get = warp::path!("receipts" / Uuid)
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::get_receipt::<S>);

    let update = warp::path!("receipts" / Uuid)
        .and(warp::patch())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::update_receipt::<S>);

    let delete = warp::path!("receipts" / Uuid)
        .and(warp::delete())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::delete_receipt::<S>);

    let export = warp::path!("receipts" / Uuid / "export")
        .and(warp::get())
        .and(session)
        .and(store)
        .and_then(handlers::export_receipt::<S>);

    create
        .or(list)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(export)
        .unify()
        .boxed()
}

fn ingredients<S: EntityStore + 'static>(
    store: Arc<S>,
    auth: Arc<AuthConfig>,
) -> BoxedFilter<(Response,)> {
    let session = with_session(auth);
    let store = with_store(store);

    let create_for_receipt = warp::path!("receipts" / Uuid / "ingredients")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::create_receipt_ingredient::<S>);

    let list = warp::path!("receipts" / Uuid / "ingredients")
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::list_ingredients::<S>);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::create_ingredient::<S>);

    let get = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::get_ingredient::<S>);

    let update = warp::path!("ingredients" / Uuid)
        .and(warp::patch())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::update_ingredient::<S>);

    let delete = warp::path!("ingredients" / Uuid)
        .and(warp::delete())
        .and(session)
        .and(store)
        .and_then(handlers::delete_ingredient::<S>);

    create_for_receipt
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn worksteps<S: EntityStore + 'static>(
    store: Arc<S>,
    auth: Arc<AuthConfig>,
) -> BoxedFilter<(Response,)> {
    let session = with_session(auth);
    let store = with_store(store);

    let create_for_receipt = warp::path!("receipts" / Uuid / "worksteps")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::create_receipt_workstep::<S>);

    let list = warp::path!("receipts" / Uuid / "worksteps")
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::list_worksteps::<S>);

    let create = warp::path!("worksteps")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::create_workstep::<S>);

    let get = warp::path!("worksteps" / Uuid)
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::get_workstep::<S>);

    let update = warp::path!("worksteps" / Uuid)
        .and(warp::patch())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::update_workstep::<S>);

    let delete = warp::path!("worksteps" / Uuid)
        .and(warp::delete())
        .and(session)
        .and(store)
        .and_then(handlers::delete_workstep::<S>);

    create_for_receipt
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn tags<S: EntityStore + 'static>(store: Arc<S>, auth: Arc<AuthConfig>) -> BoxedFilter<(Response,)> {
    let session = with_session(auth);
    let store = with_store(store);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(store.clone())
        .and_then(handlers::create_tag::<S>);

    let list = warp::path!("tags")
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::list_tags::<S>);

    let get = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::get_tag::<S>);

    let delete = warp::path!("tags" / Uuid)
        .and(warp::delete())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::delete_tag::<S>);

    let link = warp::path!("receipts" / Uuid / "tags" / Uuid)
        .and(warp::post())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::link_tag::<S>);

    let unlink = warp::path!("receipts" / Uuid / "tags" / Uuid)
        .and(warp::delete())
        .and(session.clone())
        .and(store.clone())
        .and_then(handlers::unlink_tag::<S>);

    let of_receipt = warp::path!("receipts" / Uuid / "tags")
        .and(warp::get())
        .and(session)
        .and(store)
        .and_then(handlers::list_receipt_tags::<S>);

    create
        .or(list)
        .unify()
        .or(get)
        .unify()
        .or(delete)
        .unify()
        .or(link)
        .unify()
        .or(unlink)
        .unify()
        .or(of_receipt)
        .unify()
        .boxed()
}

/// Every route of the service, with CORS and error rendering applied.
/// Resource routes live under `/api`, system routes at the root.
pub fn routes<S: EntityStore + 'static>(
    store: Arc<S>,
    auth: Arc<AuthConfig>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(vec!["authorization", "content-type"]);

    let api = receipts(store.clone(), auth.clone())
        .or(ingredients(store.clone(), auth.clone()))
        .unify()
        .or(worksteps(store.clone(), auth.clone()))
        .unify()
        .or(tags(store, auth))
        .unify();

    system()
        .or(warp::path("api").and(api))
        .unify()
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log("recivault::api"))
}
