use std::sync::Arc;

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use recivault::{
    api,
    config::AuthConfig,
    jwt::{JwtSessionData, RealmAccess},
    memory::MemoryStore,
    APP_VERSION,
};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;
use warp::{http::StatusCode, hyper::body::Bytes, test::request, Filter, Reply};

const SECRET: &str = "integration-secret";

fn token(user_id: Uuid) -> String {
    let key: Hmac<Sha256> = Hmac::new_from_slice(SECRET.as_bytes()).unwrap();
    let claims = JwtSessionData {
        sub: user_id,
        preferred_username: None,
        realm_access: RealmAccess::default(),
        iss: None,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    format!("Bearer {}", claims.sign_with_key(&key).unwrap())
}

fn app() -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone + 'static {
    api::routes(
        Arc::new(MemoryStore::new()),
        Arc::new(AuthConfig {
            secret: SECRET.to_owned(),
            issuer: None,
        }),
    )
}

fn body(response: &warp::http::Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

struct Client<F> {
    app: F,
    auth: String,
}

impl<F> Client<F>
where
    F: Filter + Clone + Send + Sync + 'static,
    F::Extract: Reply + Send,
{
    fn new(app: F, user_id: Uuid) -> Self {
        Self {
            app,
            auth: token(user_id),
        }
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        payload: Option<Value>,
    ) -> warp::http::Response<Bytes> {
        let mut builder = request()
            .method(method)
            .path(path)
            .header("authorization", &self.auth);
        if let Some(payload) = payload {
            builder = builder.json(&payload);
        }
        builder.reply(&self.app).await
    }

    async fn item(&self, method: &str, path: &str, payload: Option<Value>) -> Value {
        let response = self.send(method, path, payload).await;
        assert!(response.status().is_success(), "{} {}", method, path);
        body(&response)["items"][0].clone()
    }
}

#[tokio::test]
async fn system_routes_need_no_session() {
    let app = app();

    let response = request().path("/health").reply(&app).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["message"], "OK");

    let response = request().path("/version").reply(&app).await;
    assert_eq!(body(&response)["version"], APP_VERSION);

    let response = request().path("/").reply(&app).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = app();

    let response = request().path("/api/receipts").reply(&app).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&response)["code"], 401);

    let response = request()
        .path("/api/receipts")
        .header("authorization", "Bearer not.a.token")
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn receipt_lifecycle_over_http() {
    let user_id = Uuid::new_v4();
    let client = Client::new(app(), user_id);

    let response = client
        .send(
            "POST",
            "/api/receipts",
            Some(json!({ "title": "Pasta", "description": "Weeknight" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let envelope = body(&response);
    assert_eq!(envelope["version"], APP_VERSION);
    assert_eq!(envelope["method"], "POST");
    let receipt = envelope["items"][0].clone();
    assert_eq!(receipt["ownerId"], user_id.to_string());
    let id = receipt["id"].as_str().unwrap().to_owned();

    let patched = client
        .item(
            "PATCH",
            &format!("/api/receipts/{id}"),
            Some(json!({ "description": null })),
        )
        .await;
    assert_eq!(patched["title"], "Pasta");
    assert_eq!(patched["description"], Value::Null);

    let response = client.send("GET", "/api/receipts", None).await;
    assert_eq!(body(&response)["items"].as_array().unwrap().len(), 1);

    let response = client.send("DELETE", &format!("/api/receipts/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.send("GET", &format!("/api/receipts/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foreign_receipt_is_forbidden() {
    let app = app();
    let alice = Client::new(app.clone(), Uuid::new_v4());
    let bob = Client::new(app, Uuid::new_v4());

    let receipt = alice
        .item("POST", "/api/receipts", Some(json!({ "title": "Pasta" })))
        .await;
    let path = format!("/api/receipts/{}", receipt["id"].as_str().unwrap());

    let response = bob
        .send("PATCH", &path, Some(json!({ "title": "Mine now" })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body(&response)["message"],
        "User is not owner of the receipt"
    );

    assert_eq!(alice.item("GET", &path, None).await["title"], "Pasta");
}

#[tokio::test]
async fn worksteps_stay_dense_over_http() {
    let client = Client::new(app(), Uuid::new_v4());
    let receipt = client
        .item("POST", "/api/receipts", Some(json!({ "title": "Pasta" })))
        .await;
    let id = receipt["id"].as_str().unwrap().to_owned();

    client
        .item(
            "POST",
            &format!("/api/receipts/{id}/worksteps"),
            Some(json!({ "workstep": "Boil water" })),
        )
        .await;
    let add = client
        .item(
            "POST",
            "/api/worksteps",
            Some(json!({ "workstep": "Add pasta", "receiptId": id, "orderNumber": 9 })),
        )
        .await;
    assert_eq!(add["orderNumber"], 2);
    client
        .item(
            "POST",
            &format!("/api/receipts/{id}/worksteps"),
            Some(json!({ "workstep": "Drain" })),
        )
        .await;

    let response = client
        .send("DELETE", &format!("/api/worksteps/{}", add["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .send("GET", &format!("/api/receipts/{id}/worksteps"), None)
        .await;
    let steps = body(&response)["items"].clone();
    assert_eq!(steps[0]["orderNumber"], 1);
    assert_eq!(steps[0]["workstep"], "Boil water");
    assert_eq!(steps[1]["orderNumber"], 2);
    assert_eq!(steps[1]["workstep"], "Drain");
    assert_eq!(steps.as_array().unwrap().len(), 2);

    let export = client
        .item("GET", &format!("/api/receipts/{id}/export"), None)
        .await;
    assert_eq!(export["worksteps"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ingredients_over_http() {
    let client = Client::new(app(), Uuid::new_v4());
    let receipt = client
        .item("POST", "/api/receipts", Some(json!({ "title": "Pasta" })))
        .await;
    let id = receipt["id"].as_str().unwrap().to_owned();

    let ingredient = client
        .item(
            "POST",
            "/api/ingredients",
            Some(json!({ "amount": 200, "unit": "g", "ingredientName": "Spaghetti", "receipt_id": id })),
        )
        .await;
    assert_eq!(ingredient["receiptId"], id);

    let path = format!("/api/ingredients/{}", ingredient["id"].as_str().unwrap());
    let patched = client
        .item("PATCH", &path, Some(json!({ "amount": 250 })))
        .await;
    assert_eq!(patched["amount"], 250);
    assert_eq!(patched["ingredientName"], "Spaghetti");

    let response = client
        .send(
            "POST",
            "/api/ingredients",
            Some(json!({ "amount": 1, "unit": "g", "ingredientName": "Salt" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tag_linking_and_orphan_cleanup_over_http() {
    let client = Client::new(app(), Uuid::new_v4());
    let r = client
        .item("POST", "/api/receipts", Some(json!({ "title": "Salad" })))
        .await;
    let r2 = client
        .item("POST", "/api/receipts", Some(json!({ "title": "Curry" })))
        .await;

    let response = client
        .send("POST", "/api/tags", Some(json!({ "tag": "vegan" })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let vegan = body(&response)["items"][0].clone();
    assert_eq!(vegan["tag"], "VEGAN");
    let tag_id = vegan["id"].as_str().unwrap().to_owned();

    let response = client
        .send("POST", "/api/tags", Some(json!({ "tag": "Vegan" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["items"][0]["id"], tag_id);

    let response = client
        .send("POST", "/api/tags", Some(json!({ "tag": "Vegan1" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for receipt in [&r, &r2] {
        let path = format!("/api/receipts/{}/tags/{tag_id}", receipt["id"].as_str().unwrap());
        assert_eq!(
            client.send("POST", &path, None).await.status(),
            StatusCode::CREATED
        );
    }

    let path = format!("/api/receipts/{}/tags/{tag_id}", r["id"].as_str().unwrap());
    assert_eq!(
        client.send("DELETE", &path, None).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        client
            .send("GET", &format!("/api/tags/{tag_id}"), None)
            .await
            .status(),
        StatusCode::OK
    );

    let path = format!("/api/receipts/{}/tags/{tag_id}", r2["id"].as_str().unwrap());
    assert_eq!(
        client.send("DELETE", &path, None).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        client
            .send("GET", &format!("/api/tags/{tag_id}"), None)
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn malformed_requests_are_reported() {
    let app = app();
    let auth = token(Uuid::new_v4());

    let response = request()
        .method("POST")
        .path("/api/receipts")
        .header("authorization", &auth)
        .header("content-type", "application/json")
        .body("{\"title\":")
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["code"], 400);

    let response = request()
        .path("/nothing/here")
        .header("authorization", &auth)
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = request()
        .method("PUT")
        .path("/api/receipts")
        .header("authorization", &auth)
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = request()
        .method("POST")
        .path("/api/receipts")
        .header("authorization", &auth)
        .json(&json!({ "title": "x".repeat(51) }))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resources_are_served_under_api_only() {
    let client = Client::new(app(), Uuid::new_v4());

    assert_eq!(
        client.send("GET", "/receipts", None).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.send("GET", "/api/receipts", None).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        client.send("GET", "/api/health", None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn tag_on_foreign_receipt_is_not_deletable_over_http() {
    let app = app();
    let alice = Client::new(app.clone(), Uuid::new_v4());
    let bob = Client::new(app, Uuid::new_v4());

    let receipt = alice
        .item("POST", "/api/receipts", Some(json!({ "title": "Salad" })))
        .await;
    let tag = alice
        .item("POST", "/api/tags", Some(json!({ "tag": "fresh" })))
        .await;
    let tag_id = tag["id"].as_str().unwrap().to_owned();
    alice
        .item(
            "POST",
            &format!("/api/receipts/{}/tags/{tag_id}", receipt["id"].as_str().unwrap()),
            None,
        )
        .await;

    let response = bob
        .send("DELETE", &format!("/api/tags/{tag_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = alice
        .send(
            "GET",
            &format!("/api/receipts/{}/tags", receipt["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(body(&response)["items"][0]["id"], tag_id);

    let response = alice
        .send("DELETE", &format!("/api/tags/{tag_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
