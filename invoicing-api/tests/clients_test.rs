mod common;

use common::{body, TestApp};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn create_copies_workspace_defaults() {
    let app = TestApp::spawn().await;
    app.signup().await;
    app.create_profile(json!({ "defaultCurrency": "GBP", "defaultPaymentTerms": 14 }))
        .await;

    let response = app
        .post(
            "/clients",
            &json!({
                "name": "Globex",
                "email": "AP@Globex.test",
                "address": { "street": "1 Main St", "city": "Springfield" },
                "tags": ["retainer"]
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body(response).await;
    assert_eq!(body["message"], "Client created successfully");
    let client = &body["data"]["client"];
    assert_eq!(client["email"], "ap@globex.test");
    assert_eq!(client["defaultCurrency"], "GBP");
    assert_eq!(client["defaultPaymentTerms"], 14);
    assert_eq!(client["isActive"], true);
    assert_eq!(client["fullAddress"], "1 Main St, Springfield");
    assert_eq!(client["outstandingBalance"].as_f64(), Some(0.0));
    assert_eq!(client["tags"], json!(["retainer"]));
}

#[tokio::test]
async fn duplicate_names_are_rejected_case_insensitively() {
    let app = TestApp::spawn().await;
    app.onboard().await;
    app.create_client("Globex").await;

    let response = app.post("/clients", &json!({ "name": "GLOBEX" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response).await["message"],
        "A client with this name already exists"
    );
}

#[tokio::test]
async fn list_searches_sorts_and_paginates() {
    let app = TestApp::spawn().await;
    app.onboard().await;
    for name in ["Initech", "Globex", "Hooli"] {
        app.create_client(name).await;
    }

    let response = app.get("/clients?limit=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body(response).await["data"].clone();
    let names: Vec<&str> = data["clients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Globex", "Hooli"]);
    assert_eq!(data["pagination"]["total"], 3);
    assert_eq!(data["pagination"]["totalPages"], 2);
    assert_eq!(data["pagination"]["hasNextPage"], true);
    assert_eq!(data["pagination"]["hasPrevPage"], false);

    let data = body(app.get("/clients?sortOrder=desc&page=2&limit=2").await).await["data"].clone();
    assert_eq!(data["clients"][0]["name"], "Globex");
    assert_eq!(data["pagination"]["hasPrevPage"], true);

    let data = body(app.get("/clients?search=hoo").await).await["data"].clone();
    assert_eq!(data["clients"].as_array().unwrap().len(), 1);
    assert_eq!(data["clients"][0]["name"], "Hooli");

    let response = app.get("/clients?limit=500").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_get_and_delete() {
    let app = TestApp::spawn().await;
    app.onboard().await;
    let client = app.create_client("Globex").await;
    let id = client["id"].as_str().unwrap();

    let response = app
        .put(
            &format!("/clients/{}", id),
            &json!({ "name": "Globex Corp", "isActive": false, "notes": "Pays late" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body(response).await["data"]["client"].clone();
    assert_eq!(updated["name"], "Globex Corp");
    assert_eq!(updated["isActive"], false);
    assert_eq!(updated["email"], "billing@example.com");

    let fetched = body(app.get(&format!("/clients/{}", id)).await).await;
    assert_eq!(fetched["message"], "Client fetched successfully");
    assert_eq!(fetched["data"]["client"]["notes"], "Pays late");

    let response = app.delete(&format!("/clients/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let deleted = body(response).await;
    assert_eq!(deleted["message"], "Client deleted successfully");
    assert!(deleted["data"].is_null());

    let response = app.get(&format!("/clients/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await["message"], "Client not found");
}

#[tokio::test]
async fn stats_count_active_clients() {
    let app = TestApp::spawn().await;
    app.onboard().await;
    app.create_client("Globex").await;
    let hooli = app.create_client("Hooli").await;
    app.put(
        &format!("/clients/{}", hooli["id"].as_str().unwrap()),
        &json!({ "isActive": false }),
    )
    .await;

    let response = app.get("/clients/stats").await;

    assert_eq!(response.status(), StatusCode::OK);
    let stats = body(response).await["data"]["stats"].clone();
    assert_eq!(stats["totalClients"], 2);
    assert_eq!(stats["activeClients"], 1);
    assert_eq!(stats["totalInvoiced"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn clients_are_scoped_to_their_workspace() {
    let owner = TestApp::spawn().await;
    owner.onboard().await;
    let client = owner.create_client("Globex").await;
    let path = format!("/clients/{}", client["id"].as_str().unwrap());

    let other = owner.another_user();
    other.onboard().await;

    assert_eq!(other.get(&path).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        other.put(&path, &json!({ "name": "Mine" })).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(other.delete(&path).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(owner.get(&path).await.status(), StatusCode::OK);
}
