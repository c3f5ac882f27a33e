mod common;

use common::{body, invoice_payload, merge, TestApp};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

async fn app_with_client() -> (TestApp, String) {
    let app = TestApp::spawn().await;
    app.onboard().await;
    let client = app.create_client("Globex").await;
    let client_id = client["id"].as_str().unwrap().to_string();
    (app, client_id)
}

fn payload_with(client_id: &str, extra: Value) -> Value {
    let mut payload = invoice_payload(client_id);
    merge(&mut payload, extra);
    payload
}

#[tokio::test]
async fn create_numbers_sequentially_and_derives_totals() {
    let (app, client_id) = app_with_client().await;

    let response = app.post("/invoices", &invoice_payload(&client_id)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body_json = body(response).await;
    assert_eq!(body_json["message"], "Invoice created successfully");
    let first = &body_json["data"]["invoice"];

    assert_eq!(first["invoiceNumber"], "INV-00001");
    assert_eq!(first["status"], "draft");
    assert_eq!(first["currency"], "USD");
    assert_eq!(first["paymentTerms"], "Net 30");
    assert_eq!(first["lineItems"][0]["amount"].as_f64(), Some(100.0));
    assert_eq!(first["lineItems"][0]["taxAmount"].as_f64(), Some(10.0));
    assert_eq!(first["subtotal"].as_f64(), Some(100.0));
    assert_eq!(first["taxTotal"].as_f64(), Some(10.0));
    assert_eq!(first["discountAmount"].as_f64(), Some(0.0));
    assert_eq!(first["total"].as_f64(), Some(110.0));
    assert_eq!(first["amountDue"].as_f64(), Some(110.0));
    assert_eq!(first["accessToken"].as_str().map(str::len), Some(64));
    assert_eq!(first["client"]["name"], "Globex");
    assert_eq!(first["isOverdue"], false);

    let second = app.create_invoice(&invoice_payload(&client_id)).await;
    assert_eq!(second["invoiceNumber"], "INV-00002");
    assert_ne!(second["accessToken"], first["accessToken"]);

    let workspace = body(app.get("/business-profile").await).await["data"]["workspace"].clone();
    assert_eq!(workspace["nextInvoiceNumber"], 3);
}

#[tokio::test]
async fn percentage_discount_and_custom_prefix() {
    let (app, client_id) = app_with_client().await;
    app.put("/business-profile", &json!({ "invoicePrefix": "ACME" }))
        .await;

    let invoice = app
        .create_invoice(&payload_with(
            &client_id,
            json!({
                "discountType": "percentage",
                "discountValue": 10,
                "currency": "eur",
                "lineItems": [
                    { "description": "Design", "quantity": 1, "rate": 200 },
                    { "description": "Hosting", "quantity": 3, "rate": 100, "taxRate": 20 }
                ]
            }),
        ))
        .await;

    assert_eq!(invoice["invoiceNumber"], "ACME-00001");
    assert_eq!(invoice["currency"], "EUR");
    assert_eq!(invoice["subtotal"].as_f64(), Some(500.0));
    assert_eq!(invoice["taxTotal"].as_f64(), Some(60.0));
    assert_eq!(invoice["discountAmount"].as_f64(), Some(50.0));
    assert_eq!(invoice["total"].as_f64(), Some(510.0));
    assert_eq!(invoice["lineItems"][0]["description"], "Design");
    assert_eq!(invoice["lineItems"][1]["description"], "Hosting");
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let (app, client_id) = app_with_client().await;

    let cases = [
        json!({ "lineItems": [] }),
        json!({ "lineItems": [{ "description": "x", "quantity": 0, "rate": 10 }] }),
        json!({ "lineItems": [{ "description": " ", "quantity": 1, "rate": 10 }] }),
        json!({ "lineItems": [{ "description": "x", "quantity": 1, "rate": -1 }] }),
        json!({ "lineItems": [{ "description": "x", "quantity": 1, "rate": 1, "taxRate": 101 }] }),
        json!({ "discountValue": -5 }),
        json!({ "currency": "EURO" }),
        json!({ "status": "archived" }),
        json!({ "dueDate": "next tuesday" }),
    ];

    for extra in cases {
        let response = app.post("/invoices", &payload_with(&client_id, extra.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", extra);
        assert_eq!(body(response).await["success"], false);
    }

    let workspace = body(app.get("/business-profile").await).await["data"]["workspace"].clone();
    assert_eq!(workspace["nextInvoiceNumber"], 1);
}

#[tokio::test]
async fn unknown_client_does_not_consume_a_number() {
    let (app, client_id) = app_with_client().await;

    let response = app.post("/invoices", &invoice_payload("no-such-client")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await["message"], "Client not found");

    let invoice = app.create_invoice(&invoice_payload(&client_id)).await;
    assert_eq!(invoice["invoiceNumber"], "INV-00001");
}

#[tokio::test]
async fn update_recomputes_draft_and_freezes_after_send() {
    let (app, client_id) = app_with_client().await;
    let invoice = app.create_invoice(&invoice_payload(&client_id)).await;
    let path = format!("/invoices/{}", invoice["id"].as_str().unwrap());

    let response = app
        .put(
            &path,
            &json!({
                "lineItems": [{ "description": "Design work", "quantity": 4, "rate": 50 }],
                "discountType": "fixed",
                "discountValue": 25
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body(response).await["data"]["invoice"].clone();
    assert_eq!(updated["subtotal"].as_f64(), Some(200.0));
    assert_eq!(updated["taxTotal"].as_f64(), Some(0.0));
    assert_eq!(updated["total"].as_f64(), Some(175.0));
    assert_eq!(updated["invoiceNumber"], invoice["invoiceNumber"]);
    assert_eq!(updated["accessToken"], invoice["accessToken"]);

    let response = app.put(&path, &json!({ "status": "sent" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let sent = body(response).await["data"]["invoice"].clone();
    assert_eq!(sent["status"], "sent");
    assert!(sent["sentAt"].is_string());
    assert_eq!(sent["total"].as_f64(), Some(175.0));

    let response = app.put(&path, &json!({ "notes": "too late" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response).await["message"],
        "Only draft invoices can be edited"
    );

    let response = app.delete(&path).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response).await["message"],
        "Only draft invoices can be deleted"
    );
}

#[tokio::test]
async fn get_populates_full_client_and_delete_removes_draft() {
    let (app, client_id) = app_with_client().await;
    let invoice = app.create_invoice(&invoice_payload(&client_id)).await;
    let path = format!("/invoices/{}", invoice["id"].as_str().unwrap());

    let response = app.get(&path).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body(response).await["data"]["invoice"].clone();
    assert_eq!(fetched["client"]["id"], client_id);
    assert!(fetched["client"]["fullAddress"].is_string());
    assert!(fetched.get("workspace").is_none());

    let response = app.delete(&path).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["message"], "Invoice deleted successfully");

    let response = app.get(&path).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await["message"], "Invoice not found");
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let (app, client_id) = app_with_client().await;
    for _ in 0..3 {
        app.create_invoice(&invoice_payload(&client_id)).await;
    }
    app.create_invoice(&payload_with(&client_id, json!({ "status": "sent" })))
        .await;

    let response = app.get("/invoices?limit=2&sortBy=invoiceNumber&sortOrder=asc").await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body(response).await["data"].clone();
    assert_eq!(data["invoices"][0]["invoiceNumber"], "INV-00001");
    assert_eq!(data["invoices"][1]["invoiceNumber"], "INV-00002");
    assert_eq!(data["invoices"][0]["client"]["name"], "Globex");
    assert_eq!(data["pagination"]["total"], 4);
    assert_eq!(data["pagination"]["totalPages"], 2);

    let data = body(app.get("/invoices?status=sent").await).await["data"].clone();
    assert_eq!(data["invoices"].as_array().unwrap().len(), 1);
    assert_eq!(data["invoices"][0]["invoiceNumber"], "INV-00004");

    let data = body(app.get(&format!("/invoices?clientId={}", client_id)).await).await["data"].clone();
    assert_eq!(data["pagination"]["total"], 4);

    assert_eq!(
        app.get("/invoices?status=archived").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn stats_cover_every_status() {
    let (app, client_id) = app_with_client().await;
    app.create_invoice(&invoice_payload(&client_id)).await;
    app.create_invoice(&invoice_payload(&client_id)).await;
    app.create_invoice(&payload_with(&client_id, json!({ "status": "paid" })))
        .await;

    let response = app.get("/invoices/stats").await;

    assert_eq!(response.status(), StatusCode::OK);
    let stats = body(response).await["data"]["stats"].clone();
    for status in ["draft", "sent", "viewed", "paid", "overdue", "cancelled"] {
        assert!(stats.get(status).is_some(), "missing {}", status);
    }
    assert_eq!(stats["draft"]["count"], 2);
    assert_eq!(stats["draft"]["total"].as_f64(), Some(220.0));
    assert_eq!(stats["paid"]["count"], 1);
    assert_eq!(stats["cancelled"]["count"], 0);
    assert_eq!(stats["cancelled"]["total"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn past_due_unpaid_invoice_is_overdue() {
    let (app, client_id) = app_with_client().await;

    let invoice = app
        .create_invoice(&payload_with(
            &client_id,
            json!({ "issueDate": "2020-01-01", "dueDate": "2020-01-31", "status": "sent" }),
        ))
        .await;
    assert_eq!(invoice["isOverdue"], true);

    let paid = app
        .create_invoice(&payload_with(
            &client_id,
            json!({ "dueDate": "2020-01-31", "status": "paid" }),
        ))
        .await;
    assert_eq!(paid["isOverdue"], false);
    assert!(paid["paidAt"].is_string());
}

#[tokio::test]
async fn public_link_needs_no_session_and_records_views() {
    let (app, client_id) = app_with_client().await;
    let invoice = app
        .create_invoice(&payload_with(&client_id, json!({ "status": "sent" })))
        .await;
    let token = invoice["accessToken"].as_str().unwrap();
    let public_url = app.url(&format!("/invoices/public/{}", token));
    let anonymous = Client::new();

    let response = anonymous.get(&public_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let viewed = body(response).await["data"]["invoice"].clone();
    assert_eq!(viewed["status"], "viewed");
    assert_eq!(viewed["viewedAt"].as_array().unwrap().len(), 1);
    assert_eq!(viewed["workspace"]["name"], "Acme Studio");
    assert!(viewed["workspace"].get("bankDetails").is_none());
    assert_eq!(viewed["client"]["name"], "Globex");

    let again = body(anonymous.get(&public_url).send().await.unwrap()).await["data"]["invoice"]
        .clone();
    assert_eq!(again["status"], "viewed");
    assert_eq!(again["viewedAt"].as_array().unwrap().len(), 2);

    let response = anonymous
        .get(app.url("/invoices/public/not-a-real-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await["message"], "Invoice not found");
}

#[tokio::test]
async fn invoices_are_scoped_to_their_workspace() {
    let (owner, client_id) = app_with_client().await;
    let invoice = owner.create_invoice(&invoice_payload(&client_id)).await;
    let path = format!("/invoices/{}", invoice["id"].as_str().unwrap());

    let other = owner.another_user();
    other.onboard().await;

    assert_eq!(other.get(&path).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(other.delete(&path).await.status(), StatusCode::NOT_FOUND);
    let response = other.post("/invoices", &invoice_payload(&client_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listed = body(other.get("/invoices").await).await["data"]["pagination"]["total"].clone();
    assert_eq!(listed, 0);
}
