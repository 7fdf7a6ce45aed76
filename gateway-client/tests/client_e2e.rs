//! Client tests against a live server on an ephemeral port.

use gateway_client::{ClientError, GatewayClient};
use gateway_hex::{GatewayService, inbound::HttpServer};
use gateway_repo::MemoryRepo;
use gateway_types::{CreateInvoiceRequest, InvoiceStatus};

async fn spawn_server() -> String {
    let router = HttpServer::new(GatewayService::new(MemoryRepo::new())).router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn invoice(amount: f64) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        api_key: String::new(),
        amount,
        description: "Subscription".to_string(),
        payment_type: "credit_card".to_string(),
        card_number: "5555-5555-5555-4444".to_string(),
        holder_name: "Jane Roe".to_string(),
        expiration_month: 1,
        expiration_year: 2099,
        cvv: "321".to_string(),
    }
}

#[tokio::test]
async fn test_full_flow() {
    let base_url = spawn_server().await;
    let anonymous = GatewayClient::new(&base_url);
    assert!(anonymous.health().await.unwrap());

    let created = anonymous
        .create_account("Acme", "billing@acme.test")
        .await
        .unwrap();
    let client = GatewayClient::new(&base_url).with_api_key(created.api_key);

    let me = client.me().await.unwrap();
    assert_eq!(me.id, created.account.id);

    let invoice = client.create_invoice(&invoice(49.99)).await.unwrap();
    assert_eq!(invoice.account_id, me.id);
    assert_eq!(invoice.status, "pending");
    assert_eq!(invoice.card_last_digits, "4444");

    let rejected = client
        .update_invoice_status(invoice.id, InvoiceStatus::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.status, "rejected");

    let fetched = client.get_invoice(invoice.id).await.unwrap();
    assert_eq!(fetched.status, "rejected");
    assert_eq!(client.list_invoices().await.unwrap().len(), 1);

    let err = client
        .update_invoice_status(invoice.id, InvoiceStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 409, .. }));
}

#[tokio::test]
async fn test_unknown_key_is_api_error() {
    let base_url = spawn_server().await;
    let client = GatewayClient::new(&base_url).with_api_key("gw_nobody");

    let err = client.me().await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("unexpected error: {other}"),
    }
}
