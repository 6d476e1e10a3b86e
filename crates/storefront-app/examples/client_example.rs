///  To run :
///  cargo r --example client_example
use storefront_client::{ApiError, StorefrontClient};
use storefront_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use storefront_repo::build_repo;
use storefront_types::api::CreateOrderRequest;
use storefront_types::domain::catalog::{NewCategory, NewProduct};
use storefront_types::domain::order::{OrderStatus, ShippingDetails};
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("storefront.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url)).await?;
    let server = HttpServer::new(
        AppState::new(repo),
        HttpServerConfig {
            port: port.to_string(),
        },
    );

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = StorefrontClient::new(&addr)?;
    let category = client
        .create_category(&NewCategory {
            name: "Stationery".into(),
            description: None,
            image_url: None,
        })
        .await?;
    let product = client
        .create_product(&NewProduct {
            category_id: category.id,
            name: "Fountain pen".into(),
            description: Some("Steel nib".into()),
            price_cents: 3_200,
            discount_price_cents: Some(2_900),
            image_url: None,
            stock: 3,
            is_featured: true,
        })
        .await?;
    println!("Created product {} with stock {}", product.name, product.stock);

    client.add_to_cart("example-user", product.id, 2).await?;
    let cart = client.get_cart("example-user").await?;
    println!(
        "Cart holds {} unit(s), total {} cents",
        cart.item_count, cart.grand_total_cents
    );

    let order = client
        .checkout(&CreateOrderRequest {
            user_id: "example-user".into(),
            shipping: ShippingDetails {
                address: "5 Library Lane".into(),
                city: "Istanbul".into(),
                district: "Kadikoy".into(),
                postal_code: Some("34710".into()),
                phone: "+90 216 000 0000".into(),
                payment_method: "card".into(),
            },
        })
        .await?;
    println!("Placed order {} for {} cents", order.order_number, order.total_cents);
    assert_eq!(order.status, OrderStatus::Pending);

    client.mark_order_paid(order.id).await?;
    let updated = client.update_status(order.id, OrderStatus::Shipped).await?;
    println!("Order {} is now {}", updated.order_number, updated.status);

    // A shipped order cannot be cancelled; the server explains why.
    match client.cancel_order(order.id).await {
        Ok(()) => println!("Cancelled order"),
        Err(err) => match err.downcast_ref::<ApiError>() {
            Some(api) => println!("Cancel refused ({}): {}", api.status, api.message),
            None => return Err(err),
        },
    }

    let remaining = client.get_product(product.id).await?;
    println!("Remaining stock: {}", remaining.stock);

    handle.abort();
    Ok(())
}
