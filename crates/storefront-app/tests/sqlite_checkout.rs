#![cfg(feature = "sqlite")]

use storefront_hex::errors::AppError;
use storefront_hex::inbound::http::AppState;
use storefront_repo::{build_repo, Repo};
use storefront_types::domain::catalog::{NewCategory, NewProduct};
use storefront_types::domain::order::{OrderStatus, ShippingDetails};

fn shipping() -> ShippingDetails {
    ShippingDetails {
        address: "22 Market Square".into(),
        city: "Eskisehir".into(),
        district: "Odunpazari".into(),
        postal_code: None,
        phone: "+90 222 000 0000".into(),
        payment_method: "card".into(),
    }
}

async fn state(dir: &tempfile::TempDir) -> AppState<Repo> {
    let url = format!("sqlite://{}", dir.path().join("shop.db").display());
    AppState::new(build_repo(Some(&url)).await.expect("build repo"))
}

async fn product(state: &AppState<Repo>, stock: u32) -> uuid::Uuid {
    let category = state
        .catalog
        .create_category(NewCategory {
            name: "Posters".into(),
            description: None,
            image_url: None,
        })
        .await
        .unwrap();
    state
        .catalog
        .create_product(NewProduct {
            category_id: category.id,
            name: "Signed poster".into(),
            description: None,
            price_cents: 2_500,
            discount_price_cents: None,
            image_url: None,
            stock,
            is_featured: true,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell_on_sqlite() {
    const BUYERS: usize = 8;
    const STOCK: u32 = 3;

    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir).await;
    let product_id = product(&state, STOCK).await;
    for i in 0..BUYERS {
        state
            .carts
            .add_item(&format!("fan-{i}"), product_id, 1)
            .await
            .unwrap();
    }

    let mut tasks = Vec::new();
    for i in 0..BUYERS {
        let orders = state.orders.clone();
        tasks.push(tokio::spawn(async move {
            orders
                .create_order_from_cart(&format!("fan-{i}"), shipping())
                .await
        }));
    }

    let mut placed = 0;
    let mut sold_out = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(AppError::InsufficientStock { .. }) => sold_out += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(placed, STOCK as usize);
    assert_eq!(sold_out, BUYERS - STOCK as usize);

    let product = state.catalog.get_product(product_id).await.unwrap();
    assert_eq!(product.stock, 0);
    assert!(!product.is_active);
}

#[tokio::test]
async fn checkout_and_cancel_round_trip_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir).await;
    let product_id = product(&state, 5).await;

    state.carts.add_item("collector", product_id, 2).await.unwrap();
    state.carts.add_item("collector", product_id, 1).await.unwrap();
    let order = state
        .orders
        .create_order_from_cart("collector", shipping())
        .await
        .unwrap();
    assert_eq!(order.total_cents, 7_500);
    assert_eq!(state.catalog.get_product(product_id).await.unwrap().stock, 2);
    assert_eq!(state.carts.item_count("collector").await.unwrap(), 0);

    state
        .orders
        .update_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert!(state.orders.cancel_order(order.id).await.unwrap());
    assert_eq!(state.catalog.get_product(product_id).await.unwrap().stock, 5);

    let details = state.orders.get_by_number(&order.order_number).await.unwrap();
    assert_eq!(details.order.status, OrderStatus::Cancelled);
    assert_eq!(details.order.items.len(), 1);
    assert_eq!(details.products.len(), 1);
}
