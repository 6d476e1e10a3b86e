//! Store contract checks shared by the adapter suites.

use chrono::{Duration, Utc};
use storefront_types::domain::cart::{Cart, CartItem};
use storefront_types::domain::catalog::{
    Category, NewCategory, NewProduct, Product, ProductFilter, ProductSort,
};
use storefront_types::domain::order::{Order, OrderLine, OrderStatus, ShippingDetails};
use storefront_types::ports::store::{OrderFilter, RepoError, Store};
use uuid::Uuid;

pub fn category(name: &str) -> Category {
    Category::new(NewCategory {
        name: name.into(),
        description: None,
        image_url: None,
    })
    .unwrap()
}

pub fn product(category: &Category, name: &str, price_cents: i64, stock: u32) -> Product {
    Product::new(NewProduct {
        category_id: category.id,
        name: name.into(),
        description: Some(format!("the {name}")),
        price_cents,
        discount_price_cents: None,
        image_url: None,
        stock,
        is_featured: price_cents > 1_000,
    })
    .unwrap()
}

pub fn order(user_id: &str, product: &Product, quantity: u32) -> Order {
    Order::new(
        user_id,
        ShippingDetails {
            address: "1 Quay Street".into(),
            city: "Trabzon".into(),
            district: "Ortahisar".into(),
            postal_code: None,
            phone: "+90 462 000 0000".into(),
            payment_method: "card".into(),
        },
        vec![OrderLine {
            product_id: product.id,
            quantity,
            unit_price_cents: product.effective_price_cents(),
        }],
    )
    .unwrap()
}

pub async fn seed<S: Store>(store: &S, category: &Category, products: &[&Product]) {
    let mut uow = store.begin().await.unwrap();
    uow.save_category(category).await.unwrap();
    for p in products {
        uow.save_product(p).await.unwrap();
    }
    uow.commit().await.unwrap();
}

pub async fn staged_writes_publish_on_commit<S: Store>(store: &S) {
    let c = category("Tools");
    let p = product(&c, "Hammer", 1_500, 4);

    let mut uow = store.begin().await.unwrap();
    uow.save_category(&c).await.unwrap();
    uow.save_product(&p).await.unwrap();
    assert_eq!(uow.product(p.id).await.unwrap().map(|p| p.stock), Some(4));
    uow.commit().await.unwrap();

    let stored = store.product(p.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Hammer");
    assert_eq!(stored.stock, 4);
    assert_eq!(store.category(c.id).await.unwrap().unwrap().name, "Tools");
}

pub async fn rollback_and_drop_discard_writes<S: Store>(store: &S) {
    let c = category("Paint");
    let p = product(&c, "Brush", 300, 9);
    seed(store, &c, &[&p]).await;

    let mut uow = store.begin().await.unwrap();
    let mut changed = uow.product(p.id).await.unwrap().unwrap();
    changed.take_stock(9).unwrap();
    uow.save_product(&changed).await.unwrap();
    uow.rollback().await.unwrap();
    assert_eq!(store.product(p.id).await.unwrap().unwrap().stock, 9);

    {
        let mut uow = store.begin().await.unwrap();
        uow.delete_product(p.id).await.unwrap();
    }
    assert!(store.product(p.id).await.unwrap().is_some());
}

pub async fn carts_are_unique_per_user<S: Store>(store: &S) {
    let c = category("Garden");
    let p = product(&c, "Rake", 2_000, 5);
    seed(store, &c, &[&p]).await;

    let cart = Cart::new("user-1");
    let mut uow = store.begin().await.unwrap();
    uow.insert_cart(&cart).await.unwrap();
    let item = CartItem::new(cart.id, &p, 2);
    uow.save_cart_item(&item).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let second = uow.insert_cart(&Cart::new("user-1")).await;
    assert!(matches!(second, Err(RepoError::Conflict(_))));
    uow.rollback().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let dup = uow.save_cart_item(&CartItem::new(cart.id, &p, 1)).await;
    assert!(matches!(dup, Err(RepoError::Conflict(_))));
    uow.rollback().await.unwrap();

    let stored = store.cart_for_user("user-1").await.unwrap().unwrap();
    assert_eq!(stored.id, cart.id);
    let items = store.cart_items(cart.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);

    let mut uow = store.begin().await.unwrap();
    assert_eq!(uow.delete_cart_items(cart.id).await.unwrap(), 1);
    assert!(uow.cart_items(cart.id).await.unwrap().is_empty());
    uow.commit().await.unwrap();
    assert!(store.cart_items(cart.id).await.unwrap().is_empty());
    assert!(store.cart_for_user("user-1").await.unwrap().is_some());
}

pub async fn cart_item_quantity_updates_in_place<S: Store>(store: &S) {
    let c = category("Kitchen");
    let p = product(&c, "Whisk", 400, 10);
    seed(store, &c, &[&p]).await;

    let cart = Cart::new("user-2");
    let mut item = CartItem::new(cart.id, &p, 1);
    let mut uow = store.begin().await.unwrap();
    uow.insert_cart(&cart).await.unwrap();
    uow.save_cart_item(&item).await.unwrap();
    item.set_quantity(6);
    uow.save_cart_item(&item).await.unwrap();
    uow.commit().await.unwrap();

    let items = store.cart_items(cart.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 6);

    let mut uow = store.begin().await.unwrap();
    assert!(uow.delete_cart_item(item.id).await.unwrap());
    assert!(!uow.delete_cart_item(item.id).await.unwrap());
    assert!(uow.cart_item(item.id).await.unwrap().is_none());
    uow.commit().await.unwrap();
}

pub async fn orders_round_trip_and_list_newest_first<S: Store>(store: &S) {
    let c = category("Books");
    let p = product(&c, "Atlas", 5_000, 10);
    seed(store, &c, &[&p]).await;

    let mut older = order("reader", &p, 1);
    older.order_date = Utc::now() - Duration::minutes(5);
    let newer = order("reader", &p, 2);
    let other = order("someone-else", &p, 3);

    let mut uow = store.begin().await.unwrap();
    for o in [&older, &newer, &other] {
        uow.insert_order(o).await.unwrap();
    }
    uow.commit().await.unwrap();

    let stored = store.order(newer.id).await.unwrap().unwrap();
    assert_eq!(stored.order_number, newer.order_number);
    assert_eq!(stored.total_cents, 10_000);
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].quantity, 2);
    assert_eq!(stored.shipping.city, "Trabzon");

    let by_number = store
        .order_by_number(&older.order_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id, older.id);

    let mine = store
        .orders(&OrderFilter {
            user_id: Some("reader".into()),
            status: None,
        })
        .await
        .unwrap();
    let ids: Vec<Uuid> = mine.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert_eq!(store.orders(&OrderFilter::default()).await.unwrap().len(), 3);
}

pub async fn order_numbers_are_unique<S: Store>(store: &S) {
    let c = category("Music");
    let p = product(&c, "Vinyl", 2_500, 10);
    seed(store, &c, &[&p]).await;

    let first = order("dj", &p, 1);
    let mut clash = order("dj", &p, 1);
    clash.order_number = first.order_number.clone();

    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&first).await.unwrap();
    let res = uow.insert_order(&clash).await;
    assert!(matches!(res, Err(RepoError::Conflict(_))));
    uow.commit().await.unwrap();

    assert!(store.order(first.id).await.unwrap().is_some());
    assert!(store.order(clash.id).await.unwrap().is_none());
}

pub async fn order_updates_touch_status_and_payment<S: Store>(store: &S) {
    let c = category("Toys");
    let p = product(&c, "Kite", 900, 10);
    seed(store, &c, &[&p]).await;

    let mut o = order("kid", &p, 1);
    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&o).await.unwrap();
    uow.commit().await.unwrap();

    o.set_status(OrderStatus::Processing);
    o.mark_paid();
    let mut uow = store.begin().await.unwrap();
    uow.update_order(&o).await.unwrap();
    uow.commit().await.unwrap();

    let stored = store.order(o.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Processing);
    assert!(stored.is_paid);
    assert!(stored.paid_date.is_some());

    let processing = store
        .orders(&OrderFilter {
            user_id: None,
            status: Some(OrderStatus::Processing),
        })
        .await
        .unwrap();
    assert_eq!(processing.len(), 1);
}

pub async fn product_queries_filter_and_sort<S: Store>(store: &S) {
    let c = category("Outdoor");
    let other = category("Indoor");
    let tent = product(&c, "Tent", 12_000, 2);
    let stove = product(&c, "Stove", 4_000, 0);
    let lamp = product(&c, "Lamp", 800, 7);
    let rug = product(&other, "Rug", 6_000, 1);
    seed(store, &c, &[&tent, &stove, &lamp]).await;
    seed(store, &other, &[&rug]).await;

    let names = |ps: Vec<Product>| ps.into_iter().map(|p| p.name).collect::<Vec<_>>();

    let active = store.products(&ProductFilter::active()).await.unwrap();
    assert_eq!(names(active), vec!["Lamp", "Rug", "Tent"]);

    let mut filter = ProductFilter {
        category_id: Some(c.id),
        sort: ProductSort::PriceAsc,
        ..ProductFilter::default()
    };
    assert_eq!(
        names(store.products(&filter).await.unwrap()),
        vec!["Lamp", "Stove", "Tent"]
    );

    filter.min_price_cents = Some(1_000);
    filter.max_price_cents = Some(10_000);
    assert_eq!(names(store.products(&filter).await.unwrap()), vec!["Stove"]);

    let search = ProductFilter {
        search: Some("  ten ".into()),
        ..ProductFilter::default()
    };
    assert_eq!(names(store.products(&search).await.unwrap()), vec!["Tent"]);

    let featured = ProductFilter {
        featured_only: true,
        sort: ProductSort::PriceDesc,
        ..ProductFilter::default()
    };
    assert_eq!(
        names(store.products(&featured).await.unwrap()),
        vec!["Tent", "Rug", "Stove"]
    );

    let by_ids = store
        .products_by_ids(&[lamp.id, Uuid::new_v4(), rug.id])
        .await
        .unwrap();
    assert_eq!(by_ids.len(), 2);
    assert!(store.products_by_ids(&[]).await.unwrap().is_empty());
}

pub async fn categories_list_by_name<S: Store>(store: &S) {
    let mut b = category("Beta");
    let a = category("Alpha");
    let mut uow = store.begin().await.unwrap();
    uow.save_category(&b).await.unwrap();
    uow.save_category(&a).await.unwrap();
    uow.commit().await.unwrap();

    b.soft_delete();
    let mut uow = store.begin().await.unwrap();
    uow.save_category(&b).await.unwrap();
    uow.commit().await.unwrap();

    let all: Vec<String> = store
        .categories(false)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(all, vec!["Alpha", "Beta"]);
    assert_eq!(store.categories(true).await.unwrap().len(), 1);
}

pub async fn search_treats_wildcards_literally<S: Store>(store: &S) {
    let c = category("Sale");
    let half = product(&c, "50% off mug", 500, 1);
    let plain = product(&c, "500 mug", 900, 1);
    let underscored = product(&c, "a_b tray", 300, 1);
    let lookalike = product(&c, "axb tray", 300, 1);
    let slashed = product(&c, r"c\d lamp", 300, 1);
    seed(store, &c, &[&half, &plain, &underscored, &lookalike, &slashed]).await;

    let search = |term: &str| ProductFilter {
        search: Some(term.into()),
        ..ProductFilter::default()
    };
    let names = |ps: Vec<Product>| ps.into_iter().map(|p| p.name).collect::<Vec<_>>();

    assert_eq!(
        names(store.products(&search("50%")).await.unwrap()),
        vec!["50% off mug"]
    );
    assert_eq!(
        names(store.products(&search("a_b")).await.unwrap()),
        vec!["a_b tray"]
    );
    assert_eq!(
        names(store.products(&search(r"c\d")).await.unwrap()),
        vec![r"c\d lamp"]
    );
    assert_eq!(
        names(store.products(&search("mug")).await.unwrap()),
        vec!["50% off mug", "500 mug"]
    );
}
