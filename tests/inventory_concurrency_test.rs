mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use stockline::auth::Actor;
use stockline::errors::ServiceError;
use stockline::services::orders::{AddItemInput, CreateOrderInput};
use stockline::services::stock_movements::AddStockInput;
use stockline::AppState;
use uuid::Uuid;

async fn seed_stock(state: &AppState, location: Uuid, product: Uuid, quantity: i32) {
    state
        .stock_movement_service
        .add_stock(
            AddStockInput {
                location_id: location,
                product_id: product,
                quantity,
                ..Default::default()
            },
            &Actor::manager("receiver"),
        )
        .await
        .expect("seed stock");
}

#[tokio::test]
async fn overlapping_reservations_serialize_on_the_record() {
    let state = common::app_state();
    let clerk = Actor::employee("clerk");
    let (location, product) = (Uuid::new_v4(), Uuid::new_v4());
    seed_stock(&state, location, product, 10).await;

    state
        .inventory_service
        .reserve(location, product, 6, Uuid::new_v4(), &clerk)
        .await
        .expect("first reservation fits");

    // The second request sees the post-mutation availability of 4.
    let err = state
        .inventory_service
        .reserve(location, product, 5, Uuid::new_v4(), &clerk)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let record = state
        .inventory_service
        .get_record(location, product)
        .await
        .unwrap();
    assert_eq!(record.reserved_quantity, 6);
    assert_eq!(record.available_quantity, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reservations_never_oversell() {
    let state = common::app_state();
    let (location, product) = (Uuid::new_v4(), Uuid::new_v4());
    seed_stock(&state, location, product, 10).await;

    // 20 concurrent single-unit reservations against 10 units: exactly 10
    // can succeed.
    let mut tasks = vec![];
    for i in 0..20 {
        let inventory = state.inventory_service.clone();
        tasks.push(tokio::spawn(async move {
            let actor = Actor::employee(format!("clerk-{}", i));
            inventory
                .reserve(location, product, 1, Uuid::new_v4(), &actor)
                .await
                .is_ok()
        }));
    }

    let mut success = 0;
    for task in tasks {
        if task.await.unwrap() {
            success += 1;
        }
    }
    assert_eq!(success, 10, "exactly 10 reservations should succeed");

    let record = state
        .inventory_service
        .get_record(location, product)
        .await
        .unwrap();
    assert_eq!(record.reserved_quantity, 10);
    assert_eq!(record.available_quantity, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_add_item_yields_one_winner() {
    let state = common::app_state();
    let (location, product) = (Uuid::new_v4(), Uuid::new_v4());
    seed_stock(&state, location, product, 10).await;

    let clerk = Actor::employee("clerk");
    let order_a = state
        .order_service
        .create_order(order_input(), &clerk)
        .await
        .unwrap();
    let order_b = state
        .order_service
        .create_order(order_input(), &clerk)
        .await
        .unwrap();

    // Two overlapping additions (6 and 5) against 10 units: whichever
    // acquires the record lock first wins, the other sees the updated
    // availability and fails.
    let service_a = state.order_service.clone();
    let service_b = state.order_service.clone();
    let task_a = tokio::spawn(async move {
        service_a
            .add_item(
                item_input(order_a.id, location, product, 6),
                &Actor::employee("a"),
            )
            .await
    });
    let task_b = tokio::spawn(async move {
        service_b
            .add_item(
                item_input(order_b.id, location, product, 5),
                &Actor::employee("b"),
            )
            .await
    });

    let result_a = task_a.await.unwrap();
    let result_b = task_b.await.unwrap();
    assert!(
        result_a.is_ok() != result_b.is_ok(),
        "exactly one of the two overlapping additions may succeed"
    );
    let winner_quantity = result_a
        .as_ref()
        .or(result_b.as_ref())
        .map(|item| item.quantity)
        .unwrap();

    let record = state
        .inventory_service
        .get_record(location, product)
        .await
        .unwrap();
    assert_eq!(record.reserved_quantity, winner_quantity);
    assert!(record.reserved_quantity <= record.current_quantity);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn unrelated_records_proceed_independently() {
    let state = common::app_state();
    let actor = Actor::employee("clerk");

    let mut pairs = vec![];
    for _ in 0..16 {
        let (location, product) = (Uuid::new_v4(), Uuid::new_v4());
        seed_stock(&state, location, product, 5).await;
        pairs.push((location, product));
    }

    let mut tasks = vec![];
    for (location, product) in pairs.clone() {
        let inventory = state.inventory_service.clone();
        let actor = actor.clone();
        tasks.push(tokio::spawn(async move {
            inventory
                .reserve(location, product, 5, Uuid::new_v4(), &actor)
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    for (location, product) in pairs {
        let record = state
            .inventory_service
            .get_record(location, product)
            .await
            .unwrap();
        assert_eq!(record.reserved_quantity, 5);
    }
}

#[tokio::test]
async fn releasing_more_than_reserved_floors_at_zero() {
    let state = common::app_state();
    let clerk = Actor::employee("clerk");
    let (location, product) = (Uuid::new_v4(), Uuid::new_v4());
    seed_stock(&state, location, product, 10).await;

    state
        .inventory_service
        .reserve(location, product, 3, Uuid::new_v4(), &clerk)
        .await
        .unwrap();
    let snapshot = state
        .inventory_service
        .release(location, product, 9, Uuid::new_v4(), &clerk)
        .await
        .unwrap();

    assert_eq!(snapshot.reserved_quantity, 0);
    assert_eq!(snapshot.current_quantity, 10);
}

fn order_input() -> CreateOrderInput {
    CreateOrderInput {
        tenant_id: Uuid::new_v4(),
        currency_code: "USD".into(),
        customer_name: None,
        customer_phone: None,
        customer_email: None,
    }
}

fn item_input(order_id: Uuid, location_id: Uuid, product_id: Uuid, quantity: i32) -> AddItemInput {
    AddItemInput {
        order_id,
        location_id,
        product_id,
        quantity,
        unit_price: dec!(10.00),
        discount_percent: None,
        currency_code: "USD".into(),
    }
}
