use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use consign_core::adapters::{MemoryMarketStore, MemoryNotificationSink};
use consign_core::domain::{
    CartItem, CartLine, CartLinePatch, DomainError, Order, OrderPatch, OrderStatus,
    PaymentStatus, Product, ProductStatus, UserSummary,
};
use consign_core::ports::{
    MarketStore, OrderFilter, OrderPage, RepositoryError, RepositoryResult, StoreTransaction,
};
use consign_core::services::{CartService, OrderQueryService};
use consign_core::use_cases::{PlaceOrder, PlaceOrderInput, ReconcilePayment, UpdateOrderStatus};

struct Market {
    store: MemoryMarketStore,
    sink: MemoryNotificationSink,
    cart: CartService,
    orders: OrderQueryService,
    place_order: PlaceOrder,
    reconcile: ReconcilePayment,
    update_status: UpdateOrderStatus,
}

fn market_with(sink: MemoryNotificationSink) -> Market {
    let store = MemoryMarketStore::new();
    let shared = Arc::new(store.clone());
    let notifier = Arc::new(sink.clone());
    Market {
        cart: CartService::new(shared.clone()),
        orders: OrderQueryService::new(shared.clone()),
        place_order: PlaceOrder::new(shared.clone(), notifier.clone()),
        reconcile: ReconcilePayment::new(shared.clone(), notifier),
        update_status: UpdateOrderStatus::new(shared),
        store,
        sink,
    }
}

fn market() -> Market {
    market_with(MemoryNotificationSink::new())
}

fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

async fn user(market: &Market, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    market
        .store
        .insert_user(UserSummary {
            id,
            username: username.to_string(),
            full_name: None,
        })
        .await;
    id
}

async fn product(market: &Market, seller: Uuid, name: &str, price: &str) -> Uuid {
    let product = Product::new(seller, name, money(price));
    let id = product.id;
    market.store.insert_product(product).await;
    id
}

fn checkout(user_id: Uuid) -> PlaceOrderInput {
    PlaceOrderInput {
        user_id,
        payment_method: "transfer".to_string(),
        shipping_address: "Jl. Braga 12, Bandung".to_string(),
        notes: String::new(),
    }
}

/// Memory store whose transactions refuse to reserve one product.
struct ReservationFailingStore {
    inner: MemoryMarketStore,
    refused: Uuid,
}

#[async_trait]
impl MarketStore for ReservationFailingStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(ReservationFailingTransaction {
            inner: self.inner.begin().await?,
            refused: self.refused,
        }))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.inner.ping().await
    }
}

struct ReservationFailingTransaction {
    inner: Box<dyn StoreTransaction>,
    refused: Uuid,
}

#[async_trait]
impl StoreTransaction for ReservationFailingTransaction {
    async fn cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>> {
        self.inner.cart_lines(user_id).await
    }

    async fn lock_cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>> {
        self.inner.lock_cart_lines(user_id).await
    }

    async fn add_to_cart(&mut self, line: &CartLine) -> RepositoryResult<CartLine> {
        self.inner.add_to_cart(line).await
    }

    async fn update_cart_line(
        &mut self,
        line_id: Uuid,
        user_id: Uuid,
        patch: &CartLinePatch,
    ) -> RepositoryResult<u64> {
        self.inner.update_cart_line(line_id, user_id, patch).await
    }

    async fn delete_cart_line(&mut self, line_id: Uuid, user_id: Uuid) -> RepositoryResult<u64> {
        self.inner.delete_cart_line(line_id, user_id).await
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> RepositoryResult<u64> {
        self.inner.clear_cart(user_id).await
    }

    async fn find_product(&mut self, product_id: Uuid) -> RepositoryResult<Option<Product>> {
        self.inner.find_product(product_id).await
    }

    async fn set_product_status(
        &mut self,
        product_id: Uuid,
        status: ProductStatus,
    ) -> RepositoryResult<()> {
        if product_id == self.refused && status == ProductStatus::Reserved {
            return Err(RepositoryError::Corrupt(format!(
                "product {} rejected the update",
                product_id
            )));
        }
        self.inner.set_product_status(product_id, status).await
    }

    async fn insert_order(&mut self, order: &Order) -> RepositoryResult<()> {
        self.inner.insert_order(order).await
    }

    async fn find_order(
        &mut self,
        order_id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<Option<Order>> {
        self.inner.find_order(order_id, owner_id).await
    }

    async fn list_orders(
        &mut self,
        owner_id: Uuid,
        filter: &OrderFilter,
    ) -> RepositoryResult<OrderPage> {
        self.inner.list_orders(owner_id, filter).await
    }

    async fn update_order(
        &mut self,
        order_id: Uuid,
        owner_id: Uuid,
        patch: &OrderPatch,
    ) -> RepositoryResult<u64> {
        self.inner.update_order(order_id, owner_id, patch).await
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn test_checkout_prices_order_and_reserves_products() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let deck = product(&market, seller, "deck", "100").await;
    let griptape = product(&market, seller, "griptape", "50").await;

    market.cart.add(buyer, deck, 2).await.unwrap();
    market.cart.add(buyer, griptape, 1).await.unwrap();

    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    assert_eq!(order.total_amount, money("250.00"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);

    let deck_item = order.items.iter().find(|i| i.product_id == deck).unwrap();
    assert_eq!(deck_item.quantity, 2);
    assert_eq!(deck_item.price, money("100"));
    assert_eq!(deck_item.subtotal, money("200"));
    assert!(deck_item.product.is_some());

    let griptape_item = order.items.iter().find(|i| i.product_id == griptape).unwrap();
    assert_eq!(griptape_item.subtotal, money("50"));

    assert_eq!(
        market.store.product(deck).await.unwrap().status,
        ProductStatus::Reserved
    );
    assert_eq!(
        market.store.product(griptape).await.unwrap().status,
        ProductStatus::Reserved
    );
    assert_eq!(market.store.cart_len(buyer).await, 0);

    let sent = market.sink.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].user_id, buyer);
    assert_eq!(sent[0].title, "Order placed");
    assert_eq!(sent[0].kind, "order");
}

#[tokio::test]
async fn test_checkout_keeps_two_decimal_precision() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let wax = product(&market, seller, "wax", "19.99").await;

    market.cart.add(buyer, wax, 3).await.unwrap();
    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    assert_eq!(order.total_amount, money("59.97"));
    assert_eq!(order.total_amount.to_string(), "59.97");
}

#[tokio::test]
async fn test_checkout_with_empty_cart_fails() {
    let market = market();
    let buyer = user(&market, "buyer").await;

    let err = market.place_order.execute(checkout(buyer)).await.unwrap_err();

    assert!(matches!(err, DomainError::EmptyCart));
    assert_eq!(market.store.order_count().await, 0);
    assert!(market.sink.sent().await.is_empty());
}

#[tokio::test]
async fn test_unavailable_product_aborts_whole_checkout() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let bearings = product(&market, seller, "bearings", "15").await;
    let trucks = product(&market, seller, "trucks", "60").await;

    market.cart.add(buyer, bearings, 1).await.unwrap();
    market.cart.add(buyer, trucks, 1).await.unwrap();

    // someone else bought the trucks in the meantime
    let other = user(&market, "other").await;
    market.cart.add(other, trucks, 1).await.unwrap();
    market.place_order.execute(checkout(other)).await.unwrap();

    let err = market.place_order.execute(checkout(buyer)).await.unwrap_err();

    match err {
        DomainError::ProductUnavailable(id) => assert_eq!(id, trucks.to_string()),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(market.store.order_count().await, 1);
    assert_eq!(
        market.store.product(bearings).await.unwrap().status,
        ProductStatus::Available
    );
    assert_eq!(market.store.cart_len(buyer).await, 2);
}

#[tokio::test]
async fn test_concurrent_checkouts_only_one_wins() {
    let market = market();
    let seller = user(&market, "seller").await;
    let alice = user(&market, "alice").await;
    let bob = user(&market, "bob").await;
    let board = product(&market, seller, "complete board", "120").await;

    market.cart.add(alice, board, 1).await.unwrap();
    market.cart.add(bob, board, 1).await.unwrap();

    let (first, second) = tokio::join!(
        market.place_order.execute(checkout(alice)),
        market.place_order.execute(checkout(bob))
    );

    let results = [first, second];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let unavailable = results
        .iter()
        .filter(|r| matches!(r, Err(DomainError::ProductUnavailable(_))))
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(unavailable, 1);
    assert_eq!(market.store.order_count().await, 1);
    assert_eq!(
        market.store.product(board).await.unwrap().status,
        ProductStatus::Reserved
    );
}

#[tokio::test]
async fn test_failing_notifier_does_not_undo_checkout() {
    let market = market_with(MemoryNotificationSink::failing());
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let deck = product(&market, seller, "deck", "80").await;

    market.cart.add(buyer, deck, 1).await.unwrap();
    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    assert_eq!(market.store.order_count().await, 1);
    assert_eq!(market.orders.get(order.id, buyer).await.unwrap().id, order.id);
    assert_eq!(
        market.store.product(deck).await.unwrap().status,
        ProductStatus::Reserved
    );
}

#[tokio::test]
async fn test_paid_confirms_order_and_sells_products() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let deck = product(&market, seller, "deck", "100").await;

    market.cart.add(buyer, deck, 1).await.unwrap();
    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    let paid = market
        .reconcile
        .execute(order.id, buyer, "paid")
        .await
        .unwrap();

    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Confirmed);
    assert_eq!(
        market.store.product(deck).await.unwrap().status,
        ProductStatus::Sold
    );

    let sent = market.sink.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].title, "Payment confirmed");
    assert_eq!(sent[1].kind, "payment");
}

#[tokio::test]
async fn test_repeated_paid_is_idempotent() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let deck = product(&market, seller, "deck", "100").await;

    market.cart.add(buyer, deck, 1).await.unwrap();
    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    market.reconcile.execute(order.id, buyer, "paid").await.unwrap();
    let again = market.reconcile.execute(order.id, buyer, "paid").await.unwrap();

    assert_eq!(again.status, OrderStatus::Confirmed);
    assert_eq!(again.payment_status, PaymentStatus::Paid);
    assert_eq!(
        market.store.product(deck).await.unwrap().status,
        ProductStatus::Sold
    );

    let payment_notices = market
        .sink
        .sent()
        .await
        .into_iter()
        .filter(|n| n.kind == "payment")
        .count();
    assert_eq!(payment_notices, 1);
}

#[tokio::test]
async fn test_failed_payment_leaves_order_and_products() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let deck = product(&market, seller, "deck", "100").await;

    market.cart.add(buyer, deck, 1).await.unwrap();
    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    let failed = market
        .reconcile
        .execute(order.id, buyer, "failed")
        .await
        .unwrap();

    assert_eq!(failed.payment_status, PaymentStatus::Failed);
    assert_eq!(failed.status, OrderStatus::Pending);
    assert_eq!(
        market.store.product(deck).await.unwrap().status,
        ProductStatus::Reserved
    );
    assert_eq!(market.sink.sent().await.len(), 1);
}

#[tokio::test]
async fn test_reconcile_rejects_unknown_order_and_status() {
    let market = market();
    let buyer = user(&market, "buyer").await;

    let err = market
        .reconcile
        .execute(Uuid::new_v4(), buyer, "paid")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let err = market
        .reconcile
        .execute(Uuid::new_v4(), buyer, "settled")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidStatus(_)));
}

#[tokio::test]
async fn test_orders_are_scoped_to_their_owner() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let stranger = user(&market, "stranger").await;
    let deck = product(&market, seller, "deck", "100").await;

    market.cart.add(buyer, deck, 1).await.unwrap();
    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    let err = market.orders.get(order.id, stranger).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let err = market
        .reconcile
        .execute(order.id, stranger, "paid")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert_eq!(
        market.store.product(deck).await.unwrap().status,
        ProductStatus::Reserved
    );
}

#[tokio::test]
async fn test_update_status_sets_any_known_status() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let deck = product(&market, seller, "deck", "100").await;

    market.cart.add(buyer, deck, 1).await.unwrap();
    let order = market.place_order.execute(checkout(buyer)).await.unwrap();

    let shipped = market
        .update_status
        .execute(order.id, buyer, "shipped")
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let err = market
        .update_status
        .execute(order.id, buyer, "lost")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidStatus(_)));

    let err = market
        .update_status
        .execute(Uuid::new_v4(), buyer, "cancelled")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let stored = market.orders.get(order.id, buyer).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_list_orders_filters_and_paginates() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;

    let mut placed = Vec::new();
    for name in ["deck", "wheels", "trucks"] {
        let id = product(&market, seller, name, "10").await;
        market.cart.add(buyer, id, 1).await.unwrap();
        placed.push(market.place_order.execute(checkout(buyer)).await.unwrap());
    }
    market
        .update_status
        .execute(placed[0].id, buyer, "cancelled")
        .await
        .unwrap();

    let page = market.orders.list(buyer, None, None, None).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.orders[0].id, placed[2].id);

    let page = market
        .orders
        .list(buyer, Some("pending"), Some(1), Some(1))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.orders.len(), 1);
    assert_eq!(page.orders[0].id, placed[1].id);

    let err = market
        .orders
        .list(buyer, Some("archived"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidStatus(_)));
}

#[tokio::test]
async fn test_failed_reservation_rolls_back_earlier_writes() {
    let market = market();
    let seller = user(&market, "seller").await;
    let buyer = user(&market, "buyer").await;
    let deck = product(&market, seller, "deck", "100").await;
    let wheels = product(&market, seller, "wheels", "50").await;

    market.cart.add(buyer, deck, 1).await.unwrap();
    market.cart.add(buyer, wheels, 1).await.unwrap();

    let store = Arc::new(ReservationFailingStore {
        inner: market.store.clone(),
        refused: wheels,
    });
    let place_order = PlaceOrder::new(store, Arc::new(market.sink.clone()));

    let err = place_order.execute(checkout(buyer)).await.unwrap_err();

    assert!(matches!(err, DomainError::Storage(_)));
    assert_eq!(market.store.order_count().await, 0);
    assert_eq!(market.store.cart_len(buyer).await, 2);
    assert_eq!(
        market.store.product(deck).await.unwrap().status,
        ProductStatus::Available
    );
    assert_eq!(
        market.store.product(wheels).await.unwrap().status,
        ProductStatus::Available
    );
    assert!(market.sink.sent().await.is_empty());
}
