//! Sales order workflow engine.
//!
//! Orders move through a small state machine (see [`OrderStatus`]); adding an
//! item drives a ledger reservation, and the approval policy is re-evaluated
//! over the whole order after every addition. Each order sits behind its own
//! mutex so the reserve + attach-item + recompute-approval unit cannot
//! interleave with a concurrent submit or cancel. Lock order is always
//! order first, ledger record second.

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::auth::Actor;
use crate::config::AppConfig;
use crate::entities::{OrderStatus, SalesOrder, SalesOrderItem};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::activity_log::ActivityLog;
use crate::services::approval::{ApprovalPolicy, ApprovalReason};
use crate::services::inventory::InventoryService;

/// Input for creating an order. Tenant identity is passed explicitly; the
/// core does not resolve or validate it.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub tenant_id: Uuid,
    pub currency_code: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
}

/// Input for adding one line to an open order.
#[derive(Debug, Clone)]
pub struct AddItemInput {
    pub order_id: Uuid,
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Defaults to zero.
    pub discount_percent: Option<Decimal>,
    pub currency_code: String,
}

/// Service owning order lifecycle and the reservation hand-off to the ledger.
#[derive(Clone)]
pub struct SalesOrderService {
    orders: Arc<DashMap<Uuid, Arc<Mutex<SalesOrder>>>>,
    inventory: InventoryService,
    policy: ApprovalPolicy,
    config: Arc<AppConfig>,
    event_sender: EventSender,
    activity_log: Arc<dyn ActivityLog>,
}

impl SalesOrderService {
    pub fn new(
        inventory: InventoryService,
        config: Arc<AppConfig>,
        event_sender: EventSender,
        activity_log: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            inventory,
            policy: ApprovalPolicy::from_config(&config.sales),
            config,
            event_sender,
            activity_log,
        }
    }

    /// Creates an order in the initial open state.
    #[instrument(skip(self, input, actor), fields(actor = %actor.username))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
        actor: &Actor,
    ) -> Result<SalesOrder, ServiceError> {
        self.ensure_sales_enabled()?;
        validate_currency(&input.currency_code)?;

        let mut order = SalesOrder::new(input.tenant_id, &input.currency_code, &actor.username);
        order.customer_name = input.customer_name;
        order.customer_phone = input.customer_phone;
        order.customer_email = input.customer_email;
        let snapshot = order.clone();

        self.orders
            .insert(order.id, Arc::new(Mutex::new(order)));

        self.event_sender
            .send_or_log(Event::OrderCreated(snapshot.id))
            .await;

        info!(order_id = %snapshot.id, tenant_id = %snapshot.tenant_id, "Created sales order");
        Ok(snapshot)
    }

    /// Adds an item to an open order, reserving its quantity against the
    /// ledger first. A reservation failure leaves the order untouched; if
    /// attaching the item fails after the reservation succeeded, the
    /// reservation is compensated with a release so no orphaned hold leaks.
    #[instrument(skip(self, input, actor), fields(actor = %actor.username, order_id = %input.order_id))]
    pub async fn add_item(
        &self,
        input: AddItemInput,
        actor: &Actor,
    ) -> Result<SalesOrderItem, ServiceError> {
        self.ensure_sales_enabled()?;

        let discount_percent = input.discount_percent.unwrap_or(Decimal::ZERO);
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit price must be non-negative".to_string(),
            ));
        }
        if discount_percent < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "discount percent must be non-negative".to_string(),
            ));
        }
        validate_currency(&input.currency_code)?;

        let handle = self.order_handle(input.order_id)?;
        let mut order = handle.lock().await;

        if !order.status.is_modifiable() {
            return Err(ServiceError::InvalidStatus(format!(
                "order cannot be modified in status {}",
                order.status
            )));
        }

        self.inventory
            .reserve(
                input.location_id,
                input.product_id,
                input.quantity,
                order.id,
                actor,
            )
            .await?;

        let item = match self.attach_item(&mut order, &input, discount_percent, actor) {
            Ok(item) => item,
            Err(e) => {
                // Compensate the reservation so it cannot leak without an item.
                if let Err(release_err) = self
                    .inventory
                    .release(
                        input.location_id,
                        input.product_id,
                        input.quantity,
                        input.order_id,
                        actor,
                    )
                    .await
                {
                    error!(order_id = %input.order_id, error = %release_err, "Failed to compensate reservation");
                }
                return Err(e);
            }
        };

        if !order.requires_manager_approval {
            if let Some(reason) = self.policy.evaluate(actor, &order.items) {
                order.requires_manager_approval = true;
                match reason {
                    ApprovalReason::DiscountExceedsLimit => info!(
                        order_id = %order.id,
                        "Order requires manager approval: employee discount exceeds threshold"
                    ),
                    ApprovalReason::CrossLocationSourcing => info!(
                        order_id = %order.id,
                        "Order requires manager approval: cross-location sourcing detected"
                    ),
                }
            }
        }
        order.touch(&actor.username);
        drop(order);

        self.event_sender
            .send_or_log(Event::OrderItemAdded {
                order_id: item.order_id,
                item_id: item.id,
                product_id: item.product_id,
                location_id: item.location_id,
                quantity: item.quantity,
            })
            .await;

        info!(order_id = %item.order_id, item_id = %item.id, quantity = item.quantity, "Added item to order");
        Ok(item)
    }

    /// Submits an open, non-empty order. The resulting status depends on
    /// whether the approval policy flagged the order.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn submit(&self, order_id: Uuid, actor: &Actor) -> Result<SalesOrder, ServiceError> {
        let handle = self.order_handle(order_id)?;
        let mut order = handle.lock().await;

        if !order.status.can_submit() {
            return Err(ServiceError::InvalidStatus(format!(
                "order cannot be submitted in status {}",
                order.status
            )));
        }
        if order.items.is_empty() {
            return Err(ServiceError::InvalidStatus(
                "cannot submit an empty order".to_string(),
            ));
        }

        let new_status = if order.requires_manager_approval {
            OrderStatus::PendingManagerApproval
        } else {
            OrderStatus::Confirmed
        };
        let snapshot = self.transition(&mut order, new_status, actor).await;

        info!(order_id = %order_id, status = %snapshot.status, "Order submitted");
        Ok(snapshot)
    }

    /// Manager approval: pending-approval orders move to confirmed.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn approve(&self, order_id: Uuid, actor: &Actor) -> Result<SalesOrder, ServiceError> {
        self.ensure_manager(actor, "approve orders")?;

        let handle = self.order_handle(order_id)?;
        let mut order = handle.lock().await;

        if order.status != OrderStatus::PendingManagerApproval {
            return Err(ServiceError::InvalidStatus(
                "order is not pending approval".to_string(),
            ));
        }

        let snapshot = self.transition(&mut order, OrderStatus::Confirmed, actor).await;

        self.activity_log
            .record(
                &actor.username,
                "order_approved",
                "sales_order",
                &format!("Approved order {}", order_id),
            )
            .await;

        info!(order_id = %order_id, "Order approved by manager");
        Ok(snapshot)
    }

    /// Requests cancellation. Directly cancellable orders (open or pending
    /// approval) release their reservations and cancel on the spot;
    /// confirmed orders park in cancel-requested until a manager signs off.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn request_cancel(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<SalesOrder, ServiceError> {
        let handle = self.order_handle(order_id)?;
        let mut order = handle.lock().await;

        let snapshot = if order.status.can_cancel_directly() {
            self.release_reservations(&mut order, actor).await;
            let snapshot = self.transition(&mut order, OrderStatus::Cancelled, actor).await;
            info!(order_id = %order_id, "Order cancelled immediately");
            snapshot
        } else if order.status == OrderStatus::Confirmed {
            let snapshot = self
                .transition(&mut order, OrderStatus::CancelRequested, actor)
                .await;
            info!(order_id = %order_id, "Order cancellation requested, requires manager approval");
            snapshot
        } else {
            return Err(ServiceError::InvalidStatus(format!(
                "order cannot be cancelled in status {}",
                order.status
            )));
        };

        Ok(snapshot)
    }

    /// Manager approval of a requested cancellation: releases all item
    /// reservations and cancels the order.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn approve_cancel(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<SalesOrder, ServiceError> {
        self.ensure_manager(actor, "approve cancellations")?;

        let handle = self.order_handle(order_id)?;
        let mut order = handle.lock().await;

        if order.status != OrderStatus::CancelRequested {
            return Err(ServiceError::InvalidStatus(
                "order cancellation is not requested".to_string(),
            ));
        }

        self.release_reservations(&mut order, actor).await;
        let snapshot = self.transition(&mut order, OrderStatus::Cancelled, actor).await;

        self.activity_log
            .record(
                &actor.username,
                "order_cancellation_approved",
                "sales_order",
                &format!("Approved cancellation of order {}", order_id),
            )
            .await;

        info!(order_id = %order_id, "Order cancellation approved by manager");
        Ok(snapshot)
    }

    /// Tenant-scoped lookup.
    pub async fn get_order(&self, order_id: Uuid, tenant_id: Uuid) -> Result<SalesOrder, ServiceError> {
        let handle = self.order_handle(order_id)?;
        let order = handle.lock().await;
        if order.tenant_id != tenant_id {
            return Err(ServiceError::not_found("Order", order_id));
        }
        Ok(order.clone())
    }

    fn order_handle(&self, order_id: Uuid) -> Result<Arc<Mutex<SalesOrder>>, ServiceError> {
        self.orders
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::not_found("Order", order_id))
    }

    fn attach_item(
        &self,
        order: &mut SalesOrder,
        input: &AddItemInput,
        discount_percent: Decimal,
        _actor: &Actor,
    ) -> Result<SalesOrderItem, ServiceError> {
        let item = SalesOrderItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            location_id: input.location_id,
            product_id: input.product_id,
            quantity: input.quantity,
            unit_price: input.unit_price,
            discount_percent,
            currency_code: input.currency_code.clone(),
            created_at: Utc::now(),
        };
        order.items.push(item.clone());
        Ok(item)
    }

    /// Best-effort release of every item's reservation. A per-item failure
    /// is logged and iteration continues; any failure flags the order so the
    /// partial release is observable downstream rather than hidden.
    async fn release_reservations(&self, order: &mut SalesOrder, actor: &Actor) {
        let items: Vec<_> = order
            .items
            .iter()
            .map(|i| (i.id, i.location_id, i.product_id, i.quantity))
            .collect();

        for (item_id, location_id, product_id, quantity) in items {
            match self
                .inventory
                .release(location_id, product_id, quantity, order.id, actor)
                .await
            {
                Ok(_) => {}
                Err(e) => {
                    error!(
                        order_id = %order.id,
                        %item_id,
                        error = %e,
                        "Failed to release reservation, continuing with remaining items"
                    );
                    order.release_incomplete = true;
                }
            }
        }

        if order.release_incomplete {
            self.event_sender
                .send_or_log(Event::OrderReleaseIncomplete(order.id))
                .await;
        }
    }

    async fn transition(
        &self,
        order: &mut SalesOrder,
        new_status: OrderStatus,
        actor: &Actor,
    ) -> SalesOrder {
        let old_status = order.status;
        order.set_status(new_status, &actor.username);
        let snapshot = order.clone();

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: order.id,
                old_status,
                new_status,
            })
            .await;

        snapshot
    }

    fn ensure_sales_enabled(&self) -> Result<(), ServiceError> {
        if !self.config.sales.enabled {
            return Err(ServiceError::InvalidOperation(
                "sales functionality is disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_manager(&self, actor: &Actor, action: &str) -> Result<(), ServiceError> {
        if !actor.is_manager_level() {
            return Err(ServiceError::Unauthorized(format!(
                "only managers can {}",
                action
            )));
        }
        Ok(())
    }
}

fn validate_currency(currency_code: &str) -> Result<(), ServiceError> {
    if currency_code.len() != 3 || !currency_code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ServiceError::ValidationError(format!(
            "currency code {:?} must be a 3-letter uppercase code",
            currency_code
        )));
    }
    Ok(())
}
