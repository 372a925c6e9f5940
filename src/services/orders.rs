use crate::{
    db::DbPool,
    entities::payment_order::{
        ActiveModel as OrderActiveModel, Column as OrderColumn, Entity as OrderEntity,
        Model as OrderModel, OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::GatewayClient,
};
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the order service.
///
/// Scalar fields default when absent so a sparse body still reaches service
/// validation and gets a validation error rather than a deserialization
/// rejection.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Mobile number is required"))]
    pub mobile_number: String,
    /// Amount in major units (rupees); converted to minor units internally
    #[serde(default)]
    pub amount: Decimal,
    pub email: Option<String>,
    pub address: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_id: Uuid,
    /// Vendor hosted-checkout URL the browser should be sent to
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub name: String,
    pub mobile_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub service: Option<String>,
    /// Amount in major units
    pub amount: Decimal,
    pub amount_minor: i64,
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Confirmed terminal outcome of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Failed,
}

impl PaymentOutcome {
    pub fn status(self) -> OrderStatus {
        match self {
            Self::Success => OrderStatus::Success,
            Self::Failed => OrderStatus::Failed,
        }
    }
}

/// Minimum accepted amount: one major unit.
const MIN_AMOUNT_MAJOR: Decimal = Decimal::ONE;

/// Converts a major-unit amount into minor units (paise), rounding half away
/// from zero. Rejects anything below the minimum threshold.
pub fn amount_to_minor(amount: Decimal) -> Result<i64, ServiceError> {
    if amount < MIN_AMOUNT_MAJOR {
        return Err(ServiceError::ValidationError(format!(
            "amount must be at least {MIN_AMOUNT_MAJOR}"
        )));
    }

    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|minor| *minor > 0)
        .ok_or_else(|| ServiceError::ValidationError("amount is out of range".to_string()))
}

/// Owns order creation and the pending-to-terminal transition. No other
/// component writes the status column.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    gateway: GatewayClient,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        gateway: GatewayClient,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            gateway,
            event_sender,
        }
    }

    /// Creates an order and initiates payment with the vendor.
    ///
    /// Persist-first policy: the row is written as `pending` before the vendor
    /// call, then rolled forward to `failed` if initiation fails, so a record
    /// always exists for support. Validation failures persist nothing and
    /// never reach the vendor.
    #[instrument(skip(self, request), fields(customer = %request.name))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let amount_minor = amount_to_minor(request.amount)?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let order = OrderActiveModel {
            id: Set(order_id),
            customer_name: Set(request.name.clone()),
            phone: Set(request.mobile_number.clone()),
            email: Set(request.email.clone()),
            address: Set(request.address.clone()),
            service: Set(request.service.clone()),
            amount_minor: Set(amount_minor),
            status: Set(OrderStatus::Pending.to_string()),
            transaction_id: Set(None),
            payment_method: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let order_model = order.insert(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to persist order");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, amount_minor, "Order persisted as pending");
        self.emit(Event::OrderCreated(order_id)).await;

        let session = match self.gateway.initiate(&order_model).await {
            Ok(session) => session,
            Err(err) => {
                // Roll forward so the record is never indistinguishable from
                // one the vendor is still processing.
                self.roll_forward_initiate_failure(order_id).await;
                return Err(err);
            }
        };

        info!(order_id = %order_id, vendor_txn_id = %session.vendor_txn_id, "Payment initiated");

        Ok(CreatedOrder {
            order_id,
            url: session.redirect_url,
        })
    }

    /// Retrieves an order by id.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(model_to_response(order))
    }

    /// Applies a confirmed terminal outcome to an order.
    ///
    /// The terminal state is a one-way latch: re-applying the same outcome is
    /// a no-op, and a conflicting outcome never overwrites an earlier one.
    /// Vendor callback retries make both cases routine.
    #[instrument(skip(self), fields(order_id = %order_id, outcome = ?outcome))]
    pub async fn finalize_order(
        &self,
        order_id: Uuid,
        outcome: PaymentOutcome,
        vendor_txn_id: Option<String>,
        payment_method: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db_pool;
        let new_status = outcome.status();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start finalize transaction");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order for finalize");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let current = order.order_status();

        if current.is_terminal() {
            if current == new_status {
                info!(order_id = %order_id, status = %current, "Duplicate callback; order already finalized");
            } else {
                warn!(
                    order_id = %order_id,
                    current = %current,
                    attempted = %new_status,
                    "Refusing terminal status flip"
                );
            }
            return Ok(order);
        }

        let old_status = current.to_string();

        // Guarded by the pending filter so concurrent finalizes cannot both
        // win: the losing side matches zero rows.
        let mut update = OrderEntity::update_many()
            .col_expr(OrderColumn::Status, Expr::value(new_status.to_string()))
            .col_expr(OrderColumn::UpdatedAt, Expr::value(Some(Utc::now())));
        if let Some(txn_id) = vendor_txn_id {
            update = update.col_expr(OrderColumn::TransactionId, Expr::value(Some(txn_id)));
        }
        if let Some(method) = payment_method {
            update = update.col_expr(OrderColumn::PaymentMethod, Expr::value(Some(method)));
        }

        let result = update
            .filter(OrderColumn::Id.eq(order_id))
            .filter(OrderColumn::Status.eq(OrderStatus::Pending.to_string()))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to finalize order");
                ServiceError::DatabaseError(e)
            })?;

        let settled = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to re-fetch finalized order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit finalize transaction");
            ServiceError::DatabaseError(e)
        })?;

        if result.rows_affected == 0 {
            // A concurrent finalize got there between our read and the update.
            warn!(
                order_id = %order_id,
                settled = %settled.status,
                attempted = %new_status,
                "Order finalized concurrently; keeping earlier outcome"
            );
            return Ok(settled);
        }

        info!(order_id = %order_id, old_status = %old_status, new_status = %new_status, "Order finalized");

        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: new_status.to_string(),
        })
        .await;
        match outcome {
            PaymentOutcome::Success => self.emit(Event::PaymentSucceeded(order_id)).await,
            PaymentOutcome::Failed => self.emit(Event::PaymentFailed(order_id)).await,
        }

        Ok(settled)
    }

    /// Best-effort roll forward after a failed initiate. A store failure here
    /// is logged and swallowed; the caller still reports the gateway error.
    async fn roll_forward_initiate_failure(&self, order_id: Uuid) {
        if let Err(e) = self
            .finalize_order(order_id, PaymentOutcome::Failed, None, None)
            .await
        {
            error!(error = %e, order_id = %order_id, "Failed to mark order failed after initiate error");
        }
        self.emit(Event::GatewayInitiateFailed(order_id)).await;
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send event");
            }
        }
    }
}

/// Converts an order model to response format, amount reported in major units.
pub fn model_to_response(model: OrderModel) -> OrderResponse {
    let status = model.order_status();
    OrderResponse {
        id: model.id,
        name: model.customer_name,
        mobile_number: model.phone,
        email: model.email,
        address: model.address,
        service: model.service,
        amount: Decimal::new(model.amount_minor, 2),
        amount_minor: model.amount_minor,
        status,
        transaction_id: model.transaction_id,
        payment_method: model.payment_method,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
