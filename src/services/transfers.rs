use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        inventory_account,
        stock_movement::{self, MovementKind},
        stock_transfer::{self, Entity as StockTransfer},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::{find_account, movement_row, persist_account_quantity},
};

/// Parameters for executing a stock transfer.
#[derive(Debug, Clone, Validate)]
pub struct TransferRequest {
    pub product_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub notes: Option<String>,
}

/// Everything a transfer changes, computed in memory before any write is
/// issued. Either the whole plan persists or none of it does.
#[derive(Debug, Clone)]
pub(crate) struct TransferPlan {
    pub from_account: inventory_account::Model,
    pub to_account: inventory_account::Model,
    pub debit: stock_movement::Model,
    pub credit: stock_movement::Model,
    pub record: stock_transfer::Model,
}

/// Coordinates a two-sided transfer: debit the source account, credit the
/// destination account, and create the transfer record, committed as one
/// unit of work.
#[derive(Clone)]
pub struct TransferService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl TransferService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Moves `quantity` of a product from one location to another and
    /// records the transfer in `Pending` status. The quantity moves at
    /// creation time; the status chain is an audit trail, not a gate.
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            from_location = %request.from_location_id,
            to_location = %request.to_location_id,
            quantity = request.quantity,
        )
    )]
    pub async fn execute_transfer(
        &self,
        request: TransferRequest,
        actor_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        // From-account first: deterministic lock acquisition order.
        let from_account =
            find_account(&txn, request.product_id, request.from_location_id).await?;
        let to_account = find_account(&txn, request.product_id, request.to_location_id).await?;

        let plan = plan_transfer(
            from_account,
            to_account,
            request.quantity,
            request.notes.clone(),
            actor_id,
        )?;

        persist_account_quantity(&txn, &plan.from_account).await?;
        movement_row(&plan.debit).insert(&txn).await.map_err(|e| {
            error!("Failed to insert debit movement: {}", e);
            ServiceError::db_error(e)
        })?;
        persist_account_quantity(&txn, &plan.to_account).await?;
        movement_row(&plan.credit).insert(&txn).await.map_err(|e| {
            error!("Failed to insert credit movement: {}", e);
            ServiceError::db_error(e)
        })?;
        record_insert_row(&plan.record).insert(&txn).await.map_err(|e| {
            error!("Failed to insert transfer record: {}", e);
            ServiceError::db_error(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        let record = plan.record;
        self.event_sender
            .send(Event::TransferExecuted {
                transfer_id: record.id,
                product_id: record.product_id,
                from_location_id: record.from_location_id,
                to_location_id: record.to_location_id,
                quantity: record.quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(transfer_id = %record.id, "inventory transfer executed");
        Ok(record)
    }

    pub async fn approve(
        &self,
        transfer_id: Uuid,
        actor_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        self.apply_transition(transfer_id, actor_id, "approve", stock_transfer::Model::approve)
            .await
    }

    pub async fn cancel(
        &self,
        transfer_id: Uuid,
        actor_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        self.apply_transition(transfer_id, actor_id, "cancel", stock_transfer::Model::cancel)
            .await
    }

    pub async fn reject(
        &self,
        transfer_id: Uuid,
        actor_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        self.apply_transition(transfer_id, actor_id, "reject", stock_transfer::Model::reject)
            .await
    }

    pub async fn mark_in_transit(
        &self,
        transfer_id: Uuid,
        actor_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        self.apply_transition(
            transfer_id,
            actor_id,
            "mark_in_transit",
            stock_transfer::Model::mark_in_transit,
        )
        .await
    }

    pub async fn complete(
        &self,
        transfer_id: Uuid,
        actor_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        self.apply_transition(transfer_id, actor_id, "complete", stock_transfer::Model::complete)
            .await
    }

    pub async fn fail(
        &self,
        transfer_id: Uuid,
        actor_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        self.apply_transition(transfer_id, actor_id, "fail", stock_transfer::Model::fail)
            .await
    }

    async fn apply_transition(
        &self,
        transfer_id: Uuid,
        actor_id: Uuid,
        operation: &'static str,
        transition: fn(&mut stock_transfer::Model) -> Result<(), ServiceError>,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let mut record = StockTransfer::find_by_id(transfer_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        let old_status = record.status.clone();
        transition(&mut record)?;

        let mut row: stock_transfer::ActiveModel = record.clone().into();
        row.status = Set(record.status.clone());
        row.updated_at = Set(record.updated_at);
        row.update(&txn).await.map_err(|e| {
            error!("Failed to update transfer {}: {}", transfer_id, e);
            ServiceError::db_error(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::TransferStatusChanged {
                transfer_id,
                old_status: old_status.as_str().to_string(),
                new_status: record.status.as_str().to_string(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            transfer_id = %transfer_id,
            actor_id = %actor_id,
            operation,
            old_status = old_status.as_str(),
            new_status = record.status.as_str(),
            "transfer status changed"
        );
        Ok(record)
    }
}

/// Applies the symmetric debit/credit to copies of both accounts and
/// constructs the pending record. Pure; any invariant violation aborts with
/// both copies discarded.
pub(crate) fn plan_transfer(
    mut from_account: inventory_account::Model,
    mut to_account: inventory_account::Model,
    quantity: i32,
    notes: Option<String>,
    actor_id: Uuid,
) -> Result<TransferPlan, ServiceError> {
    let debit_target = from_account
        .quantity_on_hand
        .checked_sub(quantity)
        .ok_or_else(|| {
            ServiceError::InvariantViolation("Transfer quantity out of range".to_string())
        })?;
    let debit = from_account.set_quantity_with_kind(
        debit_target,
        MovementKind::TransferOut,
        notes.clone(),
        actor_id,
    )?;

    let credit_target = to_account
        .quantity_on_hand
        .checked_add(quantity)
        .ok_or_else(|| {
            ServiceError::InvariantViolation("Transfer quantity out of range".to_string())
        })?;
    let credit = to_account.set_quantity_with_kind(
        credit_target,
        MovementKind::TransferIn,
        notes,
        actor_id,
    )?;

    let record = stock_transfer::Model::new(
        from_account.product_id,
        from_account.location_id,
        to_account.location_id,
        quantity,
        actor_id,
    )?;

    let (Some(debit), Some(credit)) = (debit, credit) else {
        return Err(ServiceError::InvariantViolation(
            "Transfer quantity must be positive".to_string(),
        ));
    };

    Ok(TransferPlan {
        from_account,
        to_account,
        debit,
        credit,
        record,
    })
}

/// Builds a fully-set insert row for a new transfer record.
fn record_insert_row(record: &stock_transfer::Model) -> stock_transfer::ActiveModel {
    stock_transfer::ActiveModel {
        id: Set(record.id),
        product_id: Set(record.product_id),
        from_location_id: Set(record.from_location_id),
        to_location_id: Set(record.to_location_id),
        quantity: Set(record.quantity),
        status: Set(record.status.clone()),
        created_by: Set(record.created_by),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::stock_transfer::TransferStatus;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn account(product_id: Uuid, quantity: i32, max: i32) -> inventory_account::Model {
        let now = Utc::now();
        inventory_account::Model {
            id: Uuid::new_v4(),
            product_id,
            location_id: Uuid::new_v4(),
            quantity_on_hand: quantity,
            reorder_level: 0,
            max_level: max,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn plan_moves_quantity_and_records_both_sides() {
        let product_id = Uuid::new_v4();
        let from = account(product_id, 50, 100);
        let to = account(product_id, 10, 100);
        let actor = Uuid::new_v4();

        let plan = plan_transfer(from.clone(), to.clone(), 20, None, actor).unwrap();

        assert_eq!(plan.from_account.quantity_on_hand, 30);
        assert_eq!(plan.to_account.quantity_on_hand, 30);

        assert_eq!(plan.debit.kind, MovementKind::TransferOut);
        assert_eq!(plan.debit.quantity, 20);
        assert_eq!(plan.debit.account_id, from.id);
        assert_eq!(plan.credit.kind, MovementKind::TransferIn);
        assert_eq!(plan.credit.quantity, 20);
        assert_eq!(plan.credit.account_id, to.id);

        assert_eq!(plan.record.status, TransferStatus::Pending);
        assert_eq!(plan.record.quantity, 20);
        assert_eq!(plan.record.from_location_id, from.location_id);
        assert_eq!(plan.record.to_location_id, to.location_id);
        assert_eq!(plan.record.created_by, actor);
    }

    #[test]
    fn insufficient_stock_aborts_the_whole_plan() {
        let product_id = Uuid::new_v4();
        let from = account(product_id, 5, 100);
        let to = account(product_id, 10, 100);

        let result = plan_transfer(from, to, 20, None, Uuid::new_v4());
        assert_matches!(result, Err(ServiceError::InvariantViolation(_)));
    }

    #[test]
    fn destination_overflow_aborts_after_debit_side_succeeded() {
        let product_id = Uuid::new_v4();
        let from = account(product_id, 50, 100);
        let to = account(product_id, 95, 100);

        let result = plan_transfer(from, to, 20, None, Uuid::new_v4());
        assert_matches!(result, Err(ServiceError::InvariantViolation(_)));
    }

    #[test]
    fn non_positive_quantity_is_an_invariant_violation() {
        let product_id = Uuid::new_v4();
        assert_matches!(
            plan_transfer(
                account(product_id, 50, 100),
                account(product_id, 10, 100),
                0,
                None,
                Uuid::new_v4()
            ),
            Err(ServiceError::InvariantViolation(_))
        );
        assert_matches!(
            plan_transfer(
                account(product_id, 50, 100),
                account(product_id, 10, 100),
                -3,
                None,
                Uuid::new_v4()
            ),
            Err(ServiceError::InvariantViolation(_))
        );
    }

    #[test]
    fn notes_are_carried_onto_both_movements() {
        let product_id = Uuid::new_v4();
        let plan = plan_transfer(
            account(product_id, 50, 100),
            account(product_id, 10, 100),
            5,
            Some("rebalance".to_string()),
            Uuid::new_v4(),
        )
        .unwrap();
        assert_eq!(plan.debit.notes.as_deref(), Some("rebalance"));
        assert_eq!(plan.credit.notes.as_deref(), Some("rebalance"));
    }
}
