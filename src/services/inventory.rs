use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        inventory_account::{self, Entity as InventoryAccount},
        product::Entity as Product,
        stock_movement::{self, Entity as StockMovement},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Parameters for opening an inventory account.
#[derive(Debug, Clone, Validate)]
pub struct CreateAccountRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    #[validate(range(min = 0, message = "Quantity on hand cannot be negative"))]
    pub quantity_on_hand: i32,
    #[validate(range(min = 0, message = "Reorder level cannot be negative"))]
    pub reorder_level: i32,
    #[validate(range(min = 0, message = "Max level cannot be negative"))]
    pub max_level: i32,
}

/// Service for inventory account lifecycle and independent stock
/// adjustments (transfers go through `TransferService`).
///
/// Each operation runs inside one transactional unit of work: load, apply
/// the in-memory domain operation, stage writes, commit. Any invariant
/// violation aborts before a write is issued.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Opens an inventory account for a product at a location, recording
    /// the opening quantity as an `InitialStock` movement.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, location_id = %request.location_id))]
    pub async fn create_account(
        &self,
        request: CreateAccountRequest,
        actor_id: Uuid,
    ) -> Result<inventory_account::Model, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let product = Product::find_by_id(request.product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", request.product_id))
            })?;

        let existing = InventoryAccount::find()
            .filter(inventory_account::Column::ProductId.eq(request.product_id))
            .filter(inventory_account::Column::LocationId.eq(request.location_id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Inventory account already exists for product {} at location {}",
                request.product_id, request.location_id
            )));
        }

        let (account, opening) = inventory_account::Model::new(
            &product,
            request.location_id,
            request.quantity_on_hand,
            request.reorder_level,
            request.max_level,
            actor_id,
        )?;

        account_insert_row(&account)
            .insert(&txn)
            .await
            .map_err(|e| {
                error!("Failed to insert inventory account: {}", e);
                ServiceError::db_error(e)
            })?;
        movement_row(&opening).insert(&txn).await.map_err(|e| {
            error!("Failed to insert opening movement: {}", e);
            ServiceError::db_error(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::InventoryAccountCreated {
                account_id: account.id,
                product_id: account.product_id,
                location_id: account.location_id,
                quantity_on_hand: account.quantity_on_hand,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(account_id = %account.id, quantity = account.quantity_on_hand, "inventory account created");
        Ok(account)
    }

    /// Sets the absolute quantity for a product at a location. Returns the
    /// updated account and the movement recorded, if the quantity actually
    /// changed.
    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        new_quantity: i32,
        actor_id: Uuid,
    ) -> Result<(inventory_account::Model, Option<stock_movement::Model>), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let mut account = find_account(&txn, product_id, location_id).await?;
        let old_quantity = account.quantity_on_hand;
        let movement = account.set_quantity(new_quantity, actor_id)?;

        if let Some(entry) = &movement {
            persist_account_quantity(&txn, &account).await?;
            movement_row(entry).insert(&txn).await.map_err(|e| {
                error!("Failed to insert movement: {}", e);
                ServiceError::db_error(e)
            })?;
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        if let Some(entry) = &movement {
            self.event_sender
                .send(Event::InventoryAdjusted {
                    account_id: account.id,
                    product_id,
                    location_id,
                    old_quantity,
                    new_quantity,
                })
                .await
                .map_err(ServiceError::EventError)?;
            info!(
                account_id = %account.id,
                kind = entry.kind.as_str(),
                old_quantity,
                new_quantity,
                "inventory adjusted"
            );
        }
        Ok((account, movement))
    }

    /// Replaces quantity, reorder level, and ceiling in one unit of work.
    #[instrument(skip(self))]
    pub async fn update_levels(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        quantity_on_hand: i32,
        reorder_level: i32,
        max_level: i32,
        actor_id: Uuid,
    ) -> Result<(inventory_account::Model, Option<stock_movement::Model>), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let mut account = find_account(&txn, product_id, location_id).await?;
        let movement =
            account.update_levels(quantity_on_hand, reorder_level, max_level, actor_id)?;

        let mut row: inventory_account::ActiveModel = account.clone().into();
        row.quantity_on_hand = Set(account.quantity_on_hand);
        row.reorder_level = Set(account.reorder_level);
        row.max_level = Set(account.max_level);
        row.updated_at = Set(account.updated_at);
        row.update(&txn).await.map_err(|e| {
            error!("Failed to update inventory account {}: {}", account.id, e);
            ServiceError::db_error(e)
        })?;

        if let Some(entry) = &movement {
            movement_row(entry).insert(&txn).await.map_err(|e| {
                error!("Failed to insert movement: {}", e);
                ServiceError::db_error(e)
            })?;
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::InventoryLevelsUpdated {
                account_id: account.id,
                reorder_level: account.reorder_level,
                max_level: account.max_level,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(account_id = %account.id, reorder_level, max_level, "inventory levels updated");
        Ok((account, movement))
    }

    /// Soft-deletes an empty account. Produces no movement entry.
    #[instrument(skip(self))]
    pub async fn delete_account(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        actor_id: Uuid,
    ) -> Result<inventory_account::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let mut account = find_account(&txn, product_id, location_id).await?;
        account.soft_delete()?;

        let mut row: inventory_account::ActiveModel = account.clone().into();
        row.deleted_at = Set(account.deleted_at);
        row.updated_at = Set(account.updated_at);
        row.update(&txn).await.map_err(|e| {
            error!("Failed to soft-delete inventory account {}: {}", account.id, e);
            ServiceError::db_error(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::InventoryAccountDeleted {
                account_id: account.id,
                actor_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(account_id = %account.id, actor_id = %actor_id, "inventory account deleted");
        Ok(account)
    }

    /// Fetches the live account for a product at a location.
    #[instrument(skip(self))]
    pub async fn get_account(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> Result<inventory_account::Model, ServiceError> {
        find_account(self.db.as_ref(), product_id, location_id).await
    }

    /// Lists an account's movements in append (chronological) order.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        StockMovement::find()
            .filter(stock_movement::Column::AccountId.eq(account_id))
            .order_by_asc(stock_movement::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

/// Looks up the live (non-deleted) account for a product/location pair.
pub(crate) async fn find_account<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location_id: Uuid,
) -> Result<inventory_account::Model, ServiceError> {
    InventoryAccount::find()
        .filter(inventory_account::Column::ProductId.eq(product_id))
        .filter(inventory_account::Column::LocationId.eq(location_id))
        .filter(inventory_account::Column::DeletedAt.is_null())
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "No inventory account for product {} at location {}",
                product_id, location_id
            ))
        })
}

/// Stages the balance columns of an already-mutated account for update.
pub(crate) async fn persist_account_quantity<C: ConnectionTrait>(
    conn: &C,
    account: &inventory_account::Model,
) -> Result<(), ServiceError> {
    let mut row: inventory_account::ActiveModel = account.clone().into();
    row.quantity_on_hand = Set(account.quantity_on_hand);
    row.updated_at = Set(account.updated_at);
    row.update(conn).await.map_err(|e| {
        error!("Failed to update inventory account {}: {}", account.id, e);
        ServiceError::db_error(e)
    })?;
    Ok(())
}

/// Builds a fully-set insert row for a new account.
fn account_insert_row(account: &inventory_account::Model) -> inventory_account::ActiveModel {
    inventory_account::ActiveModel {
        id: Set(account.id),
        product_id: Set(account.product_id),
        location_id: Set(account.location_id),
        quantity_on_hand: Set(account.quantity_on_hand),
        reorder_level: Set(account.reorder_level),
        max_level: Set(account.max_level),
        deleted_at: Set(account.deleted_at),
        created_at: Set(account.created_at),
        updated_at: Set(account.updated_at),
    }
}

/// Builds a fully-set insert row for a movement entry.
pub(crate) fn movement_row(entry: &stock_movement::Model) -> stock_movement::ActiveModel {
    stock_movement::ActiveModel {
        id: Set(entry.id),
        product_id: Set(entry.product_id),
        account_id: Set(entry.account_id),
        kind: Set(entry.kind),
        quantity: Set(entry.quantity),
        status: Set(entry.status),
        notes: Set(entry.notes.clone()),
        created_by: Set(entry.created_by),
        created_at: Set(entry.created_at),
    }
}
