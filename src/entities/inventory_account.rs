use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product;
use super::stock_movement::{self, MovementKind, MovementStatus};
use crate::errors::ServiceError;

/// The quantity-on-hand record for one product at one location.
///
/// Every mutation re-checks the level invariants
/// (`0 <= quantity_on_hand <= max_level`, `reorder_level <= max_level`) and
/// stages an immutable movement entry before the balance itself changes, so
/// ledger and balance never observe an intermediate inconsistent state. All
/// methods are pure in-memory operations; the service layer persists the
/// results inside one unit of work.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity_on_hand: i32,
    pub reorder_level: i32,
    pub max_level: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Opens a new account for an active product at a location. Returns the
    /// account plus the `InitialStock` movement carrying the opening
    /// quantity.
    pub fn new(
        product: &product::Model,
        location_id: Uuid,
        quantity_on_hand: i32,
        reorder_level: i32,
        max_level: i32,
        actor_id: Uuid,
    ) -> Result<(Self, stock_movement::Model), ServiceError> {
        if !product.is_active {
            return Err(ServiceError::InvariantViolation(format!(
                "Product {} is inactive and cannot hold stock",
                product.id
            )));
        }
        check_levels(quantity_on_hand, reorder_level, max_level)?;

        let now = Utc::now();
        let account = Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            location_id,
            quantity_on_hand,
            reorder_level,
            max_level,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let opening = account.movement(MovementKind::InitialStock, quantity_on_hand, None, actor_id);
        Ok((account, opening))
    }

    /// Sets the absolute quantity, inferring the movement kind from the
    /// direction of the change. Setting the current value is a no-op for
    /// the ledger and returns `Ok(None)`.
    pub fn set_quantity(
        &mut self,
        new_quantity: i32,
        actor_id: Uuid,
    ) -> Result<Option<stock_movement::Model>, ServiceError> {
        self.apply_quantity(new_quantity, None, None, actor_id)
    }

    /// Sets the absolute quantity with a caller-supplied movement kind.
    /// Used by the transfer debit/credit paths, where the direction is
    /// already known.
    pub fn set_quantity_with_kind(
        &mut self,
        new_quantity: i32,
        kind: MovementKind,
        notes: Option<String>,
        actor_id: Uuid,
    ) -> Result<Option<stock_movement::Model>, ServiceError> {
        self.apply_quantity(new_quantity, Some(kind), notes, actor_id)
    }

    /// Replaces quantity, reorder level, and ceiling as one logical
    /// operation. The new quantity is validated against the new ceiling, so
    /// the invariants hold together or the account is left untouched.
    pub fn update_levels(
        &mut self,
        quantity_on_hand: i32,
        reorder_level: i32,
        max_level: i32,
        actor_id: Uuid,
    ) -> Result<Option<stock_movement::Model>, ServiceError> {
        if self.deleted_at.is_some() {
            return Err(ServiceError::InvariantViolation(format!(
                "Inventory account {} is deleted",
                self.id
            )));
        }
        check_levels(quantity_on_hand, reorder_level, max_level)?;

        self.reorder_level = reorder_level;
        self.max_level = max_level;
        self.set_quantity(quantity_on_hand, actor_id)
    }

    /// Marks the account deleted. Only an empty account can be deleted, and
    /// deletion produces no movement entry.
    pub fn soft_delete(&mut self) -> Result<(), ServiceError> {
        if self.deleted_at.is_some() {
            return Err(ServiceError::InvariantViolation(format!(
                "Inventory account {} is already deleted",
                self.id
            )));
        }
        if self.quantity_on_hand > 0 {
            return Err(ServiceError::InvariantViolation(format!(
                "Inventory account {} still holds {} units and cannot be deleted",
                self.id, self.quantity_on_hand
            )));
        }
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn apply_quantity(
        &mut self,
        new_quantity: i32,
        kind: Option<MovementKind>,
        notes: Option<String>,
        actor_id: Uuid,
    ) -> Result<Option<stock_movement::Model>, ServiceError> {
        if self.deleted_at.is_some() {
            return Err(ServiceError::InvariantViolation(format!(
                "Inventory account {} is deleted",
                self.id
            )));
        }
        if new_quantity < 0 {
            return Err(ServiceError::InvariantViolation(format!(
                "Quantity cannot be negative (requested {})",
                new_quantity
            )));
        }
        if new_quantity > self.max_level {
            return Err(ServiceError::InvariantViolation(format!(
                "Quantity {} exceeds max level {}",
                new_quantity, self.max_level
            )));
        }

        let delta = new_quantity - self.quantity_on_hand;
        if delta == 0 {
            return Ok(None);
        }
        let kind = kind.unwrap_or(if delta < 0 {
            MovementKind::StockDecreaseAdjustment
        } else {
            MovementKind::StockIncreaseAdjustment
        });

        // Ledger entry first, balance last.
        let entry = self.movement(kind, delta.abs(), notes, actor_id);
        self.quantity_on_hand = new_quantity;
        self.updated_at = entry.created_at;
        Ok(Some(entry))
    }

    fn movement(
        &self,
        kind: MovementKind,
        quantity: i32,
        notes: Option<String>,
        actor_id: Uuid,
    ) -> stock_movement::Model {
        stock_movement::Model {
            id: Uuid::new_v4(),
            product_id: self.product_id,
            account_id: self.id,
            kind,
            quantity,
            status: MovementStatus::Completed,
            notes,
            created_by: actor_id,
            created_at: Utc::now(),
        }
    }
}

fn check_levels(quantity_on_hand: i32, reorder_level: i32, max_level: i32) -> Result<(), ServiceError> {
    if quantity_on_hand < 0 {
        return Err(ServiceError::InvariantViolation(format!(
            "Quantity cannot be negative (requested {})",
            quantity_on_hand
        )));
    }
    if max_level < quantity_on_hand {
        return Err(ServiceError::InvariantViolation(format!(
            "Quantity {} exceeds max level {}",
            quantity_on_hand, max_level
        )));
    }
    if max_level < reorder_level {
        return Err(ServiceError::InvariantViolation(format!(
            "Reorder level {} exceeds max level {}",
            reorder_level, max_level
        )));
    }
    Ok(())
}
