use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Lifecycle of a transfer record.
///
/// `Pending` is the initial state. `Completed`, `Cancelled`, `Rejected`,
/// and `Failed` are terminal; a transfer that ends in one of them is never
/// reopened — a new record is created instead.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransferStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "InTransit")]
    InTransit,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
    #[sea_orm(string_value = "Failed")]
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed
                | TransferStatus::Cancelled
                | TransferStatus::Rejected
                | TransferStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "Pending",
            TransferStatus::Approved => "Approved",
            TransferStatus::InTransit => "InTransit",
            TransferStatus::Completed => "Completed",
            TransferStatus::Cancelled => "Cancelled",
            TransferStatus::Rejected => "Rejected",
            TransferStatus::Failed => "Failed",
        }
    }
}

/// One planned movement of quantity between two locations. `quantity` is
/// fixed at creation; status transitions are the only permitted mutation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub quantity: i32,
    pub status: TransferStatus,
    pub created_by: Uuid,
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
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a transfer record in `Pending` status.
    pub fn new(
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        quantity: i32,
        created_by: Uuid,
    ) -> Result<Self, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvariantViolation(format!(
                "Transfer quantity must be positive (requested {})",
                quantity
            )));
        }
        if from_location_id == to_location_id {
            return Err(ServiceError::InvariantViolation(
                "Cannot transfer stock to the same location".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            from_location_id,
            to_location_id,
            quantity,
            status: TransferStatus::Pending,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn approve(&mut self) -> Result<(), ServiceError> {
        self.transition(TransferStatus::Pending, TransferStatus::Approved, "approve")
    }

    pub fn cancel(&mut self) -> Result<(), ServiceError> {
        self.transition(TransferStatus::Pending, TransferStatus::Cancelled, "cancel")
    }

    pub fn reject(&mut self) -> Result<(), ServiceError> {
        self.transition(TransferStatus::Pending, TransferStatus::Rejected, "reject")
    }

    pub fn mark_in_transit(&mut self) -> Result<(), ServiceError> {
        self.transition(
            TransferStatus::Approved,
            TransferStatus::InTransit,
            "mark in transit",
        )
    }

    pub fn complete(&mut self) -> Result<(), ServiceError> {
        self.transition(
            TransferStatus::InTransit,
            TransferStatus::Completed,
            "complete",
        )
    }

    pub fn fail(&mut self) -> Result<(), ServiceError> {
        self.transition(TransferStatus::InTransit, TransferStatus::Failed, "fail")
    }

    fn transition(
        &mut self,
        expected: TransferStatus,
        next: TransferStatus,
        operation: &str,
    ) -> Result<(), ServiceError> {
        if self.status != expected {
            return Err(ServiceError::InvalidStateTransition(format!(
                "Cannot {} transfer {} in status {}",
                operation,
                self.id,
                self.status.as_str()
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn pending_transfer() -> Model {
        Model::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            20,
            Uuid::new_v4(),
        )
        .expect("transfer creation failed")
    }

    #[test]
    fn creation_requires_positive_quantity() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        assert_matches!(
            Model::new(Uuid::new_v4(), from, to, 0, Uuid::new_v4()),
            Err(ServiceError::InvariantViolation(_))
        );
        assert_matches!(
            Model::new(Uuid::new_v4(), from, to, -5, Uuid::new_v4()),
            Err(ServiceError::InvariantViolation(_))
        );
    }

    #[test]
    fn creation_rejects_same_location() {
        let location = Uuid::new_v4();
        assert_matches!(
            Model::new(Uuid::new_v4(), location, location, 10, Uuid::new_v4()),
            Err(ServiceError::InvariantViolation(_))
        );
    }

    #[test]
    fn happy_path_runs_to_completed() {
        let mut transfer = pending_transfer();
        transfer.approve().unwrap();
        assert_eq!(transfer.status, TransferStatus::Approved);
        transfer.mark_in_transit().unwrap();
        assert_eq!(transfer.status, TransferStatus::InTransit);
        transfer.complete().unwrap();
        assert_eq!(transfer.status, TransferStatus::Completed);
        assert!(transfer.status.is_terminal());
    }

    #[test]
    fn pending_can_be_cancelled_or_rejected() {
        let mut transfer = pending_transfer();
        transfer.cancel().unwrap();
        assert_eq!(transfer.status, TransferStatus::Cancelled);

        let mut transfer = pending_transfer();
        transfer.reject().unwrap();
        assert_eq!(transfer.status, TransferStatus::Rejected);
    }

    #[test]
    fn in_transit_can_fail() {
        let mut transfer = pending_transfer();
        transfer.approve().unwrap();
        transfer.mark_in_transit().unwrap();
        transfer.fail().unwrap();
        assert_eq!(transfer.status, TransferStatus::Failed);
    }

    #[test]
    fn completed_transfer_accepts_no_further_transitions() {
        let mut transfer = pending_transfer();
        transfer.approve().unwrap();
        transfer.mark_in_transit().unwrap();
        transfer.complete().unwrap();

        assert_matches!(
            transfer.approve(),
            Err(ServiceError::InvalidStateTransition(_))
        );
        assert_eq!(transfer.status, TransferStatus::Completed);
    }

    #[test]
    fn out_of_order_operations_are_rejected() {
        let mut transfer = pending_transfer();
        assert_matches!(
            transfer.mark_in_transit(),
            Err(ServiceError::InvalidStateTransition(_))
        );
        assert_matches!(
            transfer.complete(),
            Err(ServiceError::InvalidStateTransition(_))
        );
        assert_matches!(transfer.fail(), Err(ServiceError::InvalidStateTransition(_)));
        assert_eq!(transfer.status, TransferStatus::Pending);

        transfer.approve().unwrap();
        assert_matches!(
            transfer.cancel(),
            Err(ServiceError::InvalidStateTransition(_))
        );
        assert_matches!(
            transfer.reject(),
            Err(ServiceError::InvalidStateTransition(_))
        );
    }
}
