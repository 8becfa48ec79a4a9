use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The reason a quantity changed. The sign of the change is implied by the
/// kind; `quantity` on the row is always a positive magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum MovementKind {
    #[sea_orm(string_value = "InitialStock")]
    InitialStock,
    #[sea_orm(string_value = "StockIncreaseAdjustment")]
    StockIncreaseAdjustment,
    #[sea_orm(string_value = "StockDecreaseAdjustment")]
    StockDecreaseAdjustment,
    #[sea_orm(string_value = "TransferOut")]
    TransferOut,
    #[sea_orm(string_value = "TransferIn")]
    TransferIn,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::InitialStock => "InitialStock",
            MovementKind::StockIncreaseAdjustment => "StockIncreaseAdjustment",
            MovementKind::StockDecreaseAdjustment => "StockDecreaseAdjustment",
            MovementKind::TransferOut => "TransferOut",
            MovementKind::TransferIn => "TransferIn",
        }
    }
}

/// Movement entries are written only once they are finalized, so the only
/// status this core produces is `Completed`. A single constructor path, not
/// a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementStatus {
    #[sea_orm(string_value = "Completed")]
    Completed,
}

/// One immutable, append-only record of a quantity change. Produced
/// exclusively as a side effect of inventory account operations and
/// read-only thereafter.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub account_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub status: MovementStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_account::Entity",
        from = "Column::AccountId",
        to = "super::inventory_account::Column::Id"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::inventory_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
