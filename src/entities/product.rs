use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product catalog row. The inventory core consults it only at account
/// creation time, to check that the referenced product is active.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_account::Entity")]
    InventoryAccounts,
}

impl Related<super::inventory_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
