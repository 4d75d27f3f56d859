//! Station requirement entity
//!
//! One row per 6-level classification path. The path is unique; the bill of
//! materials lives in a JSON column and is replaced wholesale on refresh.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::documents::Commodities;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "station_requirements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub tier: String,

    #[sea_orm(column_type = "Text")]
    pub location: String,

    #[sea_orm(column_type = "Text")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub listed_type: String,

    #[sea_orm(column_type = "Text")]
    pub building_type: String,

    #[sea_orm(column_type = "Text")]
    pub layout: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub commodities: Commodities,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project::Entity")]
    Projects,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
