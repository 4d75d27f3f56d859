//! Construction project entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::documents::Progress;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub system_id: i32,

    pub station_requirement_id: Option<i32>,

    /// Remaining quantity per commodity
    #[sea_orm(column_type = "JsonBinary")]
    pub progress: Progress,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::system::Entity",
        from = "Column::SystemId",
        to = "super::system::Column::Id"
    )]
    System,

    #[sea_orm(
        belongs_to = "super::station_requirement::Entity",
        from = "Column::StationRequirementId",
        to = "super::station_requirement::Column::Id"
    )]
    StationRequirement,
}

impl Related<super::system::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::System.def()
    }
}

impl Related<super::station_requirement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StationRequirement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
