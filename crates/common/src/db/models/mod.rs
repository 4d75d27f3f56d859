//! SeaORM entity models
//!
//! Database entities for Colonia

mod documents;
mod project;
mod station_requirement;
mod system;

pub use documents::{Commodities, Progress};

pub use system::{
    Entity as SystemEntity,
    Model as System,
    ActiveModel as SystemActiveModel,
    Column as SystemColumn,
};

pub use station_requirement::{
    Entity as StationRequirementEntity,
    Model as StationRequirement,
    ActiveModel as StationRequirementActiveModel,
    Column as StationRequirementColumn,
};

pub use project::{
    Entity as ProjectEntity,
    Model as Project,
    ActiveModel as ProjectActiveModel,
    Column as ProjectColumn,
};
