//! API handlers module

pub mod catalog;
pub mod health;
pub mod live;
pub mod projects;
pub mod systems;
