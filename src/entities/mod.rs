pub mod being;
pub mod effects;
pub mod entity;
pub mod inventory;
pub mod item;
pub mod stats;
