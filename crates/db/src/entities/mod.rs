//! Database entities.

pub mod infraction;

pub use infraction::Entity as Infraction;
