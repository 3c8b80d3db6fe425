//! Repositories wrapping entity queries.

pub mod infraction;

pub use infraction::InfractionRepository;
