pub mod connect;
pub mod destination;
pub mod insert;

pub use destination::PgDestination;
pub use insert::TableTarget;
