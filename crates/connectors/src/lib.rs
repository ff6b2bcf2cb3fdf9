pub mod destination;
pub mod discard;
pub mod error;
pub mod influx;
pub mod postgres;
pub mod source;
