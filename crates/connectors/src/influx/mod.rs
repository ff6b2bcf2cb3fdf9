pub mod client;
pub mod decoder;

pub use client::{InfluxConnection, InfluxSource};
pub use decoder::AnnotatedCsvDecoder;
