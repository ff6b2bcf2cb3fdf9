pub mod accumulator;
pub mod coordinator;
pub mod error;
pub mod mapper;
pub mod writer;

#[cfg(test)]
mod tests;
