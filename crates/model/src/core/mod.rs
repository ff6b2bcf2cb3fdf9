pub mod dimension;
pub mod value;
