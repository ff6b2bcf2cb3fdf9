pub mod mocks;

mod properties;
