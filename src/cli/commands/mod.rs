pub mod migrate;
pub mod plans;
pub mod token;
