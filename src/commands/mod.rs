pub mod call;
pub mod error;
