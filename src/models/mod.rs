mod course;
mod discount;
mod gateway_config;
mod pending_payment;
mod transaction;

pub use course::*;
pub use discount::*;
pub use gateway_config::*;
pub use pending_payment::*;
pub use transaction::*;
