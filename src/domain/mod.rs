pub mod cart;
pub mod clock;
pub mod deal;
pub mod errors;
pub mod order;
pub mod ports;
pub mod pricing;
