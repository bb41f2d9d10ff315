pub mod cart_service;
pub mod deal_service;
pub mod order_service;
pub mod sweeper;
