pub mod booking;
pub mod company;
pub mod coupon;
pub mod payment;
pub mod performance;
pub mod user;
pub mod venue;
