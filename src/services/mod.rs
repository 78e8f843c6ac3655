pub mod booking_service;
pub mod company_service;
pub mod coupon_service;
pub mod payment_gateway;
pub mod payment_service;
pub mod performance_service;
pub mod pricing;
pub mod reservation_service;
pub mod user_service;
pub mod venue_service;
