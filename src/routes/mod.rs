pub mod booking_route;
pub mod company_route;
pub mod coupon_route;
pub mod payment_route;
pub mod performance_route;
pub mod user_route;
pub mod venue_route;
