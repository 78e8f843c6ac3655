use async_trait::async_trait;
use chrono::{Duration, Utc};
use ctor::dtor;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use std::sync::Arc;
use test_context::{test_context, AsyncTestContext};
use ticket_booking_system::{
    models::{
        booking::HoldSeatsRequest,
        coupon::{CouponValidationRequest, DiscountType, SeatCouponRequest},
        payment::{
            PaymentCompleteRequest, PaymentConfirmation, PaymentOrder, PaymentPrepareRequest,
            ReservationStatus,
        },
    },
    services::{
        booking_service::BookingService,
        coupon_service::CouponService,
        payment_gateway::{MockPaymentGateway, PaymentGateway},
        payment_service::PaymentService,
        performance_service::PerformanceService,
        reservation_service::ReservationService,
        user_service::UserService,
        venue_service::VenueService,
    },
    utils::error::AppError,
};

mod common {
    pub mod test_utils;
}
use common::test_utils::{
    auth_config, booking_config, coupon_request, register_user, schedule_seat_ids, seed_show,
    Show, TestDb,
};

struct BookingContext {
    pool: Pool,
    gateway: Arc<MockPaymentGateway>,
    user_service: UserService,
    venue_service: VenueService,
    booking_service: BookingService,
    coupon_service: CouponService,
    payment_service: PaymentService,
    reservation_service: ReservationService,
}

#[dtor]
fn cleanup() {
    if let Err(e) = TestDb::cleanup_database_sync() {
        eprintln!("Failed to cleanup test database: {}", e);
    }
}

#[async_trait]
impl AsyncTestContext for BookingContext {
    async fn setup() -> Self {
        let pool = TestDb::get_instance()
            .await
            .expect("Failed to get test database instance");

        let gateway = MockPaymentGateway::shared();
        let dyn_gateway: Arc<dyn PaymentGateway> = gateway.clone();

        BookingContext {
            user_service: UserService::new(pool.clone(), auth_config()),
            venue_service: VenueService::new(pool.clone()),
            booking_service: BookingService::new(pool.clone(), booking_config()),
            coupon_service: CouponService::new(pool.clone(), booking_config()),
            payment_service: PaymentService::new(
                pool.clone(),
                dyn_gateway.clone(),
                booking_config(),
                auth_config(),
            ),
            reservation_service: ReservationService::new(pool.clone(), dyn_gateway),
            gateway,
            pool,
        }
    }

    async fn teardown(self) {
        let _ = sqlx::query("SELECT 1").execute(&self.pool).await;
    }
}

impl BookingContext {
    async fn hold(&self, user_id: i32, show: &Show, seat_ids: &[i32]) -> Result<(), AppError> {
        self.booking_service
            .hold_seats(
                user_id,
                HoldSeatsRequest {
                    schedule_id: show.schedule_id,
                    seat_ids: seat_ids.to_vec(),
                },
            )
            .await?;
        Ok(())
    }

    async fn prepare(&self, user_id: i32, show: &Show, seats: Vec<SeatCouponRequest>) -> Result<PaymentOrder, AppError> {
        self.payment_service
            .prepare_payment(
                user_id,
                PaymentPrepareRequest {
                    schedule_id: show.schedule_id,
                    seats,
                },
            )
            .await
    }

    async fn complete(&self, user_id: i32, order: &PaymentOrder, payment_key: Option<&str>) -> Result<PaymentConfirmation, AppError> {
        self.payment_service
            .complete_payment(
                user_id,
                PaymentCompleteRequest {
                    merchant_uid: order.merchant_uid.clone(),
                    payment_key: payment_key.map(str::to_string),
                },
            )
            .await
    }

    // push a hold past its expiry without waiting for the hold window
    async fn expire_hold(&self, show: &Show, seat_id: i32) {
        sqlx::query("UPDATE schedule_seat SET held_until = ? WHERE schedule_id = ? AND seat_id = ?")
            .bind(Utc::now().naive_utc() - Duration::minutes(1))
            .bind(show.schedule_id)
            .bind(seat_id)
            .execute(&self.pool)
            .await
            .expect("Failed to expire hold");
    }

    async fn is_available(&self, show: &Show, seat_id: i32) -> Result<bool, AppError> {
        let chart = self.venue_service.seating_chart(show.schedule_id).await?;
        Ok(chart
            .seats
            .iter()
            .find(|seat| seat.seat_id == seat_id)
            .map(|seat| seat.available)
            .unwrap_or(false))
    }
}

fn plain(seat_ids: &[i32]) -> Vec<SeatCouponRequest> {
    seat_ids
        .iter()
        .map(|&seat_id| SeatCouponRequest {
            seat_id,
            coupon_id: None,
        })
        .collect()
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_hold_marks_seats_unavailable(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Hold Test").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    assert_eq!(seats.len(), 8);

    let user_id = register_user(&ctx.user_service, "holder").await;
    let selection = ctx
        .booking_service
        .hold_seats(
            user_id,
            HoldSeatsRequest {
                schedule_id: show.schedule_id,
                seat_ids: vec![seats[0], seats[4]],
            },
        )
        .await?;

    assert_eq!(selection.seats.len(), 2);
    assert_eq!(selection.total_price, Decimal::from(240_000));
    assert!(selection.held_until.is_some());

    let chart = ctx.venue_service.seating_chart(show.schedule_id).await?;
    assert_eq!(chart.available_count, 6);
    assert!(!ctx.is_available(&show, seats[0]).await?);
    assert!(ctx.is_available(&show, seats[1]).await?);

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_seat_held_by_another_user_conflicts(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Conflict Test").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;

    let first = register_user(&ctx.user_service, "first").await;
    let second = register_user(&ctx.user_service, "second").await;

    ctx.hold(first, &show, &[seats[0]]).await?;
    let result = ctx.hold(second, &show, &[seats[0], seats[1]]).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // the failed attempt must not leave a partial hold behind
    let selection = ctx.booking_service.get_selection(second, show.schedule_id).await?;
    assert!(selection.seats.is_empty());
    assert!(ctx.is_available(&show, seats[1]).await?);

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_new_hold_replaces_selection(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Replace Test").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "replacer").await;

    ctx.hold(user_id, &show, &[seats[0], seats[1]]).await?;
    ctx.hold(user_id, &show, &[seats[5]]).await?;

    let selection = ctx.booking_service.get_selection(user_id, show.schedule_id).await?;
    let held: Vec<i32> = selection.seats.iter().map(|s| s.seat_id).collect();
    assert_eq!(held, vec![seats[5]]);
    assert!(ctx.is_available(&show, seats[0]).await?);

    let released = ctx
        .booking_service
        .release_selection(user_id, show.schedule_id)
        .await?;
    assert_eq!(released, 1);
    assert!(ctx.is_available(&show, seats[5]).await?);

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_hold_rejects_too_many_or_duplicate_seats(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Limit Test").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "greedy").await;

    let too_many = ctx.hold(user_id, &show, &seats[..5]).await;
    assert!(matches!(too_many, Err(AppError::ValidationError(_))));

    let duplicates = ctx.hold(user_id, &show, &[seats[0], seats[0]]).await;
    assert!(matches!(duplicates, Err(AppError::ValidationError(_))));

    let unknown = ctx.hold(user_id, &show, &[-1]).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_quote_requires_held_seats(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Quote Test").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "quoter").await;

    let result = ctx
        .coupon_service
        .validate_coupons(
            user_id,
            CouponValidationRequest {
                schedule_id: show.schedule_id,
                seats: plain(&[seats[0]]),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_coupon_rules_in_quote(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Coupon Rules").await;
    let other = seed_show(&ctx.pool, "Other Show").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "couponer").await;
    ctx.hold(user_id, &show, &[seats[0], seats[1]]).await?;

    let mut percent = coupon_request(DiscountType::Percent, 15);
    percent.max_discount = Some(Decimal::from(20_000));
    let percent = ctx.coupon_service.create_coupon(percent).await?;

    let quote = ctx
        .coupon_service
        .validate_coupons(
            user_id,
            CouponValidationRequest {
                schedule_id: show.schedule_id,
                seats: vec![
                    SeatCouponRequest {
                        seat_id: seats[0],
                        coupon_id: Some(percent.id),
                    },
                    SeatCouponRequest {
                        seat_id: seats[1],
                        coupon_id: None,
                    },
                ],
            },
        )
        .await?;
    // 15% of 150000 is 22500, capped at 20000
    assert_eq!(quote.total_price, Decimal::from(300_000));
    assert_eq!(quote.discount_amount, Decimal::from(20_000));
    assert_eq!(quote.final_price, Decimal::from(280_000));

    // one coupon cannot cover two seats
    let reused = ctx
        .coupon_service
        .validate_coupons(
            user_id,
            CouponValidationRequest {
                schedule_id: show.schedule_id,
                seats: vec![
                    SeatCouponRequest {
                        seat_id: seats[0],
                        coupon_id: Some(percent.id),
                    },
                    SeatCouponRequest {
                        seat_id: seats[1],
                        coupon_id: Some(percent.id),
                    },
                ],
            },
        )
        .await;
    assert!(matches!(reused, Err(AppError::Unprocessable(_))));

    let mut scoped = coupon_request(DiscountType::Fixed, 5_000);
    scoped.performance_id = Some(other.performance_id);
    let scoped = ctx.coupon_service.create_coupon(scoped).await?;
    let wrong_show = ctx
        .coupon_service
        .validate_coupons(
            user_id,
            CouponValidationRequest {
                schedule_id: show.schedule_id,
                seats: vec![SeatCouponRequest {
                    seat_id: seats[0],
                    coupon_id: Some(scoped.id),
                }],
            },
        )
        .await;
    assert!(matches!(wrong_show, Err(AppError::Unprocessable(_))));

    let inactive = ctx
        .coupon_service
        .create_coupon(coupon_request(DiscountType::Fixed, 1_000))
        .await?;
    ctx.coupon_service.deactivate_coupon(inactive.id).await?;
    let deactivated = ctx
        .coupon_service
        .validate_coupons(
            user_id,
            CouponValidationRequest {
                schedule_id: show.schedule_id,
                seats: vec![SeatCouponRequest {
                    seat_id: seats[0],
                    coupon_id: Some(inactive.id),
                }],
            },
        )
        .await;
    assert!(matches!(deactivated, Err(AppError::Unprocessable(_))));

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_full_payment_flow_with_coupon(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Payment Flow").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "payer").await;
    ctx.hold(user_id, &show, &[seats[0], seats[1]]).await?;

    let coupon = ctx
        .coupon_service
        .create_coupon(coupon_request(DiscountType::Fixed, 10_000))
        .await?;

    let order = ctx
        .payment_service
        .prepare_payment(
            user_id,
            PaymentPrepareRequest {
                schedule_id: show.schedule_id,
                seats: vec![
                    SeatCouponRequest {
                        seat_id: seats[0],
                        coupon_id: Some(coupon.id),
                    },
                    SeatCouponRequest {
                        seat_id: seats[1],
                        coupon_id: None,
                    },
                ],
            },
        )
        .await?;
    assert_eq!(order.amount, Decimal::from(290_000));
    assert_eq!(order.order_name, "Payment Flow x2");
    assert!(order.merchant_uid.starts_with("order_"));

    let confirmation = ctx
        .payment_service
        .complete_payment(
            user_id,
            PaymentCompleteRequest {
                merchant_uid: order.merchant_uid.clone(),
                payment_key: Some("pay_flow_1".to_string()),
            },
        )
        .await?;
    assert_eq!(confirmation.status, ReservationStatus::Paid);
    assert_eq!(confirmation.tickets.len(), 2);
    assert_eq!(confirmation.total_price, Decimal::from(300_000));
    assert_eq!(confirmation.discount_amount, Decimal::from(10_000));
    assert_eq!(confirmation.final_price, Decimal::from(290_000));
    assert_eq!(confirmation.performance_title, "Payment Flow");
    assert!(confirmation.paid_at.is_some());

    // seats are sold and the coupon is spent
    assert!(!ctx.is_available(&show, seats[0]).await?);
    let selection = ctx.booking_service.get_selection(user_id, show.schedule_id).await?;
    assert!(selection.seats.is_empty());
    let available = ctx
        .coupon_service
        .available_coupons(user_id, Some(show.performance_id))
        .await?;
    assert!(available.iter().all(|c| c.id != coupon.id));

    // completing again with the same key returns the same confirmation
    let again = ctx
        .payment_service
        .complete_payment(
            user_id,
            PaymentCompleteRequest {
                merchant_uid: order.merchant_uid.clone(),
                payment_key: Some("pay_flow_1".to_string()),
            },
        )
        .await?;
    assert_eq!(again.reservation_id, confirmation.reservation_id);

    let mine = ctx.reservation_service.my_reservations(user_id).await?;
    assert_eq!(mine.len(), 1);

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_amount_mismatch_fails_and_refunds(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Mismatch").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "mismatch").await;
    ctx.hold(user_id, &show, &[seats[4]]).await?;

    let order = ctx
        .payment_service
        .prepare_payment(
            user_id,
            PaymentPrepareRequest {
                schedule_id: show.schedule_id,
                seats: plain(&[seats[4]]),
            },
        )
        .await?;
    assert_eq!(order.amount, Decimal::from(90_000));

    ctx.gateway
        .set_paid_amount(&order.merchant_uid, Decimal::from(100))
        .await;

    let result = ctx
        .payment_service
        .complete_payment(
            user_id,
            PaymentCompleteRequest {
                merchant_uid: order.merchant_uid.clone(),
                payment_key: Some("pay_tampered".to_string()),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::PaymentError(_))));

    let reservation = ctx
        .reservation_service
        .get_reservation(user_id, order.reservation_id)
        .await?;
    assert_eq!(reservation.status(), ReservationStatus::Failed);
    assert!(ctx
        .gateway
        .cancelled_keys()
        .await
        .contains(&"pay_tampered".to_string()));
    assert!(reservation.paid_at.is_none());

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_declined_payment_fails_reservation(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Declined").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "declined").await;
    ctx.hold(user_id, &show, &[seats[5]]).await?;

    let order = ctx
        .payment_service
        .prepare_payment(
            user_id,
            PaymentPrepareRequest {
                schedule_id: show.schedule_id,
                seats: plain(&[seats[5]]),
            },
        )
        .await?;
    ctx.gateway.decline(&order.merchant_uid, "card expired").await;

    let result = ctx
        .payment_service
        .complete_payment(
            user_id,
            PaymentCompleteRequest {
                merchant_uid: order.merchant_uid,
                payment_key: Some("pay_declined".to_string()),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::PaymentError(_))));

    let reservation = ctx
        .reservation_service
        .get_reservation(user_id, order.reservation_id)
        .await?;
    assert_eq!(reservation.status(), ReservationStatus::Failed);

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_cancel_paid_reservation_frees_seats(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Cancellation").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "canceller").await;
    ctx.hold(user_id, &show, &[seats[6]]).await?;

    let order = ctx
        .payment_service
        .prepare_payment(
            user_id,
            PaymentPrepareRequest {
                schedule_id: show.schedule_id,
                seats: plain(&[seats[6]]),
            },
        )
        .await?;
    ctx.payment_service
        .complete_payment(
            user_id,
            PaymentCompleteRequest {
                merchant_uid: order.merchant_uid,
                payment_key: Some("pay_cancel_me".to_string()),
            },
        )
        .await?;
    assert!(!ctx.is_available(&show, seats[6]).await?);

    let cancelled = ctx
        .reservation_service
        .cancel(user_id, order.reservation_id)
        .await?;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert!(ctx.is_available(&show, seats[6]).await?);
    assert!(ctx
        .gateway
        .cancelled_keys()
        .await
        .contains(&"pay_cancel_me".to_string()));

    let again = ctx
        .reservation_service
        .cancel(user_id, order.reservation_id)
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_other_users_reservation_not_found(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Privacy").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let owner = register_user(&ctx.user_service, "owner").await;
    let stranger = register_user(&ctx.user_service, "stranger").await;
    ctx.hold(owner, &show, &[seats[7]]).await?;

    let order = ctx
        .payment_service
        .prepare_payment(
            owner,
            PaymentPrepareRequest {
                schedule_id: show.schedule_id,
                seats: plain(&[seats[7]]),
            },
        )
        .await?;

    let peek = ctx
        .reservation_service
        .get_confirmation(stranger, order.reservation_id)
        .await;
    assert!(matches!(peek, Err(AppError::NotFound(_))));

    let hijack = ctx
        .payment_service
        .complete_payment(
            stranger,
            PaymentCompleteRequest {
                merchant_uid: order.merchant_uid,
                payment_key: Some("pay_hijack".to_string()),
            },
        )
        .await;
    assert!(matches!(hijack, Err(AppError::NotFound(_))));

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_zero_amount_order_completes_without_gateway(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Free Ticket").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "freebie").await;
    ctx.hold(user_id, &show, &[seats[0]]).await?;

    let coupon = ctx
        .coupon_service
        .create_coupon(coupon_request(DiscountType::Fixed, 200_000))
        .await?;
    let order = ctx
        .prepare(
            user_id,
            &show,
            vec![SeatCouponRequest {
                seat_id: seats[0],
                coupon_id: Some(coupon.id),
            }],
        )
        .await?;
    assert_eq!(order.amount, Decimal::ZERO);

    let confirmation = ctx.complete(user_id, &order, None).await?;
    assert_eq!(confirmation.status, ReservationStatus::Paid);
    assert_eq!(confirmation.discount_amount, Decimal::from(150_000));
    assert_eq!(confirmation.final_price, Decimal::ZERO);
    assert!(!ctx.is_available(&show, seats[0]).await?);
    assert!(ctx.gateway.cancelled_keys().await.is_empty());

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_cancel_pending_reservation_releases_holds(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Pending Cancel").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "undecided").await;
    ctx.hold(user_id, &show, &[seats[1], seats[5]]).await?;

    let order = ctx.prepare(user_id, &show, plain(&[seats[1], seats[5]])).await?;
    assert!(!ctx.is_available(&show, seats[1]).await?);

    let cancelled = ctx
        .reservation_service
        .cancel(user_id, order.reservation_id)
        .await?;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert!(ctx.is_available(&show, seats[1]).await?);
    assert!(ctx.is_available(&show, seats[5]).await?);
    let selection = ctx.booking_service.get_selection(user_id, show.schedule_id).await?;
    assert!(selection.seats.is_empty());
    // nothing was paid, so nothing is refunded
    assert!(ctx.gateway.cancelled_keys().await.is_empty());

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_reservation_blocks_schedule_and_performance_delete(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Undeletable").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "blocker").await;
    ctx.hold(user_id, &show, &[seats[2]]).await?;
    ctx.prepare(user_id, &show, plain(&[seats[2]])).await?;

    let performance_service = PerformanceService::new(ctx.pool.clone());
    let schedule = performance_service.delete_schedule(show.schedule_id).await;
    assert!(matches!(schedule, Err(AppError::Conflict(_))));
    let performance = performance_service
        .delete_performance(show.performance_id)
        .await;
    assert!(matches!(performance, Err(AppError::Conflict(_))));

    // both are still there
    assert_eq!(performance_service.list_schedules(show.performance_id).await?.len(), 1);

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_expired_hold_can_be_taken_by_another_user(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Expiry").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let first = register_user(&ctx.user_service, "slow").await;
    let second = register_user(&ctx.user_service, "quick").await;

    ctx.hold(first, &show, &[seats[3]]).await?;
    let blocked = ctx.hold(second, &show, &[seats[3]]).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    ctx.expire_hold(&show, seats[3]).await;
    assert!(ctx.is_available(&show, seats[3]).await?);

    ctx.hold(second, &show, &[seats[3]]).await?;
    let taken = ctx.booking_service.get_selection(second, show.schedule_id).await?;
    assert_eq!(taken.seats.len(), 1);
    let lost = ctx.booking_service.get_selection(first, show.schedule_id).await?;
    assert!(lost.seats.is_empty());

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_expired_hold_cannot_be_paid(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Late Payer").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "late").await;
    ctx.hold(user_id, &show, &[seats[4]]).await?;
    ctx.expire_hold(&show, seats[4]).await;

    let result = ctx.prepare(user_id, &show, plain(&[seats[4]])).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // no pending order is left behind
    let mine = ctx.reservation_service.my_reservations(user_id).await?;
    assert!(mine.is_empty());

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_payment_for_replaced_order_is_refunded(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Two Tabs").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "twotabs").await;
    ctx.hold(user_id, &show, &[seats[6]]).await?;

    // the second prepare cancels the first order while its popup is still open
    let first = ctx.prepare(user_id, &show, plain(&[seats[6]])).await?;
    let second = ctx.prepare(user_id, &show, plain(&[seats[6]])).await?;

    let stale = ctx.complete(user_id, &first, Some("pay_stale")).await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));
    assert!(ctx
        .gateway
        .cancelled_keys()
        .await
        .contains(&"pay_stale".to_string()));

    let first_row = ctx
        .reservation_service
        .get_reservation(user_id, first.reservation_id)
        .await?;
    assert_eq!(first_row.status(), ReservationStatus::Cancelled);

    let confirmation = ctx.complete(user_id, &second, Some("pay_current")).await?;
    assert_eq!(confirmation.status, ReservationStatus::Paid);
    assert!(!ctx
        .gateway
        .cancelled_keys()
        .await
        .contains(&"pay_current".to_string()));

    Ok(())
}

#[test_context(BookingContext)]
#[tokio::test]
#[ignore = "requires MySQL (ADMIN_DATABASE_URL)"]
async fn test_payment_key_of_another_order_is_rejected(ctx: &BookingContext) -> Result<(), AppError> {
    let show = seed_show(&ctx.pool, "Reused Key").await;
    let seats = schedule_seat_ids(&ctx.pool, show.schedule_id).await;
    let user_id = register_user(&ctx.user_service, "reuser").await;

    ctx.hold(user_id, &show, &[seats[0]]).await?;
    let paid = ctx.prepare(user_id, &show, plain(&[seats[0]])).await?;
    ctx.complete(user_id, &paid, Some("pay_shared")).await?;

    // same price, so only the order binding tells the payments apart
    ctx.hold(user_id, &show, &[seats[1]]).await?;
    let other = ctx.prepare(user_id, &show, plain(&[seats[1]])).await?;
    assert_eq!(other.amount, paid.amount);

    let reused = ctx.complete(user_id, &other, Some("pay_shared")).await;
    assert!(matches!(reused, Err(AppError::PaymentError(_))));

    let other_row = ctx
        .reservation_service
        .get_reservation(user_id, other.reservation_id)
        .await?;
    assert_eq!(other_row.status(), ReservationStatus::Failed);
    assert!(other_row.payment_key.is_none());
    // the payment still belongs to the first order and is not refunded
    assert!(!ctx
        .gateway
        .cancelled_keys()
        .await
        .contains(&"pay_shared".to_string()));
    let paid_row = ctx
        .reservation_service
        .get_reservation(user_id, paid.reservation_id)
        .await?;
    assert_eq!(paid_row.status(), ReservationStatus::Paid);

    Ok(())
}
