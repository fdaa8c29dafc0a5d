//! Business rule scenarios compiled once and executed against several
//! contexts.

mod common;

use cel_engine::Value;
use common::{assert_compiles, context, init_tracing};
use rstest::rstest;
use serde_json::json;

const CART_RULE: &str = r#"has(cart.items) && cart.items.exists(item, item.productId == "prod_123" && item.quantity >= 1)"#;

#[rstest]
#[case::single_match(json!([{"productId": "prod_123", "quantity": 2}]), true)]
#[case::match_among_others(
    json!([
        {"productId": "prod_456", "quantity": 1},
        {"productId": "prod_123", "quantity": 1},
        {"productId": "prod_789", "quantity": 3},
    ]),
    true
)]
#[case::zero_quantity(json!([{"productId": "prod_123", "quantity": 0}]), false)]
#[case::other_product(json!([{"productId": "prod_456", "quantity": 2}]), false)]
#[case::empty_cart(json!([]), false)]
fn cart_validation(#[case] items: serde_json::Value, #[case] expected: bool) {
    init_tracing();
    let program = assert_compiles(CART_RULE);
    let result = program.execute(&context(json!({"cart": {"items": items}})));
    assert_eq!(result, Ok(Value::Bool(expected)));
}

#[test]
fn cart_without_items_is_rejected_by_has() {
    let program = assert_compiles(CART_RULE);
    let result = program.execute(&context(json!({"cart": {}})));
    assert_eq!(result, Ok(Value::Bool(false)));
}

const PREMIUM_DISCOUNT: &str = "
    // Calculate total package cost
    double(reservation.flight.price) +
    double(reservation.hotel.nightlyRate) * int(reservation.hotel.nights) +
    double(reservation.car.dailyRate) * int(reservation.car.days) >= 2000.0 &&
    // Check loyalty tier
    reservation.customer.loyaltyTier in ['GOLD', 'PLATINUM'] &&
    // Summer months, 0-based: 5=June, 6=July, 7=August
    timestamp(reservation.bookingDate).getMonth() in [5, 6, 7]
";

#[rstest]
#[case::summer("2025-07-15T00:00:00Z", true)]
#[case::winter("2025-12-15T00:00:00Z", false)]
fn premium_discount(#[case] booking_date: &str, #[case] expected: bool) {
    let program = assert_compiles(PREMIUM_DISCOUNT);
    let reservation = json!({
        "reservation": {
            "flight": {"price": 1000.0},
            "hotel": {"nightlyRate": 200.0, "nights": 4},
            "car": {"dailyRate": 100.0, "days": 4},
            "customer": {"loyaltyTier": "PLATINUM"},
            "bookingDate": booking_date,
        }
    });
    assert_eq!(program.execute(&context(reservation)), Ok(Value::Bool(expected)));
}

const BOOKING_VALIDATION: &str = r#"
    has(reservation.flight) &&
    timestamp(reservation.flight.departureTime) < timestamp(reservation.hotel.checkIn) &&
    timestamp(reservation.hotel.checkIn) < timestamp(reservation.hotel.checkOut) &&
    (timestamp(reservation.hotel.checkOut) - timestamp(reservation.hotel.checkIn)) > duration("1h") &&
    timestamp(reservation.hotel.checkOut) < timestamp(reservation.flight.returnTime) &&
    (reservation.car.pickupLocation == reservation.flight.arrivalAirport ||
     reservation.car.pickupLocation == reservation.hotel.address.city) &&
    size(reservation.travelers) <= reservation.hotel.maxOccupancy &&
    size(reservation.travelers) <= reservation.car.capacity
"#;

#[rstest]
#[case::well_formed("2025-05-01T10:00:00Z", true)]
#[case::departs_after_check_in("2025-05-01T16:00:00Z", false)]
fn booking_validation(#[case] departure: &str, #[case] expected: bool) {
    let program = assert_compiles(BOOKING_VALIDATION);
    let reservation = json!({
        "reservation": {
            "flight": {
                "departureTime": departure,
                "returnTime": "2025-05-05T15:00:00Z",
                "arrivalAirport": "LAX",
            },
            "hotel": {
                "checkIn": "2025-05-01T15:00:00Z",
                "checkOut": "2025-05-05T11:00:00Z",
                "maxOccupancy": 4,
                "address": {"city": "Los Angeles"},
            },
            "car": {"pickupLocation": "LAX", "capacity": 5},
            "travelers": ["person1", "person2", "person3"],
        }
    });
    assert_eq!(program.execute(&context(reservation)), Ok(Value::Bool(expected)));
}

const ROOM_UPGRADE: &str = "
    reservation.customer.loyaltyTier in ['GOLD', 'PLATINUM'] &&
    reservation.hotel.nights >= 3 &&
    reservation.hotel.occupancyRate < 0.80 &&
    !(reservation.specialOffers.exists(o, o.type == 'ROOM_UPGRADE')) &&
    reservation.totalSpend > 5000.0 &&
    [reservation.flight.class, reservation.hotel.roomType].all(t, t != 'ECONOMY')
";

#[rstest]
#[case::eligible(0.7, json!([]), true)]
#[case::occupancy_too_high(0.85, json!([]), false)]
#[case::already_offered(0.7, json!([{"type": "ROOM_UPGRADE"}]), false)]
fn room_upgrade(
    #[case] occupancy: f64,
    #[case] offers: serde_json::Value,
    #[case] expected: bool,
) {
    let program = assert_compiles(ROOM_UPGRADE);
    let reservation = json!({
        "reservation": {
            "customer": {"loyaltyTier": "PLATINUM"},
            "hotel": {"nights": 4, "occupancyRate": occupancy, "roomType": "DELUXE"},
            "flight": {"class": "BUSINESS"},
            "specialOffers": offers,
            "totalSpend": 6000.0,
        }
    });
    assert_eq!(program.execute(&context(reservation)), Ok(Value::Bool(expected)));
}

#[test]
fn pricing_over_many_items() {
    let program = assert_compiles("items.map(i, i.price).filter(p, p < max_price).size() > 0");
    let items: Vec<_> = (0..100).map(|i| json!({"id": i, "price": i * 10})).collect();
    let ctx = context(json!({"items": items, "max_price": 500}));
    assert_eq!(program.execute(&ctx), Ok(Value::Bool(true)));

    let count = assert_compiles("items.filter(i, i.price < max_price).size()");
    assert_eq!(count.execute(&ctx), Ok(Value::Int(50)));
}
