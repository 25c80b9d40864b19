//! User-facing text. Kept in one place so the surrounding handlers stay
//! readable; the UI layer renders these verbatim.

use crate::models::UserId;
use crate::models::order::{DeliveryScope, Order};
use crate::models::subscription::DriverDetails;

pub fn scope_line(scope: &DeliveryScope) -> String {
    match scope {
        DeliveryScope::IntraCity => "within the city".to_string(),
        DeliveryScope::InterCity { region } => format!("inter-city, to {region}"),
    }
}

/// The dispatch-board post advertising an order, with an optional status note
/// appended after acceptance or completion.
pub fn board_post(order: &Order, customer_name: &str, note: Option<&str>) -> String {
    let mut text = format!(
        "New delivery order\n\
         Customer: {customer_name}\n\
         Vehicle: {vehicle}\n\
         Route ({scope}):\n  from: {pickup}\n  to: {dropoff}\n\
         Time: {when}\n\
         The customer's phone number is not shown in the group.",
        vehicle = order.vehicle,
        scope = scope_line(&order.scope),
        pickup = order.pickup,
        dropoff = order.dropoff,
        when = order.when,
    );
    if let Some(note) = note {
        text.push('\n');
        text.push_str(note);
    }
    text
}

pub fn order_submitted() -> String {
    "Your order has been sent to the drivers. You can cancel it if needed.".to_string()
}

pub fn driver_assigned(order: &Order, customer_name: &str, customer_phone: &str) -> String {
    format!(
        "This order is now yours.\n\n\
         Customer: {customer_name}\n\
         Phone: {customer_phone}\n\
         Vehicle: {vehicle}\n\
         Route:\n  from: {pickup}\n  to: {dropoff}\n\
         Time: {when}",
        vehicle = order.vehicle,
        pickup = order.pickup,
        dropoff = order.dropoff,
        when = order.when,
    )
}

pub fn customer_driver_found(driver_name: &str, driver_phone: &str) -> String {
    format!(
        "A driver accepted your order.\n\nDriver: {driver_name}\nPhone: {driver_phone}"
    )
}

pub fn reminder(label: &str, order: &Order) -> String {
    format!(
        "{label}: order for {when}.\nRoute: {pickup} -> {dropoff}\nDon't forget to coordinate.",
        when = order.when,
        pickup = order.pickup,
        dropoff = order.dropoff,
    )
}

pub fn rating_prompt() -> String {
    "Your order is complete. Please rate the service 1-5:".to_string()
}

pub fn rating_thanks(score: u8) -> String {
    format!("Thank you! Your rating has been recorded: {score}/5.")
}

pub fn rating_audit(customer: UserId, customer_name: &str, score: u8) -> String {
    format!("Customer {customer_name} ({customer}) rated the service {score}/5.")
}

pub fn cancelled_by_customer_to_driver() -> String {
    "The customer cancelled the order.".to_string()
}

pub fn cancelled_by_customer_to_customer() -> String {
    "Your order has been cancelled.".to_string()
}

pub fn cancelled_by_driver_to_customer() -> String {
    "The driver stepped back from your order. A new driver will pick it up shortly.".to_string()
}

pub fn cancelled_by_admin_to_driver() -> String {
    "The order was cancelled by the administration.".to_string()
}

pub fn cancelled_by_admin_to_customer() -> String {
    "Your order was cancelled by the administration.".to_string()
}

pub fn phone_needed() -> String {
    "Please share your phone number before accepting orders.".to_string()
}

pub fn trial_invite(trial_days: i64) -> String {
    format!(
        "Welcome aboard. Your {trial_days}-day trial has started. Join the drivers' group with the button below. \
         This message disappears once you have joined."
    )
}

pub fn payment_prompt(card_number: &str, card_holder: &str, price: u64) -> String {
    format!(
        "Subscription payment: {price} (1 month)\n\
         Card: {card_number}\n\
         Card holder: {card_holder}\n\n\
         After paying, submit a picture of the receipt.\n\
         Warning: submitting a forged receipt may lead to criminal liability."
    )
}

pub fn receipt_caption(driver: UserId, details: &DriverDetails, price: u64) -> String {
    format!(
        "New subscription payment (driver)\n\
         Name: {name}\n\
         Vehicle: {vehicle}\n\
         Plate: {plate}\n\
         Phone: {phone}\n\
         Profile: {driver}\n\n\
         Amount: {price}",
        name = details.name,
        vehicle = details.vehicle_make,
        plate = details.plate,
        phone = details.phone,
    )
}

pub fn receipt_forward_failed_note() -> String {
    "\n\nCould not deliver this receipt to the payments surface. Check the group permissions or forward this message."
        .to_string()
}

pub fn receipt_forward_failed_alert(driver: UserId, err: &str) -> String {
    format!("Could not deliver a receipt to the payments surface.\nDriver: {driver}\nError: {err}")
}

pub fn receipt_received() -> String {
    "Receipt submitted. Please wait for approval; you will get the drivers' group link once it is confirmed."
        .to_string()
}

pub fn payment_approved() -> String {
    "Payment confirmed.\n\nJoin the drivers' group with the button below. \
     This message disappears once you have joined."
        .to_string()
}

pub fn payment_rejected() -> String {
    "Your payment was rejected. Please resubmit a clear and correct receipt picture.".to_string()
}

pub fn review_stamp(original: &str, verdict: &str, admin: UserId, timestamp: &str) -> String {
    format!("{original}\n\n{verdict} by {admin} at {timestamp}")
}

pub fn welcome_to_group() -> String {
    "You have joined the group. Good luck out there.".to_string()
}

pub fn trial_expired_notice() -> String {
    "Your trial period has ended and your group access was paused.".to_string()
}

pub fn invite_failed_to_driver() -> String {
    "We could not create your group invite right now. The administration has been notified; please try again later."
        .to_string()
}

pub fn invite_failed_to_admin(driver: UserId, err: &str) -> String {
    format!("Invite link creation failed for driver {driver}: {err}")
}
