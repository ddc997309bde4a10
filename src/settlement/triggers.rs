// Trigger rules - decide which daily jobs apply on a given date.
//
// Pure functions of the date. Settlement and the monthly report share one
// billing-day rule; the weekly report only looks at the weekday.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::billing::models::Family;

/// Sentinel `settlement_day` meaning "last calendar day of the month"
pub const LAST_DAY_OF_MONTH: i32 = 0;

pub fn is_sunday(today: NaiveDate) -> bool {
    today.weekday() == Weekday::Sun
}

pub fn is_last_day_of_month(today: NaiveDate) -> bool {
    today.succ_opt().map_or(true, |tomorrow| tomorrow.month() != today.month())
}

/// Billing-day rule for one family
pub fn due_for_settlement(family: &Family, today: NaiveDate) -> bool {
    is_billing_day(family.settlement_day, today)
}

pub fn is_billing_day(settlement_day: i32, today: NaiveDate) -> bool {
    settlement_day == today.day() as i32
        || (settlement_day == LAST_DAY_OF_MONTH && is_last_day_of_month(today))
}
