//! Boats as seen by the booking core
//!
//! Boats are managed elsewhere; bookings only read them, except for the
//! denormalized booking counter.

use serde::{Deserialize, Serialize};

use core_kernel::{BoatId, Money, UserId};

use crate::error::BookingError;

/// How a boat is billed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Hourly rate with a minimum charge; whole days once a rental reaches 24h
    Hourly,
    /// Always billed by the (rounded-up) day
    Daily,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::Hourly => "hourly",
            PricingMode::Daily => "daily",
        }
    }
}

impl std::str::FromStr for PricingMode {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(PricingMode::Hourly),
            "daily" => Ok(PricingMode::Daily),
            other => Err(BookingError::validation(format!("Unknown pricing mode: {other}"))),
        }
    }
}

/// A rentable boat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boat {
    pub id: BoatId,
    /// Owning host
    pub host_id: UserId,
    pub name: String,
    /// Maximum number of guests
    pub capacity: u32,
    pub hourly_rate: Money,
    pub daily_rate: Money,
    pub pricing_mode: PricingMode,
    /// Whether the host accepts bookings at all
    pub is_available: bool,
    /// Number of bookings ever created for this boat
    pub booking_count: i64,
}

impl Boat {
    /// Creates an available hourly-priced boat
    ///
    /// # Errors
    ///
    /// Rates must share a currency and be non-negative; capacity must be at
    /// least one guest.
    pub fn new(
        host_id: UserId,
        name: impl Into<String>,
        capacity: u32,
        hourly_rate: Money,
        daily_rate: Money,
    ) -> Result<Self, BookingError> {
        let boat = Self {
            id: BoatId::new_v7(),
            host_id,
            name: name.into(),
            capacity,
            hourly_rate,
            daily_rate,
            pricing_mode: PricingMode::Hourly,
            is_available: true,
            booking_count: 0,
        };
        boat.validate()?;
        Ok(boat)
    }

    pub fn with_pricing_mode(mut self, mode: PricingMode) -> Self {
        self.pricing_mode = mode;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }

    /// Checks the invariants the price calculator relies on
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.capacity == 0 {
            return Err(BookingError::validation("Boat capacity must be at least 1"));
        }
        if self.hourly_rate.currency() != self.daily_rate.currency() {
            return Err(BookingError::validation(format!(
                "Boat rates use different currencies: {} and {}",
                self.hourly_rate.currency(),
                self.daily_rate.currency()
            )));
        }
        if self.hourly_rate.is_negative() || self.daily_rate.is_negative() {
            return Err(BookingError::validation("Boat rates cannot be negative"));
        }
        Ok(())
    }

    /// Whether a party of `guest_count` fits on board
    pub fn fits(&self, guest_count: u32) -> bool {
        guest_count <= self.capacity
    }
}
