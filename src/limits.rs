//! Hard caps and validation bounds, enforced at the mutation layer.

use crate::model::Ms;

/// Maximum people (owners + staff + customers) in the store.
pub const MAX_PEOPLE: usize = 50_000;

/// Maximum services in the catalog.
pub const MAX_SERVICES: usize = 5_000;

/// Maximum distinct inventory items.
pub const MAX_ITEMS: usize = 50_000;

/// Maximum appointments held on one staff calendar, any status.
pub const MAX_APPOINTMENTS_PER_STYLIST: usize = 100_000;

/// Maximum consumable entries on a single service.
pub const MAX_CONSUMABLES_PER_SERVICE: usize = 32;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 256;

pub const MIN_SKU_LEN: usize = 3;
pub const MAX_SKU_LEN: usize = 64;

pub const MAX_UNIT_LEN: usize = 32;
pub const MAX_PHONE_LEN: usize = 32;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_NOTES_LEN: usize = 1024;
pub const MAX_DESCRIPTION_LEN: usize = 1024;

pub const MAX_COMMISSION_RATE: u8 = 100;

/// Stock level cap at creation; with quantities capped below, deduction
/// arithmetic stays far from u64 overflow.
pub const MAX_STOCK_LEVEL: u64 = 1_000_000_000;

/// Per-consumable quantity cap.
pub const MAX_CONSUMABLE_QUANTITY: u64 = 1_000_000;

/// Service duration cap in minutes (one week).
pub const MAX_DURATION_MINS: u32 = 7 * 24 * 60;

/// 2000-01-01T00:00:00Z. Timestamps before this are garbage input.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;

/// 2100-01-01T00:00:00Z. Timestamps after this are garbage input.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// Longest bookable window: 24 hours.
pub const MAX_SPAN_DURATION_MS: Ms = 24 * 60 * 60 * 1000;

/// Reporting flags an item when stock falls strictly below this.
pub const LOW_STOCK_THRESHOLD: u64 = 5;
