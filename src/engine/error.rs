use serde::Serialize;
use ulid::Ulid;

use crate::model::{AppointmentStatus, SkillLevel};

/// One field-level validation failure. The validator collects every violation
/// before failing, so a request with three bad fields reports all three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum BookingError {
    Validation(Vec<FieldError>),
    /// Entity kind that failed to resolve ("Service", "Stylist", "Appointment").
    NotFound(&'static str),
    /// The referenced person exists but is not staff.
    InvalidRole(Ulid),
    SkillMismatch {
        required: SkillLevel,
    },
    /// Overlapping non-cancelled appointment; carries the blocking appointment id.
    Conflict(Ulid),
    InsufficientStock {
        item: String,
        required: u64,
        available: u64,
        unit: String,
    },
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    DuplicateSku(String),
    /// Data-integrity violation (e.g. a service pointing at a missing item).
    /// Not a user error; surfaces as a 5xx.
    Internal(String),
    LimitExceeded(&'static str),
    WalError(String),
}

impl BookingError {
    /// Stable lowercase tag for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::NotFound(_) => "not_found",
            BookingError::InvalidRole(_) => "invalid_role",
            BookingError::SkillMismatch { .. } => "skill_mismatch",
            BookingError::Conflict(_) => "conflict",
            BookingError::InsufficientStock { .. } => "insufficient_stock",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::DuplicateSku(_) => "duplicate_sku",
            BookingError::Internal(_) => "internal",
            BookingError::LimitExceeded(_) => "limit_exceeded",
            BookingError::WalError(_) => "wal_error",
        }
    }
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Validation(errors) => {
                write!(f, "Validation Error")?;
                for (i, e) in errors.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{}: {}", e.field, e.message)?;
                }
                Ok(())
            }
            BookingError::NotFound(kind) => write!(f, "{kind} not found"),
            BookingError::InvalidRole(_) => write!(f, "Selected user is not a staff member"),
            BookingError::SkillMismatch { required } => write!(
                f,
                "Stylist does not meet the required skill level ({}) for this service.",
                required.as_str()
            ),
            BookingError::Conflict(_) => {
                write!(f, "Stylist is already booked for this time slot")
            }
            BookingError::InsufficientStock {
                item,
                required,
                available,
                unit,
            } => write!(
                f,
                "Insufficient inventory: {item} (Required: {required} {unit}, Available: {available})"
            ),
            BookingError::InvalidTransition { from, to } => write!(
                f,
                "Cannot transition appointment from {} to {}",
                from.as_str(),
                to.as_str()
            ),
            BookingError::DuplicateSku(sku) => write!(f, "Duplicate SKU: {sku}"),
            BookingError::Internal(msg) => write!(f, "{msg}"),
            BookingError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            BookingError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}
