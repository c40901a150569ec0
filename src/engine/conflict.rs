use crate::limits::*;
use crate::model::*;

use super::error::FieldError;
use super::BookingError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Field checks for a candidate window. Returns every violation rather than
/// stopping at the first, so the caller can report them together.
pub(crate) fn window_field_errors(start: Ms, end: Ms) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if start < MIN_VALID_TIMESTAMP_MS || start > MAX_VALID_TIMESTAMP_MS {
        errors.push(FieldError::new("startTime", "Timestamp out of range"));
    }
    if end < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        errors.push(FieldError::new("endTime", "Timestamp out of range"));
    }
    if end <= start {
        errors.push(FieldError::new("endTime", "End time must be after start time"));
    } else if end - start > MAX_SPAN_DURATION_MS {
        errors.push(FieldError::new("endTime", "Appointment window too long"));
    }
    errors
}

/// The conflict rule: any non-cancelled appointment for this stylist whose
/// half-open span overlaps the candidate blocks it. Touching endpoints do not
/// conflict. Must run inside the same critical section as the insert — the
/// caller holds the calendar write lock.
pub(crate) fn check_no_conflict(cal: &StaffCalendar, span: &Span) -> Result<(), BookingError> {
    for existing in cal.overlapping(span) {
        if existing.is_active() {
            return Err(BookingError::Conflict(existing.id));
        }
    }
    Ok(())
}
