use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[allow(dead_code)]
    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// What a person is to the salon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Staff,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Staff => "Staff",
            Role::Customer => "Customer",
        }
    }
}

/// Staff qualification tier. Derived `Ord` gives the total order
/// Basic < Intermediate < Expert used by the skill gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillLevel {
    Basic,
    Intermediate,
    Expert,
}

impl SkillLevel {
    /// Rank used in messages and reports (Basic=1 .. Expert=3).
    pub fn ordinal(&self) -> u8 {
        match self {
            SkillLevel::Basic => 1,
            SkillLevel::Intermediate => 2,
            SkillLevel::Expert => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Basic => "Basic",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Expert => "Expert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    /// Staff only.
    pub skill_level: Option<SkillLevel>,
    /// Staff only, whole percent 0–100.
    pub commission_rate: Option<u8>,
    pub created_at: Ms,
}

impl Person {
    /// A staff record without a skill level counts as Basic.
    pub fn effective_skill(&self) -> SkillLevel {
        self.skill_level.unwrap_or(SkillLevel::Basic)
    }
}

/// One inventory requirement of a service: `quantity` units of `item_id`
/// are deducted every time the service is booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub item_id: Ulid,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub name: String,
    pub description: Option<String>,
    /// Whole currency units.
    pub price: u64,
    pub duration_mins: u32,
    pub required_skill: SkillLevel,
    /// Ordered; checked in order so failures name a deterministic item.
    pub consumables: Vec<Consumable>,
    pub created_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Ulid,
    pub name: String,
    /// Unique across the store.
    pub sku: String,
    /// Never goes negative; only the booking commit decrements it.
    pub stock_level: u64,
    /// e.g. "ml", "bottles", "tubs".
    pub unit: String,
    pub reorder_point: u64,
    /// Cents per unit, so fractional dye costs stay integral.
    pub cost_per_unit: Option<u64>,
    pub expiry_at: Option<Ms>,
    pub created_at: Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// The full transition table: Pending→Confirmed, Confirmed→Completed,
    /// {Pending, Confirmed}→Cancelled. Completed and Cancelled are terminal.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Completed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    pub customer: Ulid,
    pub stylist: Ulid,
    pub service: Ulid,
    pub span: Span,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl Appointment {
    /// Cancelled appointments stop existing for conflict detection and revenue.
    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

/// One staff member's appointment book, sorted by `span.start`.
/// Appointments are never removed — cancellation flips status in place.
#[derive(Debug, Clone)]
pub struct StaffCalendar {
    pub stylist: Ulid,
    pub appointments: Vec<Appointment>,
}

impl StaffCalendar {
    pub fn new(stylist: Ulid) -> Self {
        Self {
            stylist,
            appointments: Vec::new(),
        }
    }

    /// Insert maintaining sort order by span.start.
    pub fn insert(&mut self, appointment: Appointment) {
        let pos = self
            .appointments
            .binary_search_by_key(&appointment.span.start, |a| a.span.start)
            .unwrap_or_else(|e| e);
        self.appointments.insert(pos, appointment);
    }

    pub fn get(&self, id: Ulid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut Appointment> {
        self.appointments.iter_mut().find(|a| a.id == id)
    }

    /// Appointments whose span overlaps the query window, cancelled ones included.
    /// Uses binary search to skip appointments starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Appointment> {
        // Everything at index >= right_bound starts at or after query.end → can't overlap.
        let right_bound = self
            .appointments
            .partition_point(|a| a.span.start < query.end);
        self.appointments[..right_bound]
            .iter()
            .filter(move |a| a.span.end > query.start)
    }
}

/// One stock decrement inside a booking commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub item_id: Ulid,
    pub quantity: u64,
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    PersonCreated {
        person: Person,
    },
    ServiceCreated {
        service: Service,
    },
    ItemCreated {
        item: InventoryItem,
    },
    /// One admitted booking: the appointment plus every stock deduction it
    /// implies, in a single record. Replay can never observe a half-committed
    /// booking because there is no second record to lose.
    BookingCommitted {
        appointment: Appointment,
        deductions: Vec<Deduction>,
    },
    StatusChanged {
        appointment_id: Ulid,
        stylist: Ulid,
        status: AppointmentStatus,
        at: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopStylist {
    pub id: Ulid,
    pub name: String,
    pub appointments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    /// Sum of service prices over non-cancelled appointments.
    pub total_revenue: u64,
    /// Non-cancelled appointment count.
    pub total_appointments: usize,
    pub low_stock_items: Vec<InventoryItem>,
    /// Most-booked staff member; ties go to the lowest id. None with no bookings.
    pub top_stylist: Option<TopStylist>,
}

/// Raw booking intake, exactly as a caller submits it.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub customer: Ulid,
    pub stylist: Ulid,
    pub service: Ulid,
    pub start_time: Ms,
    pub end_time: Ms,
    pub notes: Option<String>,
}
