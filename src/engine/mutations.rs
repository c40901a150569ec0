use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tokio::sync::{oneshot, RwLock};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, now_ms, window_field_errors};
use super::error::FieldError;
use super::ledger;
use super::{BookingError, Engine, SharedCalendar, SharedItem, WalCommand};

/// Minimal email shape check: one `@`, non-empty local part, dotted domain.
fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if name.len() < MIN_NAME_LEN {
        errors.push(FieldError::new("name", "Name must be at least 2 characters"));
    } else if name.len() > MAX_NAME_LEN {
        errors.push(FieldError::new("name", "Name too long"));
    }
}

impl Engine {
    // ── Administrative creation ──────────────────────────────────

    pub async fn create_person(
        &self,
        name: String,
        email: String,
        phone: Option<String>,
        role: Role,
        skill_level: Option<SkillLevel>,
        commission_rate: Option<u8>,
    ) -> Result<Person, BookingError> {
        let mut errors = Vec::new();
        check_name(&name, &mut errors);
        if email.len() > MAX_EMAIL_LEN || !valid_email(&email) {
            errors.push(FieldError::new("email", "Invalid email format"));
        }
        if let Some(ref p) = phone
            && p.len() > MAX_PHONE_LEN {
                errors.push(FieldError::new("phone", "Phone number too long"));
            }
        if role == Role::Staff {
            if skill_level.is_none() || commission_rate.is_none() {
                errors.push(FieldError::new(
                    "skillLevel",
                    "Staff members must have a Skill Level and Commission Rate",
                ));
            }
        } else if skill_level.is_some() || commission_rate.is_some() {
            errors.push(FieldError::new(
                "role",
                "Only staff members carry a skill level and commission rate",
            ));
        }
        if let Some(rate) = commission_rate
            && rate > MAX_COMMISSION_RATE {
                errors.push(FieldError::new(
                    "commissionRate",
                    "Commission rate must be between 0 and 100",
                ));
            }
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }
        if self.people.len() >= MAX_PEOPLE {
            return Err(BookingError::LimitExceeded("too many people"));
        }

        let person = Person {
            id: Ulid::new(),
            name,
            email,
            phone,
            role,
            skill_level,
            commission_rate,
            created_at: now_ms(),
        };
        let event = Event::PersonCreated { person: person.clone() };
        self.wal_append(&event).await?;
        self.index_person(person.clone());
        Ok(person)
    }

    /// Consumable item references are deliberately not resolved here: a
    /// dangling reference surfaces on the booking path as an integrity fault.
    pub async fn create_service(
        &self,
        name: String,
        description: Option<String>,
        price: u64,
        duration_mins: u32,
        required_skill: SkillLevel,
        consumables: Vec<Consumable>,
    ) -> Result<Service, BookingError> {
        let mut errors = Vec::new();
        check_name(&name, &mut errors);
        if let Some(ref d) = description
            && d.len() > MAX_DESCRIPTION_LEN {
                errors.push(FieldError::new("description", "Description too long"));
            }
        if price == 0 {
            errors.push(FieldError::new("price", "Price must be greater than zero"));
        }
        if duration_mins == 0 {
            errors.push(FieldError::new("durationMins", "Duration must be greater than zero"));
        } else if duration_mins > MAX_DURATION_MINS {
            errors.push(FieldError::new("durationMins", "Duration too long"));
        }
        for c in &consumables {
            if c.quantity == 0 {
                errors.push(FieldError::new(
                    "consumables",
                    "Consumable quantity must be greater than zero",
                ));
                break;
            }
            if c.quantity > MAX_CONSUMABLE_QUANTITY {
                errors.push(FieldError::new("consumables", "Consumable quantity too large"));
                break;
            }
        }
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }
        if consumables.len() > MAX_CONSUMABLES_PER_SERVICE {
            return Err(BookingError::LimitExceeded("too many consumables on service"));
        }
        if self.services.len() >= MAX_SERVICES {
            return Err(BookingError::LimitExceeded("too many services"));
        }

        let service = Service {
            id: Ulid::new(),
            name,
            description,
            price,
            duration_mins,
            required_skill,
            consumables,
            created_at: now_ms(),
        };
        let event = Event::ServiceCreated { service: service.clone() };
        self.wal_append(&event).await?;
        self.services.insert(service.id, service.clone());
        Ok(service)
    }

    pub async fn create_inventory_item(
        &self,
        name: String,
        sku: String,
        stock_level: u64,
        unit: String,
        reorder_point: u64,
        cost_per_unit: Option<u64>,
        expiry_at: Option<Ms>,
    ) -> Result<InventoryItem, BookingError> {
        let mut errors = Vec::new();
        check_name(&name, &mut errors);
        if sku.len() < MIN_SKU_LEN {
            errors.push(FieldError::new("sku", "SKU must be at least 3 characters"));
        } else if sku.len() > MAX_SKU_LEN {
            errors.push(FieldError::new("sku", "SKU too long"));
        }
        if unit.is_empty() {
            errors.push(FieldError::new("unit", "Unit is required"));
        } else if unit.len() > MAX_UNIT_LEN {
            errors.push(FieldError::new("unit", "Unit too long"));
        }
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }
        if stock_level > MAX_STOCK_LEVEL {
            return Err(BookingError::LimitExceeded("stock level too large"));
        }
        if self.inventory.len() >= MAX_ITEMS {
            return Err(BookingError::LimitExceeded("too many inventory items"));
        }

        let item = InventoryItem {
            id: Ulid::new(),
            name,
            sku,
            stock_level,
            unit,
            reorder_point,
            cost_per_unit,
            expiry_at,
            created_at: now_ms(),
        };
        // Claim the SKU before the append so two racing creates with the same
        // SKU cannot both pass; the claim is released if the append fails.
        match self.sku_index.entry(item.sku.clone()) {
            Entry::Occupied(_) => return Err(BookingError::DuplicateSku(item.sku)),
            Entry::Vacant(v) => {
                v.insert(item.id);
            }
        }
        let event = Event::ItemCreated { item: item.clone() };
        if let Err(e) = self.wal_append(&event).await {
            self.sku_index.remove(&item.sku);
            return Err(e);
        }
        self.inventory
            .insert(item.id, Arc::new(RwLock::new(item.clone())));
        Ok(item)
    }

    // ── Booking admission ────────────────────────────────────────

    /// The admission pipeline: validate, resolve, skill gate, then conflict
    /// and stock decided inside the commit's critical section. Cheap checks
    /// run first; nothing mutates until every check has passed.
    pub async fn book_appointment(&self, req: BookingRequest) -> Result<Appointment, BookingError> {
        let started = std::time::Instant::now();
        let result = self.admit(req).await;
        metrics::counter!(
            crate::observability::BOOKINGS_TOTAL,
            "outcome" => crate::observability::booking_outcome(&result)
        )
        .increment(1);
        metrics::histogram!(crate::observability::BOOKING_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(a) => tracing::debug!(appointment = %a.id, stylist = %a.stylist, "booking committed"),
            Err(e) => tracing::debug!(kind = e.kind(), "booking rejected: {e}"),
        }
        result
    }

    async fn admit(&self, req: BookingRequest) -> Result<Appointment, BookingError> {
        // Validation reports every offending field, not just the first.
        let mut errors = window_field_errors(req.start_time, req.end_time);
        if let Some(ref notes) = req.notes
            && notes.len() > MAX_NOTES_LEN {
                errors.push(FieldError::new("notes", "Notes too long"));
            }
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }
        let span = Span::new(req.start_time, req.end_time);

        let service = self
            .services
            .get(&req.service)
            .map(|e| e.value().clone())
            .ok_or(BookingError::NotFound("Service"))?;
        let stylist = self
            .people
            .get(&req.stylist)
            .map(|e| e.value().clone())
            .ok_or(BookingError::NotFound("Stylist"))?;
        if stylist.role != Role::Staff {
            return Err(BookingError::InvalidRole(stylist.id));
        }

        if stylist.effective_skill() < service.required_skill {
            return Err(BookingError::SkillMismatch {
                required: service.required_skill,
            });
        }

        self.commit_booking(&req, span, &service).await
    }

    /// The commit step. Every decision that reads mutable state — the overlap
    /// scan and the stock check — happens while the stylist's calendar and all
    /// required items are write-locked, and the WAL append lands before any of
    /// it is applied. Lock order is fixed (calendar first, then items sorted
    /// by id) so concurrent bookings cannot deadlock.
    async fn commit_booking(
        &self,
        req: &BookingRequest,
        span: Span,
        service: &Service,
    ) -> Result<Appointment, BookingError> {
        let calendar = self
            .get_calendar(&req.stylist)
            .ok_or_else(|| BookingError::Internal("Stylist calendar missing".into()))?;

        let needs = ledger::aggregate_requirements(&service.consumables);

        // Resolve every item before locking anything; a dangling reference
        // is a data-integrity fault, not a user error.
        let mut items = Vec::with_capacity(needs.len());
        for need in &needs {
            let item = self.get_item(&need.item_id).ok_or_else(|| {
                BookingError::Internal("Inventory item not found for this service".into())
            })?;
            items.push(item);
        }

        let mut cal = calendar.write_owned().await;
        if cal.appointments.len() >= MAX_APPOINTMENTS_PER_STYLIST {
            return Err(BookingError::LimitExceeded("too many appointments for stylist"));
        }
        check_no_conflict(&cal, &span)?;

        // `needs` is sorted by item id, so the guards are acquired in the
        // global order.
        let mut guards = Vec::with_capacity(items.len());
        for item in items {
            guards.push(item.write_owned().await);
        }
        ledger::check_stock(&guards, &needs)?;

        let now = now_ms();
        let appointment = Appointment {
            id: Ulid::new(),
            customer: req.customer,
            stylist: req.stylist,
            service: req.service,
            span,
            status: AppointmentStatus::Pending,
            notes: req.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let event = Event::BookingCommitted {
            appointment: appointment.clone(),
            deductions: needs.clone(),
        };
        // If the append fails nothing was applied; the guards drop and the
        // request fails with calendar and stock untouched.
        self.wal_append(&event).await?;

        ledger::apply_deductions(&mut guards, &needs);
        cal.insert(appointment.clone());
        self.appointment_to_stylist
            .insert(appointment.id, appointment.stylist);
        metrics::gauge!(crate::observability::APPOINTMENTS_ACTIVE).increment(1.0);
        Ok(appointment)
    }

    // ── Appointment state machine ────────────────────────────────

    pub async fn transition_appointment(
        &self,
        id: Ulid,
        to: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        let stylist = self
            .appointment_to_stylist
            .get(&id)
            .map(|e| *e.value())
            .ok_or(BookingError::NotFound("Appointment"))?;
        let calendar = self
            .get_calendar(&stylist)
            .ok_or_else(|| BookingError::Internal("Stylist calendar missing".into()))?;

        // The transition check and the apply stay under one write lock so
        // two racing transitions cannot both pass the same guard.
        let mut cal = calendar.write_owned().await;
        let from = cal
            .get(id)
            .ok_or(BookingError::NotFound("Appointment"))?
            .status;
        if !from.can_transition_to(to) {
            return Err(BookingError::InvalidTransition { from, to });
        }

        let at = now_ms();
        let event = Event::StatusChanged {
            appointment_id: id,
            stylist,
            status: to,
            at,
        };
        self.wal_append(&event).await?;

        let Some(a) = cal.get_mut(id) else {
            return Err(BookingError::Internal("appointment vanished mid-transition".into()));
        };
        a.status = to;
        a.updated_at = at;
        let updated = a.clone();
        drop(cal);

        metrics::counter!(crate::observability::TRANSITIONS_TOTAL, "status" => to.as_str())
            .increment(1);
        if to == AppointmentStatus::Cancelled {
            metrics::gauge!(crate::observability::APPOINTMENTS_ACTIVE).decrement(1.0);
        }
        tracing::debug!(appointment = %id, from = from.as_str(), to = to.as_str(), "status changed");
        Ok(updated)
    }

    /// Pending → Confirmed.
    pub async fn confirm_appointment(&self, id: Ulid) -> Result<Appointment, BookingError> {
        self.transition_appointment(id, AppointmentStatus::Confirmed).await
    }

    /// Confirmed → Completed.
    pub async fn complete_appointment(&self, id: Ulid) -> Result<Appointment, BookingError> {
        self.transition_appointment(id, AppointmentStatus::Completed).await
    }

    /// Pending or Confirmed → Cancelled. The slot becomes bookable again and
    /// the appointment stops counting toward revenue.
    pub async fn cancel_appointment(&self, id: Ulid) -> Result<Appointment, BookingError> {
        self.transition_appointment(id, AppointmentStatus::Cancelled).await
    }

    // ── WAL maintenance ──────────────────────────────────────────

    /// Compact the WAL by rewriting it with only the events needed to recreate
    /// the current state: every person, service and item (at its present stock
    /// level), then every appointment. Items are written already deducted, so
    /// compacted bookings carry no deductions to replay.
    pub async fn compact_wal(&self) -> Result<(), BookingError> {
        let mut events = Vec::new();
        for person in self.people.iter() {
            events.push(Event::PersonCreated { person: person.value().clone() });
        }
        for service in self.services.iter() {
            events.push(Event::ServiceCreated { service: service.value().clone() });
        }
        let items: Vec<SharedItem> = self.inventory.iter().map(|e| e.value().clone()).collect();
        for item in items {
            let guard = item.read().await;
            events.push(Event::ItemCreated { item: guard.clone() });
        }
        let calendars: Vec<SharedCalendar> =
            self.calendars.iter().map(|e| e.value().clone()).collect();
        for calendar in calendars {
            let guard = calendar.read().await;
            for appointment in &guard.appointments {
                events.push(Event::BookingCommitted {
                    appointment: appointment.clone(),
                    deductions: Vec::new(),
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| BookingError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| BookingError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
