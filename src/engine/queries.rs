use std::cmp::Reverse;
use std::collections::HashMap;

use ulid::Ulid;

use crate::limits::LOW_STOCK_THRESHOLD;
use crate::model::*;

use super::{Engine, SharedCalendar, SharedItem};

impl Engine {
    // Listings are sorted by id; ULIDs are monotonic, so that is creation
    // order.

    pub fn list_services(&self) -> Vec<Service> {
        let mut out: Vec<Service> = self.services.iter().map(|e| e.value().clone()).collect();
        out.sort_by_key(|s| s.id);
        out
    }

    pub fn list_staff(&self) -> Vec<Person> {
        let mut out: Vec<Person> = self
            .people
            .iter()
            .filter(|e| e.value().role == Role::Staff)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|p| p.id);
        out
    }

    pub fn list_customers(&self) -> Vec<Person> {
        let mut out: Vec<Person> = self
            .people
            .iter()
            .filter(|e| e.value().role == Role::Customer)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|p| p.id);
        out
    }

    pub async fn list_inventory(&self) -> Vec<InventoryItem> {
        let items: Vec<SharedItem> = self.inventory.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(item.read().await.clone());
        }
        out.sort_by_key(|i| i.id);
        out
    }

    pub async fn list_appointments(&self) -> Vec<Appointment> {
        let calendars: Vec<SharedCalendar> =
            self.calendars.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for calendar in calendars {
            let guard = calendar.read().await;
            out.extend(guard.appointments.iter().cloned());
        }
        out.sort_by_key(|a| a.id);
        out
    }

    pub async fn get_appointment(&self, id: Ulid) -> Option<Appointment> {
        let stylist = self.appointment_to_stylist.get(&id).map(|e| *e.value())?;
        let calendar = self.get_calendar(&stylist)?;
        let guard = calendar.read().await;
        guard.get(id).cloned()
    }

    /// Summarize committed state for the dashboard: revenue and count over
    /// non-cancelled appointments, items with stock strictly below the
    /// low-stock threshold, and the most-booked stylist with ties going to
    /// the lowest id.
    pub async fn dashboard_stats(&self) -> DashboardStats {
        let mut total_revenue = 0u64;
        let mut total_appointments = 0usize;
        let mut per_stylist: HashMap<Ulid, usize> = HashMap::new();

        let calendars: Vec<SharedCalendar> =
            self.calendars.iter().map(|e| e.value().clone()).collect();
        for calendar in calendars {
            let guard = calendar.read().await;
            for appointment in guard.appointments.iter().filter(|a| a.is_active()) {
                total_appointments += 1;
                *per_stylist.entry(appointment.stylist).or_default() += 1;
                if let Some(service) = self.services.get(&appointment.service) {
                    total_revenue = total_revenue.saturating_add(service.value().price);
                }
            }
        }

        let items: Vec<SharedItem> = self.inventory.iter().map(|e| e.value().clone()).collect();
        let mut low_stock_items = Vec::new();
        for item in items {
            let snapshot = item.read().await.clone();
            if snapshot.stock_level < LOW_STOCK_THRESHOLD {
                low_stock_items.push(snapshot);
            }
        }
        low_stock_items.sort_by(|a, b| a.sku.cmp(&b.sku));
        metrics::gauge!(crate::observability::LOW_STOCK_ITEMS).set(low_stock_items.len() as f64);

        let top_stylist = per_stylist
            .into_iter()
            .max_by_key(|(id, count)| (*count, Reverse(*id)))
            .and_then(|(id, count)| {
                self.people.get(&id).map(|p| TopStylist {
                    id,
                    name: p.value().name.clone(),
                    appointments: count,
                })
            });

        DashboardStats {
            total_revenue,
            total_appointments,
            low_stock_items,
            top_stylist,
        }
    }
}
