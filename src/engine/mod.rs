mod conflict;
mod error;
mod ledger;
mod mutations;
mod queries;

pub use error::{BookingError, FieldError};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

pub type SharedCalendar = Arc<RwLock<StaffCalendar>>;
pub type SharedItem = Arc<RwLock<InventoryItem>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    respond_batch(batch, &result);
}

fn flush_batch(wal: &mut Wal, batch: &mut [(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The salon store: an explicitly passed handle, never a global.
///
/// People and services are immutable once created, so they sit in plain maps.
/// Inventory items and staff calendars are the contended resources — each one
/// lives behind its own `RwLock` so a booking commit can hold exactly the
/// locks it touches (one calendar + the service's items) and nothing else.
pub struct Engine {
    pub(super) people: DashMap<Ulid, Person>,
    pub(super) services: DashMap<Ulid, Service>,
    pub(super) inventory: DashMap<Ulid, SharedItem>,
    /// One calendar per staff person, created with the person.
    pub(super) calendars: DashMap<Ulid, SharedCalendar>,
    /// Reverse lookup: appointment id → stylist id.
    pub(super) appointment_to_stylist: DashMap<Ulid, Ulid>,
    /// SKU uniqueness index: sku → item id.
    pub(super) sku_index: DashMap<String, Ulid>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    replayed_events: usize,
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            people: DashMap::new(),
            services: DashMap::new(),
            inventory: DashMap::new(),
            calendars: DashMap::new(),
            appointment_to_stylist: DashMap::new(),
            sku_index: DashMap::new(),
            wal_tx,
            replayed_events: events.len(),
        };

        // Replay — we're the sole owner of every Arc here, so try_write always
        // succeeds instantly (no contention). Never use blocking_write here
        // because this runs inside an async context.
        for event in &events {
            match event {
                Event::PersonCreated { person } => {
                    engine.index_person(person.clone());
                }
                Event::ServiceCreated { service } => {
                    engine.services.insert(service.id, service.clone());
                }
                Event::ItemCreated { item } => {
                    engine.sku_index.insert(item.sku.clone(), item.id);
                    engine
                        .inventory
                        .insert(item.id, Arc::new(RwLock::new(item.clone())));
                }
                Event::BookingCommitted {
                    appointment,
                    deductions,
                } => {
                    if let Some(entry) = engine.calendars.get(&appointment.stylist) {
                        let cal = entry.value().clone();
                        cal.try_write()
                            .expect("replay: uncontended write")
                            .insert(appointment.clone());
                        engine
                            .appointment_to_stylist
                            .insert(appointment.id, appointment.stylist);
                    }
                    for d in deductions {
                        if let Some(entry) = engine.inventory.get(&d.item_id) {
                            let item = entry.value().clone();
                            let mut guard =
                                item.try_write().expect("replay: uncontended write");
                            guard.stock_level = guard.stock_level.saturating_sub(d.quantity);
                        }
                    }
                }
                Event::StatusChanged {
                    appointment_id,
                    stylist,
                    status,
                    at,
                } => {
                    if let Some(entry) = engine.calendars.get(stylist) {
                        let cal = entry.value().clone();
                        let mut guard =
                            cal.try_write().expect("replay: uncontended write");
                        if let Some(a) = guard.get_mut(*appointment_id) {
                            a.status = *status;
                            a.updated_at = *at;
                        }
                    }
                }
            }
        }

        Ok(engine)
    }

    /// Insert a person and, for staff, their (initially empty) calendar.
    pub(super) fn index_person(&self, person: Person) {
        if person.role == Role::Staff {
            self.calendars
                .insert(person.id, Arc::new(RwLock::new(StaffCalendar::new(person.id))));
        }
        self.people.insert(person.id, person);
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), BookingError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| BookingError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| BookingError::WalError(e.to_string()))
    }

    pub(super) fn get_calendar(&self, stylist: &Ulid) -> Option<SharedCalendar> {
        self.calendars.get(stylist).map(|e| e.value().clone())
    }

    pub(super) fn get_item(&self, id: &Ulid) -> Option<SharedItem> {
        self.inventory.get(id).map(|e| e.value().clone())
    }

    /// Events replayed from the WAL at startup.
    pub fn replayed_events(&self) -> usize {
        self.replayed_events
    }

    /// True when nothing has ever been created — the seed gate.
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.services.is_empty() && self.inventory.is_empty()
    }

    /// (people, services, items, appointments) — startup summary.
    pub fn entity_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.people.len(),
            self.services.len(),
            self.inventory.len(),
            self.appointment_to_stylist.len(),
        )
    }
}

/// Background task: compact the WAL once enough appends have accumulated.
/// The check is opportunistic — a booking never waits on compaction.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends >= threshold {
            match engine.compact_wal().await {
                Ok(()) => tracing::info!("compacted WAL after {appends} appends"),
                Err(e) => tracing::warn!("WAL compaction failed: {e}"),
            }
        }
    }
}
