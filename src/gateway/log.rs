use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

use super::{Gateway, GatewayError};

/// One lock per house id. A deleted house keeps its slot as a tombstone
/// holding the last version: a writer that already cloned the Arc never
/// writes into a detached lock, and a reused id keeps counting upward.
struct HouseSlot {
    /// Mirrors `state.house.is_some()` so scans can skip tombstones unlocked.
    live: AtomicBool,
    state: RwLock<SlotState>,
}

struct SlotState {
    house: Option<House>,
    /// Version of the last write, put or delete. Never goes back.
    version: u64,
}

impl HouseSlot {
    fn new(house: Option<House>, version: u64) -> Self {
        Self {
            live: AtomicBool::new(house.is_some()),
            state: RwLock::new(SlotState { house, version }),
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl Default for HouseSlot {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
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

/// Owns the WAL file. Gateway events queued while a flush is in progress
/// are written together and share one fsync; every writer waiting on that
/// batch gets the same outcome. Compaction and counter requests run
/// between batches, never inside one.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }

                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
    debug!("WAL writer stopped");
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!("WAL flush failed for {} events: {e}", batch.len());
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after an append error so partial bytes don't leak into the next batch.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
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
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// Gateway keeping every record in memory, made durable by an append-only log.
pub struct LogGateway {
    houses: DashMap<Ulid, Arc<HouseSlot>>,
    rentals: DashMap<Ulid, Rental>,
    wal_tx: Option<mpsc::Sender<WalCommand>>,
    /// Writers hold it shared; compaction holds it exclusively so the
    /// snapshot it writes cannot miss a concurrent append.
    compact_lock: RwLock<()>,
}

impl LogGateway {
    /// Volatile gateway with no log. Contents vanish with the value.
    pub fn in_memory() -> Self {
        Self {
            houses: DashMap::new(),
            rentals: DashMap::new(),
            wal_tx: None,
            compact_lock: RwLock::new(()),
        }
    }

    /// Replay the log at `path` and start its group-commit writer. A damaged
    /// tail is cut off first so later appends stay reachable.
    /// Must be called from inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let events = Wal::recover(path)?;
        let wal = Wal::open(path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let mut gateway = Self::in_memory();
        gateway.wal_tx = Some(wal_tx);

        // Sole owner of every slot here, so plain construction is enough.
        for event in &events {
            match event {
                Event::HousePut(house) => {
                    let slot = HouseSlot::new(Some(house.clone()), house.version);
                    gateway.houses.insert(house.id, Arc::new(slot));
                }
                Event::HouseDeleted { id, version } => {
                    gateway.houses.insert(*id, Arc::new(HouseSlot::new(None, *version)));
                }
                Event::RentalPut(rental) => {
                    gateway.rentals.insert(rental.id, rental.clone());
                }
                Event::RentalDeleted { id } => {
                    gateway.rentals.remove(id);
                }
            }
        }

        info!(
            "replayed {} events from {}: {} houses, {} rentals",
            events.len(),
            path.display(),
            gateway.live_slots().len(),
            gateway.rentals.len()
        );
        Ok(gateway)
    }

    pub fn is_durable(&self) -> bool {
        self.wal_tx.is_some()
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), GatewayError> {
        let Some(wal_tx) = &self.wal_tx else {
            return Ok(());
        };
        let (tx, rx) = oneshot::channel();
        wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| GatewayError::Closed)?;
        rx.await
            .map_err(|_| GatewayError::Closed)?
            .map_err(|e| GatewayError::Io(e.to_string()))
    }

    fn live_slots(&self) -> Vec<Arc<HouseSlot>> {
        self.houses
            .iter()
            .filter(|e| e.value().is_live())
            .map(|e| e.value().clone())
            .collect()
    }

    /// Rewrite the log as one put per live record and one delete per
    /// tombstone, so versions survive the rewrite.
    pub async fn compact(&self) -> Result<(), GatewayError> {
        let Some(wal_tx) = &self.wal_tx else {
            return Ok(());
        };
        let _exclusive = self.compact_lock.write().await;

        // Writers hold the compaction lock shared, so no slot lock is contended here.
        let slots: Vec<(Ulid, Arc<HouseSlot>)> =
            self.houses.iter().map(|e| (*e.key(), e.value().clone())).collect();
        let mut events = Vec::with_capacity(slots.len() + self.rentals.len());
        for (id, slot) in slots {
            let state = slot.state.read().await;
            match &state.house {
                Some(house) => events.push(Event::HousePut(house.clone())),
                None => events.push(Event::HouseDeleted {
                    id,
                    version: state.version,
                }),
            }
        }
        events.extend(self.rentals.iter().map(|e| Event::RentalPut(e.value().clone())));
        let count = events.len();

        let (tx, rx) = oneshot::channel();
        wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| GatewayError::Closed)?;
        rx.await
            .map_err(|_| GatewayError::Closed)?
            .map_err(|e| GatewayError::Io(e.to_string()))?;
        info!("WAL compacted to {count} events");
        Ok(())
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let Some(wal_tx) = &self.wal_tx else {
            return 0;
        };
        let (tx, rx) = oneshot::channel();
        if wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

#[async_trait]
impl Gateway for LogGateway {
    async fn get_house(&self, id: Ulid) -> Result<Option<House>, GatewayError> {
        let Some(slot) = self.houses.get(&id).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        let state = slot.state.read().await;
        Ok(state.house.clone())
    }

    async fn put_house(&self, mut house: House, expected_version: Option<u64>) -> Result<House, GatewayError> {
        let _shared = self.compact_lock.read().await;
        let id = house.id;
        let slot = match expected_version {
            Some(expected) => self
                .houses
                .get(&id)
                .map(|e| e.value().clone())
                .ok_or(GatewayError::Conflict { id, expected, found: None })?,
            None => self.houses.entry(id).or_default().value().clone(),
        };

        let mut state = slot.state.write().await;
        let current = state.house.as_ref().map(|h| h.version);
        if let Some(expected) = expected_version
            && current != Some(expected)
        {
            return Err(GatewayError::Conflict { id, expected, found: current });
        }

        house.version = state.version + 1;
        self.wal_append(&Event::HousePut(house.clone())).await?;
        state.version = house.version;
        state.house = Some(house.clone());
        slot.live.store(true, Ordering::Release);
        Ok(house)
    }

    async fn delete_house(&self, id: Ulid) -> Result<bool, GatewayError> {
        let _shared = self.compact_lock.read().await;
        let Some(slot) = self.houses.get(&id).map(|e| e.value().clone()) else {
            return Ok(false);
        };
        let mut state = slot.state.write().await;
        if state.house.is_none() {
            return Ok(false);
        }
        self.wal_append(&Event::HouseDeleted {
            id,
            version: state.version,
        })
        .await?;
        state.house = None;
        slot.live.store(false, Ordering::Release);
        Ok(true)
    }

    async fn query_houses(&self, filter: &HouseFilter) -> Result<Vec<House>, GatewayError> {
        let mut found = Vec::new();
        for slot in self.live_slots() {
            let state = slot.state.read().await;
            if let Some(house) = state.house.as_ref()
                && filter.matches(house)
            {
                found.push(house.clone());
            }
        }
        Ok(found)
    }

    async fn get_rental(&self, id: Ulid) -> Result<Option<Rental>, GatewayError> {
        Ok(self.rentals.get(&id).map(|e| e.value().clone()))
    }

    async fn put_rental(&self, rental: Rental) -> Result<Rental, GatewayError> {
        let _shared = self.compact_lock.read().await;
        self.wal_append(&Event::RentalPut(rental.clone())).await?;
        self.rentals.insert(rental.id, rental.clone());
        Ok(rental)
    }

    async fn delete_rental(&self, id: Ulid) -> Result<bool, GatewayError> {
        let _shared = self.compact_lock.read().await;
        if !self.rentals.contains_key(&id) {
            return Ok(false);
        }
        self.wal_append(&Event::RentalDeleted { id }).await?;
        Ok(self.rentals.remove(&id).is_some())
    }

    async fn rentals_for_house(&self, house_id: Ulid) -> Result<Vec<Rental>, GatewayError> {
        let mut rentals: Vec<Rental> = self
            .rentals
            .iter()
            .filter(|e| e.value().house_id == house_id)
            .map(|e| e.value().clone())
            .collect();
        rentals.sort_by_key(|r| r.start_date);
        Ok(rentals)
    }
}
