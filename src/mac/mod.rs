//! Slotted TDMA MAC manager.
//!
//! One `MacManager` coordinates channel access for one modem. The host owns
//! the loop: it calls [`MacManager::do_work`] at any frequency comfortably
//! above the slot rate (tens of Hz is typical) and forwards every received
//! frame header through [`MacManager::handle_modem_incoming`]. Each fired
//! slot may hand back a [`MacEvent`] for the modem driver to act on.
//!
//! Cycle alignment comes from the shared UTC day: the first cycle of the
//! day starts at midnight, cycle `k` at `midnight + k * cycle_length`.
//! Peers that agree on UTC and on the peer set therefore agree on the whole
//! schedule without ever exchanging synchronization messages.

use crate::log::{debug, info, trace, warn};
use crate::message::{ModemMsgBase, ModemRangingRequest, RangingType};
use crate::timer::{Clock, SlotTimer};
use crate::{PeerId, Ts, BROADCAST_ID, QUERY_DESTINATION_ID};

pub mod config;
pub use config::{MacConfig, MacType};

pub mod slot;
pub use slot::{Slot, SlotHandle, SlotTable, SlotType, MAX_SLOTS};

/// Milliseconds per UTC day
const DAY_MS: Ts = 86_400 * 1000;

/// Modulus for the blank-slot jitter. Prime-like and large relative to any
/// plausible cycle, so that `cycles_since_day_start` and `cycle_sum` rarely
/// collide for long.
const ENTROPY: u64 = 5039;

/// Outbound request for the modem driver
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacEvent {
    /// Transmit data now; the driver picks the payload
    InitiateTransmission(ModemMsgBase),
    /// Perform a ranging measurement now
    InitiateRanging(ModemRangingRequest),
}

/// TDMA MAC manager, generic over the injected clock
#[derive(Debug, Clone)]
pub struct MacManager<C> {
    clock: C,
    cfg: MacConfig,

    slots: SlotTable,
    /// Cursor into the cycle: index of the slot that fires next
    current: usize,
    /// Handle of the auto-mode blank slot
    blank: Option<SlotHandle>,

    timer: SlotTimer,
    /// Absolute fire time armed on the timer, ms since the UTC epoch
    next_slot_t: Ts,
    cycles_since_day_start: u64,

    started: bool,
}

impl<C> MacManager<C>
where
    C: Clock,
{
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            cfg: MacConfig::default(),
            slots: SlotTable::new(),
            current: 0,
            blank: None,
            timer: SlotTimer::new(),
            next_slot_t: 0,
            cycles_since_day_start: 0,
            started: false,
        }
    }

    /// Start the MAC with the given configuration.
    ///
    /// A double start is a warning and a no-op, as is an invalid
    /// configuration (the manager stays idle).
    pub fn startup(&mut self, cfg: MacConfig) {
        if self.started {
            warn!("startup() called but the MAC is already running");
            return;
        }

        if let Err(e) = cfg.validate() {
            warn!("invalid MAC configuration: {:?}", e);
            return;
        }

        self.cfg = cfg;
        let now = self.clock.now_ms();

        match self.cfg.mac_type {
            MacType::AutoDecentralized => {
                info!("using decentralized slotted TDMA with peer autodiscovery");

                let blank = Slot::data(
                    BROADCAST_ID,
                    QUERY_DESTINATION_ID,
                    self.cfg.rate,
                    self.cfg.slot_seconds,
                    now,
                );
                self.blank = Some(self.slots.add(blank));

                let own = Slot::data(
                    self.cfg.modem_id,
                    QUERY_DESTINATION_ID,
                    self.cfg.rate,
                    self.cfg.slot_seconds,
                    now,
                );
                self.slots.add(own);

                self.slots.sort_by_src();
            }
            MacType::Polled | MacType::FixedDecentralized => {
                if self.cfg.mac_type == MacType::Polled {
                    info!("using the centralized polling scheme");
                } else {
                    info!("using decentralized slotted TDMA over the fixed cycle");
                }

                let cycle = self.cfg.cycle.clone();
                for slot in cycle {
                    self.slots.add(self.cfg.normalize(slot));
                }
            }
        }

        self.realign(now);

        if self.timer.active() {
            info!("first TDMA cycle begins at {} ms", self.next_slot_t);
        }

        self.started = true;
    }

    /// Stop the MAC: cancel any pending firing and forget the cycle.
    ///
    /// Idempotent; the manager returns to idle and may be started again.
    pub fn shutdown(&mut self) {
        self.timer.stop();
        self.slots.clear();
        self.current = 0;
        self.blank = None;
        self.started = false;
    }

    /// Poll the MAC. Fires at most one slot per call; a fire time already in
    /// the past fires immediately, so late polls catch up over subsequent
    /// calls.
    pub fn do_work(&mut self) -> Option<MacEvent> {
        if !self.started {
            return None;
        }

        let now = self.clock.now_ms();
        if !self.timer.poll(now) {
            return None;
        }

        self.fire_slot(now)
    }

    /// Liveness notification from the driver: a frame from `msg.src` was
    /// heard on the channel. In auto mode this admits unknown peers into the
    /// cycle and refreshes known ones; the other modes ignore it.
    pub fn handle_modem_incoming(&mut self, msg: &ModemMsgBase) {
        if !self.started || self.cfg.mac_type != MacType::AutoDecentralized {
            return;
        }

        let now = self.clock.now_ms();

        if self.slots.contains(msg.src) {
            trace!("heard known peer {}", msg.src);
            self.slots.touch(msg.src, now);
            return;
        }

        info!("discovered peer {}", msg.src);

        let slot = Slot::data(
            msg.src,
            QUERY_DESTINATION_ID,
            self.cfg.rate,
            self.cfg.slot_seconds,
            now,
        );
        self.slots.add(slot);
        self.slots.sort_by_src();

        self.realign(now);
    }

    /// Append a slot to the cycle and realign. Returns a stable handle to
    /// the new slot.
    pub fn add_slot(&mut self, slot: Slot) -> SlotHandle {
        let handle = self.slots.add(slot);

        if self.cfg.mac_type == MacType::AutoDecentralized {
            self.slots.sort_by_src();
        }

        let now = self.clock.now_ms();
        self.realign(now);

        handle
    }

    /// Remove the first slot equal to `slot` (liveness time ignored) and
    /// realign. Removing an absent slot returns false with no side effects.
    pub fn remove_slot(&mut self, slot: &Slot) -> bool {
        if !self.slots.remove_matching(slot) {
            return false;
        }

        debug!("removed slot src {} dest {}", slot.src, slot.dest);

        // the blank itself may have been removed
        if let Some(h) = self.blank {
            if self.slots.get(h).is_none() {
                self.blank = None;
            }
        }

        let now = self.clock.now_ms();
        self.realign(now);
        true
    }

    /// Peers currently holding slots, in cycle order
    pub fn cycle_order(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.slots.iter().map(|e| e.slot.src)
    }

    /// Total cycle duration in seconds
    pub fn cycle_length(&self) -> u32 {
        self.slots.cycle_length()
    }

    /// Whether a slot firing is pending
    pub fn active(&self) -> bool {
        self.timer.active()
    }

    /// Fire the slot under the cursor, then advance the schedule
    fn fire_slot(&mut self, now: Ts) -> Option<MacEvent> {
        if self.current >= self.slots.len() {
            self.current = 0;
        }

        let slot = match self.slots.get_index(self.current) {
            Some(s) => s.clone(),
            None => {
                self.timer.stop();
                return None;
            }
        };

        let transmit = match self.cfg.mac_type {
            MacType::FixedDecentralized | MacType::AutoDecentralized => {
                slot.src == self.cfg.modem_id
            }
            // the coordinator polls everyone, but stays quiet on broadcast
            MacType::Polled => slot.src != BROADCAST_ID,
        };

        debug!(
            "firing slot {} of {} (src {} dest {} {:?}) at {} ms",
            self.current + 1,
            self.slots.len(),
            slot.src,
            slot.dest,
            slot.kind,
            now
        );

        let event = if transmit {
            match slot.kind {
                SlotType::Data => Some(MacEvent::InitiateTransmission(ModemMsgBase {
                    src: slot.src,
                    dest: slot.dest,
                    rate: slot.rate,
                })),
                // ranging requests carry addressing only; the rate stays
                // clear
                SlotType::Ping => Some(MacEvent::InitiateRanging(ModemRangingRequest {
                    base: ModemMsgBase {
                        src: slot.src,
                        dest: slot.dest,
                        rate: 0,
                    },
                    kind: RangingType::TwoWayPing,
                })),
                SlotType::RemusLbl => Some(MacEvent::InitiateRanging(ModemRangingRequest {
                    base: ModemMsgBase {
                        src: slot.src,
                        dest: slot.dest,
                        rate: 0,
                    },
                    kind: RangingType::RemusLbl,
                })),
            }
        } else {
            None
        };

        self.current += 1;

        match self.cfg.mac_type {
            MacType::AutoDecentralized => {
                if self.expire_silent(now) {
                    // eviction realigned the whole cycle, nothing left to do
                    return event;
                }

                if self.current >= self.slots.len() {
                    self.cycles_since_day_start += 1;
                    debug!("cycles since day start: {}", self.cycles_since_day_start);
                    self.place_blank();
                }

                self.next_slot_t += self.cfg.slot_seconds as Ts * 1000;
                self.timer.restart(self.next_slot_t);
            }
            MacType::Polled | MacType::FixedDecentralized => {
                if self.current >= self.slots.len() {
                    self.current = 0;
                }

                self.next_slot_t += slot.slot_seconds as Ts * 1000;
                self.timer.restart(self.next_slot_t);
            }
        }

        event
    }

    /// Evict every peer silent for longer than `expire_cycles` cycles.
    /// Self and the blank slot are never evicted. Returns whether anything
    /// was removed (and so whether the cycle was realigned).
    fn expire_silent(&mut self, now: Ts) -> bool {
        let horizon = self.slots.cycle_length() as Ts * 1000 * self.cfg.expire_cycles as Ts;

        // collect first, delete after: never erase while iterating
        let mut expired: heapless::Vec<(SlotHandle, PeerId), MAX_SLOTS> = heapless::Vec::new();
        for e in self.slots.iter() {
            if e.slot.src != self.cfg.modem_id
                && e.slot.src != BROADCAST_ID
                && e.slot.last_heard_time + horizon < now
            {
                let _ = expired.push((e.handle, e.slot.src));
            }
        }

        if expired.is_empty() {
            return false;
        }

        for (handle, src) in &expired {
            info!(
                "removed peer {} after {} silent cycles",
                src, self.cfg.expire_cycles
            );
            self.slots.take(*handle);
        }

        self.realign(now);
        true
    }

    /// React to any change in cycle membership: realign the next fire time
    /// to the UTC cycle grid, re-place the blank slot, reset the cursor and
    /// re-arm the timer. An empty cycle stops the timer instead; the next
    /// admission restarts it.
    fn realign(&mut self, now: Ts) {
        if self.slots.cycle_length() == 0 {
            self.timer.stop();
            self.current = 0;
            return;
        }

        self.next_slot_t = self.next_cycle_start(now);
        debug!("next TDMA cycle begins at {} ms", self.next_slot_t);

        if self.cfg.mac_type == MacType::AutoDecentralized && self.slots.len() > 1 {
            self.place_blank();
        }

        self.current = 0;
        self.timer.restart(self.next_slot_t);
    }

    /// Absolute start of the next whole cycle, counted from today's UTC
    /// midnight. Also refreshes `cycles_since_day_start`.
    ///
    /// A backward wall-clock jump simply yields a (different) future
    /// instant; nothing fires retroactively.
    fn next_cycle_start(&mut self, now: Ts) -> Ts {
        let cycle_ms = self.slots.cycle_length() as Ts * 1000;
        let day_start = now - (now % DAY_MS);

        self.cycles_since_day_start = (now - day_start) / cycle_ms + 1;
        debug!("cycles since day start: {}", self.cycles_since_day_start);

        day_start + self.cycles_since_day_start * cycle_ms
    }

    /// Deterministically re-place the blank slot.
    ///
    /// Every peer computes the same position from shared state (the cycle
    /// count and the peer-set sum), so the blank lands in the same place
    /// everywhere. When the peer set changes the position shifts, which
    /// breaks the symmetry of two peers that joined in the same cycle and
    /// would otherwise collide forever.
    fn place_blank(&mut self) {
        let handle = match self.blank {
            Some(h) => h,
            None => return,
        };

        let len = self.slots.len();
        if len < 2 {
            self.current = 0;
            return;
        }

        let cycle_len = self.slots.cycle_length() as u64;
        let jitter =
            (self.cycles_since_day_start % ENTROPY == self.slots.cycle_sum() % ENTROPY) as u64;

        // keep the insert position inside the sequence whatever the slot
        // lengths are
        let pos = cycle_len
            .saturating_sub(jitter + 1)
            .min(len as u64 - 1) as usize;

        if let Some(entry) = self.slots.take(handle) {
            self.slots.insert_at(pos, entry);
        }

        self.current = 0;
        debug!("blank slot placed at index {}", pos);
    }
}
