//! Per-PID continuity, transport error and PCR statistics.
//!
//! The continuity counter of a PID advances by one (modulo 16) on each packet carrying a
//! payload.  A packet without payload repeats the previous value, and so may a single
//! duplicate packet with payload, although this tracker counts a duplicate with payload as an
//! error.  Any other step is a continuity error, unless the packet's adaptation field sets
//! `discontinuity_indicator`, which restarts tracking for the PID.
//!
//! Counters are held behind a mutex shared with [`IntegrityView`](struct.IntegrityView.html)
//! handles, so that another thread can read them while packets are observed.

use crate::packet::{ClockRef, Pid, TsPacket};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Options for integrity tracking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A PCR step larger than this many 27MHz ticks, in either direction, raises
    /// `IntegrityEvent::PcrJump`
    pub pcr_jump_threshold: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            // 100ms
            pcr_jump_threshold: 2_700_000,
        }
    }
}

/// Something noteworthy observed in a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IntegrityEvent {
    /// The continuity counter did not advance as expected
    ContinuityError { pid: Pid, previous: u8, actual: u8 },
    /// `transport_error_indicator` was set
    TransportError { pid: Pid },
    /// The PCR moved by more than the configured threshold; `delta` is in 27MHz ticks
    PcrJump { pid: Pid, delta: i64 },
}

/// Counters for a single PID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PidIntegrityState {
    pub pid: Pid,
    pub packet_count: u64,
    pub last_cc: Option<u8>,
    /// continuity errors since tracking began
    pub cc_errors: u64,
    /// continuity errors in the current period
    pub period_cc_errors: u64,
    pub tei_count: u64,
    /// last PCR seen, in 27MHz ticks
    pub last_pcr: Option<u64>,
    /// the signed PCR step of largest magnitude in the current period
    pub max_pcr_delta: Option<i64>,
}

impl PidIntegrityState {
    fn new(pid: Pid) -> PidIntegrityState {
        PidIntegrityState {
            pid,
            packet_count: 0,
            last_cc: None,
            cc_errors: 0,
            period_cc_errors: 0,
            tei_count: 0,
            last_pcr: None,
            max_pcr_delta: None,
        }
    }

    fn check_continuity(&mut self, cc: u8, has_payload: bool) -> Option<IntegrityEvent> {
        let previous = self.last_cc.replace(cc)?;
        let ok = if previous == cc {
            !has_payload
        } else {
            (previous + 1) & 0b1111 == cc
        };
        if ok {
            return None;
        }
        self.cc_errors += 1;
        self.period_cc_errors += 1;
        Some(IntegrityEvent::ContinuityError {
            pid: self.pid,
            previous,
            actual: cc,
        })
    }

    fn check_pcr(&mut self, pcr: u64, threshold: u64) -> Option<IntegrityEvent> {
        let previous = self.last_pcr.replace(pcr)?;
        let delta = pcr_delta(previous, pcr);
        if self.max_pcr_delta.map_or(true, |max| delta.abs() > max.abs()) {
            self.max_pcr_delta = Some(delta);
        }
        if delta.unsigned_abs() > threshold {
            Some(IntegrityEvent::PcrJump {
                pid: self.pid,
                delta,
            })
        } else {
            None
        }
    }
}

/// Signed difference `current - previous` between two 27MHz PCR values, taking the shorter way
/// around the clock's wrap point.
pub fn pcr_delta(previous: u64, current: u64) -> i64 {
    let forward = (current + ClockRef::MODULUS - previous % ClockRef::MODULUS) % ClockRef::MODULUS;
    if forward > ClockRef::MODULUS / 2 {
        forward as i64 - ClockRef::MODULUS as i64
    } else {
        forward as i64
    }
}

type StateMap = BTreeMap<Pid, PidIntegrityState>;

/// Read access to the counters maintained by a `PidIntegrityTracker`.
#[derive(Clone, Default)]
pub struct IntegrityView {
    states: Arc<Mutex<StateMap>>,
}

impl IntegrityView {
    fn lock(&self) -> MutexGuard<'_, StateMap> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies of the counters of every PID seen so far, ordered by PID.
    pub fn snapshot(&self) -> Vec<PidIntegrityState> {
        self.lock().values().cloned().collect()
    }

    pub fn state(&self, pid: Pid) -> Option<PidIntegrityState> {
        self.lock().get(&pid).cloned()
    }

    /// Sum of `cc_errors` over all PIDs.
    pub fn total_cc_errors(&self) -> u64 {
        self.lock().values().map(|s| s.cc_errors).sum()
    }

    /// Returns the counters for the period just ended, then clears the per-period counters
    /// of every PID.
    pub fn roll_period(&self) -> Vec<PidIntegrityState> {
        let mut states = self.lock();
        let closing = states.values().cloned().collect();
        for state in states.values_mut() {
            state.period_cc_errors = 0;
            state.max_pcr_delta = None;
        }
        closing
    }
}

/// Checks the packets of every PID for continuity counter errors, transport errors and PCR
/// jumps.  The null PID is ignored.
pub struct PidIntegrityTracker {
    config: TrackerConfig,
    view: IntegrityView,
}

impl PidIntegrityTracker {
    pub fn new(config: TrackerConfig) -> PidIntegrityTracker {
        PidIntegrityTracker {
            config,
            view: IntegrityView::default(),
        }
    }

    /// A handle on the counters, usable from other threads.
    pub fn view(&self) -> IntegrityView {
        self.view.clone()
    }

    /// Updates the counters of the packet's PID, returning any events it caused.
    pub fn observe(&mut self, pk: &TsPacket) -> Vec<IntegrityEvent> {
        if pk.pid == Pid::NULL {
            return Vec::new();
        }
        let discontinuity = !pk.transport_error_indicator && pk.discontinuity_indicator();
        let events = self.update(pk, discontinuity);
        // logged once the lock is released
        if discontinuity {
            debug!("discontinuity_indicator set on {:?}", pk.pid);
        }
        for event in &events {
            match event {
                IntegrityEvent::TransportError { pid } => {
                    warn!("transport_error_indicator set on {:?}", pid)
                }
                _ => debug!("{:?}", event),
            }
        }
        events
    }

    fn update(&self, pk: &TsPacket, discontinuity: bool) -> Vec<IntegrityEvent> {
        let mut events = Vec::new();
        let mut states = self.view.lock();
        let state = states
            .entry(pk.pid)
            .or_insert_with(|| PidIntegrityState::new(pk.pid));
        state.packet_count += 1;
        if pk.transport_error_indicator {
            state.tei_count += 1;
            events.push(IntegrityEvent::TransportError { pid: pk.pid });
            return events;
        }
        if discontinuity {
            state.last_cc = None;
            state.last_pcr = None;
        }
        let cc = pk.continuity_counter.count();
        events.extend(state.check_continuity(cc, pk.adaptation_control.has_payload()));
        if let Some(pcr) = pk.pcr() {
            events.extend(state.check_pcr(u64::from(pcr), self.config.pcr_jump_threshold));
        }
        events
    }

    pub fn snapshot(&self) -> Vec<PidIntegrityState> {
        self.view.snapshot()
    }

    pub fn state(&self, pid: Pid) -> Option<PidIntegrityState> {
        self.view.state(pid)
    }

    pub fn roll_period(&self) -> Vec<PidIntegrityState> {
        self.view.roll_period()
    }
}

impl Default for PidIntegrityTracker {
    fn default() -> Self {
        PidIntegrityTracker::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::packet::test::make_packet;
    use assert_matches::assert_matches;

    const PID: u16 = 0x100;

    fn payload_packet(cc: u8) -> TsPacket {
        TsPacket::parse(&make_packet(PID, cc, false, &[])).unwrap()
    }

    /// A packet with an adaptation field holding `flags` and, if given, a PCR.
    fn af_packet(cc: u8, flags: u8, pcr: Option<(u64, u16)>, payload: bool) -> TsPacket {
        let mut buf = make_packet(PID, cc, false, &[]);
        buf[3] = (if payload { 0b0011_0000 } else { 0b0010_0000 }) | cc;
        buf[4] = if payload { 7 } else { 183 };
        buf[5] = flags;
        if let Some((base, ext)) = pcr {
            buf[5] |= 0b1_0000;
            buf[6] = (base >> 25) as u8;
            buf[7] = (base >> 17) as u8;
            buf[8] = (base >> 9) as u8;
            buf[9] = (base >> 1) as u8;
            buf[10] = ((base & 1) as u8) << 7 | 0b0111_1110 | (ext >> 8) as u8;
            buf[11] = ext as u8;
        }
        TsPacket::parse(&buf).unwrap()
    }

    fn feed(tracker: &mut PidIntegrityTracker, packets: &[TsPacket]) -> Vec<IntegrityEvent> {
        packets.iter().flat_map(|pk| tracker.observe(pk)).collect()
    }

    #[test]
    fn gap_is_one_error() {
        let mut tracker = PidIntegrityTracker::default();
        let packets: Vec<_> = [0, 1, 2, 4].iter().map(|&cc| payload_packet(cc)).collect();
        let events = feed(&mut tracker, &packets);
        assert_eq!(
            events,
            vec![IntegrityEvent::ContinuityError {
                pid: Pid::new(PID),
                previous: 2,
                actual: 4
            }]
        );
        let state = tracker.state(Pid::new(PID)).unwrap();
        assert_eq!(state.cc_errors, 1);
        assert_eq!(state.packet_count, 4);
        assert_eq!(state.last_cc, Some(4));
    }

    #[test]
    fn wrap_is_not_an_error() {
        let mut tracker = PidIntegrityTracker::default();
        let packets: Vec<_> = (0..16).chain(0..1).map(payload_packet).collect();
        assert!(feed(&mut tracker, &packets).is_empty());
        assert_eq!(tracker.state(Pid::new(PID)).unwrap().cc_errors, 0);
    }

    #[test]
    fn wrap_to_wrong_value() {
        let mut tracker = PidIntegrityTracker::default();
        let events = feed(&mut tracker, &[payload_packet(15), payload_packet(3)]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn duplicate_with_payload() {
        let mut tracker = PidIntegrityTracker::default();
        let events = feed(&mut tracker, &[payload_packet(3), payload_packet(3)]);
        assert_eq!(events.len(), 1);
        assert_eq!(tracker.state(Pid::new(PID)).unwrap().cc_errors, 1);
    }

    #[test]
    fn duplicate_without_payload() {
        let mut tracker = PidIntegrityTracker::default();
        let events = feed(
            &mut tracker,
            &[
                payload_packet(3),
                af_packet(3, 0, None, false),
                payload_packet(4),
            ],
        );
        assert!(events.is_empty());
        assert_eq!(tracker.state(Pid::new(PID)).unwrap().cc_errors, 0);
    }

    #[test]
    fn discontinuity_indicator_restarts_tracking() {
        let mut tracker = PidIntegrityTracker::default();
        let events = feed(
            &mut tracker,
            &[payload_packet(3), af_packet(9, 0b1000_0000, None, true), payload_packet(10)],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn transport_errors_are_counted() {
        let mut tracker = PidIntegrityTracker::default();
        let mut buf = make_packet(PID, 7, false, &[]);
        buf[1] |= 0b1000_0000;
        let damaged = TsPacket::parse(&buf).unwrap();
        let events = feed(&mut tracker, &[payload_packet(0), damaged, payload_packet(1)]);
        assert_eq!(events, vec![IntegrityEvent::TransportError { pid: Pid::new(PID) }]);
        let state = tracker.state(Pid::new(PID)).unwrap();
        assert_eq!(state.tei_count, 1);
        assert_eq!(state.cc_errors, 0);
        assert_eq!(state.packet_count, 3);
    }

    #[test]
    fn null_packets_are_ignored() {
        let mut tracker = PidIntegrityTracker::default();
        let null = TsPacket::parse(&make_packet(0x1fff, 0, false, &[])).unwrap();
        assert!(feed(&mut tracker, &[null.clone(), null]).is_empty());
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn pcr_delta_wraps() {
        assert_eq!(pcr_delta(100, 400), 300);
        assert_eq!(pcr_delta(400, 100), -300);
        assert_eq!(pcr_delta(ClockRef::MODULUS - 10, 20), 30);
        assert_eq!(pcr_delta(20, ClockRef::MODULUS - 10), -30);
    }

    #[test]
    fn pcr_tracking() {
        let mut tracker = PidIntegrityTracker::new(TrackerConfig {
            pcr_jump_threshold: 9_000 * 300,
        });
        let events = feed(
            &mut tracker,
            &[
                af_packet(0, 0, Some((1_000, 0)), true),
                af_packet(1, 0, Some((4_600, 0)), true),
                af_packet(2, 0, Some((4_000, 150)), true),
                af_packet(3, 0, Some((20_000, 0)), true),
            ],
        );
        assert_eq!(events.len(), 1);
        assert_matches!(events[0], IntegrityEvent::PcrJump { delta, .. } => {
            assert_eq!(delta, 16_000 * 300 - 150);
        });
        let state = tracker.state(Pid::new(PID)).unwrap();
        assert_eq!(state.last_pcr, Some(20_000 * 300));
        assert_eq!(state.max_pcr_delta, Some(16_000 * 300 - 150));

        let closing = tracker.roll_period();
        assert_eq!(closing[0].max_pcr_delta, Some(16_000 * 300 - 150));
        assert_eq!(tracker.state(Pid::new(PID)).unwrap().max_pcr_delta, None);

        // a backwards step is reported with its sign
        feed(&mut tracker, &[af_packet(4, 0, Some((19_000, 0)), true)]);
        assert_eq!(
            tracker.state(Pid::new(PID)).unwrap().max_pcr_delta,
            Some(-1_000 * 300)
        );
    }

    #[test]
    fn period_counters_roll() {
        let mut tracker = PidIntegrityTracker::default();
        let view = tracker.view();
        feed(&mut tracker, &[payload_packet(0), payload_packet(5)]);
        let closing = view.roll_period();
        assert_eq!(closing[0].period_cc_errors, 1);
        let state = view.state(Pid::new(PID)).unwrap();
        assert_eq!(state.period_cc_errors, 0);
        assert_eq!(state.cc_errors, 1);
        assert_eq!(view.total_cc_errors(), 1);
    }

    #[test]
    fn events_serialise() {
        let event = IntegrityEvent::ContinuityError {
            pid: Pid::new(0x100),
            previous: 2,
            actual: 4,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"continuity_error","pid":256,"previous":2,"actual":4}"#
        );
    }

    #[test]
    fn lock_released_before_events_are_logged() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut tracker = PidIntegrityTracker::default();
        let mut damaged = make_packet(PID, 7, false, &[]);
        damaged[1] |= 0b1000_0000;
        let packets = [
            payload_packet(0),
            payload_packet(5),
            TsPacket::parse(&damaged).unwrap(),
        ];
        for pk in &packets {
            tracker.observe(pk);
            assert!(tracker.view.states.try_lock().is_ok());
        }
        assert_eq!(tracker.state(Pid::new(PID)).unwrap().tei_count, 1);
    }
}
