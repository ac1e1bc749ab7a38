//! Simulated links and virtual time.
//!
//! - [`ManualClock`]     : virtual time, advanced only by `sleep`.
//! - [`ScriptedLink`]    : replays a fixed byte feed, one step per poll.
//! - [`SimulatedDevice`] : models the firmware's reaction to frames and
//!                         decisions, for demos and end-to-end tests.
//! - [`RecordingSink`]   : keeps every status event for inspection.
//!
//! None of these touch real hardware or wall-clock time.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use pulse_protocol::{decode_echo, StatusCode, FRAME_LEN};

use crate::clock::Clock;
use crate::coordinate::Coordinate;
use crate::error::TransportError;
use crate::operator::{SessionEvent, StatusSink};
use crate::transport::Transport;

// ============================================================================
// Virtual time
// ============================================================================

/// A clock that only moves when someone sleeps on it.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
    sleeps: Cell<u64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: Cell::new(0),
        }
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    /// Number of `sleep` calls so far.
    pub fn sleeps(&self) -> u64 {
        self.sleeps.get()
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

// ============================================================================
// Scripted byte feed
// ============================================================================

/// Replays a scripted device: each call to `bytes_available` delivers the
/// next step of the feed (possibly nothing) into the receive buffer.
///
/// `discard_input_buffer` only drops bytes already delivered; steps that
/// have not "arrived" yet survive it.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    feed: VecDeque<Vec<u8>>,
    rx: VecDeque<u8>,
    written: Vec<u8>,
    discards: usize,
    fail_writes: bool,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next poll delivers `bytes`.
    pub fn then_bytes(mut self, bytes: &[u8]) -> Self {
        self.feed.push_back(bytes.to_vec());
        self
    }

    /// Next `polls` polls deliver nothing.
    pub fn then_silence(mut self, polls: usize) -> Self {
        self.feed.extend(std::iter::repeat(Vec::new()).take(polls));
        self
    }

    /// Next `polls` polls deliver one `status` byte each.
    pub fn then_status(mut self, status: StatusCode, polls: usize) -> Self {
        self.feed
            .extend(std::iter::repeat(vec![status.as_u8()]).take(polls));
        self
    }

    /// Every write fails as if the cable were pulled.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Everything the host wrote, in order.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn discards(&self) -> usize {
        self.discards
    }

    /// Steps not yet delivered.
    pub fn pending_steps(&self) -> usize {
        self.feed.len()
    }
}

impl Transport for ScriptedLink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::Disconnected);
        }
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        if let Some(step) = self.feed.pop_front() {
            self.rx.extend(step);
        }
        Ok(self.rx.len())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn discard_input_buffer(&mut self) -> Result<(), TransportError> {
        self.rx.clear();
        self.discards += 1;
        Ok(())
    }
}

// ============================================================================
// Firmware model
// ============================================================================

/// Largest number of unread bytes the simulated device buffers.
const DEVICE_TX_CAPACITY: usize = 64;

/// Pulses generated per poll tick while the device is busy.
pub const DEFAULT_PULSES_PER_TICK: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    AwaitingDecision(Coordinate),
    Generating { remaining_ticks: u32 },
}

/// Behaves like the pulse generator firmware, one loop iteration per poll.
///
/// - idle: emits `Waiting`; a complete 4-byte frame is echoed back,
///   a partial one is flushed;
/// - after an echo: `Ack` starts generation (`Generating` once, then
///   `Success` or `Error` after a number of ticks that grows with the
///   larger coordinate); `Nak` or anything else returns to idle.
#[derive(Debug)]
pub struct SimulatedDevice {
    state: DeviceState,
    from_host: VecDeque<u8>,
    to_host: VecDeque<u8>,
    written: Vec<u8>,
    pulses_per_tick: u32,
    fail_generation: bool,
    echo_offset: u16,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            state: DeviceState::Idle,
            from_host: VecDeque::new(),
            to_host: VecDeque::new(),
            written: Vec::new(),
            pulses_per_tick: DEFAULT_PULSES_PER_TICK,
            fail_generation: false,
            echo_offset: 0,
        }
    }

    pub fn with_pulses_per_tick(mut self, pulses_per_tick: u32) -> Self {
        self.pulses_per_tick = pulses_per_tick.max(1);
        self
    }

    /// Report `Error` instead of `Success` at the end of generation.
    pub fn failing_generation(mut self) -> Self {
        self.fail_generation = true;
        self
    }

    /// Echo `x + offset` instead of `x`, like a garbled line would.
    pub fn with_echo_offset(mut self, offset: u16) -> Self {
        self.echo_offset = offset;
        self
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Everything the host wrote, in order.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    fn emit(&mut self, byte: u8) {
        if self.to_host.len() < DEVICE_TX_CAPACITY {
            self.to_host.push_back(byte);
        }
    }

    fn generation_ticks(&self, c: Coordinate) -> u32 {
        1 + u32::from(c.x().max(c.y())) / self.pulses_per_tick
    }

    fn tick(&mut self) {
        match self.state {
            DeviceState::Idle => {
                if self.from_host.len() == FRAME_LEN {
                    let frame: Vec<u8> = self.from_host.drain(..).collect();
                    if let Ok((x, y)) = decode_echo(&frame) {
                        let received = Coordinate::from_pair(x, y);
                        let echoed = Coordinate::from_pair(x.wrapping_add(self.echo_offset), y);
                        for byte in echoed.to_frame().as_bytes() {
                            self.emit(*byte);
                        }
                        self.state = DeviceState::AwaitingDecision(received);
                    }
                } else {
                    self.from_host.clear();
                    self.emit(StatusCode::WAITING);
                }
            }
            DeviceState::AwaitingDecision(coordinate) => {
                if let Some(byte) = self.from_host.pop_front() {
                    self.from_host.clear();
                    self.state = match StatusCode::from_u8(byte) {
                        StatusCode::Ack => {
                            self.emit(StatusCode::GENERATING);
                            DeviceState::Generating {
                                remaining_ticks: self.generation_ticks(coordinate),
                            }
                        }
                        _ => DeviceState::Idle,
                    };
                }
            }
            DeviceState::Generating { remaining_ticks } => {
                if remaining_ticks == 0 {
                    let status = if self.fail_generation {
                        StatusCode::ERROR
                    } else {
                        StatusCode::SUCCESS
                    };
                    self.emit(status);
                    self.state = DeviceState::Idle;
                } else {
                    self.state = DeviceState::Generating {
                        remaining_ticks: remaining_ticks - 1,
                    };
                }
            }
        }
    }
}

impl Transport for SimulatedDevice {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.written.extend_from_slice(bytes);
        self.from_host.extend(bytes.iter().copied());
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        self.tick();
        Ok(self.to_host.len())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = buf.len().min(self.to_host.len());
        for (slot, byte) in buf.iter_mut().zip(self.to_host.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn discard_input_buffer(&mut self) -> Result<(), TransportError> {
        self.to_host.clear();
        Ok(())
    }
}

// ============================================================================
// Status recording
// ============================================================================

/// Collects every status event.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<SessionEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl StatusSink for RecordingSink {
    fn notify(&mut self, event: &SessionEvent) {
        self.events.push(event.clone());
    }
}
