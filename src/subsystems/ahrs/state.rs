//! Shared state between periodic tasks and the foreground loop
//!
//! Two kinds of state cross concurrency domains here, and both are
//! wrapped in a blocking mutex over a critical section so a reader can
//! never observe a half-updated triple:
//!
//! - [`SharedReadingSlot`]: one per sensor, written only by that sensor's
//!   sampling task and read only by the fusion task. The fusion task
//!   takes whatever snapshot is present, possibly a stale one from the
//!   previous sampler batch; freshness is approximate by design, atomicity
//!   is not.
//! - [`SharedEulerState`]: written by the fusion task, read by the
//!   foreground loop at any time.
//!
//! Both are `const`-constructible for static allocation.

use super::marg::EulerAngles;
use super::sampling::AveragedReading;
use core::cell::Cell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Single-writer/single-reader handoff slot for one sensor's latest
/// averaged reading.
pub struct SharedReadingSlot {
    inner: Mutex<CriticalSectionRawMutex, Cell<AveragedReading>>,
}

impl SharedReadingSlot {
    /// Create an empty slot (generation 0, never published).
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(AveragedReading::EMPTY)),
        }
    }

    /// Overwrite the slot with a freshly-averaged reading.
    pub fn publish(&self, reading: AveragedReading) {
        self.inner.lock(|cell| cell.set(reading));
    }

    /// Atomic snapshot of the current reading (possibly stale, never
    /// torn).
    pub fn snapshot(&self) -> AveragedReading {
        self.inner.lock(|cell| cell.get())
    }
}

impl Default for SharedReadingSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Euler output snapshot with an update counter.
#[derive(Debug, Clone, Copy)]
pub struct EulerOutput {
    /// Most recently completed fusion result, radians.
    pub angles: EulerAngles,

    /// Completed fusion cycles; 0 until the first one.
    pub generation: u32,
}

/// Orientation output shared with the foreground loop.
///
/// `get_roll`/`get_pitch`/`get_yaw` are safe to call from the foreground
/// at any time and reflect the most recently completed fusion cycle.
pub struct SharedEulerState {
    inner: Mutex<CriticalSectionRawMutex, Cell<EulerOutput>>,
}

impl SharedEulerState {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(EulerOutput {
                angles: EulerAngles::ZERO,
                generation: 0,
            })),
        }
    }

    /// Publish the angles from a completed fusion cycle.
    pub fn publish(&self, angles: EulerAngles) {
        self.inner.lock(|cell| {
            let mut out = cell.get();
            out.angles = angles;
            out.generation = out.generation.wrapping_add(1);
            cell.set(out);
        });
    }

    /// Atomic snapshot of angles plus generation.
    pub fn read(&self) -> EulerOutput {
        self.inner.lock(|cell| cell.get())
    }

    /// Roll in radians.
    pub fn get_roll(&self) -> f64 {
        self.read().angles.roll
    }

    /// Pitch in radians.
    pub fn get_pitch(&self) -> f64 {
        self.read().angles.pitch
    }

    /// Yaw in radians.
    pub fn get_yaw(&self) -> f64 {
        self.read().angles.yaw
    }

    /// Completed fusion cycles so far.
    pub fn generation(&self) -> u32 {
        self.read().generation
    }
}

impl Default for SharedEulerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn slot_starts_unpublished() {
        let slot = SharedReadingSlot::new();
        assert!(!slot.snapshot().is_published());
    }

    #[test]
    fn slot_overwrites_and_snapshots_whole_reading() {
        let slot = SharedReadingSlot::new();

        slot.publish(AveragedReading {
            values: Vector3::new(1.0, 2.0, 3.0),
            generation: 1,
        });
        slot.publish(AveragedReading {
            values: Vector3::new(-4.0, 5.0, -6.0),
            generation: 2,
        });

        let reading = slot.snapshot();
        assert_eq!(reading.generation, 2);
        assert_eq!(reading.values, Vector3::new(-4.0, 5.0, -6.0));
    }

    #[test]
    fn repeated_snapshots_return_same_reading() {
        // The reader may observe the same (stale) batch more than once;
        // that is the accepted trade-off.
        let slot = SharedReadingSlot::new();
        slot.publish(AveragedReading {
            values: Vector3::new(0.5, 0.5, 0.5),
            generation: 7,
        });

        assert_eq!(slot.snapshot().generation, 7);
        assert_eq!(slot.snapshot().generation, 7);
    }

    #[test]
    fn euler_state_starts_at_zero() {
        let state = SharedEulerState::new();

        assert_eq!(state.get_roll(), 0.0);
        assert_eq!(state.get_pitch(), 0.0);
        assert_eq!(state.get_yaw(), 0.0);
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn euler_state_publishes_and_counts_cycles() {
        let state = SharedEulerState::new();

        state.publish(EulerAngles {
            roll: 0.1,
            pitch: -0.2,
            yaw: 0.3,
        });
        state.publish(EulerAngles {
            roll: 0.4,
            pitch: 0.5,
            yaw: -0.6,
        });

        assert_eq!(state.get_roll(), 0.4);
        assert_eq!(state.get_pitch(), 0.5);
        assert_eq!(state.get_yaw(), -0.6);
        assert_eq!(state.generation(), 2);
    }
}
