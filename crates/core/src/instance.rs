//! Sensor instance identifiers and per-instance storage.
//!
//! Accelerometer and gyroscope instances are numbered independently, each
//! from zero. [`InstanceSlots`] is the fixed-capacity arena that hands out
//! those numbers and stores per-instance data behind a bounds-checked
//! [`InstanceId`].

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use heapless::Vec;

/// Maximum number of instances of each sensor kind.
pub const MAX_INSTANCES: usize = 3;

/// Kind of inertial sensor an instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    Accel,
    Gyro,
}

/// Index of an accelerometer or gyroscope instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InstanceId(u8);

impl InstanceId {
    /// Instance id for `index`, or `None` past [`MAX_INSTANCES`].
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_INSTANCES {
            Some(Self(index))
        } else {
            None
        }
    }

    /// The primary instance before any arbitration has happened.
    pub const FIRST: InstanceId = InstanceId(0);

    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from instance registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Every slot of this sensor kind is taken
    Full(SensorKind),
    /// No instance of this kind was registered under the id
    Unregistered(SensorKind, InstanceId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Full(kind) => {
                write!(f, "no free {:?} instance (max {})", kind, MAX_INSTANCES)
            }
            RegistryError::Unregistered(kind, id) => {
                write!(f, "{:?} instance {} is not registered", kind, id)
            }
        }
    }
}

/// Fixed-capacity arena indexed by [`InstanceId`].
///
/// Slots are only ever appended, so an id stays valid for the arena's
/// lifetime.
pub struct InstanceSlots<T> {
    slots: Vec<T, MAX_INSTANCES>,
}

impl<T> InstanceSlots<T> {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Store `value` in the next free slot and return its id.
    ///
    /// Gives the value back when the arena is full.
    pub fn push(&mut self, value: T) -> Result<InstanceId, T> {
        let index = self.slots.len() as u8;
        let id = match InstanceId::new(index) {
            Some(id) => id,
            None => return Err(value),
        };
        self.slots.push(value)?;
        Ok(id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&T> {
        self.slots.get(id.index() as usize)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut T> {
        self.slots.get_mut(id.index() as usize)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate `(id, value)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, value)| (InstanceId(i as u8), value))
    }
}

impl<T> Default for InstanceSlots<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a sensor instance.
///
/// `Active` → `Killed` is the only transition. A killed instance ignores
/// every sample and every publish request for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Lifecycle {
    Active = 0,
    Killed = 1,
}

/// Atomically shared [`Lifecycle`] readable from producer and consumer
/// contexts without taking the backend lock.
///
/// Only load/store are used so the flag works on targets without
/// compare-and-swap.
pub struct LifecycleFlag {
    state: AtomicU8,
}

impl LifecycleFlag {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(Lifecycle::Active as u8),
        }
    }

    pub fn get(&self) -> Lifecycle {
        match self.state.load(Ordering::Acquire) {
            0 => Lifecycle::Active,
            _ => Lifecycle::Killed,
        }
    }

    pub fn is_killed(&self) -> bool {
        self.get() == Lifecycle::Killed
    }

    /// Move to `Killed`. Returns `true` on the call that made the transition.
    pub fn kill(&self) -> bool {
        let was_active = !self.is_killed();
        self.state.store(Lifecycle::Killed as u8, Ordering::Release);
        was_active
    }
}

impl Default for LifecycleFlag {
    fn default() -> Self {
        Self::new()
    }
}
