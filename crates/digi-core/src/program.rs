//! Single-field synchronization between a settings record and a device.
//!
//! A [`Register`] pairs a setter and a getter on the [`Digitizer`] trait.
//! [`synchronize`] drives one register in a given [`Direction`]: when
//! writing, the caller's value is pushed to the device; when reading, the
//! device's value replaces the caller's.
//!
//! Device errors never escape from here. A failed accessor is logged with the
//! device identity, the direction, the accessor and (when writing) the
//! attempted value, and the caller's value is left untouched, so one bad
//! register cannot abort a configuration pass.

use std::fmt;

use tracing::{error, trace};

use crate::device::Digitizer;
use crate::error::DeviceResult;

/// Which side of a register pair is invoked, and which side is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device state is pulled into the settings record.
    Reading,
    /// Settings record values are pushed to the device.
    Writing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Reading => write!(f, "reading"),
            Direction::Writing => write!(f, "writing"),
        }
    }
}

/// Setter half of a register pair.
pub type WriteFn<T> = fn(&mut dyn Digitizer, T) -> DeviceResult<()>;
/// Getter half of a register pair.
pub type ReadFn<T> = fn(&mut dyn Digitizer) -> DeviceResult<T>;

/// A named setter/getter pair on a digitizer.
pub struct Register<T> {
    name: &'static str,
    write: WriteFn<T>,
    read: ReadFn<T>,
}

impl<T> Register<T> {
    /// Bind a setting name to its accessor pair.
    pub const fn new(name: &'static str, write: WriteFn<T>, read: ReadFn<T>) -> Self {
        Self { name, write, read }
    }

    /// Name of the setting this register programs.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls: the derives would require `T: Clone`.
impl<T> Clone for Register<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Register<T> {}

impl<T> fmt::Debug for Register<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Register").field("name", &self.name).finish()
    }
}

/// Result of synchronizing one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The accessor was called and succeeded.
    Applied,
    /// No device access was needed (unset optional while writing).
    Skipped,
    /// The accessor failed; the error has been logged.
    Failed,
}

/// Synchronize one value with the device.
///
/// On failure the error is logged and `value` keeps its previous contents.
pub fn synchronize<T>(
    device: &mut dyn Digitizer,
    register: &Register<T>,
    value: &mut T,
    direction: Direction,
) -> FieldOutcome
where
    T: Copy + fmt::Debug,
{
    let result = match direction {
        Direction::Writing => (register.write)(device, *value),
        Direction::Reading => (register.read)(device).map(|read| *value = read),
    };

    match result {
        Ok(()) => {
            trace!(field = register.name, %direction, value = ?value, "Field synchronized");
            FieldOutcome::Applied
        }
        Err(err) => {
            let info = device.info();
            match direction {
                Direction::Writing => error!(
                    model = %info.model_name,
                    serial = info.serial_number,
                    %direction,
                    field = register.name,
                    accessor = err.accessor,
                    value = ?value,
                    error = %err,
                    "Communication with digitizer failed"
                ),
                Direction::Reading => error!(
                    model = %info.model_name,
                    serial = info.serial_number,
                    %direction,
                    field = register.name,
                    accessor = err.accessor,
                    error = %err,
                    "Communication with digitizer failed"
                ),
            }
            FieldOutcome::Failed
        }
    }
}

/// Synchronize a field the configuration may leave unset.
///
/// - set: behaves like [`synchronize`] in both directions.
/// - unset, writing: no device access, the hardware keeps its value.
/// - unset, reading: the device value is read and the field becomes set.
///
/// Writing never changes whether the field is set. A failed read leaves an
/// unset field unset.
pub fn synchronize_optional<T>(
    device: &mut dyn Digitizer,
    register: &Register<T>,
    value: &mut Option<T>,
    direction: Direction,
) -> FieldOutcome
where
    T: Copy + fmt::Debug + Default,
{
    if let Some(current) = value.as_mut() {
        return synchronize(device, register, current, direction);
    }

    match direction {
        Direction::Writing => {
            trace!(field = register.name, "Field not configured, leaving hardware value");
            FieldOutcome::Skipped
        }
        Direction::Reading => {
            let mut read = T::default();
            let outcome = synchronize(device, register, &mut read, direction);
            if outcome == FieldOutcome::Applied {
                *value = Some(read);
            }
            outcome
        }
    }
}
