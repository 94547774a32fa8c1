//! Channel enable masks: per-channel vectors vs packed bitmasks.
//!
//! The configuration expresses channel enables one channel at a time as a
//! vector of `Option<bool>` (unset = no opinion). Boards take a packed `u32`
//! instead, either one bit per channel or, on grouped boards, one bit per
//! contiguous group of channels.
//!
//! Group count conventions: `groups <= 1` means ungrouped (one bit per
//! channel), and `groups == channels` is the same thing spelled out. Bits at
//! index 32 and above cannot be represented and are dropped.
//!
//! Going from channels to groups is lossy. A group bit is the OR of the
//! channels it covers, so a group with one enabled and one disabled channel
//! comes back from the board with both enabled. [`check_group_consistency`]
//! detects that case so the caller can warn; the group mask is programmed
//! regardless.

use tracing::{error, warn};

use crate::device::Digitizer;
use crate::program::{synchronize, Direction, FieldOutcome, ReadFn, Register, WriteFn};

/// Number of consecutive channels covered by one mask bit.
pub fn channels_per_group(channels: usize, groups: u32) -> usize {
    if groups <= 1 {
        1
    } else {
        channels.div_ceil(groups as usize).max(1)
    }
}

/// Single mask bit for `index`, 0 when it does not fit into 32 bits.
fn bit(index: usize) -> u32 {
    u32::try_from(index)
        .ok()
        .and_then(|i| 1u32.checked_shl(i))
        .unwrap_or(0)
}

/// Pack a per-channel enable vector into a mask with `groups` granularity.
///
/// A group bit is set when any channel in the group is explicitly enabled.
pub fn channels_to_mask(channels: &[Option<bool>], groups: u32) -> u32 {
    let per_group = channels_per_group(channels.len(), groups);
    channels
        .iter()
        .enumerate()
        .filter(|(_, enabled)| **enabled == Some(true))
        .fold(0, |mask, (channel, _)| mask | bit(channel / per_group))
}

/// Expand a mask with `groups` granularity into the per-channel vector.
///
/// Every channel becomes set; channels of one group share the group's bit.
pub fn mask_to_channels(mask: u32, channels: &mut [Option<bool>], groups: u32) {
    let per_group = channels_per_group(channels.len(), groups);
    for (channel, enabled) in channels.iter_mut().enumerate() {
        *enabled = Some(mask & bit(channel / per_group) != 0);
    }
}

/// Outcome of comparing group-granularity and channel-granularity masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskCheck {
    /// Mask at the device's group granularity; this is what gets programmed.
    pub group_mask: u32,
    /// Mask at full channel granularity.
    pub channel_mask: u32,
    /// Whether `group_mask` enables exactly the channels the vector enables.
    pub exact: bool,
}

/// Check whether the per-channel intent survives group granularity.
///
/// The comparison is done channel by channel after expanding the group mask,
/// which is what comparing the two masks at channel granularity means, and
/// stays correct for boards with more than 32 channels.
pub fn check_group_consistency(channels: &[Option<bool>], groups: u32) -> MaskCheck {
    let group_mask = channels_to_mask(channels, groups);
    let channel_mask = channels_to_mask(channels, u32::try_from(channels.len()).unwrap_or(u32::MAX));
    let per_group = channels_per_group(channels.len(), groups);
    let exact = channels.iter().enumerate().all(|(channel, enabled)| {
        (*enabled == Some(true)) == (group_mask & bit(channel / per_group) != 0)
    });

    MaskCheck {
        group_mask,
        channel_mask,
        exact,
    }
}

/// Channel-enable and group-enable accessor pairs for one mask setting.
#[derive(Debug, Clone, Copy)]
pub struct MaskRegister {
    name: &'static str,
    channel: Register<u32>,
    group: Register<u32>,
}

impl MaskRegister {
    /// Bind a mask setting to its per-channel and per-group accessor pairs.
    pub const fn new(
        name: &'static str,
        channel_write: WriteFn<u32>,
        channel_read: ReadFn<u32>,
        group_write: WriteFn<u32>,
        group_read: ReadFn<u32>,
    ) -> Self {
        Self {
            name,
            channel: Register::new(name, channel_write, channel_read),
            group: Register::new(name, group_write, group_read),
        }
    }

    /// Name of the setting.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Synchronize a per-channel enable vector with the device.
///
/// Grouped boards are driven through the group-enable pair, ungrouped ones
/// through the channel-enable pair. When writing, a vector that cannot be
/// represented exactly at group granularity is reported as a warning and the
/// OR-derived group mask is programmed. When reading, the device mask is
/// expanded back into the vector; on failure the vector is left untouched.
pub fn synchronize_mask(
    device: &mut dyn Digitizer,
    register: &MaskRegister,
    channels: &mut [Option<bool>],
    direction: Direction,
) -> FieldOutcome {
    let groups = device.groups();
    let expected = device.channels() as usize;
    if channels.len() != expected {
        error!(
            setting = register.name,
            configured = channels.len(),
            expected,
            "Channel vector does not match the device's channel count"
        );
        return FieldOutcome::Failed;
    }

    let accessors = if groups > 1 {
        &register.group
    } else {
        &register.channel
    };

    match direction {
        Direction::Writing => {
            let check = check_group_consistency(channels, groups);
            if !check.exact {
                warn!(
                    setting = register.name,
                    group_mask = format_args!("{:#x}", check.group_mask),
                    channel_mask = format_args!("{:#x}", check.channel_mask),
                    "Channel mask cannot be exactly mapped to groups of the device, using group mask instead"
                );
            }
            let mut mask = check.group_mask;
            synchronize(device, accessors, &mut mask, direction)
        }
        Direction::Reading => {
            let mut mask = 0;
            let outcome = synchronize(device, accessors, &mut mask, direction);
            if outcome == FieldOutcome::Applied {
                mask_to_channels(mask, channels, groups);
            }
            outcome
        }
    }
}
