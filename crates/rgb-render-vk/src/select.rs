// SPDX-License-Identifier: CEPL-1.0
//! First-match physical device selection.
//!
//! Devices are tried in enumeration order and the first one passing every
//! check wins; there is no scoring. Within a device, queue families are
//! scanned in index order and the scan stops as soon as both a graphics and
//! a present family are known, so two early single-purpose families beat a
//! later family that could do both.

use rgb_render::{DeviceClass, DeviceRequirement, QueueCaps};
use std::collections::BTreeSet;
use std::ffi::CString;
use std::fmt;
use tracing::{debug, info};

use crate::caps::{CapabilitySnapshot, QueueFamily};
use crate::error::SessionError;

/// Family indices for the graphics and present queues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueAssignment {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueAssignment {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// `(graphics, present)` once both are known.
    pub fn families(&self) -> Option<(u32, u32)> {
        Some((self.graphics?, self.present?))
    }

    /// Distinct family indices, ascending.
    pub fn unique_families(&self) -> Vec<u32> {
        self.graphics
            .into_iter()
            .chain(self.present)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

pub fn find_queue_families(families: &[QueueFamily]) -> QueueAssignment {
    let mut found = QueueAssignment::default();
    for family in families.iter().filter(|f| f.queue_count > 0) {
        if found.graphics.is_none() && family.caps.contains(QueueCaps::GRAPHICS) {
            found.graphics = Some(family.index);
        }
        if found.present.is_none() && family.caps.contains(QueueCaps::PRESENT) {
            found.present = Some(family.index);
        }
        if found.is_complete() {
            break;
        }
    }
    found
}

#[derive(Clone, Debug)]
pub struct SelectionPolicy {
    pub device: DeviceRequirement,
    pub required_extensions: Vec<CString>,
}

/// Why a device was passed over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unsuitable {
    WrongClass(DeviceClass),
    NoGraphicsQueue,
    NoPresentQueue,
    MissingExtensions(Vec<String>),
    NoSurfaceSupport,
}

impl fmt::Display for Unsuitable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsuitable::WrongClass(class) => write!(f, "device is a {class}"),
            Unsuitable::NoGraphicsQueue => f.write_str("no graphics-capable queue family"),
            Unsuitable::NoPresentQueue => f.write_str("no queue family can present to the surface"),
            Unsuitable::MissingExtensions(names) => write!(f, "missing extensions {names:?}"),
            Unsuitable::NoSurfaceSupport => {
                f.write_str("surface reports no formats or no present modes")
            }
        }
    }
}

/// Runs every suitability check against one device.
pub fn check(
    snapshot: &CapabilitySnapshot,
    policy: &SelectionPolicy,
) -> Result<QueueAssignment, Unsuitable> {
    if !policy.device.accepts(snapshot.class) {
        return Err(Unsuitable::WrongClass(snapshot.class));
    }

    let queues = find_queue_families(&snapshot.queue_families);
    if queues.graphics.is_none() {
        return Err(Unsuitable::NoGraphicsQueue);
    }
    if queues.present.is_none() {
        return Err(Unsuitable::NoPresentQueue);
    }

    let missing: Vec<String> = policy
        .required_extensions
        .iter()
        .filter(|name| !snapshot.supports_extension(name))
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    if !missing.is_empty() {
        return Err(Unsuitable::MissingExtensions(missing));
    }

    match &snapshot.surface {
        Some(range) if range.is_adequate() => Ok(queues),
        _ => Err(Unsuitable::NoSurfaceSupport),
    }
}

/// Walks `snapshots` in order and returns the first device that passes
/// [`check`]. The iterator is not advanced past that device, so a lazily
/// snapshotting iterator never queries the devices behind the winner. A
/// query error on a device tried before the winner is returned as is.
pub fn select<I>(
    snapshots: I,
    policy: &SelectionPolicy,
) -> Result<(CapabilitySnapshot, QueueAssignment), SessionError>
where
    I: IntoIterator<Item = Result<CapabilitySnapshot, SessionError>>,
{
    for snapshot in snapshots {
        let snapshot = snapshot?;
        match check(&snapshot, policy) {
            Ok(queues) => {
                info!(
                    "Physical device chosen: {} ({}, graphics family {:?}, present family {:?})",
                    snapshot.name, snapshot.class, queues.graphics, queues.present
                );
                return Ok((snapshot, queues));
            }
            Err(reason) => debug!("skipping {}: {reason}", snapshot.name),
        }
    }
    Err(SessionError::NoSuitableDevice)
}
