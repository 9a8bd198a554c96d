// Copyright 2023 The Druid Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logical and physical input devices.
//!
//! A master device is what the application sees: it carries focus and grabs.
//! Slave devices are the physical sources behind a master. Rather than a class
//! hierarchy, every device is a [`DeviceKind`] tag, and the links between
//! devices live in the [`DeviceManager`]'s association table.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::seat::SeatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    MasterPointer,
    SlavePointer,
    MasterKeyboard,
    SlaveKeyboard,
    MasterTouch,
    SlaveTouch,
    TabletMaster,
    TabletStylus,
    TabletEraser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Master,
    Slave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Mouse,
    Keyboard,
    Touchscreen,
    Pen,
    Eraser,
}

impl DeviceKind {
    pub fn device_type(self) -> DeviceType {
        match self {
            DeviceKind::MasterPointer
            | DeviceKind::MasterKeyboard
            | DeviceKind::MasterTouch
            | DeviceKind::TabletMaster => DeviceType::Master,
            _ => DeviceType::Slave,
        }
    }

    pub fn source(self) -> InputSource {
        match self {
            DeviceKind::MasterPointer
            | DeviceKind::SlavePointer
            | DeviceKind::MasterTouch
            | DeviceKind::TabletMaster => InputSource::Mouse,
            DeviceKind::MasterKeyboard | DeviceKind::SlaveKeyboard => InputSource::Keyboard,
            DeviceKind::SlaveTouch => InputSource::Touchscreen,
            DeviceKind::TabletStylus => InputSource::Pen,
            DeviceKind::TabletEraser => InputSource::Eraser,
        }
    }

    /// Whether the device drives an on-screen cursor.
    pub fn has_cursor(self) -> bool {
        matches!(
            self,
            DeviceKind::MasterPointer
                | DeviceKind::SlavePointer
                | DeviceKind::MasterTouch
                | DeviceKind::TabletMaster
        )
    }
}

bitflags! {
    /// What a seat can do.
    pub struct SeatCapabilities: u32 {
        const POINTER = 1;
        const KEYBOARD = 1 << 1;
        const TOUCH = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub seat: SeatId,
    pub kind: DeviceKind,
    pub name: String,
}

/// Every device of every seat, and how they are associated.
#[derive(Debug, Default)]
pub struct DeviceManager {
    next_id: u32,
    /// Most recently added first.
    devices: Vec<Device>,
    /// Device -> associated device. Slaves point at their master, the core
    /// pointer and keyboard point at each other.
    associations: BTreeMap<DeviceId, DeviceId>,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, seat: SeatId, kind: DeviceKind, name: impl Into<String>) -> DeviceId {
        self.next_id += 1;
        let id = DeviceId(self.next_id);
        let device = Device {
            id,
            seat,
            kind,
            name: name.into(),
        };
        tracing::debug!("device added {:?} {:?} {:?}", id, kind, device.name);
        self.devices.insert(0, device);
        id
    }

    /// Forget a device and every association pointing at or from it.
    pub(crate) fn remove(&mut self, id: DeviceId) -> Option<Device> {
        let index = self.devices.iter().position(|device| device.id == id)?;
        let device = self.devices.remove(index);
        self.associations.remove(&id);
        self.associations.retain(|_, associated| *associated != id);
        tracing::debug!("device removed {:?} {:?}", id, device.kind);
        Some(device)
    }

    pub(crate) fn associate(&mut self, device: DeviceId, associated: Option<DeviceId>) {
        match associated {
            Some(associated) => {
                self.associations.insert(device, associated);
            }
            None => {
                self.associations.remove(&device);
            }
        }
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|device| device.id == id)
    }

    pub fn associated(&self, id: DeviceId) -> Option<DeviceId> {
        self.associations.get(&id).copied()
    }

    /// Slaves attached to a master.
    pub fn slaves(&self, master: DeviceId) -> Vec<DeviceId> {
        self.devices
            .iter()
            .filter(|device| device.kind.device_type() == DeviceType::Slave)
            .filter(|device| self.associated(device.id) == Some(master))
            .map(|device| device.id)
            .collect()
    }

    pub fn list_devices(&self, ty: DeviceType) -> Vec<&Device> {
        self.devices
            .iter()
            .filter(|device| device.kind.device_type() == ty)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slaves_follow_the_association_table() {
        let mut manager = DeviceManager::new();
        let seat = SeatId(1);
        let master = manager.add(seat, DeviceKind::MasterPointer, "Core Pointer");
        let slave = manager.add(seat, DeviceKind::SlavePointer, "Wayland Pointer");
        manager.associate(slave, Some(master));
        assert_eq!(manager.slaves(master), vec![slave]);

        manager.remove(slave);
        assert!(manager.slaves(master).is_empty());
        assert_eq!(manager.associated(slave), None);
    }

    #[test]
    fn removing_a_master_clears_links_to_it() {
        let mut manager = DeviceManager::new();
        let seat = SeatId(1);
        let pointer = manager.add(seat, DeviceKind::MasterPointer, "Core Pointer");
        let keyboard = manager.add(seat, DeviceKind::MasterKeyboard, "Core Keyboard");
        manager.associate(pointer, Some(keyboard));
        manager.associate(keyboard, Some(pointer));
        manager.remove(keyboard);
        assert_eq!(manager.associated(pointer), None);
        assert_eq!(manager.list_devices(DeviceType::Master).len(), 1);
    }

    #[test]
    fn kinds_map_to_sources() {
        assert_eq!(DeviceKind::TabletEraser.source(), InputSource::Eraser);
        assert_eq!(DeviceKind::SlaveTouch.device_type(), DeviceType::Slave);
        assert!(!DeviceKind::MasterKeyboard.has_cursor());
    }
}
