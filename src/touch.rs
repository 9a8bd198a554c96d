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

//! Touch contacts.
//!
//! The first finger down on an empty screen also drives the touch master's
//! pointer: it gets enter and leave crossings, and its position is mirrored
//! into the master's pointer state so pointer queries keep working during a
//! touch-only session.

use std::collections::BTreeMap;

use kurbo::Point;

use crate::device::DeviceId;
use crate::error::Error;
use crate::event::{Crossing, CrossingMode, EventKind, InputEvent, Touch};
use crate::protocol::TouchNotification;
use crate::window::WindowId;
use crate::Seat;

/// A touch sequence id, assigned by the compositor and reused after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub i32);

#[derive(Debug, Clone, PartialEq)]
pub struct TouchContact {
    pub id: TouchId,
    pub window: WindowId,
    pub pos: Point,
    pub down_serial: u32,
    /// This contact was alone on the screen when it began.
    pub initial: bool,
}

/// Live touch contacts of one seat.
#[derive(Debug, Default)]
pub struct TouchTable {
    contacts: BTreeMap<TouchId, TouchContact>,
    /// The contact driving the emulated pointer. Always a key of `contacts`.
    emulating: Option<TouchId>,
}

impl TouchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contact. It is initial if the table was empty.
    pub fn begin(
        &mut self,
        id: TouchId,
        window: WindowId,
        pos: Point,
        serial: u32,
    ) -> Result<&TouchContact, Error> {
        if self.contacts.contains_key(&id) {
            return Err(Error::DuplicateTouch(id));
        }
        let contact = TouchContact {
            id,
            window,
            pos,
            down_serial: serial,
            initial: self.contacts.is_empty(),
        };
        Ok(self.contacts.entry(id).or_insert(contact))
    }

    pub fn update(&mut self, id: TouchId, pos: Point) -> Option<&TouchContact> {
        let contact = self.contacts.get_mut(&id)?;
        contact.pos = pos;
        Some(contact)
    }

    /// Remove a contact, unbinding it from the emulated pointer.
    pub fn remove(&mut self, id: TouchId) -> Option<TouchContact> {
        if self.emulating == Some(id) {
            self.emulating = None;
        }
        self.contacts.remove(&id)
    }

    pub fn get(&self, id: TouchId) -> Option<&TouchContact> {
        self.contacts.get(&id)
    }

    pub fn bind_emulating(&mut self, id: TouchId) {
        if self.contacts.contains_key(&id) {
            self.emulating = Some(id);
        }
    }

    /// Unbind the emulated pointer, returning the contact it followed.
    pub fn unbind_emulating(&mut self) -> Option<TouchContact> {
        let id = self.emulating.take()?;
        self.contacts.get(&id).cloned()
    }

    pub fn emulating(&self) -> Option<&TouchContact> {
        self.emulating.and_then(|id| self.contacts.get(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TouchContact> {
        self.contacts.values()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    fn drain(&mut self) -> Vec<TouchContact> {
        self.emulating = None;
        std::mem::take(&mut self.contacts).into_values().collect()
    }
}

impl Seat {
    pub(crate) fn handle_touch(&mut self, event: TouchNotification) -> Result<(), Error> {
        let (master, source) = self.touch_devices().ok_or(Error::NoDevice("touch"))?;
        match event {
            TouchNotification::Down {
                serial,
                time,
                window,
                id,
                pos,
            } => {
                if !self.ctx.windows.is_live(window) {
                    return Err(Error::UnknownWindow(window));
                }
                let contact = self.touches.begin(id, window, pos, serial)?.clone();
                self.ctx.serials.update(serial);
                if contact.initial {
                    self.touch_crossing(master, source, &contact, CrossingMode::Normal, time, true);
                    self.touches.bind_emulating(id);
                    self.mimic_pointer(&contact);
                }
                tracing::trace!("touch begin {:?} at {:?}", id, pos);
                let event = self.touch_event(master, source, &contact, time, EventKind::TouchBegin);
                self.ctx.queue.borrow_mut().push(event);
            }
            TouchNotification::Up { serial, time, id } => {
                self.ctx.serials.update(serial);
                let contact = self
                    .touches
                    .get(id)
                    .cloned()
                    .ok_or(Error::UnknownTouch(id))?;
                tracing::trace!("touch end {:?}", id);
                let event = self.touch_event(master, source, &contact, time, EventKind::TouchEnd);
                self.ctx.queue.borrow_mut().push(event);
                if contact.initial {
                    self.touch_crossing(master, source, &contact, CrossingMode::Normal, time, false);
                    self.touches.unbind_emulating();
                    self.touch_pointer.focus = None;
                }
                self.touches.remove(id);
            }
            TouchNotification::Motion { time, id, pos } => {
                let contact = self
                    .touches
                    .update(id, pos)
                    .cloned()
                    .ok_or(Error::UnknownTouch(id))?;
                if contact.initial {
                    self.mimic_pointer(&contact);
                }
                let event =
                    self.touch_event(master, source, &contact, time, EventKind::TouchUpdate);
                self.ctx.queue.borrow_mut().push(event);
            }
            TouchNotification::Frame => {}
            TouchNotification::Cancel => {
                tracing::trace!("touch cancel");
                self.cancel_touches();
            }
        }
        Ok(())
    }

    /// Cancel every live touch sequence.
    ///
    /// The emulated pointer leaves its window first. Calling this on an
    /// empty table does nothing.
    pub fn cancel_touches(&mut self) {
        let (master, source) = match self.touch_devices() {
            Some(devices) => devices,
            None => return,
        };
        if let Some(contact) = self.touches.unbind_emulating() {
            self.touch_crossing(master, source, &contact, CrossingMode::Normal, 0, false);
            self.touch_pointer.focus = None;
        }
        for contact in self.touches.drain() {
            let event = self.touch_event(master, source, &contact, 0, EventKind::TouchCancel);
            self.ctx.queue.borrow_mut().push(event);
        }
    }

    /// Give up on one touch sequence, e.g. because a gesture claimed it.
    ///
    /// The sequence gets a cancel event and is forgotten.
    pub fn unset_touch_grab(&mut self, sequence: TouchId) -> Result<(), Error> {
        let (master, source) = self.touch_devices().ok_or(Error::NoDevice("touch"))?;
        let contact = self
            .touches
            .get(sequence)
            .cloned()
            .ok_or(Error::UnknownTouch(sequence))?;
        if self.touches.emulating().map(|c| c.id) == Some(sequence) {
            self.touches.unbind_emulating();
            self.touch_crossing(master, source, &contact, CrossingMode::Normal, 0, false);
            self.touch_pointer.focus = None;
        }
        let event = self.touch_event(master, source, &contact, 0, EventKind::TouchCancel);
        self.ctx.queue.borrow_mut().push(event);
        self.touches.remove(sequence);
        Ok(())
    }

    pub fn touches(&self) -> &TouchTable {
        &self.touches
    }

    fn mimic_pointer(&mut self, contact: &TouchContact) {
        self.touch_pointer.focus = Some(contact.window);
        self.touch_pointer.press_serial = contact.down_serial;
        self.touch_pointer.enter_serial = contact.down_serial;
        self.touch_pointer.pos = contact.pos;
    }

    fn touch_crossing(
        &self,
        master: DeviceId,
        source: DeviceId,
        contact: &TouchContact,
        mode: CrossingMode,
        time: u32,
        enter: bool,
    ) {
        let crossing = Crossing {
            pos: contact.pos,
            root: self.root_coords(contact.window, contact.pos),
            mode,
            subwindow: None,
            state: self.modifier_state(&self.touch_pointer),
        };
        let kind = if enter {
            EventKind::Enter(crossing)
        } else {
            EventKind::Leave(crossing)
        };
        self.ctx.queue.borrow_mut().push(InputEvent {
            seat: self.id,
            device: master,
            source_device: source,
            window: contact.window,
            time,
            kind,
        });
    }

    fn touch_event(
        &self,
        master: DeviceId,
        source: DeviceId,
        contact: &TouchContact,
        time: u32,
        kind: fn(Touch) -> EventKind,
    ) -> InputEvent {
        let touch = Touch {
            sequence: contact.id,
            pos: contact.pos,
            root: self.root_coords(contact.window, contact.pos),
            state: self.modifier_state(&self.touch_pointer),
            emulating_pointer: contact.initial,
        };
        InputEvent {
            seat: self.id,
            device: master,
            source_device: source,
            window: contact.window,
            time,
            kind: kind(touch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_lone_contact_is_initial() {
        let mut table = TouchTable::new();
        assert!(table.begin(TouchId(0), WindowId(1), Point::ZERO, 1).unwrap().initial);
        assert!(!table.begin(TouchId(1), WindowId(1), Point::ZERO, 2).unwrap().initial);
        table.remove(TouchId(0));
        assert!(!table.begin(TouchId(2), WindowId(1), Point::ZERO, 3).unwrap().initial);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut table = TouchTable::new();
        table.begin(TouchId(4), WindowId(1), Point::ZERO, 1).unwrap();
        assert!(matches!(
            table.begin(TouchId(4), WindowId(2), Point::new(1., 1.), 2),
            Err(Error::DuplicateTouch(TouchId(4)))
        ));
        assert_eq!(table.get(TouchId(4)).unwrap().window, WindowId(1));
    }

    #[test]
    fn removing_the_emulating_contact_unbinds_it() {
        let mut table = TouchTable::new();
        table.begin(TouchId(0), WindowId(1), Point::ZERO, 1).unwrap();
        table.bind_emulating(TouchId(0));
        assert_eq!(table.emulating().map(|c| c.id), Some(TouchId(0)));
        table.remove(TouchId(0));
        assert!(table.emulating().is_none());
        table.bind_emulating(TouchId(0));
        assert!(table.emulating().is_none());
    }
}
