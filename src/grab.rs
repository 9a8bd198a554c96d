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

//! Seat grabs and the crossing events they imply.
//!
//! Wayland has no client-side grabs. A grab here only reroutes what the
//! application sees: masters get crossing events as if their focus moved to
//! the grab window, and the grab is recorded in the context-wide registry so
//! the rest of the shell can ask who holds a device.

use std::collections::BTreeMap;
use std::fmt;

use crate::cursor::Cursor;
use crate::device::{DeviceId, SeatCapabilities};
use crate::event::{Crossing, CrossingMode, EventKind, InputEvent};
use crate::pointer::PointerGrab;
use crate::touch::TouchId;
use crate::window::{WindowId, WindowKind};
use crate::Seat;

/// Embedding chains longer than this are treated as cycles.
const MAX_EMBEDDING_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabStatus {
    Success,
    /// A grab with a later time is already in place.
    AlreadyGrabbed,
    /// The window does not resolve to a visible top-level.
    NotViewable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabRecord {
    pub device: DeviceId,
    pub window: WindowId,
    /// The on-screen top-level `window` resolved to.
    pub native: WindowId,
    pub serial_start: u64,
    /// `None` while the grab is open.
    pub serial_end: Option<u64>,
    pub time: u32,
}

impl GrabRecord {
    pub fn is_open(&self) -> bool {
        self.serial_end.is_none()
    }
}

/// Grab records of every device, oldest first.
///
/// Per device, open grabs are kept along with the newest closed one.
#[derive(Debug, Default)]
pub struct GrabRegistry {
    records: BTreeMap<DeviceId, Vec<GrabRecord>>,
}

impl GrabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, record: GrabRecord) {
        tracing::debug!(
            "grab {:?} on {:?}, serial {}",
            record.device,
            record.window,
            record.serial_start
        );
        let records = self.records.entry(record.device).or_default();
        // Closed grabs only matter as the newest one.
        let newest_closed = records.iter().rposition(|record| !record.is_open());
        let mut index = 0;
        records.retain(|record| {
            let keep = record.is_open() || Some(index) == newest_closed;
            index += 1;
            keep
        });
        records.push(record);
    }

    pub fn last(&self, device: DeviceId) -> Option<&GrabRecord> {
        self.records.get(&device).and_then(|records| records.last())
    }

    /// The open grab of `device`, if any.
    pub fn active(&self, device: DeviceId) -> Option<&GrabRecord> {
        self.last(device).filter(|record| record.is_open())
    }

    pub fn records(&self, device: DeviceId) -> &[GrabRecord] {
        self.records
            .get(&device)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Expire the newest grab of `device` at the moment it started.
    pub(crate) fn close_last(&mut self, device: DeviceId) -> Option<GrabRecord> {
        let record = self.records.get_mut(&device)?.last_mut()?;
        if !record.is_open() {
            return None;
        }
        record.serial_end = Some(record.serial_start);
        Some(*record)
    }

    pub(crate) fn remove_device(&mut self, device: DeviceId) {
        self.records.remove(&device);
    }
}

/// The window the seat is grabbed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatGrab {
    pub window: WindowId,
    pub time: u32,
}

/// Arguments of [`Seat::grab`].
pub struct GrabRequest {
    pub window: WindowId,
    pub capabilities: SeatCapabilities,
    pub cursor: Option<Cursor>,
    /// Event time of the request; 0 means the time of the last event.
    pub time: u32,
    prepare: Option<Box<dyn FnOnce(WindowId)>>,
}

impl GrabRequest {
    pub fn new(window: WindowId, capabilities: SeatCapabilities) -> Self {
        Self {
            window,
            capabilities,
            cursor: None,
            time: 0,
            prepare: None,
        }
    }

    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }

    /// Run `prepare` on the window before the grab takes effect, e.g. to map it.
    pub fn prepare(mut self, prepare: impl FnOnce(WindowId) + 'static) -> Self {
        self.prepare = Some(Box::new(prepare));
        self
    }
}

impl fmt::Debug for GrabRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GrabRequest")
            .field("window", &self.window)
            .field("capabilities", &self.capabilities)
            .field("cursor", &self.cursor)
            .field("time", &self.time)
            .field("prepare", &self.prepare.is_some())
            .finish()
    }
}

impl Seat {
    /// Resolve `window` to the on-screen top-level hosting it.
    ///
    /// Off-screen windows are followed through their embedders.
    pub(crate) fn native_window(&self, window: WindowId) -> Option<WindowId> {
        let windows = &self.ctx.windows;
        let mut current = window;
        for _ in 0..MAX_EMBEDDING_DEPTH {
            let toplevel = windows.toplevel(current)?;
            match windows.kind(toplevel)? {
                WindowKind::Offscreen { embedder } => current = embedder?,
                _ => return Some(toplevel),
            }
        }
        tracing::warn!("embedding chain of {:?} does not end", window);
        None
    }

    /// Grab the seat's masters to `request.window`.
    pub fn grab(&mut self, request: GrabRequest) -> GrabStatus {
        let GrabRequest {
            window,
            capabilities,
            cursor,
            time,
            prepare,
        } = request;

        let native = match self.native_window(window) {
            Some(native) => native,
            None => return GrabStatus::NotViewable,
        };

        let previous = self.current_grab();
        if let Some(current) = previous {
            if time != 0 && time < current.time {
                tracing::debug!("grab at {} is older than the grab at {}", time, current.time);
                return GrabStatus::AlreadyGrabbed;
            }
        }
        let time = if time == 0 {
            self.last_event_time(capabilities)
        } else {
            time
        };

        self.grab = Some(SeatGrab { window, time });
        if let Some(prepare) = prepare {
            prepare(window);
        }
        if !self.ctx.windows.is_viewable(native) {
            self.grab = previous;
            return GrabStatus::NotViewable;
        }

        if capabilities.contains(SeatCapabilities::POINTER) {
            let master = self.master_pointer;
            let focus = self.pointer.focus;
            if focus != Some(window) {
                self.emit_grab_crossing(master, focus, Some(window), CrossingMode::Grab, time);
            }
            self.register_grab(master, window, native, time);
            self.pointer.grab = Some(PointerGrab { window, time });
            self.grab_cursor = cursor;
            self.update_pointer_cursor();
        }
        if capabilities.contains(SeatCapabilities::TOUCH) {
            if let Some((master, _)) = self.touch_devices() {
                let focus = self.touch_pointer.focus;
                if focus != Some(window) {
                    self.emit_grab_crossing(master, focus, Some(window), CrossingMode::Grab, time);
                }
                self.register_grab(master, window, native, time);
                self.touch_pointer.grab = Some(PointerGrab { window, time });
            }
        }
        if capabilities.contains(SeatCapabilities::KEYBOARD) {
            let master = self.master_keyboard;
            let focus = self.keyboard.focus;
            if focus != Some(window) {
                self.emit_grab_crossing(master, focus, Some(window), CrossingMode::Grab, time);
            }
            self.register_grab(master, window, native, time);
        }
        GrabStatus::Success
    }

    /// Release the seat grab, sending the masters back to their real focus.
    pub fn ungrab(&mut self) {
        self.grab = None;
        self.grab_cursor = None;

        let mut masters = vec![self.master_pointer, self.master_keyboard];
        if let Some((touch_master, _)) = self.touch_devices() {
            masters.insert(1, touch_master);
        }
        for master in masters {
            let record = self.ctx.grabs.borrow_mut().close_last(master);
            let record = match record {
                Some(record) => record,
                None => continue,
            };
            tracing::debug!("ungrab {:?} from {:?}", master, record.window);
            let focus = self.master_focus(master);
            if focus != Some(record.window) {
                self.emit_grab_crossing(
                    master,
                    Some(record.window),
                    focus,
                    CrossingMode::Ungrab,
                    0,
                );
            }
        }
        self.pointer.grab = None;
        self.touch_pointer.grab = None;
        self.update_pointer_cursor();
    }

    /// The current seat grab, if its window still exists.
    pub fn current_grab(&self) -> Option<SeatGrab> {
        self.grab
            .filter(|grab| self.ctx.windows.is_live(grab.window))
    }

    pub fn grab_window(&self) -> Option<WindowId> {
        self.current_grab().map(|grab| grab.window)
    }

    fn register_grab(&self, device: DeviceId, window: WindowId, native: WindowId, time: u32) {
        let record = GrabRecord {
            device,
            window,
            native,
            serial_start: self.ctx.serials.next(),
            serial_end: None,
            time,
        };
        let mut grabs = self.ctx.grabs.borrow_mut();
        // A newer grab supersedes the open one.
        grabs.close_last(device);
        grabs.add(record);
    }

    fn last_event_time(&self, capabilities: SeatCapabilities) -> u32 {
        let mut time = 0;
        if capabilities.contains(SeatCapabilities::POINTER) {
            time = time.max(self.pointer.time);
        }
        if capabilities.contains(SeatCapabilities::TOUCH) {
            time = time.max(self.touch_pointer.time);
        }
        if capabilities.contains(SeatCapabilities::KEYBOARD) {
            time = time.max(self.keyboard.time);
        }
        time
    }

    fn master_focus(&self, master: DeviceId) -> Option<WindowId> {
        if master == self.master_keyboard {
            self.keyboard.focus
        } else {
            self.pointer_state(master).and_then(|pointer| pointer.focus)
        }
    }

    /// Tell `master` its focus moved from `from` to `to`.
    ///
    /// Keyboards get focus changes, everything else a leave and an enter at
    /// the device's current position. Halves aimed at windows that no longer
    /// exist are skipped.
    pub(crate) fn emit_grab_crossing(
        &self,
        master: DeviceId,
        from: Option<WindowId>,
        to: Option<WindowId>,
        mode: CrossingMode,
        time: u32,
    ) {
        let from = from.filter(|window| self.ctx.windows.is_live(*window));
        let to = to.filter(|window| self.ctx.windows.is_live(*window));
        let event = |window, kind| InputEvent {
            seat: self.id,
            device: master,
            source_device: master,
            window,
            time,
            kind,
        };
        let mut queue = self.ctx.queue.borrow_mut();

        if master == self.master_keyboard {
            if let Some(from) = from {
                queue.push(event(from, EventKind::FocusChange { focus_in: false }));
            }
            if let Some(to) = to {
                queue.push(event(to, EventKind::FocusChange { focus_in: true }));
            }
            return;
        }

        let pointer = match self.pointer_state(master) {
            Some(pointer) => pointer,
            None => return,
        };
        let crossing = |window, subwindow| Crossing {
            pos: pointer.pos,
            root: self.root_coords(window, pointer.pos),
            mode,
            subwindow,
            state: self.modifier_state(pointer),
        };
        if let Some(from) = from {
            queue.push(event(from, EventKind::Leave(crossing(from, to))));
        }
        if let Some(to) = to {
            queue.push(event(to, EventKind::Enter(crossing(to, from))));
        }
    }

    /// The serial that started the implicit grab of `device`.
    ///
    /// That is the touch-down serial of `sequence`, or else the last button
    /// press of the device.
    pub fn implicit_grab_serial(&self, device: DeviceId, sequence: Option<TouchId>) -> Option<u32> {
        sequence
            .and_then(|sequence| self.touches.get(sequence))
            .map(|contact| contact.down_serial)
            .or_else(|| self.pointer_state(device).map(|pointer| pointer.press_serial))
    }

    /// The latest serial that could have started an implicit grab, with the
    /// touch sequence that owns it.
    pub fn last_implicit_grab_serial(&self, device: DeviceId) -> (u32, Option<TouchId>) {
        let mut serial = self
            .pointer_state(device)
            .map(|pointer| pointer.press_serial)
            .unwrap_or(self.pointer.press_serial);
        let mut sequence = None;
        for contact in self.touches.iter() {
            if contact.down_serial > serial {
                serial = contact.down_serial;
                sequence = Some(contact.id);
            }
        }
        (serial, sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(device: u32, serial: u64) -> GrabRecord {
        GrabRecord {
            device: DeviceId(device),
            window: WindowId(1),
            native: WindowId(1),
            serial_start: serial,
            serial_end: None,
            time: 0,
        }
    }

    #[test]
    fn closing_expires_at_the_start_serial() {
        let mut grabs = GrabRegistry::new();
        grabs.add(record(1, 4));
        assert!(grabs.active(DeviceId(1)).is_some());
        let closed = grabs.close_last(DeviceId(1)).unwrap();
        assert_eq!(closed.serial_end, Some(4));
        assert!(grabs.active(DeviceId(1)).is_none());
        assert!(grabs.close_last(DeviceId(1)).is_none());
        assert_eq!(grabs.records(DeviceId(1)).len(), 1);
    }

    #[test]
    fn closed_grabs_do_not_pile_up() {
        let mut grabs = GrabRegistry::new();
        for serial in 1..=500 {
            grabs.add(record(1, serial));
            grabs.close_last(DeviceId(1));
        }
        let records = grabs.records(DeviceId(1));
        assert_eq!(records.len(), 2);
        assert_eq!(grabs.last(DeviceId(1)).map(|r| r.serial_end), Some(Some(500)));

        grabs.add(record(1, 501));
        assert_eq!(grabs.records(DeviceId(1)).len(), 2);
        assert_eq!(grabs.records(DeviceId(1))[0].serial_start, 500);
        assert_eq!(grabs.active(DeviceId(1)).map(|r| r.serial_start), Some(501));
    }

    #[test]
    fn devices_have_separate_records() {
        let mut grabs = GrabRegistry::new();
        grabs.add(record(1, 1));
        grabs.add(record(2, 2));
        grabs.remove_device(DeviceId(1));
        assert!(grabs.last(DeviceId(1)).is_none());
        assert_eq!(grabs.last(DeviceId(2)).map(|r| r.serial_start), Some(2));
        assert!(grabs.records(DeviceId(3)).is_empty());
    }
}
