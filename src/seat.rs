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

//! Seats and the seat manager.

use std::collections::BTreeMap;
use std::rc::Rc;

use kurbo::Point;

use crate::config::SeatConfig;
use crate::cursor::{Cursor, CursorTarget};
use crate::device::{DeviceId, DeviceKind, SeatCapabilities};
use crate::error::Error;
use crate::event::{ButtonMask, Crossing, CrossingMode, EventKind, InputEvent, ModifierState};
use crate::frame::FrameAggregator;
use crate::gesture::{GestureKind, GestureSession};
use crate::grab::SeatGrab;
use crate::keyboard::KeyboardState;
use crate::pointer::PointerState;
use crate::protocol::Notification;
use crate::tablet::{TabletDevice, TabletTool};
use crate::touch::TouchTable;
use crate::window::WindowId;
use crate::InputContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId(pub u32);

/// A snapshot of a pointer-like device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub window: Option<WindowId>,
    pub pos: Point,
    pub root: Point,
    pub state: ModifierState,
}

/// One seat: a core pointer and keyboard, plus whatever the compositor
/// says the seat can do.
pub struct Seat {
    pub(crate) id: SeatId,
    pub(crate) name: String,
    pub(crate) ctx: Rc<InputContext>,
    pub(crate) config: SeatConfig,

    pub(crate) master_pointer: DeviceId,
    pub(crate) master_keyboard: DeviceId,
    pub(crate) pointer_device: Option<DeviceId>,
    pub(crate) keyboard_device: Option<DeviceId>,
    pub(crate) touch_master: Option<DeviceId>,
    pub(crate) touch_device: Option<DeviceId>,

    pub(crate) pointer: PointerState,
    /// The touch master's pointer, driven by the emulating contact.
    pub(crate) touch_pointer: PointerState,
    pub(crate) keyboard: KeyboardState,
    pub(crate) touches: TouchTable,
    pub(crate) frames: FrameAggregator,
    pub(crate) swipe: GestureSession,
    pub(crate) pinch: GestureSession,
    /// Most recently added first.
    pub(crate) tablets: Vec<TabletDevice>,
    pub(crate) tools: Vec<TabletTool>,

    pub(crate) grab: Option<SeatGrab>,
    pub(crate) grab_cursor: Option<Cursor>,
    /// A clipboard change that arrived without keyboard focus.
    pub(crate) pending_selection: Option<String>,
    pub(crate) dnd_window: Option<WindowId>,
}

impl Seat {
    pub fn new(ctx: Rc<InputContext>, id: SeatId, name: impl Into<String>, config: SeatConfig) -> Self {
        let (master_pointer, master_keyboard) = {
            let mut devices = ctx.devices.borrow_mut();
            let pointer = devices.add(id, DeviceKind::MasterPointer, "Core Pointer");
            let keyboard = devices.add(id, DeviceKind::MasterKeyboard, "Core Keyboard");
            devices.associate(pointer, Some(keyboard));
            devices.associate(keyboard, Some(pointer));
            (pointer, keyboard)
        };
        let frames = FrameAggregator::new(config.flushes_immediately());
        Seat {
            id,
            name: name.into(),
            ctx,
            config,
            master_pointer,
            master_keyboard,
            pointer_device: None,
            keyboard_device: None,
            touch_master: None,
            touch_device: None,
            pointer: PointerState::default(),
            touch_pointer: PointerState::default(),
            keyboard: KeyboardState::default(),
            touches: TouchTable::new(),
            frames,
            swipe: GestureSession::default(),
            pinch: GestureSession::default(),
            tablets: Vec::new(),
            tools: Vec::new(),
            grab: None,
            grab_cursor: None,
            pending_selection: None,
            dnd_window: None,
        }
    }

    /// Handle one notification from the compositor.
    ///
    /// Nothing escapes: notifications that do not fit the seat's state are
    /// logged and dropped.
    pub fn dispatch(&mut self, notification: Notification) {
        tracing::trace!("seat {:?}: {:?}", self.id, notification);
        let result = match notification {
            Notification::Capabilities(capabilities) => {
                self.set_capabilities(capabilities);
                Ok(())
            }
            Notification::Name(name) => {
                tracing::debug!("seat {:?} is named {:?}", self.id, name);
                self.name = name;
                Ok(())
            }
            Notification::Pointer(event) => self.handle_pointer(event),
            Notification::CursorSurface(event) => {
                self.handle_cursor_surface(event);
                Ok(())
            }
            Notification::Keyboard(event) => self.handle_keyboard(event),
            Notification::Touch(event) => self.handle_touch(event),
            Notification::Swipe(_) | Notification::Pinch(_) if !self.config.gestures => {
                tracing::debug!("seat {:?}: gestures are disabled", self.id);
                Ok(())
            }
            Notification::TabletSeat(_) | Notification::Tablet { .. } | Notification::Tool { .. }
                if !self.config.tablets =>
            {
                tracing::debug!("seat {:?}: tablets are disabled", self.id);
                Ok(())
            }
            Notification::Swipe(event) => {
                self.handle_gesture(GestureKind::Swipe, event);
                Ok(())
            }
            Notification::Pinch(event) => {
                self.handle_gesture(GestureKind::Pinch, event);
                Ok(())
            }
            Notification::TabletSeat(event) => {
                self.handle_tablet_seat(event);
                Ok(())
            }
            Notification::Tablet { tablet, event } => self.handle_tablet(tablet, event),
            Notification::Tool { tool, event } => self.handle_tool(tool, event),
            Notification::DataDevice(event) => self.handle_data_device(event),
        };
        if let Err(e) = result {
            if e.is_protocol_inconsistency() {
                tracing::warn!("seat {:?}: ignoring notification: {}", self.id, e);
            } else {
                tracing::error!("seat {:?}: {}", self.id, e);
            }
        }
    }

    /// Create and destroy slave devices to match `capabilities`.
    pub fn set_capabilities(&mut self, capabilities: SeatCapabilities) {
        let current = self.capabilities();
        let added = capabilities - current;
        let removed = current - capabilities;
        if !added.is_empty() || !removed.is_empty() {
            tracing::debug!(
                "seat {:?} capabilities {:?}, added {:?}, removed {:?}",
                self.id,
                capabilities,
                added,
                removed
            );
        }

        if added.contains(SeatCapabilities::POINTER) {
            let mut devices = self.ctx.devices.borrow_mut();
            let device = devices.add(self.id, DeviceKind::SlavePointer, "Wayland Pointer");
            devices.associate(device, Some(self.master_pointer));
            self.pointer_device = Some(device);
        } else if removed.contains(SeatCapabilities::POINTER) {
            self.release_pointer();
        }

        if added.contains(SeatCapabilities::KEYBOARD) {
            let mut devices = self.ctx.devices.borrow_mut();
            let device = devices.add(self.id, DeviceKind::SlaveKeyboard, "Wayland Keyboard");
            devices.associate(device, Some(self.master_keyboard));
            self.keyboard_device = Some(device);
        } else if removed.contains(SeatCapabilities::KEYBOARD) {
            self.release_keyboard();
        }

        if added.contains(SeatCapabilities::TOUCH) {
            let mut devices = self.ctx.devices.borrow_mut();
            let master = devices.add(
                self.id,
                DeviceKind::MasterTouch,
                "Wayland Touch Master Pointer",
            );
            devices.associate(master, Some(self.master_keyboard));
            let device = devices.add(self.id, DeviceKind::SlaveTouch, "Wayland Touch");
            devices.associate(device, Some(master));
            self.touch_master = Some(master);
            self.touch_device = Some(device);
        } else if removed.contains(SeatCapabilities::TOUCH) {
            self.release_touch();
        }
    }

    fn release_pointer(&mut self) {
        self.flush_pointer_frame();
        if let (Some(focus), Some(source)) = (self.pointer.focus, self.pointer_device) {
            let crossing = Crossing {
                pos: self.pointer.pos,
                root: self.root_coords(focus, self.pointer.pos),
                mode: CrossingMode::Normal,
                subwindow: None,
                state: self.modifier_state(&self.pointer),
            };
            self.ctx.queue.borrow_mut().push(InputEvent {
                seat: self.id,
                device: self.master_pointer,
                source_device: source,
                window: focus,
                time: self.pointer.time,
                kind: EventKind::Leave(crossing),
            });
        }
        self.pointer.focus = None;
        self.pointer.buttons = ButtonMask::empty();
        self.pointer
            .cursor
            .clear(&*self.ctx.cursors, CursorTarget::Pointer(self.master_pointer));
        self.swipe = GestureSession::default();
        self.pinch = GestureSession::default();
        if let Some(device) = self.pointer_device.take() {
            self.ctx.devices.borrow_mut().remove(device);
        }
    }

    fn release_keyboard(&mut self) {
        self.stop_key_repeat();
        if let (Some(focus), Some(source)) = (self.keyboard.focus, self.keyboard_device) {
            self.push_focus_change(source, focus, false);
        }
        self.keyboard.focus = None;
        if let Some(device) = self.keyboard_device.take() {
            self.ctx.devices.borrow_mut().remove(device);
        }
    }

    fn release_touch(&mut self) {
        self.cancel_touches();
        self.touch_pointer = PointerState::default();
        let mut devices = self.ctx.devices.borrow_mut();
        if let Some(device) = self.touch_device.take() {
            devices.remove(device);
        }
        if let Some(master) = self.touch_master.take() {
            self.ctx.grabs.borrow_mut().remove_device(master);
            self.frames.remove(master);
            devices.remove(master);
        }
    }

    /// Tear the seat down: tools, tablets, then every capability.
    pub(crate) fn finalize(&mut self) {
        let tools: Vec<_> = self.tools.iter().map(|tool| tool.id).collect();
        for tool in tools {
            self.remove_tool(tool);
        }
        let tablets: Vec<_> = self.tablets.iter().map(|tablet| tablet.id).collect();
        for tablet in tablets {
            self.remove_tablet(tablet);
        }
        self.set_capabilities(SeatCapabilities::empty());
        self.stop_key_repeat();

        let mut grabs = self.ctx.grabs.borrow_mut();
        let mut devices = self.ctx.devices.borrow_mut();
        for master in [self.master_pointer, self.master_keyboard] {
            grabs.remove_device(master);
            self.frames.remove(master);
            devices.remove(master);
        }
        tracing::debug!("seat {:?} finalized", self.id);
    }

    /// What the seat can currently do, judged by its slave devices.
    pub fn capabilities(&self) -> SeatCapabilities {
        let mut capabilities = SeatCapabilities::empty();
        capabilities.set(SeatCapabilities::POINTER, self.pointer_device.is_some());
        capabilities.set(SeatCapabilities::KEYBOARD, self.keyboard_device.is_some());
        capabilities.set(SeatCapabilities::TOUCH, self.touch_device.is_some());
        capabilities
    }

    /// The master device for one capability.
    pub fn master(&self, capability: SeatCapabilities) -> Option<DeviceId> {
        if capability == SeatCapabilities::POINTER {
            Some(self.master_pointer)
        } else if capability == SeatCapabilities::KEYBOARD {
            Some(self.master_keyboard)
        } else if capability == SeatCapabilities::TOUCH {
            self.touch_master
        } else {
            None
        }
    }

    pub fn slaves(&self, capabilities: SeatCapabilities) -> Vec<DeviceId> {
        let mut slaves = Vec::new();
        if capabilities.contains(SeatCapabilities::POINTER) {
            slaves.extend(self.pointer_device);
        }
        if capabilities.contains(SeatCapabilities::KEYBOARD) {
            slaves.extend(self.keyboard_device);
        }
        if capabilities.contains(SeatCapabilities::TOUCH) {
            slaves.extend(self.touch_device);
        }
        slaves
    }

    pub(crate) fn touch_devices(&self) -> Option<(DeviceId, DeviceId)> {
        self.touch_master.zip(self.touch_device)
    }

    /// The pointer state behind a pointer-like device, master or slave.
    pub fn pointer_state(&self, device: DeviceId) -> Option<&PointerState> {
        if device == self.master_pointer || Some(device) == self.pointer_device {
            return Some(&self.pointer);
        }
        if Some(device) == self.touch_master || Some(device) == self.touch_device {
            return Some(&self.touch_pointer);
        }
        self.tablet_for_device(device).map(|tablet| &tablet.pointer)
    }

    /// Where a pointer-like device is, and over which window.
    pub fn query_state(&self, device: DeviceId) -> Option<DeviceState> {
        let pointer = self.pointer_state(device)?;
        let root = match pointer.focus {
            Some(window) => self.root_coords(window, pointer.pos),
            None => pointer.pos,
        };
        Some(DeviceState {
            window: pointer.focus,
            pos: pointer.pos,
            root,
            state: self.modifier_state(pointer),
        })
    }

    /// Root coordinates of a window-local point. Unmapped windows use local
    /// coordinates.
    pub(crate) fn root_coords(&self, window: WindowId, pos: Point) -> Point {
        self.ctx.windows.root_coords(window, pos).unwrap_or(pos)
    }

    pub(crate) fn modifier_state(&self, pointer: &PointerState) -> ModifierState {
        ModifierState {
            keys: self.keyboard.modifiers,
            buttons: pointer.buttons,
        }
    }

    pub fn id(&self) -> SeatId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SeatConfig {
        &self.config
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn touch_pointer(&self) -> &PointerState {
        &self.touch_pointer
    }

    pub fn master_pointer(&self) -> DeviceId {
        self.master_pointer
    }

    pub fn master_keyboard(&self) -> DeviceId {
        self.master_keyboard
    }

    pub fn pointer_device(&self) -> Option<DeviceId> {
        self.pointer_device
    }

    pub fn keyboard_device(&self) -> Option<DeviceId> {
        self.keyboard_device
    }
}

/// Every seat of one display.
pub struct SeatManager {
    ctx: Rc<InputContext>,
    seats: BTreeMap<SeatId, Seat>,
}

impl SeatManager {
    pub fn new(ctx: Rc<InputContext>) -> Self {
        Self {
            ctx,
            seats: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &Rc<InputContext> {
        &self.ctx
    }

    /// Add a seat. A seat already known under `id` is kept.
    pub fn add_seat(&mut self, id: SeatId, name: impl Into<String>, config: SeatConfig) -> &mut Seat {
        let ctx = &self.ctx;
        self.seats.entry(id).or_insert_with(|| {
            tracing::debug!("seat {:?} added", id);
            Seat::new(ctx.clone(), id, name, config)
        })
    }

    /// Remove a seat, releasing all of its devices. Returns whether it existed.
    pub fn remove_seat(&mut self, id: SeatId) -> bool {
        match self.seats.remove(&id) {
            Some(mut seat) => {
                seat.finalize();
                tracing::debug!("seat {:?} removed", id);
                true
            }
            None => false,
        }
    }

    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.get(&id)
    }

    pub fn seat_mut(&mut self, id: SeatId) -> Option<&mut Seat> {
        self.seats.get_mut(&id)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    pub fn dispatch(&mut self, id: SeatId, notification: Notification) -> Result<(), Error> {
        let seat = self
            .seats
            .get_mut(&id)
            .ok_or_else(|| Error::string(format!("unknown seat {:?}", id)))?;
        seat.dispatch(notification);
        Ok(())
    }

    /// Deliver an expired key repeat timer.
    pub fn fire_key_repeat(&mut self, id: SeatId, device: DeviceId) -> bool {
        match self.seats.get_mut(&id) {
            Some(seat) => seat.fire_key_repeat(device),
            None => false,
        }
    }
}
