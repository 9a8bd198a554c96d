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

//! Tablets and their tools.
//!
//! Tools are announced to the seat, not to a tablet: a pen can move from one
//! tablet to another. While in proximity a tool is bound to exactly one
//! tablet, and the tablet's pointer state follows it.

use bitflags::bitflags;
use kurbo::Vec2;

use crate::cursor::CursorTarget;
use crate::device::{DeviceId, DeviceKind};
use crate::error::Error;
use crate::event::{
    Button, Crossing, CrossingMode, EventKind, EventType, InputEvent, Motion, Proximity,
};
use crate::pointer::PointerState;
use crate::protocol::{TabletNotification, TabletSeatNotification, ToolNotification};
use crate::Seat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabletId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    Pen,
    Eraser,
    Brush,
    Airbrush,
    Pencil,
    Unknown,
}

bitflags! {
    /// Axes a tool reports besides its position.
    pub struct ToolCapabilities: u32 {
        const TILT = 1;
        const PRESSURE = 1 << 1;
        const DISTANCE = 1 << 2;
    }
}

/// The latest axis values of a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToolAxes {
    pub pressure: Option<f64>,
    pub distance: Option<f64>,
    /// Degrees along x and y.
    pub tilt: Option<Vec2>,
}

#[derive(Debug, Clone)]
pub struct TabletTool {
    pub id: ToolId,
    pub tool_type: ToolType,
    pub capabilities: ToolCapabilities,
    pub hardware_serial: u64,
    pub hardware_id: u64,
    /// The tablet this tool is in proximity of.
    pub current_tablet: Option<TabletId>,
    /// All of the tool's description has arrived.
    pub ready: bool,
    pub axes: ToolAxes,
}

impl TabletTool {
    fn new(id: ToolId) -> Self {
        Self {
            id,
            tool_type: ToolType::Unknown,
            capabilities: ToolCapabilities::empty(),
            hardware_serial: 0,
            hardware_id: 0,
            current_tablet: None,
            ready: false,
            axes: ToolAxes::default(),
        }
    }
}

/// The devices a tablet shows up as, once it is fully described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabletDevices {
    pub master: DeviceId,
    pub stylus: DeviceId,
    pub eraser: DeviceId,
}

#[derive(Debug)]
pub struct TabletDevice {
    pub id: TabletId,
    pub name: String,
    pub vid: u32,
    pub pid: u32,
    pub path: Option<String>,
    pub(crate) pointer: PointerState,
    pub(crate) current_tool: Option<ToolId>,
    /// Stylus or eraser, depending on the current tool.
    pub(crate) current_device: Option<DeviceId>,
    pub(crate) devices: Option<TabletDevices>,
}

impl TabletDevice {
    fn new(id: TabletId) -> Self {
        Self {
            id,
            name: String::new(),
            vid: 0,
            pid: 0,
            path: None,
            pointer: PointerState::default(),
            current_tool: None,
            current_device: None,
            devices: None,
        }
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn current_tool(&self) -> Option<ToolId> {
        self.current_tool
    }

    pub fn devices(&self) -> Option<TabletDevices> {
        self.devices
    }
}

/// Convert an evdev stylus button code to a logical button.
fn stylus_button(code: u32) -> Option<u32> {
    const BTN_STYLUS: u32 = 0x14b;
    const BTN_STYLUS2: u32 = 0x14c;
    const BTN_STYLUS3: u32 = 0x149;

    match code {
        BTN_STYLUS => Some(2),
        BTN_STYLUS2 => Some(3),
        BTN_STYLUS3 => Some(8),
        _ => None,
    }
}

impl Seat {
    pub(crate) fn handle_tablet_seat(&mut self, event: TabletSeatNotification) {
        match event {
            TabletSeatNotification::TabletAdded(id) => {
                if self.tablet_index(id).is_some() {
                    tracing::warn!("tablet {:?} announced twice", id);
                    return;
                }
                tracing::debug!("tablet {:?} added", id);
                self.tablets.insert(0, TabletDevice::new(id));
            }
            TabletSeatNotification::ToolAdded(id) => {
                if self.tool_index(id).is_some() {
                    tracing::warn!("tablet tool {:?} announced twice", id);
                    return;
                }
                self.tools.insert(0, TabletTool::new(id));
            }
        }
    }

    pub(crate) fn handle_tablet(
        &mut self,
        id: TabletId,
        event: TabletNotification,
    ) -> Result<(), Error> {
        let index = self.tablet_index(id).ok_or(Error::UnknownTablet(id))?;
        match event {
            TabletNotification::Name(name) => self.tablets[index].name = name,
            TabletNotification::Id { vid, pid } => {
                let tablet = &mut self.tablets[index];
                tablet.vid = vid;
                tablet.pid = pid;
            }
            TabletNotification::Path(path) => self.tablets[index].path = Some(path),
            TabletNotification::Done => self.tablet_done(index),
            TabletNotification::Removed => self.remove_tablet(id),
        }
        Ok(())
    }

    fn tablet_done(&mut self, index: usize) {
        if self.tablets[index].devices.is_some() {
            return;
        }
        let name = self.tablets[index].name.clone();
        let mut devices = self.ctx.devices.borrow_mut();
        let master = devices.add(
            self.id,
            DeviceKind::TabletMaster,
            format!("Master pointer for {}", name),
        );
        let stylus = devices.add(self.id, DeviceKind::TabletStylus, name.clone());
        let eraser = devices.add(self.id, DeviceKind::TabletEraser, format!("{} (Eraser)", name));
        devices.associate(master, Some(self.master_keyboard));
        devices.associate(stylus, Some(master));
        devices.associate(eraser, Some(master));
        self.tablets[index].devices = Some(TabletDevices {
            master,
            stylus,
            eraser,
        });
    }

    /// Forget a tablet and the devices it showed up as.
    pub(crate) fn remove_tablet(&mut self, id: TabletId) {
        let index = match self.tablet_index(id) {
            Some(index) => index,
            None => return,
        };
        let mut tablet = self.tablets.remove(index);
        for tool in self.tools.iter_mut() {
            if tool.current_tablet == Some(id) {
                tool.current_tablet = None;
            }
        }
        if let Some(tool) = tablet.current_tool.take() {
            tablet
                .pointer
                .cursor
                .stop_animation(&*self.ctx.cursors, CursorTarget::Tool(tool));
        }
        if let Some(devices) = tablet.devices {
            self.frames.remove(devices.master);
            let mut grabs = self.ctx.grabs.borrow_mut();
            let mut manager = self.ctx.devices.borrow_mut();
            for device in [devices.stylus, devices.eraser, devices.master] {
                grabs.remove_device(device);
                manager.remove(device);
            }
        }
        tracing::debug!("tablet {:?} removed", id);
    }

    /// Forget a tool, detaching it from the tablet it is bound to.
    pub(crate) fn remove_tool(&mut self, id: ToolId) {
        let index = match self.tool_index(id) {
            Some(index) => index,
            None => return,
        };
        let tool = self.tools.remove(index);
        if let Some(tablet) = tool
            .current_tablet
            .and_then(|tablet| self.tablet_index(tablet))
        {
            let tablet = &mut self.tablets[tablet];
            if tablet.current_tool == Some(id) {
                tablet.current_tool = None;
                tablet
                    .pointer
                    .cursor
                    .stop_animation(&*self.ctx.cursors, CursorTarget::Tool(id));
            }
        }
        tracing::debug!("tablet tool {:?} removed", id);
    }

    pub(crate) fn handle_tool(&mut self, id: ToolId, event: ToolNotification) -> Result<(), Error> {
        let tool_index = self.tool_index(id).ok_or(Error::UnknownTool(id))?;
        match event {
            ToolNotification::Type(tool_type) => self.tools[tool_index].tool_type = tool_type,
            ToolNotification::HardwareSerial(serial) => {
                self.tools[tool_index].hardware_serial = serial
            }
            ToolNotification::HardwareId(hardware_id) => {
                self.tools[tool_index].hardware_id = hardware_id
            }
            ToolNotification::Capability(capability) => {
                self.tools[tool_index].capabilities |= capability
            }
            ToolNotification::Done => {
                let tool = &mut self.tools[tool_index];
                tool.ready = true;
                tracing::debug!(
                    "tablet tool {:?} added: {:?} {:?}",
                    id,
                    tool.tool_type,
                    tool.capabilities
                );
            }
            ToolNotification::Removed => self.remove_tool(id),
            ToolNotification::ProximityIn {
                serial,
                tablet,
                window,
            } => self.tool_proximity_in(tool_index, serial, tablet, window)?,
            event => {
                let index = match self.tools[tool_index]
                    .current_tablet
                    .and_then(|tablet| self.tablet_index(tablet))
                {
                    Some(index) => index,
                    None => {
                        tracing::warn!("tablet tool {:?} is not in proximity: {:?}", id, event);
                        return Ok(());
                    }
                };
                self.tool_event(tool_index, index, event);
            }
        }
        Ok(())
    }

    fn tool_proximity_in(
        &mut self,
        tool_index: usize,
        serial: u32,
        tablet: TabletId,
        window: crate::window::WindowId,
    ) -> Result<(), Error> {
        let index = self.tablet_index(tablet).ok_or(Error::UnknownTablet(tablet))?;
        let devices = self.tablets[index]
            .devices
            .ok_or(Error::UnknownTablet(tablet))?;
        if !self.ctx.windows.is_live(window) {
            return Err(Error::UnknownWindow(window));
        }
        let tool = &mut self.tools[tool_index];
        tool.current_tablet = Some(tablet);
        let tool_id = tool.id;
        let current_device = match tool.tool_type {
            ToolType::Eraser => devices.eraser,
            _ => devices.stylus,
        };

        self.ctx.serials.update(serial);
        let state = &mut self.tablets[index];
        state.current_tool = Some(tool_id);
        state.current_device = Some(current_device);
        state.pointer.enter_serial = serial;
        state.pointer.focus = Some(window);

        tracing::trace!("proximity in, tool {:?} on {:?}", tool_id, window);
        let proximity = Proximity {
            tool: Some(tool_id),
        };
        self.stage_tablet_event(index, window, EventKind::ProximityIn(proximity));
        self.update_tablet_cursor(index);
        Ok(())
    }

    fn tool_event(&mut self, tool_index: usize, index: usize, event: ToolNotification) {
        let tool_id = self.tools[tool_index].id;
        match event {
            ToolNotification::ProximityOut => {
                let window = match self.tablets[index].pointer.focus {
                    Some(window) => window,
                    None => return,
                };
                tracing::trace!("proximity out, tool {:?}", tool_id);
                let proximity = Proximity {
                    tool: Some(tool_id),
                };
                self.stage_tablet_event(index, window, EventKind::ProximityOut(proximity));
                let tablet = &mut self.tablets[index];
                tablet
                    .pointer
                    .cursor
                    .clear(&*self.ctx.cursors, CursorTarget::Tool(tool_id));
                tablet.pointer.focus = None;
            }
            ToolNotification::Down { serial } => {
                self.ctx.serials.update(serial);
                self.tablets[index].pointer.press_serial = serial;
                self.tablet_button(index, 1, true);
            }
            ToolNotification::Up => self.tablet_button(index, 1, false),
            ToolNotification::Button {
                serial,
                button,
                pressed,
            } => {
                self.ctx.serials.update(serial);
                match stylus_button(button) {
                    Some(button) => {
                        if pressed {
                            self.tablets[index].pointer.press_serial = serial;
                        }
                        self.tablet_button(index, button, pressed);
                    }
                    None => tracing::warn!("unknown stylus button 0x{:x}", button),
                }
            }
            ToolNotification::Motion(pos) => {
                let window = match self.tablets[index].pointer.focus {
                    Some(window) => window,
                    None => return,
                };
                self.tablets[index].pointer.pos = pos;
                tracing::trace!("tablet motion {:?}", pos);
                let motion = Motion {
                    pos,
                    root: self.root_coords(window, pos),
                    state: self.modifier_state(&self.tablets[index].pointer),
                    axes: Some(self.tools[tool_index].axes),
                };
                self.stage_tablet_event(index, window, EventKind::Motion(motion));
            }
            ToolNotification::Pressure(pressure) => {
                self.tools[tool_index].axes.pressure = Some(pressure);
                self.refresh_staged_axes(tool_index, index);
            }
            ToolNotification::Distance(distance) => {
                self.tools[tool_index].axes.distance = Some(distance);
                self.refresh_staged_axes(tool_index, index);
            }
            ToolNotification::Tilt(tilt) => {
                self.tools[tool_index].axes.tilt = Some(tilt);
                self.refresh_staged_axes(tool_index, index);
            }
            ToolNotification::Frame { time } => {
                tracing::trace!("tablet frame, time {}", time);
                let master = match self.tablets[index].devices {
                    Some(devices) => devices.master,
                    None => return,
                };
                if self.frames.staged_type(master) == Some(EventType::ProximityOut) {
                    self.tools[tool_index].current_tablet = None;
                    self.tablets[index].current_tool = None;
                }
                self.tablets[index].pointer.time = time;
                self.flush_tablet_frame(index, time);
            }
            ToolNotification::Type(_)
            | ToolNotification::HardwareSerial(_)
            | ToolNotification::HardwareId(_)
            | ToolNotification::Capability(_)
            | ToolNotification::Done
            | ToolNotification::Removed
            | ToolNotification::ProximityIn { .. } => {}
        }
    }

    fn tablet_button(&mut self, index: usize, button: u32, pressed: bool) {
        let window = match self.tablets[index].pointer.focus {
            Some(window) => window,
            None => return,
        };
        let pointer = &self.tablets[index].pointer;
        let info = Button {
            button,
            pos: pointer.pos,
            root: self.root_coords(window, pointer.pos),
            state: self.modifier_state(pointer),
        };
        let kind = if pressed {
            EventKind::ButtonPress(info)
        } else {
            EventKind::ButtonRelease(info)
        };
        self.stage_tablet_event(index, window, kind);
        self.tablets[index].pointer.buttons.set(button, pressed);
    }

    /// Axis updates that arrive after the motion of the same frame still apply to it.
    fn refresh_staged_axes(&mut self, tool_index: usize, index: usize) {
        let axes = self.tools[tool_index].axes;
        let master = match self.tablets[index].devices {
            Some(devices) => devices.master,
            None => return,
        };
        if let Some(InputEvent {
            kind: EventKind::Motion(motion),
            ..
        }) = self.frames.staged_mut(master)
        {
            motion.axes = Some(axes);
        }
    }

    fn stage_tablet_event(&mut self, index: usize, window: crate::window::WindowId, kind: EventKind) {
        let tablet = &self.tablets[index];
        let (devices, source) = match (tablet.devices, tablet.current_device) {
            (Some(devices), Some(source)) => (devices, source),
            _ => return,
        };
        let staged = self.frames.staged_type(devices.master);
        if staged.is_some() && staged != Some(kind.event_type()) {
            self.flush_tablet_frame(index, 0);
        }
        let event = InputEvent {
            seat: self.id,
            device: devices.master,
            source_device: source,
            window,
            time: self.tablets[index].pointer.time,
            kind,
        };
        self.frames.stage(event, &mut self.ctx.queue.borrow_mut());
    }

    /// Deliver the staged tablet event.
    ///
    /// Proximity-out is preceded by a leave, proximity-in followed by an
    /// enter, so crossing observers always see the tool bound.
    fn flush_tablet_frame(&mut self, index: usize, time: u32) {
        let master = match self.tablets[index].devices {
            Some(devices) => devices.master,
            None => return,
        };
        let mut event = match self.frames.take_staged(master) {
            Some(event) => event,
            None => return,
        };
        event.time = time;
        let ty = event.event_type();
        let window = event.window;
        if ty == EventType::ProximityOut {
            self.tablet_crossing(index, master, window, time, false);
        }
        self.ctx.queue.borrow_mut().push(event);
        if ty == EventType::ProximityIn {
            self.tablet_crossing(index, master, window, time, true);
        }
    }

    fn tablet_crossing(
        &self,
        index: usize,
        master: DeviceId,
        window: crate::window::WindowId,
        time: u32,
        enter: bool,
    ) {
        let pointer = &self.tablets[index].pointer;
        let crossing = Crossing {
            pos: pointer.pos,
            root: self.root_coords(window, pointer.pos),
            mode: CrossingMode::Normal,
            subwindow: None,
            state: self.modifier_state(pointer),
        };
        let kind = if enter {
            EventKind::Enter(crossing)
        } else {
            EventKind::Leave(crossing)
        };
        self.ctx.queue.borrow_mut().push(InputEvent {
            seat: self.id,
            device: master,
            source_device: master,
            window,
            time,
            kind,
        });
    }

    pub(crate) fn update_tablet_cursor(&mut self, index: usize) {
        let tablet = &self.tablets[index];
        let tool = match tablet.current_tool {
            Some(tool) => tool,
            None => return,
        };
        let cursor = self
            .grab_cursor
            .clone()
            .or_else(|| tablet.pointer.focus.and_then(|window| self.ctx.windows.cursor(window)))
            .unwrap_or_else(|| self.config.default_cursor.clone());
        let serial = tablet.pointer.enter_serial;
        self.tablets[index].pointer.cursor.set(
            &*self.ctx.cursors,
            CursorTarget::Tool(tool),
            cursor,
            serial,
        );
    }

    pub fn tablets(&self) -> &[TabletDevice] {
        &self.tablets
    }

    pub fn tools(&self) -> &[TabletTool] {
        &self.tools
    }

    pub fn tablet(&self, id: TabletId) -> Option<&TabletDevice> {
        self.tablets.iter().find(|tablet| tablet.id == id)
    }

    pub fn tool(&self, id: ToolId) -> Option<&TabletTool> {
        self.tools.iter().find(|tool| tool.id == id)
    }

    pub(crate) fn tablet_index(&self, id: TabletId) -> Option<usize> {
        self.tablets.iter().position(|tablet| tablet.id == id)
    }

    fn tool_index(&self, id: ToolId) -> Option<usize> {
        self.tools.iter().position(|tool| tool.id == id)
    }

    /// The tablet whose master, stylus or eraser is `device`.
    pub(crate) fn tablet_for_device(&self, device: DeviceId) -> Option<&TabletDevice> {
        self.tablets.iter().find(|tablet| match tablet.devices {
            Some(devices) => {
                devices.master == device || devices.stylus == device || devices.eraser == device
            }
            None => false,
        })
    }
}
