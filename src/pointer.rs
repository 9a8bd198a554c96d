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

//! Pointer state and the pointer notification handlers.

use kurbo::{Point, Vec2};

use crate::cursor::{CursorState, CursorTarget, OutputId};
use crate::device::DeviceId;
use crate::error::Error;
use crate::event::{
    Button, ButtonMask, Crossing, CrossingMode, EventKind, InputEvent, Motion,
};
use crate::frame::ScrollTarget;
use crate::protocol::{Axis, CursorSurfaceNotification, PointerNotification};
use crate::window::WindowId;
use crate::Seat;

/// Axis values arrive in surface units; scroll deltas are in wheel steps.
const AXIS_UNITS_PER_STEP: f64 = 10.;

/// Pointer-like state of a master device.
///
/// The core pointer, the touch master (while a touch emulates the pointer)
/// and every tablet master carry one.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    pub(crate) focus: Option<WindowId>,
    /// Surface-local position in the focus window.
    pub(crate) pos: Point,
    pub(crate) buttons: ButtonMask,
    pub(crate) time: u32,
    pub(crate) enter_serial: u32,
    pub(crate) press_serial: u32,
    pub(crate) grab: Option<PointerGrab>,
    pub(crate) cursor: CursorState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerGrab {
    pub window: WindowId,
    pub time: u32,
}

impl PointerState {
    pub fn focus(&self) -> Option<WindowId> {
        self.focus
    }

    pub fn pos(&self) -> Point {
        self.pos
    }

    pub fn buttons(&self) -> ButtonMask {
        self.buttons
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn enter_serial(&self) -> u32 {
        self.enter_serial
    }

    pub fn press_serial(&self) -> u32 {
        self.press_serial
    }

    pub fn grab(&self) -> Option<PointerGrab> {
        self.grab
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }
}

/// Convert an evdev button code to a 1-indexed logical button.
///
/// Left, middle and right are 1, 2 and 3. Everything else goes after the
/// legacy scroll buttons 4 to 7.
pub fn logical_button(code: u32) -> u32 {
    // These values are comming from <linux/input-event-codes.h>.
    const BTN_LEFT: u32 = 0x110;
    const BTN_RIGHT: u32 = 0x111;
    const BTN_MIDDLE: u32 = 0x112;

    match code {
        BTN_LEFT => 1,
        BTN_MIDDLE => 2,
        BTN_RIGHT => 3,
        code => code.wrapping_sub(BTN_LEFT - 1).wrapping_add(4),
    }
}

impl Seat {
    pub(crate) fn handle_pointer(&mut self, event: PointerNotification) -> Result<(), Error> {
        let source = self.pointer_device.ok_or(Error::NoDevice("pointer"))?;
        match event {
            PointerNotification::Enter {
                serial,
                window,
                pos,
            } => self.pointer_enter(source, serial, window, pos)?,
            PointerNotification::Leave { serial, window } => {
                self.pointer_leave(source, serial, window)
            }
            PointerNotification::Motion { time, pos } => self.pointer_motion(source, time, pos),
            PointerNotification::Button {
                serial,
                time,
                button,
                pressed,
            } => self.pointer_button(source, serial, time, button, pressed),
            PointerNotification::Axis { time, axis, value } => {
                if self.pointer.focus.is_none() {
                    return Ok(());
                }
                self.pointer.time = time;
                let delta = value / AXIS_UNITS_PER_STEP;
                tracing::trace!("scroll, axis {:?}, value {}", axis, delta);
                let delta = match axis {
                    Axis::Vertical => Vec2::new(0., delta),
                    Axis::Horizontal => Vec2::new(delta, 0.),
                };
                self.frames.scroll_mut(self.master_pointer).add_delta(delta);
                if self.frames.is_immediate() {
                    self.flush_pointer_frame();
                }
            }
            PointerNotification::AxisSource(axis_source) => {
                // Finger scrolling ends with axis_stop, which is all kinetic
                // scrolling needs.
                if self.pointer.focus.is_some() {
                    tracing::trace!("axis source {:?}", axis_source);
                }
            }
            PointerNotification::AxisStop { time, axis } => {
                if self.pointer.focus.is_none() {
                    return Ok(());
                }
                self.pointer.time = time;
                let scroll = self.frames.scroll_mut(self.master_pointer);
                match axis {
                    Axis::Vertical => scroll.stop_vertical(),
                    Axis::Horizontal => scroll.stop_horizontal(),
                }
                tracing::trace!("axis stop {:?}", axis);
            }
            PointerNotification::AxisDiscrete { axis, discrete } => {
                if self.pointer.focus.is_none() {
                    return Ok(());
                }
                self.frames
                    .scroll_mut(self.master_pointer)
                    .set_discrete(axis == Axis::Horizontal, discrete);
                tracing::trace!("discrete scroll, axis {:?}, value {}", axis, discrete);
            }
            PointerNotification::Frame => {
                tracing::trace!("pointer frame");
                self.flush_pointer_frame();
            }
        }
        Ok(())
    }

    fn pointer_enter(
        &mut self,
        source: DeviceId,
        serial: u32,
        window: WindowId,
        pos: Point,
    ) -> Result<(), Error> {
        if !self.ctx.windows.is_live(window) {
            return Err(Error::UnknownWindow(window));
        }
        self.ctx.serials.update(serial);

        self.pointer.focus = Some(window);
        self.pointer.buttons = ButtonMask::empty();
        self.pointer.pos = pos;
        self.pointer.enter_serial = serial;

        let crossing = Crossing {
            pos,
            root: self.root_coords(window, pos),
            mode: CrossingMode::Normal,
            subwindow: None,
            state: self.modifier_state(&self.pointer),
        };
        let event = self.pointer_event(source, window, EventKind::Enter(crossing));
        self.frames.stage(event, &mut self.ctx.queue.borrow_mut());
        tracing::trace!("enter {:?} at {:?}", window, pos);

        self.update_pointer_cursor();
        if self.frames.is_immediate() {
            self.flush_pointer_frame();
        }
        Ok(())
    }

    fn pointer_leave(&mut self, source: DeviceId, serial: u32, window: WindowId) {
        let focus = match self.pointer.focus {
            Some(focus) => focus,
            None => return,
        };
        if focus != window {
            tracing::debug!("leave for {:?} while {:?} has the pointer", window, focus);
        }
        self.ctx.serials.update(serial);

        let crossing = Crossing {
            pos: self.pointer.pos,
            root: self.root_coords(focus, self.pointer.pos),
            mode: CrossingMode::Normal,
            subwindow: None,
            state: self.modifier_state(&self.pointer),
        };
        let event = self.pointer_event(source, focus, EventKind::Leave(crossing));
        self.frames.stage(event, &mut self.ctx.queue.borrow_mut());
        tracing::trace!("leave {:?}", focus);

        self.pointer.focus = None;
        self.pointer
            .cursor
            .clear(&*self.ctx.cursors, CursorTarget::Pointer(self.master_pointer));
        if self.frames.is_immediate() {
            self.flush_pointer_frame();
        }
    }

    fn pointer_motion(&mut self, source: DeviceId, time: u32, pos: Point) {
        let focus = match self.pointer.focus {
            Some(focus) => focus,
            None => return,
        };
        self.pointer.time = time;
        self.pointer.pos = pos;

        let motion = Motion {
            pos,
            root: self.root_coords(focus, pos),
            state: self.modifier_state(&self.pointer),
            axes: None,
        };
        let event = self.pointer_event(source, focus, EventKind::Motion(motion));
        self.frames.stage(event, &mut self.ctx.queue.borrow_mut());
        if self.frames.is_immediate() {
            self.flush_pointer_frame();
        }
    }

    fn pointer_button(&mut self, source: DeviceId, serial: u32, time: u32, code: u32, pressed: bool) {
        let focus = match self.pointer.focus {
            Some(focus) => focus,
            None => return,
        };
        self.ctx.serials.update(serial);

        let button = logical_button(code);
        self.pointer.time = time;
        if pressed {
            self.pointer.press_serial = serial;
        }

        let info = Button {
            button,
            pos: self.pointer.pos,
            root: self.root_coords(focus, self.pointer.pos),
            state: self.modifier_state(&self.pointer),
        };
        let kind = if pressed {
            EventKind::ButtonPress(info)
        } else {
            EventKind::ButtonRelease(info)
        };
        let event = self.pointer_event(source, focus, kind);
        self.frames.stage(event, &mut self.ctx.queue.borrow_mut());
        self.pointer.buttons.set(button, pressed);
        tracing::trace!(
            "button {} {}",
            button,
            if pressed { "press" } else { "release" }
        );

        if self.frames.is_immediate() {
            self.flush_pointer_frame();
        }
    }

    /// Deliver whatever the current pointer frame holds.
    pub(crate) fn flush_pointer_frame(&mut self) {
        let target = self.pointer_scroll_target();
        self.frames.flush(
            self.master_pointer,
            target.as_ref(),
            &mut self.ctx.queue.borrow_mut(),
        );
    }

    fn pointer_scroll_target(&self) -> Option<ScrollTarget> {
        let window = self.pointer.focus?;
        Some(ScrollTarget {
            seat: self.id,
            device: self.master_pointer,
            source_device: self.pointer_device?,
            window,
            time: self.pointer.time,
            pos: self.pointer.pos,
            root: self.root_coords(window, self.pointer.pos),
            state: self.modifier_state(&self.pointer),
        })
    }

    fn pointer_event(&self, source: DeviceId, window: WindowId, kind: EventKind) -> InputEvent {
        InputEvent {
            seat: self.id,
            device: self.master_pointer,
            source_device: source,
            window,
            time: self.pointer.time,
            kind,
        }
    }

    /// Pick the cursor for the pointer's focus window and show it.
    ///
    /// A grab cursor wins over the window's own cursor.
    pub(crate) fn update_pointer_cursor(&mut self) {
        if self.pointer_device.is_none() {
            return;
        }
        let cursor = self
            .grab_cursor
            .clone()
            .or_else(|| self.pointer.focus.and_then(|window| self.ctx.windows.cursor(window)))
            .unwrap_or_else(|| self.config.default_cursor.clone());
        let serial = self.pointer.enter_serial;
        self.pointer.cursor.set(
            &*self.ctx.cursors,
            CursorTarget::Pointer(self.master_pointer),
            cursor,
            serial,
        );
    }

    pub(crate) fn handle_cursor_surface(&mut self, event: CursorSurfaceNotification) {
        let (output, entered) = match event {
            CursorSurfaceNotification::Enter(output) => (output, true),
            CursorSurfaceNotification::Leave(output) => (output, false),
        };
        self.cursor_surface_output(output, entered);
    }

    fn cursor_surface_output(&mut self, output: OutputId, entered: bool) {
        tracing::trace!(
            "pointer surface {} output {:?}",
            if entered { "entered" } else { "left" },
            output
        );
        if entered {
            self.pointer.cursor.outputs.insert(output);
        } else {
            self.pointer.cursor.outputs.remove(&output);
        }
        if self.pointer.cursor.update_scale(&*self.ctx.cursors) {
            let serial = self.pointer.enter_serial;
            self.pointer.cursor.refresh(
                &*self.ctx.cursors,
                CursorTarget::Pointer(self.master_pointer),
                serial,
            );
        }
    }
}
