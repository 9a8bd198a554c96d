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

//! Raw seat notifications, as the transport delivers them.
//!
//! These mirror the Wayland seat, gesture, tablet and data-device protocols
//! with transport objects already resolved to ids. Coordinates are
//! surface-local and already converted from fixed point.

use kurbo::{Point, Vec2};

use crate::device::SeatCapabilities;
use crate::tablet::{TabletId, ToolCapabilities, ToolId, ToolType};
use crate::touch::TouchId;
use crate::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    Wheel,
    Finger,
    Continuous,
    WheelTilt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerNotification {
    Enter {
        serial: u32,
        window: WindowId,
        pos: Point,
    },
    Leave {
        serial: u32,
        window: WindowId,
    },
    Motion {
        time: u32,
        pos: Point,
    },
    /// `button` is an evdev button code.
    Button {
        serial: u32,
        time: u32,
        button: u32,
        pressed: bool,
    },
    /// `value` is in surface-local units, as the compositor sent it.
    Axis {
        time: u32,
        axis: Axis,
        value: f64,
    },
    AxisSource(AxisSource),
    AxisStop {
        time: u32,
        axis: Axis,
    },
    AxisDiscrete {
        axis: Axis,
        discrete: i32,
    },
    Frame,
}

/// The pointer's cursor surface moved between outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorSurfaceNotification {
    Enter(crate::cursor::OutputId),
    Leave(crate::cursor::OutputId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeymapFormat {
    NoKeymap,
    XkbV1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardNotification {
    Keymap {
        format: KeymapFormat,
        data: Vec<u8>,
    },
    Enter {
        serial: u32,
        window: WindowId,
        /// evdev codes of the keys already held down.
        keys: Vec<u32>,
    },
    Leave {
        serial: u32,
        window: WindowId,
    },
    /// `key` is an evdev key code.
    Key {
        serial: u32,
        time: u32,
        key: u32,
        pressed: bool,
    },
    Modifiers {
        serial: u32,
        depressed: u32,
        latched: u32,
        locked: u32,
        group: u32,
    },
    /// `rate` in keys per second, `delay` in milliseconds. A rate of 0 disables repeat.
    RepeatInfo {
        rate: i32,
        delay: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TouchNotification {
    Down {
        serial: u32,
        time: u32,
        window: WindowId,
        id: TouchId,
        pos: Point,
    },
    Up {
        serial: u32,
        time: u32,
        id: TouchId,
    },
    Motion {
        time: u32,
        id: TouchId,
        pos: Point,
    },
    Frame,
    Cancel,
}

/// Swipe and pinch gestures share one shape; swipes leave `scale` at 1
/// and `rotation` at 0.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureNotification {
    Begin {
        serial: u32,
        time: u32,
        window: WindowId,
        fingers: u32,
    },
    Update {
        time: u32,
        delta: Vec2,
        scale: f64,
        /// Degrees, clockwise.
        rotation: f64,
    },
    End {
        serial: u32,
        time: u32,
        cancelled: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabletSeatNotification {
    TabletAdded(TabletId),
    ToolAdded(ToolId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabletNotification {
    Name(String),
    Id { vid: u32, pid: u32 },
    Path(String),
    Done,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolNotification {
    Type(ToolType),
    HardwareSerial(u64),
    HardwareId(u64),
    Capability(ToolCapabilities),
    Done,
    Removed,
    ProximityIn {
        serial: u32,
        tablet: TabletId,
        window: WindowId,
    },
    ProximityOut,
    Down {
        serial: u32,
    },
    Up,
    Motion(Point),
    /// Normalized to `0.0..=1.0`.
    Pressure(f64),
    /// Normalized to `0.0..=1.0`.
    Distance(f64),
    /// Degrees from the perpendicular.
    Tilt(Vec2),
    /// `button` is an evdev button code.
    Button {
        serial: u32,
        button: u32,
        pressed: bool,
    },
    Frame {
        time: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataDeviceNotification {
    Enter {
        serial: u32,
        window: WindowId,
        pos: Point,
    },
    Leave,
    Motion {
        time: u32,
        pos: Point,
    },
    Drop,
    /// The clipboard changed hands. `offered` is false when it was cleared.
    Selection {
        offered: bool,
    },
}

/// Everything a seat can be told.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Capabilities(SeatCapabilities),
    Name(String),
    Pointer(PointerNotification),
    CursorSurface(CursorSurfaceNotification),
    Keyboard(KeyboardNotification),
    Touch(TouchNotification),
    Swipe(GestureNotification),
    Pinch(GestureNotification),
    TabletSeat(TabletSeatNotification),
    Tablet {
        tablet: TabletId,
        event: TabletNotification,
    },
    Tool {
        tool: ToolId,
        event: ToolNotification,
    },
    DataDevice(DataDeviceNotification),
}

impl From<PointerNotification> for Notification {
    fn from(event: PointerNotification) -> Self {
        Notification::Pointer(event)
    }
}

impl From<KeyboardNotification> for Notification {
    fn from(event: KeyboardNotification) -> Self {
        Notification::Keyboard(event)
    }
}

impl From<TouchNotification> for Notification {
    fn from(event: TouchNotification) -> Self {
        Notification::Touch(event)
    }
}

impl From<DataDeviceNotification> for Notification {
    fn from(event: DataDeviceNotification) -> Self {
        Notification::DataDevice(event)
    }
}
