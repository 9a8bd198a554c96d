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

//! Semantic input events, and the queue they are delivered to.

use std::collections::VecDeque;

use keyboard_types::{Code, Key, Modifiers};
use kurbo::{Point, Vec2};

use crate::device::DeviceId;
use crate::seat::SeatId;
use crate::tablet::{ToolAxes, ToolId};
use crate::touch::TouchId;
use crate::window::WindowId;

/// Pressed pointer buttons, one bit per logical button.
///
/// Button `n` (1-indexed) is bit `n - 1`. Buttons past 32 are not tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonMask(u32);

impl ButtonMask {
    pub const fn empty() -> Self {
        ButtonMask(0)
    }

    fn bit(button: u32) -> u32 {
        button
            .checked_sub(1)
            .and_then(|shift| 1u32.checked_shl(shift))
            .unwrap_or(0)
    }

    pub fn set(&mut self, button: u32, pressed: bool) {
        if pressed {
            self.0 |= Self::bit(button);
        } else {
            self.0 &= !Self::bit(button);
        }
    }

    pub fn contains(self, button: u32) -> bool {
        let bit = Self::bit(button);
        bit != 0 && self.0 & bit == bit
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Keyboard modifiers together with held pointer buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub keys: Modifiers,
    pub buttons: ButtonMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingMode {
    Normal,
    Grab,
    Ungrab,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Crossing {
    pub pos: Point,
    pub root: Point,
    pub mode: CrossingMode,
    /// The window on the other side of the crossing, if known.
    pub subwindow: Option<WindowId>,
    pub state: ModifierState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    pub pos: Point,
    pub root: Point,
    pub state: ModifierState,
    /// Tablet axes, for motion coming from a tablet tool.
    pub axes: Option<ToolAxes>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    /// 1-indexed logical button.
    pub button: u32,
    pub pos: Point,
    pub root: Point,
    /// The state before this press or release took effect.
    pub state: ModifierState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
    /// Continuous scrolling; see [`Scroll::delta`].
    Smooth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scroll {
    pub direction: ScrollDirection,
    /// Only meaningful for [`ScrollDirection::Smooth`].
    pub delta: Vec2,
    /// The scroll sequence ended on every axis (kinetic scrolling may start).
    pub is_stop: bool,
    /// Synthesized from discrete wheel steps.
    pub emulated: bool,
    pub pos: Point,
    pub root: Point,
    pub state: ModifierState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    /// xkb keycode (evdev code + 8).
    pub keycode: u32,
    pub key: Key,
    pub code: Code,
    pub state: ModifierState,
    pub is_modifier: bool,
    /// Synthesized by key repeat rather than sent by the compositor.
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Touch {
    pub sequence: TouchId,
    pub pos: Point,
    pub root: Point,
    pub state: ModifierState,
    /// This contact also drives the touch master's emulated pointer.
    pub emulating_pointer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Begin,
    Update,
    End,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Swipe {
    pub phase: GesturePhase,
    pub n_fingers: u32,
    pub delta: Vec2,
    pub pos: Point,
    pub root: Point,
    pub state: ModifierState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pinch {
    pub phase: GesturePhase,
    pub n_fingers: u32,
    pub delta: Vec2,
    /// Scale relative to the start of the gesture.
    pub scale: f64,
    /// Rotation since the last event, in radians.
    pub angle_delta: f64,
    pub pos: Point,
    pub root: Point,
    pub state: ModifierState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proximity {
    pub tool: Option<ToolId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerChange {
    /// The selection whose owner changed, e.g. `"CLIPBOARD"`.
    pub selection: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Enter(Crossing),
    Leave(Crossing),
    FocusChange { focus_in: bool },
    Motion(Motion),
    ButtonPress(Button),
    ButtonRelease(Button),
    Scroll(Scroll),
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    TouchBegin(Touch),
    TouchUpdate(Touch),
    TouchEnd(Touch),
    TouchCancel(Touch),
    TouchpadSwipe(Swipe),
    TouchpadPinch(Pinch),
    ProximityIn(Proximity),
    ProximityOut(Proximity),
    OwnerChange(OwnerChange),
}

/// The type of an [`EventKind`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Enter,
    Leave,
    FocusChange,
    Motion,
    ButtonPress,
    ButtonRelease,
    Scroll,
    KeyPress,
    KeyRelease,
    TouchBegin,
    TouchUpdate,
    TouchEnd,
    TouchCancel,
    TouchpadSwipe,
    TouchpadPinch,
    ProximityIn,
    ProximityOut,
    OwnerChange,
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Enter(_) => EventType::Enter,
            EventKind::Leave(_) => EventType::Leave,
            EventKind::FocusChange { .. } => EventType::FocusChange,
            EventKind::Motion(_) => EventType::Motion,
            EventKind::ButtonPress(_) => EventType::ButtonPress,
            EventKind::ButtonRelease(_) => EventType::ButtonRelease,
            EventKind::Scroll(_) => EventType::Scroll,
            EventKind::KeyPress(_) => EventType::KeyPress,
            EventKind::KeyRelease(_) => EventType::KeyRelease,
            EventKind::TouchBegin(_) => EventType::TouchBegin,
            EventKind::TouchUpdate(_) => EventType::TouchUpdate,
            EventKind::TouchEnd(_) => EventType::TouchEnd,
            EventKind::TouchCancel(_) => EventType::TouchCancel,
            EventKind::TouchpadSwipe(_) => EventType::TouchpadSwipe,
            EventKind::TouchpadPinch(_) => EventType::TouchpadPinch,
            EventKind::ProximityIn(_) => EventType::ProximityIn,
            EventKind::ProximityOut(_) => EventType::ProximityOut,
            EventKind::OwnerChange(_) => EventType::OwnerChange,
        }
    }
}

/// One finished input event.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub seat: SeatId,
    /// The master device the event is routed through.
    pub device: DeviceId,
    /// The physical device that produced it.
    pub source_device: DeviceId,
    pub window: WindowId,
    /// Compositor timestamp in milliseconds, 0 when synthesized without one.
    pub time: u32,
    pub kind: EventKind,
}

impl InputEvent {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

/// The ordered stream of events waiting for the application.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        tracing::trace!(
            "deliver {:?} on {:?} from {:?}",
            event.event_type(),
            event.window,
            event.source_device
        );
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
