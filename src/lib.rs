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

//! Seat and input device handling for the glazier Wayland shell.
//!
//! The compositor describes input as a stream of small notifications:
//! pointer motion split from its frame, scroll split per axis, touch points,
//! tablet tools drifting in and out of proximity. This crate folds that
//! stream into per-seat device state and a queue of application-level
//! [`InputEvent`]s.
//!
//! Everything runs on one thread. Feed a [`SeatManager`] with
//! [`Notification`]s (the `wayland` feature translates real protocol
//! objects into them) and drain the events from its [`InputContext`].

#![deny(clippy::trivially_copy_pass_by_ref)]

use std::cell::{Ref, RefCell};
use std::rc::Rc;

#[cfg(any(feature = "wayland", feature = "xkb"))]
pub mod backend;

pub mod config;
pub mod cursor;
mod data_device;
pub mod device;
pub mod error;
pub mod event;
pub mod frame;
pub mod gesture;
pub mod grab;
pub mod keyboard;
pub mod pointer;
pub mod protocol;
pub mod seat;
pub mod serial;
pub mod tablet;
pub mod touch;
pub mod window;

pub use keyboard_types;

pub use config::{RepeatInfo, RepeatPreferences, RepeatSettings, SeatConfig};
pub use cursor::{Cursor, CursorTarget, CursorTheme, NoCursorTheme, OutputId};
pub use data_device::{CLIPBOARD, DRAG_SELECTION};
pub use device::{Device, DeviceId, DeviceKind, DeviceManager, DeviceType, SeatCapabilities};
pub use error::Error;
pub use event::{EventKind, EventQueue, EventType, InputEvent, ModifierState};
pub use grab::{GrabRecord, GrabRegistry, GrabRequest, GrabStatus};
pub use keyboard::{EvdevKeymap, Keymap, ManualRepeatScheduler, RepeatScheduler, TimerToken};
pub use protocol::Notification;
pub use seat::{DeviceState, Seat, SeatId, SeatManager};
pub use serial::SerialTracker;
pub use window::{WindowId, WindowResolver, WindowTree};

/// State shared by every seat of one display.
///
/// Holds the collaborators the seats call out to, the device and grab
/// registries, and the queue events are delivered to.
pub struct InputContext {
    pub(crate) serials: SerialTracker,
    pub(crate) devices: RefCell<DeviceManager>,
    pub(crate) grabs: RefCell<GrabRegistry>,
    pub(crate) queue: RefCell<EventQueue>,
    pub(crate) windows: Rc<dyn WindowResolver>,
    pub(crate) cursors: Rc<dyn CursorTheme>,
    pub(crate) prefs: Rc<dyn RepeatPreferences>,
    pub(crate) scheduler: Rc<dyn RepeatScheduler>,
}

impl InputContext {
    /// A context with no cursor theme, built-in repeat preferences, and a
    /// repeat scheduler that nobody fires.
    pub fn new(windows: Rc<dyn WindowResolver>) -> Self {
        Self {
            serials: SerialTracker::new(),
            devices: RefCell::new(DeviceManager::new()),
            grabs: RefCell::new(GrabRegistry::new()),
            queue: RefCell::new(EventQueue::new()),
            windows,
            cursors: Rc::new(NoCursorTheme),
            prefs: Rc::new(config::DefaultPreferences),
            scheduler: Rc::new(ManualRepeatScheduler::new()),
        }
    }

    pub fn with_cursor_theme(mut self, cursors: Rc<dyn CursorTheme>) -> Self {
        self.cursors = cursors;
        self
    }

    pub fn with_preferences(mut self, prefs: Rc<dyn RepeatPreferences>) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Rc<dyn RepeatScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn serials(&self) -> &SerialTracker {
        &self.serials
    }

    pub fn devices(&self) -> Ref<'_, DeviceManager> {
        self.devices.borrow()
    }

    pub fn grabs(&self) -> Ref<'_, GrabRegistry> {
        self.grabs.borrow()
    }

    pub fn windows(&self) -> &Rc<dyn WindowResolver> {
        &self.windows
    }

    /// Take the oldest undelivered event.
    pub fn next_event(&self) -> Option<InputEvent> {
        self.queue.borrow_mut().pop()
    }

    /// Take every undelivered event, oldest first.
    pub fn drain_events(&self) -> Vec<InputEvent> {
        self.queue.borrow_mut().drain().collect()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.borrow().len()
    }
}
