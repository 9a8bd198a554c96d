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

//! Clipboard ownership and drag-and-drop pointer tracking.
//!
//! During a drag the compositor stops sending pointer events and sends
//! data-device events instead. They are folded into the master pointer's
//! state so position and focus queries keep answering.

use crate::error::Error;
use crate::protocol::DataDeviceNotification;
use crate::Seat;

pub const CLIPBOARD: &str = "CLIPBOARD";
pub const DRAG_SELECTION: &str = "XdndSelection";

impl Seat {
    pub(crate) fn handle_data_device(&mut self, event: DataDeviceNotification) -> Result<(), Error> {
        match event {
            DataDeviceNotification::Enter {
                serial,
                window,
                pos,
            } => {
                if !self.ctx.windows.is_live(window) {
                    return Err(Error::UnknownWindow(window));
                }
                self.ctx.serials.update(serial);
                tracing::trace!("drag enter {:?} at {:?}", window, pos);
                self.dnd_window = Some(window);
                self.pointer.focus = Some(window);
                self.pointer.pos = pos;
                self.push_owner_change(window, DRAG_SELECTION.to_owned());
            }
            DataDeviceNotification::Leave => {
                if self.dnd_window.take().is_some() {
                    tracing::trace!("drag leave");
                    self.pointer.focus = None;
                }
            }
            DataDeviceNotification::Motion { time, pos } => {
                if self.dnd_window.is_none() {
                    return Ok(());
                }
                self.pointer.pos = pos;
                self.pointer.time = time;
            }
            DataDeviceNotification::Drop => {
                tracing::trace!("drop on {:?}", self.dnd_window);
            }
            DataDeviceNotification::Selection { offered } => {
                tracing::trace!("selection {}", if offered { "offered" } else { "cleared" });
                match self.keyboard.focus {
                    Some(window) => self.push_owner_change(window, CLIPBOARD.to_owned()),
                    None => self.pending_selection = Some(CLIPBOARD.to_owned()),
                }
            }
        }
        Ok(())
    }

    /// The window a drag is currently over.
    pub fn drag_window(&self) -> Option<crate::window::WindowId> {
        self.dnd_window
    }
}
