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

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs::File;
use std::os::fd::OwnedFd;
use std::os::unix::fs::FileExt;
use std::rc::Rc;
use std::time::Duration;

use smithay_client_toolkit::reexports::calloop::timer::{TimeoutAction, Timer};
use smithay_client_toolkit::reexports::calloop::{LoopHandle, RegistrationToken};
use smithay_client_toolkit::reexports::client::protocol::wl_keyboard::{self, WlKeyboard};
use smithay_client_toolkit::reexports::client::{Connection, Dispatch, QueueHandle, WEnum};

use crate::device::DeviceId;
use crate::keyboard::{RepeatScheduler, TimerToken};
use crate::protocol::{KeyboardNotification, KeymapFormat};
use crate::seat::SeatId;

use super::error::Error;
use super::{window_id, WaylandInput};

/// Key repeat timers on the calloop event loop driving the input queue.
pub struct CalloopRepeatScheduler {
    /// Loop handle to handle key repeat.
    loop_handle: LoopHandle<'static, WaylandInput>,
    next: Cell<u64>,
    /// Timers that have neither fired nor been cancelled.
    timers: Rc<RefCell<BTreeMap<TimerToken, RegistrationToken>>>,
}

impl CalloopRepeatScheduler {
    pub fn new(loop_handle: LoopHandle<'static, WaylandInput>) -> Self {
        Self {
            loop_handle,
            next: Cell::new(0),
            timers: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }
}

impl RepeatScheduler for CalloopRepeatScheduler {
    fn schedule(
        &self,
        seat: SeatId,
        device: DeviceId,
        delay: Duration,
    ) -> Result<TimerToken, crate::Error> {
        let token = TimerToken(self.next.get());
        self.next.set(token.0 + 1);

        let timers = self.timers.clone();
        let registration = self
            .loop_handle
            .insert_source(Timer::from_duration(delay), move |_, _, state| {
                timers.borrow_mut().remove(&token);
                // The seat schedules the next timer itself if the key is still held.
                state.seats.fire_key_repeat(seat, device);
                TimeoutAction::Drop
            })
            .map_err(|e| crate::Error::timer(e.error))?;
        self.timers.borrow_mut().insert(token, registration);
        Ok(token)
    }

    fn cancel(&self, token: TimerToken) {
        let registration = self.timers.borrow_mut().remove(&token);
        if let Some(registration) = registration {
            self.loop_handle.remove(registration);
        }
    }
}

fn read_keymap(fd: &OwnedFd, size: u32) -> Result<Vec<u8>, crate::Error> {
    let file = File::from(fd.try_clone()?);
    let mut data = vec![0; size as usize];
    file.read_exact_at(&mut data, 0)?;
    Ok(data)
}

fn keymap_notification(
    format: WEnum<wl_keyboard::KeymapFormat>,
    fd: &OwnedFd,
    size: u32,
) -> Result<KeyboardNotification, Error> {
    let notification = match format {
        WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) => KeyboardNotification::Keymap {
            format: KeymapFormat::XkbV1,
            data: read_keymap(fd, size)?,
        },
        WEnum::Value(wl_keyboard::KeymapFormat::NoKeymap) => KeyboardNotification::Keymap {
            format: KeymapFormat::NoKeymap,
            data: Vec::new(),
        },
        format => return Err(Error::string(format!("unknown keymap format {format:?}"))),
    };
    Ok(notification)
}

impl Dispatch<WlKeyboard, SeatId> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        _proxy: &WlKeyboard,
        event: wl_keyboard::Event,
        seat: &SeatId,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        let notification = match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                match keymap_notification(format, &fd, size) {
                    Ok(notification) => notification,
                    Err(e) => {
                        tracing::error!("seat {:?}: {}", seat, e);
                        return;
                    }
                }
            }
            wl_keyboard::Event::Enter {
                serial,
                surface,
                keys,
            } => KeyboardNotification::Enter {
                serial,
                window: window_id(&surface),
                // The array holds native-endian u32 key codes.
                keys: keys
                    .chunks_exact(4)
                    .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            },
            wl_keyboard::Event::Leave { serial, surface } => KeyboardNotification::Leave {
                serial,
                window: window_id(&surface),
            },
            wl_keyboard::Event::Key {
                serial,
                time,
                key,
                state: key_state,
            } => KeyboardNotification::Key {
                serial,
                time,
                key,
                pressed: key_state == WEnum::Value(wl_keyboard::KeyState::Pressed),
            },
            wl_keyboard::Event::Modifiers {
                serial,
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
            } => KeyboardNotification::Modifiers {
                serial,
                depressed: mods_depressed,
                latched: mods_latched,
                locked: mods_locked,
                group,
            },
            wl_keyboard::Event::RepeatInfo { rate, delay } => {
                KeyboardNotification::RepeatInfo { rate, delay }
            }
            _ => return,
        };
        state.dispatch(*seat, notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn keymap_is_read_from_the_start() {
        let mut file = tempfile("full");
        file.write_all(b"xkb_keymap {};\0").unwrap();
        let fd = OwnedFd::from(file.try_clone().unwrap());
        let data = read_keymap(&fd, 15).unwrap();
        assert_eq!(&data, b"xkb_keymap {};\0");
        // Both descriptors are still usable afterwards.
        drop(fd);
        file.write_all(b"more").unwrap();
    }

    #[test]
    fn short_keymaps_are_io_errors() {
        let file = tempfile("short");
        let fd = OwnedFd::from(file);
        match read_keymap(&fd, 64) {
            Err(crate::Error::Io(_)) => {}
            other => panic!("expected an io error, got {:?}", other),
        }
    }

    fn tempfile(name: &str) -> File {
        let path = std::env::temp_dir().join(format!(
            "glazier-keymap-{}-{}",
            name,
            std::process::id()
        ));
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        std::fs::remove_file(&path).unwrap();
        file
    }
}
