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

//! Keyboard focus, modifiers, keymaps and key repeat.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use keyboard_types::{Code, Key, Modifiers};

use crate::config::RepeatInfo;
use crate::device::DeviceId;
use crate::error::Error;
use crate::event::{EventKind, InputEvent, KeyEvent, OwnerChange};
use crate::protocol::{KeyboardNotification, KeymapFormat};
use crate::seat::SeatId;
use crate::window::WindowId;
use crate::Seat;

/// xkb keycodes are evdev codes shifted by 8.
pub(crate) const EVDEV_OFFSET: u32 = 8;

/// Translates keycodes to keys.
///
/// The Wayland backend feeds it the compositor's keymap; keycodes passed to
/// it are xkb keycodes.
pub trait Keymap {
    fn load(&mut self, format: KeymapFormat, data: &[u8]) -> Result<(), Error>;

    /// Apply a modifier update from the compositor and return the effective modifiers.
    fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32)
        -> Modifiers;

    fn lookup(&self, keycode: u32) -> (Key, Code);

    fn is_modifier(&self, keycode: u32) -> bool;

    /// Whether holding this key repeats it.
    fn repeats(&self, keycode: u32) -> bool {
        !self.is_modifier(keycode)
    }
}

struct ModMap(u32, Modifiers);

impl ModMap {
    fn merge(self, m: Modifiers, mods: u32, locked: u32) -> Modifiers {
        if self.0 & mods == 0 && self.0 & locked == 0 {
            return m;
        }

        m | self.1
    }
}

const MOD_SHIFT: ModMap = ModMap(1, Modifiers::SHIFT);
const MOD_CAP_LOCK: ModMap = ModMap(2, Modifiers::CAPS_LOCK);
const MOD_CTRL: ModMap = ModMap(4, Modifiers::CONTROL);
const MOD_ALT: ModMap = ModMap(8, Modifiers::ALT);
const MOD_NUM_LOCK: ModMap = ModMap(16, Modifiers::NUM_LOCK);
const MOD_META: ModMap = ModMap(64, Modifiers::META);

/// Modifiers from the standard xkb modifier masks.
pub fn modifiers_from_masks(depressed: u32, latched: u32, locked: u32) -> Modifiers {
    let active = depressed | latched;
    let mods = Modifiers::empty();
    let mods = MOD_SHIFT.merge(mods, active, locked);
    let mods = MOD_CAP_LOCK.merge(mods, active, locked);
    let mods = MOD_CTRL.merge(mods, active, locked);
    let mods = MOD_ALT.merge(mods, active, locked);
    let mods = MOD_NUM_LOCK.merge(mods, active, locked);

    MOD_META.merge(mods, active, locked)
}

/// A fixed US layout over evdev codes.
///
/// The keymap of builds without the `xkb` feature. With it, the xkb keymap
/// answers through this one until the compositor sends a real keymap.
#[derive(Debug, Default)]
pub struct EvdevKeymap {
    modifiers: Modifiers,
    /// Source of the last uploaded keymap, kept for the embedder to inspect.
    source: Option<String>,
}

// evdev code, code, unshifted, shifted
const PRINTABLE: &[(u32, Code, char, char)] = &[
    (2, Code::Digit1, '1', '!'),
    (3, Code::Digit2, '2', '@'),
    (4, Code::Digit3, '3', '#'),
    (5, Code::Digit4, '4', '$'),
    (6, Code::Digit5, '5', '%'),
    (7, Code::Digit6, '6', '^'),
    (8, Code::Digit7, '7', '&'),
    (9, Code::Digit8, '8', '*'),
    (10, Code::Digit9, '9', '('),
    (11, Code::Digit0, '0', ')'),
    (12, Code::Minus, '-', '_'),
    (13, Code::Equal, '=', '+'),
    (16, Code::KeyQ, 'q', 'Q'),
    (17, Code::KeyW, 'w', 'W'),
    (18, Code::KeyE, 'e', 'E'),
    (19, Code::KeyR, 'r', 'R'),
    (20, Code::KeyT, 't', 'T'),
    (21, Code::KeyY, 'y', 'Y'),
    (22, Code::KeyU, 'u', 'U'),
    (23, Code::KeyI, 'i', 'I'),
    (24, Code::KeyO, 'o', 'O'),
    (25, Code::KeyP, 'p', 'P'),
    (26, Code::BracketLeft, '[', '{'),
    (27, Code::BracketRight, ']', '}'),
    (30, Code::KeyA, 'a', 'A'),
    (31, Code::KeyS, 's', 'S'),
    (32, Code::KeyD, 'd', 'D'),
    (33, Code::KeyF, 'f', 'F'),
    (34, Code::KeyG, 'g', 'G'),
    (35, Code::KeyH, 'h', 'H'),
    (36, Code::KeyJ, 'j', 'J'),
    (37, Code::KeyK, 'k', 'K'),
    (38, Code::KeyL, 'l', 'L'),
    (39, Code::Semicolon, ';', ':'),
    (40, Code::Quote, '\'', '"'),
    (41, Code::Backquote, '`', '~'),
    (43, Code::Backslash, '\\', '|'),
    (44, Code::KeyZ, 'z', 'Z'),
    (45, Code::KeyX, 'x', 'X'),
    (46, Code::KeyC, 'c', 'C'),
    (47, Code::KeyV, 'v', 'V'),
    (48, Code::KeyB, 'b', 'B'),
    (49, Code::KeyN, 'n', 'N'),
    (50, Code::KeyM, 'm', 'M'),
    (51, Code::Comma, ',', '<'),
    (52, Code::Period, '.', '>'),
    (53, Code::Slash, '/', '?'),
    (57, Code::Space, ' ', ' '),
];

fn named_key(evdev: u32) -> Option<(Key, Code)> {
    let key = match evdev {
        1 => (Key::Escape, Code::Escape),
        14 => (Key::Backspace, Code::Backspace),
        15 => (Key::Tab, Code::Tab),
        28 => (Key::Enter, Code::Enter),
        29 => (Key::Control, Code::ControlLeft),
        42 => (Key::Shift, Code::ShiftLeft),
        54 => (Key::Shift, Code::ShiftRight),
        56 => (Key::Alt, Code::AltLeft),
        58 => (Key::CapsLock, Code::CapsLock),
        59 => (Key::F1, Code::F1),
        60 => (Key::F2, Code::F2),
        61 => (Key::F3, Code::F3),
        62 => (Key::F4, Code::F4),
        63 => (Key::F5, Code::F5),
        64 => (Key::F6, Code::F6),
        65 => (Key::F7, Code::F7),
        66 => (Key::F8, Code::F8),
        67 => (Key::F9, Code::F9),
        68 => (Key::F10, Code::F10),
        69 => (Key::NumLock, Code::NumLock),
        87 => (Key::F11, Code::F11),
        88 => (Key::F12, Code::F12),
        97 => (Key::Control, Code::ControlRight),
        100 => (Key::Alt, Code::AltRight),
        102 => (Key::Home, Code::Home),
        103 => (Key::ArrowUp, Code::ArrowUp),
        104 => (Key::PageUp, Code::PageUp),
        105 => (Key::ArrowLeft, Code::ArrowLeft),
        106 => (Key::ArrowRight, Code::ArrowRight),
        107 => (Key::End, Code::End),
        108 => (Key::ArrowDown, Code::ArrowDown),
        109 => (Key::PageDown, Code::PageDown),
        110 => (Key::Insert, Code::Insert),
        111 => (Key::Delete, Code::Delete),
        125 => (Key::Meta, Code::MetaLeft),
        126 => (Key::Meta, Code::MetaRight),
        _ => return None,
    };
    Some(key)
}

/// The physical key behind an evdev code, whatever the layout.
pub(crate) fn evdev_code(evdev: u32) -> Code {
    if let Some((_, code)) = named_key(evdev) {
        return code;
    }
    PRINTABLE
        .iter()
        .find(|(code, ..)| *code == evdev)
        .map(|&(_, code, ..)| code)
        .unwrap_or(Code::Unidentified)
}

impl EvdevKeymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl Keymap for EvdevKeymap {
    fn load(&mut self, format: KeymapFormat, data: &[u8]) -> Result<(), Error> {
        match format {
            KeymapFormat::NoKeymap => {
                tracing::warn!("non-xkb compatible keymap");
                self.source = None;
            }
            KeymapFormat::XkbV1 => {
                // keymap data is '\0' terminated.
                let data = data.split(|b| *b == 0).next().unwrap_or_default();
                let source = std::str::from_utf8(data)
                    .map_err(|e| Error::keymap(format!("keymap is not utf-8: {}", e)))?;
                tracing::debug!("keymap uploaded, {} bytes", source.len());
                self.source = Some(source.to_owned());
            }
        }
        Ok(())
    }

    fn update_modifiers(
        &mut self,
        depressed: u32,
        latched: u32,
        locked: u32,
        _group: u32,
    ) -> Modifiers {
        self.modifiers = modifiers_from_masks(depressed, latched, locked);
        self.modifiers
    }

    fn lookup(&self, keycode: u32) -> (Key, Code) {
        let evdev = keycode.wrapping_sub(EVDEV_OFFSET);
        if let Some(key) = named_key(evdev) {
            return key;
        }
        match PRINTABLE.iter().find(|(code, ..)| *code == evdev) {
            Some(&(_, code, plain, shifted)) => {
                let shift = self.modifiers.contains(Modifiers::SHIFT);
                let caps = self.modifiers.contains(Modifiers::CAPS_LOCK) && plain.is_alphabetic();
                let c = if shift != caps { shifted } else { plain };
                (Key::Character(c.to_string()), code)
            }
            None => (Key::Unidentified, Code::Unidentified),
        }
    }

    fn is_modifier(&self, keycode: u32) -> bool {
        matches!(
            keycode.wrapping_sub(EVDEV_OFFSET),
            29 | 42 | 54 | 56 | 58 | 69 | 97 | 100 | 125 | 126
        )
    }
}

/// Handle of a scheduled repeat timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// Deferred work for key repeat.
///
/// Every timer is one-shot. When it expires the embedder calls
/// [`Seat::fire_key_repeat`], which schedules the next one.
pub trait RepeatScheduler {
    fn schedule(&self, seat: SeatId, device: DeviceId, delay: Duration)
        -> Result<TimerToken, Error>;

    fn cancel(&self, token: TimerToken);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRepeat {
    pub token: TimerToken,
    pub seat: SeatId,
    pub device: DeviceId,
    pub delay: Duration,
}

/// A scheduler that only records requests.
///
/// The embedder (or a test) decides when timers expire, and takes them out
/// with [`ManualRepeatScheduler::take_pending`].
#[derive(Debug, Default)]
pub struct ManualRepeatScheduler {
    next: Cell<u64>,
    pending: RefCell<Vec<ScheduledRepeat>>,
    history: RefCell<Vec<ScheduledRepeat>>,
    cancelled: RefCell<Vec<TimerToken>>,
}

impl ManualRepeatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers scheduled and neither cancelled nor taken yet.
    pub fn pending(&self) -> Vec<ScheduledRepeat> {
        self.pending.borrow().clone()
    }

    /// Remove the oldest pending timer, as if it expired.
    pub fn take_pending(&self) -> Option<ScheduledRepeat> {
        let mut pending = self.pending.borrow_mut();
        if pending.is_empty() {
            None
        } else {
            Some(pending.remove(0))
        }
    }

    /// Every timer ever scheduled, in order.
    pub fn history(&self) -> Vec<ScheduledRepeat> {
        self.history.borrow().clone()
    }

    pub fn cancelled(&self) -> Vec<TimerToken> {
        self.cancelled.borrow().clone()
    }
}

impl RepeatScheduler for ManualRepeatScheduler {
    fn schedule(
        &self,
        seat: SeatId,
        device: DeviceId,
        delay: Duration,
    ) -> Result<TimerToken, Error> {
        let token = TimerToken(self.next.get());
        self.next.set(token.0 + 1);
        let timer = ScheduledRepeat {
            token,
            seat,
            device,
            delay,
        };
        self.pending.borrow_mut().push(timer);
        self.history.borrow_mut().push(timer);
        Ok(token)
    }

    fn cancel(&self, token: TimerToken) {
        self.pending.borrow_mut().retain(|timer| timer.token != token);
        self.cancelled.borrow_mut().push(token);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyRepeat {
    /// xkb keycode being repeated.
    pub key: Option<u32>,
    /// Presses delivered for the key so far, real and synthetic.
    pub count: u32,
    pub token: Option<TimerToken>,
}

pub struct KeyboardState {
    pub(crate) focus: Option<WindowId>,
    pub(crate) modifiers: Modifiers,
    pub(crate) keymap: Box<dyn Keymap>,
    /// Advertised by the compositor; preferences apply until it is.
    pub(crate) repeat_info: Option<RepeatInfo>,
    pub(crate) repeat: KeyRepeat,
    pub(crate) time: u32,
    pub(crate) enter_serial: u32,
}

#[cfg(feature = "xkb")]
fn default_keymap() -> Box<dyn Keymap> {
    Box::new(crate::backend::shared::xkb::XkbKeymap::new())
}

#[cfg(not(feature = "xkb"))]
fn default_keymap() -> Box<dyn Keymap> {
    Box::new(EvdevKeymap::new())
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self {
            focus: None,
            modifiers: Modifiers::empty(),
            keymap: default_keymap(),
            repeat_info: None,
            repeat: KeyRepeat::default(),
            time: 0,
            enter_serial: 0,
        }
    }
}

impl KeyboardState {
    pub fn focus(&self) -> Option<WindowId> {
        self.focus
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn repeat_info(&self) -> Option<RepeatInfo> {
        self.repeat_info
    }

    pub fn repeat(&self) -> KeyRepeat {
        self.repeat
    }

    pub fn time(&self) -> u32 {
        self.time
    }
}

impl Seat {
    pub(crate) fn handle_keyboard(&mut self, event: KeyboardNotification) -> Result<(), Error> {
        let source = self.keyboard_device.ok_or(Error::NoDevice("keyboard"))?;
        match event {
            KeyboardNotification::Keymap { format, data } => {
                self.keyboard.keymap.load(format, &data)?;
            }
            KeyboardNotification::Enter {
                serial,
                window,
                keys,
            } => {
                if !self.ctx.windows.is_live(window) {
                    return Err(Error::UnknownWindow(window));
                }
                self.ctx.serials.update(serial);
                self.stop_key_repeat();
                self.keyboard.focus = Some(window);
                self.keyboard.enter_serial = serial;
                tracing::trace!("keyboard enter {:?}, {} keys held", window, keys.len());
                self.push_focus_change(source, window, true);
                if let Some(selection) = self.pending_selection.take() {
                    self.push_owner_change(window, selection);
                }
            }
            KeyboardNotification::Leave { serial, window } => {
                let focus = match self.keyboard.focus {
                    Some(focus) => focus,
                    None => return Ok(()),
                };
                if focus != window {
                    tracing::debug!("keyboard leave for {:?} while {:?} has focus", window, focus);
                }
                self.ctx.serials.update(serial);
                self.stop_key_repeat();
                tracing::trace!("keyboard leave {:?}", focus);
                self.push_focus_change(source, focus, false);
                self.keyboard.focus = None;
            }
            KeyboardNotification::Key {
                serial,
                time,
                key,
                pressed,
            } => {
                self.ctx.serials.update(serial);
                self.keyboard.time = time;
                self.deliver_key(source, key + EVDEV_OFFSET, pressed, false);
            }
            KeyboardNotification::Modifiers {
                serial,
                depressed,
                latched,
                locked,
                group,
            } => {
                self.ctx.serials.update(serial);
                self.keyboard.modifiers = self
                    .keyboard
                    .keymap
                    .update_modifiers(depressed, latched, locked, group);
                tracing::trace!("modifiers {:?}", self.keyboard.modifiers);
            }
            KeyboardNotification::RepeatInfo { rate, delay } => {
                tracing::trace!("keyboard repeat info received {:?} {:?}", rate, delay);
                let info = RepeatInfo::from_rate(rate, delay);
                if info == RepeatInfo::Disable {
                    // Stop the repeat once we get a disable event.
                    self.stop_key_repeat();
                }
                self.keyboard.repeat_info = Some(info);
            }
        }
        Ok(())
    }

    fn deliver_key(&mut self, source: DeviceId, keycode: u32, pressed: bool, from_repeat: bool) {
        if !from_repeat {
            self.keyboard.repeat.count = 0;
            self.cancel_repeat_timer();
        }
        let window = match self.keyboard.focus {
            Some(window) => window,
            None => return,
        };

        let (key, code) = self.keyboard.keymap.lookup(keycode);
        let event = KeyEvent {
            keycode,
            key,
            code,
            state: self.modifier_state(&self.pointer),
            is_modifier: self.keyboard.keymap.is_modifier(keycode),
            repeat: from_repeat,
        };
        tracing::trace!(
            "key {} {:?}{}",
            if pressed { "press" } else { "release" },
            event.key,
            if from_repeat { " (repeat)" } else { "" }
        );
        let kind = if pressed {
            EventKind::KeyPress(event)
        } else {
            EventKind::KeyRelease(event)
        };
        self.ctx.queue.borrow_mut().push(InputEvent {
            seat: self.id,
            device: self.master_keyboard,
            source_device: source,
            window,
            time: self.keyboard.time,
            kind,
        });

        if !pressed {
            self.stop_key_repeat();
            return;
        }
        if !self.keyboard.keymap.repeats(keycode) {
            return;
        }
        let (delay, interval) = match self.repeat_timing() {
            Some(timing) => timing,
            None => return,
        };

        let repeat = &mut self.keyboard.repeat;
        repeat.count += 1;
        repeat.key = Some(keycode);
        let timeout = if repeat.count == 1 { delay } else { interval };
        match self
            .ctx
            .scheduler
            .schedule(self.id, self.master_keyboard, timeout)
        {
            Ok(token) => self.keyboard.repeat.token = Some(token),
            Err(e) => tracing::error!("failed to schedule key repeat: {}", e),
        }
    }

    /// `(delay, interval)` for key repeat, or `None` if keys do not repeat.
    fn repeat_timing(&self) -> Option<(Duration, Duration)> {
        match self.keyboard.repeat_info {
            Some(info) => info.timing(),
            None => RepeatInfo::from(self.ctx.prefs.repeat_settings()).timing(),
        }
    }

    /// The repeat timer of `device` expired.
    ///
    /// Delivers a synthetic press of the held key and schedules the next
    /// repeat. Returns whether a press was delivered; a timer that outlived
    /// its key or the keyboard focus does nothing.
    pub fn fire_key_repeat(&mut self, device: DeviceId) -> bool {
        if device != self.master_keyboard {
            tracing::warn!("key repeat for foreign device {:?}", device);
            return false;
        }
        self.keyboard.repeat.token = None;
        let (source, key) = match (self.keyboard_device, self.keyboard.repeat.key) {
            (Some(source), Some(key)) => (source, key),
            _ => return false,
        };
        if self.keyboard.focus.is_none() {
            self.keyboard.repeat = KeyRepeat::default();
            return false;
        }
        self.deliver_key(source, key, true, true);
        true
    }

    /// Forget the held key and cancel its timer.
    pub fn stop_key_repeat(&mut self) {
        self.cancel_repeat_timer();
        self.keyboard.repeat = KeyRepeat::default();
    }

    fn cancel_repeat_timer(&mut self) {
        if let Some(token) = self.keyboard.repeat.token.take() {
            self.ctx.scheduler.cancel(token);
        }
    }

    pub(crate) fn push_focus_change(&self, source: DeviceId, window: WindowId, focus_in: bool) {
        self.ctx.queue.borrow_mut().push(InputEvent {
            seat: self.id,
            device: self.master_keyboard,
            source_device: source,
            window,
            time: 0,
            kind: EventKind::FocusChange { focus_in },
        });
    }

    pub(crate) fn push_owner_change(&self, window: WindowId, selection: String) {
        self.ctx.queue.borrow_mut().push(InputEvent {
            seat: self.id,
            device: self.master_keyboard,
            source_device: self.keyboard_device.unwrap_or(self.master_keyboard),
            window,
            time: 0,
            kind: EventKind::OwnerChange(OwnerChange { selection }),
        });
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Replace the keymap, e.g. with one that never follows the compositor.
    pub fn set_keymap(&mut self, keymap: Box<dyn Keymap>) {
        self.keyboard.keymap = keymap;
    }
}
