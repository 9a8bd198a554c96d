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

//! Keymaps compiled by libxkbcommon.

use keyboard_types::{Code, Key, Modifiers};
use xkbcommon::xkb::{self, keysyms};

use crate::error::Error;
use crate::keyboard::{evdev_code, EvdevKeymap, Keymap, EVDEV_OFFSET};
use crate::protocol::KeymapFormat;

struct Compiled {
    keymap: xkb::Keymap,
    state: xkb::State,
}

/// The compositor's keymap, compiled with xkb.
///
/// Until a keymap arrives lookups fall back to a US layout.
pub struct XkbKeymap {
    context: xkb::Context,
    compiled: Option<Compiled>,
    fallback: EvdevKeymap,
}

impl Default for XkbKeymap {
    fn default() -> Self {
        Self::new()
    }
}

impl XkbKeymap {
    pub fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            compiled: None,
            fallback: EvdevKeymap::new(),
        }
    }

    /// Whether a keymap from the compositor is in use.
    pub fn is_loaded(&self) -> bool {
        self.compiled.is_some()
    }
}

const MODIFIER_NAMES: [(&str, Modifiers); 6] = [
    (xkb::MOD_NAME_SHIFT, Modifiers::SHIFT),
    (xkb::MOD_NAME_CAPS, Modifiers::CAPS_LOCK),
    (xkb::MOD_NAME_CTRL, Modifiers::CONTROL),
    (xkb::MOD_NAME_ALT, Modifiers::ALT),
    (xkb::MOD_NAME_NUM, Modifiers::NUM_LOCK),
    (xkb::MOD_NAME_LOGO, Modifiers::META),
];

fn named_keysym(sym: u32) -> Option<Key> {
    let key = match sym {
        keysyms::KEY_Return | keysyms::KEY_KP_Enter => Key::Enter,
        keysyms::KEY_Escape => Key::Escape,
        keysyms::KEY_BackSpace => Key::Backspace,
        keysyms::KEY_Tab | keysyms::KEY_ISO_Left_Tab => Key::Tab,
        keysyms::KEY_Delete => Key::Delete,
        keysyms::KEY_Insert => Key::Insert,
        keysyms::KEY_Home => Key::Home,
        keysyms::KEY_End => Key::End,
        keysyms::KEY_Page_Up => Key::PageUp,
        keysyms::KEY_Page_Down => Key::PageDown,
        keysyms::KEY_Left => Key::ArrowLeft,
        keysyms::KEY_Right => Key::ArrowRight,
        keysyms::KEY_Up => Key::ArrowUp,
        keysyms::KEY_Down => Key::ArrowDown,
        keysyms::KEY_Shift_L | keysyms::KEY_Shift_R => Key::Shift,
        keysyms::KEY_Control_L | keysyms::KEY_Control_R => Key::Control,
        keysyms::KEY_Alt_L | keysyms::KEY_Alt_R => Key::Alt,
        keysyms::KEY_Super_L
        | keysyms::KEY_Super_R
        | keysyms::KEY_Meta_L
        | keysyms::KEY_Meta_R => Key::Meta,
        keysyms::KEY_ISO_Level3_Shift => Key::AltGraph,
        keysyms::KEY_Caps_Lock => Key::CapsLock,
        keysyms::KEY_Num_Lock => Key::NumLock,
        keysyms::KEY_F1 => Key::F1,
        keysyms::KEY_F2 => Key::F2,
        keysyms::KEY_F3 => Key::F3,
        keysyms::KEY_F4 => Key::F4,
        keysyms::KEY_F5 => Key::F5,
        keysyms::KEY_F6 => Key::F6,
        keysyms::KEY_F7 => Key::F7,
        keysyms::KEY_F8 => Key::F8,
        keysyms::KEY_F9 => Key::F9,
        keysyms::KEY_F10 => Key::F10,
        keysyms::KEY_F11 => Key::F11,
        keysyms::KEY_F12 => Key::F12,
        _ => return None,
    };
    Some(key)
}

impl Compiled {
    fn keysym(&self, keycode: u32) -> u32 {
        self.state.key_get_one_sym(xkb::Keycode::new(keycode)).raw()
    }
}

impl Keymap for XkbKeymap {
    fn load(&mut self, format: KeymapFormat, data: &[u8]) -> Result<(), Error> {
        match format {
            KeymapFormat::NoKeymap => {
                tracing::warn!("non-xkb compatible keymap");
                self.compiled = None;
            }
            KeymapFormat::XkbV1 => {
                // keymap data is '\0' terminated.
                let data = data.split(|b| *b == 0).next().unwrap_or_default();
                let source = std::str::from_utf8(data)
                    .map_err(|e| Error::keymap(format!("keymap is not utf-8: {}", e)))?;
                let keymap = xkb::Keymap::new_from_string(
                    &self.context,
                    source.to_owned(),
                    xkb::KEYMAP_FORMAT_TEXT_V1,
                    xkb::KEYMAP_COMPILE_NO_FLAGS,
                )
                .ok_or_else(|| Error::keymap("xkb could not compile the keymap"))?;
                let state = xkb::State::new(&keymap);
                tracing::debug!("keymap compiled, {} bytes", source.len());
                self.compiled = Some(Compiled { keymap, state });
            }
        }
        Ok(())
    }

    fn update_modifiers(
        &mut self,
        depressed: u32,
        latched: u32,
        locked: u32,
        group: u32,
    ) -> Modifiers {
        let compiled = match self.compiled.as_mut() {
            Some(compiled) => compiled,
            None => return self.fallback.update_modifiers(depressed, latched, locked, group),
        };
        compiled
            .state
            .update_mask(depressed, latched, locked, 0, 0, group);
        MODIFIER_NAMES
            .iter()
            .filter(|(name, _)| {
                compiled
                    .state
                    .mod_name_is_active(name, xkb::STATE_MODS_EFFECTIVE)
            })
            .fold(Modifiers::empty(), |mods, (_, modifier)| mods | *modifier)
    }

    fn lookup(&self, keycode: u32) -> (Key, Code) {
        let compiled = match &self.compiled {
            Some(compiled) => compiled,
            None => return self.fallback.lookup(keycode),
        };
        let code = evdev_code(keycode.wrapping_sub(EVDEV_OFFSET));
        if let Some(key) = named_keysym(compiled.keysym(keycode)) {
            return (key, code);
        }
        let text = compiled.state.key_get_utf8(xkb::Keycode::new(keycode));
        if text.is_empty() || text.chars().any(char::is_control) {
            (Key::Unidentified, code)
        } else {
            (Key::Character(text), code)
        }
    }

    fn is_modifier(&self, keycode: u32) -> bool {
        let compiled = match &self.compiled {
            Some(compiled) => compiled,
            None => return self.fallback.is_modifier(keycode),
        };
        matches!(
            named_keysym(compiled.keysym(keycode)),
            Some(
                Key::Shift
                    | Key::Control
                    | Key::Alt
                    | Key::AltGraph
                    | Key::Meta
                    | Key::CapsLock
                    | Key::NumLock
            )
        )
    }

    fn repeats(&self, keycode: u32) -> bool {
        match &self.compiled {
            Some(compiled) => compiled.keymap.key_repeats(xkb::Keycode::new(keycode)),
            None => self.fallback.repeats(keycode),
        }
    }
}
