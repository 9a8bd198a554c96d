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

//! Seat configuration and repeat preferences.

use std::time::Duration;

use crate::cursor::Cursor;

/// The first `wl_seat` version whose pointer sends `frame` events.
pub const POINTER_FRAME_VERSION: u32 = 5;

/// Settings negotiated with the compositor when a seat is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatConfig {
    /// The bound `wl_seat` version.
    pub version: u32,
    /// The compositor offers pointer gestures. Gesture notifications are
    /// dropped otherwise.
    pub gestures: bool,
    /// The compositor offers tablets. Tablet notifications are dropped
    /// otherwise.
    pub tablets: bool,
    /// Shown when a window asks for no particular cursor.
    pub default_cursor: Cursor,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            version: POINTER_FRAME_VERSION,
            gestures: true,
            tablets: true,
            default_cursor: Cursor::Arrow,
        }
    }
}

impl SeatConfig {
    pub fn with_version(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Without pointer frames every sub-event is its own frame.
    pub fn flushes_immediately(&self) -> bool {
        self.version < POINTER_FRAME_VERSION
    }
}

/// Key repeat settings from the user's preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatSettings {
    pub enabled: bool,
    pub delay: Duration,
    pub interval: Duration,
}

impl Default for RepeatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_millis(400),
            interval: Duration::from_millis(80),
        }
    }
}

/// Where key repeat settings come from when the compositor advertises none.
pub trait RepeatPreferences {
    fn repeat_settings(&self) -> RepeatSettings;
}

/// Built-in preferences: repeat after 400ms, every 80ms.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPreferences;

impl RepeatPreferences for DefaultPreferences {
    fn repeat_settings(&self) -> RepeatSettings {
        RepeatSettings::default()
    }
}

impl RepeatPreferences for RepeatSettings {
    fn repeat_settings(&self) -> RepeatSettings {
        *self
    }
}

/// The rate at which a pressed key is repeated, as advertised by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatInfo {
    /// Keys will be repeated at the specified rate and delay.
    Repeat {
        /// The time between the key repeats.
        gap: Duration,

        /// Delay between a key press and the start of repetition.
        delay: Duration,
    },

    /// Keys should not be repeated.
    Disable,
}

impl RepeatInfo {
    /// Build from `wl_keyboard.repeat_info`: `rate` in keys per second, `delay` in ms.
    pub fn from_rate(rate: i32, delay: i32) -> Self {
        if rate <= 0 {
            return RepeatInfo::Disable;
        }
        RepeatInfo::Repeat {
            gap: Duration::from_millis(1000 / rate as u64),
            delay: Duration::from_millis(delay.max(0) as u64),
        }
    }

    /// `(delay, gap)` if keys repeat at all.
    pub fn timing(self) -> Option<(Duration, Duration)> {
        match self {
            RepeatInfo::Repeat { gap, delay } => Some((delay, gap)),
            RepeatInfo::Disable => None,
        }
    }
}

impl From<RepeatSettings> for RepeatInfo {
    fn from(settings: RepeatSettings) -> Self {
        if settings.enabled {
            RepeatInfo::Repeat {
                gap: settings.interval,
                delay: settings.delay,
            }
        } else {
            RepeatInfo::Disable
        }
    }
}
