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

//! Cursor selection and output-scale tracking.
//!
//! Loading cursor images and attaching them to a surface is the theme's job.
//! The seat only decides *which* cursor applies, at *which* scale, and quotes
//! the enter serial the compositor wants to see.

use std::collections::BTreeSet;

use crate::device::DeviceId;
use crate::tablet::ToolId;

/// Mouse cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    #[default]
    Arrow,
    IBeam,
    Pointer,
    Crosshair,
    NotAllowed,
    ResizeLeftRight,
    ResizeUpDown,
    /// A cursor looked up in the theme by name.
    Named(String),
}

/// An output (monitor) the cursor surface can be shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

/// Whose cursor surface is being updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorTarget {
    /// The seat's pointer.
    Pointer(DeviceId),
    /// A tablet tool currently in proximity.
    Tool(ToolId),
}

pub trait CursorTheme {
    /// The buffer scale of an output.
    fn output_scale(&self, output: OutputId) -> u32;

    /// Show `cursor` for `target`, scaled by `scale`.
    ///
    /// Returns `true` if the cursor is animated; the theme drives the frames
    /// itself until [`stop_animation`] is called.
    ///
    /// [`stop_animation`]: CursorTheme::stop_animation
    fn apply(&self, target: CursorTarget, cursor: &Cursor, scale: u32, serial: u32) -> bool;

    fn stop_animation(&self, _target: CursorTarget) {}
}

/// A theme that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCursorTheme;

impl CursorTheme for NoCursorTheme {
    fn output_scale(&self, _output: OutputId) -> u32 {
        1
    }

    fn apply(&self, _target: CursorTarget, _cursor: &Cursor, _scale: u32, _serial: u32) -> bool {
        false
    }
}

/// Per-device cursor state.
#[derive(Debug, Clone)]
pub struct CursorState {
    /// The cursor currently shown, if any.
    pub(crate) cursor: Option<Cursor>,
    /// The enter serial `cursor` was shown with.
    pub(crate) serial: u32,
    /// Outputs the cursor surface is currently on.
    pub(crate) outputs: BTreeSet<OutputId>,
    pub(crate) scale: u32,
    pub(crate) animating: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            cursor: None,
            serial: 0,
            outputs: BTreeSet::new(),
            scale: 1,
            animating: false,
        }
    }
}

impl CursorState {
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Recompute the scale from the entered outputs. Returns whether it changed.
    pub(crate) fn update_scale(&mut self, theme: &dyn CursorTheme) -> bool {
        let scale = self
            .outputs
            .iter()
            .map(|output| theme.output_scale(*output))
            .fold(1, u32::max);
        let changed = scale != self.scale;
        self.scale = scale;
        changed
    }

    pub(crate) fn stop_animation(&mut self, theme: &dyn CursorTheme, target: CursorTarget) {
        if self.animating {
            theme.stop_animation(target);
            self.animating = false;
        }
    }

    /// Show `cursor` unless it is already shown for this enter serial.
    ///
    /// The compositor ignores cursor requests quoting an old enter serial, so
    /// a new serial always re-applies.
    pub(crate) fn set(
        &mut self,
        theme: &dyn CursorTheme,
        target: CursorTarget,
        cursor: Cursor,
        serial: u32,
    ) {
        if self.serial == serial && self.cursor.as_ref() == Some(&cursor) {
            return;
        }
        self.stop_animation(theme, target);
        self.animating = theme.apply(target, &cursor, self.scale, serial);
        self.cursor = Some(cursor);
        self.serial = serial;
    }

    /// Show the current cursor again, e.g. after a scale change.
    pub(crate) fn refresh(&mut self, theme: &dyn CursorTheme, target: CursorTarget, serial: u32) {
        let cursor = match self.cursor.clone() {
            Some(cursor) => cursor,
            None => return,
        };
        self.stop_animation(theme, target);
        self.animating = theme.apply(target, &cursor, self.scale, serial);
        self.serial = serial;
    }

    /// Forget the shown cursor, once its surface loses the pointer.
    pub(crate) fn clear(&mut self, theme: &dyn CursorTheme, target: CursorTarget) {
        self.stop_animation(theme, target);
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        applied: RefCell<Vec<(Cursor, u32, u32)>>,
    }

    impl CursorTheme for Recorder {
        fn output_scale(&self, output: OutputId) -> u32 {
            output.0
        }

        fn apply(&self, _target: CursorTarget, cursor: &Cursor, scale: u32, serial: u32) -> bool {
            self.applied.borrow_mut().push((cursor.clone(), scale, serial));
            false
        }
    }

    const TARGET: CursorTarget = CursorTarget::Pointer(DeviceId(1));

    #[test]
    fn scale_is_the_largest_output_scale() {
        let theme = Recorder::default();
        let mut state = CursorState::default();
        state.outputs.insert(OutputId(2));
        state.outputs.insert(OutputId(3));
        assert!(state.update_scale(&theme));
        assert_eq!(state.scale(), 3);
        state.outputs.clear();
        assert!(state.update_scale(&theme));
        assert_eq!(state.scale(), 1);
    }

    #[test]
    fn setting_the_same_cursor_twice_applies_once() {
        let theme = Recorder::default();
        let mut state = CursorState::default();
        state.set(&theme, TARGET, Cursor::IBeam, 7);
        state.set(&theme, TARGET, Cursor::IBeam, 7);
        state.set(&theme, TARGET, Cursor::Arrow, 7);
        let applied = theme.applied.borrow();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0], (Cursor::IBeam, 1, 7));
        assert_eq!(applied[1], (Cursor::Arrow, 1, 7));
    }

    #[test]
    fn a_new_enter_serial_applies_again() {
        let theme = Recorder::default();
        let mut state = CursorState::default();
        state.set(&theme, TARGET, Cursor::IBeam, 7);
        state.set(&theme, TARGET, Cursor::IBeam, 8);
        assert_eq!(theme.applied.borrow().last(), Some(&(Cursor::IBeam, 1, 8)));

        state.clear(&theme, TARGET);
        assert!(state.cursor().is_none());
        state.refresh(&theme, TARGET, 9);
        assert_eq!(theme.applied.borrow().len(), 2);
    }
}
