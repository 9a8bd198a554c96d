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

//! Touchpad swipe and pinch gestures.

use kurbo::Vec2;

use crate::event::{EventKind, GesturePhase, InputEvent, Pinch, Swipe};
use crate::protocol::GestureNotification;
use crate::Seat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Swipe,
    Pinch,
}

/// One gesture, from begin to end or cancel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSession {
    pub active: bool,
    pub n_fingers: u32,
    /// Accumulated since begin.
    pub delta: Vec2,
    pub scale: f64,
    /// Accumulated since begin, in radians.
    pub rotation: f64,
}

impl Default for GestureSession {
    fn default() -> Self {
        Self {
            active: false,
            n_fingers: 0,
            delta: Vec2::ZERO,
            scale: 1.,
            rotation: 0.,
        }
    }
}

impl GestureSession {
    fn begin(&mut self, n_fingers: u32) {
        *self = Self {
            active: true,
            n_fingers,
            ..Self::default()
        };
    }

    fn update(&mut self, delta: Vec2, scale: f64, rotation: f64) {
        self.delta += delta;
        self.scale = scale;
        self.rotation += rotation;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Seat {
    pub(crate) fn handle_gesture(&mut self, kind: GestureKind, event: GestureNotification) {
        let (phase, n_fingers, time, delta, scale, angle_delta) = match event {
            GestureNotification::Begin {
                serial,
                time,
                window,
                fingers,
            } => {
                self.ctx.serials.update(serial);
                tracing::trace!("{:?} begin on {:?}, {} fingers", kind, window, fingers);
                self.gesture_mut(kind).begin(fingers);
                (GesturePhase::Begin, fingers, time, Vec2::ZERO, 1., 0.)
            }
            GestureNotification::Update {
                time,
                delta,
                scale,
                rotation,
            } => {
                let session = self.gesture_mut(kind);
                if !session.active {
                    return;
                }
                let rotation = rotation.to_radians();
                session.update(delta, scale, rotation);
                let n_fingers = session.n_fingers;
                tracing::trace!("{:?} update {:?} scale {} rotation {}", kind, delta, scale, rotation);
                (GesturePhase::Update, n_fingers, time, delta, scale, rotation)
            }
            GestureNotification::End {
                serial,
                time,
                cancelled,
            } => {
                let session = self.gesture_mut(kind);
                if !session.active {
                    return;
                }
                let n_fingers = session.n_fingers;
                session.reset();
                self.ctx.serials.update(serial);
                tracing::trace!("{:?} end, cancelled: {}", kind, cancelled);
                let phase = if cancelled {
                    GesturePhase::Cancel
                } else {
                    GesturePhase::End
                };
                (phase, n_fingers, time, Vec2::ZERO, 1., 0.)
            }
        };

        let (window, source) = match (self.pointer.focus, self.pointer_device) {
            (Some(window), Some(source)) => (window, source),
            _ => return,
        };
        self.pointer.time = time;
        let pos = self.pointer.pos;
        let root = self.root_coords(window, pos);
        let state = self.modifier_state(&self.pointer);
        let kind = match kind {
            GestureKind::Swipe => EventKind::TouchpadSwipe(Swipe {
                phase,
                n_fingers,
                delta,
                pos,
                root,
                state,
            }),
            GestureKind::Pinch => EventKind::TouchpadPinch(Pinch {
                phase,
                n_fingers,
                delta,
                scale,
                angle_delta,
                pos,
                root,
                state,
            }),
        };
        self.ctx.queue.borrow_mut().push(InputEvent {
            seat: self.id,
            device: self.master_pointer,
            source_device: source,
            window,
            time,
            kind,
        });
    }

    pub fn gesture(&self, kind: GestureKind) -> &GestureSession {
        match kind {
            GestureKind::Swipe => &self.swipe,
            GestureKind::Pinch => &self.pinch,
        }
    }

    fn gesture_mut(&mut self, kind: GestureKind) -> &mut GestureSession {
        match kind {
            GestureKind::Swipe => &mut self.swipe,
            GestureKind::Pinch => &mut self.pinch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_accumulate_and_reset() {
        let mut session = GestureSession::default();
        session.begin(3);
        session.update(Vec2::new(1., 2.), 1.5, 0.25);
        session.update(Vec2::new(1., 0.), 2., 0.25);
        assert_eq!(session.delta, Vec2::new(2., 2.));
        assert_eq!(session.scale, 2.);
        assert_eq!(session.rotation, 0.5);
        assert_eq!(session.n_fingers, 3);
        session.reset();
        assert_eq!(session, GestureSession::default());
        assert!(!session.active);
    }
}
