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

//! Per-device event frames.
//!
//! The compositor splits one logical input action into several
//! notifications and closes it with a `frame`. Each device gets one staging
//! slot: at most one event waits in it, plus the scroll values collected
//! since the last frame.

use std::collections::BTreeMap;

use kurbo::{Point, Vec2};

use crate::device::DeviceId;
use crate::event::{
    EventKind, EventQueue, EventType, InputEvent, ModifierState, Scroll, ScrollDirection,
};
use crate::seat::SeatId;
use crate::window::WindowId;

/// Axis values collected over one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollAccumulator {
    pub delta: Vec2,
    pub discrete_x: i32,
    pub discrete_y: i32,
    /// An axis stopped during this frame.
    pub is_stop: bool,
    /// Any axis notification arrived during this frame.
    pub pending: bool,
}

impl ScrollAccumulator {
    pub fn add_delta(&mut self, delta: Vec2) {
        self.delta += delta;
        self.pending = true;
    }

    pub fn stop_horizontal(&mut self) {
        self.delta.x = 0.;
        self.is_stop = true;
        self.pending = true;
    }

    pub fn stop_vertical(&mut self) {
        self.delta.y = 0.;
        self.is_stop = true;
        self.pending = true;
    }

    pub fn set_discrete(&mut self, horizontal: bool, steps: i32) {
        if horizontal {
            self.discrete_x = steps;
        } else {
            self.discrete_y = steps;
        }
        self.pending = true;
    }

    /// The single wheel direction this frame scrolled in, if any.
    ///
    /// Horizontal steps win over vertical ones, so a diagonal wheel click
    /// reports only its horizontal half.
    pub fn discrete_direction(&self) -> Option<ScrollDirection> {
        if self.discrete_x < 0 {
            Some(ScrollDirection::Left)
        } else if self.discrete_x > 0 {
            Some(ScrollDirection::Right)
        } else if self.discrete_y > 0 {
            Some(ScrollDirection::Down)
        } else if self.discrete_y < 0 {
            Some(ScrollDirection::Up)
        } else {
            None
        }
    }

    /// Both axes stopped, or one stopped and the other never moved.
    pub fn is_full_stop(&self) -> bool {
        self.is_stop && self.delta.x == 0. && self.delta.y == 0.
    }
}

/// Where synthesized scroll events go.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollTarget {
    pub seat: SeatId,
    pub device: DeviceId,
    pub source_device: DeviceId,
    pub window: WindowId,
    pub time: u32,
    pub pos: Point,
    pub root: Point,
    pub state: ModifierState,
}

impl ScrollTarget {
    fn event(&self, scroll: Scroll) -> InputEvent {
        InputEvent {
            seat: self.seat,
            device: self.device,
            source_device: self.source_device,
            window: self.window,
            time: self.time,
            kind: EventKind::Scroll(scroll),
        }
    }

    fn scroll(&self, direction: ScrollDirection, delta: Vec2, is_stop: bool) -> Scroll {
        Scroll {
            direction,
            delta,
            is_stop,
            emulated: direction != ScrollDirection::Smooth,
            pos: self.pos,
            root: self.root,
            state: self.state,
        }
    }
}

#[derive(Debug, Default)]
struct Frame {
    staged: Option<InputEvent>,
    scroll: ScrollAccumulator,
}

#[derive(Debug, Default)]
pub struct FrameAggregator {
    frames: BTreeMap<DeviceId, Frame>,
    immediate: bool,
}

impl FrameAggregator {
    /// `immediate` makes every sub-event its own frame, for compositors that
    /// never send frame boundaries.
    pub fn new(immediate: bool) -> Self {
        Self {
            frames: BTreeMap::new(),
            immediate,
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Stage `event` for its device.
    ///
    /// A staged event of a different type is delivered first. One of the
    /// same type is replaced: within a frame the latest motion, button or
    /// crossing is the one that counts.
    pub fn stage(&mut self, event: InputEvent, queue: &mut EventQueue) -> &mut InputEvent {
        let frame = self.frames.entry(event.device).or_default();
        if let Some(staged) = frame.staged.take() {
            if staged.event_type() != event.event_type() {
                queue.push(staged);
            } else {
                tracing::trace!("replacing staged {:?}", staged.event_type());
            }
        }
        frame.staged.insert(event)
    }

    pub fn staged(&self, device: DeviceId) -> Option<&InputEvent> {
        self.frames.get(&device).and_then(|frame| frame.staged.as_ref())
    }

    pub fn staged_type(&self, device: DeviceId) -> Option<EventType> {
        self.staged(device).map(InputEvent::event_type)
    }

    pub fn staged_mut(&mut self, device: DeviceId) -> Option<&mut InputEvent> {
        self.frames
            .get_mut(&device)
            .and_then(|frame| frame.staged.as_mut())
    }

    /// Remove the staged event without delivering it.
    pub fn take_staged(&mut self, device: DeviceId) -> Option<InputEvent> {
        self.frames
            .get_mut(&device)
            .and_then(|frame| frame.staged.take())
    }

    pub fn scroll(&self, device: DeviceId) -> ScrollAccumulator {
        self.frames
            .get(&device)
            .map(|frame| frame.scroll)
            .unwrap_or_default()
    }

    pub fn scroll_mut(&mut self, device: DeviceId) -> &mut ScrollAccumulator {
        &mut self.frames.entry(device).or_default().scroll
    }

    /// Close the frame of `device`.
    ///
    /// The staged event is delivered. Scroll values collected during the
    /// frame become scroll events aimed at `target`: one wheel event if the
    /// frame carried discrete steps, then always one smooth event. Without a
    /// target the scroll values are dropped. Returns the number of events
    /// delivered.
    pub fn flush(
        &mut self,
        device: DeviceId,
        target: Option<&ScrollTarget>,
        queue: &mut EventQueue,
    ) -> usize {
        let frame = match self.frames.get_mut(&device) {
            Some(frame) => frame,
            None => return 0,
        };
        let mut delivered = 0;
        if let Some(event) = frame.staged.take() {
            queue.push(event);
            delivered += 1;
        }
        let scroll = std::mem::take(&mut frame.scroll);
        if !scroll.pending {
            return delivered;
        }
        let target = match target {
            Some(target) => target,
            None => {
                tracing::trace!("dropping scroll frame without a focus window");
                return delivered;
            }
        };
        if let Some(direction) = scroll.discrete_direction() {
            queue.push(target.event(target.scroll(direction, Vec2::ZERO, false)));
            delivered += 1;
        }
        let smooth = target.scroll(ScrollDirection::Smooth, scroll.delta, scroll.is_full_stop());
        queue.push(target.event(smooth));
        delivered + 1
    }

    /// Forget a device's frame, discarding anything staged.
    pub fn remove(&mut self, device: DeviceId) {
        if let Some(frame) = self.frames.remove(&device) {
            if let Some(staged) = frame.staged {
                tracing::debug!("discarding staged {:?} of removed device", staged.event_type());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Crossing, CrossingMode, Motion};

    const DEVICE: DeviceId = DeviceId(1);

    fn target() -> ScrollTarget {
        ScrollTarget {
            seat: SeatId(1),
            device: DEVICE,
            source_device: DeviceId(2),
            window: WindowId(7),
            time: 10,
            pos: Point::new(1., 2.),
            root: Point::new(1., 2.),
            state: ModifierState::default(),
        }
    }

    fn event(kind: EventKind) -> InputEvent {
        InputEvent {
            seat: SeatId(1),
            device: DEVICE,
            source_device: DeviceId(2),
            window: WindowId(7),
            time: 0,
            kind,
        }
    }

    fn motion(x: f64) -> InputEvent {
        event(EventKind::Motion(Motion {
            pos: Point::new(x, 0.),
            root: Point::new(x, 0.),
            state: ModifierState::default(),
            axes: None,
        }))
    }

    fn enter() -> InputEvent {
        event(EventKind::Enter(Crossing {
            pos: Point::ZERO,
            root: Point::ZERO,
            mode: CrossingMode::Normal,
            subwindow: None,
            state: ModifierState::default(),
        }))
    }

    fn smooth(event: &InputEvent) -> &Scroll {
        match &event.kind {
            EventKind::Scroll(scroll) => scroll,
            other => panic!("expected a scroll, got {:?}", other),
        }
    }

    #[test]
    fn same_type_replaces_the_staged_event() {
        let mut frames = FrameAggregator::new(false);
        let mut queue = EventQueue::new();
        frames.stage(motion(1.), &mut queue);
        frames.stage(motion(2.), &mut queue);
        assert!(queue.is_empty());
        assert_eq!(frames.flush(DEVICE, None, &mut queue), 1);
        assert_eq!(queue.pop(), Some(motion(2.)));
    }

    #[test]
    fn a_different_type_flushes_the_staged_event() {
        let mut frames = FrameAggregator::new(false);
        let mut queue = EventQueue::new();
        frames.stage(enter(), &mut queue);
        frames.stage(motion(3.), &mut queue);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().map(|e| e.event_type()), Some(EventType::Enter));
        assert_eq!(frames.staged_type(DEVICE), Some(EventType::Motion));
    }

    #[test]
    fn vertical_delta_becomes_one_smooth_scroll() {
        let mut frames = FrameAggregator::new(false);
        let mut queue = EventQueue::new();
        frames.scroll_mut(DEVICE).add_delta(Vec2::new(0., 3.));
        assert_eq!(frames.flush(DEVICE, Some(&target()), &mut queue), 1);
        let event = queue.pop().unwrap();
        let scroll = smooth(&event);
        assert_eq!(scroll.direction, ScrollDirection::Smooth);
        assert_eq!(scroll.delta, Vec2::new(0., 3.));
        assert!(!scroll.is_stop);
        assert!(!scroll.emulated);
    }

    #[test]
    fn a_stop_on_one_axis_is_not_a_full_stop() {
        let mut frames = FrameAggregator::new(false);
        let mut queue = EventQueue::new();
        frames.scroll_mut(DEVICE).add_delta(Vec2::new(2., 0.));
        frames.scroll_mut(DEVICE).stop_vertical();
        frames.flush(DEVICE, Some(&target()), &mut queue);
        assert!(!smooth(&queue.pop().unwrap()).is_stop);

        frames.scroll_mut(DEVICE).stop_vertical();
        frames.flush(DEVICE, Some(&target()), &mut queue);
        assert!(smooth(&queue.pop().unwrap()).is_stop);
    }

    #[test]
    fn discrete_steps_emit_a_wheel_event_first() {
        let mut frames = FrameAggregator::new(false);
        let mut queue = EventQueue::new();
        let scroll = frames.scroll_mut(DEVICE);
        scroll.set_discrete(false, 1);
        scroll.set_discrete(true, -1);
        scroll.add_delta(Vec2::new(-1.5, 1.5));
        assert_eq!(frames.flush(DEVICE, Some(&target()), &mut queue), 2);
        let wheel = queue.pop().unwrap();
        assert_eq!(smooth(&wheel).direction, ScrollDirection::Left);
        assert!(smooth(&wheel).emulated);
        let rest = queue.pop().unwrap();
        assert_eq!(smooth(&rest).delta, Vec2::new(-1.5, 1.5));
        assert_eq!(frames.scroll(DEVICE), ScrollAccumulator::default());
    }

    #[test]
    fn an_empty_frame_delivers_nothing() {
        let mut frames = FrameAggregator::new(false);
        let mut queue = EventQueue::new();
        frames.scroll_mut(DEVICE);
        assert_eq!(frames.flush(DEVICE, Some(&target()), &mut queue), 0);
        assert_eq!(frames.flush(DeviceId(9), Some(&target()), &mut queue), 0);
        assert!(queue.is_empty());
    }
}
