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

use kurbo::{Point, Vec2};
use smithay_client_toolkit::reexports::client::protocol::wl_pointer::{self, WlPointer};
use smithay_client_toolkit::reexports::client::{Connection, Dispatch, QueueHandle, WEnum};
use smithay_client_toolkit::reexports::protocols::wp::pointer_gestures::zv1::client::{
    zwp_pointer_gesture_pinch_v1::{self, ZwpPointerGesturePinchV1},
    zwp_pointer_gesture_swipe_v1::{self, ZwpPointerGestureSwipeV1},
};

use crate::protocol::{Axis, AxisSource, GestureNotification, Notification, PointerNotification};
use crate::seat::SeatId;

use super::{window_id, WaylandInput};

fn axis(axis: WEnum<wl_pointer::Axis>) -> Option<Axis> {
    match axis {
        WEnum::Value(wl_pointer::Axis::VerticalScroll) => Some(Axis::Vertical),
        WEnum::Value(wl_pointer::Axis::HorizontalScroll) => Some(Axis::Horizontal),
        _ => {
            tracing::warn!("unknown pointer axis {:?}", axis);
            None
        }
    }
}

fn axis_source(source: WEnum<wl_pointer::AxisSource>) -> Option<AxisSource> {
    match source {
        WEnum::Value(wl_pointer::AxisSource::Wheel) => Some(AxisSource::Wheel),
        WEnum::Value(wl_pointer::AxisSource::Finger) => Some(AxisSource::Finger),
        WEnum::Value(wl_pointer::AxisSource::Continuous) => Some(AxisSource::Continuous),
        WEnum::Value(wl_pointer::AxisSource::WheelTilt) => Some(AxisSource::WheelTilt),
        _ => None,
    }
}

fn pointer_notification(event: wl_pointer::Event) -> Option<PointerNotification> {
    let notification = match event {
        wl_pointer::Event::Enter {
            serial,
            surface,
            surface_x,
            surface_y,
        } => PointerNotification::Enter {
            serial,
            window: window_id(&surface),
            pos: Point::new(surface_x, surface_y),
        },
        wl_pointer::Event::Leave { serial, surface } => PointerNotification::Leave {
            serial,
            window: window_id(&surface),
        },
        wl_pointer::Event::Motion {
            time,
            surface_x,
            surface_y,
        } => PointerNotification::Motion {
            time,
            pos: Point::new(surface_x, surface_y),
        },
        wl_pointer::Event::Button {
            serial,
            time,
            button,
            state,
        } => PointerNotification::Button {
            serial,
            time,
            button,
            pressed: state == WEnum::Value(wl_pointer::ButtonState::Pressed),
        },
        wl_pointer::Event::Axis {
            time,
            axis: which,
            value,
        } => PointerNotification::Axis {
            time,
            axis: axis(which)?,
            value,
        },
        wl_pointer::Event::AxisSource { axis_source: source } => {
            PointerNotification::AxisSource(axis_source(source)?)
        }
        wl_pointer::Event::AxisStop { time, axis: which } => PointerNotification::AxisStop {
            time,
            axis: axis(which)?,
        },
        wl_pointer::Event::AxisDiscrete {
            axis: which,
            discrete,
        } => PointerNotification::AxisDiscrete {
            axis: axis(which)?,
            discrete,
        },
        wl_pointer::Event::Frame => PointerNotification::Frame,
        _ => return None,
    };
    Some(notification)
}

impl Dispatch<WlPointer, SeatId> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        _proxy: &WlPointer,
        event: wl_pointer::Event,
        seat: &SeatId,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        if let Some(notification) = pointer_notification(event) {
            state.dispatch(*seat, notification);
        }
    }
}

impl Dispatch<ZwpPointerGestureSwipeV1, SeatId> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        _proxy: &ZwpPointerGestureSwipeV1,
        event: zwp_pointer_gesture_swipe_v1::Event,
        seat: &SeatId,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        let notification = match event {
            zwp_pointer_gesture_swipe_v1::Event::Begin {
                serial,
                time,
                surface,
                fingers,
            } => GestureNotification::Begin {
                serial,
                time,
                window: window_id(&surface),
                fingers,
            },
            zwp_pointer_gesture_swipe_v1::Event::Update { time, dx, dy } => {
                GestureNotification::Update {
                    time,
                    delta: Vec2::new(dx, dy),
                    scale: 1.0,
                    rotation: 0.0,
                }
            }
            zwp_pointer_gesture_swipe_v1::Event::End {
                serial,
                time,
                cancelled,
            } => GestureNotification::End {
                serial,
                time,
                cancelled: cancelled != 0,
            },
            _ => return,
        };
        state.dispatch(*seat, Notification::Swipe(notification));
    }
}

impl Dispatch<ZwpPointerGesturePinchV1, SeatId> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        _proxy: &ZwpPointerGesturePinchV1,
        event: zwp_pointer_gesture_pinch_v1::Event,
        seat: &SeatId,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        let notification = match event {
            zwp_pointer_gesture_pinch_v1::Event::Begin {
                serial,
                time,
                surface,
                fingers,
            } => GestureNotification::Begin {
                serial,
                time,
                window: window_id(&surface),
                fingers,
            },
            zwp_pointer_gesture_pinch_v1::Event::Update {
                time,
                dx,
                dy,
                scale,
                rotation,
            } => GestureNotification::Update {
                time,
                delta: Vec2::new(dx, dy),
                scale,
                rotation,
            },
            zwp_pointer_gesture_pinch_v1::Event::End {
                serial,
                time,
                cancelled,
            } => GestureNotification::End {
                serial,
                time,
                cancelled: cancelled != 0,
            },
            _ => return,
        };
        state.dispatch(*seat, Notification::Pinch(notification));
    }
}
