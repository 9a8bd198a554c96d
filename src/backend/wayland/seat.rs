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

use smithay_client_toolkit::globals::GlobalData;
use smithay_client_toolkit::reexports::client::globals::GlobalListContents;
use smithay_client_toolkit::reexports::client::protocol::{
    wl_keyboard::WlKeyboard,
    wl_pointer::WlPointer,
    wl_registry::{self, WlRegistry},
    wl_seat::{self, WlSeat},
    wl_touch::WlTouch,
};
use smithay_client_toolkit::reexports::client::{Connection, Dispatch, QueueHandle, WEnum};
use smithay_client_toolkit::reexports::protocols::wp::pointer_gestures::zv1::client::{
    zwp_pointer_gesture_pinch_v1::ZwpPointerGesturePinchV1,
    zwp_pointer_gesture_swipe_v1::ZwpPointerGestureSwipeV1,
    zwp_pointer_gestures_v1::ZwpPointerGesturesV1,
};
use smithay_client_toolkit::reexports::protocols::wp::tablet::zv2::client::{
    zwp_tablet_manager_v2::ZwpTabletManagerV2, zwp_tablet_seat_v2::ZwpTabletSeatV2,
};
use wayland_client::Proxy;

use crate::device::SeatCapabilities;
use crate::protocol::Notification;
use crate::seat::SeatId;

use super::WaylandInput;

/// The protocol objects created on behalf of one seat.
#[derive(Debug)]
pub struct SeatObjects {
    seat: WlSeat,
    version: u32,
    pointer: Option<WlPointer>,
    keyboard: Option<WlKeyboard>,
    touch: Option<WlTouch>,
    swipe: Option<ZwpPointerGestureSwipeV1>,
    pinch: Option<ZwpPointerGesturePinchV1>,
    tablet_seat: Option<ZwpTabletSeatV2>,
}

impl SeatObjects {
    pub(super) fn new(seat: WlSeat, version: u32, tablet_seat: Option<ZwpTabletSeatV2>) -> Self {
        Self {
            seat,
            version,
            pointer: None,
            keyboard: None,
            touch: None,
            swipe: None,
            pinch: None,
            tablet_seat,
        }
    }

    pub fn wl_seat(&self) -> &WlSeat {
        &self.seat
    }

    /// The pointer, for setting the cursor surface.
    pub fn pointer(&self) -> Option<&WlPointer> {
        self.pointer.as_ref()
    }

    pub fn keyboard(&self) -> Option<&WlKeyboard> {
        self.keyboard.as_ref()
    }

    pub fn touch(&self) -> Option<&WlTouch> {
        self.touch.as_ref()
    }

    /// Create or release objects so they match `capabilities`.
    fn update(
        &mut self,
        capabilities: SeatCapabilities,
        gestures: Option<&ZwpPointerGesturesV1>,
        qh: &QueueHandle<WaylandInput>,
        id: SeatId,
    ) {
        if !capabilities.contains(SeatCapabilities::POINTER) {
            self.release_pointer();
        } else if self.pointer.is_none() {
            let pointer = self.seat.get_pointer(qh, id);
            if let Some(gestures) = gestures {
                self.swipe = Some(gestures.get_swipe_gesture(&pointer, qh, id));
                self.pinch = Some(gestures.get_pinch_gesture(&pointer, qh, id));
            }
            self.pointer = Some(pointer);
        }

        if !capabilities.contains(SeatCapabilities::KEYBOARD) {
            self.release_keyboard();
        } else if self.keyboard.is_none() {
            self.keyboard = Some(self.seat.get_keyboard(qh, id));
        }

        if !capabilities.contains(SeatCapabilities::TOUCH) {
            self.release_touch();
        } else if self.touch.is_none() {
            self.touch = Some(self.seat.get_touch(qh, id));
        }
    }

    fn release_pointer(&mut self) {
        if let Some(swipe) = self.swipe.take() {
            swipe.destroy();
        }
        if let Some(pinch) = self.pinch.take() {
            pinch.destroy();
        }
        if let Some(pointer) = self.pointer.take() {
            // release is only available since version 3.
            if self.version >= 3 {
                pointer.release();
            }
        }
    }

    fn release_keyboard(&mut self) {
        if let Some(keyboard) = self.keyboard.take() {
            if self.version >= 3 {
                keyboard.release();
            }
        }
    }

    fn release_touch(&mut self) {
        if let Some(touch) = self.touch.take() {
            if self.version >= 3 {
                touch.release();
            }
        }
    }

    pub(super) fn release(mut self) {
        self.release_pointer();
        self.release_keyboard();
        self.release_touch();
        if let Some(tablet_seat) = self.tablet_seat.take() {
            tablet_seat.destroy();
        }
        if self.version >= 5 {
            self.seat.release();
        }
    }
}

fn seat_capabilities(capabilities: WEnum<wl_seat::Capability>) -> SeatCapabilities {
    let capabilities = match capabilities {
        WEnum::Value(capabilities) => capabilities,
        WEnum::Unknown(bits) => wl_seat::Capability::from_bits_truncate(bits),
    };
    let mut converted = SeatCapabilities::empty();
    converted.set(
        SeatCapabilities::POINTER,
        capabilities.contains(wl_seat::Capability::Pointer),
    );
    converted.set(
        SeatCapabilities::KEYBOARD,
        capabilities.contains(wl_seat::Capability::Keyboard),
    );
    converted.set(
        SeatCapabilities::TOUCH,
        capabilities.contains(wl_seat::Capability::Touch),
    );
    converted
}

impl Dispatch<WlSeat, SeatId> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        _proxy: &WlSeat,
        event: wl_seat::Event,
        seat: &SeatId,
        _conn: &Connection,
        qh: &QueueHandle<WaylandInput>,
    ) {
        match event {
            wl_seat::Event::Capabilities { capabilities } => {
                let capabilities = seat_capabilities(capabilities);
                if let Some(objects) = state.objects.get_mut(seat) {
                    objects.update(capabilities, state.gestures.as_ref(), qh, *seat);
                }
                state.dispatch(*seat, Notification::Capabilities(capabilities));
            }
            wl_seat::Event::Name { name } => {
                state.dispatch(*seat, Notification::Name(name));
            }
            _ => {}
        }
    }
}

impl Dispatch<WlRegistry, GlobalListContents> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        qh: &QueueHandle<WaylandInput>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } if interface == WlSeat::interface().name => {
                state.add_seat_global(registry, name, version, qh);
            }
            wl_registry::Event::GlobalRemove { name } => {
                state.remove_seat_global(name);
            }
            _ => {}
        }
    }
}

impl Dispatch<ZwpPointerGesturesV1, GlobalData> for WaylandInput {
    fn event(
        _state: &mut WaylandInput,
        _proxy: &ZwpPointerGesturesV1,
        _event: <ZwpPointerGesturesV1 as Proxy>::Event,
        _data: &GlobalData,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
    }
}

impl Dispatch<ZwpTabletManagerV2, GlobalData> for WaylandInput {
    fn event(
        _state: &mut WaylandInput,
        _proxy: &ZwpTabletManagerV2,
        _event: <ZwpTabletManagerV2 as Proxy>::Event,
        _data: &GlobalData,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
    }
}
