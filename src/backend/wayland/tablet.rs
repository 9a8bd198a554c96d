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
use smithay_client_toolkit::reexports::client::{
    event_created_child, Connection, Dispatch, Proxy, QueueHandle, WEnum,
};
use smithay_client_toolkit::reexports::protocols::wp::tablet::zv2::client::{
    zwp_tablet_pad_group_v2::{self, ZwpTabletPadGroupV2},
    zwp_tablet_pad_ring_v2::ZwpTabletPadRingV2,
    zwp_tablet_pad_strip_v2::ZwpTabletPadStripV2,
    zwp_tablet_pad_v2::{self, ZwpTabletPadV2},
    zwp_tablet_seat_v2::{self, ZwpTabletSeatV2},
    zwp_tablet_tool_v2::{self, ZwpTabletToolV2},
    zwp_tablet_v2::{self, ZwpTabletV2},
};

use crate::protocol::{Notification, TabletNotification, TabletSeatNotification, ToolNotification};
use crate::seat::SeatId;
use crate::tablet::{TabletId, ToolCapabilities, ToolId, ToolType};

use super::{window_id, WaylandInput};

/// Pressure and distance arrive scaled to this range.
const AXIS_MAX: f64 = 65535.0;

fn tablet_id(tablet: &ZwpTabletV2) -> TabletId {
    TabletId(tablet.id().protocol_id())
}

fn tool_id(tool: &ZwpTabletToolV2) -> ToolId {
    ToolId(tool.id().protocol_id())
}

fn tool_type(tool_type: WEnum<zwp_tablet_tool_v2::Type>) -> ToolType {
    match tool_type {
        WEnum::Value(zwp_tablet_tool_v2::Type::Pen) => ToolType::Pen,
        WEnum::Value(zwp_tablet_tool_v2::Type::Eraser) => ToolType::Eraser,
        WEnum::Value(zwp_tablet_tool_v2::Type::Brush) => ToolType::Brush,
        WEnum::Value(zwp_tablet_tool_v2::Type::Pencil) => ToolType::Pencil,
        WEnum::Value(zwp_tablet_tool_v2::Type::Airbrush) => ToolType::Airbrush,
        _ => ToolType::Unknown,
    }
}

fn tool_capability(capability: WEnum<zwp_tablet_tool_v2::Capability>) -> Option<ToolCapabilities> {
    match capability {
        WEnum::Value(zwp_tablet_tool_v2::Capability::Tilt) => Some(ToolCapabilities::TILT),
        WEnum::Value(zwp_tablet_tool_v2::Capability::Pressure) => Some(ToolCapabilities::PRESSURE),
        WEnum::Value(zwp_tablet_tool_v2::Capability::Distance) => Some(ToolCapabilities::DISTANCE),
        _ => None,
    }
}

fn tool_notification(event: zwp_tablet_tool_v2::Event) -> Option<ToolNotification> {
    let notification = match event {
        zwp_tablet_tool_v2::Event::Type { tool_type: kind } => {
            ToolNotification::Type(tool_type(kind))
        }
        zwp_tablet_tool_v2::Event::HardwareSerial {
            hardware_serial_hi,
            hardware_serial_lo,
        } => ToolNotification::HardwareSerial(
            (u64::from(hardware_serial_hi) << 32) | u64::from(hardware_serial_lo),
        ),
        zwp_tablet_tool_v2::Event::HardwareIdWacom {
            hardware_id_hi,
            hardware_id_lo,
        } => ToolNotification::HardwareId(
            (u64::from(hardware_id_hi) << 32) | u64::from(hardware_id_lo),
        ),
        zwp_tablet_tool_v2::Event::Capability { capability } => {
            ToolNotification::Capability(tool_capability(capability)?)
        }
        zwp_tablet_tool_v2::Event::Done => ToolNotification::Done,
        zwp_tablet_tool_v2::Event::Removed => ToolNotification::Removed,
        zwp_tablet_tool_v2::Event::ProximityIn {
            serial,
            tablet,
            surface,
        } => ToolNotification::ProximityIn {
            serial,
            tablet: tablet_id(&tablet),
            window: window_id(&surface),
        },
        zwp_tablet_tool_v2::Event::ProximityOut => ToolNotification::ProximityOut,
        zwp_tablet_tool_v2::Event::Down { serial } => ToolNotification::Down { serial },
        zwp_tablet_tool_v2::Event::Up => ToolNotification::Up,
        zwp_tablet_tool_v2::Event::Motion { x, y } => ToolNotification::Motion(Point::new(x, y)),
        zwp_tablet_tool_v2::Event::Pressure { pressure } => {
            ToolNotification::Pressure(f64::from(pressure) / AXIS_MAX)
        }
        zwp_tablet_tool_v2::Event::Distance { distance } => {
            ToolNotification::Distance(f64::from(distance) / AXIS_MAX)
        }
        zwp_tablet_tool_v2::Event::Tilt { tilt_x, tilt_y } => {
            ToolNotification::Tilt(Vec2::new(tilt_x, tilt_y))
        }
        zwp_tablet_tool_v2::Event::Button {
            serial,
            button,
            state,
        } => ToolNotification::Button {
            serial,
            button,
            pressed: state == WEnum::Value(zwp_tablet_tool_v2::ButtonState::Pressed),
        },
        zwp_tablet_tool_v2::Event::Frame { time } => ToolNotification::Frame { time },
        // Rotation, slider and wheel axes are not tracked.
        _ => return None,
    };
    Some(notification)
}

impl Dispatch<ZwpTabletSeatV2, SeatId> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        _proxy: &ZwpTabletSeatV2,
        event: zwp_tablet_seat_v2::Event,
        seat: &SeatId,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        let notification = match event {
            zwp_tablet_seat_v2::Event::TabletAdded { id } => {
                let tablet = tablet_id(&id);
                state.tablets.insert(tablet.0, *seat);
                TabletSeatNotification::TabletAdded(tablet)
            }
            zwp_tablet_seat_v2::Event::ToolAdded { id } => {
                let tool = tool_id(&id);
                state.tools.insert(tool.0, *seat);
                TabletSeatNotification::ToolAdded(tool)
            }
            zwp_tablet_seat_v2::Event::PadAdded { .. } => {
                tracing::trace!("seat {:?}: ignoring tablet pad", seat);
                return;
            }
            _ => return,
        };
        state.dispatch(*seat, Notification::TabletSeat(notification));
    }

    event_created_child!(WaylandInput, ZwpTabletSeatV2, [
        zwp_tablet_seat_v2::EVT_TABLET_ADDED_OPCODE => (ZwpTabletV2, ()),
        zwp_tablet_seat_v2::EVT_TOOL_ADDED_OPCODE => (ZwpTabletToolV2, ()),
        zwp_tablet_seat_v2::EVT_PAD_ADDED_OPCODE => (ZwpTabletPadV2, ()),
    ]);
}

impl Dispatch<ZwpTabletV2, ()> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        proxy: &ZwpTabletV2,
        event: zwp_tablet_v2::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        let tablet = tablet_id(proxy);
        let seat = match state.tablets.get(&tablet.0) {
            Some(seat) => *seat,
            None => {
                tracing::warn!("event for tablet {:?} of an unknown seat", tablet);
                return;
            }
        };
        let event = match event {
            zwp_tablet_v2::Event::Name { name } => TabletNotification::Name(name),
            zwp_tablet_v2::Event::Id { vid, pid } => TabletNotification::Id { vid, pid },
            zwp_tablet_v2::Event::Path { path } => TabletNotification::Path(path),
            zwp_tablet_v2::Event::Done => TabletNotification::Done,
            zwp_tablet_v2::Event::Removed => {
                state.tablets.remove(&tablet.0);
                proxy.destroy();
                TabletNotification::Removed
            }
            _ => return,
        };
        state.dispatch(seat, Notification::Tablet { tablet, event });
    }
}

impl Dispatch<ZwpTabletToolV2, ()> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        proxy: &ZwpTabletToolV2,
        event: zwp_tablet_tool_v2::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        let tool = tool_id(proxy);
        let seat = match state.tools.get(&tool.0) {
            Some(seat) => *seat,
            None => {
                tracing::warn!("event for tool {:?} of an unknown seat", tool);
                return;
            }
        };
        let event = match tool_notification(event) {
            Some(event) => event,
            None => return,
        };
        if event == ToolNotification::Removed {
            state.tools.remove(&tool.0);
            proxy.destroy();
        }
        state.dispatch(seat, Notification::Tool { tool, event });
    }
}

impl Dispatch<ZwpTabletPadV2, ()> for WaylandInput {
    fn event(
        _state: &mut WaylandInput,
        proxy: &ZwpTabletPadV2,
        event: zwp_tablet_pad_v2::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        if let zwp_tablet_pad_v2::Event::Removed = event {
            proxy.destroy();
        }
    }

    event_created_child!(WaylandInput, ZwpTabletPadV2, [
        zwp_tablet_pad_v2::EVT_GROUP_OPCODE => (ZwpTabletPadGroupV2, ()),
    ]);
}

impl Dispatch<ZwpTabletPadGroupV2, ()> for WaylandInput {
    fn event(
        _state: &mut WaylandInput,
        _proxy: &ZwpTabletPadGroupV2,
        _event: zwp_tablet_pad_group_v2::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
    }

    event_created_child!(WaylandInput, ZwpTabletPadGroupV2, [
        zwp_tablet_pad_group_v2::EVT_RING_OPCODE => (ZwpTabletPadRingV2, ()),
        zwp_tablet_pad_group_v2::EVT_STRIP_OPCODE => (ZwpTabletPadStripV2, ()),
    ]);
}

impl Dispatch<ZwpTabletPadRingV2, ()> for WaylandInput {
    fn event(
        _state: &mut WaylandInput,
        _proxy: &ZwpTabletPadRingV2,
        _event: <ZwpTabletPadRingV2 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
    }
}

impl Dispatch<ZwpTabletPadStripV2, ()> for WaylandInput {
    fn event(
        _state: &mut WaylandInput,
        _proxy: &ZwpTabletPadStripV2,
        _event: <ZwpTabletPadStripV2 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
    }
}
