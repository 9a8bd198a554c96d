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

//! Wayland seat objects, translated into [`Notification`]s.
//!
//! [`WaylandInput`] is the dispatch state of an event queue dedicated to
//! input. It binds every `wl_seat`, creates pointer, keyboard and touch
//! objects as capabilities come and go, and forwards what they say to a
//! [`SeatManager`]. Surfaces created on other queues of the same connection
//! are recognized by their protocol id.
//!
//! Data devices and cursor surfaces belong to the embedder, who forwards
//! their events with [`WaylandInput::data_device_event`] and
//! [`WaylandInput::cursor_surface_event`].

use std::collections::BTreeMap;
use std::rc::Rc;

use kurbo::Point;
use smithay_client_toolkit::globals::GlobalData;
use smithay_client_toolkit::reexports::client::globals::GlobalList;
use smithay_client_toolkit::reexports::client::protocol::{
    wl_data_device, wl_output::WlOutput, wl_registry::WlRegistry, wl_seat::WlSeat, wl_surface,
    wl_surface::WlSurface,
};
use smithay_client_toolkit::reexports::client::QueueHandle;
use smithay_client_toolkit::reexports::protocols::wp::pointer_gestures::zv1::client::zwp_pointer_gestures_v1::ZwpPointerGesturesV1;
use smithay_client_toolkit::reexports::protocols::wp::tablet::zv2::client::zwp_tablet_manager_v2::ZwpTabletManagerV2;
use wayland_client::Proxy;

use crate::config::SeatConfig;
use crate::cursor::OutputId;
use crate::protocol::{CursorSurfaceNotification, DataDeviceNotification, Notification};
use crate::seat::{SeatId, SeatManager};
use crate::window::WindowId;
use crate::InputContext;

mod error;
mod keyboard;
mod pointer;
mod seat;
mod tablet;
mod touch;

pub use error::Error;
pub use keyboard::CalloopRepeatScheduler;
pub use seat::SeatObjects;

pub use smithay_client_toolkit::reexports::{calloop, client};

/// Highest `wl_seat` version we understand.
const SEAT_VERSION: u32 = 7;

/// Dispatch state for the input event queue.
pub struct WaylandInput {
    seats: SeatManager,
    objects: BTreeMap<SeatId, SeatObjects>,
    /// Tablets and tools by protocol id, and the seat that announced them.
    tablets: BTreeMap<u32, SeatId>,
    tools: BTreeMap<u32, SeatId>,
    gestures: Option<ZwpPointerGesturesV1>,
    tablet_manager: Option<ZwpTabletManagerV2>,
}

impl WaylandInput {
    /// Bind the optional input globals and every seat currently advertised.
    pub fn new(ctx: Rc<InputContext>, globals: &GlobalList, qh: &QueueHandle<Self>) -> Self {
        let gestures = match globals.bind(qh, 1..=3, GlobalData) {
            Ok(gestures) => Some(gestures),
            Err(e) => {
                tracing::info!("{}", Error::bind("zwp_pointer_gestures_v1", e));
                None
            }
        };
        let tablet_manager = match globals.bind(qh, 1..=1, GlobalData) {
            Ok(manager) => Some(manager),
            Err(e) => {
                tracing::info!("{}", Error::bind("zwp_tablet_manager_v2", e));
                None
            }
        };

        let mut input = WaylandInput {
            seats: SeatManager::new(ctx),
            objects: BTreeMap::new(),
            tablets: BTreeMap::new(),
            tools: BTreeMap::new(),
            gestures,
            tablet_manager,
        };

        let advertised: Vec<(u32, u32)> = globals.contents().with_list(|list| {
            list.iter()
                .filter(|global| global.interface == "wl_seat")
                .map(|global| (global.name, global.version))
                .collect()
        });
        for (name, version) in advertised {
            input.add_seat_global(globals.registry(), name, version, qh);
        }
        input
    }

    /// Bind a `wl_seat` global announced after startup.
    pub fn add_seat_global(
        &mut self,
        registry: &WlRegistry,
        name: u32,
        version: u32,
        qh: &QueueHandle<Self>,
    ) -> SeatId {
        let id = SeatId(name);
        if self.objects.contains_key(&id) {
            return id;
        }
        let version = version.min(SEAT_VERSION);
        let wl_seat: WlSeat = registry.bind(name, version, qh, id);
        let tablet_seat = self
            .tablet_manager
            .as_ref()
            .map(|manager| manager.get_tablet_seat(&wl_seat, qh, id));

        let config = SeatConfig {
            gestures: self.gestures.is_some(),
            tablets: tablet_seat.is_some(),
            ..SeatConfig::with_version(version)
        };
        self.seats.add_seat(id, "", config);
        self.objects
            .insert(id, SeatObjects::new(wl_seat, version, tablet_seat));
        tracing::debug!("bound wl_seat {} at version {}", name, version);
        id
    }

    /// Forget a `wl_seat` global the registry removed.
    pub fn remove_seat_global(&mut self, name: u32) -> bool {
        let id = SeatId(name);
        if let Some(objects) = self.objects.remove(&id) {
            objects.release();
        }
        self.tablets.retain(|_, seat| *seat != id);
        self.tools.retain(|_, seat| *seat != id);
        self.seats.remove_seat(id)
    }

    pub fn seats(&self) -> &SeatManager {
        &self.seats
    }

    pub fn seats_mut(&mut self) -> &mut SeatManager {
        &mut self.seats
    }

    pub fn context(&self) -> &Rc<InputContext> {
        self.seats.context()
    }

    pub fn seat_objects(&self, seat: SeatId) -> Option<&SeatObjects> {
        self.objects.get(&seat)
    }

    /// Forward an event of the data device the embedder created for `seat`.
    ///
    /// Offers and drag sources stay with the embedder; only focus and
    /// position are folded into the seat.
    pub fn data_device_event(&mut self, seat: SeatId, event: &wl_data_device::Event) {
        if let Some(notification) = data_device_notification(event) {
            self.dispatch(seat, notification);
        }
    }

    /// Forward an event of the surface the embedder uses as `seat`'s cursor.
    pub fn cursor_surface_event(&mut self, seat: SeatId, event: &wl_surface::Event) {
        let notification = match event {
            wl_surface::Event::Enter { output } => {
                CursorSurfaceNotification::Enter(output_id(output))
            }
            wl_surface::Event::Leave { output } => {
                CursorSurfaceNotification::Leave(output_id(output))
            }
            _ => return,
        };
        self.dispatch(seat, Notification::CursorSurface(notification));
    }

    /// Pump a translated notification into its seat.
    pub(crate) fn dispatch(&mut self, seat: SeatId, notification: impl Into<Notification>) {
        if let Err(e) = self.seats.dispatch(seat, notification.into()) {
            tracing::warn!("{}", e);
        }
    }
}

/// The id a surface goes by in the window resolver.
pub fn window_id(surface: &WlSurface) -> WindowId {
    WindowId(surface.id().protocol_id() as u64)
}

pub fn output_id(output: &WlOutput) -> OutputId {
    OutputId(output.id().protocol_id())
}

fn data_device_notification(event: &wl_data_device::Event) -> Option<DataDeviceNotification> {
    let notification = match event {
        wl_data_device::Event::Enter {
            serial,
            surface,
            x,
            y,
            ..
        } => DataDeviceNotification::Enter {
            serial: *serial,
            window: window_id(surface),
            pos: Point::new(*x, *y),
        },
        wl_data_device::Event::Leave => DataDeviceNotification::Leave,
        wl_data_device::Event::Motion { time, x, y } => DataDeviceNotification::Motion {
            time: *time,
            pos: Point::new(*x, *y),
        },
        wl_data_device::Event::Drop => DataDeviceNotification::Drop,
        wl_data_device::Event::Selection { id } => DataDeviceNotification::Selection {
            offered: id.is_some(),
        },
        _ => return None,
    };
    Some(notification)
}
