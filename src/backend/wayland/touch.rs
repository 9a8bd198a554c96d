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

use kurbo::Point;
use smithay_client_toolkit::reexports::client::protocol::wl_touch::{self, WlTouch};
use smithay_client_toolkit::reexports::client::{Connection, Dispatch, QueueHandle};

use crate::protocol::TouchNotification;
use crate::seat::SeatId;
use crate::touch::TouchId;

use super::{window_id, WaylandInput};

impl Dispatch<WlTouch, SeatId> for WaylandInput {
    fn event(
        state: &mut WaylandInput,
        _proxy: &WlTouch,
        event: wl_touch::Event,
        seat: &SeatId,
        _conn: &Connection,
        _qhandle: &QueueHandle<WaylandInput>,
    ) {
        let notification = match event {
            wl_touch::Event::Down {
                serial,
                time,
                surface,
                id,
                x,
                y,
            } => TouchNotification::Down {
                serial,
                time,
                window: window_id(&surface),
                id: TouchId(id),
                pos: Point::new(x, y),
            },
            wl_touch::Event::Up { serial, time, id } => TouchNotification::Up {
                serial,
                time,
                id: TouchId(id),
            },
            wl_touch::Event::Motion { time, id, x, y } => TouchNotification::Motion {
                time,
                id: TouchId(id),
                pos: Point::new(x, y),
            },
            wl_touch::Event::Frame => TouchNotification::Frame,
            wl_touch::Event::Cancel => TouchNotification::Cancel,
            // Shape and orientation carry nothing we track.
            _ => return,
        };
        state.dispatch(*seat, notification);
    }
}
