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

use std::cell::RefCell;
use std::rc::Rc;

use glazier_input::protocol::{
    CursorSurfaceNotification, PointerNotification, TabletNotification, TabletSeatNotification,
    ToolNotification,
};
use glazier_input::tablet::{TabletId, ToolId, ToolType};
use glazier_input::{
    Cursor, CursorTarget, CursorTheme, GrabRequest, GrabStatus, InputContext, Notification,
    OutputId, SeatCapabilities, SeatConfig, SeatId, SeatManager, WindowId, WindowTree,
};
use kurbo::Point;

const SEAT: SeatId = SeatId(1);

/// Uses the output id as its scale.
#[derive(Default)]
struct Recorder {
    applied: RefCell<Vec<(CursorTarget, Cursor, u32, u32)>>,
}

impl CursorTheme for Recorder {
    fn output_scale(&self, output: OutputId) -> u32 {
        output.0
    }

    fn apply(&self, target: CursorTarget, cursor: &Cursor, scale: u32, serial: u32) -> bool {
        self.applied
            .borrow_mut()
            .push((target, cursor.clone(), scale, serial));
        false
    }
}

fn setup() -> (Rc<WindowTree>, Rc<Recorder>, SeatManager) {
    let windows = Rc::new(WindowTree::new());
    windows.insert_toplevel(WindowId(1), Point::ZERO);
    windows.insert_toplevel(WindowId(2), Point::ZERO);
    windows.set_cursor(WindowId(1), Some(Cursor::IBeam));
    let theme = Rc::new(Recorder::default());
    let ctx = InputContext::new(windows.clone()).with_cursor_theme(theme.clone());
    let mut seats = SeatManager::new(Rc::new(ctx));
    seats
        .add_seat(SEAT, "seat0", SeatConfig::default())
        .set_capabilities(SeatCapabilities::POINTER);
    (windows, theme, seats)
}

#[test_log::test]
fn window_cursor_follows_scale_and_grabs() {
    let (_windows, theme, mut seats) = setup();
    let master = seats.seat(SEAT).unwrap().master_pointer();
    let target = CursorTarget::Pointer(master);

    for event in [
        PointerNotification::Enter {
            serial: 4,
            window: WindowId(1),
            pos: Point::new(1., 1.),
        },
        PointerNotification::Frame,
    ] {
        seats.dispatch(SEAT, event.into()).unwrap();
    }
    assert_eq!(
        theme.applied.borrow().last(),
        Some(&(target, Cursor::IBeam, 1, 4))
    );

    seats
        .dispatch(
            SEAT,
            Notification::CursorSurface(CursorSurfaceNotification::Enter(OutputId(2))),
        )
        .unwrap();
    assert_eq!(
        theme.applied.borrow().last(),
        Some(&(target, Cursor::IBeam, 2, 4))
    );
    assert_eq!(seats.seat(SEAT).unwrap().pointer().cursor().scale(), 2);

    let seat = seats.seat_mut(SEAT).unwrap();
    let status = seat.grab(
        GrabRequest::new(WindowId(2), SeatCapabilities::POINTER)
            .cursor(Cursor::Crosshair)
            .time(10),
    );
    assert_eq!(status, GrabStatus::Success);
    assert_eq!(
        theme.applied.borrow().last(),
        Some(&(target, Cursor::Crosshair, 2, 4))
    );

    seat.ungrab();
    assert_eq!(
        theme.applied.borrow().last(),
        Some(&(target, Cursor::IBeam, 2, 4))
    );

    // Leaving the only output drops back to scale 1.
    seat.dispatch(Notification::CursorSurface(
        CursorSurfaceNotification::Leave(OutputId(2)),
    ));
    assert_eq!(seat.pointer().cursor().scale(), 1);
    assert_eq!(theme.applied.borrow().len(), 5);
}

#[test_log::test]
fn windows_without_a_cursor_get_the_default() {
    let (_windows, theme, mut seats) = setup();
    for event in [
        PointerNotification::Enter {
            serial: 9,
            window: WindowId(2),
            pos: Point::ZERO,
        },
        PointerNotification::Frame,
    ] {
        seats.dispatch(SEAT, event.into()).unwrap();
    }
    let applied = theme.applied.borrow();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].1, Cursor::Arrow);
}

#[test_log::test]
fn reentering_a_window_reapplies_with_the_new_serial() {
    let (_windows, theme, mut seats) = setup();
    for event in [
        PointerNotification::Enter {
            serial: 4,
            window: WindowId(2),
            pos: Point::ZERO,
        },
        PointerNotification::Frame,
        PointerNotification::Leave {
            serial: 5,
            window: WindowId(2),
        },
        PointerNotification::Frame,
        PointerNotification::Enter {
            serial: 6,
            window: WindowId(2),
            pos: Point::ZERO,
        },
        PointerNotification::Frame,
    ] {
        seats.dispatch(SEAT, event.into()).unwrap();
    }
    let applied = theme.applied.borrow();
    let serials: Vec<u32> = applied.iter().map(|(.., serial)| *serial).collect();
    assert_eq!(serials, vec![4, 6]);
    assert_eq!(applied[1].1, Cursor::Arrow);
}

#[test_log::test]
fn tools_coming_back_into_proximity_get_their_cursor_again() {
    let (_windows, theme, mut seats) = setup();
    let tablet = TabletId(10);
    let tool = ToolId(20);
    seats
        .dispatch(
            SEAT,
            Notification::TabletSeat(TabletSeatNotification::TabletAdded(tablet)),
        )
        .unwrap();
    seats
        .dispatch(
            SEAT,
            Notification::Tablet {
                tablet,
                event: TabletNotification::Done,
            },
        )
        .unwrap();
    seats
        .dispatch(
            SEAT,
            Notification::TabletSeat(TabletSeatNotification::ToolAdded(tool)),
        )
        .unwrap();
    let mut send = |event| {
        seats
            .dispatch(SEAT, Notification::Tool { tool, event })
            .unwrap()
    };
    send(ToolNotification::Type(ToolType::Pen));
    send(ToolNotification::Done);
    for serial in [7, 9] {
        send(ToolNotification::ProximityIn {
            serial,
            tablet,
            window: WindowId(1),
        });
        send(ToolNotification::Frame { time: serial });
        send(ToolNotification::ProximityOut);
        send(ToolNotification::Frame { time: serial + 1 });
    }

    let applied = theme.applied.borrow();
    let tool_cursors: Vec<_> = applied
        .iter()
        .filter(|(target, ..)| *target == CursorTarget::Tool(tool))
        .map(|(_, cursor, _, serial)| (cursor.clone(), *serial))
        .collect();
    assert_eq!(tool_cursors, vec![(Cursor::IBeam, 7), (Cursor::IBeam, 9)]);
}
