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

//! Whole-seat scenarios: notifications in, application events out.

use std::rc::Rc;
use std::time::Duration;

use glazier_input::event::{CrossingMode, ScrollDirection};
use glazier_input::gesture::GestureKind;
use glazier_input::protocol::{
    Axis, GestureNotification, KeyboardNotification, PointerNotification, TabletNotification,
    TabletSeatNotification, ToolNotification, TouchNotification,
};
use glazier_input::tablet::{TabletId, ToolCapabilities, ToolId, ToolType};
use glazier_input::touch::TouchId;
use glazier_input::{
    EventKind, EventType, GrabRequest, GrabStatus, InputContext, InputEvent,
    ManualRepeatScheduler, Notification, SeatCapabilities, SeatConfig, SeatId, SeatManager,
    WindowId, WindowTree, CLIPBOARD,
};
use kurbo::{Point, Vec2};

const SEAT: SeatId = SeatId(1);
const MAIN: WindowId = WindowId(1);
const OTHER: WindowId = WindowId(2);

const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;
const KEY_A: u32 = 30;

struct Harness {
    windows: Rc<WindowTree>,
    scheduler: Rc<ManualRepeatScheduler>,
    seats: SeatManager,
}

impl Harness {
    fn new(capabilities: SeatCapabilities) -> Self {
        Self::with_config(capabilities, SeatConfig::default())
    }

    fn with_config(capabilities: SeatCapabilities, config: SeatConfig) -> Self {
        let windows = Rc::new(WindowTree::new());
        windows.insert_toplevel(MAIN, Point::new(100., 50.));
        windows.insert_toplevel(OTHER, Point::new(400., 0.));
        let scheduler = Rc::new(ManualRepeatScheduler::new());
        let ctx = InputContext::new(windows.clone()).with_scheduler(scheduler.clone());
        let mut seats = SeatManager::new(Rc::new(ctx));
        seats
            .add_seat(SEAT, "seat0", config)
            .set_capabilities(capabilities);
        Harness {
            windows,
            scheduler,
            seats,
        }
    }

    fn send(&mut self, notification: impl Into<Notification>) {
        self.seats.dispatch(SEAT, notification.into()).unwrap();
    }

    fn pointer(&mut self, event: PointerNotification) {
        self.send(event);
        self.send(PointerNotification::Frame);
    }

    fn events(&self) -> Vec<InputEvent> {
        self.seats.context().drain_events()
    }

    fn types(&self) -> Vec<EventType> {
        self.events().iter().map(InputEvent::event_type).collect()
    }

    fn seat(&mut self) -> &mut glazier_input::Seat {
        self.seats.seat_mut(SEAT).unwrap()
    }

    fn enter_pointer(&mut self, window: WindowId, pos: Point) {
        self.pointer(PointerNotification::Enter {
            serial: 1,
            window,
            pos,
        });
    }

    fn focus_keyboard(&mut self, window: WindowId) {
        self.send(KeyboardNotification::Enter {
            serial: 2,
            window,
            keys: Vec::new(),
        });
    }
}

#[test_log::test]
fn balanced_buttons_leave_an_empty_mask() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    h.enter_pointer(MAIN, Point::new(5., 5.));
    let presses = [
        (BTN_LEFT, true),
        (BTN_RIGHT, true),
        (BTN_LEFT, false),
        (BTN_MIDDLE, true),
        (BTN_RIGHT, false),
        (BTN_MIDDLE, false),
    ];
    for (serial, (button, pressed)) in presses.into_iter().enumerate() {
        h.pointer(PointerNotification::Button {
            serial: serial as u32 + 10,
            time: serial as u32,
            button,
            pressed,
        });
    }
    assert!(h.seat().pointer().buttons().is_empty());

    let types = h.types();
    assert_eq!(types[0], EventType::Enter);
    assert_eq!(
        types.iter().filter(|ty| **ty == EventType::ButtonPress).count(),
        3
    );
    assert_eq!(
        types
            .iter()
            .filter(|ty| **ty == EventType::ButtonRelease)
            .count(),
        3
    );
}

#[test_log::test]
fn scroll_frames_become_one_smooth_event() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    h.enter_pointer(MAIN, Point::new(5., 5.));
    h.events();

    h.pointer(PointerNotification::Axis {
        time: 10,
        axis: Axis::Vertical,
        value: 30.,
    });
    let events = h.events();
    assert_eq!(events.len(), 1);
    match &events[0].kind {
        EventKind::Scroll(scroll) => {
            assert_eq!(scroll.direction, ScrollDirection::Smooth);
            assert_eq!(scroll.delta, Vec2::new(0., 3.));
            assert!(!scroll.is_stop);
        }
        other => panic!("expected a scroll, got {:?}", other),
    }

    h.pointer(PointerNotification::AxisStop {
        time: 20,
        axis: Axis::Vertical,
    });
    match &h.events()[..] {
        [InputEvent {
            kind: EventKind::Scroll(scroll),
            ..
        }] => assert!(scroll.is_stop),
        other => panic!("expected one scroll, got {:?}", other),
    }

    // A horizontal delta in the same frame keeps the scroll going.
    h.send(PointerNotification::Axis {
        time: 30,
        axis: Axis::Horizontal,
        value: 10.,
    });
    h.pointer(PointerNotification::AxisStop {
        time: 30,
        axis: Axis::Vertical,
    });
    match &h.events()[..] {
        [InputEvent {
            kind: EventKind::Scroll(scroll),
            ..
        }] => {
            assert!(!scroll.is_stop);
            assert_eq!(scroll.delta, Vec2::new(1., 0.));
        }
        other => panic!("expected one scroll, got {:?}", other),
    }
}

#[test_log::test]
fn discrete_steps_add_a_wheel_event() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    h.enter_pointer(MAIN, Point::new(5., 5.));
    h.events();

    h.send(PointerNotification::AxisDiscrete {
        axis: Axis::Vertical,
        discrete: 1,
    });
    h.pointer(PointerNotification::Axis {
        time: 10,
        axis: Axis::Vertical,
        value: 10.,
    });
    let directions: Vec<_> = h
        .events()
        .into_iter()
        .filter_map(|event| match event.kind {
            EventKind::Scroll(scroll) => Some(scroll.direction),
            _ => None,
        })
        .collect();
    assert_eq!(
        directions,
        vec![ScrollDirection::Down, ScrollDirection::Smooth]
    );
}

#[test_log::test]
fn old_seats_deliver_every_pointer_event_at_once() {
    let mut h = Harness::with_config(SeatCapabilities::POINTER, SeatConfig::with_version(4));
    h.send(PointerNotification::Enter {
        serial: 1,
        window: MAIN,
        pos: Point::new(1., 1.),
    });
    for x in [2., 3.] {
        h.send(PointerNotification::Motion {
            time: 10,
            pos: Point::new(x, 1.),
        });
    }
    h.send(PointerNotification::Button {
        serial: 2,
        time: 11,
        button: BTN_LEFT,
        pressed: true,
    });
    h.send(PointerNotification::Axis {
        time: 12,
        axis: Axis::Vertical,
        value: 30.,
    });
    let events = h.events();
    let types: Vec<_> = events.iter().map(InputEvent::event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::Enter,
            EventType::Motion,
            EventType::Motion,
            EventType::ButtonPress,
            EventType::Scroll,
        ]
    );
    match &events[4].kind {
        EventKind::Scroll(scroll) => assert_eq!(scroll.delta, Vec2::new(0., 3.)),
        other => panic!("expected a scroll, got {:?}", other),
    }
}

#[test_log::test]
fn framed_seats_batch_until_the_frame() {
    let mut h = Harness::with_config(SeatCapabilities::POINTER, SeatConfig::with_version(5));
    h.send(PointerNotification::Enter {
        serial: 1,
        window: MAIN,
        pos: Point::new(1., 1.),
    });
    assert!(h.events().is_empty());
    for x in [2., 3.] {
        h.send(PointerNotification::Motion {
            time: 10,
            pos: Point::new(x, 1.),
        });
    }
    // The motion pushed out the staged enter, and waits itself.
    assert_eq!(h.types(), vec![EventType::Enter]);
    h.send(PointerNotification::Frame);
    let events = h.events();
    assert_eq!(events.len(), 1);
    match &events[0].kind {
        EventKind::Motion(motion) => assert_eq!(motion.pos, Point::new(3., 1.)),
        other => panic!("expected a motion, got {:?}", other),
    }
}

#[test_log::test]
fn disabled_protocols_are_ignored() {
    let config = SeatConfig {
        gestures: false,
        tablets: false,
        ..SeatConfig::default()
    };
    let mut h = Harness::with_config(SeatCapabilities::POINTER, config);
    h.enter_pointer(MAIN, Point::new(1., 1.));
    h.events();
    h.send(Notification::Swipe(GestureNotification::Begin {
        serial: 3,
        time: 3,
        window: MAIN,
        fingers: 3,
    }));
    h.send(Notification::TabletSeat(TabletSeatNotification::TabletAdded(
        TabletId(10),
    )));
    assert!(h.events().is_empty());
    assert!(h.seat().tablets().is_empty());
    assert!(!h.seat().gesture(GestureKind::Swipe).active);
}

#[test_log::test]
fn scroll_without_focus_is_dropped() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    h.pointer(PointerNotification::Axis {
        time: 10,
        axis: Axis::Vertical,
        value: 30.,
    });
    assert!(h.events().is_empty());
}

#[test_log::test]
fn only_the_first_contact_emulates_the_pointer() {
    let mut h = Harness::new(SeatCapabilities::TOUCH);
    h.send(TouchNotification::Down {
        serial: 3,
        time: 1,
        window: MAIN,
        id: TouchId(0),
        pos: Point::new(1., 1.),
    });
    h.send(TouchNotification::Frame);
    assert_eq!(h.types(), vec![EventType::Enter, EventType::TouchBegin]);

    h.send(TouchNotification::Down {
        serial: 4,
        time: 2,
        window: MAIN,
        id: TouchId(1),
        pos: Point::new(2., 2.),
    });
    let events = h.events();
    assert_eq!(events.len(), 1);
    match &events[0].kind {
        EventKind::TouchBegin(touch) => assert!(!touch.emulating_pointer),
        other => panic!("expected a touch begin, got {:?}", other),
    }

    let seat = h.seat();
    assert!(seat.touches().get(TouchId(0)).unwrap().initial);
    assert!(!seat.touches().get(TouchId(1)).unwrap().initial);
    assert_eq!(seat.touch_pointer().focus(), Some(MAIN));
}

#[test_log::test]
fn cancelling_twice_only_cancels_once() {
    let mut h = Harness::new(SeatCapabilities::TOUCH);
    for id in 0..2 {
        h.send(TouchNotification::Down {
            serial: 10 + id as u32,
            time: 1,
            window: MAIN,
            id: TouchId(id),
            pos: Point::new(1., 1.),
        });
    }
    h.events();

    h.seat().cancel_touches();
    let types = h.types();
    assert_eq!(
        types,
        vec![
            EventType::Leave,
            EventType::TouchCancel,
            EventType::TouchCancel
        ]
    );

    h.seat().cancel_touches();
    assert!(h.events().is_empty());
    assert!(h.seat().touches().is_empty());
    assert_eq!(h.seat().touch_pointer().focus(), None);
}

#[test_log::test]
fn touch_on_an_unknown_window_is_ignored() {
    let mut h = Harness::new(SeatCapabilities::TOUCH);
    h.send(TouchNotification::Down {
        serial: 3,
        time: 1,
        window: WindowId(99),
        id: TouchId(0),
        pos: Point::ZERO,
    });
    h.send(TouchNotification::Up {
        serial: 4,
        time: 2,
        id: TouchId(7),
    });
    assert!(h.events().is_empty());
    assert!(h.seat().touches().is_empty());
}

#[test_log::test]
fn unsetting_a_touch_grab_cancels_one_sequence() {
    let mut h = Harness::new(SeatCapabilities::TOUCH);
    for id in 0..2 {
        h.send(TouchNotification::Down {
            serial: 10 + id as u32,
            time: 1,
            window: MAIN,
            id: TouchId(id),
            pos: Point::ZERO,
        });
    }
    h.events();

    h.seat().unset_touch_grab(TouchId(1)).unwrap();
    assert_eq!(h.types(), vec![EventType::TouchCancel]);
    assert_eq!(h.seat().touches().len(), 1);
    assert!(h.seat().unset_touch_grab(TouchId(1)).is_err());
}

#[test_log::test]
fn later_grabs_win_and_stale_grabs_fail() {
    let mut h = Harness::new(SeatCapabilities::POINTER | SeatCapabilities::KEYBOARD);
    h.enter_pointer(MAIN, Point::new(5., 5.));
    h.focus_keyboard(MAIN);
    h.events();

    let caps = SeatCapabilities::POINTER | SeatCapabilities::KEYBOARD;
    let status = h.seat().grab(GrabRequest::new(OTHER, caps).time(100));
    assert_eq!(status, GrabStatus::Success);
    let events = h.events();
    let crossings: Vec<_> = events
        .iter()
        .map(|event| (event.event_type(), event.window))
        .collect();
    assert_eq!(
        crossings,
        vec![
            (EventType::Leave, MAIN),
            (EventType::Enter, OTHER),
            (EventType::FocusChange, MAIN),
            (EventType::FocusChange, OTHER),
        ]
    );
    match &events[1].kind {
        EventKind::Enter(crossing) => assert_eq!(crossing.mode, CrossingMode::Grab),
        other => panic!("expected an enter, got {:?}", other),
    }

    let status = h.seat().grab(GrabRequest::new(MAIN, caps).time(50));
    assert_eq!(status, GrabStatus::AlreadyGrabbed);
    assert!(h.events().is_empty());
    assert_eq!(h.seat().grab_window(), Some(OTHER));
    assert_eq!(h.seat().current_grab().map(|grab| grab.time), Some(100));

    let status = h.seat().grab(GrabRequest::new(MAIN, caps).time(200));
    assert_eq!(status, GrabStatus::Success);
    assert_eq!(h.seat().grab_window(), Some(MAIN));
    h.events();

    let master = h.seat().master_pointer();
    let ctx = h.seats.context().clone();
    assert_eq!(ctx.grabs().records(master).len(), 2);
    assert_eq!(ctx.grabs().active(master).map(|record| record.window), Some(MAIN));

    h.seat().ungrab();
    assert_eq!(h.seat().grab_window(), None);
    assert!(ctx.grabs().active(master).is_none());
}

#[test_log::test]
fn hidden_windows_cannot_be_grabbed() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    h.windows.set_visible(OTHER, false);
    let status = h
        .seat()
        .grab(GrabRequest::new(OTHER, SeatCapabilities::POINTER));
    assert_eq!(status, GrabStatus::NotViewable);

    h.windows.insert_offscreen(WindowId(3), None);
    let status = h
        .seat()
        .grab(GrabRequest::new(WindowId(3), SeatCapabilities::POINTER));
    assert_eq!(status, GrabStatus::NotViewable);
    assert_eq!(h.seat().grab_window(), None);
    assert!(h.events().is_empty());
}

#[test_log::test]
fn offscreen_windows_grab_through_their_embedder() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    h.windows.insert_offscreen(WindowId(3), Some(MAIN));
    let status = h
        .seat()
        .grab(GrabRequest::new(WindowId(3), SeatCapabilities::POINTER).time(5));
    assert_eq!(status, GrabStatus::Success);
    let master = h.seat().master_pointer();
    let ctx = h.seats.context().clone();
    let record = *ctx.grabs().active(master).unwrap();
    assert_eq!(record.window, WindowId(3));
    assert_eq!(record.native, MAIN);
}

#[test_log::test]
fn destroyed_grab_windows_fail_closed() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    let status = h
        .seat()
        .grab(GrabRequest::new(OTHER, SeatCapabilities::POINTER).time(5));
    assert_eq!(status, GrabStatus::Success);
    h.windows.destroy(OTHER);
    assert_eq!(h.seat().current_grab(), None);
}

#[test_log::test]
fn held_keys_repeat_until_released() {
    let mut h = Harness::new(SeatCapabilities::KEYBOARD);
    h.focus_keyboard(MAIN);
    h.events();

    h.send(KeyboardNotification::Key {
        serial: 3,
        time: 10,
        key: KEY_A,
        pressed: true,
    });
    assert_eq!(h.types(), vec![EventType::KeyPress]);
    let pending = h.scheduler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].delay, Duration::from_millis(400));

    let timer = h.scheduler.take_pending().unwrap();
    assert!(h.seats.fire_key_repeat(timer.seat, timer.device));
    let events = h.events();
    assert_eq!(events.len(), 1);
    match &events[0].kind {
        EventKind::KeyPress(key) => assert!(key.repeat),
        other => panic!("expected a key press, got {:?}", other),
    }
    let pending = h.scheduler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].delay, Duration::from_millis(80));

    h.send(KeyboardNotification::Key {
        serial: 4,
        time: 20,
        key: KEY_A,
        pressed: false,
    });
    assert_eq!(h.types(), vec![EventType::KeyRelease]);
    assert!(h.scheduler.pending().is_empty());
    assert!(h.scheduler.cancelled().contains(&pending[0].token));

    // A timer that raced the release does nothing.
    assert!(!h.seats.fire_key_repeat(SEAT, pending[0].device));
    assert!(h.events().is_empty());
}

#[test_log::test]
fn compositor_repeat_info_overrides_preferences() {
    let mut h = Harness::new(SeatCapabilities::KEYBOARD);
    h.send(KeyboardNotification::RepeatInfo {
        rate: 25,
        delay: 600,
    });
    h.focus_keyboard(MAIN);
    h.send(KeyboardNotification::Key {
        serial: 3,
        time: 10,
        key: KEY_A,
        pressed: true,
    });
    assert_eq!(
        h.scheduler.pending()[0].delay,
        Duration::from_millis(600)
    );

    h.send(KeyboardNotification::RepeatInfo { rate: 0, delay: 0 });
    assert!(h.scheduler.pending().is_empty());
}

#[test_log::test]
fn modifiers_do_not_repeat() {
    let mut h = Harness::new(SeatCapabilities::KEYBOARD);
    h.focus_keyboard(MAIN);
    // KEY_LEFTSHIFT
    h.send(KeyboardNotification::Key {
        serial: 3,
        time: 10,
        key: 42,
        pressed: true,
    });
    match &h.events()[..] {
        [InputEvent {
            kind: EventKind::KeyPress(key),
            ..
        }, ..] => assert!(key.is_modifier),
        other => panic!("expected a key press, got {:?}", other),
    }
    assert!(h.scheduler.pending().is_empty());
}

#[cfg(feature = "xkb")]
const AZERTY: &[u8] = b"xkb_keymap {
    xkb_keycodes \"t\" { minimum = 8; maximum = 255; <AD01> = 24; };
    xkb_types \"t\" {
        type \"ONE_LEVEL\" { modifiers = none; level_name[Level1] = \"Any\"; };
    };
    xkb_compatibility \"t\" { };
    xkb_symbols \"t\" { key <AD01> { type = \"ONE_LEVEL\", [ a ] }; };
};\0";

#[cfg(feature = "xkb")]
#[test_log::test]
fn uploaded_layouts_pick_the_characters() {
    use glazier_input::keyboard_types::{Code, Key};
    use glazier_input::protocol::KeymapFormat;

    let mut h = Harness::new(SeatCapabilities::KEYBOARD);
    h.send(KeyboardNotification::Keymap {
        format: KeymapFormat::XkbV1,
        data: AZERTY.to_vec(),
    });
    h.focus_keyboard(MAIN);
    h.events();
    // KEY_Q
    h.send(KeyboardNotification::Key {
        serial: 3,
        time: 10,
        key: 16,
        pressed: true,
    });
    match &h.events()[..] {
        [InputEvent {
            kind: EventKind::KeyPress(key),
            ..
        }] => {
            assert_eq!(key.key, Key::Character("a".into()));
            assert_eq!(key.code, Code::KeyQ);
        }
        other => panic!("expected a key press, got {:?}", other),
    }
}

#[test_log::test]
fn losing_a_capability_releases_its_focus() {
    let mut h = Harness::new(SeatCapabilities::all());
    h.enter_pointer(MAIN, Point::new(5., 5.));
    h.focus_keyboard(MAIN);
    h.send(KeyboardNotification::Key {
        serial: 3,
        time: 10,
        key: KEY_A,
        pressed: true,
    });
    h.send(TouchNotification::Down {
        serial: 4,
        time: 11,
        window: OTHER,
        id: TouchId(0),
        pos: Point::ZERO,
    });
    h.events();

    h.seat().set_capabilities(SeatCapabilities::empty());
    let types = h.types();
    assert!(types.contains(&EventType::Leave));
    assert!(types.contains(&EventType::FocusChange));
    assert!(types.contains(&EventType::TouchCancel));
    assert!(h.scheduler.pending().is_empty());

    let seat = h.seat();
    assert_eq!(seat.pointer().focus(), None);
    assert_eq!(seat.keyboard().focus(), None);
    assert!(seat.touches().is_empty());
    assert!(seat.slaves(SeatCapabilities::all()).is_empty());
}

#[test_log::test]
fn clipboard_changes_wait_for_keyboard_focus() {
    use glazier_input::protocol::DataDeviceNotification;

    let mut h = Harness::new(SeatCapabilities::KEYBOARD);
    h.send(DataDeviceNotification::Selection { offered: true });
    assert!(h.events().is_empty());

    h.focus_keyboard(MAIN);
    let events = h.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type(), EventType::FocusChange);
    match &events[1].kind {
        EventKind::OwnerChange(change) => assert_eq!(change.selection, CLIPBOARD),
        other => panic!("expected an owner change, got {:?}", other),
    }

    h.send(DataDeviceNotification::Selection { offered: false });
    assert_eq!(h.types(), vec![EventType::OwnerChange]);
}

#[test_log::test]
fn pointer_queries_report_root_coordinates() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    h.enter_pointer(MAIN, Point::new(10., 20.));
    let master = h.seat().master_pointer();
    let state = h.seat().query_state(master).unwrap();
    assert_eq!(state.window, Some(MAIN));
    assert_eq!(state.pos, Point::new(10., 20.));
    assert_eq!(state.root, Point::new(110., 70.));

    h.pointer(PointerNotification::Button {
        serial: 7,
        time: 3,
        button: BTN_LEFT,
        pressed: true,
    });
    let state = h.seat().query_state(master).unwrap();
    assert!(state.state.buttons.contains(1));
    assert_eq!(h.seat().implicit_grab_serial(master, None), Some(7));
}

#[test_log::test]
fn touch_downs_are_implicit_grab_serials() {
    let mut h = Harness::new(SeatCapabilities::POINTER | SeatCapabilities::TOUCH);
    h.enter_pointer(MAIN, Point::ZERO);
    h.pointer(PointerNotification::Button {
        serial: 7,
        time: 3,
        button: BTN_LEFT,
        pressed: true,
    });
    h.send(TouchNotification::Down {
        serial: 9,
        time: 4,
        window: MAIN,
        id: TouchId(0),
        pos: Point::ZERO,
    });
    let master = h.seat().master_pointer();
    assert_eq!(
        h.seat().last_implicit_grab_serial(master),
        (9, Some(TouchId(0)))
    );
    assert_eq!(
        h.seat().implicit_grab_serial(master, Some(TouchId(0))),
        Some(9)
    );
}

#[test_log::test]
fn swipes_follow_the_pointer_focus() {
    let mut h = Harness::new(SeatCapabilities::POINTER);
    // Without focus nothing is emitted.
    h.send(Notification::Swipe(GestureNotification::Begin {
        serial: 1,
        time: 1,
        window: MAIN,
        fingers: 3,
    }));
    assert!(h.events().is_empty());
    h.send(Notification::Swipe(GestureNotification::End {
        serial: 2,
        time: 2,
        cancelled: true,
    }));

    h.enter_pointer(MAIN, Point::new(1., 1.));
    h.events();
    h.send(Notification::Pinch(GestureNotification::Begin {
        serial: 3,
        time: 3,
        window: MAIN,
        fingers: 2,
    }));
    h.send(Notification::Pinch(GestureNotification::Update {
        time: 4,
        delta: Vec2::new(1., 0.),
        scale: 1.5,
        rotation: 90.,
    }));
    h.send(Notification::Pinch(GestureNotification::End {
        serial: 4,
        time: 5,
        cancelled: false,
    }));
    let events = h.events();
    assert_eq!(events.len(), 3);
    match &events[1].kind {
        EventKind::TouchpadPinch(pinch) => {
            assert_eq!(pinch.n_fingers, 2);
            assert_eq!(pinch.scale, 1.5);
            assert!((pinch.angle_delta - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        }
        other => panic!("expected a pinch, got {:?}", other),
    }
    assert!(events.iter().all(|event| event.window == MAIN));
}

#[test_log::test]
fn tablet_tools_cross_in_and_out_with_proximity() {
    let mut h = Harness::new(SeatCapabilities::empty());
    let tablet = TabletId(10);
    let tool = ToolId(20);
    h.send(Notification::TabletSeat(TabletSeatNotification::TabletAdded(
        tablet,
    )));
    for event in [
        TabletNotification::Name("Wacom Intuos".into()),
        TabletNotification::Id {
            vid: 0x56a,
            pid: 0x357,
        },
        TabletNotification::Done,
    ] {
        h.send(Notification::Tablet { tablet, event });
    }
    h.send(Notification::TabletSeat(TabletSeatNotification::ToolAdded(
        tool,
    )));
    for event in [
        ToolNotification::Type(ToolType::Pen),
        ToolNotification::Capability(ToolCapabilities::PRESSURE),
        ToolNotification::Done,
        ToolNotification::ProximityIn {
            serial: 5,
            tablet,
            window: MAIN,
        },
        ToolNotification::Frame { time: 100 },
    ] {
        h.send(Notification::Tool { tool, event });
    }
    assert_eq!(h.types(), vec![EventType::ProximityIn, EventType::Enter]);

    let devices = h.seat().tablet(tablet).unwrap().devices().unwrap();
    {
        let ctx = h.seats.context().clone();
        let manager = ctx.devices();
        assert_eq!(manager.get(devices.stylus).unwrap().name, "Wacom Intuos");
        assert_eq!(
            manager.get(devices.eraser).unwrap().name,
            "Wacom Intuos (Eraser)"
        );
        assert_eq!(manager.associated(devices.stylus), Some(devices.master));
    }

    for event in [
        ToolNotification::Motion(Point::new(3., 4.)),
        ToolNotification::Pressure(0.5),
        ToolNotification::Frame { time: 110 },
    ] {
        h.send(Notification::Tool { tool, event });
    }
    let events = h.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source_device, devices.stylus);
    match &events[0].kind {
        EventKind::Motion(motion) => {
            assert_eq!(motion.pos, Point::new(3., 4.));
            assert_eq!(motion.axes.and_then(|axes| axes.pressure), Some(0.5));
        }
        other => panic!("expected a motion, got {:?}", other),
    }

    for event in [
        ToolNotification::Down { serial: 6 },
        ToolNotification::Frame { time: 120 },
        ToolNotification::Up,
        ToolNotification::Frame { time: 130 },
    ] {
        h.send(Notification::Tool { tool, event });
    }
    let buttons: Vec<_> = h
        .events()
        .into_iter()
        .filter_map(|event| match event.kind {
            EventKind::ButtonPress(button) => Some((true, button.button)),
            EventKind::ButtonRelease(button) => Some((false, button.button)),
            _ => None,
        })
        .collect();
    assert_eq!(buttons, vec![(true, 1), (false, 1)]);

    for event in [
        ToolNotification::ProximityOut,
        ToolNotification::Frame { time: 140 },
    ] {
        h.send(Notification::Tool { tool, event });
    }
    assert_eq!(h.types(), vec![EventType::Leave, EventType::ProximityOut]);
    assert_eq!(h.seat().tablet(tablet).unwrap().current_tool(), None);

    h.send(Notification::Tablet {
        tablet,
        event: TabletNotification::Removed,
    });
    assert!(h.seat().tablet(tablet).is_none());
    assert!(h.seats.context().devices().get(devices.master).is_none());
}

#[test_log::test]
fn removing_a_seat_drops_everything() {
    let mut h = Harness::new(SeatCapabilities::all());
    h.focus_keyboard(MAIN);
    h.send(KeyboardNotification::Key {
        serial: 3,
        time: 10,
        key: KEY_A,
        pressed: true,
    });
    assert!(h.seats.remove_seat(SEAT));
    assert!(h.seats.context().devices().is_empty());
    assert!(h.scheduler.pending().is_empty());
    assert!(h.seats.dispatch(SEAT, Notification::Name("x".into())).is_err());
}
