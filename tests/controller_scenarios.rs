use std::cell::Cell;
use std::fs;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use auto_slideshow::error::Error;
use auto_slideshow::events::{Command, Dispatcher, ImageEntry, PermissionOutcome, Tick, UiEvent};
use auto_slideshow::permission::{DirectoryAccess, PermissionGate, PermissionState};
use auto_slideshow::scan::{DirectoryStore, MediaStore, ScanOptions};
use auto_slideshow::slideshow::{
    PERMISSION_NOTICE, ScreenUpdate, SlideshowController, SlideshowState, ToggleLabel,
};
use crossbeam_channel::{Receiver, unbounded};

struct Library(Vec<&'static str>);

impl MediaStore for Library {
    fn query(&self) -> Result<Vec<ImageEntry>, Error> {
        Ok(self
            .0
            .iter()
            .zip(0u64..)
            .map(|(p, id)| ImageEntry::new(id, *p))
            .collect())
    }
}

struct Unreachable;

impl MediaStore for Unreachable {
    fn query(&self) -> Result<Vec<ImageEntry>, Error> {
        Err(Error::BadDir("/nowhere".into()))
    }
}

#[derive(Clone)]
struct SwitchGate(Rc<Cell<bool>>);

impl PermissionGate for SwitchGate {
    fn check(&self) -> bool {
        self.0.get()
    }

    fn request(&self, dispatcher: Arc<dyn Dispatcher>) {
        let outcome = if self.0.get() {
            PermissionOutcome::Granted
        } else {
            PermissionOutcome::Denied
        };
        dispatcher.post(UiEvent::Permission(outcome));
    }
}

fn granted() -> SwitchGate {
    SwitchGate(Rc::new(Cell::new(true)))
}

fn controller<S: MediaStore>(
    store: S,
    gate: SwitchGate,
    period: Duration,
) -> (SlideshowController<S, SwitchGate>, Receiver<UiEvent>) {
    let (tx, rx) = unbounded();
    (SlideshowController::new(store, gate, Arc::new(tx), period), rx)
}

fn abc() -> Library {
    Library(vec!["A.jpg", "B.jpg", "C.jpg"])
}

fn shown<S: MediaStore>(c: &SlideshowController<S, SwitchGate>) -> Option<String> {
    c.view().image.as_ref().map(ImageEntry::file_name)
}

const SLOW: Duration = Duration::from_secs(3600);

#[test]
fn next_then_wrap_then_previous_wraps_back() {
    let (mut c, _rx) = controller(abc(), granted(), SLOW);
    c.on_create();
    assert_eq!(shown(&c).as_deref(), Some("A.jpg"));

    c.on_command(Command::Next);
    assert_eq!(shown(&c).as_deref(), Some("B.jpg"));
    c.on_command(Command::Next);
    assert_eq!(shown(&c).as_deref(), Some("C.jpg"));
    c.on_command(Command::Next);
    assert_eq!(shown(&c).as_deref(), Some("A.jpg"));
    c.on_command(Command::Previous);
    assert_eq!(shown(&c).as_deref(), Some("C.jpg"));
}

#[test]
fn n_nexts_return_to_first() {
    let names = vec!["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"];
    let n = names.len();
    let (mut c, _rx) = controller(Library(names), granted(), SLOW);
    c.on_create();
    for _ in 0..n {
        c.next();
    }
    assert_eq!(shown(&c).as_deref(), Some("1.jpg"));
    assert_eq!(c.collection().and_then(|c| c.position()), Some(0));
}

#[test]
fn previous_from_first_lands_on_last_and_next_from_last_on_first() {
    let (mut c, _rx) = controller(abc(), granted(), SLOW);
    c.on_create();
    c.previous();
    assert_eq!(shown(&c).as_deref(), Some("C.jpg"));
    c.next();
    assert_eq!(shown(&c).as_deref(), Some("A.jpg"));
}

#[test]
fn single_image_wraps_onto_itself() {
    let (mut c, _rx) = controller(Library(vec!["only.jpg"]), granted(), SLOW);
    c.on_create();
    assert_eq!(c.next(), vec![ScreenUpdate::ShowImage(ImageEntry::new(0, "only.jpg"))]);
    assert_eq!(shown(&c).as_deref(), Some("only.jpg"));
}

#[test]
fn empty_collection_navigation_is_a_noop() {
    let (mut c, _rx) = controller(Library(Vec::new()), granted(), SLOW);
    assert!(c.on_create().is_empty());
    assert!(c.on_command(Command::Next).is_empty());
    assert!(c.on_command(Command::Previous).is_empty());
    assert!(c.view().image.is_none());
}

#[test]
fn inaccessible_store_navigation_is_a_noop() {
    let (mut c, _rx) = controller(Unreachable, granted(), SLOW);
    assert!(c.on_create().is_empty());
    assert!(c.collection().is_none());
    assert!(c.on_command(Command::Next).is_empty());
    assert!(c.on_command(Command::Previous).is_empty());
    // Toggling still works; ticks simply have nothing to show.
    c.on_command(Command::Toggle);
    assert_eq!(c.state(), SlideshowState::Running);
    c.stop();
}

#[test]
fn start_disables_navigation_and_relabels() {
    let (mut c, _rx) = controller(abc(), granted(), SLOW);
    c.on_create();
    let updates = c.on_command(Command::Toggle);
    assert_eq!(
        updates,
        vec![
            ScreenUpdate::NavigationEnabled(false),
            ScreenUpdate::ToggleLabel(ToggleLabel::Stop),
        ]
    );
    assert_eq!(c.state(), SlideshowState::Running);
    assert!(!c.view().navigation_enabled);
    assert_eq!(c.view().toggle_label, ToggleLabel::Stop);

    // Second start is a no-op.
    assert!(c.start().is_empty());
    assert_eq!(c.state(), SlideshowState::Running);

    // Manual navigation is locked while running.
    assert!(c.on_command(Command::Next).is_empty());
    assert_eq!(shown(&c).as_deref(), Some("A.jpg"));
    c.stop();
}

#[test]
fn stop_reenables_navigation_and_is_idempotent() {
    let (mut c, _rx) = controller(abc(), granted(), SLOW);
    c.on_create();
    assert!(c.stop().is_empty());

    c.start();
    let updates = c.on_command(Command::Toggle);
    assert_eq!(
        updates,
        vec![
            ScreenUpdate::NavigationEnabled(true),
            ScreenUpdate::ToggleLabel(ToggleLabel::Start),
        ]
    );
    assert_eq!(c.state(), SlideshowState::Stopped);
    assert!(!c.is_timer_active());
    assert!(c.stop().is_empty());
}

#[test]
fn permission_denied_rejects_every_command_without_state_change() {
    let gate = SwitchGate(Rc::new(Cell::new(false)));
    let (mut c, rx) = controller(abc(), gate, SLOW);
    c.on_create();
    let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    c.on_ui_event(result);
    assert_eq!(c.permission(), PermissionState::Denied);

    for cmd in [Command::Next, Command::Previous, Command::Toggle] {
        let updates = c.on_command(cmd);
        assert_eq!(updates, vec![ScreenUpdate::Notice(PERMISSION_NOTICE.to_string())]);
    }
    assert_eq!(c.state(), SlideshowState::Stopped);
    assert!(c.view().image.is_none());
    assert!(c.view().navigation_enabled);
    assert!(c.collection().is_none());
}

#[test]
fn access_granted_later_is_picked_up_on_command() {
    let gate = SwitchGate(Rc::new(Cell::new(false)));
    let (mut c, rx) = controller(abc(), gate.clone(), SLOW);
    c.on_create();
    c.on_ui_event(rx.recv_timeout(Duration::from_secs(1)).unwrap());

    gate.0.set(true);
    c.on_command(Command::Next);
    assert_eq!(c.permission(), PermissionState::Granted);
    assert_eq!(shown(&c).as_deref(), Some("A.jpg"));
}

#[test]
fn two_ticks_advance_two_images() {
    let (mut c, _rx) = controller(abc(), granted(), SLOW);
    c.on_create();
    c.start();
    // The real timer is an hour out; feed ticks for the live generation.
    for seq in 1..=2 {
        c.on_tick(Tick { generation: 1, seq });
    }
    assert_eq!(shown(&c).as_deref(), Some("C.jpg"));
    c.stop();
    assert!(c.view().navigation_enabled);
    assert_eq!(c.view().toggle_label, ToggleLabel::Start);
}

#[test]
fn real_timer_ticks_are_marshalled_through_the_dispatcher() {
    let (mut c, rx) = controller(abc(), granted(), Duration::from_millis(20));
    c.on_create();
    c.on_command(Command::Toggle);

    for _ in 0..2 {
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(ev, UiEvent::Tick(_)));
        c.on_ui_event(ev);
    }
    assert_eq!(shown(&c).as_deref(), Some("C.jpg"));

    c.on_command(Command::Toggle);
    assert!(c.view().navigation_enabled);

    // Anything still queued belongs to the cancelled timer and is ignored.
    while let Ok(ev) = rx.try_recv() {
        assert!(c.on_ui_event(ev).is_empty());
    }
    assert_eq!(shown(&c).as_deref(), Some("C.jpg"));
}

#[test]
fn directory_backed_controller_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        fs::write(tmp.path().join(name), b"x").unwrap();
    }
    let (tx, rx) = unbounded::<UiEvent>();
    let mut c = SlideshowController::new(
        DirectoryStore::new(tmp.path(), ScanOptions::default()),
        DirectoryAccess::new(tmp.path()),
        Arc::new(tx),
        Duration::from_millis(20),
    );
    c.on_create();
    assert_eq!(
        c.view().image.as_ref().map(ImageEntry::file_name).as_deref(),
        Some("a.jpg")
    );

    c.on_command(Command::Previous);
    assert_eq!(
        c.view().image.as_ref().map(ImageEntry::file_name).as_deref(),
        Some("c.jpg")
    );

    c.on_command(Command::Toggle);
    let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    c.on_ui_event(ev);
    assert_eq!(
        c.view().image.as_ref().map(ImageEntry::file_name).as_deref(),
        Some("a.jpg")
    );

    c.deactivate();
    assert!(c.collection().is_none());
    assert!(!c.is_timer_active());
}
