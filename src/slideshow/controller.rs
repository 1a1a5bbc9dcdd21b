//! The screen's controller: permission, cursor, timer and control state.
//!
//! Every method runs on the UI thread and returns the screen updates it
//! caused; the caller applies them to whatever surface it drives.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::state::{SlideshowCommand, SlideshowState, ToggleLabel, UiEffect, transition};
use super::timer::SlideshowTimer;
use crate::collection::{ImageCollection, close_collection, open_collection};
use crate::events::{Command, Dispatcher, ImageEntry, PermissionOutcome, Tick, UiEvent};
use crate::permission::{PermissionGate, PermissionState};
use crate::scan::MediaStore;

pub const PERMISSION_NOTICE: &str =
    "Read access to the photo library was not granted; commands are unavailable.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenUpdate {
    ShowImage(ImageEntry),
    NavigationEnabled(bool),
    ToggleLabel(ToggleLabel),
    /// One-shot user-visible message.
    Notice(String),
}

/// What the screen currently shows, as the controller last set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    pub image: Option<ImageEntry>,
    pub navigation_enabled: bool,
    pub toggle_label: ToggleLabel,
}

impl Default for ScreenView {
    fn default() -> Self {
        let state = SlideshowState::default();
        Self {
            image: None,
            navigation_enabled: state.navigation_enabled(),
            toggle_label: state.toggle_label(),
        }
    }
}

pub struct SlideshowController<S, P> {
    store: S,
    gate: P,
    dispatcher: Arc<dyn Dispatcher>,
    period: Duration,
    permission: PermissionState,
    request_pending: bool,
    collection: Option<ImageCollection>,
    state: SlideshowState,
    timer: Option<SlideshowTimer>,
    generation: u64,
    view: ScreenView,
}

impl<S: MediaStore, P: PermissionGate> SlideshowController<S, P> {
    pub fn new(store: S, gate: P, dispatcher: Arc<dyn Dispatcher>, period: Duration) -> Self {
        Self {
            store,
            gate,
            dispatcher,
            period,
            permission: PermissionState::Unknown,
            request_pending: false,
            collection: None,
            state: SlideshowState::Stopped,
            timer: None,
            generation: 0,
            view: ScreenView::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> SlideshowState {
        self.state
    }

    #[must_use]
    pub const fn permission(&self) -> PermissionState {
        self.permission
    }

    #[must_use]
    pub const fn view(&self) -> &ScreenView {
        &self.view
    }

    #[must_use]
    pub const fn collection(&self) -> Option<&ImageCollection> {
        self.collection.as_ref()
    }

    #[must_use]
    pub const fn is_timer_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Screen creation: initialize if access is already granted, otherwise
    /// ask for it once.
    pub fn on_create(&mut self) -> Vec<ScreenUpdate> {
        if self.gate.check() {
            self.permission = PermissionState::Granted;
            return self.initialize();
        }
        if !self.request_pending && self.permission != PermissionState::Denied {
            self.request_pending = true;
            self.gate.request(Arc::clone(&self.dispatcher));
        }
        Vec::new()
    }

    pub fn on_permission_result(&mut self, outcome: PermissionOutcome) -> Vec<ScreenUpdate> {
        self.request_pending = false;
        self.permission = outcome.into();
        info!(?outcome, "permission result");
        match outcome {
            PermissionOutcome::Granted => self.initialize(),
            PermissionOutcome::Denied => Vec::new(),
        }
    }

    pub fn on_ui_event(&mut self, event: UiEvent) -> Vec<ScreenUpdate> {
        match event {
            UiEvent::Tick(tick) => self.on_tick(tick),
            UiEvent::Permission(outcome) => self.on_permission_result(outcome),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn on_command(&mut self, cmd: Command) -> Vec<ScreenUpdate> {
        if !self.ensure_access() {
            warn!(?cmd, "command rejected; permission not granted");
            return vec![ScreenUpdate::Notice(PERMISSION_NOTICE.to_string())];
        }
        match cmd {
            Command::Next | Command::Previous if !self.state.navigation_enabled() => {
                debug!("navigation disabled while running");
                Vec::new()
            }
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::Toggle => self.apply(self.state.toggle_command()),
        }
    }

    pub fn start(&mut self) -> Vec<ScreenUpdate> {
        self.apply(SlideshowCommand::Start)
    }

    pub fn stop(&mut self) -> Vec<ScreenUpdate> {
        self.apply(SlideshowCommand::Stop)
    }

    /// Advance on a timer tick. Ticks from a cancelled timer are dropped.
    pub fn on_tick(&mut self, tick: Tick) -> Vec<ScreenUpdate> {
        let current = self.timer.as_ref().map(SlideshowTimer::generation);
        if self.state != SlideshowState::Running || current != Some(tick.generation) {
            debug!(?tick, ?current, "stale tick ignored");
            return Vec::new();
        }
        self.next()
    }

    /// Screen went inactive: stop the timer, then release the handle.
    pub fn deactivate(&mut self) -> Vec<ScreenUpdate> {
        let updates = self.stop();
        close_collection(&mut self.collection);
        updates
    }

    /// Move forward, wrapping to the first entry past the end.
    pub fn next(&mut self) -> Vec<ScreenUpdate> {
        let Some(c) = self.collection.as_mut() else {
            return Vec::new();
        };
        if c.move_to_next() || c.move_to_first() {
            self.render()
        } else {
            Vec::new()
        }
    }

    /// Move back, wrapping to the last entry before the start.
    pub fn previous(&mut self) -> Vec<ScreenUpdate> {
        let Some(c) = self.collection.as_mut() else {
            return Vec::new();
        };
        if c.move_to_previous() || c.move_to_last() {
            self.render()
        } else {
            Vec::new()
        }
    }

    fn render(&mut self) -> Vec<ScreenUpdate> {
        let Some(entry) = self.collection.as_ref().and_then(ImageCollection::current) else {
            return Vec::new();
        };
        debug!(id = entry.id, uri = %entry.display_uri(), "render");
        self.view.image = Some(entry.clone());
        vec![ScreenUpdate::ShowImage(entry.clone())]
    }

    fn initialize(&mut self) -> Vec<ScreenUpdate> {
        if self.collection.is_none() {
            self.collection = open_collection(&self.store);
        }
        let Some(c) = self.collection.as_mut() else {
            return Vec::new();
        };
        if c.move_to_first() {
            info!(count = c.len(), "collection ready");
            self.render()
        } else {
            info!("collection is empty");
            Vec::new()
        }
    }

    /// Re-check access before a command. Access granted outside the app is
    /// picked up here, re-opening the handle if it was released.
    fn ensure_access(&mut self) -> bool {
        if !self.gate.check() {
            if self.permission == PermissionState::Granted {
                self.permission = PermissionState::Denied;
            }
            return false;
        }
        self.permission = PermissionState::Granted;
        if self.collection.is_none() {
            self.collection = open_collection(&self.store);
        }
        true
    }

    fn apply(&mut self, cmd: SlideshowCommand) -> Vec<ScreenUpdate> {
        let Some(t) = transition(self.state, cmd) else {
            debug!(?cmd, state = ?self.state, "slideshow command is a no-op");
            return Vec::new();
        };
        let mut updates = Vec::new();
        for effect in t.effects {
            match effect {
                UiEffect::StartTimer => {
                    let generation = self.generation + 1;
                    match SlideshowTimer::start(self.period, generation, Arc::clone(&self.dispatcher)) {
                        Ok(timer) => {
                            self.generation = generation;
                            self.timer = Some(timer);
                        }
                        Err(err) => {
                            warn!(error = %err, "failed to start slideshow timer");
                            updates.push(ScreenUpdate::Notice(format!(
                                "Slideshow could not start: {err}"
                            )));
                            return updates;
                        }
                    }
                }
                UiEffect::CancelTimer => {
                    if let Some(mut timer) = self.timer.take() {
                        timer.cancel();
                    }
                }
                UiEffect::SetNavigationEnabled(enabled) => {
                    self.view.navigation_enabled = enabled;
                    updates.push(ScreenUpdate::NavigationEnabled(enabled));
                }
                UiEffect::SetToggleLabel(label) => {
                    self.view.toggle_label = label;
                    updates.push(ScreenUpdate::ToggleLabel(label));
                }
            }
        }
        info!(from = ?t.from, to = ?t.to, "slideshow state changed");
        self.state = t.to;
        updates
    }
}
