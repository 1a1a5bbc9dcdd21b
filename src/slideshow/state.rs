use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideshowState {
    #[default]
    Stopped,
    Running,
}

impl SlideshowState {
    /// Label the toggle control shows in this state.
    #[must_use]
    pub const fn toggle_label(self) -> ToggleLabel {
        match self {
            Self::Stopped => ToggleLabel::Start,
            Self::Running => ToggleLabel::Stop,
        }
    }

    /// Manual navigation is interactive only while stopped.
    #[must_use]
    pub const fn navigation_enabled(self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Command the toggle control issues in this state.
    #[must_use]
    pub const fn toggle_command(self) -> SlideshowCommand {
        match self {
            Self::Stopped => SlideshowCommand::Start,
            Self::Running => SlideshowCommand::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleLabel {
    Start,
    Stop,
}

impl ToggleLabel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
        }
    }
}

impl fmt::Display for ToggleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowCommand {
    Start,
    Stop,
}

/// Side effects a transition asks the screen and controller to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEffect {
    StartTimer,
    CancelTimer,
    SetNavigationEnabled(bool),
    SetToggleLabel(ToggleLabel),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SlideshowState,
    pub to: SlideshowState,
    pub effects: Vec<UiEffect>,
}

/// Pure transition function. `None` means the command is a no-op in `state`.
#[must_use]
pub fn transition(state: SlideshowState, cmd: SlideshowCommand) -> Option<Transition> {
    let to = match (state, cmd) {
        (SlideshowState::Stopped, SlideshowCommand::Start) => SlideshowState::Running,
        (SlideshowState::Running, SlideshowCommand::Stop) => SlideshowState::Stopped,
        _ => return None,
    };
    let timer = match to {
        SlideshowState::Running => UiEffect::StartTimer,
        SlideshowState::Stopped => UiEffect::CancelTimer,
    };
    Some(Transition {
        from: state,
        to,
        effects: vec![
            timer,
            UiEffect::SetNavigationEnabled(to.navigation_enabled()),
            UiEffect::SetToggleLabel(to.toggle_label()),
        ],
    })
}
