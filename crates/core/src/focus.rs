#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Editor,
    History,
    Results,
    Detail,
    Raw,
}

impl Pane {
    pub const ALL: [Pane; 5] = [
        Pane::Editor,
        Pane::History,
        Pane::Results,
        Pane::Detail,
        Pane::Raw,
    ];

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Editor => Self::History,
            Self::History => Self::Results,
            Self::Results => Self::Detail,
            Self::Detail => Self::Raw,
            Self::Raw => Self::Editor,
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Editor => "Editor",
            Self::History => "History",
            Self::Results => "Results",
            Self::Detail => "Detail",
            Self::Raw => "Raw Output",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusRing {
    current: Pane,
}

impl FocusRing {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(self) -> Pane {
        self.current
    }

    #[must_use]
    pub fn is_focused(self, pane: Pane) -> bool {
        self.current == pane
    }

    pub fn advance(&mut self) -> Pane {
        self.current = self.current.next();
        self.current
    }

    pub fn focus(&mut self, pane: Pane) {
        self.current = pane;
    }
}
