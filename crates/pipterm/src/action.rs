//! Action enum: all user-initiated intents.

/// The five Pip-Boy screens, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabId {
    Stat,
    Inv,
    Data,
    Map,
    Radio,
}

impl TabId {
    pub const ALL: [TabId; 5] = [TabId::Stat, TabId::Inv, TabId::Data, TabId::Map, TabId::Radio];

    pub fn label(self) -> &'static str {
        match self {
            TabId::Stat => "STAT",
            TabId::Inv => "INV",
            TabId::Data => "DATA",
            TabId::Map => "MAP",
            TabId::Radio => "RADIO",
        }
    }

    fn position(self) -> usize {
        match self {
            TabId::Stat => 0,
            TabId::Inv => 1,
            TabId::Data => 2,
            TabId::Map => 3,
            TabId::Radio => 4,
        }
    }

    /// Wraps around at the ends.
    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// `'1'..='5'` → tab in header order.
    pub fn from_digit(c: char) -> Option<Self> {
        let n = c.to_digit(10)? as usize;
        n.checked_sub(1).and_then(|i| Self::ALL.get(i)).copied()
    }
}

/// All actions that can flow through the system.
/// Tabs produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    SwitchTab(TabId),
    NextTab,
    PrevTab,
    SelectUp,
    SelectDown,

    // ── Radio ────────────────────────────────────────────────────────────────
    /// Tune to (or toggle) the station under the cursor.
    Select,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
