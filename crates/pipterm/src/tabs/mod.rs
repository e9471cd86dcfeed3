//! Tab dispatch table.

mod placeholder;
mod radio;

use std::collections::HashMap;

use crate::action::TabId;
use crate::component::TabView;

use placeholder::PlaceholderTab;
use radio::RadioTab;

/// One view per `TabId`.  Exhaustive: adding a tab without a view fails to
/// compile here.
pub fn build_tabs() -> HashMap<TabId, Box<dyn TabView>> {
    TabId::ALL
        .into_iter()
        .map(|id| {
            let view: Box<dyn TabView> = match id {
                TabId::Radio => Box::new(RadioTab::new()),
                TabId::Stat | TabId::Inv | TabId::Data | TabId::Map => Box::new(PlaceholderTab::new(id)),
            };
            (id, view)
        })
        .collect()
}
