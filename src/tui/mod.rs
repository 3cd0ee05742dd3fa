//! The interactive dashboard: tab bar layout, frame assembly, the terminal
//! capability and the event loop that ties sessions to keys.

mod ansi;
pub mod content;
pub mod dashboard;
pub mod tabs;
pub mod terminal;

pub use content::ContentRenderer;
pub use dashboard::{action_for_key, Dashboard, DashboardAction, DashboardError, LoopControl};
pub use tabs::{layout_tabs, render_tab_bar, TabDescriptor, TabLayout};
pub use terminal::{CrosstermTerminal, DashboardTerminal};
