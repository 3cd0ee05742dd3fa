//! Plain line-oriented output used outside the dashboard: `--list`, the exit
//! summary and error reports.

pub mod palette;
pub mod plain_renderer;
pub mod renderer;
pub mod table;
pub mod widgets;

pub use palette::OutputMode;
pub use plain_renderer::PlainRenderer;
pub use renderer::{Renderer, UiError, UiResult};
pub use widgets::{KeyValue, MessageBlock, TableSpec};
