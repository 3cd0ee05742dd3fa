use crate::ui::widgets::{KeyValue, MessageBlock, TableSpec};

pub type UiResult<T> = Result<T, UiError>;

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait Renderer {
    fn section(&mut self, title: &str) -> UiResult<()>;
    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()>;
    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()>;
    fn table(&mut self, spec: &TableSpec) -> UiResult<()>;
}
