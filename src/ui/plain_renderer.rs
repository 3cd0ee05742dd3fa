use std::io::{IsTerminal, Write};

use anstream::{AutoStream, ColorChoice};
use anstyle::Style;

use crate::ui::palette::{resolve_color_enabled, OutputMode, Palette};
use crate::ui::renderer::{Renderer, UiResult};
use crate::ui::table::render_table;
use crate::ui::widgets::{KeyValue, MessageBlock, TableSpec};

pub struct PlainRenderer<W: Write> {
    writer: W,
    color_enabled: bool,
    palette: Palette,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(writer: W, color_enabled: bool) -> Self {
        Self {
            writer,
            color_enabled,
            palette: Palette::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn style_text(&self, style: Style, text: &str) -> String {
        if !self.color_enabled {
            return text.to_owned();
        }
        format!("{}{}{}", style.render(), text, style.render_reset())
    }

    fn write_block(&mut self, label: &str, style: Style, block: &MessageBlock) -> UiResult<()> {
        let marker = self.style_text(style, label);
        writeln!(self.writer, "{marker} {}", block.title)?;
        for line in block.body.lines() {
            writeln!(self.writer, "  {line}")?;
        }
        if let Some(hint) = &block.hint {
            let hint_label = self.style_text(self.palette.muted, "hint");
            writeln!(self.writer, "  {hint_label}: {hint}")?;
        }
        Ok(())
    }
}

fn color_choice(mode: OutputMode) -> ColorChoice {
    match mode {
        OutputMode::Auto => ColorChoice::Auto,
        OutputMode::Always => ColorChoice::AlwaysAnsi,
        OutputMode::Never => ColorChoice::Never,
    }
}

impl PlainRenderer<AutoStream<std::io::Stdout>> {
    pub fn stdout(mode: OutputMode) -> Self {
        let stream = AutoStream::new(std::io::stdout(), color_choice(mode));
        let color_enabled = resolve_color_enabled(mode, std::io::stdout().is_terminal());
        Self::new(stream, color_enabled)
    }
}

impl PlainRenderer<AutoStream<std::io::Stderr>> {
    pub fn stderr(mode: OutputMode) -> Self {
        let stream = AutoStream::new(std::io::stderr(), color_choice(mode));
        let color_enabled = resolve_color_enabled(mode, std::io::stderr().is_terminal());
        Self::new(stream, color_enabled)
    }
}

impl<W: Write> Renderer for PlainRenderer<W> {
    fn section(&mut self, title: &str) -> UiResult<()> {
        let rendered = self.style_text(self.palette.accent, title);
        let underline = self.style_text(self.palette.muted, &"─".repeat(title.chars().count()));
        writeln!(self.writer, "{rendered}")?;
        writeln!(self.writer, "{underline}")?;
        Ok(())
    }

    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()> {
        self.write_block("[error]", self.palette.error, block)
    }

    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()> {
        let key_width = items
            .iter()
            .map(|item| item.key.chars().count())
            .max()
            .unwrap_or(0);
        for item in items {
            let padding = " ".repeat(key_width - item.key.chars().count());
            let key = self.style_text(self.palette.label, &item.key);
            writeln!(self.writer, "{key}:{padding} {}", item.value)?;
        }
        Ok(())
    }

    fn table(&mut self, spec: &TableSpec) -> UiResult<()> {
        let rendered = render_table(spec);
        writeln!(self.writer, "{rendered}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(renderer: PlainRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).expect("utf8")
    }

    #[test]
    fn renders_blocks_without_color_when_disabled() {
        let mut renderer = PlainRenderer::new(Vec::<u8>::new(), false);

        renderer
            .error_block(
                &MessageBlock::new("Configuration error", "failed to read devtabs.toml")
                    .with_hint("Pass `--config <PATH>` to use another file"),
            )
            .expect("render error block");

        assert_eq!(
            rendered(renderer),
            "[error] Configuration error\n  failed to read devtabs.toml\n  hint: Pass `--config <PATH>` to use another file\n"
        );
    }

    #[test]
    fn aligns_key_values_and_underlines_sections() {
        let mut renderer = PlainRenderer::new(Vec::<u8>::new(), false);

        renderer.section("Sessions").expect("section");
        renderer
            .key_values(&[
                KeyValue::new("Vite", "stopped (exit=0)"),
                KeyValue::new("Queue", "never started"),
            ])
            .expect("key values");

        assert_eq!(
            rendered(renderer),
            "Sessions\n────────\nVite:  stopped (exit=0)\nQueue: never started\n"
        );
    }

    #[test]
    fn colors_markers_only_when_enabled() {
        let mut renderer = PlainRenderer::new(Vec::<u8>::new(), true);
        renderer
            .error_block(&MessageBlock::new("Dashboard failed", "terminal error: broken pipe"))
            .expect("error block");

        let output = rendered(renderer);
        assert!(output.starts_with('\u{1b}'));
        assert!(output.contains("[error]"));
        assert!(output.ends_with("  terminal error: broken pipe\n"));
    }
}
