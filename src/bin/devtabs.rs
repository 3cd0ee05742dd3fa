use clap::Parser;
use devtabs::ui::{MessageBlock, OutputMode, PlainRenderer, Renderer};
use devtabs::{run, Cli};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        let mut block = MessageBlock::new(err.title(), err.to_string());
        if let Some(hint) = err.hint() {
            block = block.with_hint(hint);
        }
        let mut renderer = PlainRenderer::stderr(OutputMode::from_env());
        let _ = renderer.error_block(&block);
        std::process::exit(1);
    }
}
