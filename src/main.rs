use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Local;

use snipp_annotate::capture::loader::decode_source;
use snipp_annotate::session::export::export_filename;
use snipp_annotate::{Editor, EditorConfig};

fn usage() -> &'static str {
    "usage: snipp-annotate <input.png> [output.png]"
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(input) = args.next() else {
        bail!(usage());
    };
    let output = args.next();
    if args.next().is_some() {
        bail!(usage());
    }

    let config = EditorConfig::load();
    let mut editor = Editor::new(&config);

    let bytes = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let Some(source) = decode_source(bytes, editor.liveness()).await? else {
        bail!("Editor closed before the image was decoded");
    };
    editor.attach_source(source);

    let png = editor.export_png()?;
    let output = output.unwrap_or_else(|| config.save_location.join(export_filename(&Local::now())));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, png).with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("Saved annotated image to {}", output.display());
    println!("{}", output.display());
    Ok(())
}
