use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use infograph_renderer::{DeferredLoader, Defaults, QueueState, Scene};

#[derive(Parser, Debug)]
#[command(name = "infograph", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene document to an image.
    Render(RenderArgs),
    /// Print the built-in defaults as JSON.
    Defaults,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image path (format from extension).
    #[arg(long)]
    out: PathBuf,

    /// Directory image locators are resolved against. Defaults to the
    /// scene file's directory.
    #[arg(long)]
    assets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Defaults => cmd_defaults(),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = Scene::from_path(&args.in_path)
        .with_context(|| format!("read scene '{}'", args.in_path.display()))?;
    let assets_root = args.assets.clone().unwrap_or_else(|| {
        args.in_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });

    let loader = Rc::new(DeferredLoader::with_root(assets_root));
    let (infographic, canvas) = scene.build(loader.clone())?;

    infographic.render();
    loader.run_until_idle();

    let state = infographic.queue().state();
    if state != QueueState::Idle {
        tracing::warn!(
            ?state,
            remaining = infographic.queue().len(),
            "some operations never ran; an image could not be loaded"
        );
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    canvas
        .borrow()
        .save_png(&args.out)
        .with_context(|| format!("write image '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_defaults() -> anyhow::Result<()> {
    println!("{}", Defaults::builtin().to_json_pretty()?);
    Ok(())
}
