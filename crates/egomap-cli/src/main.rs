//! `egomap-cli` – command line front end for the spatial context engine.
//!
//! Replays a trajectory file through a
//! [`SpatialContext`](egomap_runtime::SpatialContext) and writes the
//! products to disk:
//!
//! - `render` writes the egocentric map as PNG and optionally its layout as
//!   JSON,
//! - `watermark` stamps keyframe images with their map color and rank,
//! - `schema` prints the JSON Schema of the layout document,
//! - `config` shows (or with `init`, creates) `~/.egomap/config.toml`.

mod config;
mod trajectory;

use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

use egomap_runtime::SpatialContext;
use egomap_types::FrameId;
use trajectory::Trajectory;

fn main() {
    let _telemetry = egomap_runtime::init_tracing("egomap");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_args(&args).and_then(run);
    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        eprintln!("  Run `{}` for usage.", "egomap help".bold());
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument parsing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Render {
        trajectory: PathBuf,
        out: PathBuf,
        layout: Option<PathBuf>,
    },
    Watermark {
        trajectory: PathBuf,
        images: Vec<(FrameId, PathBuf)>,
        out_dir: PathBuf,
    },
    Schema,
    Config {
        init: bool,
    },
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some((cmd, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    match cmd.as_str() {
        "render" => {
            let (positional, mut flags) = split_flags(rest, &["--out", "--layout"])?;
            let [trajectory] = positional.as_slice() else {
                return Err("render expects exactly one trajectory file".to_string());
            };
            Ok(Command::Render {
                trajectory: PathBuf::from(trajectory),
                out: flags
                    .remove("--out")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("map.png")),
                layout: flags.remove("--layout").map(PathBuf::from),
            })
        }
        "watermark" => {
            let (positional, mut flags) = split_flags(rest, &["--out-dir"])?;
            let Some((trajectory, pairs)) = positional.split_first() else {
                return Err("watermark expects a trajectory file".to_string());
            };
            if pairs.is_empty() {
                return Err("watermark expects at least one <id>=<image> pair".to_string());
            }
            let images = pairs
                .iter()
                .map(|p| parse_image_pair(p))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::Watermark {
                trajectory: PathBuf::from(trajectory),
                images,
                out_dir: flags
                    .remove("--out-dir")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
            })
        }
        "schema" => Ok(Command::Schema),
        "config" => match rest {
            [] => Ok(Command::Config { init: false }),
            [sub] if sub == "init" => Ok(Command::Config { init: true }),
            _ => Err("config accepts only the `init` subcommand".to_string()),
        },
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command '{}'", other)),
    }
}

/// Separate `--flag value` pairs (restricted to `known`) from positional
/// arguments.
fn split_flags<'a>(
    args: &'a [String],
    known: &[&str],
) -> Result<(Vec<&'a str>, std::collections::HashMap<String, &'a str>), String> {
    let mut positional = Vec::new();
    let mut flags = std::collections::HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            if !known.contains(&arg.as_str()) {
                return Err(format!("unknown flag '{}'", arg));
            }
            let value = iter
                .next()
                .ok_or_else(|| format!("flag '{}' needs a value", arg))?;
            flags.insert(arg.clone(), value.as_str());
        } else {
            positional.push(arg.as_str());
        }
    }
    Ok((positional, flags))
}

fn parse_image_pair(pair: &str) -> Result<(FrameId, PathBuf), String> {
    let (id, path) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected <id>=<image>, got '{}'", pair))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("'{}' is not a frame id", id))?;
    if path.is_empty() {
        return Err(format!("missing image path for frame {}", id));
    }
    Ok((FrameId(id), PathBuf::from(path)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Render {
            trajectory,
            out,
            layout,
        } => cmd_render(&trajectory, &out, layout.as_deref()),
        Command::Watermark {
            trajectory,
            images,
            out_dir,
        } => cmd_watermark(&trajectory, &images, &out_dir),
        Command::Schema => cmd_schema(),
        Command::Config { init } => cmd_config(init),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

fn replay(path: &Path) -> Result<SpatialContext, String> {
    let cfg = config::resolve()?;
    let mut ctx = SpatialContext::new(cfg.context_config()).map_err(|e| e.to_string())?;
    let ids = Trajectory::load(path)?
        .replay(&mut ctx)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    info!(frames = ids.len(), keyframes = ctx.store().keyframe_count(), "trajectory replayed");
    Ok(ctx)
}

fn cmd_render(trajectory: &Path, out: &Path, layout: Option<&Path>) -> Result<(), String> {
    let ctx = replay(trajectory)?;
    let map = ctx.generate_map().map_err(|e| e.to_string())?;

    map.image
        .save(out)
        .map_err(|e| format!("Failed to write {}: {}", out.display(), e))?;
    println!(
        "  {} map written to {}",
        "✓".green().bold(),
        out.display().to_string().bold()
    );

    if let Some(path) = layout {
        let json = serde_json::to_string_pretty(&map.layout)
            .map_err(|e| format!("Failed to serialize layout: {}", e))?;
        std::fs::write(path, json)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        println!(
            "  {} layout written to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        );
    }

    for marker in &map.layout.markers {
        let [r, g, b] = marker.color;
        println!(
            "    {} frame {} {}",
            format!("#{}", marker.rank).truecolor(r, g, b).bold(),
            marker.frame_id,
            if marker.displaced { "(displaced)".dimmed().to_string() } else { String::new() }
        );
    }
    if !map.layout.outliers.is_empty() {
        let ids: Vec<String> = map.layout.outliers.iter().map(|id| id.to_string()).collect();
        println!("    {} {}", "outliers:".yellow(), ids.join(", "));
    }
    for line in ctx.store().rooms().to_string().lines() {
        println!("    {}", line.dimmed());
    }
    Ok(())
}

fn cmd_watermark(
    trajectory: &Path,
    images: &[(FrameId, PathBuf)],
    out_dir: &Path,
) -> Result<(), String> {
    let ctx = replay(trajectory)?;
    let map = ctx.generate_map().map_err(|e| e.to_string())?;

    let loaded = images
        .iter()
        .map(|(id, path)| {
            image::open(path)
                .map(|img| (*id, img.to_rgb8()))
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let stamped = ctx.watermark(&loaded, &map.colors).map_err(|e| e.to_string())?;

    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create {}: {}", out_dir.display(), e))?;
    for ((id, source), image) in images.iter().zip(&stamped) {
        let target = out_dir.join(watermarked_name(*id, source));
        image
            .save(&target)
            .map_err(|e| format!("Failed to write {}: {}", target.display(), e))?;
        println!(
            "  {} frame {} → {}",
            "✓".green().bold(),
            id,
            target.display().to_string().bold()
        );
    }
    Ok(())
}

/// `kitchen.png` for frame 3 becomes `kitchen_kf3.png`.
fn watermarked_name(id: FrameId, source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    format!("{}_kf{}.png", stem, id)
}

fn cmd_schema() -> Result<(), String> {
    let schema = SpatialContext::layout_schema()
        .and_then(|value| serde_json::to_string_pretty(&value))
        .map_err(|e| format!("Failed to serialize schema: {}", e))?;
    println!("{}", schema);
    Ok(())
}

fn cmd_config(init: bool) -> Result<(), String> {
    let path = config::config_path();
    if init {
        if path.exists() {
            println!("  Config already exists at {}", path.display().to_string().bold());
            return Ok(());
        }
        config::save(&config::Config::default())?;
        println!(
            "  {} Config saved to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        );
        return Ok(());
    }

    let cfg = config::resolve()?;
    let source = if path.exists() { "file" } else { "defaults" };
    println!(
        "  {} ({})",
        path.display().to_string().bold(),
        source.dimmed()
    );
    let raw = toml::to_string_pretty(&cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    println!("{}", raw);
    Ok(())
}

fn print_help() {
    println!();
    println!(
        "  {} {}",
        "egomap".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Egocentric keyframe maps for robot policies");
    println!();
    println!("{}", "Commands".bold().underline());
    println!(
        "  {} <trajectory.json> [--out map.png] [--layout layout.json]",
        "render".bold().cyan()
    );
    println!(
        "  {} <trajectory.json> <id>=<image.png>... [--out-dir DIR]",
        "watermark".bold().cyan()
    );
    println!("  {}       – print the JSON Schema of the layout", "schema".bold().cyan());
    println!("  {} [init] – show or create ~/.egomap/config.toml", "config".bold().cyan());
    println!("  {}         – this text", "help".bold().cyan());
    println!();
}
