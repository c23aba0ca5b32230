use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use strata::{Args, font_registry, replay_reader};
use strata_config::StrataConfig;
use strata_import::ImportSettings;
use strata_scene::SceneHost;

fn load_config(args: &Args) -> Result<StrataConfig> {
    let mut config = match &args.config {
        Some(path) => StrataConfig::load_from_file(path)?,
        None => StrataConfig::load_or_default(),
    };
    config.merge_with_env();
    Ok(config)
}

fn init_logging(config: &StrataConfig) {
    let default_filter = config.diagnostics.log_filter.as_deref().unwrap_or("info");
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;
    let config = load_config(&args)?;
    init_logging(&config);

    let fonts = font_registry(args.fonts.as_deref(), &config)?;
    log::info!("{} fonts available", fonts.len());
    let settings = ImportSettings::from(&config);

    let file = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let replay = replay_reader(BufReader::new(file), SceneHost::new(fonts), settings).await?;

    let stats = replay.stats;
    println!(
        "created {} nodes ({} images, {} texts), {} failed, {} orphans, {} flattened, {} placeholders, depth {}",
        stats.created,
        stats.images,
        stats.texts,
        stats.failed,
        stats.orphans,
        stats.flattened,
        stats.placeholders,
        stats.max_depth
    );
    if !replay.skipped_lines.is_empty() {
        println!("skipped lines: {:?}", replay.skipped_lines);
    }
    for error in replay.host.errors() {
        eprintln!("error: {error}");
    }

    let tree = serde_json::to_string_pretty(&replay.host.to_json())?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, tree).with_context(|| format!("writing {}", path.display()))?;
            log::info!("scene written to {}", path.display());
        }
        None => println!("{tree}"),
    }
    Ok(())
}
