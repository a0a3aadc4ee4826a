use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Parser;

use tokenmill::{
    FramingMode, FsAssetSource, NullFramingHost, PendingFile, Pipeline, PipelineConfig,
    PreviewSink, Token, TokenmillError, parse_hex_color,
};

#[derive(Parser, Debug)]
#[command(name = "tokenmill", version)]
struct Cli {
    /// Input image files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory holding the six mask/shading layers as `<name>.png`.
    #[arg(long)]
    assets: PathBuf,

    /// Output directory for finished tokens.
    #[arg(long, default_value = "tokens")]
    out: PathBuf,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Background color override, e.g. '#112233'.
    #[arg(long)]
    background: Option<String>,
}

/// Reports per-file failures as they happen.
struct StderrReport;

impl PreviewSink for StderrReport {
    fn file_failed(&mut self, file_name: &str, error: &TokenmillError) {
        eprintln!("failed {file_name}: {error}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config_json(path)?,
        None => PipelineConfig::default(),
    };
    if config.framing_mode != FramingMode::Never {
        eprintln!("manual framing needs an interactive surface; framing automatically");
        config.framing_mode = FramingMode::Never;
    }
    if let Some(hex) = &cli.background {
        config.background_rgba = parse_hex_color(hex)?;
    }

    let mut pipeline = Pipeline::new(
        config,
        Box::new(FsAssetSource::new(&cli.assets)),
        Box::new(NullFramingHost),
        Box::new(StderrReport),
    );

    let mut files = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let bytes =
            std::fs::read(path).with_context(|| format!("read input '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(PendingFile::new(name, bytes));
    }
    pipeline.submit(files);

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("create output dir '{}'", cli.out.display()))?;

    let mut tokens: Vec<&Token> = pipeline.registry().list().collect();
    tokens.sort_by_key(|t| t.id.parse::<u64>().unwrap_or(u64::MAX));

    let mut used_names: HashMap<&str, u32> = HashMap::new();
    for token in tokens {
        let file_name = match used_names.get_mut(token.name.as_str()) {
            Some(count) => {
                let name = format!("{}-{}.png", token.name, count);
                *count += 1;
                name
            }
            None => {
                used_names.insert(&token.name, 1);
                format!("{}.png", token.name)
            }
        };
        let out_path = cli.out.join(file_name);
        write_token_png(&out_path, token)?;
        eprintln!("wrote {}", out_path.display());
    }

    Ok(())
}

fn read_config_json(path: &Path) -> anyhow::Result<PipelineConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let config: PipelineConfig =
        serde_json::from_reader(r).with_context(|| "parse config JSON")?;
    Ok(config)
}

fn write_token_png(path: &Path, token: &Token) -> anyhow::Result<()> {
    image::save_buffer_with_format(
        path,
        &token.image.to_rgba8_straight(),
        token.image.width(),
        token.image.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}
