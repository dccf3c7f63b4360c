use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use domshot_capture::config::DEFAULT_CONFIG_NAME;
use domshot_capture::preview::render_preview_page;
use domshot_capture::snapshot::SnapshotHost;
use domshot_capture::{
    CaptureConfig, CaptureError, CaptureOutput, Capturer, LiveDocument, PreviewSink, Rect,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Args)]
pub struct CaptureArgs {
    /// Snapshot file, or a directory of snapshot .json files
    pub input: PathBuf,

    /// Crop rectangle as x,y,width,height (defaults to the selection's box)
    #[arg(long, value_parser = parse_crop)]
    pub crop: Option<Rect>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Print the SVG document to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,

    /// Config file (defaults to domshot.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip the HTML preview page
    #[arg(long)]
    pub no_preview: bool,
}

pub fn parse_crop(value: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in crop: {}", e))?;

    match parts.as_slice() {
        [x, y, width, height] if *width > 0.0 && *height > 0.0 => {
            Ok(Rect::new(*x, *y, *width, *height))
        }
        [_, _, _, _] => Err("crop width and height must be positive".to_string()),
        _ => Err(format!("expected x,y,width,height, got {:?}", value)),
    }
}

/// Writes `<stem>.svg` and, optionally, `<stem>.html` into a directory
pub struct FileSink {
    out_dir: PathBuf,
    stem: String,
    preview: bool,
    config: CaptureConfig,
    written: Vec<PathBuf>,
}

impl FileSink {
    pub fn new(out_dir: PathBuf, stem: impl Into<String>, preview: bool, config: CaptureConfig) -> Self {
        Self {
            out_dir,
            stem: stem.into(),
            preview,
            config,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, output: &CaptureOutput) -> std::io::Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let svg_name = format!("{}.svg", self.stem);
        let svg_path = self.out_dir.join(&svg_name);
        fs::write(&svg_path, &output.document)?;
        self.written.push(svg_path);

        if self.preview {
            let html_path = self.out_dir.join(format!("{}.html", self.stem));
            fs::write(&html_path, render_preview_page(output, &svg_name, &self.config))?;
            self.written.push(html_path);
        }
        Ok(())
    }
}

impl PreviewSink for FileSink {
    fn present(&mut self, output: &CaptureOutput) -> domshot_capture::Result<()> {
        self.write(output)
            .map_err(|e| CaptureError::Host(format!("writing {}: {}", self.out_dir.display(), e)))
    }
}

/// Prints the document instead of saving it
pub struct StdoutSink;

impl PreviewSink for StdoutSink {
    fn present(&mut self, output: &CaptureOutput) -> domshot_capture::Result<()> {
        println!("{}", output.document);
        Ok(())
    }
}

/// Snapshot files under `input`, sorted; the config file is skipped
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.is_file()
                && path.extension().map(|e| e == "json").unwrap_or(false)
                && path.file_name().map(|n| n != DEFAULT_CONFIG_NAME).unwrap_or(true)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Loads one snapshot and captures it into `sink`
pub async fn capture_file<S: PreviewSink>(
    path: &Path,
    crop: Option<Rect>,
    config: &CaptureConfig,
    sink: &mut S,
) -> Result<CaptureOutput> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut host = SnapshotHost::from_json(&json).with_context(|| format!("loading {}", path.display()))?;

    let crop = crop
        .or_else(|| {
            host.selection()
                .and_then(|range| host.range_rect(&range))
        })
        .ok_or_else(|| anyhow!("{} has no selection to crop to", path.display()))?;
    debug!(path = %path.display(), ?crop, "Capturing snapshot");

    let output = Capturer::new(config.clone())
        .run(&mut host, sink, crop)
        .await?;
    Ok(output)
}

pub async fn capture(args: CaptureArgs, cwd: &str) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_file(path)?,
        None => Config::load(cwd)?,
    };
    let out_dir = match &args.out_dir {
        Some(dir) => PathBuf::from(cwd).join(dir),
        None => config.get_out_dir(cwd),
    };

    let inputs = collect_inputs(&args.input)?;
    if inputs.is_empty() {
        println!("{}", "⚠️  No snapshots found".yellow());
        return Ok(());
    }

    if args.stdout {
        for path in &inputs {
            capture_file(path, args.crop, &config.capture, &mut StdoutSink).await?;
        }
        return Ok(());
    }

    println!("{}", "📸 Capturing snapshots...".bright_blue().bold());
    info!(count = inputs.len(), out_dir = %out_dir.display(), "Capturing snapshots");

    let mut success_count = 0;
    let mut error_count = 0;

    for path in &inputs {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture".to_string());
        let mut sink = FileSink::new(
            out_dir.clone(),
            stem,
            config.preview && !args.no_preview,
            config.capture.clone(),
        );

        match capture_file(path, args.crop, &config.capture, &mut sink).await {
            Ok(output) => {
                success_count += 1;
                let written: Vec<String> = sink
                    .written()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                println!(
                    "  {} {} → {} ({}x{})",
                    "✓".green(),
                    path.display(),
                    written.join(", "),
                    output.viewport.width,
                    output.viewport.height
                );
            }
            Err(e) => {
                error_count += 1;
                eprintln!("  {} {} - {}", "✗".red(), path.display(), e);
            }
        }
    }

    println!();
    if error_count == 0 {
        println!(
            "{} Captured {} snapshots",
            "✅".green(),
            success_count.to_string().bright_white().bold()
        );
        Ok(())
    } else {
        println!(
            "{} {} succeeded, {} failed",
            "⚠️".yellow(),
            success_count,
            error_count
        );
        Err(anyhow!("{} snapshots failed to capture", error_count))
    }
}
