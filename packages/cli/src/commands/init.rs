use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use domshot_capture::config::DEFAULT_CONFIG_NAME;
use std::fs;
use std::path::PathBuf;

/// A recorded page with a two-paragraph selection
pub const EXAMPLE_SNAPSHOT: &str = r#"{
  "url": "https://example.com/notes/",
  "body": {
    "tag": "body",
    "rect": { "x": 0, "y": 0, "width": 1024, "height": 768 },
    "children": [
      {
        "tag": "article",
        "attributes": { "id": "note", "class": "note" },
        "style": { "display": "block", "fontFamily": "Georgia, serif", "padding": "12px" },
        "rect": { "x": 40, "y": 40, "width": 480, "height": 120 },
        "children": [
          {
            "tag": "h1",
            "style": { "fontSize": "24px", "marginTop": "0px" },
            "rect": { "x": 52, "y": 52, "width": 456, "height": 32 },
            "children": [ { "text": "Field notes" } ]
          },
          {
            "tag": "p",
            "style": { "color": "rgb(51, 51, 51)" },
            "rect": { "x": 52, "y": 100, "width": 456, "height": 48 },
            "children": [
              { "text": "See the " },
              {
                "tag": "a",
                "attributes": { "href": "./archive" },
                "rect": { "x": 110, "y": 100, "width": 52, "height": 18 },
                "children": [ { "text": "archive" } ]
              },
              { "text": " for older entries." }
            ]
          }
        ]
      }
    ]
  },
  "selection": {
    "start": { "path": [0, 0, 0], "offset": 0 },
    "end": { "path": [0, 1, 2], "offset": 19 },
    "rect": { "x": 52, "y": 52, "width": 456, "height": 96 }
  }
}
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Output directory for captures
    #[arg(short, long, default_value = "screenshots")]
    pub out_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Domshot project...".bright_blue().bold());

    let snapshot_dir = PathBuf::from(cwd).join("snapshots");
    if !snapshot_dir.exists() {
        fs::create_dir_all(&snapshot_dir)?;
        println!("  {} Created snapshots/", "✓".green());
    }

    let example_file = snapshot_dir.join("example.json");
    if !example_file.exists() {
        fs::write(&example_file, EXAMPLE_SNAPSHOT)?;
        println!("  {} Created snapshots/example.json", "✓".green());
    }

    let config = Config {
        out_dir: args.out_dir.clone(),
        ..Config::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Record a page snapshot into snapshots/");
    println!("  2. Run: domshot capture snapshots");
    println!("  3. Open the previews in {}/", args.out_dir);

    Ok(())
}
