use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use log::{debug, info};

use rfmarkup::{ClassNaming, Document, Node, RenderConfig, StylePlacement};

/// Render JSON markup trees to HTML
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a document (or a single fragment) to stdout
    Render {
        /// JSON input file, or `-` for stdin
        input: PathBuf,

        /// Input is a single node rather than `{"head": .., "body": ..}`
        #[arg(long)]
        fragment: bool,

        /// Deliver output through the backpressured stream
        #[arg(long)]
        stream: bool,

        #[command(flatten)]
        options: RenderOptions,
    },
    /// Print only the stylesheet a document would embed
    Stylesheet {
        /// JSON input file, or `-` for stdin
        input: PathBuf,

        #[arg(long)]
        fragment: bool,

        #[command(flatten)]
        options: RenderOptions,
    },
}

#[derive(Args)]
struct RenderOptions {
    /// Indent with two spaces and break lines before block tags
    #[arg(long)]
    pretty: bool,

    /// Mark every generated declaration `!important`
    #[arg(long)]
    force_important: bool,

    #[arg(long, value_enum, default_value_t = Placement::Head)]
    placement: Placement,

    #[arg(long, value_enum, default_value_t = Naming::Sequential)]
    naming: Naming,

    /// Chunk size in bytes for streamed output
    #[arg(long, default_value_t = rfmarkup::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Placement {
    Head,
    BodyEnd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Naming {
    Sequential,
    ContentHash,
}

impl RenderOptions {
    fn to_config(&self) -> RenderConfig {
        let base = if self.pretty {
            RenderConfig::pretty()
        } else {
            RenderConfig::default()
        };
        RenderConfig {
            force_important: self.force_important,
            chunk_size: self.chunk_size,
            style_placement: match self.placement {
                Placement::Head => StylePlacement::Head,
                Placement::BodyEnd => StylePlacement::BodyEnd,
            },
            class_naming: match self.naming {
                Naming::Sequential => ClassNaming::Sequential,
                Naming::ContentHash => ClassNaming::ContentHash,
            },
            ..base
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn load_document(path: &Path, fragment: bool) -> Result<Document> {
    let json = read_input(path)?;
    if fragment {
        let node: Node = serde_json::from_str(&json)
            .with_context(|| format!("{} is not a valid node tree", path.display()))?;
        Ok(Document::new(Node::Empty, node))
    } else {
        serde_json::from_str(&json)
            .with_context(|| format!("{} is not a valid document", path.display()))
    }
}

async fn render_streamed(document: Document, fragment: bool, config: RenderConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut stream = if fragment {
        rfmarkup::stream_fragment_backpressured(document.body, config)
    } else {
        rfmarkup::stream_backpressured(document, config)
    };
    let mut chunks = 0usize;
    while let Some(chunk) = stream.next().await {
        out.write_all(&chunk).context("failed to write output")?;
        chunks += 1;
    }
    out.flush()?;
    debug!("wrote {} chunks", chunks);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Render {
            input,
            fragment,
            stream,
            options,
        } => {
            let config = options.to_config();
            let document = load_document(&input, fragment)?;
            info!("rendering {}", input.display());
            if stream {
                render_streamed(document, fragment, config).await?;
            } else {
                let bytes = if fragment {
                    rfmarkup::render_fragment(&document.body, &config)
                } else {
                    document.render(&config).bytes
                };
                let mut out = io::stdout().lock();
                out.write_all(&bytes).context("failed to write output")?;
                out.flush()?;
            }
        }
        Command::Stylesheet {
            input,
            fragment,
            options,
        } => {
            let config = options.to_config();
            let document = load_document(&input, fragment)?;
            let stylesheet = if fragment {
                let (_, styles) = rfmarkup::render_fragment_with_styles(&document.body, &config);
                rfmarkup::render_stylesheet(&styles, &config, "")
            } else {
                document.render(&config).stylesheet
            };
            println!("{}", stylesheet);
        }
    }
    Ok(())
}
