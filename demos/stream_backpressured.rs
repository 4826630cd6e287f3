//! Stream a large document to stdout one chunk at a time. The render task is
//! never more than one chunk ahead of the writer.

use std::io::Write;
use std::time::Instant;

use futures::StreamExt;
use rfmarkup::{stream_backpressured, Document, Node, RenderConfig, StyleEntry, StylePlacement};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rows = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000);

    let items = (0..rows).map(|i| {
        let color = if i % 2 == 0 { "black" } else { "gray" };
        Node::element("li", format!("row {}", i)).style(StyleEntry::new("color", color))
    });
    let body = Node::element("ul", Node::array(items));
    let doc = Document::new(Node::element("title", "Streamed"), body);
    let config = RenderConfig {
        chunk_size: 8 * 1024,
        style_placement: StylePlacement::BodyEnd,
        ..Default::default()
    };

    let start = Instant::now();
    let mut stream = stream_backpressured(doc, config);
    let mut stdout = std::io::stdout().lock();
    let (mut chunks, mut bytes) = (0usize, 0usize);
    while let Some(chunk) = stream.next().await {
        stdout.write_all(&chunk)?;
        chunks += 1;
        bytes += chunk.len();
    }
    stdout.flush()?;

    eprintln!(
        "\n{} rows: {} bytes in {} chunks, {:?}",
        rows,
        bytes,
        chunks,
        start.elapsed()
    );
    Ok(())
}
