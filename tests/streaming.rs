#![cfg(feature = "stream")]

use std::time::Duration;

use futures::StreamExt;
use rfmarkup::{
    render_fragment, stream_backpressured, stream_chunked, stream_fragment_backpressured,
    stream_fragment_chunked, Document, Node, RenderConfig, StyleEntry, StylePlacement,
};

fn big_list(items: usize) -> Node {
    Node::element(
        "ul",
        Node::array((0..items).map(|i| {
            Node::element("li", format!("row {} & more", i)).style(StyleEntry::new(
                "color",
                if i % 3 == 0 { "red" } else { "green" },
            ))
        })),
    )
}

fn big_document(items: usize) -> Document {
    Document::new(Node::element("title", "stream"), big_list(items))
}

fn small_chunks() -> RenderConfig {
    RenderConfig {
        chunk_size: 64,
        ..Default::default()
    }
}

#[tokio::test]
async fn chunked_stream_equals_batch_render() {
    let config = small_chunks();
    let doc = big_document(200);
    let batch = doc.render(&config).bytes;

    let chunks: Vec<Vec<u8>> = stream_chunked(doc, config).collect().await;
    assert!(chunks.len() > 1);
    assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == 64));
    assert_eq!(chunks.concat(), batch);
}

#[tokio::test]
async fn chunked_fragment_equals_batch_render() {
    let config = small_chunks();
    let node = big_list(50);
    let batch = render_fragment(&node, &config);
    let chunks: Vec<Vec<u8>> = stream_fragment_chunked(node, config).collect().await;
    assert_eq!(chunks.concat(), batch);
}

#[tokio::test]
async fn backpressured_stream_equals_batch_render() {
    for placement in [StylePlacement::Head, StylePlacement::BodyEnd] {
        let config = RenderConfig {
            style_placement: placement,
            ..small_chunks()
        };
        let doc = big_document(200);
        let batch = doc.render(&config).bytes;

        let chunks: Vec<Vec<u8>> = stream_backpressured(doc, config).collect().await;
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == 64));
        assert_eq!(chunks.concat(), batch, "placement {:?}", placement);
    }
}

#[tokio::test]
async fn backpressured_fragment_equals_batch_render() {
    let config = RenderConfig {
        chunk_size: 17,
        ..RenderConfig::pretty()
    };
    let node = big_list(40);
    let batch = render_fragment(&node, &config);
    let chunks: Vec<Vec<u8>> = stream_fragment_backpressured(node, config).collect().await;
    assert_eq!(chunks.concat(), batch);
}

#[tokio::test]
async fn producer_waits_for_consumer() {
    let config = RenderConfig {
        chunk_size: 32,
        style_placement: StylePlacement::BodyEnd,
        ..Default::default()
    };
    let mut stream = stream_backpressured(big_document(1_000), config);

    let first = stream.next().await.expect("first chunk");
    assert_eq!(first.len(), 32);
    tokio::time::sleep(Duration::from_millis(50)).await;
    // One chunk taken, at most one more in the channel: the render cannot
    // have finished a document this size.
    assert!(!stream.is_finished());
}

#[tokio::test]
async fn dropping_backpressured_stream_cancels_render() {
    let config = RenderConfig {
        chunk_size: 16,
        style_placement: StylePlacement::BodyEnd,
        ..Default::default()
    };
    let mut stream = stream_backpressured(big_document(10_000), config);
    assert!(stream.next().await.is_some());
    assert!(!stream.is_finished());
    drop(stream);
    // The aborted task must not keep the runtime busy.
    tokio::time::timeout(Duration::from_secs(1), tokio::task::yield_now())
        .await
        .expect("runtime stays responsive");
}

#[tokio::test]
async fn head_placement_body_render_does_not_block_the_runtime() {
    let config = RenderConfig {
        style_placement: StylePlacement::Head,
        ..Default::default()
    };
    let mut stream = stream_backpressured(big_document(200_000), config);

    // The body must be fully rendered before the first chunk exists, which
    // takes far longer than this. The timer can only fire if the render task
    // yields on this single-threaded runtime.
    let started = std::time::Instant::now();
    let wait = Duration::from_millis(5);
    let first = tokio::time::timeout(wait, stream.next()).await;
    assert!(first.is_err(), "first chunk arrived before the timeout");
    assert!(
        started.elapsed() < Duration::from_millis(100),
        "timeout fired late: {:?}",
        started.elapsed()
    );
    assert!(!stream.is_finished());
    drop(stream);
}

#[tokio::test]
async fn empty_fragment_streams_nothing() {
    let chunks: Vec<Vec<u8>> =
        stream_fragment_backpressured(Node::Empty, RenderConfig::default()).collect().await;
    assert!(chunks.is_empty());
}
