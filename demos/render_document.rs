//! Render a small page with the stylesheet in `<head>`, then the same page
//! with content-hashed class names and the stylesheet at the end of `<body>`.

use rfmarkup::{ClassNaming, Document, Node, RenderConfig, StyleEntry, StylePlacement};

fn card(title: &str, body: &str) -> Node {
    let heading = Node::element("h2", title.to_string()).style(StyleEntry::new("margin", "0"));
    let small = StyleEntry::new("font-size", "0.9rem").media("(max-width: 600px)");
    let entries = [StyleEntry::new("color", "#444"), small];
    let text = Node::element("p", body.to_string()).styles(entries);
    let border = StyleEntry::new("border", "1px solid #ddd");
    let card = Node::element("article", (heading, text)).style(border);
    card.attribute("class", "card")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("RFox Markup - Document Example\n");

    let cards = vec![
        card("First", "Styles repeat, rules do not."),
        card("Second", "Text like <this> & that is escaped."),
    ];
    let doc = Document::new(Node::element("title", "Cards"), Node::element("main", cards));
    let doc = doc.lang("en");

    let html = doc.render_to_string(&RenderConfig::pretty())?;
    println!("{}\n", html);

    let config = RenderConfig {
        class_naming: ClassNaming::ContentHash,
        style_placement: StylePlacement::BodyEnd,
        ..RenderConfig::pretty()
    };
    let rendered = doc.render(&config);
    let rules = rendered.styles.len();
    println!("Content-hashed stylesheet ({} rules):", rules);
    println!("{}", rendered.stylesheet);

    Ok(())
}
