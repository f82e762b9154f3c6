//! Attribute access, child navigation and text access.
//!
//! Run with `cargo run --example basic_access`.

use untangle::Result;

fn main() -> Result<()> {
    let o = untangle::parse(r#"<node id="5">This is text<subnode value="abc"/></node>"#)?;

    let node = o.child("node")?;
    let subnode = node.child("subnode")?;
    println!(
        "Node id = {}, subnode value = {}",
        node.attribute("id").unwrap_or_default(),
        subnode.attribute("value").unwrap_or_default()
    );
    println!("{}", node.text().unwrap_or_default());

    // Attributes are optional, children are not.
    assert_eq!(node.attribute("missing"), None);
    if let Err(err) = node.child("missing") {
        println!("{err}");
    }
    Ok(())
}
