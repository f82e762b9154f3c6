//! Iterating over a group of siblings.
//!
//! Run with `cargo run --example siblings`.

use untangle::Result;

fn main() -> Result<()> {
    let o = untangle::parse(
        r#"
        <root>
            <child name="child1"/>
            <child name="child2"/>
            <child name="child3"/>
            <only-child name="alone"/>
        </root>
        "#,
    )?;

    let root = o.child("root")?;
    let names: Vec<&str> = root
        .child("child")?
        .iter()
        .filter_map(|child| child.attribute("name"))
        .collect();
    println!("{}", names.join(","));

    // A single match iterates the same way.
    for child in &root.child("only_child")? {
        println!("{}", child.attribute("name").unwrap_or_default());
    }
    Ok(())
}
