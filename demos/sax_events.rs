//! Printing the SAX event stream with logging turned on.
//!
//! Run with `cargo run --example sax_events -- path/to/file.xml`, or with no
//! argument to use a built-in document.

use std::fs::File;
use std::io::BufReader;

use tracing::Level;
use untangle::sax::{parse_sax, parse_sax_str, SaxHandler};
use untangle::{Error, ParseOptions};

struct Printer {
    depth: usize,
}

impl SaxHandler for Printer {
    fn start_element(&mut self, name: &str, attributes: &[(String, String)]) -> Result<(), Error> {
        println!("{:indent$}<{name}> {attributes:?}", "", indent = self.depth * 2);
        self.depth += 1;
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.depth -= 1;
        println!("{:indent$}</{name}>", "", indent = self.depth * 2);
        Ok(())
    }

    fn characters(&mut self, content: &str) -> Result<(), Error> {
        let content = content.trim();
        if !content.is_empty() {
            println!("{:indent$}{content:?}", "", indent = self.depth * 2);
        }
        Ok(())
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let options = ParseOptions::default().namespaces(true);
    let mut printer = Printer { depth: 0 };
    match std::env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).map_err(|source| Error::Open {
                path: path.into(),
                source,
            })?;
            parse_sax(BufReader::new(file), &options, &mut printer)
        }
        None => parse_sax_str(
            r#"<!DOCTYPE doc [<!ENTITY who "world">]>
<x:doc xmlns:x="urn:example" x:lang="en">hello &who;<x:item n="1"/></x:doc>"#,
            &options,
            &mut printer,
        ),
    }
}
