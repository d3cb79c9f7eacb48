//! Parse OGDL from stdin and print the canonical form.
//!
//! Usage: cargo run --example simple_parse < file.ogdl

use std::io::Read;

use ogdl_core::Graph;

fn main() {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("could not read stdin");
        std::process::exit(1);
    }

    match Graph::parse(&input) {
        Ok(g) => {
            println!("{}", g.text());
            eprintln!("({} top-level nodes)", g.len());
        }
        Err(e) => {
            eprintln!("parse error: {e}");
            std::process::exit(1);
        }
    }
}
