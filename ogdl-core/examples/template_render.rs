//! Render a small template against an inline context.
//!
//! Usage: cargo run --example template_render

use ogdl_core::{parse_template, process, Graph};

const TEMPLATE: &str = "\
Hello $user.name!
$if(user.admin)You have the keys.
$end$for(i, items)- $i
$end";

const CONTEXT: &str = "\
user
  name ada
  admin 1
items
  compiler
  parser
  printer
";

fn main() {
    let template = parse_template(TEMPLATE).expect("template parses");
    let mut ctx = Graph::parse(CONTEXT).expect("context parses");
    let out = process(&template, &mut ctx);
    print!("{}", String::from_utf8_lossy(&out));
}
