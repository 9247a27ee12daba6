//! Output formatting for parsed payloads.
//!
//! Parsed content goes to stdout so it can be piped; status lines and
//! diagnostics go to stderr.

use std::fmt::Write as _;

use crate::sheet::Worksheet;
use crate::xml::{Element, Node};

/// Render a worksheet as tab-separated lines.
///
/// Values containing a tab, newline or double quote are quoted the way
/// spreadsheet applications export text.
pub fn render_tsv(sheet: &Worksheet) -> String {
    let mut out = String::new();
    for row in &sheet.rows {
        let line: Vec<String> = row.iter().map(|c| quote_field(c.display())).collect();
        out.push_str(&line.join("\t"));
        out.push('\n');
    }
    out
}

fn quote_field(value: &str) -> String {
    if value.contains(['\t', '\n', '\r', '"']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Print all worksheets, with a name header when there is more than one.
pub fn print_worksheets(sheets: &[Worksheet]) {
    if sheets.is_empty() {
        eprintln!("Workbook has no worksheets");
        return;
    }

    for (i, sheet) in sheets.iter().enumerate() {
        if sheets.len() > 1 {
            if i > 0 {
                println!();
            }
            println!("# {}", sheet.name);
        }
        print!("{}", render_tsv(sheet));
    }
}

/// Render an element and its descendants, two spaces per level.
///
/// Whitespace-only text is skipped.
/// Namespaces are shown where they change.
pub fn render_tree(root: &Element) -> String {
    let mut out = String::new();
    write_element(&mut out, root, None, 0);
    out
}

fn write_element(out: &mut String, el: &Element, parent_ns: Option<&str>, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}<{}", el.name());
    if let Some(ns) = el.namespace()
        && Some(ns) != parent_ns
    {
        let _ = write!(out, " xmlns={ns:?}");
    }
    for attr in el.attributes() {
        let _ = write!(out, " {}={:?}", attr.name, attr.value);
    }
    out.push_str(">\n");

    for node in el.children() {
        match node {
            Node::Element(child) => write_element(out, child, el.namespace(), depth + 1),
            Node::Text(text) if !text.trim().is_empty() => {
                let _ = writeln!(out, "{indent}  {:?}", text.trim());
            }
            Node::Text(_) => {}
        }
    }
}

/// Print format names, one per line.
pub fn print_formats(formats: &[String]) {
    if formats.is_empty() {
        eprintln!("Clipboard offers no formats");
        return;
    }
    for name in formats {
        println!("{name}");
    }
}
