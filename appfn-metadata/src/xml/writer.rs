//! XML writer: element tree to text

use super::XmlElement;

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";
const INDENT: &str = "    ";

/// Render an element tree as a complete XML document with declaration.
pub fn write_document(root: &XmlElement) -> String {
    let mut out = String::new();
    out.push_str(DECLARATION);
    out.push('\n');
    write_element(root, &mut out, 0);
    out
}

fn write_element(element: &XmlElement, out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    if element.children.is_empty() && element.text.is_empty() {
        out.push('<');
        out.push_str(&element.name);
        out.push_str("/>\n");
        return;
    }
    out.push('<');
    out.push_str(&element.name);
    out.push('>');

    if element.children.is_empty() {
        out.push_str(&escape(&element.text));
    } else {
        out.push('\n');
        for child in &element.children {
            write_element(child, out, depth + 1);
        }
        for _ in 0..depth {
            out.push_str(INDENT);
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push_str(">\n");
}

/// Escape text content for element bodies.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
