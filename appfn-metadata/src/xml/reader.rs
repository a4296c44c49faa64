//! XML reader: text to element tree
//!
//! A small scanner covering exactly the subset the writer emits: a leading
//! declaration, nested elements without attributes, escaped text content,
//! and self-closing empty elements.

use super::XmlElement;
use crate::error::DecodeError;

/// Parse a complete XML document produced by [`super::writer::write_document`].
pub fn parse_document(input: &str) -> Result<XmlElement, DecodeError> {
    let mut scanner = Scanner { input, pos: 0 };
    scanner.skip_whitespace();
    scanner.skip_declaration()?;
    scanner.skip_whitespace();
    let root = scanner.parse_element()?;
    scanner.skip_whitespace();
    if !scanner.at_end() {
        return Err(scanner.error("trailing content after document root"));
    }
    Ok(root)
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, message: &str) -> DecodeError {
        DecodeError::Xml(format!("{} at offset {}", message, self.pos))
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn skip_declaration(&mut self) -> Result<(), DecodeError> {
        if self.rest().starts_with("<?") {
            match self.rest().find("?>") {
                Some(end) => self.pos += end + 2,
                None => return Err(self.error("unterminated XML declaration")),
            }
        }
        Ok(())
    }

    fn expect(&mut self, token: &str) -> Result<(), DecodeError> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", token)))
        }
    }

    fn read_name(&mut self) -> Result<String, DecodeError> {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected element name"));
        }
        let name = &rest[..end];
        if !name.as_bytes()[0].is_ascii_alphabetic() {
            return Err(self.error("element name must start with a letter"));
        }
        self.pos += end;
        Ok(name.to_string())
    }

    fn parse_element(&mut self) -> Result<XmlElement, DecodeError> {
        self.expect("<")?;
        let name = self.read_name()?;

        if self.rest().starts_with("/>") {
            self.pos += 2;
            return Ok(XmlElement::new(name));
        }
        self.expect(">")?;

        let mut element = XmlElement::new(&name);
        loop {
            let run = self.take_text_run()?;
            if self.rest().starts_with("</") {
                if element.children.is_empty() {
                    element.text = unescape(run).map_err(|message| {
                        DecodeError::Xml(format!("{} in <{}>", message, name))
                    })?;
                } else if !run.trim().is_empty() {
                    return Err(self.error("mixed text and child elements"));
                }
                self.pos += 2;
                let close_name = self.read_name()?;
                if close_name != name {
                    return Err(self.error(&format!(
                        "mismatched closing tag </{}> for <{}>",
                        close_name, name
                    )));
                }
                self.skip_whitespace();
                self.expect(">")?;
                return Ok(element);
            }
            if !run.trim().is_empty() {
                return Err(self.error("mixed text and child elements"));
            }
            element.push(self.parse_element()?);
        }
    }

    /// Consume raw text up to the next `<`. The document must not end inside
    /// an open element.
    fn take_text_run(&mut self) -> Result<&'a str, DecodeError> {
        match self.rest().find('<') {
            Some(offset) => {
                let run = &self.rest()[..offset];
                self.pos += offset;
                Ok(run)
            }
            None => Err(self.error("unexpected end of input inside element")),
        }
    }
}

fn unescape(text: &str) -> Result<String, String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest
            .find(';')
            .ok_or_else(|| "unterminated entity".to_string())?;
        match &rest[..=end] {
            "&amp;" => out.push('&'),
            "&lt;" => out.push('<'),
            "&gt;" => out.push('>'),
            "&quot;" => out.push('"'),
            "&apos;" => out.push('\''),
            other => return Err(format!("unknown entity {}", other)),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::writer::write_document;

    #[test]
    fn test_parse_simple() {
        let root = parse_document("<a><b>text</b><c/></a>").expect("parse");
        assert_eq!(root.name, "a");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.child("b").unwrap().text, "text");
        assert_eq!(root.child("c").unwrap().text, "");
    }

    #[test]
    fn test_parse_with_declaration_and_whitespace() {
        let input = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<a>\n    <b>x</b>\n</a>\n";
        let root = parse_document(input).expect("parse");
        assert_eq!(root.child("b").unwrap().text, "x");
    }

    #[test]
    fn test_entities_unescaped() {
        let root = parse_document("<a>5 &lt; 6 &amp;&amp; 7 &gt; 2</a>").expect("parse");
        assert_eq!(root.text, "5 < 6 && 7 > 2");
    }

    #[test]
    fn test_mismatched_close_rejected() {
        assert!(parse_document("<a><b>x</c></a>").is_err());
    }

    #[test]
    fn test_trailing_content_rejected() {
        assert!(parse_document("<a/>junk").is_err());
    }

    #[test]
    fn test_unterminated_rejected() {
        assert!(parse_document("<a><b>text").is_err());
    }

    #[test]
    fn test_writer_output_round_trips() {
        let mut root = XmlElement::new("outer");
        root.push(XmlElement::with_text("inner", "a < b"));
        let mut list = XmlElement::new("list");
        list.push(XmlElement::with_text("value", "one"));
        list.push(XmlElement::with_text("value", "two"));
        root.push(list);
        root.push(XmlElement::new("empty"));

        let text = write_document(&root);
        let parsed = parse_document(&text).expect("parse writer output");
        assert_eq!(parsed, root);
    }
}
