//! Render an element tree to text

use std::fmt::Write as _;

use crate::config::WriterConfig;
use crate::xml::model::{XmlContent, XmlElement};

/// Render `root` as a complete document
pub fn render(root: &XmlElement, config: &WriterConfig) -> String {
    let mut out = String::new();
    if config.xml_declaration {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        if config.indent > 0 {
            out.push('\n');
        }
    }
    write_element(&mut out, root, 0, config.indent);
    if config.indent > 0 {
        out.push('\n');
    }
    out
}

fn write_element(out: &mut String, element: &XmlElement, depth: usize, indent: usize) {
    push_indent(out, depth, indent);
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        let _ = write!(out, " {name}=\"{}\"", escape(value, true));
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let text_only = element
        .children
        .iter()
        .all(|child| matches!(child, XmlContent::Text(_)));

    for child in &element.children {
        match child {
            XmlContent::Element(nested) => {
                if indent > 0 {
                    out.push('\n');
                }
                write_element(out, nested, depth + 1, indent);
            }
            XmlContent::Text(text) => out.push_str(&escape(text, false)),
        }
    }

    if !text_only && indent > 0 {
        out.push('\n');
        push_indent(out, depth, indent);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn push_indent(out: &mut String, depth: usize, indent: usize) {
    for _ in 0..depth.saturating_mul(indent) {
        out.push(' ');
    }
}

fn escape(input: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> XmlElement {
        let mut inner = XmlElement::new("dyn:dynElement");
        inner
            .attributes
            .insert("dyn:idRef".to_string(), "a<b".to_string());
        let mut list = XmlElement::new("dyn:listOfDynElements");
        list.children.push(XmlContent::Element(inner));
        let mut event = XmlElement::new("event");
        event.children.push(XmlContent::Element(list));
        event
    }

    #[test]
    fn test_render_compact() {
        let text = render(&sample(), &WriterConfig::compact());
        assert_eq!(
            text,
            "<event><dyn:listOfDynElements><dyn:dynElement dyn:idRef=\"a&lt;b\"/></dyn:listOfDynElements></event>"
        );
    }

    #[test]
    fn test_render_indented() {
        let text = render(&sample(), &WriterConfig::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(lines.get(1), Some(&"<event>"));
        assert_eq!(lines.get(2), Some(&"  <dyn:listOfDynElements>"));
        assert_eq!(lines.get(4), Some(&"  </dyn:listOfDynElements>"));
        assert_eq!(lines.get(5), Some(&"</event>"));
    }

    #[test]
    fn test_render_text_inline() {
        let mut note = XmlElement::new("p");
        note.children.push(XmlContent::Text("a & b".to_string()));
        assert_eq!(render(&note, &WriterConfig::default()).lines().nth(1), Some("<p>a &amp; b</p>"));
    }
}
