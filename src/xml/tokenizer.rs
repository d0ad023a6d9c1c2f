//! Pull tokenizer producing start/end/text events with namespace resolution

use indexmap::IndexMap;

use crate::config::ReaderConfig;
use crate::error::{Error, ErrorKind, Result, Span};
use crate::xml::cursor::Cursor;
use crate::xml::event::{QName, XmlAttribute, XmlEvent};
use crate::xml::XML_NAMESPACE;

/// XML pull tokenizer
///
/// Comments, processing instructions and doctype declarations are skipped.
/// Namespace declarations are stripped from the attribute list and reported
/// separately on the start event.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    cursor: Cursor<'a>,
    config: ReaderConfig,
    open: Vec<QName>,
    scopes: Vec<IndexMap<String, String>>,
    pending_end: Option<(QName, Option<String>)>,
    root_seen: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer with default limits
    pub fn new(input: &'a [u8]) -> Result<Self> {
        Self::with_config(input, ReaderConfig::default())
    }

    /// Create a tokenizer with custom limits
    pub fn with_config(input: &'a [u8], config: ReaderConfig) -> Result<Self> {
        if config.max_size > 0 && input.len() > config.max_size {
            return Err(Error::new(ErrorKind::MaxSizeExceeded {
                max: config.max_size,
            }));
        }
        Ok(Self {
            cursor: Cursor::new(input),
            config,
            open: Vec::new(),
            scopes: Vec::new(),
            pending_end: None,
            root_seen: false,
        })
    }

    /// Current element nesting depth
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Pull the next event; `None` once the root element has closed
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        if let Some((name, namespace_uri)) = self.pending_end.take() {
            self.scopes.pop();
            return Ok(Some(XmlEvent::EndElement {
                name,
                namespace_uri,
            }));
        }

        loop {
            if self.cursor.is_eof() {
                if !self.open.is_empty() {
                    return Err(self.error_here("unterminated element"));
                }
                if !self.root_seen {
                    return Err(self.error_here("no root element"));
                }
                return Ok(None);
            }

            if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
                continue;
            }

            if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
                continue;
            }

            if self.cursor.starts_with(b"<![CDATA[") {
                if self.open.is_empty() {
                    return Err(self.error_here("character data outside root element"));
                }
                self.cursor.advance_by(9);
                let start = self.cursor.pos();
                self.skip_until(b"]]>")?;
                let raw = self.cursor.slice_from(start);
                let raw = raw.get(..raw.len().saturating_sub(3)).unwrap_or_default();
                return Ok(Some(XmlEvent::Text(bytes_to_string(raw)?)));
            }

            if self.cursor.starts_with(b"<!") {
                self.skip_until(b">")?;
                continue;
            }

            if self.cursor.starts_with(b"</") {
                return self.parse_end_element().map(Some);
            }

            if self.cursor.current() == Some(b'<') {
                if self.open.is_empty() && self.root_seen {
                    return Err(self.error_here("content after root element"));
                }
                return self.parse_start_element().map(Some);
            }

            if self.open.is_empty() {
                self.cursor.skip_whitespace();
                if !self.cursor.is_eof() && self.cursor.current() != Some(b'<') {
                    return Err(self.error_here("text outside root element"));
                }
                continue;
            }

            if let Some(text) = self.parse_text()? {
                return Ok(Some(XmlEvent::Text(text)));
            }
        }
    }

    fn parse_start_element(&mut self) -> Result<XmlEvent> {
        let pos = self.cursor.position();
        self.expect_byte(b'<')?;
        let raw_name = self.parse_name()?;
        let raw_attributes = self.parse_attributes()?;

        let self_closing = self.cursor.consume(b'/');
        self.expect_byte(b'>')?;

        let mut namespaces = IndexMap::new();
        let mut plain = Vec::new();
        for (name, value) in raw_attributes {
            if name == "xmlns" {
                namespaces.insert(String::new(), value);
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                namespaces.insert(prefix.to_string(), value);
            } else {
                plain.push((QName::parse(&name), value));
            }
        }
        self.scopes.push(namespaces.clone());

        let name = QName::parse(&raw_name);
        let namespace_uri = self.resolve(name.prefix.as_deref().unwrap_or_default(), &raw_name)?;

        let mut attributes = Vec::with_capacity(plain.len());
        for (attr_name, value) in plain {
            let attr_namespace = match attr_name.prefix.as_deref() {
                Some(prefix) => self.resolve(prefix, &attr_name.to_string())?,
                None => None,
            };
            attributes.push(XmlAttribute {
                name: attr_name,
                namespace_uri: attr_namespace,
                value,
            });
        }

        let max = self.config.max_depth;
        if max > 0 && self.open.len() >= usize::from(max) {
            return Err(Error::with_message(
                ErrorKind::MaxDepthExceeded { max },
                Span::at(pos),
                format!("max depth exceeded: {max}"),
            ));
        }

        self.root_seen = true;
        if self_closing {
            self.pending_end = Some((name.clone(), namespace_uri.clone()));
        } else {
            self.open.push(name.clone());
        }

        Ok(XmlEvent::StartElement {
            name,
            namespace_uri,
            attributes,
            namespaces,
            pos,
        })
    }

    fn parse_end_element(&mut self) -> Result<XmlEvent> {
        self.cursor.advance_by(2);
        let raw_name = self.parse_name()?;
        self.cursor.skip_whitespace();
        self.expect_byte(b'>')?;

        let name = QName::parse(&raw_name);
        match self.open.pop() {
            Some(open) if open == name => {}
            Some(_) => return Err(self.error_here("mismatched closing tag")),
            None => return Err(self.error_here("unexpected closing tag")),
        }
        let namespace_uri = self.resolve(name.prefix.as_deref().unwrap_or_default(), &raw_name)?;
        self.scopes.pop();

        Ok(XmlEvent::EndElement {
            name,
            namespace_uri,
        })
    }

    /// Look a prefix up through the open scopes; "" is the default namespace
    fn resolve(&self, prefix: &str, qualified: &str) -> Result<Option<String>> {
        if prefix == "xml" {
            return Ok(Some(XML_NAMESPACE.to_string()));
        }
        let bound = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .filter(|uri| !uri.is_empty())
            .cloned();
        if bound.is_none() && !prefix.is_empty() {
            return Err(self.error_here(&format!("unbound prefix in '{qualified}'")));
        }
        Ok(bound)
    }

    fn parse_attributes(&mut self) -> Result<Vec<(String, String)>> {
        let mut attrs: Vec<(String, String)> = Vec::new();

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/') | Some(b'>') => break,
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input")),
            }

            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.iter().any(|(existing, _)| *existing == name) {
                return Err(self.error_here(&format!("duplicate attribute '{name}'")));
            }
            attrs.push((name, value));
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b'"') => b'"',
            Some(b'\'') => b'\'',
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let text = bytes_to_string(raw)?;
                return self.decode_entities(&text);
            }
            self.cursor.advance();
        }

        Err(self.error_here("unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<Option<String>> {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = bytes_to_string(raw)?;
        let text = self.decode_entities(&text)?;

        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let Some(first) = self.cursor.current() else {
            return Err(self.error_here("expected name"));
        };
        if !is_name_start(first) {
            return Err(self.error_here("invalid name"));
        }

        let start = self.cursor.pos();
        self.cursor.advance();
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        bytes_to_string(self.cursor.slice_from(start))
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        while self.cursor.current().is_some() {
            if self.cursor.starts_with(pattern) {
                self.cursor.advance_by(pattern.len());
                return Ok(());
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated markup"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else {
            Err(self.error_here("unexpected token"))
        }
    }

    fn decode_entities(&self, input: &str) -> Result<String> {
        decode_entities(input).ok_or_else(|| self.error_here("invalid xml entity"))
    }

    fn error_here(&self, message: &str) -> Error {
        Error::syntax(self.cursor.position(), message)
    }
}

fn bytes_to_string(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| Error::with_message(ErrorKind::Syntax, Span::default(), "invalid utf-8"))
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn decode_entities(input: &str) -> Option<String> {
    if !input.contains('&') {
        return Some(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '&' {
            result.push(ch);
            continue;
        }

        let mut entity = String::new();
        let mut terminated = false;
        for next in chars.by_ref() {
            if next == ';' {
                terminated = true;
                break;
            }
            entity.push(next);
        }
        if !terminated {
            return None;
        }

        let decoded = match entity.as_str() {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(&entity),
        };
        result.push(decoded?);
    }

    Some(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}
