use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use tracing::debug;

use crate::error::ExtractError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Returns the attribute value, treating an empty value as absent.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn attr_equals(&self, name: &str, expected: &str) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|value| value == expected)
    }

    /// Direct character data of this element, concatenated in document order.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Pre-order walk over this element and every element below it.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn descendants(&self) -> impl Iterator<Item = &Element> {
        self.walk().skip(1)
    }
}

impl Drop for Element {
    // Unlinks the subtree onto a heap stack so deeply nested documents do not
    // exhaust the call stack when dropped.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Element(mut element) = node {
                pending.append(&mut element.children);
            }
        }
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(element.child_elements());
        self.stack[start..].reverse();
        Some(element)
    }
}

pub struct MarkupParser {
    leading_decoration: Regex,
    trailing_decoration: Regex,
}

impl MarkupParser {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            leading_decoration: Regex::new(r"^(?:\s+|export\s+default|[`'])*")?,
            trailing_decoration: Regex::new(r"[\s`';]*$")?,
        })
    }

    /// Removes the `export default` / quote wrapper left over when markup is
    /// embedded as source text.
    pub fn strip_decoration<'a>(&self, raw: &'a str) -> &'a str {
        let start = self
            .leading_decoration
            .find(raw)
            .map(|m| m.end())
            .unwrap_or(0);
        let rest = &raw[start..];
        let end = self
            .trailing_decoration
            .find(rest)
            .map(|m| m.start())
            .unwrap_or(rest.len());
        &rest[..end]
    }

    pub fn parse(&self, raw: &str) -> Result<Element, ExtractError> {
        let cleaned = self.strip_decoration(raw);
        debug!(
            input_len = cleaned.len(),
            preview = %cleaned.chars().take(100).collect::<String>(),
            "parsing markup"
        );
        parse_document(cleaned)
    }
}

fn parse_document(input: &str) -> Result<Element, ExtractError> {
    let mut reader = Reader::from_str(input);
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut pending_text = String::new();

    loop {
        let event = reader.read_event().map_err(|err| {
            ExtractError::Parse(format!("{err} at byte {}", reader.error_position()))
        })?;

        match event {
            Event::Start(start) => {
                flush_text(&mut open, &mut pending_text)?;
                ensure_single_root(&root, &start)?;
                open.push(open_element(&start)?);
            }
            Event::Empty(start) => {
                flush_text(&mut open, &mut pending_text)?;
                ensure_single_root(&root, &start)?;
                let element = open_element(&start)?;
                close_element(&mut open, &mut root, element);
            }
            Event::End(_) => {
                flush_text(&mut open, &mut pending_text)?;
                let element = open
                    .pop()
                    .ok_or_else(|| ExtractError::Parse("unexpected closing tag".to_string()))?;
                close_element(&mut open, &mut root, element);
            }
            Event::Text(text) => {
                let decoded = text
                    .decode()
                    .map_err(|err| ExtractError::Parse(err.to_string()))?;
                pending_text.push_str(&decoded);
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(data.as_ref())
                    .map_err(|err| ExtractError::Parse(err.to_string()))?;
                pending_text.push_str(text);
            }
            Event::GeneralRef(reference) => {
                let raw = reference
                    .decode()
                    .map_err(|err| ExtractError::Parse(err.to_string()))?;
                pending_text.push_str(&resolve_entity(&raw)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    flush_text(&mut open, &mut pending_text)?;
    if let Some(unclosed) = open.last() {
        return Err(ExtractError::Parse(format!(
            "unclosed element <{}>",
            unclosed.tag
        )));
    }

    root.ok_or_else(|| ExtractError::Parse("document has no root element".to_string()))
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, ExtractError> {
    let tag = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| ExtractError::Parse(err.to_string()))?
        .to_string();

    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr = attr.map_err(|err| ExtractError::Parse(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| ExtractError::Parse(err.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| ExtractError::Parse(err.to_string()))?;
        element.attributes.insert(key, value.into_owned());
    }

    Ok(element)
}

fn ensure_single_root(root: &Option<Element>, start: &BytesStart<'_>) -> Result<(), ExtractError> {
    if root.is_some() {
        return Err(ExtractError::Parse(format!(
            "unexpected element <{}> after the root element",
            String::from_utf8_lossy(start.name().as_ref())
        )));
    }
    Ok(())
}

fn close_element(open: &mut [Element], root: &mut Option<Element>, element: Element) {
    match open.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn flush_text(open: &mut [Element], pending_text: &mut String) -> Result<(), ExtractError> {
    if pending_text.trim().is_empty() {
        pending_text.clear();
        return Ok(());
    }

    let text = std::mem::take(pending_text);
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text));
            Ok(())
        }
        None => Err(ExtractError::Parse(format!(
            "text outside the root element: {:?}",
            text.trim()
        ))),
    }
}

fn resolve_entity(raw: &str) -> Result<String, ExtractError> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.to_string());
    }

    if let Some(rest) = raw.strip_prefix('#') {
        let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => rest.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map(|ch| ch.to_string())
            .ok_or_else(|| ExtractError::Parse(format!("invalid character reference &{raw};")));
    }

    Err(ExtractError::Parse(format!("unknown entity &{raw};")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MarkupParser {
        MarkupParser::new().expect("decoration patterns should compile")
    }

    #[test]
    fn strip_decoration_removes_export_wrapper() {
        let parser = parser();
        let raw = "export default `\n<div id=\"a\"></div>\n`;\n";
        assert_eq!(parser.strip_decoration(raw), "<div id=\"a\"></div>");
    }

    #[test]
    fn strip_decoration_is_idempotent() {
        let parser = parser();
        for raw in [
            "export default '<div/>';",
            "`<div>x</div>`",
            "<div>plain</div>",
            "  <div/>  \n\n",
            "``<div/>``",
            "export default export default <div/>",
            "export default ` export default '<div/>';",
            "<div/>'';",
            "<div/>`;\n`\n",
        ] {
            let once = parser.strip_decoration(raw);
            assert_eq!(parser.strip_decoration(once), once, "input: {raw:?}");
        }
    }

    #[test]
    fn strip_decoration_removes_stacked_wrappers() {
        let parser = parser();
        assert_eq!(parser.strip_decoration("``<div/>``"), "<div/>");
        assert_eq!(
            parser.strip_decoration("export default export default <div/>"),
            "<div/>"
        );
        assert_eq!(parser.strip_decoration("<div/>'';"), "<div/>");
        assert_eq!(parser.strip_decoration("``"), "");
    }

    #[test]
    fn deeply_nested_tree_parses_and_drops() {
        let depth = 200_000;
        let raw = format!("{}{}", "<g>".repeat(depth), "</g>".repeat(depth));

        let root = parser().parse(&raw).expect("deep markup should parse");
        assert_eq!(root.walk().count(), depth);
        drop(root);
    }

    #[test]
    fn parse_builds_attributed_tree_with_text() {
        let root = parser()
            .parse(r#"<div class="outer"><span fdtType="label">First &amp; Last</span><rect/></div>"#)
            .expect("markup should parse");

        assert_eq!(root.tag, "div");
        assert_eq!(root.attr("class"), Some("outer"));

        let children: Vec<_> = root.child_elements().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].text(), "First & Last");
        assert_eq!(children[1].tag, "rect");
        assert!(children[1].children.is_empty());
    }

    #[test]
    fn parse_resolves_character_references_and_cdata() {
        let root = parser()
            .parse("<p>&#65;&#x42;<![CDATA[<c>]]></p>")
            .expect("markup should parse");
        assert_eq!(root.text(), "AB<c>");
    }

    #[test]
    fn parse_drops_whitespace_only_text() {
        let root = parser()
            .parse("<div>\n  <g/>\n  <g/>\n</div>")
            .expect("markup should parse");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.text(), "");
    }

    #[test]
    fn parse_rejects_malformed_markup() {
        let parser = parser();
        for raw in [
            "",
            "<div><span></div>",
            "<div>",
            "<div/><div/>",
            "stray <div/>",
            "<div>&bogus;</div>",
        ] {
            let err = parser.parse(raw).expect_err("markup should be rejected");
            assert!(matches!(err, ExtractError::Parse(_)), "input: {raw:?}");
        }
    }

    #[test]
    fn attr_treats_empty_value_as_absent() {
        let mut element = Element::new("g");
        element
            .attributes
            .insert("fdtFieldName".to_string(), String::new());
        assert_eq!(element.attr("fdtFieldName"), None);
        assert!(element.attr_equals("fdtFieldName", ""));
    }

    #[test]
    fn walk_visits_in_document_pre_order() {
        let root = parser()
            .parse(r#"<a><b><c/></b><d/></a>"#)
            .expect("markup should parse");
        let tags: Vec<_> = root.walk().map(|element| element.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b", "c", "d"]);

        let below: Vec<_> = root
            .descendants()
            .map(|element| element.tag.as_str())
            .collect();
        assert_eq!(below, vec!["b", "c", "d"]);
    }
}
