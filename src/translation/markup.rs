/*!
 * Chapter markup parsing and serialization.
 *
 * Plain HTML chapters go through html5ever both ways. XHTML chapters (the
 * usual EPUB case) are parsed with xml5ever so that `<tag/>` stays empty,
 * and are written back as XML: the text before the root element is copied
 * verbatim and namespace declarations are re-emitted where they are in scope.
 */

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, QualName};
use log::warn;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use xml5ever::driver::{parse_document as parse_xml_document, XmlParseOpts};

use crate::errors::MarkupError;

/// Elements that never have content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr", "keygen",
];

/// Elements whose text is never prose
const NON_PROSE_ELEMENTS: &[&str] = &["script", "style", "template"];

static XML_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\A\s*<\?xml|<html[^>]*\sxmlns\s*="#).expect("valid regex")
});

static NAMESPACE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\sxmlns(?::([^\s=/>]+))?\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Prefix ("" for the default namespace) to namespace URI
type Namespaces = BTreeMap<String, String>;

/// How a chapter is parsed and written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupFlavor {
    /// HTML parsing and serialization rules
    Html,
    /// XML parsing, well-formed XML output
    Xhtml,
}

impl MarkupFlavor {
    /// Detect the flavor from the file extension and the document prologue
    pub fn detect(path: &Path, source: &str) -> Self {
        let is_xhtml_ext = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("xhtml"))
            .unwrap_or(false);

        let head: String = source.chars().take(2048).collect();
        if is_xhtml_ext || XML_MARKER.is_match(&head) {
            MarkupFlavor::Xhtml
        } else {
            MarkupFlavor::Html
        }
    }
}

/// Source text around the root element, reproduced on output
#[derive(Debug, Clone)]
struct SourceFrame {
    /// Everything before the root start tag (declaration, doctype, comments)
    prolog: String,
    /// Namespace declarations written on the root start tag
    root_namespaces: Vec<(String, String)>,
    /// Whitespace after the last markup
    trailer: String,
}

impl SourceFrame {
    fn capture(source: &str) -> Option<Self> {
        let (start, end) = root_start_tag(source)?;
        let root_namespaces = NAMESPACE_DECLARATION
            .captures_iter(&source[start..end])
            .map(|caps| {
                let prefix = caps.get(1).map_or("", |m| m.as_str()).to_string();
                let uri = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str()).to_string();
                (prefix, uri)
            })
            .collect();

        Some(Self {
            prolog: source[..start].to_string(),
            root_namespaces,
            trailer: source[source.trim_end().len()..].to_string(),
        })
    }
}

/// A parsed chapter
pub struct ChapterDocument {
    dom: RcDom,
    flavor: MarkupFlavor,
    frame: Option<SourceFrame>,
}

impl ChapterDocument {
    /// Parse markup text
    ///
    /// XHTML that turns out to use HTML-only syntax (unclosed void elements)
    /// is read with the HTML parser instead, still written back as XML.
    pub fn parse(source: &str, flavor: MarkupFlavor) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        match flavor {
            MarkupFlavor::Html => Self {
                dom: parse_html(source),
                flavor,
                frame: None,
            },
            MarkupFlavor::Xhtml => {
                let dom = parse_xml_document(RcDom::default(), XmlParseOpts::default()).one(source);
                let dom = if is_usable_xml_tree(&dom) {
                    dom
                } else {
                    warn!(
                        "Chapter is not well-formed XHTML ({} parse errors), reading it as HTML",
                        dom.errors.borrow().len()
                    );
                    parse_html(source)
                };
                Self {
                    dom,
                    flavor,
                    frame: SourceFrame::capture(source),
                }
            }
        }
    }

    /// Parse the raw bytes of a chapter file
    pub fn from_bytes(bytes: Vec<u8>, path: &Path) -> Result<Self, MarkupError> {
        let source = String::from_utf8(bytes)
            .map_err(|e| MarkupError::Parse(format!("{} is not valid UTF-8: {}", path.display(), e)))?;
        let flavor = MarkupFlavor::detect(path, &source);
        Ok(Self::parse(&source, flavor))
    }

    /// Root node of the tree
    pub fn root(&self) -> &Handle {
        &self.dom.document
    }

    /// Output flavor
    pub fn flavor(&self) -> MarkupFlavor {
        self.flavor
    }

    /// All prose text in document order, one space between nodes
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.dom.document, &mut text);
        text
    }

    /// Serialize the (possibly modified) tree
    pub fn serialize(&self) -> Result<Vec<u8>, MarkupError> {
        let mut buf = Vec::new();
        let top_level = Namespaces::new();
        match (self.flavor, &self.frame) {
            (MarkupFlavor::Html, _) => {
                let serializable = SerializableHandle::from(self.dom.document.clone());
                serialize(&mut buf, &serializable, SerializeOpts::default())?;
            }
            (MarkupFlavor::Xhtml, Some(frame)) => {
                buf.write_all(frame.prolog.as_bytes())?;
                let mut after_root = false;
                for child in self.dom.document.children.borrow().iter() {
                    match child.data {
                        NodeData::Element { .. } if !after_root => {
                            write_xml_element(&mut buf, child, &top_level, &frame.root_namespaces)?;
                            after_root = true;
                        }
                        _ if after_root => write_xml_node(&mut buf, child, &top_level)?,
                        // Already part of the verbatim prolog
                        _ => {}
                    }
                }
                buf.write_all(frame.trailer.as_bytes())?;
            }
            (MarkupFlavor::Xhtml, None) => {
                for child in self.dom.document.children.borrow().iter() {
                    write_xml_node(&mut buf, child, &top_level)?;
                }
            }
        }
        Ok(buf)
    }
}

fn parse_html(source: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(source)
}

/// A root element exists and no void element swallowed content
fn is_usable_xml_tree(dom: &RcDom) -> bool {
    let children = dom.document.children.borrow();
    let root = children
        .iter()
        .find(|child| matches!(child.data, NodeData::Element { .. }));
    root.is_some_and(|root| !has_filled_void_element(root))
}

fn has_filled_void_element(node: &Handle) -> bool {
    if let NodeData::Element { ref name, .. } = node.data {
        if VOID_ELEMENTS.contains(&&*name.local) && !node.children.borrow().is_empty() {
            return true;
        }
    }
    node.children.borrow().iter().any(has_filled_void_element)
}

/// Byte range of the root element's start tag
fn root_start_tag(source: &str) -> Option<(usize, usize)> {
    let mut pos = 0;
    while let Some(offset) = source[pos..].find('<') {
        let start = pos + offset;
        let rest = &source[start..];
        pos = if rest.starts_with("<?") {
            start + rest.find("?>")? + 2
        } else if rest.starts_with("<!--") {
            start + rest.find("-->")? + 3
        } else if rest.starts_with("<!") {
            start + markup_end(rest)?
        } else {
            return Some((start, start + markup_end(rest)?));
        };
    }
    None
}

/// Length of the markup declaration or tag at the start of `text`
fn markup_end(text: &str) -> Option<usize> {
    let mut quote = None;
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn collect_text(node: &Handle, out: &mut String) {
    match node.data {
        NodeData::Text { ref contents } => {
            let contents = contents.borrow();
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        }
        NodeData::Element { ref name, .. } if NON_PROSE_ELEMENTS.contains(&&*name.local) => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace("]]>", "]]&gt;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn is_namespace_declaration(name: &QualName) -> bool {
    name.prefix.as_deref() == Some("xmlns") || &*name.local == "xmlns" || name.local.starts_with("xmlns:")
}

/// Declare `prefix` unless it already maps to `uri`
fn require_namespace(scope: &Namespaces, declarations: &mut Vec<(String, String)>, prefix: &str, uri: &str) {
    let bound = declarations
        .iter()
        .rev()
        .find(|(p, _)| p == prefix)
        .map(|(_, u)| u.as_str())
        .or_else(|| scope.get(prefix).map(String::as_str))
        .unwrap_or("");
    if bound != uri {
        declarations.push((prefix.to_string(), uri.to_string()));
    }
}

fn write_xml_node<W: Write>(out: &mut W, node: &Handle, scope: &Namespaces) -> io::Result<()> {
    match node.data {
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                write_xml_node(out, child, scope)?;
            }
        }
        NodeData::Doctype { ref name, ref public_id, ref system_id } => {
            write!(out, "<!DOCTYPE {}", name)?;
            if !public_id.is_empty() {
                write!(out, " PUBLIC \"{}\" \"{}\"", public_id, system_id)?;
            } else if !system_id.is_empty() {
                write!(out, " SYSTEM \"{}\"", system_id)?;
            }
            write!(out, ">")?;
        }
        NodeData::Text { ref contents } => {
            write!(out, "{}", escape_text(&contents.borrow()))?;
        }
        NodeData::Comment { ref contents } => {
            // The HTML parser keeps `<?xml ...?>` as a bogus comment
            if contents.starts_with('?') && contents.ends_with('?') {
                write!(out, "<{}>", contents)?;
            } else {
                write!(out, "<!--{}-->", contents)?;
            }
        }
        NodeData::ProcessingInstruction { ref target, ref contents } => {
            write!(out, "<?{} {}?>", target, contents)?;
        }
        NodeData::Element { .. } => write_xml_element(out, node, scope, &[])?,
    }
    Ok(())
}

/// Write an element, declaring `declared` plus any namespace not yet in scope
fn write_xml_element<W: Write>(
    out: &mut W,
    node: &Handle,
    scope: &Namespaces,
    declared: &[(String, String)],
) -> io::Result<()> {
    let NodeData::Element { ref name, ref attrs, .. } = node.data else {
        return write_xml_node(out, node, scope);
    };
    let attrs = attrs.borrow();

    let mut declarations = declared.to_vec();
    require_namespace(scope, &mut declarations, name.prefix.as_deref().unwrap_or(""), &name.ns);
    for attr in attrs.iter().filter(|attr| !is_namespace_declaration(&attr.name)) {
        if let Some(prefix) = attr.name.prefix.as_deref().filter(|p| !p.is_empty() && *p != "xml") {
            require_namespace(scope, &mut declarations, prefix, &attr.name.ns);
        }
    }

    let tag = qualified(name.prefix.as_deref(), &name.local);
    write!(out, "<{}", tag)?;
    for (prefix, uri) in &declarations {
        if prefix.is_empty() {
            write!(out, " xmlns=\"{}\"", escape_attr(uri))?;
        } else {
            write!(out, " xmlns:{}=\"{}\"", prefix, escape_attr(uri))?;
        }
    }
    for attr in attrs.iter().filter(|attr| !is_namespace_declaration(&attr.name)) {
        let attr_name = qualified(attr.name.prefix.as_deref(), &attr.name.local);
        write!(out, " {}=\"{}\"", attr_name, escape_attr(&attr.value))?;
    }

    let children = node.children.borrow();
    if children.is_empty() && VOID_ELEMENTS.contains(&&*name.local) {
        return write!(out, "/>");
    }

    write!(out, ">")?;
    let inner: Cow<'_, Namespaces> = if declarations.is_empty() {
        Cow::Borrowed(scope)
    } else {
        let mut inner = scope.clone();
        inner.extend(declarations);
        Cow::Owned(inner)
    };
    for child in children.iter() {
        write_xml_node(out, child, &inner)?;
    }
    write!(out, "</{}>", tag)
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}
