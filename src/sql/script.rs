//! Conditional statement scripts.
//!
//! A script is a small tree of fragments. Plain text is always emitted;
//! [`Node::When`] emits its body only if a record property is present, and the
//! trimming nodes drop dangling separators left behind by omitted fragments.
//! Rendering walks the tree once, emitting placeholders and collecting the
//! bound values in placeholder order.

use std::fmt;

use xxhash_rust::xxh64::Xxh64;

use crate::model::{FieldAccess, Value};
use crate::sql::Dialect;
use crate::error::{Result, TesseraError};

const WHERE_PREFIX_OVERRIDES: &[&str] = &["AND ", "OR "];
const SET_SUFFIX_OVERRIDES: &[&str] = &[","];

/// Source of a placeholder's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Property of the bound record.
    Property(String),
    /// The bound key.
    Key,
    /// Current key of a [`Collection::Keys`] loop.
    Element,
    /// Property of the current record of a [`Collection::Batch`] loop.
    ElementProperty(String),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Property(name) => write!(f, "#{{{name}}}"),
            Binding::Key => f.write_str("#{key}"),
            Binding::Element => f.write_str("#{item}"),
            Binding::ElementProperty(name) => write!(f, "#{{item.{name}}}"),
        }
    }
}

/// Collection iterated by [`Node::ForEach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Bound key set.
    Keys,
    /// Bound batch of records.
    Batch,
}

impl Collection {
    fn as_str(&self) -> &'static str {
        match self {
            Collection::Keys => "keys",
            Collection::Batch => "list",
        }
    }
}

/// Script fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Literal SQL text.
    Text(String),
    /// Placeholder.
    Bind(Binding),
    /// Body emitted only when the record property is non-null.
    When {
        /// Property tested on the bound record.
        property: String,
        /// Conditional body.
        body: Vec<Node>,
    },
    /// Body wrapped in `prefix`/`suffix` with leading and trailing overrides
    /// stripped; nothing is emitted when the body renders empty.
    Trim {
        /// Emitted before non-empty content.
        prefix: &'static str,
        /// Emitted after non-empty content.
        suffix: &'static str,
        /// Leading tokens removed from the content.
        prefix_overrides: &'static [&'static str],
        /// Trailing tokens removed from the content.
        suffix_overrides: &'static [&'static str],
        /// Trimmed body.
        body: Vec<Node>,
    },
    /// `WHERE` clause; a leading `AND`/`OR` is dropped, an empty body emits nothing.
    Where(Vec<Node>),
    /// `SET` clause; a trailing comma is dropped.
    Set(Vec<Node>),
    /// Body repeated for each element of a bound collection.
    ForEach {
        /// Iterated collection.
        collection: Collection,
        /// Emitted before the first element.
        open: &'static str,
        /// Emitted between elements.
        separator: &'static str,
        /// Emitted after the last element.
        close: &'static str,
        /// Per-element body.
        body: Vec<Node>,
    },
}

impl Node {
    /// Literal text.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// Placeholder for a record property.
    pub fn property(name: impl Into<String>) -> Self {
        Node::Bind(Binding::Property(name.into()))
    }

    /// Body guarded by a presence test on `property`.
    pub fn when(property: impl Into<String>, body: Vec<Node>) -> Self {
        Node::When {
            property: property.into(),
            body,
        }
    }

    /// Parenthesized list with a trailing comma removed.
    pub fn parenthesized(body: Vec<Node>) -> Self {
        Node::Trim {
            prefix: "(",
            suffix: ")",
            prefix_overrides: &[],
            suffix_overrides: SET_SUFFIX_OVERRIDES,
            body,
        }
    }
}

/// What a statement is rendered against.
#[derive(Clone, Copy)]
pub enum Bindings<'a> {
    /// No values.
    None,
    /// One record, used for its properties and presence tests.
    Record(&'a dyn FieldAccess),
    /// One key value.
    Key(&'a Value),
    /// A key set.
    Keys(&'a [Value]),
    /// A batch of records.
    Batch(&'a [&'a dyn FieldAccess]),
}

impl Bindings<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Bindings::None => "empty",
            Bindings::Record(_) => "record",
            Bindings::Key(_) => "key",
            Bindings::Keys(_) => "key set",
            Bindings::Batch(_) => "batch",
        }
    }
}

impl fmt::Debug for Bindings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[derive(Clone, Copy)]
enum Element<'a> {
    Key(&'a Value),
    Record(&'a dyn FieldAccess),
}

/// Root of a statement's fragment tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Script {
    nodes: Vec<Node>,
}

impl Script {
    /// Wraps a fragment list.
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Top-level fragments.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Stable hash of the script's canonical text.
    pub fn shape_hash(&self) -> u64 {
        let mut hasher = Xxh64::new(0);
        hasher.update(self.to_string().as_bytes());
        hasher.digest()
    }

    /// Renders SQL text and collects parameters in placeholder order.
    ///
    /// Whitespace runs in the output are collapsed to single spaces.
    pub fn render(&self, bindings: &Bindings<'_>, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let mut renderer = Renderer {
            bindings: *bindings,
            dialect,
            params: Vec::new(),
        };
        let mut out = String::new();
        renderer.render_nodes(&self.nodes, None, &mut out)?;
        let sql = out.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok((sql, renderer.params))
    }
}

struct Renderer<'a> {
    bindings: Bindings<'a>,
    dialect: Dialect,
    params: Vec<Value>,
}

impl<'a> Renderer<'a> {
    fn render_nodes(
        &mut self,
        nodes: &[Node],
        element: Option<Element<'a>>,
        out: &mut String,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Bind(binding) => {
                    let value = self.resolve(binding, element)?;
                    self.params.push(value);
                    self.dialect.write_placeholder(out, self.params.len());
                }
                Node::When { property, body } => {
                    if self.present(property) {
                        self.render_nodes(body, element, out)?;
                    }
                }
                Node::Trim {
                    prefix,
                    suffix,
                    prefix_overrides,
                    suffix_overrides,
                    body,
                } => self.render_trimmed(
                    body,
                    element,
                    (*prefix, *suffix),
                    prefix_overrides,
                    suffix_overrides,
                    out,
                )?,
                Node::Where(body) => self.render_trimmed(
                    body,
                    element,
                    ("WHERE ", ""),
                    WHERE_PREFIX_OVERRIDES,
                    &[],
                    out,
                )?,
                Node::Set(body) => self.render_trimmed(
                    body,
                    element,
                    ("SET ", ""),
                    &[],
                    SET_SUFFIX_OVERRIDES,
                    out,
                )?,
                Node::ForEach {
                    collection,
                    open,
                    separator,
                    close,
                    body,
                } => self.render_each(*collection, (*open, *separator, *close), body, out)?,
            }
        }
        Ok(())
    }

    fn render_trimmed(
        &mut self,
        body: &[Node],
        element: Option<Element<'a>>,
        (prefix, suffix): (&str, &str),
        prefix_overrides: &[&str],
        suffix_overrides: &[&str],
        out: &mut String,
    ) -> Result<()> {
        let mut inner = String::new();
        self.render_nodes(body, element, &mut inner)?;
        let mut content = inner.trim();
        if let Some(token) = prefix_overrides
            .iter()
            .find(|token| starts_with_ignore_case(content, token))
        {
            content = content[token.len()..].trim_start();
        }
        if let Some(token) = suffix_overrides
            .iter()
            .find(|token| ends_with_ignore_case(content, token))
        {
            content = content[..content.len() - token.len()].trim_end();
        }
        if content.is_empty() {
            return Ok(());
        }
        out.push(' ');
        out.push_str(prefix);
        out.push_str(content);
        out.push_str(suffix);
        out.push(' ');
        Ok(())
    }

    fn render_each(
        &mut self,
        collection: Collection,
        (open, separator, close): (&str, &str, &str),
        body: &[Node],
        out: &mut String,
    ) -> Result<()> {
        let elements: Vec<Element<'a>> = match (collection, self.bindings) {
            (Collection::Keys, Bindings::Keys(keys)) => keys.iter().map(Element::Key).collect(),
            (Collection::Batch, Bindings::Batch(rows)) => {
                rows.iter().map(|row| Element::Record(*row)).collect()
            }
            _ => {
                return Err(TesseraError::Config(format!(
                    "cannot iterate {} over {} bindings",
                    collection.as_str(),
                    self.bindings.kind()
                )))
            }
        };
        if elements.is_empty() {
            return Ok(());
        }
        out.push(' ');
        out.push_str(open);
        for (idx, element) in elements.into_iter().enumerate() {
            if idx > 0 {
                out.push_str(separator);
            }
            self.render_nodes(body, Some(element), out)?;
        }
        out.push_str(close);
        out.push(' ');
        Ok(())
    }

    fn present(&self, property: &str) -> bool {
        match self.bindings {
            Bindings::Record(record) => !record.field_value(property).is_null(),
            _ => false,
        }
    }

    fn resolve(&self, binding: &Binding, element: Option<Element<'a>>) -> Result<Value> {
        match (binding, self.bindings, element) {
            (Binding::Property(name), Bindings::Record(record), _) => Ok(record.field_value(name)),
            (Binding::Key, Bindings::Key(key), _) => Ok(key.clone()),
            (Binding::Element, _, Some(Element::Key(key))) => Ok(key.clone()),
            (Binding::ElementProperty(name), _, Some(Element::Record(record))) => {
                Ok(record.field_value(name))
            }
            _ => Err(TesseraError::Config(format!(
                "placeholder {binding} cannot be bound from {} bindings",
                self.bindings.kind()
            ))),
        }
    }
}

fn starts_with_ignore_case(text: &str, token: &str) -> bool {
    text.get(..token.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(token))
}

fn ends_with_ignore_case(text: &str, token: &str) -> bool {
    text.len() >= token.len()
        && text
            .get(text.len() - token.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(token))
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    nodes.iter().try_for_each(|node| write!(f, "{node}"))
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => f.write_str(text),
            Node::Bind(binding) => write!(f, "{binding}"),
            Node::When { property, body } => {
                write!(f, "<if test=\"{property} != null\">")?;
                write_nodes(f, body)?;
                f.write_str("</if>")
            }
            Node::Trim {
                prefix,
                suffix,
                prefix_overrides,
                suffix_overrides,
                body,
            } => {
                write!(
                    f,
                    "<trim prefix=\"{prefix}\" suffix=\"{suffix}\" prefixOverrides=\"{}\" suffixOverrides=\"{}\">",
                    prefix_overrides.join("|"),
                    suffix_overrides.join("|")
                )?;
                write_nodes(f, body)?;
                f.write_str("</trim>")
            }
            Node::Where(body) => {
                f.write_str("<where>")?;
                write_nodes(f, body)?;
                f.write_str("</where>")
            }
            Node::Set(body) => {
                f.write_str("<set>")?;
                write_nodes(f, body)?;
                f.write_str("</set>")
            }
            Node::ForEach {
                collection,
                open,
                separator,
                close,
                body,
            } => {
                write!(
                    f,
                    "<foreach collection=\"{}\" item=\"item\" open=\"{open}\" separator=\"{separator}\" close=\"{close}\">",
                    collection.as_str()
                )?;
                write_nodes(f, body)?;
                f.write_str("</foreach>")
            }
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<script>")?;
        write_nodes(f, &self.nodes)?;
        f.write_str("</script>")
    }
}
