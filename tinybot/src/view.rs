//! # Navigable JSON Views
//!
//! This module lets callers read a decoded JSON document with no declared schema.
//! It replaces generated Rust structs.
//!
//! A [`Node`] is what every access returns:
//!
//! * **[`Node::View`]**: a [`View`] over a mapping or a sequence. It can be navigated further.
//! * **[`Node::Scalar`]**: the raw leaf value (string, number, boolean or null). It is never
//!   wrapped in a view, so leaf comparisons like `node == "hi"` work directly.
//!
//! A `null` field or element reads as absent, exactly like a missing one.
//!
//! Every lookup happens at access time. A failed lookup returns a [`ViewError`] carrying the
//! path of the access chain, rendered as `.field`, `[index]` or `['key']`.
//!
//! ## Example
//!
//! ```rust
//! use tinybot::view::Node;
//!
//! # fn run() -> Result<(), tinybot::view::ViewError> {
//! let update = Node::new(serde_json::json!({"message": {"text": "hi", "chat": {"id": 7}}}));
//!
//! assert_eq!(update.get("message")?.get("text")?, "hi");
//! assert_eq!(update.get("message")?.get("chat")?.get("id")?, 7);
//!
//! let err = update.get("message")?.get("voice").unwrap_err();
//! assert_eq!(err.path(), ".message.voice");
//! # Ok(())
//! # }
//! ```
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{
    fmt::{self, Write},
    sync::Arc,
};

/// The structural shape of a JSON value, used in type mismatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Bool,
            Value::Number(_) => Shape::Number,
            Value::String(_) => Shape::String,
            Value::Array(_) => Shape::Sequence,
            Value::Object(_) => Shape::Mapping,
        }
    }

    /// Human readable form, e.g. `a mapping`.
    pub fn describe(self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::Bool => "a boolean",
            Shape::Number => "a number",
            Shape::String => "a string",
            Shape::Sequence => "a sequence",
            Shape::Mapping => "a mapping",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

const CONTAINER: &str = "a mapping or a sequence";

/// Errors raised while navigating a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("No such element '{path}'")]
    NoSuchElement { path: String },
    #[error("Expected {expected} at '{}', but it was {found}", display_path(.path))]
    DynamicType {
        path: String,
        expected: &'static str,
        found: Shape,
    },
    #[error("Failed to deserialize the value at '{}': {message}", display_path(.path))]
    Deserialize { path: String, message: String },
}

impl ViewError {
    /// The access path at which the failure occurred.
    pub fn path(&self) -> &str {
        match self {
            ViewError::NoSuchElement { path }
            | ViewError::DynamicType { path, .. }
            | ViewError::Deserialize { path, .. } => path,
        }
    }

    fn mismatch(path: &str, expected: &'static str, found: &Value) -> Self {
        ViewError::DynamicType {
            path: path.to_string(),
            expected,
            found: Shape::of(found),
        }
    }
}

/// JSON `null` reads as an absent element.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

/// A key for [`View::index`]: a mapping key or a sequence position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'k> {
    Name(&'k str),
    Position(i64),
}

impl<'k> From<&'k str> for Key<'k> {
    fn from(name: &'k str) -> Self {
        Key::Name(name)
    }
}

impl<'k> From<&'k String> for Key<'k> {
    fn from(name: &'k String) -> Self {
        Key::Name(name)
    }
}

impl From<i64> for Key<'_> {
    fn from(position: i64) -> Self {
        Key::Position(position)
    }
}

impl From<i32> for Key<'_> {
    fn from(position: i32) -> Self {
        Key::Position(position.into())
    }
}

impl From<usize> for Key<'_> {
    fn from(position: usize) -> Self {
        Key::Position(i64::try_from(position).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => {
                f.write_char('[')?;
                write_quoted(f, name)?;
                f.write_char(']')
            }
            Key::Position(position) => write!(f, "[{position}]"),
        }
    }
}

/// Writes `name` as a quoted literal the way Python's `repr` does. Double quotes are used when
/// the name holds a single quote and no double quote. Backslashes and control characters are
/// escaped.
fn write_quoted(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let quote = if name.contains('\'') && !name.contains('"') {
        '"'
    } else {
        '\''
    };

    f.write_char(quote)?;
    for c in name.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if c.is_control() => write!(f, "\\x{:02x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A read-only view over a mapping or a sequence inside a shared JSON document.
///
/// Views never copy the document: children share the same root and only record
/// where they live in it. Cloning a view is cheap, and views can be sent across tasks.
#[derive(Clone)]
pub struct View {
    root: Arc<Value>,
    location: Vec<Segment>,
    path: String,
}

impl View {
    /// The wrapped mapping or sequence.
    pub fn value(&self) -> &Value {
        let mut value = &*self.root;
        for segment in &self.location {
            value = match segment {
                Segment::Key(key) => &value[key.as_str()],
                Segment::Index(index) => &value[*index],
            };
        }
        value
    }

    /// The diagnostic path from the root to this view.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_mapping(&self) -> bool {
        self.value().is_object()
    }

    pub fn is_sequence(&self) -> bool {
        self.value().is_array()
    }

    /// Number of fields of a mapping or elements of a sequence.
    pub fn len(&self) -> usize {
        match self.value() {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the field `name` of a mapping.
    ///
    /// # Returns
    ///
    /// * `Ok(Node)` - The field, as a view or as the raw scalar.
    /// * `Err(ViewError::NoSuchElement)` - The field is absent or `null`. The path ends in
    ///   `.{name}`.
    /// * `Err(ViewError::DynamicType)` - This view wraps a sequence.
    pub fn get(&self, name: &str) -> Result<Node, ViewError> {
        match self.value() {
            Value::Object(map) => {
                let path = format!("{}.{}", self.path, name);
                match present(map.get(name)) {
                    Some(child) => Ok(self.child(Segment::Key(name.to_string()), child, path)),
                    None => Err(ViewError::NoSuchElement { path }),
                }
            }
            other => Err(ViewError::mismatch(
                &self.path,
                Shape::Mapping.describe(),
                other,
            )),
        }
    }

    /// Looks up a mapping key or a sequence position.
    ///
    /// Sequence positions are never wrapped around: negative or out of range positions
    /// are absent elements, and so are `null` values. The path of the child uses the bracket
    /// notation (`[3]`, `['key']`).
    pub fn index<'k>(&self, key: impl Into<Key<'k>>) -> Result<Node, ViewError> {
        let key = key.into();
        let path = format!("{}{}", self.path, key);

        match (self.value(), key) {
            (Value::Object(map), Key::Name(name)) => match present(map.get(name)) {
                Some(child) => Ok(self.child(Segment::Key(name.to_string()), child, path)),
                None => Err(ViewError::NoSuchElement { path }),
            },
            // JSON mappings only have string keys
            (Value::Object(_), Key::Position(_)) => Err(ViewError::NoSuchElement { path }),
            (Value::Array(items), Key::Position(position)) => {
                let child = usize::try_from(position)
                    .ok()
                    .and_then(|index| present(items.get(index)).map(|child| (index, child)));
                match child {
                    Some((index, child)) => Ok(self.child(Segment::Index(index), child, path)),
                    None => Err(ViewError::NoSuchElement { path }),
                }
            }
            (other, Key::Name(_)) => Err(ViewError::mismatch(
                &self.path,
                Shape::Mapping.describe(),
                other,
            )),
            (other, Key::Position(_)) => Err(ViewError::mismatch(&self.path, CONTAINER, other)),
        }
    }

    /// Membership test for mapping fields, `true` even for a `null` field.
    /// Always `false` for a sequence.
    pub fn contains(&self, name: &str) -> bool {
        match self.value() {
            Value::Object(map) => map.contains_key(name),
            _ => false,
        }
    }

    /// Iterates this view.
    ///
    /// * A sequence yields each non-null element as a [`Node`] with an index suffixed path.
    /// * A mapping yields its keys as raw string scalars, which is what update dispatch uses to
    ///   discover which field is populated.
    ///
    /// The iterator borrows the view, so iterating again starts over from the same document.
    pub fn iter(&self) -> Iter<'_> {
        let inner = match self.value() {
            Value::Array(items) => IterInner::Elements(items.iter().enumerate()),
            Value::Object(map) => IterInner::Keys(map.keys()),
            _ => IterInner::Empty,
        };
        Iter { view: self, inner }
    }

    /// Iterates `(key, child)` pairs of a mapping, skipping `null` fields.
    pub fn items(&self) -> Result<Items<'_>, ViewError> {
        match self.value() {
            Value::Object(map) => Ok(Items {
                view: self,
                inner: map.iter(),
            }),
            other => Err(ViewError::mismatch(
                &self.path,
                Shape::Mapping.describe(),
                other,
            )),
        }
    }

    /// Replaces the diagnostic path with `.{label}`, so the view reads as a fresh root
    /// named `label` in error messages.
    pub fn rebase(mut self, label: &str) -> Self {
        self.path = format!(".{label}");
        self
    }

    /// Deserializes the wrapped value into a typed structure.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ViewError> {
        T::deserialize(self.value()).map_err(|e| ViewError::Deserialize {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn child(&self, segment: Segment, value: &Value, path: String) -> Node {
        match value {
            Value::Object(_) | Value::Array(_) => {
                let mut location = self.location.clone();
                location.push(segment);
                Node::View(View {
                    root: Arc::clone(&self.root),
                    location,
                    path,
                })
            }
            scalar => Node::Scalar {
                value: scalar.clone(),
                path,
            },
        }
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl PartialEq<Value> for View {
    fn eq(&self, other: &Value) -> bool {
        self.value() == other
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("path", &self.path)
            .field("value", self.value())
            .finish()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.value(), f)
    }
}

impl<'v> IntoIterator for &'v View {
    type Item = Node;
    type IntoIter = Iter<'v>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`View::iter`].
pub struct Iter<'v> {
    view: &'v View,
    inner: IterInner<'v>,
}

enum IterInner<'v> {
    Elements(std::iter::Enumerate<std::slice::Iter<'v, Value>>),
    Keys(serde_json::map::Keys<'v>),
    Empty,
}

impl Iterator for Iter<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Elements(elements) => {
                let (index, value) = elements.find(|(_, value)| !value.is_null())?;
                let path = format!("{}[{}]", self.view.path, index);
                Some(self.view.child(Segment::Index(index), value, path))
            }
            IterInner::Keys(keys) => keys.next().map(|key| Node::Scalar {
                value: Value::String(key.clone()),
                path: format!("{}.{}", self.view.path, key),
            }),
            IterInner::Empty => None,
        }
    }
}

/// Iterator returned by [`View::items`].
pub struct Items<'v> {
    view: &'v View,
    inner: serde_json::map::Iter<'v>,
}

impl<'v> Iterator for Items<'v> {
    type Item = (&'v str, Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.inner.find(|(_, value)| !value.is_null())?;
        let path = format!("{}.{}", self.view.path, key);
        let child = self.view.child(Segment::Key(key.clone()), value, path);
        Some((key.as_str(), child))
    }
}

/// The result of any access: a navigable [`View`] or a raw scalar.
///
/// A scalar keeps the path it was reached through, so misusing it (e.g. reading a field
/// of a string) still reports where it happened. Equality only compares values.
#[derive(Debug, Clone)]
pub enum Node {
    View(View),
    Scalar { value: Value, path: String },
}

impl Node {
    /// Wraps a decoded document as a root node.
    ///
    /// Mappings and sequences become a [`View`]; any other value is returned as a scalar.
    pub fn new(value: Value) -> Self {
        Self::with_path(value, String::new())
    }

    /// Same as [`Node::new`], starting from the given diagnostic path.
    pub fn with_path(value: Value, path: impl Into<String>) -> Self {
        let path = path.into();
        match value {
            Value::Object(_) | Value::Array(_) => Node::View(View {
                root: Arc::new(value),
                location: Vec::new(),
                path,
            }),
            value => Node::Scalar { value, path },
        }
    }

    /// Parses a raw JSON payload (e.g. an inbound webhook body) into a root node.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_slice(bytes)?))
    }

    /// The wrapped value, whatever its shape.
    pub fn as_value(&self) -> &Value {
        match self {
            Node::View(view) => view.value(),
            Node::Scalar { value, .. } => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Node::View(view) => view.value().clone(),
            Node::Scalar { value, .. } => value,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Node::View(view) => view.path(),
            Node::Scalar { path, .. } => path,
        }
    }

    pub fn as_view(&self) -> Option<&View> {
        match self {
            Node::View(view) => Some(view),
            Node::Scalar { .. } => None,
        }
    }

    pub fn into_view(self) -> Result<View, ViewError> {
        match self {
            Node::View(view) => Ok(view),
            Node::Scalar { value, path } => Err(ViewError::mismatch(&path, CONTAINER, &value)),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Node::Scalar { .. })
    }

    /// See [`View::get`]. Fails with [`ViewError::DynamicType`] on a scalar.
    pub fn get(&self, name: &str) -> Result<Node, ViewError> {
        match self {
            Node::View(view) => view.get(name),
            Node::Scalar { value, path } => Err(ViewError::mismatch(
                path,
                Shape::Mapping.describe(),
                value,
            )),
        }
    }

    /// See [`View::index`]. Fails with [`ViewError::DynamicType`] on a scalar.
    pub fn index<'k>(&self, key: impl Into<Key<'k>>) -> Result<Node, ViewError> {
        match self {
            Node::View(view) => view.index(key),
            Node::Scalar { value, path } => Err(ViewError::mismatch(path, CONTAINER, value)),
        }
    }

    /// See [`View::contains`]. Never fails, a scalar contains nothing.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Node::View(view) => view.contains(name),
            Node::Scalar { .. } => false,
        }
    }

    /// See [`View::iter`]. Fails with [`ViewError::DynamicType`] on a scalar.
    pub fn iter(&self) -> Result<Iter<'_>, ViewError> {
        match self {
            Node::View(view) => Ok(view.iter()),
            Node::Scalar { value, path } => Err(ViewError::mismatch(path, CONTAINER, value)),
        }
    }

    /// See [`View::items`].
    pub fn items(&self) -> Result<Items<'_>, ViewError> {
        match self {
            Node::View(view) => view.items(),
            Node::Scalar { value, path } => Err(ViewError::mismatch(
                path,
                Shape::Mapping.describe(),
                value,
            )),
        }
    }

    /// See [`View::rebase`].
    pub fn rebase(self, label: &str) -> Self {
        match self {
            Node::View(view) => Node::View(view.rebase(label)),
            Node::Scalar { value, .. } => Node::Scalar {
                value,
                path: format!(".{label}"),
            },
        }
    }

    pub fn is_null(&self) -> bool {
        self.as_value().is_null()
    }

    pub fn as_str(&self) -> Result<&str, ViewError> {
        self.as_value()
            .as_str()
            .ok_or_else(|| self.expected(Shape::String))
    }

    pub fn as_i64(&self) -> Result<i64, ViewError> {
        self.as_value()
            .as_i64()
            .ok_or_else(|| self.expected(Shape::Number))
    }

    pub fn as_u64(&self) -> Result<u64, ViewError> {
        self.as_value()
            .as_u64()
            .ok_or_else(|| self.expected(Shape::Number))
    }

    pub fn as_f64(&self) -> Result<f64, ViewError> {
        self.as_value()
            .as_f64()
            .ok_or_else(|| self.expected(Shape::Number))
    }

    pub fn as_bool(&self) -> Result<bool, ViewError> {
        self.as_value()
            .as_bool()
            .ok_or_else(|| self.expected(Shape::Bool))
    }

    /// The wrapped mapping, borrowed.
    pub fn as_mapping(&self) -> Result<&Map<String, Value>, ViewError> {
        self.as_value()
            .as_object()
            .ok_or_else(|| self.expected(Shape::Mapping))
    }

    /// Deserializes the wrapped value into a typed structure.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ViewError> {
        T::deserialize(self.as_value()).map_err(|e| ViewError::Deserialize {
            path: self.path().to_string(),
            message: e.to_string(),
        })
    }

    fn expected(&self, shape: Shape) -> ViewError {
        ViewError::mismatch(self.path(), shape.describe(), self.as_value())
    }
}

impl From<View> for Node {
    fn from(view: View) -> Self {
        Node::View(view)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::new(value)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_value(), f)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.as_value() == other.as_value()
    }
}

macro_rules! node_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PartialEq<$ty> for Node {
                fn eq(&self, other: &$ty) -> bool {
                    self.as_value() == other
                }
            }
        )*
    };
}

node_eq![Value, str, String, bool, i32, i64, u32, u64, f64];

impl PartialEq<&str> for Node {
    fn eq(&self, other: &&str) -> bool {
        self.as_value() == *other
    }
}
