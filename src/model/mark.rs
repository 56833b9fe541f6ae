use super::schema::{Attrs, MarkType};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A tag carried by a node — emphasis, a link target, and so on — made of
/// a mark type and its attributes. A node holds its marks as a rank-sorted
/// [`MarkSet`].
#[derive(Clone, PartialEq)]
pub struct Mark {
    r#type: MarkType,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(r#type: MarkType, attrs: Attrs) -> Self {
        Mark { r#type, attrs }
    }

    /// The type of this mark.
    pub fn r#type(&self) -> &MarkType {
        &self.r#type
    }

    /// The attributes of this mark.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Insert this mark into a set at its rank position. Adding a mark the
    /// set already holds is a no-op. Marks this one's type excludes are
    /// dropped from the result; if the set holds a mark whose type excludes
    /// this one, the set wins and comes back unchanged.
    pub fn add_to_set(&self, set: &MarkSet) -> MarkSet {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.content.iter().enumerate() {
            if self == other {
                return set.clone();
            }
            if self.r#type.excludes(other.r#type()) {
                copy.get_or_insert_with(|| set.content[..i].to_vec());
            } else if other.r#type().excludes(&self.r#type) {
                return set.clone();
            } else {
                if !placed && other.r#type().rank() > self.r#type.rank() {
                    let target = copy.get_or_insert_with(|| set.content[..i].to_vec());
                    target.push(self.clone());
                    placed = true;
                }
                if let Some(target) = copy.as_mut() {
                    target.push(other.clone());
                }
            }
        }
        let mut content = copy.unwrap_or_else(|| set.content.clone());
        if !placed {
            content.push(self.clone());
        }
        MarkSet { content }
    }

    /// A set without the first element equal to this mark; the set itself
    /// when it holds no such element.
    pub fn remove_from_set(&self, set: &MarkSet) -> MarkSet {
        match set.content.iter().position(|other| self == other) {
            Some(i) => {
                let mut content = set.content.clone();
                content.remove(i);
                MarkSet { content }
            }
            None => set.clone(),
        }
    }

    /// Check whether this mark is in the given set.
    pub fn is_in_set(&self, set: &MarkSet) -> bool {
        set.content.iter().any(|other| self == other)
    }

    /// The JSON representation of this mark.
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "type".to_owned(),
            Value::String(self.r#type.name().to_owned()),
        );
        if !self.attrs.is_empty() {
            obj.insert("attrs".to_owned(), self.attrs.to_object());
        }
        Value::Object(obj)
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.r#type.name())
        } else {
            write!(f, "{}{:?}", self.r#type.name(), self.attrs)
        }
    }
}

impl Serialize for Mark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// An ordered set of marks, sorted by the rank of their types. A type
/// appears at most once, unless its exclusion list was explicitly emptied.
#[derive(Clone, Default, PartialEq)]
pub struct MarkSet {
    content: Vec<Mark>,
}

impl MarkSet {
    /// The empty set of marks.
    pub const NONE: MarkSet = MarkSet {
        content: Vec::new(),
    };

    /// Create a sorted set from a list of marks, resolving exclusions in
    /// insertion order.
    pub fn set_from(marks: Vec<Mark>) -> MarkSet {
        let mut set = MarkSet::NONE;
        for mark in marks {
            set = mark.add_to_set(&set);
        }
        set
    }

    /// Build a set from marks that are already rank-sorted and free of
    /// exclusion conflicts.
    pub(crate) fn from_sorted(content: Vec<Mark>) -> MarkSet {
        MarkSet { content }
    }

    /// Test whether two sets of marks are identical.
    pub fn same_set(a: &MarkSet, b: &MarkSet) -> bool {
        a == b
    }

    /// Whether this exact mark (type and attributes) is in the set.
    pub fn contains(&self, mark: &Mark) -> bool {
        self.content.contains(mark)
    }

    /// The marks in the set, in rank order.
    pub fn marks(&self) -> &[Mark] {
        &self.content
    }

    /// The number of marks in the set.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// True when the set holds no marks.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;
    fn into_iter(self) -> Self::IntoIter {
        self.content.iter()
    }
}

impl From<Mark> for MarkSet {
    fn from(mark: Mark) -> MarkSet {
        MarkSet {
            content: vec![mark],
        }
    }
}

impl From<Vec<Mark>> for MarkSet {
    fn from(marks: Vec<Mark>) -> MarkSet {
        MarkSet::set_from(marks)
    }
}

impl fmt::Debug for MarkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.content.fmt(f)
    }
}

impl Serialize for MarkSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.content.serialize(serializer)
    }
}
