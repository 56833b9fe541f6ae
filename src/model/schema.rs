use super::content::{self, ContentMatch, MatchNode};
use super::{Fragment, Mark, MarkSet, Node, Text};
use derivative::Derivative;
use displaydoc::Display;
use log::debug;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::iter::FromIterator;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised while compiling a schema spec or creating content from one.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// there is no node type '{0}' in this schema
    UnknownNodeType(String),
    /// there is no mark type '{0}' in this schema
    UnknownMarkType(String),
    /// '{0}' can not be both a node and a mark
    DuplicateName(String),
    /// the schema is missing its top node type '{0}'
    MissingTopNode(String),
    /// every schema needs a 'text' type
    MissingTextType,
    /// the text node type should not have attributes
    TextTypeWithAttrs,
    /// no node type or group '{name}' found in content expression '{expr}'
    UnknownExprName {
        /// The unresolvable name
        name: String,
        /// The expression it occurred in
        expr: String,
    },
    /// could not parse content expression '{expr}': {msg}
    ExprSyntax {
        /// The offending expression
        expr: String,
        /// What went wrong
        msg: String,
    },
    /// only non-generatable nodes ({nodes}) in a required position in '{expr}'
    DeadEnd {
        /// The offending expression
        expr: String,
        /// The node types at the dead end
        nodes: String,
    },
    /// unknown mark type or group '{0}' in a schema spec
    UnknownMarkExpr(String),
    /// no value supplied for attribute '{attr}' of '{owner}'
    MissingAttr {
        /// The node or mark type that declares the attribute
        owner: String,
        /// The attribute without a value
        attr: String,
    },
    /// text nodes can not be created through NodeType::create
    TextViaCreate,
    /// empty text nodes are not allowed
    EmptyText,
    /// invalid content for node type '{0}'
    InvalidContent(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MarkId(pub(crate) usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MatchId(pub(crate) usize);

/// An attribute map attached to a node or a mark.
///
/// Attribute values are open JSON values; which names are legal, and which
/// have defaults, is declared per type in the schema. The map is immutable
/// and cheap to clone.
#[derive(Clone, Default)]
pub struct Attrs {
    inner: Option<Rc<BTreeMap<String, Value>>>,
}

impl Attrs {
    /// The shared empty attribute map.
    pub const EMPTY: Attrs = Attrs { inner: None };

    /// Look up the value of an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.as_ref().and_then(|map| map.get(name))
    }

    /// True when no attribute has a value.
    pub fn is_empty(&self) -> bool {
        self.inner.as_ref().map_or(true, |map| map.is_empty())
    }

    /// The number of attributes with a value.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |map| map.len())
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter().flat_map(|map| map.iter())
    }

    pub(crate) fn to_object(&self) -> Value {
        let map = self
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

impl PartialEq for Attrs {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            (Some(m), None) | (None, Some(m)) => m.is_empty(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Attrs {
    fn from(map: BTreeMap<String, Value>) -> Attrs {
        if map.is_empty() {
            Attrs::EMPTY
        } else {
            Attrs {
                inner: Some(Rc::new(map)),
            }
        }
    }
}

impl FromIterator<(String, Value)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Attrs {
        Attrs::from(iter.into_iter().collect::<BTreeMap<_, _>>())
    }
}

impl fmt::Debug for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Serialize for Attrs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Map::from_iter(self.iter().map(|(k, v)| (k.clone(), v.clone())))
            .serialize(serializer)
    }
}

/// Declaration of a single attribute on a node or mark type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSpec {
    /// The default value, used when the attribute is not supplied. An
    /// attribute without a default is required.
    pub default: Option<Value>,
}

impl AttributeSpec {
    /// An attribute that must always be supplied.
    pub fn required() -> Self {
        AttributeSpec { default: None }
    }

    /// An attribute with a default value.
    pub fn with_default(value: Value) -> Self {
        AttributeSpec {
            default: Some(value),
        }
    }
}

/// Declaration of a node type in a schema spec.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// The content expression for this node, e.g. `"paragraph+"`. A missing
    /// expression means the node is a leaf.
    pub content: Option<String>,
    /// The marks allowed inside this node, as a space-separated list of mark
    /// names and group names, `"_"` for all, or `""` for none. When absent,
    /// nodes with inline content allow all marks and others allow none.
    pub marks: Option<String>,
    /// The groups this node belongs to, space-separated.
    pub group: Option<String>,
    /// True for inline nodes.
    pub inline: bool,
    /// True when the node should be treated as a single unit, even if it is
    /// not a leaf.
    pub atom: bool,
    /// When true, the sides of this node count as boundaries that open
    /// slices should not cross.
    pub isolating: bool,
    /// The attributes this node type declares, in order.
    pub attrs: Vec<(String, AttributeSpec)>,
}

/// Declaration of a mark type in a schema spec.
#[derive(Debug, Clone)]
pub struct MarkSpec {
    /// The attributes this mark type declares, in order.
    pub attrs: Vec<(String, AttributeSpec)>,
    /// Whether the mark extends onto content inserted at its end boundary.
    pub inclusive: bool,
    /// Marks excluded by this one: a space-separated list of names and
    /// groups, `"_"` for all, `""` for none. Absent means the mark excludes
    /// only itself.
    pub excludes: Option<String>,
    /// The groups this mark belongs to, space-separated.
    pub group: Option<String>,
}

impl Default for MarkSpec {
    fn default() -> Self {
        MarkSpec {
            attrs: Vec::new(),
            inclusive: true,
            excludes: None,
            group: None,
        }
    }
}

/// The input to schema compilation: ordered node and mark declarations.
///
/// Declaration order matters: it fixes mark ranks, and content filling
/// prefers earlier node types.
#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    /// The node types, in declaration order.
    pub nodes: Vec<(String, NodeSpec)>,
    /// The mark types, in declaration order. Order determines rank.
    pub marks: Vec<(String, MarkSpec)>,
    /// The name of the document's top-level node type. Defaults to `"doc"`.
    pub top_node: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    pub(crate) name: String,
    pub(crate) default: Option<Value>,
}

impl Attribute {
    fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct NodeTypeData {
    pub(crate) name: String,
    pub(crate) attrs: Vec<Attribute>,
    pub(crate) default_attrs: Option<Attrs>,
    pub(crate) groups: Vec<String>,
    #[derivative(Debug = "ignore")]
    pub(crate) spec: NodeSpec,
    pub(crate) content_match: MatchId,
    pub(crate) inline_content: bool,
    pub(crate) mark_set: Option<Vec<MarkId>>,
    pub(crate) is_block: bool,
    pub(crate) is_text: bool,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct MarkTypeData {
    pub(crate) name: String,
    pub(crate) rank: usize,
    pub(crate) attrs: Vec<Attribute>,
    pub(crate) default_attrs: Option<Attrs>,
    #[derivative(Debug = "ignore")]
    pub(crate) spec: MarkSpec,
    pub(crate) excluded: Vec<MarkId>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct SchemaInner {
    nodes: Vec<NodeTypeData>,
    marks: Vec<MarkTypeData>,
    #[derivative(Debug = "ignore")]
    matches: Vec<MatchNode>,
    node_names: HashMap<String, NodeId>,
    mark_names: HashMap<String, MarkId>,
    top: NodeId,
    text: NodeId,
}

/// A document schema: the node and mark types legal in a document, with
/// their content expressions compiled to match automata.
///
/// A `Schema` is a cheap handle; cloning it shares the compiled tables.
#[derive(Clone)]
pub struct Schema {
    inner: Rc<SchemaInner>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field(
                "nodes",
                &self
                    .inner
                    .nodes
                    .iter()
                    .map(|n| n.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field(
                "marks",
                &self
                    .inner
                    .marks
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn split_groups(group: &Option<String>) -> Vec<String> {
    group
        .as_deref()
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

fn compile_attrs(specs: &[(String, AttributeSpec)]) -> (Vec<Attribute>, Option<Attrs>) {
    let attrs: Vec<Attribute> = specs
        .iter()
        .map(|(name, spec)| Attribute {
            name: name.clone(),
            default: spec.default.clone(),
        })
        .collect();
    let default_attrs = if attrs.iter().all(Attribute::has_default) {
        Some(
            attrs
                .iter()
                .map(|a| (a.name.clone(), a.default.clone().unwrap_or(Value::Null)))
                .collect(),
        )
    } else {
        None
    };
    (attrs, default_attrs)
}

fn compute_attrs(
    declared: &[Attribute],
    default_attrs: &Option<Attrs>,
    given: Option<&Attrs>,
    owner: &str,
) -> Result<Attrs, SchemaError> {
    match given {
        None => default_attrs.clone().ok_or_else(|| {
            let attr = declared
                .iter()
                .find(|a| !a.has_default())
                .map(|a| a.name.clone())
                .unwrap_or_default();
            SchemaError::MissingAttr {
                owner: owner.to_owned(),
                attr,
            }
        }),
        Some(given) => {
            let mut map = BTreeMap::new();
            for attr in declared {
                let value = given
                    .get(&attr.name)
                    .cloned()
                    .or_else(|| attr.default.clone())
                    .ok_or_else(|| SchemaError::MissingAttr {
                        owner: owner.to_owned(),
                        attr: attr.name.clone(),
                    })?;
                map.insert(attr.name.clone(), value);
            }
            Ok(Attrs::from(map))
        }
    }
}

impl Schema {
    /// Compile a schema spec.
    ///
    /// This parses every content expression into a deterministic match
    /// automaton, resolves mark sets and exclusion lists, and verifies the
    /// structural requirements: a `text` type without attributes must
    /// exist, the top node must exist, and no name may denote both a node
    /// and a mark.
    pub fn new(spec: SchemaSpec) -> Result<Schema, SchemaError> {
        let mut node_names = HashMap::new();
        for (i, (name, _)) in spec.nodes.iter().enumerate() {
            if node_names.insert(name.clone(), NodeId(i)).is_some() {
                return Err(SchemaError::DuplicateName(name.clone()));
            }
        }
        let mut mark_names = HashMap::new();
        for (i, (name, _)) in spec.marks.iter().enumerate() {
            if node_names.contains_key(name) || mark_names.insert(name.clone(), MarkId(i)).is_some()
            {
                return Err(SchemaError::DuplicateName(name.clone()));
            }
        }

        let text = *node_names.get("text").ok_or(SchemaError::MissingTextType)?;
        if !spec.nodes[text.0].1.attrs.is_empty() {
            return Err(SchemaError::TextTypeWithAttrs);
        }
        let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_owned());
        let top = *node_names
            .get(&top_name)
            .ok_or(SchemaError::MissingTopNode(top_name))?;

        let mut nodes: Vec<NodeTypeData> = spec
            .nodes
            .iter()
            .map(|(name, ns)| {
                let (attrs, default_attrs) = compile_attrs(&ns.attrs);
                NodeTypeData {
                    name: name.clone(),
                    attrs,
                    default_attrs,
                    groups: split_groups(&ns.group),
                    is_block: !(ns.inline || name == "text"),
                    is_text: name == "text",
                    spec: ns.clone(),
                    content_match: MatchId(0),
                    inline_content: false,
                    mark_set: None,
                }
            })
            .collect();

        let mut marks: Vec<MarkTypeData> = spec
            .marks
            .iter()
            .enumerate()
            .map(|(rank, (name, ms))| {
                let (attrs, default_attrs) = compile_attrs(&ms.attrs);
                MarkTypeData {
                    name: name.clone(),
                    rank,
                    attrs,
                    default_attrs,
                    spec: ms.clone(),
                    excluded: Vec::new(),
                }
            })
            .collect();

        // Compile content expressions, sharing automata between identical
        // expression strings.
        let resolver: Vec<(String, Vec<String>)> = nodes
            .iter()
            .map(|n| (n.name.clone(), n.groups.clone()))
            .collect();
        let mut matches = vec![MatchNode::empty()];
        let mut by_expr: HashMap<String, MatchId> = HashMap::new();
        for i in 0..nodes.len() {
            let src = match &nodes[i].spec.content {
                Some(src) if !src.trim().is_empty() => src.clone(),
                _ => continue,
            };
            let mid = match by_expr.get(&src) {
                Some(&mid) => mid,
                None => {
                    let mid = content::compile(&src, &resolver, &mut matches)?;
                    by_expr.insert(src, mid);
                    mid
                }
            };
            nodes[i].content_match = mid;
        }

        let blocks: Vec<bool> = nodes.iter().map(|n| n.is_block).collect();
        for node in nodes.iter_mut() {
            let state = &matches[node.content_match.0];
            node.inline_content =
                !state.edges.is_empty() && state.edges.iter().all(|(t, _)| !blocks[t.0]);
        }

        // A required position that only text nodes or types with required
        // attributes can fill could never be auto-generated.
        let generatable: Vec<bool> = nodes
            .iter()
            .map(|n| !n.is_text && n.attrs.iter().all(Attribute::has_default))
            .collect();
        for (src, mid) in &by_expr {
            content::check_dead_ends(*mid, &matches, &generatable, &resolver, src)?;
        }

        for i in 0..nodes.len() {
            nodes[i].mark_set = match nodes[i].spec.marks.clone() {
                Some(ref s) if s == "_" => None,
                Some(ref s) if s.is_empty() => Some(Vec::new()),
                Some(s) => Some(gather_marks(&spec, &mark_names, &s)?),
                None => {
                    if nodes[i].inline_content {
                        None
                    } else {
                        Some(Vec::new())
                    }
                }
            };
        }

        for i in 0..marks.len() {
            marks[i].excluded = match marks[i].spec.excludes.clone() {
                None => vec![MarkId(i)],
                Some(ref s) if s.is_empty() => Vec::new(),
                Some(s) => gather_marks(&spec, &mark_names, &s)?,
            };
        }

        debug!(
            "compiled schema: {} node types, {} mark types, {} match states",
            nodes.len(),
            marks.len(),
            matches.len()
        );

        Ok(Schema {
            inner: Rc::new(SchemaInner {
                nodes,
                marks,
                matches,
                node_names,
                mark_names,
                top,
                text,
            }),
        })
    }

    /// Get the node type with the given name.
    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.inner
            .node_names
            .get(name)
            .map(|&id| NodeType::new(self.clone(), id))
    }

    /// Get the mark type with the given name.
    pub fn mark_type(&self, name: &str) -> Option<MarkType> {
        self.inner
            .mark_names
            .get(name)
            .map(|&id| MarkType::new(self.clone(), id))
    }

    /// The type of the document's top-level node.
    pub fn top_node_type(&self) -> NodeType {
        NodeType::new(self.clone(), self.inner.top)
    }

    /// The schema's text node type.
    pub fn text_type(&self) -> NodeType {
        NodeType::new(self.clone(), self.inner.text)
    }

    /// Iterate over all node types, in declaration order.
    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        (0..self.inner.nodes.len()).map(move |i| NodeType::new(self.clone(), NodeId(i)))
    }

    /// Iterate over all mark types, in declaration order.
    pub fn mark_types(&self) -> impl Iterator<Item = MarkType> + '_ {
        (0..self.inner.marks.len()).map(move |i| MarkType::new(self.clone(), MarkId(i)))
    }

    /// Create a node of the named type. See [`NodeType::create`].
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: MarkSet,
    ) -> Result<Node, SchemaError> {
        self.node_type(name)
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_owned()))?
            .create(attrs, content, marks)
    }

    /// Create a text node with the given text.
    pub fn text(&self, text: impl Into<Text>) -> Result<Node, SchemaError> {
        let text = text.into();
        if text.len_utf16() == 0 {
            return Err(SchemaError::EmptyText);
        }
        Ok(Node::new_text(self.text_type(), MarkSet::NONE, text))
    }

    /// Create a mark of the named type.
    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark, SchemaError> {
        self.mark_type(name)
            .ok_or_else(|| SchemaError::UnknownMarkType(name.to_owned()))?
            .create(attrs)
    }

    pub(crate) fn node_type_by_id(&self, id: NodeId) -> NodeType {
        NodeType::new(self.clone(), id)
    }

    pub(crate) fn mark_type_by_id(&self, id: MarkId) -> MarkType {
        MarkType::new(self.clone(), id)
    }

    pub(crate) fn match_node(&self, id: MatchId) -> &MatchNode {
        &self.inner.matches[id.0]
    }

    pub(crate) fn node_data(&self, id: NodeId) -> &NodeTypeData {
        &self.inner.nodes[id.0]
    }

    pub(crate) fn mark_data(&self, id: MarkId) -> &MarkTypeData {
        &self.inner.marks[id.0]
    }
}

fn gather_marks(
    spec: &SchemaSpec,
    mark_names: &HashMap<String, MarkId>,
    list: &str,
) -> Result<Vec<MarkId>, SchemaError> {
    let mut found = Vec::new();
    for name in list.split_whitespace() {
        let mut ok = false;
        if let Some(&id) = mark_names.get(name) {
            found.push(id);
            ok = true;
        } else {
            for (i, (_, ms)) in spec.marks.iter().enumerate() {
                if name == "_" || split_groups(&ms.group).iter().any(|g| g == name) {
                    found.push(MarkId(i));
                    ok = true;
                }
            }
        }
        if !ok {
            return Err(SchemaError::UnknownMarkExpr(name.to_owned()));
        }
    }
    found.sort_unstable_by_key(|id| id.0);
    found.dedup();
    Ok(found)
}

/// A handle on a node type in a schema: its identity, attribute
/// declarations, and compiled content rules.
#[derive(Clone)]
pub struct NodeType {
    schema: Schema,
    id: NodeId,
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.schema == other.schema
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

impl NodeType {
    pub(crate) fn new(schema: Schema, id: NodeId) -> Self {
        NodeType { schema, id }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    fn data(&self) -> &NodeTypeData {
        self.schema.node_data(self.id)
    }

    /// The name of this type.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The schema this type belongs to.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec this type was compiled from.
    pub fn spec(&self) -> &NodeSpec {
        &self.data().spec
    }

    /// The groups this type belongs to.
    pub fn groups(&self) -> &[String] {
        &self.data().groups
    }

    /// True if this is a block type.
    pub fn is_block(&self) -> bool {
        self.data().is_block
    }

    /// True if this is the text type.
    pub fn is_text(&self) -> bool {
        self.data().is_text
    }

    /// True if this is an inline type.
    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// True if this is a block type whose content is inline.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content()
    }

    /// True for types that do not allow any content.
    pub fn is_leaf(&self) -> bool {
        self.data().content_match == MatchId(0)
    }

    /// True when this node is an atom: it has no directly editable content.
    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.data().spec.atom
    }

    /// True if this type's content consists of inline nodes.
    pub fn inline_content(&self) -> bool {
        self.data().inline_content
    }

    /// The starting match state of this type's content expression.
    pub fn content_match(&self) -> ContentMatch {
        ContentMatch::new(self.schema.clone(), self.data().content_match)
    }

    /// True when this type has at least one attribute without a default.
    pub fn has_required_attrs(&self) -> bool {
        self.data().attrs.iter().any(|a| !a.has_default())
    }

    /// The shared attribute map used when all attributes are defaulted, or
    /// `None` when some attribute is required.
    pub fn default_attrs(&self) -> Option<Attrs> {
        self.data().default_attrs.clone()
    }

    /// Fill in defaults for the given attributes, erroring when a required
    /// attribute has no value. Attributes this type does not declare are
    /// ignored.
    pub fn compute_attrs(&self, given: Option<&Attrs>) -> Result<Attrs, SchemaError> {
        let data = self.data();
        compute_attrs(&data.attrs, &data.default_attrs, given, &data.name)
    }

    /// Create a node of this type with the given attributes, content, and
    /// marks. The content is not checked against the content expression;
    /// use [`NodeType::create_checked`] for that.
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: MarkSet,
    ) -> Result<Node, SchemaError> {
        if self.is_text() {
            return Err(SchemaError::TextViaCreate);
        }
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new(self.clone(), attrs, content.into(), marks))
    }

    /// Like [`NodeType::create`], but verify that the content is valid for
    /// this type.
    pub fn create_checked(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: MarkSet,
    ) -> Result<Node, SchemaError> {
        let node = self.create(attrs, content, marks)?;
        if !self.valid_content(node.content()) {
            return Err(SchemaError::InvalidContent(self.name().to_owned()));
        }
        Ok(node)
    }

    /// Like [`NodeType::create`], but see if it is necessary to add nodes
    /// to the start or end of the given content to make it conform to this
    /// type's content expression, and if so, synthesize those from their
    /// default attributes. Returns `Ok(None)` when no fitting completion
    /// exists.
    pub fn create_and_fill(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: MarkSet,
    ) -> Result<Option<Node>, SchemaError> {
        if self.is_text() {
            return Err(SchemaError::TextViaCreate);
        }
        let attrs = self.compute_attrs(attrs)?;
        let mut content = content.into();
        if content.size() > 0 {
            let before = match self.content_match().fill_before(&content, false, 0) {
                Some(before) => before,
                None => return Ok(None),
            };
            content = before.append(content);
        }
        let after = match self
            .content_match()
            .match_fragment(&content)
            .and_then(|m| m.fill_before(&Fragment::EMPTY, true, 0))
        {
            Some(after) => after,
            None => return Ok(None),
        };
        Ok(Some(Node::new(
            self.clone(),
            attrs,
            content.append(after),
            marks,
        )))
    }

    /// Returns true if the given fragment is valid content for this type.
    pub fn valid_content(&self, content: &Fragment) -> bool {
        match self.content_match().match_fragment(content) {
            Some(result) if result.valid_end() => content
                .children()
                .iter()
                .all(|child| self.allows_marks(child.marks())),
            _ => false,
        }
    }

    /// Check whether the given mark type is allowed in this node.
    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match &self.data().mark_set {
            None => true,
            Some(set) => set.contains(&mark_type.id),
        }
    }

    /// Check whether every mark in the given set is allowed in this node.
    pub fn allows_marks(&self, marks: &MarkSet) -> bool {
        marks
            .into_iter()
            .all(|mark| self.allows_mark_type(mark.r#type()))
    }

    /// Remove the marks that are not allowed in this node from the set.
    pub fn allowed_marks(&self, marks: &MarkSet) -> MarkSet {
        if self.data().mark_set.is_none() {
            return marks.clone();
        }
        MarkSet::from_sorted(
            marks
                .into_iter()
                .filter(|mark| self.allows_mark_type(mark.r#type()))
                .cloned()
                .collect(),
        )
    }

    /// True when this type's content could be joined with the other type's:
    /// either they are the same type, or some node type is legal in both.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(&other.content_match())
    }
}

/// A handle on a mark type in a schema.
#[derive(Clone)]
pub struct MarkType {
    schema: Schema,
    id: MarkId,
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.schema == other.schema
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}

impl MarkType {
    pub(crate) fn new(schema: Schema, id: MarkId) -> Self {
        MarkType { schema, id }
    }

    fn data(&self) -> &MarkTypeData {
        self.schema.mark_data(self.id)
    }

    /// The name of this type.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The schema this type belongs to.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec this type was compiled from.
    pub fn spec(&self) -> &MarkSpec {
        &self.data().spec
    }

    /// The position of this type in the schema's mark declaration order.
    /// Mark sets are kept sorted by rank.
    pub fn rank(&self) -> usize {
        self.data().rank
    }

    /// Whether marks of this type extend onto content inserted at their end
    /// boundary.
    pub fn inclusive(&self) -> bool {
        self.data().spec.inclusive
    }

    /// Create a mark of this type with the given attributes.
    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark, SchemaError> {
        let data = self.data();
        let attrs = compute_attrs(&data.attrs, &data.default_attrs, attrs, &data.name)?;
        Ok(Mark::new(self.clone(), attrs))
    }

    /// True when this mark type may not coexist with the other.
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.data().excluded.contains(&other.id)
    }

    /// Find a mark of this type in the given set, if any.
    pub fn is_in_set<'a>(&self, set: &'a MarkSet) -> Option<&'a Mark> {
        set.into_iter().find(|mark| mark.r#type() == self)
    }

    /// Remove all marks of this type from the given set.
    pub fn remove_from_set(&self, set: &MarkSet) -> MarkSet {
        MarkSet::from_sorted(
            set.into_iter()
                .filter(|mark| mark.r#type() != self)
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SchemaSpec {
        SchemaSpec {
            nodes: vec![
                (
                    "doc".into(),
                    NodeSpec {
                        content: Some("paragraph+".into()),
                        ..Default::default()
                    },
                ),
                (
                    "paragraph".into(),
                    NodeSpec {
                        content: Some("text*".into()),
                        ..Default::default()
                    },
                ),
                ("text".into(), NodeSpec::default()),
            ],
            marks: vec![
                ("em".into(), MarkSpec::default()),
                ("strong".into(), MarkSpec::default()),
            ],
            top_node: None,
        }
    }

    #[test]
    fn compiles_a_minimal_schema() {
        let schema = Schema::new(spec()).unwrap();
        let doc = schema.node_type("doc").unwrap();
        assert_eq!(doc.name(), "doc");
        assert!(doc.is_block());
        assert!(!doc.inline_content());
        let p = schema.node_type("paragraph").unwrap();
        assert!(p.is_textblock());
        assert!(p.inline_content());
        let text = schema.text_type();
        assert!(text.is_text());
        assert!(text.is_leaf());
        assert!(text.is_inline());
        assert_eq!(schema.top_node_type(), doc);
    }

    #[test]
    fn requires_a_text_type() {
        let mut s = spec();
        s.nodes.retain(|(name, _)| name != "text");
        s.nodes[1].1.content = None;
        assert_eq!(Schema::new(s).unwrap_err(), SchemaError::MissingTextType);
    }

    #[test]
    fn requires_the_top_node() {
        let mut s = spec();
        s.top_node = Some("article".into());
        assert_eq!(
            Schema::new(s).unwrap_err(),
            SchemaError::MissingTopNode("article".into())
        );
    }

    #[test]
    fn rejects_a_name_used_twice() {
        let mut s = spec();
        s.marks.push(("paragraph".into(), MarkSpec::default()));
        assert_eq!(
            Schema::new(s).unwrap_err(),
            SchemaError::DuplicateName("paragraph".into())
        );
    }

    #[test]
    fn rejects_attrs_on_text() {
        let mut s = spec();
        s.nodes[2].1.attrs = vec![("lang".into(), AttributeSpec::required())];
        assert_eq!(Schema::new(s).unwrap_err(), SchemaError::TextTypeWithAttrs);
    }

    #[test]
    fn rejects_an_unknown_name_in_an_expression() {
        let mut s = spec();
        s.nodes[0].1.content = Some("section+".into());
        assert_eq!(
            Schema::new(s).unwrap_err(),
            SchemaError::UnknownExprName {
                name: "section".into(),
                expr: "section+".into()
            }
        );
    }

    #[test]
    fn rank_order_follows_declaration() {
        let schema = Schema::new(spec()).unwrap();
        assert_eq!(schema.mark_type("em").unwrap().rank(), 0);
        assert_eq!(schema.mark_type("strong").unwrap().rank(), 1);
    }

    #[test]
    fn same_type_marks_exclude_each_other_by_default() {
        let schema = Schema::new(spec()).unwrap();
        let em = schema.mark_type("em").unwrap();
        let strong = schema.mark_type("strong").unwrap();
        assert!(em.excludes(&em));
        assert!(!em.excludes(&strong));
    }

    #[test]
    fn missing_required_attr_is_an_error() {
        let mut s = spec();
        s.nodes.insert(
            2,
            (
                "image".into(),
                NodeSpec {
                    inline: true,
                    attrs: vec![("src".into(), AttributeSpec::required())],
                    ..Default::default()
                },
            ),
        );
        s.nodes[1].1.content = Some("(text | image)*".into());
        let schema = Schema::new(s).unwrap();
        let image = schema.node_type("image").unwrap();
        assert!(image.has_required_attrs());
        assert_eq!(image.default_attrs(), None);
        assert_eq!(
            image
                .create(None, Fragment::EMPTY, MarkSet::NONE)
                .unwrap_err(),
            SchemaError::MissingAttr {
                owner: "image".into(),
                attr: "src".into()
            }
        );
    }
}
