use super::schema::{MatchId, NodeId, Schema, SchemaError};
use super::{range_span, Fragment, MarkSet, NodeType};
use displaydoc::Display;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeBounds;
use thiserror::Error;

/// Error on content matching
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum ContentMatchError {
    /// called content_match_at on a node with invalid content
    InvalidContent,
}

/// One state of the deterministic automaton compiled from a node type's
/// content expression.
///
/// A match can be stepped over child node types to find out whether further
/// content is legal here, and whether the current position is a valid end
/// for the node.
#[derive(Clone)]
pub struct ContentMatch {
    schema: Schema,
    id: MatchId,
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.schema == other.schema
    }
}

impl Eq for ContentMatch {}

impl fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("ContentMatch")
            .field("valid_end", &data.valid_end)
            .field(
                "next",
                &data
                    .edges
                    .iter()
                    .map(|(t, _)| self.schema.node_data(*t).name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ContentMatch {
    pub(crate) fn new(schema: Schema, id: MatchId) -> Self {
        ContentMatch { schema, id }
    }

    fn data(&self) -> &MatchNode {
        self.schema.match_node(self.id)
    }

    /// True when this match state represents a valid end of the node.
    pub fn valid_end(&self) -> bool {
        self.data().valid_end
    }

    /// Match a node type, returning a match after that node if successful.
    pub fn match_type(&self, r#type: &NodeType) -> Option<ContentMatch> {
        self.data()
            .edges
            .iter()
            .find(|(t, _)| *t == r#type.id())
            .map(|(_, next)| ContentMatch::new(self.schema.clone(), *next))
    }

    /// Try to match a fragment. Returns the resulting match when successful.
    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.match_fragment_range(fragment, ..)
    }

    /// Try to match a part of a fragment. Returns the resulting match when
    /// successful.
    pub fn match_fragment_range<R: RangeBounds<usize>>(
        &self,
        fragment: &Fragment,
        range: R,
    ) -> Option<ContentMatch> {
        let (start, end) = range_span(range, fragment.child_count());

        let mut test = self.clone();
        for child in &fragment.children()[start..end] {
            test = test.match_type(child.r#type())?;
        }
        Some(test)
    }

    /// The number of outgoing edges of this state.
    pub fn edge_count(&self) -> usize {
        self.data().edges.len()
    }

    /// Get the `index`-th outgoing edge as a `(type, next state)` pair.
    /// Panics when the index is out of range.
    pub fn edge(&self, index: usize) -> (NodeType, ContentMatch) {
        let (t, next) = self.data().edges[index];
        (
            self.schema.node_type_by_id(t),
            ContentMatch::new(self.schema.clone(), next),
        )
    }

    /// Iterate over the `(type, next state)` edges of this state.
    pub fn edges(&self) -> impl Iterator<Item = (NodeType, ContentMatch)> + '_ {
        (0..self.edge_count()).map(move |i| self.edge(i))
    }

    /// True if this state's edges consume inline types.
    pub fn inline_content(&self) -> bool {
        let data = self.data();
        !data.edges.is_empty()
            && data
                .edges
                .iter()
                .all(|(t, _)| !self.schema.node_data(*t).is_block)
    }

    /// The first matching type that can be generated, i.e. is not a text
    /// node and does not have required attributes.
    pub fn default_type(&self) -> Option<NodeType> {
        self.edges()
            .map(|(t, _)| t)
            .find(|t| !(t.is_text() || t.has_required_attrs()))
    }

    /// True if the two states share a possible next type. Used to check
    /// whether nodes of two different types can be joined.
    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.data()
            .edges
            .iter()
            .any(|(t, _)| other.data().edges.iter().any(|(o, _)| t == o))
    }

    /// Try to match the given fragment from `start_index` on, and if that
    /// does not work, synthesize a shortest sequence of generatable nodes
    /// that makes it match (ending in a valid end state when `to_end` is
    /// set). Returns `None` when no such sequence exists.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        // `seen` bounds the search: every automaton state is tried at most
        // once.
        let mut seen = vec![self.id];
        self.fill_search(after, to_end, start_index, &mut seen, &mut Vec::new())
    }

    fn fill_search(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
        seen: &mut Vec<MatchId>,
        types: &mut Vec<NodeType>,
    ) -> Option<Fragment> {
        if let Some(finished) = self.match_fragment_range(after, start_index..) {
            if !to_end || finished.valid_end() {
                let mut nodes = Vec::with_capacity(types.len());
                let mut ok = true;
                for tp in types.iter() {
                    match tp.create_and_fill(None, Fragment::EMPTY, MarkSet::NONE) {
                        Ok(Some(node)) => nodes.push(node),
                        _ => {
                            ok = false;
                            break;
                        }
                    }
                }
                if ok {
                    return Some(Fragment::from(nodes));
                }
            }
        }
        for &(t, next) in &self.data().edges {
            let tp = self.schema.node_type_by_id(t);
            if !(tp.is_text() || tp.has_required_attrs()) && !seen.contains(&next) {
                seen.push(next);
                types.push(tp);
                let found = ContentMatch::new(self.schema.clone(), next)
                    .fill_search(after, to_end, start_index, seen, types);
                types.pop();
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    /// Find a set of wrapping node types that would allow a node of the
    /// given type to appear at this position. The result is ordered from
    /// outermost to innermost, and may be empty when the type is directly
    /// matched.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Active {
            state: MatchId,
            r#type: Option<NodeType>,
            via: Option<usize>,
        }

        let mut seen: Vec<NodeId> = Vec::new();
        let mut active = vec![Active {
            state: self.id,
            r#type: None,
            via: None,
        }];
        let mut head = 0;
        while head < active.len() {
            let state = ContentMatch::new(self.schema.clone(), active[head].state);
            if state.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut at = head;
                while let Some(tp) = active[at].r#type.clone() {
                    result.push(tp);
                    at = active[at].via.expect("wrapping step without origin");
                }
                result.reverse();
                return Some(result);
            }
            for (tp, next) in state.edges() {
                if !tp.is_leaf()
                    && !tp.has_required_attrs()
                    && !seen.contains(&tp.id())
                    && (active[head].r#type.is_none() || next.valid_end())
                {
                    seen.push(tp.id());
                    active.push(Active {
                        state: next.id,
                        r#type: Some(tp),
                        via: Some(head),
                    });
                }
            }
            head += 1;
        }
        None
    }
}

/// One state of a compiled content expression, stored in the schema's
/// match arena. `MatchId(0)` is the shared empty match.
#[derive(Debug, Clone)]
pub(crate) struct MatchNode {
    pub(crate) valid_end: bool,
    pub(crate) edges: Vec<(NodeId, MatchId)>,
}

impl MatchNode {
    pub(crate) fn empty() -> Self {
        MatchNode {
            valid_end: true,
            edges: Vec::new(),
        }
    }
}

/// Compile a content expression into the match arena and return its
/// starting state.
pub(crate) fn compile(
    expr: &str,
    types: &[(String, Vec<String>)],
    arena: &mut Vec<MatchNode>,
) -> Result<MatchId, SchemaError> {
    let ast = Parser::new(expr, types).parse()?;
    let nfa = Nfa::build(&ast);
    Ok(nfa.to_dfa(arena))
}

/// Verify that no state of the expression requires content that could never
/// be generated from default attributes.
pub(crate) fn check_dead_ends(
    start: MatchId,
    arena: &[MatchNode],
    generatable: &[bool],
    types: &[(String, Vec<String>)],
    expr: &str,
) -> Result<(), SchemaError> {
    let mut work = vec![start];
    let mut i = 0;
    while i < work.len() {
        let state = &arena[work[i].0];
        let mut dead = !state.valid_end;
        let mut nodes = Vec::new();
        for &(t, next) in &state.edges {
            nodes.push(types[t.0].0.as_str());
            if dead && generatable[t.0] {
                dead = false;
            }
            if !work.contains(&next) {
                work.push(next);
            }
        }
        if dead {
            return Err(SchemaError::DeadEnd {
                expr: expr.to_owned(),
                nodes: nodes.join(", "),
            });
        }
        i += 1;
    }
    Ok(())
}

enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(NodeId),
}

struct Parser<'a> {
    expr: &'a str,
    types: &'a [(String, Vec<String>)],
    tokens: Vec<String>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str, types: &'a [(String, Vec<String>)]) -> Self {
        let mut tokens = Vec::new();
        let mut word = String::new();
        for c in expr.chars() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
            } else {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                if !c.is_whitespace() {
                    tokens.push(c.to_string());
                }
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
        Parser {
            expr,
            types,
            tokens,
            pos: 0,
        }
    }

    fn err<T>(&self, msg: impl Into<String>) -> Result<T, SchemaError> {
        Err(SchemaError::ExprSyntax {
            expr: self.expr.to_owned(),
            msg: msg.into(),
        })
    }

    fn next(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.next() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse(mut self) -> Result<Expr, SchemaError> {
        let expr = self.parse_expr()?;
        if self.next().is_some() {
            return self.err("unexpected trailing input");
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = vec![self.parse_expr_seq()?];
        while self.eat("|") {
            exprs.push(self.parse_expr_seq()?);
        }
        Ok(if exprs.len() == 1 {
            exprs.pop().expect("one element")
        } else {
            Expr::Choice(exprs)
        })
    }

    fn parse_expr_seq(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = Vec::new();
        loop {
            match self.next() {
                None => break,
                Some(")") | Some("|") => break,
                Some(_) => exprs.push(self.parse_expr_subscript()?),
            }
        }
        if exprs.is_empty() {
            return self.err("expected an expression");
        }
        Ok(if exprs.len() == 1 {
            exprs.pop().expect("one element")
        } else {
            Expr::Seq(exprs)
        })
    }

    fn parse_expr_subscript(&mut self) -> Result<Expr, SchemaError> {
        let mut expr = self.parse_expr_atom()?;
        loop {
            if self.eat("+") {
                expr = Expr::Plus(Box::new(expr));
            } else if self.eat("*") {
                expr = Expr::Star(Box::new(expr));
            } else if self.eat("?") {
                expr = Expr::Opt(Box::new(expr));
            } else if self.eat("{") {
                expr = self.parse_expr_range(expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_num(&mut self) -> Result<usize, SchemaError> {
        match self.next() {
            Some(tok) if tok.chars().all(|c| c.is_ascii_digit()) => {
                let n = tok.parse::<usize>().map_err(|_| SchemaError::ExprSyntax {
                    expr: self.expr.to_owned(),
                    msg: format!("number out of range: '{}'", tok),
                })?;
                self.pos += 1;
                Ok(n)
            }
            other => self.err(format!("expected a number, got {:?}", other)),
        }
    }

    fn parse_expr_range(&mut self, expr: Expr) -> Result<Expr, SchemaError> {
        let min = self.parse_num()?;
        let max = if self.eat(",") {
            if self.next() == Some("}") {
                None
            } else {
                Some(self.parse_num()?)
            }
        } else {
            Some(min)
        };
        if !self.eat("}") {
            return self.err("unclosed braced count");
        }
        if let Some(max) = max {
            if max < min {
                return self.err("maximum repeat count below minimum");
            }
        }
        Ok(Expr::Range {
            min,
            max,
            expr: Box::new(expr),
        })
    }

    fn parse_expr_atom(&mut self) -> Result<Expr, SchemaError> {
        if self.eat("(") {
            let expr = self.parse_expr()?;
            if !self.eat(")") {
                return self.err("missing closing paren");
            }
            return Ok(expr);
        }
        match self.next() {
            Some(tok) if tok.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                let name = tok.to_owned();
                self.pos += 1;
                let mut ids: Vec<NodeId> = Vec::new();
                for (i, (type_name, groups)) in self.types.iter().enumerate() {
                    if *type_name == name || groups.iter().any(|g| *g == name) {
                        ids.push(NodeId(i));
                    }
                }
                if ids.is_empty() {
                    return Err(SchemaError::UnknownExprName {
                        name,
                        expr: self.expr.to_owned(),
                    });
                }
                Ok(if ids.len() == 1 {
                    Expr::Name(ids[0])
                } else {
                    Expr::Choice(ids.into_iter().map(Expr::Name).collect())
                })
            }
            other => self.err(format!("unexpected token {:?}", other)),
        }
    }
}

/// A nondeterministic automaton under construction: per-node edge lists
/// whose targets are patched in as the expression tree is lowered.
struct Nfa {
    nodes: Vec<Vec<NfaEdge>>,
}

#[derive(Clone, Copy)]
struct NfaEdge {
    term: Option<NodeId>,
    to: Option<usize>,
}

impl Nfa {
    fn build(expr: &Expr) -> Nfa {
        let mut nfa = Nfa {
            nodes: vec![Vec::new()],
        };
        let dangling = nfa.compile(expr, 0);
        let accept = nfa.node();
        nfa.connect(&dangling, accept);
        nfa
    }

    fn node(&mut self) -> usize {
        self.nodes.push(Vec::new());
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: usize, term: Option<NodeId>, to: Option<usize>) -> (usize, usize) {
        self.nodes[from].push(NfaEdge { term, to });
        (from, self.nodes[from].len() - 1)
    }

    fn connect(&mut self, dangling: &[(usize, usize)], to: usize) {
        for &(node, edge) in dangling {
            self.nodes[node][edge].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<(usize, usize)> {
        match expr {
            Expr::Choice(exprs) => {
                let mut out = Vec::new();
                for e in exprs {
                    out.extend(self.compile(e, from));
                }
                out
            }
            Expr::Seq(exprs) => {
                let mut from = from;
                let last = exprs.len() - 1;
                for (i, e) in exprs.iter().enumerate() {
                    let next = self.compile(e, from);
                    if i == last {
                        return next;
                    }
                    let node = self.node();
                    self.connect(&next, node);
                    from = node;
                }
                unreachable!("empty sequence")
            }
            Expr::Star(e) => {
                let lp = self.node();
                self.edge(from, None, Some(lp));
                let inner = self.compile(e, lp);
                self.connect(&inner, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Plus(e) => {
                let lp = self.node();
                let inner = self.compile(e, from);
                self.connect(&inner, lp);
                let inner = self.compile(e, lp);
                self.connect(&inner, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Opt(e) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(e, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let inner = self.compile(expr, cur);
                    self.connect(&inner, next);
                    cur = next;
                }
                match max {
                    None => {
                        let inner = self.compile(expr, cur);
                        self.connect(&inner, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, None, Some(next));
                            let inner = self.compile(expr, cur);
                            self.connect(&inner, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(id) => vec![self.edge(from, Some(*id), None)],
        }
    }

    fn target(&self, edge: NfaEdge) -> usize {
        edge.to.expect("dangling automaton edge")
    }

    /// The epsilon closure of a node, sorted and deduplicated.
    fn null_from(&self, from: usize) -> Vec<usize> {
        let mut result = Vec::new();
        self.scan(from, &mut result);
        result.sort_unstable();
        result.dedup();
        result
    }

    fn scan(&self, node: usize, result: &mut Vec<usize>) {
        let edges = &self.nodes[node];
        // Skip over nodes with a single epsilon edge.
        if edges.len() == 1 && edges[0].term.is_none() {
            return self.scan(self.target(edges[0]), result);
        }
        result.push(node);
        for &edge in edges {
            if edge.term.is_none() && !result.contains(&self.target(edge)) {
                self.scan(self.target(edge), result);
            }
        }
    }

    /// Subset-convert into the shared arena, interning states by their NFA
    /// node sets.
    fn to_dfa(&self, arena: &mut Vec<MatchNode>) -> MatchId {
        let mut labeled = HashMap::new();
        self.explore(self.null_from(0), &mut labeled, arena)
    }

    fn explore(
        &self,
        states: Vec<usize>,
        labeled: &mut HashMap<Vec<usize>, MatchId>,
        arena: &mut Vec<MatchNode>,
    ) -> MatchId {
        let accept = self.nodes.len() - 1;
        let mut out: Vec<(NodeId, Vec<usize>)> = Vec::new();
        for &node in &states {
            for &edge in &self.nodes[node] {
                let term = match edge.term {
                    Some(term) => term,
                    None => continue,
                };
                let closure = self.null_from(self.target(edge));
                let at = match out.iter().position(|(t, _)| *t == term) {
                    Some(at) => at,
                    None => {
                        out.push((term, Vec::new()));
                        out.len() - 1
                    }
                };
                let set = &mut out[at].1;
                for n in closure {
                    if !set.contains(&n) {
                        set.push(n);
                    }
                }
            }
        }

        let id = MatchId(arena.len());
        arena.push(MatchNode {
            valid_end: states.contains(&accept),
            edges: Vec::new(),
        });
        labeled.insert(states, id);

        let mut edges = Vec::with_capacity(out.len());
        for (term, mut set) in out {
            set.sort_unstable();
            let next = match labeled.get(&set) {
                Some(&next) => next,
                None => self.explore(set, labeled, arena),
            };
            edges.push((term, next));
        }
        arena[id.0].edges = edges;
        id
    }
}
