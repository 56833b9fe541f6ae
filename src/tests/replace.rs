use crate::basic::helper::{blockquote, doc, h1, li, p, ul};
use crate::model::{Fragment, Node, ReplaceError, Slice};
use std::fmt::Debug;
use std::ops::{Range, RangeBounds};

fn rpl<DR: RangeBounds<usize> + Debug, SR: RangeBounds<usize> + Debug>(
    (doc, range): (Node, DR),
    insert: Option<(Node, SR)>,
    expected: Node,
) {
    let slice = insert
        .map(|(n, r)| n.slice(r, false).unwrap())
        .unwrap_or_default();

    assert_eq!(doc.replace(range, &slice), Ok(expected));
}

#[test]
fn join_on_delete() {
    let t = doc((p("one"), p("two")));
    let e = doc(p("onwo"));
    rpl::<_, Range<usize>>((t, 3..7), None, e);
}

#[test]
fn merges_matching_blocks() {
    let t = doc((p("one"), p("two")));
    let i = doc((p("xxxx"), p("yyyy")));

    let f = Fragment::from(vec![p("xx"), p("yy")]);
    assert_eq!(i.slice(3..9, false), Ok(Slice::new(f, 1, 1)));

    let e = doc((p("onxx"), p("yywo")));
    rpl((t, 3..7), Some((i, 3..9)), e);
}

#[test]
fn merges_when_adding_text() {
    let t = doc((p("one"), p("two")));
    let i = doc(p("H"));
    let e = doc(p("onHwo"));
    rpl((t, 3..7), Some((i, 1..2)), e);
}

#[test]
fn can_insert_text() {
    let t = doc((p("before"), p("one"), p("after")));
    let i = doc(p("H"));
    let e = doc((p("before"), p("onHe"), p("after")));
    rpl((t, 11..11), Some((i, 1..2)), e);
}

#[test]
fn doesnt_merge_non_matching_blocks() {
    let t = doc((p("one"), p("two")));
    let i = doc(h1("H"));
    let e = doc(p("onHwo"));
    rpl((t, 3..7), Some((i, 1..2)), e);
}

#[test]
fn can_merge_a_nested_node() {
    let t = doc(blockquote(blockquote((p("one"), p("two")))));
    let i = doc(p("H"));
    let e = doc(blockquote(blockquote(p("onHwo"))));
    rpl((t, 5..9), Some((i, 1..2)), e);
}

#[test]
fn can_replace_within_a_block() {
    let t = doc(blockquote(p("abcd")));
    let i = doc(p("xyz"));
    let e = doc(blockquote(p("ayd")));
    rpl((t, 3..5), Some((i, 2..3)), e);
}

#[test]
fn can_insert_a_lopsided_slice() {
    let t = doc(blockquote(blockquote((p("one"), p("two"), p("three")))));
    let i = doc(blockquote(vec![p("aaaa"), p("bb"), p("cc"), p("dd")]));
    let e = doc(blockquote(blockquote(vec![
        p("onaa"),
        p("bb"),
        p("cc"),
        p("three"),
    ])));
    rpl((t, 5..12), Some((i, 4..15)), e);
}

#[test]
fn can_insert_a_deep_lopsided_slice() {
    let t = doc(blockquote((
        blockquote((p("one"), p("two"), p("three"))),
        p("x"),
    )));
    let i = doc((blockquote((p("aaaa"), p("bb"), p("cc"))), p("dd")));
    let e = doc(blockquote((
        blockquote((p("onaa"), p("bb"), p("cc"))),
        p("x"),
    )));
    rpl((t, 5..20), Some((i, 4..16)), e);
}

#[test]
fn can_merge_multiple_levels() {
    let t = doc((
        blockquote(blockquote(p("hello"))),
        blockquote(blockquote(p("a"))),
    ));
    let e = doc(blockquote(blockquote(p("hella"))));
    rpl::<_, Range<usize>>((t, 7..14), None, e);
}

#[test]
fn can_merge_multiple_levels_while_inserting() {
    let t = doc((
        blockquote(blockquote(p("hello"))),
        blockquote(blockquote(p("a"))),
    ));
    let i = doc(p("i"));
    let e = doc(blockquote(blockquote(p("hellia"))));
    rpl((t, 7..14), Some((i, 1..2)), e);
}

#[test]
fn can_insert_a_split() {
    let t = doc(p("foobar"));
    let i = doc((p("x"), p("y")));
    let e = doc((p("foox"), p("ybar")));
    rpl((t, 4..4), Some((i, 1..5)), e);
}

#[test]
fn can_insert_a_deep_split() {
    let t = doc(blockquote(p("fooxbar")));
    let i = doc((blockquote(p("x")), blockquote(p("y"))));
    let e = doc((blockquote(p("foox")), blockquote(p("ybar"))));
    rpl((t, 5..6), Some((i, 2..8)), e);
}

#[test]
fn can_add_a_split_one_level_up() {
    let t = doc(blockquote((p("foou"), p("vbar"))));
    let i = doc((blockquote(p("x")), blockquote(p("y"))));
    let e = doc((blockquote(p("foox")), blockquote(p("ybar"))));
    rpl((t, 5..9), Some((i, 2..8)), e);
}

#[test]
fn keeps_the_node_type_of_the_left_node() {
    let t = doc(h1("foobar"));
    let i = doc(p("foobaz"));
    let e = doc(h1("foobaz"));
    rpl((t, 4..8), Some((i, 4..8)), e);
}

#[test]
fn keeps_the_node_type_even_when_empty() {
    let t = doc(h1("bar"));
    let i = doc(p("foobaz"));
    let e = doc(h1("baz"));
    rpl((t, 1..5), Some((i, 4..8)), e);
}

fn bad<DR: RangeBounds<usize> + Debug, SR: RangeBounds<usize> + Debug>(
    (doc, range): (Node, DR),
    insert: Option<(Node, SR)>,
    pattern: ReplaceError,
) {
    let slice = insert
        .map(|(n, r)| n.slice(r, false).unwrap())
        .unwrap_or_default();
    assert_eq!(doc.replace(range, &slice), Err(pattern));
}

fn node_type(name: &str) -> crate::model::NodeType {
    crate::basic::helper::basic_schema().node_type(name).unwrap()
}

#[test]
fn doesnt_allow_the_left_side_to_be_too_deep() {
    let t = doc(p(Fragment::EMPTY));
    let i = doc(blockquote(p(Fragment::EMPTY)));
    bad((t, 1..1), Some((i, 2..4)), ReplaceError::InsertTooDeep);
}

#[test]
fn doesnt_allow_a_depth_mismatch() {
    let t = doc(p(Fragment::EMPTY));
    let i = doc(p(Fragment::EMPTY));
    bad(
        (t, 1..1),
        Some((i, 0..1)),
        ReplaceError::InconsistentOpenDepths {
            from_depth: 1,
            open_start: 0,
            to_depth: 1,
            open_end: 1,
        },
    );
}

#[test]
fn rejects_a_bad_fit() {
    let t = doc(Fragment::EMPTY);
    let i = doc(p("foo"));
    bad(
        (t, 0..0),
        Some((i, 1..4)),
        ReplaceError::InvalidContent(node_type("doc")),
    );
}

#[test]
fn rejects_unjoinable_content() {
    let t = doc(ul(li(p("a"))));
    let i = doc(p("foo"));
    bad(
        (t, 6..7),
        Some((i, 4..5)),
        ReplaceError::CannotJoin(node_type("paragraph"), node_type("bullet_list")),
    );
}

#[test]
fn rejects_an_unjoinable_delete() {
    let t = doc((blockquote(p("a")), ul(li(p("b")))));
    bad::<_, Range<usize>>(
        (t, 4..6),
        None,
        ReplaceError::CannotJoin(node_type("bullet_list"), node_type("blockquote")),
    );
}

#[test]
fn check_content_validity() {
    let t = doc(blockquote(p("hi")));
    let i = doc(blockquote("hi"));
    bad(
        (t, 1..6),
        Some((i, 3..4)),
        ReplaceError::InvalidContent(node_type("blockquote")),
    );
}

#[test]
fn slice_then_replace_is_identity() {
    let d = doc(p("abcdef"));
    let slice = d.slice(2..4, false).unwrap();
    assert_eq!(d.replace(2..4, &slice), Ok(d.clone()));
}

#[test]
fn slice_then_replace_is_identity_everywhere() {
    let d = doc((p("ab"), blockquote(p(vec![
        crate::basic::helper::em("cd"),
        crate::basic::helper::text("ef"),
    ]))));
    let size = d.content().size();
    for from in 0..=size {
        for to in from..=size {
            let slice = d.slice(from..to, false).unwrap();
            assert_eq!(
                d.replace(from..to, &slice),
                Ok(d.clone()),
                "identity failed for {}..{}",
                from,
                to
            );
        }
    }
}

#[test]
fn rejects_nesting_a_paragraph_in_a_paragraph() {
    // A paragraph can not contain another paragraph.
    let d = doc(p("x"));
    let slice = Slice::new(Fragment::from(p("y")), 0, 0);
    assert_eq!(
        d.replace(1..1, &slice),
        Err(ReplaceError::InvalidContent(node_type("paragraph")))
    );
}

#[test]
fn max_open_stops_at_leaves() {
    let frag = Fragment::from(blockquote(p("a")));
    let slice = Slice::max_open(frag.clone(), true);
    assert_eq!((slice.open_start, slice.open_end), (2, 2));
    assert_eq!(slice.size(), frag.size() - 4);

    let hr = crate::basic::helper::hr();
    let slice = Slice::max_open(Fragment::from(hr), true);
    assert_eq!((slice.open_start, slice.open_end), (0, 0));
}

#[test]
fn insert_at_within_a_slice() {
    let slice = doc((p("ab"), p("cd"))).slice(1..7, false).unwrap();
    assert_eq!(slice.open_start, 1);
    assert_eq!(slice.open_end, 1);
    let inserted = slice
        .insert_at(1, Fragment::from(crate::basic::helper::text("x")))
        .unwrap()
        .unwrap();
    assert_eq!(
        inserted.content,
        Fragment::from(vec![p("axb"), p("cd")])
    );
}

#[test]
fn remove_between_requires_a_flat_range() {
    let slice = doc((p("ab"), p("cd"))).slice(1..7, false).unwrap();
    let removed = slice.remove_between(0, 1).unwrap();
    assert_eq!(removed.content, Fragment::from(vec![p("b"), p("cd")]));
    assert!(slice.remove_between(1, 4).is_err());
}
