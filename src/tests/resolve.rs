use crate::basic::helper::{blockquote, doc, em, p, text};
use crate::model::{Node, ResolveError};

#[derive(Debug, Copy, Clone, PartialEq)]
struct Sol<'a> {
    node: &'a Node,
    start: usize,
    end: usize,
}

fn sol(node: &Node, start: usize, end: usize) -> Sol {
    Sol { node, start, end }
}

#[derive(Copy, Clone, Debug)]
enum Exp<'a> {
    Node(&'a Node),
    Str(&'static str),
    Null,
}

fn matches_exp(actual: &Option<Node>, exp: Exp) -> bool {
    match (actual, exp) {
        (Some(node), Exp::Node(exp_node)) => node == exp_node,
        (Some(node), Exp::Str(text)) => node.text_content() == text,
        (None, Exp::Null) => true,
        _ => false,
    }
}

#[test]
fn resolves_positions_through_the_tree() {
    let test_doc = doc((p("ab"), blockquote(p(vec![em("cd"), text("ef")]))));
    let _doc = sol(&test_doc, 0, 12);
    let _p1 = sol(test_doc.child(0), 1, 3);
    let _blk = sol(test_doc.child(1), 5, 11);
    let _p2 = sol(_blk.node.child(0), 6, 10);

    let expected = [
        (&[_doc][..], 0, Exp::Null, Exp::Node(_p1.node)),
        (&[_doc, _p1][..], 0, Exp::Null, Exp::Str("ab")),
        (&[_doc, _p1][..], 1, Exp::Str("a"), Exp::Str("b")),
        (&[_doc, _p1][..], 2, Exp::Str("ab"), Exp::Null),
        (&[_doc][..], 4, Exp::Node(_p1.node), Exp::Node(_blk.node)),
        (&[_doc, _blk][..], 0, Exp::Null, Exp::Node(_p2.node)),
        (&[_doc, _blk, _p2][..], 0, Exp::Null, Exp::Str("cd")),
        (&[_doc, _blk, _p2][..], 1, Exp::Str("c"), Exp::Str("d")),
        (&[_doc, _blk, _p2][..], 2, Exp::Str("cd"), Exp::Str("ef")),
        (&[_doc, _blk, _p2][..], 3, Exp::Str("e"), Exp::Str("f")),
        (&[_doc, _blk, _p2][..], 4, Exp::Str("ef"), Exp::Null),
        (&[_doc, _blk][..], 6, Exp::Node(_p2.node), Exp::Null),
        (&[_doc][..], 12, Exp::Node(_blk.node), Exp::Null),
    ];

    for (pos, (path, parent_offset, before, after)) in expected.iter().enumerate() {
        let rp = test_doc.resolve(pos).unwrap();
        assert_eq!(rp.depth(), path.len() - 1, "depth at {}", pos);

        for (i, exp_i) in path.iter().enumerate() {
            let act = sol(rp.node(i), rp.start(i), rp.end(i));
            assert_eq!((pos, &act), (pos, exp_i));
            if i > 0 {
                assert_eq!(rp.before(i), Some(exp_i.start - 1));
                assert_eq!(rp.after(i), Some(exp_i.end + 1));
            }
        }
        assert_eq!(rp.parent_offset(), *parent_offset, "parent_offset at {}", pos);
        assert!(
            matches_exp(&rp.node_before(), *before),
            "node_before at {}: {:?} vs {:?}",
            pos,
            rp.node_before(),
            before
        );
        assert!(
            matches_exp(&rp.node_after(), *after),
            "node_after at {}: {:?} vs {:?}",
            pos,
            rp.node_after(),
            after
        );
    }
}

#[test]
fn resolve_round_trips_every_position() {
    let d = doc((p("hello"), p("world")));
    for pos in 0..=d.content().size() {
        let rp = d.resolve(pos).unwrap();
        assert_eq!(rp.pos(), pos);
        assert_eq!(rp.start(rp.depth()) + rp.parent_offset(), pos);
    }
    assert_eq!(
        d.resolve(d.content().size() + 1),
        Err(ResolveError::RangeError {
            pos: d.content().size() + 1
        })
    );
}

#[test]
fn resolves_paragraph_starts() {
    let d = doc((p("hello"), p("world")));
    // Start of the first paragraph's content.
    let rp = d.resolve(1).unwrap();
    assert_eq!(rp.depth(), 1);
    assert_eq!(rp.parent().r#type().name(), "paragraph");
    assert_eq!(rp.parent_offset(), 0);
    // Start of the second paragraph's content.
    let rp = d.resolve(8).unwrap();
    assert_eq!(rp.depth(), 1);
    assert_eq!(rp.parent().r#type().name(), "paragraph");
    assert_eq!(rp.parent_offset(), 0);
    assert_eq!(rp.index(0), 1);
    // One character in.
    let rp = d.resolve(9).unwrap();
    assert_eq!(rp.parent_offset(), 1);
    assert_eq!(rp.text_offset(), 1);
    // The last position inside the second paragraph.
    let rp = d.resolve(13).unwrap();
    assert_eq!(rp.pos(), 13);
    assert_eq!(rp.parent_offset(), 5);
}

#[test]
fn caches_resolutions_per_document() {
    let d = doc(p("cached"));
    let first = d.resolve(3).unwrap();
    let second = d.resolve(3).unwrap();
    assert_eq!(first, second);

    // A value-equal but distinct document resolves fresh.
    let d2 = doc(p("cached"));
    let third = d2.resolve(3).unwrap();
    assert_eq!(first, third);
}

#[test]
fn index_after_and_pos_at_index() {
    let d = doc((p("ab"), p("cd")));
    let rp = d.resolve(4).unwrap();
    assert_eq!(rp.depth(), 0);
    assert_eq!(rp.index(0), 1);
    assert_eq!(rp.index_after(0), 1);
    assert_eq!(rp.pos_at_index(1, 0), 4);

    let inside = d.resolve(2).unwrap();
    assert_eq!(inside.index_after(1), 1);
    assert_eq!(inside.pos_at_index(0, 1), 1);
}

#[test]
fn shared_depth_finds_the_common_ancestor_level() {
    let d = doc((p("ab"), blockquote(p("cd"))));
    let rp = d.resolve(7).unwrap();
    assert_eq!(rp.depth(), 2);
    assert_eq!(rp.shared_depth(7), 2);
    assert_eq!(rp.shared_depth(6), 2);
    assert_eq!(rp.shared_depth(5), 1);
    assert_eq!(rp.shared_depth(2), 0);
    assert_eq!(rp.shared_depth(0), 0);
}

#[test]
fn block_range_finds_the_surrounding_blocks() {
    let d = doc(blockquote((p("ab"), p("cd"))));
    let from = d.resolve(3).unwrap();
    let to = d.resolve(7).unwrap();
    let range = from.block_range(&to, None).unwrap();
    assert_eq!(range.depth, 1);
    assert_eq!(range.parent().r#type().name(), "blockquote");
    assert_eq!(range.start_index(), 0);
    assert_eq!(range.end_index(), 2);
    assert_eq!(range.start(), 1);
    assert_eq!(range.end(), 9);

    // Within a single paragraph the range surrounds just that paragraph.
    let from = d.resolve(2).unwrap();
    let to = d.resolve(3).unwrap();
    let range = from.block_range(&to, None).unwrap();
    assert_eq!(range.depth, 1);
    assert_eq!(range.start_index(), 0);
    assert_eq!(range.end_index(), 1);

    // A predicate can reject parents.
    let range = from.block_range(&to, Some(&|node: &Node| node.r#type().name() == "doc"));
    assert_eq!(range.unwrap().depth, 0);
}
