use crate::basic::helper::{blockquote, br, doc, em, hr, p, strong, text};
use crate::model::Fragment;

#[test]
fn construction_merges_adjacent_text() {
    let frag = Fragment::from(vec![text("foo"), text("bar")]);
    assert_eq!(frag.child_count(), 1);
    assert_eq!(frag.size(), 6);
    assert_eq!(frag.child(0).text_content(), "foobar");
}

#[test]
fn construction_keeps_differently_marked_text_apart() {
    let frag = Fragment::from(vec![text("foo"), em("bar")]);
    assert_eq!(frag.child_count(), 2);
    assert_eq!(frag.size(), 6);
}

#[test]
fn append_merges_boundary_text() {
    let a = Fragment::from(text("foo"));
    let b = Fragment::from(text("bar"));
    let joined = a.append(b);
    assert_eq!(joined.child_count(), 1);
    assert_eq!(joined.size(), 6);

    let empty = Fragment::EMPTY.append(Fragment::EMPTY);
    assert_eq!(empty, Fragment::EMPTY);
}

#[test]
fn cut_slices_text_and_nodes() {
    let d = doc((p("foo"), p("bar")));
    let content = d.content();
    // Cut inside both paragraphs.
    let cut = content.cut(2..8);
    assert_eq!(cut.child_count(), 2);
    assert_eq!(cut.child(0).text_content(), "oo");
    assert_eq!(cut.child(1).text_content(), "ba");
    // Sizes stay authoritative.
    assert_eq!(cut.size(), cut.children().iter().map(|c| c.node_size()).sum::<usize>());
    // The full range is the fragment itself.
    assert_eq!(content.cut(..), content.clone());
}

#[test]
fn cut_composes_at_child_boundaries() {
    // When the outer cut starts on a child boundary, inner offsets
    // translate directly.
    let d = doc((p("abc"), p("defg")));
    let content = d.content();
    for (a, b, a2, b2) in &[
        (0usize, 11usize, 2usize, 9usize),
        (5, 11, 1, 3),
        (0, 5, 1, 4),
        (5, 11, 0, 6),
    ] {
        let outer = content.cut(*a..*b);
        let inner = outer.cut(*a2..*b2);
        assert_eq!(
            inner,
            content.cut(a + a2..a + b2),
            "cut {}..{} then {}..{}",
            a,
            b,
            a2,
            b2
        );
    }
}

#[test]
fn replace_child_adjusts_size() {
    let frag = Fragment::from(vec![p("ab"), p("cd")]);
    let replaced = frag.replace_child(1, p("wxyz"));
    assert_eq!(replaced.size(), frag.size() + 2);
    assert_eq!(replaced.child(1).text_content(), "wxyz");
    // Replacing with an equal node returns the same content.
    assert_eq!(frag.replace_child(0, p("ab")), frag);
}

#[test]
fn add_to_start_and_end() {
    let frag = Fragment::from(p("b"));
    let frag = frag.add_to_start(p("a"));
    let frag = frag.add_to_end(p("c"));
    assert_eq!(
        frag.children()
            .iter()
            .map(|c| c.text_content())
            .collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    assert_eq!(frag.size(), 9);
}

#[test]
fn find_index_rounds_on_request() {
    let frag = Fragment::from(vec![p("a"), p("b")]);
    assert_eq!(frag.find_index(0, false).unwrap().index, 0);
    // A position on a child boundary belongs to the later child.
    assert_eq!(frag.find_index(3, false).unwrap().index, 1);
    // Inside a child, rounding decides which side wins.
    assert_eq!(frag.find_index(2, false).unwrap().index, 0);
    assert_eq!(frag.find_index(2, true).unwrap().index, 1);
    assert_eq!(frag.find_index(6, false).unwrap().index, 2);
    assert!(frag.find_index(7, false).is_err());
}

#[test]
fn nodes_between_reports_positions_and_parents() {
    let d = doc((p("ab"), blockquote(p("cd"))));
    let mut seen = Vec::new();
    d.nodes_between(0, d.content().size(), &mut |node, pos, parent, index| {
        seen.push((
            node.r#type().name().to_owned(),
            pos,
            parent.map(|p| p.r#type().name().to_owned()),
            index,
        ));
        true
    });
    assert_eq!(
        seen,
        vec![
            ("paragraph".to_owned(), 0, Some("doc".to_owned()), 0),
            ("text".to_owned(), 1, Some("paragraph".to_owned()), 0),
            ("blockquote".to_owned(), 4, Some("doc".to_owned()), 1),
            ("paragraph".to_owned(), 5, Some("blockquote".to_owned()), 0),
            ("text".to_owned(), 6, Some("paragraph".to_owned()), 0),
        ]
    );
}

#[test]
fn nodes_between_can_skip_subtrees() {
    let d = doc((p("ab"), blockquote(p("cd"))));
    let mut seen = Vec::new();
    d.nodes_between(0, d.content().size(), &mut |node, _pos, _parent, _index| {
        seen.push(node.r#type().name().to_owned());
        node.r#type().name() != "blockquote"
    });
    assert_eq!(seen, vec!["paragraph", "text", "blockquote"]);
}

#[test]
fn text_between_separates_blocks() {
    let d = doc((p("ab"), p("cd")));
    assert_eq!(d.text_between(0, d.content().size(), Some("\n"), None), "ab\ncd");
    assert_eq!(d.text_between(2, 6, Some("\n"), None), "b\nc");
    let with_leaf = doc(p(vec![text("a"), br(), text("b")]));
    assert_eq!(
        with_leaf.text_between(0, with_leaf.content().size(), None, Some("<br>")),
        "a<br>b"
    );
}

#[test]
fn text_content_concatenates() {
    let d = doc((p(vec![text("ab"), em("cd")]), p("ef")));
    assert_eq!(d.text_content(), "abcdef");
}

#[test]
fn diff_start_finds_the_divergence() {
    let a = doc((p("ab"), p("cd"))).content().clone();
    assert_eq!(a.find_diff_start(&a, 0), None);

    let b = doc((p("ab"), p("cx"))).content().clone();
    // Diverges at the second character of the second paragraph.
    assert_eq!(a.find_diff_start(&b, 0), Some(6));

    let c = doc((p("ab"), blockquote(p("cd")))).content().clone();
    assert_eq!(a.find_diff_start(&c, 0), Some(4));

    let shorter = doc(p("ab")).content().clone();
    assert_eq!(a.find_diff_start(&shorter, 0), Some(4));
}

#[test]
fn diff_end_returns_offsets_in_both() {
    let a = doc((p("ab"), p("cd"))).content().clone();
    assert_eq!(a.find_diff_end(&a, a.size(), a.size()), None);

    let b = doc((p("xb"), p("cd"))).content().clone();
    assert_eq!(a.find_diff_end(&b, a.size(), b.size()), Some((2, 2)));

    let longer = doc((p("zz"), p("ab"), p("cd"))).content().clone();
    // The shared tail aligns at different absolute positions.
    assert_eq!(
        a.find_diff_end(&longer, a.size(), longer.size()),
        Some((0, 4))
    );
}

#[test]
fn diff_handles_marks() {
    let a = doc(p(vec![text("ab"), em("cd")])).content().clone();
    let b = doc(p(vec![text("ab"), strong("cd")])).content().clone();
    assert_eq!(a.find_diff_start(&b, 0), Some(3));
}

#[test]
fn leaf_sizes() {
    assert_eq!(hr().node_size(), 1);
    assert_eq!(br().node_size(), 1);
    assert_eq!(text("ab").node_size(), 2);
    assert_eq!(text("\u{1F60A}").node_size(), 2);
    assert_eq!(p("ab").node_size(), 4);
}
