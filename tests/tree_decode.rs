//! Tree decoder conformance: link shape, sibling ordering, termination
//! rules and the reset-on-failure policy.

use picocbor::{Error, ItemKind, Node, NodeId, Tree};

/// Walks the whole tree and checks the structural invariants: children
/// point back at their parent, sibling links are symmetric, and sibling
/// indices count up from zero.
fn assert_well_formed(tree: &Tree<'_, '_>, id: NodeId) {
    let node = tree.node(id);

    let mut child = node.child();
    let mut expected_index = 0;
    let mut prev: Option<NodeId> = None;
    while let Some(c) = child {
        let child_node = tree.node(c);
        assert_eq!(child_node.parent(), Some(id), "child must point at parent");
        assert_eq!(child_node.index(), expected_index, "indices are consecutive");
        assert_eq!(child_node.prev(), prev, "prev mirrors next");

        assert_well_formed(tree, c);

        prev = Some(c);
        expected_index += 1;
        child = child_node.next();
    }

    // The child chain length matches the recorded semantic length.
    match node.item.kind() {
        ItemKind::Array => assert_eq!(expected_index, node.item.length().unwrap()),
        ItemKind::Map => assert_eq!(expected_index, node.item.length().unwrap() * 2),
        ItemKind::Tag => assert_eq!(expected_index, 1),
        // Strings are leaves even when chunked.
        ItemKind::Bytes | ItemKind::Text => assert_eq!(expected_index, 0),
        _ => assert_eq!(expected_index, 0),
    }
}

#[test]
fn map_tree_shape() {
    // {"a": 1, "b": [2, 3]}
    let input = hex::decode("a26161016162820203").unwrap();
    let mut nodes = [Node::EMPTY; 16];
    let mut tree = Tree::new(&mut nodes);

    let root = tree.decode(&input).unwrap();
    assert_eq!(tree.root(), Some(root));
    assert_eq!(tree.len(), 7);
    assert_eq!(tree.item(root).kind(), ItemKind::Map);
    assert_well_formed(&tree, root);

    let (key, value) = tree.map_item(root, 0).unwrap();
    assert_eq!(tree.item(key).as_text(), Ok(&b"a"[..]));
    assert_eq!(tree.item(value).as_u8(), Ok(1));

    let (key, value) = tree.map_item(root, 1).unwrap();
    assert_eq!(tree.item(key).as_text(), Ok(&b"b"[..]));
    assert_eq!(tree.item(value).kind(), ItemKind::Array);
    let three = tree.array_item(value, 1).unwrap();
    assert_eq!(tree.item(three).as_u8(), Ok(3));

    assert_eq!(tree.map_item(root, 2), Err(Error::IndexOutOfBounds));
    assert_eq!(tree.array_item(root, 0), Err(Error::TypeMismatch));
}

#[test]
fn indefinite_array_tree_shape() {
    // [_ 1, [2, 3], [_ 4, 5]]
    let input = hex::decode("9f018202039f0405ffff").unwrap();
    let mut nodes = [Node::EMPTY; 16];
    let mut tree = Tree::new(&mut nodes);

    let root = tree.decode(&input).unwrap();
    assert_eq!(tree.len(), 7);
    assert!(tree.item(root).is_indefinite());
    assert_eq!(tree.item(root).length(), Ok(3));
    assert_well_formed(&tree, root);

    let nested = tree.array_item(root, 2).unwrap();
    assert!(tree.item(nested).is_indefinite());
    assert_eq!(tree.item(nested).length(), Ok(2));
    let five = tree.array_item(nested, 1).unwrap();
    assert_eq!(tree.item(five).as_u8(), Ok(5));
}

#[test]
fn tag_tree_shape() {
    let input = hex::decode("c1fb41d452d9ec200000").unwrap();
    let mut nodes = [Node::EMPTY; 4];
    let mut tree = Tree::new(&mut nodes);

    let root = tree.decode(&input).unwrap();
    assert_eq!(tree.item(root).kind(), ItemKind::Tag);
    assert_eq!(tree.item(root).tag_number(), Ok(1));
    assert_well_formed(&tree, root);

    let child = tree.tag_item(root).unwrap();
    assert_eq!(tree.item(child).as_f64(), Ok(1363896240.5));
}

#[test]
fn chunked_strings_are_leaves() {
    // [(_ h'0102', h'03')]
    let input = hex::decode("815f4201024103ff").unwrap();
    let mut nodes = [Node::EMPTY; 4];
    let mut tree = Tree::new(&mut nodes);

    let root = tree.decode(&input).unwrap();
    assert_eq!(tree.len(), 2);
    let string = tree.array_item(root, 0).unwrap();
    assert!(tree.item(string).is_indefinite());
    assert_eq!(tree.item(string).chunk_count(), Ok(2));
    assert_eq!(tree.node(string).child(), None, "strings stay leaf nodes");
    assert_well_formed(&tree, root);
}

#[test]
fn deep_nesting_is_not_depth_limited() {
    // 40 nested single-element arrays; past the sizing decoder's cap,
    // fine for the iterative tree assembler.
    let mut input = vec![0x81u8; 40];
    input.push(0x01);
    let mut nodes = [Node::EMPTY; 64];
    let mut tree = Tree::new(&mut nodes);

    let root = tree.decode(&input).unwrap();
    assert_eq!(tree.len(), 41);
    assert_well_formed(&tree, root);

    let mut id = root;
    for _ in 0..40 {
        id = tree.array_item(id, 0).unwrap();
    }
    assert_eq!(tree.item(id).as_u8(), Ok(1));
}

#[test]
fn top_level_sequence_links_as_siblings() {
    let mut nodes = [Node::EMPTY; 4];
    let mut tree = Tree::new(&mut nodes);

    let root = tree.decode(&[0x01, 0x02]).unwrap();
    assert_eq!(tree.len(), 2);
    let second = tree.node(root).next().expect("second top-level item");
    assert_eq!(tree.item(second).as_u8(), Ok(2));
    assert_eq!(tree.node(second).parent(), None);
    assert_eq!(tree.node(second).index(), 1);
}

#[test]
fn truncation_resets_the_pool() {
    let mut nodes = [Node::EMPTY; 8];
    let mut tree = Tree::new(&mut nodes);

    for input in [
        &[0xa1, 0x01][..],  // map missing its value
        &[0x82, 0x01][..],  // array missing an element
        &[0x9f, 0x01][..],  // indefinite array without stop code
        &[0xc1][..],        // tag without child
        &[0xff][..],        // stop code as first item
        &[][..],            // empty input
    ] {
        assert_eq!(tree.decode(input), Err(Error::UnexpectedEnd), "{:02x?}", input);
        assert_eq!(tree.len(), 0, "failed decode must not leave partial trees");
        assert_eq!(tree.root(), None);
    }
}

#[test]
fn stray_stop_code_after_complete_item() {
    let mut nodes = [Node::EMPTY; 8];
    let mut tree = Tree::new(&mut nodes);
    assert_eq!(tree.decode(&[0x01, 0xff]), Err(Error::UnexpectedStopCode));
    assert_eq!(tree.len(), 0);

    // Stop code inside a definite container.
    assert_eq!(tree.decode(&[0x82, 0x01, 0xff]), Err(Error::UnexpectedStopCode));
    assert_eq!(tree.len(), 0);
}

#[test]
fn indefinite_map_pairs_in_tree_mode() {
    // {_ "a": 1}
    let input = hex::decode("bf616101ff").unwrap();
    let mut nodes = [Node::EMPTY; 4];
    let mut tree = Tree::new(&mut nodes);

    let root = tree.decode(&input).unwrap();
    assert_eq!(tree.item(root).length(), Ok(1));
    assert_well_formed(&tree, root);

    let (key, value) = tree.map_item(root, 0).unwrap();
    assert_eq!(tree.item(key).as_text(), Ok(&b"a"[..]));
    assert_eq!(tree.item(value).as_u8(), Ok(1));

    // {_ 1: 2, 3} — stop code lands mid-pair.
    assert_eq!(
        tree.decode(&[0xbf, 0x01, 0x02, 0x03, 0xff]),
        Err(Error::KeyValueMismatch)
    );
    assert_eq!(tree.len(), 0);
}

#[test]
fn nested_indefinite_containers_close_in_order() {
    // [_ [_ ]]
    let mut nodes = [Node::EMPTY; 4];
    let mut tree = Tree::new(&mut nodes);
    let root = tree.decode(&[0x9f, 0x9f, 0xff, 0xff]).unwrap();

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.item(root).length(), Ok(1));
    let inner = tree.array_item(root, 0).unwrap();
    assert_eq!(tree.item(inner).length(), Ok(0));
    assert_well_formed(&tree, root);

    // One stop code too many refers to nothing.
    assert_eq!(
        tree.decode(&[0x9f, 0x9f, 0xff, 0xff, 0xff]),
        Err(Error::UnexpectedStopCode)
    );
}

#[test]
fn pool_bounds() {
    let input = hex::decode("a26161016162820203").unwrap();

    let mut nodes = [Node::EMPTY; 3];
    let mut tree = Tree::new(&mut nodes);
    assert_eq!(tree.decode(&input), Err(Error::PoolExhausted));
    assert_eq!(tree.len(), 0);

    let mut empty: [Node; 0] = [];
    let mut tree = Tree::new(&mut empty);
    assert_eq!(tree.decode(&input), Err(Error::EmptyPool));
}
