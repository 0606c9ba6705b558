// src/tree.rs

use crate::decode::Decoder;
use crate::error::Error;
use crate::item::{Item, ItemKind};

/// Index of a node in its [`Tree`]'s pool. Ids are only meaningful for
/// the tree that produced them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A pool slot: one item plus its links. Links are pool indices, so a
/// tree can be copied or compacted without rewriting pointers.
#[derive(Debug, Copy, Clone)]
pub struct Node<'b> {
    pub item: Item<'b>,
    parent: Option<NodeId>,
    child: Option<NodeId>,
    next: Option<NodeId>,
    prev: Option<NodeId>,
    index: usize,
}

impl<'b> Node<'b> {
    /// Unused pool slot; what caller pools start out filled with.
    pub const EMPTY: Node<'static> = Node {
        item: Item::NONE,
        parent: None,
        child: None,
        next: None,
        prev: None,
        index: 0,
    };

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// First child, for containers and tags.
    pub const fn child(&self) -> Option<NodeId> {
        self.child
    }

    pub const fn next(&self) -> Option<NodeId> {
        self.next
    }

    pub const fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    /// Position among siblings. Map keys and values occupy consecutive
    /// positions: pair `i` is slots `2i` and `2i + 1`.
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// An item graph in a caller-supplied node pool.
///
/// Two ways to fill it: [`Tree::decode`] assembles the graph of a wire
/// buffer, and the composers ([`Tree::push`], [`Tree::array`],
/// [`Tree::map`], [`Tree::tag`]) build graphs for the encoder. The pool
/// bounds both; nothing is heap-allocated.
#[derive(Debug)]
pub struct Tree<'b, 'p> {
    nodes: &'p mut [Node<'b>],
    len: usize,
}

impl<'b, 'p> Tree<'b, 'p> {
    pub fn new(nodes: &'p mut [Node<'b>]) -> Self {
        Tree { nodes, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of pool slots in use.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Discards all nodes; the pool can be refilled.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// The first decoded or composed node, if any.
    pub fn root(&self) -> Option<NodeId> {
        if self.len > 0 {
            Some(NodeId(0))
        } else {
            None
        }
    }

    /// Borrows a node. Panics if `id` did not come from this tree.
    pub fn node(&self, id: NodeId) -> &Node<'b> {
        &self.nodes[id.idx()]
    }

    pub fn item(&self, id: NodeId) -> &Item<'b> {
        &self.nodes[id.idx()].item
    }

    // ------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------

    /// Decodes one top-level item and its whole subtree out of `input`,
    /// linking parent/child/sibling edges in wire order. Returns the
    /// root (always pool slot 0). On any failure the pool is reset to
    /// empty so no partial tree is observable.
    pub fn decode(&mut self, input: &'b [u8]) -> Result<NodeId, Error> {
        self.len = 0;
        if self.nodes.is_empty() {
            return Err(Error::EmptyPool);
        }

        let mut decoder = Decoder::new_streamed(input);
        match self.assemble(&mut decoder) {
            Ok(root) => Ok(root),
            Err(err) => {
                self.len = 0;
                Err(err)
            }
        }
    }

    /// The assembler proper. Iterative so adversarial nesting cannot
    /// grow the call stack: consume a node, link it as child or sibling
    /// of the current node, ascend out of completed definite containers
    /// and tags, repeat. Indefinite containers are closed by stop codes,
    /// tracked via `last_was_stop_code`.
    fn assemble(&mut self, decoder: &mut Decoder<'b>) -> Result<NodeId, Error> {
        let mut curr: Option<NodeId> = None;
        let mut last_was_stop_code = false;

        loop {
            match decoder.decode_next(None, 0) {
                Ok(item) => {
                    let new = self.alloc(item)?;

                    match curr {
                        None => {
                            // First node; nothing to link against.
                        }
                        Some(c) => {
                            if self.is_unfinished(c, last_was_stop_code) {
                                // Current node still wants children.
                                self.nodes[c.idx()].child = Some(new);
                                self.nodes[new.idx()].parent = Some(c);
                                self.count_indefinite_child(c);
                            } else {
                                // Current node is complete; the new one
                                // is its sibling.
                                let parent = self.nodes[c.idx()].parent;
                                let index = self.nodes[c.idx()].index;
                                self.nodes[c.idx()].next = Some(new);
                                let node = &mut self.nodes[new.idx()];
                                node.prev = Some(c);
                                node.parent = parent;
                                node.index = index + 1;
                                if let Some(p) = parent {
                                    self.count_indefinite_child(p);
                                }
                            }
                            last_was_stop_code = false;
                        }
                    }

                    let settled = self.ascend_completed(new, &mut last_was_stop_code);
                    curr = Some(settled);
                }

                Err(Error::EndOfIndefinite) => {
                    // A stop code consumes no pool slot; it closes the
                    // nearest open indefinite container.
                    let mut c = match curr {
                        Some(c) => c,
                        None => return Err(Error::UnexpectedEnd),
                    };

                    if !self.is_open_indefinite(c, last_was_stop_code) {
                        c = match self.nodes[c.idx()].parent {
                            Some(parent) => parent,
                            None => return Err(Error::UnexpectedStopCode),
                        };
                    }

                    let node = &self.nodes[c.idx()];
                    let is_container =
                        matches!(node.item.kind(), ItemKind::Array | ItemKind::Map);
                    if !(is_container && node.item.is_indefinite()) {
                        return Err(Error::UnexpectedStopCode);
                    }
                    if node.item.kind() == ItemKind::Map && node.item.length % 2 != 0 {
                        // The stop code closed a map mid-pair.
                        return Err(Error::KeyValueMismatch);
                    }

                    last_was_stop_code = true;
                    let settled = self.ascend_completed(c, &mut last_was_stop_code);
                    curr = Some(settled);
                }

                Err(Error::EndOfBuffer) => {
                    let c = match curr {
                        Some(c) => c,
                        None => return Err(Error::UnexpectedEnd),
                    };
                    if self.nodes[c.idx()].parent.is_some() {
                        // Buffer ended below the top level.
                        return Err(Error::UnexpectedEnd);
                    }
                    if self.is_unfinished(c, last_was_stop_code) {
                        // Unfinished tag, short definite container, or
                        // indefinite container without its stop code.
                        return Err(Error::UnexpectedEnd);
                    }
                    return Ok(NodeId(0));
                }

                Err(err) => return Err(err),
            }
        }
    }

    /// Whether `id` still expects children: a tag without its child, a
    /// definite container short of its count, or an indefinite container
    /// that has not seen its stop code.
    fn is_unfinished(&self, id: NodeId, last_was_stop_code: bool) -> bool {
        let node = &self.nodes[id.idx()];
        match node.item.kind() {
            ItemKind::Tag => node.child.is_none(),
            ItemKind::Array | ItemKind::Map => {
                if node.item.is_indefinite() {
                    !last_was_stop_code
                } else {
                    node.item.length > 0 && node.child.is_none()
                }
            }
            _ => false,
        }
    }

    fn is_open_indefinite(&self, id: NodeId, last_was_stop_code: bool) -> bool {
        let node = &self.nodes[id.idx()];
        matches!(node.item.kind(), ItemKind::Array | ItemKind::Map)
            && node.item.is_indefinite()
            && !last_was_stop_code
    }

    /// Indefinite containers arrive from the streamed decoder with no
    /// child count; the assembler maintains it as children link so the
    /// traversal accessors and `length()` see the real count.
    fn count_indefinite_child(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.idx()];
        if matches!(node.item.kind(), ItemKind::Array | ItemKind::Map)
            && node.item.is_indefinite()
        {
            node.item.length += 1;
        }
    }

    /// Ascends while the parent just became complete: a definite
    /// container whose last slot was filled, or a tag that received its
    /// child. Returns the settled current node.
    fn ascend_completed(&self, mut c: NodeId, last_was_stop_code: &mut bool) -> NodeId {
        if self.is_unfinished(c, *last_was_stop_code) {
            return c;
        }
        while let Some(p) = self.nodes[c.idx()].parent {
            let parent = &self.nodes[p.idx()];
            let definite_done = matches!(parent.item.kind(), ItemKind::Array | ItemKind::Map)
                && !parent.item.is_indefinite()
                && parent.item.length == self.nodes[c.idx()].index + 1;
            if definite_done || parent.item.kind() == ItemKind::Tag {
                c = p;
                *last_was_stop_code = false;
            } else {
                break;
            }
        }
        c
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// The `index`-th element of an array node, via sibling links.
    pub fn array_item(&self, array: NodeId, index: usize) -> Result<NodeId, Error> {
        let node = &self.nodes[array.idx()];
        if node.item.kind() != ItemKind::Array {
            return Err(Error::TypeMismatch);
        }
        if index >= node.item.length {
            return Err(Error::IndexOutOfBounds);
        }
        let mut id = node.child.ok_or(Error::MissingChild)?;
        for _ in 0..index {
            id = self.nodes[id.idx()].next.ok_or(Error::Unknown)?;
        }
        Ok(id)
    }

    /// The `index`-th key/value pair of a map node.
    pub fn map_item(&self, map: NodeId, index: usize) -> Result<(NodeId, NodeId), Error> {
        let node = &self.nodes[map.idx()];
        if node.item.kind() != ItemKind::Map {
            return Err(Error::TypeMismatch);
        }
        if index * 2 >= node.item.length {
            return Err(Error::IndexOutOfBounds);
        }
        let mut key = node.child.ok_or(Error::MissingChild)?;
        for _ in 0..index * 2 {
            key = self.nodes[key.idx()].next.ok_or(Error::Unknown)?;
        }
        let value = self.nodes[key.idx()].next.ok_or(Error::Unknown)?;
        Ok((key, value))
    }

    /// The tagged child of a tag node.
    pub fn tag_item(&self, tag: NodeId) -> Result<NodeId, Error> {
        let node = &self.nodes[tag.idx()];
        if node.item.kind() != ItemKind::Tag {
            return Err(Error::TypeMismatch);
        }
        node.child.ok_or(Error::MissingChild)
    }

    // ------------------------------------------------------------------
    // Composers. These build graphs for the encoder; children must have
    // been pushed into this tree first.
    // ------------------------------------------------------------------

    /// Adds a standalone item and returns its id.
    pub fn push(&mut self, item: Item<'b>) -> Result<NodeId, Error> {
        self.alloc(item)
    }

    /// Adds an array node over `children`, linking them in order.
    pub fn array(&mut self, children: &[NodeId]) -> Result<NodeId, Error> {
        let array = self.alloc(Item::array_token(children.len()))?;

        let mut prev: Option<NodeId> = None;
        for (i, &child) in children.iter().enumerate() {
            self.link_sibling(array, child, i, &mut prev);
        }
        self.nodes[array.idx()].child = children.first().copied();
        Ok(array)
    }

    /// Adds a map node over `keys` and `values`, linked in key/value
    /// alternation (`k0, v0, k1, v1, …`).
    pub fn map(&mut self, keys: &[NodeId], values: &[NodeId]) -> Result<NodeId, Error> {
        if keys.len() != values.len() {
            return Err(Error::KeyValueMismatch);
        }
        let map = self.alloc(Item::map_token(keys.len()))?;

        let mut prev: Option<NodeId> = None;
        let mut slot = 0;
        for (&key, &value) in keys.iter().zip(values.iter()) {
            self.link_sibling(map, key, slot, &mut prev);
            self.link_sibling(map, value, slot + 1, &mut prev);
            slot += 2;
        }
        self.nodes[map.idx()].child = keys.first().copied();
        Ok(map)
    }

    /// Adds a tag node over one child.
    pub fn tag(&mut self, number: u64, content: NodeId) -> Result<NodeId, Error> {
        let tag = self.alloc(Item::tag_token(number))?;
        self.nodes[tag.idx()].child = Some(content);
        let child = &mut self.nodes[content.idx()];
        child.parent = Some(tag);
        child.index = 0;
        child.prev = None;
        child.next = None;
        Ok(tag)
    }

    fn link_sibling(
        &mut self,
        parent: NodeId,
        id: NodeId,
        index: usize,
        prev: &mut Option<NodeId>,
    ) {
        {
            let node = &mut self.nodes[id.idx()];
            node.parent = Some(parent);
            node.index = index;
            node.prev = *prev;
            node.next = None;
        }
        if let Some(p) = *prev {
            self.nodes[p.idx()].next = Some(id);
        }
        *prev = Some(id);
    }

    fn alloc(&mut self, item: Item<'b>) -> Result<NodeId, Error> {
        if self.len >= self.nodes.len() {
            return Err(if self.nodes.is_empty() {
                Error::EmptyPool
            } else {
                Error::PoolExhausted
            });
        }
        let id = NodeId(self.len as u32);
        self.nodes[self.len] = Node {
            item,
            parent: None,
            child: None,
            next: None,
            prev: None,
            index: 0,
        };
        self.len += 1;
        Ok(id)
    }
}
