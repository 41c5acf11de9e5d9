//! An ordered red-black tree whose nodes live in the [`NodePool`](crate::node_pool::NodePool).
//!
//! Nodes are linked through raw `parent`/`left`/`right` handles. The tree owns
//! every node reachable from `root`; parent links are back-references only.
//! The leftmost and rightmost nodes are cached so `first`, `last` and both ends
//! of iteration are O(1), and "one past the end" is represented by `None`.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem;

use crate::node_pool::NodeAllocator;

mod dump;
mod iter;
mod node;
mod rebalance;
mod validate;

pub use iter::{Cursor, IntoIter, Iter};
pub use node::Color;

pub(crate) use node::{Dir, Link, Node, NodePtr};

pub struct RBTree<T> {
    root: Link<T>,
    leftmost: Link<T>,
    rightmost: Link<T>,
    len: usize,
    alloc: NodeAllocator<Node<T>>,
    _owns: PhantomData<Box<Node<T>>>,
}

// SAFETY: the tree uniquely owns its nodes, like a `Box<Node<T>>` would, and
//         the pool it frees them into is shared between threads anyway.
unsafe impl<T: Send> Send for RBTree<T> {}
// SAFETY: `&RBTree<T>` only ever hands out `&T`.
unsafe impl<T: Sync> Sync for RBTree<T> {}

/// Orders an element relative to a borrowed key.
pub(crate) fn probe_cmp<T, Q>(probe: &T, key: &Q) -> Ordering
where
    T: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let probe: &Q = probe.borrow();
    probe.cmp(key)
}

/// Where `insert_unique` would go.
pub(crate) enum Slot<T> {
    Occupied(NodePtr<T>),
    Vacant { parent: Link<T>, dir: Dir },
}

/// Frees a node's raw storage if constructing its payload unwinds.
struct RawNodeGuard<T> {
    alloc: NodeAllocator<Node<T>>,
    ptr: std::ptr::NonNull<Node<T>>,
}

impl<T> Drop for RawNodeGuard<T> {
    fn drop(&mut self) {
        // SAFETY: the storage came from `alloc.allocate(1)` and holds no value yet
        unsafe { self.alloc.deallocate(self.ptr, 1) }
    }
}

impl<T> RBTree<T> {
    pub const fn new() -> Self {
        Self::new_in(NodeAllocator::new())
    }

    /// An empty tree whose nodes come from `alloc`, rebound to the node type.
    pub const fn new_in(alloc: NodeAllocator<T>) -> Self {
        Self {
            root: None,
            leftmost: None,
            rightmost: None,
            len: 0,
            alloc: alloc.rebind(),
            _owns: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn allocator(&self) -> NodeAllocator<T> {
        self.alloc.rebind()
    }

    /// Allocates a node, then builds its payload in place.
    ///
    /// If `make` panics, the raw storage goes back to the pool before the
    /// panic continues.
    fn create_node(&self, make: impl FnOnce() -> T) -> NodePtr<T> {
        let ptr = match self.alloc.allocate(1) {
            Ok(ptr) => ptr,
            Err(_) => std::alloc::handle_alloc_error(std::alloc::Layout::new::<Node<T>>()),
        };

        let guard = RawNodeGuard { alloc: self.alloc, ptr };
        let value = make();
        mem::forget(guard);

        // SAFETY: freshly allocated, properly sized and aligned for a `Node<T>`
        unsafe {
            ptr.write(Node {
                color: Color::Red,
                parent: None,
                left: None,
                right: None,
                value,
            })
        };
        NodePtr::from_raw(ptr)
    }

    /// Drops a node's storage and hands back its payload. The node must
    /// already be unlinked.
    fn destroy_node(&self, node: NodePtr<T>) -> T {
        let ptr = node.as_non_null();
        // SAFETY: the node was created by `create_node` and nothing links to it anymore
        let node = unsafe { ptr.read() };
        // SAFETY: the value was moved out above, so the storage is just bytes now
        unsafe { self.alloc.deallocate(ptr, 1) };
        node.value
    }

    /// Hangs a new node off `parent` on side `dir` (or makes it the root),
    /// keeps the leftmost/rightmost cache up to date, and rebalances.
    pub(crate) fn link_new(&mut self, parent: Link<T>, dir: Dir, make: impl FnOnce() -> T) -> NodePtr<T> {
        let node = self.create_node(make);
        node.set_parent(parent);

        match parent {
            None => {
                self.root = Some(node);
                self.leftmost = Some(node);
                self.rightmost = Some(node);
            }
            Some(p) => {
                p.set_child(dir, Some(node));
                match dir {
                    Dir::Left if self.leftmost == Some(p) => self.leftmost = Some(node),
                    Dir::Right if self.rightmost == Some(p) => self.rightmost = Some(node),
                    _ => {}
                }
            }
        }

        self.len += 1;
        self.fix_insert(node);
        node
    }

    /// Inserts `value` after any elements equal to it.
    pub fn insert_equal(&mut self, value: T)
    where
        T: Ord,
    {
        let mut parent = None;
        let mut dir = Dir::Left;
        let mut x = self.root;
        while let Some(n) = x {
            parent = Some(n);
            dir = if value < *n.value() { Dir::Left } else { Dir::Right };
            x = n.child(dir);
        }
        self.link_new(parent, dir, || value);
    }

    /// Inserts `value` unless an equal element is already present. Returns
    /// whether it was inserted.
    pub fn insert_unique(&mut self, value: T) -> bool
    where
        T: Ord,
    {
        match self.unique_slot_by(|probe| probe.cmp(&value)) {
            Slot::Occupied(_) => false,
            Slot::Vacant { parent, dir } => {
                self.link_new(parent, dir, || value);
                true
            }
        }
    }

    /// Finds where an element ordered by `cmp` would be inserted uniquely.
    ///
    /// `cmp` orders an existing element relative to the one being looked for.
    /// The descent ends at an empty slot; the only element that can then be
    /// equal is that slot's in-order predecessor.
    pub(crate) fn unique_slot_by<F>(&self, mut cmp: F) -> Slot<T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut parent = None;
        let mut dir = Dir::Left;
        let mut x = self.root;
        while let Some(n) = x {
            parent = Some(n);
            dir = if cmp(n.value()) == Ordering::Greater { Dir::Left } else { Dir::Right };
            x = n.child(dir);
        }

        let vacant = Slot::Vacant { parent, dir };
        let Some(mut candidate) = parent else { return vacant };

        if dir == Dir::Left {
            match candidate.predecessor() {
                Some(prev) => candidate = prev,
                None => return vacant,
            }
        }

        if cmp(candidate.value()) == Ordering::Less {
            vacant
        } else {
            Slot::Occupied(candidate)
        }
    }

    /// The first element not ordered before the target, as judged by `cmp`.
    pub fn lower_bound_by<F>(&self, mut cmp: F) -> Cursor<'_, T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut y = None;
        let mut x = self.root;
        while let Some(n) = x {
            if cmp(n.value()) != Ordering::Less {
                y = Some(n);
                x = n.left();
            } else {
                x = n.right();
            }
        }
        Cursor::new(self, y)
    }

    /// The first element ordered strictly after the target, as judged by `cmp`.
    pub fn upper_bound_by<F>(&self, mut cmp: F) -> Cursor<'_, T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut y = None;
        let mut x = self.root;
        while let Some(n) = x {
            if cmp(n.value()) == Ordering::Greater {
                y = Some(n);
                x = n.left();
            } else {
                x = n.right();
            }
        }
        Cursor::new(self, y)
    }

    /// The first element `>= key`, or the end cursor.
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.lower_bound_by(|probe| probe_cmp(probe, key))
    }

    /// The first element `> key`, or the end cursor.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.upper_bound_by(|probe| probe_cmp(probe, key))
    }

    pub(crate) fn find_node_by<F>(&self, mut cmp: F) -> Link<T>
    where
        F: FnMut(&T) -> Ordering,
    {
        self.lower_bound_by(&mut cmp).node().filter(|n| cmp(n.value()) == Ordering::Equal)
    }

    pub fn find<Q>(&self, key: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node_by(|probe| probe_cmp(probe, key)).map(|n| n.value())
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// How many elements compare equal to `key`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.lower_bound(key);
        let end = self.upper_bound(key);
        let mut n = 0;
        while cursor != end {
            n += 1;
            cursor.move_next();
        }
        n
    }

    /// Removes every element in the run of elements equal to the target.
    /// Returns how many were removed.
    pub fn erase_by<F>(&mut self, mut cmp: F) -> usize
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut first = self.lower_bound_by(&mut cmp).node();
        let last = self.upper_bound_by(&mut cmp).node();

        // erasing splices nodes around but never moves a payload to another
        // node, so the handles in the range stay valid while we walk it
        let mut n = 0;
        while first != last {
            let Some(node) = first else { break };
            first = node.successor();
            drop(self.erase_node(node));
            n += 1;
        }
        n
    }

    /// Removes every element equal to `key`. Returns how many were removed.
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.erase_by(|probe| probe_cmp(probe, key))
    }

    /// Removes the first element equal to `key` and returns it.
    pub fn take<Q>(&mut self, key: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find_node_by(|probe| probe_cmp(probe, key))?;
        Some(self.erase_node(node))
    }

    pub(crate) fn take_by<F>(&mut self, cmp: F) -> Option<T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let node = self.find_node_by(cmp)?;
        Some(self.erase_node(node))
    }

    pub fn first(&self) -> Option<&T> {
        self.leftmost.map(|n| n.value())
    }

    pub fn last(&self) -> Option<&T> {
        self.rightmost.map(|n| n.value())
    }

    pub fn pop_first(&mut self) -> Option<T> {
        let node = self.leftmost?;
        Some(self.erase_node(node))
    }

    pub fn pop_last(&mut self) -> Option<T> {
        let node = self.rightmost?;
        Some(self.erase_node(node))
    }

    /// Unlinks `z`, rebalances, frees it and returns its payload.
    fn erase_node(&mut self, z: NodePtr<T>) -> T {
        // `x` is whatever ends up in the place of the node that actually left
        // its position, and `x_parent` is where it hangs (`x` may be `None`)
        let (x, x_parent) = match (z.left(), z.right()) {
            (Some(zl), Some(zr)) => {
                // two children: the successor `y` has no left child, so lift it
                // into `z`'s position and let `y`'s old spot lose a node instead
                let y = zr.minimum();
                let x = y.right();

                y.set_child(Dir::Left, Some(zl));
                zl.set_parent(Some(y));

                let x_parent = if y != zr {
                    let yp = y.parent();
                    if let Some(x) = x {
                        x.set_parent(yp);
                    }
                    if let Some(yp) = yp {
                        yp.set_child(Dir::Left, x);
                    }
                    y.set_child(Dir::Right, Some(zr));
                    zr.set_parent(Some(y));
                    yp
                } else {
                    Some(y)
                };

                self.replace_child(z, Some(y));
                y.set_parent(z.parent());

                // `z` carries the color of the position that was vacated
                let color = y.color();
                y.set_color(z.color());
                z.set_color(color);

                (x, x_parent)
            }
            (left, right) => {
                let x = left.or(right);
                let x_parent = z.parent();
                if let Some(x) = x {
                    x.set_parent(x_parent);
                }
                self.replace_child(z, x);

                if self.leftmost == Some(z) {
                    self.leftmost = x.map(NodePtr::minimum).or(x_parent);
                }
                if self.rightmost == Some(z) {
                    self.rightmost = x.map(NodePtr::maximum).or(x_parent);
                }

                (x, x_parent)
            }
        };

        if z.color() == Color::Black {
            self.fix_erase(x, x_parent);
        }

        self.len -= 1;
        self.destroy_node(z)
    }

    /// Destroys every node, leaving the tree empty.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            self.destroy_subtree(root);
        }
        self.leftmost = None;
        self.rightmost = None;
        self.len = 0;
    }

    /// Post-order teardown: recurse right, loop left. Depth is bounded by the
    /// tree height.
    fn destroy_subtree(&mut self, mut node: NodePtr<T>) {
        loop {
            if let Some(r) = node.right() {
                self.destroy_subtree(r);
            }
            let left = node.left();
            drop(self.destroy_node(node));
            match left {
                Some(l) => node = l,
                None => break,
            }
        }
    }

    /// Copies the children of `src` under `dst`, keeping colors.
    ///
    /// Every copy is linked into `self` before recursing, so if a `clone`
    /// panics halfway, dropping `self` frees everything made so far.
    fn clone_children(&mut self, src: NodePtr<T>, dst: NodePtr<T>)
    where
        T: Clone,
    {
        for dir in [Dir::Left, Dir::Right] {
            if let Some(child) = src.child(dir) {
                let copy = self.create_node(|| child.value().clone());
                copy.set_color(child.color());
                copy.set_parent(Some(dst));
                dst.set_child(dir, Some(copy));
                self.clone_children(child, copy);
            }
        }
    }

    pub(crate) fn root(&self) -> Link<T> {
        self.root
    }

    pub(crate) fn leftmost(&self) -> Link<T> {
        self.leftmost
    }

    pub(crate) fn rightmost(&self) -> Link<T> {
        self.rightmost
    }
}

impl<T> Default for RBTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RBTree<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Clone> Clone for RBTree<T> {
    fn clone(&self) -> Self {
        let mut tree = Self::new_in(self.allocator());
        if let Some(root) = self.root {
            let copy = tree.create_node(|| root.value().clone());
            copy.set_color(root.color());
            tree.root = Some(copy);
            tree.clone_children(root, copy);

            tree.leftmost = Some(copy.minimum());
            tree.rightmost = Some(copy.maximum());
            tree.len = self.len;
        }
        tree
    }

    fn clone_from(&mut self, source: &Self) {
        if !std::ptr::eq(self, source) {
            *self = source.clone();
        }
    }
}

impl<T: Ord> FromIterator<T> for RBTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<T: Ord> Extend<T> for RBTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert_equal(value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RBTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The in-order dump: `{a, b, c}`.
impl<T: fmt::Display> fmt::Display for RBTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, value) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests;
