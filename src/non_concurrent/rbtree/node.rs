use std::fmt;
use std::ptr::NonNull;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Which child slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dir {
    Left,
    Right,
}

impl Dir {
    pub(crate) fn opposite(self) -> Self {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

// PROVE: any node with height `h` has black height at least `h/2`
// PROVE: the subtree located at any node `x` contains at least `2^bh(x) - 1` nodes (use induction)
// LEMMA: An RBTree with `n` internal nodes has height at most `2*log₂(n+1)`

pub(crate) struct Node<T> {
    pub(crate) color: Color,
    pub(crate) parent: Link<T>,
    pub(crate) left: Link<T>,
    pub(crate) right: Link<T>,
    pub(crate) value: T,
}

pub(crate) type Link<T> = Option<NodePtr<T>>;

/// A handle to a node owned by some `RBTree`.
///
/// The accessors below are safe to call because a `NodePtr` only ever escapes
/// the tree module with a borrow of the owning tree attached, and inside the
/// module it's only held for nodes that are still linked in. Every access goes
/// through the raw pointer field by field, so no `&mut Node` is ever formed
/// while some other handle to the same node is live.
pub(crate) struct NodePtr<T>(NonNull<Node<T>>);

impl<T> NodePtr<T> {
    pub(crate) fn from_raw(ptr: NonNull<Node<T>>) -> Self {
        Self(ptr)
    }

    pub(crate) fn as_non_null(self) -> NonNull<Node<T>> {
        self.0
    }

    fn raw(self) -> *mut Node<T> {
        self.0.as_ptr()
    }

    pub(crate) fn color(self) -> Color {
        unsafe { (*self.raw()).color }
    }

    pub(crate) fn set_color(self, color: Color) {
        unsafe { (*self.raw()).color = color }
    }

    pub(crate) fn is_red(self) -> bool {
        self.color() == Color::Red
    }

    pub(crate) fn parent(self) -> Link<T> {
        unsafe { (*self.raw()).parent }
    }

    pub(crate) fn set_parent(self, parent: Link<T>) {
        unsafe { (*self.raw()).parent = parent }
    }

    pub(crate) fn left(self) -> Link<T> {
        unsafe { (*self.raw()).left }
    }

    pub(crate) fn right(self) -> Link<T> {
        unsafe { (*self.raw()).right }
    }

    pub(crate) fn child(self, dir: Dir) -> Link<T> {
        match dir {
            Dir::Left => self.left(),
            Dir::Right => self.right(),
        }
    }

    pub(crate) fn set_child(self, dir: Dir, child: Link<T>) {
        unsafe {
            match dir {
                Dir::Left => (*self.raw()).left = child,
                Dir::Right => (*self.raw()).right = child,
            }
        }
    }

    /// Which side of its parent this node hangs off. The root counts as left.
    pub(crate) fn side(self) -> Dir {
        match self.parent() {
            Some(p) if p.right() == Some(self) => Dir::Right,
            _ => Dir::Left,
        }
    }

    /// The payload. The caller picks the lifetime, and must not let it outlive
    /// the borrow of the tree that owns this node.
    pub(crate) fn value<'a>(self) -> &'a T {
        unsafe { &(*self.raw()).value }
    }

    /// Same as [`value`](Self::value), but mutable. The caller must hold the
    /// owning tree mutably for the whole lifetime, and must not reorder it.
    pub(crate) fn value_mut<'a>(self) -> &'a mut T {
        unsafe { &mut (*self.raw()).value }
    }

    pub(crate) fn minimum(self) -> Self {
        let mut x = self;
        while let Some(l) = x.left() {
            x = l;
        }
        x
    }

    pub(crate) fn maximum(self) -> Self {
        let mut x = self;
        while let Some(r) = x.right() {
            x = r;
        }
        x
    }

    /// The in-order successor, `None` past the maximum.
    pub(crate) fn successor(self) -> Link<T> {
        if let Some(r) = self.right() {
            return Some(r.minimum())
        }
        let mut x = self;
        let mut y = x.parent();
        while let Some(p) = y {
            if p.right() != Some(x) {
                break
            }
            x = p;
            y = p.parent();
        }
        y
    }

    /// The in-order predecessor, `None` before the minimum.
    pub(crate) fn predecessor(self) -> Link<T> {
        if let Some(l) = self.left() {
            return Some(l.maximum())
        }
        let mut x = self;
        let mut y = x.parent();
        while let Some(p) = y {
            if p.left() != Some(x) {
                break
            }
            x = p;
            y = p.parent();
        }
        y
    }
}

/// Absent children are black leaves.
pub(crate) fn is_red<T>(link: Link<T>) -> bool {
    link.is_some_and(NodePtr::is_red)
}

impl<T> Clone for NodePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodePtr<T> {}

impl<T> PartialEq for NodePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for NodePtr<T> {}

impl<T> fmt::Debug for NodePtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePtr({:p})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak(value: i32, color: Color) -> NodePtr<i32> {
        let node = Box::new(Node { color, parent: None, left: None, right: None, value });
        NodePtr::from_raw(NonNull::from(Box::leak(node)))
    }

    fn attach(parent: NodePtr<i32>, dir: Dir, child: NodePtr<i32>) {
        parent.set_child(dir, Some(child));
        child.set_parent(Some(parent));
    }

    fn free(node: NodePtr<i32>) {
        drop(unsafe { Box::from_raw(node.raw()) });
    }

    #[test]
    fn stepping_through_a_small_tree() {
        //       4
        //     /   \
        //    2     6
        //   / \
        //  1   3
        let n: Vec<_> = (0..=6).map(|v| leak(v, Color::Black)).collect();
        attach(n[4], Dir::Left, n[2]);
        attach(n[4], Dir::Right, n[6]);
        attach(n[2], Dir::Left, n[1]);
        attach(n[2], Dir::Right, n[3]);

        let mut forward = vec![];
        let mut x = Some(n[4].minimum());
        while let Some(node) = x {
            forward.push(*node.value());
            x = node.successor();
        }
        assert_eq!(forward, [1, 2, 3, 4, 6]);

        let mut backward = vec![];
        let mut x = Some(n[4].maximum());
        while let Some(node) = x {
            backward.push(*node.value());
            x = node.predecessor();
        }
        assert_eq!(backward, [6, 4, 3, 2, 1]);

        assert_eq!(n[3].side(), Dir::Right);
        assert_eq!(n[1].side(), Dir::Left);
        assert!(!is_red(n[6].left()));

        for node in n {
            free(node);
        }
    }
}
