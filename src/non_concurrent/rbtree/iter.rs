use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use super::node::{Link, NodePtr};
use super::RBTree;

/// A position in a tree: some element, or the end.
///
/// The end position sits between the maximum and the minimum, so stepping is
/// circular: `move_next` from the end lands on the first element, and
/// `move_prev` from the end lands on the last one.
pub struct Cursor<'a, T> {
    tree: &'a RBTree<T>,
    node: Link<T>,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn new(tree: &'a RBTree<T>, node: Link<T>) -> Self {
        Self { tree, node }
    }

    pub(crate) fn node(&self) -> Link<T> {
        self.node
    }

    pub fn get(&self) -> Option<&'a T> {
        self.node.map(|n| n.value())
    }

    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    pub fn move_next(&mut self) {
        self.node = match self.node {
            None => self.tree.leftmost(),
            Some(n) => n.successor(),
        };
    }

    pub fn move_prev(&mut self) {
        self.node = match self.node {
            None => self.tree.rightmost(),
            Some(n) => n.predecessor(),
        };
    }

    /// Iterates from this position up to the end.
    pub fn iter(&self) -> Iter<'a, T> {
        let remaining = match self.node {
            None => 0,
            Some(_) => {
                // counting is linear, but keeps `Iter` exact-size
                let mut n = 0;
                let mut x = self.node;
                while let Some(node) = x {
                    n += 1;
                    x = node.successor();
                }
                n
            }
        };
        Iter::new(self.node, self.tree.rightmost(), remaining)
    }
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, T> {}

impl<T> PartialEq for Cursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.node == other.node
    }
}

impl<T> Eq for Cursor<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Cursor").field(value).finish(),
            None => f.write_str("Cursor(end)"),
        }
    }
}

impl<T> RBTree<T> {
    /// A cursor on the first element (the end, if empty).
    pub fn begin(&self) -> Cursor<'_, T> {
        Cursor::new(self, self.leftmost())
    }

    /// The end cursor.
    pub fn end(&self) -> Cursor<'_, T> {
        Cursor::new(self, None)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.leftmost(), self.rightmost(), self.len())
    }
}

/// In-order iterator over `&T`, from either end.
pub struct Iter<'a, T> {
    front: Link<T>,
    back: Link<T>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

impl<T> Iter<'_, T> {
    fn new(front: Link<T>, back: Link<T>, remaining: usize) -> Self {
        Self { front, back, remaining, _marker: PhantomData }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None
        }
        let node: NodePtr<T> = self.front?;
        self.front = node.successor();
        self.remaining -= 1;
        Some(node.value())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None
        }
        let node: NodePtr<T> = self.back?;
        self.back = node.predecessor();
        self.remaining -= 1;
        Some(node.value())
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self::new(self.front, self.back, self.remaining)
    }
}

// SAFETY: an `Iter` is just a shared borrow of the tree
unsafe impl<T: Sync> Send for Iter<'_, T> {}
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RBTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning in-order iterator; drains the tree from both ends.
pub struct IntoIter<T> {
    tree: RBTree<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.tree.pop_last()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for RBTree<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { tree: self }
    }
}
