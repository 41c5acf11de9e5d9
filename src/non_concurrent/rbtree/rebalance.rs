//! Rotations and the two fixup passes.
//!
//! Everything is written once in terms of a side `dir` and its opposite, which
//! covers both mirror images of every case. Neither pass recurses.

use super::node::{Color, Dir, Link, NodePtr, is_red};
use super::RBTree;

impl<T> RBTree<T> {
    /// Points whatever referenced `old` (its parent's child slot, or the root)
    /// at `new` instead. Doesn't touch `new`'s own parent link.
    pub(super) fn replace_child(&mut self, old: NodePtr<T>, new: Link<T>) {
        match old.parent() {
            None => self.root = new,
            Some(p) => p.set_child(old.side(), new),
        }
    }

    /// Rotates `x` down towards `dir`; its child on the other side takes its place.
    ///
    /// ```text
    ///     x         (dir = Left)       y
    ///    / \                          / \
    ///   a   y          ==>           x   c
    ///      / \                      / \
    ///     b   c                    a   b
    /// ```
    pub(super) fn rotate(&mut self, x: NodePtr<T>, dir: Dir) {
        let up = dir.opposite();
        debug_assert!(x.child(up).is_some(), "rotating {dir:?} without a child on the {up:?}");
        let Some(y) = x.child(up) else { return };

        let inner = y.child(dir);
        x.set_child(up, inner);
        if let Some(inner) = inner {
            inner.set_parent(Some(x));
        }

        y.set_parent(x.parent());
        self.replace_child(x, Some(y));

        y.set_child(dir, Some(x));
        x.set_parent(Some(y));
    }

    /// Restores the red-black rules after `x` was linked in red.
    pub(super) fn fix_insert(&mut self, mut x: NodePtr<T>) {
        while let Some(p) = x.parent() {
            if !p.is_red() {
                break
            }
            // a red parent is never the root, so there is a grandparent
            let Some(g) = p.parent() else { break };
            let side = p.side();

            match g.child(side.opposite()).filter(|u| u.is_red()) {
                Some(uncle) => {
                    // red uncle: push the blackness down from the grandparent
                    // and carry on from there
                    p.set_color(Color::Black);
                    uncle.set_color(Color::Black);
                    g.set_color(Color::Red);
                    x = g;
                }
                None => {
                    // black uncle: straighten a zig-zag into a zig-zig first
                    let p = if p.child(side.opposite()) == Some(x) {
                        self.rotate(p, side);
                        x
                    } else {
                        p
                    };
                    p.set_color(Color::Black);
                    g.set_color(Color::Red);
                    self.rotate(g, side.opposite());
                    break
                }
            }
        }

        if let Some(root) = self.root {
            root.set_color(Color::Black);
        }
    }

    /// Restores the red-black rules after a black node was unlinked.
    ///
    /// `x` is the node that took its place (possibly `None`) and `parent` is
    /// where `x` hangs; the path through `x` is one black short.
    pub(super) fn fix_erase(&mut self, mut x: Link<T>, mut parent: Link<T>) {
        loop {
            if let Some(n) = x.filter(|n| n.is_red()) {
                n.set_color(Color::Black);
                return
            }
            // `x` is the (black or empty) root: every path lost one black alike
            let Some(p) = parent else { return };

            let side = if p.left() == x { Dir::Left } else { Dir::Right };
            debug_assert!(p.child(side.opposite()).is_some(), "a short path with no sibling");
            let Some(mut sibling) = p.child(side.opposite()) else { return };

            if sibling.is_red() {
                // make the sibling black by rotating the red one above the parent
                sibling.set_color(Color::Black);
                p.set_color(Color::Red);
                self.rotate(p, side);
                sibling = match p.child(side.opposite()) {
                    Some(s) => s,
                    None => return,
                };
            }

            let near = sibling.child(side);
            let far = sibling.child(side.opposite());

            if !is_red(near) && !is_red(far) {
                sibling.set_color(Color::Red);
                if p.is_red() {
                    p.set_color(Color::Black);
                    return
                }
                x = Some(p);
                parent = p.parent();
                continue
            }

            if !is_red(far) {
                // only the near nephew is red: rotate it up so the far one is
                if let Some(near) = near {
                    near.set_color(Color::Black);
                }
                sibling.set_color(Color::Red);
                self.rotate(sibling, side.opposite());
                sibling = match p.child(side.opposite()) {
                    Some(s) => s,
                    None => return,
                };
            }

            sibling.set_color(p.color());
            p.set_color(Color::Black);
            if let Some(far) = sibling.child(side.opposite()) {
                far.set_color(Color::Black);
            }
            self.rotate(p, side);
            return
        }
    }
}
