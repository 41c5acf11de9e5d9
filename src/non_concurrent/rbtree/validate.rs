use crate::error::InvariantViolation;

use super::node::{Link, NodePtr};
use super::RBTree;

impl<T: Ord> RBTree<T> {
    /// Checks every structural invariant of the tree and returns its black
    /// height (leaves excluded), or the first violation found.
    ///
    /// Walks the whole tree, so this is O(n). Meant for tests and debugging.
    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        let Some(root) = self.root() else {
            if self.leftmost().is_some() {
                return Err(InvariantViolation::StaleLeftmost)
            }
            if self.rightmost().is_some() {
                return Err(InvariantViolation::StaleRightmost)
            }
            if self.len() != 0 {
                return Err(InvariantViolation::LengthMismatch { recorded: self.len(), counted: 0 })
            }
            return Ok(0)
        };

        if root.is_red() {
            return Err(InvariantViolation::RedRoot)
        }
        if root.parent().is_some() {
            return Err(InvariantViolation::BrokenParentLink)
        }

        let mut counted = 0;
        let height = black_height(root, &mut counted)?;

        if counted != self.len() {
            return Err(InvariantViolation::LengthMismatch { recorded: self.len(), counted })
        }
        if self.leftmost() != Some(root.minimum()) {
            return Err(InvariantViolation::StaleLeftmost)
        }
        if self.rightmost() != Some(root.maximum()) {
            return Err(InvariantViolation::StaleRightmost)
        }

        // non-decreasing: `insert_equal` allows runs of equal elements
        let mut values = self.iter();
        if let Some(mut prev) = values.next() {
            for value in values {
                if value < prev {
                    return Err(InvariantViolation::OutOfOrder)
                }
                prev = value;
            }
        }

        Ok(height)
    }
}

/// Black height of the subtree at `node`, checking colors and parent links
/// on the way down.
fn black_height<T>(node: NodePtr<T>, counted: &mut usize) -> Result<usize, InvariantViolation> {
    *counted += 1;

    let child_height = |child: Link<T>, counted: &mut usize| -> Result<usize, InvariantViolation> {
        let Some(child) = child else { return Ok(0) };
        if child.parent() != Some(node) {
            return Err(InvariantViolation::BrokenParentLink)
        }
        if node.is_red() && child.is_red() {
            return Err(InvariantViolation::RedChildOfRed)
        }
        black_height(child, counted)
    };

    let left = child_height(node.left(), counted)?;
    let right = child_height(node.right(), counted)?;
    if left != right {
        return Err(InvariantViolation::BlackHeightMismatch { left, right })
    }

    Ok(left + usize::from(!node.is_red()))
}
