use std::fmt::{self, Debug, Write};

use super::node::{Color, NodePtr};
use super::RBTree;

impl<T: Debug> RBTree<T> {
    /// A parenthesized, color-annotated picture of the tree's shape.
    ///
    /// Each node prints as `value:R` or `value:B`, followed by `(left, right)`
    /// if it has children. A missing left child leaves an empty spot before
    /// the comma; a missing right child drops the `, right` part entirely:
    ///
    /// ```text
    /// 5:B(4:B(2:R), 15:B(, 17:R))
    /// ```
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root() {
            // writing to a String can't fail
            let _ = write_node(&mut out, root);
        }
        out
    }
}

fn write_node<T: Debug>(out: &mut String, node: NodePtr<T>) -> fmt::Result {
    let color = match node.color() {
        Color::Red => 'R',
        Color::Black => 'B',
    };
    write!(out, "{:?}:{color}", node.value())?;

    if node.left().is_none() && node.right().is_none() {
        return Ok(())
    }

    out.push('(');
    if let Some(left) = node.left() {
        write_node(out, left)?;
    }
    if let Some(right) = node.right() {
        out.push_str(", ");
        write_node(out, right)?;
    }
    out.push(')');
    Ok(())
}
