//! termtree rendering of hierarchy arenas
//!
//! Workaround for E0116: `TreeArena` rendering is a CLI concern, so it lives
//! in a trait here instead of an inherent impl in the domain layer.

use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::TreeArena;

pub trait TreeNodeConvert {
    /// Render with a `[taken/max]` slot count after every node.
    fn to_tree_string(&self, max_fan_out: usize) -> Tree<String>;
}

impl TreeNodeConvert for TreeArena {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, max_fan_out: usize) -> Tree<String> {
        fn label(arena: &TreeArena, idx: Index, max_fan_out: usize) -> String {
            match arena.get_node(idx) {
                Some(node) => format!("{} [{}/{}]", node.data, node.children.len(), max_fan_out),
                None => String::new(),
            }
        }

        fn build_tree(arena: &TreeArena, node_idx: Index, parent_tree: &mut Tree<String>, max: usize) {
            if let Some(node) = arena.get_node(node_idx) {
                for &child_idx in &node.children {
                    let mut child_tree = Tree::new(label(arena, child_idx, max));
                    build_tree(arena, child_idx, &mut child_tree, max);
                    parent_tree.push(child_tree);
                }
            }
        }

        match self.root() {
            Some(root_idx) => {
                let mut tree = Tree::new(label(self, root_idx, max_fan_out));
                build_tree(self, root_idx, &mut tree, max_fan_out);
                tree
            }
            None => Tree::new("Empty tree".to_string()),
        }
    }
}
