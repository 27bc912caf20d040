//! Program intermediate representation.
//!
//! The visual editor serializes a program as a tree of blocks: each block
//! has an id, a closed type tag, a string field map, one `next` link, named
//! nested-statement slots, and named value-input slots. Statement slots and
//! next links form an acyclic forest; a block appears in exactly one place.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Closed set of block type tags.
///
/// Deserializing an unknown tag is an input error, and every consumer
/// dispatches with an exhaustive `match`, so an unhandled block kind cannot
/// slip through at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Open a connection to an instrument and make it the current device.
    Connect,
    /// Explicit disconnect. A compile-time no-op: teardown is synthesized
    /// once per connection at the end of the script.
    Disconnect,
    /// Switch the current device context without touching any connection.
    UseDevice,
    /// Send one SCPI command (write, or query when it ends in `?`).
    Command,
    /// Send a query and store the response in a variable.
    QueryInto,
    /// Arm the acquisition system.
    StartAcquisition,
    /// Block until the pending operation completes.
    WaitComplete,
    /// Sleep for a number of seconds.
    Delay,
    /// Assign a value to a program variable.
    SetVariable,
    /// Print a value to the console.
    Print,
    /// Free-form Python code spliced into the script verbatim.
    RawCode,
    /// A comment line.
    Comment,
    /// Counted loop with an induction variable.
    Repeat,
    /// Two-armed conditional.
    IfElse,
    /// Numeric literal (value slot only).
    Number,
    /// Text literal with `{variable}` interpolation (value slot only).
    Text,
    /// Read a program variable (value slot only).
    GetVariable,
    /// Binary comparison (value slot only).
    Compare,
}

/// One block of the program tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockNode {
    /// Editor-assigned unique id.
    pub id: String,
    /// Block type tag.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Field map; keys are block-specific field names in SCREAMING case.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    /// Named nested-statement slots, each holding the head of a linked list.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statements: BTreeMap<String, BlockNode>,
    /// Named value-input slots, each holding at most one block.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, BlockNode>,
    /// The following statement in this list, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<BlockNode>>,
}

impl BlockNode {
    /// Field accessor treating missing and empty values the same.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Iterate this statement list starting at `self`.
    pub fn iter_list(&self) -> impl Iterator<Item = &BlockNode> {
        std::iter::successors(Some(self), |n| n.next.as_deref())
    }
}

/// A complete program: root statement list plus declared variable names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    /// Declared variable names (flat, global).
    #[serde(default)]
    pub variables: Vec<String>,
    /// Head of the root statement list. `None` for an empty workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BlockNode>,
}

impl Program {
    /// Parse a program from its editor JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Per-traversal structural index: previous sibling and owning parent of
/// every block, keyed by block id.
///
/// Built once per compile call so device-context resolution can walk
/// backward through an otherwise forward-only tree without embedding
/// back-references in the nodes themselves.
pub(crate) struct NodeIndex<'p> {
    prev: HashMap<&'p str, &'p BlockNode>,
    parent: HashMap<&'p str, &'p BlockNode>,
}

impl<'p> NodeIndex<'p> {
    pub(crate) fn build(program: &'p Program) -> Self {
        let mut index = Self {
            prev: HashMap::new(),
            parent: HashMap::new(),
        };
        if let Some(body) = &program.body {
            index.index_list(body, None);
        }
        index
    }

    fn index_list(&mut self, head: &'p BlockNode, parent: Option<&'p BlockNode>) {
        let mut prev: Option<&'p BlockNode> = None;
        for node in head.iter_list() {
            if let Some(p) = prev {
                self.prev.insert(node.id.as_str(), p);
            }
            if let Some(p) = parent {
                self.parent.insert(node.id.as_str(), p);
            }
            for slot in node.statements.values() {
                self.index_list(slot, Some(node));
            }
            prev = Some(node);
        }
    }

    pub(crate) fn prev_sibling(&self, node: &BlockNode) -> Option<&'p BlockNode> {
        self.prev.get(node.id.as_str()).copied()
    }

    pub(crate) fn parent(&self, node: &BlockNode) -> Option<&'p BlockNode> {
        self.parent.get(node.id.as_str()).copied()
    }
}
