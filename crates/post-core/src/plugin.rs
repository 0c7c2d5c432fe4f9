use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blocks::{AlignPlugin, BlockquotePlugin, HeadingPlugin, IndentPlugin, ListPlugin};
use crate::core::{Document, Editor, Node, Point, Selection, node_ref};
use crate::insert::{ChecklistPlugin, CodePlugin, ImagePlugin, TablePlugin};
use crate::marks::MarksPlugin;
use crate::ops::{Op, Transaction};
use crate::paywall::PaywallPlugin;
use crate::tree::{RangeCut, clamp_to_char_boundary, cut_selection, point_for_global_offset};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate node spec kind: {0}")]
    DuplicateKind(String),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;

pub type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    /// Build a command from a transaction builder. Empty transactions are not applied.
    pub fn from_transaction(
        id: &'static str,
        label: impl Into<String>,
        build: impl Fn(&Editor, Option<&Value>) -> Result<Transaction, String> + Send + Sync + 'static,
    ) -> Self {
        Self::new(id, label, move |editor, args| {
            let tx = build(&*editor, args.as_ref()).map_err(CommandError::new)?;
            if tx.is_empty() {
                return Ok(());
            }
            editor
                .apply(tx)
                .map_err(|e| CommandError::new(format!("Failed to run {id}: {e}")))
        })
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

/// The describable part of a [`CommandSpec`], for listings and help output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandInfo {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args_example: Option<Value>,
}

impl From<&CommandSpec> for CommandInfo {
    fn from(spec: &CommandSpec) -> Self {
        Self {
            id: spec.id.clone(),
            label: spec.label.clone(),
            description: spec.description.clone(),
            keywords: spec.keywords.clone(),
            args_example: spec.args_example.clone(),
        }
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }

    /// Query that always succeeds with a bool computed from the editor.
    pub fn flag(id: impl Into<String>, get: impl Fn(&Editor) -> bool + Send + Sync + 'static) -> Self {
        Self::new(id, move |editor, _args| Ok(Value::Bool(get(editor))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl NodeSpec {
    pub fn text_block(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        }
    }

    pub fn container(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::BlockOnly,
        }
    }

    pub fn void(kind: &str, role: NodeRole) -> Self {
        Self {
            kind: kind.to_string(),
            role,
            is_void: true,
            children: ChildConstraint::None,
        }
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

pub trait PostPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<String, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn PostPlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    fn core_plugins() -> Vec<Box<dyn PostPlugin>> {
        vec![
            Box::new(CoreParagraphPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(CoreTextPlugin),
        ]
    }

    /// Registry with every block, mark and paywall plugin a post body uses.
    pub fn post() -> Self {
        let mut plugins = Self::core_plugins();
        plugins.extend([
            Box::new(MarksPlugin) as Box<dyn PostPlugin>,
            Box::new(HeadingPlugin),
            Box::new(AlignPlugin),
            Box::new(IndentPlugin),
            Box::new(BlockquotePlugin),
            Box::new(ListPlugin),
            Box::new(ChecklistPlugin),
            Box::new(CodePlugin),
            Box::new(ImagePlugin),
            Box::new(TablePlugin),
            Box::new(PaywallPlugin),
        ]);
        Self::new(plugins).expect("post registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PostPlugin>) -> Result<(), RegistryError> {
        tracing::trace!(plugin = plugin.id(), "registering plugin");

        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(RegistryError::DuplicateKind(spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        Ok(())
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn child_constraint(&self, kind: &str) -> Option<ChildConstraint> {
        self.node_specs.get(kind).map(|s| s.children.clone())
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let mut ops: Vec<Op> = Vec::new();
        for pass in &self.normalize_passes {
            let pass_ops = pass.run(doc, self);
            if !pass_ops.is_empty() {
                tracing::trace!(pass = pass.id(), ops = pass_ops.len(), "normalize");
                // One pass per round so later passes see the result of earlier ones.
                ops.extend(pass_ops);
                break;
            }
        }
        ops
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor =
            normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
                normalize_point_to_existing_text(doc, &selection.focus)
                    .unwrap_or_else(|| fallback.clone())
            });
        let focus = normalize_point_to_existing_text(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    /// Every registered command's metadata, ordered by id.
    pub fn command_catalog(&self) -> Vec<CommandInfo> {
        let mut catalog: Vec<CommandInfo> = self.commands.values().map(CommandInfo::from).collect();
        catalog.sort_by(|a, b| a.id.cmp(&b.id));
        catalog
    }
}

fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        match node {
            Node::Text(_) => {
                let point = Point {
                    path: path.clone(),
                    offset: 0,
                };
                path.pop();
                return Some(point);
            }
            Node::Element(el) => {
                if let Some(point) = first_text_descendant(&el.children, path) {
                    path.pop();
                    return Some(point);
                }
            }
            Node::Void(_) => {}
        }
        path.pop();
    }
    None
}

fn first_text_point(doc: &Document) -> Option<Point> {
    first_text_descendant(&doc.children, &mut Vec::new())
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
            Node::Void(_) => {
                break;
            }
        }
    }

    match node_ref(doc, &resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: clamp_to_char_boundary(&t.text, point.offset),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
        Node::Void(_) => {
            // Voids hold no caret; fall back to the first text leaf of the parent.
            let (_, parent) = resolved_path.split_last()?;
            let mut parent = parent.to_vec();
            match node_ref(doc, &parent) {
                Some(Node::Element(el)) => first_text_descendant(&el.children, &mut parent),
                _ => None,
            }
        }
    }
}

struct CoreParagraphPlugin;

impl PostPlugin for CoreParagraphPlugin {
    fn id(&self) -> &'static str {
        "core.paragraph"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("paragraph")]
    }
}

struct CoreNormalizePlugin;

impl PostPlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureContainersHaveBlock),
            Box::new(EnsureTextBlocksHaveTextLeaf),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

struct EnsureContainersHaveBlock;

impl NormalizePass for EnsureContainersHaveBlock {
    fn id(&self) -> &'static str {
        "core.ensure_containers_have_block"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if registry.child_constraint(&el.kind) == Some(ChildConstraint::BlockOnly)
                    && el.children.is_empty()
                {
                    let mut insert_path = path.clone();
                    insert_path.push(0);
                    ops.push(Op::InsertNode {
                        path: insert_path,
                        node: Node::paragraph(""),
                    });
                } else {
                    walk(&el.children, path, registry, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct EnsureTextBlocksHaveTextLeaf;

impl NormalizePass for EnsureTextBlocksHaveTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_blocks_have_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                let spec_children = registry
                    .child_constraint(&el.kind)
                    .unwrap_or(ChildConstraint::Any);

                if spec_children == ChildConstraint::InlineOnly {
                    let has_text = el.children.iter().any(|n| matches!(n, Node::Text(_)));
                    if !has_text {
                        // Appended so a leading checkbox keeps its position.
                        let mut insert_path = path.clone();
                        insert_path.push(el.children.len());
                        ops.push(Op::InsertNode {
                            path: insert_path,
                            node: Node::text(""),
                        });
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn merge_runs(children: &[Node], path: &[usize], ops: &mut Vec<Op>) {
            let mut ix = children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = children.get(start - 1) else {
                        break;
                    };
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }

                if start == ix {
                    continue;
                }

                let Some(Node::Text(first)) = children.get(start) else {
                    continue;
                };
                let appended: String = children[start + 1..=ix]
                    .iter()
                    .filter_map(|node| match node {
                        Node::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect();

                if !appended.is_empty() {
                    let mut insert_text_path = path.to_vec();
                    insert_text_path.push(start);
                    ops.push(Op::InsertText {
                        path: insert_text_path,
                        offset: first.text.len(),
                        text: appended,
                    });
                }

                for remove_ix in (start + 1..=ix).rev() {
                    let mut remove_path = path.to_vec();
                    remove_path.push(remove_ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }

                ix = start;
            }
        }

        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if registry.child_constraint(&el.kind) == Some(ChildConstraint::InlineOnly) {
                    merge_runs(&el.children, path, ops);
                } else {
                    walk(&el.children, path, registry, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct CoreTextPlugin;

impl PostPlugin for CoreTextPlugin {
    fn id(&self) -> &'static str {
        "core.text"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("text.insert", "Insert text", |editor, args| {
                let text = args
                    .and_then(|v| v.get("text"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "Missing args.text".to_string())?;
                insert_text(editor, text)
            })
            .description("Type text at the caret, replacing the selected range.")
            .keywords(["type", "text", "input"])
            .args_example(serde_json::json!({ "text": "Hello" })),
        ]
    }
}

fn insert_text(editor: &Editor, text: &str) -> Result<Transaction, String> {
    let sel = editor.selection().clone();

    if sel.is_collapsed() {
        let focus = sel.focus;
        let Some(Node::Text(leaf)) = node_ref(editor.doc(), &focus.path) else {
            return Err("Selection is not in a text node".into());
        };
        let offset = clamp_to_char_boundary(&leaf.text, focus.offset);
        if text.is_empty() {
            return Ok(Transaction::default());
        }
        return Ok(Transaction::new(vec![Op::InsertText {
            path: focus.path.clone(),
            offset,
            text: text.to_string(),
        }])
        .selection_after(Selection::collapsed(Point::new(
            focus.path,
            offset + text.len(),
        )))
        .source("command:text.insert"));
    }

    let RangeCut {
        mut ops,
        start,
        ..
    } = cut_selection(editor.doc(), editor.registry(), &sel, true)?;

    let mut children = start.remaining;
    if children.is_empty() {
        children.push(Node::text(""));
    }
    let caret = point_for_global_offset(&start.path, &children, start.caret);
    let mut block = start.element;
    block.children = children;
    ops.extend(Op::replace(start.path, Node::Element(block)));

    if !text.is_empty() {
        ops.push(Op::InsertText {
            path: caret.path.clone(),
            offset: caret.offset,
            text: text.to_string(),
        });
    }

    let caret = Point::new(caret.path, caret.offset + text.len());
    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(caret))
        .source("command:text.insert"))
}
