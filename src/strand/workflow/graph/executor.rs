//! Graph workflow executor
//!
//! A [`Graph`] walks a directed path through its nodes, merging each action's
//! partial update into a [`WorkflowState`]. Conditional edges route on the
//! current state through a synthesized `"{source}_conditional"` node.

use super::node::{Node, NodeId, NodeKind, Resolver};
use crate::adk::callbacks::CallbackManager;
use crate::adk::error::ExecutionError;
use crate::adk::runnable::{Runnable, RunnableLambda};
use crate::strand::workflow::state::{Reducer, StateSchema, WorkflowState};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// State-machine interpreter over an arena of named nodes
pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    /// Informational only; routing follows `Node::next` and transitions
    edges: Vec<(String, String)>,
    start: Option<NodeId>,
    terminals: Option<HashSet<NodeId>>,
    reducers: HashMap<String, Reducer>,
    schema: StateSchema,
    max_depth: Option<usize>,
}

impl Graph {
    /// Create a graph with an open state key set
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_schema(name, StateSchema::default())
    }

    /// Create a graph whose state follows `schema`
    pub fn with_schema(name: impl Into<String>, schema: StateSchema) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            start: None,
            terminals: None,
            reducers: HashMap::new(),
            schema,
            max_depth: None,
        }
    }

    /// Depth bound used when the graph is invoked as a [`Runnable`]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&id| &self.nodes[id])
    }

    fn lookup(&self, name: &str) -> Result<NodeId, ExecutionError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ExecutionError::config(format!("Node '{}' is not in the graph", name)))
    }

    fn push_node(&mut self, node: Node) -> Result<NodeId, ExecutionError> {
        if self.index.contains_key(&node.name) {
            return Err(ExecutionError::config(format!(
                "Node '{}' is already in the graph",
                node.name
            )));
        }
        let id = self.nodes.len();
        self.index.insert(node.name.clone(), id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Register an action node
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        action: Arc<dyn Runnable>,
    ) -> Result<NodeId, ExecutionError> {
        self.push_node(Node::action(name, action))
    }

    /// Register an action node backed by a closure over the state object
    pub fn add_action<F>(&mut self, name: &str, action: F) -> Result<NodeId, ExecutionError>
    where
        F: Fn(Value) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        self.add_node(name, Arc::new(RunnableLambda::new(name, action)))
    }

    fn ensure_free_successor(&self, id: NodeId) -> Result<(), ExecutionError> {
        let node = &self.nodes[id];
        if node.is_conditional() {
            return Err(ExecutionError::config(format!(
                "Conditional node '{}' cannot have an outgoing edge",
                node.name
            )));
        }
        if node.next.is_some() {
            return Err(ExecutionError::config(format!(
                "Node '{}' already has a next node",
                node.name
            )));
        }
        Ok(())
    }

    /// Add the unconditional edge `from -> to`
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), ExecutionError> {
        let from_id = self.lookup(from)?;
        let to_id = self.lookup(to)?;
        self.ensure_free_successor(from_id)?;

        self.nodes[from_id].next = Some(to_id);
        self.edges.push((from.to_string(), to.to_string()));
        Ok(())
    }

    /// Route from `source` on the value returned by `resolver`.
    ///
    /// Synthesizes a node named `"{source}_conditional"` holding the resolver
    /// and the transition table, and links `source` to it.
    pub fn add_conditional_edges<F, I, K>(
        &mut self,
        source: &str,
        resolver: F,
        targets: I,
    ) -> Result<(), ExecutionError>
    where
        F: Fn(&WorkflowState) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (K, String)>,
        K: Into<String>,
    {
        let source_id = self.lookup(source)?;
        self.ensure_free_successor(source_id)?;

        let mut transitions = HashMap::new();
        let mut target_names = Vec::new();
        for (key, target) in targets {
            let target_id = self.lookup(&target)?;
            if self.nodes[target_id].is_conditional() {
                return Err(ExecutionError::config(format!(
                    "Transition target '{}' must be an action node",
                    target
                )));
            }
            transitions.insert(key.into(), target_id);
            target_names.push(target);
        }
        if transitions.is_empty() {
            return Err(ExecutionError::config(format!(
                "Conditional edges from '{}' need at least one target",
                source
            )));
        }

        let conditional_name = format!("{}_conditional", source);
        let resolver: Resolver = Arc::new(resolver);
        let conditional_id =
            self.push_node(Node::conditional(&conditional_name, resolver, transitions))?;

        self.nodes[source_id].next = Some(conditional_id);
        self.edges
            .push((source.to_string(), conditional_name.clone()));
        for target in target_names {
            self.edges.push((conditional_name.clone(), target));
        }
        Ok(())
    }

    pub fn set_start(&mut self, name: &str) -> Result<(), ExecutionError> {
        self.start = Some(self.lookup(name)?);
        Ok(())
    }

    /// Set the terminal nodes; an empty set is allowed
    pub fn set_terminals<'a, I>(&mut self, names: I) -> Result<(), ExecutionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let terminals = names
            .into_iter()
            .map(|name| self.lookup(name))
            .collect::<Result<HashSet<_>, _>>()?;
        self.terminals = Some(terminals);
        Ok(())
    }

    /// Route merges of `key` through `reducer`
    pub fn set_reducer(&mut self, key: &str, reducer: Reducer) -> Result<(), ExecutionError> {
        if !self.schema.admits(key) {
            return Err(ExecutionError::config(format!(
                "Cannot set a reducer for '{}': key is not declared in the state schema",
                key
            )));
        }
        self.reducers.insert(key.to_string(), reducer);
        Ok(())
    }

    /// A state seeded with schema defaults and carrying the graph's reducers
    pub fn initial_state(&self) -> WorkflowState {
        let mut state = WorkflowState::new(&self.schema);
        for (key, reducer) in &self.reducers {
            state.set_reducer(key.clone(), reducer.clone());
        }
        state
    }

    /// Check that the graph is ready to run
    pub fn compile(&self) -> Result<(), ExecutionError> {
        self.entry_points().map(|_| ())
    }

    fn entry_points(&self) -> Result<(NodeId, &HashSet<NodeId>), ExecutionError> {
        let start = self
            .start
            .ok_or_else(|| ExecutionError::config("Start node not set"))?;
        let terminals = self
            .terminals
            .as_ref()
            .ok_or_else(|| ExecutionError::config("Terminal nodes not set"))?;
        Ok((start, terminals))
    }

    /// Walk the graph from the start node, mutating `state` in place.
    ///
    /// Stops at a terminal node, at a node without successor, or once
    /// `max_depth` action steps have run.
    pub async fn run(
        &self,
        state: &mut WorkflowState,
        max_depth: Option<usize>,
        callbacks: Option<&CallbackManager>,
    ) -> Result<(), ExecutionError> {
        let (start, terminals) = self.entry_points()?;

        if let Some(cb) = callbacks {
            cb.on_invoke_start(&self.name, &state.to_json());
        }

        let result = self.walk(start, terminals, state, max_depth, callbacks).await;

        if let Some(cb) = callbacks {
            let outcome = result.as_ref().map(|_| state.to_json());
            cb.on_invoke_result(&self.name, &outcome);
        }
        result
    }

    async fn walk(
        &self,
        start: NodeId,
        terminals: &HashSet<NodeId>,
        state: &mut WorkflowState,
        max_depth: Option<usize>,
        callbacks: Option<&CallbackManager>,
    ) -> Result<(), ExecutionError> {
        let mut current = start;
        let mut depth = 0usize;
        loop {
            if terminals.contains(&current) || max_depth.map_or(false, |max| depth >= max) {
                break;
            }

            if let NodeKind::Conditional {
                resolver,
                transitions,
            } = &self.nodes[current].kind
            {
                let conditional = &self.nodes[current].name;
                if let Some(cb) = callbacks {
                    cb.on_invoke_start(conditional, &state.to_json());
                }
                let value = resolver(&*state);
                if let Some(cb) = callbacks {
                    cb.on_invoke_end(conditional, &json!(value));
                }

                current = match transitions.get(&value) {
                    Some(&target) => target,
                    None => {
                        return Err(ExecutionError::Routing {
                            node: conditional.clone(),
                            value,
                        })
                    }
                };
                log::debug!("{} routed to {}", conditional, self.nodes[current].name);
            }

            let node = &self.nodes[current];
            let NodeKind::Action(action) = &node.kind else {
                return Err(ExecutionError::config(format!(
                    "Node '{}' is not an action node",
                    node.name
                )));
            };

            log::info!("Graph {} step {}: {}", self.name, depth, node.name);
            match action.invoke(state.to_json(), callbacks).await? {
                Value::Null => {}
                Value::Object(update) => state.apply(update)?,
                other => {
                    return Err(ExecutionError::step(
                        &node.name,
                        format!("expected an object or null update, got {}", other),
                    ))
                }
            }

            match node.next {
                Some(next) => {
                    current = next;
                    depth += 1;
                }
                None => break,
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Runnable for Graph {
    fn name(&self) -> &str {
        &self.name
    }

    /// Input: an object seeding the state (or `Null`); output: the final state
    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError> {
        let mut state = self.initial_state();
        match input {
            Value::Null => {}
            Value::Object(seed) => {
                for (key, value) in seed {
                    state.set(&key, value)?;
                }
            }
            other => {
                return Err(ExecutionError::step(
                    &self.name,
                    format!("expected a state object, got {}", other),
                ))
            }
        }

        self.run(&mut state, self.max_depth, callbacks).await?;
        Ok(state.to_json())
    }
}
