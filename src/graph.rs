//! Pull-evaluated unit generator graph.
//!
//! The graph owns every node. Each node remembers the sources it reads from
//! and the route describing how their outputs mix into its inputs. Rendering
//! starts at a sink and recurses towards the sources; a node stamped with the
//! current tick is not computed again, so shared sources run once per tick no
//! matter how many consumers pull them.

use log::{debug, error};
use slotmap::{SlotMap, new_key_type};

use crate::clock::Tick;
use crate::error::{GraphError, GraphResult};
use crate::node::{ProcessContext, Sample, UGen};
use crate::route::Route;

new_key_type! {
    /// Handle to a node owned by a graph.
    pub struct NodeId;
}

/// One node in the graph
pub struct GraphNode {
    ugen: Box<dyn UGen>,
    input: Vec<Sample>,
    output: Vec<Sample>,

    /// Upstream nodes in connection order, with the route each one uses.
    sources: Vec<(NodeId, Route)>,

    /// Tick of the last `compute`, `None` if never computed.
    last_computed: Option<Tick>,

    /// Set while this node's sources are being pulled.
    computing: bool,

    compute_count: u64,
}

/// The unit generator graph
pub struct Graph {
    nodes: SlotMap<NodeId, GraphNode>,
    sample_rate: f64,
}

impl Graph {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            sample_rate,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Add a node to the graph. The node is prepared at the graph's rate.
    pub fn add_node(&mut self, mut ugen: Box<dyn UGen>) -> NodeId {
        ugen.prepare(self.sample_rate);
        let input = vec![0.0; ugen.num_inputs()];
        let output = vec![0.0; ugen.num_outputs()];

        self.nodes.insert(GraphNode {
            ugen,
            input,
            output,
            sources: Vec::new(),
            last_computed: None,
            computing: false,
            compute_count: 0,
        })
    }

    /// Remove a node and hand it back.
    ///
    /// Consumers still listing it as a source drop that entry on their next
    /// pull.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Box<dyn UGen>> {
        self.nodes.remove(id).map(|node| node.ugen)
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -------------------------------
    // MARK: Connections
    // -------------------------------

    /// Connect `source` into `target` using the default route for their arities.
    pub fn add_source(&mut self, target: NodeId, source: NodeId) -> GraphResult<()> {
        let source_outputs = self.node(source)?.output.len();
        let target_inputs = self.node(target)?.input.len();
        let route = Route::default_for(source_outputs, target_inputs)?;
        self.add_source_with_route(target, source, route)
    }

    /// Connect `source` into `target` with an explicit route.
    ///
    /// Replaces any route already registered for that source.
    pub fn add_source_with_route(
        &mut self,
        target: NodeId,
        source: NodeId,
        route: Route,
    ) -> GraphResult<()> {
        if target == source {
            return Err(GraphError::SelfLoop(target));
        }

        let source_outputs = self.node(source)?.output.len();
        let target_node = self.node_mut(target)?;
        let target_inputs = target_node.input.len();

        if route.source_arity() != source_outputs || route.target_arity() != target_inputs {
            return Err(GraphError::ShapeMismatch {
                route_source: route.source_arity(),
                route_target: route.target_arity(),
                source_outputs,
                target_inputs,
            });
        }

        match target_node.sources.iter_mut().find(|(id, _)| *id == source) {
            Some((_, existing)) => *existing = route,
            None => target_node.sources.push((source, route)),
        }
        Ok(())
    }

    /// Disconnect `source` from `target`. Returns whether it was connected.
    pub fn remove_source(&mut self, target: NodeId, source: NodeId) -> bool {
        match self.nodes.get_mut(target) {
            Some(node) => {
                let before = node.sources.len();
                node.sources.retain(|(id, _)| *id != source);
                node.sources.len() != before
            }
            None => false,
        }
    }

    /// Sources of a node in connection order.
    pub fn sources(&self, target: NodeId) -> impl Iterator<Item = (NodeId, &Route)> + '_ {
        self.nodes
            .get(target)
            .into_iter()
            .flat_map(|node| node.sources.iter().map(|(id, route)| (*id, route)))
    }

    // -------------------------------
    // MARK: Evaluation
    // -------------------------------

    /// Bring a node up to date for tick `now`.
    ///
    /// A node already computed at `now` returns immediately. Otherwise its
    /// inputs are zeroed, every source is pulled and mixed in through its
    /// route, and the node computes. Reaching a node that is itself in the
    /// middle of being pulled is a cycle error.
    pub fn pull(&mut self, id: NodeId, now: Tick) -> GraphResult<()> {
        let node = self.node_mut(id)?;
        if node.last_computed == Some(now) {
            return Ok(());
        }
        if node.computing {
            error!("cycle detected at node {:?} during tick {}", id, now);
            return Err(GraphError::Cycle(id));
        }

        // Lend the node's sources and input frame out while upstream nodes
        // are pulled, so the arena can be borrowed mutably by the recursion.
        node.computing = true;
        let mut sources = std::mem::take(&mut node.sources);
        let mut input = std::mem::take(&mut node.input);
        input.fill(0.0);

        let gathered = self.gather(id, &mut sources, &mut input, now);

        let ctx = ProcessContext::new(self.sample_rate, now);
        let node = self.node_mut(id)?;
        node.sources = sources;
        node.input = input;
        node.computing = false;
        gathered?;

        node.ugen.compute(&ctx, &node.input, &mut node.output);
        node.last_computed = Some(now);
        node.compute_count += 1;
        Ok(())
    }

    fn gather(
        &mut self,
        target: NodeId,
        sources: &mut Vec<(NodeId, Route)>,
        input: &mut [Sample],
        now: Tick,
    ) -> GraphResult<()> {
        let mut dangling = false;

        for (source, route) in sources.iter() {
            if !self.nodes.contains_key(*source) {
                dangling = true;
                continue;
            }
            self.pull(*source, now)?;
            route.accumulate(&self.nodes[*source].output, input);
        }

        if dangling {
            sources.retain(|(id, _)| self.nodes.contains_key(*id));
            debug!("pruned removed sources from node {:?}", target);
        }
        Ok(())
    }

    // -------------------------------
    // MARK: Port access
    // -------------------------------

    pub fn input(&self, id: NodeId) -> Option<&[Sample]> {
        self.nodes.get(id).map(|node| node.input.as_slice())
    }

    pub fn output(&self, id: NodeId) -> Option<&[Sample]> {
        self.nodes.get(id).map(|node| node.output.as_slice())
    }

    /// Direct write access to a node's output frame (hardware capture).
    pub(crate) fn output_mut(&mut self, id: NodeId) -> Option<&mut [Sample]> {
        self.nodes.get_mut(id).map(|node| node.output.as_mut_slice())
    }

    pub fn num_inputs(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(id).map(|node| node.input.len())
    }

    pub fn num_outputs(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(id).map(|node| node.output.len())
    }

    /// Tick at which a node last computed.
    pub fn last_computed(&self, id: NodeId) -> Option<Tick> {
        self.nodes.get(id).and_then(|node| node.last_computed)
    }

    /// How many times a node has computed since it was added or reset.
    pub fn compute_count(&self, id: NodeId) -> Option<u64> {
        self.nodes.get(id).map(|node| node.compute_count)
    }

    // -------------------------------
    // MARK: Parameters and state
    // -------------------------------

    /// Set a parameter on a node. Unknown nodes are ignored.
    #[inline]
    pub fn set_param(&mut self, id: NodeId, param_id: u32, value: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.ugen.set_param(param_id, value);
        }
    }

    pub fn param(&self, id: NodeId, param_id: u32) -> Option<f32> {
        self.nodes.get(id).and_then(|node| node.ugen.param(param_id))
    }

    /// Re-prepare every node for a new sample rate.
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        for node in self.nodes.values_mut() {
            node.ugen.prepare(sample_rate);
        }
    }

    /// Reset all nodes, clear their frames and forget memo stamps.
    pub fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.ugen.reset();
            node.input.fill(0.0);
            node.output.fill(0.0);
            node.last_computed = None;
            node.computing = false;
            node.compute_count = 0;
        }
    }

    fn node(&self, id: NodeId) -> GraphResult<&GraphNode> {
        self.nodes.get(id).ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut GraphNode> {
        self.nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Outputs a fixed value on every port.
    struct Level {
        outputs: usize,
        value: Sample,
    }

    impl UGen for Level {
        fn num_inputs(&self) -> usize {
            0
        }

        fn num_outputs(&self) -> usize {
            self.outputs
        }

        fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
            output.fill(self.value);
        }
    }

    /// Copies inputs to outputs.
    struct Through(usize);

    impl UGen for Through {
        fn num_inputs(&self) -> usize {
            self.0
        }

        fn num_outputs(&self) -> usize {
            self.0
        }

        fn compute(&mut self, _ctx: &ProcessContext, input: &[Sample], output: &mut [Sample]) {
            output.copy_from_slice(input);
        }
    }

    /// Outputs the tick it was computed at.
    struct TickEcho;

    impl UGen for TickEcho {
        fn num_inputs(&self) -> usize {
            0
        }

        fn num_outputs(&self) -> usize {
            1
        }

        fn compute(&mut self, ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
            output[0] = ctx.tick as Sample;
        }
    }

    fn level(graph: &mut Graph, outputs: usize, value: Sample) -> NodeId {
        graph.add_node(Box::new(Level { outputs, value }))
    }

    #[test]
    fn test_diamond_computes_shared_source_once() {
        let mut graph = Graph::new(48_000.0);
        let x = level(&mut graph, 1, 0.25);
        let y = graph.add_node(Box::new(Through(1)));
        let z = graph.add_node(Box::new(Through(1)));
        let sink = graph.add_node(Box::new(Through(1)));

        graph.add_source(y, x).unwrap();
        graph.add_source(z, x).unwrap();
        graph.add_source(sink, y).unwrap();
        graph.add_source(sink, z).unwrap();

        graph.pull(sink, 10).unwrap();

        assert_eq!(graph.compute_count(x), Some(1));
        assert_eq!(graph.last_computed(x), Some(10));
        assert_eq!(graph.input(sink), Some(&[0.5][..]));
    }

    #[test]
    fn test_pull_is_memoized_per_tick() {
        let mut graph = Graph::new(48_000.0);
        let x = graph.add_node(Box::new(TickEcho));
        let y = graph.add_node(Box::new(Through(1)));
        let z = graph.add_node(Box::new(Through(1)));
        graph.add_source(y, x).unwrap();
        graph.add_source(z, x).unwrap();

        graph.pull(y, 10).unwrap();
        graph.pull(z, 10).unwrap();
        graph.pull(y, 10).unwrap();
        assert_eq!(graph.compute_count(x), Some(1));
        assert_eq!(graph.compute_count(y), Some(1));
        assert_eq!(graph.last_computed(x), Some(10));

        graph.pull(z, 11).unwrap();
        assert_eq!(graph.compute_count(x), Some(2));
        assert_eq!(graph.output(z), Some(&[11.0][..]));
        // y was not pulled at tick 11 and keeps its old frame
        assert_eq!(graph.last_computed(y), Some(10));
        assert_eq!(graph.output(y), Some(&[10.0][..]));
    }

    #[test]
    fn test_inputs_are_zeroed_before_mixing() {
        let mut graph = Graph::new(48_000.0);
        let x = level(&mut graph, 1, 1.0);
        let sink = graph.add_node(Box::new(Through(1)));
        graph.add_source(sink, x).unwrap();

        graph.pull(sink, 0).unwrap();
        graph.pull(sink, 1).unwrap();
        assert_eq!(graph.input(sink), Some(&[1.0][..]));
    }

    #[test]
    fn test_default_route_policies_through_graph() {
        let mut graph = Graph::new(48_000.0);
        let mono = level(&mut graph, 1, 0.5);
        let stereo = level(&mut graph, 2, 0.25);
        let wide = graph.add_node(Box::new(Through(3)));
        let narrow = graph.add_node(Box::new(Through(1)));

        graph.add_source(wide, mono).unwrap();
        graph.add_source(narrow, stereo).unwrap();
        graph.pull(wide, 0).unwrap();
        graph.pull(narrow, 0).unwrap();

        assert_eq!(graph.input(wide), Some(&[0.5, 0.5, 0.5][..]));
        assert_eq!(graph.input(narrow), Some(&[0.5][..]));
    }

    #[test]
    fn test_add_source_rejects_unroutable_arities() {
        let mut graph = Graph::new(48_000.0);
        let stereo = level(&mut graph, 2, 0.0);
        let triple = graph.add_node(Box::new(Through(3)));

        let err = graph.add_source(triple, stereo).unwrap_err();
        assert!(matches!(err, GraphError::Route(_)));
        assert_eq!(graph.sources(triple).count(), 0);
    }

    #[test]
    fn test_add_source_rejects_wrong_route_shape() {
        let mut graph = Graph::new(48_000.0);
        let stereo = level(&mut graph, 2, 0.0);
        let sink = graph.add_node(Box::new(Through(2)));

        let err = graph
            .add_source_with_route(sink, stereo, Route::identity(3))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::ShapeMismatch {
                route_source: 3,
                route_target: 3,
                source_outputs: 2,
                target_inputs: 2,
            }
        );
    }

    #[test]
    fn test_explicit_route_replaces_existing() {
        let mut graph = Graph::new(48_000.0);
        let x = level(&mut graph, 1, 1.0);
        let sink = graph.add_node(Box::new(Through(2)));

        graph.add_source(sink, x).unwrap();
        let left_only = Route::from_rows(vec![vec![1.0, 0.0]]).unwrap();
        graph.add_source_with_route(sink, x, left_only).unwrap();
        assert_eq!(graph.sources(sink).count(), 1);

        graph.pull(sink, 0).unwrap();
        assert_eq!(graph.input(sink), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn test_remove_source() {
        let mut graph = Graph::new(48_000.0);
        let x = level(&mut graph, 1, 1.0);
        let sink = graph.add_node(Box::new(Through(1)));
        graph.add_source(sink, x).unwrap();

        assert!(graph.remove_source(sink, x));
        assert!(!graph.remove_source(sink, x));
        graph.pull(sink, 0).unwrap();
        assert_eq!(graph.input(sink), Some(&[0.0][..]));
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = Graph::new(48_000.0);
        let x = graph.add_node(Box::new(Through(1)));
        assert_eq!(graph.add_source(x, x), Err(GraphError::SelfLoop(x)));
    }

    #[test]
    fn test_cycle_is_reported_and_graph_recovers() {
        let mut graph = Graph::new(48_000.0);
        let a = graph.add_node(Box::new(Through(1)));
        let b = graph.add_node(Box::new(Through(1)));
        graph.add_source(a, b).unwrap();
        graph.add_source(b, a).unwrap();

        assert_eq!(graph.pull(a, 0), Err(GraphError::Cycle(a)));
        assert_eq!(graph.last_computed(a), None);
        assert_eq!(graph.last_computed(b), None);

        // Breaking the cycle makes the graph usable again
        assert!(graph.remove_source(b, a));
        graph.pull(a, 0).unwrap();
        assert_eq!(graph.compute_count(a), Some(1));
        assert_eq!(graph.compute_count(b), Some(1));
        assert_eq!(graph.sources(a).count(), 1);
    }

    #[test]
    fn test_removed_source_is_pruned() {
        let mut graph = Graph::new(48_000.0);
        let x = level(&mut graph, 1, 1.0);
        let sink = graph.add_node(Box::new(Through(1)));
        graph.add_source(sink, x).unwrap();

        assert!(graph.remove_node(x).is_some());
        graph.pull(sink, 0).unwrap();
        assert_eq!(graph.sources(sink).count(), 0);
        assert_eq!(graph.input(sink), Some(&[0.0][..]));
    }

    #[test]
    fn test_unknown_node_errors() {
        let mut graph = Graph::new(48_000.0);
        let x = level(&mut graph, 1, 1.0);
        graph.remove_node(x);
        assert_eq!(graph.pull(x, 0), Err(GraphError::UnknownNode(x)));
    }

    #[test]
    fn test_reset_forgets_memo() {
        let mut graph = Graph::new(48_000.0);
        let x = graph.add_node(Box::new(TickEcho));
        graph.pull(x, 3).unwrap();
        graph.reset();

        assert_eq!(graph.last_computed(x), None);
        assert_eq!(graph.output(x), Some(&[0.0][..]));
        graph.pull(x, 3).unwrap();
        assert_eq!(graph.compute_count(x), Some(1));
    }
}
