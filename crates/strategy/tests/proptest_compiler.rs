use proptest::prelude::*;
use common::{Combinator, Graph, IndicatorKind, NodeKind, OrderSide};
use strategy::{compile, CompileError};

fn indicator_kind() -> impl Strategy<Value = IndicatorKind> {
    (0..IndicatorKind::ALL.len()).prop_map(|i| IndicatorKind::ALL[i])
}

fn order_side() -> impl Strategy<Value = OrderSide> {
    prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)]
}

/// Indicators feeding a logic block (or a single indicator wired straight
/// into the order when only one is generated).
fn chain(kinds: &[IndicatorKind], combinator: Combinator, side: OrderSide) -> Graph {
    let mut graph = Graph::new();
    let ids: Vec<String> = kinds
        .iter()
        .map(|k| graph.add_node(k.label(), NodeKind::indicator(*k)).unwrap())
        .collect();
    let order = graph.add_node(side.label(), NodeKind::order(side)).unwrap();

    if ids.len() == 1 {
        graph.connect(&ids[0], &order).unwrap();
    } else {
        let logic = graph.add_node("logic", NodeKind::logic(combinator)).unwrap();
        for id in &ids {
            graph.connect(id, &logic).unwrap();
        }
        graph.connect(&logic, &order).unwrap();
    }
    graph
}

proptest! {
    /// Without an order block nothing compiles, however the rest is wired.
    #[test]
    fn no_order_node_is_always_missing_order(
        kinds in prop::collection::vec(indicator_kind(), 0..8),
        wiring in prop::collection::vec((0usize..8, 0usize..8), 0..16),
    ) {
        let mut graph = Graph::new();
        let ids: Vec<String> = kinds
            .iter()
            .map(|k| graph.add_node(k.label(), NodeKind::indicator(*k)).unwrap())
            .collect();
        for (a, b) in wiring {
            if a < ids.len() && b < ids.len() && a != b {
                graph.connect(&ids[a], &ids[b]).unwrap();
            }
        }
        prop_assert_eq!(compile(&graph), Err(CompileError::MissingOrderNode));
    }

    /// An order block with no incoming edge is disconnected.
    #[test]
    fn unwired_order_is_disconnected(
        kinds in prop::collection::vec(indicator_kind(), 0..6),
        side in order_side(),
    ) {
        let mut graph = Graph::new();
        for k in &kinds {
            graph.add_node(k.label(), NodeKind::indicator(*k)).unwrap();
        }
        graph.add_node(side.label(), NodeKind::order(side)).unwrap();
        let is_disconnected = matches!(compile(&graph), Err(CompileError::DisconnectedOrder { .. }));
        prop_assert!(is_disconnected);
    }

    /// Two or more direct inputs into the order block are always rejected
    /// with the exact count.
    #[test]
    fn direct_fan_in_reports_input_count(
        kinds in prop::collection::vec(indicator_kind(), 2..8),
        side in order_side(),
    ) {
        let mut graph = Graph::new();
        let ids: Vec<String> = kinds
            .iter()
            .map(|k| graph.add_node(k.label(), NodeKind::indicator(*k)).unwrap())
            .collect();
        let order = graph.add_node(side.label(), NodeKind::order(side)).unwrap();
        for id in &ids {
            graph.connect(id, &order).unwrap();
        }
        prop_assert_eq!(
            compile(&graph),
            Err(CompileError::MultipleOrderInputs { count: ids.len() })
        );
    }

    /// A well-formed chain compiles, and compiling twice gives equal results.
    #[test]
    fn valid_chain_compiles_deterministically(
        kinds in prop::collection::vec(indicator_kind(), 1..8),
        or in any::<bool>(),
        side in order_side(),
    ) {
        let combinator = if or { Combinator::Or } else { Combinator::And };
        let graph = chain(&kinds, combinator, side);

        let first = compile(&graph).unwrap();
        let second = compile(&graph).unwrap();
        prop_assert_eq!(&first, &second);

        prop_assert_eq!(first.direction, side.direction());
        let mut distinct = kinds.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(first.indicator_count(), distinct.len());
        if kinds.len() > 1 {
            prop_assert_eq!(first.combinator, combinator);
        } else {
            prop_assert_eq!(first.combinator, Combinator::And);
        }
    }

    /// Every unconnected indicator is named, in node order.
    #[test]
    fn stray_indicators_are_all_reported(
        kinds in prop::collection::vec(indicator_kind(), 1..5),
        strays in prop::collection::vec(indicator_kind(), 1..5),
    ) {
        let mut graph = chain(&kinds, Combinator::And, OrderSide::Buy);
        let mut expected = Vec::new();
        for (i, k) in strays.iter().enumerate() {
            let label = format!("stray {i}");
            graph.add_node(label.clone(), NodeKind::indicator(*k)).unwrap();
            expected.push(label);
        }
        prop_assert_eq!(compile(&graph), Err(CompileError::OrphanedNodes { labels: expected }));
    }
}
