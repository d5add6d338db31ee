use common::{Error, Graph, IndicatorKind, NodeKind, OrderSide};
use library::{Library, StrategySnapshot};

fn rsi_buy_graph() -> Graph {
    let mut graph = Graph::new();
    let rsi = graph.add_node("RSI", NodeKind::indicator(IndicatorKind::Rsi)).unwrap();
    let order = graph.add_node("Buy Order", NodeKind::order(OrderSide::Buy)).unwrap();
    graph.connect(&rsi, &order).unwrap();
    graph
}

#[tokio::test]
async fn strategy_snapshot_round_trips() {
    let lib = Library::in_memory().await.unwrap();
    let snapshot = StrategySnapshot::from_graph(&rsi_buy_graph(), "length = 20\n");

    let saved = lib.save_strategy("RSI dip", &snapshot).await.unwrap();
    let loaded = lib.load_strategy(&saved.id).await.unwrap();

    assert_eq!(loaded.name, "RSI dip");
    assert_eq!(loaded.snapshot, snapshot);

    let graph = loaded.snapshot.into_graph();
    let compiled = strategy::compile(&graph).unwrap();
    assert!(compiled.rsi.is_some());
}

#[tokio::test]
async fn strategies_list_in_save_order_and_delete() {
    let lib = Library::in_memory().await.unwrap();
    let snapshot = StrategySnapshot::default();
    let first = lib.save_strategy("first", &snapshot).await.unwrap();
    let second = lib.save_strategy("second", &snapshot).await.unwrap();

    let names: Vec<String> = lib
        .list_strategies()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["first", "second"]);

    lib.delete_strategy(&first.id).await.unwrap();
    let remaining = lib.list_strategies().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let lib = Library::in_memory().await.unwrap();

    let err = lib.load_strategy("nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "strategy", .. }));

    let err = lib.delete_script("nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "script", .. }));

    let err = lib.rename_script("nope", "x").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "script", .. }));
}

#[tokio::test]
async fn saving_script_under_same_name_keeps_id() {
    let lib = Library::in_memory().await.unwrap();

    let first = lib.save_script("trend", "length = 10\nplot(sma(close, length))").await.unwrap();
    assert_eq!(first.params.len(), 1);
    assert_eq!(first.params[0].name, "length");
    assert_eq!(first.params[0].value, 10.0);

    let second = lib.save_script("trend", "length = 30\nfactor = 1.5\n").await.unwrap();
    assert_eq!(second.id, first.id);

    let scripts = lib.list_scripts().await.unwrap();
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].params.len(), 2);
    assert_eq!(scripts[0].params[0].value, 30.0);
}

#[tokio::test]
async fn rename_update_and_delete_script() {
    let lib = Library::in_memory().await.unwrap();
    let script = lib.save_script("alpha", "fast = 5\n").await.unwrap();

    lib.rename_script(&script.id, "beta").await.unwrap();
    let updated = lib.update_script(&script.id, "fast = 8\nslow = 21\n").await.unwrap();
    assert_eq!(updated.name, "beta");
    assert_eq!(updated.params.len(), 2);

    let fetched = lib.get_script(&script.id).await.unwrap();
    assert_eq!(fetched.name, "beta");
    assert_eq!(fetched.code, "fast = 8\nslow = 21\n");

    lib.delete_script(&script.id).await.unwrap();
    assert!(lib.list_scripts().await.unwrap().is_empty());
}

#[tokio::test]
async fn saved_script_becomes_graph_node() {
    let lib = Library::in_memory().await.unwrap();
    let saved = lib.save_script("band", "width = 2\n").await.unwrap();

    let mut graph = Graph::new();
    let node = graph.add_node(&saved.name, saved.node_kind()).unwrap();
    let order = graph.add_node("Sell Order", NodeKind::order(OrderSide::Sell)).unwrap();
    graph.connect(&node, &order).unwrap();

    let compiled = strategy::compile(&graph).unwrap();
    assert_eq!(compiled.custom_scripts.len(), 1);
    assert!(compiled.custom_scripts[0].contains("width = 2"));

    assert_eq!(graph.rename_script_nodes(&saved.id, "band v2"), 1);
    assert_eq!(graph.remove_script_nodes(&saved.id), 1);
}

#[tokio::test]
async fn updated_script_reaches_compiled_graph() {
    let lib = Library::in_memory().await.unwrap();
    let saved = lib.save_script("wvf", "pd = 22\nplot(pd)").await.unwrap();

    let mut graph = Graph::new();
    let node = graph.add_node(&saved.name, saved.node_kind()).unwrap();
    let order = graph.add_node("Buy Order", NodeKind::order(OrderSide::Buy)).unwrap();
    graph.connect(&node, &order).unwrap();

    let updated = lib.update_script(&saved.id, "len = 10\nplot(len)").await.unwrap();
    assert_eq!(updated.refresh_nodes(&mut graph), 1);

    let compiled = strategy::compile(&graph).unwrap();
    assert_eq!(compiled.custom_scripts, vec!["len = 10\nlen = 10\nplot(len)".to_string()]);

    let overwritten = lib.save_script("wvf", "pd = 5\nplot(pd)").await.unwrap();
    assert_eq!(overwritten.id, saved.id);
    overwritten.refresh_nodes(&mut graph);
    let compiled = strategy::compile(&graph).unwrap();
    assert_eq!(compiled.custom_scripts, vec!["pd = 5\npd = 5\nplot(pd)".to_string()]);
}
