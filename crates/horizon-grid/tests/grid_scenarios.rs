//! Integration tests for the grid facade, driven the way a rendering layer
//! drives it: server calls, client tokens and synchronization cycles.

use std::sync::Arc;

use horizon_grid::data::{CallbackSource, InMemorySource, Item, ItemId, Query, SharedSource};
use horizon_grid::DataCommunicator;
use horizon_grid::prelude::*;
use parking_lot::Mutex;

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn numbers(count: u32) -> SharedSource<u32, u32> {
    Arc::new(InMemorySource::new((0..count).collect()))
}

fn record_events<T: Item + ItemId>(grid: &DataGrid<T, T>) -> Arc<Mutex<Vec<SelectionEvent<T>>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let e = events.clone();
    grid.add_selection_listener(move |event| e.lock().push(event.clone()));
    events
}

#[test]
fn test_select_all_then_deselect_one() {
    setup();
    let config = GridConfig::new().selection_mode(SelectionMode::Multi);
    let mut grid = DataGrid::from_items(vec!["foo", "bar", "baz"], config).unwrap();

    assert!(grid.select_all().unwrap());
    assert_eq!(grid.selected_items(), vec!["foo", "bar", "baz"]);
    let state = grid.select_all_state();
    assert!(state.checked);
    assert!(!state.indeterminate);
    assert!(!state.hidden);

    assert!(grid.deselect(&"bar"));
    assert_eq!(grid.selected_items(), vec!["foo", "baz"]);
    let state = grid.select_all_state();
    assert!(!state.checked);
    assert!(state.indeterminate);
}

#[test]
fn test_scroll_window_straddles_page_boundary() {
    setup();
    let mut grid = DataGrid::new(numbers(10_000), GridConfig::new().page_size(50)).unwrap();
    grid.scroll_to_index(499);
    let data = grid.sync().unwrap().data.unwrap();

    assert_eq!(data.range, 450..550);
    assert_eq!(data.size, SizeInfo::Exact(10_000));
    assert_eq!(data.added.len(), 100);
    assert_eq!(data.added[0].index, 450);
    assert_eq!(grid.communicator().resident_range(), 450..550);
}

#[test]
fn test_windowing_contains_focus_and_respects_max() {
    setup();
    let config = GridConfig::new().page_size(40).prefetch_pages(1).max_fetch_size(200);
    let mut grid = DataGrid::new(numbers(5_000), config).unwrap();
    for index in [0, 39, 40, 1234, 4999, 7000] {
        grid.scroll_to_index(index);
        let update = grid.sync().unwrap();
        let range = update.data.map(|data| data.range).unwrap_or_else(|| grid.communicator().resident_range());
        assert!(range.contains(&index.min(4999)), "{range:?} misses {index}");
        assert!(range.len() <= 200);
    }
}

#[test]
fn test_scroll_to_item_without_index_provider() {
    setup();
    let lazy: SharedSource<u32, u32> = Arc::new(CallbackSource::new(|query: &Query<u32>| {
        (query.offset() as u32..query.end().min(1000) as u32).collect()
    }));
    let mut grid = DataGrid::new(lazy, GridConfig::new()).unwrap();

    let err = grid.scroll_to_item(&7).unwrap_err();
    assert!(err.is_unsupported());
    assert!(matches!(err, GridError::Unsupported { operation: "index_of", .. }));
}

#[test]
fn test_scroll_to_item_with_index_provider() {
    setup();
    let source = CallbackSource::new(|query: &Query<u32>| {
        (query.offset() as u32..query.end().min(1000) as u32).collect()
    })
    .with_count(|_: &Query<u32>| 1000)
    .with_index_provider(|id: &u32, _: &Query<u32>| (*id < 1000).then_some(*id as usize));
    let shared: SharedSource<u32, u32> = Arc::new(source);
    let mut grid = DataGrid::new(shared, GridConfig::new()).unwrap();

    assert_eq!(grid.scroll_to_item(&620), Ok(620));
    let data = grid.sync().unwrap().data.unwrap();
    assert!(data.range.contains(&620));
    assert!(matches!(grid.scroll_to_item(&5000), Err(GridError::NotFound(_))));
}

#[test]
fn test_stale_fetch_is_discarded() {
    setup();
    let source = Arc::new(InMemorySource::new(vec!["a", "b", "c"]));
    let shared: SharedSource<&'static str, &'static str> = source.clone();
    let mut comm = DataCommunicator::new(shared, &GridConfig::new());

    let ticket = comm.prepare_cycle().unwrap().unwrap();
    let items = comm.fetch(&ticket);
    source.push("d");

    assert!(comm.complete_cycle(ticket, items).is_none());
    assert!(comm.resident_items().is_empty());

    let update = comm.sync().unwrap().unwrap();
    assert_eq!(update.added.len(), 4);
}

#[test]
fn test_key_stable_across_instances() {
    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        id: u32,
        name: &'static str,
    }

    setup();
    let source = Arc::new(InMemorySource::with_identity(
        vec![Person { id: 1, name: "Ada" }, Person { id: 2, name: "Grace" }],
        |p: &Person| p.id,
    ));
    let shared: SharedSource<Person, u32> = source.clone();
    let mut grid = DataGrid::new(shared, GridConfig::new()).unwrap();
    let first = grid.sync().unwrap().data.unwrap();
    let key = first.added[0].key;

    source.modify(0, |p| p.name = "Ada L.");
    let second = grid.sync().unwrap().data.unwrap();
    assert!(second.added.is_empty());
    assert_eq!(second.updated.len(), 1);
    assert_eq!(second.updated[0].key, key);

    let renamed = Person { id: 1, name: "someone else" };
    assert_eq!(grid.key_of(&renamed), Some(key));
    assert_eq!(grid.resolve_token(&key.token()).map(|p| p.name), Some("Ada L."));
}

#[test]
fn test_selection_idempotence() {
    setup();
    let mut grid = DataGrid::from_items(vec!["x", "y"], GridConfig::new().selection_mode(SelectionMode::Multi)).unwrap();
    let events = record_events(&grid);

    assert!(grid.select("x"));
    assert!(!grid.select("x"));
    assert!(!grid.deselect(&"y"));

    assert_eq!(events.lock().len(), 1);
    assert_eq!(grid.selected_count(), 1);
}

#[test]
fn test_single_select_exclusivity() {
    setup();
    let mut grid = DataGrid::from_items(vec!["a", "b"], GridConfig::new()).unwrap();
    let events = record_events(&grid);

    grid.select("a");
    grid.select("b");

    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].added, vec!["b"]);
    assert_eq!(events[1].removed, vec!["a"]);
    assert!(!grid.is_selected(&"a"));
    assert!(grid.is_selected(&"b"));
}

#[test]
fn test_batch_update_atomicity() {
    setup();
    let mut grid =
        DataGrid::from_items(vec!["x", "y", "z"], GridConfig::new().selection_mode(SelectionMode::Multi)).unwrap();
    grid.update_selection(vec!["x", "z"], Vec::new()).unwrap();
    let events = record_events(&grid);

    assert!(grid.update_selection(vec!["x", "y"], vec!["z"]).unwrap());

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].added, vec!["y"]);
    assert_eq!(events[0].removed, vec!["z"]);
    assert_eq!(events[0].source, EventSource::Server);
}

#[test]
fn test_selectability_gates_client_only() {
    setup();
    let mut grid =
        DataGrid::from_items(vec!["open", "locked"], GridConfig::new().selection_mode(SelectionMode::Multi)).unwrap();
    grid.set_selectable(|item: &&str| *item != "locked");
    let data = grid.sync().unwrap().data.unwrap();
    let locked = data.added[1].key.token();

    assert!(!grid.client_select(&locked));
    assert!(!grid.is_selected(&"locked"));
    assert!(grid.select("locked"));
    assert!(grid.is_selected(&"locked"));

    grid.clear_selectable();
    assert!(grid.client_deselect(&locked));
}

#[test]
fn test_client_changes_are_not_echoed() {
    setup();
    let mut grid = DataGrid::from_items(
        vec!["a", "b", "c", "d"],
        GridConfig::new().selection_mode(SelectionMode::Multi),
    )
    .unwrap();
    let events = record_events(&grid);
    grid.select("a");
    let update = grid.sync().unwrap();
    let pushed = update.selection.unwrap();
    assert_eq!(pushed.selected_keys.len(), 1);
    let tokens: Vec<String> = update.data.unwrap().added.iter().map(|row| row.key.token()).collect();

    assert!(grid.client_select(&tokens[2]));
    assert_eq!(events.lock().last().map(|e| e.source), Some(EventSource::Client));
    assert!(grid.sync().unwrap().is_empty());

    grid.deselect(&"c");
    let pushed = grid.sync().unwrap().selection.unwrap();
    assert_eq!(pushed.selected_keys, vec![grid.key_of(&"a").unwrap()]);
}

#[test]
fn test_unknown_size_source_grows_and_settles() {
    setup();
    let lazy: SharedSource<u32, u32> = Arc::new(CallbackSource::new(|query: &Query<u32>| {
        (query.offset() as u32..query.end().min(730) as u32).collect()
    }));
    let config = GridConfig::new().page_size(50).unknown_size(200, 200);
    let mut grid = DataGrid::new(lazy, config).unwrap();

    let first = grid.sync().unwrap().data.unwrap();
    assert_eq!(first.size, SizeInfo::Estimated(200));
    assert!(!grid.select_all_state().checked);

    grid.scroll_to_index(720);
    let data = grid.sync().unwrap().data.unwrap();
    assert!(data.range.contains(&720));
    assert_eq!(data.size, SizeInfo::Exact(730));
}

#[test]
fn test_mode_switch_drops_old_selection() {
    setup();
    let mut grid = DataGrid::from_items(vec![1u32, 2, 3], GridConfig::new()).unwrap();
    let events = record_events(&grid);
    grid.select(1);
    grid.sync().unwrap();

    grid.set_selection_mode(SelectionMode::Multi);
    assert_eq!(grid.selected_count(), 0);
    let update = grid.sync().unwrap();
    assert_eq!(update.selection.map(|s| s.selected_keys), Some(Vec::new()));

    grid.update_selection(vec![2, 3], Vec::new()).unwrap();
    assert_eq!(events.lock().len(), 2);
}

#[test]
fn test_update_serializes_for_the_client() {
    setup();
    let mut grid = DataGrid::from_items(vec!["foo"], GridConfig::new()).unwrap();
    grid.add_data_generator(|item: &&str, row| {
        row.insert("label".into(), serde_json::Value::from(item.to_uppercase()));
    });
    let update = grid.sync().unwrap();
    let json = serde_json::to_value(&update).unwrap();

    assert_eq!(json["data"]["added"][0]["data"]["label"], "FOO");
    assert!(json["data"]["added"][0]["key"].is_string());
    assert_eq!(json["selection"]["select_all"]["hidden"], true);
}

type Letters = Arc<InMemorySource<&'static str, &'static str>>;

fn letters(preservation: SelectionPreservation) -> (Letters, DataGrid<&'static str, &'static str>) {
    let source = Arc::new(
        InMemorySource::new(vec!["a", "b", "c"])
            .with_comparator("name", |x: &&'static str, y: &&'static str| x.cmp(y)),
    );
    let shared: SharedSource<&'static str, &'static str> = source.clone();
    let config = GridConfig::new()
        .selection_mode(SelectionMode::Multi)
        .selection_preservation(preservation);
    (source, DataGrid::new(shared, config).unwrap())
}

#[test]
fn test_preserve_existent_drops_removed_items() {
    setup();
    let (source, mut grid) = letters(SelectionPreservation::PreserveExistent);
    grid.update_selection(vec!["a", "c"], Vec::new()).unwrap();
    grid.sync().unwrap();
    let events = record_events(&grid);

    assert_eq!(source.remove(2), Some("c"));
    let update = grid.sync().unwrap();

    assert_eq!(grid.selected_items(), vec!["a"]);
    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].removed, vec!["c"]);
    assert_eq!(events[0].source, EventSource::Server);
    assert_eq!(update.selection.map(|s| s.selected_keys.len()), Some(1));
}

#[test]
fn test_preserve_all_keeps_removed_items() {
    setup();
    let (source, mut grid) = letters(SelectionPreservation::PreserveAll);
    grid.update_selection(vec!["a", "c"], Vec::new()).unwrap();
    let events = record_events(&grid);

    source.remove(2);
    grid.refresh_all();
    grid.sync().unwrap();

    assert_eq!(grid.selected_items(), vec!["a", "c"]);
    assert!(events.lock().is_empty());
}

#[test]
fn test_discard_policy_survives_sort_and_filter() {
    setup();
    let (_source, mut grid) = letters(SelectionPreservation::Discard);
    grid.update_selection(vec!["b", "c"], Vec::new()).unwrap();
    grid.sync().unwrap();
    let events = record_events(&grid);

    grid.set_sort(vec![SortOrder::desc("name")]);
    let data = grid.sync().unwrap().data.unwrap();
    assert_eq!(grid.resolve_token(&data.moved[0].key.token()), Some("c"));
    assert_eq!(grid.get_item(0), Ok("c"));

    grid.set_filter(Some(Arc::new(|item: &&'static str| *item != "b")));
    let update = grid.sync().unwrap();
    assert_eq!(update.data.map(|d| d.size), Some(SizeInfo::Exact(2)));
    let pushed = update.selection.unwrap();
    assert_eq!(pushed.selected_keys, vec![grid.key_of(&"c").unwrap()]);

    assert_eq!(grid.selected_items(), vec!["b", "c"]);
    assert!(events.lock().is_empty());

    grid.refresh_all();
    assert!(grid.selected_items().is_empty());
}

#[test]
fn test_unknown_size_source_shrinks_after_refresh() {
    setup();
    let count = Arc::new(Mutex::new(330u32));
    let c = count.clone();
    let lazy: SharedSource<u32, u32> = Arc::new(CallbackSource::new(move |query: &Query<u32>| {
        let end = (*c.lock()).min(query.end() as u32);
        (query.offset() as u32..end).collect()
    }));
    let mut grid = DataGrid::new(lazy, GridConfig::new().page_size(50)).unwrap();
    grid.sync().unwrap();
    grid.scroll_to_index(310);
    assert_eq!(grid.sync().unwrap().data.unwrap().size, SizeInfo::Exact(330));

    *count.lock() = 10;
    grid.refresh_all();
    let data = grid.sync().unwrap().data.unwrap();

    assert_eq!(data.size, SizeInfo::Exact(10));
    assert_eq!(data.added.len(), 10);
    assert_eq!(grid.get_item(9), Ok(9));
    assert!(matches!(grid.get_item(10), Err(GridError::NotFound(_))));
}

#[test]
fn test_select_all_unsupported_in_single_mode() {
    setup();
    let mut grid = DataGrid::from_items(vec!["x", "y"], GridConfig::new()).unwrap();
    let events = record_events(&grid);

    let err = grid.select_all().unwrap_err();
    assert!(err.is_unsupported());
    assert!(matches!(err, GridError::Unsupported { operation: "select_all", .. }));
    assert!(!grid.client_select_all());
    assert!(grid.select_all_state().hidden);
    assert!(events.lock().is_empty());
}

#[test]
fn test_client_deselect_all_keeps_unselectable_items() {
    setup();
    let mut grid = DataGrid::from_items(
        vec!["open", "locked", "spare"],
        GridConfig::new().selection_mode(SelectionMode::Multi),
    )
    .unwrap();
    assert!(grid.select_all().unwrap());
    grid.set_selectable(|item: &&str| *item != "locked");
    grid.sync().unwrap();
    let events = record_events(&grid);

    assert!(grid.client_deselect_all());
    assert_eq!(grid.selected_items(), vec!["locked"]);
    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_from_client());
    assert_eq!(events[0].removed, vec!["open", "spare"]);

    drop(events);
    assert!(!grid.client_deselect_all());
    assert!(grid.deselect_all());
    assert_eq!(grid.selected_count(), 0);
}
