//! Horizon Grid - data-window synchronization and selection for
//! remote-rendered grids.
//!
//! A server-side component owns the data; a client renders only a window of
//! it. This crate keeps the two consistent:
//!
//! - [`data`]: the [`DataSource`] trait and in-memory, callback and tree sources
//! - [`key_mapper`]: stable opaque [`ItemKey`]s for items on the client
//! - [`viewport`]: which index range must be resident on the client
//! - [`communicator`]: fetches, diffs and emits [`DataUpdate`]s
//! - [`selection`]: none/single/multi selection with change events
//! - [`grid`]: [`DataGrid`], the facade that ties them together
//!
//! # Example
//!
//! ```
//! use horizon_grid::{DataGrid, GridConfig, SelectionMode};
//!
//! let config = GridConfig::new().page_size(20).selection_mode(SelectionMode::Multi);
//! let mut grid = DataGrid::from_items((0..1000u32).collect(), config).unwrap();
//!
//! grid.add_selection_listener(|event| {
//!     println!("selection changed: {:?}", event.new_selection);
//! });
//!
//! grid.scroll_to_index(500);
//! let update = grid.sync().unwrap();
//! let data = update.data.unwrap();
//! assert_eq!(data.range, 480..520);
//!
//! // Client events carry key tokens.
//! let token = data.added[0].key.token();
//! assert!(grid.client_select(&token));
//! assert!(grid.is_selected(&480));
//! ```

pub mod communicator;
pub mod config;
pub mod data;
pub mod error;
pub mod grid;
pub mod key_mapper;
pub mod prelude;
pub mod selection;
pub mod viewport;

pub use horizon_grid_core::{ConnectionGuard, ConnectionId, PerfSpan, Signal};

pub use communicator::{DataCommunicator, DataUpdate, SizeInfo};
pub use config::GridConfig;
pub use data::{DataSource, ItemCount, SourceKind};
pub use error::{GridError, Result};
pub use grid::{DataGrid, GridUpdate, SelectionUpdate};
pub use key_mapper::ItemKey;
pub use selection::{
    SelectAllState, SelectAllVisibility, SelectionEvent, SelectionMode, SelectionPreservation,
};
