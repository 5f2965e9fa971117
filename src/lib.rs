pub mod action;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod executor;
pub mod fixture;
pub mod ids;
pub mod main_lib;
pub mod open_state;
pub mod reconciler;
pub mod search;
pub mod selection;
pub mod tree;
pub mod view;
pub mod visibility;

pub use action::Action;
pub use engine::EngineState;
pub use error::{ExplorerError, Result};
pub use tree::{DocRefNode, DocumentTree};
