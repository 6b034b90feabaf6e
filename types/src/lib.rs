//! Domain types for the farkle turn engine. Keep this crate free of IO:
//! everything here is a pure function of the action list the backend has
//! reported so far.

mod api;
mod selection;
mod state;
mod turn;

pub use api::*;
pub use selection::*;
pub use state::*;
pub use turn::*;

#[cfg(test)]
mod tests;
