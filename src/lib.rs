//! Input routing and focus management for a terminal dashboard over a
//! container orchestration backend.
//!
//! Key presses are translated by [`keymap`], routed by [`dispatch`] to the
//! handler of the active view in [`screen`], and either acted upon there or
//! forwarded to the modal or viewer task that currently owns the input.

pub mod app;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod keymap;
pub mod registry;
pub mod screen;
pub mod ui;
pub mod widget;
