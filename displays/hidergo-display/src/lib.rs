//! Status display layout engine for hid:ergo
//!
//! This crate provides:
//! - `Canvas` trait, the drawing surface a panel driver exposes
//! - `Layout`, a declarative list of elements with data bindings that
//!   redraws only what changed and reports whether anything was drawn
//! - A compact binary layout format so layouts can be replaced at runtime
//! - Clock and battery helpers feeding the standard bindings
//!
//! # Architecture
//!
//! The display task owns both the layout and the panel. On every tick it
//! updates binding values and calls [`Layout::update`]; the layout draws
//! into the canvas framebuffer and asks for partial refreshes of the
//! regions it touched.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod bindings;
pub mod canvas;
pub mod clock;
pub mod geometry;
pub mod layout;
pub mod sprite;
pub mod status;

// Re-export key types
pub use bindings::{BindingId, Bindings, Value};
pub use canvas::Canvas;
pub use geometry::Rect;
pub use layout::{Element, Layout, LayoutError, Param, Shape, TextSource};
pub use sprite::SpriteSheet;
