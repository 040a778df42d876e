//! # live-layout
//!
//! Declarative XML layouts for component trees, with a constraint
//! mini-language, static code generation and live reload.
//!
//! A component document describes one component's visual tree: primitive
//! elements, nested components, typed properties, style references and
//! `layout:` constraint attributes. The same parsed definition feeds two
//! consumers:
//!
//! - **[`codegen`]** emits Rust construction code (`build_layout`) for
//!   definitions compiled into the host.
//! - **[`live`]** applies a definition onto a running [`live::ViewTree`]
//!   through a capability registry of typed setters and factories.
//!
//! ## Core Systems
//!
//! - **[`markup`]**: quick-xml document parser and the element tree model
//! - **[`layout`]**: logos-based constraint language (`edges`, `below`, `@high`, ...)
//! - **[`style`]**: property catalogue, typed values, shared style groups and the cascade
//! - **[`codegen`]**: `quote`-based code emission
//! - **[`live`]**: slotmap view tree and two-pass application
//! - **[`reload`]**: polling file watchers, definition cache and diagnostics overlay
//! - **[`geometry`]**: Point, Size, Rect, EdgeInsets

// Foundation
pub mod geometry;

// Document model
pub mod layout;
pub mod markup;
pub mod style;

// Consumers
pub mod codegen;
pub mod live;
pub mod reload;
