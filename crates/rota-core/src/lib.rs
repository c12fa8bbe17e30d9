//! # Rota Core Library
//!
//! Recurrence and calendar-occurrence engine for the Rota task and list
//! manager. Item text goes in; a sorted, capped list of due occurrences with
//! stable identities comes out.
//!
//! ## Pipeline
//!
//! - [`phrase`]: natural-language recurrence phrases ("every 2 weeks",
//!   "the last friday of every month") into a [`phrase::RecurrenceDescriptor`]
//! - [`dates`]: explicit and yearless date mentions in free text
//! - [`recurrence`]: canonical rule strings and enumerable rules bound to an anchor
//! - [`yearless`]: year resolution for month/day mentions
//! - [`expansion`]: per-item decision order, windowing and caps
//! - [`identity`]: content-derived occurrence hashes
//! - [`actions`]: completion and ignore annotations
//! - [`source`]: bulk loading of items and actions
//!
//! Nothing is cached between calls; every expansion recomputes from the
//! current items and actions.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::{TimeZone, Utc};
//! use rota_core::{
//!     config::EngineConfig,
//!     expansion::OccurrenceEngine,
//!     models::{ExpansionRequest, Item, ItemKind, QueryWindow},
//! };
//!
//! let engine = OccurrenceEngine::new(&EngineConfig::default());
//! let created = Utc.with_ymd_and_hms(2025, 8, 20, 9, 0, 0).unwrap();
//! let items = vec![Item::new(ItemKind::Task, "gym every 2 weeks from 1/9/2025", created)];
//!
//! let window = QueryWindow::around(Utc::now(), 3, 30);
//! let expansion = engine.expand(&items, &ExpansionRequest::new(window));
//! for occurrence in &expansion.occurrences {
//!     println!("{} {}", occurrence.instant, occurrence.title);
//! }
//! ```

pub mod actions;
pub mod config;
pub mod dates;
pub mod error;
pub mod expansion;
pub mod identity;
pub mod models;
pub mod phrase;
pub mod recurrence;
pub mod source;
pub mod yearless;
