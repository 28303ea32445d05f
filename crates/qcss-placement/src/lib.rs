//! qcss-placement — deciding which worker hosts each chunk.
//!
//! A [`ChunkMapping`] is built for one (database, table) and answers
//! `worker(chunk)` calls for the duration of one loading session. It keeps
//! every chunk where the CSS already places it (for this table or any other
//! table of the same database) and spreads brand-new chunks over the
//! candidate workers with strict round-robin.
//!
//! # Components
//!
//! - **`mapping`** — the session mapping and its `save()` back to the CSS
//! - **`ring`** — the rotating candidate worker list

pub mod error;
pub mod mapping;
pub mod ring;

pub use error::{MappingError, MappingResult};
pub use mapping::ChunkMapping;
pub use ring::WorkerRing;
