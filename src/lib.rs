#[macro_use]
mod object;
pub use crate::object::{Dictionary, Object, ObjectId, Stream, StringFormat};

mod error;
pub use crate::error::{Error, Result};

pub mod encryption;
pub use crate::encryption::SecurityManager;

mod state;
pub use crate::state::{Change, Document, PrevTrailer, StateManager};

mod writer;
pub use crate::writer::{CountingWrite, Writer};

mod xref;
pub use crate::xref::{Entry, EntryState, EntryTable};

mod update;
pub use crate::update::{append_incremental_update, updated_document_objects};
