use std::collections::BTreeMap;

use crate::encryption::SecurityManager;
use crate::{Dictionary, Object, ObjectId};

/// The trailer the previous update ended with, as recovered by the parser.
///
/// `position` is the byte offset of the cross-reference section the trailer
/// describes, measured from the start of the file. A position of zero means
/// the parser could not locate it and fell back to linear traversal.
#[derive(Debug, Clone)]
pub struct PrevTrailer {
    pub dictionary: Dictionary,
    pub position: u64,
}

impl PrevTrailer {
    pub fn new(dictionary: Dictionary, position: u64) -> PrevTrailer {
        PrevTrailer { dictionary, position }
    }

    /// The object count recorded by the previous update, or 0 when absent.
    pub fn size(&self) -> i64 {
        self.dictionary.get(b"Size").and_then(Object::as_i64).unwrap_or(0)
    }

    /// Cross-reference stream trailers carry a `Type` key; table trailers
    /// never do. Presence of the key selects the compressed output path.
    pub fn is_xref_stream(&self) -> bool {
        self.dictionary.has(b"Type")
    }
}

/// A recorded modification to one top-level object.
#[derive(Debug, Clone)]
pub enum Change {
    Written(Object),
    Deleted,
}

/// Records which top-level objects were created, replaced or deleted since
/// the document was parsed. The writer reads it once, in ascending
/// object-number order, and never mutates it.
#[derive(Debug, Clone)]
pub struct StateManager {
    changes: BTreeMap<ObjectId, Change>,
    trailer: PrevTrailer,
}

impl StateManager {
    pub fn new(trailer: PrevTrailer) -> StateManager {
        StateManager {
            changes: BTreeMap::new(),
            trailer,
        }
    }

    /// Record a new or modified top-level object.
    pub fn set_object<T: Into<Object>>(&mut self, id: ObjectId, object: T) {
        self.changes.insert(id, Change::Written(object.into()));
    }

    /// Record a deletion. The object number joins the free list in the next
    /// update; no object body is emitted for it.
    pub fn delete_object(&mut self, id: ObjectId) {
        self.changes.insert(id, Change::Deleted);
    }

    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changed_count(&self) -> usize {
        self.changes.len()
    }

    /// Changes in ascending object-number order.
    pub fn changes(&self) -> impl Iterator<Item = (ObjectId, &Change)> {
        self.changes.iter().map(|(&id, change)| (id, change))
    }

    pub fn trailer(&self) -> &PrevTrailer {
        &self.trailer
    }
}

/// The writer's view of the document being saved: the pending change set
/// plus the optional encryption state streams must be run through.
#[derive(Debug)]
pub struct Document {
    pub state: StateManager,
    pub security: Option<SecurityManager>,
}

impl Document {
    pub fn new(state: StateManager) -> Document {
        Document { state, security: None }
    }

    pub fn with_security(state: StateManager, security: SecurityManager) -> Document {
        Document {
            state,
            security: Some(security),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.security.is_some()
    }
}
