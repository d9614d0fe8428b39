//! Typed access to the indirect object table of a parsed PDF.
//!
//! The table owns every object; [`ObjectId`] handles are weak and may dangle once an entry has
//! been removed. Every accessor returns a `Result` so callers can treat a missing or mistyped
//! object as a skip rather than a crash.

use crate::error::{CompressionError, GraphError};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Longest reference chain followed before giving up (guards against cycles).
const MAX_REFERENCE_DEPTH: usize = 32;

/// Deepest page tree walked when looking for inherited resources.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// The object graph of one document, mutated in place by the pipeline.
pub struct ObjectGraph {
    doc: Document,
}

impl ObjectGraph {
    /// Parse PDF bytes into a graph.
    pub fn parse(bytes: &[u8]) -> Result<Self, CompressionError> {
        let doc = Document::load_mem(bytes).map_err(|e| CompressionError::Parse(e.to_string()))?;
        Ok(Self { doc })
    }

    pub fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    /// Number of indirect objects in the table.
    pub fn len(&self) -> usize {
        self.doc.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.doc.objects.contains_key(&id)
    }

    /// Look up an indirect object by reference.
    pub fn lookup(&self, id: ObjectId) -> Result<&Object, GraphError> {
        self.doc
            .objects
            .get(&id)
            .ok_or(GraphError::DanglingReference(id))
    }

    pub fn lookup_mut(&mut self, id: ObjectId) -> Result<&mut Object, GraphError> {
        self.doc
            .objects
            .get_mut(&id)
            .ok_or(GraphError::DanglingReference(id))
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object, GraphError> {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match current {
                Object::Reference(id) => current = self.lookup(*id)?,
                direct => return Ok(direct),
            }
        }
        Err(GraphError::UnexpectedType {
            expected: "direct object",
            found: "reference chain",
        })
    }

    /// The dictionary of an indirect object (a stream's dictionary counts).
    pub fn dictionary(&self, id: ObjectId) -> Result<&Dictionary, GraphError> {
        as_dictionary(self.lookup(id)?)
    }

    pub fn dictionary_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary, GraphError> {
        match self.lookup_mut(id)? {
            Object::Dictionary(dict) => Ok(dict),
            Object::Stream(stream) => Ok(&mut stream.dict),
            other => Err(unexpected("dictionary", other)),
        }
    }

    /// Read a dictionary entry, `None` when the key is absent.
    pub fn dict_entry<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        dict.get(key).ok()
    }

    pub fn set_dict_entry(
        &mut self,
        id: ObjectId,
        key: &[u8],
        value: impl Into<Object>,
    ) -> Result<(), GraphError> {
        self.dictionary_mut(id)?.set(key.to_vec(), value);
        Ok(())
    }

    /// Remove a dictionary entry. Removing an absent key is a no-op returning `Ok(None)`.
    pub fn delete_dict_entry(
        &mut self,
        id: ObjectId,
        key: &[u8],
    ) -> Result<Option<Object>, GraphError> {
        Ok(self.dictionary_mut(id)?.remove(key))
    }

    /// Snapshot of every object id, for loops that mutate the table.
    pub fn indirect_ids(&self) -> Vec<ObjectId> {
        self.doc.objects.keys().copied().collect()
    }

    /// Iterate the table in object-number order. Restartable; the borrow forbids mutation.
    pub fn enumerate(&self) -> impl Iterator<Item = (ObjectId, &Object)> + '_ {
        self.doc.objects.iter().map(|(id, object)| (*id, object))
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.doc.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.doc.trailer
    }

    pub fn catalog_id(&self) -> Result<ObjectId, GraphError> {
        match Self::dict_entry(&self.doc.trailer, b"Root") {
            Some(Object::Reference(id)) => Ok(*id),
            Some(other) => Err(unexpected("reference", other)),
            None => Err(GraphError::MissingKey("Root".to_string())),
        }
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// The resource dictionary in effect for a page, inherited through `/Parent` when the page
    /// has none of its own.
    pub fn page_resources(&self, page_id: ObjectId) -> Result<Option<&Dictionary>, GraphError> {
        let mut current = page_id;
        for _ in 0..MAX_PAGE_TREE_DEPTH {
            let node = self.dictionary(current)?;
            if let Some(resources) = Self::dict_entry(node, b"Resources") {
                return as_dictionary(self.resolve(resources)?).map(Some);
            }
            match Self::dict_entry(node, b"Parent") {
                Some(Object::Reference(parent)) => current = *parent,
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Indirect objects named by one resource category (`XObject`, `Font`, ...).
    pub fn category_refs(
        &self,
        resources: &Dictionary,
        category: &[u8],
    ) -> Result<Vec<ObjectId>, GraphError> {
        match Self::dict_entry(resources, category) {
            Some(entry) => Ok(reference_values(as_dictionary(self.resolve(entry)?)?)),
            None => Ok(Vec::new()),
        }
    }

    /// Indirect objects a page names in one resource category.
    pub fn page_resource_refs(
        &self,
        page_id: ObjectId,
        category: &[u8],
    ) -> Result<Vec<ObjectId>, GraphError> {
        match self.page_resources(page_id)? {
            Some(resources) => self.category_refs(resources, category),
            None => Ok(Vec::new()),
        }
    }

    /// Content stream ids of a page (`/Contents` may be one stream or an array of streams).
    pub fn page_content_ids(&self, page_id: ObjectId) -> Result<Vec<ObjectId>, GraphError> {
        let page = self.dictionary(page_id)?;
        match Self::dict_entry(page, b"Contents") {
            None => Ok(Vec::new()),
            Some(Object::Reference(id)) => match self.lookup(*id)? {
                Object::Stream(_) => Ok(vec![*id]),
                Object::Array(items) => Ok(reference_items(items)),
                other => Err(unexpected("content stream", other)),
            },
            Some(Object::Array(items)) => Ok(reference_items(items)),
            Some(other) => Err(unexpected("content stream reference", other)),
        }
    }
}

/// Name of an object's variant, for diagnostics.
pub fn kind_of(object: &Object) -> &'static str {
    match object {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) => "integer",
        Object::Real(_) => "real",
        Object::Name(_) => "name",
        Object::String(_, _) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}

pub(crate) fn unexpected(expected: &'static str, found: &Object) -> GraphError {
    GraphError::UnexpectedType {
        expected,
        found: kind_of(found),
    }
}

pub fn as_dictionary(object: &Object) -> Result<&Dictionary, GraphError> {
    match object {
        Object::Dictionary(dict) => Ok(dict),
        Object::Stream(stream) => Ok(&stream.dict),
        other => Err(unexpected("dictionary", other)),
    }
}

pub fn name_of(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Integer value of a numeric object; reals are truncated.
pub fn integer_of(object: &Object) -> Option<i64> {
    match object {
        Object::Integer(n) => Some(*n),
        Object::Real(r) if r.is_finite() => Some(r.trunc() as i64),
        _ => None,
    }
}

/// Whether a dictionary's `/Subtype` is the given name.
pub fn has_subtype(dict: &Dictionary, subtype: &[u8]) -> bool {
    ObjectGraph::dict_entry(dict, b"Subtype").and_then(name_of) == Some(subtype)
}

/// Filter names of a stream dictionary, in decode order.
pub fn filter_names(dict: &Dictionary) -> Vec<String> {
    match ObjectGraph::dict_entry(dict, b"Filter") {
        Some(Object::Name(name)) => vec![String::from_utf8_lossy(name).to_string()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(name_of)
            .map(|name| String::from_utf8_lossy(name).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

fn reference_values(dict: &Dictionary) -> Vec<ObjectId> {
    dict.iter()
        .filter_map(|(_, value)| match value {
            Object::Reference(id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn reference_items(items: &[Object]) -> Vec<ObjectId> {
    items
        .iter()
        .filter_map(|item| match item {
            Object::Reference(id) => Some(*id),
            _ => None,
        })
        .collect()
}
