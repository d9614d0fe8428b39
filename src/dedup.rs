//! Duplicate object detection and, optionally, merging.
//!
//! Each indirect object is fed to SHA-256 in a canonical form: dictionary keys sorted, string
//! syntax ignored, and a stream's `/Length` left out. The first object with a given digest in
//! table order is canonical; later ones are duplicates.

use crate::graph::{name_of, ObjectGraph};
use crate::options::TierPolicy;
use crate::report;
use lopdf::{Dictionary, Object, ObjectId};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Objects the page tree and trailer depend on by identity.
const NEVER_MERGED: [&[u8]; 3] = [b"Page", b"Pages", b"Catalog"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateStats {
    pub detected: usize,
    pub merged: usize,
}

/// Map every duplicate to its canonical object.
pub fn find_duplicates(graph: &ObjectGraph) -> BTreeMap<ObjectId, ObjectId> {
    let mut seen: HashMap<[u8; 32], ObjectId> = HashMap::new();
    let mut duplicates = BTreeMap::new();

    for (id, object) in graph.enumerate() {
        if !is_mergeable(object) {
            continue;
        }
        let mut hasher = Sha256::new();
        feed(&mut hasher, object);
        let key: [u8; 32] = hasher.finalize().into();

        if let Some(&canonical) = seen.get(&key) {
            log::debug!("[Dedup] {:?} duplicates {:?}", id, canonical);
            duplicates.insert(id, canonical);
        } else {
            seen.insert(key, id);
        }
    }

    duplicates
}

/// Count duplicates and, when the policy allows, merge them into their canonical objects.
pub fn scan_duplicates(
    graph: &mut ObjectGraph,
    policy: &TierPolicy,
    applied: &mut Vec<String>,
) -> DuplicateStats {
    let duplicates = find_duplicates(graph);
    let mut stats = DuplicateStats {
        detected: duplicates.len(),
        merged: 0,
    };
    if stats.detected == 0 {
        return stats;
    }
    applied.push(format!("{}: {}", report::DUPLICATES_DETECTED, stats.detected));

    if policy.merge_duplicates {
        stats.merged = merge_duplicates(graph, &duplicates);
        applied.push(format!("{}: {}", report::DUPLICATES_MERGED, stats.merged));
    }
    stats
}

/// Point every reference at the canonical object, then drop the duplicates.
fn merge_duplicates(graph: &mut ObjectGraph, duplicates: &BTreeMap<ObjectId, ObjectId>) -> usize {
    let doc = graph.document_mut();
    for object in doc.objects.values_mut() {
        rewrite_references(object, duplicates);
    }
    rewrite_dictionary(&mut doc.trailer, duplicates);

    duplicates
        .keys()
        .filter(|id| doc.objects.remove(*id).is_some())
        .count()
}

fn rewrite_references(object: &mut Object, duplicates: &BTreeMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(canonical) = duplicates.get(id) {
                *id = *canonical;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                rewrite_references(item, duplicates);
            }
        }
        Object::Dictionary(dict) => rewrite_dictionary(dict, duplicates),
        Object::Stream(stream) => rewrite_dictionary(&mut stream.dict, duplicates),
        _ => {}
    }
}

fn rewrite_dictionary(dict: &mut Dictionary, duplicates: &BTreeMap<ObjectId, ObjectId>) {
    for (_, value) in dict.iter_mut() {
        rewrite_references(value, duplicates);
    }
}

fn is_mergeable(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return true,
    };
    match ObjectGraph::dict_entry(dict, b"Type").and_then(name_of) {
        Some(kind) => !NEVER_MERGED.contains(&kind),
        None => true,
    }
}

fn feed_bytes(hasher: &mut Sha256, tag: u8, bytes: &[u8]) {
    hasher.update([tag]);
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Hash an object in canonical form.
fn feed(hasher: &mut Sha256, object: &Object) {
    match object {
        Object::Null => hasher.update(b"N"),
        Object::Boolean(value) => hasher.update(if *value { b"T" } else { b"F" }),
        Object::Integer(value) => {
            hasher.update(b"I");
            hasher.update(value.to_be_bytes());
        }
        Object::Real(value) => feed_bytes(hasher, b'R', value.to_string().as_bytes()),
        Object::Name(name) => feed_bytes(hasher, b'/', name),
        // Literal and hex syntax encode the same value
        Object::String(bytes, _) => feed_bytes(hasher, b'(', bytes),
        Object::Array(items) => {
            hasher.update(b"[");
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                feed(hasher, item);
            }
        }
        Object::Dictionary(dict) => feed_dictionary(hasher, dict, &[]),
        Object::Stream(stream) => {
            hasher.update(b"S");
            feed_dictionary(hasher, &stream.dict, &[b"Length".as_slice()]);
            feed_bytes(hasher, b'D', &stream.content);
        }
        Object::Reference((number, generation)) => {
            hasher.update(b"R");
            hasher.update(number.to_be_bytes());
            hasher.update(generation.to_be_bytes());
        }
    }
}

fn feed_dictionary(hasher: &mut Sha256, dict: &Dictionary, skip: &[&[u8]]) {
    let mut entries: Vec<(&Vec<u8>, &Object)> = dict
        .iter()
        .filter(|(key, _)| !skip.contains(&key.as_slice()))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    hasher.update(b"<");
    hasher.update((entries.len() as u64).to_be_bytes());
    for (key, value) in entries {
        feed_bytes(hasher, b'/', key);
        feed(hasher, value);
    }
}
