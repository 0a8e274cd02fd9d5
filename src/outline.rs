//! Outline (bookmark) handling for the merge session.
//!
//! Every appended document brings its own outline along. Before the source
//! catalog is discarded, named destinations used by its outline items are
//! rewritten into explicit ones, since the name trees they point into are not
//! carried over. The items are then re-homed under the outline of the
//! combined document.

use anyhow::Result;
use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::{BTreeMap, BTreeSet};

const MAX_NAME_TREE_DEPTH: u8 = 32;

/// Top-level items of the document outline, in reading order.
pub fn top_level_items(doc: &Document) -> Vec<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Outlines"))
        .and_then(Object::as_reference)
        .map(|outlines_id| children_of(doc, outlines_id))
        .unwrap_or_default()
}

/// Items chained from `First` through `Next` below `parent_id`.
pub fn children_of(doc: &Document, parent_id: ObjectId) -> Vec<ObjectId> {
    let mut items = Vec::new();
    let mut next = linked_item(doc, parent_id, b"First");

    while let Some(item_id) = next {
        if items.contains(&item_id) {
            debug!("Outline chain below {parent_id:?} loops back on {item_id:?}");
            break;
        }
        items.push(item_id);
        next = linked_item(doc, item_id, b"Next");
    }

    items
}

fn linked_item(doc: &Document, item_id: ObjectId, key: &[u8]) -> Option<ObjectId> {
    doc.get_dictionary(item_id)
        .and_then(|item| item.get(key))
        .and_then(Object::as_reference)
        .ok()
}

/// Replaces named destinations of every outline item (at any depth) by the
/// explicit destination they name. Returns how many items were rewritten.
pub fn resolve_named_destinations(doc: &mut Document) -> Result<usize> {
    let named = named_destinations(doc);
    let mut rewritten = 0;

    for item_id in all_items(doc) {
        let name = {
            let doc: &Document = doc;
            doc.get_dictionary(item_id)
                .ok()
                .and_then(|item| named_target(doc, item))
        };
        let Some(name) = name else {
            continue;
        };

        match named.get(&name) {
            Some(destination) => {
                let item = doc.get_dictionary_mut(item_id)?;
                item.set("Dest", destination.clone());
                item.remove(b"A");
                rewritten += 1;
            }
            None => debug!(
                "Outline item {item_id:?} points to the unknown destination '{}'",
                String::from_utf8_lossy(&name)
            ),
        }
    }

    Ok(rewritten)
}

fn all_items(doc: &Document) -> Vec<ObjectId> {
    let mut visited = BTreeSet::new();
    let mut pending = top_level_items(doc);

    while let Some(item_id) = pending.pop() {
        if visited.insert(item_id) {
            pending.extend(children_of(doc, item_id));
        }
    }

    visited.into_iter().collect()
}

/// Name used by the item, either as `Dest` or as the target of a `GoTo` action.
fn named_target(doc: &Document, item: &Dictionary) -> Option<Vec<u8>> {
    let target = match item.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => {
            let action = deref(doc, item.get(b"A").ok()?).ok()?.as_dict().ok()?;
            if action.get(b"S").and_then(Object::as_name).ok()? != b"GoTo" {
                return None;
            }
            action.get(b"D").ok()?
        }
    };

    match deref(doc, target).ok()? {
        Object::Name(name) | Object::String(name, _) => Some(name.clone()),
        _ => None,
    }
}

/// Explicit destinations by name, from the catalog `Dests` dictionary and the
/// `Dests` name tree.
fn named_destinations(doc: &Document) -> BTreeMap<Vec<u8>, Object> {
    let mut named = BTreeMap::new();
    let Ok(catalog) = doc.catalog() else {
        return named;
    };

    if let Ok(dests) = catalog.get(b"Dests").and_then(|dests| deref_dict(doc, dests)) {
        for (name, value) in dests.iter() {
            if let Some(destination) = explicit_destination(doc, value) {
                named.insert(name.clone(), destination);
            }
        }
    }

    if let Ok(tree) = catalog
        .get(b"Names")
        .and_then(|names| deref_dict(doc, names))
        .and_then(|names| names.get(b"Dests"))
        .and_then(|tree| deref_dict(doc, tree))
    {
        collect_name_tree(doc, tree, 0, &mut named);
    }

    named
}

fn collect_name_tree(
    doc: &Document,
    node: &Dictionary,
    depth: u8,
    named: &mut BTreeMap<Vec<u8>, Object>,
) {
    if depth > MAX_NAME_TREE_DEPTH {
        debug!("Name tree deeper than {MAX_NAME_TREE_DEPTH} levels, ignoring the rest");
        return;
    }

    if let Ok(pairs) = node.get(b"Names").and_then(Object::as_array) {
        for pair in pairs.chunks(2) {
            if let [key, value] = pair {
                if let (Ok(Object::String(name, _)), Some(destination)) =
                    (deref(doc, key), explicit_destination(doc, value))
                {
                    named.insert(name.clone(), destination);
                }
            }
        }
    }

    if let Ok(kids) = node.get(b"Kids").and_then(Object::as_array) {
        for kid in kids {
            if let Ok(kid) = deref_dict(doc, kid) {
                collect_name_tree(doc, kid, depth + 1, named);
            }
        }
    }
}

/// A destination value is either the array itself or a dictionary holding it under `D`.
fn explicit_destination(doc: &Document, value: &Object) -> Option<Object> {
    let array = match deref(doc, value).ok()? {
        Object::Dictionary(dict) => deref(doc, dict.get(b"D").ok()?).ok()?,
        other => other,
    };

    matches!(array, Object::Array(_)).then(|| array.clone())
}

fn deref<'a>(doc: &'a Document, object: &'a Object) -> lopdf::Result<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id),
        _ => Ok(object),
    }
}

fn deref_dict<'a>(doc: &'a Document, object: &'a Object) -> lopdf::Result<&'a Dictionary> {
    deref(doc, object).and_then(Object::as_dict)
}

/// Adds an item titled `title` pointing at `page_id`, with `children` (already
/// in `doc`) nested below it. The item is not attached to any parent yet.
pub fn add_entry(
    doc: &mut Document,
    title: &str,
    page_id: ObjectId,
    children: &[ObjectId],
) -> Result<ObjectId> {
    let entry_id = doc.new_object_id();
    let mut entry = dictionary! {
        "Title" => Object::string_literal(title),
        "Dest" => vec![Object::Reference(page_id), "Fit".into()],
    };

    link_children(doc, entry_id, children, &mut entry)?;
    doc.objects.insert(entry_id, Object::Dictionary(entry));

    Ok(entry_id)
}

/// Chains `children` below `parent`: each child gets `Parent`, `Prev` and `Next`
/// rewritten, the parent gets `First`, `Last` and `Count`.
pub fn link_children(
    doc: &mut Document,
    parent_id: ObjectId,
    children: &[ObjectId],
    parent: &mut Dictionary,
) -> Result<()> {
    for (index, &child_id) in children.iter().enumerate() {
        let child = doc.get_dictionary_mut(child_id)?;
        child.set("Parent", Object::Reference(parent_id));

        match index.checked_sub(1).map(|previous| children[previous]) {
            Some(previous_id) => child.set("Prev", Object::Reference(previous_id)),
            None => {
                child.remove(b"Prev");
            }
        }
        match children.get(index + 1) {
            Some(&next_id) => child.set("Next", Object::Reference(next_id)),
            None => {
                child.remove(b"Next");
            }
        }
    }

    if let (Some(&first_id), Some(&last_id)) = (children.first(), children.last()) {
        parent.set("First", Object::Reference(first_id));
        parent.set("Last", Object::Reference(last_id));
        parent.set("Count", Object::Integer(children.len() as i64));
    }

    Ok(())
}
