use crate::json_io::{print_json, read_tree};
use anyhow::{Result, anyhow};
use pathbind::v1::{convert, create, serialize};
use pathbind_samples::collection::{LocalCollection, PurviewCollection, PurviewResponse};
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;

pub fn run(input: &Path, pretty: bool) -> Result<()> {
    let listing = read_tree(input)?;
    print_json(&nest(&listing)?, pretty)
}

/// Link a flat listing and serialize its root as a nested local tree.
fn nest(listing: &Value) -> Result<Value> {
    let response = create::<PurviewResponse>(listing)?;
    let root = response
        .borrow()
        .root
        .as_ref()
        .map(Rc::clone)
        .ok_or_else(|| anyhow!("collection listing has no root collection"))?;
    tracing::debug!(root = %root.borrow().name, "nesting collection listing");
    let local = convert::<PurviewCollection, LocalCollection>(&root)?;
    let tree = serialize(&*local.borrow())?;
    Ok(tree)
}
