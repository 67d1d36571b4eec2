//! Diagnostic JSON dump of a store's full contents.
//!
//! The dump is a single JSON object keyed by collection name, each value the
//! id-ordered list of documents in that collection, plus a `"meta"` key
//! holding the metadata record when one exists. Intended for inspection, not
//! as a restore format.

use crate::errors::DocvaultResult;
use crate::store::DocumentStore;
use itertools::Itertools;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Reserved top-level key for the metadata record.
const META_KEY: &str = "meta";

/// Renders the store's entire contents as one JSON value.
///
/// Documents group under their origin collection name, in id order. The
/// metadata record, when present and valid, appears under `"meta"` as a
/// single-element array.
pub fn dump_to_value(store: &DocumentStore) -> DocvaultResult<serde_json::Value> {
    let values = store.all()?;

    let grouped = values
        .iter()
        .filter_map(|value| value.as_document())
        .map(|doc| (doc.collection_name.clone(), serde_json::to_value(doc)))
        .collect::<Vec<_>>();

    let mut dump = serde_json::Map::new();
    for (collection_name, docs) in grouped
        .into_iter()
        .into_group_map()
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
    {
        let docs: Result<Vec<serde_json::Value>, _> = docs.into_iter().collect();
        dump.insert(collection_name, serde_json::Value::Array(docs?));
    }

    if let Some(meta) = store.metadata()? {
        dump.insert(
            META_KEY.to_string(),
            serde_json::Value::Array(vec![serde_json::to_value(&meta)?]),
        );
    }

    Ok(serde_json::Value::Object(dump))
}

/// Writes the dump as pretty-printed JSON to `dest`.
pub fn dump_to_json(store: &DocumentStore, dest: &Path) -> DocvaultResult<()> {
    let dump = dump_to_value(store)?;
    log::info!(
        "dumping store {} to {}",
        store.location().display(),
        dest.display()
    );
    let mut writer = BufWriter::new(File::create(dest)?);
    serde_json::to_writer_pretty(&mut writer, &dump)?;
    // a write error surfacing during the implicit drop would be swallowed
    writer.flush()?;
    Ok(())
}
