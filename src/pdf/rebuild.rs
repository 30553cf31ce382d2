//! Writing a document that keeps only selected pages.

use lopdf::Document as LopdfDocument;

use crate::error::{Error, Result};

/// Serialize `doc` keeping only the pages at `kept` (0-based, ascending).
///
/// Page objects, resources and metadata of kept pages are carried over
/// untouched; objects reachable only from removed pages are pruned. When
/// nothing is removed and no compression is requested the `source` bytes are
/// returned unchanged.
pub fn rebuild_document(
    doc: &mut LopdfDocument,
    source: &[u8],
    page_count: usize,
    kept: &[usize],
    compress: bool,
) -> Result<Vec<u8>> {
    check_kept(kept, page_count)?;

    let removed = removed_page_numbers(kept, page_count);
    if removed.is_empty() && !compress {
        return Ok(source.to_vec());
    }

    if !removed.is_empty() {
        doc.delete_pages(&removed);
        let pruned = doc.prune_objects();
        log::debug!(
            "Removed {} pages, pruned {} objects",
            removed.len(),
            pruned.len()
        );
    }
    if compress {
        doc.compress();
    }

    let mut out = Vec::with_capacity(source.len());
    doc.save_to(&mut out)
        .map_err(|e| Error::Other(format!("failed to serialize document: {}", e)))?;
    Ok(out)
}

/// 1-based page numbers of pages not in `kept`.
fn removed_page_numbers(kept: &[usize], page_count: usize) -> Vec<u32> {
    let mut keep = kept.iter().peekable();
    (0..page_count)
        .filter(|i| {
            if keep.peek() == Some(&i) {
                keep.next();
                false
            } else {
                true
            }
        })
        .map(|i| i as u32 + 1)
        .collect()
}

fn check_kept(kept: &[usize], page_count: usize) -> Result<()> {
    if let Some(&bad) = kept.iter().find(|&&i| i >= page_count) {
        return Err(Error::PageOutOfRange(bad, page_count));
    }
    if kept.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::Other(
            "kept pages must be strictly ascending".to_string(),
        ));
    }
    Ok(())
}
