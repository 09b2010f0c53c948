//! Boundary-aware text chunker.
//!
//! Splits document body text into [`Passage`]s of at most `chunk_size`
//! characters, preferring to cut at the coarsest boundary available
//! inside the window: paragraph break, then line break, then sentence
//! end, then word boundary, then a hard character cut.
//!
//! Adjacent passages repeat up to `overlap` characters so that text
//! spanning a cut is still retrievable from one passage. Each passage
//! records its actual overlap with the preceding one, so stripping that
//! prefix from every passage after the first reconstructs the input
//! exactly.
//!
//! Lengths and offsets are counted in characters, not bytes, so cuts
//! always land on UTF-8 boundaries.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Passage;

/// Split `text` into ordered passages with bounded length and overlap.
///
/// Guarantees, for `overlap < chunk_size`:
/// - every passage is at most `chunk_size` characters;
/// - each passage's recorded `overlap` is at most `overlap`;
/// - passages appear in document order with contiguous ordinals;
/// - text no longer than `chunk_size` yields exactly one passage.
pub fn split_text(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<Passage> {
    assert!(chunk_size > 0, "chunk_size must be > 0");
    let overlap = overlap.min(chunk_size - 1);

    // Byte offset of each character, plus the end of the string, so char
    // positions can be sliced without landing inside a code point.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n_chars = offsets.len() - 1;

    if n_chars <= chunk_size {
        return vec![make_passage(document_id, 0, text, 0)];
    }

    let mut passages = Vec::new();
    let mut start = 0usize;
    let mut carried_overlap = 0usize;

    loop {
        let window_end = (start + chunk_size).min(n_chars);
        if window_end == n_chars {
            let piece = &text[offsets[start]..];
            passages.push(make_passage(
                document_id,
                passages.len(),
                piece,
                carried_overlap,
            ));
            break;
        }

        let cut = find_cut(text, &offsets, start, window_end, overlap);
        let piece = &text[offsets[start]..offsets[cut]];
        passages.push(make_passage(
            document_id,
            passages.len(),
            piece,
            carried_overlap,
        ));

        // Step back by up to `overlap` characters, but always make
        // forward progress even when the piece was shorter than the
        // overlap itself.
        let next = cut.saturating_sub(overlap).max(start + 1);
        carried_overlap = cut - next;
        start = next;
    }

    passages
}

/// Pick the cut position in `(start, window_end]`, in characters.
///
/// Prefers the latest boundary inside the window, trying coarser
/// separators first; falls back to a hard cut at the window end. A cut
/// must land past the overlapped prefix, otherwise the resulting
/// passage would carry no new content.
fn find_cut(
    text: &str,
    offsets: &[usize],
    start: usize,
    window_end: usize,
    overlap: usize,
) -> usize {
    let window = &text[offsets[start]..offsets[window_end]];
    let accept = |cut_byte: usize| -> Option<usize> {
        let cut = start + window[..cut_byte].chars().count();
        (cut > start + overlap).then_some(cut)
    };

    // Paragraph break, then line break: the newline(s) stay in the left
    // passage.
    for sep in ["\n\n", "\n"] {
        if let Some(cut) = window.rfind(sep).and_then(|pos| accept(pos + sep.len())) {
            return cut;
        }
    }

    // Sentence end: punctuation followed by a space, space included.
    let sentence_cut = [". ", "! ", "? "]
        .iter()
        .filter_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
        .max()
        .and_then(accept);
    if let Some(cut) = sentence_cut {
        return cut;
    }

    // Word boundary.
    if let Some(cut) = window.rfind(' ').and_then(|pos| accept(pos + 1)) {
        return cut;
    }

    // Hard cut at the window end.
    window_end
}

fn make_passage(document_id: &str, ordinal: usize, text: &str, overlap: usize) -> Passage {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Passage {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        ordinal,
        text: text.to_string(),
        overlap,
        hash,
    }
}
