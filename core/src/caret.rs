//! Caret inference for surfaces without a native caret API.
//!
//! In emulated mode the buffer is rendered as a run of fragments with a caret
//! marker between the text before and after the caret. A pointer hit reports
//! which fragment it landed in and the offset inside it; the buffer offset is
//! the sum of the lengths of all text fragments rendered strictly before the
//! hit fragment, plus that inner offset. Any split-rendering strategy works as
//! long as fragments stay in buffer order.

use crate::text_buffer::TextBuffer;

/// One rendered piece of the emulated text surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    CaretMarker,
}

/// Where a pointer or selection landed on the rendered surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHit {
    /// Index of the fragment that was hit.
    pub fragment: usize,
    /// Offset (in chars) inside that fragment.
    pub offset: usize,
    /// False for a ranged selection; only collapsed hits move the caret.
    pub collapsed: bool,
}

impl SurfaceHit {
    pub fn collapsed(fragment: usize, offset: usize) -> Self {
        Self {
            fragment,
            offset,
            collapsed: true,
        }
    }
}

/// Render a buffer as `[before, marker, after]`.
pub fn split_render(buffer: &TextBuffer) -> Vec<Fragment> {
    vec![
        Fragment::Text(buffer.before_caret().to_string()),
        Fragment::CaretMarker,
        Fragment::Text(buffer.after_caret().to_string()),
    ]
}

/// Derive the caret offset for a hit on `fragments`.
///
/// Returns `None` when the hit is not inside a text fragment or the
/// selection is not collapsed.
pub fn caret_from_hit(fragments: &[Fragment], hit: SurfaceHit) -> Option<usize> {
    if !hit.collapsed {
        return None;
    }
    let Fragment::Text(hit_text) = fragments.get(hit.fragment)? else {
        return None;
    };
    if hit.offset > hit_text.chars().count() {
        return None;
    }
    let preceding: usize = fragments[..hit.fragment]
        .iter()
        .map(|f| match f {
            Fragment::Text(t) => t.chars().count(),
            Fragment::CaretMarker => 0,
        })
        .sum();
    Some(preceding + hit.offset)
}
