// Harmony channel markers emitted inline by gpt-oss style models.

/// Structural token that opens a message header.
pub const START: &str = "<|start|>";

/// Structural token that separates a message header from its body.
pub const MESSAGE: &str = "<|message|>";

/// Opens a reasoning (analysis) segment.
pub const ANALYSIS_OPEN: &str = "<|channel|>analysis<|message|>";

/// Opens a final answer segment.
pub const FINAL_OPEN: &str = "<|channel|>final<|message|>";

/// Closes the current segment.
pub const END: &str = "<|end|>";

/// Length in characters of the longest channel marker.
pub const MAX_MARKER_LEN: usize = const_max(
    const_max(ANALYSIS_OPEN.len(), FINAL_OPEN.len()),
    END.len(),
);

const fn const_max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}
