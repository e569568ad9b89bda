//! Command-line macro detection
//!
//! The macro-info format does not mark which base-table entries came from the
//! compiler command line (or were predefined by the compiler) and which were
//! written at the top of the translation unit. Compilers encode the former
//! either all on line 1 or as a run of consecutive line numbers, so the
//! boundary is recovered from the line numbers alone.

use std::ops::Range;

/// Strictly increasing steps after which a reset to line 1 is no longer
/// read as a plateau of predefined macros.
pub const PLATEAU_STEP_LIMIT: usize = 10;

/// Line number shared by predefined macros in the plateau encoding
const PLATEAU_LINE: u32 = 1;

/// Locate the command-line macros in an ordered base table.
///
/// `entries` holds the `(line_num, file_idx)` pair of every base-table
/// record in file order. The returned range indexes into `entries`.
pub fn command_line_span(entries: &[(u32, Option<u32>)]) -> Range<usize> {
    let size = entries.len();
    if size == 0 {
        return 0..0;
    }

    // Ambiguous: hand back every unattributed entry and let the caller filter.
    if size > 2
        && entries[0].1.is_none()
        && entries[1].1.is_none()
        && entries[0].0 == entries[1].0
    {
        let end = entries
            .iter()
            .position(|(_, file_idx)| file_idx.is_some())
            .unwrap_or(size);
        return 0..end;
    }

    let mut prev_line = entries[0].0;
    let mut count = 0;
    let mut idx = 1;
    while idx < size {
        let curr_line = entries[idx].0;
        if curr_line <= prev_line {
            break;
        }
        prev_line = curr_line;
        count += 1;
        idx += 1;
    }

    if idx == size {
        return 0..consecutive_run_end(entries, 0);
    }

    if count < PLATEAU_STEP_LIMIT && entries[idx].0 == PLATEAU_LINE {
        let end = entries
            .iter()
            .position(|(line, _)| *line != PLATEAU_LINE)
            .unwrap_or(size);
        return 0..end;
    }

    idx..consecutive_run_end(entries, idx)
}

/// End of the run starting at `start` in which each line is one more than
/// the line before it.
fn consecutive_run_end(entries: &[(u32, Option<u32>)], start: usize) -> usize {
    let mut end = start + 1;
    while end < entries.len() && entries[end - 1].0.checked_add(1) == Some(entries[end].0) {
        end += 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(lines: &[u32]) -> Vec<(u32, Option<u32>)> {
        lines.iter().map(|&line| (line, None)).collect()
    }

    #[test]
    fn test_empty() {
        assert_eq!(command_line_span(&[]), 0..0);
    }

    #[test]
    fn test_single_entry() {
        assert_eq!(command_line_span(&base(&[7])), 0..1);
    }

    #[test]
    fn test_same_line_prefix_is_ambiguous() {
        let mut entries = base(&[1, 1, 1, 2, 2, 5, 9]);
        assert_eq!(command_line_span(&entries), 0..7);

        entries.push((3, Some(4)));
        entries.push((4, None));
        assert_eq!(command_line_span(&entries), 0..7);
    }

    #[test]
    fn test_two_equal_lines_skip_the_guard() {
        // The guard needs more than two entries; this is a plateau at line 1.
        assert_eq!(command_line_span(&base(&[1, 1])), 0..2);
        assert_eq!(command_line_span(&base(&[4, 4])), 1..2);
    }

    #[test]
    fn test_increasing_to_the_end() {
        assert_eq!(command_line_span(&base(&[3, 4, 5, 6, 20])), 0..4);
        assert_eq!(command_line_span(&base(&[1, 2, 3])), 0..3);
    }

    #[test]
    fn test_reset_to_line_one() {
        // One step, then back to line 1: predefined macros sit on line 1.
        assert_eq!(command_line_span(&base(&[1, 2, 1, 1, 3])), 0..1);
        // Leading entry not on line 1 yields an empty plateau.
        assert_eq!(command_line_span(&base(&[0, 2, 1, 1])), 0..0);
    }

    #[test]
    fn test_long_increase_then_consecutive_run() {
        // Ten increasing steps, so a reset to line 1 is a new consecutive run.
        let mut lines: Vec<u32> = (1..=11).collect();
        lines.extend([1, 2, 3, 7]);
        assert_eq!(command_line_span(&base(&lines)), 11..14);
    }

    #[test]
    fn test_stop_not_on_line_one() {
        assert_eq!(command_line_span(&base(&[5, 8, 3, 4, 5, 6])), 2..6);
        assert_eq!(command_line_span(&base(&[5, 8, 8, 10])), 2..3);
    }
}
