//! Text position utilities for byte offset and line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes

/// Convert a byte offset to 1-indexed line and column (Unicode-aware).
///
/// Offsets past the end of `content` resolve to the position after the
/// last character.
pub fn byte_offset_to_position_str(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current_offset = 0usize;

    for ch in content.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

/// Byte offset of the first character of 1-indexed `line`, if the line exists.
pub fn line_start_offset(content: &str, line: u32) -> Option<usize> {
    if line <= 1 {
        return Some(0);
    }
    content
        .match_indices('\n')
        .nth((line - 2) as usize)
        .map(|(index, _)| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod offsets {
        use super::*;

        #[test]
        fn start_of_file() {
            assert_eq!(byte_offset_to_position_str("abc", 0), (1, 1));
        }

        #[test]
        fn second_line() {
            let content = "import a from 'a';\nawait a();\n";
            assert_eq!(byte_offset_to_position_str(content, 19), (2, 1));
            assert_eq!(byte_offset_to_position_str(content, 25), (2, 7));
        }

        #[test]
        fn multibyte_chars_count_as_one_column() {
            let content = "const é = 'ü';";
            let offset = content.find('=').unwrap();
            assert_eq!(byte_offset_to_position_str(content, offset), (1, 9));
        }

        #[test]
        fn past_end_clamps() {
            assert_eq!(byte_offset_to_position_str("ab\ncd", 100), (2, 3));
        }
    }

    #[test]
    fn line_starts() {
        let content = "one\ntwo\nthree";
        assert_eq!(line_start_offset(content, 0), Some(0));
        assert_eq!(line_start_offset(content, 2), Some(4));
        assert_eq!(line_start_offset(content, 3), Some(8));
        assert_eq!(line_start_offset(content, 7), None);
    }
}
