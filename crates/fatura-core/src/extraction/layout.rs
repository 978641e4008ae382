//! Reading-order line assembly for the two-column statement layout.
//!
//! The statement prints two vertically stacked transaction lists side by
//! side. Per page we detect the vertical split between the columns,
//! assign every token to a column by its horizontal position, group each
//! column's tokens into printed lines by vertical proximity, and emit
//! left column top-to-bottom followed by the right column.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

use crate::extraction::{Column, RawLine, Token};

/// Tokens within this vertical band belong to the same printed line.
const Y_TOLERANCE: f32 = 2.5;

/// Minimum horizontal gap between date-token clusters to accept a
/// two-column split.
const MIN_COLUMN_GAP: f32 = 60.0;

/// Minimum hole in character-level horizontal coverage to treat as the
/// column gutter.
const MIN_CHAR_GUTTER: f32 = 18.0;

/// Horizontal gap above which adjacent tokens are separated by a space
/// when a line's text is assembled. Character-level tokens inside one
/// word sit closer than this; distinct words sit further apart.
const WORD_GAP: f32 = 1.0;

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,4}/\d{1,2}").unwrap());

/// Assemble one page's tokens into ordered `RawLine`s.
pub fn lines_from_tokens(page_index: usize, tokens: &[Token]) -> Vec<RawLine> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let split = detect_column_split(tokens);

    let (left, right): (Vec<Token>, Vec<Token>) = match split {
        Some(x) => tokens.iter().cloned().partition(|t| t.x_min < x),
        None => (tokens.to_vec(), Vec::new()),
    };

    let mut lines = Vec::new();
    emit_column(page_index, Column::Left, left, &mut lines);
    emit_column(page_index, Column::Right, right, &mut lines);
    lines
}

/// Detect the per-page x coordinate separating the two printed columns.
///
/// Transaction lines start with a date token, so the x positions of
/// date-shaped tokens cluster at each column's left edge; the split sits
/// in the largest gap between those clusters. Character-level pages have
/// no date-shaped tokens; there the gutter is the widest hole in the
/// overall horizontal coverage. Returns `None` for single-column pages.
pub(crate) fn detect_column_split(tokens: &[Token]) -> Option<f32> {
    let anchors: Vec<f32> = tokens
        .iter()
        .filter(|t| DATE_SHAPE.is_match(&t.text))
        .map(|t| t.x_min)
        .collect();

    if anchors.len() >= 2 {
        return largest_gap_midpoint(anchors, MIN_COLUMN_GAP);
    }

    // The gutter-coverage fallback only makes sense for character-level
    // token streams; on word-level pages a wide description-to-amount
    // gap would masquerade as a gutter.
    let single_char = tokens.iter().filter(|t| t.text.chars().count() == 1).count();
    if single_char * 2 < tokens.len() {
        return None;
    }

    let xs: Vec<f32> = tokens.iter().map(|t| t.x_min).collect();
    if xs.len() < 2 {
        return None;
    }
    largest_gap_midpoint(xs, MIN_CHAR_GUTTER)
}

fn largest_gap_midpoint(mut xs: Vec<f32>, min_gap: f32) -> Option<f32> {
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut largest = 0.0f32;
    let mut split = None;
    for pair in xs.windows(2) {
        let gap = pair[1] - pair[0];
        if gap > largest {
            largest = gap;
            split = Some((pair[0] + pair[1]) / 2.0);
        }
    }

    if largest < min_gap {
        None
    } else {
        split
    }
}

fn emit_column(page_index: usize, column: Column, tokens: Vec<Token>, out: &mut Vec<RawLine>) {
    let mut order = 0;
    for group in group_by_vertical_proximity(tokens) {
        let text = join_tokens(&group);
        if text.trim().is_empty() {
            continue;
        }
        out.push(RawLine {
            page_index,
            column,
            vertical_order: order,
            text,
            tokens: group,
        });
        order += 1;
    }
}

/// Group a column's tokens into printed lines: sort top-to-bottom, open
/// a new line whenever a token falls outside the current line's vertical
/// tolerance band, then order each line's tokens left-to-right.
fn group_by_vertical_proximity(mut tokens: Vec<Token>) -> Vec<Vec<Token>> {
    tokens.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x_min.partial_cmp(&b.x_min).unwrap_or(Ordering::Equal))
    });

    let mut groups: Vec<Vec<Token>> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut anchor_y: Option<f32> = None;

    for token in tokens {
        match anchor_y {
            Some(y) if (token.y - y).abs() > Y_TOLERANCE => {
                groups.push(std::mem::take(&mut current));
                anchor_y = Some(token.y);
            }
            None => anchor_y = Some(token.y),
            _ => {}
        }
        current.push(token);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    for group in &mut groups {
        group.sort_by(|a, b| a.x_min.partial_cmp(&b.x_min).unwrap_or(Ordering::Equal));
    }

    groups
}

/// Concatenate a line's tokens left-to-right, inserting a space only
/// across real horizontal gaps. This renders word-level and
/// character-level tokens through the same rule.
fn join_tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    let mut prev_x_max: Option<f32> = None;

    for token in tokens {
        if let Some(prev) = prev_x_max {
            if token.x_min - prev > WORD_GAP {
                text.push(' ');
            }
        }
        text.push_str(&token.text);
        prev_x_max = Some(token.x_max);
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: f32, y: f32) -> Token {
        Token {
            text: text.to_string(),
            x_min: x,
            x_max: x + text.len() as f32 * 5.0,
            y,
        }
    }

    #[test]
    fn test_split_detected_between_date_clusters() {
        let tokens = vec![
            tok("12/05", 40.0, 100.0),
            tok("MARKET", 75.0, 100.0),
            tok("13/05", 40.0, 112.0),
            tok("12/05", 320.0, 100.0),
            tok("CAFE", 355.0, 100.0),
        ];
        let split = detect_column_split(&tokens).unwrap();
        assert!(split > 40.0 && split < 320.0);
    }

    #[test]
    fn test_no_split_for_single_column_dates() {
        let tokens = vec![
            tok("12/05", 40.0, 100.0),
            tok("13/05", 42.0, 112.0),
            tok("14/05", 40.0, 124.0),
        ];
        assert!(detect_column_split(&tokens).is_none());
    }

    #[test]
    fn test_left_column_emitted_before_right() {
        let tokens = vec![
            tok("12/05", 320.0, 100.0),
            tok("RIGHT", 355.0, 100.0),
            tok("12/05", 40.0, 200.0),
            tok("LEFT", 75.0, 200.0),
        ];
        let lines = lines_from_tokens(0, &tokens);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].column, Column::Left);
        assert!(lines[0].text.contains("LEFT"));
        assert_eq!(lines[1].column, Column::Right);
        assert!(lines[1].text.contains("RIGHT"));
    }

    #[test]
    fn test_vertical_tolerance_groups_one_line() {
        let tokens = vec![
            tok("12/05", 40.0, 100.0),
            tok("MARKET", 75.0, 101.5),
            tok("45,00", 140.0, 99.2),
        ];
        let lines = lines_from_tokens(0, &tokens);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "12/05 MARKET 45,00");
    }

    #[test]
    fn test_character_tokens_join_without_spurious_spaces() {
        // "AB CD" as five character tokens: no gap inside words, a real
        // gap between them.
        let tokens = vec![
            Token { text: "A".into(), x_min: 10.0, x_max: 14.0, y: 50.0 },
            Token { text: "B".into(), x_min: 14.2, x_max: 18.0, y: 50.0 },
            Token { text: "C".into(), x_min: 24.0, x_max: 28.0, y: 50.0 },
            Token { text: "D".into(), x_min: 28.3, x_max: 32.0, y: 50.0 },
        ];
        let lines = lines_from_tokens(0, &tokens);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "AB CD");
    }

    #[test]
    fn test_vertical_order_is_per_column() {
        let tokens = vec![
            tok("12/05", 40.0, 100.0),
            tok("13/05", 40.0, 120.0),
            tok("14/05", 320.0, 100.0),
        ];
        let lines = lines_from_tokens(3, &tokens);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].vertical_order, 0);
        assert_eq!(lines[1].vertical_order, 1);
        assert_eq!(lines[2].vertical_order, 0); // right column restarts
        assert!(lines.iter().all(|l| l.page_index == 3));
    }

    #[test]
    fn test_char_level_gutter_split() {
        let mut tokens = Vec::new();
        for i in 0..10 {
            tokens.push(Token {
                text: "a".into(),
                x_min: 40.0 + i as f32 * 4.5,
                x_max: 44.0 + i as f32 * 4.5,
                y: 100.0,
            });
            tokens.push(Token {
                text: "b".into(),
                x_min: 320.0 + i as f32 * 4.5,
                x_max: 324.0 + i as f32 * 4.5,
                y: 100.0,
            });
        }
        let split = detect_column_split(&tokens).unwrap();
        assert!(split > 85.0 && split < 320.0);
    }

    #[test]
    fn test_empty_token_list_yields_no_lines() {
        assert!(lines_from_tokens(0, &[]).is_empty());
    }
}
