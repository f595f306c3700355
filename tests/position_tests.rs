use descent::combinator::{any, current_pos, current_pos_delta, prefix, repeated, string, token};
use descent::{Config, Parser, PosDelta, Position};

#[test]
fn default_config_counts_columns_only() {
    let p = prefix(repeated(any(), 3), current_pos());
    assert_eq!(p.parse("ab\ncd").unwrap(), Position::new(1, 4));
}

#[test]
fn newline_aware_positions() {
    let config = Config::for_chars();
    let p = prefix(repeated(any(), 3), current_pos());
    // After "ab\n" the cursor sits at the start of line 2.
    assert_eq!(p.parse_with("ab\ncd", &config).unwrap(), Position::new(2, 1));

    let p = prefix(repeated(any(), 4), current_pos());
    assert_eq!(p.parse_with("ab\ncd", &config).unwrap(), Position::new(2, 2));
}

#[test]
fn pos_delta_reflects_lines_crossed() {
    let config = Config::for_chars();
    let p = prefix(repeated(any(), 4), current_pos_delta());
    assert_eq!(
        p.parse_with("a\n\nb", &config).unwrap(),
        PosDelta::new(2, 1)
    );
}

#[test]
fn error_positions_use_the_configured_calculator() {
    let config = Config::for_chars();
    let p = prefix(repeated(any(), 3), token('x'));
    let err = p.parse_with("ab\ncd", &config).unwrap_err();
    assert_eq!(err.unexpected(), Some(&'c'));
    assert_eq!(err.position(), Position::new(2, 1));
}

#[test]
fn error_position_survives_backtracking_regions() {
    // The failure happens inside a bookmarked region that gets rewound;
    // the final error is reported where the last failure occurred.
    use descent::combinator::attempt;

    let config = Config::for_chars();
    let p = attempt(string("a\nbX")).or(string("a\nbY"));
    let err = p.parse_with("a\nbZ", &config).unwrap_err();
    assert_eq!(err.unexpected(), Some(&'Z'));
    assert_eq!(err.position(), Position::new(2, 2));
}

#[test]
fn custom_position_calculator() {
    // Tab expansion: a tab advances to the next multiple of four.
    let config = Config::new().with_pos_calc(|c: &char| {
        if *c == '\t' {
            PosDelta::new(0, 4)
        } else {
            PosDelta::ONE_COL
        }
    });
    let p = prefix(repeated(any(), 2), current_pos());
    assert_eq!(p.parse_with("\ta", &config).unwrap(), Position::new(1, 6));
}
