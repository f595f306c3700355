use descent::combinator::{end, satisfy, string, suffix, token};
use descent::expr::{binary, expression, unary, OperatorRow};
use descent::Parser;

fn digit() -> impl Parser<char, Output = i64> {
    satisfy(|c: &char| c.is_ascii_digit()).map(|c| c as i64 - '0' as i64)
}

fn digit_text() -> impl Parser<char, Output = String> {
    satisfy(|c: &char| c.is_ascii_digit()).map(|c| c.to_string())
}

#[test]
fn precedence_orders_rows_low_to_high() {
    let table = vec![
        OperatorRow::new().infix_l(token('+').with_value(binary(|x, y| x + y))),
        OperatorRow::new().infix_l(token('*').with_value(binary(|x, y| x * y))),
    ];
    let arith = expression(digit(), table);

    assert_eq!(arith.parse("2+3*4").unwrap(), 14);
    assert_eq!(arith.parse("2*3+4").unwrap(), 10);
    assert_eq!(arith.parse("1+2+3").unwrap(), 6);
    assert_eq!(arith.parse("7").unwrap(), 7);
}

#[test]
fn left_and_right_associativity_group_differently() {
    let left = expression(
        digit(),
        vec![OperatorRow::new().infix_l(token('-').with_value(binary(|x, y| x - y)))],
    );
    let right = expression(
        digit(),
        vec![OperatorRow::new().infix_r(token('-').with_value(binary(|x, y| x - y)))],
    );

    assert_eq!(left.parse("8-3-2").unwrap(), 3); // (8-3)-2
    assert_eq!(right.parse("8-3-2").unwrap(), 7); // 8-(3-2)
}

#[test]
fn associativity_is_observable_through_concatenation() {
    let glue = |x: String, y: String| format!("({x}{y})");
    let left = expression(
        digit_text(),
        vec![OperatorRow::new().infix_l(token('.').with_value(binary(glue)))],
    );
    let right = expression(
        digit_text(),
        vec![OperatorRow::new().infix_r(token('.').with_value(binary(glue)))],
    );

    assert_eq!(left.parse("1.2.3").unwrap(), "((12)3)");
    assert_eq!(right.parse("1.2.3").unwrap(), "(1(23))");
}

#[test]
fn non_associative_operators_accept_one_use() {
    let table = vec![OperatorRow::new().infix_n(string("==").with_value(binary(|x, y| {
        if x == y {
            1
        } else {
            0
        }
    })))];
    let cmp = suffix(expression(digit(), table), end());

    assert_eq!(cmp.parse("3==3").unwrap(), 1);
    assert_eq!(cmp.parse("3==4").unwrap(), 0);
    assert_eq!(cmp.parse("5").unwrap(), 5);
    // A second occurrence at the same level has nowhere to go.
    assert!(cmp.parse("3==3==3").is_err());
}

#[test]
fn prefix_and_postfix_operators() {
    let table = vec![
        OperatorRow::new().infix_l(token('+').with_value(binary(|x, y| x + y))),
        OperatorRow::new()
            .prefix(token('-').with_value(unary(|x: i64| -x)))
            .postfix(token('!').with_value(unary(|x: i64| x * 10))),
    ];
    let arith = expression(digit(), table);

    assert_eq!(arith.parse("-5").unwrap(), -5);
    assert_eq!(arith.parse("5!").unwrap(), 50);
    assert_eq!(arith.parse("-5!").unwrap(), -50);
    assert_eq!(arith.parse("-5+3").unwrap(), -2);
}

#[test]
fn chainable_prefix_folds_innermost_first() {
    let table = vec![OperatorRow::new()
        .prefix_chainable(token('-').with_value(unary(|x: i64| -x)))];
    let arith = expression(digit(), table);

    assert_eq!(arith.parse("3").unwrap(), 3);
    assert_eq!(arith.parse("-3").unwrap(), -3);
    assert_eq!(arith.parse("--3").unwrap(), 3);
    assert_eq!(arith.parse("---3").unwrap(), -3);
}

#[test]
fn chainable_postfix_folds_left_to_right() {
    let table = vec![OperatorRow::new()
        .postfix_chainable(token('?').with_value(unary(|x: i64| x * 2 + 1)))];
    let arith = expression(digit(), table);

    assert_eq!(arith.parse("3?").unwrap(), 7);
    assert_eq!(arith.parse("3??").unwrap(), 15); // (3? = 7)? = 15
}

#[test]
fn operators_in_a_bucket_try_in_declaration_order() {
    let table = vec![OperatorRow::new()
        .infix_l(token('+').with_value(binary(|x, y| x + y)))
        .infix_l(token('-').with_value(binary(|x, y| x - y)))];
    let arith = expression(digit(), table);

    assert_eq!(arith.parse("9-2+1").unwrap(), 8);
}

#[test]
fn failed_operand_after_operator_commits() {
    let table = vec![OperatorRow::new().infix_l(token('+').with_value(binary(|x, y| x + y)))];
    let arith = expression(digit(), table);

    // The '+' is consumed, so the missing right operand is a hard error.
    let err = arith.parse("1+x").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'x'));
    assert_eq!(err.position().col, 3);
}

#[test]
fn parenthesized_terms_via_recursion() {
    use descent::combinator::{delimited, rec};
    use descent::BoxParser;

    fn arith() -> BoxParser<char, i64> {
        let term = digit().or(delimited(token('('), rec(arith), token(')')));
        expression(
            term,
            vec![
                OperatorRow::new().infix_l(token('+').with_value(binary(|x, y| x + y))),
                OperatorRow::new().infix_l(token('*').with_value(binary(|x, y| x * y))),
            ],
        )
        .boxed()
    }

    assert_eq!(arith().parse("(2+3)*4").unwrap(), 20);
    assert_eq!(arith().parse("2+3*4").unwrap(), 14);
}
