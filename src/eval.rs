use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::scan::Cursor;

/// The expression reduced to the not-a-number sentinel.
#[derive(Error, Debug, Diagnostic)]
#[error("expression has no defined value")]
#[diagnostic(help(
    "check for missing operands, malformed numbers, or unbalanced parentheses"
))]
pub struct UndefinedExpressionError {
    #[source_code]
    src: NamedSource<String>,

    #[label("evaluation stopped here")]
    bad_bit: SourceSpan,
}

impl UndefinedExpressionError {
    pub(crate) fn build(input: &str, stopped_at: usize) -> Self {
        let end = stopped_at.min(input.len());
        UndefinedExpressionError {
            src: NamedSource::new("<input>", input.to_string()),
            bad_bit: SourceSpan::from(end.saturating_sub(1)..end),
        }
    }
}

const NUMERIC: &[char] = &['0', '.', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
const SIGNS: &[char] = &['+', '-'];
const SPACE: &[char] = &[' '];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Plus),
            '-' => Some(Operator::Minus),
            '*' => Some(Operator::Star),
            '/' => Some(Operator::Slash),
            '%' => Some(Operator::Percent),
            '^' => Some(Operator::Caret),
            _ => None,
        }
    }

    /// Additive 0, multiplicative 1, power 2. Higher tiers contract first.
    fn precedence(self) -> u8 {
        match self {
            Operator::Plus | Operator::Minus => 0,
            Operator::Star | Operator::Slash | Operator::Percent => 1,
            Operator::Caret => 2,
        }
    }
}

/// A single operand. Holds `None` until the operand has a usable value; a
/// parenthesized group that never resolves (e.g. `()`) stays `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    value: Option<f64>,
}

impl Term {
    fn literal(value: f64) -> Self {
        Term { value: Some(value) }
    }
}

/// One reduction step: an operator and its term, applied against a running
/// value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorTerm {
    operator: Operator,
    term: Term,
}

impl OperatorTerm {
    fn apply(&self, v: f64) -> f64 {
        let Some(b) = self.term.value else {
            return f64::NAN;
        };
        match self.operator {
            Operator::Plus => v + b,
            Operator::Minus => v - b,
            Operator::Star => v * b,
            Operator::Slash => v / b,
            Operator::Percent => v % b,
            Operator::Caret => v.powf(b),
        }
    }
}

/// A flat sequence of operator/term pairs in textual order, reduced to a
/// single value by precedence-ordered contraction. No parse tree is built;
/// a parenthesized group is evaluated by a child node driving the same
/// cursor, so the scan position advances across the whole input as nesting
/// recurses and returns.
#[derive(Debug, Default)]
pub struct ExpressionNode {
    terms: Vec<OperatorTerm>,
    value: Option<f64>,
    closes_group: bool,
}

impl ExpressionNode {
    pub fn new() -> Self {
        ExpressionNode::default()
    }

    fn group() -> Self {
        ExpressionNode {
            closes_group: true,
            ..ExpressionNode::default()
        }
    }

    /// The resolved value, if reduction succeeded.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Scans this node's scope of the input and reduces it to a single
    /// value. NaN is the uniform result for malformed or empty input.
    pub fn eval(&mut self, cursor: &mut Cursor<'_>) -> f64 {
        self.scan(cursor);
        self.value = self.reduce();
        self.value.unwrap_or(f64::NAN)
    }

    fn scan(&mut self, cursor: &mut Cursor<'_>) {
        while cursor.has_more() {
            cursor.consume_while(SPACE);
            if cursor.peek(&['(']) {
                cursor.advance(1);
                self.terms.push(OperatorTerm {
                    operator: Operator::Plus,
                    term: Self::grouped_term(cursor),
                });
            } else if let Some(operator) = cursor.next_char().and_then(Operator::from_char) {
                cursor.advance(1);
                cursor.consume_while(SPACE);
                let term = if cursor.peek(&['(']) {
                    cursor.advance(1);
                    Self::grouped_term(cursor)
                } else {
                    Term::literal(read_number(cursor))
                };
                self.terms.push(OperatorTerm { operator, term });
            } else if cursor.peek(NUMERIC) {
                // leading unsigned term
                self.terms.push(OperatorTerm {
                    operator: Operator::Plus,
                    term: Term::literal(read_number(cursor)),
                });
            } else if cursor.peek(&[')']) && self.closes_group {
                cursor.advance(1);
                break;
            } else {
                // stall: no recognizable token; the rest stays unconsumed
                break;
            }
        }
    }

    fn grouped_term(cursor: &mut Cursor<'_>) -> Term {
        let mut child = ExpressionNode::group();
        child.eval(cursor);
        Term { value: child.value }
    }

    fn reduce(&mut self) -> Option<f64> {
        if self.terms.is_empty() {
            return None;
        }

        // absorb a leading unary minus into the literal rather than
        // subtracting it from an implicit 0
        let first = &mut self.terms[0];
        if first.operator == Operator::Minus {
            first.operator = Operator::Plus;
            first.term.value = Some(first.term.value.unwrap_or(f64::NAN) * -1.0);
        }

        if self.terms.len() == 1 {
            let only = self.terms[0];
            let value = only.term.value?;
            return Some(if only.operator == Operator::Minus {
                -value
            } else {
                value
            });
        }
        if self.terms.len() == 2 {
            return Some(self.terms[1].apply(self.terms[0].apply(0.0)));
        }

        // a leading term must bind additively
        if self.terms[0].operator.precedence() > 0 {
            return None;
        }

        let mut terms = std::mem::take(&mut self.terms);
        while terms.len() > 1 {
            let mut highest = terms[0].operator;
            for term in &terms[1..] {
                if term.operator.precedence() > highest.precedence() {
                    highest = term.operator;
                }
            }
            if highest.precedence() == 0 {
                // additive-only: fold left starting from 0
                return Some(terms.iter().fold(0.0, |sum, term| term.apply(sum)));
            }
            let mut contracted: Vec<OperatorTerm> = Vec::with_capacity(terms.len());
            for term in terms {
                if term.operator == highest {
                    let Some(prev) = contracted.last_mut() else {
                        return None;
                    };
                    prev.term.value = Some(term.apply(prev.term.value.unwrap_or(f64::NAN)));
                } else {
                    contracted.push(term);
                }
            }
            terms = contracted;
        }
        Some(terms[0].apply(0.0))
    }
}

/// Reads a signed numeric literal at the cursor. The sign run is consumed
/// greedily; only a leading `-` negates. An empty or malformed digit run
/// parses to NaN.
fn read_number(cursor: &mut Cursor<'_>) -> f64 {
    let negative = cursor.peek(&['-']);
    cursor.consume_while(SIGNS);
    let literal = cursor.consume_while(NUMERIC);
    let number: f64 = literal.parse().unwrap_or(f64::NAN);
    if negative { -number } else { number }
}

#[cfg(test)]
mod tests {
    use crate::{Cursor, ExpressionNode, evaluate, try_evaluate};

    #[test]
    fn simple() {
        assert_eq!(evaluate("0"), 0.0);
        assert_eq!(evaluate("1"), 1.0);
        assert_eq!(evaluate("+1"), 1.0);
        assert_eq!(evaluate("-1"), -1.0);
        assert_eq!(evaluate("0.07"), 0.07);
        assert_eq!(evaluate("-1+1"), 0.0);
        assert_eq!(evaluate("-1-2"), -3.0);
        assert_eq!(evaluate("123+246"), 369.0);
    }

    #[test]
    fn plain_digits_parse_as_decimal() {
        for input in ["0", "7", "42", "1234567890", "3.25", ".5"] {
            assert_eq!(evaluate(input), input.parse::<f64>().unwrap(), "{input}");
        }
    }

    #[test]
    fn nesting() {
        assert_eq!(evaluate("(1+2)*3"), 9.0);
        assert_eq!(evaluate("1+(2*3)"), 7.0);
        assert_eq!(evaluate("(77)"), 77.0);
        assert_eq!(evaluate("-(77)"), -77.0);
        assert_eq!(evaluate("-(((77)))"), -77.0);
        assert_eq!(evaluate("-(-((77)))"), 77.0);
        assert_eq!(evaluate("-(-(-(77)))"), -77.0);
        assert_eq!(evaluate("1+(1 +(1+(1)))"), 4.0);
        assert_eq!(evaluate("5^(1+1)"), 25.0);
        assert_eq!(evaluate("(1+2+3)*2"), 12.0);
    }

    #[test]
    fn operators() {
        assert_eq!(evaluate("5+2"), 7.0);
        assert_eq!(evaluate("5-2"), 3.0);
        assert_eq!(evaluate("2-5"), -3.0);
        assert_eq!(evaluate("5*2"), 10.0);
        assert_eq!(evaluate("5%2"), 1.0);
        assert_eq!(evaluate("2%5"), 2.0);
        assert_eq!(evaluate("5/2"), 2.5);
        assert_eq!(evaluate("2/5"), 0.4);
        assert_eq!(evaluate("5^2"), 25.0);
        assert_eq!(evaluate("2^5"), 32.0);
        assert_eq!(evaluate("2*-2"), -4.0);
        assert_eq!(evaluate("-2*-2"), 4.0);
    }

    #[test]
    fn precedence() {
        assert_eq!(evaluate("1+1+1+1+1"), 5.0);
        assert_eq!(evaluate("-1+1-1+1-1"), -1.0);
        assert_eq!(evaluate("1+2*3"), 7.0);
        assert_eq!(evaluate("1*2+3"), 5.0);
        assert_eq!(evaluate("1+2*2^3"), 17.0);
        assert_eq!(evaluate("1^2+2*3"), 7.0);
        assert_eq!(evaluate("1+2^2*3"), 13.0);
        assert_eq!(evaluate("1*2*2*3"), 12.0);
        assert_eq!(evaluate("1/2/2"), 0.25);
    }

    #[test]
    fn division_follows_ieee() {
        assert_eq!(evaluate("1/0"), f64::INFINITY);
        assert_eq!(evaluate("-1/0"), f64::NEG_INFINITY);
        assert!(evaluate("0/0").is_nan());
    }

    #[test]
    fn fold_starts_from_zero() {
        // one- and two-term sequences fold from an implicit 0 whatever the
        // leading operator; 3+-term sequences demand an additive lead
        assert_eq!(evaluate("*5"), 5.0);
        assert_eq!(evaluate("*5+2"), 2.0);
        assert!(evaluate("*5+2*2").is_nan());
    }

    #[test]
    fn undefined_inputs() {
        assert!(evaluate("").is_nan());
        assert!(evaluate("   ").is_nan());
        assert!(evaluate("abc").is_nan());
        assert!(evaluate("()").is_nan());
        assert!(evaluate("(").is_nan());
        assert!(evaluate("1+").is_nan());
        assert!(evaluate("%").is_nan());
        assert!(evaluate("1..2+1").is_nan());
    }

    #[test]
    fn whitespace_between_tokens() {
        assert_eq!(evaluate(" 1 + 2 "), 3.0);
        assert_eq!(evaluate("5 ^ ( 1 + 1 )"), 25.0);
    }

    #[test]
    fn unterminated_group_is_permissive() {
        // a group that never sees its `)` yields whatever was scanned
        assert_eq!(evaluate("(1+2"), 3.0);
    }

    #[test]
    fn trailing_garbage_is_ignored() {
        // scanning stalls at the unrecognized token; the prefix reduces
        assert_eq!(evaluate("1+2 three"), 3.0);
    }

    #[test]
    fn idempotent() {
        assert_eq!(evaluate("1+2*3"), evaluate("1+2*3"));
        assert_eq!(evaluate("-(-((77)))"), evaluate("-(-((77)))"));
    }

    #[test]
    fn shared_cursor_advances_across_nesting() {
        let mut cursor = Cursor::new("(1+2)*3");
        let mut node = ExpressionNode::new();
        assert_eq!(node.eval(&mut cursor), 9.0);
        assert_eq!(node.value(), Some(9.0));
        assert!(!cursor.has_more());
    }

    #[test]
    fn try_evaluate_splits_defined_from_undefined() {
        assert_eq!(try_evaluate("1+2*3").unwrap(), 7.0);
        assert!(try_evaluate("").is_err());
        assert!(try_evaluate("%").is_err());
        assert!(try_evaluate("0/0").is_err());
    }
}
