//! `@skip`/`@include` conditions as a small boolean algebra.
//!
//! Conditions are kept canonical: operands of `And`/`Or` live in ordered sets, `not` is pushed
//! down to the variables, and [`BooleanExpression::simplify`] flattens, absorbs and collapses
//! until the expression is stable. Two structurally equal conditions therefore compare equal no
//! matter the order they were declared in.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::Value;
use serde::Serialize;

use crate::error::IrError;

pub(crate) const SKIP_DIRECTIVE: &str = "skip";
pub(crate) const INCLUDE_DIRECTIVE: &str = "include";
const IF_ARGUMENT: &str = "if";

#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BooleanExpression {
    #[default]
    True,
    False,
    /// The value of a boolean variable, negated when `inverted` (as `@skip(if: $var)` is).
    Variable { name: Name, inverted: bool },
    And(BTreeSet<BooleanExpression>),
    Or(BTreeSet<BooleanExpression>),
}

impl BooleanExpression {
    pub fn variable(name: Name) -> Self {
        Self::Variable {
            name,
            inverted: false,
        }
    }

    /// Builds the condition under which a selection carrying these directives is included.
    ///
    /// Every `@skip`/`@include` directive contributes one condition and the result is their
    /// conjunction. Declaring the same condition twice (`@skip(if: $a) @skip(if: $a)`) is an
    /// error, while `@skip(if: $a) @include(if: $a)` is legal (and always false).
    ///
    /// `selection` names the field or fragment carrying the directives, for error messages.
    pub fn from_directives(directives: &DirectiveList, selection: &str) -> Result<Self, IrError> {
        let mut conditions: Vec<BooleanExpression> = Vec::new();
        for directive in directives.iter() {
            let inverted = match directive.name.as_str() {
                SKIP_DIRECTIVE => true,
                INCLUDE_DIRECTIVE => false,
                _ => continue,
            };
            let value = directive
                .arguments
                .iter()
                .find(|argument| argument.name == IF_ARGUMENT)
                .map(|argument| &argument.value)
                .ok_or_else(|| IrError::InvalidDirectiveArgument {
                    directive: directive.name.clone(),
                    value: "nothing".to_string(),
                })?;
            let condition = match &**value {
                // `@include(if: true)` and `@skip(if: false)` always select
                Value::Boolean(value) if *value != inverted => Self::True,
                Value::Boolean(_) => Self::False,
                Value::Variable(name) => Self::Variable {
                    name: name.clone(),
                    inverted,
                },
                _ => {
                    return Err(IrError::InvalidDirectiveArgument {
                        directive: directive.name.clone(),
                        value: value.to_string(),
                    });
                }
            };
            if conditions.contains(&condition) {
                return Err(IrError::DuplicateCondition {
                    selection: selection.to_string(),
                    condition: condition.to_string(),
                });
            }
            conditions.push(condition);
        }
        Ok(Self::And(conditions.into_iter().collect()).simplify())
    }

    pub fn and(self, other: Self) -> Self {
        Self::And(BTreeSet::from([self, other])).simplify()
    }

    pub fn or(self, other: Self) -> Self {
        Self::Or(BTreeSet::from([self, other])).simplify()
    }

    /// Negation, pushed down to the variables.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        self.negated().simplify()
    }

    fn negated(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Variable { name, inverted } => Self::Variable {
                name,
                inverted: !inverted,
            },
            Self::And(operands) => Self::Or(operands.into_iter().map(Self::negated).collect()),
            Self::Or(operands) => Self::And(operands.into_iter().map(Self::negated).collect()),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Self::False)
    }

    /// Returns the canonical form of this expression. Simplifying twice is the same as
    /// simplifying once.
    pub fn simplify(self) -> Self {
        match self {
            Self::True | Self::False | Self::Variable { .. } => self,
            Self::And(operands) => simplify_operands(operands, Junction::And),
            Self::Or(operands) => simplify_operands(operands, Junction::Or),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Junction {
    And,
    Or,
}

impl Junction {
    /// The operand that has no effect (`True` for `And`).
    fn identity(self) -> BooleanExpression {
        match self {
            Self::And => BooleanExpression::True,
            Self::Or => BooleanExpression::False,
        }
    }

    /// The operand that decides the result on its own (`False` for `And`).
    fn annihilator(self) -> BooleanExpression {
        match self {
            Self::And => BooleanExpression::False,
            Self::Or => BooleanExpression::True,
        }
    }

    fn wrap(self, operands: BTreeSet<BooleanExpression>) -> BooleanExpression {
        match self {
            Self::And => BooleanExpression::And(operands),
            Self::Or => BooleanExpression::Or(operands),
        }
    }

    /// The operands of `expression` if it is a junction of the other kind.
    fn dual_operands(self, expression: &BooleanExpression) -> Option<&BTreeSet<BooleanExpression>> {
        match (self, expression) {
            (Self::And, BooleanExpression::Or(operands)) => Some(operands),
            (Self::Or, BooleanExpression::And(operands)) => Some(operands),
            _ => None,
        }
    }

    fn same_operands(self, expression: BooleanExpression) -> Result<BTreeSet<BooleanExpression>, BooleanExpression> {
        match (self, expression) {
            (Self::And, BooleanExpression::And(operands)) => Ok(operands),
            (Self::Or, BooleanExpression::Or(operands)) => Ok(operands),
            (_, other) => Err(other),
        }
    }
}

fn simplify_operands(
    operands: BTreeSet<BooleanExpression>,
    junction: Junction,
) -> BooleanExpression {
    let identity = junction.identity();
    let annihilator = junction.annihilator();

    let mut flattened = BTreeSet::new();
    for operand in operands {
        let operand = operand.simplify();
        if operand == annihilator {
            return annihilator;
        }
        if operand == identity {
            continue;
        }
        match junction.same_operands(operand) {
            Ok(nested) => flattened.extend(nested),
            Err(operand) => {
                flattened.insert(operand);
            }
        }
    }

    // `$a && !$a` is false, `$a || !$a` is true
    let complemented = flattened.iter().any(|operand| {
        matches!(operand, BooleanExpression::Variable { .. })
            && flattened.contains(&operand.clone().negated())
    });
    if complemented {
        return annihilator;
    }

    // Absorption: `$a || ($a && $b)` is `$a`, `$a && ($a || $b)` is `$a`
    let absorbed: Vec<BooleanExpression> = flattened
        .iter()
        .filter(|operand| {
            let Some(inner) = junction.dual_operands(operand) else {
                return false;
            };
            flattened.iter().any(|other| {
                other != *operand
                    && match junction.dual_operands(other) {
                        Some(other_inner) => other_inner.is_subset(inner),
                        None => inner.contains(other),
                    }
            })
        })
        .cloned()
        .collect();
    for operand in &absorbed {
        flattened.remove(operand);
    }

    let mut remaining = flattened.into_iter();
    match (remaining.next(), remaining.next()) {
        (None, _) => identity,
        (Some(single), None) => single,
        (Some(first), Some(second)) => {
            let mut operands: BTreeSet<BooleanExpression> = remaining.collect();
            operands.insert(first);
            operands.insert(second);
            junction.wrap(operands)
        }
    }
}

impl Display for BooleanExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn write_junction(
            f: &mut Formatter<'_>,
            operands: &BTreeSet<BooleanExpression>,
            separator: &str,
        ) -> std::fmt::Result {
            write!(f, "(")?;
            for (index, operand) in operands.iter().enumerate() {
                if index > 0 {
                    write!(f, " {separator} ")?;
                }
                write!(f, "{operand}")?;
            }
            write!(f, ")")
        }

        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Variable {
                name,
                inverted: false,
            } => write!(f, "${name}"),
            Self::Variable {
                name,
                inverted: true,
            } => write!(f, "!${name}"),
            Self::And(operands) => write_junction(f, operands, "&&"),
            Self::Or(operands) => write_junction(f, operands, "||"),
        }
    }
}
