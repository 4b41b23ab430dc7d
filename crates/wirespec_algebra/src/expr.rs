//! The expression tree.
//!
//! [`Expr`] is a closed sum over every term shape a specification can
//! contain: literals, names, attributes, arithmetic, logical and relational
//! operators, and the control forms (`if`, `case`, quantifiers,
//! comprehensions, aggregates, bindings). Every variant has an explicit
//! printable label and a canonical string form.
//!
//! Equality and hashing are structural via the canonical form; source
//! locations and the display base of numbers never affect them. Trees are
//! immutable after construction: [`Expr::simplified`](crate::simplify),
//! [`Expr::substituted`] and [`Expr::negated`] build new trees.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::discriminant;

use wirespec_base::{Identifier, Location};

/// Operator binding strength, used to parenthesise printed subterms.
///
/// A child whose precedence is less than or equal to its parent's is printed
/// in parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Undefined,
    BooleanOperator,
    RelationalOperator,
    BinaryAddingOperator,
    UnaryAddingOperator,
    MultiplyingOperator,
    HighestPrecedenceOperator,
    Literal,
}

/// Misuse of the expression algebra.
///
/// These are programmer errors, not specification defects: they indicate
/// that an operation was applied to a term shape it is not defined for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgebraError {
    /// `substituted` was called with both or neither of its arguments.
    InvalidSubstitution,
    /// `negated` was called on a term without a meaningful negation.
    NegationUndefined {
        /// Printable label of the offending variant.
        label: &'static str,
    },
}

impl fmt::Display for AlgebraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgebraError::InvalidSubstitution => {
                write!(f, "exactly one of function and mapping must be given")
            }
            AlgebraError::NegationUndefined { label } => {
                write!(f, "negation undefined for {label}")
            }
        }
    }
}

impl std::error::Error for AlgebraError {}

/// Associative n-ary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocOp {
    Add,
    Mul,
    And,
    AndThen,
    Or,
    OrElse,
}

impl AssocOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            AssocOp::Add => " + ",
            AssocOp::Mul => " * ",
            AssocOp::And => " and ",
            AssocOp::AndThen => " and then ",
            AssocOp::Or => " or ",
            AssocOp::OrElse => " or else ",
        }
    }

    pub(crate) fn neutral(self) -> i64 {
        match self {
            AssocOp::Add => 0,
            AssocOp::Mul | AssocOp::And | AssocOp::AndThen => 1,
            AssocOp::Or | AssocOp::OrElse => 0,
        }
    }

    pub(crate) fn apply(self, left: i64, right: i64) -> i64 {
        match self {
            AssocOp::Add => left.wrapping_add(right),
            AssocOp::Mul => left.wrapping_mul(right),
            AssocOp::And | AssocOp::AndThen => i64::from(left != 0 && right != 0),
            AssocOp::Or | AssocOp::OrElse => i64::from(left != 0 || right != 0),
        }
    }

    /// Whether the operator combines truth values.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            AssocOp::And | AssocOp::AndThen | AssocOp::Or | AssocOp::OrElse
        )
    }

    fn precedence(self) -> Precedence {
        match self {
            AssocOp::Add => Precedence::BinaryAddingOperator,
            AssocOp::Mul => Precedence::MultiplyingOperator,
            _ => Precedence::BooleanOperator,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AssocOp::Add => "Add",
            AssocOp::Mul => "Mul",
            AssocOp::And => "And",
            AssocOp::AndThen => "AndThen",
            AssocOp::Or => "Or",
            AssocOp::OrElse => "OrElse",
        }
    }

    /// The dual operator under De Morgan negation.
    pub(crate) fn dual(self) -> Option<AssocOp> {
        match self {
            AssocOp::And => Some(AssocOp::Or),
            AssocOp::AndThen => Some(AssocOp::OrElse),
            AssocOp::Or => Some(AssocOp::And),
            AssocOp::OrElse => Some(AssocOp::AndThen),
            _ => None,
        }
    }
}

/// Binary, non-associative arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Sub,
    Div,
    Pow,
    Mod,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Sub => " - ",
            BinaryOp::Div => " / ",
            BinaryOp::Pow => "**",
            BinaryOp::Mod => " mod ",
        }
    }

    fn precedence(self) -> Precedence {
        match self {
            BinaryOp::Sub => Precedence::BinaryAddingOperator,
            BinaryOp::Div | BinaryOp::Mod => Precedence::MultiplyingOperator,
            BinaryOp::Pow => Precedence::HighestPrecedenceOperator,
        }
    }

    fn label(self) -> &'static str {
        match self {
            BinaryOp::Sub => "Sub",
            BinaryOp::Div => "Div",
            BinaryOp::Pow => "Pow",
            BinaryOp::Mod => "Mod",
        }
    }
}

/// Relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    NotEqual,
    In,
    NotIn,
}

impl RelOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            RelOp::Less => " < ",
            RelOp::LessEqual => " <= ",
            RelOp::Equal => " = ",
            RelOp::GreaterEqual => " >= ",
            RelOp::Greater => " > ",
            RelOp::NotEqual => " /= ",
            RelOp::In => " in ",
            RelOp::NotIn => " not in ",
        }
    }

    /// The logically inverse relation.
    pub(crate) fn inverse(self) -> RelOp {
        match self {
            RelOp::Less => RelOp::GreaterEqual,
            RelOp::LessEqual => RelOp::Greater,
            RelOp::Equal => RelOp::NotEqual,
            RelOp::GreaterEqual => RelOp::Less,
            RelOp::Greater => RelOp::LessEqual,
            RelOp::NotEqual => RelOp::Equal,
            RelOp::In => RelOp::NotIn,
            RelOp::NotIn => RelOp::In,
        }
    }

    /// Whether the relation is an order or (dis)equality on numbers.
    pub(crate) fn is_comparison(self) -> bool {
        !matches!(self, RelOp::In | RelOp::NotIn)
    }

    /// Whether `a op a` holds for every `a`.
    pub(crate) fn is_reflexive(self) -> bool {
        matches!(self, RelOp::Equal | RelOp::LessEqual | RelOp::GreaterEqual)
    }

    /// Decides the relation on two numbers, when it is a comparison.
    pub(crate) fn decide(self, left: i64, right: i64) -> Option<bool> {
        match self {
            RelOp::Less => Some(left < right),
            RelOp::LessEqual => Some(left <= right),
            RelOp::Equal => Some(left == right),
            RelOp::GreaterEqual => Some(left >= right),
            RelOp::Greater => Some(left > right),
            RelOp::NotEqual => Some(left != right),
            RelOp::In | RelOp::NotIn => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RelOp::Less => "Less",
            RelOp::LessEqual => "LessEqual",
            RelOp::Equal => "Equal",
            RelOp::GreaterEqual => "GreaterEqual",
            RelOp::Greater => "Greater",
            RelOp::NotEqual => "NotEqual",
            RelOp::In => "In",
            RelOp::NotIn => "NotIn",
        }
    }
}

/// Attributes of a prefix, without an explicit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Size,
    Length,
    First,
    Last,
    Range,
    Old,
    Result,
    Constrained,
    ValidChecksum,
    Valid,
    Present,
    Head,
    Opaque,
}

impl AttrKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            AttrKind::Size => "Size",
            AttrKind::Length => "Length",
            AttrKind::First => "First",
            AttrKind::Last => "Last",
            AttrKind::Range => "Range",
            AttrKind::Old => "Old",
            AttrKind::Result => "Result",
            AttrKind::Constrained => "Constrained",
            AttrKind::ValidChecksum => "Valid_Checksum",
            AttrKind::Valid => "Valid",
            AttrKind::Present => "Present",
            AttrKind::Head => "Head",
            AttrKind::Opaque => "Opaque",
        }
    }

    /// Whether the attribute denotes a truth value.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            AttrKind::ValidChecksum | AttrKind::Valid | AttrKind::Present | AttrKind::Constrained
        )
    }
}

/// Attributes taking an explicit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrExprKind {
    Val,
    Pos,
}

impl AttrExprKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            AttrExprKind::Val => "Val",
            AttrExprKind::Pos => "Pos",
        }
    }
}

/// Quantified-expression forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    ForAllOf,
    ForAllIn,
    ForSomeIn,
}

impl Quantifier {
    fn word(self) -> &'static str {
        match self {
            Quantifier::ForAllOf | Quantifier::ForAllIn => "all",
            Quantifier::ForSomeIn => "some",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Quantifier::ForAllOf => "of",
            Quantifier::ForAllIn | Quantifier::ForSomeIn => "in",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Quantifier::ForAllOf => "ForAllOf",
            Quantifier::ForAllIn => "ForAllIn",
            Quantifier::ForSomeIn => "ForSomeIn",
        }
    }
}

/// A named variable occurrence.
///
/// `negative` records an attached unary minus; `immutable` makes the
/// variable opaque to substitution.
#[derive(Debug, Clone)]
pub struct Variable {
    pub identifier: Identifier,
    pub negative: bool,
    pub immutable: bool,
}

impl Variable {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            negative: false,
            immutable: false,
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.negative == other.negative && self.identifier == other.identifier
    }
}

impl Eq for Variable {}

/// A substitution mapping from name-shaped terms to replacements.
pub type Mapping = HashMap<Expr, Expr>;

/// The term shapes of the algebra.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Numeric literal with a display base (0 = plain decimal).
    Number { value: i64, base: u8 },
    True,
    False,
    /// String literal; semantically a byte aggregate.
    Str(String),
    Aggregate(Vec<Expr>),
    NamedAggregate(Vec<(Identifier, Expr)>),
    Variable(Variable),
    Selected {
        prefix: Box<Expr>,
        selector: Identifier,
        negative: bool,
        immutable: bool,
    },
    Call {
        name: Identifier,
        args: Vec<Expr>,
        negative: bool,
        immutable: bool,
    },
    Indexed {
        prefix: Box<Expr>,
        elements: Vec<Expr>,
        negative: bool,
    },
    Slice {
        prefix: Box<Expr>,
        first: Box<Expr>,
        last: Box<Expr>,
    },
    Undefined,
    Attribute {
        kind: AttrKind,
        prefix: Box<Expr>,
        negative: bool,
    },
    AttributeExpr {
        kind: AttrExprKind,
        prefix: Box<Expr>,
        argument: Box<Expr>,
        negative: bool,
    },
    Assoc {
        op: AssocOp,
        terms: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Relation {
        op: RelOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        branches: Vec<(Expr, Expr)>,
        else_branch: Option<Box<Expr>>,
    },
    Case {
        scrutinee: Box<Expr>,
        arms: Vec<(Expr, Expr)>,
    },
    Quantified {
        quantifier: Quantifier,
        parameter: Identifier,
        iterable: Box<Expr>,
        predicate: Box<Expr>,
    },
    ValueRange {
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    Conversion {
        name: Identifier,
        argument: Box<Expr>,
    },
    Comprehension {
        iterator: Identifier,
        array: Box<Expr>,
        selector: Box<Expr>,
        condition: Box<Expr>,
    },
    MessageAggregate {
        name: Identifier,
        fields: Vec<(Identifier, Expr)>,
    },
    Binding {
        expr: Box<Expr>,
        bindings: Vec<(Identifier, Expr)>,
    },
}

/// An expression node: a term shape plus an optional source location.
///
/// The location is carried for diagnostics only and never affects equality,
/// hashing or the canonical string form.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Option<Location>,
}

impl Expr {
    fn from_kind(kind: ExprKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    // ---- Constructors ----

    /// A decimal number literal.
    pub fn number(value: i64) -> Self {
        Self::from_kind(ExprKind::Number { value, base: 0 })
    }

    /// A number literal with an explicit display base (2, 8, 10 or 16).
    pub fn number_with_base(value: i64, base: u8) -> Self {
        Self::from_kind(ExprKind::Number { value, base })
    }

    /// A boolean literal.
    pub fn boolean(value: bool) -> Self {
        Self::from_kind(if value { ExprKind::True } else { ExprKind::False })
    }

    /// A string literal.
    pub fn string(data: impl Into<String>) -> Self {
        Self::from_kind(ExprKind::Str(data.into()))
    }

    /// A positional aggregate `(e1, e2, ...)`.
    pub fn aggregate(elements: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Aggregate(elements))
    }

    /// A named aggregate `(n1 => e1, ...)`.
    pub fn named_aggregate(elements: Vec<(Identifier, Expr)>) -> Self {
        Self::from_kind(ExprKind::NamedAggregate(elements))
    }

    /// A variable reference.
    pub fn variable(identifier: Identifier) -> Self {
        Self::from_kind(ExprKind::Variable(Variable::new(identifier)))
    }

    /// A variable opaque to substitution.
    pub fn immutable_variable(identifier: Identifier) -> Self {
        Self::from_kind(ExprKind::Variable(Variable {
            identifier,
            negative: false,
            immutable: true,
        }))
    }

    /// A component selection `prefix.field`.
    pub fn selected(prefix: Expr, selector: Identifier) -> Self {
        Self::from_kind(ExprKind::Selected {
            prefix: Box::new(prefix),
            selector,
            negative: false,
            immutable: false,
        })
    }

    /// A call `name (args...)`.
    pub fn call(name: Identifier, args: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Call {
            name,
            args,
            negative: false,
            immutable: false,
        })
    }

    /// An indexed component `prefix (e1, e2)`.
    pub fn indexed(prefix: Expr, elements: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Indexed {
            prefix: Box::new(prefix),
            elements,
            negative: false,
        })
    }

    /// A slice `prefix (first .. last)`.
    pub fn slice(prefix: Expr, first: Expr, last: Expr) -> Self {
        Self::from_kind(ExprKind::Slice {
            prefix: Box::new(prefix),
            first: Box::new(first),
            last: Box::new(last),
        })
    }

    /// The undefined placeholder.
    pub fn undefined() -> Self {
        Self::from_kind(ExprKind::Undefined)
    }

    /// An attribute reference `prefix'Kind`.
    pub fn attribute(kind: AttrKind, prefix: Expr) -> Self {
        Self::from_kind(ExprKind::Attribute {
            kind,
            prefix: Box::new(prefix),
            negative: false,
        })
    }

    /// `name'First`.
    pub fn first(name: Identifier) -> Self {
        Self::attribute(AttrKind::First, Self::variable(name))
    }

    /// `name'Last`.
    pub fn last(name: Identifier) -> Self {
        Self::attribute(AttrKind::Last, Self::variable(name))
    }

    /// `name'Size`.
    pub fn size(name: Identifier) -> Self {
        Self::attribute(AttrKind::Size, Self::variable(name))
    }

    /// An attribute with an explicit argument `prefix'Kind (e)`.
    pub fn attribute_expr(kind: AttrExprKind, prefix: Expr, argument: Expr) -> Self {
        Self::from_kind(ExprKind::AttributeExpr {
            kind,
            prefix: Box::new(prefix),
            argument: Box::new(argument),
            negative: false,
        })
    }

    /// An n-ary sum.
    pub fn add(terms: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Assoc {
            op: AssocOp::Add,
            terms,
        })
    }

    /// An n-ary product.
    pub fn mul(terms: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Assoc {
            op: AssocOp::Mul,
            terms,
        })
    }

    /// An n-ary conjunction.
    pub fn and(terms: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Assoc {
            op: AssocOp::And,
            terms,
        })
    }

    /// A short-circuit conjunction.
    pub fn and_then(terms: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Assoc {
            op: AssocOp::AndThen,
            terms,
        })
    }

    /// An n-ary disjunction.
    pub fn or(terms: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Assoc {
            op: AssocOp::Or,
            terms,
        })
    }

    /// A short-circuit disjunction.
    pub fn or_else(terms: Vec<Expr>) -> Self {
        Self::from_kind(ExprKind::Assoc {
            op: AssocOp::OrElse,
            terms,
        })
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::from_kind(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `left - right`.
    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    /// Truncating integer division.
    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Div, left, right)
    }

    /// Exponentiation.
    pub fn pow(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Pow, left, right)
    }

    /// Modulo.
    pub fn modulo(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Mod, left, right)
    }

    /// Logical negation.
    pub fn not(expr: Expr) -> Self {
        Self::from_kind(ExprKind::Not(Box::new(expr)))
    }

    fn relation(op: RelOp, left: Expr, right: Expr) -> Self {
        Self::from_kind(ExprKind::Relation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn less(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::Less, left, right)
    }

    pub fn less_equal(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::LessEqual, left, right)
    }

    pub fn equal(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::Equal, left, right)
    }

    pub fn greater_equal(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::GreaterEqual, left, right)
    }

    pub fn greater(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::Greater, left, right)
    }

    pub fn not_equal(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::NotEqual, left, right)
    }

    /// Membership `left in right`.
    pub fn is_in(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::In, left, right)
    }

    /// Non-membership `left not in right`.
    pub fn not_in(left: Expr, right: Expr) -> Self {
        Self::relation(RelOp::NotIn, left, right)
    }

    /// Conditional expression with `(condition, value)` branches.
    pub fn if_expr(branches: Vec<(Expr, Expr)>, else_branch: Option<Expr>) -> Self {
        Self::from_kind(ExprKind::If {
            branches,
            else_branch: else_branch.map(Box::new),
        })
    }

    /// Case expression over a scrutinee.
    pub fn case(scrutinee: Expr, arms: Vec<(Expr, Expr)>) -> Self {
        Self::from_kind(ExprKind::Case {
            scrutinee: Box::new(scrutinee),
            arms,
        })
    }

    /// A quantified expression.
    pub fn quantified(
        quantifier: Quantifier,
        parameter: Identifier,
        iterable: Expr,
        predicate: Expr,
    ) -> Self {
        Self::from_kind(ExprKind::Quantified {
            quantifier,
            parameter,
            iterable: Box::new(iterable),
            predicate: Box::new(predicate),
        })
    }

    /// A range `lower .. upper`.
    pub fn value_range(lower: Expr, upper: Expr) -> Self {
        Self::from_kind(ExprKind::ValueRange {
            lower: Box::new(lower),
            upper: Box::new(upper),
        })
    }

    /// A type conversion `name (argument)`.
    pub fn conversion(name: Identifier, argument: Expr) -> Self {
        Self::from_kind(ExprKind::Conversion {
            name,
            argument: Box::new(argument),
        })
    }

    /// A list comprehension.
    pub fn comprehension(iterator: Identifier, array: Expr, selector: Expr, condition: Expr) -> Self {
        Self::from_kind(ExprKind::Comprehension {
            iterator,
            array: Box::new(array),
            selector: Box::new(selector),
            condition: Box::new(condition),
        })
    }

    /// A message aggregate `name'(field => expr, ...)`.
    pub fn message_aggregate(name: Identifier, fields: Vec<(Identifier, Expr)>) -> Self {
        Self::from_kind(ExprKind::MessageAggregate { name, fields })
    }

    /// A binding `expr where name = expr, ...`.
    pub fn binding(expr: Expr, bindings: Vec<(Identifier, Expr)>) -> Self {
        Self::from_kind(ExprKind::Binding {
            expr: Box::new(expr),
            bindings,
        })
    }

    // ---- Classification ----

    /// The printable label of the variant.
    pub fn label(&self) -> &'static str {
        match &self.kind {
            ExprKind::Number { .. } => "Number",
            ExprKind::True => "True",
            ExprKind::False => "False",
            ExprKind::Str(_) => "String",
            ExprKind::Aggregate(_) => "Aggregate",
            ExprKind::NamedAggregate(_) => "NamedAggregate",
            ExprKind::Variable(_) => "Variable",
            ExprKind::Selected { .. } => "Selected",
            ExprKind::Call { .. } => "Call",
            ExprKind::Indexed { .. } => "Indexed",
            ExprKind::Slice { .. } => "Slice",
            ExprKind::Undefined => "Undefined",
            ExprKind::Attribute { kind, .. } => kind.label(),
            ExprKind::AttributeExpr { kind, .. } => kind.label(),
            ExprKind::Assoc { op, .. } => op.label(),
            ExprKind::Binary { op, .. } => op.label(),
            ExprKind::Not(_) => "Not",
            ExprKind::Relation { op, .. } => op.label(),
            ExprKind::If { .. } => "If",
            ExprKind::Case { .. } => "Case",
            ExprKind::Quantified { quantifier, .. } => quantifier.label(),
            ExprKind::ValueRange { .. } => "ValueRange",
            ExprKind::Conversion { .. } => "Conversion",
            ExprKind::Comprehension { .. } => "Comprehension",
            ExprKind::MessageAggregate { .. } => "MessageAggregate",
            ExprKind::Binding { .. } => "Binding",
        }
    }

    /// The binding strength used when printing.
    pub fn precedence(&self) -> Precedence {
        match &self.kind {
            ExprKind::Number { .. }
            | ExprKind::True
            | ExprKind::False
            | ExprKind::Str(_)
            | ExprKind::Aggregate(_)
            | ExprKind::NamedAggregate(_)
            | ExprKind::Variable(_)
            | ExprKind::Selected { .. }
            | ExprKind::Call { .. }
            | ExprKind::Indexed { .. }
            | ExprKind::Slice { .. }
            | ExprKind::Attribute { .. }
            | ExprKind::AttributeExpr { .. }
            | ExprKind::If { .. }
            | ExprKind::Case { .. }
            | ExprKind::Quantified { .. }
            | ExprKind::Conversion { .. } => Precedence::Literal,
            ExprKind::Undefined
            | ExprKind::ValueRange { .. }
            | ExprKind::Comprehension { .. }
            | ExprKind::MessageAggregate { .. }
            | ExprKind::Binding { .. } => Precedence::Undefined,
            ExprKind::Assoc { op, .. } => op.precedence(),
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Not(_) => Precedence::HighestPrecedenceOperator,
            ExprKind::Relation { .. } => Precedence::RelationalOperator,
        }
    }

    /// Whether the node is name-shaped (subject to substitution lookup).
    pub(crate) fn is_name(&self) -> bool {
        matches!(
            &self.kind,
            ExprKind::Variable(_)
                | ExprKind::Selected { .. }
                | ExprKind::Call { .. }
                | ExprKind::Indexed { .. }
                | ExprKind::Slice { .. }
                | ExprKind::Undefined
                | ExprKind::Attribute { .. }
                | ExprKind::AttributeExpr { .. }
        )
    }

    /// Whether the node is a name carrying an attached unary minus.
    pub fn is_negative(&self) -> bool {
        match &self.kind {
            ExprKind::Variable(v) => v.negative,
            ExprKind::Selected { negative, .. }
            | ExprKind::Call { negative, .. }
            | ExprKind::Indexed { negative, .. }
            | ExprKind::Attribute { negative, .. }
            | ExprKind::AttributeExpr { negative, .. } => *negative,
            _ => false,
        }
    }

    fn is_immutable(&self) -> bool {
        match &self.kind {
            ExprKind::Variable(v) => v.immutable,
            ExprKind::Selected { immutable, .. } | ExprKind::Call { immutable, .. } => *immutable,
            _ => false,
        }
    }

    /// A copy with the negative flag of a name-shaped node set to `value`.
    pub fn with_negative(&self, value: bool) -> Expr {
        let mut out = self.clone();
        match &mut out.kind {
            ExprKind::Variable(v) => v.negative = value,
            ExprKind::Selected { negative, .. }
            | ExprKind::Call { negative, .. }
            | ExprKind::Indexed { negative, .. }
            | ExprKind::Attribute { negative, .. }
            | ExprKind::AttributeExpr { negative, .. } => *negative = value,
            _ => {}
        }
        out
    }

    // ---- Negation ----

    /// The negation of the term.
    ///
    /// Defined for arithmetic, logical and relational nodes and for names
    /// (which carry a sign flag). Control and aggregate nodes have no
    /// meaningful negation.
    ///
    /// # Errors
    ///
    /// [`AlgebraError::NegationUndefined`] for nodes without a negation.
    pub fn negated(&self) -> Result<Expr, AlgebraError> {
        let kind = match &self.kind {
            ExprKind::Number { value, base } => ExprKind::Number {
                value: value.wrapping_neg(),
                base: *base,
            },
            ExprKind::True => ExprKind::False,
            ExprKind::False => ExprKind::True,
            ExprKind::Variable(_)
            | ExprKind::Selected { .. }
            | ExprKind::Call { .. }
            | ExprKind::Indexed { .. }
            | ExprKind::Attribute { .. }
            | ExprKind::AttributeExpr { .. } => {
                return Ok(self.with_negative(!self.is_negative()));
            }
            ExprKind::Not(inner) => return Ok((**inner).clone()),
            ExprKind::Assoc {
                op: AssocOp::Add,
                terms,
            } => {
                let negated: Result<Vec<Expr>, AlgebraError> =
                    terms.iter().map(Expr::negated).collect();
                ExprKind::Assoc {
                    op: AssocOp::Add,
                    terms: negated?,
                }
            }
            ExprKind::Assoc {
                op: AssocOp::Mul,
                terms,
            } => {
                let mut terms = terms.clone();
                terms.push(Expr::number(-1));
                return Ok(Expr::from_kind(ExprKind::Assoc {
                    op: AssocOp::Mul,
                    terms,
                })
                .simplified());
            }
            ExprKind::Assoc { op, terms } => {
                let dual = op.dual().ok_or(AlgebraError::NegationUndefined {
                    label: self.label(),
                })?;
                let negated: Result<Vec<Expr>, AlgebraError> =
                    terms.iter().map(Expr::negated).collect();
                ExprKind::Assoc {
                    op: dual,
                    terms: negated?,
                }
            }
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: Box::new(left.negated()?),
                right: right.clone(),
            },
            ExprKind::Relation { op, left, right } => ExprKind::Relation {
                op: op.inverse(),
                left: left.clone(),
                right: right.clone(),
            },
            _ => {
                return Err(AlgebraError::NegationUndefined {
                    label: self.label(),
                })
            }
        };
        Ok(Expr {
            kind,
            location: self.location.clone(),
        })
    }

    // ---- Free variables ----

    /// The free variables of the term, first occurrence first, each once.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn push_variable(out: &mut Vec<Variable>, v: &Variable) {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }

    fn collect_variables(&self, out: &mut Vec<Variable>) {
        match &self.kind {
            ExprKind::Variable(v) => Self::push_variable(out, v),
            ExprKind::Selected { prefix, .. } => prefix.collect_variables(out),
            ExprKind::Call { args, .. } => {
                for a in args {
                    a.collect_variables(out);
                }
            }
            ExprKind::Indexed {
                prefix, elements, ..
            } => {
                prefix.collect_variables(out);
                for e in elements {
                    e.collect_variables(out);
                }
            }
            ExprKind::Slice {
                prefix,
                first,
                last,
            } => {
                prefix.collect_variables(out);
                first.collect_variables(out);
                last.collect_variables(out);
            }
            ExprKind::Attribute { prefix, .. } => prefix.collect_variables(out),
            ExprKind::AttributeExpr {
                prefix, argument, ..
            } => {
                prefix.collect_variables(out);
                argument.collect_variables(out);
            }
            ExprKind::Assoc { terms, .. } => {
                for t in terms {
                    t.collect_variables(out);
                }
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Relation { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            ExprKind::Not(inner) => inner.collect_variables(out),
            ExprKind::If {
                branches,
                else_branch,
            } => {
                for (c, e) in branches {
                    c.collect_variables(out);
                    e.collect_variables(out);
                }
                if let Some(e) = else_branch {
                    e.collect_variables(out);
                }
            }
            ExprKind::Case { scrutinee, arms } => {
                scrutinee.collect_variables(out);
                for (c, e) in arms {
                    c.collect_variables(out);
                    e.collect_variables(out);
                }
            }
            ExprKind::Quantified {
                parameter,
                iterable,
                predicate,
                ..
            } => {
                let mut inner = Vec::new();
                iterable.collect_variables(&mut inner);
                predicate.collect_variables(&mut inner);
                for v in inner {
                    if v.identifier != *parameter {
                        Self::push_variable(out, &v);
                    }
                }
            }
            ExprKind::ValueRange { lower, upper } => {
                lower.collect_variables(out);
                upper.collect_variables(out);
            }
            ExprKind::Conversion { argument, .. } => argument.collect_variables(out),
            ExprKind::Comprehension {
                iterator,
                array,
                selector,
                condition,
            } => {
                let mut inner = Vec::new();
                array.collect_variables(&mut inner);
                selector.collect_variables(&mut inner);
                condition.collect_variables(&mut inner);
                for v in inner {
                    if v.identifier != *iterator {
                        Self::push_variable(out, &v);
                    }
                }
            }
            ExprKind::MessageAggregate { fields, .. } => {
                for (_, e) in fields {
                    e.collect_variables(out);
                }
            }
            ExprKind::Binding { .. } => {
                for v in self.simplified().variables() {
                    Self::push_variable(out, &v);
                }
            }
            ExprKind::Aggregate(elements) => {
                for e in elements {
                    e.collect_variables(out);
                }
            }
            ExprKind::NamedAggregate(elements) => {
                for (_, e) in elements {
                    e.collect_variables(out);
                }
            }
            ExprKind::Number { .. }
            | ExprKind::True
            | ExprKind::False
            | ExprKind::Str(_)
            | ExprKind::Undefined => {}
        }
    }

    // ---- Pre-order search ----

    /// Every subterm matching `pred`, in pre-order.
    pub fn findall<'a>(&'a self, pred: &dyn Fn(&Expr) -> bool) -> Vec<&'a Expr> {
        let mut out = Vec::new();
        self.collect_matches(pred, &mut out);
        out
    }

    fn collect_matches<'a>(&'a self, pred: &dyn Fn(&Expr) -> bool, out: &mut Vec<&'a Expr>) {
        if pred(self) {
            out.push(self);
        }
        match &self.kind {
            ExprKind::Selected { prefix, .. } | ExprKind::Attribute { prefix, .. } => {
                prefix.collect_matches(pred, out);
            }
            ExprKind::AttributeExpr {
                prefix, argument, ..
            } => {
                prefix.collect_matches(pred, out);
                argument.collect_matches(pred, out);
            }
            ExprKind::Call { args, .. } => {
                for a in args {
                    a.collect_matches(pred, out);
                }
            }
            ExprKind::Indexed {
                prefix, elements, ..
            } => {
                prefix.collect_matches(pred, out);
                for e in elements {
                    e.collect_matches(pred, out);
                }
            }
            ExprKind::Slice {
                prefix,
                first,
                last,
            } => {
                prefix.collect_matches(pred, out);
                first.collect_matches(pred, out);
                last.collect_matches(pred, out);
            }
            ExprKind::Assoc { terms, .. } => {
                for t in terms {
                    t.collect_matches(pred, out);
                }
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Relation { left, right, .. } => {
                left.collect_matches(pred, out);
                right.collect_matches(pred, out);
            }
            ExprKind::Not(inner) => inner.collect_matches(pred, out),
            ExprKind::If {
                branches,
                else_branch,
            } => {
                for (c, e) in branches {
                    c.collect_matches(pred, out);
                    e.collect_matches(pred, out);
                }
                if let Some(e) = else_branch {
                    e.collect_matches(pred, out);
                }
            }
            ExprKind::Case { scrutinee, arms } => {
                scrutinee.collect_matches(pred, out);
                for (c, e) in arms {
                    c.collect_matches(pred, out);
                    e.collect_matches(pred, out);
                }
            }
            ExprKind::Quantified {
                iterable,
                predicate,
                ..
            } => {
                iterable.collect_matches(pred, out);
                predicate.collect_matches(pred, out);
            }
            ExprKind::ValueRange { lower, upper } => {
                lower.collect_matches(pred, out);
                upper.collect_matches(pred, out);
            }
            ExprKind::Conversion { argument, .. } => argument.collect_matches(pred, out),
            ExprKind::Comprehension {
                array,
                selector,
                condition,
                ..
            } => {
                array.collect_matches(pred, out);
                selector.collect_matches(pred, out);
                condition.collect_matches(pred, out);
            }
            ExprKind::MessageAggregate { fields, .. } => {
                for (_, e) in fields {
                    e.collect_matches(pred, out);
                }
            }
            ExprKind::Binding { expr, bindings } => {
                expr.collect_matches(pred, out);
                for (_, e) in bindings {
                    e.collect_matches(pred, out);
                }
            }
            ExprKind::Aggregate(elements) => {
                for e in elements {
                    e.collect_matches(pred, out);
                }
            }
            ExprKind::NamedAggregate(elements) => {
                for (_, e) in elements {
                    e.collect_matches(pred, out);
                }
            }
            ExprKind::Number { .. }
            | ExprKind::True
            | ExprKind::False
            | ExprKind::Str(_)
            | ExprKind::Variable(_)
            | ExprKind::Undefined => {}
        }
    }

    // ---- Substitution ----

    /// Deep replacement of subterms.
    ///
    /// Exactly one of `func` and `mapping` must be supplied. A mapping is
    /// consulted for name-shaped subterms only; a function may replace any
    /// subterm (returning `None` keeps a node). Immutable names are never
    /// substituted. Negative names are looked up in their positive form and
    /// the replacement is re-negated.
    ///
    /// # Errors
    ///
    /// [`AlgebraError::InvalidSubstitution`] unless exactly one argument is
    /// supplied; [`AlgebraError::NegationUndefined`] when a negative name is
    /// replaced by a term without a negation.
    pub fn substituted(
        &self,
        func: Option<&dyn Fn(&Expr) -> Option<Expr>>,
        mapping: Option<&Mapping>,
    ) -> Result<Expr, AlgebraError> {
        match (func, mapping) {
            (Some(f), None) => self.subst_with(f),
            (None, Some(m)) => self.subst_with(&|e: &Expr| {
                if e.is_name() {
                    m.get(e).cloned()
                } else {
                    None
                }
            }),
            _ => Err(AlgebraError::InvalidSubstitution),
        }
    }

    pub(crate) fn subst_with(
        &self,
        f: &dyn Fn(&Expr) -> Option<Expr>,
    ) -> Result<Expr, AlgebraError> {
        if self.is_name() {
            if self.is_immutable() {
                return Ok(self.clone());
            }
            if self.is_negative() {
                let positive = self.with_negative(false);
                let replaced = positive.subst_with(f)?;
                return replaced.negated();
            }
        }
        let base = match f(self) {
            Some(replacement) => replacement,
            None => self.clone(),
        };
        if discriminant(&base.kind) == discriminant(&self.kind) {
            base.map_children(f)
        } else {
            Ok(base)
        }
    }

    fn map_children(self, f: &dyn Fn(&Expr) -> Option<Expr>) -> Result<Expr, AlgebraError> {
        let location = self.location.clone();
        let kind = match self.kind {
            ExprKind::Selected {
                prefix,
                selector,
                negative,
                immutable,
            } => ExprKind::Selected {
                prefix: Box::new(prefix.subst_with(f)?),
                selector,
                negative,
                immutable,
            },
            ExprKind::Call {
                name,
                args,
                negative,
                immutable,
            } => ExprKind::Call {
                name,
                args: args
                    .iter()
                    .map(|a| a.subst_with(f))
                    .collect::<Result<_, _>>()?,
                negative,
                immutable,
            },
            ExprKind::Indexed {
                prefix,
                elements,
                negative,
            } => ExprKind::Indexed {
                prefix: Box::new(prefix.subst_with(f)?),
                elements: elements
                    .iter()
                    .map(|e| e.subst_with(f))
                    .collect::<Result<_, _>>()?,
                negative,
            },
            ExprKind::Slice {
                prefix,
                first,
                last,
            } => ExprKind::Slice {
                prefix: Box::new(prefix.subst_with(f)?),
                first: Box::new(first.subst_with(f)?),
                last: Box::new(last.subst_with(f)?),
            },
            ExprKind::Attribute {
                kind,
                prefix,
                negative,
            } => ExprKind::Attribute {
                kind,
                prefix: Box::new(prefix.subst_with(f)?),
                negative,
            },
            ExprKind::AttributeExpr {
                kind,
                prefix,
                argument,
                negative,
            } => ExprKind::AttributeExpr {
                kind,
                prefix: Box::new(prefix.subst_with(f)?),
                argument: Box::new(argument.subst_with(f)?),
                negative,
            },
            ExprKind::Assoc { op, terms } => ExprKind::Assoc {
                op,
                terms: terms
                    .iter()
                    .map(|t| t.subst_with(f))
                    .collect::<Result<_, _>>()?,
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: Box::new(left.subst_with(f)?),
                right: Box::new(right.subst_with(f)?),
            },
            ExprKind::Not(inner) => ExprKind::Not(Box::new(inner.subst_with(f)?)),
            ExprKind::Relation { op, left, right } => ExprKind::Relation {
                op,
                left: Box::new(left.subst_with(f)?),
                right: Box::new(right.subst_with(f)?),
            },
            ExprKind::If {
                branches,
                else_branch,
            } => ExprKind::If {
                branches: branches
                    .iter()
                    .map(|(c, e)| Ok((c.subst_with(f)?, e.subst_with(f)?)))
                    .collect::<Result<_, AlgebraError>>()?,
                else_branch: match else_branch {
                    Some(e) => Some(Box::new(e.subst_with(f)?)),
                    None => None,
                },
            },
            ExprKind::Case { scrutinee, arms } => ExprKind::Case {
                scrutinee: Box::new(scrutinee.subst_with(f)?),
                arms: arms
                    .iter()
                    .map(|(c, e)| Ok((c.subst_with(f)?, e.subst_with(f)?)))
                    .collect::<Result<_, AlgebraError>>()?,
            },
            ExprKind::Quantified {
                quantifier,
                parameter,
                iterable,
                predicate,
            } => ExprKind::Quantified {
                quantifier,
                parameter,
                iterable: Box::new(iterable.subst_with(f)?),
                predicate: Box::new(predicate.subst_with(f)?),
            },
            ExprKind::ValueRange { lower, upper } => ExprKind::ValueRange {
                lower: Box::new(lower.subst_with(f)?),
                upper: Box::new(upper.subst_with(f)?),
            },
            ExprKind::Conversion { name, argument } => ExprKind::Conversion {
                name,
                argument: Box::new(argument.subst_with(f)?),
            },
            ExprKind::Comprehension {
                iterator,
                array,
                selector,
                condition,
            } => ExprKind::Comprehension {
                iterator,
                array: Box::new(array.subst_with(f)?),
                selector: Box::new(selector.subst_with(f)?),
                condition: Box::new(condition.subst_with(f)?),
            },
            ExprKind::MessageAggregate { name, fields } => ExprKind::MessageAggregate {
                name,
                fields: fields
                    .iter()
                    .map(|(n, e)| Ok((n.clone(), e.subst_with(f)?)))
                    .collect::<Result<_, AlgebraError>>()?,
            },
            ExprKind::Binding { expr, bindings } => ExprKind::Binding {
                expr: Box::new(expr.subst_with(f)?),
                bindings: bindings
                    .iter()
                    .map(|(n, e)| Ok((n.clone(), e.subst_with(f)?)))
                    .collect::<Result<_, AlgebraError>>()?,
            },
            ExprKind::Aggregate(elements) => ExprKind::Aggregate(
                elements
                    .iter()
                    .map(|e| e.subst_with(f))
                    .collect::<Result<_, _>>()?,
            ),
            ExprKind::NamedAggregate(elements) => ExprKind::NamedAggregate(
                elements
                    .iter()
                    .map(|(n, e)| Ok((n.clone(), e.subst_with(f)?)))
                    .collect::<Result<_, AlgebraError>>()?,
            ),
            leaf => leaf,
        };
        Ok(Expr { kind, location })
    }

    // ---- Printing ----

    fn paren(&self, child: &Expr, canonical: bool) -> String {
        if child.precedence() <= self.precedence() {
            format!("({})", child.render(canonical))
        } else {
            child.render(canonical)
        }
    }

    fn render_id(identifier: &Identifier, canonical: bool) -> String {
        if canonical {
            identifier.to_string().to_lowercase()
        } else {
            identifier.to_string()
        }
    }

    fn render_number(value: i64, base: u8, canonical: bool) -> String {
        let magnitude = value.unsigned_abs();
        let digits = if canonical {
            format!("{magnitude}")
        } else {
            match base {
                0 => format!("{magnitude}"),
                2 => format!("2#{magnitude:b}#"),
                8 => format!("8#{magnitude:o}#"),
                10 => format!("10#{magnitude}#"),
                16 => format!("16#{magnitude:X}#"),
                _ => format!("{magnitude}"),
            }
        };
        if value < 0 {
            format!("(-{digits})")
        } else {
            digits
        }
    }

    fn wrap_negative(repr: String, negative: bool) -> String {
        if negative {
            format!("(-{repr})")
        } else {
            repr
        }
    }

    /// Renders a sum, folding negative terms into subtractions.
    fn render_add(&self, terms: &[Expr], canonical: bool) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        let mut out = terms[0].render(canonical);
        for term in &terms[1..] {
            let negative_number = matches!(&term.kind, ExprKind::Number { value, .. } if *value < 0);
            if negative_number || (term.is_name() && term.is_negative()) {
                let positive = match &term.kind {
                    ExprKind::Number { value, base } => {
                        Expr::number_with_base(value.wrapping_neg(), *base)
                    }
                    _ => term.with_negative(false),
                };
                out.push_str(" - ");
                out.push_str(&self.paren(&positive, canonical));
            } else {
                out.push_str(" + ");
                out.push_str(&self.paren(term, canonical));
            }
        }
        out
    }

    pub(crate) fn render(&self, canonical: bool) -> String {
        match &self.kind {
            ExprKind::Number { value, base } => Self::render_number(*value, *base, canonical),
            ExprKind::True => "True".to_string(),
            ExprKind::False => "False".to_string(),
            ExprKind::Str(data) => format!("\"{data}\""),
            ExprKind::Aggregate(elements) => format!(
                "({})",
                elements
                    .iter()
                    .map(|e| e.render(canonical))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ExprKind::NamedAggregate(elements) => format!(
                "({})",
                elements
                    .iter()
                    .map(|(n, e)| format!("{} => {}", Self::render_id(n, canonical), e.render(canonical)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ExprKind::Variable(v) => {
                Self::wrap_negative(Self::render_id(&v.identifier, canonical), v.negative)
            }
            ExprKind::Selected {
                prefix,
                selector,
                negative,
                ..
            } => Self::wrap_negative(
                format!(
                    "{}.{}",
                    prefix.render(canonical),
                    Self::render_id(selector, canonical)
                ),
                *negative,
            ),
            ExprKind::Call {
                name,
                args,
                negative,
                ..
            } => {
                let rendered = if args.is_empty() {
                    Self::render_id(name, canonical)
                } else {
                    format!(
                        "{} ({})",
                        Self::render_id(name, canonical),
                        args.iter()
                            .map(|a| a.render(canonical))
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                };
                Self::wrap_negative(rendered, *negative)
            }
            ExprKind::Indexed {
                prefix,
                elements,
                negative,
            } => Self::wrap_negative(
                format!(
                    "{} ({})",
                    prefix.render(canonical),
                    elements
                        .iter()
                        .map(|e| e.render(canonical))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                *negative,
            ),
            ExprKind::Slice {
                prefix,
                first,
                last,
            } => format!(
                "{} ({} .. {})",
                prefix.render(canonical),
                first.render(canonical),
                last.render(canonical)
            ),
            ExprKind::Undefined => "__UNDEFINED__".to_string(),
            ExprKind::Attribute {
                kind,
                prefix,
                negative,
            } => Self::wrap_negative(
                format!("{}'{}", prefix.render(canonical), kind.label()),
                *negative,
            ),
            ExprKind::AttributeExpr {
                kind,
                prefix,
                argument,
                negative,
            } => Self::wrap_negative(
                format!(
                    "{}'{} ({})",
                    prefix.render(canonical),
                    kind.label(),
                    argument.render(canonical)
                ),
                *negative,
            ),
            ExprKind::Assoc { op, terms } => {
                if terms.is_empty() {
                    return match op {
                        AssocOp::Add => "0".to_string(),
                        AssocOp::Mul => "1".to_string(),
                        AssocOp::And | AssocOp::AndThen => "True".to_string(),
                        AssocOp::Or | AssocOp::OrElse => "False".to_string(),
                    };
                }
                if *op == AssocOp::Add {
                    return self.render_add(terms, canonical);
                }
                terms
                    .iter()
                    .map(|t| self.paren(t, canonical))
                    .collect::<Vec<_>>()
                    .join(op.symbol())
            }
            ExprKind::Binary { op, left, right } => format!(
                "{}{}{}",
                self.paren(left, canonical),
                op.symbol(),
                self.paren(right, canonical)
            ),
            ExprKind::Not(inner) => format!("not {}", self.paren(inner, canonical)),
            ExprKind::Relation { op, left, right } => format!(
                "{}{}{}",
                self.paren(left, canonical),
                op.symbol(),
                self.paren(right, canonical)
            ),
            ExprKind::If {
                branches,
                else_branch,
            } => {
                let mut out = String::from("(");
                for (i, (c, e)) in branches.iter().enumerate() {
                    if i == 0 {
                        out.push_str(&format!(
                            "if {} then {}",
                            c.render(canonical),
                            e.render(canonical)
                        ));
                    } else {
                        out.push_str(&format!(
                            " elsif {} then {}",
                            c.render(canonical),
                            e.render(canonical)
                        ));
                    }
                }
                if let Some(e) = else_branch {
                    out.push_str(&format!(" else {}", e.render(canonical)));
                }
                out.push(')');
                out
            }
            ExprKind::Case { scrutinee, arms } => {
                let rendered_arms = arms
                    .iter()
                    .map(|(c, e)| format!("when {} => {}", c.render(canonical), e.render(canonical)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("(case {} is {})", scrutinee.render(canonical), rendered_arms)
            }
            ExprKind::Quantified {
                quantifier,
                parameter,
                iterable,
                predicate,
            } => format!(
                "(for {} {} {} {} => {})",
                quantifier.word(),
                Self::render_id(parameter, canonical),
                quantifier.keyword(),
                iterable.render(canonical),
                predicate.render(canonical)
            ),
            ExprKind::ValueRange { lower, upper } => {
                format!("{} .. {}", lower.render(canonical), upper.render(canonical))
            }
            ExprKind::Conversion { name, argument } => format!(
                "{} ({})",
                Self::render_id(name, canonical),
                argument.render(canonical)
            ),
            ExprKind::Comprehension {
                iterator,
                array,
                selector,
                condition,
            } => format!(
                "[for {} in {} => {} when {}]",
                Self::render_id(iterator, canonical),
                array.render(canonical),
                selector.render(canonical),
                condition.render(canonical)
            ),
            ExprKind::MessageAggregate { name, fields } => {
                let data = if fields.is_empty() {
                    "null message".to_string()
                } else {
                    fields
                        .iter()
                        .map(|(n, e)| {
                            format!("{} => {}", Self::render_id(n, canonical), e.render(canonical))
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!("{}'({})", Self::render_id(name, canonical), data)
            }
            ExprKind::Binding { expr, bindings } => {
                let data = bindings
                    .iter()
                    .map(|(n, e)| {
                        format!("{} = {}", Self::render_id(n, canonical), e.render(canonical))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} where {}", expr.render(canonical), data)
            }
        }
    }

    /// The canonical key used for equality and hashing: case-folded names,
    /// decimal numbers, no locations.
    pub(crate) fn key(&self) -> String {
        self.render(true)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        discriminant(&self.kind) == discriminant(&other.kind) && self.key() == other.key()
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
