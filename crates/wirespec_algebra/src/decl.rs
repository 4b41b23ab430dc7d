//! Declarations and scope checking.
//!
//! A [`DeclarationTable`] is a finite map from identifier to kinded
//! declaration. Validating an expression resolves every free name against
//! the table, checks the kind of the resolved declaration (channels must be
//! used in the right direction, only subprograms may be called), and sets
//! the declaration's reference flag. Unreferenced declarations are reported
//! by the session validator at the end of its phase.
//!
//! The builtin names `Read`, `Write`, `Call`, `Data_Available`, `Append`,
//! `Extend`, `True`, `False` and `Boolean` are reserved.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use wirespec_base::{Diagnostics, Identifier, Location, Severity, Subsystem};

use crate::expr::{Expr, ExprKind};

/// Names that cannot be declared and always resolve.
pub const RESERVED_NAMES: [&str; 9] = [
    "Read",
    "Write",
    "Call",
    "Data_Available",
    "Append",
    "Extend",
    "True",
    "False",
    "Boolean",
];

/// Whether `identifier` is one of the reserved builtin names.
pub fn is_reserved(identifier: &Identifier) -> bool {
    identifier.parts().len() == 1
        && RESERVED_NAMES
            .iter()
            .any(|r| r.eq_ignore_ascii_case(identifier.name()))
}

fn is_builtin_literal(identifier: &Identifier) -> bool {
    identifier.parts().len() == 1
        && ["Boolean", "True", "False"]
            .iter()
            .any(|r| r.eq_ignore_ascii_case(identifier.name()))
}

fn is_channel_builtin(identifier: &Identifier) -> bool {
    identifier.parts().len() == 1
        && ["Read", "Write", "Call", "Data_Available"]
            .iter()
            .any(|r| r.eq_ignore_ascii_case(identifier.name()))
}

fn is_list_builtin(identifier: &Identifier) -> bool {
    identifier.parts().len() == 1
        && ["Append", "Extend"]
            .iter()
            .any(|r| r.eq_ignore_ascii_case(identifier.name()))
}

/// A formal parameter of a subprogram declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Identifier,
    pub type_name: Identifier,
}

/// The kind of a declaration.
#[derive(Debug, Clone)]
pub enum DeclarationKind {
    /// A typed variable.
    Variable { type_name: Option<Identifier> },
    /// An abstract private type.
    Private,
    /// A communication channel with direction capabilities.
    Channel { readable: bool, writable: bool },
    /// A callable subprogram.
    Subprogram {
        parameters: Vec<Parameter>,
        result: Identifier,
    },
    /// A renaming of an expression under a type.
    Renaming { type_name: Identifier, expr: Expr },
}

/// A named, kinded declaration with a reference flag.
///
/// The reference flag is interior-mutable: validators mark use through a
/// shared table. Construction is single-threaded; the table is only read
/// concurrently once validation has completed.
#[derive(Debug)]
pub struct Declaration {
    pub identifier: Identifier,
    pub kind: DeclarationKind,
    pub location: Option<Location>,
    referenced: Cell<bool>,
}

impl Declaration {
    pub fn new(identifier: Identifier, kind: DeclarationKind) -> Self {
        Self {
            identifier,
            kind,
            location: None,
            referenced: Cell::new(false),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Marks the declaration as used.
    pub fn reference(&self) {
        self.referenced.set(true);
    }

    /// Whether any validator has seen a use of the declaration.
    pub fn is_referenced(&self) -> bool {
        self.referenced.get()
    }

    /// The kind as a lower-case word for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DeclarationKind::Variable { .. } => "variable",
            DeclarationKind::Private => "private",
            DeclarationKind::Channel { .. } => "channel",
            DeclarationKind::Subprogram { .. } => "subprogram",
            DeclarationKind::Renaming { .. } => "renames",
        }
    }

    /// Scope-checks the declaration's own expressions.
    pub fn validate(&self, declarations: &DeclarationTable, error: &mut Diagnostics) {
        if let DeclarationKind::Renaming { expr, .. } = &self.kind {
            expr.validate(declarations, error);
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.kind_name(), self.identifier)
    }
}

/// A finite, deterministic map from identifier to declaration.
///
/// Declarations are shared (`Rc`), so a merged view marks references on the
/// same underlying declarations as its sources.
#[derive(Debug, Clone, Default)]
pub struct DeclarationTable {
    map: BTreeMap<Identifier, Rc<Declaration>>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a list of declarations.
    pub fn from_declarations(declarations: Vec<Declaration>) -> Self {
        let mut table = Self::new();
        for d in declarations {
            table.insert(d);
        }
        table
    }

    /// Adds a declaration, replacing any previous one of the same name.
    pub fn insert(&mut self, declaration: Declaration) {
        self.map
            .insert(declaration.identifier.clone(), Rc::new(declaration));
    }

    pub fn get(&self, identifier: &Identifier) -> Option<&Rc<Declaration>> {
        self.map.get(identifier)
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.map.contains_key(identifier)
    }

    /// A view containing this table's entries overridden by `other`'s.
    ///
    /// Entries are shared, not copied: references marked through the view
    /// are visible through the originals.
    #[must_use]
    pub fn merged(&self, other: &DeclarationTable) -> DeclarationTable {
        let mut map = self.map.clone();
        for (k, v) in &other.map {
            map.insert(k.clone(), Rc::clone(v));
        }
        DeclarationTable { map }
    }

    /// The entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Rc<Declaration>)> {
        self.map.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl Expr {
    /// Scope- and kind-checks the expression against `declarations`.
    ///
    /// Defects are appended to `error`; the walk does not short-circuit.
    /// Every resolved name has its declaration's reference flag set.
    pub fn validate(&self, declarations: &DeclarationTable, error: &mut Diagnostics) {
        match &self.kind {
            ExprKind::Variable(v) => {
                if is_builtin_literal(&v.identifier) {
                    return;
                }
                match declarations.get(&v.identifier) {
                    Some(declaration) => declaration.reference(),
                    None => error.append(
                        format!("undeclared variable \"{}\"", v.identifier),
                        Subsystem::Model,
                        Severity::Error,
                        self.location
                            .clone()
                            .or_else(|| v.identifier.location.clone()),
                    ),
                }
            }
            ExprKind::Selected { prefix, .. } => prefix.validate(declarations, error),
            ExprKind::Call { name, args, .. } => {
                self.validate_call(name, args, declarations, error)
            }
            ExprKind::Indexed {
                prefix, elements, ..
            } => {
                prefix.validate(declarations, error);
                for e in elements {
                    e.validate(declarations, error);
                }
            }
            ExprKind::Slice {
                prefix,
                first,
                last,
            } => {
                prefix.validate(declarations, error);
                first.validate(declarations, error);
                last.validate(declarations, error);
            }
            ExprKind::Attribute { prefix, .. } => prefix.validate(declarations, error),
            ExprKind::AttributeExpr {
                prefix, argument, ..
            } => {
                prefix.validate(declarations, error);
                argument.validate(declarations, error);
            }
            ExprKind::Assoc { terms, .. } => {
                for t in terms {
                    t.validate(declarations, error);
                }
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Relation { left, right, .. } => {
                left.validate(declarations, error);
                right.validate(declarations, error);
            }
            ExprKind::Not(inner) => inner.validate(declarations, error),
            ExprKind::If {
                branches,
                else_branch,
            } => {
                for (c, e) in branches {
                    c.validate(declarations, error);
                    e.validate(declarations, error);
                }
                if let Some(e) = else_branch {
                    e.validate(declarations, error);
                }
            }
            ExprKind::Case { scrutinee, arms } => {
                scrutinee.validate(declarations, error);
                for (_, e) in arms {
                    e.validate(declarations, error);
                }
            }
            ExprKind::Quantified {
                parameter,
                iterable,
                predicate,
                ..
            } => {
                let scope = declarations.merged(&DeclarationTable::from_declarations(vec![
                    Declaration::new(
                        parameter.clone(),
                        DeclarationKind::Variable { type_name: None },
                    ),
                ]));
                iterable.validate(&scope, error);
                predicate.validate(&scope, error);
            }
            ExprKind::ValueRange { lower, upper } => {
                lower.validate(declarations, error);
                upper.validate(declarations, error);
            }
            ExprKind::Conversion { argument, .. } => argument.validate(declarations, error),
            ExprKind::Comprehension {
                iterator,
                array,
                selector,
                condition,
            } => {
                let scope = declarations.merged(&DeclarationTable::from_declarations(vec![
                    Declaration::new(
                        iterator.clone(),
                        DeclarationKind::Variable { type_name: None },
                    ),
                ]));
                array.validate(&scope, error);
                selector.validate(&scope, error);
                condition.validate(&scope, error);
            }
            ExprKind::MessageAggregate { fields, .. } => {
                for (_, e) in fields {
                    e.validate(declarations, error);
                }
            }
            ExprKind::Binding { .. } => self.simplified().validate(declarations, error),
            ExprKind::Aggregate(elements) => {
                for e in elements {
                    e.validate(declarations, error);
                }
            }
            ExprKind::NamedAggregate(elements) => {
                for (_, e) in elements {
                    e.validate(declarations, error);
                }
            }
            ExprKind::Number { .. }
            | ExprKind::True
            | ExprKind::False
            | ExprKind::Str(_)
            | ExprKind::Undefined => {}
        }
    }

    fn validate_call(
        &self,
        name: &Identifier,
        args: &[Expr],
        declarations: &DeclarationTable,
        error: &mut Diagnostics,
    ) {
        if is_channel_builtin(name) {
            self.validate_channel_call(name, args, declarations, error);
            return;
        }
        if !is_list_builtin(name) {
            match declarations.get(name) {
                Some(declaration) => declaration.reference(),
                None => error.append(
                    format!("undeclared subprogram \"{name}\" called"),
                    Subsystem::Model,
                    Severity::Error,
                    self.location.clone(),
                ),
            }
        }
        for a in args {
            a.validate(declarations, error);
        }
    }

    /// Calls to `Read`/`Write`/`Call`/`Data_Available` take a channel as
    /// their first argument and require the matching direction capability.
    fn validate_channel_call(
        &self,
        name: &Identifier,
        args: &[Expr],
        declarations: &DeclarationTable,
        error: &mut Diagnostics,
    ) {
        let Some(first) = args.first() else {
            error.append(
                format!("no channel argument in call to \"{name}\""),
                Subsystem::Model,
                Severity::Error,
                self.location.clone(),
            );
            return;
        };
        let ExprKind::Variable(channel_id) = &first.kind else {
            error.append(
                format!("invalid channel ID type in call to \"{name}\""),
                Subsystem::Model,
                Severity::Error,
                self.location.clone(),
            );
            return;
        };
        let Some(declaration) = declarations.get(&channel_id.identifier) else {
            error.append(
                format!(
                    "undeclared channel \"{}\" in call to \"{name}\"",
                    channel_id.identifier
                ),
                Subsystem::Model,
                Severity::Error,
                self.location.clone(),
            );
            return;
        };
        let DeclarationKind::Channel { readable, writable } = &declaration.kind else {
            error.append(
                format!("invalid channel type in call to \"{name}\""),
                Subsystem::Model,
                Severity::Error,
                self.location.clone(),
            );
            return;
        };
        declaration.reference();
        let builtin = name.name().to_lowercase();
        if matches!(builtin.as_str(), "write" | "call") && !writable {
            error.append(
                format!(
                    "channel \"{}\" not writable in call to \"{name}\"",
                    channel_id.identifier
                ),
                Subsystem::Model,
                Severity::Error,
                self.location.clone(),
            );
        }
        if matches!(builtin.as_str(), "call" | "read" | "data_available") && !readable {
            error.append(
                format!(
                    "channel \"{}\" not readable in call to \"{name}\"",
                    channel_id.identifier
                ),
                Subsystem::Model,
                Severity::Error,
                self.location.clone(),
            );
        }
        for a in &args[1..] {
            a.validate(declarations, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    fn variable_decl(name: &str) -> Declaration {
        Declaration::new(id(name), DeclarationKind::Variable { type_name: None })
    }

    fn channel_decl(name: &str, readable: bool, writable: bool) -> Declaration {
        Declaration::new(id(name), DeclarationKind::Channel { readable, writable })
    }

    #[test]
    fn declared_variable_is_marked_referenced() {
        let table = DeclarationTable::from_declarations(vec![variable_decl("X")]);
        let mut error = Diagnostics::new();
        Expr::variable(id("X")).validate(&table, &mut error);
        assert!(error.is_empty());
        assert!(table.get(&id("X")).unwrap().is_referenced());
    }

    #[test]
    fn undeclared_variable_is_an_error() {
        let table = DeclarationTable::new();
        let mut error = Diagnostics::new();
        Expr::variable(id("X")).validate(&table, &mut error);
        assert!(error.has_errors());
        assert!(error.entries()[0].message.contains("undeclared variable"));
    }

    #[test]
    fn builtin_literals_always_resolve() {
        let table = DeclarationTable::new();
        let mut error = Diagnostics::new();
        for name in ["True", "False", "Boolean"] {
            Expr::variable(id(name)).validate(&table, &mut error);
        }
        assert!(error.is_empty());
    }

    #[test]
    fn write_requires_writable_channel() {
        let table = DeclarationTable::from_declarations(vec![channel_decl("C", true, false)]);
        let mut error = Diagnostics::new();
        Expr::call(id("Write"), vec![Expr::variable(id("C"))]).validate(&table, &mut error);
        assert!(error.has_errors());
        assert!(error.entries()[0].message.contains("not writable"));
    }

    #[test]
    fn read_requires_readable_channel() {
        let table = DeclarationTable::from_declarations(vec![channel_decl("C", false, true)]);
        let mut error = Diagnostics::new();
        Expr::call(id("Read"), vec![Expr::variable(id("C"))]).validate(&table, &mut error);
        assert!(error.has_errors());
        assert!(error.entries()[0].message.contains("not readable"));
    }

    #[test]
    fn call_requires_both_directions() {
        let table = DeclarationTable::from_declarations(vec![channel_decl("C", false, false)]);
        let mut error = Diagnostics::new();
        Expr::call(id("Call"), vec![Expr::variable(id("C"))]).validate(&table, &mut error);
        let messages: Vec<_> = error.entries().iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("not writable"));
        assert!(messages[1].contains("not readable"));
    }

    #[test]
    fn channel_call_without_argument_is_an_error() {
        let table = DeclarationTable::new();
        let mut error = Diagnostics::new();
        Expr::call(id("Read"), vec![]).validate(&table, &mut error);
        assert!(error.entries()[0].message.contains("no channel argument"));
    }

    #[test]
    fn channel_call_on_non_channel_is_an_error() {
        let table = DeclarationTable::from_declarations(vec![variable_decl("C")]);
        let mut error = Diagnostics::new();
        Expr::call(id("Read"), vec![Expr::variable(id("C"))]).validate(&table, &mut error);
        assert!(error.entries()[0].message.contains("invalid channel type"));
    }

    #[test]
    fn undeclared_subprogram_is_an_error() {
        let table = DeclarationTable::new();
        let mut error = Diagnostics::new();
        Expr::call(id("Checksum"), vec![]).validate(&table, &mut error);
        assert!(error.entries()[0]
            .message
            .contains("undeclared subprogram \"Checksum\""));
    }

    #[test]
    fn quantifier_binds_its_parameter() {
        let table = DeclarationTable::from_declarations(vec![variable_decl("List")]);
        let mut error = Diagnostics::new();
        let expr = Expr::quantified(
            crate::expr::Quantifier::ForAllIn,
            id("E"),
            Expr::variable(id("List")),
            Expr::greater(Expr::variable(id("E")), Expr::number(0)),
        );
        expr.validate(&table, &mut error);
        assert!(error.is_empty(), "{error}");
    }

    #[test]
    fn merged_tables_share_reference_flags() {
        let globals = DeclarationTable::from_declarations(vec![variable_decl("X")]);
        let locals = DeclarationTable::from_declarations(vec![variable_decl("Y")]);
        let merged = globals.merged(&locals);
        let mut error = Diagnostics::new();
        Expr::variable(id("X")).validate(&merged, &mut error);
        assert!(globals.get(&id("X")).unwrap().is_referenced());
    }

    #[test]
    fn reserved_names_are_detected() {
        assert!(is_reserved(&id("Read")));
        assert!(is_reserved(&id("data_available")));
        assert!(is_reserved(&id("Boolean")));
        assert!(!is_reserved(&id("Payload")));
    }
}
