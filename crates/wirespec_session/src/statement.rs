//! State actions.
//!
//! A [`Statement`] is one action executed when a state is entered:
//! assignment, list append/extend, reset, or a channel read/write. Each
//! action is scope-checked against the declarations visible in its state
//! and kind-checked against its contract (list operations work on
//! variables, channel operations on channels with the right direction).

use std::fmt;

use wirespec_algebra::{DeclarationKind, DeclarationTable, Expr};
use wirespec_base::{Diagnostics, Identifier, Location, Severity, Subsystem};

/// An action of a session state.
#[derive(Debug, Clone)]
pub enum Statement {
    /// `target := expression`.
    Assignment {
        identifier: Identifier,
        expression: Expr,
        location: Option<Location>,
    },
    /// `target'Append (expression)`.
    Append {
        identifier: Identifier,
        expression: Expr,
        location: Option<Location>,
    },
    /// `target'Extend (expression)`.
    Extend {
        identifier: Identifier,
        expression: Expr,
        location: Option<Location>,
    },
    /// `target'Reset`.
    Reset {
        identifier: Identifier,
        location: Option<Location>,
    },
    /// `channel'Read (expression)`.
    Read {
        identifier: Identifier,
        expression: Expr,
        location: Option<Location>,
    },
    /// `channel'Write (expression)`.
    Write {
        identifier: Identifier,
        expression: Expr,
        location: Option<Location>,
    },
}

impl Statement {
    /// The acted-on identifier.
    pub fn identifier(&self) -> &Identifier {
        match self {
            Statement::Assignment { identifier, .. }
            | Statement::Append { identifier, .. }
            | Statement::Extend { identifier, .. }
            | Statement::Reset { identifier, .. }
            | Statement::Read { identifier, .. }
            | Statement::Write { identifier, .. } => identifier,
        }
    }

    /// The source position of the action.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Statement::Assignment { location, .. }
            | Statement::Append { location, .. }
            | Statement::Extend { location, .. }
            | Statement::Reset { location, .. }
            | Statement::Read { location, .. }
            | Statement::Write { location, .. } => location.as_ref(),
        }
    }

    fn expression(&self) -> Option<&Expr> {
        match self {
            Statement::Assignment { expression, .. }
            | Statement::Append { expression, .. }
            | Statement::Extend { expression, .. }
            | Statement::Read { expression, .. }
            | Statement::Write { expression, .. } => Some(expression),
            Statement::Reset { .. } => None,
        }
    }

    /// Scope- and kind-checks the action.
    pub fn validate(&self, declarations: &DeclarationTable, error: &mut Diagnostics) {
        let identifier = self.identifier();
        match declarations.get(identifier) {
            None => error.append(
                format!("undeclared \"{identifier}\" in {}", self.verb()),
                Subsystem::Session,
                Severity::Error,
                self.location().cloned(),
            ),
            Some(declaration) => {
                declaration.reference();
                self.check_kind(&declaration.kind, error);
            }
        }
        if let Some(expression) = self.expression() {
            expression.validate(declarations, error);
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Statement::Assignment { .. } => "assignment",
            Statement::Append { .. } => "append",
            Statement::Extend { .. } => "extend",
            Statement::Reset { .. } => "reset",
            Statement::Read { .. } => "read",
            Statement::Write { .. } => "write",
        }
    }

    fn check_kind(&self, kind: &DeclarationKind, error: &mut Diagnostics) {
        let identifier = self.identifier();
        match self {
            Statement::Assignment { .. }
            | Statement::Append { .. }
            | Statement::Extend { .. }
            | Statement::Reset { .. } => {
                if !matches!(
                    kind,
                    DeclarationKind::Variable { .. } | DeclarationKind::Renaming { .. }
                ) {
                    error.append(
                        format!("{} to non-variable \"{identifier}\"", self.verb()),
                        Subsystem::Session,
                        Severity::Error,
                        self.location().cloned(),
                    );
                }
            }
            Statement::Read { .. } => match kind {
                DeclarationKind::Channel { readable: true, .. } => {}
                DeclarationKind::Channel { .. } => error.append(
                    format!("channel \"{identifier}\" not readable in read statement"),
                    Subsystem::Session,
                    Severity::Error,
                    self.location().cloned(),
                ),
                _ => error.append(
                    format!("read from non-channel \"{identifier}\""),
                    Subsystem::Session,
                    Severity::Error,
                    self.location().cloned(),
                ),
            },
            Statement::Write { .. } => match kind {
                DeclarationKind::Channel { writable: true, .. } => {}
                DeclarationKind::Channel { .. } => error.append(
                    format!("channel \"{identifier}\" not writable in write statement"),
                    Subsystem::Session,
                    Severity::Error,
                    self.location().cloned(),
                ),
                _ => error.append(
                    format!("write to non-channel \"{identifier}\""),
                    Subsystem::Session,
                    Severity::Error,
                    self.location().cloned(),
                ),
            },
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assignment {
                identifier,
                expression,
                ..
            } => write!(f, "{identifier} := {expression}"),
            Statement::Append {
                identifier,
                expression,
                ..
            } => write!(f, "{identifier}'Append ({expression})"),
            Statement::Extend {
                identifier,
                expression,
                ..
            } => write!(f, "{identifier}'Extend ({expression})"),
            Statement::Reset { identifier, .. } => write!(f, "{identifier}'Reset"),
            Statement::Read {
                identifier,
                expression,
                ..
            } => write!(f, "{identifier}'Read ({expression})"),
            Statement::Write {
                identifier,
                expression,
                ..
            } => write!(f, "{identifier}'Write ({expression})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirespec_algebra::Declaration;

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    fn table(declarations: Vec<Declaration>) -> DeclarationTable {
        DeclarationTable::from_declarations(declarations)
    }

    #[test]
    fn assignment_to_variable_is_valid() {
        let decls = table(vec![Declaration::new(
            id("X"),
            DeclarationKind::Variable { type_name: None },
        )]);
        let mut error = Diagnostics::new();
        Statement::Assignment {
            identifier: id("X"),
            expression: Expr::number(1),
            location: None,
        }
        .validate(&decls, &mut error);
        assert!(error.is_empty());
        assert!(decls.get(&id("X")).unwrap().is_referenced());
    }

    #[test]
    fn assignment_to_channel_is_a_kind_error() {
        let decls = table(vec![Declaration::new(
            id("C"),
            DeclarationKind::Channel {
                readable: true,
                writable: true,
            },
        )]);
        let mut error = Diagnostics::new();
        Statement::Assignment {
            identifier: id("C"),
            expression: Expr::number(1),
            location: None,
        }
        .validate(&decls, &mut error);
        assert!(error.entries()[0].message.contains("non-variable"));
    }

    #[test]
    fn write_to_readonly_channel_is_an_error() {
        let decls = table(vec![Declaration::new(
            id("C"),
            DeclarationKind::Channel {
                readable: true,
                writable: false,
            },
        )]);
        let mut error = Diagnostics::new();
        Statement::Write {
            identifier: id("C"),
            expression: Expr::variable(id("M")),
            location: None,
        }
        .validate(&decls, &mut error);
        assert!(error.entries()[0].message.contains("not writable"));
    }

    #[test]
    fn read_from_writeonly_channel_is_an_error() {
        let decls = table(vec![Declaration::new(
            id("C"),
            DeclarationKind::Channel {
                readable: false,
                writable: true,
            },
        )]);
        let mut error = Diagnostics::new();
        Statement::Read {
            identifier: id("C"),
            expression: Expr::variable(id("M")),
            location: None,
        }
        .validate(&decls, &mut error);
        assert!(error.entries().iter().any(|e| e.message.contains("not readable")));
    }

    #[test]
    fn undeclared_target_is_an_error() {
        let decls = table(vec![]);
        let mut error = Diagnostics::new();
        Statement::Reset {
            identifier: id("List"),
            location: None,
        }
        .validate(&decls, &mut error);
        assert!(error.entries()[0].message.contains("undeclared"));
    }

    #[test]
    fn statement_display() {
        let assignment = Statement::Assignment {
            identifier: id("X"),
            expression: Expr::number(5),
            location: None,
        };
        assert_eq!(assignment.to_string(), "X := 5");
        let reset = Statement::Reset {
            identifier: id("List"),
            location: None,
        };
        assert_eq!(reset.to_string(), "List'Reset");
    }
}
