//! Session state machines and their validation pass.
//!
//! Validation accumulates every defect across all states before reporting:
//! it never stops at the first error. The checks, in order:
//!
//! 1. Non-empty state list
//! 2. Existence of the initial and final states and of transition targets
//! 3. No duplicate state names (case-insensitive)
//! 4. Reachability (every non-initial state has an incoming transition)
//!    and detachment (every non-final state has an outgoing one)
//! 5. Scope validation of transition conditions, after simplification
//! 6. Scope and kind validation of state actions
//! 7. Declaration hygiene: local shadowing of globals, reserved builtin
//!    names, unused declarations

use std::collections::BTreeMap;

use wirespec_algebra::decl::is_reserved;
use wirespec_algebra::{DeclarationKind, DeclarationTable, Expr};
use wirespec_base::{Diagnostics, Identifier, Location, Severity, Subsystem};

use crate::statement::Statement;

/// A guarded transition to a target state.
#[derive(Debug, Clone)]
pub struct Transition {
    pub target: Identifier,
    pub condition: Expr,
    pub description: Option<String>,
    pub location: Option<Location>,
}

impl Transition {
    /// An unconditional transition.
    pub fn new(target: Identifier) -> Self {
        Self {
            target,
            condition: Expr::boolean(true),
            description: None,
            location: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Expr) -> Self {
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Scope-checks the simplified condition.
    pub fn validate(&self, declarations: &DeclarationTable, error: &mut Diagnostics) {
        self.condition.simplified().validate(declarations, error);
    }
}

/// A session state with transitions, actions and local declarations.
#[derive(Debug, Clone)]
pub struct State {
    pub name: Identifier,
    pub transitions: Vec<Transition>,
    pub actions: Vec<Statement>,
    pub declarations: DeclarationTable,
    pub location: Option<Location>,
}

impl State {
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            transitions: Vec::new(),
            actions: Vec::new(),
            declarations: DeclarationTable::new(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_transitions(mut self, transitions: Vec<Transition>) -> Self {
        self.transitions = transitions;
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: Vec<Statement>) -> Self {
        self.actions = actions;
        self
    }

    #[must_use]
    pub fn with_declarations(mut self, declarations: DeclarationTable) -> Self {
        self.declarations = declarations;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// A communicating state machine.
#[derive(Debug, Clone)]
pub struct Session {
    pub identifier: Identifier,
    pub initial: Identifier,
    pub final_state: Identifier,
    pub states: Vec<State>,
    pub declarations: DeclarationTable,
    pub parameters: DeclarationTable,
    pub location: Option<Location>,
}

impl Session {
    pub fn new(
        identifier: Identifier,
        initial: Identifier,
        final_state: Identifier,
        states: Vec<State>,
    ) -> Self {
        Self {
            identifier,
            initial,
            final_state,
            states,
            declarations: DeclarationTable::new(),
            parameters: DeclarationTable::new(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_declarations(mut self, declarations: DeclarationTable) -> Self {
        self.declarations = declarations;
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: DeclarationTable) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Runs all checks and returns the accumulated diagnostics.
    pub fn validate(&self) -> Diagnostics {
        let mut error = Diagnostics::new();
        if self.states.is_empty() {
            error.append(
                "empty states",
                Subsystem::Session,
                Severity::Error,
                self.location.clone(),
            );
        }
        self.check_state_existence(&mut error);
        self.check_duplicate_states(&mut error);
        self.check_reachability(&mut error);
        self.check_conditions(&mut error);
        self.check_actions(&mut error);
        self.check_declarations(&mut error);
        error
    }

    /// Validates and fails iff any error was recorded.
    pub fn check(&self) -> Result<(), Diagnostics> {
        self.validate().propagate()
    }

    fn globals(&self) -> DeclarationTable {
        self.parameters.merged(&self.declarations)
    }

    fn check_state_existence(&self, error: &mut Diagnostics) {
        let state_names: Vec<&Identifier> = self.states.iter().map(|s| &s.name).collect();
        if !state_names.contains(&&self.initial) {
            error.append(
                format!(
                    "initial state \"{}\" does not exist in \"{}\"",
                    self.initial, self.identifier
                ),
                Subsystem::Session,
                Severity::Error,
                self.initial.location.clone(),
            );
        }
        if !state_names.contains(&&self.final_state) {
            error.append(
                format!(
                    "final state \"{}\" does not exist in \"{}\"",
                    self.final_state, self.identifier
                ),
                Subsystem::Session,
                Severity::Error,
                self.final_state.location.clone(),
            );
        }
        for state in &self.states {
            for transition in &state.transitions {
                if !state_names.contains(&&transition.target) {
                    error.append(
                        format!(
                            "transition from state \"{}\" to non-existent state \"{}\" in \"{}\"",
                            state.name, transition.target, self.identifier
                        ),
                        Subsystem::Session,
                        Severity::Error,
                        transition
                            .target
                            .location
                            .clone()
                            .or_else(|| transition.location.clone()),
                    );
                }
            }
        }
    }

    fn check_duplicate_states(&self, error: &mut Diagnostics) {
        let mut seen: BTreeMap<Identifier, u32> = BTreeMap::new();
        let mut duplicates: Vec<Identifier> = Vec::new();
        for state in &self.states {
            let count = seen.entry(state.name.clone()).or_insert(0);
            *count += 1;
            if *count == 2 {
                duplicates.push(state.name.clone());
            }
        }
        if !duplicates.is_empty() {
            duplicates.sort();
            error.append(
                format!(
                    "duplicate states: {}",
                    duplicates
                        .iter()
                        .map(Identifier::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                Subsystem::Session,
                Severity::Error,
                self.location.clone(),
            );
        }
    }

    fn check_reachability(&self, error: &mut Diagnostics) {
        let mut incoming: Vec<&Identifier> = Vec::new();
        for state in &self.states {
            for transition in &state.transitions {
                incoming.push(&transition.target);
            }
        }
        let unreachable: Vec<String> = self
            .states
            .iter()
            .filter(|s| s.name != self.initial && !incoming.contains(&&s.name))
            .map(|s| s.name.to_string())
            .collect();
        if !unreachable.is_empty() {
            error.append(
                format!("unreachable states {}", unreachable.join(", ")),
                Subsystem::Session,
                Severity::Error,
                self.location.clone(),
            );
        }

        let detached: Vec<String> = self
            .states
            .iter()
            .filter(|s| s.name != self.final_state && s.transitions.is_empty())
            .map(|s| s.name.to_string())
            .collect();
        if !detached.is_empty() {
            error.append(
                format!("detached states {}", detached.join(", ")),
                Subsystem::Session,
                Severity::Error,
                self.location.clone(),
            );
        }
    }

    fn check_conditions(&self, error: &mut Diagnostics) {
        for state in &self.states {
            let scope = self.globals().merged(&state.declarations);
            for transition in &state.transitions {
                transition.validate(&scope, error);
            }
        }
    }

    fn check_actions(&self, error: &mut Diagnostics) {
        for state in &self.states {
            let scope = self.globals().merged(&state.declarations);
            for (index, action) in state.actions.iter().enumerate() {
                let mut sub = Diagnostics::new();
                action.validate(&scope, &mut sub);
                if sub.has_errors() {
                    error.append(
                        format!("invalid action {index} of state {}", state.name),
                        Subsystem::Session,
                        Severity::Error,
                        action.location().cloned(),
                    );
                }
                error.extend(sub);
            }
        }
    }

    fn check_declarations(&self, error: &mut Diagnostics) {
        let globals = self.globals();
        for state in &self.states {
            for (name, declaration) in state.declarations.iter() {
                if self.declarations.contains(name) {
                    error.append(
                        format!(
                            "local variable \"{name}\" shadows global declaration in state {}",
                            state.name
                        ),
                        Subsystem::Session,
                        Severity::Error,
                        declaration.location.clone().or_else(|| self.location.clone()),
                    );
                }
                if !declaration.is_referenced() {
                    error.append(
                        format!("unused local variable \"{name}\" in state {}", state.name),
                        Subsystem::Session,
                        Severity::Error,
                        declaration.location.clone().or_else(|| self.location.clone()),
                    );
                }
                declaration.validate(&globals, error);
            }
        }
        for (name, declaration) in self.declarations.iter() {
            if is_reserved(name) {
                error.append(
                    format!(
                        "{} declaration shadows builtin \"{name}\"",
                        declaration.kind_name()
                    ),
                    Subsystem::Session,
                    Severity::Error,
                    declaration.location.clone().or_else(|| self.location.clone()),
                );
            }
            declaration.validate(&globals, error);
        }
        for (name, declaration) in self.declarations.iter() {
            if matches!(declaration.kind, DeclarationKind::Private) {
                continue;
            }
            if !declaration.is_referenced() {
                error.append(
                    format!("unused {} \"{name}\"", declaration.kind_name()),
                    Subsystem::Session,
                    Severity::Error,
                    declaration.location.clone().or_else(|| self.location.clone()),
                );
            }
        }
    }
}
