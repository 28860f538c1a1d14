//! Clause context of the conversion.

/// The clause an expression is converted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Clause {
    From,
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Set,
}

/// Explicit stack of clauses; sub-queries push on top of their enclosing clause.
#[derive(Debug, Default)]
pub(crate) struct ClauseStack {
    stack: Vec<Clause>,
}

impl ClauseStack {
    pub fn push(&mut self, clause: Clause) {
        self.stack.push(clause);
    }

    pub fn pop(&mut self) -> Option<Clause> {
        self.stack.pop()
    }

    pub fn current(&self) -> Option<Clause> {
        self.stack.last().copied()
    }
}
