use crate::rules::Rule;
use crate::symbols::Symbol;

/// Either kind of constraint attached to a grid, borrowed. Solvers declare support per instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Instruction<'a> {
    /// A rule.
    Rule(&'a Rule),
    /// A symbol.
    Symbol(&'a Symbol),
}

impl Instruction<'_> {
    /// The stable id of the underlying rule or symbol.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Rule(rule) => rule.id(),
            Self::Symbol(symbol) => symbol.id(),
        }
    }
}
