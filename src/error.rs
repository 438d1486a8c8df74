use thiserror::Error;

use crate::codegen::dest::DataDest;

/// Errors raised while reading or compiling a program.
///
/// Every error is fatal at the point of detection: generation aborts and no
/// partial listing is produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A pair whose head is neither a built-in operator nor a declared
    /// subroutine name.
    #[error("unsupported form: {0}")]
    UnsupportedForm(String),

    /// A reference to a name that is not in the symbol table.
    #[error("symbol not declared: {0}")]
    UndeclaredSymbol(String),

    /// `int16` or `sub` naming a symbol that already exists.
    #[error("symbol already defined: {0}")]
    Redeclaration(String),

    /// Subroutines are nullary; a call form carried operands.
    #[error("arguments to subroutines not supported: {0}")]
    SubArguments(String),

    /// A transfer size other than `byte` or `word`.
    #[error("unsupported transfer size: {0}")]
    UnsupportedSize(String),

    /// A value was routed to a destination the selected load path cannot
    /// materialize into.
    #[error("unsupported data destination: {0:?}")]
    UnsupportedDest(DataDest),

    /// A form with too few or too many operands.
    #[error("malformed `{form}` form: expected {expected}")]
    MissingOperand { form: String, expected: String },

    /// An empty or malformed numeric token.
    #[error("malformed number: {0:?}")]
    NumberSyntax(String),

    /// Reader errors: unbalanced parentheses, stray `)`, bad dotted tails,
    /// or a symbol expected where a list was found.
    #[error("syntax error: {0}")]
    Syntax(String),
}
