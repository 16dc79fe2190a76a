/*!
Error types for the reduction pipeline.

One top-level [`AcoacError`] union, with a variant per concern, each
wrapping a focused sub-enum. Callers match on the sub-enum when they
need detail and on the top-level type when they just need to propagate.
*/

use std::fmt;

#[derive(Debug)]
pub enum AcoacError {
    Input(InputError),
    Translation(TranslationError),
    Checker(CheckerError),
    Overflow(OverflowError),
    InternalInvariant(InternalInvariantError),
}

impl fmt::Display for AcoacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcoacError::Input(e) => write!(f, "input error: {e}"),
            AcoacError::Translation(e) => write!(f, "translation error: {e}"),
            AcoacError::Checker(e) => write!(f, "checker error: {e}"),
            AcoacError::Overflow(e) => write!(f, "overflow: {e}"),
            AcoacError::InternalInvariant(e) => write!(f, "internal invariant violated: {e}"),
        }
    }
}

impl std::error::Error for AcoacError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcoacError::Input(e) => Some(e),
            AcoacError::Translation(e) => Some(e),
            AcoacError::Checker(e) => Some(e),
            AcoacError::Overflow(e) => Some(e),
            AcoacError::InternalInvariant(e) => Some(e),
        }
    }
}

/// Malformed or semantically inconsistent input, attributable to the
/// `.aabac`/`.arbac` file the caller supplied.
#[derive(Debug)]
pub enum InputError {
    Io(std::io::Error),
    UnrecognizedExtension(String),
    Syntax { line: usize, message: String },
    UnknownAttribute(String),
    UnknownUser(usize),
    QueryUserOutOfRange(usize),
    QueryValueNotInDomain,
    MissingBottomInDomain(String),
    DuplicateAttribute(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Io(e) => write!(f, "{e}"),
            InputError::UnrecognizedExtension(ext) => {
                write!(f, "unrecognized file extension {ext:?}, expected .aabac or .arbac")
            }
            InputError::Syntax { line, message } => write!(f, "line {line}: {message}"),
            InputError::UnknownAttribute(name) => write!(f, "unknown attribute {name:?}"),
            InputError::UnknownUser(idx) => write!(f, "unknown user index {idx}"),
            InputError::QueryUserOutOfRange(idx) => write!(f, "query references user {idx}, out of range"),
            InputError::QueryValueNotInDomain => write!(f, "query value is not in the attribute's domain"),
            InputError::MissingBottomInDomain(attr) => {
                write!(f, "attribute {attr:?} domain does not declare the bottom value")
            }
            InputError::DuplicateAttribute(name) => write!(f, "attribute {name:?} declared twice"),
        }
    }
}

impl std::error::Error for InputError {}

impl From<std::io::Error> for InputError {
    fn from(e: std::io::Error) -> Self {
        InputError::Io(e)
    }
}

impl From<InputError> for AcoacError {
    fn from(e: InputError) -> Self {
        AcoacError::Input(e)
    }
}

/// Failure while translating a parsed instance to NuSMV source, or an
/// ARBAC instance to ACoAC form.
#[derive(Debug)]
pub enum TranslationError {
    UnsupportedConstruct(String),
    Io(std::io::Error),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::UnsupportedConstruct(what) => write!(f, "cannot translate: {what}"),
            TranslationError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TranslationError {}

impl From<std::io::Error> for TranslationError {
    fn from(e: std::io::Error) -> Self {
        TranslationError::Io(e)
    }
}

impl From<TranslationError> for AcoacError {
    fn from(e: TranslationError) -> Self {
        AcoacError::Translation(e)
    }
}

/// Failure to run, or make sense of the output of, the external checker
/// process.
#[derive(Debug)]
pub enum CheckerError {
    Spawn(std::io::Error),
    Timeout,
    NonZeroExit(i32),
    KilledBySignal,
    UnparsableOutput(String),
}

impl fmt::Display for CheckerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckerError::Spawn(e) => write!(f, "failed to launch checker: {e}"),
            CheckerError::Timeout => write!(f, "checker exceeded its time budget"),
            CheckerError::NonZeroExit(code) => write!(f, "checker exited with status {code}"),
            CheckerError::KilledBySignal => write!(f, "checker was killed by a signal"),
            CheckerError::UnparsableOutput(snippet) => {
                write!(f, "could not parse checker output: {snippet}")
            }
        }
    }
}

impl std::error::Error for CheckerError {}

impl From<CheckerError> for AcoacError {
    fn from(e: CheckerError) -> Self {
        AcoacError::Checker(e)
    }
}

/// A computed quantity (a bound, a BigInt operation) exceeded a hard
/// representational limit.
#[derive(Debug)]
pub enum OverflowError {
    BoundTooLarge,
    BigIntMagnitudeTooLarge,
}

impl fmt::Display for OverflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowError::BoundTooLarge => write!(f, "computed bound exceeds representable range"),
            OverflowError::BigIntMagnitudeTooLarge => write!(f, "bigint magnitude exceeds the representable length"),
        }
    }
}

impl std::error::Error for OverflowError {}

impl From<OverflowError> for AcoacError {
    fn from(e: OverflowError) -> Self {
        AcoacError::Overflow(e)
    }
}

/// A structural invariant the pipeline itself is responsible for
/// maintaining was found violated. Always a programming bug, never a
/// user-facing condition.
#[derive(Debug)]
pub enum InternalInvariantError {
    InitOutOfDomain { user: usize, attr: usize },
    AdminNotAUser(usize),
    RuleBadAttribute,
    RuleBadValue,
    AbsRefRoundMismatch,
    SliceLostQueryUser,
}

impl fmt::Display for InternalInvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalInvariantError::InitOutOfDomain { user, attr } => {
                write!(f, "user {user} attribute {attr} initial value is outside its domain")
            }
            InternalInvariantError::AdminNotAUser(idx) => write!(f, "administrator index {idx} is not a user"),
            InternalInvariantError::RuleBadAttribute => write!(f, "rule targets an unknown attribute"),
            InternalInvariantError::RuleBadValue => write!(f, "rule references a value outside its attribute's domain"),
            InternalInvariantError::AbsRefRoundMismatch => {
                write!(f, "abstraction-refinement round counter desynchronized from recorded closures")
            }
            InternalInvariantError::SliceLostQueryUser => {
                write!(f, "slicing dropped a user the query still refers to")
            }
        }
    }
}

impl std::error::Error for InternalInvariantError {}

impl From<InternalInvariantError> for AcoacError {
    fn from(e: InternalInvariantError) -> Self {
        AcoacError::InternalInvariant(e)
    }
}
