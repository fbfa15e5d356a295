//! The canonical error taxonomy raised into an [`ExecutionContext`](crate::context::ExecutionContext).
//!
//! Every error carries at least a kind and, in most cases, a diagnostic message --
//! the Rust equivalent of a Duro error type's `msg` possrep.

use thiserror::Error;

/// The error type for all fallible kernel operations.
///
/// Application code should treat most of these as fatal to the current statement;
/// only [`Error::Concurrency`] and [`Error::Deadlock`] are meant to be retried by the
/// caller (see [`Error::is_retryable`]).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // -- resource errors --
    /// The process is out of memory.
    #[error("no memory")]
    NoMemory,
    /// An operating-system or backend-internal failure.
    #[error("system error: {0}")]
    System(String),
    /// A required resource (file, recmap, sequence) could not be found.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    /// The backend requires manual recovery before it can be used again.
    #[error("run recovery: {0}")]
    RunRecovery(String),
    /// On-disk or on-wire data failed an integrity check.
    #[error("data corrupted: {0}")]
    DataCorrupted(String),
    /// An invariant the kernel itself is responsible for was violated.
    #[error("internal error: {0}")]
    Internal(String),
    /// Unrecoverable error; the process should terminate.
    #[error("fatal error: {0}")]
    Fatal(String),
    /// A network or connection failure in the record layer.
    #[error("connection error: {0}")]
    Connection(String),

    // -- semantic errors --
    /// An argument violates a documented precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A value's actual type does not match the type required by the operation.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// A named thing (attribute, table, tuple) does not exist. Doubles as the
    /// end-of-iteration marker for query iterators (see [`Error::is_not_found`]).
    #[error("not found: {0}")]
    NotFound(String),
    /// No operator overload matches the given name and argument types.
    #[error("operator not found: {0}")]
    OperatorNotFound(String),
    /// A named type does not exist in the type system.
    #[error("type not found: {0}")]
    TypeNotFound(String),
    /// A name is malformed or already reserved.
    #[error("name error: {0}")]
    Name(String),
    /// An element (table, type, operator) already exists.
    #[error("element exists: {0}")]
    ElementExists(String),
    /// A candidate key constraint was violated by an insert or update.
    #[error("key violation: {0}")]
    KeyViolation(String),
    /// A `where`-view predicate was violated by an inserted or updated tuple.
    #[error("predicate violation: {0}")]
    PredicateViolation(String),
    /// A scalar type's constraint expression rejected a value.
    #[error("type constraint violation: {0}")]
    TypeConstraintViolation(String),
    /// The requested operation is not supported by this kernel or backend.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// The target of the operation is currently in use and cannot be modified.
    #[error("in use: {0}")]
    InUse(String),
    /// `summarize` was asked for an aggregate function it does not define.
    #[error("aggregate undefined")]
    AggregateUndefined,
    /// A malformed expression or statement was submitted.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// A stored format's version does not match what this kernel expects.
    #[error("version mismatch")]
    VersionMismatch,

    // -- transactional (retryable) errors --
    /// A non-deadlock concurrency conflict was detected by the backend.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
    /// The backend detected a lock-ordering deadlock.
    #[error("deadlock")]
    Deadlock,

    // -- control errors --
    /// An iterator or DML operation was attempted outside of a live transaction.
    #[error("no running transaction")]
    NoRunningTransaction,
}

impl Error {
    /// True for [`Error::NotFound`] -- the normal end-of-iteration signal, which must
    /// never be treated as a hard fault by iterator callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True for errors that a caller may recover from by aborting and retrying the
    /// whole transaction ([`Error::Concurrency`], [`Error::Deadlock`]).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Concurrency(_) | Error::Deadlock)
    }

    /// Shorthand constructor mirroring `RDB_raise_not_found`.
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Error::NotFound(msg.into())
    }

    /// Shorthand constructor mirroring `RDB_raise_type_mismatch`.
    pub fn type_mismatch<T: Into<String>>(msg: T) -> Self {
        Error::TypeMismatch(msg.into())
    }

    /// Shorthand constructor mirroring `RDB_raise_invalid_argument`.
    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Shorthand constructor mirroring `RDB_raise_key_violation`.
    pub fn key_violation<T: Into<String>>(msg: T) -> Self {
        Error::KeyViolation(msg.into())
    }

    /// Shorthand constructor mirroring `RDB_raise_operator_not_found`.
    pub fn operator_not_found<T: Into<String>>(msg: T) -> Self {
        Error::OperatorNotFound(msg.into())
    }

    /// Shorthand constructor mirroring `RDB_raise_type_constraint_violation`.
    pub fn type_constraint_violation<T: Into<String>>(msg: T) -> Self {
        Error::TypeConstraintViolation(msg.into())
    }
}

/// A specialized `Result` type for kernel operations.
pub type Result<T> = std::result::Result<T, Error>;
