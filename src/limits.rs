//! Size bounds referenced throughout the pipeline.
//!
//! These mirror the constants of the reference C interpreter this crate is
//! modeled on: a small, fixed set of caps that turn pathological programs
//! into a reported error instead of unbounded host resource use.

/// Maximum number of arguments accepted at a call site (and parameters in a
/// function/method declaration). One token past this is a parse error.
pub const MAX_ARG_COUNT: usize = 8;

/// Maximum number of local declarations resolvable within a single scope.
pub const MAX_LOCALS: usize = 255;

/// Soft bound on the number of slots in a single local environment. Local
/// environments grow by one slot per declaration and are never expected to
/// approach this, since `MAX_LOCALS` already caps declarations per scope.
pub const LOCAL_CAP: usize = 256;

/// Soft bound on the number of fields an instance may carry.
pub const INSTANCE_FIELD_CAP: usize = 256;

/// Minimum capacity of the global environment's open-addressed table.
/// Always a power of two; grows by doubling when the load factor crosses
/// [`GLOBAL_TABLE_MAX_LOAD`].
pub const GLOBAL_TABLE_MIN_CAPACITY: usize = 512;

/// Load factor above which the global table grows.
pub const GLOBAL_TABLE_MAX_LOAD: f64 = 0.75;

/// Depth of the evaluator's lock stack. Exhausting it is reported as a
/// runtime "Stack overflow." error and doubles as the recursion limit for
/// deeply nested expressions and calls.
pub const LOCK_CAP: usize = 4096;

/// Absolute cap on live environments the collector will allocate. Reached
/// only by pathological recursion that outpaces collection.
pub const MAX_ENVIRONMENTS: usize = 31 * 1024;

/// Sentinel mark value meaning "never visited this collection era".
pub const GC_CLEAR: i64 = -1;

/// `visited`/`recycled` markers wrap back to 0/1 once they reach this value,
/// so they never collide with a stale tag left on a long-lived object.
pub const GC_MARK_WRAP: i64 = 1 << 30;
