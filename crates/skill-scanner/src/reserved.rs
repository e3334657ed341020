/// Parameter names the Executor's own native dispatch function signature
/// reserves for itself. A tool parameter sharing one of these names would
/// collide with the dispatcher's own arguments — the exact failure mode
/// the reserved-parameter fix addresses (a `command` parameter shadowing
/// the dispatcher's own `command` argument). The Executor's dispatch
/// function is written to never use any of these names itself; the
/// Scanner only warns here so skill authors see it at scan time rather
/// than at call time.
pub const RESERVED_PARAMETER_NAMES: &[&str] = &[
    "command",
    "handler",
    "context",
    "skill_name",
    "skill_path",
    "metadata",
    "cwd",
];

/// Whether `name` collides with a reserved dispatcher parameter.
pub fn is_reserved_parameter(name: &str) -> bool {
    RESERVED_PARAMETER_NAMES.contains(&name)
}
