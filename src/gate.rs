//! The syntax gate: which positions name a binding rather than read one.
//!
//! Most binding positions never reach the engine as expressions at all,
//! because the tree keeps them in dedicated pattern and key types. The
//! roles are still enumerated in full so every offer site states what it
//! is offering, and so the classification is testable in one place.

/// The role an expression occupies relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// An ordinary value read. The only substitutable role.
    Read,
    /// The local or imported name of an import specifier.
    ImportName,
    /// The local or exported name of an export specifier.
    ExportName,
    /// The id of a variable declarator.
    DeclId,
    /// A function, method, or arrow parameter.
    Param,
    /// The target of a default-value pattern (`x = default`).
    DefaultTarget,
    /// An array-pattern element.
    ArrayPatElem,
    /// A rest element's argument.
    RestArg,
    /// A function declaration or expression name.
    FuncId,
    /// A class name.
    ClassId,
    /// A non-computed object-literal or class-member key.
    PropKey,
    /// The destructured value slot of an object-pattern property.
    PatValue,
    /// The target of an assignment, compound included.
    AssignTarget,
    /// The non-computed property of a member access.
    MemberProp,
}

/// Is substitution forbidden in this role?
///
/// True for every role that names a binding or property; only [Role::Read]
/// passes.
pub fn is_binding_position(role: Role) -> bool {
    !matches!(role, Role::Read)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_reads_pass() {
        assert!(!is_binding_position(Role::Read));
        for role in [
            Role::ImportName,
            Role::ExportName,
            Role::DeclId,
            Role::Param,
            Role::DefaultTarget,
            Role::ArrayPatElem,
            Role::RestArg,
            Role::FuncId,
            Role::ClassId,
            Role::PropKey,
            Role::PatValue,
            Role::AssignTarget,
            Role::MemberProp,
        ] {
            assert!(is_binding_position(role), "{role:?}");
        }
    }
}
