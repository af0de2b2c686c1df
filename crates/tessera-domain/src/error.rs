/// Invariant violations raised by entity constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("role name must not be empty")]
    EmptyRoleName,
}
