//! Identity registration status.

/// On-chain registration state of an identity with the registry contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Never submitted a registration transaction.
    Unregistered,
    /// Registration transaction submitted, not yet confirmed.
    InProgress,
    /// Registration confirmed on-chain.
    Registered,
    /// Registration transaction failed or was rejected.
    Error,
}

impl RegistrationStatus {
    /// Whether this status represents a confirmed registration.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}
