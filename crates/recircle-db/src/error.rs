use thiserror::Error;

/// Business-rule rejections raised by the query layer. They travel inside
/// `anyhow::Error` and are recovered by the API with `downcast_ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient eco coins")]
    InsufficientCoins,
    #[error("Insufficient eco coins for donation")]
    InsufficientCoinsForDonation,
    #[error("User not found")]
    UserNotFound,
    #[error("Item not found")]
    ItemNotFound,
    #[error("Item not available")]
    ItemNotAvailable,
    #[error("You cannot buy your own item")]
    OwnItem,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Project is not active")]
    ProjectInactive,
    #[error("You have already pledged to this project")]
    AlreadyPledged,
    #[error("You have already participated in this event")]
    AlreadyParticipatedInEvent,
    #[error("Already participated")]
    AlreadyParticipated,
    #[error("Event not found")]
    EventNotFound,
    #[error("Enrollment not found")]
    EnrollmentNotFound,
    #[error("Coin balance out of range")]
    CoinOverflow,
    #[error("Guide bonus already claimed")]
    GuideBonusClaimed,
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound
                | Self::ItemNotFound
                | Self::ItemNotAvailable
                | Self::ProjectNotFound
                | Self::EventNotFound
                | Self::EnrollmentNotFound
        )
    }
}
