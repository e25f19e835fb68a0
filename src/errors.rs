use concordium_std::*;

/// The custom errors the contract can produce.
#[derive(Serialize, Debug, PartialEq, Eq, Reject, SchemaType)]
pub enum CustomContractError {
    /// Failed parsing the parameter (Error code: -1).
    #[from(ParseError)]
    ParseParams,
    /// Failed logging: Log is full (Error code: -2).
    LogFull,
    /// Failed logging: Log is malformed (Error code: -3).
    LogMalformed,
    /// Only account addresses can interact with listings (Error code: -4).
    OnlyAccountAddress,
    /// Listing deadline is behind the current slot time (Error code: -5).
    DeadlineInPast,
    /// A live listing already occupies this identifier (Error code: -6).
    AlreadyExists,
    /// Bidding is closed for this listing (Error code: -7).
    AuctionOver,
    /// Bid does not exceed the current highest bid (Error code: -8).
    BidTooLow,
    /// Settlement requested before the deadline passed (Error code: -9).
    AuctionStillActive,
    /// The recorded winner must claim instead of withdrawing (Error code: -10).
    WinnerCannotWithdraw,
    /// Only the recorded highest bidder may claim (Error code: -11).
    OnlyWinnerCanCall,
    /// Only the listing creator may end it (Error code: -12).
    OnlySellerCanCall,
    /// Reserve was not met, only the seller can end the listing
    /// (Error code: -13).
    SellerMustFormallyEnd,
    /// Reserve was met, the winner has to claim (Error code: -14).
    ReserveMetMustClaim,
    /// Re-entrant invocation of a guarded entrypoint (Error code: -15).
    Reentrancy,
    /// The escrow ledger disagrees with the recorded highest bid
    /// (Error code: -16).
    BidMapError,
    /// Failed to invoke a contract (Error code: -17).
    InvokeContractError,
    /// Failed to invoke a transfer (Error code: -18).
    InvokeTransferError,
    /// Incompatible token contract (Error code: -19).
    Incompatible,
}

/// Mapping the logging errors to CustomContractError.
impl From<LogError> for CustomContractError {
    fn from(le: LogError) -> Self {
        match le {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

/// Mapping errors related to contract invocations to CustomContractError.
impl<T> From<CallContractError<T>> for CustomContractError {
    fn from(_cce: CallContractError<T>) -> Self {
        Self::InvokeContractError
    }
}

/// Mapping errors related to transfer invocations to CustomContractError.
impl From<TransferError> for CustomContractError {
    fn from(_te: TransferError) -> Self {
        Self::InvokeTransferError
    }
}
