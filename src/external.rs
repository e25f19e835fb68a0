use concordium_cis1::TokenIdVec;
use concordium_std::*;

/// Token identifier type accepted from custodian contracts.
pub type ContractTokenId = TokenIdVec;

/// Fully qualified token: custodian contract address and token identifier.
#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct Token {
    /// NFT contract address.
    pub contract: ContractAddress,
    /// NFT token identifier.
    pub id: ContractTokenId,
}

/// Listing identifier, derived from the (contract, token id) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SchemaType)]
pub struct AuctionId(pub [u8; 32]);

/// Parameter of the `deposit` entrypoint.
#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct DepositParams {
    /// Token to put up for auction.
    pub token: Token,
    /// Slot time after which bidding closes.
    pub deadline: Timestamp,
    /// Smallest highest bid that makes the listing claimable.
    pub reserve_price: Amount,
}

/// Parameter of the `viewEscrow` entrypoint.
#[derive(Debug, Serialize, SchemaType)]
pub struct EscrowQueryParams {
    pub auction_id: AuctionId,
    pub account: AccountAddress,
}

/// Return value of the `getAuctionId` entrypoint.
#[derive(Debug, PartialEq, Eq, Serialize, SchemaType)]
pub struct AuctionIdQueryResponse {
    /// Derived listing identifier.
    pub auction_id: AuctionId,
    /// Comparison of the stored creator field against the null account.
    /// Set while the identifier holds no live record.
    pub exists: bool,
}
