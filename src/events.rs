use concordium_std::*;

use crate::external::{AuctionId, ContractTokenId};

/// Tag for the listing creation event.
pub const DEPOSIT_TAG: u8 = u8::MAX - 1;

/// Tag for the bid event.
pub const BID_TAG: u8 = u8::MAX - 2;

/// Tag for the escrow withdrawal event.
pub const WITHDRAW_TAG: u8 = u8::MAX - 3;

/// Tag for the successful settlement event.
pub const CLAIM_TAG: u8 = u8::MAX - 4;

/// Tag for the unsuccessful settlement event.
pub const SELLER_END_TAG: u8 = u8::MAX - 5;

/// Listing creation event data.
#[derive(Debug, Serial)]
pub struct DepositEvent<'a> {
    /// NFT contract address.
    pub contract: &'a ContractAddress,
    /// NFT token identifier.
    pub id: &'a ContractTokenId,
    /// Account that opened the listing.
    pub creator: &'a AccountAddress,
    /// Slot time after which bidding closes.
    pub deadline: Timestamp,
    /// Smallest highest bid that makes the listing claimable.
    pub reserve_price: Amount,
}

/// Bid event data.
#[derive(Debug, Serial)]
pub struct BidEvent<'a> {
    /// Listing identifier.
    pub auction_id: &'a AuctionId,
    /// Bidder account address.
    pub bidder: &'a AccountAddress,
    /// Raw bid amount attached to the call.
    pub amount: Amount,
}

/// Escrow withdrawal event data.
#[derive(Debug, Serial)]
pub struct WithdrawEvent<'a> {
    /// Listing identifier.
    pub auction_id: &'a AuctionId,
    /// Account whose escrow was paid out.
    pub account: &'a AccountAddress,
    /// Amount paid out. Zero when the ledger held nothing.
    pub amount: Amount,
}

/// Successful settlement event data.
#[derive(Debug, Serial)]
pub struct ClaimEvent<'a> {
    /// NFT contract address.
    pub contract: &'a ContractAddress,
    /// NFT token identifier.
    pub id: &'a ContractTokenId,
    /// Account that opened the listing.
    pub seller: &'a AccountAddress,
    /// Account that won the listing.
    pub winner: &'a AccountAddress,
    /// Winning bid, paid to the seller.
    pub price: Amount,
    /// Escrow surplus returned to the winner.
    pub refund: Amount,
}

/// Unsuccessful settlement event data.
#[derive(Debug, Serial)]
pub struct SellerEndEvent<'a> {
    /// NFT contract address.
    pub contract: &'a ContractAddress,
    /// NFT token identifier.
    pub id: &'a ContractTokenId,
    /// Account that opened the listing and takes the token back.
    pub seller: &'a AccountAddress,
}

/// Tagged event to be serialized for the event log.
#[derive(Debug)]
pub enum AuctionEvent<'a> {
    Deposit(DepositEvent<'a>),
    Bid(BidEvent<'a>),
    Withdraw(WithdrawEvent<'a>),
    Claim(ClaimEvent<'a>),
    SellerEnd(SellerEndEvent<'a>),
}

impl<'a> AuctionEvent<'a> {
    pub fn deposit(
        contract: &'a ContractAddress,
        id: &'a ContractTokenId,
        creator: &'a AccountAddress,
        deadline: Timestamp,
        reserve_price: Amount,
    ) -> Self {
        Self::Deposit(DepositEvent {
            contract,
            id,
            creator,
            deadline,
            reserve_price,
        })
    }

    pub fn bid(auction_id: &'a AuctionId, bidder: &'a AccountAddress, amount: Amount) -> Self {
        Self::Bid(BidEvent {
            auction_id,
            bidder,
            amount,
        })
    }

    pub fn withdraw(
        auction_id: &'a AuctionId,
        account: &'a AccountAddress,
        amount: Amount,
    ) -> Self {
        Self::Withdraw(WithdrawEvent {
            auction_id,
            account,
            amount,
        })
    }

    pub fn claim(
        contract: &'a ContractAddress,
        id: &'a ContractTokenId,
        seller: &'a AccountAddress,
        winner: &'a AccountAddress,
        price: Amount,
        refund: Amount,
    ) -> Self {
        Self::Claim(ClaimEvent {
            contract,
            id,
            seller,
            winner,
            price,
            refund,
        })
    }

    pub fn seller_end(
        contract: &'a ContractAddress,
        id: &'a ContractTokenId,
        seller: &'a AccountAddress,
    ) -> Self {
        Self::SellerEnd(SellerEndEvent {
            contract,
            id,
            seller,
        })
    }
}

impl<'a> Serial for AuctionEvent<'a> {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            AuctionEvent::Deposit(event) => {
                out.write_u8(DEPOSIT_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Bid(event) => {
                out.write_u8(BID_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Withdraw(event) => {
                out.write_u8(WITHDRAW_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Claim(event) => {
                out.write_u8(CLAIM_TAG)?;
                event.serial(out)
            }
            AuctionEvent::SellerEnd(event) => {
                out.write_u8(SELLER_END_TAG)?;
                event.serial(out)
            }
        }
    }
}
