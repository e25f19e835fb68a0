use concordium_std::*;
use sha3::{Digest, Keccak256};

use crate::errors::CustomContractError;
use crate::events::AuctionEvent;
use crate::external::*;
use crate::nft;
use crate::state::{AuctionRecord, State, NULL_ACCOUNT};

/// Derive the listing identifier for a (contract, token id) pair.
///
/// Token identifiers are variable length, so the identifier is collapsed to
/// a 32 byte digest first. The outer preimage then consists of fixed-width
/// fields only, which keeps distinct pairs from sharing a preimage.
pub fn auction_id(token: &Token) -> AuctionId {
    let mut hasher = Keccak256::default();
    hasher.update(token.id.0.as_slice());
    let item_digest = hasher.finalize_reset();
    hasher.update(token.contract.index.to_be_bytes());
    hasher.update(token.contract.subindex.to_be_bytes());
    hasher.update(item_digest);
    AuctionId(hasher.finalize_reset().into())
}

/// Initialize the auction contract with no listings.
#[init(contract = "NftEscrowAuction")]
fn init<S: HasStateApi>(
    _ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    Ok(State::new(state_builder))
}

/// Open a listing for a token.
///
/// The caller keeps no control over the token for the lifetime of the
/// listing: the custodian contract is asked to move it out of the caller's
/// account, and rejects the whole call if this contract was not authorized
/// as operator.
#[receive(
    mutable,
    contract = "NftEscrowAuction",
    name = "deposit",
    parameter = "DepositParams",
    enable_logger
)]
fn deposit<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let params = DepositParams::deserial(&mut ctx.parameter_cursor())?;

    let creator = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::OnlyAccountAddress.into()),
    };

    host.state_mut().lock()?;

    let id = auction_id(&params.token);
    ensure!(
        !host.state().record(&id).is_live(),
        CustomContractError::AlreadyExists.into()
    );
    // A deadline equal to the current slot time is still acceptable.
    ensure!(
        ctx.metadata().slot_time() <= params.deadline,
        CustomContractError::DeadlineInPast.into()
    );

    host.state_mut().put_record(
        id,
        AuctionRecord {
            creator,
            deadline: params.deadline,
            reserve_price: params.reserve_price,
            highest_bid: Amount::zero(),
            highest_bidder: NULL_ACCOUNT,
        },
    );

    logger.log(&AuctionEvent::deposit(
        &params.token.contract,
        &params.token.id,
        &creator,
        params.deadline,
        params.reserve_price,
    ))?;

    // The custody target is the null account, not this contract; the
    // settlement paths still transfer the token out from this contract's
    // own address.
    nft::transfer(host, params.token, Address::Account(creator), NULL_ACCOUNT)?;

    host.state_mut().unlock();

    Ok(())
}

/// Place a bid on a listing. The attached CCD is added to the caller's
/// cumulative escrow for this listing.
///
/// The highest bid fields are overwritten with the raw attached amount even
/// when the caller is already the highest bidder, so a winner's escrow may
/// exceed the recorded highest bid; the surplus comes back at claim time.
#[receive(
    mutable,
    payable,
    contract = "NftEscrowAuction",
    name = "bid",
    parameter = "AuctionId",
    enable_logger
)]
fn bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let id = AuctionId::deserial(&mut ctx.parameter_cursor())?;

    let bidder = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::OnlyAccountAddress.into()),
    };

    host.state_mut().lock()?;

    let mut record = host.state().record(&id);
    ensure!(
        ctx.metadata().slot_time() <= record.deadline,
        CustomContractError::AuctionOver.into()
    );
    ensure!(
        amount > record.highest_bid,
        CustomContractError::BidTooLow.into()
    );

    record.highest_bid = amount;
    record.highest_bidder = bidder;
    host.state_mut().put_record(id, record);
    host.state_mut().add_escrow(id, bidder, amount);

    logger.log(&AuctionEvent::bid(&id, &bidder, amount))?;

    host.state_mut().unlock();

    Ok(())
}

/// Withdraw the caller's escrow after the deadline.
///
/// The winner of a listing whose reserve was met has to use `claimNft`
/// instead. Withdrawing with an empty ledger entry succeeds and transfers
/// nothing, so repeated withdrawals are harmless.
#[receive(
    mutable,
    contract = "NftEscrowAuction",
    name = "withdrawBid",
    parameter = "AuctionId",
    enable_logger
)]
fn withdraw_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let id = AuctionId::deserial(&mut ctx.parameter_cursor())?;

    let caller = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::OnlyAccountAddress.into()),
    };

    host.state_mut().lock()?;

    let record = host.state().record(&id);
    ensure!(
        ctx.metadata().slot_time() > record.deadline,
        CustomContractError::AuctionStillActive.into()
    );
    ensure!(
        !(record.reserve_met() && record.highest_bidder == caller),
        CustomContractError::WinnerCannotWithdraw.into()
    );

    // The ledger entry is zeroed before the payment, so a re-entrant
    // withdrawal observes an empty balance.
    let amount = host.state_mut().take_escrow(&id, &caller);

    logger.log(&AuctionEvent::withdraw(&id, &caller, amount))?;

    if amount > Amount::zero() {
        host.invoke_transfer(&caller, amount)?;
    }

    host.state_mut().unlock();

    Ok(())
}

/// Claim the token of a won listing.
///
/// Pays the winning bid to the creator and refunds the caller's escrow
/// surplus. The token transfer and both payments succeed together or the
/// whole call rejects.
#[receive(
    mutable,
    contract = "NftEscrowAuction",
    name = "claimNft",
    parameter = "Token",
    enable_logger
)]
fn claim_nft<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let token = Token::deserial(&mut ctx.parameter_cursor())?;

    let caller = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::OnlyAccountAddress.into()),
    };

    host.state_mut().lock()?;

    let id = auction_id(&token);
    let record = host.state().record(&id);
    ensure!(
        ctx.metadata().slot_time() > record.deadline,
        CustomContractError::AuctionStillActive.into()
    );
    ensure!(
        record.reserve_met(),
        CustomContractError::SellerMustFormallyEnd.into()
    );
    ensure!(
        record.highest_bidder == caller,
        CustomContractError::OnlyWinnerCanCall.into()
    );

    // The winner's ledger entry covers the highest bid at all times; the
    // difference is whatever they escrowed beyond the winning bid.
    let total_escrow = host.state_mut().take_escrow(&id, &caller);
    let leftover = Amount::from_micro_ccd(
        total_escrow
            .micro_ccd
            .checked_sub(record.highest_bid.micro_ccd)
            .ok_or(CustomContractError::BidMapError)?,
    );

    // The record stays in the registry, so this identifier can never hold a
    // listing again.
    logger.log(&AuctionEvent::claim(
        &token.contract,
        &token.id,
        &record.creator,
        &caller,
        record.highest_bid,
        leftover,
    ))?;

    nft::transfer(host, token, Address::Contract(ctx.self_address()), caller)?;
    host.invoke_transfer(&record.creator, record.highest_bid)?;
    if leftover > Amount::zero() {
        host.invoke_transfer(&caller, leftover)?;
    }

    host.state_mut().unlock();

    Ok(())
}

/// End a listing whose reserve was not met, returning the token to the
/// creator.
///
/// The listing record is removed entirely. Bidders' ledger entries are left
/// untouched and stay withdrawable through `withdrawBid`.
#[receive(
    mutable,
    contract = "NftEscrowAuction",
    name = "sellerEndAuction",
    parameter = "Token",
    enable_logger
)]
fn seller_end_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let token = Token::deserial(&mut ctx.parameter_cursor())?;

    let caller = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::OnlyAccountAddress.into()),
    };

    host.state_mut().lock()?;

    let id = auction_id(&token);
    let record = host.state().record(&id);
    // A vacant record carries the null creator, so unknown identifiers are
    // rejected here as well.
    ensure!(
        record.creator == caller,
        CustomContractError::OnlySellerCanCall.into()
    );
    ensure!(
        ctx.metadata().slot_time() > record.deadline,
        CustomContractError::AuctionStillActive.into()
    );
    ensure!(
        !record.reserve_met(),
        CustomContractError::ReserveMetMustClaim.into()
    );

    host.state_mut().remove_record(&id);

    logger.log(&AuctionEvent::seller_end(
        &token.contract,
        &token.id,
        &caller,
    ))?;

    nft::transfer(host, token, Address::Contract(ctx.self_address()), caller)?;

    host.state_mut().unlock();

    Ok(())
}

/// Derive the identifier for a (contract, token id) pair together with an
/// occupancy flag.
///
/// The flag compares the stored creator field against the null account, so
/// it reads `true` while the identifier holds no live record.
#[receive(
    contract = "NftEscrowAuction",
    name = "getAuctionId",
    parameter = "Token",
    return_value = "AuctionIdQueryResponse"
)]
fn get_auction_id<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<AuctionIdQueryResponse> {
    let token = Token::deserial(&mut ctx.parameter_cursor())?;
    let id = auction_id(&token);
    let exists = host.state().record(&id).creator == NULL_ACCOUNT;
    Ok(AuctionIdQueryResponse {
        auction_id: id,
        exists,
    })
}

/// View the full listing record for an identifier. Identifiers without a
/// stored listing return the vacant record.
#[receive(
    contract = "NftEscrowAuction",
    name = "view",
    parameter = "AuctionId",
    return_value = "AuctionRecord"
)]
fn view_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<AuctionRecord> {
    let id = AuctionId::deserial(&mut ctx.parameter_cursor())?;
    Ok(host.state().record(&id))
}

/// View an account's cumulative escrow against a listing.
#[receive(
    contract = "NftEscrowAuction",
    name = "viewEscrow",
    parameter = "EscrowQueryParams",
    return_value = "Amount"
)]
fn view_escrow<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<Amount> {
    let params = EscrowQueryParams::deserial(&mut ctx.parameter_cursor())?;
    Ok(host.state().escrow_of(&params.auction_id, &params.account))
}

/// Acceptance callback invoked by the custodian on transfer-in. CIS-1
/// treats a rejecting callback as a refused transfer, so this acknowledges
/// unconditionally without inspecting the payload.
#[receive(contract = "NftEscrowAuction", name = "onReceivingCIS1")]
fn on_receiving_cis1<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    _host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<()> {
    Ok(())
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis1::{Receiver, TokenIdVec, TransferParams};
    use concordium_std::test_infrastructure::*;

    const SELF_ADDRESS: ContractAddress = ContractAddress {
        index: 0,
        subindex: 0,
    };
    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };

    const SELLER: AccountAddress = AccountAddress([1; 32]);
    const BIDDER_1: AccountAddress = AccountAddress([2; 32]);
    const BIDDER_2: AccountAddress = AccountAddress([3; 32]);
    const OUTSIDER: AccountAddress = AccountAddress([4; 32]);

    const RESERVE: Amount = Amount::from_micro_ccd(10);
    const DEADLINE_MILLIS: u64 = 100;

    fn deadline() -> Timestamp {
        Timestamp::from_timestamp_millis(DEADLINE_MILLIS)
    }

    fn test_token() -> Token {
        Token {
            contract: NFT_CONTRACT,
            id: TokenIdVec(vec![0, 1]),
        }
    }

    fn test_id() -> AuctionId {
        auction_id(&test_token())
    }

    fn receive_ctx<'a>(
        sender: AccountAddress,
        slot_millis: u64,
        parameter: &'a [u8],
    ) -> TestReceiveContext<'a> {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_sender(Address::Account(sender))
            .set_invoker(sender)
            .set_self_address(SELF_ADDRESS)
            .set_parameter(parameter)
            .set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_millis));
        ctx
    }

    fn fresh_host() -> TestHost<State<TestStateApi>> {
        let ctx = TestInitContext::empty();
        let mut state_builder = TestStateBuilder::new();
        let state =
            init(&ctx, &mut state_builder).expect_report("Failed during init_NftEscrowAuction");
        TestHost::new(state, state_builder)
    }

    /// Mock of the custodian `transfer` entrypoint that checks the payload.
    fn transfer_mock(
        expected_from: Address,
        expected_to: AccountAddress,
    ) -> MockFn<State<TestStateApi>> {
        MockFn::new_v1(move |param, _, _, _| {
            let transfers = TransferParams::<TokenIdVec>::deserial(&mut Cursor::new(param.as_ref()))
                .map_err(|_| CallContractError::Trap)?;
            let transfer = transfers.0.first().ok_or(CallContractError::Trap)?;
            if transfer.from != expected_from {
                return Err(CallContractError::Trap);
            }
            match &transfer.to {
                Receiver::Account(account) if *account == expected_to => (),
                _ => return Err(CallContractError::Trap),
            }
            Ok((true, ()))
        })
    }

    fn call_deposit(
        host: &mut TestHost<State<TestStateApi>>,
        sender: AccountAddress,
        slot_millis: u64,
        deadline: Timestamp,
    ) -> ReceiveResult<()> {
        let params = DepositParams {
            token: test_token(),
            deadline,
            reserve_price: RESERVE,
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(sender, slot_millis, &bytes);
        let mut logger = TestLogger::init();
        deposit(&ctx, host, &mut logger)
    }

    fn call_bid(
        host: &mut TestHost<State<TestStateApi>>,
        bidder: AccountAddress,
        slot_millis: u64,
        amount: Amount,
    ) -> ReceiveResult<()> {
        let bytes = to_bytes(&test_id());
        let ctx = receive_ctx(bidder, slot_millis, &bytes);
        let mut logger = TestLogger::init();
        bid(&ctx, host, amount, &mut logger)
    }

    fn call_withdraw(
        host: &mut TestHost<State<TestStateApi>>,
        account: AccountAddress,
        slot_millis: u64,
    ) -> ReceiveResult<()> {
        let bytes = to_bytes(&test_id());
        let ctx = receive_ctx(account, slot_millis, &bytes);
        let mut logger = TestLogger::init();
        withdraw_bid(&ctx, host, &mut logger)
    }

    fn call_claim(
        host: &mut TestHost<State<TestStateApi>>,
        account: AccountAddress,
        slot_millis: u64,
    ) -> ReceiveResult<()> {
        let bytes = to_bytes(&test_token());
        let ctx = receive_ctx(account, slot_millis, &bytes);
        let mut logger = TestLogger::init();
        claim_nft(&ctx, host, &mut logger)
    }

    fn call_seller_end(
        host: &mut TestHost<State<TestStateApi>>,
        account: AccountAddress,
        slot_millis: u64,
    ) -> ReceiveResult<()> {
        let bytes = to_bytes(&test_token());
        let ctx = receive_ctx(account, slot_millis, &bytes);
        let mut logger = TestLogger::init();
        seller_end_auction(&ctx, host, &mut logger)
    }

    fn query_record(host: &TestHost<State<TestStateApi>>) -> AuctionRecord {
        let bytes = to_bytes(&test_id());
        let mut ctx = TestReceiveContext::empty();
        ctx.set_parameter(&bytes);
        view_auction(&ctx, host).expect_report("view should not reject")
    }

    fn query_escrow(host: &TestHost<State<TestStateApi>>, account: AccountAddress) -> Amount {
        let params = EscrowQueryParams {
            auction_id: test_id(),
            account,
        };
        let bytes = to_bytes(&params);
        let mut ctx = TestReceiveContext::empty();
        ctx.set_parameter(&bytes);
        view_escrow(&ctx, host).expect_report("viewEscrow should not reject")
    }

    fn query_auction_id(host: &TestHost<State<TestStateApi>>) -> AuctionIdQueryResponse {
        let bytes = to_bytes(&test_token());
        let mut ctx = TestReceiveContext::empty();
        ctx.set_parameter(&bytes);
        get_auction_id(&ctx, host).expect_report("getAuctionId should not reject")
    }

    /// Host with the standard listing deposited by SELLER: reserve of 10
    /// micro CCD, deadline at slot 100.
    fn listed_host() -> TestHost<State<TestStateApi>> {
        let mut host = fresh_host();
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            transfer_mock(Address::Account(SELLER), NULL_ACCOUNT),
        );
        call_deposit(&mut host, SELLER, 0, deadline()).expect_report("deposit should succeed");
        host
    }

    /// A rejected update is rolled back in full by the chain. The rejected
    /// calls in these tests write nothing before rejecting except the
    /// guard, which is reset here for the host to stay usable.
    fn rollback(host: &mut TestHost<State<TestStateApi>>) {
        host.state_mut().unlock();
    }

    #[concordium_test]
    fn test_init() {
        let host = fresh_host();
        claim!(!host.state().locked);
        let record = query_record(&host);
        claim!(!record.is_live());
        claim_eq!(record, AuctionRecord::vacant());
    }

    #[concordium_test]
    fn test_auction_id_is_deterministic_and_pair_distinct() {
        let id = auction_id(&test_token());
        claim_eq!(id, auction_id(&test_token()));

        let other_contract = Token {
            contract: ContractAddress {
                index: 2,
                subindex: 0,
            },
            id: TokenIdVec(vec![0, 1]),
        };
        let other_item = Token {
            contract: NFT_CONTRACT,
            id: TokenIdVec(vec![0, 2]),
        };
        claim!(id != auction_id(&other_contract));
        claim!(id != auction_id(&other_item));
        claim!(auction_id(&other_contract) != auction_id(&other_item));
    }

    #[concordium_test]
    fn test_deposit_creates_listing() {
        let mut host = fresh_host();
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            // The token leaves the seller towards the null account, not
            // towards this contract.
            transfer_mock(Address::Account(SELLER), NULL_ACCOUNT),
        );

        let params = DepositParams {
            token: test_token(),
            deadline: deadline(),
            reserve_price: RESERVE,
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(SELLER, 0, &bytes);
        let mut logger = TestLogger::init();

        claim_eq!(deposit(&ctx, &mut host, &mut logger), Ok(()));

        let record = query_record(&host);
        claim_eq!(record.creator, SELLER);
        claim_eq!(record.deadline, deadline());
        claim_eq!(record.reserve_price, RESERVE);
        claim_eq!(record.highest_bid, Amount::zero());
        claim_eq!(record.highest_bidder, NULL_ACCOUNT);
        claim!(!host.state().locked);

        let token = test_token();
        claim!(logger.logs.contains(&to_bytes(&AuctionEvent::deposit(
            &token.contract,
            &token.id,
            &SELLER,
            deadline(),
            RESERVE,
        ))));
    }

    #[concordium_test]
    fn test_deposit_rejects_duplicate() {
        let mut host = listed_host();
        let result = call_deposit(&mut host, OUTSIDER, 0, deadline());
        claim_eq!(result, Err(CustomContractError::AlreadyExists.into()));
    }

    #[concordium_test]
    fn test_deposit_accepts_deadline_equal_to_now() {
        let mut host = fresh_host();
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            transfer_mock(Address::Account(SELLER), NULL_ACCOUNT),
        );
        let result = call_deposit(&mut host, SELLER, DEADLINE_MILLIS, deadline());
        claim_eq!(result, Ok(()));
    }

    #[concordium_test]
    fn test_deposit_rejects_past_deadline() {
        let mut host = fresh_host();
        let result = call_deposit(&mut host, SELLER, DEADLINE_MILLIS + 1, deadline());
        claim_eq!(result, Err(CustomContractError::DeadlineInPast.into()));
    }

    #[concordium_test]
    fn test_deposit_rejects_contract_sender() {
        let mut host = fresh_host();
        let params = DepositParams {
            token: test_token(),
            deadline: deadline(),
            reserve_price: RESERVE,
        };
        let bytes = to_bytes(&params);
        let mut ctx = TestReceiveContext::empty();
        ctx.set_sender(Address::Contract(NFT_CONTRACT))
            .set_parameter(&bytes)
            .set_metadata_slot_time(Timestamp::from_timestamp_millis(0));
        let mut logger = TestLogger::init();
        claim_eq!(
            deposit(&ctx, &mut host, &mut logger),
            Err(CustomContractError::OnlyAccountAddress.into())
        );
    }

    #[concordium_test]
    fn test_first_bid_must_exceed_zero() {
        let mut host = listed_host();
        let result = call_bid(&mut host, BIDDER_1, 1, Amount::zero());
        claim_eq!(result, Err(CustomContractError::BidTooLow.into()));
    }

    #[concordium_test]
    fn test_bid_tracks_highest_and_escrow() {
        let mut host = listed_host();

        // First bid below the reserve is still an acceptable bid.
        let bytes = to_bytes(&test_id());
        let ctx = receive_ctx(BIDDER_1, 1, &bytes);
        let mut logger = TestLogger::init();
        claim_eq!(
            bid(&ctx, &mut host, Amount::from_micro_ccd(5), &mut logger),
            Ok(())
        );
        claim!(logger.logs.contains(&to_bytes(&AuctionEvent::bid(
            &test_id(),
            &BIDDER_1,
            Amount::from_micro_ccd(5),
        ))));

        let record = query_record(&host);
        claim_eq!(record.highest_bid, Amount::from_micro_ccd(5));
        claim_eq!(record.highest_bidder, BIDDER_1);
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::from_micro_ccd(5));

        // A lower bid by another account is rejected.
        let result = call_bid(&mut host, BIDDER_2, 2, Amount::from_micro_ccd(3));
        claim_eq!(result, Err(CustomContractError::BidTooLow.into()));
        rollback(&mut host);

        // An equal bid is rejected as well; the highest bid moves strictly
        // upwards across accepted bids.
        let result = call_bid(&mut host, BIDDER_2, 2, Amount::from_micro_ccd(5));
        claim_eq!(result, Err(CustomContractError::BidTooLow.into()));
        rollback(&mut host);

        claim_eq!(
            call_bid(&mut host, BIDDER_2, 3, Amount::from_micro_ccd(7)),
            Ok(())
        );
        let record = query_record(&host);
        claim_eq!(record.highest_bid, Amount::from_micro_ccd(7));
        claim_eq!(record.highest_bidder, BIDDER_2);
        claim_eq!(query_escrow(&host, BIDDER_2), Amount::from_micro_ccd(7));
        // The outbid account keeps its escrow until it withdraws.
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::from_micro_ccd(5));
    }

    #[concordium_test]
    fn test_rebid_accumulates_escrow() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Ok(())
        );
        // Raising one's own bid compares against the highest bid, not
        // against the accumulated escrow.
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 2, Amount::from_micro_ccd(15)),
            Ok(())
        );

        let record = query_record(&host);
        claim_eq!(record.highest_bid, Amount::from_micro_ccd(15));
        claim_eq!(record.highest_bidder, BIDDER_1);
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::from_micro_ccd(20));
    }

    #[concordium_test]
    fn test_bid_after_deadline_rejected() {
        let mut host = listed_host();
        let result = call_bid(
            &mut host,
            BIDDER_1,
            DEADLINE_MILLIS + 1,
            Amount::from_micro_ccd(5),
        );
        claim_eq!(result, Err(CustomContractError::AuctionOver.into()));
    }

    #[concordium_test]
    fn test_bid_at_deadline_accepted() {
        let mut host = listed_host();
        let result = call_bid(
            &mut host,
            BIDDER_1,
            DEADLINE_MILLIS,
            Amount::from_micro_ccd(5),
        );
        claim_eq!(result, Ok(()));
    }

    #[concordium_test]
    fn test_bid_without_listing_rejected() {
        let mut host = fresh_host();
        // A vacant record reads a zero deadline, so the listing counts as
        // over at any positive slot time.
        let result = call_bid(&mut host, BIDDER_1, 5, Amount::from_micro_ccd(5));
        claim_eq!(result, Err(CustomContractError::AuctionOver.into()));
    }

    #[concordium_test]
    fn test_withdraw_before_deadline_rejected() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Ok(())
        );
        let result = call_withdraw(&mut host, BIDDER_1, DEADLINE_MILLIS);
        claim_eq!(result, Err(CustomContractError::AuctionStillActive.into()));
    }

    #[concordium_test]
    fn test_withdraw_pays_out_and_zeroes() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Ok(())
        );
        claim_eq!(
            call_bid(&mut host, BIDDER_2, 2, Amount::from_micro_ccd(15)),
            Ok(())
        );

        host.set_self_balance(Amount::from_micro_ccd(20));
        claim_eq!(call_withdraw(&mut host, BIDDER_1, DEADLINE_MILLIS + 1), Ok(()));
        claim!(host.transfer_occurred(&BIDDER_1, Amount::from_micro_ccd(5)));
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::zero());

        // Withdrawing again finds an empty ledger entry and still succeeds.
        claim_eq!(call_withdraw(&mut host, BIDDER_1, DEADLINE_MILLIS + 2), Ok(()));
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::zero());

        // An account that never bid withdraws nothing, successfully.
        claim_eq!(call_withdraw(&mut host, OUTSIDER, DEADLINE_MILLIS + 2), Ok(()));
    }

    #[concordium_test]
    fn test_winner_cannot_withdraw_when_reserve_met() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(15)),
            Ok(())
        );
        let result = call_withdraw(&mut host, BIDDER_1, DEADLINE_MILLIS + 1);
        claim_eq!(result, Err(CustomContractError::WinnerCannotWithdraw.into()));
    }

    #[concordium_test]
    fn test_highest_bidder_withdraws_when_reserve_unmet() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Ok(())
        );

        host.set_self_balance(Amount::from_micro_ccd(5));
        claim_eq!(call_withdraw(&mut host, BIDDER_1, DEADLINE_MILLIS + 1), Ok(()));
        claim!(host.transfer_occurred(&BIDDER_1, Amount::from_micro_ccd(5)));
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::zero());
    }

    #[concordium_test]
    fn test_claim_settles_exactly() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Ok(())
        );
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 2, Amount::from_micro_ccd(15)),
            Ok(())
        );

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            transfer_mock(Address::Contract(SELF_ADDRESS), BIDDER_1),
        );
        host.set_self_balance(Amount::from_micro_ccd(20));

        claim_eq!(call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS + 1), Ok(()));

        // Winning bid to the creator, the escrow surplus back to the
        // winner; together they add up to everything the winner escrowed.
        claim!(host.transfer_occurred(&SELLER, Amount::from_micro_ccd(15)));
        claim!(host.transfer_occurred(&BIDDER_1, Amount::from_micro_ccd(5)));
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::zero());

        // The record is left behind on purpose: the identifier stays
        // occupied and the same token can never be listed again.
        let record = query_record(&host);
        claim!(record.is_live());
        claim_eq!(record.highest_bidder, BIDDER_1);
        let result = call_deposit(&mut host, SELLER, DEADLINE_MILLIS + 2, deadline());
        claim_eq!(result, Err(CustomContractError::AlreadyExists.into()));
    }

    #[concordium_test]
    fn test_claim_cannot_settle_twice() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(15)),
            Ok(())
        );

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            transfer_mock(Address::Contract(SELF_ADDRESS), BIDDER_1),
        );
        host.set_self_balance(Amount::from_micro_ccd(15));

        claim_eq!(call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS + 1), Ok(()));

        // The surviving record still names the winner, but their ledger
        // entry no longer covers the highest bid.
        let result = call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS + 2);
        claim_eq!(result, Err(CustomContractError::BidMapError.into()));
    }

    #[concordium_test]
    fn test_claim_accepts_bid_equal_to_reserve() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(10)),
            Ok(())
        );

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            transfer_mock(Address::Contract(SELF_ADDRESS), BIDDER_1),
        );
        host.set_self_balance(Amount::from_micro_ccd(10));

        claim_eq!(call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS + 1), Ok(()));
        claim!(host.transfer_occurred(&SELLER, Amount::from_micro_ccd(10)));
    }

    #[concordium_test]
    fn test_claim_before_deadline_rejected() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(15)),
            Ok(())
        );
        let result = call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS);
        claim_eq!(result, Err(CustomContractError::AuctionStillActive.into()));
    }

    #[concordium_test]
    fn test_claim_rejects_below_reserve() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Ok(())
        );
        let result = call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS + 1);
        claim_eq!(
            result,
            Err(CustomContractError::SellerMustFormallyEnd.into())
        );
    }

    #[concordium_test]
    fn test_claim_only_winner() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(15)),
            Ok(())
        );
        let result = call_claim(&mut host, BIDDER_2, DEADLINE_MILLIS + 1);
        claim_eq!(result, Err(CustomContractError::OnlyWinnerCanCall.into()));
    }

    #[concordium_test]
    fn test_claim_aborts_when_payout_fails() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(15)),
            Ok(())
        );

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            transfer_mock(Address::Contract(SELF_ADDRESS), BIDDER_1),
        );
        // No balance to pay the creator from: the whole claim rejects.
        host.set_self_balance(Amount::zero());

        let result = call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS + 1);
        claim!(result.is_err());
    }

    #[concordium_test]
    fn test_seller_end_returns_token_and_removes_listing() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Ok(())
        );

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            transfer_mock(Address::Contract(SELF_ADDRESS), SELLER),
        );
        host.set_self_balance(Amount::from_micro_ccd(5));

        claim_eq!(call_seller_end(&mut host, SELLER, DEADLINE_MILLIS + 1), Ok(()));
        let record = query_record(&host);
        claim!(!record.is_live());

        // The losing bidder's escrow survives the removal and is paid out
        // against the vacant record.
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::from_micro_ccd(5));
        claim_eq!(call_withdraw(&mut host, BIDDER_1, DEADLINE_MILLIS + 2), Ok(()));
        claim!(host.transfer_occurred(&BIDDER_1, Amount::from_micro_ccd(5)));
        claim_eq!(query_escrow(&host, BIDDER_1), Amount::zero());
    }

    #[concordium_test]
    fn test_seller_end_only_seller() {
        let mut host = listed_host();
        let result = call_seller_end(&mut host, OUTSIDER, DEADLINE_MILLIS + 1);
        claim_eq!(result, Err(CustomContractError::OnlySellerCanCall.into()));
    }

    #[concordium_test]
    fn test_seller_end_without_listing_rejected() {
        let mut host = fresh_host();
        // The vacant record carries the null creator, which no caller
        // matches.
        let result = call_seller_end(&mut host, SELLER, DEADLINE_MILLIS + 1);
        claim_eq!(result, Err(CustomContractError::OnlySellerCanCall.into()));
    }

    #[concordium_test]
    fn test_seller_end_before_deadline_rejected() {
        let mut host = listed_host();
        let result = call_seller_end(&mut host, SELLER, DEADLINE_MILLIS);
        claim_eq!(result, Err(CustomContractError::AuctionStillActive.into()));
    }

    #[concordium_test]
    fn test_seller_end_rejects_when_reserve_met() {
        let mut host = listed_host();
        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(15)),
            Ok(())
        );
        let result = call_seller_end(&mut host, SELLER, DEADLINE_MILLIS + 1);
        claim_eq!(result, Err(CustomContractError::ReserveMetMustClaim.into()));
    }

    #[concordium_test]
    fn test_get_auction_id_flag_polarity() {
        let host = fresh_host();
        // The flag is the comparison against the null creator, so it is set
        // while the identifier is vacant.
        let response = query_auction_id(&host);
        claim_eq!(response.auction_id, test_id());
        claim!(response.exists);

        let host = listed_host();
        let response = query_auction_id(&host);
        claim!(!response.exists);
    }

    #[concordium_test]
    fn test_acceptance_hook_acknowledges() {
        let host = fresh_host();
        let ctx = TestReceiveContext::empty();
        claim_eq!(on_receiving_cis1(&ctx, &host), Ok(()));
    }

    #[concordium_test]
    fn test_guard_blocks_reentrant_calls() {
        let mut host = listed_host();
        host.state_mut()
            .lock()
            .expect_report("guard should be free");

        claim_eq!(
            call_bid(&mut host, BIDDER_1, 1, Amount::from_micro_ccd(5)),
            Err(CustomContractError::Reentrancy.into())
        );
        claim_eq!(
            call_withdraw(&mut host, BIDDER_1, DEADLINE_MILLIS + 1),
            Err(CustomContractError::Reentrancy.into())
        );
        claim_eq!(
            call_claim(&mut host, BIDDER_1, DEADLINE_MILLIS + 1),
            Err(CustomContractError::Reentrancy.into())
        );
        claim_eq!(
            call_seller_end(&mut host, SELLER, DEADLINE_MILLIS + 1),
            Err(CustomContractError::Reentrancy.into())
        );
        claim_eq!(
            call_deposit(&mut host, SELLER, 0, deadline()),
            Err(CustomContractError::Reentrancy.into())
        );
    }
}
