use concordium_cis1::{AdditionalData, Receiver, Transfer};
use concordium_std::*;

use crate::errors::CustomContractError;
use crate::external::Token;

/// Ask the custodian contract to move the token. The custodian rejects the
/// call unless the sender is authorized as owner or operator of `from`,
/// which aborts the whole enclosing operation.
pub fn transfer<T>(
    host: &mut impl HasHost<T>,
    token: Token,
    from: Address,
    to: AccountAddress,
) -> ReceiveResult<()> {
    host.invoke_contract(
        &token.contract,
        &(
            1u16,
            Transfer {
                token_id: token.id,
                amount: 1,
                from,
                to: Receiver::Account(to),
                data: AdditionalData::empty(),
            },
        ),
        EntrypointName::new_unchecked("transfer"),
        Amount::zero(),
    )
    .map_err(handle_call_error)?;

    Ok(())
}

fn handle_call_error<R>(error: CallContractError<R>) -> Reject {
    match error {
        CallContractError::MissingEntrypoint | CallContractError::MessageFailed => {
            CustomContractError::Incompatible.into()
        }
        CallContractError::LogicReject { .. } => CustomContractError::InvokeContractError.into(),
        e => e.into(),
    }
}

#[concordium_cfg_test]
mod tests {
    use concordium_cis1::{TokenIdVec, TransferParams};
    use concordium_std::test_infrastructure::*;

    use super::*;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };

    const USER_1: AccountAddress = AccountAddress([1; 32]);

    #[concordium_test]
    fn test_transfer() {
        let state = ();
        let state_builder = TestStateBuilder::default();
        let mut host = TestHost::new(state, state_builder);

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|param, _, _, _| {
                TransferParams::<TokenIdVec>::deserial(&mut Cursor::new(param.as_ref()))
                    .map_err(|_| CallContractError::Trap)?;
                Ok((true, ()))
            }),
        );

        let response = transfer(
            &mut host,
            Token {
                contract: NFT_CONTRACT,
                id: TokenIdVec([1; 32].into()),
            },
            Address::Contract(NFT_CONTRACT),
            USER_1,
        );

        claim_eq!(response, Ok(()));
    }

    #[concordium_test]
    fn test_transfer_rejection_propagates() {
        let state = ();
        let state_builder = TestStateBuilder::default();
        let mut host = TestHost::new(state, state_builder);

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(
                |_, _, _, _| -> Result<(bool, ()), CallContractError<()>> {
                    Err(CallContractError::MessageFailed)
                },
            ),
        );

        let response = transfer(
            &mut host,
            Token {
                contract: NFT_CONTRACT,
                id: TokenIdVec([1; 32].into()),
            },
            Address::Contract(NFT_CONTRACT),
            USER_1,
        );

        claim_eq!(response, Err(CustomContractError::Incompatible.into()));
    }
}
