//! Solidity interface bindings for the EVM-side CCTP contracts.
//!
//! Only the entry points and events the bridge actually touches are
//! declared; the full contract surfaces live on-chain.

use alloy::sol;

sol! {
    #![sol(all_derives = true)]

    interface IERC20 {
        function approve(address spender, uint256 value) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
    }

    interface ITokenMessengerV2 {
        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold
        ) external;
    }

    interface IMessageTransmitterV2 {
        function receiveMessage(bytes calldata message, bytes calldata attestation)
            external
            returns (bool);
        function usedNonces(bytes32 nonce) external view returns (uint256);

        event MessageSent(bytes message);
    }

    interface IMessageTransmitterV1 {
        function receiveMessage(bytes calldata message, bytes calldata attestation)
            external
            returns (bool);
        function usedNonces(bytes32 hashedSourceAndNonce) external view returns (uint256);
    }

    interface ITokenMinterV2 {
        /// Emitted when an attested message mints USDC to the recipient.
        event MintAndWithdraw(
            address indexed mintRecipient,
            uint256 amount,
            address indexed mintToken,
            uint256 feeCollected
        );
    }

    interface ITokenMinterV1 {
        event MintAndWithdraw(address indexed mintRecipient, uint256 amount, address indexed mintToken);
    }
}
