//! Definitions of the Solidity functions and events used during provisioning

use alloy_sol_types::sol;

sol! {
    function createSubscription() external returns (uint64 subId);
    function fundSubscription(uint64 subId, uint96 amount) external;

    event SubscriptionCreated(uint64 indexed subId, address owner);
}
