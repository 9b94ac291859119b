//! Hook configuration encoder.
//!
//! Pure transforms from a spending policy plus a delegated signer address into
//! the ABI payloads the modular account consumes at module installation time:
//!
//! - the subscription hook's `onInstall` init data, encoding the policy tuple
//!   `(entityId, merchant, token, maxPerPeriod, periodSecs, validUntil,
//!   paused)` in that exact order. The same bytes are handed to both the
//!   validation-phase and execution-phase hook entries, since both observe the
//!   same cap/period/merchant/token policy;
//! - the single-signer validation module's `onInstall` data binding the
//!   delegated signer to the fixed validation entity id.
//!
//! Everything here is deterministic: identical inputs produce identical bytes,
//! which matters because the client submits the payload on-chain verbatim.
//! `valid_until` is supplied by the caller (now + configured horizon), so the
//! encoder itself stays a pure function.

use alloy::primitives::aliases::U48;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::config::ModulesConfig;

sol! {
    /// Init data decoded by the subscription hook's `onInstall`.
    struct HookInstallData {
        uint32 entityId;
        address merchant;
        address token;
        uint256 maxPerPeriod;
        uint48 periodSecs;
        uint48 validUntil;
        bool paused;
    }

    /// Init data decoded by the single-signer validation module's `onInstall`.
    struct ValidationInstallData {
        uint32 entityId;
        address signer;
    }
}

/// Resolved spending policy for one installation.
///
/// Built from [`crate::config::PolicyConfig`] with `valid_until` stamped at
/// call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookPolicy {
    pub hook_entity_id: u32,
    pub merchant: Address,
    pub token: Address,
    pub max_per_period: U256,
    pub period_secs: u64,
    /// Unix timestamp after which the hook rejects everything.
    pub valid_until: u64,
    pub paused: bool,
}

/// Whether a hook entry runs at validation or execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookType {
    Validation,
    Execution,
}

/// Placement of one hook on the account, as the client's install call expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDescriptor {
    pub address: Address,
    pub entity_id: u32,
    pub hook_type: HookType,
    pub has_pre_hooks: bool,
    pub has_post_hooks: bool,
}

/// One hook entry: placement plus its init data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookEntry {
    pub hook_config: HookDescriptor,
    pub init_data: Bytes,
}

/// Capability descriptor for the validation module installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    pub module_address: Address,
    pub entity_id: u32,
    pub is_global: bool,
    pub is_signature_validation: bool,
    pub is_user_op_validation: bool,
}

/// Complete installation payload returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallData {
    pub validation_config: ValidationConfig,
    pub install_data: Bytes,
    pub hooks: Vec<HookEntry>,
}

/// ABI-encode the subscription hook's `onInstall` init data.
pub fn encode_hook_install_data(policy: &HookPolicy) -> Bytes {
    let data = HookInstallData {
        entityId: policy.hook_entity_id,
        merchant: policy.merchant,
        token: policy.token,
        maxPerPeriod: policy.max_per_period,
        periodSecs: U48::from(policy.period_secs),
        validUntil: U48::from(policy.valid_until),
        paused: policy.paused,
    };
    data.abi_encode().into()
}

/// ABI-encode the validation module's `onInstall` data for `signer`.
pub fn encode_validation_install_data(entity_id: u32, signer: Address) -> Bytes {
    let data = ValidationInstallData {
        entityId: entity_id,
        signer,
    };
    data.abi_encode().into()
}

/// Assemble the full install payload: a global, signature- and
/// user-op-capable validator bound to `signer`, plus the two policy hooks
/// (validation phase and execution phase, pre-hooks only) sharing one init
/// blob.
pub fn build_install_data(
    modules: &ModulesConfig,
    policy: &HookPolicy,
    signer: Address,
) -> InstallData {
    let hook_init = encode_hook_install_data(policy);

    InstallData {
        validation_config: ValidationConfig {
            module_address: modules.validation_module,
            entity_id: modules.validation_entity_id,
            is_global: true,
            is_signature_validation: true,
            is_user_op_validation: true,
        },
        install_data: encode_validation_install_data(modules.validation_entity_id, signer),
        hooks: vec![
            HookEntry {
                hook_config: HookDescriptor {
                    address: modules.subscription_module,
                    entity_id: policy.hook_entity_id,
                    hook_type: HookType::Validation,
                    has_pre_hooks: true,
                    has_post_hooks: false,
                },
                init_data: hook_init.clone(),
            },
            HookEntry {
                hook_config: HookDescriptor {
                    address: modules.subscription_module,
                    entity_id: policy.hook_entity_id,
                    hook_type: HookType::Execution,
                    has_pre_hooks: true,
                    has_post_hooks: false,
                },
                init_data: hook_init,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn policy() -> HookPolicy {
        HookPolicy {
            hook_entity_id: 6,
            merchant: address!("0xdbcafd921b6b2e3d92d0d8b6489cf3d84dbf149f"),
            token: address!("0x1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
            max_per_period: U256::from(10_000_000u64),
            period_secs: 2_592_000,
            valid_until: 1_900_000_000,
            paused: false,
        }
    }

    fn modules() -> ModulesConfig {
        ModulesConfig::default()
    }

    #[test]
    fn test_hook_install_data_is_deterministic() {
        let a = encode_hook_install_data(&policy());
        let b = encode_hook_install_data(&policy());
        assert_eq!(a, b);
    }

    #[test]
    fn test_hook_install_data_field_order() {
        let encoded = encode_hook_install_data(&policy());
        // Seven static fields, one 32-byte word each.
        assert_eq!(encoded.len(), 7 * 32);

        let decoded = HookInstallData::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.entityId, 6);
        assert_eq!(
            decoded.merchant,
            address!("0xdbcafd921b6b2e3d92d0d8b6489cf3d84dbf149f")
        );
        assert_eq!(
            decoded.token,
            address!("0x1c7d4b196cb0c7b01d743fbc6116a902379c7238")
        );
        assert_eq!(decoded.maxPerPeriod, U256::from(10_000_000u64));
        assert_eq!(decoded.periodSecs, U48::from(2_592_000u64));
        assert_eq!(decoded.validUntil, U48::from(1_900_000_000u64));
        assert!(!decoded.paused);
    }

    #[test]
    fn test_valid_until_changes_payload() {
        let mut later = policy();
        later.valid_until += 60;
        assert_ne!(
            encode_hook_install_data(&policy()),
            encode_hook_install_data(&later)
        );
    }

    #[test]
    fn test_validation_install_data_binds_signer() {
        let signer_a = address!("0x2222222222222222222222222222222222222222");
        let signer_b = address!("0x3333333333333333333333333333333333333333");

        let a = encode_validation_install_data(2, signer_a);
        let b = encode_validation_install_data(2, signer_b);
        assert_ne!(a, b, "different signers must produce different payloads");

        let decoded = ValidationInstallData::abi_decode(&a).unwrap();
        assert_eq!(decoded.entityId, 2);
        assert_eq!(decoded.signer, signer_a);
    }

    #[test]
    fn test_both_hooks_share_init_data() {
        let signer = address!("0x2222222222222222222222222222222222222222");
        let payload = build_install_data(&modules(), &policy(), signer);

        assert_eq!(payload.hooks.len(), 2);
        assert_eq!(payload.hooks[0].init_data, payload.hooks[1].init_data);
        assert_eq!(payload.hooks[0].hook_config.hook_type, HookType::Validation);
        assert_eq!(payload.hooks[1].hook_config.hook_type, HookType::Execution);
        assert!(payload.hooks.iter().all(|h| h.hook_config.has_pre_hooks));
        assert!(payload.hooks.iter().all(|h| !h.hook_config.has_post_hooks));

        assert!(payload.validation_config.is_global);
        assert!(payload.validation_config.is_signature_validation);
        assert!(payload.validation_config.is_user_op_validation);
    }

    #[test]
    fn test_install_data_serializes_hex_bytes() {
        let signer = address!("0x2222222222222222222222222222222222222222");
        let payload = build_install_data(&modules(), &policy(), signer);
        let json = serde_json::to_value(&payload).unwrap();

        let install_data = json["installData"].as_str().unwrap();
        assert!(install_data.starts_with("0x"));
        assert_eq!(json["hooks"][0]["hookConfig"]["hookType"], "validation");
        assert_eq!(json["validationConfig"]["entityId"], 2);
    }
}
