//! Method metadata and the standard method table.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodCategory {
    /// Queries that never commit anything.
    ReadOnly,
    /// Non-committing computations (gas estimation, calls).
    Simulation,
    /// Reveals identity, signs data, or mutates wallet/chain state.
    Write,
}

impl MethodCategory {
    pub fn requires_approval(self) -> bool {
        matches!(self, MethodCategory::Write)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::Simulation => "simulation",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for MethodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which approval screen presents a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalView {
    Connect,
    Transaction,
    Signature,
    Network,
    Asset,
    Permissions,
}

/// Behavioural flags beyond the category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodTraits {
    /// Read that discloses which accounts an origin may see.
    pub exposes_identity: bool,
    /// Write that needs an existing grant for the calling origin.
    pub account_scoped: bool,
    /// Write whose approval hands accounts to the origin.
    pub reveals_identity: bool,
    /// Write whose approval changes the active chain.
    pub changes_chain: bool,
    /// Write whose approval revokes the origin's grant.
    pub revokes_permission: bool,
    /// Result may be served from the page-side cache.
    pub cacheable: bool,
}

impl MethodTraits {
    const NONE: Self = Self {
        exposes_identity: false,
        account_scoped: false,
        reveals_identity: false,
        changes_chain: false,
        revokes_permission: false,
        cacheable: false,
    };

    const fn identity_read() -> Self {
        Self {
            exposes_identity: true,
            ..Self::NONE
        }
    }

    const fn cached() -> Self {
        Self {
            cacheable: true,
            ..Self::NONE
        }
    }

    const fn account_scoped() -> Self {
        Self {
            account_scoped: true,
            ..Self::NONE
        }
    }

    const fn connect() -> Self {
        Self {
            reveals_identity: true,
            ..Self::NONE
        }
    }

    const fn chain_change() -> Self {
        Self {
            changes_chain: true,
            ..Self::NONE
        }
    }

    const fn revoke() -> Self {
        Self {
            account_scoped: true,
            revokes_permission: true,
            ..Self::NONE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: &'static str,
    pub category: MethodCategory,
    pub traits: MethodTraits,
    /// Set for writes only.
    pub view: Option<ApprovalView>,
    pub description: &'static str,
}

impl MethodInfo {
    pub const fn read(name: &'static str, traits: MethodTraits, description: &'static str) -> Self {
        Self {
            name,
            category: MethodCategory::ReadOnly,
            traits,
            view: None,
            description,
        }
    }

    pub const fn simulation(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            category: MethodCategory::Simulation,
            traits: MethodTraits::NONE,
            view: None,
            description,
        }
    }

    pub const fn write(
        name: &'static str,
        view: ApprovalView,
        traits: MethodTraits,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            category: MethodCategory::Write,
            traits,
            view: Some(view),
            description,
        }
    }

    pub const fn requires_approval(&self) -> bool {
        matches!(self.category, MethodCategory::Write)
    }
}

const PLAIN: MethodTraits = MethodTraits::NONE;

/// Every method the bridge understands.
pub const STANDARD_METHODS: &[MethodInfo] = &[
    // ═══════════════════════════════════════════════════════════════════════
    // READ-ONLY
    // ═══════════════════════════════════════════════════════════════════════

    // --- Chain / protocol ---
    MethodInfo::read("eth_chainId", MethodTraits::cached(), "Active chain id"),
    MethodInfo::read("net_version", MethodTraits::cached(), "Active network id (decimal)"),
    MethodInfo::read("eth_protocolVersion", PLAIN, "Ethereum protocol version"),
    MethodInfo::read("web3_clientVersion", PLAIN, "Wallet client version"),
    MethodInfo::read("net_listening", PLAIN, "Whether the node is listening"),
    MethodInfo::read("net_peerCount", PLAIN, "Connected peer count"),
    MethodInfo::read("eth_syncing", PLAIN, "Sync status"),
    MethodInfo::read("eth_blockNumber", PLAIN, "Latest block number"),
    MethodInfo::read("eth_gasPrice", PLAIN, "Current gas price"),
    MethodInfo::read("eth_maxPriorityFeePerGas", PLAIN, "Priority fee suggestion"),
    MethodInfo::read("eth_feeHistory", PLAIN, "Historical fee data"),
    // --- Accounts (identity) ---
    MethodInfo::read(
        "eth_accounts",
        MethodTraits {
            exposes_identity: true,
            cacheable: true,
            ..MethodTraits::NONE
        },
        "Accounts visible to the calling origin",
    ),
    MethodInfo::read("eth_coinbase", MethodTraits::identity_read(), "Selected account of the calling origin"),
    MethodInfo::read("wallet_getPermissions", MethodTraits::identity_read(), "Permissions granted to the calling origin"),
    // --- Account state ---
    MethodInfo::read("eth_getBalance", PLAIN, "Account balance"),
    MethodInfo::read("eth_getCode", PLAIN, "Contract code"),
    MethodInfo::read("eth_getStorageAt", PLAIN, "Storage slot value"),
    MethodInfo::read("eth_getTransactionCount", PLAIN, "Account nonce"),
    MethodInfo::read("eth_getProof", PLAIN, "Merkle proof of account and storage"),
    // --- Blocks / transactions / logs ---
    MethodInfo::read("eth_getBlockByHash", PLAIN, "Block by hash"),
    MethodInfo::read("eth_getBlockByNumber", PLAIN, "Block by number"),
    MethodInfo::read("eth_getBlockTransactionCountByHash", PLAIN, "Transaction count by block hash"),
    MethodInfo::read("eth_getBlockTransactionCountByNumber", PLAIN, "Transaction count by block number"),
    MethodInfo::read("eth_getTransactionByHash", PLAIN, "Transaction by hash"),
    MethodInfo::read("eth_getTransactionReceipt", PLAIN, "Transaction receipt"),
    MethodInfo::read("eth_getLogs", PLAIN, "Logs matching a filter"),
    // ═══════════════════════════════════════════════════════════════════════
    // SIMULATION
    // ═══════════════════════════════════════════════════════════════════════
    MethodInfo::simulation("eth_estimateGas", "Gas estimate for a transaction"),
    MethodInfo::simulation("eth_call", "Execute a call without committing"),
    MethodInfo::simulation("eth_createAccessList", "Access list for a transaction"),
    // ═══════════════════════════════════════════════════════════════════════
    // WRITE (APPROVAL REQUIRED)
    // ═══════════════════════════════════════════════════════════════════════

    // --- Connection / permissions ---
    MethodInfo::write("eth_requestAccounts", ApprovalView::Connect, MethodTraits::connect(), "Connect accounts to the origin"),
    MethodInfo::write("wallet_requestPermissions", ApprovalView::Permissions, MethodTraits::connect(), "Grant permissions to the origin"),
    MethodInfo::write("wallet_revokePermissions", ApprovalView::Permissions, MethodTraits::revoke(), "Revoke the origin's permissions"),
    // --- Transactions ---
    MethodInfo::write("eth_sendTransaction", ApprovalView::Transaction, MethodTraits::account_scoped(), "Sign and broadcast a transaction"),
    MethodInfo::write("eth_signTransaction", ApprovalView::Transaction, MethodTraits::account_scoped(), "Sign a transaction"),
    // --- Signatures ---
    MethodInfo::write("eth_sign", ApprovalView::Signature, MethodTraits::account_scoped(), "Sign raw data"),
    MethodInfo::write("personal_sign", ApprovalView::Signature, MethodTraits::account_scoped(), "Sign a personal message"),
    MethodInfo::write("eth_signTypedData", ApprovalView::Signature, MethodTraits::account_scoped(), "Sign typed data (v1)"),
    MethodInfo::write("eth_signTypedData_v3", ApprovalView::Signature, MethodTraits::account_scoped(), "Sign typed data (v3)"),
    MethodInfo::write("eth_signTypedData_v4", ApprovalView::Signature, MethodTraits::account_scoped(), "Sign typed data (v4)"),
    // --- Chain management ---
    MethodInfo::write("wallet_switchEthereumChain", ApprovalView::Network, MethodTraits::chain_change(), "Switch the active chain"),
    MethodInfo::write("wallet_addEthereumChain", ApprovalView::Network, MethodTraits::chain_change(), "Add and switch to a chain"),
    // --- Assets ---
    MethodInfo::write("wallet_watchAsset", ApprovalView::Asset, MethodTraits::account_scoped(), "Track a token"),
];
