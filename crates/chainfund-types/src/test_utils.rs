//! test utilities for creating users, campaigns and wallets.
//!
//! builders fill every field with a sensible default so tests only spell
//! out what they care about.

use crate::{Amount, Campaign, Email, Milestone, User, UserRole, WalletAddress};

/// deterministic wallet address derived from a one-byte seed.
///
/// ```
/// use chainfund_types::test_utils::test_wallet;
///
/// assert_eq!(test_wallet(1).as_str(), "0x0101010101010101010101010101010101010101");
/// ```
pub fn test_wallet(seed: u8) -> WalletAddress {
    WalletAddress::new(&format!("0x{}", hex::encode([seed; 20])))
        .expect("generated address is well-formed")
}

/// builder for test [`User`] instances.
#[derive(Debug, Clone)]
pub struct TestUserBuilder {
    seed: u8,
    name: Option<String>,
    role: UserRole,
    verified: bool,
}

impl TestUserBuilder {
    /// create a builder whose wallet and email derive from `seed`.
    pub fn new(seed: u8) -> Self {
        Self {
            seed,
            name: None,
            role: UserRole::User,
            verified: true,
        }
    }

    /// set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// give the user the admin role.
    pub fn admin(mut self) -> Self {
        self.role = UserRole::Admin;
        self
    }

    /// leave the user unverified.
    pub fn unverified(mut self) -> Self {
        self.verified = false;
        self
    }

    /// build the user (id 0, ready to insert).
    pub fn build(self) -> User {
        let name = self.name.unwrap_or_else(|| format!("user{}", self.seed));
        let email = Email::new(&format!("{}@example.com", name)).expect("valid test email");
        let mut user = User::new(name, email, test_wallet(self.seed));
        user.role = self.role;
        user.is_verified = self.verified;
        user
    }
}

/// exact amount from decimal ETH text.
///
/// ```
/// use chainfund_types::test_utils::eth;
///
/// assert_eq!(eth("0.1").base_units(), 100_000_000);
/// ```
pub fn eth(s: &str) -> Amount {
    Amount::parse(s).expect("valid test amount")
}

fn eth_f64(value: f64) -> Amount {
    Amount::try_from(value).expect("valid test amount")
}

/// builder for test [`Campaign`] instances.
#[derive(Debug, Clone)]
pub struct TestCampaignBuilder {
    current: Amount,
    targets: Vec<Amount>,
}

impl TestCampaignBuilder {
    /// create a builder for a campaign owned by `test_wallet(1)` with one milestone of 10.
    pub fn new() -> Self {
        Self {
            current: Amount::ZERO,
            targets: vec![eth("10")],
        }
    }

    /// set funds already raised, in ETH.
    pub fn with_current_amount(mut self, current: f64) -> Self {
        self.current = eth_f64(current);
        self
    }

    /// replace the milestones with one per target (in ETH), named `m0`, `m1`, ...
    ///
    /// the goal is the sum of the targets.
    pub fn with_milestone_targets(mut self, targets: &[f64]) -> Self {
        self.targets = targets.iter().copied().map(eth_f64).collect();
        self
    }

    /// build the campaign (id 0, ready to insert).
    pub fn build(self) -> Campaign {
        let milestones: Vec<Milestone> = self
            .targets
            .iter()
            .enumerate()
            .map(|(i, &target_amount)| Milestone {
                title: format!("m{i}"),
                description: String::new(),
                target_amount,
            })
            .collect();
        let goal = Amount::checked_sum(self.targets.iter().copied()).expect("test goal fits");

        let mut campaign = Campaign::new(
            test_wallet(1),
            "test campaign".to_string(),
            "a campaign used in tests".to_string(),
            goal,
            milestones,
        );
        campaign.current_amount = self.current;
        campaign
    }
}

impl Default for TestCampaignBuilder {
    fn default() -> Self {
        Self::new()
    }
}
