//! Carbon marketplace call sequences
//!
//! Builders for the request shapes the marketplace needs: registering a
//! project, minting credits, moving them, and retiring (burying) them.

use std::fmt;
use std::str::FromStr;
use types::{
    ArgumentError, BuryEntry, EntrypointCall, MintEntry, OperatorParam, PipelineRequest,
    ProjectToken, TransferBatch, TransferDestination,
};

/// Register a project and its token metadata
pub fn create_project(contract: &str, tokens: Vec<ProjectToken>) -> Result<PipelineRequest, ArgumentError> {
    single(contract, EntrypointCall::CreateProject(tokens))
}

/// Mint carbon credits
pub fn mint(contract: &str, entries: Vec<MintEntry>) -> Result<PipelineRequest, ArgumentError> {
    single(contract, EntrypointCall::Mint(entries))
}

/// Transfer carbon credits
pub fn transfer(contract: &str, batches: Vec<TransferBatch>) -> Result<PipelineRequest, ArgumentError> {
    single(contract, EntrypointCall::Transfer(batches))
}

/// Retire credits on behalf of `owner`.
///
/// `operator` is granted the right to move the owner's tokens for the
/// duration of the bury call and removed afterwards.
pub fn bury_carbon(
    contract: &str,
    owner: &str,
    operator: &str,
    token_id: u64,
    amount: u64,
) -> Result<PipelineRequest, ArgumentError> {
    let grant = OperatorParam {
        owner: owner.to_string(),
        operator: operator.to_string(),
        token_id,
    };

    let operations = vec![
        EntrypointCall::AddOperator(vec![grant.clone()]).into_descriptor()?,
        EntrypointCall::BuryCarbon(vec![BuryEntry {
            owner: owner.to_string(),
            token_id,
            amount,
        }])
        .into_descriptor()?,
        EntrypointCall::RemoveOperator(vec![grant]).into_descriptor()?,
    ];

    Ok(PipelineRequest::new(contract, operations))
}

fn single(contract: &str, call: EntrypointCall) -> Result<PipelineRequest, ArgumentError> {
    Ok(PipelineRequest::new(contract, vec![call.into_descriptor()?]))
}

/// Named marketplace workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    CreateProject,
    Mint,
    Transfer,
    BuryCarbon,
}

impl Workflow {
    pub const ALL: [Workflow; 4] = [
        Workflow::CreateProject,
        Workflow::Mint,
        Workflow::Transfer,
        Workflow::BuryCarbon,
    ];

    /// Workflow name as used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::CreateProject => "create-project",
            Workflow::Mint => "mint",
            Workflow::Transfer => "transfer",
            Workflow::BuryCarbon => "bury-carbon",
        }
    }

    /// Sample request for this workflow
    pub fn example(&self, contract: &str) -> Result<PipelineRequest, ArgumentError> {
        const OWNER: &str = "tz1T1buQd895VYtg34W3swFaVpT6A4XpW5i7";
        const RECIPIENT: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";

        match self {
            Workflow::CreateProject => create_project(
                contract,
                vec![
                    ProjectToken::with_text_metadata(0, [("name", "Mangrove restoration"), ("decimals", "0")]),
                    ProjectToken::with_text_metadata(1, [("name", "Peatland rewetting"), ("decimals", "0")]),
                ],
            ),
            Workflow::Mint => mint(
                contract,
                vec![MintEntry {
                    owner: OWNER.to_string(),
                    token_id: 0,
                    amount: 100,
                }],
            ),
            Workflow::Transfer => transfer(
                contract,
                vec![TransferBatch {
                    from: OWNER.to_string(),
                    txs: vec![TransferDestination {
                        to: RECIPIENT.to_string(),
                        token_id: 0,
                        amount: 25,
                    }],
                }],
            ),
            Workflow::BuryCarbon => bury_carbon(contract, OWNER, contract, 0, 10),
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Workflow::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Workflow::ALL.iter().map(|w| w.as_str()).collect();
                format!("unknown workflow '{}', expected one of: {}", s, names.join(", "))
            })
    }
}
