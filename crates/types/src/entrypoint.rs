//! Typed argument schema for the carbon marketplace contract entrypoints

use crate::error::ArgumentError;
use crate::operation::OperationDescriptor;
use crate::utils::is_valid_address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const CREATE_PROJECT: &str = "createProject";
pub const MINT: &str = "mint";
pub const TRANSFER: &str = "transfer";
pub const ADD_OPERATOR: &str = "add_operator";
pub const REMOVE_OPERATOR: &str = "remove_operator";
pub const BURY_CARBON: &str = "buryCarbon";

/// Entrypoints with a typed schema
pub const KNOWN_ENTRYPOINTS: [&str; 6] = [
    CREATE_PROJECT,
    MINT,
    TRANSFER,
    ADD_OPERATOR,
    REMOVE_OPERATOR,
    BURY_CARBON,
];

/// A project token: `(nat * token_metadata)`, metadata is `(string, bytes) map`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectToken {
    pub token_id: u64,
    /// Metadata values as hex-encoded bytes
    pub metadata: BTreeMap<String, String>,
}

/// `(owner * token_id * amount)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintEntry {
    pub owner: String,
    pub token_id: u64,
    pub amount: u64,
}

/// `(to * token_id * amount)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferDestination {
    pub to: String,
    pub token_id: u64,
    pub amount: u64,
}

/// `from * ((to * token_id * amount) list)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferBatch {
    pub from: String,
    pub txs: Vec<TransferDestination>,
}

/// FA2 operator grant `(owner * operator * token_id)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatorParam {
    pub owner: String,
    pub operator: String,
    pub token_id: u64,
}

/// Carbon credits to retire `(owner * token_id * amount)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuryEntry {
    pub owner: String,
    pub token_id: u64,
    pub amount: u64,
}

/// A typed call to one of the carbon contract entrypoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrypointCall {
    CreateProject(Vec<ProjectToken>),
    Mint(Vec<MintEntry>),
    Transfer(Vec<TransferBatch>),
    AddOperator(Vec<OperatorParam>),
    RemoveOperator(Vec<OperatorParam>),
    BuryCarbon(Vec<BuryEntry>),
}

impl ProjectToken {
    /// Build a token whose metadata values are UTF-8 text
    pub fn with_text_metadata<'a>(
        token_id: u64,
        metadata: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            token_id,
            metadata: metadata
                .into_iter()
                .map(|(k, v)| (k.to_string(), hex::encode(v.as_bytes())))
                .collect(),
        }
    }

    /// Decoded metadata bytes for a key
    pub fn metadata_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.metadata.get(key).and_then(|v| hex::decode(v).ok())
    }
}

impl EntrypointCall {
    /// Entrypoint name
    pub fn name(&self) -> &'static str {
        match self {
            EntrypointCall::CreateProject(_) => CREATE_PROJECT,
            EntrypointCall::Mint(_) => MINT,
            EntrypointCall::Transfer(_) => TRANSFER,
            EntrypointCall::AddOperator(_) => ADD_OPERATOR,
            EntrypointCall::RemoveOperator(_) => REMOVE_OPERATOR,
            EntrypointCall::BuryCarbon(_) => BURY_CARBON,
        }
    }

    /// Check if an entrypoint name has a typed schema
    pub fn is_known(name: &str) -> bool {
        KNOWN_ENTRYPOINTS.contains(&name)
    }

    /// Validate and encode into an opaque descriptor
    pub fn into_descriptor(self) -> Result<OperationDescriptor, ArgumentError> {
        self.validate()?;
        let name = self.name();
        let args = match &self {
            EntrypointCall::CreateProject(items) => encode(name, items)?,
            EntrypointCall::Mint(items) => encode(name, items)?,
            EntrypointCall::Transfer(items) => encode(name, items)?,
            EntrypointCall::AddOperator(items) | EntrypointCall::RemoveOperator(items) => {
                encode(name, items)?
            }
            EntrypointCall::BuryCarbon(items) => encode(name, items)?,
        };
        Ok(OperationDescriptor::new(name, args))
    }

    /// Decode and validate an opaque descriptor
    pub fn from_descriptor(descriptor: &OperationDescriptor) -> Result<Self, ArgumentError> {
        let name = descriptor.name.as_str();
        let args = &descriptor.args;
        let call = match name {
            CREATE_PROJECT => EntrypointCall::CreateProject(decode(name, args)?),
            MINT => EntrypointCall::Mint(decode(name, args)?),
            TRANSFER => EntrypointCall::Transfer(decode(name, args)?),
            ADD_OPERATOR => EntrypointCall::AddOperator(decode(name, args)?),
            REMOVE_OPERATOR => EntrypointCall::RemoveOperator(decode(name, args)?),
            BURY_CARBON => EntrypointCall::BuryCarbon(decode(name, args)?),
            other => return Err(ArgumentError::UnknownEntrypoint(other.to_string())),
        };
        call.validate()?;
        Ok(call)
    }

    /// Validate addresses, amounts and metadata
    pub fn validate(&self) -> Result<(), ArgumentError> {
        let name = self.name();
        let empty = match self {
            EntrypointCall::CreateProject(items) => items.is_empty(),
            EntrypointCall::Mint(items) => items.is_empty(),
            EntrypointCall::Transfer(items) => items.is_empty(),
            EntrypointCall::AddOperator(items) | EntrypointCall::RemoveOperator(items) => {
                items.is_empty()
            }
            EntrypointCall::BuryCarbon(items) => items.is_empty(),
        };
        if empty {
            return Err(ArgumentError::Empty {
                entrypoint: name.to_string(),
            });
        }

        match self {
            EntrypointCall::CreateProject(tokens) => {
                for token in tokens {
                    for key in token.metadata.keys() {
                        if token.metadata_bytes(key).is_none() {
                            return Err(ArgumentError::InvalidMetadata { key: key.clone() });
                        }
                    }
                }
            }
            EntrypointCall::Mint(entries) => {
                for entry in entries {
                    check_address("owner", &entry.owner)?;
                    check_amount("amount", entry.amount)?;
                }
            }
            EntrypointCall::Transfer(batches) => {
                for batch in batches {
                    check_address("from", &batch.from)?;
                    if batch.txs.is_empty() {
                        return Err(ArgumentError::Empty {
                            entrypoint: name.to_string(),
                        });
                    }
                    for tx in &batch.txs {
                        check_address("to", &tx.to)?;
                        check_amount("amount", tx.amount)?;
                    }
                }
            }
            EntrypointCall::AddOperator(params) | EntrypointCall::RemoveOperator(params) => {
                for param in params {
                    check_address("owner", &param.owner)?;
                    check_address("operator", &param.operator)?;
                }
            }
            EntrypointCall::BuryCarbon(entries) => {
                for entry in entries {
                    check_address("owner", &entry.owner)?;
                    check_amount("amount", entry.amount)?;
                }
            }
        }

        Ok(())
    }
}

fn check_address(field: &str, value: &str) -> Result<(), ArgumentError> {
    if is_valid_address(value) {
        Ok(())
    } else {
        Err(ArgumentError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

fn check_amount(field: &str, amount: u64) -> Result<(), ArgumentError> {
    if amount == 0 {
        return Err(ArgumentError::ZeroAmount {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn encode<T: Serialize>(entrypoint: &str, items: &[T]) -> Result<Vec<Value>, ArgumentError> {
    items
        .iter()
        .map(|item| {
            serde_json::to_value(item).map_err(|e| ArgumentError::Malformed {
                entrypoint: entrypoint.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn decode<T: DeserializeOwned>(entrypoint: &str, args: &[Value]) -> Result<Vec<T>, ArgumentError> {
    args.iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value.clone()).map_err(|e| ArgumentError::Malformed {
                entrypoint: entrypoint.to_string(),
                message: format!("argument {}: {}", i, e),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OWNER: &str = "tz1T1buQd895VYtg34W3swFaVpT6A4XpW5i7";
    const OPERATOR: &str = "KT1A9nbXJcQqbtNiBzhrwqmEccDXawJaRbNW";

    #[test]
    fn test_mint_descriptor() {
        let descriptor = EntrypointCall::Mint(vec![MintEntry {
            owner: OWNER.to_string(),
            token_id: 0,
            amount: 100,
        }])
        .into_descriptor()
        .unwrap();

        assert_eq!(descriptor.name, "mint");
        assert_eq!(
            descriptor.args,
            vec![json!({ "owner": OWNER, "token_id": 0, "amount": 100 })]
        );
    }

    #[test]
    fn test_decode_operator_descriptor() {
        let descriptor = OperationDescriptor::new(
            "add_operator",
            vec![json!({ "owner": OWNER, "operator": OPERATOR, "token_id": 0 })],
        );

        let call = EntrypointCall::from_descriptor(&descriptor).unwrap();
        assert_eq!(
            call,
            EntrypointCall::AddOperator(vec![OperatorParam {
                owner: OWNER.to_string(),
                operator: OPERATOR.to_string(),
                token_id: 0,
            }])
        );
    }

    #[test]
    fn test_unknown_entrypoint() {
        let descriptor = OperationDescriptor::new("burn", vec![]);
        assert_eq!(
            EntrypointCall::from_descriptor(&descriptor),
            Err(ArgumentError::UnknownEntrypoint("burn".to_string()))
        );
    }

    #[test]
    fn test_malformed_arguments() {
        let descriptor = OperationDescriptor::new("mint", vec![json!("metadata_map")]);
        match EntrypointCall::from_descriptor(&descriptor) {
            Err(ArgumentError::Malformed { entrypoint, message }) => {
                assert_eq!(entrypoint, "mint");
                assert!(message.starts_with("argument 0"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validation_failures() {
        let zero = EntrypointCall::BuryCarbon(vec![BuryEntry {
            owner: OWNER.to_string(),
            token_id: 0,
            amount: 0,
        }]);
        assert!(matches!(zero.validate(), Err(ArgumentError::ZeroAmount { .. })));

        let bad_owner = EntrypointCall::Mint(vec![MintEntry {
            owner: "ownerA".to_string(),
            token_id: 0,
            amount: 1,
        }]);
        assert!(matches!(
            bad_owner.validate(),
            Err(ArgumentError::InvalidAddress { .. })
        ));

        let empty = EntrypointCall::Transfer(vec![]);
        assert!(matches!(empty.into_descriptor(), Err(ArgumentError::Empty { .. })));
    }

    #[test]
    fn test_project_metadata_is_hex() {
        let token = ProjectToken::with_text_metadata(0, [("name", "Mangrove")]);
        assert_eq!(token.metadata["name"], "4d616e67726f7665");
        assert_eq!(token.metadata_bytes("name").unwrap(), b"Mangrove".to_vec());

        let mut bad = token.clone();
        bad.metadata.insert("decimals".to_string(), "zz".to_string());
        assert_eq!(
            EntrypointCall::CreateProject(vec![bad]).validate(),
            Err(ArgumentError::InvalidMetadata {
                key: "decimals".to_string()
            })
        );
    }
}
