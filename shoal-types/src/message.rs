//! The signed message model.
//!
//! A `Message` wraps a `MessageData` payload with its blake3 hash and an
//! Ed25519 signature over that hash. The canonical byte encoding (borsh) is
//! what gets hashed, so two replicas always agree on a message's identity.
//!
//! Custody-level messages (SignerAdd, SignerRemove) are signed by the fid's
//! custody key; everything else is signed by a delegate signer that an active
//! SignerAdd authorizes. The engine enforces that chain; this module only
//! knows how to verify a single message in isolation.

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::ts_hash::{HASH_LENGTH, TS_HASH_LENGTH};
use crate::{Address, Fid, HubError, HubResult, SignerKey, TsHash};

/// Length in bytes of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// The kind of a message. Determines which store it routes to and whether it
/// behaves as an add or a remove in that store's CRDT set.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum MessageType {
    CastAdd,
    CastRemove,
    ReactionAdd,
    ReactionRemove,
    AmpAdd,
    AmpRemove,
    VerificationAddEthAddress,
    VerificationRemove,
    SignerAdd,
    SignerRemove,
    UserDataAdd,
}

impl MessageType {
    /// True for the add half of a set pair (UserDataAdd included).
    #[must_use]
    pub const fn is_add(self) -> bool {
        matches!(
            self,
            Self::CastAdd
                | Self::ReactionAdd
                | Self::AmpAdd
                | Self::VerificationAddEthAddress
                | Self::SignerAdd
                | Self::UserDataAdd
        )
    }

    /// True for the remove half of a set pair.
    #[must_use]
    pub const fn is_remove(self) -> bool {
        matches!(
            self,
            Self::CastRemove
                | Self::ReactionRemove
                | Self::AmpRemove
                | Self::VerificationRemove
                | Self::SignerRemove
        )
    }

    /// True for custody-level messages, which are signed by the custody key.
    #[must_use]
    pub const fn is_signer_message(self) -> bool {
        matches!(self, Self::SignerAdd | Self::SignerRemove)
    }
}

/// Reaction flavors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum ReactionType {
    Like,
    Recast,
}

impl ReactionType {
    /// Single-byte key encoding.
    #[must_use]
    pub const fn to_key_byte(self) -> u8 {
        match self {
            Self::Like => 1,
            Self::Recast => 2,
        }
    }
}

/// Profile fields settable through UserDataAdd.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum UserDataType {
    Pfp,
    Display,
    Bio,
    Url,
}

impl UserDataType {
    /// Single-byte key encoding.
    #[must_use]
    pub const fn to_key_byte(self) -> u8 {
        match self {
            Self::Pfp => 1,
            Self::Display => 2,
            Self::Bio => 3,
            Self::Url => 4,
        }
    }
}

/// Hash schemes. The hub requires blake3.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum HashScheme {
    Blake3,
}

/// Signature schemes. The network signs everything with Ed25519.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum SignatureScheme {
    Ed25519,
}

/// A reference to a cast: the author plus the cast's timestamp-hash.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct CastId {
    pub fid: Fid,
    pub ts_hash: TsHash,
}

impl CastId {
    /// Key bytes: author fid followed by the cast's ts_hash.
    #[must_use]
    pub fn to_key_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + TS_HASH_LENGTH);
        bytes.extend_from_slice(&self.fid.to_key_bytes());
        bytes.extend_from_slice(self.ts_hash.as_bytes());
        bytes
    }
}

/// Body of a CastAdd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CastAddBody {
    /// The text of the cast.
    pub text: String,
    /// Fids mentioned in the text.
    pub mentions: Vec<Fid>,
    /// The cast this one replies to, if any.
    pub parent: Option<CastId>,
    /// Embedded URLs.
    pub embeds: Vec<String>,
}

/// Body of a CastRemove: the ts_hash of the cast being removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CastRemoveBody {
    pub target_ts_hash: TsHash,
}

/// Body shared by ReactionAdd and ReactionRemove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ReactionBody {
    pub reaction_type: ReactionType,
    pub target: CastId,
}

/// Body shared by AmpAdd and AmpRemove: the user being amplified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AmpBody {
    pub target_fid: Fid,
}

/// Body of a VerificationAddEthAddress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VerificationAddBody {
    /// The address being proven.
    pub address: Address,
    /// Signature produced by the claimed address over the ownership claim.
    /// Opaque to the core; validated upstream as a pure function.
    pub claim_signature: Vec<u8>,
    /// Block hash the claim was anchored to.
    pub block_hash: [u8; 32],
}

/// Body of a VerificationRemove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VerificationRemoveBody {
    pub address: Address,
}

/// Body shared by SignerAdd and SignerRemove: the delegate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SignerBody {
    pub signer: SignerKey,
}

/// Body of a UserDataAdd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UserDataBody {
    pub data_type: UserDataType,
    pub value: String,
}

/// Type-specific payload of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum MessageBody {
    CastAdd(CastAddBody),
    CastRemove(CastRemoveBody),
    Reaction(ReactionBody),
    Amp(AmpBody),
    VerificationAdd(VerificationAddBody),
    VerificationRemove(VerificationRemoveBody),
    Signer(SignerBody),
    UserData(UserDataBody),
}

impl MessageBody {
    /// Whether this body is legal for the given message type.
    #[must_use]
    pub const fn matches_type(&self, message_type: MessageType) -> bool {
        matches!(
            (self, message_type),
            (Self::CastAdd(_), MessageType::CastAdd)
                | (Self::CastRemove(_), MessageType::CastRemove)
                | (
                    Self::Reaction(_),
                    MessageType::ReactionAdd | MessageType::ReactionRemove
                )
                | (Self::Amp(_), MessageType::AmpAdd | MessageType::AmpRemove)
                | (
                    Self::VerificationAdd(_),
                    MessageType::VerificationAddEthAddress
                )
                | (Self::VerificationRemove(_), MessageType::VerificationRemove)
                | (
                    Self::Signer(_),
                    MessageType::SignerAdd | MessageType::SignerRemove
                )
                | (Self::UserData(_), MessageType::UserDataAdd)
        )
    }
}

/// The signed payload of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MessageData {
    /// The user this message belongs to.
    pub fid: Fid,
    /// The message kind.
    pub message_type: MessageType,
    /// Hub time the message was created at.
    pub timestamp: u32,
    /// Type-specific payload.
    pub body: MessageBody,
}

impl MessageData {
    /// The canonical byte encoding: what gets hashed and stored.
    pub fn canonical_bytes(&self) -> HubResult<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| HubError::unknown(format!("message data serialization failed: {e}")))
    }

    /// blake3 digest of the canonical bytes, truncated to 20 bytes.
    pub fn compute_hash(&self) -> HubResult<[u8; HASH_LENGTH]> {
        let bytes = self.canonical_bytes()?;
        let mut hash = [0u8; HASH_LENGTH];
        blake3::Hasher::new()
            .update(&bytes)
            .finalize_xof()
            .fill(&mut hash);
        Ok(hash)
    }
}

/// A signed message: the unit of replication in the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Message {
    /// The signed payload.
    pub data: MessageData,
    /// blake3 digest of the canonical payload bytes.
    pub hash: [u8; HASH_LENGTH],
    /// Scheme used to produce `hash`.
    pub hash_scheme: HashScheme,
    /// Signature over `hash`.
    pub signature: Vec<u8>,
    /// Scheme used to produce `signature`.
    pub signature_scheme: SignatureScheme,
    /// Public key that produced the signature. The custody key for signer
    /// messages, a delegate signer key otherwise.
    pub signer: SignerKey,
}

impl Message {
    /// Builds and signs a message over the given payload.
    pub fn sign(data: MessageData, signing_key: &ed25519_dalek::SigningKey) -> HubResult<Self> {
        use ed25519_dalek::Signer as _;

        let hash = data.compute_hash()?;
        let signature = signing_key.sign(&hash);
        Ok(Self {
            data,
            hash,
            hash_scheme: HashScheme::Blake3,
            signature: signature.to_bytes().to_vec(),
            signature_scheme: SignatureScheme::Ed25519,
            signer: SignerKey::from_bytes(signing_key.verifying_key().to_bytes()),
        })
    }

    /// The user this message belongs to.
    #[must_use]
    pub fn fid(&self) -> Fid {
        self.data.fid
    }

    /// The message kind.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.data.message_type
    }

    /// Hub time the message was created at.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.data.timestamp
    }

    /// The total-orderable identity of this message.
    #[must_use]
    pub fn ts_hash(&self) -> TsHash {
        TsHash::new(self.data.timestamp, &self.hash)
    }

    /// Checks structure, recomputes the hash, and verifies the signature.
    ///
    /// Does not consult any store: fid registration and signer authorization
    /// are the engine's responsibility.
    pub fn verify_integrity(&self) -> HubResult<()> {
        if !self.data.body.matches_type(self.data.message_type) {
            return Err(HubError::validation_failure(format!(
                "body does not match message type {:?}",
                self.data.message_type
            )));
        }

        let HashScheme::Blake3 = self.hash_scheme;
        let computed = self.data.compute_hash()?;
        if computed != self.hash {
            return Err(HubError::validation_failure("message hash mismatch"));
        }

        let SignatureScheme::Ed25519 = self.signature_scheme;
        let key = VerifyingKey::from_bytes(self.signer.as_bytes())
            .map_err(|e| HubError::validation_failure(format!("invalid signer key: {e}")))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|e| HubError::validation_failure(format!("invalid signature: {e}")))?;
        key.verify_strict(&self.hash, &signature)
            .map_err(|_| HubError::validation_failure("signature verification failed"))?;

        Ok(())
    }

    /// Encodes the message for the wire or a KV row.
    pub fn to_bytes(&self) -> HubResult<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| HubError::unknown(format!("message serialization failed: {e}")))
    }

    /// Decodes a message from its wire or row bytes.
    pub fn from_bytes(bytes: &[u8]) -> HubResult<Self> {
        borsh::from_slice(bytes)
            .map_err(|e| HubError::parse_failure(format!("malformed message bytes: {e}")))
    }
}
