//! Spend kinds: how an input's satisfaction is wrapped and hashed
//!
//! [`SpendKind::resolve`] inspects a UTXO's locking script together with its
//! redeem and witness scripts and decides:
//! - which [`ScriptTemplate`] must be satisfied
//! - which sighash algorithm applies (legacy or BIP 143)
//! - where the satisfaction goes (`script_sig`, witness, or both)

use crate::error::BuildError;
use crate::script::{
    push_element, PlaceholderSatisfier, Satisfier, SatisfyError, ScriptTemplate,
};
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::{PubkeyHash, ScriptBuf, WPubkeyHash, Witness};
use coinsmith_common::types::Branch;
use coinsmith_common::utxo_selection::Utxo;
use std::borrow::Cow;
use std::fmt;

/// How an input is spent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendKind {
    /// Bare script in the locking script (P2PK, P2PKH, bare multisig, ...)
    Legacy(ScriptTemplate),
    /// Pay to script hash; the template is the redeem script
    P2sh(ScriptTemplate),
    /// Native segwit v0 key hash
    P2wpkh(WPubkeyHash),
    /// Segwit v0 key hash nested in P2SH
    P2shP2wpkh(WPubkeyHash),
    /// Native segwit v0 script hash; the template is the witness script
    P2wsh(ScriptTemplate),
    /// Segwit v0 script hash nested in P2SH
    P2shP2wsh(ScriptTemplate),
}

/// A resolved input: its spend kind plus the scripts needed to sign it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpend {
    pub kind: SpendKind,
    /// Script committed to by the sighash
    pub script_code: ScriptBuf,
    /// Redeem script pushed in `script_sig` (P2SH variants)
    pub redeem_script: Option<ScriptBuf>,
    /// Witness script appended to the witness (P2WSH variants)
    pub witness_script: Option<ScriptBuf>,
}

impl SpendKind {
    /// Resolve how input `index`, spending `utxo`, is satisfied
    pub fn resolve(index: usize, utxo: &Utxo) -> Result<ResolvedSpend, BuildError> {
        let spk = &utxo.script_pubkey;
        let unsupported = |detail: &str| BuildError::UnsupportedScriptType {
            index,
            script: format!("{} ({})", hex::encode(spk.as_bytes()), detail),
        };

        if spk.is_p2sh() {
            let redeem = utxo
                .redeem_script
                .as_ref()
                .ok_or_else(|| unsupported("P2SH output without redeem script"))?;
            if &redeem.to_p2sh() != spk {
                return Err(unsupported("redeem script does not match script hash"));
            }

            if redeem.is_v0_p2wpkh() {
                let hash = witness_key_hash(redeem)
                    .ok_or_else(|| unsupported("bad P2WPKH program"))?;
                return Ok(ResolvedSpend {
                    kind: SpendKind::P2shP2wpkh(hash),
                    script_code: p2wpkh_script_code(&hash),
                    redeem_script: Some(redeem.clone()),
                    witness_script: None,
                });
            }

            if redeem.is_v0_p2wsh() {
                let witness = utxo
                    .witness_script
                    .as_ref()
                    .ok_or_else(|| unsupported("P2SH-P2WSH output without witness script"))?;
                if &witness.to_v0_p2wsh() != redeem {
                    return Err(unsupported("witness script does not match script hash"));
                }
                let template = parse(witness, &unsupported)?;
                return Ok(ResolvedSpend {
                    kind: SpendKind::P2shP2wsh(template),
                    script_code: witness.clone(),
                    redeem_script: Some(redeem.clone()),
                    witness_script: Some(witness.clone()),
                });
            }

            let template = parse(redeem, &unsupported)?;
            return Ok(ResolvedSpend {
                kind: SpendKind::P2sh(template),
                script_code: redeem.clone(),
                redeem_script: Some(redeem.clone()),
                witness_script: None,
            });
        }

        if spk.is_v0_p2wpkh() {
            let hash = witness_key_hash(spk).ok_or_else(|| unsupported("bad P2WPKH program"))?;
            return Ok(ResolvedSpend {
                kind: SpendKind::P2wpkh(hash),
                script_code: p2wpkh_script_code(&hash),
                redeem_script: None,
                witness_script: None,
            });
        }

        if spk.is_v0_p2wsh() {
            let witness = utxo
                .witness_script
                .as_ref()
                .ok_or_else(|| unsupported("P2WSH output without witness script"))?;
            if &witness.to_v0_p2wsh() != spk {
                return Err(unsupported("witness script does not match script hash"));
            }
            let template = parse(witness, &unsupported)?;
            return Ok(ResolvedSpend {
                kind: SpendKind::P2wsh(template),
                script_code: witness.clone(),
                redeem_script: None,
                witness_script: Some(witness.clone()),
            });
        }

        if spk.is_witness_program() {
            return Err(unsupported("unsupported witness version"));
        }

        let template = parse(spk, &unsupported)?;
        Ok(ResolvedSpend {
            kind: SpendKind::Legacy(template),
            script_code: spk.clone(),
            redeem_script: None,
            witness_script: None,
        })
    }

    /// Whether the input is signed with the BIP 143 sighash
    pub fn is_segwit(&self) -> bool {
        matches!(
            self,
            SpendKind::P2wpkh(_)
                | SpendKind::P2shP2wpkh(_)
                | SpendKind::P2wsh(_)
                | SpendKind::P2shP2wsh(_)
        )
    }

    /// The template whose satisfaction unlocks this input
    pub fn template(&self) -> Cow<'_, ScriptTemplate> {
        match self {
            SpendKind::Legacy(t)
            | SpendKind::P2sh(t)
            | SpendKind::P2wsh(t)
            | SpendKind::P2shP2wsh(t) => Cow::Borrowed(t),
            SpendKind::P2wpkh(hash) | SpendKind::P2shP2wpkh(hash) => Cow::Owned(
                ScriptTemplate::Pkh(PubkeyHash::from_raw_hash(hash.to_raw_hash())),
            ),
        }
    }

    /// Short name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            SpendKind::Legacy(_) => "legacy",
            SpendKind::P2sh(_) => "p2sh",
            SpendKind::P2wpkh(_) => "p2wpkh",
            SpendKind::P2shP2wpkh(_) => "p2sh-p2wpkh",
            SpendKind::P2wsh(_) => "p2wsh",
            SpendKind::P2shP2wsh(_) => "p2sh-p2wsh",
        }
    }
}

impl fmt::Display for SpendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.template())
    }
}

impl ResolvedSpend {
    /// Satisfy input `index` along `path` and wrap the stack for the transaction
    pub fn satisfy(
        &self,
        index: usize,
        path: &[Branch],
        satisfier: &mut dyn Satisfier,
    ) -> Result<(ScriptBuf, Witness), BuildError> {
        let stack = self
            .kind
            .template()
            .satisfy(path, satisfier)
            .map_err(|e: SatisfyError| BuildError::SigningMismatch {
                index,
                reason: e.to_string(),
            })?;
        self.embed(stack)
    }

    /// Placeholder unlocking data for fee estimation
    ///
    /// Never smaller than the real satisfaction. Segwit spends only accept
    /// compressed keys; legacy key hashes are priced as uncompressed keys.
    pub fn placeholder(
        &self,
        index: usize,
        path: &[Branch],
    ) -> Result<(ScriptBuf, Witness), BuildError> {
        let mut satisfier = if self.kind.is_segwit() {
            PlaceholderSatisfier::compressed()
        } else {
            PlaceholderSatisfier::uncompressed()
        };
        self.satisfy(index, path, &mut satisfier)
    }

    /// Place a satisfaction stack into `script_sig` and witness
    pub fn embed(&self, stack: Vec<Vec<u8>>) -> Result<(ScriptBuf, Witness), BuildError> {
        match &self.kind {
            SpendKind::Legacy(_) => {
                let script_sig = push_all(Builder::new(), &stack)?.into_script();
                Ok((script_sig, Witness::new()))
            }
            SpendKind::P2sh(_) => {
                let builder = push_all(Builder::new(), &stack)?;
                let script_sig = push_redeem(builder, self.redeem_script.as_ref())?.into_script();
                Ok((script_sig, Witness::new()))
            }
            SpendKind::P2wpkh(_) => Ok((ScriptBuf::new(), Witness::from_slice(&stack))),
            SpendKind::P2wsh(_) => Ok((ScriptBuf::new(), self.witness_with_script(stack)?)),
            SpendKind::P2shP2wpkh(_) => {
                let script_sig =
                    push_redeem(Builder::new(), self.redeem_script.as_ref())?.into_script();
                Ok((script_sig, Witness::from_slice(&stack)))
            }
            SpendKind::P2shP2wsh(_) => {
                let script_sig =
                    push_redeem(Builder::new(), self.redeem_script.as_ref())?.into_script();
                Ok((script_sig, self.witness_with_script(stack)?))
            }
        }
    }

    fn witness_with_script(&self, mut stack: Vec<Vec<u8>>) -> Result<Witness, BuildError> {
        let script = self
            .witness_script
            .as_ref()
            .ok_or_else(|| BuildError::Script("witness script missing".to_string()))?;
        stack.push(script.to_bytes());
        Ok(Witness::from_slice(&stack))
    }
}

fn parse(
    script: &ScriptBuf,
    unsupported: &dyn Fn(&str) -> BuildError,
) -> Result<ScriptTemplate, BuildError> {
    ScriptTemplate::parse(script).map_err(|e| unsupported(&e.to_string()))
}

fn witness_key_hash(program: &ScriptBuf) -> Option<WPubkeyHash> {
    // OP_0 <20 bytes>
    WPubkeyHash::from_slice(program.as_bytes().get(2..22)?).ok()
}

fn p2wpkh_script_code(hash: &WPubkeyHash) -> ScriptBuf {
    ScriptBuf::new_p2pkh(&PubkeyHash::from_raw_hash(hash.to_raw_hash()))
}

fn push_all(mut builder: Builder, stack: &[Vec<u8>]) -> Result<Builder, BuildError> {
    for element in stack {
        builder =
            push_element(builder, element).map_err(|e| BuildError::Script(e.to_string()))?;
    }
    Ok(builder)
}

fn push_redeem(builder: Builder, redeem: Option<&ScriptBuf>) -> Result<Builder, BuildError> {
    let redeem = redeem.ok_or_else(|| BuildError::Script("redeem script missing".to_string()))?;
    let data = PushBytesBuf::try_from(redeem.to_bytes())
        .map_err(|_| BuildError::Script(format!("redeem script of {} bytes", redeem.len())))?;
    Ok(builder.push_slice(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{Amount, OutPoint, PublicKey, Txid};

    fn key(n: u8) -> PublicKey {
        let secp = Secp256k1::signing_only();
        PublicKey::new(SecretKey::from_slice(&[n; 32]).unwrap().public_key(&secp))
    }

    fn utxo(spk: ScriptBuf) -> Utxo {
        Utxo::new(OutPoint::new(Txid::all_zeros(), 0), Amount::from_sat(10_000), spk)
    }

    #[test]
    fn test_resolve_p2wpkh() {
        let hash = key(1).wpubkey_hash().unwrap();
        let resolved = SpendKind::resolve(0, &utxo(ScriptBuf::new_v0_p2wpkh(&hash))).unwrap();
        assert_eq!(resolved.kind, SpendKind::P2wpkh(hash));
        assert!(resolved.kind.is_segwit());
        assert!(resolved.script_code.is_p2pkh());
    }

    #[test]
    fn test_resolve_nested_witness_script() {
        let witness = ScriptTemplate::Pk(key(2)).to_script();
        let redeem = witness.to_v0_p2wsh();
        let u = utxo(redeem.to_p2sh())
            .with_redeem_script(redeem.clone())
            .with_witness_script(witness.clone());

        let resolved = SpendKind::resolve(3, &u).unwrap();
        assert_eq!(resolved.kind, SpendKind::P2shP2wsh(ScriptTemplate::Pk(key(2))));
        assert_eq!(resolved.script_code, witness);
        assert_eq!(resolved.redeem_script, Some(redeem));
    }

    #[test]
    fn test_resolve_rejects_mismatched_redeem_script() {
        let redeem = ScriptTemplate::Pk(key(2)).to_script();
        let other = ScriptTemplate::Pk(key(3)).to_script();
        let u = utxo(redeem.to_p2sh()).with_redeem_script(other);

        assert!(matches!(
            SpendKind::resolve(5, &u),
            Err(BuildError::UnsupportedScriptType { index: 5, .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_unknown_script() {
        let u = utxo(ScriptBuf::from(vec![0x6a, 0x01, 0x01]));
        assert!(matches!(
            SpendKind::resolve(1, &u),
            Err(BuildError::UnsupportedScriptType { index: 1, .. })
        ));
    }

    #[test]
    fn test_placeholder_p2pkh_size() {
        let spk = ScriptBuf::new_p2pkh(&key(1).pubkey_hash());
        let resolved = SpendKind::resolve(0, &utxo(spk)).unwrap();
        let (script_sig, witness) = resolved.placeholder(0, &[]).unwrap();
        // push(72) + push(65): the key behind the hash may be uncompressed
        assert_eq!(script_sig.len(), 1 + 72 + 1 + 65);
        assert!(witness.is_empty());
    }

    #[test]
    fn test_placeholder_p2sh_p2wpkh_layout() {
        let hash = key(1).wpubkey_hash().unwrap();
        let redeem = ScriptBuf::new_v0_p2wpkh(&hash);
        let u = utxo(redeem.to_p2sh()).with_redeem_script(redeem);
        let resolved = SpendKind::resolve(0, &u).unwrap();

        let (script_sig, witness) = resolved.placeholder(0, &[]).unwrap();
        assert_eq!(script_sig.len(), 1 + 22);
        assert_eq!(witness.len(), 2);
        assert_eq!(witness.to_vec()[1].len(), 33);
    }
}
