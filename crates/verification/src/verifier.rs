//! End-to-end verification of one contract at one address.

use crate::artifact::CompiledArtifact;
use crate::chain::{Chain, CreatorTransaction};
use crate::compiler::{Backend, Compiler};
use crate::fallback::find_perfect_metadata;
use crate::matcher::{CreationOutcome, Deployment, match_creation, match_runtime};
use crate::metadata::CheckedContract;
use crate::result::{Error, Result};
use crate::verdict::{Create2Args, Match, MatchStatus};
use alloy::primitives::{Address, B256};
use crucible_core::{Bytecode, HexBytes};
use crucible_core::address::{checksum, create2_address, parse_address, parse_salt, same_address};
use crucible_core::auxdata::split_auxdata;
use std::str::FromStr;
use std::time::Instant;

const EXTRA_FILE_INPUT_MESSAGE: &str = "It seems your contract has either Solidity v0.6.12 or v0.7.0, and the metadata hashes match but not the bytecodes. You should add all the files input to the compiler during compilation and remove all others. See the issue for more information: https://github.com/ethereum/sourcify/issues/618";

/// Releases whose metadata hash changes with unused files in the compiler input.
fn has_extra_file_input_bug(version: &semver::Version) -> bool {
    version.pre.is_empty()
        && matches!((version.major, version.minor, version.patch), (0, 6, 12) | (0, 7, 0))
}

/// Native builds before 0.8.21 can emit different code than the alternate build for
/// unoptimized `viaIR` compilations.
fn needs_alternate_backend(contract: &CheckedContract) -> bool {
    let Ok(version) = contract.compiler_version() else {
        return false;
    };
    version < semver::Version::new(0, 8, 21)
        && !contract.optimizer_enabled()
        && contract.via_ir()
}

enum Attempt {
    /// Nothing to compare against; returned as is.
    Terminal(Match),
    Finished(Match),
}

/// On-chain data describing how a contract was created.
struct CreationInput {
    creator: CreatorTransaction,
    code: Bytecode,
}

pub struct Verifier<C, H> {
    compiler: C,
    chain: H,
}

impl<C: Compiler, H: Chain> Verifier<C, H> {
    pub fn new(compiler: C, chain: H) -> Self {
        Self { compiler, chain }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn chain(&self) -> &H {
        &self.chain
    }

    /// Verifies `contract` against the code deployed at `address`.
    ///
    /// When a better-fitting metadata variant produces a perfect match, `contract` is
    /// updated in place to that variant. Returns [`Error::NoMatch`] only when every
    /// strategy failed; unreachable chains and missing code are reported in the match.
    pub async fn verify(
        &self,
        contract: &mut CheckedContract,
        address: &str,
        creator_tx_hash: Option<&str>,
        backend: Backend,
    ) -> Result<Match> {
        let start_time = Instant::now();
        tracing::info!(
            "Verifying contract {} at address {} on chain {}",
            contract.name(),
            address,
            self.chain.chain_id()
        );

        let mut backend = backend;
        let mut retried = false;
        loop {
            let verdict = match self.attempt(contract, address, creator_tx_hash, backend).await? {
                Attempt::Terminal(verdict) => return Ok(verdict),
                Attempt::Finished(verdict) => verdict,
            };

            if verdict.is_verified() {
                tracing::info!(
                    "Verified {} in {:.2}s: runtime {:?}, creation {:?}",
                    contract.name(),
                    start_time.elapsed().as_secs_f64(),
                    verdict.runtime_match,
                    verdict.creation_match
                );
                return Ok(verdict);
            }

            // Bounded to one extra attempt.
            if !retried && backend == Backend::Native && needs_alternate_backend(contract) {
                tracing::info!(
                    "Retrying {} at {} with the alternate compiler backend",
                    contract.name(),
                    address
                );
                backend = Backend::Alternate;
                retried = true;
                continue;
            }

            tracing::info!("No match for {} at {}", contract.name(), address);
            return Err(Error::NoMatch);
        }
    }

    async fn attempt(
        &self,
        contract: &mut CheckedContract,
        address: &str,
        creator_tx_hash: Option<&str>,
        backend: Backend,
    ) -> Result<Attempt> {
        let chain_id = self.chain.chain_id();
        let mut verdict = Match::new(address, chain_id);

        // 1. Recompile
        let mut artifact = self.compiler.recompile(contract, backend).await?;
        if artifact.is_empty() {
            return Err(Error::AbstractContract);
        }

        // 2. Fetch deployed code
        let target = parse_address(address)?;
        let onchain = match self.chain.deployed_bytecode(target).await {
            Ok(code) => code,
            Err(err) => {
                tracing::warn!("fetching code at {} failed: {}", address, err);
                verdict.message = Some(format!("Chain #{chain_id} is temporarily unavailable."));
                return Ok(Attempt::Terminal(verdict));
            }
        };
        if onchain.is_empty() {
            verdict.message = Some(format!(
                "Chain #{chain_id} does not have a contract deployed at {address}."
            ));
            return Ok(Attempt::Terminal(verdict));
        }

        // 3. Runtime match, upgraded through the metadata fallback when partial
        verdict.apply_runtime(match_runtime(
            &artifact.runtime_bytecode,
            &onchain,
            Some(&artifact.immutable_references),
        ));
        if verdict.runtime_match == Some(MatchStatus::Partial)
            && let Some((candidate, recompiled)) = self.perfect_candidate(contract, &onchain).await
        {
            let mut upgraded = verdict.clone();
            upgraded.apply_runtime(match_runtime(
                &recompiled.runtime_bytecode,
                &onchain,
                Some(&recompiled.immutable_references),
            ));
            if upgraded.runtime_match == Some(MatchStatus::Perfect) {
                tracing::info!("runtime match upgraded to perfect with alternate metadata");
                *contract = candidate;
                artifact = recompiled;
                verdict = upgraded;
            }
        }

        // 4. Creation match
        if let Some(hash) = creator_tx_hash {
            verdict.creator_tx_hash = Some(hash.to_string());
            self.creation_step(&mut verdict, contract, &artifact, &onchain, target, hash)
                .await;
        }

        // 5. Extra-file-input compiler bug
        if !verdict.is_verified()
            && contract
                .compiler_version()
                .is_ok_and(|version| has_extra_file_input_bug(&version))
            && contract.optimizer_enabled()
        {
            let (_, onchain_auxdata) = split_auxdata(&onchain);
            let (_, recompiled_auxdata) = split_auxdata(&artifact.runtime_bytecode);
            if onchain_auxdata.is_some() && onchain_auxdata == recompiled_auxdata {
                tracing::warn!("{} hits the extra-file-input compiler bug", contract.name());
                verdict.runtime_match = Some(MatchStatus::ExtraFileInputBug);
                verdict.message = Some(EXTRA_FILE_INPUT_MESSAGE.to_string());
            }
        }

        Ok(Attempt::Finished(verdict))
    }

    async fn creation_step(
        &self,
        verdict: &mut Match,
        contract: &mut CheckedContract,
        artifact: &CompiledArtifact,
        onchain_runtime: &Bytecode,
        target: Address,
        hash: &str,
    ) {
        let input = match self.creation_input(target, hash).await {
            Some(input) => input,
            None => {
                verdict.apply_creation(CreationOutcome::failed(
                    None,
                    "Failed to match with creation bytecode: couldn't get the creation bytecode.",
                ));
                return;
            }
        };

        let address = verdict.address.clone();
        let deployment = Deployment {
            address: &address,
            creator_tx_hash: hash,
            creator: &input.creator,
        };
        let constructor = artifact.metadata.constructor_abi();
        verdict.apply_creation(match_creation(
            &artifact.creation_bytecode,
            &input.code,
            constructor.as_ref(),
            deployment,
        ));

        if verdict.creation_match != Some(MatchStatus::Partial) {
            return;
        }
        let Some((candidate, recompiled)) = self.perfect_candidate(contract, onchain_runtime).await
        else {
            return;
        };
        let mut upgraded = verdict.clone();
        upgraded.apply_creation(match_creation(
            &recompiled.creation_bytecode,
            &input.code,
            constructor.as_ref(),
            deployment,
        ));
        if upgraded.creation_match == Some(MatchStatus::Perfect) {
            tracing::info!("creation match upgraded to perfect with alternate metadata");
            *contract = candidate;
            *verdict = upgraded;
        }
    }

    async fn creation_input(&self, target: Address, hash: &str) -> Option<CreationInput> {
        let hash = match B256::from_str(hash) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!("invalid creator transaction hash {}: {}", hash, err);
                return None;
            }
        };
        let creator = match self.chain.transaction(hash).await {
            Ok(creator) => creator,
            Err(err) => {
                tracing::warn!("fetching creator transaction {} failed: {}", hash, err);
                return None;
            }
        };
        match self.chain.creation_bytecode(target, hash).await {
            Ok(Some(code)) => Some(CreationInput { creator, code }),
            Ok(None) => {
                tracing::warn!("no creation bytecode for {} in {}", target, hash);
                None
            }
            Err(err) => {
                tracing::warn!("fetching creation bytecode from {} failed: {}", hash, err);
                None
            }
        }
    }

    /// Recompiles the metadata variant that fits the on-chain hash, if there is one.
    async fn perfect_candidate(
        &self,
        contract: &CheckedContract,
        onchain_runtime: &Bytecode,
    ) -> Option<(CheckedContract, CompiledArtifact)> {
        let candidate = find_perfect_metadata(contract, onchain_runtime)?;
        match self.compiler.recompile(&candidate, Backend::Native).await {
            Ok(artifact) if !artifact.is_empty() => Some((candidate, artifact)),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("recompiling alternate metadata failed: {}", err);
                None
            }
        }
    }

    /// Verifies a `CREATE2` deployment without touching the chain.
    ///
    /// The derived address must equal `create2_address`; the result has `chainId` 0 and a
    /// perfect runtime verdict.
    pub async fn verify_create2(
        &self,
        contract: &CheckedContract,
        deployer: &str,
        salt: &str,
        create2_address_claimed: &str,
        constructor_args: Option<&str>,
    ) -> Result<Match> {
        let artifact = self.compiler.recompile(contract, Backend::Native).await?;
        if artifact.is_empty() {
            return Err(Error::AbstractContract);
        }

        let arguments = match constructor_args {
            Some(args) => Bytecode::parse(args)?.to_bytes()?,
            None => Vec::new(),
        };
        let derived = create2_address(
            parse_address(deployer)?,
            parse_salt(salt)?,
            &artifact.creation_bytecode.to_bytes()?,
            &arguments,
        );
        let derived = checksum(&derived);
        if !same_address(&derived, create2_address_claimed) {
            return Err(Error::Create2AddressMismatch {
                derived,
                provided: create2_address_claimed.to_string(),
            });
        }
        tracing::info!("Verified {} as CREATE2 deployment at {}", contract.name(), derived);

        let mut verdict = Match::new(derived, 0);
        verdict.runtime_match = Some(MatchStatus::Perfect);
        verdict.abi_encoded_constructor_arguments =
            (!arguments.is_empty()).then(|| HexBytes(arguments));
        verdict.create2_args = Some(Create2Args {
            deployer_address: deployer.to_string(),
            salt: salt.to_string(),
        });
        Ok(verdict)
    }
}
