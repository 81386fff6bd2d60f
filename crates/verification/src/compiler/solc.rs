//! `solc --standard-json` driver.

use super::cache::{BinaryFetcher, CompilerCache, HttpFetcher};
use super::{Backend, Compiler, input};
use crate::artifact::CompiledArtifact;
use crate::metadata::{CheckedContract, Metadata};
use crate::result::CompilerError;
use async_trait::async_trait;
use crucible_core::Bytecode;
use crucible_core::link::ImmutableReferences;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Clone, Debug)]
pub struct SolcConfig {
    /// Directory holding downloaded compiler builds.
    pub cache_dir: PathBuf,
    /// Command that executes the alternate build, e.g. `node solcjs-runner.js`.
    /// It receives the path of the build as its last argument and standard JSON on stdin.
    pub alternate_runner: Option<String>,
}

impl Default for SolcConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("crucible-solc"),
            alternate_runner: None,
        }
    }
}

pub struct SolcCompiler<F = HttpFetcher> {
    cache: CompilerCache<F>,
    alternate_runner: Option<String>,
}

impl SolcCompiler<HttpFetcher> {
    pub fn new(config: SolcConfig) -> Self {
        Self::with_fetcher(HttpFetcher::new(config.cache_dir), config.alternate_runner)
    }
}

impl<F: BinaryFetcher> SolcCompiler<F> {
    pub fn with_fetcher(fetcher: F, alternate_runner: Option<String>) -> Self {
        Self {
            cache: CompilerCache::new(fetcher),
            alternate_runner,
        }
    }

    fn command(&self, backend: Backend, build: &Path) -> Result<Command, CompilerError> {
        match backend {
            Backend::Native => {
                let mut command = Command::new(build);
                command.arg("--standard-json");
                Ok(command)
            }
            Backend::Alternate => {
                let runner = self
                    .alternate_runner
                    .as_deref()
                    .ok_or(CompilerError::BackendUnavailable(backend))?;
                let mut parts = runner.split_whitespace();
                let program = parts
                    .next()
                    .ok_or(CompilerError::BackendUnavailable(backend))?;
                let mut command = Command::new(program);
                command.args(parts).arg(build);
                Ok(command)
            }
        }
    }
}

async fn run(mut command: Command, input: &[u8]) -> Result<Vec<u8>, CompilerError> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).await?;
        stdin.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(CompilerError::Process {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(output.stdout)
}

/// Pulls the target contract out of standard-JSON output.
pub fn parse_output(output: &Value, path: &str, name: &str) -> Result<CompiledArtifact, CompilerError> {
    let errors: Vec<&str> = output
        .get("errors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|error| error.get("severity").and_then(Value::as_str) == Some("error"))
        .map(|error| {
            error
                .get("formattedMessage")
                .or_else(|| error.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
        })
        .collect();
    if !errors.is_empty() {
        return Err(CompilerError::Compilation(errors.join("\n")));
    }

    let contract = output
        .get("contracts")
        .and_then(|contracts| contracts.get(path))
        .and_then(|file| file.get(name))
        .ok_or_else(|| CompilerError::MissingContract {
            path: path.to_string(),
            name: name.to_string(),
        })?;

    let object = |pointer: &str| -> Result<Bytecode, CompilerError> {
        Ok(Bytecode::parse(
            contract.pointer(pointer).and_then(Value::as_str).unwrap_or_default(),
        )?)
    };
    let creation_bytecode = object("/evm/bytecode/object")?;
    let runtime_bytecode = object("/evm/deployedBytecode/object")?;

    let immutable_references: ImmutableReferences = match contract
        .pointer("/evm/deployedBytecode/immutableReferences")
    {
        Some(references) => serde_json::from_value(references.clone())?,
        None => ImmutableReferences::new(),
    };

    // Abstract contracts come back without metadata.
    let metadata = match contract.get("metadata").and_then(Value::as_str) {
        Some(raw) if !raw.is_empty() => serde_json::from_str::<Metadata>(raw)?,
        _ => Metadata::default(),
    };

    Ok(CompiledArtifact {
        creation_bytecode,
        runtime_bytecode,
        metadata,
        immutable_references,
    })
}

#[async_trait]
impl<F: BinaryFetcher> Compiler for SolcCompiler<F> {
    async fn recompile(
        &self,
        contract: &CheckedContract,
        backend: Backend,
    ) -> Result<CompiledArtifact, CompilerError> {
        let version = contract
            .compiler_version()
            .map_err(|_| CompilerError::InvalidVersion(contract.metadata.compiler.version.clone()))?;
        let build = self.cache.get(backend, &version.to_string()).await?;

        let input = serde_json::to_vec(&input::standard_json(contract)?)?;
        tracing::debug!(
            "compiling {} with {} solc {} ({} bytes of input)",
            contract.name(),
            backend,
            version,
            input.len()
        );

        let stdout = run(self.command(backend, &build)?, &input).await?;
        let output: Value = serde_json::from_slice(&stdout)?;
        let artifact = parse_output(&output, contract.compiled_path(), contract.name())?;
        tracing::debug!(
            "{} compiled: {} creation bytes, {} runtime bytes",
            contract.name(),
            artifact.creation_bytecode.byte_len(),
            artifact.runtime_bytecode.byte_len()
        );
        Ok(artifact)
    }
}
