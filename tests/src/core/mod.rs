//! Integration tests for `crucible-core` against bytecode of real deployments.
//!
//! Every fixture pair holds the code solc produced (`*_compiled.hex`) and the code found on
//! chain (`*_deployed.hex`) for the same contract.

mod address;
mod call_protection;
mod immutables;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use crucible_core::Bytecode;

pub const LIBRARY_COMPILED: &str = include_str!("../../fixtures/library_compiled.hex");
pub const LIBRARY_DEPLOYED: &str = include_str!("../../fixtures/library_deployed.hex");
pub const IMMUTABLES_COMPILED: &str = include_str!("../../fixtures/immutables_compiled.hex");
pub const IMMUTABLES_DEPLOYED: &str = include_str!("../../fixtures/immutables_deployed.hex");
pub const CONSTRUCTOR_COMPILED: &str = include_str!("../../fixtures/constructor_compiled.hex");
pub const CONSTRUCTOR_DEPLOYED: &str = include_str!("../../fixtures/constructor_deployed.hex");
pub const AUXDATA_COMPILED: &str = include_str!("../../fixtures/auxdata_compiled.hex");
pub const AUXDATA_DEPLOYED: &str = include_str!("../../fixtures/auxdata_deployed.hex");

/// Placeholder solc emits for an unlinked library reference.
pub const LIBRARY_PLACEHOLDER: &str = "__$da572ae5e60c838574a0f88b27a0543803$__";
/// Hex offset of the library address in the library fixture.
pub const LIBRARY_OFFSET: usize = 434;

pub fn bytecode(raw: &str) -> Result<Bytecode> {
    Bytecode::parse(raw).map_err(|e| eyre!("Failed to parse fixture: {}", e))
}

/// Library fixture with its linked address turned back into a placeholder.
pub fn unlinked_library() -> Result<Bytecode> {
    let linked = bytecode(LIBRARY_COMPILED)?;
    let text = linked.as_str();
    let unlinked = format!(
        "{}{}{}",
        &text[..LIBRARY_OFFSET],
        LIBRARY_PLACEHOLDER,
        &text[LIBRARY_OFFSET + 40..]
    );
    bytecode(&unlinked)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
