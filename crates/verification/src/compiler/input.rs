//! Standard-JSON compiler input rebuilt from metadata.

use crate::metadata::CheckedContract;
use crate::result::CompilerError;
use serde_json::{Map, Value, json};

/// Output selection needed to build a [`CompiledArtifact`](crate::CompiledArtifact).
const OUTPUT_SELECTION: [&str; 4] = ["abi", "evm.bytecode", "evm.deployedBytecode", "metadata"];

/// Builds `solc --standard-json` input for the contract's compilation target.
pub fn standard_json(contract: &CheckedContract) -> Result<Value, CompilerError> {
    let metadata = &contract.metadata;

    let mut sources = Map::new();
    for path in metadata.sources.keys() {
        let content = contract
            .sources
            .get(path)
            .ok_or_else(|| CompilerError::Metadata(format!("missing source {path}")))?;
        sources.insert(path.clone(), json!({ "content": content }));
    }

    let mut settings = match serde_json::to_value(&metadata.settings)? {
        Value::Object(settings) => settings,
        _ => Map::new(),
    };
    settings.remove("compilationTarget");

    // Metadata stores libraries as "path:Name" -> address, standard JSON nests them.
    if let Some(Value::Object(flat)) = settings.remove("libraries") {
        let mut nested = Map::new();
        for (qualified, address) in flat {
            let (path, name) = qualified
                .rsplit_once(':')
                .map(|(path, name)| (path.to_string(), name.to_string()))
                .unwrap_or_else(|| (String::new(), qualified.clone()));
            let entry = nested
                .entry(path)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(entry) = entry {
                entry.insert(name, address);
            }
        }
        settings.insert("libraries".into(), Value::Object(nested));
    }

    let mut target = Map::new();
    target.insert(contract.name().to_string(), json!(OUTPUT_SELECTION));
    let mut selection = Map::new();
    selection.insert(contract.compiled_path().to_string(), Value::Object(target));
    settings.insert("outputSelection".into(), Value::Object(selection));

    Ok(json!({
        "language": metadata.language,
        "sources": sources,
        "settings": settings,
    }))
}
