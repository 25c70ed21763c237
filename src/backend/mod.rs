//! The handoff contract between the mid-end and a backend's own textual (or
//! bytecode) emission (§6 "AST/handoff contract to backends").
//!
//! A backend receives the fully validated [`Program`] plus the validator's
//! [`GlobalContext`] and a resolved [`ExternClassMeta`] table — by the time
//! it runs, every guarantee in [`BackendInput`]'s doc comment already holds.
//! This crate does not ship a C++/JS/bytecode emitter itself; `Backend` is
//! the seam a downstream crate implements against.

use crate::ast::Program;
use crate::extern_meta::ExternClassMeta;
use crate::validator::GlobalContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a backend is handed for one compilation unit. By contract
/// (§6): types are fully resolved, narrowing facts are available per-node,
/// private/const/readonly/null-safety/isolation rules have already held,
/// generic references have been rewritten to monomorphic names, and
/// interface uses have been replaced by union types under closed-world mode.
pub struct BackendInput<'a> {
    pub program: &'a Program,
    pub global_context: &'a GlobalContext,
    pub extern_metadata: &'a [ExternClassMeta],
    pub basename: &'a str,
}

/// Textual emission output for a C++/JS-style backend. Either field may be
/// absent depending on `outputHeader`/`outputSource` (§6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextArtifact {
    pub header: Option<String>,
    pub source: Option<String>,
    pub source_map: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub mnemonic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operands: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDebugRange {
    pub name: String,
    pub start_instruction: usize,
    pub end_instruction: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub functions: Vec<FunctionDebugRange>,
}

/// The VM backend artifact format (§6 "Bytecode JSON"). The mid-end
/// guarantees `constants` is deduplicated and every `debug.functions` range
/// indexes into `instructions`; `validate` re-checks both on request (e.g.
/// from a test harness that receives this shape from an external backend).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BytecodeArtifact {
    pub constants: Vec<Constant>,
    pub instructions: Vec<Instruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BytecodeValidationError {
    DuplicateConstant(usize, usize),
    InstructionRangeOutOfBounds { function: String, end: usize, instruction_count: usize },
    InvertedRange { function: String, start: usize, end: usize },
}

impl fmt::Display for BytecodeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BytecodeValidationError::DuplicateConstant(i, j) => {
                write!(f, "constants at indices {i} and {j} are duplicates")
            }
            BytecodeValidationError::InstructionRangeOutOfBounds {
                function,
                end,
                instruction_count,
            } => write!(
                f,
                "debug range for '{function}' ends at instruction {end}, but only {instruction_count} instructions exist"
            ),
            BytecodeValidationError::InvertedRange { function, start, end } => {
                write!(f, "debug range for '{function}' has start {start} after end {end}")
            }
        }
    }
}

impl BytecodeArtifact {
    /// Checks the two invariants §6 promises of this shape: no duplicate
    /// constants and every debug range addresses real instructions.
    pub fn validate(&self) -> Result<(), BytecodeValidationError> {
        for i in 0..self.constants.len() {
            for j in (i + 1)..self.constants.len() {
                if self.constants[i] == self.constants[j] {
                    return Err(BytecodeValidationError::DuplicateConstant(i, j));
                }
            }
        }
        if let Some(debug) = &self.debug {
            for range in &debug.functions {
                if range.start_instruction > range.end_instruction {
                    return Err(BytecodeValidationError::InvertedRange {
                        function: range.name.clone(),
                        start: range.start_instruction,
                        end: range.end_instruction,
                    });
                }
                if range.end_instruction > self.instructions.len() {
                    return Err(BytecodeValidationError::InstructionRangeOutOfBounds {
                        function: range.name.clone(),
                        end: range.end_instruction,
                        instruction_count: self.instructions.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum BackendError {
    Unsupported(String),
    Emission(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            BackendError::Emission(msg) => write!(f, "emission error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// A code generator for one target language. Implemented outside this
/// crate; the mid-end only needs to hand over a [`BackendInput`].
pub trait Backend {
    /// The backend tag this implementation answers to (`"cpp"`, `"js"`,
    /// `"bytecode"`, ...).
    fn target(&self) -> &str;

    fn emit_text(&self, _input: &BackendInput) -> Result<TextArtifact, BackendError> {
        Err(BackendError::Unsupported(format!(
            "'{}' backend does not emit textual output",
            self.target()
        )))
    }

    fn emit_bytecode(&self, _input: &BackendInput) -> Result<BytecodeArtifact, BackendError> {
        Err(BackendError::Unsupported(format!(
            "'{}' backend does not emit bytecode",
            self.target()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytecode_artifact_with_duplicate_constants_fails_validation() {
        let artifact = BytecodeArtifact {
            constants: vec![
                Constant {
                    ty: "int".to_string(),
                    value: serde_json::json!(1),
                },
                Constant {
                    ty: "int".to_string(),
                    value: serde_json::json!(1),
                },
            ],
            instructions: Vec::new(),
            debug: None,
        };
        assert!(matches!(
            artifact.validate(),
            Err(BytecodeValidationError::DuplicateConstant(0, 1))
        ));
    }

    #[test]
    fn debug_range_past_instruction_count_fails_validation() {
        let artifact = BytecodeArtifact {
            constants: Vec::new(),
            instructions: vec![Instruction {
                mnemonic: "NOP".to_string(),
                operands: None,
            }],
            debug: Some(DebugInfo {
                functions: vec![FunctionDebugRange {
                    name: "main".to_string(),
                    start_instruction: 0,
                    end_instruction: 5,
                }],
            }),
        };
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn well_formed_artifact_validates() {
        let artifact = BytecodeArtifact {
            constants: vec![Constant {
                ty: "int".to_string(),
                value: serde_json::json!(1),
            }],
            instructions: vec![Instruction {
                mnemonic: "LOAD_CONST".to_string(),
                operands: Some(vec![serde_json::json!(0)]),
            }],
            debug: Some(DebugInfo {
                functions: vec![FunctionDebugRange {
                    name: "main".to_string(),
                    start_instruction: 0,
                    end_instruction: 1,
                }],
            }),
        };
        assert!(artifact.validate().is_ok());
    }
}
