//! Compiler used by the CLI, which links no compiler backends.

use async_trait::async_trait;
use kiln_core::ports::{Compiler, Generated};
use kiln_core::{AssetDescriptor, Ast, Error, Result};

/// Refuses every regeneration request.
#[derive(Debug, Default)]
pub struct NoCompiler;

#[async_trait]
impl Compiler for NoCompiler {
    async fn generate_from_ast(&self, asset: &AssetDescriptor, ast: &Ast) -> Result<Generated> {
        Err(Error::Generation(format!(
            "no compiler for '{}' ASTs is available to regenerate asset {}",
            ast.kind, asset.id
        )))
    }
}
