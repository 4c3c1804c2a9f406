//! Shared swc-based parsing helpers.
//!
//! The crate has no AST-to-source codegen dependency (mirroring the
//! teacher, which never re-emits source from an AST either). Structural
//! rewrites instead splice replacement text into the original source at
//! byte offsets recovered from spans, then reparse to validate.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use swc_common::{BytePos, FileName, Globals, SourceMap, Span, GLOBALS};
use swc_ecma_ast::{Expr, Lit, ModuleItem, Stmt};
use swc_ecma_parser::{Parser, StringInput, Syntax, TsSyntax};

pub use swc_ecma_ast::Module;

/// A parsed module plus enough bookkeeping to translate spans back into
/// byte offsets of the original source string.
pub struct ParsedModule {
    pub module: Module,
    pub source_map: Arc<SourceMap>,
    start_pos: BytePos,
}

impl ParsedModule {
    /// Byte offsets of `span` within the original source text passed to
    /// [`parse_module`].
    pub fn byte_range(&self, span: Span) -> (usize, usize) {
        (
            (span.lo.0 - self.start_pos.0) as usize,
            (span.hi.0 - self.start_pos.0) as usize,
        )
    }
}

/// Parse TSX/JSX-flavored TypeScript source. Used for both `.ts`/`.tsx`
/// and `.js`/`.jsx` input since the TSX grammar is a superset.
pub fn parse_module(code: &str, file_path: &str) -> Result<ParsedModule> {
    GLOBALS.set(&Globals::new(), || {
        let source_map: Arc<SourceMap> = Arc::new(SourceMap::default());
        let source_file =
            source_map.new_source_file(FileName::Real(file_path.into()).into(), code.to_string());
        let start_pos = source_file.start_pos;

        let syntax = Syntax::Typescript(TsSyntax {
            tsx: true,
            ..Default::default()
        });
        let mut parser = Parser::new(syntax, StringInput::from(&*source_file), None);

        let module = parser
            .parse_module()
            .map_err(|e| anyhow!("failed to parse {file_path}: {e:?}"))?;

        Ok(ParsedModule {
            module,
            source_map,
            start_pos,
        })
    })
}

/// The directive string of a module-level prologue statement, if the
/// first item is a bare string-literal expression statement (swc does
/// not model a directive prologue specially for `Module`, only for
/// `Program::Script`, so this mirrors what the grammar actually produces).
pub fn leading_module_directive(items: &[ModuleItem]) -> Option<String> {
    let first = items.first()?;
    let ModuleItem::Stmt(stmt) = first else {
        return None;
    };
    leading_stmt_directive(std::slice::from_ref(stmt))
}

/// Same check for a function/arrow body's statement list.
pub fn leading_stmt_directive(stmts: &[Stmt]) -> Option<String> {
    let first = stmts.first()?;
    let Stmt::Expr(expr_stmt) = first else {
        return None;
    };
    match expr_stmt.expr.as_ref() {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        _ => None,
    }
}
