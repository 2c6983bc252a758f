#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

mod compile;
mod expr;
mod parser;
mod validate;

pub use crate::compile::compile;
pub use crate::expr::{parse_expr, parse_generator, parse_pattern};
pub use crate::parser::Parser;
pub use crate::validate::validate;

use diagnostics::ParseResult;
use template::CompiledTemplate;

/// Parse and compile a template source in one step.
pub fn compile_source(source: &str) -> ParseResult<CompiledTemplate> {
    let template = Parser::new(source).parse()?;
    compile(&template)
}
