mod ast;
mod codegen;
mod id_gen;
mod ir;
mod lexer;
mod parser;

use log::trace;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {path}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Command failed: {0}")]
    Command(String),

    #[error(transparent)]
    Lexer(#[from] lexer::LexerError),

    #[error(transparent)]
    Parser(#[from] parser::ParserError),

    #[error(transparent)]
    Ir(#[from] ir::IrError),

    #[error(transparent)]
    Codegen(#[from] codegen::CodegenError),
}

pub fn read_input(input_filename: &Path) -> Result<String, Error> {
    log::info!("Reading input file: {}", input_filename.display());
    let input = fs::read_to_string(input_filename).map_err(|e| Error::Io {
        source: e,
        path: input_filename.into(),
    })?;
    Ok(input)
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum StopAfter {
    Lexing,
    Parsing,
    Ir,
    Assembly,
    NoStop,
}

impl StopAfter {
    pub fn will_stop(self) -> bool {
        self != StopAfter::NoStop
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DumpOptions {
    pub ast: bool,
    pub ir: bool,
}

/// Compile one source text. The assembly file is written unless
/// `stop_after` ends the pipeline before the backend; assembling and
/// linking the result is the driver's job.
pub fn compile(
    input: &str,
    input_filename: &Path,
    output_filename: Option<&Path>,
    stop_after: StopAfter,
    dump: DumpOptions,
) -> Result<(), Error> {
    let outputs = compile_pipeline(input, input_filename, stop_after, dump)?;

    trace!("{outputs:#?}");

    if matches!(
        stop_after,
        StopAfter::Lexing | StopAfter::Parsing | StopAfter::Ir
    ) {
        return Ok(());
    }

    let Some(generated_ir) = outputs.ir else {
        return Ok(());
    };

    // if output_filename is none, set it to input filename with .asm extension
    let output_filename = match output_filename {
        Some(path) => path.to_path_buf(),
        None => input_filename.with_extension("asm"),
    };

    codegen::emit(&generated_ir, &output_filename)?;

    Ok(())
}

#[allow(dead_code)]
#[derive(Debug)]
struct CompileOutputs {
    tokens: Option<Vec<lexer::Token>>,
    ast: Option<Rc<ast::AstNode>>,
    ir: Option<ir::GeneratedIr>,
}

fn compile_pipeline(
    input: &str,
    input_filename: &Path,
    stop_after: StopAfter,
    dump: DumpOptions,
) -> Result<CompileOutputs, Error> {
    log::info!("Lexing input file: {}", input_filename.display());
    let tokens = lexer::lex(input)?;

    if stop_after == StopAfter::Lexing {
        return Ok(CompileOutputs {
            tokens: Some(tokens),
            ast: None,
            ir: None,
        });
    }

    log::info!("Parsing input file: {}", input_filename.display());
    let ast = parser::parse(&tokens)?;

    if dump.ast {
        println!("===== AST =====");
        print!("{}", ast::format_tree(&ast));
    }

    if stop_after == StopAfter::Parsing {
        return Ok(CompileOutputs {
            tokens: Some(tokens),
            ast: Some(ast),
            ir: None,
        });
    }

    log::info!("Generating IR");
    let generated_ir = ir::emit_program(&ast)?;

    if dump.ir {
        println!("===== IR =====");
        print!("{}", generated_ir.listing());
    }

    Ok(CompileOutputs {
        tokens: Some(tokens),
        ast: Some(ast),
        ir: Some(generated_ir),
    })
}
