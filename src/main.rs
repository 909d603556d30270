use clap::{ArgGroup, Parser};
use env_logger::Env;
use log::{debug, info};
use pseuc::{compile, read_input, DumpOptions, Error, StopAfter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(group(
    ArgGroup::new("stop-after")
        .args(&["lex", "parse", "ir", "asm"])
        .multiple(false)
))]
struct Cli {
    #[arg(long = "trace", action)]
    trace: bool,

    #[arg(short = 'd', long = "debug", action)]
    debug: bool,

    #[arg(short = 'v', long = "verbose", action)]
    verbose: bool,

    #[arg(short = 'q', long = "quiet", action)]
    quiet: bool,

    /// Path to the file to be compiled
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Path to the output artifact (optional)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Stop after lexing
    #[arg(long)]
    lex: bool,

    /// Stop after parsing
    #[arg(long)]
    parse: bool,

    /// Stop after IR generation
    #[arg(long)]
    ir: bool,

    /// Generate assembly only, skip assembler and linker
    #[arg(short = 'S', long = "asm")]
    asm: bool,

    /// Print the AST
    #[arg(long = "ast")]
    print_ast: bool,

    /// Print the IR listing
    #[arg(long = "dump-ir")]
    print_ir: bool,
}

impl Cli {
    fn stop_after(&self) -> StopAfter {
        if self.lex {
            StopAfter::Lexing
        } else if self.parse {
            StopAfter::Parsing
        } else if self.ir {
            StopAfter::Ir
        } else if self.asm {
            StopAfter::Assembly
        } else {
            StopAfter::NoStop
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match (cli.trace, cli.debug, cli.verbose, cli.quiet) {
        // --quiet always wins
        (_, _, _, true) => "error",
        (true, _, _, _) => "trace",
        (_, true, _, _) => "debug",
        (_, _, true, _) => "info",
        (_, _, _, _) => "warn",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let stop_after = cli.stop_after();

    let input = read_input(&cli.input)?;

    // With -S the assembly is the final artifact, so -o names it;
    // otherwise it is an intermediate next to the input.
    let assembly_file = match (&cli.output, stop_after) {
        (Some(path), StopAfter::Assembly) => path.clone(),
        _ => cli.input.with_extension("asm"),
    };

    let dump = DumpOptions {
        ast: cli.print_ast,
        ir: cli.print_ir,
    };

    compile(&input, &cli.input, Some(&assembly_file), stop_after, dump)?;

    if !stop_after.will_stop() {
        let result = assemble_and_link(&assembly_file, &cli.output);
        let _ = std::fs::remove_file(&assembly_file);
        result?;
    }

    Ok(())
}

fn assemble_and_link(assembly_file: &Path, output_filename: &Option<PathBuf>) -> Result<(), Error> {
    let output_filename = match output_filename {
        Some(filename) => filename.clone(),
        None => assembly_file.with_extension(""),
    };
    let object_file = assembly_file.with_extension("o");

    info!(
        "Assemble and link {} -> {}",
        assembly_file.display(),
        output_filename.display()
    );

    let result = (|| -> Result<(), Error> {
        do_command(&format!(
            "nasm -f elf64 {} -o {}",
            assembly_file.display(),
            object_file.display()
        ))?;
        do_command(&format!(
            "ld {} -o {}",
            object_file.display(),
            output_filename.display()
        ))
    })();

    let _ = std::fs::remove_file(&object_file);

    result
}

fn do_command(cmd: &str) -> Result<(), Error> {
    debug!("Executing command: {cmd}");
    std::process::Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .status()
        .map(|status| {
            if !status.success() {
                Err(Error::Command(cmd.to_string()))
            } else {
                Ok(())
            }
        })
        .map_err(|_| Error::Command(cmd.to_string()))?
}
