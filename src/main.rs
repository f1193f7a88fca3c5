use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use refract::diagnostic::render_diagnostics;
use refract::kernel::{KernelFunction, KernelSettings};
use refract::lower::GlslLowering;
use refract::types::Ty;

#[derive(Parser)]
#[command(
    name = "refract",
    version,
    about = "Refract — numeric kernel transpiler for shader dialects"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transpile a kernel source file to shader source
    Build {
        /// Input file containing a single kernel function
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output shape, comma separated (e.g. 512,512)
        #[arg(long, default_value = "1")]
        shape: String,
        /// Argument types, comma separated (e.g. "Array,Number")
        #[arg(long, value_name = "TYPES")]
        argument_types: Option<String>,
    },
    /// Parse and type-check a kernel without emitting
    Check {
        /// Input file containing a single kernel function
        input: PathBuf,
        /// Output shape, comma separated
        #[arg(long, default_value = "1")]
        shape: String,
        /// Argument types, comma separated
        #[arg(long, value_name = "TYPES")]
        argument_types: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Build {
            input,
            output,
            shape,
            argument_types,
        } => build(&input, output.as_deref(), &shape, argument_types.as_deref()),
        Command::Check {
            input,
            shape,
            argument_types,
        } => check(&input, &shape, argument_types.as_deref()),
    };
    if let Err(message) = result {
        eprintln!("error: {}", message);
        process::exit(1);
    }
}

fn build(
    input: &std::path::Path,
    output: Option<&std::path::Path>,
    shape: &str,
    argument_types: Option<&str>,
) -> Result<(), String> {
    let (source, mut unit) = load_unit(input, shape, argument_types)?;
    let glsl = match unit.to_source(&mut GlslLowering::new()) {
        Ok(glsl) => glsl,
        Err(diagnostics) => {
            let text = unit.source_text().unwrap_or(&source);
            render_diagnostics(&diagnostics, &input.display().to_string(), text);
            return Err(format!("could not transpile '{}'", input.display()));
        }
    };
    match output {
        Some(path) => std::fs::write(path, glsl)
            .map_err(|e| format!("cannot write '{}': {}", path.display(), e))?,
        None => print!("{}", glsl),
    }
    Ok(())
}

fn check(
    input: &std::path::Path,
    shape: &str,
    argument_types: Option<&str>,
) -> Result<(), String> {
    let (source, mut unit) = load_unit(input, shape, argument_types)?;
    match unit.resolved_return_type() {
        Ok(ty) => {
            println!("{}: ok, returns {}", input.display(), ty);
            Ok(())
        }
        Err(diagnostics) => {
            let text = unit.source_text().unwrap_or(&source);
            render_diagnostics(&diagnostics, &input.display().to_string(), text);
            Err(format!("check failed for '{}'", input.display()))
        }
    }
}

fn load_unit(
    input: &std::path::Path,
    shape: &str,
    argument_types: Option<&str>,
) -> Result<(String, KernelFunction), String> {
    let source = std::fs::read_to_string(input)
        .map_err(|e| format!("cannot read '{}': {}", input.display(), e))?;
    let settings = KernelSettings {
        is_root_kernel: true,
        output: parse_shape(shape)?,
        argument_types: parse_argument_types(argument_types)?,
        ..Default::default()
    };
    let unit = KernelFunction::new(source.as_str(), settings).map_err(|d| d.message)?;
    Ok((source, unit))
}

fn parse_shape(shape: &str) -> Result<Vec<usize>, String> {
    shape
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid output shape component '{}'", part))
        })
        .collect()
}

fn parse_argument_types(types: Option<&str>) -> Result<Vec<Ty>, String> {
    let types = match types {
        Some(types) => types,
        None => return Ok(Vec::new()),
    };
    types
        .split(',')
        .map(|part| {
            let part = part.trim();
            Ty::from_name(part).ok_or_else(|| format!("unknown type '{}'", part))
        })
        .collect()
}
