//! Command line driver for the CHERI RISC-V backend pieces.
//!
//! ```text
//! cheri-codegen defines --triple riscv32-unknown-elf --features +m,+a,+xcheri
//! cheri-codegen rewrite store.mir
//! cheri-codegen constraint IJKx
//! ```

use cheri_codegen::mir::parse_functions;
use cheri_codegen::passes::{MachineFunctionPass, UStorePass};
use cheri_codegen::target::{validate_asm_constraint, CapTableAbi, MacroSet, TargetFeaturesBuilder};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cheri-codegen")]
#[command(about = "CHERI RISC-V target description and store rewriting")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Capability table ABI selection
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum CliCapTableAbi {
    #[default]
    Legacy,
    Plt,
    Pcrel,
    FnDesc,
}

impl From<CliCapTableAbi> for CapTableAbi {
    fn from(cli: CliCapTableAbi) -> Self {
        match cli {
            CliCapTableAbi::Legacy => CapTableAbi::Legacy,
            CliCapTableAbi::Plt => CapTableAbi::Plt,
            CliCapTableAbi::Pcrel => CapTableAbi::Pcrel,
            CliCapTableAbi::FnDesc => CapTableAbi::FunctionDescriptor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the predefined macros and data layout of a target
    Defines {
        /// Target triple (riscv32-* or riscv64-*)
        #[arg(long, default_value = "riscv64-unknown-elf")]
        triple: String,
        /// ABI name, e.g. lp64 or l64pc128
        #[arg(long)]
        abi: Option<String>,
        /// Capability table ABI
        #[arg(long, value_enum, default_value_t)]
        cap_table_abi: CliCapTableAbi,
        /// Comma separated feature tokens, e.g. +m,+a,+xcheri
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        features: Vec<String>,
    },
    /// Run the uninitialized-store rewrite over a machine IR file
    Rewrite {
        /// Input file; standard input when omitted
        input: Option<PathBuf>,
    },
    /// Validate inline asm constraint letters
    Constraint {
        /// Constraint letters to check
        letters: String,
    },
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Commands::Defines {
            triple,
            abi,
            cap_table_abi,
            features,
        } => {
            let mut builder = TargetFeaturesBuilder::from_triple(&triple)?;
            if let Some(abi) = &abi {
                builder.abi(abi);
            }
            builder.cap_table_abi(cap_table_abi.into()).configure(&features);

            for token in builder.ignored_features() {
                log::warn!("Ignoring unrecognized feature token '{}'", token);
            }

            let target = builder.finalize();
            let mut macros = MacroSet::new();
            target.target_defines(&mut macros);

            print!("{macros}");
            println!("; data layout: {}", target.data_layout());
        }
        Commands::Rewrite { input } => {
            let text = match input {
                Some(path) => fs::read_to_string(path)?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            let mut funcs = parse_functions(&text)?;
            let mut pass = UStorePass::new();
            for func in &mut funcs {
                let changed = pass.run_on_function(func)?;
                log::info!("{}: {}", func.name(), if changed { "changed" } else { "unchanged" });
                print!("{func}");
            }

            let stats = pass.stats();
            eprintln!(
                "rewrote {} stores in {} of {} functions",
                stats.stores_rewritten,
                stats.functions_changed,
                funcs.len()
            );
        }
        Commands::Constraint { letters } => {
            for letter in letters.chars() {
                match validate_asm_constraint(letter) {
                    Ok(info) => println!("{letter}: {}", info.immediate_range()),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
