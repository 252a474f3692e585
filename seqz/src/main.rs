use std::error::Error;
use std::fs;
use std::process::exit;

use clap::{Parser, Subcommand};
use itertools::Itertools;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use libseqz::prelude::*;

#[derive(Parser)]
#[clap(arg_required_else_help = true)]
#[clap(name = "seqz")]
#[clap(about = "Bio-sequence compression with random-access substrings", long_about = None)]
#[clap(version)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a plain-text sequence file
    Pack {
        input: String,
        output: String,
        /// Fold the sequence to upper case before encoding
        #[clap(short, long)]
        ignore_case: bool,
        /// Collect run-length statistics and use them when they pay off
        #[clap(short, long)]
        rle: bool,
        /// DNA-aware code selection (fixed palettes for short inputs)
        #[clap(short, long)]
        dna: bool,
    },
    /// Decompress a container, or a substring of it
    Unpack {
        input: String,
        output: String,
        /// First character to decode, 0-based
        #[clap(short, long)]
        start: Option<u32>,
        /// Number of characters to decode
        #[clap(short, long)]
        length: Option<u32>,
    },
    /// Show header and code set details of a container
    Info {
        input: String,
    },
    /// 1-based position of a pattern in the decoded text, 0 when absent
    Find {
        input: String,
        pattern: String,
    },
    /// CRC-32 checksum of the decoded text
    Crc32 {
        input: String,
    },
    /// Reverse-complement a container
    Revcomp {
        input: String,
        output: String,
    },
    /// Generate a random sequence file for testing
    Gen {
        output: String,
        #[clap(short, long)]
        #[clap(default_value_t = 1_000_000)]
        length: usize,
        #[clap(short, long)]
        #[clap(default_value = "ACGT")]
        alphabet: String,
        #[clap(short, long)]
        #[clap(default_value_t = 42)]
        seed: u64,
    },
}

fn load(path: &str) -> Result<CompressedSequence, Box<dyn Error>> {
    Ok(CompressedSequence::from_bytes(fs::read(path)?)?)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Pack {
            input,
            output,
            ignore_case,
            rle,
            dna,
        } => {
            let mut text = fs::read(&input)?;
            while matches!(text.last(), Some(b'\n' | b'\r')) {
                text.pop();
            }
            let seq = if dna {
                compress_dna(
                    &text,
                    DnaOptions {
                        case_sensitive: !ignore_case,
                        alphabet: DnaAlphabet::Unrestricted,
                        strategy: if rle {
                            DnaStrategy::Reference
                        } else {
                            DnaStrategy::Default
                        },
                    },
                )?
            } else {
                compress_auto(&text, ignore_case, rle)?
            };
            info!(
                "packed {} chars into {} bytes",
                seq.sequence_length(),
                seq.total_size()
            );
            fs::write(&output, seq.as_bytes())?;
        }
        Commands::Unpack {
            input,
            output,
            start,
            length,
        } => {
            let seq = load(&input)?;
            let text = if start.is_none() && length.is_none() {
                decompress(&seq)?
            } else {
                let start = start.unwrap_or(0);
                let length =
                    length.unwrap_or_else(|| seq.sequence_length().saturating_sub(start));
                decompress_range(&seq, start, length)?
            };
            fs::write(&output, text)?;
        }
        Commands::Info { input } => {
            let seq = load(&input)?;
            let header = seq.header()?;
            let code = code_set(&seq)?;
            println!("length:       {}", header.sequence_length);
            println!("stored bytes: {}", header.total_size);
            if header.is_fixed {
                println!("code:         fixed palette #{}", header.n_swapped_symbols);
            } else {
                println!(
                    "code:         {} symbols, {} swapped",
                    code.n_symbols(),
                    code.n_swapped_symbols
                );
            }
            let flags = [
                (header.has_equal_length, "equal-length"),
                (header.has_index, "indexed"),
                (header.uses_rle, "rle"),
            ];
            println!(
                "flags:        {}",
                flags
                    .iter()
                    .filter(|(set, _)| *set)
                    .map(|(_, name)| *name)
                    .join(" ")
            );
            println!(
                "alphabet:     {}",
                code.words.iter().map(|w| w.symbol as char).join("")
            );
        }
        Commands::Find { input, pattern } => {
            let seq = load(&input)?;
            println!("{}", strpos(&seq, pattern.as_bytes())?);
        }
        Commands::Crc32 { input } => {
            let seq = load(&input)?;
            println!("{:08x}", crc32(&seq)?);
        }
        Commands::Revcomp { input, output } => {
            let seq = load(&input)?;
            fs::write(&output, reverse_complement(&seq)?.as_bytes())?;
        }
        Commands::Gen {
            output,
            length,
            alphabet,
            seed,
        } => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let text = generate_sequence(&mut rng, alphabet.as_bytes(), None, length);
            fs::write(&output, text)?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("seqz: {e}");
        exit(1);
    }
}
