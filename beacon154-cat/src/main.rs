use std::process::ExitCode;

use beacon154_cat::FrameParser;
use clap::Parser;

/// `cat` for beacon-enabled IEEE 802.15.4 frames.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The IEEE 802.15.4 frame to parse, hex encoded.
    #[clap(value_parser(clap::builder::NonEmptyStringValueParser::new()))]
    input: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match FrameParser::parse_hex(&args.input) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(_) => {
            eprintln!("invalid frame: {}", args.input);
            ExitCode::FAILURE
        }
    }
}
