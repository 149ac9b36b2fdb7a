use avcenc::binary_reader::BinaryReader;
use avcenc::binary_writer::BinaryWriter;
use avcenc::config::*;
use avcenc::encoder::*;
use avcenc::nal::*;
use avcenc::picture::Picture;
use clap::Parser;
use colored::*;
use debug_print::*;
use std::io::{self, Write};
use std::process;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to input raw video (8-bit I420), "-" for stdin
    #[clap(short, long)]
    input: String,
    /// Path to output bitstream, "-" for stdout
    #[clap(short, long)]
    output: String,
    /// Input video resolution (WIDTHxHEIGHT)
    #[clap(long)]
    input_size: String,
    /// Number of pictures to encode; all of the input when omitted
    #[clap(long)]
    num_pictures: Option<usize>,
    /// Fixed quantization parameter for entire video stream
    #[clap(long)]
    qp: Option<i32>,
    /// Use CAVLC instead of CABAC
    #[clap(long)]
    cavlc: bool,
    /// Number of slices per picture
    #[clap(long)]
    slices: Option<usize>,
    /// Number of threads encoding slices
    #[clap(long)]
    threads: Option<usize>,
    /// Extra parameters (PARAM1=VAL1[,PARAM2=VAL2,...])
    #[clap(long)]
    extra_params: Option<String>,
}

fn fail<E: std::fmt::Display>(what: &str, e: E) -> ! {
    eprintln!("{}: {}: {}", "error".red(), what, e);
    process::exit(1);
}

fn main() {
    let args = Args::parse();

    let (width, height) = parse_size(&args.input_size).unwrap_or_else(|e| fail("input-size", e));
    let mut config = EncoderConfig::new(width, height);
    if let Some(qp) = args.qp {
        config.qp = qp;
    }
    config.cabac = !args.cavlc;
    if let Some(slices) = args.slices {
        config.slices = slices;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(extra_params) = &args.extra_params {
        config
            .apply_extra_params(extra_params)
            .unwrap_or_else(|e| fail("extra-params", e));
    }

    let mut encoder = Encoder::new(config).unwrap_or_else(|e| fail("invalid configuration", e));

    // initialize binary reader
    let stdin = io::stdin();
    let mut reader = if args.input == *"-" {
        BinaryReader::standard(&stdin)
    } else {
        BinaryReader::file(&args.input).unwrap_or_else(|e| fail("failed to open input file", e))
    };

    // initialize binary writer
    let stdout = io::stdout();
    let mut writer = if args.output == *"-" {
        BinaryWriter::standard(&stdout)
    } else {
        BinaryWriter::file(&args.output).unwrap_or_else(|e| fail("failed to open output file", e))
    };

    let num_pictures = args.num_pictures.unwrap_or(usize::MAX);
    for picture_index in 0..num_pictures {
        let picture = match Picture::read(&mut reader, width, height) {
            Ok(Some(picture)) => picture,
            Ok(None) => break,
            Err(e) => fail("failed to read input picture", e),
        };
        let nals = encoder
            .encode_picture(&picture)
            .unwrap_or_else(|e| fail("encoding failed", e));
        debug_eprintln!("picture #{}: {} nal units", picture_index, nals.len());
        if let Err(e) = write_nals(&nals, &mut writer) {
            fail("failed to write output", e);
        }
    }
    if let Err(e) = writer.flush() {
        fail("failed to write output", e);
    }

    eprintln!(
        "encoded {} pictures, {} bytes in, {} bytes out",
        encoder.pictures_encoded(),
        reader.bytes_read(),
        writer.bytes_written()
    );
}
