use std::{fs, net::Ipv4Addr, path::PathBuf, time::Duration};

use structex::{
    parse::{message, Reader},
    Config, Encode, Encoder,
};
use structopt::StructOpt;

/// Encode a few sample records, or read a stream from a file, and print
/// every message with its decoded form.
#[derive(StructOpt, Debug)]
#[structopt(name = "dump")]
struct Opt {
    /// Stream to read instead of encoding samples
    #[structopt(short, long, parse(from_os_str))]
    input: Option<PathBuf>,

    /// Write the encoded samples to this file
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Number of sample records
    #[structopt(short, long, default_value = "3")]
    count: u32,

    /// Payload size limit
    #[structopt(long, default_value = "1073741824")]
    max_message_len: usize,
}

#[derive(Encode)]
struct Reading {
    #[structex(count_of = "samples")]
    sample_count: u8,
    #[structex(size_of = "samples")]
    sample_bytes: u16,
    sensor: String,
    source: Ipv4Addr,
    interval: Duration,
    samples: Vec<i16>,
}

fn samples(count: u32, config: Config) -> Vec<u8> {
    let encoder = Encoder::with_config(Vec::<u8>::new(), config);
    for i in 0..count {
        let reading = Reading {
            sample_count: 0,
            sample_bytes: 0,
            sensor: format!("sensor-{}", i),
            source: Ipv4Addr::new(192, 168, 0, i as u8),
            interval: Duration::from_millis(250),
            samples: (0..i as i16 + 1).map(|s| s * 10 - 5).collect(),
        };
        if let Err(e) = encoder.encode(&reading) {
            log::error!("Error while encoding: {}", e);
            break;
        }
    }
    encoder.into_inner()
}

pub fn main() {
    env_logger::init();
    let opt = Opt::from_args();

    let stream = match &opt.input {
        Some(path) => fs::read(path).expect("Could not read input file"),
        None => samples(
            opt.count,
            Config::new().with_max_message_len(opt.max_message_len),
        ),
    };
    if let Some(path) = &opt.output {
        fs::write(path, &stream).expect("Could not write output file");
    }

    let mut reader = Reader::new();
    let mut remainder = &stream[..];
    while !remainder.is_empty() {
        let (rest, payload) = match message(remainder) {
            Ok(split) => split,
            Err(e) => {
                log::error!("Error while splitting messages: {:?}", e);
                return;
            }
        };
        let raw = &remainder[..remainder.len() - rest.len()];
        println!("{}", hex::encode(raw));
        match reader.read_payload(payload) {
            Ok(message) => println!("  {:?}", message),
            Err(e) => {
                log::error!("Error while reading: {}", e);
                return;
            }
        }
        remainder = rest;
    }
}
