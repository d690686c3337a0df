//! simple-pir: run a complete PIR request locally
//!
//! Client and server stages run on their own threads and exchange serialized
//! query and reply elements exactly as they would over a network, so the
//! reported sizes are the real communication cost.

use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use recursive_pir::crypto::{available_crypto_params, CryptoParams, HomomorphicCrypto};
use recursive_pir::db::{DbDirectoryProcessor, DbGenerator, DbHandler};
use recursive_pir::params::PirParameters;
use recursive_pir::pir::{QueryGenerator, ReplyExtraction, ReplyGenerator};
use recursive_pir::{MockCrypto, RlweCrypto};

#[derive(Parser)]
#[command(name = "simple-pir")]
#[command(about = "Retrieve one database element through recursive PIR")]
#[command(version)]
struct Args {
    /// Crypto parameters as System:Security:PolyDegree:ModulusBits
    #[arg(long, default_value = "LWE:80:2048:60")]
    crypto_params: String,

    /// Number of elements of the generated database
    #[arg(long, default_value = "1000")]
    num_elements: u64,

    /// Bytes per element of the generated database
    #[arg(long, default_value = "1024")]
    element_size: u64,

    /// Use the files of this directory as database elements
    #[arg(long, conflicts_with = "db_file")]
    db_dir: Option<PathBuf>,

    /// Split this file into --num-elements equal elements
    #[arg(long)]
    db_file: Option<PathBuf>,

    /// Consecutive elements packed into one row
    #[arg(long, default_value = "1")]
    aggregation: u64,

    /// Number of recursion dimensions (ignored with --dims)
    #[arg(long, default_value = "2")]
    depth: usize,

    /// Explicit recursion dimensions, e.g. 32,32
    #[arg(long, value_delimiter = ',')]
    dims: Option<Vec<u64>>,

    /// Element to retrieve
    #[arg(long, default_value = "0")]
    index: u64,

    /// Retrieve at most this many bytes of the element
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Import the database in chunks of this many bytes per element
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Seed for the generated database and the secret key
    #[arg(long)]
    seed: Option<u64>,

    /// Print the available crypto parameter sets and exit
    #[arg(long)]
    list_params: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.list_params {
        for params in available_crypto_params() {
            println!("{}", params);
        }
        return Ok(());
    }

    let crypto_params: CryptoParams = args
        .crypto_params
        .parse()
        .wrap_err_with(|| format!("Invalid crypto parameters '{}'", args.crypto_params))?;

    let db: Box<dyn DbHandler> = if let Some(dir) = &args.db_dir {
        Box::new(
            DbDirectoryProcessor::open(dir)
                .wrap_err_with(|| format!("Failed to open database directory {}", dir.display()))?,
        )
    } else if let Some(file) = &args.db_file {
        Box::new(
            DbDirectoryProcessor::split_file(file, args.num_elements)
                .wrap_err_with(|| format!("Failed to split {}", file.display()))?,
        )
    } else {
        Box::new(DbGenerator::new(
            args.num_elements,
            args.element_size,
            args.seed.unwrap_or(0),
        ))
    };

    let num_elements = db.num_elements();
    let element_size = db.max_element_bytesize();
    let params = match &args.dims {
        Some(dims) => PirParameters::new(
            crypto_params.clone(),
            num_elements,
            element_size,
            args.aggregation,
            dims.clone(),
        ),
        None => PirParameters::with_recursion_depth(
            crypto_params.clone(),
            num_elements,
            element_size,
            args.aggregation,
            args.depth,
        ),
    }
    .wrap_err("Invalid PIR parameters")?;

    info!("Recursive PIR");
    info!("Crypto parameters: {}", crypto_params);
    info!(
        "Database: {} elements of {} bytes ({:.2} MB)",
        num_elements,
        element_size,
        (num_elements * element_size) as f64 / (1024.0 * 1024.0)
    );
    info!(
        "Aggregation: {}, dimensions: {:?}",
        params.aggregation(),
        params.dimensions()
    );

    match crypto_params {
        CryptoParams::Rlwe(p) => {
            let crypto = match args.seed {
                Some(seed) => RlweCrypto::with_seed(p, seed)?,
                None => RlweCrypto::new(p)?,
            };
            run(&args, &params, &crypto, db.as_ref())
        }
        CryptoParams::Mock(p) => run(&args, &params, &MockCrypto::new(p)?, db.as_ref()),
    }
}

fn run<C: HomomorphicCrypto>(
    args: &Args,
    params: &PirParameters,
    crypto: &C,
    db: &dyn DbHandler,
) -> Result<()> {
    let index = args.index;
    if index >= params.num_elements() {
        return Err(eyre!(
            "Index {} out of range ({} elements)",
            index,
            params.num_elements()
        ));
    }
    info!("Retrieving element {} ({})", index, db.element_name(index));

    let element_size = params.bytes_per_element();
    let chunk_size = args.chunk_size.unwrap_or(element_size).clamp(1, element_size);
    let total_start = Instant::now();

    // Query
    let query_start = Instant::now();
    let client = QueryGenerator::new(params, crypto)?;
    let mut server = ReplyGenerator::new(params, crypto, db)?;
    let query_bytes = thread::scope(|s| -> Result<u64> {
        let generator = s.spawn(|| client.generate_query(index));
        let mut bytes = 0u64;
        while let Some(element) = client.pop_query() {
            bytes += element.len() as u64;
            if let Err(e) = server.push_query(&element) {
                client.finish();
                return Err(e).wrap_err("Server rejected query element");
            }
        }
        join(generator, "query generation")?.wrap_err("Query generation failed")?;
        Ok(bytes)
    })?;
    info!(
        "Query: {} elements, {} bytes in {:.2?}",
        params.query_element_count(),
        query_bytes,
        query_start.elapsed()
    );

    // Reply, one pass per chunk
    let mut retrieved = Vec::with_capacity(element_size as usize);
    let mut reply_bytes = 0u64;
    let mut offset = 0u64;
    while offset < element_size {
        let len = chunk_size.min(element_size - offset);
        let chunk_params = params.for_chunk(len)?;
        let wanted = chunk_params.offset_in_row(index) + len;

        server.restart_reply_stream();
        let imported = server
            .import_data(offset, len)
            .wrap_err_with(|| format!("Failed to import bytes {}..{}", offset, offset + len))?;

        let extraction = ReplyExtraction::new(&chunk_params, crypto)?;
        let pb = ProgressBar::new(chunk_params.expected_reply_count());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} replies ({eta})")?
                .progress_chars("#>-"),
        );

        let server = &server;
        let (row, bytes) = thread::scope(|s| -> Result<(Vec<u8>, u64)> {
            let generator = s.spawn(|| server.generate_reply(&imported));
            let transport = s.spawn(|| {
                let mut bytes = 0u64;
                let mut result = Ok(());
                while let Some(element) = server.pop_reply() {
                    bytes += element.len() as u64;
                    pb.inc(1);
                    if let Err(e) = extraction.push_encrypted_reply(&element) {
                        server.finish();
                        result = Err(e);
                        break;
                    }
                }
                extraction.finish_encrypted_replies();
                result.map(|_| bytes)
            });
            let extractor = s.spawn(|| extraction.extract_reply(wanted));

            let mut row = Vec::with_capacity(wanted as usize);
            while let Some(chunk) = extraction.pop_plaintext_result() {
                row.extend_from_slice(&chunk);
            }

            join(generator, "reply generation")?.wrap_err("Reply generation failed")?;
            let bytes = join(transport, "reply transport")?.wrap_err("Malformed reply element")?;
            join(extractor, "reply extraction")?.wrap_err("Reply extraction failed")?;
            Ok((row, bytes))
        })?;
        pb.finish_and_clear();

        let start = chunk_params.offset_in_row(index) as usize;
        retrieved.extend_from_slice(&row[start..start + len as usize]);
        reply_bytes += bytes;
        offset += len;
    }
    server.free_queries();

    let max_bytes = args.max_bytes.unwrap_or(element_size).min(element_size);
    retrieved.truncate(max_bytes as usize);

    info!(
        "Reply: {} bytes ({:.1}x expansion over the element)",
        reply_bytes,
        reply_bytes as f64 / element_size as f64
    );
    info!("Total time: {:.2?}", total_start.elapsed());

    let expected = db.read_element_chunk(index, 0, max_bytes as usize)?;
    if retrieved != expected {
        warn!("Retrieved bytes differ from the database element");
        return Err(eyre!("Element {} was not retrieved correctly", index));
    }
    info!("Retrieved {} bytes of element {} correctly", retrieved.len(), index);
    Ok(())
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>, stage: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| eyre!("{} thread panicked", stage))
}
