mod fs_store;

use cpak_core::chunk::reader::{RawChunk, read_chunks, read_sub_chunks};
use cpak_core::crypto::descbc::{KEY_FOATFKIO, decrypt_des_cbc};
use cpak_core::crypto::pad::remove_padding;
use cpak_core::domain::ConversionItem;
use cpak_core::error::Result;
use cpak_core::formats::ppf::PPF_HEADER_LEN;
use cpak_core::{build_ppi, generate_cpis, parse_n27, parse_ppf, split_cpi};

use clap::{Parser, Subcommand};
use fs_store::FsStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "cpakdev CLI — Pack format diagnostics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunk tree of a PPF/PPI file
    Inspect {
        file: PathBuf,

        /// Bytes to skip before the chunk stream (8 for PPF, 0 for PPI)
        #[arg(long, default_value_t = PPF_HEADER_LEN)]
        header: usize,
    },

    /// Print the instrument record of an .n27 file
    Info { file: PathBuf },

    /// Decrypt a CPI: dump the CSEC and write the plaintext payload
    Decrypt {
        cpi: PathBuf,
        out: PathBuf,
    },

    /// Rewrite a PPF as a plaintext PPI, optionally model-locked
    Repack {
        ppf: PathBuf,
        out: PathBuf,

        #[arg(long, default_value = "")]
        model: String,

        #[arg(long = "install-id", default_value_t = 1)]
        install_id: u32,
    },

    /// Generate one encrypted CPI per .n27 file from a PPF source
    Convert {
        ppf: PathBuf,
        n27s: Vec<PathBuf>,

        /// Version label used in output filenames
        #[arg(long, default_value = "V1")]
        version: String,

        /// Output directory root
        #[arg(long, default_value = "cpi-out")]
        out: PathBuf,
    },
}

fn print_chunks(chunks: &[RawChunk<'_>], depth: usize) {
    for c in chunks {
        let tag = String::from_utf8_lossy(&c.id);
        println!(
            "{:indent$}{tag}  {} bytes  off={}",
            "",
            c.size,
            c.offset,
            indent = depth * 2
        );
        if matches!(&c.id, b"BLOB" | b"XPIH") {
            print_chunks(&read_sub_chunks(c), depth + 1);
        }
    }
}

fn hex_dump(data: &[u8]) {
    for row in data.chunks(16) {
        println!("  {}", hex::encode(row));
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { file, header } => {
            let buf = std::fs::read(&file)?;
            let chunks = read_chunks(&buf, header, None);
            print_chunks(&chunks, 0);
        }

        Commands::Info { file } => {
            let buf = std::fs::read(&file)?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let info = parse_n27(&buf, &name);
            println!("model:       {}", info.name);
            println!("serial:      {}", info.serial);
            println!("full id:     {}", info.full_id);
            println!("wave bytes:  {}", info.wave_capacity);
            println!("param bytes: {}", info.param_capacity);
        }

        Commands::Decrypt { cpi, out } => {
            let buf = std::fs::read(&cpi)?;
            let sections = split_cpi(&buf)?;

            println!("XPIH: {} bytes", sections.xpih.len());
            print_chunks(&read_chunks(sections.xpih, 0, None), 1);

            println!("CSEC: {} bytes", sections.csec.len());
            let csec_plain = decrypt_des_cbc(sections.csec, &KEY_FOATFKIO)?;
            hex_dump(&csec_plain);

            println!("payload: {} bytes", sections.payload.len());
            let payload_plain = decrypt_des_cbc(sections.payload, &KEY_FOATFKIO)?;
            let payload_plain = remove_padding(&payload_plain);
            std::fs::write(&out, payload_plain)?;

            let pack = cpak_core::formats::ppf::parse_payload(payload_plain);
            println!("uid:   {}", pack.uid);
            println!("title: {}", pack.title);
            for blob in &pack.blobs {
                println!(
                    "blob:  {} ({}.{}, {} bytes)",
                    blob.title,
                    blob.uid,
                    blob.extension,
                    blob.binary_data.len()
                );
            }
        }

        Commands::Repack {
            ppf,
            out,
            model,
            install_id,
        } => {
            let buf = std::fs::read(&ppf)?;
            let pack = parse_ppf(&buf);
            let ppi = build_ppi(&pack, &model, install_id, None, !model.is_empty());
            std::fs::write(&out, ppi)?;
            eprintln!("repack: OK ({} blobs)", pack.blobs.len());
        }

        Commands::Convert {
            ppf,
            n27s,
            version,
            out,
        } => {
            let store = FsStore::new(out);
            // The PPF is read directly; only outputs go through the sink.
            let source = FsStore::new(PathBuf::new());
            let items: Vec<ConversionItem> = n27s
                .iter()
                .enumerate()
                .map(|(i, path)| ConversionItem {
                    id: i as i64 + 1,
                    external_ref: path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned()),
                    identity_ref: Some(path.to_string_lossy().into_owned()),
                })
                .collect();

            let result = generate_cpis(
                &source,
                &store,
                &ppf.to_string_lossy(),
                &version,
                &items,
                "local",
            )?;

            for s in &result.successful {
                println!("ok   #{} {} -> {}", s.customer_id, s.model_name, s.output_ref);
            }
            for f in &result.failed {
                eprintln!("fail #{}: {}", f.customer_id, f.error);
            }
        }
    }

    Ok(())
}
