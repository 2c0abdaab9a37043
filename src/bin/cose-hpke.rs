//! cose-hpke CLI: COSE-HPKE encryption from the terminal
//!
//! Usage:
//!   cose-hpke keygen  [--suite HPKE-7] [--kid ID] [--output-public FILE] [--output-private FILE] [--jwk]
//!   cose-hpke encrypt <MESSAGE> --recipient FILE... [--aad] [--info] [--recipient-info] [--output FILE] [--url]
//!   cose-hpke decrypt <URL|FILE|-> --key FILE [--aad] [--info] [--recipient-info]
//!   cose-hpke inspect <URL|FILE|->

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cose_hpke::fragment::{self, Compression};
use cose_hpke::{cbor, CoseKey, MessageKind, Options, SuiteId};

#[derive(Parser)]
#[command(name = "cose-hpke", version, about = "COSE-HPKE encryption (HPKE-4 / HPKE-7)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a COSE_Key pair.
    Keygen(KeygenArgs),
    /// Encrypt a message to one or more recipients.
    Encrypt(EncryptArgs),
    /// Decrypt a message from a URL, a file, or stdin.
    Decrypt(DecryptArgs),
    /// Show the structure of a message without decrypting it.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct KeygenArgs {
    /// Cipher suite.
    #[arg(long, default_value = "HPKE-7", value_parser = parse_suite)]
    suite: SuiteId,

    /// Key identifier stored in the COSE_Key.
    #[arg(long)]
    kid: Option<String>,

    /// Write the CBOR public key here.
    #[arg(long)]
    output_public: Option<PathBuf>,

    /// Write the CBOR private key here.
    #[arg(long)]
    output_private: Option<PathBuf>,

    /// Print keys as JWK instead of diagnostic notation.
    #[arg(long)]
    jwk: bool,
}

#[derive(Args)]
struct BindingArgs {
    /// Cipher suite (forced on decrypt instead of inferred).
    #[arg(long, value_parser = parse_suite, env = "COSE_HPKE_SUITE")]
    suite: Option<SuiteId>,

    /// External additional authenticated data.
    #[arg(long)]
    aad: Option<String>,

    /// HPKE info (single recipient only).
    #[arg(long)]
    info: Option<String>,

    /// Recipient_structure extra info (multiple recipients only).
    #[arg(long)]
    recipient_info: Option<String>,
}

impl BindingArgs {
    fn options(&self) -> Options {
        Options {
            suite: self.suite,
            external_aad: bytes_of(&self.aad),
            external_info: bytes_of(&self.info),
            recipient_extra_info: bytes_of(&self.recipient_info),
        }
    }
}

#[derive(Args)]
struct EncryptArgs {
    /// Plaintext message.
    message: String,

    /// Recipient public key file (repeatable).
    #[arg(short, long = "recipient", required = true)]
    recipients: Vec<PathBuf>,

    #[command(flatten)]
    binding: BindingArgs,

    /// Write the binary message here.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a shareable URL instead of hex.
    #[arg(long)]
    url: bool,

    /// Base URL for --url.
    #[arg(long, default_value = fragment::DEFAULT_BASE_URL)]
    base_url: String,

    /// Never compress the URL fragment.
    #[arg(long)]
    no_compress: bool,
}

#[derive(Args)]
struct DecryptArgs {
    /// Shareable URL, message file, or `-` for stdin.
    input: String,

    /// Private key file.
    #[arg(short, long)]
    key: PathBuf,

    #[command(flatten)]
    binding: BindingArgs,
}

#[derive(Args)]
struct InspectArgs {
    /// Shareable URL, message file, or `-` for stdin.
    input: String,
}

fn parse_suite(s: &str) -> Result<SuiteId, String> {
    s.parse::<SuiteId>().map_err(|e| e.to_string())
}

fn bytes_of(value: &Option<String>) -> Vec<u8> {
    value.as_deref().map(|s| s.as_bytes().to_vec()).unwrap_or_default()
}

fn die(msg: &str) -> ! {
    eprintln!("error: {}", msg);
    process::exit(1);
}

fn read_file(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| die(&format!("cannot read {}: {}", path.display(), e)))
}

fn write_file(path: &Path, data: &[u8]) {
    fs::write(path, data).unwrap_or_else(|e| die(&format!("cannot write {}: {}", path.display(), e)));
}

/// URL (fragment transport), `-` (stdin), or a file path.
fn read_message(input: &str) -> Vec<u8> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return fragment::parse_shareable_url(input).unwrap_or_else(|e| die(&e.to_string()));
    }
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .unwrap_or_else(|e| die(&format!("cannot read stdin: {}", e)));
        return buf;
    }
    read_file(Path::new(input))
}

fn print_key(label: &str, key: &CoseKey, as_jwk: bool) {
    println!("{label}:");
    if as_jwk {
        let json = key.to_jwk().to_json().unwrap_or_else(|e| die(&e.to_string()));
        println!("{json}");
        return;
    }
    let bytes = key.encode().unwrap_or_else(|e| die(&e.to_string()));
    let diag = cbor::diagnostic(&bytes).unwrap_or_else(|e| die(&e.to_string()));
    println!("  {diag}");
    println!("  hex: {}", hex::encode(&bytes));
}

fn cmd_keygen(args: KeygenArgs) {
    let (mut public, mut private) =
        CoseKey::generate(Some(args.suite)).unwrap_or_else(|e| die(&e.to_string()));
    if let Some(kid) = &args.kid {
        public = public.with_kid(kid.as_bytes());
        private = private.with_kid(kid.as_bytes());
    }

    if let Some(path) = &args.output_public {
        write_file(path, &public.encode().unwrap_or_else(|e| die(&e.to_string())));
        eprintln!("Public key written to {}", path.display());
    }
    if let Some(path) = &args.output_private {
        write_file(path, &private.encode().unwrap_or_else(|e| die(&e.to_string())));
        eprintln!("Private key written to {}", path.display());
    }

    print_key("Public key", &public, args.jwk);
    print_key("Private key", &private, args.jwk);
}

fn cmd_encrypt(args: EncryptArgs) {
    let options = args.binding.options();
    options
        .check_for(args.recipients.len())
        .unwrap_or_else(|e| die(&e.to_string()));

    let recipients: Vec<Vec<u8>> = args.recipients.iter().map(|p| read_file(p)).collect();
    let message = cose_hpke::encrypt(args.message.as_bytes(), &recipients, &options)
        .unwrap_or_else(|e| die(&e.to_string()));

    if let Some(path) = &args.output {
        write_file(path, &message);
        eprintln!("Encrypted {} bytes -> {}", args.message.len(), path.display());
        return;
    }

    if args.url {
        let compression = if args.no_compress {
            Compression::Disabled
        } else {
            Compression::Deflate
        };
        let url = fragment::create_shareable_url_with(&message, &args.base_url, compression)
            .unwrap_or_else(|e| die(&e.to_string()));
        println!("{url}");
    } else {
        println!("{}", hex::encode(&message));
    }
}

fn cmd_decrypt(args: DecryptArgs) {
    let message = read_message(&args.input);
    let key = read_file(&args.key);
    let plaintext = cose_hpke::decrypt(&message, &key, &args.binding.options())
        .unwrap_or_else(|e| die(&e.to_string()));

    match std::str::from_utf8(&plaintext) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{}", hex::encode(&plaintext)),
    }
}

fn cmd_inspect(args: InspectArgs) {
    let message = read_message(&args.input);
    let info = cose_hpke::inspect(&message).unwrap_or_else(|e| die(&e.to_string()));

    let kind = match info.kind {
        MessageKind::Single => "COSE_Encrypt0 (single recipient)",
        MessageKind::Multi => "COSE_Encrypt (multiple recipients)",
    };
    println!("Type:        {kind}{}", if info.tagged { "" } else { ", untagged" });
    println!("Algorithm:   {}", describe_alg(info.algorithm, info.suite));
    if let Some(kid) = &info.kid {
        println!("Key ID:      {}", String::from_utf8_lossy(kid));
    }
    println!("Ciphertext:  {} bytes", info.ciphertext_len);
    for (i, r) in info.recipients.iter().enumerate() {
        let kid = r
            .kid
            .as_deref()
            .map(|k| format!(" kid={}", String::from_utf8_lossy(k)))
            .unwrap_or_default();
        println!("Recipient {i}: {}{kid}", describe_alg(r.algorithm, r.suite));
    }
    if let Ok(diag) = cbor::diagnostic(&message) {
        println!("\n{diag}");
    }
}

fn describe_alg(alg: Option<i64>, suite: Option<SuiteId>) -> String {
    match (alg, suite) {
        (Some(alg), Some(suite)) => format!("{alg} ({suite})"),
        (Some(alg), None) => alg.to_string(),
        (None, _) => "none".to_string(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Keygen(args) => cmd_keygen(args),
        Command::Encrypt(args) => cmd_encrypt(args),
        Command::Decrypt(args) => cmd_decrypt(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}
