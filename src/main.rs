use std::io::{self, Read as _};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hwt::primitives::b64url_decode;
use hwt::types::EXTENDED_FORMAT;
use hwt::{generate_keys, jx, Hwt, KeyringSpec, Options, Value, VerifyResult};

#[derive(Parser)]
#[command(name = "hwt", about = "Compact HMAC-signed web tokens")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Keyring JSON file: {"current": "...", "keys": [{"id": "...", "secret": "..."}]}
    #[arg(short, long)]
    keyring: PathBuf,

    /// Engine options JSON file (camelCase fields, all optional).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a keyring with fresh random secrets and print it as JSON.
    GenerateKeys {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Create a token. The payload is JSON read from --data or stdin.
    Sign {
        #[command(flatten)]
        engine: EngineArgs,

        /// Token lifetime (e.g. "30s", "15m", "1h"). Defaults to the
        /// configured expiry.
        #[arg(short, long)]
        ttl: Option<String>,

        /// Payload JSON. If omitted, reads from stdin.
        #[arg(short, long)]
        data: Option<String>,

        /// Hidden JSON value bound into the signature.
        #[arg(long)]
        hidden: Option<String>,
    },

    /// Verify a token and print the result as JSON.
    Verify {
        #[command(flatten)]
        engine: EngineArgs,

        /// Token string. If omitted, reads from stdin.
        #[arg(short, long)]
        token: Option<String>,

        /// Hidden JSON value the token was created with.
        #[arg(long)]
        hidden: Option<String>,
    },

    /// Decode a token without checking its signature or expiry.
    Inspect {
        /// Engine options JSON file, for a non-default format.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Token string. If omitted, reads from stdin.
        #[arg(short, long)]
        token: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::GenerateKeys { count } => cmd_generate_keys(count),
        Command::Sign {
            engine,
            ttl,
            data,
            hidden,
        } => cmd_sign(&engine, ttl.as_deref(), data, hidden.as_deref()),
        Command::Verify {
            engine,
            token,
            hidden,
        } => cmd_verify(&engine, token, hidden.as_deref()),
        Command::Inspect { config, token } => cmd_inspect(config.as_deref(), token),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn cmd_generate_keys(count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let keyring = generate_keys(count)?;
    println!("{}", serde_json::to_string_pretty(&keyring)?);
    Ok(())
}

fn cmd_sign(
    args: &EngineArgs,
    ttl: Option<&str>,
    data: Option<String>,
    hidden: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (options, hwt) = load_engine(args)?;
    let extended = options.format == EXTENDED_FORMAT;

    let data = parse_value(&read_arg_or_stdin(data)?, extended)?;
    let hidden = hidden.map(|h| parse_value(h, extended)).transpose()?;

    let token = match ttl {
        Some(ttl) => {
            let duration: std::time::Duration = ttl
                .parse::<humantime::Duration>()
                .map_err(|e| format!("invalid duration '{ttl}': {e}"))?
                .into();
            let secs = i64::try_from(duration.as_secs()).map_err(|_| "duration overflow")?;
            hwt.create_with(secs, &data, hidden.as_ref())?
        }
        None => hwt.create(&data, hidden.as_ref())?,
    };
    if token.is_empty() {
        return Err("payload could not be encoded".into());
    }
    println!("{token}");
    Ok(())
}

fn cmd_verify(
    args: &EngineArgs,
    token: Option<String>,
    hidden: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (options, hwt) = load_engine(args)?;
    let token = read_arg_or_stdin(token)?;
    let hidden = hidden
        .map(|h| parse_value(h, options.format == EXTENDED_FORMAT))
        .transpose()?;

    let result = hwt.verify(&token, hidden.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
    if !result.ok {
        return Err(result.error.unwrap_or_else(|| "token rejected".into()).into());
    }
    Ok(())
}

fn cmd_inspect(config: Option<&Path>, token: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(config)?;
    // Decoding needs no real key material.
    let hwt = Hwt::new(&options, &generate_keys(1)?)?;
    let token = read_arg_or_stdin(token)?;

    let decoded = hwt.decode(&token)?;
    let output = serde_json::json!({
        "keyId": decoded.key_id,
        "expires": decoded.expires,
        "format": decoded.format,
        "signatureHex": hex::encode(b64url_decode(&decoded.signature)),
        "data": jx::to_tagged(&decoded.data),
        "totalBytes": token.len(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn result_json(result: &VerifyResult) -> serde_json::Value {
    serde_json::json!({
        "ok": result.ok,
        "data": result.data.as_ref().map(jx::to_tagged),
        "expired": result.expired,
        "validTime": result.valid_time,
        "withinLeeway": result.within_leeway,
        "expires": result.expires,
        "error": result.error,
    })
}

fn load_options(path: Option<&Path>) -> Result<Options, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Options::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(Options::default()),
    }
}

fn load_engine(args: &EngineArgs) -> Result<(Options, Hwt), Box<dyn std::error::Error>> {
    let options = load_options(args.config.as_deref())?;
    let keyring = KeyringSpec::from_json(&std::fs::read_to_string(&args.keyring)?)?;
    let hwt = Hwt::new(&options, &keyring)?;
    Ok((options, hwt))
}

/// JSON text to a payload value. With the extended format, tagged arrays in
/// the input decode to their extended types.
fn parse_value(text: &str, extended: bool) -> Result<Value, Box<dyn std::error::Error>> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(if extended {
        jx::from_tagged(&json)
    } else {
        Value::from(json)
    })
}

fn read_arg_or_stdin(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match arg {
        Some(s) => Ok(s.trim().to_string()),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf.trim().to_string())
        }
    }
}
