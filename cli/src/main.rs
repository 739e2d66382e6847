use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "solace",
    version,
    about = "Solace CLI — empathic analysis for journal entries over the Solace API"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "SOLACE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Analyze entry text and print the normalized result
    Analyze {
        /// Entry text; reads stdin when omitted and --file is not set
        content: Option<String>,
        /// Read the entry text from a file
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Journal entry id to record the analysis on
        #[arg(long)]
        entry_id: Option<Uuid>,
    },
    /// Send a test request and print the model's raw, unparsed text
    Probe {
        /// Entry text; reads stdin when omitted and no --file/--sample is set
        content: Option<String>,
        /// Read the entry text from a file
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Use a canned sample entry instead of your own text
        #[arg(long, value_enum, conflicts_with_all = ["content", "file"])]
        sample: Option<Sample>,
    },
}

/// Canned entries covering the three interesting analysis shapes.
#[derive(Clone, Copy, ValueEnum)]
enum Sample {
    Positive,
    Anxious,
    Crisis,
}

impl Sample {
    fn text(self) -> &'static str {
        match self {
            Sample::Positive => {
                "Had an amazing day at work today! Successfully completed the big project \
                 I've been working on for weeks. Feeling really proud and accomplished. \
                 My team was so supportive throughout the process."
            }
            Sample::Anxious => {
                "I can't stop worrying about the presentation tomorrow. My heart is racing \
                 and I keep thinking about all the things that could go wrong. Haven't been \
                 sleeping well because of the stress."
            }
            Sample::Crisis => {
                "I don't want to be here anymore. Everything feels hopeless and I don't \
                 see the point in continuing."
            }
        }
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn exit_error(message: &str) -> ! {
    let err = json!({
        "error": "cli_error",
        "details": message
    });
    eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Health => health(&cli.api_url).await,
        Commands::Analyze {
            content,
            file,
            entry_id,
        } => {
            let text = load_content(content, file.as_deref());
            analyze(&cli.api_url, &text, entry_id, false).await
        }
        Commands::Probe {
            content,
            file,
            sample,
        } => {
            let text = match sample {
                Some(sample) => sample.text().to_string(),
                None => load_content(content, file.as_deref()),
            };
            analyze(&cli.api_url, &text, None, true).await
        }
    };

    if let Err(e) = result {
        exit_error(&e.to_string());
    }
}

fn load_content(content: Option<String>, file: Option<&Path>) -> String {
    if let Some(content) = content {
        return content;
    }
    if let Some(path) = file {
        return match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => exit_error(&format!("failed to read {}: {e}", path.display())),
        };
    }
    let mut buffer = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut buffer) {
        exit_error(&format!("failed to read stdin: {e}"));
    }
    buffer
}

fn analyze_body(content: &str, entry_id: Option<Uuid>, is_test: bool) -> serde_json::Value {
    let mut body = json!({ "content": content });
    if let Some(id) = entry_id {
        body["entryId"] = json!(id);
    }
    if is_test {
        body["isTest"] = json!(true);
    }
    body
}

async fn health(api_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let resp = client().get(format!("{api_url}/health")).send().await?;
    let body: serde_json::Value = resp.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn analyze(
    api_url: &str,
    content: &str,
    entry_id: Option<Uuid>,
    is_test: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let resp = client()
        .post(format!("{api_url}/analyze"))
        .json(&analyze_body(content, entry_id, is_test))
        .send()
        .await?;

    let status = resp.status();
    let resp_body: serde_json::Value = resp.json().await?;

    if !status.is_success() {
        eprintln!("{}", serde_json::to_string_pretty(&resp_body)?);
        std::process::exit(1);
    }

    println!("{}", serde_json::to_string_pretty(&resp_body)?);
    Ok(())
}
