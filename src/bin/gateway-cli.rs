use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Issue calls through the RPC gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Session token sent as the session cookie.
    #[arg(short, long)]
    token: Option<String>,

    #[arg(long, default_value = "session")]
    cookie_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway status
    Status,
    /// Invoke an RPC method: call <protocol> <method> '<json args>'
    Call {
        protocol: String,
        /// `method` or `module.method`
        method: String,
        /// JSON array of arguments
        #[arg(default_value = "[]")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", cli.cookie_name, token))?,
        );
    }

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Call { protocol, method, args } => {
            let args: Value = serde_json::from_str(&args)?;
            if !args.is_array() {
                return Err("arguments must be a JSON array".into());
            }
            let res = client.post(format!("{}/api/{}/{}", cli.url, protocol, method.replace('.', "/")))
                .headers(headers)
                .json(&args)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }
    if text.is_empty() {
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
