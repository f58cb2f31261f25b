use anyhow::{Context, Result};
use bat::PrettyPrinter;
use clap::Parser;
use cliclack::{input, spinner};
use console::style;
use dotenv::dotenv;
use std::env;

use gully::agent::{Agent, AgentConfig, Reply};
use gully::capabilities::postgres::{PgConfig, PgStatsStore};
use gully::providers::configs::{OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig};
use gully::providers::factory::get_provider;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Provider option (openai or ollama)
    #[arg(short, long, default_value = "open-ai")]
    #[arg(value_enum)]
    provider: ProviderVariant,

    /// OpenAI API Key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum reasoning iterations per question
    #[arg(long, default_value_t = 20)]
    max_iterations: u32,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProviderVariant {
    OpenAi,
    Ollama,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let provider_config = build_provider_config(&cli)?;
    let provider = get_provider(provider_config)?;

    let pg_config = PgConfig::from_env();
    let store = PgStatsStore::connect(&pg_config)
        .with_context(|| format!("could not open a pool to {}:{}", pg_config.host, pg_config.port))?;

    let agent = Agent::new(
        provider,
        Box::new(store),
        AgentConfig::new(cli.max_iterations),
    );

    println!(
        "gully cricket statistics agent {}",
        style("- type \"exit\" to end the session").dim()
    );
    println!("\n");

    loop {
        let question: String = input("Question:").placeholder("").multiline().interact()?;

        if question.trim().eq_ignore_ascii_case("exit") {
            break;
        }

        let spin = spinner();
        spin.start("thinking");

        let reply = agent.run(&question).await;

        spin.stop("");

        match reply {
            Ok(reply) => render_reply(&reply).await,
            Err(e) => eprintln!("{} {}", style("error:").red(), e),
        }

        println!("\n");
    }
    Ok(())
}

fn build_provider_config(cli: &Cli) -> Result<ProviderConfig> {
    match cli.provider {
        ProviderVariant::OpenAi => {
            let api_key = cli
                .api_key
                .clone()
                .or_else(|| env::var("OPENAI_API_KEY").ok())
                .context(
                    "API key must be provided via --api-key or OPENAI_API_KEY environment variable",
                )?;
            let host = env::var("OPENAI_HOST")
                .unwrap_or_else(|_| "https://api.openai.com".to_string());
            let model = cli
                .model
                .clone()
                .or_else(|| env::var("OPENAI_MODEL").ok())
                .unwrap_or_else(|| "gpt-4o".to_string());
            Ok(ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature: Some(0.0),
                max_tokens: None,
            }))
        }
        ProviderVariant::Ollama => {
            let mut config = OllamaProviderConfig::from_env()?;
            if let Some(model) = &cli.model {
                config.model = model.clone();
            }
            Ok(ProviderConfig::Ollama(config))
        }
    }
}

async fn render_reply(reply: &Reply) {
    render_markdown(&reply.text).await;

    if let Some(query) = &reply.last_query {
        println!("\n{}", style("SQL query:").dim());
        render_sql(query).await;
    }
    if let Some(results) = &reply.last_query_results {
        println!("{}", style("Raw results:").dim());
        println!("{}", style(results).dim());
    }
}

async fn render_markdown(content: &str) {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .unwrap();
}

async fn render_sql(content: &str) {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("sql")
        .print()
        .unwrap();
}
