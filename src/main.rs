use fedis_client::{Client, ClientConfig, Command, Error, RespValue, StringCodec, logging};

const USAGE: &str =
    "usage: fedis-cli [redis://[user:password@]host[:port][/db]] <command> [args...]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = ClientConfig::from_env()?;
    if args.first().is_some_and(|a| a.contains("://")) {
        let url = args.remove(0);
        config.apply_url(&url)?;
    }
    let Some((name, rest)) = args.split_first() else {
        return Err(USAGE.into());
    };

    let mut command = Command::new(name.to_uppercase());
    for arg in rest {
        command.arg(arg.clone());
    }

    let client = Client::connect(&config, StringCodec::utf8()).await?;
    let outcome = client.execute(command).await;
    client.close();

    match outcome {
        Ok(reply) => println!("{}", format_reply(&reply, 0)),
        Err(Error::Server(message)) => println!("(error) {}", message),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Renders a reply the way redis-cli does.
fn format_reply(reply: &RespValue, indent: usize) -> String {
    match reply {
        RespValue::Simple(s) => s.clone(),
        RespValue::Error(e) => format!("(error) {}", e),
        RespValue::Integer(n) => format!("(integer) {}", n),
        RespValue::Bulk(None) => "(nil)".to_string(),
        RespValue::Bulk(Some(bytes)) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
        RespValue::Array(items) if items.is_empty() => "(empty array)".to_string(),
        RespValue::Array(items) => {
            let width = items.len().to_string().len();
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let prefix = format!("{:>width$}) ", i + 1, width = width);
                    let pad = if i == 0 { String::new() } else { " ".repeat(indent) };
                    format!(
                        "{}{}{}",
                        pad,
                        prefix,
                        format_reply(item, indent + prefix.len())
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}
