use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use memq::{setup_local_tracing, AppConfig, AppResult, Broker, Consumer, Producer};
use tokio::{runtime, signal, time};
use tracing::{error, info};

#[derive(Parser)]
#[command(version)]
pub struct CommandLine {
    /// path to config file, defaults are used when absent
    #[arg(short, long)]
    pub conf: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
    /// topic to publish to and consume from
    #[arg(short, long, default_value = "test-topic")]
    pub topic: String,
    /// number of messages to send
    #[arg(short = 'n', long, default_value_t = 5)]
    pub messages: usize,
}

#[derive(Subcommand)]
pub enum Command {
    PrintConfig,
}

fn main() -> AppResult<()> {
    setup_local_tracing()?;

    let commandline = CommandLine::parse();
    let config = match &commandline.conf {
        Some(path) => AppConfig::set_up_config(PathBuf::from(path))?,
        None => AppConfig::default(),
    };
    if let Some(Command::PrintConfig) = commandline.command {
        println!("{config:#?}");
        return Ok(());
    }

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(run(config, commandline.topic, commandline.messages))
}

async fn run(config: AppConfig, topic: String, count: usize) -> AppResult<()> {
    let broker = Arc::new(Broker::with_config(config.broker));
    let producer = Producer::new(broker.clone(), config.client.clone(), config.producer);
    let consumer = Consumer::new(broker.clone(), config.client, config.consumer);
    info!(
        "demo group '{}' on topic {}, max message size {} bytes",
        consumer.group_id(),
        topic,
        broker.config().max_message_bytes
    );

    let messages = consumer.subscribe(&topic).await?;
    let receive = tokio::spawn(async move {
        let mut received = 0;
        while let Ok(message) = messages.recv().await {
            info!(
                "received message: {} ({}-{}@{})",
                String::from_utf8_lossy(&message.payload),
                message.topic,
                message.partition,
                message.offset
            );
            received += 1;
            if received == count {
                break;
            }
        }
        received
    });

    for i in 0..count {
        let payload = format!("Hello, World! Message {i}");
        let meta = producer.send(&topic, payload.clone())?;
        info!("sent message: {} at offset {}", payload, meta.offset);
        time::sleep(Duration::from_millis(100)).await;
    }

    tokio::select! {
        _ = signal::ctrl_c() => info!("received termination signal"),
        _ = time::sleep(Duration::from_secs(5)) => info!("timeout waiting for messages"),
        received = receive => match received {
            Ok(received) => info!("all {} messages processed", received),
            Err(e) => error!("receiver task failed: {}", e),
        },
    }

    consumer.close().await
}
